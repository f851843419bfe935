use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{AppError, ConfigError, FileError, Result};

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    // --- 账号与课程 ---
    /// 统一认证账号
    pub username: String,
    /// 统一认证密码
    pub password: String,
    /// 目标课程地址
    pub course_url: String,

    // --- LMS 站点 ---
    pub lms_domain: String,
    pub login_url: String,
    /// LMS 接收 OAuth 回调的地址
    pub oauth_signin_url: String,

    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,

    // --- 重试与节奏 ---
    /// 登录 / 单个课件的额外重试次数
    pub max_retry: u32,
    /// 登录 / 单个课件的重试间隔（毫秒）
    pub retry_wait_ms: u64,
    /// 测验相关请求的额外重试次数
    pub quiz_max_retry: u32,
    pub quiz_retry_wait_ms: u64,
    /// 顶层启动流程的额外重试次数
    pub bootstrap_max_retry: u32,
    pub bootstrap_retry_wait_ms: u64,
    /// 两个课件之间的间隔（毫秒）
    pub delay_between_slide_ms: u64,

    // --- 浏览器 ---
    /// 设置后连接已有浏览器，否则自行启动
    pub browser_debug_port: Option<u16>,
    pub browser_headless: bool,
    pub chrome_executable: Option<String>,

    // --- 行为开关 ---
    /// 答案缓存目录
    pub answer_store_dir: String,
    /// LLM 失败后是否启用随机答案兜底
    pub allow_random_fallback: bool,
    /// 处理前是否向 LMS 确认课件可访问
    pub check_slide_access: bool,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            course_url: String::new(),
            lms_domain: "https://lms.ptit.edu.vn/".to_string(),
            login_url: "https://slinkid.ptit.edu.vn/auth/realms/master/protocol/openid-connect/auth?response_type=token&client_id=lms_ptit&redirect_uri=http%3A%2F%2Flms.ptit.edu.vn%2Fauth_oauth%2Fsignin&scope=profile&state=%7B%22d%22%3A+%22lms_ptit%22%2C+%22p%22%3A+4%2C+%22r%22%3A+%22http%253A%252F%252Flms.ptit.edu.vn%252Fweb%22%7D".to_string(),
            oauth_signin_url: "https://lms.ptit.edu.vn/auth_oauth/signin".to_string(),
            llm_api_key: String::new(),
            llm_api_base_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            llm_model_name: "gemini-1.5-flash-latest".to_string(),
            max_retry: 3,
            retry_wait_ms: 1000,
            quiz_max_retry: 5,
            quiz_retry_wait_ms: 5000,
            bootstrap_max_retry: 5,
            bootstrap_retry_wait_ms: 3000,
            delay_between_slide_ms: 5000,
            browser_debug_port: None,
            browser_headless: false,
            chrome_executable: None,
            answer_store_dir: "./store/quizs".to_string(),
            allow_random_fallback: false,
            check_slide_access: false,
            verbose_logging: false,
        }
    }
}

impl Config {
    /// 加载配置：.env → TOML 文件 → 环境变量（后者覆盖前者）
    pub fn load() -> Result<Self> {
        let env_file = if std::env::var("NODE_ENV").as_deref() == Ok("development") {
            ".env.local"
        } else {
            ".env"
        };
        // .env 不存在时直接使用进程环境
        let _ = dotenvy::from_filename(env_file);

        let config_file =
            std::env::var("LMS_CONFIG_FILE").unwrap_or_else(|_| "lms_autopilot.toml".to_string());
        let base = if Path::new(&config_file).exists() {
            Self::from_toml_file(&config_file)?
        } else {
            Self::default()
        };

        let config = base.with_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 文件读取配置，缺省字段使用默认值
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
        toml::from_str(&content).map_err(|e| {
            AppError::File(FileError::TomlParseFailed {
                path: path.display().to_string(),
                source: Box::new(e),
            })
        })
    }

    /// 仅使用默认值 + 环境变量
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides()
    }

    /// 用环境变量覆盖已有配置
    pub fn with_env_overrides(self) -> Result<Self> {
        let base = self;
        Ok(Self {
            username: env_string("SLINK_ID").unwrap_or(base.username),
            password: env_string("SLINK_PASSWORD").unwrap_or(base.password),
            course_url: env_string("COURSE_URL").unwrap_or(base.course_url),
            lms_domain: env_string("LMS_DOMAIN").unwrap_or(base.lms_domain),
            login_url: env_string("LMS_LOGIN_URL").unwrap_or(base.login_url),
            oauth_signin_url: env_string("LMS_OAUTH").unwrap_or(base.oauth_signin_url),
            llm_api_key: env_string("GEMINI_API_KEY").unwrap_or(base.llm_api_key),
            llm_api_base_url: env_string("LLM_API_BASE_URL").unwrap_or(base.llm_api_base_url),
            llm_model_name: env_string("GEMINI_API_MODEL").unwrap_or(base.llm_model_name),
            max_retry: env_parsed("MAX_RETRY_LOGIN", "u32")?.unwrap_or(base.max_retry),
            retry_wait_ms: env_parsed("MAX_RETRY_LOGIN_WAIT", "u64")?
                .unwrap_or(base.retry_wait_ms),
            quiz_max_retry: env_parsed("QUIZ_MAX_RETRY", "u32")?.unwrap_or(base.quiz_max_retry),
            quiz_retry_wait_ms: env_parsed("QUIZ_RETRY_WAIT", "u64")?
                .unwrap_or(base.quiz_retry_wait_ms),
            bootstrap_max_retry: env_parsed("BOOTSTRAP_MAX_RETRY", "u32")?
                .unwrap_or(base.bootstrap_max_retry),
            bootstrap_retry_wait_ms: env_parsed("BOOTSTRAP_RETRY_WAIT", "u64")?
                .unwrap_or(base.bootstrap_retry_wait_ms),
            delay_between_slide_ms: env_parsed("DELAY_BETWEEN_SLIDE", "u64")?
                .unwrap_or(base.delay_between_slide_ms),
            browser_debug_port: env_parsed("BROWSER_DEBUG_PORT", "u16")?
                .or(base.browser_debug_port),
            browser_headless: env_parsed("BROWSER_HEADLESS", "bool")?
                .unwrap_or(base.browser_headless),
            chrome_executable: env_string("CHROME_EXECUTABLE").or(base.chrome_executable),
            answer_store_dir: env_string("ANSWER_STORE_DIR").unwrap_or(base.answer_store_dir),
            allow_random_fallback: env_parsed("ALLOW_RANDOM_FALLBACK", "bool")?
                .unwrap_or(base.allow_random_fallback),
            check_slide_access: env_parsed("CHECK_SLIDE_ACCESS", "bool")?
                .unwrap_or(base.check_slide_access),
            verbose_logging: env_parsed("VERBOSE_LOGGING", "bool")?
                .unwrap_or(base.verbose_logging),
        })
    }

    /// 检查必填项
    pub fn validate(&self) -> Result<()> {
        for (var_name, value) in [
            ("SLINK_ID", &self.username),
            ("SLINK_PASSWORD", &self.password),
            ("COURSE_URL", &self.course_url),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Missing {
                    var_name: var_name.to_string(),
                }
                .into());
            }
        }
        Ok(())
    }

    pub fn retry_wait(&self) -> Duration {
        Duration::from_millis(self.retry_wait_ms)
    }

    pub fn quiz_retry_wait(&self) -> Duration {
        Duration::from_millis(self.quiz_retry_wait_ms)
    }

    pub fn bootstrap_retry_wait(&self) -> Duration {
        Duration::from_millis(self.bootstrap_retry_wait_ms)
    }

    pub fn delay_between_slide(&self) -> Duration {
        Duration::from_millis(self.delay_between_slide_ms)
    }
}

fn env_string(var_name: &str) -> Option<String> {
    std::env::var(var_name).ok().filter(|v| !v.is_empty())
}

fn env_parsed<T: FromStr>(var_name: &str, expected_type: &str) -> Result<Option<T>> {
    match env_string(var_name) {
        None => Ok(None),
        Some(value) => value.trim().parse::<T>().map(Some).map_err(|_| {
            ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: expected_type.to_string(),
            }
            .into()
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_follow_original_pacing() {
        let config = Config::default();
        assert_eq!(config.quiz_max_retry, 5);
        assert_eq!(config.quiz_retry_wait(), Duration::from_secs(5));
        assert_eq!(config.bootstrap_retry_wait(), Duration::from_secs(3));
        assert_eq!(config.delay_between_slide(), Duration::from_secs(5));
        assert!(!config.allow_random_fallback);
    }

    #[test]
    fn test_validate_requires_credentials() {
        let config = Config::default();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("SLINK_ID"));

        let config = Config {
            username: "B21DCCN001".to_string(),
            password: "secret".to_string(),
            course_url: "https://lms.ptit.edu.vn/slides/co-so-du-lieu-12".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_file_keeps_defaults_for_missing_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
course_url = "https://lms.ptit.edu.vn/slides/mang-may-tinh-7"
delay_between_slide_ms = 250
allow_random_fallback = true
"#
        )
        .unwrap();

        let config = Config::from_toml_file(file.path()).unwrap();
        assert_eq!(
            config.course_url,
            "https://lms.ptit.edu.vn/slides/mang-may-tinh-7"
        );
        assert_eq!(config.delay_between_slide_ms, 250);
        assert!(config.allow_random_fallback);
        assert_eq!(config.quiz_max_retry, 5);
    }

    #[test]
    fn test_broken_toml_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "delay_between_slide_ms = \"soon\"").unwrap();

        let err = Config::from_toml_file(file.path()).unwrap_err();
        assert!(matches!(
            err,
            AppError::File(FileError::TomlParseFailed { .. })
        ));
    }
}
