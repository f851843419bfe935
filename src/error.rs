use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 浏览器相关错误
    #[error("浏览器错误: {0}")]
    Browser(#[from] BrowserError),
    /// LMS 接口调用错误
    #[error("API错误: {0}")]
    Api(#[from] ApiError),
    /// 答案缓存文件错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// LLM 服务错误
    #[error("LLM错误: {0}")]
    Llm(#[from] LlmError),
    /// 登录错误
    #[error("登录错误: {0}")]
    Auth(#[from] AuthError),
    /// 课程流程错误
    #[error("课程错误: {0}")]
    Course(#[from] CourseError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 浏览器相关错误
#[derive(Debug, Error)]
pub enum BrowserError {
    /// 连接浏览器失败
    #[error("无法连接到浏览器 (端口: {port}): {source}")]
    ConnectionFailed { port: u16, source: BoxError },
    /// 启动浏览器失败
    #[error("启动浏览器失败: {source}")]
    LaunchFailed { source: BoxError },
    /// 导航失败
    #[error("导航到 {url} 失败: {source}")]
    NavigationFailed { url: String, source: BoxError },
    /// 找不到元素
    #[error("找不到元素: {selector}")]
    ElementNotFound { selector: String },
    /// 执行脚本失败
    #[error("执行脚本失败: {source}")]
    ScriptExecutionFailed { source: BoxError },
    /// Cookie 读写失败
    #[error("Cookie 操作失败: {message}")]
    CookieFailed { message: String },
}

/// LMS 接口调用错误
#[derive(Debug, Error)]
pub enum ApiError {
    /// 网络请求失败（页面内 fetch 抛出异常）
    #[error("API请求失败 ({endpoint}): {message}")]
    RequestFailed { endpoint: String, message: String },
    /// HTTP 状态码异常
    #[error("HTTP 状态异常 ({endpoint}): {status}")]
    HttpStatus { endpoint: String, status: u16 },
    /// JSON-RPC 返回 error 字段
    #[error("JSON-RPC 错误 ({endpoint}): code={code}, message={message}")]
    RpcFault {
        endpoint: String,
        code: i64,
        message: String,
    },
    /// 响应既没有 result 也没有 error
    #[error("响应结构不符合预期 ({endpoint}): {raw}")]
    UnexpectedShape { endpoint: String, raw: String },
    /// JSON 解析失败
    #[error("JSON解析失败: {source}")]
    JsonParseFailed { source: BoxError },
}

/// 答案缓存文件错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed { path: String, source: BoxError },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed { path: String, source: BoxError },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed { path: String, source: BoxError },
}

/// LLM 服务错误
#[derive(Debug, Error)]
pub enum LlmError {
    /// API 调用失败
    #[error("LLM API调用失败 (模型: {model}): {source}")]
    ApiCallFailed { model: String, source: BoxError },
    /// 返回内容为空
    #[error("LLM返回内容为空 (模型: {model})")]
    EmptyContent { model: String },
    /// 答案 JSON 无法解析
    #[error("无法解析LLM返回的答案 (响应: {response}): {source}")]
    AnswerParseFailed { response: String, source: BoxError },
    /// 没有任何可用答案
    #[error("LLM没有给出任何有效答案")]
    NoUsableAnswer,
}

/// 登录错误
#[derive(Debug, Error)]
pub enum AuthError {
    /// 身份认证页面显示了错误信息
    #[error("登录被拒绝: {reason}")]
    LoginRejected { reason: String },
    /// 登录重试耗尽
    #[error("登录失败，已重试 {attempts} 次")]
    LoginExhausted { attempts: u32 },
}

/// 课程流程错误
#[derive(Debug, Error)]
pub enum CourseError {
    /// 课程页面上找不到课件
    #[error("找不到课件入口")]
    SlideNotFound,
    /// 视频标记完成失败
    #[error("视频 [{title}] 标记完成失败, 原始响应: {raw}")]
    VideoNotCompleted { title: String, raw: String },
    /// 尚未定义处理方式的课件类型
    #[error("课件 [{title}] 的类型 {slide_type} 没有定义处理方式")]
    UnhandledSlideType { title: String, slide_type: String },
    /// 启动流程重试耗尽
    #[error("启动流程失败，已尝试 {attempts} 次")]
    BootstrapExhausted { attempts: u32 },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 必填配置缺失
    #[error("缺少必填配置 {var_name}")]
    Missing { var_name: String },
}

// ========== 从常见错误类型转换 ==========

impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AppError::Browser(BrowserError::ScriptExecutionFailed {
            source: Box::new(err),
        })
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Api(ApiError::JsonParseFailed {
            source: Box::new(err),
        })
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::File(FileError::TomlParseFailed {
            path: String::new(),
            source: Box::new(err),
        })
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: String::new(),
            source: Box::new(err),
        })
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建浏览器连接错误
    pub fn browser_connection_failed(
        port: u16,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Browser(BrowserError::ConnectionFailed {
            port,
            source: Box::new(source),
        })
    }

    /// 创建导航错误
    pub fn navigation_failed(
        url: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Browser(BrowserError::NavigationFailed {
            url: url.into(),
            source: Box::new(source),
        })
    }

    /// 创建文件读取错误
    pub fn file_read_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建LLM API调用错误
    pub fn llm_api_failed(
        model: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Llm(LlmError::ApiCallFailed {
            model: model.into(),
            source: Box::new(source),
        })
    }

    /// 是否值得重试
    ///
    /// 登录被拒、未定义的课件类型、配置错误重试也不会有不同结果。
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            AppError::Auth(AuthError::LoginRejected { .. })
                | AppError::Course(CourseError::UnhandledSlideType { .. })
                | AppError::Config(_)
        )
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type Result<T> = std::result::Result<T, AppError>;
