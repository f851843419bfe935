//! 会话启动 - 编排层
//!
//! ## 职责
//!
//! 1. **登录**：在统一认证页面填写账号密码，识别错误提示
//! 2. **会话捕获**：保存 Cookie，从请求记录中取出 OAuth 回调参数
//! 3. **进入课程**：打开课程页，进入第一个课件的全屏模式，读取课程 key
//! 4. **整体重试**：启动流程失败时从登录开始重来

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{AppError, AuthError, CourseError, Result};
use crate::infrastructure::BrowserSession;
use crate::models::Session;
use crate::orchestrator::course_walker::{CourseWalker, WalkReport};
use crate::services::{AnswerCache, CourseService, QuizAnswerResolver, TextCompletionService};
use crate::utils::url::{
    course_key_from_href, fullscreen_url, path_of, query_params, same_endpoint, same_host,
};
use crate::workflow::retry::{self, RetryPolicy};
use crate::workflow::{SlideFlow, SlideState};

pub const USERNAME_SELECTOR: &str = "input[name=username]";
pub const PASSWORD_SELECTOR: &str = "input[name=password]";
pub const SUBMIT_SELECTOR: &str = "button[type=submit]";
/// 登录失败时认证服务停留的页面
pub const LOGIN_ERROR_PATH: &str = "/auth/realms/master/login-actions/authenticate";
pub const LOGIN_ERROR_SELECTOR: &str = ".mt-2.text-red-600.text-sm";
pub const SLIDE_LINK_SELECTOR: &str = ".o_wslides_js_slides_list_slide_link";
pub const COURSE_HEADER_SELECTOR: &str = ".o_wslides_fs_sidebar_header > a";

/// 会话启动器
///
/// 职责：
/// - 只负责把浏览器带到"已登录、位于课程全屏页"的状态
/// - 不处理课件
pub struct SessionBootstrap {
    session: Arc<dyn BrowserSession>,
    config: Config,
}

impl SessionBootstrap {
    pub fn new(session: Arc<dyn BrowserSession>, config: Config) -> Self {
        Self { session, config }
    }

    /// 登录并捕获会话
    ///
    /// 登录按 `max_retry` 重试；认证页明确拒绝时立即放弃。
    /// 已登录时认证服务会直接跳回 LMS，此时跳过表单。
    pub async fn login(&self) -> Result<Session> {
        let policy = RetryPolicy::new("登录", self.config.max_retry, self.config.retry_wait());

        let outcome = retry::execute(&policy, || async { split_fatal(self.login_once().await) }).await;
        match outcome {
            Some(Ok(())) => {}
            Some(Err(fatal)) => return Err(fatal),
            None => {
                return Err(AuthError::LoginExhausted {
                    attempts: policy.max_retries() + 1,
                }
                .into())
            }
        }

        info!("✓ 登录成功");
        self.capture_session().await
    }

    async fn login_once(&self) -> Result<()> {
        info!("🔐 正在登录 {}...", self.config.username);
        self.session.goto_url(&self.config.login_url).await?;

        let landed = self.session.current_url().await?;
        if same_host(&landed, &self.config.lms_domain) {
            info!("✓ 已处于登录状态，跳过登录表单 ({})", landed);
            return Ok(());
        }

        self.session
            .type_into(USERNAME_SELECTOR, &self.config.username)
            .await?;
        self.session
            .type_into(PASSWORD_SELECTOR, &self.config.password)
            .await?;
        self.session.click(SUBMIT_SELECTOR).await?;
        self.session.wait_for_navigation().await?;

        self.detect_login_error().await
    }

    /// 认证页停留在 authenticate 页面说明账号密码被拒绝
    async fn detect_login_error(&self) -> Result<()> {
        let current = self.session.current_url().await?;
        if path_of(&current).as_deref() != Some(LOGIN_ERROR_PATH) {
            return Ok(());
        }

        let messages: Vec<String> = self
            .session
            .query_all(LOGIN_ERROR_SELECTOR)
            .await?
            .into_iter()
            .filter_map(|el| el.text)
            .filter(|t| !t.is_empty())
            .collect();
        let reason = if messages.is_empty() {
            "认证页面没有给出原因".to_string()
        } else {
            messages.join("; ")
        };
        error!("❌ 登录被拒绝: {}", reason);
        Err(AuthError::LoginRejected { reason }.into())
    }

    /// 保存 Cookie 和 OAuth 回调参数
    pub async fn capture_session(&self) -> Result<Session> {
        let cookies = self.session.get_cookies().await?;

        let oauth_params: HashMap<String, String> = self
            .session
            .request_log()
            .await?
            .iter()
            .rev()
            .find(|url| same_endpoint(url, &self.config.oauth_signin_url))
            .map(|url| query_params(url))
            .unwrap_or_default();
        if oauth_params.is_empty() {
            warn!("⚠️ 没有捕获到 OAuth 回调参数");
        } else {
            debug!("OAuth 回调参数: {:?}", oauth_params.keys().collect::<Vec<_>>());
        }

        debug!("已保存 {} 个 Cookie", cookies.len());
        Ok(Session {
            cookies,
            oauth_params,
        })
    }

    /// 进入课程全屏页，返回课程 key
    pub async fn enter_course(&self, session: &Session) -> Result<String> {
        info!("📚 打开课程页面: {}", self.config.course_url);
        self.session.goto_url(&self.config.course_url).await?;
        self.session.set_cookies(&session.cookies).await?;

        let href = self
            .session
            .query_all(SLIDE_LINK_SELECTOR)
            .await?
            .into_iter()
            .find_map(|el| el.attr("href").map(str::to_string))
            .ok_or(AppError::Course(CourseError::SlideNotFound))?;
        let slide_url = fullscreen_url(&self.config.lms_domain, &href)?;

        let cookies = self.session.get_cookies().await?;
        info!("▶️ 进入全屏模式: {}", slide_url);
        self.session.goto_url(&slide_url).await?;
        self.session.set_cookies(&cookies).await?;

        let header_href = self
            .session
            .query_all(COURSE_HEADER_SELECTOR)
            .await?
            .into_iter()
            .find_map(|el| el.attr("href").map(str::to_string));
        let course_key = course_key_from_href(header_href.as_deref());
        info!("✓ 课程 key: {}", course_key);
        Ok(course_key)
    }
}

/// 课程处理的依赖
pub struct CourseDeps {
    pub session: Arc<dyn BrowserSession>,
    pub llm: Arc<dyn TextCompletionService>,
    pub cache: Arc<dyn AnswerCache>,
}

/// 登录 → 进入课程 → 遍历课件
///
/// 登录到枚举课件这一段整体按 `bootstrap_max_retry` 重试；遍历本身不会整体失败。
pub async fn run_course(deps: &CourseDeps, config: &Config) -> Result<WalkReport> {
    let bootstrap = SessionBootstrap::new(deps.session.clone(), config.clone());

    let policy = RetryPolicy::new(
        "启动",
        config.bootstrap_max_retry,
        config.bootstrap_retry_wait(),
    );

    let start = || async {
        let session = bootstrap.login().await?;
        let course_key = bootstrap.enter_course(&session).await?;
        let course = CourseService::new(deps.session.clone(), &config.lms_domain, course_key);
        let slides = course.list_slides().await?;
        Ok::<_, AppError>((course, slides))
    };
    let started = retry::execute(&policy, || async { split_fatal(start().await) }).await;

    let (course, slides) = match started {
        Some(Ok(started)) => started,
        Some(Err(fatal)) => {
            error!("❌ 启动流程遇到不可重试的错误: {}", fatal);
            return Err(fatal);
        }
        None => {
            error!("❌ 启动流程失败，请检查账号、网络或课程地址");
            return Err(CourseError::BootstrapExhausted {
                attempts: policy.max_retries() + 1,
            }
            .into());
        }
    };

    let pending = slides
        .iter()
        .filter(|s| SlideState::initial(s) == SlideState::Pending)
        .count();
    crate::utils::logging::log_slides_loaded(course.course_key(), slides.len(), pending);

    let course = Arc::new(course);
    let resolver = QuizAnswerResolver::new(
        course.clone(),
        deps.llm.clone(),
        deps.cache.clone(),
        config.quiz_max_retry,
        config.quiz_retry_wait(),
        config.allow_random_fallback,
    );
    let flow = SlideFlow::new(course, resolver, config.check_slide_access);
    let walker = CourseWalker::new(flow, config);

    Ok(walker.walk(&slides).await)
}

/// 不可重试的错误包进 Ok，让重试立即停止并把错误带出来
fn split_fatal<T>(result: Result<T>) -> Result<Result<T>> {
    match result {
        Err(e) if !e.is_retryable() => Ok(Err(e)),
        other => other.map(Ok),
    }
}
