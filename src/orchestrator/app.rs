//! 应用入口 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：打开浏览器、创建 JsExecutor / LLM / 缓存
//! 2. **运行**：委托 `bootstrap::run_course` 完成登录和课件处理
//! 3. **资源管理**：唯一持有 Browser，结束时关闭

use std::sync::Arc;

use chromiumoxide::Browser;
use tracing::{info, warn};

use crate::browser;
use crate::config::Config;
use crate::error::Result;
use crate::infrastructure::JsExecutor;
use crate::orchestrator::bootstrap::{self, CourseDeps};
use crate::orchestrator::course_walker::WalkReport;
use crate::services::{FileAnswerCache, LlmService};
use crate::utils::logging;

/// 应用主结构
pub struct App {
    config: Config,
    browser: Browser,
    deps: CourseDeps,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        logging::log_startup(&config);

        let (browser, page) = browser::open_browser(&config).await?;
        let executor = JsExecutor::new(page, config.oauth_signin_url.clone()).await?;

        let deps = CourseDeps {
            session: Arc::new(executor),
            llm: Arc::new(LlmService::new(&config)),
            cache: Arc::new(FileAnswerCache::new(&config.answer_store_dir)),
        };

        Ok(Self {
            config,
            browser,
            deps,
        })
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<WalkReport> {
        let report = bootstrap::run_course(&self.deps, &self.config).await?;
        logging::print_final_stats(report.completed, report.skipped, report.failed, report.total);
        Ok(report)
    }

    /// 关闭浏览器
    pub async fn shutdown(mut self) {
        // 连接的是用户自己的浏览器时不关闭
        if self.config.browser_debug_port.is_some() {
            return;
        }
        if let Err(e) = self.browser.close().await {
            warn!("⚠️ 关闭浏览器失败: {}", e);
            return;
        }
        let _ = self.browser.wait().await;
        info!("👋 浏览器已关闭");
    }
}
