//! # LMS Autopilot
//!
//! 自动完成 PTIT LMS 课程的 Rust 应用程序：登录、逐个标记视频、作答测验
//!
//! ## 架构设计
//!
//! 本系统采用四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Page），只暴露能力
//! - `BrowserSession` - 浏览器能力的抽象（导航 / 选择器 / Cookie / 页面内 fetch）
//! - `JsExecutor` - 唯一的 page owner，基于 chromiumoxide 实现 `BrowserSession`
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个课件
//! - `CourseService` - LMS JSON-RPC 接口
//! - `LlmService` - LLM 作答能力
//! - `FileAnswerCache` - 答案缓存
//! - `QuizAnswerResolver` - 缓存 → LLM → 随机兜底
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个课件"的完整处理流程
//! - `RetryPolicy` - 固定间隔的有界重试
//! - `SlideFlow` - 按课件类型分派
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/bootstrap` - 登录并进入课程
//! - `orchestrator/course_walker` - 遍历课件
//! - `orchestrator/app` - 应用生命周期

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, Result};
pub use infrastructure::{BrowserSession, JsExecutor};
pub use models::{Slide, SlideType};
pub use orchestrator::{run_course, App, CourseDeps, WalkReport};
pub use workflow::{RetryPolicy, SlideFlow, SlideState};
