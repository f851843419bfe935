//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `app` - 应用入口
//! - 管理应用生命周期（初始化、运行、关闭）
//! - 持有浏览器资源
//!
//! ### `bootstrap` - 会话启动
//! - 登录、捕获会话、进入课程全屏页
//! - 启动流程整体重试
//!
//! ### `course_walker` - 课程遍历器
//! - 逐个处理课件，失败隔离
//! - 输出课程统计
//!
//! ## 层次关系
//!
//! ```text
//! app
//!     ↓
//! bootstrap (登录 → 进入课程 → 枚举课件)
//!     ↓
//! course_walker (处理 Vec<Slide>)
//!     ↓
//! workflow::SlideFlow (处理单个 Slide)
//!     ↓
//! services (能力层：course / quiz / llm / cache)
//!     ↓
//! infrastructure (基础设施：BrowserSession / JsExecutor)
//! ```

pub mod app;
pub mod bootstrap;
pub mod course_walker;

pub use app::App;
pub use bootstrap::{run_course, CourseDeps, SessionBootstrap};
pub use course_walker::{CourseWalker, WalkReport};
