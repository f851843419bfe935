pub mod retry;
pub mod slide_ctx;
pub mod slide_flow;

pub use retry::RetryPolicy;
pub use slide_ctx::SlideCtx;
pub use slide_flow::{SlideFlow, SlideState};
