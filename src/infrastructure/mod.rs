pub mod browser_session;
pub mod js_executor;

pub use browser_session::{BrowserSession, ElementSnapshot, FetchRequest, FetchResponse};
pub use js_executor::JsExecutor;
