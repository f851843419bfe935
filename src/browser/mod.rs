pub mod connection;
pub mod headless;

use chromiumoxide::{Browser, Page};

use crate::config::Config;
use crate::error::Result;

pub use connection::connect_to_browser_and_page;
pub use headless::launch_browser;

/// 按配置连接已有浏览器或启动新浏览器
pub async fn open_browser(config: &Config) -> Result<(Browser, Page)> {
    match config.browser_debug_port {
        Some(port) => connect_to_browser_and_page(port).await,
        None => launch_browser(config).await,
    }
}
