use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// 浏览器 Cookie
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub http_only: bool,
    /// 秒级时间戳；会话 Cookie 为 None
    #[serde(default)]
    pub expires: Option<f64>,
}

/// 登录后的会话
///
/// 页面本身由 `BrowserSession` 持有，这里只保存登录产物。
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub cookies: Vec<Cookie>,
    /// LMS 回调地址上的查询参数
    pub oauth_params: HashMap<String, String>,
}

impl Session {
    pub fn cookie(&self, name: &str) -> Option<&Cookie> {
        self.cookies.iter().find(|c| c.name == name)
    }
}
