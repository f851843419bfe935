//! 浏览器能力接口 - 基础设施层
//!
//! 流程层只通过这个 trait 操作页面，方便替换实现和编写测试。

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::Result;
use crate::models::Cookie;

/// 元素快照：属性 + 文本
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ElementSnapshot {
    #[serde(default)]
    pub attributes: HashMap<String, String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl ElementSnapshot {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// 页面内 fetch 的请求参数
#[derive(Debug, Clone, Serialize)]
pub struct FetchRequest {
    pub method: String,
    pub headers: HashMap<String, String>,
    pub body: Option<String>,
}

impl FetchRequest {
    /// JSON POST
    pub fn post_json(body: &impl Serialize, headers: HashMap<String, String>) -> Result<Self> {
        Ok(Self {
            method: "POST".to_string(),
            headers,
            body: Some(serde_json::to_string(body)?),
        })
    }
}

/// 页面内 fetch 的响应
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FetchResponse {
    pub ok: bool,
    pub status: u16,
    #[serde(default)]
    pub json: JsonValue,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// fetch 本身抛出的异常
    #[serde(default)]
    pub error: Option<String>,
}

/// 浏览器会话能力
///
/// 只有一个页面，所有调用串行执行。
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// 导航到指定地址
    async fn goto_url(&self, url: &str) -> Result<()>;

    /// 当前地址
    async fn current_url(&self) -> Result<String>;

    /// 向输入框输入文本
    async fn type_into(&self, selector: &str, text: &str) -> Result<()>;

    /// 点击元素
    async fn click(&self, selector: &str) -> Result<()>;

    /// 等待页面跳转完成
    async fn wait_for_navigation(&self) -> Result<()>;

    /// 查询所有匹配元素
    async fn query_all(&self, selector: &str) -> Result<Vec<ElementSnapshot>>;

    /// 读取浏览器中的全部 Cookie
    async fn get_cookies(&self) -> Result<Vec<Cookie>>;

    /// 写入 Cookie
    async fn set_cookies(&self, cookies: &[Cookie]) -> Result<()>;

    /// 在页面网络上下文中执行 fetch，共享 Cookie
    async fn evaluate_remote_fetch(&self, url: &str, request: &FetchRequest)
        -> Result<FetchResponse>;

    /// 页面发往 OAuth 回调端点的请求地址，按发出顺序
    async fn request_log(&self) -> Result<Vec<String>>;
}
