//! JS 执行器 - 基础设施层
//!
//! 持有唯一的 page 资源，基于 chromiumoxide 实现 `BrowserSession`

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::{CookieParam, EventRequestWillBeSent};
use chromiumoxide::cdp::browser_protocol::page::SetBypassCspParams;
use chromiumoxide::Page;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::error::{AppError, BrowserError, Result};
use crate::infrastructure::browser_session::{
    BrowserSession, ElementSnapshot, FetchRequest, FetchResponse,
};
use crate::models::Cookie;
use crate::utils::url::same_endpoint;

/// JS 执行器
///
/// 职责：
/// - 持有唯一的 Page 资源
/// - 记录页面发往 OAuth 回调端点的请求地址
/// - 不认识课件 / 测验
pub struct JsExecutor {
    page: Page,
    requests: Arc<Mutex<Vec<String>>>,
}

impl JsExecutor {
    /// 接管页面，只记录发往 `watched_endpoint` 的请求
    pub async fn new(page: Page, watched_endpoint: impl Into<String>) -> Result<Self> {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let endpoint = watched_endpoint.into();

        let mut events = page.event_listener::<EventRequestWillBeSent>().await?;
        let sink = Arc::clone(&requests);
        tokio::spawn(async move {
            while let Some(event) = events.next().await {
                record_if_watched(&sink, &endpoint, &event.request.url);
            }
        });

        // 课程页带有 CSP，页面内 fetch 需要绕过
        page.execute(SetBypassCspParams::new(true)).await?;

        Ok(Self { page, requests })
    }

    /// 获取 page 的引用
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// 执行 JS 代码并返回 JSON 结果
    pub async fn eval(&self, js_code: impl Into<String>) -> Result<JsonValue> {
        let result = self.page.evaluate(js_code.into()).await?;
        let json_value = result.into_value()?;
        Ok(json_value)
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> Result<T> {
        let json_value = self.eval(js_code).await?;
        let typed_value = serde_json::from_value(json_value)?;
        Ok(typed_value)
    }
}

#[async_trait]
impl BrowserSession for JsExecutor {
    async fn goto_url(&self, url: &str) -> Result<()> {
        debug!("导航到: {}", url);
        self.page
            .goto(url)
            .await
            .map_err(|e| AppError::navigation_failed(url, e))?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    async fn type_into(&self, selector: &str, text: &str) -> Result<()> {
        let element = self.page.find_element(selector).await.map_err(|_| {
            AppError::Browser(BrowserError::ElementNotFound {
                selector: selector.to_string(),
            })
        })?;
        element.click().await?;
        element.type_str(text).await?;
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let element = self.page.find_element(selector).await.map_err(|_| {
            AppError::Browser(BrowserError::ElementNotFound {
                selector: selector.to_string(),
            })
        })?;
        element.click().await?;
        Ok(())
    }

    async fn wait_for_navigation(&self) -> Result<()> {
        self.page.wait_for_navigation().await?;
        Ok(())
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<ElementSnapshot>> {
        let js_code = format!(
            r#"
            (() => {{
                return Array.from(document.querySelectorAll({})).map(el => ({{
                    attributes: Object.fromEntries(Array.from(el.attributes).map(a => [a.name, a.value])),
                    text: el.textContent ? el.textContent.trim() : null
                }}));
            }})()
            "#,
            serde_json::to_string(selector)?
        );
        self.eval_as(js_code).await
    }

    async fn get_cookies(&self) -> Result<Vec<Cookie>> {
        let cookies = self
            .page
            .get_cookies()
            .await?
            .iter()
            .map(|c| Cookie {
                name: c.name.clone(),
                value: c.value.clone(),
                domain: c.domain.clone(),
                path: c.path.clone(),
                secure: c.secure,
                http_only: c.http_only,
                expires: if c.session { None } else { Some(c.expires) },
            })
            .collect();
        Ok(cookies)
    }

    async fn set_cookies(&self, cookies: &[Cookie]) -> Result<()> {
        let params = cookies
            .iter()
            .map(|c| {
                CookieParam::builder()
                    .name(c.name.clone())
                    .value(c.value.clone())
                    .domain(c.domain.clone())
                    .path(c.path.clone())
                    .secure(c.secure)
                    .http_only(c.http_only)
                    .build()
                    .map_err(|message| AppError::Browser(BrowserError::CookieFailed { message }))
            })
            .collect::<Result<Vec<_>>>()?;

        if params.is_empty() {
            return Ok(());
        }
        self.page.set_cookies(params).await?;
        Ok(())
    }

    async fn evaluate_remote_fetch(
        &self,
        url: &str,
        request: &FetchRequest,
    ) -> Result<FetchResponse> {
        let js_code = format!(
            r#"
            (async () => {{
                try {{
                    const response = await fetch({}, {});
                    let json = null;
                    try {{
                        json = await response.json();
                    }} catch (e) {{
                        json = null;
                    }}
                    const headers = {{}};
                    response.headers.forEach((value, key) => {{ headers[key] = value; }});
                    return {{ ok: response.ok, status: response.status, json, headers }};
                }} catch (error) {{
                    return {{ ok: false, status: 0, json: null, headers: {{}}, error: error.message }};
                }}
            }})()
            "#,
            serde_json::to_string(url)?,
            serde_json::to_string(request)?
        );
        self.eval_as(js_code).await
    }

    async fn request_log(&self) -> Result<Vec<String>> {
        let log = self
            .requests
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default();
        Ok(log)
    }
}

fn record_if_watched(log: &Mutex<Vec<String>>, endpoint: &str, url: &str) {
    if !same_endpoint(url, endpoint) {
        return;
    }
    if let Ok(mut log) = log.lock() {
        log.push(url.to_string());
    }
}
