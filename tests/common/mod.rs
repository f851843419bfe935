//! 集成测试用的脚本化依赖
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};

use lms_autopilot::error::{AppError, BrowserError, Result};
use lms_autopilot::infrastructure::{BrowserSession, ElementSnapshot, FetchRequest, FetchResponse};
use lms_autopilot::models::{Cookie, Slide, SlideType};
use lms_autopilot::services::{
    CourseService, FileAnswerCache, QuizAnswerResolver, TextCompletionService,
};
use lms_autopilot::{Config, SlideFlow};

pub const DOMAIN: &str = "https://lms.ptit.edu.vn/";

enum FakeReply {
    Json(JsonValue),
    NetworkError(String),
}

/// 脚本化的浏览器会话
///
/// 每个接口路径一个回复队列，队列只剩一条时重复使用。
#[derive(Default)]
pub struct FakeSession {
    replies: Mutex<HashMap<String, VecDeque<FakeReply>>>,
    calls: Mutex<Vec<(String, JsonValue)>>,
    elements: Mutex<HashMap<String, Vec<ElementSnapshot>>>,
    elements_once: Mutex<HashMap<String, VecDeque<Vec<ElementSnapshot>>>>,
    current_url: Mutex<String>,
    url_after_submit: Mutex<Option<String>>,
    sso_landing: Mutex<Option<String>>,
    logged_in: Mutex<bool>,
    cookies: Mutex<Vec<Cookie>>,
    requests: Mutex<Vec<String>>,
    visited: Mutex<Vec<String>>,
    clicks: Mutex<Vec<String>>,
    typed: Mutex<Vec<(String, String)>>,
}

impl FakeSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, path: &str, body: JsonValue) -> Self {
        self.push(path, FakeReply::Json(body));
        self
    }

    pub fn fail(self, path: &str, message: &str) -> Self {
        self.push(path, FakeReply::NetworkError(message.to_string()));
        self
    }

    pub fn with_elements(self, selector: &str, elements: Vec<ElementSnapshot>) -> Self {
        self.elements
            .lock()
            .unwrap()
            .insert(selector.to_string(), elements);
        self
    }

    /// 先于 `with_elements` 返回的一次性查询结果
    pub fn with_elements_once(self, selector: &str, elements: Vec<ElementSnapshot>) -> Self {
        self.elements_once
            .lock()
            .unwrap()
            .entry(selector.to_string())
            .or_default()
            .push_back(elements);
        self
    }

    /// 登录成功后再访问认证服务会直接跳到 `url`，登录表单不再出现
    pub fn remember_login(self, url: &str) -> Self {
        *self.sso_landing.lock().unwrap() = Some(url.to_string());
        self
    }

    /// 点击登录后 wait_for_navigation 跳转到的地址
    pub fn navigate_after_submit(self, url: &str) -> Self {
        *self.url_after_submit.lock().unwrap() = Some(url.to_string());
        self
    }

    pub fn with_cookie(self, name: &str, value: &str) -> Self {
        self.cookies.lock().unwrap().push(Cookie {
            name: name.to_string(),
            value: value.to_string(),
            domain: "lms.ptit.edu.vn".to_string(),
            path: "/".to_string(),
            secure: true,
            http_only: true,
            expires: None,
        });
        self
    }

    pub fn with_request(self, url: &str) -> Self {
        self.requests.lock().unwrap().push(url.to_string());
        self
    }

    fn push(&self, path: &str, reply: FakeReply) {
        self.replies
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back(reply);
    }

    /// 某个接口收到的全部 params
    pub fn calls_to(&self, path: &str) -> Vec<JsonValue> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| p == path)
            .map(|(_, params)| params.clone())
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().unwrap().clone()
    }

    pub fn clicks(&self) -> usize {
        self.clicks.lock().unwrap().len()
    }

    pub fn typed(&self) -> Vec<(String, String)> {
        self.typed.lock().unwrap().clone()
    }
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn goto_url(&self, url: &str) -> Result<()> {
        self.visited.lock().unwrap().push(url.to_string());
        let on_idp = url::Url::parse(url)
            .map(|u| u.host_str() == Some("slinkid.ptit.edu.vn"))
            .unwrap_or(false);
        let landing = self.sso_landing.lock().unwrap().clone();
        let target = match landing {
            Some(landing) if on_idp && *self.logged_in.lock().unwrap() => landing,
            _ => url.to_string(),
        };
        *self.current_url.lock().unwrap() = target;
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.current_url.lock().unwrap().clone())
    }

    async fn type_into(&self, selector: &str, text: &str) -> Result<()> {
        let on_lms = url::Url::parse(&self.current_url.lock().unwrap())
            .map(|u| u.host_str() == Some("lms.ptit.edu.vn"))
            .unwrap_or(false);
        if on_lms {
            return Err(AppError::Browser(BrowserError::ElementNotFound {
                selector: selector.to_string(),
            }));
        }
        self.typed
            .lock()
            .unwrap()
            .push((selector.to_string(), text.to_string()));
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.clicks.lock().unwrap().push(selector.to_string());
        Ok(())
    }

    async fn wait_for_navigation(&self) -> Result<()> {
        if let Some(url) = self.url_after_submit.lock().unwrap().clone() {
            *self.current_url.lock().unwrap() = url;
            *self.logged_in.lock().unwrap() = true;
        }
        Ok(())
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<ElementSnapshot>> {
        let scripted = self
            .elements_once
            .lock()
            .unwrap()
            .get_mut(selector)
            .and_then(VecDeque::pop_front);
        if let Some(elements) = scripted {
            return Ok(elements);
        }
        Ok(self
            .elements
            .lock()
            .unwrap()
            .get(selector)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_cookies(&self) -> Result<Vec<Cookie>> {
        Ok(self.cookies.lock().unwrap().clone())
    }

    async fn set_cookies(&self, _cookies: &[Cookie]) -> Result<()> {
        Ok(())
    }

    async fn evaluate_remote_fetch(
        &self,
        url: &str,
        request: &FetchRequest,
    ) -> Result<FetchResponse> {
        let path = url::Url::parse(url).unwrap().path().to_string();
        let body: JsonValue = serde_json::from_str(request.body.as_deref().unwrap_or("null"))?;
        assert_eq!(body["jsonrpc"], "2.0");
        self.calls
            .lock()
            .unwrap()
            .push((path.clone(), body["params"].clone()));

        let mut replies = self.replies.lock().unwrap();
        let queue = replies.entry(path.clone()).or_default();
        let reply = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().map(|r| match r {
                FakeReply::Json(v) => FakeReply::Json(v.clone()),
                FakeReply::NetworkError(m) => FakeReply::NetworkError(m.clone()),
            })
        };

        Ok(match reply {
            Some(FakeReply::Json(json)) => FetchResponse {
                ok: true,
                status: 200,
                json,
                ..Default::default()
            },
            Some(FakeReply::NetworkError(message)) => FetchResponse {
                error: Some(message),
                ..Default::default()
            },
            None => FetchResponse {
                error: Some(format!("没有为 {} 准备回复", path)),
                ..Default::default()
            },
        })
    }

    async fn request_log(&self) -> Result<Vec<String>> {
        Ok(self.requests.lock().unwrap().clone())
    }
}

/// 按顺序返回预设回复的 LLM
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<std::result::Result<String, String>>>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn new(replies: Vec<std::result::Result<&str, &str>>) -> Self {
        Self {
            replies: Mutex::new(
                replies
                    .into_iter()
                    .map(|r| r.map(str::to_string).map_err(str::to_string))
                    .collect(),
            ),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextCompletionService for ScriptedLlm {
    async fn send_prompt(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(AppError::llm_api_failed(
                "fake-model",
                std::io::Error::other(message),
            )),
            None => Err(AppError::llm_api_failed(
                "fake-model",
                std::io::Error::other("没有更多预设回复"),
            )),
        }
    }
}

// ========== 构造辅助函数 ==========

pub fn rpc_ok(result: JsonValue) -> JsonValue {
    json!({"jsonrpc": "2.0", "id": 1, "result": result})
}

pub fn rpc_fault(code: i64, message: &str) -> JsonValue {
    json!({"jsonrpc": "2.0", "id": 1, "error": {"code": code, "message": message}})
}

pub fn element(attributes: &[(&str, &str)], text: Option<&str>) -> ElementSnapshot {
    ElementSnapshot {
        attributes: attributes
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        text: text.map(str::to_string),
    }
}

pub fn slide(id: &str, slide_type: SlideType, completed: u8) -> Slide {
    Slide {
        id: id.to_string(),
        slug: format!("bai-{}", id),
        title: Some(format!("Bài {}", id)),
        slide_type,
        completed,
        access_allowed: true,
        href: format!("{}slides/slide/bai-{}?fullscreen=1", DOMAIN, id),
        embed_code: None,
    }
}

/// 测验内容；`hints` 为 true 时所有选项带 is_correct（即已提交）
pub fn quiz(questions: &[(i64, &[i64])], hints: bool) -> JsonValue {
    let slide_questions: Vec<JsonValue> = questions
        .iter()
        .map(|(id, options)| {
            json!({
                "id": id,
                "question": format!("Câu hỏi {}", id),
                "answer_ids": options.iter().enumerate().map(|(i, o)| json!({
                    "id": o,
                    "text_value": format!("Lựa chọn {}", i),
                    "is_correct": if hints { json!(i == 0) } else { JsonValue::Null },
                })).collect::<Vec<_>>(),
            })
        })
        .collect();
    rpc_ok(json!({ "slide_questions": slide_questions, "quiz_attempts_count": 0 }))
}

/// 所有等待都为 0 的配置
pub fn test_config(store_dir: &std::path::Path) -> Config {
    Config {
        username: "B21DCCN001".to_string(),
        password: "mat-khau".to_string(),
        course_url: format!("{}slides/co-so-du-lieu-12", DOMAIN),
        lms_domain: DOMAIN.to_string(),
        max_retry: 1,
        retry_wait_ms: 0,
        quiz_max_retry: 1,
        quiz_retry_wait_ms: 0,
        bootstrap_max_retry: 1,
        bootstrap_retry_wait_ms: 0,
        delay_between_slide_ms: 0,
        answer_store_dir: store_dir.display().to_string(),
        ..Config::default()
    }
}

pub const COURSE_KEY: &str = "co-so-du-lieu-12";

pub fn course(session: &Arc<FakeSession>) -> Arc<CourseService> {
    Arc::new(CourseService::new(session.clone(), DOMAIN, COURSE_KEY))
}

pub fn flow(
    session: &Arc<FakeSession>,
    llm: &Arc<ScriptedLlm>,
    cache: &Arc<FileAnswerCache>,
    config: &Config,
) -> SlideFlow {
    let course = course(session);
    let resolver = QuizAnswerResolver::new(
        course.clone(),
        llm.clone(),
        cache.clone(),
        config.quiz_max_retry,
        config.quiz_retry_wait(),
        config.allow_random_fallback,
    );
    SlideFlow::new(course, resolver, config.check_slide_access)
}
