//! LMS 课程服务 - 业务能力层
//!
//! 所有 JSON-RPC 请求都通过页面内 fetch 发出，与浏览器共享 Cookie。

use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value as JsonValue};
use tracing::{debug, info, warn};

use crate::error::{ApiError, AppError, Result};
use crate::infrastructure::{BrowserSession, FetchRequest};
use crate::models::{
    decode_reply, QuizContent, QuizSubmitResult, RpcReply, RpcRequest, Slide, SubmitOutcome,
    VideoCompletion,
};

pub const SLIDE_LIST_SELECTOR: &str = ".o_wslides_fs_sidebar_list_item";

const QUIZ_GET: &str = "/slides/slide/quiz/get";
const QUIZ_SUBMIT: &str = "/slides/slide/quiz/submit";
const SET_COMPLETED: &str = "/slides/slide/set_completed";
const CHECK_ACCESS: &str = "/web/dataset/call_kw/slide.slide/check_duoc_hoc_slide";
const SEARCH_READ: &str = "/web/dataset/call_kw/slide.slide/search_read";
const LOG_TIME: &str = "/slides/slide/log_time";
const PUBLISH: &str = "/website/publish/slide";

/// 视频标记完成的响应
#[derive(Debug, Clone)]
pub struct VideoReply {
    pub completed: bool,
    /// 原始响应，用于排查
    pub raw: String,
}

/// search_read 返回的课件关联
#[derive(Debug, Clone, Deserialize)]
pub struct SlideLink {
    pub id: i64,
    /// 本课件是哪个课件的下一课
    #[serde(rename = "ke_tiep_cua", default, deserialize_with = "many2one")]
    pub next_of: Option<(i64, String)>,
}

/// LMS 课程服务
///
/// 职责：
/// - 读取课程侧边栏中的课件列表
/// - 封装测验 / 视频 / 访问检查等 JSON-RPC 接口
/// - 不关心重试和流程顺序
pub struct CourseService {
    session: Arc<dyn BrowserSession>,
    lms_domain: String,
    course_key: String,
}

impl CourseService {
    pub fn new(
        session: Arc<dyn BrowserSession>,
        lms_domain: impl Into<String>,
        course_key: impl Into<String>,
    ) -> Self {
        let course_key = course_key.into();
        info!("课程服务已初始化: {}", course_key);
        Self {
            session,
            lms_domain: lms_domain.into().trim_end_matches('/').to_string(),
            course_key,
        }
    }

    pub fn course_key(&self) -> &str {
        &self.course_key
    }

    /// 读取全屏模式侧边栏中的课件列表
    pub async fn list_slides(&self) -> Result<Vec<Slide>> {
        let elements = self.session.query_all(SLIDE_LIST_SELECTOR).await?;
        let mut slides = Vec::with_capacity(elements.len());
        for element in elements {
            let slide = Slide::from_sidebar_attributes(&element.attributes, &self.lms_domain);
            if slide.id.is_empty() {
                warn!("跳过没有 data-id 的侧边栏条目: {:?}", element.text);
                continue;
            }
            slides.push(slide);
        }
        Ok(slides)
    }

    /// 获取测验内容
    pub async fn fetch_quiz(&self, slide: &Slide) -> Result<QuizContent> {
        self.call(QUIZ_GET, json!({ "slide_id": slide.id }))
            .await?
            .into_result(QUIZ_GET)
    }

    /// 测验是否已经提交过
    pub async fn is_quiz_submitted(&self, slide: &Slide) -> Result<bool> {
        Ok(self.fetch_quiz(slide).await?.is_submitted())
    }

    /// 提交测验答案
    ///
    /// 网络错误返回 Err；服务器拒绝归类为 `SubmitOutcome::Rejected`。
    pub async fn submit_quiz(&self, slide: &Slide, answer_ids: &[i64]) -> Result<SubmitOutcome> {
        let params = json!({ "slide_id": slide.id, "answer_ids": answer_ids });
        match self.call::<QuizSubmitResult>(QUIZ_SUBMIT, params).await {
            Ok(RpcReply::Ok(result)) => {
                debug!("测验提交结果: {:?}", result);
                Ok(SubmitOutcome::from_result(&result))
            }
            Ok(RpcReply::Fault { code, message }) => {
                Ok(SubmitOutcome::Rejected(format!("code={}, {}", code, message)))
            }
            Err(AppError::Api(ApiError::UnexpectedShape { raw, .. })) => {
                Ok(SubmitOutcome::Rejected(raw))
            }
            Err(e) => Err(e),
        }
    }

    /// 标记视频已看完
    pub async fn set_video_completed(&self, slide: &Slide) -> Result<VideoReply> {
        let body = self
            .call_raw(SET_COMPLETED, json!({ "slide_id": slide.id }))
            .await?;
        let raw = body.to_string();
        let completed = match decode_reply::<VideoCompletion>(SET_COMPLETED, &body) {
            Ok(RpcReply::Ok(completion)) => completion.is_completed(),
            Ok(RpcReply::Fault { .. }) | Err(_) => false,
        };
        Ok(VideoReply { completed, raw })
    }

    /// 询问 LMS 当前账号能否学习该课件
    pub async fn check_slide_access(&self, slide: &Slide) -> Result<bool> {
        let params = json!({
            "args": [slide.id],
            "kwargs": { "context": { "website_id": 1, "lang": "vi_VN" } },
            "method": "check_duoc_hoc_slide",
            "model": "slide.slide",
        });
        self.call(CHECK_ACCESS, params).await?.into_result(CHECK_ACCESS)
    }

    /// 查找以该课件为前置的课件
    pub async fn search_next_slides(&self, slide: &Slide) -> Result<Vec<SlideLink>> {
        let params = json!({
            "args": [],
            "model": "slide.slide",
            "method": "search_read",
            "kwargs": {
                "domain": [["ke_tiep_cua", "=", slide.id]],
                "fields": ["id", "ke_tiep_cua"],
                "context": { "website_id": 1, "lang": "vi_VN" },
            },
        });
        self.call(SEARCH_READ, params).await?.into_result(SEARCH_READ)
    }

    /// 上报学习时长
    pub async fn log_time(&self, slide: &Slide) -> Result<JsonValue> {
        self.call(LOG_TIME, json!({ "slide_id": slide.id }))
            .await?
            .into_result(LOG_TIME)
    }

    /// 切换课件的发布状态（需要讲师权限）
    pub async fn publish_slide(&self, slide: &Slide) -> Result<JsonValue> {
        let id: i64 = slide.id.parse().map_err(|_| {
            AppError::Api(ApiError::RequestFailed {
                endpoint: PUBLISH.to_string(),
                message: format!("课件 id 不是数字: {}", slide.id),
            })
        })?;
        self.call(PUBLISH, json!({ "id": id }))
            .await?
            .into_result(PUBLISH)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        path: &str,
        params: impl Serialize,
    ) -> Result<RpcReply<T>> {
        let body = self.call_raw(path, params).await?;
        decode_reply(path, &body)
    }

    /// 发送 JSON-RPC 请求，返回响应体
    async fn call_raw(&self, path: &str, params: impl Serialize) -> Result<JsonValue> {
        let url = format!("{}{}", self.lms_domain, path);
        let request = FetchRequest::post_json(&RpcRequest::call(params), Self::headers())?;

        debug!("JSON-RPC 请求: {}", url);
        let response = self.session.evaluate_remote_fetch(&url, &request).await?;

        if let Some(message) = response.error {
            return Err(AppError::Api(ApiError::RequestFailed {
                endpoint: path.to_string(),
                message,
            }));
        }
        if !response.ok {
            return Err(AppError::Api(ApiError::HttpStatus {
                endpoint: path.to_string(),
                status: response.status,
            }));
        }
        Ok(response.json)
    }

    fn headers() -> HashMap<String, String> {
        [
            ("accept", "application/json, text/javascript, */*; q=0.01"),
            ("accept-language", "vi,en-US;q=0.9,en;q=0.8"),
            ("content-type", "application/json"),
            ("x-requested-with", "XMLHttpRequest"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }
}

/// Odoo many2one 字段：`[id, "名称"]` 或 `false`
fn many2one<'de, D>(deserializer: D) -> std::result::Result<Option<(i64, String)>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = JsonValue::deserialize(deserializer)?;
    Ok(serde_json::from_value::<(i64, String)>(value).ok())
}
