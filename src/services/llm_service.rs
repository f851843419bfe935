//! LLM 服务 - 业务能力层
//!
//! 只负责"让 LLM 作答"能力，不关心流程
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 默认走 Gemini 的 OpenAI 兼容端点，也可以换成其他兼容服务

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{AppError, LlmError, Result};
use crate::models::{AnswerRecord, QuizQuestion};

const SYSTEM_MESSAGE: &str = "You answer multiple-choice quizzes. \
    Reply with raw JSON only: no markdown, no code fences, no explanations.";

/// 文本补全能力
///
/// 测试中可以用脚本化的实现替换真实的 LLM。
#[async_trait]
pub trait TextCompletionService: Send + Sync {
    async fn send_prompt(&self, prompt: &str) -> Result<String>;
}

/// LLM 服务
///
/// 职责：
/// - 调用兼容 OpenAI API 的 LLM
/// - 只处理纯文本提示词
/// - 不认识课件 / 缓存
pub struct LlmService {
    client: Client<OpenAIConfig>,
    model_name: String,
}

impl LlmService {
    /// 创建新的 LLM 服务
    pub fn new(config: &Config) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        Self {
            client: Client::with_config(openai_config),
            model_name: config.llm_model_name.clone(),
        }
    }

    /// 通用的 LLM 调用函数
    ///
    /// # 参数
    /// - `user_message`: 用户消息内容
    /// - `system_message`: 系统消息（可选）
    ///
    /// # 返回
    /// 去掉首尾空白后的响应文本
    pub async fn send_to_llm(
        &self,
        user_message: &str,
        system_message: Option<&str>,
    ) -> Result<String> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("用户消息长度: {} 字符", user_message.len());

        let build_failed = |e| AppError::llm_api_failed(&self.model_name, e);

        let mut messages = Vec::new();
        if let Some(sys_msg) = system_message {
            let system_msg = ChatCompletionRequestSystemMessageArgs::default()
                .content(sys_msg)
                .build()
                .map_err(build_failed)?;
            messages.push(ChatCompletionRequestMessage::System(system_msg));
        }

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(user_message)
            .build()
            .map_err(build_failed)?;
        messages.push(ChatCompletionRequestMessage::User(user_msg));

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .temperature(0.3)
            .max_tokens(8192u32)
            .build()
            .map_err(build_failed)?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            AppError::llm_api_failed(&self.model_name, e)
        })?;

        debug!("LLM API 调用成功");

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| LlmError::EmptyContent {
                model: self.model_name.clone(),
            })?;

        Ok(content.trim().to_string())
    }
}

#[async_trait]
impl TextCompletionService for LlmService {
    async fn send_prompt(&self, prompt: &str) -> Result<String> {
        self.send_to_llm(prompt, Some(SYSTEM_MESSAGE)).await
    }
}

/// 构建作答提示词
///
/// 题目以 JSON 形式给出（只保留题干和选项），要求模型返回严格的 JSON 数组。
pub fn build_answer_prompt(questions: &[QuizQuestion]) -> String {
    let quiz: Vec<serde_json::Value> = questions
        .iter()
        .map(|q| {
            serde_json::json!({
                "id": q.id,
                "question": q.question,
                "answer_ids": q.answer_options.iter().map(|o| {
                    serde_json::json!({ "id": o.id, "text_value": o.text })
                }).collect::<Vec<_>>(),
            })
        })
        .collect();
    let quiz_json = serde_json::to_string_pretty(&quiz).unwrap_or_default();

    format!(
        r#"Below is a quiz as JSON. Every question has an "id", a "question" text and a list of options in "answer_ids".
Pick exactly one correct option for every question.

Answer format:
- Return a JSON array, one element per question, in the same order.
- Each element is {{"id": <question id>, "question": "<question text>", "answer_id": <id of the chosen option>}}.
- "answer_id" must be one of the option ids of that question.
- Output only the JSON array. Do not wrap it in ``` fences and do not add any text before or after it.

Quiz:
{}"#,
        quiz_json
    )
}

/// 解析 LLM 返回的答案
///
/// 去掉可能存在的代码块标记后按 JSON 解析；选项 id 不属于对应题目的答案会被丢弃，
/// 结果按页面上的题目顺序排列。没有任何可用答案时返回错误。
pub fn parse_answer_response(
    response: &str,
    questions: &[QuizQuestion],
) -> Result<Vec<AnswerRecord>> {
    let cleaned = strip_code_fences(response);

    let records: Vec<AnswerRecord> = serde_json::from_str(&cleaned).map_err(|e| {
        AppError::Llm(LlmError::AnswerParseFailed {
            response: truncate(response, 200),
            source: Box::new(e),
        })
    })?;

    let mut answers = Vec::with_capacity(questions.len());
    for question in questions {
        let Some(record) = records.iter().find(|r| r.id == question.id) else {
            warn!("LLM 没有回答题目 {}", question.id);
            continue;
        };
        if !question.has_option(record.answer_id) {
            warn!(
                "LLM 为题目 {} 给出的选项 {} 不存在，已丢弃",
                question.id, record.answer_id
            );
            continue;
        }
        answers.push(AnswerRecord {
            id: question.id,
            question: question.question.clone(),
            answer_id: record.answer_id,
        });
    }

    if answers.is_empty() {
        return Err(LlmError::NoUsableAnswer.into());
    }
    Ok(answers)
}

fn strip_code_fences(response: &str) -> String {
    match Regex::new(r"(?i)```(?:json)?") {
        Ok(fence) => fence.replace_all(response, "").trim().to_string(),
        Err(_) => response.trim().to_string(),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    }
}
