use serde::{Deserialize, Deserializer, Serialize};

/// 测验中的一个选项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub id: i64,
    #[serde(rename = "text_value", default, deserialize_with = "lenient_string")]
    pub text: String,
    /// 服务器有时会给出正确答案，有时为 null
    #[serde(rename = "is_correct", default)]
    pub is_correct_hint: Option<bool>,
}

/// 测验中的一道题
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub id: i64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub question: String,
    #[serde(rename = "answer_ids", default)]
    pub answer_options: Vec<AnswerOption>,
}

impl QuizQuestion {
    /// 答案 id 是否属于本题
    pub fn has_option(&self, answer_id: i64) -> bool {
        self.answer_options.iter().any(|o| o.id == answer_id)
    }

    /// 服务器标记为正确的选项
    pub fn hinted_option(&self) -> Option<&AnswerOption> {
        self.answer_options
            .iter()
            .find(|o| o.is_correct_hint == Some(true))
    }
}

/// `/slides/slide/quiz/get` 的 result
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuizContent {
    #[serde(default)]
    pub slide_questions: Vec<QuizQuestion>,
    #[serde(default)]
    pub quiz_attempts_count: Option<u32>,
    #[serde(default)]
    pub quiz_karma_won: Option<i64>,
    #[serde(default)]
    pub error: Option<String>,
}

impl QuizContent {
    /// 是否已经提交过
    ///
    /// 提交后服务器会回显正确答案；所有选项的提示都为 null 说明还没提交。
    pub fn is_submitted(&self) -> bool {
        if self.error.is_some() || self.slide_questions.is_empty() {
            return false;
        }
        !self
            .slide_questions
            .iter()
            .all(|q| q.answer_options.iter().all(|a| a.is_correct_hint.is_none()))
    }

    /// 渲染成 "1, 题干: A. ... B. ..." 的纯文本
    pub fn to_plain_text(&self) -> String {
        self.slide_questions
            .iter()
            .enumerate()
            .map(|(index, q)| {
                let options = q
                    .answer_options
                    .iter()
                    .enumerate()
                    .map(|(i, o)| format!("{}. {}", (b'A' + (i % 26) as u8) as char, o.text))
                    .collect::<Vec<_>>()
                    .join("\n");
                format!("{}, {}: \n{}", index + 1, q.question, options)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// 一条已解析的答案 `{id, question, answer_id}`
///
/// 既是答案缓存文件的记录格式，也是 LLM 必须返回的格式。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    /// 题目 id
    pub id: i64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub question: String,
    pub answer_id: i64,
}

/// `/slides/slide/quiz/submit` 的 result
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuizSubmitResult {
    #[serde(default)]
    pub channel_completion: Option<f64>,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(rename = "quizAttemptsCount", default)]
    pub quiz_attempts_count: Option<u32>,
    #[serde(rename = "quizKarmaWon", default)]
    pub quiz_karma_won: Option<i64>,
    #[serde(default)]
    pub error: Option<String>,
}

/// `/slides/slide/set_completed` 的 result
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoCompletion {
    #[serde(default)]
    pub channel_completion: f64,
}

impl VideoCompletion {
    pub fn is_completed(&self) -> bool {
        self.channel_completion > 0.0
    }
}

/// 测验提交结果分类
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// 服务器接受了答案
    Accepted,
    /// slide_quiz_done
    AlreadyDone,
    /// slide_quiz_incomplete: 测验未开放或未完成前置内容
    NotOpen,
    /// 其他错误或缺少 result
    Rejected(String),
}

pub const QUIZ_INCOMPLETE: &str = "slide_quiz_incomplete";
pub const QUIZ_DONE: &str = "slide_quiz_done";

impl SubmitOutcome {
    pub fn from_result(result: &QuizSubmitResult) -> Self {
        match result.error.as_deref() {
            None => SubmitOutcome::Accepted,
            Some(QUIZ_DONE) => SubmitOutcome::AlreadyDone,
            Some(QUIZ_INCOMPLETE) => SubmitOutcome::NotOpen,
            Some(other) => SubmitOutcome::Rejected(other.to_string()),
        }
    }
}

/// Odoo 对空字符串字段会返回 `false`
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrOther {
        Str(String),
        Other(serde_json::Value),
    }

    Ok(match StringOrOther::deserialize(deserializer)? {
        StringOrOther::Str(s) => s,
        StringOrOther::Other(_) => String::new(),
    })
}
