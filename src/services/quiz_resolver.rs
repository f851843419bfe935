//! 测验作答 - 业务能力层
//!
//! 按 "已提交 → 缓存 → LLM → 随机兜底" 的顺序解决一个测验课件。

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, error, info, warn};

use crate::error::{AppError, Result};
use crate::models::{AnswerRecord, QuizContent, QuizQuestion, Slide, SubmitOutcome};
use crate::services::answer_cache::{lookup_answers, AnswerCache};
use crate::services::course_service::CourseService;
use crate::services::llm_service::{build_answer_prompt, parse_answer_response, TextCompletionService};
use crate::workflow::retry::{self, RetryPolicy};

/// 随机兜底只在前 4 个选项里挑
const HEURISTIC_OPTION_LIMIT: usize = 4;

/// 答案来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerSource {
    Cache,
    Llm,
    Heuristic,
}

/// 测验处理结果
#[derive(Debug, Clone, PartialEq)]
pub enum QuizOutcome {
    /// 之前已经提交过
    AlreadySubmitted,
    /// 本次提交被接受（或服务器确认已完成）
    Submitted(AnswerSource),
    /// 测验未开放
    NotOpen,
    /// 所有方式都失败
    Unresolved(String),
}

/// 测验作答服务
///
/// 职责：
/// - 判断测验是否已提交
/// - 依次尝试缓存答案、LLM 答案、随机兜底
/// - LLM 答案被接受后写入缓存
pub struct QuizAnswerResolver {
    course: Arc<CourseService>,
    llm: Arc<dyn TextCompletionService>,
    cache: Arc<dyn AnswerCache>,
    max_retries: u32,
    retry_wait: Duration,
    allow_random_fallback: bool,
}

impl QuizAnswerResolver {
    pub fn new(
        course: Arc<CourseService>,
        llm: Arc<dyn TextCompletionService>,
        cache: Arc<dyn AnswerCache>,
        max_retries: u32,
        retry_wait: Duration,
        allow_random_fallback: bool,
    ) -> Self {
        Self {
            course,
            llm,
            cache,
            max_retries,
            retry_wait,
            allow_random_fallback,
        }
    }

    /// 处理一个测验课件
    ///
    /// 所有失败都以 `QuizOutcome::Unresolved` 返回，不向上抛错。
    pub async fn resolve(&self, slide: &Slide) -> QuizOutcome {
        let title = slide.display_title();

        if self.check_submitted(slide).await {
            info!("✓ 测验 [{}] 之前已提交", title);
            return QuizOutcome::AlreadySubmitted;
        }

        let Some(content) = self.fetch_content(slide).await else {
            return QuizOutcome::Unresolved("无法获取测验内容".to_string());
        };
        if content.slide_questions.is_empty() {
            return QuizOutcome::Unresolved("测验没有题目".to_string());
        }
        debug!("测验 [{}] 内容:\n{}", title, content.to_plain_text());

        let questions = &content.slide_questions;

        // 1. 缓存：只有全部命中才直接提交
        let cached = self.cached_answers(questions).await;
        let known = if !cached.is_empty() && cached.len() == questions.len() {
            info!("📦 测验 [{}] 的 {} 道题全部在缓存中找到", title, cached.len());
            match self.submit(slide, &cached).await {
                Some(SubmitOutcome::Accepted) | Some(SubmitOutcome::AlreadyDone) => {
                    return QuizOutcome::Submitted(AnswerSource::Cache);
                }
                Some(SubmitOutcome::NotOpen) => return QuizOutcome::NotOpen,
                Some(SubmitOutcome::Rejected(reason)) => {
                    warn!("⚠️ 缓存答案被拒绝: {}，改用 LLM", reason);
                }
                None => warn!("⚠️ 缓存答案提交失败，改用 LLM"),
            }
            Vec::new()
        } else {
            if !cached.is_empty() {
                info!(
                    "📦 测验 [{}] 缓存命中 {}/{} 题，其余交给 LLM",
                    title,
                    cached.len(),
                    questions.len()
                );
            }
            cached
        };

        // 2. LLM 只回答缓存里没有的题
        let missing = unanswered(questions, &known);
        let llm_answers = match self.llm_answers(&missing).await {
            Ok(answers) => answers,
            Err(e) if self.allow_random_fallback => {
                warn!("⚠️ LLM 作答失败: {}，使用随机兜底", e);
                Vec::new()
            }
            Err(e) if !known.is_empty() => {
                warn!("⚠️ LLM 作答失败: {}，只提交缓存中的答案", e);
                Vec::new()
            }
            Err(e) => return QuizOutcome::Unresolved(e.to_string()),
        };

        // 3. 仍然缺答案的题：开启兜底时随机补齐，否则按现有答案提交
        let mut answers: Vec<AnswerRecord> = known.iter().chain(&llm_answers).cloned().collect();
        let mut source = AnswerSource::Llm;
        let gaps = unanswered(questions, &answers);
        if !gaps.is_empty() {
            if self.allow_random_fallback {
                let guesses = heuristic_answers(&gaps);
                if !guesses.is_empty() {
                    warn!("⚠️ {} 道题使用随机答案", guesses.len());
                    source = AnswerSource::Heuristic;
                    answers.extend(guesses);
                }
            } else {
                warn!("⚠️ 只有 {}/{} 道题有答案", answers.len(), questions.len());
            }
        }
        if answers.is_empty() {
            return QuizOutcome::Unresolved("没有可提交的答案".to_string());
        }
        sort_by_questions(&mut answers, questions);

        match self.submit(slide, &answers).await {
            Some(SubmitOutcome::Accepted) => {
                if !llm_answers.is_empty() {
                    if let Err(e) = self.cache.append(self.course.course_key(), llm_answers).await {
                        warn!("⚠️ 写入答案缓存失败: {}", e);
                    }
                }
                QuizOutcome::Submitted(source)
            }
            Some(SubmitOutcome::AlreadyDone) => QuizOutcome::Submitted(source),
            Some(SubmitOutcome::NotOpen) => QuizOutcome::NotOpen,
            Some(SubmitOutcome::Rejected(reason)) => {
                error!("❌ 答案被拒绝: {}", reason);
                QuizOutcome::Unresolved(reason)
            }
            None => QuizOutcome::Unresolved("提交答案失败".to_string()),
        }
    }

    /// 重试耗尽时按未提交处理
    async fn check_submitted(&self, slide: &Slide) -> bool {
        let policy = RetryPolicy::new("检查测验提交状态", self.max_retries, self.retry_wait)
            .give_up_when(|e: &AppError| !e.is_retryable());
        let submitted = retry::execute(&policy, || self.course.is_quiz_submitted(slide)).await;
        if submitted.is_none() {
            warn!("⚠️ 无法确认测验是否已提交，按未提交处理");
        }
        submitted.unwrap_or(false)
    }

    async fn fetch_content(&self, slide: &Slide) -> Option<QuizContent> {
        let policy = RetryPolicy::new("获取测验内容", self.max_retries, self.retry_wait)
            .give_up_when(|e: &AppError| !e.is_retryable());
        retry::execute(&policy, || self.course.fetch_quiz(slide)).await
    }

    /// 缓存读取失败时视为没有命中
    async fn cached_answers(&self, questions: &[QuizQuestion]) -> Vec<AnswerRecord> {
        match self.cache.read_all(self.course.course_key()).await {
            Ok(batches) => lookup_answers(&batches, questions),
            Err(e) => {
                warn!("⚠️ 读取答案缓存失败: {}", e);
                Vec::new()
            }
        }
    }

    async fn llm_answers(&self, questions: &[QuizQuestion]) -> Result<Vec<AnswerRecord>> {
        info!("🤖 请求 LLM 作答 {} 道题", questions.len());
        let response = self.llm.send_prompt(&build_answer_prompt(questions)).await?;
        debug!("LLM 原始响应: {}", response);
        parse_answer_response(&response, questions)
    }

    /// 只有网络错误才会重试，服务器的拒绝直接返回
    async fn submit(&self, slide: &Slide, answers: &[AnswerRecord]) -> Option<SubmitOutcome> {
        let answer_ids: Vec<i64> = answers.iter().map(|a| a.answer_id).collect();
        debug!("提交答案: {:?}", answer_ids);

        let policy = RetryPolicy::new("提交测验", self.max_retries, self.retry_wait)
            .give_up_when(|e: &AppError| !e.is_retryable());
        retry::execute(&policy, || self.course.submit_quiz(slide, &answer_ids)).await
    }
}

/// 还没有答案的题目
fn unanswered(questions: &[QuizQuestion], answers: &[AnswerRecord]) -> Vec<QuizQuestion> {
    questions
        .iter()
        .filter(|q| !answers.iter().any(|a| a.id == q.id))
        .cloned()
        .collect()
}

/// 按页面上的题目顺序排列答案
fn sort_by_questions(answers: &mut [AnswerRecord], questions: &[QuizQuestion]) {
    answers.sort_by_key(|a| {
        questions
            .iter()
            .position(|q| q.id == a.id)
            .unwrap_or(usize::MAX)
    });
}

/// 随机兜底答案
///
/// 有服务器提示时选提示的选项，否则在前 4 个选项中随机挑一个；没有选项的题目跳过。
pub fn heuristic_answers(questions: &[QuizQuestion]) -> Vec<AnswerRecord> {
    let mut rng = rand::rng();
    questions
        .iter()
        .filter_map(|q| {
            let option = match q.hinted_option() {
                Some(hinted) => hinted,
                None => {
                    let limit = q.answer_options.len().min(HEURISTIC_OPTION_LIMIT);
                    if limit == 0 {
                        return None;
                    }
                    &q.answer_options[rng.random_range(0..limit)]
                }
            };
            Some(AnswerRecord {
                id: q.id,
                question: q.question.clone(),
                answer_id: option.id,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AnswerOption;

    fn question(id: i64, options: usize) -> QuizQuestion {
        QuizQuestion {
            id,
            question: format!("Câu {}", id),
            answer_options: (0..options as i64)
                .map(|i| AnswerOption {
                    id: id * 100 + i,
                    text: format!("Lựa chọn {}", i),
                    is_correct_hint: None,
                })
                .collect(),
        }
    }

    #[test]
    fn test_heuristic_prefers_hint() {
        let mut q = question(1, 6);
        q.answer_options[5].is_correct_hint = Some(true);

        let answers = heuristic_answers(&[q]);
        assert_eq!(answers[0].answer_id, 105);
    }

    #[test]
    fn test_heuristic_stays_within_first_four() {
        let q = question(2, 6);
        for _ in 0..200 {
            let answers = heuristic_answers(std::slice::from_ref(&q));
            assert!((200..204).contains(&answers[0].answer_id));
        }
    }

    #[test]
    fn test_unanswered_and_ordering() {
        let questions = vec![question(1, 2), question(2, 2), question(3, 2)];
        let mut answers = vec![
            AnswerRecord { id: 3, question: "Câu 3".into(), answer_id: 300 },
            AnswerRecord { id: 1, question: "Câu 1".into(), answer_id: 100 },
        ];

        let gaps = unanswered(&questions, &answers);
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].id, 2);

        sort_by_questions(&mut answers, &questions);
        assert_eq!(answers.iter().map(|a| a.id).collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn test_heuristic_skips_questions_without_options() {
        let answers = heuristic_answers(&[question(3, 0), question(4, 2)]);
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].id, 4);
    }
}
