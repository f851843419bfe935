//! 有界重试
//!
//! 固定间隔（非指数退避）。`max_retries` 是首次调用失败后的额外重试次数，
//! 总调用次数为 `max_retries + 1`。耗尽后返回 `None`，不向上抛出错误。

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{error, warn};

type Predicate<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;
type ErrorPredicate<E> = Box<dyn Fn(&E) -> bool + Send + Sync>;
type Hook = Box<dyn Fn(u32) + Send + Sync>;

/// 重试策略
pub struct RetryPolicy<T, E> {
    name: String,
    max_retries: u32,
    wait: Duration,
    success_predicate: Option<Predicate<T>>,
    give_up_when: Option<ErrorPredicate<E>>,
    on_attempt_failed: Option<Hook>,
    on_exhausted: Option<Hook>,
}

impl<T, E> RetryPolicy<T, E> {
    pub fn new(name: impl Into<String>, max_retries: u32, wait: Duration) -> Self {
        Self {
            name: name.into(),
            max_retries,
            wait,
            success_predicate: None,
            give_up_when: None,
            on_attempt_failed: None,
            on_exhausted: None,
        }
    }

    /// 结果不满足条件时按失败处理
    pub fn with_condition(mut self, predicate: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        self.success_predicate = Some(Box::new(predicate));
        self
    }

    /// 遇到满足条件的错误时不再重试
    pub fn give_up_when(mut self, predicate: impl Fn(&E) -> bool + Send + Sync + 'static) -> Self {
        self.give_up_when = Some(Box::new(predicate));
        self
    }

    /// 每次失败且还会重试时调用，参数为已失败的次数
    pub fn on_attempt_failed(mut self, hook: impl Fn(u32) + Send + Sync + 'static) -> Self {
        self.on_attempt_failed = Some(Box::new(hook));
        self
    }

    /// 放弃时调用一次，参数为总调用次数
    pub fn on_exhausted(mut self, hook: impl Fn(u32) + Send + Sync + 'static) -> Self {
        self.on_exhausted = Some(Box::new(hook));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }
}

/// 执行带重试的异步操作
///
/// 成功（且满足条件）立即返回 `Some`；耗尽或遇到不可重试错误返回 `None`。
pub async fn execute<T, E, F, Fut>(policy: &RetryPolicy<T, E>, mut operation: F) -> Option<T>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;

        let failure = match operation().await {
            Ok(value) => match &policy.success_predicate {
                Some(predicate) if !predicate(&value) => "条件不满足".to_string(),
                _ => return Some(value),
            },
            Err(e) => {
                if policy.give_up_when.as_ref().is_some_and(|stop| stop(&e)) {
                    error!("[{}] 第 {} 次尝试遇到不可重试错误: {}", policy.name, attempt, e);
                    if let Some(hook) = &policy.on_exhausted {
                        hook(attempt);
                    }
                    return None;
                }
                e.to_string()
            }
        };

        if attempt > policy.max_retries {
            error!(
                "[{}] 已尝试 {} 次仍然失败: {}",
                policy.name, attempt, failure
            );
            if let Some(hook) = &policy.on_exhausted {
                hook(attempt);
            }
            return None;
        }

        if let Some(hook) = &policy.on_attempt_failed {
            hook(attempt);
        }
        warn!(
            "[{}] 第 {} 次尝试失败: {}，{:.1} 秒后重试...",
            policy.name,
            attempt,
            failure,
            policy.wait.as_secs_f64()
        );
        sleep(policy.wait).await;
    }
}
