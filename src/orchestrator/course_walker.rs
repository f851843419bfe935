//! 课程遍历器 - 编排层
//!
//! ## 职责
//!
//! 1. **逐个处理**：按页面顺序把每个课件交给 `SlideFlow`
//! 2. **失败隔离**：单个课件重试耗尽后记为失败，继续下一个
//! 3. **节奏控制**：每个课件之后固定等待
//! 4. **统计输出**：完成 / 跳过 / 失败数量

use std::time::Duration;

use tracing::{error, info};

use crate::config::Config;
use crate::error::AppError;
use crate::models::Slide;
use crate::utils::logging;
use crate::workflow::retry::{self, RetryPolicy};
use crate::workflow::{SlideCtx, SlideFlow, SlideState};

/// 课程处理统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WalkReport {
    /// 还没有进入终态的课件
    pub pending: usize,
    pub completed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub total: usize,
}

impl WalkReport {
    fn new(total: usize) -> Self {
        Self {
            pending: total,
            total,
            ..Default::default()
        }
    }

    fn record(&mut self, state: SlideState) {
        let counter = match state {
            SlideState::Pending => return,
            SlideState::Completed => &mut self.completed,
            SlideState::Skipped => &mut self.skipped,
            SlideState::Failed => &mut self.failed,
        };
        *counter += 1;
        self.pending = self.pending.saturating_sub(1);
    }
}

/// 课程遍历器
pub struct CourseWalker {
    flow: SlideFlow,
    max_retries: u32,
    retry_wait: Duration,
    delay_between_slide: Duration,
}

impl CourseWalker {
    pub fn new(flow: SlideFlow, config: &Config) -> Self {
        Self {
            flow,
            max_retries: config.max_retry,
            retry_wait: config.retry_wait(),
            delay_between_slide: config.delay_between_slide(),
        }
    }

    /// 依次处理给定的课件
    pub async fn walk(&self, slides: &[Slide]) -> WalkReport {
        let mut report = WalkReport::new(slides.len());

        for (index, slide) in slides.iter().enumerate() {
            let ctx = SlideCtx::new(index + 1, slides.len(), &slide.id);
            logging::log_slide_start(
                ctx.slide_index,
                ctx.total,
                slide.display_title(),
                slide.slide_type.as_str(),
            );

            let state = self.process_slide(slide, &ctx).await;
            report.record(state);

            tokio::time::sleep(self.delay_between_slide).await;
        }

        log_walk_complete(&report);
        report
    }

    async fn process_slide(&self, slide: &Slide, ctx: &SlideCtx) -> SlideState {
        let policy = RetryPolicy::new(
            format!("课件 {}", slide.display_title()),
            self.max_retries,
            self.retry_wait,
        )
        .give_up_when(|e: &AppError| !e.is_retryable());

        match retry::execute(&policy, || self.flow.run(slide, ctx)).await {
            Some(state) => state,
            None => {
                error!("{} ❌ [{}] 处理失败，继续下一个课件", ctx, slide.display_title());
                SlideState::Failed
            }
        }
    }
}

// ========== 日志辅助函数 ==========

fn log_walk_complete(report: &WalkReport) {
    info!("\n{}", "─".repeat(40));
    info!(
        "课件统计: 完成 {}, 跳过 {}, 失败 {}, 总计 {}",
        report.completed, report.skipped, report.failed, report.total
    );
}
