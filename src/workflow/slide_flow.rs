//! 课件处理流程 - 流程层
//!
//! 核心职责：定义"一个课件"的完整处理流程
//!
//! 流程顺序：
//! 1. 已完成 → 直接返回
//! 2. （可选）访问检查
//! 3. 按类型分派：视频标记完成 / 测验作答

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::error::{AppError, CourseError, Result};
use crate::models::{Slide, SlideType};
use crate::services::{CourseService, QuizAnswerResolver, QuizOutcome};
use crate::workflow::slide_ctx::SlideCtx;

/// 课件处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideState {
    /// 尚未处理
    Pending,
    /// 已完成
    Completed,
    /// 暂时无法处理（未开放 / 无权限）
    Skipped,
    /// 处理失败
    Failed,
}

impl SlideState {
    /// 抓取侧边栏时的状态：已完成的课件直接是 `Completed`
    pub fn initial(slide: &Slide) -> Self {
        if slide.is_completed() {
            SlideState::Completed
        } else {
            SlideState::Pending
        }
    }
}

/// 课件处理流程
///
/// - 编排单个课件的处理顺序
/// - 不持有浏览器资源
/// - 只依赖业务能力（services）
pub struct SlideFlow {
    course: Arc<CourseService>,
    resolver: QuizAnswerResolver,
    check_slide_access: bool,
}

impl SlideFlow {
    pub fn new(
        course: Arc<CourseService>,
        resolver: QuizAnswerResolver,
        check_slide_access: bool,
    ) -> Self {
        Self {
            course,
            resolver,
            check_slide_access,
        }
    }

    /// 处理一个课件
    ///
    /// 返回 Err 时由外层决定是否重试；测验作答失败以 `SlideState::Failed` 返回。
    pub async fn run(&self, slide: &Slide, ctx: &SlideCtx) -> Result<SlideState> {
        let title = slide.display_title();

        if SlideState::initial(slide) == SlideState::Completed {
            info!("{} ✓ [{}] 已完成，跳过", ctx, title);
            return Ok(SlideState::Completed);
        }

        if self.check_slide_access
            && !slide.access_allowed
            && !self.course.check_slide_access(slide).await?
        {
            warn!("{} ⚠️ [{}] 暂无学习权限，跳过", ctx, title);
            return Ok(SlideState::Skipped);
        }

        match &slide.slide_type {
            SlideType::Video => self.complete_video(slide, ctx).await,
            SlideType::Quiz => self.answer_quiz(slide, ctx).await,
            other => Err(AppError::Course(CourseError::UnhandledSlideType {
                title: title.to_string(),
                slide_type: other.to_string(),
            })),
        }
    }

    async fn complete_video(&self, slide: &Slide, ctx: &SlideCtx) -> Result<SlideState> {
        let title = slide.display_title();
        info!("{} 🎬 标记视频 [{}] 已看完...", ctx, title);

        let reply = self.course.set_video_completed(slide).await?;
        if reply.completed {
            info!("{} ✓ 视频 [{}] 已完成", ctx, title);
            return Ok(SlideState::Completed);
        }

        error!("{} ❌ 视频 [{}] 标记失败, 原始响应: {}", ctx, title, reply.raw);
        Err(AppError::Course(CourseError::VideoNotCompleted {
            title: title.to_string(),
            raw: reply.raw,
        }))
    }

    async fn answer_quiz(&self, slide: &Slide, ctx: &SlideCtx) -> Result<SlideState> {
        let title = slide.display_title();
        info!("{} 📝 处理测验 [{}]...", ctx, title);

        match self.resolver.resolve(slide).await {
            QuizOutcome::AlreadySubmitted => Ok(SlideState::Completed),
            QuizOutcome::Submitted(source) => {
                info!("{} ✓ 测验 [{}] 已提交 (答案来源: {:?})", ctx, title, source);
                Ok(SlideState::Completed)
            }
            QuizOutcome::NotOpen => {
                warn!("{} ⚠️ 测验 [{}] 尚未开放，跳过", ctx, title);
                Ok(SlideState::Skipped)
            }
            QuizOutcome::Unresolved(reason) => {
                error!("{} ❌ 测验 [{}] 作答失败: {}", ctx, title, reason);
                Ok(SlideState::Failed)
            }
        }
    }
}
