//! 课件处理上下文
//!
//! 封装"我正在处理第几个课件"这一信息

use std::fmt::Display;

/// 课件处理上下文
#[derive(Debug, Clone)]
pub struct SlideCtx {
    /// 课件序号（从1开始，仅用于日志显示）
    pub slide_index: usize,

    /// 课件总数
    pub total: usize,

    /// 课件 id
    pub slide_id: String,
}

impl SlideCtx {
    pub fn new(slide_index: usize, total: usize, slide_id: impl Into<String>) -> Self {
        Self {
            slide_index,
            total,
            slide_id: slide_id.into(),
        }
    }
}

impl Display for SlideCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[课件 {}/{}]", self.slide_index, self.total)
    }
}
