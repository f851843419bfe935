//! 日志工具模块
//!
//! 提供日志初始化以及启动 / 统计输出的辅助函数

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// 初始化 tracing
///
/// `RUST_LOG` 优先；否则按 `verbose` 选择 debug / info。
pub fn init(verbose: bool) {
    let default_level = if verbose {
        "lms_autopilot=debug,info"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // 重复初始化（例如测试中）时忽略错误
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - LMS 课程自动学习");
    info!("📚 课程地址: {}", config.course_url);
    info!("👤 账号: {}", config.username);
    info!("🤖 LLM 模型: {}", config.llm_model_name);
    if config.allow_random_fallback {
        info!("🎲 已启用随机答案兜底");
    }
    info!("{}", "=".repeat(60));
}

/// 记录课件加载信息
pub fn log_slides_loaded(course_key: &str, total: usize, pending: usize) {
    info!("✓ 课程 [{}] 共 {} 个课件，其中 {} 个未完成", course_key, total, pending);
}

/// 记录课件开始处理
pub fn log_slide_start(index: usize, total: usize, title: &str, slide_type: &str) {
    info!("\n{}", "─".repeat(40));
    info!(
        "[课件 {}/{}] {} ({})",
        index,
        total,
        truncate_text(title, 60),
        slide_type
    );
}

/// 打印最终统计信息
pub fn print_final_stats(completed: usize, skipped: usize, failed: usize, total: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 完成: {}/{}", completed, total);
    info!("⏭️ 跳过: {}", skipped);
    info!("❌ 失败: {}", failed);
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate_text("Bài giảng", 20), "Bài giảng");
        assert_eq!(truncate_text("Cơ sở dữ liệu", 5), "Cơ sở...");
    }
}
