/// 日志工具模块
///
/// 提供日志初始化和输出的辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::services::CacheStats;

/// 初始化 tracing 日志
///
/// 优先使用 `RUST_LOG`，未设置时根据 `verbose` 选择 debug / info 级别。
/// 日志写到 stderr，stdout 留给渲染结果。重复调用不会报错。
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// 记录程序启动信息
///
/// # 参数
/// - `documents`: 待处理的文档数量
/// - `max_concurrent`: 最大并发数
pub fn log_startup(documents: usize, max_concurrent: usize) {
    info!("{}", "=".repeat(60));
    info!("🚀 公式渲染启动");
    info!("📄 待处理文档: {}", documents);
    info!("📊 最大并发数: {}", max_concurrent);
    info!("{}", "=".repeat(60));
}

/// 打印最终统计信息
///
/// # 参数
/// - `success`: 成功数量
/// - `failed`: 失败数量
/// - `inline_stats`: 行内公式缓存统计
/// - `display_stats`: 块级公式缓存统计
pub fn print_final_stats(
    success: usize,
    failed: usize,
    inline_stats: &CacheStats,
    display_stats: &CacheStats,
) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", success, success + failed);
    info!("❌ 失败: {}", failed);
    info!(
        "🗂  行内缓存: 命中 {} / 未命中 {} / 条目 {}/{}",
        inline_stats.hits, inline_stats.misses, inline_stats.len, inline_stats.capacity
    );
    info!(
        "🗂  块级缓存: 命中 {} / 未命中 {} / 条目 {}/{}",
        display_stats.hits, display_stats.misses, display_stats.len, display_stats.capacity
    );
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
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
    fn test_truncate_text() {
        assert_eq!(truncate_text("x^2", 10), "x^2");
        assert_eq!(truncate_text("\\frac{a}{b}", 5), "\\frac...");
        // 按字符截断，不会切坏多字节字符
        assert_eq!(truncate_text("公式渲染测试", 2), "公式...");
    }

    #[test]
    fn test_print_final_stats_accepts_both_caches() {
        let inline_stats = CacheStats {
            hits: 3,
            misses: 1,
            len: 1,
            capacity: 512,
        };
        let display_stats = CacheStats::default();
        print_final_stats(2, 0, &inline_stats, &display_stats);
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init(false);
        init(true);
    }
}
