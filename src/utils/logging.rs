/// 日志工具模块
///
/// 提供日志初始化和输出的辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// 初始化日志输出
///
/// 日志写到 stderr，控制台交互输出走 stdout，两者互不干扰。
/// `RUST_LOG` 优先；未设置时按 `verbose` 选择 debug 或 info。
pub fn init(verbose: bool) {
    let default_level = if verbose { "lit_review=debug,info" } else { "info" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 文献综述助手");
    info!("🔍 检索接口: {}", config.search_api_url);
    if config.is_llm_configured() {
        info!("🤖 远程生成: {} ({})", config.llm_model_name, config.llm_api_base_url);
    } else {
        info!("🤖 远程生成: 未配置，使用本地生成");
    }
    info!("📁 导出目录: {}", config.output_dir);
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大字符数
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
