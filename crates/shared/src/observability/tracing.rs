//! 日志初始化
//!
//! 基于 tracing-subscriber 构建进程日志，支持人类可读与 JSON 两种输出格式。

use anyhow::Result;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use super::ObservabilityConfig;

/// 构建环境过滤器
///
/// 优先级：命令行级别 > RUST_LOG > 配置中的级别，都无效时回退到 info。
pub fn env_filter(log_level: &str, cli_level: Option<&str>) -> EnvFilter {
    if let Some(filter) = cli_level.and_then(|level| EnvFilter::try_new(level).ok()) {
        return filter;
    }

    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// 初始化 tracing
pub fn init(config: &ObservabilityConfig) -> Result<()> {
    let fmt_layer = if config.json_logs {
        fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter(
            &config.log_level,
            config.cli_log_level.as_deref(),
        ))
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
