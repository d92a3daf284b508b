//! 日志接收端
//!
//! 通过 `LogSink` trait 抽象记录的投递。默认的 [`TracingSink`] 输出到进程日志，
//! [`HttpSink`] 推送到 Logtail 兼容的采集端，[`MemorySink`] 供测试与一次性生成使用。

mod http;
mod memory;
mod tracing_sink;

use std::sync::Arc;

use async_trait::async_trait;
use traffic_shared::config::{SinkConfig, SinkKind};
use traffic_shared::error::Result;

use crate::record::LogRecord;

pub use http::HttpSink;
pub use memory::MemorySink;
pub use tracing_sink::{TracingSink, EVENT_TARGET};

/// 日志接收端 trait
///
/// `dispatch` 返回错误即视为生成器故障，生成循环随之停止。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LogSink: Send + Sync {
    /// 投递一条记录
    async fn dispatch(&self, record: &LogRecord) -> Result<()>;

    /// 接收端名称，用于日志与错误信息
    fn name(&self) -> &'static str;
}

/// 按配置构造接收端
pub fn from_config(config: &SinkConfig) -> Result<Arc<dyn LogSink>> {
    let sink: Arc<dyn LogSink> = match config.kind {
        SinkKind::Tracing => Arc::new(TracingSink::new()),
        SinkKind::Http => Arc::new(HttpSink::from_config(config)?),
    };
    Ok(sink)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_default_is_tracing() {
        let sink = from_config(&SinkConfig::default()).unwrap();
        assert_eq!(sink.name(), "tracing");
    }

    #[test]
    fn test_from_config_http() {
        let config = SinkConfig {
            kind: SinkKind::Http,
            endpoint: Some("http://127.0.0.1:1/ingest".to_string()),
            ..Default::default()
        };
        let sink = from_config(&config).unwrap();
        assert_eq!(sink.name(), "http");

        let missing = SinkConfig {
            kind: SinkKind::Http,
            ..Default::default()
        };
        assert!(from_config(&missing).is_err());
    }
}
