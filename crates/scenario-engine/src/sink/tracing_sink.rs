//! 输出到进程日志的接收端

use async_trait::async_trait;
use tracing::{debug, error, info, trace, warn};
use traffic_shared::error::Result;
use traffic_shared::events::Severity;

use super::LogSink;
use crate::record::LogRecord;

/// 模拟记录使用的 tracing target，便于用 `RUST_LOG=traffic_events=debug` 单独过滤
pub const EVENT_TARGET: &str = "traffic_events";

/// 以 tracing 事件重新输出每条记录
///
/// 级别映射：trace→TRACE，debug/verbose→DEBUG，info→INFO，warn→WARN，error/fatal→ERROR。
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TracingSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl LogSink for TracingSink {
    async fn dispatch(&self, record: &LogRecord) -> Result<()> {
        let fields = serde_json::to_string(&record.fields)?;
        let event = record.event_name();
        let level = record.severity.as_str();
        let message = &record.message;

        match record.severity {
            Severity::Trace => trace!(target: EVENT_TARGET, event, severity = level, fields = %fields, "{message}"),
            Severity::Debug | Severity::Verbose => {
                debug!(target: EVENT_TARGET, event, severity = level, fields = %fields, "{message}")
            }
            Severity::Info => info!(target: EVENT_TARGET, event, severity = level, fields = %fields, "{message}"),
            Severity::Warn => warn!(target: EVENT_TARGET, event, severity = level, fields = %fields, "{message}"),
            Severity::Error | Severity::Fatal => {
                error!(target: EVENT_TARGET, event, severity = level, fields = %fields, "{message}")
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "tracing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::MessageStyle;

    #[tokio::test]
    async fn test_dispatch_every_severity() {
        let sink = TracingSink::new();
        let mut record = LogRecord::fault("boom", MessageStyle::Plain);

        for severity in [
            Severity::Trace,
            Severity::Debug,
            Severity::Verbose,
            Severity::Info,
            Severity::Warn,
            Severity::Error,
            Severity::Fatal,
        ] {
            record.severity = severity;
            assert!(sink.dispatch(&record).await.is_ok());
        }
    }
}
