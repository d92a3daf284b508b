//! Logtail 兼容的 HTTP 接收端
//!
//! 每条记录 POST 一次，正文为 `{dt, level, message, event, ...fields}`。
//! 连接失败、超时、5xx 与 429 视为瞬时故障按退避重试；其余非 2xx 状态直接视为拒绝。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;
use traffic_shared::config::SinkConfig;
use traffic_shared::error::{Result, TrafficError};
use traffic_shared::retry::{RetryPolicy, retry_transient};

use super::LogSink;
use crate::record::LogRecord;

const SINK_NAME: &str = "http";

/// HTTP 接收端
#[derive(Debug, Clone)]
pub struct HttpSink {
    client: reqwest::Client,
    endpoint: String,
    source_token: Option<String>,
    retry: RetryPolicy,
}

impl HttpSink {
    pub fn new(
        endpoint: impl Into<String>,
        source_token: Option<String>,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TrafficError::Internal(format!("创建 HTTP 客户端失败: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            source_token: source_token.filter(|t| !t.is_empty()),
            retry,
        })
    }

    pub fn from_config(config: &SinkConfig) -> Result<Self> {
        let endpoint = config
            .endpoint
            .as_deref()
            .filter(|e| !e.is_empty())
            .ok_or_else(|| TrafficError::InvalidArgument {
                field: "sink.endpoint".to_string(),
                message: "http 接收端必须配置 endpoint".to_string(),
            })?;

        Self::new(
            endpoint,
            config.source_token.clone(),
            Duration::from_millis(config.timeout_ms),
            RetryPolicy::with_max_retries(config.max_retries),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post_once(&self, body: &[u8]) -> Result<()> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body.to_vec());
        if let Some(token) = &self.source_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(map_transport_error)?;
        check_status(response.status())
    }
}

fn map_transport_error(err: reqwest::Error) -> TrafficError {
    if err.is_timeout() {
        TrafficError::SinkTimeout {
            sink: SINK_NAME.to_string(),
        }
    } else {
        TrafficError::SinkUnavailable {
            sink: SINK_NAME.to_string(),
            message: err.to_string(),
        }
    }
}

fn check_status(status: StatusCode) -> Result<()> {
    if status.is_success() {
        Ok(())
    } else if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        Err(TrafficError::SinkUnavailable {
            sink: SINK_NAME.to_string(),
            message: format!("HTTP {status}"),
        })
    } else {
        Err(TrafficError::SinkRejected {
            sink: SINK_NAME.to_string(),
            status: status.as_u16(),
        })
    }
}

#[async_trait]
impl LogSink for HttpSink {
    async fn dispatch(&self, record: &LogRecord) -> Result<()> {
        let body = serde_json::to_vec(record)?;
        let (this, body) = (self, body.as_slice());
        retry_transient(&self.retry, "http_sink.dispatch", move || this.post_once(body)).await?;
        debug!(endpoint = %self.endpoint, event = record.event_name(), "记录已推送");
        Ok(())
    }

    fn name(&self) -> &'static str {
        SINK_NAME
    }
}
