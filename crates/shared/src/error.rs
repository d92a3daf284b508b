//! 统一错误处理模块
//!
//! 定义模拟器中所有共享的错误类型，使用 thiserror 提供良好的错误信息。
//! 前置条件不满足（如未登录就浏览）不属于错误，由引擎以跳过结果表示。

use thiserror::Error;

/// 系统错误类型
#[derive(Debug, Error)]
pub enum TrafficError {
    // ==================== 配置错误 ====================
    #[error("配置加载失败: {0}")]
    Config(#[from] config::ConfigError),

    #[error("配置校验失败: {0}")]
    Validation(String),

    #[error("无效的参数: {field} - {message}")]
    InvalidArgument { field: String, message: String },

    // ==================== 身份池错误 ====================
    #[error("无法生成唯一的用户 ID: 需要 {requested} 个, 仅生成 {generated} 个")]
    IdentityExhausted { requested: usize, generated: usize },

    // ==================== 日志接收端错误 ====================
    #[error("序列化失败: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("日志接收端不可用: {sink} - {message}")]
    SinkUnavailable { sink: String, message: String },

    #[error("日志接收端超时: {sink}")]
    SinkTimeout { sink: String },

    #[error("日志接收端拒绝记录: {sink} 状态码={status}")]
    SinkRejected { sink: String, status: u16 },

    // ==================== 通用错误 ====================
    #[error("内部错误: {0}")]
    Internal(String),
}

/// 错误结果类型别名
pub type Result<T> = std::result::Result<T, TrafficError>;

impl TrafficError {
    /// 获取错误码
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::InvalidArgument { .. } => "INVALID_ARGUMENT",
            Self::IdentityExhausted { .. } => "IDENTITY_EXHAUSTED",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::SinkUnavailable { .. } => "SINK_UNAVAILABLE",
            Self::SinkTimeout { .. } => "SINK_TIMEOUT",
            Self::SinkRejected { .. } => "SINK_REJECTED",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// 是否为可重试错误
    ///
    /// 只有传输层的瞬时故障值得重试，接收端明确拒绝（4xx）不重试。
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::SinkUnavailable { .. } | Self::SinkTimeout { .. })
    }
}
