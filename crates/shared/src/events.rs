//! 事件类型与日志级别
//!
//! 定义模拟用户旅程中的六种事件类型，以及日志接收端使用的有序级别集合。
//! 两者在配置、引擎和控制面之间共享，序列化格式保持一致。

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// EventKind: 事件类型枚举
// ---------------------------------------------------------------------------

/// 用户旅程事件类型
///
/// 声明顺序即默认权重表的遍历顺序：登录 → 浏览 → 加购 → 结算 → 支付 → 发货。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    Login,
    Browse,
    AddToCart,
    Checkout,
    Payment,
    Shipping,
}

impl EventKind {
    /// 全部事件类型，按声明顺序
    pub const ALL: [EventKind; 6] = [
        Self::Login,
        Self::Browse,
        Self::AddToCart,
        Self::Checkout,
        Self::Payment,
        Self::Shipping,
    ];

    /// 写入日志记录 `event` 字段的名称
    pub fn log_name(&self) -> &'static str {
        match self {
            Self::Login => "USER_LOGIN",
            Self::Browse => "USER_BROWSE",
            Self::AddToCart => "ADD_TO_CART",
            Self::Checkout => "CHECKOUT",
            Self::Payment => "PAYMENT",
            Self::Shipping => "SHIPPING",
        }
    }

    /// 除登录外的所有事件都要求用户已有会话
    pub fn requires_session(&self) -> bool {
        !matches!(self, Self::Login)
    }

    /// 结算与支付要求购物车非空
    pub fn requires_cart(&self) -> bool {
        matches!(self, Self::Checkout | Self::Payment)
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Login => "LOGIN",
            Self::Browse => "BROWSE",
            Self::AddToCart => "ADD_TO_CART",
            Self::Checkout => "CHECKOUT",
            Self::Payment => "PAYMENT",
            Self::Shipping => "SHIPPING",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Severity: 日志级别
// ---------------------------------------------------------------------------

/// 日志级别
///
/// 从低到高排列，派生的 `Ord` 依赖声明顺序。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Trace,
    Debug,
    Verbose,
    Info,
    Warn,
    Error,
    Fatal,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Verbose => "verbose",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Fatal => "fatal",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
