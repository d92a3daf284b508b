//! 结构化日志记录
//!
//! 每种事件有各自强类型的字段集合（[`EventRecord`] 的一个分支），
//! 通过唯一的转换函数 [`EventRecord::into_log_record`] 变成发往接收端的 [`LogRecord`]。

use chrono::{DateTime, Utc};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use traffic_shared::error::{Result, TrafficError};
use traffic_shared::events::{EventKind, Severity};

use crate::models::{DeviceType, Price};

/// 故障记录使用的事件名
pub const GENERATOR_ERROR: &str = "GENERATOR_ERROR";

/// 消息渲染方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStyle {
    #[default]
    Plain,
    /// 嵌入 ANSI 高亮码，供支持颜色的日志查看器使用
    Ansi,
}

impl MessageStyle {
    fn paint(&self, code: &str, text: impl std::fmt::Display) -> String {
        match self {
            Self::Plain => text.to_string(),
            Self::Ansi => format!("\u{1b}[{code}m{text}\u{1b}[0m"),
        }
    }

    fn highlight(&self, text: impl std::fmt::Display) -> String {
        self.paint("1;32", text)
    }

    fn bold(&self, text: impl std::fmt::Display) -> String {
        self.paint("1", text)
    }

    fn yellow(&self, text: impl std::fmt::Display) -> String {
        self.paint("33", text)
    }

    fn red(&self, text: impl std::fmt::Display) -> String {
        self.paint("31", text)
    }
}

// ---------------------------------------------------------------------------
// 字段集合
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Geolocation {
    pub country_code: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// 网络与设备元数据，平铺到每条记录中
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientContext {
    pub device_type: DeviceType,
    pub operating_system: String,
    pub user_agent: String,
    pub ip: String,
    pub geolocation: Geolocation,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginFields {
    pub user_id: String,
    pub session_id: String,
    pub username: String,
    pub email: String,
    #[serde(flatten)]
    pub client: ClientContext,
    pub login_path: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowseFields {
    pub user_id: String,
    pub session_id: String,
    pub product_id: String,
    pub product_name: String,
    pub product_category: String,
    #[serde(flatten)]
    pub client: ClientContext,
    pub browse_path: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartFields {
    pub user_id: String,
    pub session_id: String,
    pub product_id: String,
    pub product_name: String,
    pub product_category: String,
    pub quantity: u32,
    pub cart_size: usize,
    /// 加购后的购物车，按商品 ID
    pub cart_contents: Vec<String>,
    #[serde(flatten)]
    pub client: ClientContext,
    pub add_to_cart_path: &'static str,
}

/// 结算快照中的一行
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: String,
    pub name: String,
    pub category: String,
    pub price: Price,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutFields {
    pub user_id: String,
    pub session_id: String,
    pub item_count: usize,
    pub cart_contents: Vec<CartLine>,
    #[serde(flatten)]
    pub client: ClientContext,
    pub checkout_path: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentFields {
    pub user_id: String,
    pub session_id: String,
    pub total_amount: Price,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub payment_method: String,
    pub payment_link: String,
    #[serde(flatten)]
    pub client: ClientContext,
    pub payment_path: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingFields {
    pub user_id: String,
    pub session_id: String,
    pub tracking_code: String,
    pub shipping_provider: String,
    /// `YYYY-MM-DD`
    pub delivery_estimate: String,
    pub shipping_address: String,
    #[serde(flatten)]
    pub client: ClientContext,
    pub shipping_path: &'static str,
}

// ---------------------------------------------------------------------------
// EventRecord
// ---------------------------------------------------------------------------

/// 按事件类型区分的记录
#[derive(Debug, Clone, PartialEq)]
pub enum EventRecord {
    Login(LoginFields),
    Browse(BrowseFields),
    AddToCart(AddToCartFields),
    Checkout(CheckoutFields),
    Payment(PaymentFields),
    Shipping(ShippingFields),
}

impl EventRecord {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Login(_) => EventKind::Login,
            Self::Browse(_) => EventKind::Browse,
            Self::AddToCart(_) => EventKind::AddToCart,
            Self::Checkout(_) => EventKind::Checkout,
            Self::Payment(_) => EventKind::Payment,
            Self::Shipping(_) => EventKind::Shipping,
        }
    }

    /// 支付失败为 error，其余一律 info
    pub fn severity(&self) -> Severity {
        match self {
            Self::Payment(fields) if !fields.success => Severity::Error,
            _ => Severity::Info,
        }
    }

    pub fn user_id(&self) -> &str {
        match self {
            Self::Login(f) => &f.user_id,
            Self::Browse(f) => &f.user_id,
            Self::AddToCart(f) => &f.user_id,
            Self::Checkout(f) => &f.user_id,
            Self::Payment(f) => &f.user_id,
            Self::Shipping(f) => &f.user_id,
        }
    }

    pub fn session_id(&self) -> &str {
        match self {
            Self::Login(f) => &f.session_id,
            Self::Browse(f) => &f.session_id,
            Self::AddToCart(f) => &f.session_id,
            Self::Checkout(f) => &f.session_id,
            Self::Payment(f) => &f.session_id,
            Self::Shipping(f) => &f.session_id,
        }
    }

    /// 人类可读的消息
    pub fn message(&self, style: MessageStyle) -> String {
        match self {
            Self::Login(f) => format!(
                "User {} logged in (device: {}).",
                style.highlight(&f.user_id),
                f.client.device_type.as_str()
            ),
            Self::Browse(f) => format!(
                "User {} browsed {} in category [{}].",
                style.highlight(&f.user_id),
                style.yellow(&f.product_name),
                f.product_category
            ),
            Self::AddToCart(f) => format!(
                "User {} added {} (x{}) to cart.",
                style.highlight(&f.user_id),
                style.bold(&f.product_name),
                f.quantity
            ),
            Self::Checkout(f) => format!(
                "User {} is checking out with {} items.",
                style.highlight(&f.user_id),
                f.item_count
            ),
            Self::Payment(f) if f.success => format!(
                "Payment of {} successful for user {} via {}.",
                style.highlight(format_args!("${}", f.total_amount)),
                f.user_id,
                f.payment_method
            ),
            Self::Payment(f) => format!(
                "{} (User: {}, method: {})",
                style.red("Payment failed!"),
                f.user_id,
                f.payment_method
            ),
            Self::Shipping(f) => format!(
                "Order shipped for user {} via {}.",
                style.highlight(&f.user_id),
                f.shipping_provider
            ),
        }
    }

    fn fields(&self) -> serde_json::Result<Value> {
        match self {
            Self::Login(f) => serde_json::to_value(f),
            Self::Browse(f) => serde_json::to_value(f),
            Self::AddToCart(f) => serde_json::to_value(f),
            Self::Checkout(f) => serde_json::to_value(f),
            Self::Payment(f) => serde_json::to_value(f),
            Self::Shipping(f) => serde_json::to_value(f),
        }
    }

    /// 转换为发往接收端的记录
    pub fn into_log_record(self, style: MessageStyle, timestamp: DateTime<Utc>) -> Result<LogRecord> {
        let fields = match self.fields()? {
            Value::Object(map) => map,
            other => {
                return Err(TrafficError::Internal(format!(
                    "{} 的字段未序列化为对象: {other}",
                    self.kind()
                )));
            }
        };

        Ok(LogRecord {
            event: Some(self.kind()),
            severity: self.severity(),
            message: self.message(style),
            timestamp,
            fields,
        })
    }
}

// ---------------------------------------------------------------------------
// LogRecord
// ---------------------------------------------------------------------------

/// 发往日志接收端的记录
///
/// 序列化为 `{dt, level, message, event, ...fields}`，与 Logtail 的摄入格式一致。
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    /// 为空表示生成器故障记录
    pub event: Option<EventKind>,
    pub severity: Severity,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub fields: Map<String, Value>,
}

impl LogRecord {
    /// 附加的低级别记录（warn 或 debug）
    pub fn auxiliary(
        event: EventKind,
        severity: Severity,
        message: String,
        user_id: &str,
        session_id: &str,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let mut fields = Map::new();
        fields.insert("userId".to_string(), Value::from(user_id));
        fields.insert("sessionId".to_string(), Value::from(session_id));
        fields.insert("auxiliary".to_string(), Value::Bool(true));

        Self {
            event: Some(event),
            severity,
            message,
            timestamp,
            fields,
        }
    }

    /// 生成器故障记录
    pub fn fault(message: impl Into<String>, style: MessageStyle) -> Self {
        let message = message.into();
        let mut fields = Map::new();
        fields.insert("error".to_string(), Value::from(message.clone()));

        Self {
            event: None,
            severity: Severity::Fatal,
            message: format!("{} {message}", style.red(format_args!("[{GENERATOR_ERROR}]"))),
            timestamp: Utc::now(),
            fields,
        }
    }

    pub fn event_name(&self) -> &'static str {
        self.event.map_or(GENERATOR_ERROR, |e| e.log_name())
    }

    pub fn is_auxiliary(&self) -> bool {
        self.fields.get("auxiliary") == Some(&Value::Bool(true))
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

impl Serialize for LogRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 4))?;
        map.serialize_entry("dt", &self.timestamp.to_rfc3339())?;
        map.serialize_entry("level", self.severity.as_str())?;
        map.serialize_entry("message", &self.message)?;
        map.serialize_entry("event", self.event_name())?;
        for (key, value) in &self.fields {
            if !matches!(key.as_str(), "dt" | "level" | "message" | "event") {
                map.serialize_entry(key, value)?;
            }
        }
        map.end()
    }
}
