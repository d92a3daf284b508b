//! 配置管理模块
//!
//! 支持多格式配置文件加载，环境变量覆盖，以及类型安全的配置访问。

use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

use crate::error::{Result, TrafficError};
use crate::events::EventKind;
use crate::observability::ObservabilityConfig;

/// 1 到 6 位数字 ID 的可用总数：10 + 100 + ... + 1_000_000
pub const MAX_NUMERIC_IDS: usize = 1_111_110;

/// 服务配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// 静态前端目录，为空时不挂载
    pub static_dir: Option<String>,
    /// 进程启动后是否立即开始生成
    pub autostart: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            static_dir: None,
            autostart: true,
        }
    }
}

/// 事件权重表中的一项
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EventWeight {
    pub event: EventKind,
    pub weight: f64,
}

impl EventWeight {
    pub fn new(event: EventKind, weight: f64) -> Self {
        Self { event, weight }
    }
}

/// 默认权重表，顺序即遍历顺序
pub fn default_weights() -> Vec<EventWeight> {
    vec![
        EventWeight::new(EventKind::Login, 0.20),
        EventWeight::new(EventKind::Browse, 0.30),
        EventWeight::new(EventKind::AddToCart, 0.25),
        EventWeight::new(EventKind::Checkout, 0.15),
        EventWeight::new(EventKind::Payment, 0.07),
        EventWeight::new(EventKind::Shipping, 0.03),
    ]
}

/// 场景模拟配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub actor_count: usize,
    pub product_count: usize,
    /// 两次 tick 之间的固定间隔
    pub tick_delay_ms: u64,
    /// 在固定间隔之上叠加的随机抖动上限，0 表示不抖动
    pub jitter_ms: u64,
    pub payment_failure_rate: f64,
    /// 附加低级别日志的概率
    pub auxiliary_rate: f64,
    pub bot_user_agent_rate: f64,
    pub max_quantity: u32,
    pub max_delivery_days: u32,
    /// 消息中是否嵌入 ANSI 高亮码
    pub colored_messages: bool,
    /// 随机种子，设置后整个运行可复现
    pub seed: Option<u64>,
    pub weights: Vec<EventWeight>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            actor_count: 10,
            product_count: 6,
            tick_delay_ms: 200,
            jitter_ms: 0,
            payment_failure_rate: 0.05,
            auxiliary_rate: 0.05,
            bot_user_agent_rate: 0.05,
            max_quantity: 5,
            max_delivery_days: 7,
            colored_messages: false,
            seed: None,
            weights: default_weights(),
        }
    }
}

impl SimulationConfig {
    /// 校验配置
    ///
    /// 所有概率值必须落在 [0, 1]，否则 `random_bool` 会在运行期 panic。
    pub fn validate(&self) -> Result<()> {
        let rates = [
            ("payment_failure_rate", self.payment_failure_rate),
            ("auxiliary_rate", self.auxiliary_rate),
            ("bot_user_agent_rate", self.bot_user_agent_rate),
        ];
        for (field, value) in rates {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid(field, format!("概率必须在 [0, 1] 之间, 实际 {value}")));
            }
        }

        if self.actor_count == 0 || self.actor_count > MAX_NUMERIC_IDS {
            return Err(invalid(
                "actor_count",
                format!("必须在 1..={MAX_NUMERIC_IDS} 之间, 实际 {}", self.actor_count),
            ));
        }
        if self.product_count == 0 {
            return Err(invalid("product_count", "至少需要 1 个商品".to_string()));
        }
        if self.max_quantity == 0 {
            return Err(invalid("max_quantity", "必须 >= 1".to_string()));
        }
        if self.max_delivery_days == 0 {
            return Err(invalid("max_delivery_days", "必须 >= 1".to_string()));
        }

        if self.weights.is_empty() {
            return Err(invalid("weights", "权重表不能为空".to_string()));
        }
        for entry in &self.weights {
            if !entry.weight.is_finite() || entry.weight < 0.0 {
                return Err(invalid(
                    "weights",
                    format!("{} 的权重无效: {}", entry.event, entry.weight),
                ));
            }
        }
        if !self.weights.iter().any(|w| w.weight > 0.0) {
            return Err(invalid("weights", "至少需要一个正权重".to_string()));
        }

        Ok(())
    }
}

fn invalid(field: &str, message: String) -> TrafficError {
    TrafficError::InvalidArgument {
        field: field.to_string(),
        message,
    }
}

/// 日志接收端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// 通过 tracing 输出到进程日志
    #[default]
    Tracing,
    /// 以 HTTP 推送到 Logtail 兼容的采集端
    Http,
}

/// 日志接收端配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    pub kind: SinkKind,
    pub endpoint: Option<String>,
    pub source_token: Option<String>,
    pub timeout_ms: u64,
    pub max_retries: u32,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            kind: SinkKind::Tracing,
            endpoint: None,
            source_token: None,
            timeout_ms: 5000,
            max_retries: 3,
        }
    }
}

impl SinkConfig {
    pub fn validate(&self) -> Result<()> {
        if self.kind == SinkKind::Http && self.endpoint.as_deref().is_none_or(str::is_empty) {
            return Err(invalid("sink.endpoint", "http 接收端必须配置 endpoint".to_string()));
        }
        Ok(())
    }
}

/// 应用配置
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub service_name: String,
    pub environment: String,
    pub server: ServerConfig,
    pub simulation: SimulationConfig,
    pub sink: SinkConfig,
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 加载顺序（后加载的会覆盖先加载的同名配置项）：
    /// 1. config/default.toml（默认配置）
    /// 2. config/{environment}.toml（环境特定配置）
    /// 3. config/{service_name}.toml（服务特定配置）
    /// 4. 环境变量（TRAFFIC_ 前缀，如 TRAFFIC_SERVER__PORT -> server.port）
    pub fn load(service_name: &str, config_dir: Option<&str>) -> Result<Self> {
        let env = std::env::var("TRAFFIC_ENV").unwrap_or_else(|_| "development".to_string());

        let config_dir = config_dir
            .map(str::to_string)
            .or_else(|| std::env::var("CONFIG_DIR").ok())
            .unwrap_or_else(|| "config".to_string());

        let builder = Config::builder()
            .set_default("service_name", service_name)?
            .set_default("environment", env.clone())?
            .add_source(File::from(Path::new(&config_dir).join("default.toml")).required(false))
            .add_source(
                File::from(Path::new(&config_dir).join(format!("{}.toml", env))).required(false),
            )
            .add_source(
                File::from(Path::new(&config_dir).join(format!("{}.toml", service_name)))
                    .required(false),
            )
            .add_source(
                Environment::with_prefix("TRAFFIC")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.simulation.validate()?;
        self.sink.validate()
    }

    /// 获取服务地址
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 3000);
        assert!(config.server.autostart);
        assert_eq!(config.simulation.actor_count, 10);
        assert_eq!(config.simulation.product_count, 6);
        assert_eq!(config.simulation.tick_delay_ms, 200);
        assert_eq!(config.sink.kind, SinkKind::Tracing);
        tokio_test::assert_ok!(config.validate());
    }

    #[test]
    fn test_default_weights_order() {
        let weights = default_weights();
        let order: Vec<EventKind> = weights.iter().map(|w| w.event).collect();
        assert_eq!(order, EventKind::ALL.to_vec());

        let total: f64 = weights.iter().map(|w| w.weight).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_server_addr() {
        let config = AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 4000,
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(config.server_addr(), "127.0.0.1:4000");
    }

    #[test]
    fn test_validate_rejects_bad_rates() {
        let config = SimulationConfig {
            payment_failure_rate: 1.5,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(err.code(), "INVALID_ARGUMENT");
    }

    #[test]
    fn test_validate_rejects_bad_weights() {
        let negative = SimulationConfig {
            weights: vec![EventWeight::new(EventKind::Login, -0.1)],
            ..Default::default()
        };
        assert!(negative.validate().is_err());

        let all_zero = SimulationConfig {
            weights: vec![EventWeight::new(EventKind::Login, 0.0)],
            ..Default::default()
        };
        assert!(all_zero.validate().is_err());

        let empty = SimulationConfig {
            weights: vec![],
            ..Default::default()
        };
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_pools() {
        let no_actors = SimulationConfig {
            actor_count: 0,
            ..Default::default()
        };
        assert!(no_actors.validate().is_err());

        let no_products = SimulationConfig {
            product_count: 0,
            ..Default::default()
        };
        assert!(no_products.validate().is_err());
    }

    #[test]
    fn test_http_sink_requires_endpoint() {
        let sink = SinkConfig {
            kind: SinkKind::Http,
            ..Default::default()
        };
        tokio_test::assert_err!(sink.validate());

        let sink = SinkConfig {
            kind: SinkKind::Http,
            endpoint: Some("https://in.logs.example.com".to_string()),
            ..Default::default()
        };
        assert!(sink.validate().is_ok());
    }

    #[test]
    fn test_weights_deserialize_from_toml() {
        let toml = r#"
            [simulation]
            tick_delay_ms = 50
            weights = [
                { event = "LOGIN", weight = 0.5 },
                { event = "ADD_TO_CART", weight = 0.5 },
            ]
        "#;
        let config: AppConfig = Config::builder()
            .add_source(File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.simulation.tick_delay_ms, 50);
        assert_eq!(config.simulation.actor_count, 10);
        assert_eq!(
            config.simulation.weights,
            vec![
                EventWeight::new(EventKind::Login, 0.5),
                EventWeight::new(EventKind::AddToCart, 0.5),
            ]
        );
    }
}
