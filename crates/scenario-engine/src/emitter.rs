//! 事件记录合成
//!
//! 根据状态机给出的转移和用户推进前后的两个快照，合成带网络、地理、
//! 设备元数据的强类型记录；另按概率附带一条低级别的辅助记录。

use chrono::{DateTime, Days, Utc};
use fake::Fake;
use fake::faker::address::en::{BuildingNumber, CountryCode, StreetName};
use fake::faker::internet::en::IPv4;
use rand::Rng;
use rand::seq::IndexedRandom;
use traffic_shared::config::SimulationConfig;
use traffic_shared::events::Severity;
use uuid::Builder;

use crate::catalog::{
    BOT_USER_AGENTS, BROWSER_USER_AGENTS, PAYMENT_GATEWAY_ERROR, PAYMENT_METHODS,
    SHIPPING_PROVIDERS, paths,
};
use crate::machine::{PaymentOutcome, Transition};
use crate::models::{Actor, Price};
use crate::record::{
    AddToCartFields, BrowseFields, CartLine, CheckoutFields, ClientContext, EventRecord,
    Geolocation, LogRecord, LoginFields, MessageStyle, PaymentFields, ShippingFields,
};

/// 记录合成参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmitterSettings {
    pub bot_user_agent_rate: f64,
    pub auxiliary_rate: f64,
    pub max_delivery_days: u32,
    pub style: MessageStyle,
}

impl Default for EmitterSettings {
    fn default() -> Self {
        Self {
            bot_user_agent_rate: 0.05,
            auxiliary_rate: 0.05,
            max_delivery_days: 7,
            style: MessageStyle::Plain,
        }
    }
}

impl From<&SimulationConfig> for EmitterSettings {
    fn from(config: &SimulationConfig) -> Self {
        Self {
            bot_user_agent_rate: config.bot_user_agent_rate,
            auxiliary_rate: config.auxiliary_rate,
            max_delivery_days: config.max_delivery_days,
            style: if config.colored_messages {
                MessageStyle::Ansi
            } else {
                MessageStyle::Plain
            },
        }
    }
}

/// 事件记录合成器
#[derive(Debug, Clone, Default)]
pub struct EventEmitter {
    settings: EmitterSettings,
}

impl EventEmitter {
    pub fn new(settings: EmitterSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &EmitterSettings {
        &self.settings
    }

    /// 合成主记录
    ///
    /// `before` 是推进前的用户，`after` 是已应用转移的副本。
    /// 支付金额取自 `before` 的购物车，其余字段取自 `after`。
    pub fn synthesize<R: Rng + ?Sized>(
        &self,
        before: &Actor,
        after: &Actor,
        transition: &Transition,
        rng: &mut R,
    ) -> EventRecord {
        let user_id = after.id().to_string();
        let session_id = after.session_id().unwrap_or_default().to_string();
        let client = self.client_context(after, rng);

        match transition {
            Transition::Login { .. } => EventRecord::Login(LoginFields {
                user_id,
                session_id,
                username: after.profile().username.clone(),
                email: after.profile().email.clone(),
                client,
                login_path: paths::LOGIN,
            }),
            Transition::Browse { product } => EventRecord::Browse(BrowseFields {
                user_id,
                session_id,
                product_id: product.product_id.clone(),
                product_name: product.name.clone(),
                product_category: product.category.clone(),
                client,
                browse_path: paths::BROWSE,
            }),
            Transition::AddToCart { product, quantity } => EventRecord::AddToCart(AddToCartFields {
                user_id,
                session_id,
                product_id: product.product_id.clone(),
                product_name: product.name.clone(),
                product_category: product.category.clone(),
                quantity: *quantity,
                cart_size: after.cart().len(),
                cart_contents: after.cart().iter().map(|p| p.product_id.clone()).collect(),
                client,
                add_to_cart_path: paths::ADD_TO_CART,
            }),
            Transition::Checkout => EventRecord::Checkout(CheckoutFields {
                user_id,
                session_id,
                item_count: after.cart().len(),
                cart_contents: after
                    .cart()
                    .iter()
                    .map(|p| CartLine {
                        product_id: p.product_id.clone(),
                        name: p.name.clone(),
                        category: p.category.clone(),
                        price: p.price,
                    })
                    .collect(),
                client,
                checkout_path: paths::CHECKOUT,
            }),
            Transition::Payment { outcome } => {
                let success = *outcome == PaymentOutcome::Succeeded;
                let total_amount: Price = before.cart().iter().map(|p| p.price).sum();
                EventRecord::Payment(PaymentFields {
                    payment_link: format!("https://example.com/pay?session={session_id}"),
                    user_id,
                    session_id,
                    total_amount,
                    success,
                    error: (!success).then(|| PAYMENT_GATEWAY_ERROR.to_string()),
                    payment_method: pick(rng, &PAYMENT_METHODS).to_string(),
                    client,
                    payment_path: paths::PAYMENT,
                })
            }
            Transition::Shipping => EventRecord::Shipping(ShippingFields {
                user_id,
                session_id,
                tracking_code: Builder::from_random_bytes(rng.random()).into_uuid().to_string(),
                shipping_provider: pick(rng, &SHIPPING_PROVIDERS).to_string(),
                delivery_estimate: self.delivery_estimate(Utc::now(), rng),
                shipping_address: format!(
                    "{} {}",
                    BuildingNumber().fake_with_rng::<String, _>(rng),
                    StreetName().fake_with_rng::<String, _>(rng)
                ),
                client,
                shipping_path: paths::SHIPPING,
            }),
        }
    }

    /// 按概率生成辅助记录
    ///
    /// 与主记录独立抽样；级别为 warn 或 debug，只携带用户与会话。
    pub fn auxiliary<R: Rng + ?Sized>(
        &self,
        primary: &EventRecord,
        rng: &mut R,
    ) -> Option<LogRecord> {
        if !rng.random_bool(self.settings.auxiliary_rate.clamp(0.0, 1.0)) {
            return None;
        }

        let path = api_path(primary);
        let (severity, message) = if rng.random_bool(0.5) {
            let latency_ms: u32 = rng.random_range(800..=5000);
            (
                Severity::Warn,
                format!(
                    "Slow response on {path} for user {} ({latency_ms} ms).",
                    primary.user_id()
                ),
            )
        } else {
            (
                Severity::Debug,
                format!(
                    "Cache miss while serving {path} for user {}.",
                    primary.user_id()
                ),
            )
        };

        Some(LogRecord::auxiliary(
            primary.kind(),
            severity,
            message,
            primary.user_id(),
            primary.session_id(),
            Utc::now(),
        ))
    }

    fn client_context<R: Rng + ?Sized>(&self, actor: &Actor, rng: &mut R) -> ClientContext {
        let profile = actor.profile();
        ClientContext {
            device_type: profile.device_type,
            operating_system: profile.operating_system.clone(),
            user_agent: self.user_agent(rng).to_string(),
            ip: IPv4().fake_with_rng(rng),
            geolocation: Geolocation {
                country_code: CountryCode().fake_with_rng(rng),
                latitude: round4(rng.random_range(-90.0..=90.0)),
                longitude: round4(rng.random_range(-180.0..=180.0)),
            },
        }
    }

    fn user_agent<R: Rng + ?Sized>(&self, rng: &mut R) -> &'static str {
        if rng.random_bool(self.settings.bot_user_agent_rate.clamp(0.0, 1.0)) {
            pick(rng, &BOT_USER_AGENTS)
        } else {
            pick(rng, &BROWSER_USER_AGENTS)
        }
    }

    fn delivery_estimate<R: Rng + ?Sized>(&self, now: DateTime<Utc>, rng: &mut R) -> String {
        let days = rng.random_range(1..=self.settings.max_delivery_days.max(1));
        now.date_naive()
            .checked_add_days(Days::new(u64::from(days)))
            .unwrap_or(now.date_naive())
            .format("%Y-%m-%d")
            .to_string()
    }
}

fn api_path(record: &EventRecord) -> &'static str {
    match record {
        EventRecord::Login(_) => paths::LOGIN,
        EventRecord::Browse(_) => paths::BROWSE,
        EventRecord::AddToCart(_) => paths::ADD_TO_CART,
        EventRecord::Checkout(_) => paths::CHECKOUT,
        EventRecord::Payment(_) => paths::PAYMENT,
        EventRecord::Shipping(_) => paths::SHIPPING,
    }
}

fn pick<R: Rng + ?Sized>(rng: &mut R, items: &[&'static str]) -> &'static str {
    items.choose(rng).copied().unwrap_or_default()
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::{MachineRules, plan};
    use crate::models::{ActorProfile, Product};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::sync::Arc;
    use traffic_shared::events::EventKind;

    struct Fixture {
        actor: Actor,
        products: Vec<Arc<Product>>,
        rng: StdRng,
        emitter: EventEmitter,
    }

    impl Fixture {
        fn new() -> Self {
            let mut rng = StdRng::seed_from_u64(8);
            let actor = Actor::new("314", ActorProfile::random(&mut rng));
            let products = vec![
                Arc::new(Product::random(&mut rng)),
                Arc::new(Product::random(&mut rng)),
            ];
            Self {
                actor,
                products,
                rng,
                emitter: EventEmitter::default(),
            }
        }

        fn fire(&mut self, kind: EventKind, rules: &MachineRules) -> EventRecord {
            let transition =
                plan(kind, &self.actor, &self.products, rules, &mut self.rng).unwrap();
            let mut after = self.actor.clone();
            transition.apply(&mut after);
            let record = self
                .emitter
                .synthesize(&self.actor, &after, &transition, &mut self.rng);
            self.actor = after;
            record
        }
    }

    #[test]
    fn test_login_record_carries_new_session() {
        let mut fx = Fixture::new();
        let record = fx.fire(EventKind::Login, &MachineRules::default());

        let EventRecord::Login(fields) = record else {
            panic!("expected login record");
        };
        assert_eq!(fields.user_id, "314");
        assert_eq!(Some(fields.session_id.as_str()), fx.actor.session_id());
        assert_eq!(fields.login_path, "/api/login");
        assert!(fields.client.ip.parse::<std::net::Ipv4Addr>().is_ok());
        assert!((-90.0..=90.0).contains(&fields.client.geolocation.latitude));
    }

    #[test]
    fn test_add_to_cart_record_reflects_cart_after() {
        let mut fx = Fixture::new();
        let rules = MachineRules::default();
        fx.fire(EventKind::Login, &rules);
        let record = fx.fire(EventKind::AddToCart, &rules);

        let EventRecord::AddToCart(fields) = record else {
            panic!("expected add-to-cart record");
        };
        assert_eq!(fields.cart_size, fields.quantity as usize);
        assert_eq!(fields.cart_contents.len(), fields.cart_size);
        assert!(fields.cart_contents.iter().all(|id| *id == fields.product_id));
    }

    #[test]
    fn test_payment_total_uses_cart_before_clearing() {
        let mut fx = Fixture::new();
        let rules = MachineRules {
            payment_failure_rate: 0.0,
            ..Default::default()
        };
        fx.fire(EventKind::Login, &rules);
        fx.fire(EventKind::AddToCart, &rules);
        fx.fire(EventKind::AddToCart, &rules);
        let expected: Price = fx.actor.cart().iter().map(|p| p.price).sum();

        let record = fx.fire(EventKind::Payment, &rules);
        assert_eq!(record.severity(), Severity::Info);
        let EventRecord::Payment(fields) = record else {
            panic!("expected payment record");
        };
        assert!(fields.success);
        assert!(fields.error.is_none());
        assert_eq!(fields.total_amount, expected);
        assert!(fields.payment_link.ends_with(&fields.session_id));
        assert!(fx.actor.cart().is_empty());
    }

    #[test]
    fn test_failed_payment_record() {
        let mut fx = Fixture::new();
        let rules = MachineRules {
            payment_failure_rate: 1.0,
            ..Default::default()
        };
        fx.fire(EventKind::Login, &rules);
        fx.fire(EventKind::AddToCart, &rules);

        let record = fx.fire(EventKind::Payment, &rules);
        assert_eq!(record.severity(), Severity::Error);
        let EventRecord::Payment(fields) = record else {
            panic!("expected payment record");
        };
        assert_eq!(fields.error.as_deref(), Some(PAYMENT_GATEWAY_ERROR));
        assert!(!fx.actor.cart().is_empty());
    }

    #[test]
    fn test_shipping_record() {
        let mut fx = Fixture::new();
        let rules = MachineRules::default();
        fx.fire(EventKind::Login, &rules);

        let EventRecord::Shipping(fields) = fx.fire(EventKind::Shipping, &rules) else {
            panic!("expected shipping record");
        };
        assert!(SHIPPING_PROVIDERS.contains(&fields.shipping_provider.as_str()));
        let tracking = uuid::Uuid::parse_str(&fields.tracking_code).unwrap();
        assert_eq!(tracking.get_version_num(), 4);
        assert_eq!(tracking.get_variant(), uuid::Variant::RFC4122);
        assert_eq!(fields.delivery_estimate.len(), 10);
        assert!(!fields.shipping_address.is_empty());
    }

    #[test]
    fn test_delivery_estimate_within_bounds() {
        let emitter = EventEmitter::default();
        let mut rng = StdRng::seed_from_u64(2);
        let now = Utc::now();

        for _ in 0..50 {
            let estimate = emitter.delivery_estimate(now, &mut rng);
            let date = chrono::NaiveDate::parse_from_str(&estimate, "%Y-%m-%d").unwrap();
            let days = (date - now.date_naive()).num_days();
            assert!((1..=7).contains(&days), "days = {days}");
        }
    }

    #[test]
    fn test_user_agent_pools() {
        let mut rng = StdRng::seed_from_u64(4);
        let bots = EventEmitter::new(EmitterSettings {
            bot_user_agent_rate: 1.0,
            ..Default::default()
        });
        assert!(BOT_USER_AGENTS.contains(&bots.user_agent(&mut rng)));

        let browsers = EventEmitter::new(EmitterSettings {
            bot_user_agent_rate: 0.0,
            ..Default::default()
        });
        assert!(BROWSER_USER_AGENTS.contains(&browsers.user_agent(&mut rng)));
    }

    #[test]
    fn test_auxiliary_rate_bounds() {
        let mut fx = Fixture::new();
        let record = fx.fire(EventKind::Login, &MachineRules::default());

        let never = EventEmitter::new(EmitterSettings {
            auxiliary_rate: 0.0,
            ..Default::default()
        });
        assert!(never.auxiliary(&record, &mut fx.rng).is_none());

        let always = EventEmitter::new(EmitterSettings {
            auxiliary_rate: 1.0,
            ..Default::default()
        });
        let aux = always.auxiliary(&record, &mut fx.rng).unwrap();
        assert!(aux.is_auxiliary());
        assert!(matches!(aux.severity, Severity::Warn | Severity::Debug));
        assert_eq!(aux.event, Some(EventKind::Login));
    }

    #[test]
    fn test_default_bot_user_agent_share() {
        let emitter = EventEmitter::default();
        let mut rng = StdRng::seed_from_u64(95);
        let draws = 20_000;

        let bots = (0..draws)
            .filter(|_| BOT_USER_AGENTS.contains(&emitter.user_agent(&mut rng)))
            .count();
        let share = bots as f64 / draws as f64;
        assert!((share - 0.05).abs() <= 0.01, "bot share = {share}");
    }

    #[test]
    fn test_default_auxiliary_share_and_shape() {
        let mut fx = Fixture::new();
        let rules = MachineRules::default();
        fx.fire(EventKind::Login, &rules);
        let record = fx.fire(EventKind::Browse, &rules);

        let emitter = EventEmitter::default();
        let mut rng = StdRng::seed_from_u64(5);
        let draws = 20_000;
        let mut emitted = 0;

        for _ in 0..draws {
            let Some(aux) = emitter.auxiliary(&record, &mut rng) else {
                continue;
            };
            emitted += 1;
            assert!(matches!(aux.severity, Severity::Warn | Severity::Debug));
            let mut keys: Vec<&str> = aux.fields.keys().map(String::as_str).collect();
            keys.sort_unstable();
            assert_eq!(keys, ["auxiliary", "sessionId", "userId"]);
            assert_eq!(aux.field("userId"), Some(&serde_json::Value::from("314")));
        }

        let share = emitted as f64 / draws as f64;
        assert!((share - 0.05).abs() <= 0.01, "auxiliary share = {share}");
    }

    #[test]
    fn test_round4() {
        assert_eq!(round4(12.345_678), 12.3457);
        assert_eq!(round4(-0.000_04), -0.0);
    }
}
