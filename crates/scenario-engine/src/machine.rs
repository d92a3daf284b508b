//! 用户状态机
//!
//! 先由 [`plan`] 根据事件类型和用户当前状态决定转移（或跳过），
//! 再由 [`Transition::apply`] 把转移写回用户。两步分开，
//! 使生成器可以先在副本上推进、合成记录成功后再整体提交。

use std::sync::Arc;

use rand::Rng;
use rand::seq::IndexedRandom;
use traffic_shared::events::EventKind;
use uuid::Builder;

use crate::models::{Actor, Product};

/// 前置条件不满足时的跳过原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// 用户尚未登录
    NoSession,
    /// 结算或支付时购物车为空
    EmptyCart,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoSession => "no_session",
            Self::EmptyCart => "empty_cart",
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 状态机参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MachineRules {
    pub payment_failure_rate: f64,
    /// 单次加购数量上限（含）
    pub max_quantity: u32,
}

impl Default for MachineRules {
    fn default() -> Self {
        Self {
            payment_failure_rate: 0.05,
            max_quantity: 5,
        }
    }
}

/// 支付结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    Succeeded,
    Failed,
}

/// 已决定的状态转移
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Login { session_id: String },
    Browse { product: Arc<Product> },
    AddToCart { product: Arc<Product>, quantity: u32 },
    Checkout,
    Payment { outcome: PaymentOutcome },
    Shipping,
}

impl Transition {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Login { .. } => EventKind::Login,
            Self::Browse { .. } => EventKind::Browse,
            Self::AddToCart { .. } => EventKind::AddToCart,
            Self::Checkout => EventKind::Checkout,
            Self::Payment { .. } => EventKind::Payment,
            Self::Shipping => EventKind::Shipping,
        }
    }

    /// 把转移写回用户
    ///
    /// 登录只替换会话，从不清空购物车；只有支付成功会清空购物车。
    pub fn apply(&self, actor: &mut Actor) {
        match self {
            Self::Login { session_id } => actor.replace_session(session_id.clone()),
            Self::AddToCart { product, quantity } => actor.push_items(product, *quantity),
            Self::Payment {
                outcome: PaymentOutcome::Succeeded,
            } => actor.clear_cart(),
            Self::Browse { .. }
            | Self::Checkout
            | Self::Payment {
                outcome: PaymentOutcome::Failed,
            }
            | Self::Shipping => {}
        }
    }
}

/// 校验前置条件并决定转移
///
/// 不修改用户。商品池为空时浏览和加购退化为跳过（身份池保证不会发生）。
pub fn plan<R: Rng + ?Sized>(
    kind: EventKind,
    actor: &Actor,
    products: &[Arc<Product>],
    rules: &MachineRules,
    rng: &mut R,
) -> Result<Transition, SkipReason> {
    if kind.requires_session() && actor.session_id().is_none() {
        return Err(SkipReason::NoSession);
    }
    if kind.requires_cart() && actor.cart().is_empty() {
        return Err(SkipReason::EmptyCart);
    }

    let transition = match kind {
        EventKind::Login => Transition::Login {
            session_id: Builder::from_random_bytes(rng.random()).into_uuid().to_string(),
        },
        EventKind::Browse => Transition::Browse {
            product: pick_product(products, rng)?,
        },
        EventKind::AddToCart => Transition::AddToCart {
            product: pick_product(products, rng)?,
            quantity: rng.random_range(1..=rules.max_quantity.max(1)),
        },
        EventKind::Checkout => Transition::Checkout,
        EventKind::Payment => {
            let failed = rng.random_bool(rules.payment_failure_rate.clamp(0.0, 1.0));
            Transition::Payment {
                outcome: if failed {
                    PaymentOutcome::Failed
                } else {
                    PaymentOutcome::Succeeded
                },
            }
        }
        EventKind::Shipping => Transition::Shipping,
    };

    Ok(transition)
}

fn pick_product<R: Rng + ?Sized>(
    products: &[Arc<Product>],
    rng: &mut R,
) -> Result<Arc<Product>, SkipReason> {
    products.choose(rng).cloned().ok_or(SkipReason::EmptyCart)
}
