//! 模拟用户模型
//!
//! 用户的展示属性在生成后不变；会话与购物车只能由状态机推进。

use std::sync::Arc;

use fake::Fake;
use fake::faker::internet::en::{SafeEmail, Username};
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

use super::product::Product;
use crate::catalog::OPERATING_SYSTEMS;

/// 设备类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Desktop,
    Mobile,
    Tablet,
}

impl DeviceType {
    pub const ALL: [DeviceType; 3] = [Self::Desktop, Self::Mobile, Self::Tablet];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Desktop => "desktop",
            Self::Mobile => "mobile",
            Self::Tablet => "tablet",
        }
    }
}

/// 用户展示属性
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorProfile {
    pub username: String,
    pub email: String,
    pub device_type: DeviceType,
    pub operating_system: String,
}

impl ActorProfile {
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let device_type = *DeviceType::ALL.choose(rng).unwrap_or(&DeviceType::Desktop);
        let operating_system = OPERATING_SYSTEMS.choose(rng).copied().unwrap_or("Linux");

        Self {
            username: Username().fake_with_rng(rng),
            email: SafeEmail().fake_with_rng(rng),
            device_type,
            operating_system: operating_system.to_string(),
        }
    }
}

/// 用户在状态机中的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorState {
    /// 尚未登录
    Anonymous,
    /// 已登录，携带购物车条目数
    Authenticated { cart_items: usize },
}

/// 模拟用户
///
/// `session_id` 在首次登录前为空，之后每次登录都会替换；
/// `cart` 按加入顺序保存商品引用，数量以重复条目表示。
#[derive(Debug, Clone)]
pub struct Actor {
    id: String,
    profile: ActorProfile,
    session_id: Option<String>,
    cart: Vec<Arc<Product>>,
}

impl Actor {
    pub fn new(id: impl Into<String>, profile: ActorProfile) -> Self {
        Self {
            id: id.into(),
            profile,
            session_id: None,
            cart: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn profile(&self) -> &ActorProfile {
        &self.profile
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn cart(&self) -> &[Arc<Product>] {
        &self.cart
    }

    pub fn state(&self) -> ActorState {
        match self.session_id {
            None => ActorState::Anonymous,
            Some(_) => ActorState::Authenticated {
                cart_items: self.cart.len(),
            },
        }
    }

    // 以下修改方法仅供状态机使用

    pub(crate) fn replace_session(&mut self, session_id: String) {
        self.session_id = Some(session_id);
    }

    pub(crate) fn push_items(&mut self, product: &Arc<Product>, quantity: u32) {
        self.cart
            .extend(std::iter::repeat_n(Arc::clone(product), quantity as usize));
    }

    pub(crate) fn clear_cart(&mut self) {
        self.cart.clear();
    }
}
