//! 身份池
//!
//! 进程生命周期内固定数量的模拟用户与商品。构造后不增不减，
//! 用户的会话与购物车只能经由状态机修改。

use std::collections::HashSet;
use std::sync::Arc;

use rand::Rng;
use tracing::debug;
use traffic_shared::config::MAX_NUMERIC_IDS;
use traffic_shared::error::{Result, TrafficError};

use crate::models::{Actor, ActorProfile, Product};

/// 每个用户允许的 ID 重新生成次数下限
const MIN_ID_ATTEMPTS: usize = 1024;
const ATTEMPTS_PER_ACTOR: usize = 64;

/// 用户与商品池
#[derive(Debug, Clone)]
pub struct IdentityPool {
    actors: Vec<Actor>,
    products: Vec<Arc<Product>>,
}

impl IdentityPool {
    /// 生成身份池
    ///
    /// 用户 ID 为 1 到 6 位随机数字串（允许前导零），碰撞时重新生成；
    /// 超过尝试上限仍凑不齐时返回 `IdentityExhausted`。
    pub fn generate<R: Rng + ?Sized>(
        actor_count: usize,
        product_count: usize,
        rng: &mut R,
    ) -> Result<Self> {
        if actor_count == 0 || product_count == 0 {
            return Err(TrafficError::InvalidArgument {
                field: "pool".to_string(),
                message: format!(
                    "用户与商品数量必须 >= 1 (actors={actor_count}, products={product_count})"
                ),
            });
        }
        if actor_count > MAX_NUMERIC_IDS {
            return Err(TrafficError::IdentityExhausted {
                requested: actor_count,
                generated: 0,
            });
        }

        let max_attempts = actor_count.saturating_mul(ATTEMPTS_PER_ACTOR).max(MIN_ID_ATTEMPTS);
        let mut seen = HashSet::with_capacity(actor_count);
        let mut actors = Vec::with_capacity(actor_count);
        let mut attempts = 0usize;

        while actors.len() < actor_count {
            if attempts >= max_attempts {
                return Err(TrafficError::IdentityExhausted {
                    requested: actor_count,
                    generated: actors.len(),
                });
            }
            attempts += 1;

            let id = numeric_id(rng);
            if !seen.insert(id.clone()) {
                debug!(id = %id, "用户 ID 碰撞，重新生成");
                continue;
            }
            actors.push(Actor::new(id, ActorProfile::random(rng)));
        }

        let products = (0..product_count)
            .map(|_| Arc::new(Product::random(rng)))
            .collect();

        Ok(Self { actors, products })
    }

    /// 由现成的用户与商品构造，调用方负责 ID 唯一
    pub fn from_parts(actors: Vec<Actor>, products: Vec<Product>) -> Result<Self> {
        if actors.is_empty() || products.is_empty() {
            return Err(TrafficError::InvalidArgument {
                field: "pool".to_string(),
                message: "用户与商品都不能为空".to_string(),
            });
        }

        let mut seen = HashSet::with_capacity(actors.len());
        if let Some(dup) = actors.iter().find(|a| !seen.insert(a.id())) {
            return Err(TrafficError::InvalidArgument {
                field: "actors".to_string(),
                message: format!("重复的用户 ID: {}", dup.id()),
            });
        }

        Ok(Self {
            actors,
            products: products.into_iter().map(Arc::new).collect(),
        })
    }

    pub fn actors(&self) -> &[Actor] {
        &self.actors
    }

    pub fn products(&self) -> &[Arc<Product>] {
        &self.products
    }

    pub fn actor(&self, index: usize) -> Option<&Actor> {
        self.actors.get(index)
    }

    pub(crate) fn actor_mut(&mut self, index: usize) -> Option<&mut Actor> {
        self.actors.get_mut(index)
    }

    pub fn find(&self, id: &str) -> Option<&Actor> {
        self.actors.iter().find(|a| a.id() == id)
    }

    pub fn actor_count(&self) -> usize {
        self.actors.len()
    }

    pub fn product_count(&self) -> usize {
        self.products.len()
    }
}

fn numeric_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    let len = rng.random_range(1..=6);
    (0..len)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect()
}
