//! 模拟商品模型
//!
//! 商品在引擎构造时生成一次，之后只读共享。

use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Serialize, Serializer};
use uuid::Builder;

use crate::catalog::{DEPARTMENTS, PRODUCT_ADJECTIVES, PRODUCT_MATERIALS, PRODUCT_NOUNS};

/// 金额（以分为单位存储）
///
/// 整数存储保证购物车求和精确；序列化为两位小数的字符串，如 `"129.90"`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Price(u64);

impl Price {
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    pub fn cents(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl std::iter::Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        Self(iter.map(|p| p.0).sum())
    }
}

impl<'a> std::iter::Sum<&'a Price> for Price {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// 模拟商品
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub product_id: String,
    pub name: String,
    pub category: String,
    pub price: Price,
}

impl Product {
    /// 生成随机商品
    ///
    /// 名称由形容词 + 材质 + 名词组成，价格在 1.00 到 1000.00 之间
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let name = format!(
            "{} {} {}",
            pick(rng, &PRODUCT_ADJECTIVES),
            pick(rng, &PRODUCT_MATERIALS),
            pick(rng, &PRODUCT_NOUNS),
        );

        Self {
            product_id: Builder::from_random_bytes(rng.random()).into_uuid().to_string(),
            name,
            category: pick(rng, &DEPARTMENTS).to_string(),
            price: Price::from_cents(rng.random_range(100..=100_000)),
        }
    }
}

fn pick<'a, R: Rng + ?Sized>(rng: &mut R, items: &[&'a str]) -> &'a str {
    items.choose(rng).copied().unwrap_or("Generic")
}
