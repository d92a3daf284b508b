//! 加权事件选择器
//!
//! 每个 tick 抽取一个事件类型。默认实现按声明顺序累加权重，
//! 返回第一个累计值超过随机数的类型。

use rand::Rng;
use rand::rngs::StdRng;
use traffic_shared::config::EventWeight;
use traffic_shared::error::{Result, TrafficError};
use traffic_shared::events::EventKind;

/// 事件选择器
///
/// 生成器在 tick 之间跨 await 被引用，实现必须同时满足 `Send + Sync`。
pub trait EventSelector: Send + Sync {
    fn pick_event(&mut self, rng: &mut StdRng) -> EventKind;
}

/// 权重表
///
/// 权重无需归一化；遍历顺序就是构造时的顺序。
#[derive(Debug, Clone, PartialEq)]
pub struct WeightTable {
    entries: Vec<EventWeight>,
    total: f64,
}

impl WeightTable {
    pub fn new(entries: Vec<EventWeight>) -> Result<Self> {
        if entries.is_empty() {
            return Err(TrafficError::Validation("权重表不能为空".to_string()));
        }
        if let Some(bad) = entries
            .iter()
            .find(|e| !e.weight.is_finite() || e.weight < 0.0)
        {
            return Err(TrafficError::Validation(format!(
                "{} 的权重无效: {}",
                bad.event, bad.weight
            )));
        }

        let total: f64 = entries.iter().map(|e| e.weight).sum();
        if total <= 0.0 {
            return Err(TrafficError::Validation("至少需要一个正权重".to_string()));
        }

        Ok(Self { entries, total })
    }

    pub fn entries(&self) -> &[EventWeight] {
        &self.entries
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    /// 按给定的 [0, 1) 随机数选择事件
    ///
    /// 随机数会按总权重缩放；浮点误差导致走完整张表时回落到登录。
    pub fn pick_with(&self, r: f64) -> EventKind {
        let target = r * self.total;
        let mut cumulative = 0.0;
        for entry in &self.entries {
            cumulative += entry.weight;
            if target < cumulative {
                return entry.event;
            }
        }
        EventKind::Login
    }
}

impl Default for WeightTable {
    fn default() -> Self {
        let entries = traffic_shared::config::default_weights();
        let total = entries.iter().map(|e| e.weight).sum();
        Self { entries, total }
    }
}

impl EventSelector for WeightTable {
    fn pick_event(&mut self, rng: &mut StdRng) -> EventKind {
        self.pick_with(rng.random())
    }
}

/// 按固定序列循环返回事件，用于确定性场景
#[derive(Debug, Clone)]
pub struct SequenceSelector {
    sequence: Vec<EventKind>,
    position: usize,
}

impl SequenceSelector {
    pub fn new(sequence: Vec<EventKind>) -> Result<Self> {
        if sequence.is_empty() {
            return Err(TrafficError::Validation("事件序列不能为空".to_string()));
        }
        Ok(Self {
            sequence,
            position: 0,
        })
    }
}

impl EventSelector for SequenceSelector {
    fn pick_event(&mut self, _rng: &mut StdRng) -> EventKind {
        let kind = self.sequence[self.position % self.sequence.len()];
        self.position = self.position.wrapping_add(1);
        kind
    }
}
