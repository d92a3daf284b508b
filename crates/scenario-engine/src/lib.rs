//! Scenario Engine
//!
//! 合成流量模拟引擎：维护一组模拟用户，按权重抽取用户旅程事件
//! （登录 → 浏览 → 加购 → 结算 → 支付 → 发货），生成结构化分级日志并推送到日志接收端。
//!
//! # 主要模块
//!
//! - `models`: 模拟用户与商品
//! - `pool`: 身份池（固定数量的用户与商品）
//! - `selector`: 加权事件选择器
//! - `machine`: 用户状态机（前置条件校验与状态推进）
//! - `record` / `emitter`: 结构化日志记录的合成
//! - `sink`: 日志接收端
//! - `notify`: 每条事件一次的观察者通知
//! - `ticker`: tick 节奏
//! - `generator` / `engine`: 单次 tick 执行与启停控制的生成循环
//!
//! # 使用示例
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use scenario_engine::{Pacing, ScenarioEngine, ScenarioGenerator, sink::TracingSink};
//! use traffic_shared::config::SimulationConfig;
//!
//! let config = SimulationConfig::default();
//! let generator = ScenarioGenerator::from_config(&config, Arc::new(TracingSink::new()))?;
//! let engine = ScenarioEngine::new(generator, Pacing::from_config(&config));
//! engine.start();
//! ```

pub mod catalog;
pub mod emitter;
pub mod engine;
pub mod generator;
pub mod machine;
pub mod models;
pub mod notify;
pub mod pool;
pub mod record;
pub mod selector;
pub mod sink;
pub mod ticker;

pub use engine::{EngineStatus, RunState, ScenarioEngine};
pub use generator::{Emission, GeneratorSettings, ScenarioGenerator, TickOutcome};
pub use machine::SkipReason;
pub use notify::{EventNotice, EventNotifier};
pub use pool::IdentityPool;
pub use record::{EventRecord, LogRecord};
pub use selector::{EventSelector, SequenceSelector, WeightTable};
pub use ticker::{Pacing, TickSource};
pub use traffic_shared::events::{EventKind, Severity};
