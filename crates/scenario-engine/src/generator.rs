//! 单个 tick 的执行
//!
//! `ScenarioGenerator` 拥有身份池、选择器、随机数源和接收端。每个 tick：
//! 抽取事件 → 抽取用户 → 状态机规划 → 在副本上推进并合成记录 → 提交 → 投递 → 通知。
//! 合成失败时用户保持原状；投递前提交，保证不会出现半应用的购物车。

use std::sync::Arc;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};
use traffic_shared::config::SimulationConfig;
use traffic_shared::error::{Result, TrafficError};
use traffic_shared::events::EventKind;
use traffic_shared::observability::metrics;

use crate::emitter::{EmitterSettings, EventEmitter};
use crate::machine::{MachineRules, SkipReason, plan};
use crate::notify::{EventNotice, EventNotifier};
use crate::pool::IdentityPool;
use crate::record::LogRecord;
use crate::selector::{EventSelector, WeightTable};
use crate::sink::LogSink;

/// 生成器参数
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GeneratorSettings {
    pub rules: MachineRules,
    pub emitter: EmitterSettings,
}

impl From<&SimulationConfig> for GeneratorSettings {
    fn from(config: &SimulationConfig) -> Self {
        Self {
            rules: MachineRules {
                payment_failure_rate: config.payment_failure_rate,
                max_quantity: config.max_quantity,
            },
            emitter: EmitterSettings::from(config),
        }
    }
}

/// 一次成功的 tick 产出
#[derive(Debug, Clone, PartialEq)]
pub struct Emission {
    pub actor_id: String,
    pub primary: LogRecord,
    pub auxiliary: Option<LogRecord>,
}

/// tick 结果
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Emitted(Emission),
    /// 前置条件不满足，没有记录、没有状态变化、没有通知
    Skipped(SkipReason),
}

impl TickOutcome {
    pub fn is_emitted(&self) -> bool {
        matches!(self, Self::Emitted(_))
    }

    pub fn emission(&self) -> Option<&Emission> {
        match self {
            Self::Emitted(emission) => Some(emission),
            Self::Skipped(_) => None,
        }
    }
}

/// 场景生成器
pub struct ScenarioGenerator {
    pool: IdentityPool,
    selector: Box<dyn EventSelector>,
    rules: MachineRules,
    emitter: EventEmitter,
    sink: Arc<dyn LogSink>,
    notifier: EventNotifier,
    rng: StdRng,
    sequence: u64,
}

impl ScenarioGenerator {
    pub fn new(
        pool: IdentityPool,
        selector: Box<dyn EventSelector>,
        settings: GeneratorSettings,
        sink: Arc<dyn LogSink>,
        rng: StdRng,
    ) -> Self {
        Self {
            pool,
            selector,
            rules: settings.rules,
            emitter: EventEmitter::new(settings.emitter),
            sink,
            notifier: EventNotifier::default(),
            rng,
            sequence: 0,
        }
    }

    /// 按配置生成身份池与权重表
    ///
    /// 配置了 `seed` 时整个运行可复现，否则从操作系统取种子。
    pub fn from_config(config: &SimulationConfig, sink: Arc<dyn LogSink>) -> Result<Self> {
        config.validate()?;

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let pool = IdentityPool::generate(config.actor_count, config.product_count, &mut rng)?;
        let selector = WeightTable::new(config.weights.clone())?;

        debug!(
            actors = pool.actor_count(),
            products = pool.product_count(),
            sink = sink.name(),
            "场景生成器已创建"
        );

        Ok(Self::new(
            pool,
            Box::new(selector),
            GeneratorSettings::from(config),
            sink,
            rng,
        ))
    }

    /// 替换通知广播器，用于多个生成器共享同一组订阅者
    pub fn with_notifier(mut self, notifier: EventNotifier) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn pool(&self) -> &IdentityPool {
        &self.pool
    }

    pub fn sink(&self) -> &Arc<dyn LogSink> {
        &self.sink
    }

    pub fn notifier(&self) -> &EventNotifier {
        &self.notifier
    }

    /// 已发出的主记录数
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// 执行一个 tick：抽取事件类型和用户后交给 [`Self::run_event`]
    pub async fn tick(&mut self) -> Result<TickOutcome> {
        let kind = self.selector.pick_event(&mut self.rng);
        let index = self.rng.random_range(0..self.pool.actor_count());
        self.run_event(kind, index).await
    }

    /// 对指定用户执行指定事件
    pub async fn run_event(&mut self, kind: EventKind, actor_index: usize) -> Result<TickOutcome> {
        let actor = self
            .pool
            .actor(actor_index)
            .ok_or_else(|| TrafficError::InvalidArgument {
                field: "actor_index".to_string(),
                message: format!("越界: {actor_index} >= {}", self.pool.actor_count()),
            })?;

        let transition = match plan(kind, actor, self.pool.products(), &self.rules, &mut self.rng) {
            Ok(transition) => transition,
            Err(reason) => {
                debug!(event = %kind, actor_id = actor.id(), reason = reason.as_str(), "前置条件不满足，跳过");
                metrics::record_skip(reason.as_str());
                return Ok(TickOutcome::Skipped(reason));
            }
        };

        let mut staged = actor.clone();
        transition.apply(&mut staged);

        let record = self
            .emitter
            .synthesize(actor, &staged, &transition, &mut self.rng);
        let auxiliary = self.emitter.auxiliary(&record, &mut self.rng);
        let primary = record.into_log_record(self.emitter.settings().style, Utc::now())?;

        let actor_id = staged.id().to_string();
        if let Some(slot) = self.pool.actor_mut(actor_index) {
            *slot = staged;
        }

        self.sink.dispatch(&primary).await?;
        metrics::record_event(primary.event_name(), primary.severity.as_str());
        if let Some(aux) = &auxiliary {
            self.sink.dispatch(aux).await?;
            metrics::record_event(aux.event_name(), aux.severity.as_str());
        }

        self.sequence += 1;
        self.notifier.notify(EventNotice {
            sequence: self.sequence,
            event: kind,
            severity: primary.severity,
        });

        Ok(TickOutcome::Emitted(Emission {
            actor_id,
            primary,
            auxiliary,
        }))
    }

    /// 尽力向接收端投递一条 fatal 故障记录，失败只记日志
    pub async fn report_fault(&self, err: &TrafficError) {
        let record = LogRecord::fault(err.to_string(), self.emitter.settings().style);
        let sink = Arc::clone(&self.sink);
        if let Err(dispatch_err) = sink.dispatch(&record).await {
            warn!(
                sink = sink.name(),
                error = %dispatch_err,
                "故障记录投递失败"
            );
        }
    }
}

impl std::fmt::Debug for ScenarioGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScenarioGenerator")
            .field("actors", &self.pool.actor_count())
            .field("products", &self.pool.product_count())
            .field("sink", &self.sink.name())
            .field("sequence", &self.sequence)
            .finish()
    }
}
