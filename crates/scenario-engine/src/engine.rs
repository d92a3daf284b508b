//! 生成循环与启停控制
//!
//! `ScenarioEngine` 是可廉价克隆的句柄。运行状态由引擎实例持有（`Stopped | Running`），
//! 只能经由 [`ScenarioEngine::start`] / [`ScenarioEngine::stop`] 改变。
//!
//! 每次启动都会递增 epoch，循环只在状态为 `Running` 且 epoch 与自身一致时继续，
//! 因此快速的 stop → start 不会留下两个同时产生 tick 的循环。

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, error, info};
use traffic_shared::observability::metrics;

use crate::generator::{ScenarioGenerator, TickOutcome};
use crate::notify::{EventNotice, EventNotifier};
use crate::pool::IdentityPool;
use crate::ticker::Pacing;

/// 引擎运行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    #[default]
    Stopped,
    Running,
}

/// 引擎状态快照
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct EngineStatus {
    pub state: RunState,
    /// 已执行的 tick 总数（含跳过）
    pub ticks: u64,
    pub emitted: u64,
    pub skipped: u64,
    pub faults: u64,
    pub last_fault: Option<String>,
}

#[derive(Debug, Default)]
struct Control {
    state: RunState,
    epoch: u64,
    status: EngineStatus,
}

struct Inner {
    control: Mutex<Control>,
    generator: tokio::sync::Mutex<ScenarioGenerator>,
    pacing: Pacing,
    notifier: EventNotifier,
}

impl Inner {
    fn is_current(&self, epoch: u64) -> bool {
        let control = self.control.lock();
        control.state == RunState::Running && control.epoch == epoch
    }

    fn record_tick(&self, outcome: &TickOutcome) {
        let mut control = self.control.lock();
        control.status.ticks += 1;
        match outcome {
            TickOutcome::Emitted(_) => control.status.emitted += 1,
            TickOutcome::Skipped(_) => control.status.skipped += 1,
        }
    }

    /// 记录故障；仍是当前循环时把状态置为停止
    fn fail(&self, epoch: u64, message: String) {
        let mut control = self.control.lock();
        control.status.faults += 1;
        control.status.last_fault = Some(message);
        if control.epoch == epoch && control.state == RunState::Running {
            control.state = RunState::Stopped;
            metrics::set_running(false);
        }
    }
}

/// 场景引擎
#[derive(Clone)]
pub struct ScenarioEngine {
    inner: Arc<Inner>,
}

impl ScenarioEngine {
    pub fn new(generator: ScenarioGenerator, pacing: Pacing) -> Self {
        let notifier = generator.notifier().clone();
        Self {
            inner: Arc::new(Inner {
                control: Mutex::new(Control::default()),
                generator: tokio::sync::Mutex::new(generator),
                pacing,
                notifier,
            }),
        }
    }

    /// 启动生成循环
    ///
    /// 已在运行时不做任何事并返回 `false`。必须在 tokio 运行时内调用。
    pub fn start(&self) -> bool {
        let epoch = {
            let mut control = self.inner.control.lock();
            if control.state == RunState::Running {
                debug!("生成循环已在运行，忽略启动请求");
                return false;
            }
            control.state = RunState::Running;
            control.epoch += 1;
            control.epoch
        };

        metrics::set_running(true);
        info!(epoch, pacing = ?self.inner.pacing, "生成循环启动");
        tokio::spawn(run_loop(Arc::clone(&self.inner), epoch));
        true
    }

    /// 请求停止；正在执行的 tick 会完成，之后不再产生记录
    pub fn stop(&self) -> bool {
        let mut control = self.inner.control.lock();
        if control.state == RunState::Stopped {
            return false;
        }
        control.state = RunState::Stopped;
        metrics::set_running(false);
        info!(epoch = control.epoch, "生成循环停止");
        true
    }

    pub fn state(&self) -> RunState {
        self.inner.control.lock().state
    }

    pub fn is_running(&self) -> bool {
        self.state() == RunState::Running
    }

    pub fn status(&self) -> EngineStatus {
        let control = self.inner.control.lock();
        EngineStatus {
            state: control.state,
            ..control.status.clone()
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventNotice> {
        self.inner.notifier.subscribe()
    }

    /// 身份池快照；会等待正在执行的 tick 结束
    pub async fn pool_snapshot(&self) -> IdentityPool {
        self.inner.generator.lock().await.pool().clone()
    }
}

impl std::fmt::Debug for ScenarioEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScenarioEngine")
            .field("status", &self.status())
            .field("pacing", &self.inner.pacing)
            .finish()
    }
}

async fn run_loop(inner: Arc<Inner>, epoch: u64) {
    let mut ticks = inner.pacing.ticks();

    loop {
        if !inner.is_current(epoch) {
            break;
        }

        let result = {
            let mut generator = inner.generator.lock().await;
            // 等锁期间可能已被停止或被新的循环取代
            if !inner.is_current(epoch) {
                break;
            }
            match generator.tick().await {
                Ok(outcome) => Ok(outcome),
                Err(err) => {
                    generator.report_fault(&err).await;
                    Err(err)
                }
            }
        };

        match result {
            Ok(outcome) => inner.record_tick(&outcome),
            Err(err) => {
                error!(epoch, code = err.code(), error = %err, "生成故障，循环停止");
                metrics::record_fault();
                inner.fail(epoch, err.to_string());
                break;
            }
        }

        ticks.wait().await;
    }

    debug!(epoch, "生成循环退出");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::EmitterSettings;
    use crate::generator::GeneratorSettings;
    use crate::machine::MachineRules;
    use crate::selector::SequenceSelector;
    use crate::sink::{LogSink, MemorySink, MockLogSink};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::time::Duration;
    use traffic_shared::error::TrafficError;
    use traffic_shared::events::EventKind;

    fn engine_with(sink: Arc<dyn LogSink>, sequence: Vec<EventKind>) -> ScenarioEngine {
        let mut rng = StdRng::seed_from_u64(3);
        let pool = IdentityPool::generate(1, 1, &mut rng).unwrap();
        let settings = GeneratorSettings {
            rules: MachineRules {
                payment_failure_rate: 0.0,
                max_quantity: 5,
            },
            emitter: EmitterSettings {
                auxiliary_rate: 0.0,
                ..Default::default()
            },
        };
        let generator = ScenarioGenerator::new(
            pool,
            Box::new(SequenceSelector::new(sequence).unwrap()),
            settings,
            sink,
            rng,
        );
        ScenarioEngine::new(generator, Pacing::Fixed(Duration::from_millis(200)))
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_twice_runs_single_loop() {
        let sink = MemorySink::new();
        let engine = engine_with(Arc::new(sink.clone()), vec![EventKind::Login]);

        assert!(engine.start());
        assert!(!engine.start());
        assert_eq!(engine.state(), RunState::Running);

        tokio::time::sleep(Duration::from_millis(1000)).await;

        let ticks = engine.status().ticks;
        assert!((5..=6).contains(&ticks), "ticks = {ticks}");
        assert_eq!(sink.len() as u64, ticks);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_halts_records_and_notices() {
        let sink = MemorySink::new();
        let engine = engine_with(Arc::new(sink.clone()), vec![EventKind::Login]);
        let mut rx = engine.subscribe();

        engine.start();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(engine.stop());
        assert!(!engine.stop());
        // 让正在执行的 tick 结束
        tokio::time::sleep(Duration::from_millis(10)).await;

        let count = sink.len();
        while rx.try_recv().is_ok() {}

        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(sink.len(), count);
        assert!(rx.try_recv().is_err());
        assert_eq!(engine.state(), RunState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_quick_restart_keeps_one_loop() {
        let sink = MemorySink::new();
        let engine = engine_with(Arc::new(sink.clone()), vec![EventKind::Login]);

        engine.start();
        tokio::time::sleep(Duration::from_millis(50)).await;
        engine.stop();
        engine.start();
        sink.clear();

        tokio::time::sleep(Duration::from_millis(1000)).await;
        let produced = sink.len();
        assert!((5..=6).contains(&produced), "produced = {produced}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_fault_stops_loop() {
        let mut sink = MockLogSink::new();
        sink.expect_dispatch().returning(|_| {
            Err(TrafficError::SinkRejected {
                sink: "mock".to_string(),
                status: 401,
            })
        });
        sink.expect_name().return_const("mock");
        let engine = engine_with(Arc::new(sink), vec![EventKind::Login]);

        engine.start();
        tokio::time::sleep(Duration::from_millis(1000)).await;

        let status = engine.status();
        assert_eq!(status.state, RunState::Stopped);
        assert_eq!(status.faults, 1);
        assert_eq!(status.ticks, 0);
        assert!(status.last_fault.unwrap().contains("401"));

        // 故障后可重新启动
        assert!(engine.start());
        engine.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_preserves_actor_state() {
        let sink = MemorySink::new();
        let engine = engine_with(
            Arc::new(sink.clone()),
            vec![EventKind::Login, EventKind::AddToCart],
        );

        engine.start();
        tokio::time::sleep(Duration::from_millis(250)).await;
        engine.stop();
        tokio::time::sleep(Duration::from_millis(500)).await;

        let before = engine.pool_snapshot().await;
        let actor = before.actor(0).unwrap();
        assert!(actor.session_id().is_some());
        let cart_len = actor.cart().len();
        assert!(cart_len > 0);

        engine.start();
        tokio::time::sleep(Duration::from_millis(10)).await;
        engine.stop();
        tokio::time::sleep(Duration::from_millis(500)).await;

        let after = engine.pool_snapshot().await;
        assert!(after.actor(0).unwrap().cart().len() >= cart_len);
    }

    #[test]
    fn test_status_serialization() {
        let status = EngineStatus {
            state: RunState::Running,
            ticks: 3,
            ..Default::default()
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["state"], "running");
        assert_eq!(json["ticks"], 3);
        assert!(json["last_fault"].is_null());
    }

    fn assert_send<T: Send>(_: &T) {}

    #[test]
    fn test_loop_future_is_send() {
        fn assert_sync<T: Sync>() {}
        assert_sync::<ScenarioGenerator>();

        let engine = engine_with(Arc::new(MemorySink::new()), vec![EventKind::Login]);
        let fut = run_loop(Arc::clone(&engine.inner), 1);
        assert_send(&fut);

        let generator = engine.inner.generator.try_lock().unwrap();
        let err = TrafficError::Internal("boom".to_string());
        assert_send(&generator.report_fault(&err));
    }
}
