//! tick 节奏
//!
//! 生成循环在每个 tick 之后等待 [`TickSource`]，节奏策略与事件生成解耦。

use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use traffic_shared::config::SimulationConfig;

/// tick 节奏源
#[async_trait]
pub trait TickSource: Send {
    /// 等待到下一个 tick
    async fn wait(&mut self);
}

/// 固定间隔
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay(pub Duration);

#[async_trait]
impl TickSource for FixedDelay {
    async fn wait(&mut self) {
        tokio::time::sleep(self.0).await;
    }
}

/// 固定间隔加 `[0, jitter]` 的均匀随机抖动
#[derive(Debug)]
pub struct Jittered {
    base: Duration,
    jitter: Duration,
    rng: StdRng,
}

impl Jittered {
    pub fn new(base: Duration, jitter: Duration, rng: StdRng) -> Self {
        Self { base, jitter, rng }
    }

    fn next_delay(&mut self) -> Duration {
        let extra_ms = self.rng.random_range(0..=self.jitter.as_millis() as u64);
        self.base + Duration::from_millis(extra_ms)
    }
}

#[async_trait]
impl TickSource for Jittered {
    async fn wait(&mut self) {
        let delay = self.next_delay();
        tokio::time::sleep(delay).await;
    }
}

/// 不停顿，只让出调度
#[derive(Debug, Clone, Copy, Default)]
pub struct Immediate;

#[async_trait]
impl TickSource for Immediate {
    async fn wait(&mut self) {
        tokio::task::yield_now().await;
    }
}

/// 节奏配置，每次启动循环时创建新的 tick 源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pacing {
    Fixed(Duration),
    /// `seed` 为空时抖动取自系统熵源
    Jittered {
        base: Duration,
        jitter: Duration,
        seed: Option<u64>,
    },
    Immediate,
}

/// 抖动序列与事件内容使用不同的随机流
const JITTER_STREAM: u64 = 0x6a69_7474_6572;

impl Default for Pacing {
    fn default() -> Self {
        Self::Fixed(Duration::from_millis(200))
    }
}

impl Pacing {
    pub fn from_config(config: &SimulationConfig) -> Self {
        let base = Duration::from_millis(config.tick_delay_ms);
        if config.jitter_ms > 0 {
            Self::Jittered {
                base,
                jitter: Duration::from_millis(config.jitter_ms),
                seed: config.seed,
            }
        } else {
            Self::Fixed(base)
        }
    }

    pub fn ticks(&self) -> Box<dyn TickSource> {
        match *self {
            Self::Fixed(delay) => Box::new(FixedDelay(delay)),
            Self::Jittered { base, jitter, seed } => {
                let rng = match seed {
                    Some(seed) => StdRng::seed_from_u64(seed ^ JITTER_STREAM),
                    None => StdRng::from_os_rng(),
                };
                Box::new(Jittered::new(base, jitter, rng))
            }
            Self::Immediate => Box::new(Immediate),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[test]
    fn test_pacing_from_config() {
        let config = SimulationConfig::default();
        assert_eq!(
            Pacing::from_config(&config),
            Pacing::Fixed(Duration::from_millis(200))
        );

        let jittered = SimulationConfig {
            tick_delay_ms: 100,
            jitter_ms: 50,
            ..Default::default()
        };
        assert_eq!(
            Pacing::from_config(&jittered),
            Pacing::Jittered {
                base: Duration::from_millis(100),
                jitter: Duration::from_millis(50),
                seed: None,
            }
        );

        let seeded = SimulationConfig {
            seed: Some(9),
            ..jittered
        };
        assert!(matches!(
            Pacing::from_config(&seeded),
            Pacing::Jittered { seed: Some(9), .. }
        ));
    }

    async fn elapsed_per_tick(pacing: Pacing, n: usize) -> Vec<Duration> {
        let mut ticks = pacing.ticks();
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            let start = Instant::now();
            ticks.wait().await;
            out.push(start.elapsed());
        }
        out
    }

    #[tokio::test(start_paused = true)]
    async fn test_seeded_jitter_is_reproducible() {
        let pacing = Pacing::Jittered {
            base: Duration::from_millis(100),
            jitter: Duration::from_millis(500),
            seed: Some(21),
        };

        let first = elapsed_per_tick(pacing, 20).await;
        let second = elapsed_per_tick(pacing, 20).await;
        assert_eq!(first, second);
        // 抖动确实生效
        assert!(first.iter().any(|d| *d != first[0]));
    }

    #[test]
    fn test_jitter_bounds() {
        let mut ticks = Jittered::new(
            Duration::from_millis(100),
            Duration::from_millis(20),
            StdRng::seed_from_u64(1),
        );
        for _ in 0..100 {
            let delay = ticks.next_delay();
            assert!(delay >= Duration::from_millis(100));
            assert!(delay <= Duration::from_millis(120));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_delay_waits() {
        let mut ticks = Pacing::Fixed(Duration::from_millis(200)).ticks();
        let start = Instant::now();
        ticks.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_does_not_advance_time() {
        let mut ticks = Pacing::Immediate.ticks();
        let start = Instant::now();
        for _ in 0..10 {
            ticks.wait().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
