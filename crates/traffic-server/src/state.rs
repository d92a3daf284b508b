//! 路由共享状态

use scenario_engine::ScenarioEngine;

/// 控制面共享状态
#[derive(Debug, Clone)]
pub struct AppState {
    pub engine: ScenarioEngine,
}

impl AppState {
    pub fn new(engine: ScenarioEngine) -> Self {
        Self { engine }
    }
}
