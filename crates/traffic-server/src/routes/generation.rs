//! 生成启停接口
//!
//! 重复的 start 不会重启循环，只返回当前状态。

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use scenario_engine::EngineStatus;
use tracing::info;

use crate::state::AppState;

pub fn generation_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/generation/start", post(start_generation))
        .route("/api/generation/stop", post(stop_generation))
        .route("/api/generation/status", get(generation_status))
}

/// POST /api/generation/start
async fn start_generation(State(state): State<Arc<AppState>>) -> Json<EngineStatus> {
    let started = state.engine.start();
    info!(started, "收到开始生成请求");
    Json(state.engine.status())
}

/// POST /api/generation/stop
async fn stop_generation(State(state): State<Arc<AppState>>) -> Json<EngineStatus> {
    let stopped = state.engine.stop();
    info!(stopped, "收到停止生成请求");
    Json(state.engine.status())
}

/// GET /api/generation/status
async fn generation_status(State(state): State<Arc<AppState>>) -> Json<EngineStatus> {
    Json(state.engine.status())
}
