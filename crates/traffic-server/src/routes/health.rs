//! 健康检查端点

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use scenario_engine::RunState;
use serde::Serialize;

use crate::state::AppState;

/// 健康检查响应
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// 就绪检查响应
#[derive(Debug, Serialize)]
struct ReadinessResponse {
    status: &'static str,
    generation: RunState,
}

pub fn health_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
}

/// 存活检查，用于 K8s liveness probe
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy" })
}

/// 就绪检查，附带生成循环的当前状态
async fn readiness_check(State(state): State<Arc<AppState>>) -> Json<ReadinessResponse> {
    Json(ReadinessResponse {
        status: "ready",
        generation: state.engine.state(),
    })
}
