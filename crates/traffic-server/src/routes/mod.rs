//! HTTP 控制面路由
//!
//! - `POST /api/generation/start` / `POST /api/generation/stop` / `GET /api/generation/status`
//! - `GET /ws` - 事件推送与文本指令
//! - `GET /health` / `GET /ready`
//! - 可选的静态前端目录作为兜底路由

mod generation;
mod health;
mod stream;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::state::AppState;

pub use generation::generation_routes;
pub use health::health_routes;
pub use stream::{StreamMessage, stream_routes};

/// 组装完整的应用路由
pub fn app(state: Arc<AppState>, static_dir: Option<&str>) -> Router {
    let mut router = Router::new()
        .merge(health_routes())
        .merge(generation_routes())
        .merge(stream_routes())
        .with_state(state);

    if let Some(dir) = static_dir.filter(|d| !d.is_empty()) {
        info!(dir, "挂载静态前端目录");
        router = router.fallback_service(ServeDir::new(dir).append_index_html_on_directories(true));
    }

    router.layer(TraceLayer::new_for_http()).layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    )
}
