use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok` when every dependency answers, otherwise `degraded`.
    pub status: &'static str,
    pub version: &'static str,
    pub db_healthy: bool,
    /// Whether the realtime value store answers a test read.
    pub realtime_healthy: bool,
    pub open_sessions: usize,
    pub live_connections: usize,
}

/// GET /health
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_healthy = sensorboard_db::health_check(&state.pool).await.is_ok();
    let realtime_healthy = state.value_store.test_connection().await.is_ok();

    let status = if db_healthy && realtime_healthy {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
        realtime_healthy,
        open_sessions: state.sessions.len().await,
        live_connections: state.ws_manager.connection_count().await,
    })
}

/// Mounted at the root, not under `/api/v1`.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
