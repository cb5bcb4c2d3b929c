use std::sync::Arc;

use sensorboard_realtime::ValueStore;
use sensorboard_sync::SessionRegistry;

use crate::config::ServerConfig;
use crate::ws::WsManager;

/// Shared application state available to all handlers via `State<AppState>`.
///
/// Cheap to clone; everything inside is behind `Arc` or already `Clone`.
#[derive(Clone)]
pub struct AppState {
    pub pool: sensorboard_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Realtime values that widgets bind to and devices write into.
    pub value_store: Arc<dyn ValueStore>,
    /// Open editing sessions, one per dashboard.
    pub sessions: Arc<SessionRegistry>,
    /// Live WebSocket connections.
    pub ws_manager: Arc<WsManager>,
}
