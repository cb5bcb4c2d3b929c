//! The per-dashboard live value feed.
//!
//! A viewer connects to `/dashboards/{id}/live` and receives a JSON frame
//! every time any bound value changes:
//!
//! ```text
//! {"type":"values","values":{"/sensors/t":21.5},"state":"connected","errors":{}}
//! ```
//!
//! While the dashboard is in edit mode the feed holds no subscriptions and
//! sends `{"type":"suspended"}` once. Leaving edit mode, or any change to the
//! set of bound paths, tears the bindings down and builds them again.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use sensorboard_core::error::CoreError;
use sensorboard_core::live::ConnectionState;
use sensorboard_core::types::DbId;
use sensorboard_realtime::{MultiBinding, MultiSnapshot, ValueStore};
use sensorboard_sync::LiveConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;

use crate::error::{AppError, AppResult};
use crate::handlers::dashboards::owned_session;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;
use crate::ws::manager::WsSender;

#[derive(Debug, Deserialize)]
pub struct LiveQuery {
    /// Access token, for clients that cannot set headers on the upgrade.
    pub token: Option<String>,
}

/// A frame sent to live viewers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LiveFrame {
    Values {
        values: BTreeMap<String, Value>,
        state: ConnectionState,
        errors: BTreeMap<String, String>,
    },
    Suspended,
}

impl From<MultiSnapshot> for LiveFrame {
    fn from(snapshot: MultiSnapshot) -> Self {
        LiveFrame::Values {
            values: snapshot.values,
            state: snapshot.state,
            errors: snapshot.errors,
        }
    }
}

/// GET /api/v1/dashboards/{id}/live
pub async fn live_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(dashboard_id): Path<DbId>,
    Query(query): Query<LiveQuery>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let auth = authenticate(&state, &headers, query.token.as_deref())?;
    let session = owned_session(&state, dashboard_id, auth.user_id).await?;
    let config_rx = session.lock().await.live_config();
    // Held for the life of the socket so the session is not evicted.
    let viewer = state.sessions.attach_viewer(dashboard_id).await;

    Ok(ws.on_upgrade(move |socket| async move {
        handle_live(socket, state, config_rx, auth.user_id, dashboard_id).await;
        drop(viewer);
    }))
}

fn authenticate(state: &AppState, headers: &HeaderMap, token: Option<&str>) -> AppResult<AuthUser> {
    let bearer = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match bearer.or(token) {
        Some(token) => AuthUser::from_token(token, state),
        None => Err(AppError::Core(CoreError::Unauthorized(
            "Missing access token".into(),
        ))),
    }
}

/// Bindings for the current live config, if not suspended.
struct LiveFeed {
    binding: Option<MultiBinding>,
    updates: Option<watch::Receiver<MultiSnapshot>>,
}

impl LiveFeed {
    fn start(store: &Arc<dyn ValueStore>, config: &LiveConfig, tx: &WsSender) -> Self {
        if config.edit_mode {
            send_frame(tx, &LiveFrame::Suspended);
            return Self {
                binding: None,
                updates: None,
            };
        }

        let binding = MultiBinding::connect(Arc::clone(store), config.bindings.clone());
        let mut updates = binding.watch();
        // Deliver the initial (connecting) snapshot too.
        updates.mark_changed();
        Self {
            binding: Some(binding),
            updates: Some(updates),
        }
    }

    fn stop(&mut self) {
        self.updates = None;
        if let Some(binding) = self.binding.take() {
            binding.disconnect();
        }
    }
}

/// Next snapshot from the feed. Never resolves while suspended.
async fn next_snapshot(updates: &mut Option<watch::Receiver<MultiSnapshot>>) -> MultiSnapshot {
    if let Some(rx) = updates {
        if rx.changed().await.is_ok() {
            return rx.borrow_and_update().clone();
        }
        *updates = None;
    }
    std::future::pending().await
}

fn send_frame(tx: &WsSender, frame: &LiveFrame) {
    match serde_json::to_string(frame) {
        Ok(text) => {
            let _ = tx.send(Message::Text(text.into()));
        }
        Err(e) => tracing::error!(error = %e, "Failed to encode live frame"),
    }
}

async fn handle_live(
    socket: WebSocket,
    state: AppState,
    mut config_rx: watch::Receiver<LiveConfig>,
    user_id: DbId,
    dashboard_id: DbId,
) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, dashboard_id, user_id, "Live feed connected");

    let (tx, mut rx) = state
        .ws_manager
        .add(conn_id.clone(), user_id, dashboard_id)
        .await;
    let (mut sink, mut stream) = socket.split();

    // Sender task: forward channel messages to the socket.
    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let closing = matches!(msg, Message::Close(_));
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "Live feed sink closed");
                break;
            }
            if closing {
                break;
            }
        }
    });

    let config = config_rx.borrow_and_update().clone();
    let mut feed = LiveFeed::start(&state.value_store, &config, &tx);

    loop {
        tokio::select! {
            changed = config_rx.changed() => {
                if changed.is_err() {
                    // Session closed.
                    break;
                }
                let config = config_rx.borrow_and_update().clone();
                tracing::debug!(
                    conn_id = %conn_id,
                    edit_mode = config.edit_mode,
                    bindings = config.bindings.len(),
                    "Rebuilding live bindings"
                );
                feed.stop();
                feed = LiveFeed::start(&state.value_store, &config, &tx);
            }
            snapshot = next_snapshot(&mut feed.updates) => {
                send_frame(&tx, &LiveFrame::from(snapshot));
            }
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(Message::Pong(_))) => {
                    tracing::trace!(conn_id = %conn_id, "Pong received");
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(conn_id = %conn_id, error = %e, "Live feed receive error");
                    break;
                }
            },
        }
    }

    feed.stop();
    state.ws_manager.remove(&conn_id).await;
    send_task.abort();
    tracing::info!(conn_id = %conn_id, dashboard_id, "Live feed disconnected");
}
