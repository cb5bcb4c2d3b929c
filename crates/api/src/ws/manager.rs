use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::ws::Message;
use sensorboard_core::types::{DbId, Timestamp};
use tokio::sync::{mpsc, RwLock};

/// Outbound half of a connection's message channel.
pub type WsSender = mpsc::UnboundedSender<Message>;

pub struct WsConnection {
    pub user_id: DbId,
    /// The dashboard whose values this connection streams.
    pub dashboard_id: DbId,
    pub sender: WsSender,
    pub connected_at: Timestamp,
}

/// Registry of open live connections.
///
/// Wrap in `Arc` and share; all methods take `&self`.
pub struct WsManager {
    connections: RwLock<HashMap<String, WsConnection>>,
}

impl WsManager {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Register a connection. The caller keeps the sender for its own frames
    /// and forwards everything arriving on the receiver to the socket.
    pub async fn add(
        &self,
        conn_id: String,
        user_id: DbId,
        dashboard_id: DbId,
    ) -> (WsSender, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = WsConnection {
            user_id,
            dashboard_id,
            sender: tx.clone(),
            connected_at: chrono::Utc::now(),
        };
        self.connections.write().await.insert(conn_id, conn);
        (tx, rx)
    }

    pub async fn remove(&self, conn_id: &str) {
        if let Some(conn) = self.connections.write().await.remove(conn_id) {
            let open_secs = (chrono::Utc::now() - conn.connected_at).num_seconds();
            tracing::debug!(conn_id, user_id = conn.user_id, open_secs, "Live connection removed");
        }
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Number of viewers currently watching `dashboard_id`.
    pub async fn viewers_of(&self, dashboard_id: DbId) -> usize {
        self.connections
            .read()
            .await
            .values()
            .filter(|c| c.dashboard_id == dashboard_id)
            .count()
    }

    /// Send a Close frame to every viewer of `dashboard_id`. Returns how many
    /// were notified. Used when the dashboard is deleted.
    pub async fn close_dashboard(&self, dashboard_id: DbId) -> usize {
        let conns = self.connections.read().await;
        let mut count = 0;
        for conn in conns.values().filter(|c| c.dashboard_id == dashboard_id) {
            let _ = conn.sender.send(Message::Close(None));
            count += 1;
        }
        count
    }

    /// Send a Close frame to every connection, then clear the map.
    pub async fn shutdown_all(&self) {
        let mut conns = self.connections.write().await;
        let count = conns.len();
        for conn in conns.values() {
            let _ = conn.sender.send(Message::Close(None));
        }
        conns.clear();
        tracing::info!(count, "Closed all live connections");
    }

    pub async fn ping_all(&self) {
        let conns = self.connections.read().await;
        for conn in conns.values() {
            let _ = conn.sender.send(Message::Ping(Bytes::new()));
        }
    }
}

impl Default for WsManager {
    fn default() -> Self {
        Self::new()
    }
}
