//! The value store seam and its subscription type.

use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::stream::{BoxStream, Stream, StreamExt};
use serde_json::Value;

use crate::error::RealtimeError;

/// Characters a path segment may not contain.
const FORBIDDEN: &[char] = &['.', '#', '$', '[', ']'];

/// One item delivered by a [`Subscription`].
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    /// The full current value at the subscribed path (`null` when absent).
    Value(Value),
    /// The store reported a problem with this subscription. The stream may
    /// keep delivering values afterwards.
    Error(RealtimeError),
}

/// A live feed of value changes at one path.
///
/// The first event is the value at subscription time. Dropping the
/// subscription unsubscribes.
pub struct Subscription {
    path: String,
    events: BoxStream<'static, StoreEvent>,
}

impl Subscription {
    pub fn new<S>(path: impl Into<String>, events: S) -> Self
    where
        S: Stream<Item = StoreEvent> + Send + 'static,
    {
        Self {
            path: path.into(),
            events: events.boxed(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Stop receiving updates.
    pub fn unsubscribe(self) {
        tracing::debug!(path = %self.path, "Unsubscribed");
    }
}

impl Stream for Subscription {
    type Item = StoreEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.events.poll_next_unpin(cx)
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("path", &self.path).finish()
    }
}

/// A hierarchical realtime key-value database.
#[async_trait]
pub trait ValueStore: Send + Sync {
    /// Whether the store has what it needs to serve requests. Every other
    /// operation fails with [`RealtimeError::NotConfigured`] when this is
    /// false.
    fn is_configured(&self) -> bool;

    /// Watch a path. The returned stream starts with the current value.
    async fn subscribe(&self, path: &str) -> Result<Subscription, RealtimeError>;

    /// Read the current value once.
    async fn get_once(&self, path: &str) -> Result<Value, RealtimeError>;

    /// Replace the value at `path`. Writing `null` deletes it.
    async fn set(&self, path: &str, value: Value) -> Result<(), RealtimeError>;

    /// Cheap reachability check.
    async fn test_connection(&self) -> Result<(), RealtimeError> {
        self.get_once("/").await.map(|_| ())
    }
}

/// Split a slash path into segments, ignoring empty ones.
///
/// `"/sensors//kitchen/"` and `"sensors/kitchen"` are the same path. `"/"`
/// is the root and yields no segments.
pub fn parse_path(path: &str) -> Result<Vec<String>, RealtimeError> {
    let segments: Vec<String> = path
        .split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    if segments.iter().any(|s| s.contains(FORBIDDEN)) {
        return Err(RealtimeError::InvalidPath(path.to_string()));
    }
    Ok(segments)
}

/// Canonical form of a path: leading slash, no trailing or doubled slashes.
pub fn normalize_path(path: &str) -> Result<String, RealtimeError> {
    Ok(format!("/{}", parse_path(path)?.join("/")))
}
