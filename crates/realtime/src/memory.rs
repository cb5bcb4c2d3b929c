//! In-process value store.
//!
//! Holds the whole tree as one JSON document behind a lock and fans change
//! notifications out over a `broadcast` channel. Each subscription re-reads
//! its path when a related path changes and emits only when the value there
//! actually differs from what it last delivered.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde_json::{Map, Value};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, RwLock};

use crate::error::RealtimeError;
use crate::store::{normalize_path, parse_path, StoreEvent, Subscription, ValueStore};

const DEFAULT_CAPACITY: usize = 1024;

struct Inner {
    tree: RwLock<Value>,
    /// Segments of every path written, in write order.
    changes: broadcast::Sender<Arc<[String]>>,
}

impl Inner {
    async fn read_at(&self, segments: &[String]) -> Value {
        let tree = self.tree.read().await;
        let found = segments
            .iter()
            .try_fold(&*tree, |node, seg| node.get(seg.as_str()))
            .cloned();
        found.unwrap_or(Value::Null)
    }
}

/// Shared, cloneable in-memory store.
#[derive(Clone)]
pub struct MemoryValueStore {
    inner: Arc<Inner>,
    configured: bool,
}

impl MemoryValueStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// `capacity` bounds how many unread changes a slow subscriber may fall
    /// behind before it resynchronizes from the tree.
    pub fn with_capacity(capacity: usize) -> Self {
        let (changes, _) = broadcast::channel(capacity);
        Self {
            inner: Arc::new(Inner {
                tree: RwLock::new(Value::Null),
                changes,
            }),
            configured: true,
        }
    }

    /// A store that rejects every operation, as when no connection settings
    /// were provided.
    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::new()
        }
    }

    /// Number of live subscriptions.
    pub fn active_subscriptions(&self) -> usize {
        self.inner.changes.receiver_count()
    }

    fn check_configured(&self) -> Result<(), RealtimeError> {
        if self.configured {
            Ok(())
        } else {
            Err(RealtimeError::NotConfigured)
        }
    }
}

impl Default for MemoryValueStore {
    fn default() -> Self {
        Self::new()
    }
}

struct Watch {
    inner: Arc<Inner>,
    segments: Vec<String>,
    rx: broadcast::Receiver<Arc<[String]>>,
    last: Value,
}

/// Two paths are related when one is an ancestor of (or equal to) the other.
fn related(a: &[String], b: &[String]) -> bool {
    a.iter().zip(b).all(|(x, y)| x == y)
}

fn is_empty_node(value: &Value) -> bool {
    value.is_null() || value.as_object().is_some_and(Map::is_empty)
}

/// Write `value` below `node`, creating intermediate objects and pruning
/// any that end up empty.
fn write_at(node: &mut Value, segments: &[String], value: Value) {
    let Some((head, rest)) = segments.split_first() else {
        *node = value;
        return;
    };

    if !node.is_object() {
        if value.is_null() {
            return;
        }
        *node = Value::Object(Map::new());
    }
    let Value::Object(map) = node else { return };

    let child = map.entry(head.clone()).or_insert(Value::Null);
    write_at(child, rest, value);
    if is_empty_node(child) {
        map.remove(head);
    }
}

#[async_trait]
impl ValueStore for MemoryValueStore {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn subscribe(&self, path: &str) -> Result<Subscription, RealtimeError> {
        self.check_configured()?;
        let segments = parse_path(path)?;

        // Subscribe before reading so no write can slip between the two.
        let rx = self.inner.changes.subscribe();
        let initial = self.inner.read_at(&segments).await;

        let watch = Watch {
            inner: Arc::clone(&self.inner),
            segments,
            rx,
            last: initial.clone(),
        };

        let updates = stream::unfold(watch, |mut w| async move {
            loop {
                match w.rx.recv().await {
                    Ok(changed) if !related(&changed, &w.segments) => continue,
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "Subscriber lagged, resynchronizing");
                    }
                    Err(RecvError::Closed) => return None,
                }

                let current = w.inner.read_at(&w.segments).await;
                if current != w.last {
                    w.last = current.clone();
                    return Some((StoreEvent::Value(current), w));
                }
            }
        });

        let events = stream::once(async move { StoreEvent::Value(initial) }).chain(updates);
        Ok(Subscription::new(normalize_path(path)?, events))
    }

    async fn get_once(&self, path: &str) -> Result<Value, RealtimeError> {
        self.check_configured()?;
        let segments = parse_path(path)?;
        Ok(self.inner.read_at(&segments).await)
    }

    async fn set(&self, path: &str, value: Value) -> Result<(), RealtimeError> {
        self.check_configured()?;
        let segments = parse_path(path)?;

        {
            let mut tree = self.inner.tree.write().await;
            write_at(&mut tree, &segments, value);
            if is_empty_node(&tree) {
                *tree = Value::Null;
            }
        }

        // No receivers is fine.
        let _ = self.inner.changes.send(segments.into());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    async fn next_value(sub: &mut Subscription) -> Value {
        match sub.next().await {
            Some(StoreEvent::Value(v)) => v,
            other => panic!("expected a value, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn set_and_get_nested_paths() {
        let store = MemoryValueStore::new();
        store.set("/sensors/kitchen/temperature", json!(21.5)).await.unwrap();
        store.set("/sensors/kitchen/humidity", json!(40)).await.unwrap();

        assert_eq!(store.get_once("sensors/kitchen/temperature").await.unwrap(), json!(21.5));
        assert_eq!(
            store.get_once("/sensors/kitchen").await.unwrap(),
            json!({ "temperature": 21.5, "humidity": 40 })
        );
        assert_eq!(store.get_once("/missing").await.unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn writing_null_deletes_and_prunes() {
        let store = MemoryValueStore::new();
        store.set("/a/b/c", json!(1)).await.unwrap();
        store.set("/a/b/c", Value::Null).await.unwrap();

        assert_eq!(store.get_once("/a").await.unwrap(), Value::Null);
        assert_eq!(store.get_once("/").await.unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn writing_below_a_scalar_replaces_it() {
        let store = MemoryValueStore::new();
        store.set("/device", json!("offline")).await.unwrap();
        store.set("/device/status", json!("online")).await.unwrap();
        assert_eq!(store.get_once("/device").await.unwrap(), json!({ "status": "online" }));
    }

    #[tokio::test]
    async fn subscription_starts_with_current_value() {
        let store = MemoryValueStore::new();
        store.set("/switch", json!(true)).await.unwrap();

        let mut sub = store.subscribe("/switch").await.unwrap();
        assert_eq!(sub.path(), "/switch");
        assert_eq!(next_value(&mut sub).await, json!(true));
    }

    #[tokio::test]
    async fn subscription_sees_ancestor_and_descendant_writes() {
        let store = MemoryValueStore::new();
        let mut sub = store.subscribe("/room").await.unwrap();
        assert_eq!(next_value(&mut sub).await, Value::Null);

        store.set("/room/temp", json!(20)).await.unwrap();
        assert_eq!(next_value(&mut sub).await, json!({ "temp": 20 }));

        store.set("/", json!({ "room": { "temp": 22 } })).await.unwrap();
        assert_eq!(next_value(&mut sub).await, json!({ "temp": 22 }));
    }

    #[tokio::test]
    async fn unrelated_and_unchanged_writes_are_skipped() {
        let store = MemoryValueStore::new();
        let mut sub = store.subscribe("/a").await.unwrap();
        assert_eq!(next_value(&mut sub).await, Value::Null);

        store.set("/b", json!(1)).await.unwrap();
        store.set("/a", json!(5)).await.unwrap();
        assert_eq!(next_value(&mut sub).await, json!(5));

        store.set("/a", json!(5)).await.unwrap();
        store.set("/c", json!(2)).await.unwrap();
        store.set("/a", json!(6)).await.unwrap();
        assert_eq!(next_value(&mut sub).await, json!(6));
    }

    #[tokio::test]
    async fn dropping_subscription_releases_it() {
        let store = MemoryValueStore::new();
        let sub = store.subscribe("/x").await.unwrap();
        assert_eq!(store.active_subscriptions(), 1);
        sub.unsubscribe();
        assert_eq!(store.active_subscriptions(), 0);
    }

    #[tokio::test]
    async fn unconfigured_store_rejects_everything() {
        let store = MemoryValueStore::unconfigured();
        assert!(!store.is_configured());
        assert_matches!(store.subscribe("/x").await, Err(RealtimeError::NotConfigured));
        assert_matches!(store.get_once("/x").await, Err(RealtimeError::NotConfigured));
        assert_matches!(store.set("/x", json!(1)).await, Err(RealtimeError::NotConfigured));
        assert_matches!(store.test_connection().await, Err(RealtimeError::NotConfigured));
    }

    #[tokio::test]
    async fn invalid_path_is_rejected() {
        let store = MemoryValueStore::new();
        assert_matches!(store.subscribe("/bad.path").await, Err(RealtimeError::InvalidPath(_)));
    }
}
