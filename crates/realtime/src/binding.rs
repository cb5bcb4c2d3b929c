//! Live bindings: keep a widget's displayed value in step with a store path.
//!
//! A binding owns one background task that holds the store subscription and
//! republishes every update, converted to the widget's [`ValueKind`], on a
//! `watch` channel. Readers only ever see the latest snapshot.
//!
//! There is no reconnect policy. A binding that errors stays errored until
//! the caller drops it and connects a new one (for example when edit mode is
//! switched off or the widget's path changes).

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use sensorboard_core::live::{convert_value, ConnectionState, ValueKind};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::store::{StoreEvent, ValueStore};

// ---------------------------------------------------------------------------
// LiveBinding
// ---------------------------------------------------------------------------

/// What a single bound widget currently shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BindingSnapshot {
    pub path: String,
    pub value: Value,
    pub state: ConnectionState,
    pub error: Option<String>,
}

/// A subscription to one path, converting values to one kind.
pub struct LiveBinding {
    path: String,
    snapshot: Arc<watch::Sender<BindingSnapshot>>,
    cancel: CancellationToken,
}

impl LiveBinding {
    /// Start watching `path`. Returns immediately in the `connecting` state.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn connect(store: Arc<dyn ValueStore>, path: impl Into<String>, kind: ValueKind) -> Self {
        let path = path.into();
        let (tx, _) = watch::channel(BindingSnapshot {
            path: path.clone(),
            value: Value::Null,
            state: ConnectionState::Connecting,
            error: None,
        });
        let snapshot = Arc::new(tx);
        let cancel = CancellationToken::new();

        tokio::spawn(run_binding(
            store,
            path.clone(),
            kind,
            Arc::clone(&snapshot),
            cancel.clone(),
        ));

        Self {
            path,
            snapshot,
            cancel,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// The latest snapshot.
    pub fn snapshot(&self) -> BindingSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Receiver that is notified on every snapshot change.
    pub fn watch(&self) -> watch::Receiver<BindingSnapshot> {
        self.snapshot.subscribe()
    }

    /// Stop the subscription. Safe to call any number of times.
    pub fn disconnect(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.cancel.cancel();
        self.snapshot.send_modify(|s| {
            s.state = ConnectionState::Disconnected;
            s.error = None;
        });
        tracing::debug!(path = %self.path, "Live binding disconnected");
    }
}

impl Drop for LiveBinding {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Publish `f` unless the binding has been disconnected in the meantime.
fn publish<F>(tx: &watch::Sender<BindingSnapshot>, cancel: &CancellationToken, f: F)
where
    F: FnOnce(&mut BindingSnapshot),
{
    tx.send_if_modified(|s| {
        if cancel.is_cancelled() {
            return false;
        }
        f(s);
        true
    });
}

async fn run_binding(
    store: Arc<dyn ValueStore>,
    path: String,
    kind: ValueKind,
    tx: Arc<watch::Sender<BindingSnapshot>>,
    cancel: CancellationToken,
) {
    let subscribed = tokio::select! {
        biased;
        _ = cancel.cancelled() => return,
        result = store.subscribe(&path) => result,
    };

    let mut sub = match subscribed {
        Ok(sub) => sub,
        Err(e) => {
            tracing::warn!(path = %path, error = %e, "Live binding subscribe failed");
            publish(&tx, &cancel, |s| {
                s.state = ConnectionState::Error;
                s.error = Some(e.to_string());
            });
            return;
        }
    };

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            event = sub.next() => match event {
                Some(StoreEvent::Value(raw)) => publish(&tx, &cancel, |s| {
                    s.value = convert_value(raw, kind);
                    s.state = ConnectionState::Connected;
                    s.error = None;
                }),
                Some(StoreEvent::Error(e)) => {
                    tracing::warn!(path = %path, error = %e, "Live binding store error");
                    publish(&tx, &cancel, |s| {
                        s.state = ConnectionState::Error;
                        s.error = Some(e.to_string());
                    });
                }
                None => {
                    publish(&tx, &cancel, |s| s.state = ConnectionState::Disconnected);
                    break;
                }
            },
        }
    }
}

// ---------------------------------------------------------------------------
// MultiBinding
// ---------------------------------------------------------------------------

/// Merged view over several paths.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiSnapshot {
    /// Latest converted value per path. Paths that have not delivered yet
    /// are absent.
    pub values: BTreeMap<String, Value>,
    pub state: ConnectionState,
    /// Error text per failing path.
    pub errors: BTreeMap<String, String>,
}

impl MultiSnapshot {
    fn recompute_state(&mut self) {
        self.state = if self.errors.is_empty() {
            ConnectionState::Connected
        } else {
            ConnectionState::Error
        };
    }
}

/// One task watching many paths, republishing the whole map on every update.
pub struct MultiBinding {
    snapshot: Arc<watch::Sender<MultiSnapshot>>,
    cancel: CancellationToken,
}

impl MultiBinding {
    /// Watch every `(path, kind)` pair. Duplicate paths keep their first kind.
    pub fn connect(store: Arc<dyn ValueStore>, specs: Vec<(String, ValueKind)>) -> Self {
        let mut unique: BTreeMap<String, ValueKind> = BTreeMap::new();
        for (path, kind) in specs {
            unique.entry(path).or_insert(kind);
        }

        let (tx, _) = watch::channel(MultiSnapshot {
            values: BTreeMap::new(),
            state: ConnectionState::Connecting,
            errors: BTreeMap::new(),
        });
        let snapshot = Arc::new(tx);
        let cancel = CancellationToken::new();

        tokio::spawn(run_multi(store, unique, Arc::clone(&snapshot), cancel.clone()));

        Self { snapshot, cancel }
    }

    pub fn snapshot(&self) -> MultiSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<MultiSnapshot> {
        self.snapshot.subscribe()
    }

    /// Stop every subscription. Idempotent.
    pub fn disconnect(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.cancel.cancel();
        self.snapshot
            .send_modify(|s| s.state = ConnectionState::Disconnected);
    }
}

impl Drop for MultiBinding {
    fn drop(&mut self) {
        self.disconnect();
    }
}

fn publish_multi<F>(tx: &watch::Sender<MultiSnapshot>, cancel: &CancellationToken, f: F)
where
    F: FnOnce(&mut MultiSnapshot),
{
    tx.send_if_modified(|s| {
        if cancel.is_cancelled() {
            return false;
        }
        f(s);
        true
    });
}

async fn run_multi(
    store: Arc<dyn ValueStore>,
    specs: BTreeMap<String, ValueKind>,
    tx: Arc<watch::Sender<MultiSnapshot>>,
    cancel: CancellationToken,
) {
    let mut streams = Vec::with_capacity(specs.len());
    let mut errors = BTreeMap::new();

    for (path, kind) in specs {
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            result = store.subscribe(&path) => result,
        };
        match result {
            Ok(sub) => {
                let tagged = path.clone();
                streams.push(sub.map(move |event| (tagged.clone(), kind, event)).boxed());
            }
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "Multi binding subscribe failed");
                errors.insert(path, e.to_string());
            }
        }
    }

    let has_streams = !streams.is_empty();
    publish_multi(&tx, &cancel, |s| {
        s.errors = errors;
        s.recompute_state();
    });
    if !has_streams {
        return;
    }

    let mut merged = stream::select_all(streams);
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = merged.next() => match next {
                Some((path, kind, StoreEvent::Value(raw))) => publish_multi(&tx, &cancel, |s| {
                    s.values.insert(path.clone(), convert_value(raw, kind));
                    s.errors.remove(&path);
                    s.recompute_state();
                }),
                Some((path, _, StoreEvent::Error(e))) => publish_multi(&tx, &cancel, |s| {
                    s.errors.insert(path, e.to_string());
                    s.recompute_state();
                }),
                None => {
                    publish_multi(&tx, &cancel, |s| s.state = ConnectionState::Disconnected);
                    break;
                }
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
