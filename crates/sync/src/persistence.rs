//! Debounced write-through of a dashboard's widget list.
//!
//! Every edit calls [`PersistenceSync::schedule_save`] with the full list.
//! Only the last snapshot of a burst is written, once the dashboard has been
//! quiet for the configured delay. Failures are recorded in
//! [`PersistenceStatus`] and never retried; the next edit tries again.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sensorboard_core::layout::WidgetPlacement;
use sensorboard_core::types::{DbId, Timestamp};
use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Quiet period before a scheduled save is written.
pub const DEFAULT_AUTOSAVE_DELAY: Duration = Duration::from_millis(1000);

// ---------------------------------------------------------------------------
// Store seam
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Dashboard {0} not found")]
    NotFound(DbId),

    #[error("Failed to save dashboard: {0}")]
    Write(String),
}

/// Remote storage for dashboard widget lists.
#[async_trait]
pub trait DashboardStore: Send + Sync {
    /// Replace the stored widget list of one dashboard.
    async fn save_widgets(
        &self,
        dashboard_id: DbId,
        widgets: &[WidgetPlacement],
    ) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// What the save indicator shows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PersistenceStatus {
    /// At least one write is in flight.
    pub saving: bool,
    /// Completion time of the last successful write.
    pub last_saved: Option<Timestamp>,
    /// Message of the last failed write, until dismissed or superseded by a
    /// success.
    pub error: Option<String>,
}

struct Shared {
    store: Arc<dyn DashboardStore>,
    dashboard_id: DbId,
    status: watch::Sender<PersistenceStatus>,
    in_flight: AtomicUsize,
}

impl Shared {
    async fn write(&self, widgets: Vec<WidgetPlacement>) -> Result<(), StoreError> {
        self.status.send_modify(|s| {
            self.in_flight.fetch_add(1, Ordering::SeqCst);
            s.saving = true;
        });

        let result = self.store.save_widgets(self.dashboard_id, &widgets).await;

        self.status.send_modify(|s| {
            let remaining = self.in_flight.fetch_sub(1, Ordering::SeqCst) - 1;
            s.saving = remaining > 0;
            match &result {
                Ok(()) => {
                    s.last_saved = Some(Utc::now());
                    s.error = None;
                }
                Err(e) => s.error = Some(e.to_string()),
            }
        });

        match &result {
            Ok(()) => tracing::debug!(
                dashboard_id = self.dashboard_id,
                widget_count = widgets.len(),
                "Dashboard saved"
            ),
            Err(e) => tracing::warn!(
                dashboard_id = self.dashboard_id,
                error = %e,
                "Dashboard save failed"
            ),
        }
        result
    }
}

/// Cloneable handle for an immediate write, so callers can drop their own
/// locks before awaiting the store.
#[derive(Clone)]
pub struct SaveHandle {
    shared: Arc<Shared>,
}

impl SaveHandle {
    pub async fn write(&self, widgets: Vec<WidgetPlacement>) -> Result<(), StoreError> {
        self.shared.write(widgets).await
    }
}

// ---------------------------------------------------------------------------
// PersistenceSync
// ---------------------------------------------------------------------------

/// Debounced saver for one dashboard.
///
/// Timers run as Tokio tasks, so the scheduling methods must be called from
/// within a runtime.
pub struct PersistenceSync {
    shared: Arc<Shared>,
    delay: Duration,
    /// Parent of every timer token; cancelled on teardown.
    root: CancellationToken,
    /// Token of the timer that is currently sleeping, if any.
    pending: Mutex<Option<CancellationToken>>,
}

impl PersistenceSync {
    pub fn new(store: Arc<dyn DashboardStore>, dashboard_id: DbId, delay: Duration) -> Self {
        let (status, _) = watch::channel(PersistenceStatus::default());
        Self {
            shared: Arc::new(Shared {
                store,
                dashboard_id,
                status,
                in_flight: AtomicUsize::new(0),
            }),
            delay,
            root: CancellationToken::new(),
            pending: Mutex::new(None),
        }
    }

    pub fn dashboard_id(&self) -> DbId {
        self.shared.dashboard_id
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Cancel the sleeping timer, if any. A write that has already started
    /// is not affected.
    fn cancel_pending(&self) {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(token) = pending.take() {
            token.cancel();
        }
    }

    /// Save `widgets` once no further call arrives for the configured delay.
    ///
    /// Ignored after [`teardown`](Self::teardown).
    pub fn schedule_save(&self, widgets: Vec<WidgetPlacement>) {
        if self.root.is_cancelled() {
            tracing::debug!(dashboard_id = self.dashboard_id(), "Save scheduled after teardown, ignoring");
            return;
        }

        let token = self.root.child_token();
        {
            let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(previous) = pending.replace(token.clone()) {
                previous.cancel();
            }
        }

        let shared = Arc::clone(&self.shared);
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
            // Fired; no longer pending.
            token.cancel();
            // Errors are already recorded in the status.
            let _ = shared.write(widgets).await;
        });
    }

    /// Whether a scheduled save is still waiting for its quiet period.
    pub fn has_pending(&self) -> bool {
        let pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending.as_ref().is_some_and(|t| !t.is_cancelled())
    }

    /// Drop any scheduled save and return a handle for writing now.
    ///
    /// The handle stays usable after [`teardown`](Self::teardown), which is
    /// how a closing session flushes its last edits.
    pub fn begin_save(&self) -> SaveHandle {
        self.cancel_pending();
        SaveHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Write immediately, dropping any scheduled save.
    pub async fn save_now(&self, widgets: Vec<WidgetPlacement>) -> Result<(), StoreError> {
        self.begin_save().write(widgets).await
    }

    pub fn status(&self) -> PersistenceStatus {
        self.shared.status.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<PersistenceStatus> {
        self.shared.status.subscribe()
    }

    /// Dismiss the error banner.
    pub fn clear_error(&self) {
        self.shared.status.send_if_modified(|s| s.error.take().is_some());
    }

    /// Cancel the pending timer and refuse further scheduling. Idempotent.
    pub fn teardown(&self) {
        if !self.root.is_cancelled() {
            self.root.cancel();
            tracing::debug!(dashboard_id = self.dashboard_id(), "Persistence torn down");
        }
    }

    pub fn is_torn_down(&self) -> bool {
        self.root.is_cancelled()
    }
}

impl Drop for PersistenceSync {
    fn drop(&mut self) {
        self.teardown();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use assert_matches::assert_matches;
    use sensorboard_core::layout::LayoutState;

    use super::*;

    /// Store that records every write and can be told to fail or stall.
    #[derive(Default)]
    pub(crate) struct RecordingStore {
        pub writes: Mutex<Vec<(DbId, Vec<WidgetPlacement>)>>,
        pub fail: std::sync::atomic::AtomicBool,
        pub latency: Mutex<Option<Duration>>,
    }

    impl RecordingStore {
        pub fn write_count(&self) -> usize {
            self.writes.lock().unwrap().len()
        }

        pub fn last_write(&self) -> Option<Vec<WidgetPlacement>> {
            self.writes.lock().unwrap().last().map(|(_, w)| w.clone())
        }
    }

    #[async_trait]
    impl DashboardStore for RecordingStore {
        async fn save_widgets(
            &self,
            dashboard_id: DbId,
            widgets: &[WidgetPlacement],
        ) -> Result<(), StoreError> {
            let latency = *self.latency.lock().unwrap();
            if let Some(latency) = latency {
                tokio::time::sleep(latency).await;
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(StoreError::Write("connection reset".into()));
            }
            self.writes
                .lock()
                .unwrap()
                .push((dashboard_id, widgets.to_vec()));
            Ok(())
        }
    }

    fn widgets(n: usize) -> Vec<WidgetPlacement> {
        let mut layout = LayoutState::default();
        for _ in 0..n {
            layout.add_widget("clock", None).unwrap();
        }
        layout.widgets().to_vec()
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn setup() -> (Arc<RecordingStore>, PersistenceSync) {
        let store = Arc::new(RecordingStore::default());
        let sync = PersistenceSync::new(store.clone(), 7, DEFAULT_AUTOSAVE_DELAY);
        (store, sync)
    }

    #[tokio::test(start_paused = true)]
    async fn two_saves_inside_window_write_once_with_latest() {
        let (store, sync) = setup();
        let all = widgets(2);

        sync.schedule_save(all[..1].to_vec());
        tokio::time::sleep(ms(200)).await;
        sync.schedule_save(all.clone());

        tokio::time::sleep(ms(900)).await;
        assert_eq!(store.write_count(), 0, "first timer must have been replaced");

        tokio::time::sleep(ms(200)).await;
        assert_eq!(store.write_count(), 1);
        assert_eq!(store.last_write().unwrap(), all);
        assert_eq!(store.writes.lock().unwrap()[0].0, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn many_calls_coalesce_into_one_write() {
        let (store, sync) = setup();
        for n in 1..=10 {
            sync.schedule_save(widgets(n));
            tokio::time::sleep(ms(50)).await;
        }
        tokio::time::sleep(ms(1500)).await;

        assert_eq!(store.write_count(), 1);
        assert_eq!(store.last_write().unwrap().len(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn success_sets_last_saved_and_failure_keeps_it() {
        let (store, sync) = setup();

        sync.save_now(widgets(1)).await.unwrap();
        let first = sync.status();
        assert!(first.last_saved.is_some());
        assert!(first.error.is_none());
        assert!(!first.saving);

        store.fail.store(true, Ordering::SeqCst);
        sync.schedule_save(widgets(2));
        tokio::time::sleep(ms(1100)).await;

        let after = sync.status();
        assert_eq!(after.last_saved, first.last_saved);
        assert_eq!(after.error.as_deref(), Some("Failed to save dashboard: connection reset"));
        assert_eq!(store.write_count(), 1, "no automatic retry");

        tokio::time::sleep(ms(5000)).await;
        assert_eq!(store.write_count(), 1);

        sync.clear_error();
        assert!(sync.status().error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn next_success_clears_error() {
        let (store, sync) = setup();
        store.fail.store(true, Ordering::SeqCst);
        assert_matches!(sync.save_now(widgets(1)).await, Err(StoreError::Write(_)));
        assert!(sync.status().error.is_some());

        store.fail.store(false, Ordering::SeqCst);
        sync.schedule_save(widgets(1));
        tokio::time::sleep(ms(1100)).await;
        assert!(sync.status().error.is_none());
        assert!(sync.status().last_saved.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn save_now_cancels_pending_timer() {
        let (store, sync) = setup();
        sync.schedule_save(widgets(1));
        sync.save_now(widgets(3)).await.unwrap();
        assert_eq!(store.write_count(), 1);

        tokio::time::sleep(ms(3000)).await;
        assert_eq!(store.write_count(), 1);
        assert_eq!(store.last_write().unwrap().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn pending_flag_tracks_the_quiet_period() {
        let (store, sync) = setup();
        assert!(!sync.has_pending());

        sync.schedule_save(widgets(1));
        assert!(sync.has_pending());
        tokio::time::sleep(ms(1100)).await;
        assert!(!sync.has_pending());
        assert_eq!(store.write_count(), 1);

        sync.schedule_save(widgets(2));
        let handle = sync.begin_save();
        assert!(!sync.has_pending());
        sync.teardown();
        handle.write(widgets(2)).await.unwrap();
        assert_eq!(store.write_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_cancels_pending_and_ignores_later_calls() {
        let (store, sync) = setup();
        sync.schedule_save(widgets(1));
        sync.teardown();
        sync.teardown();
        sync.schedule_save(widgets(2));

        tokio::time::sleep(ms(3000)).await;
        assert_eq!(store.write_count(), 0);
        assert!(sync.is_torn_down());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_cancels_pending() {
        let (store, sync) = setup();
        sync.schedule_save(widgets(1));
        drop(sync);

        tokio::time::sleep(ms(3000)).await;
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_write_survives_new_schedule() {
        let (store, sync) = setup();
        *store.latency.lock().unwrap() = Some(ms(500));
        let mut status = sync.subscribe_status();

        sync.schedule_save(widgets(1));
        tokio::time::sleep(ms(1100)).await;
        assert!(status.borrow_and_update().saving, "first write is in flight");

        // Only the new timer is armed; the running write is untouched.
        sync.schedule_save(widgets(2));
        tokio::time::sleep(ms(2000)).await;

        assert_eq!(store.write_count(), 2);
        assert_eq!(store.last_write().unwrap().len(), 2);
        assert!(!sync.status().saving);
    }
}
