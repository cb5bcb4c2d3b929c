//! Editing sessions for open dashboards.
//!
//! A [`DashboardSession`] is the server-side twin of one open dashboard: its
//! layout, its debounced persistence, and whether it is in edit mode. Every
//! mutation updates the layout synchronously and then schedules a save of
//! the full widget list. Live value bindings are not owned here; viewers
//! watch [`LiveConfig`] and rebuild their bindings when it changes.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sensorboard_core::catalog;
use sensorboard_core::error::CoreError;
use sensorboard_core::layout::{LayoutState, WidgetPatch, WidgetPlacement};
use sensorboard_core::live::ValueKind;
use sensorboard_core::placement::GridSpec;
use sensorboard_core::settings;
use sensorboard_core::types::{DbId, Props};
use tokio::sync::{watch, Mutex, RwLock};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::persistence::{DashboardStore, PersistenceStatus, PersistenceSync, SaveHandle, StoreError};

/// How long an unviewed session may sit untouched before it is closed.
pub const DEFAULT_SESSION_IDLE: Duration = Duration::from_secs(300);

/// What live viewers of a dashboard need to know to (re)build bindings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveConfig {
    /// Bindings are suspended while the dashboard is being edited.
    pub edit_mode: bool,
    /// `(path, kind)` for every bound widget with a path set.
    pub bindings: Vec<(String, ValueKind)>,
}

// ---------------------------------------------------------------------------
// DashboardSession
// ---------------------------------------------------------------------------

pub struct DashboardSession {
    dashboard_id: DbId,
    layout: LayoutState,
    sync: PersistenceSync,
    live: watch::Sender<LiveConfig>,
}

impl DashboardSession {
    /// Open a session over a loaded widget list.
    pub fn open(
        dashboard_id: DbId,
        widgets: Vec<WidgetPlacement>,
        store: Arc<dyn DashboardStore>,
        delay: Duration,
        grid: GridSpec,
    ) -> Self {
        let layout = LayoutState::with_widgets(grid, widgets);
        let (live, _) = watch::channel(LiveConfig {
            edit_mode: false,
            bindings: binding_specs_of(layout.widgets()),
        });

        tracing::info!(
            dashboard_id,
            widget_count = layout.widgets().len(),
            "Dashboard session opened"
        );

        Self {
            dashboard_id,
            layout,
            sync: PersistenceSync::new(store, dashboard_id, delay),
            live,
        }
    }

    pub fn dashboard_id(&self) -> DbId {
        self.dashboard_id
    }

    pub fn widgets(&self) -> &[WidgetPlacement] {
        self.layout.widgets()
    }

    pub fn layout(&self) -> &LayoutState {
        &self.layout
    }

    /// Schedule a save of the current list and refresh the live config.
    fn after_mutation(&self) {
        self.sync.schedule_save(self.layout.widgets().to_vec());
        let bindings = self.binding_specs();
        self.live.send_if_modified(|c| {
            if c.bindings == bindings {
                return false;
            }
            c.bindings = bindings;
            true
        });
    }

    pub fn add_widget(&mut self, tag: &str, props: Option<Props>) -> Result<WidgetPlacement, CoreError> {
        let added = self.layout.add_widget(tag, props)?.clone();
        tracing::info!(
            dashboard_id = self.dashboard_id,
            widget_id = %added.id,
            x = added.x,
            y = added.y,
            "Widget added"
        );
        self.after_mutation();
        Ok(added)
    }

    pub fn update_widget(&mut self, id: &str, patch: WidgetPatch) -> Result<WidgetPlacement, CoreError> {
        let updated = self.layout.update_widget(id, patch)?.clone();
        self.after_mutation();
        Ok(updated)
    }

    /// Merge `values` into the widget's props after validating the merged
    /// result against the widget type's settings schema.
    pub fn update_settings(&mut self, id: &str, values: Props) -> Result<WidgetPlacement, CoreError> {
        let current = self
            .layout
            .get(id)
            .ok_or_else(|| CoreError::WidgetNotFound(id.to_string()))?;

        let mut merged = current.props.clone();
        merged.extend(values.clone());
        settings::validate_settings(current.widget_type, &merged)?;

        self.update_widget(
            id,
            WidgetPatch {
                props: Some(values),
                ..Default::default()
            },
        )
    }

    pub fn delete_widget(&mut self, id: &str) -> Result<WidgetPlacement, CoreError> {
        let removed = self.layout.delete_widget(id)?;
        tracing::info!(dashboard_id = self.dashboard_id, widget_id = %id, "Widget deleted");
        self.after_mutation();
        Ok(removed)
    }

    pub fn duplicate_widget(&mut self, id: &str) -> Result<WidgetPlacement, CoreError> {
        let copy = self.layout.duplicate_widget(id)?.clone();
        tracing::info!(
            dashboard_id = self.dashboard_id,
            source_id = %id,
            widget_id = %copy.id,
            "Widget duplicated"
        );
        self.after_mutation();
        Ok(copy)
    }

    pub fn set_widgets(&mut self, widgets: Vec<WidgetPlacement>) {
        self.layout.set_widgets(widgets);
        self.after_mutation();
    }

    pub fn clear_all(&mut self) {
        self.layout.clear_all();
        tracing::info!(dashboard_id = self.dashboard_id, "Dashboard cleared");
        self.after_mutation();
    }

    pub fn select(&mut self, id: Option<&str>) -> Result<(), CoreError> {
        self.layout.select(id)
    }

    pub fn selected(&self) -> Option<&WidgetPlacement> {
        self.layout.selected()
    }

    /// Snapshot the current list for an immediate write, dropping any
    /// scheduled save. Run the returned save after releasing the session.
    pub fn prepare_save(&self) -> PendingSave {
        PendingSave {
            dashboard_id: self.dashboard_id,
            handle: self.sync.begin_save(),
            widgets: self.layout.widgets().to_vec(),
        }
    }

    /// Edits are waiting for the debounce to fire.
    pub fn has_unsaved_changes(&self) -> bool {
        self.sync.has_pending()
    }

    pub fn status(&self) -> PersistenceStatus {
        self.sync.status()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<PersistenceStatus> {
        self.sync.subscribe_status()
    }

    pub fn clear_error(&self) {
        self.sync.clear_error();
    }

    pub fn edit_mode(&self) -> bool {
        self.live.borrow().edit_mode
    }

    pub fn set_edit_mode(&self, on: bool) {
        let changed = self.live.send_if_modified(|c| {
            let changed = c.edit_mode != on;
            c.edit_mode = on;
            changed
        });
        if changed {
            tracing::debug!(dashboard_id = self.dashboard_id, edit_mode = on, "Edit mode changed");
        }
    }

    /// Paths and kinds of every widget that should be bound right now.
    pub fn binding_specs(&self) -> Vec<(String, ValueKind)> {
        binding_specs_of(self.layout.widgets())
    }

    pub fn live_config(&self) -> watch::Receiver<LiveConfig> {
        self.live.subscribe()
    }

    /// Stop the persistence timer. Edits made after closing are not saved.
    pub fn close(&self) {
        self.sync.teardown();
        tracing::info!(dashboard_id = self.dashboard_id, "Dashboard session closed");
    }
}

/// A widget-list write taken from a session, to be run without holding it.
pub struct PendingSave {
    dashboard_id: DbId,
    handle: SaveHandle,
    widgets: Vec<WidgetPlacement>,
}

impl PendingSave {
    pub fn dashboard_id(&self) -> DbId {
        self.dashboard_id
    }

    pub async fn run(self) -> Result<(), StoreError> {
        self.handle.write(self.widgets).await
    }
}

fn binding_specs_of(widgets: &[WidgetPlacement]) -> Vec<(String, ValueKind)> {
    widgets
        .iter()
        .filter_map(|w| {
            let kind = catalog::entry(w.widget_type).binding?;
            let path = w.firebase_path()?;
            Some((path.to_string(), kind))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// SessionRegistry
// ---------------------------------------------------------------------------

pub type SharedSession = Arc<Mutex<DashboardSession>>;

/// Use tracking for one open session.
#[derive(Debug)]
struct Activity {
    last_used: std::sync::Mutex<Instant>,
    viewers: AtomicUsize,
}

impl Activity {
    fn new() -> Self {
        Self {
            last_used: std::sync::Mutex::new(Instant::now()),
            viewers: AtomicUsize::new(0),
        }
    }

    fn touch(&self) {
        *self.last_used.lock().unwrap_or_else(|e| e.into_inner()) = Instant::now();
    }

    fn is_idle(&self, now: Instant, idle: Duration) -> bool {
        let last_used = *self.last_used.lock().unwrap_or_else(|e| e.into_inner());
        self.viewers.load(Ordering::SeqCst) == 0 && now.duration_since(last_used) >= idle
    }
}

struct Entry {
    session: SharedSession,
    activity: Arc<Activity>,
}

/// Keeps a session from being evicted while a live viewer is attached.
/// Detaches on drop.
#[derive(Debug)]
pub struct ViewerGuard {
    activity: Arc<Activity>,
}

impl Drop for ViewerGuard {
    fn drop(&mut self) {
        self.activity.viewers.fetch_sub(1, Ordering::SeqCst);
        self.activity.touch();
    }
}

/// Open sessions keyed by dashboard id, shared across requests.
///
/// Sessions nobody has touched for a while, and that have no live viewer,
/// are flushed and closed by [`evict_idle`](Self::evict_idle).
pub struct SessionRegistry {
    sessions: RwLock<HashMap<DbId, Entry>>,
    store: Arc<dyn DashboardStore>,
    delay: Duration,
    grid: GridSpec,
}

impl SessionRegistry {
    pub fn new(store: Arc<dyn DashboardStore>, delay: Duration, grid: GridSpec) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            store,
            delay,
            grid,
        }
    }

    pub fn grid(&self) -> GridSpec {
        self.grid
    }

    pub async fn get(&self, dashboard_id: DbId) -> Option<SharedSession> {
        let sessions = self.sessions.read().await;
        let entry = sessions.get(&dashboard_id)?;
        entry.activity.touch();
        Some(Arc::clone(&entry.session))
    }

    /// Return the open session, or load the widget list with `load` and open
    /// one. If two callers race, both get the same session.
    pub async fn get_or_open<F, Fut, E>(&self, dashboard_id: DbId, load: F) -> Result<SharedSession, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<WidgetPlacement>, E>>,
    {
        if let Some(session) = self.get(dashboard_id).await {
            return Ok(session);
        }

        let widgets = load().await?;

        let mut sessions = self.sessions.write().await;
        let entry = sessions.entry(dashboard_id).or_insert_with(|| Entry {
            session: Arc::new(Mutex::new(DashboardSession::open(
                dashboard_id,
                widgets,
                Arc::clone(&self.store),
                self.delay,
                self.grid,
            ))),
            activity: Arc::new(Activity::new()),
        });
        entry.activity.touch();
        Ok(Arc::clone(&entry.session))
    }

    /// Register a live viewer of an open session. `None` if it is not open.
    pub async fn attach_viewer(&self, dashboard_id: DbId) -> Option<ViewerGuard> {
        let sessions = self.sessions.read().await;
        let activity = Arc::clone(&sessions.get(&dashboard_id)?.activity);
        activity.viewers.fetch_add(1, Ordering::SeqCst);
        activity.touch();
        Some(ViewerGuard { activity })
    }

    /// Close and forget one session without saving. Returns whether it was
    /// open.
    pub async fn close(&self, dashboard_id: DbId) -> bool {
        let removed = self.sessions.write().await.remove(&dashboard_id);
        match removed {
            Some(entry) => {
                entry.session.lock().await.close();
                true
            }
            None => false,
        }
    }

    /// Flush and close every session idle for at least `idle` with no live
    /// viewer. Returns how many were closed.
    pub async fn evict_idle(&self, idle: Duration) -> usize {
        let now = Instant::now();
        let evicted: Vec<SharedSession> = {
            let mut sessions = self.sessions.write().await;
            let ids: Vec<DbId> = sessions
                .iter()
                .filter(|(_, entry)| entry.activity.is_idle(now, idle))
                .map(|(id, _)| *id)
                .collect();
            ids.iter()
                .filter_map(|id| sessions.remove(id))
                .map(|entry| entry.session)
                .collect()
        };

        for session in &evicted {
            flush_and_close(session).await;
        }
        if !evicted.is_empty() {
            tracing::info!(count = evicted.len(), "Idle dashboard sessions evicted");
        }
        evicted.len()
    }

    /// Flush and close every session. Used on shutdown.
    pub async fn close_all(&self) {
        let drained: Vec<SharedSession> = self
            .sessions
            .write()
            .await
            .drain()
            .map(|(_, entry)| entry.session)
            .collect();
        let count = drained.len();
        for session in &drained {
            flush_and_close(session).await;
        }
        tracing::info!(count, "All dashboard sessions closed");
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

/// Close `session`, writing its unsaved edits first. The write runs after
/// the session lock is released.
async fn flush_and_close(session: &SharedSession) {
    let save = {
        let session = session.lock().await;
        let save = session.has_unsaved_changes().then(|| session.prepare_save());
        session.close();
        save
    };

    if let Some(save) = save {
        let dashboard_id = save.dashboard_id();
        if let Err(e) = save.run().await {
            tracing::warn!(dashboard_id, error = %e, "Final save failed");
        }
    }
}

/// Periodically evict idle sessions until `cancel` fires.
pub fn start_idle_eviction(
    registry: Arc<SessionRegistry>,
    idle: Duration,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    // Check a few times per idle period, but not more than once a second.
    let period = (idle / 4).max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.tick().await;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Session eviction stopped");
                    break;
                }
                _ = interval.tick() => {
                    registry.evict_idle(idle).await;
                }
            }
        }
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
