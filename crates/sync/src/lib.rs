//! Keeps dashboards in step with their remote store while they are edited.
//!
//! [`persistence`] debounces writes of the widget list; [`session`] ties a
//! layout, its persistence, and its edit mode together per open dashboard.

pub mod persistence;
pub mod session;

pub use persistence::{DashboardStore, PersistenceStatus, PersistenceSync, SaveHandle, StoreError};
pub use session::{
    start_idle_eviction, DashboardSession, LiveConfig, PendingSave, SessionRegistry, SharedSession,
    ViewerGuard,
};
