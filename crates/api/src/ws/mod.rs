//! Live dashboard feeds over WebSocket.
//!
//! [`live_handler`] upgrades a viewer's connection and streams the bound
//! values of one dashboard; [`WsManager`] tracks open connections so they
//! can be pinged, closed per dashboard, or closed on shutdown.

mod heartbeat;
mod live;
pub mod manager;

pub use heartbeat::start_heartbeat;
pub use live::{live_handler, LiveFrame};
pub use manager::WsManager;
