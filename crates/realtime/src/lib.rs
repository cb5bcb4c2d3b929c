//! Realtime value store and live widget bindings.
//!
//! [`ValueStore`](store::ValueStore) is the seam to a hierarchical key-value
//! database addressed by slash paths (`/sensors/kitchen/temperature`).
//! [`MemoryValueStore`](memory::MemoryValueStore) is the in-process
//! implementation the server ships with. Bindings subscribe to paths and
//! publish converted values on `watch` channels.

pub mod binding;
pub mod error;
pub mod memory;
pub mod store;

pub use binding::{BindingSnapshot, LiveBinding, MultiBinding, MultiSnapshot};
pub use error::RealtimeError;
pub use memory::MemoryValueStore;
pub use store::{StoreEvent, Subscription, ValueStore};
