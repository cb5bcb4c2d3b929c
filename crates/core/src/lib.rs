//! Domain logic for SensorBoard dashboards.
//!
//! Everything in this crate is pure: no database, network, or timer access.
//! Callers pass data in and persist whatever comes back out.

pub mod catalog;
pub mod error;
pub mod layout;
pub mod live;
pub mod placement;
pub mod settings;
pub mod types;
