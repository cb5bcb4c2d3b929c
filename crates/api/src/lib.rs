//! SensorBoard API server library.
//!
//! Config, state, error mapping, routes, and the live WebSocket feed live
//! here so integration tests and the binary entrypoint share them.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod persistence;
pub mod response;
pub mod routes;
pub mod state;
pub mod ws;
