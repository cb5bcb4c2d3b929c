//! Route tree.
//!
//! ```text
//! /health                                        service + database health
//!
//! /api/v1
//!   /auth
//!     POST /register                             create account, returns token
//!     POST /login                                returns token
//!     GET  /me                                   current user
//!   /catalog
//!     GET  /                                     widget types (?category=)
//!     GET  /{type}/settings                      settings schema + defaults
//!   /dashboards
//!     GET    /                                   list own
//!     POST   /                                   create
//!     GET    /{id}                               detail (+ session state)
//!     PUT    /{id}                               rename, layout config, visibility
//!     DELETE /{id}                               delete
//!     POST   /{id}/save                          write now
//!     GET    /{id}/status                        save status
//!     DELETE /{id}/status/error                  dismiss save error
//!     PUT    /{id}/edit-mode                     toggle edit mode
//!     GET    /{id}/live                          WebSocket value feed
//!     GET    /{id}/widgets                       list
//!     POST   /{id}/widgets                       add
//!     PUT    /{id}/widgets                       replace all
//!     DELETE /{id}/widgets                       clear
//!     PATCH  /{id}/widgets/{wid}                 move / resize / props
//!     DELETE /{id}/widgets/{wid}                 delete
//!     PUT    /{id}/widgets/{wid}/settings        validated settings
//!     POST   /{id}/widgets/{wid}/duplicate       copy
//!   /values
//!     GET /{*path}                               read once
//!     PUT /{*path}                               write
//! ```

pub mod auth;
pub mod catalog;
pub mod dashboards;
pub mod health;
pub mod values;

use axum::Router;

use crate::state::AppState;

/// Everything mounted under `/api/v1`.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/catalog", catalog::router())
        .nest("/dashboards", dashboards::router())
        .nest("/values", values::router())
}
