//! Route definitions for `/dashboards` and their widgets.

use axum::routing::{delete, get, patch, post, put};
use axum::Router;

use crate::handlers::{dashboards, widgets};
use crate::state::AppState;
use crate::ws;

/// Routes mounted at `/dashboards`. All require auth.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(dashboards::list_dashboards).post(dashboards::create_dashboard),
        )
        .route(
            "/{id}",
            get(dashboards::get_dashboard)
                .put(dashboards::update_dashboard)
                .delete(dashboards::delete_dashboard),
        )
        .route("/{id}/save", post(dashboards::save_dashboard))
        .route("/{id}/status", get(dashboards::get_status))
        .route("/{id}/status/error", delete(dashboards::clear_status_error))
        .route("/{id}/edit-mode", put(dashboards::set_edit_mode))
        .route("/{id}/live", get(ws::live_handler))
        .route(
            "/{id}/widgets",
            get(widgets::list_widgets)
                .post(widgets::add_widget)
                .put(widgets::set_widgets)
                .delete(widgets::clear_widgets),
        )
        .route(
            "/{id}/widgets/{widget_id}",
            patch(widgets::update_widget).delete(widgets::delete_widget),
        )
        .route("/{id}/widgets/{widget_id}/settings", put(widgets::update_settings))
        .route("/{id}/widgets/{widget_id}/duplicate", post(widgets::duplicate_widget))
}
