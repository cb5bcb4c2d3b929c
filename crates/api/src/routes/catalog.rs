use axum::routing::get;
use axum::Router;

use crate::handlers::catalog;
use crate::state::AppState;

/// Routes mounted at `/catalog`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(catalog::list_catalog))
        .route("/{widget_type}/settings", get(catalog::get_settings_schema))
}
