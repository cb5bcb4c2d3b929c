use axum::routing::get;
use axum::Router;

use crate::handlers::values;
use crate::state::AppState;

/// Routes mounted at `/values`. The rest of the URL is the store path.
pub fn router() -> Router<AppState> {
    Router::new().route("/{*path}", get(values::get_value).put(values::put_value))
}
