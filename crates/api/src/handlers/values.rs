//! Direct access to the realtime value store.
//!
//! `PUT` is how devices (or anything holding a token) publish readings;
//! every live binding on the path picks the write up.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ValueResponse {
    pub path: String,
    pub value: Value,
}

/// GET /api/v1/values/{*path}
pub async fn get_value(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(path): Path<String>,
) -> AppResult<impl IntoResponse> {
    let path = format!("/{path}");
    let value = state.value_store.get_once(&path).await?;
    Ok(Json(DataResponse {
        data: ValueResponse { path, value },
    }))
}

/// PUT /api/v1/values/{*path}
///
/// The body is the new value; `null` deletes it.
pub async fn put_value(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(path): Path<String>,
    Json(value): Json<Value>,
) -> AppResult<impl IntoResponse> {
    let path = format!("/{path}");
    state.value_store.set(&path, value.clone()).await?;
    tracing::debug!(path = %path, user_id = auth.user_id, "Value written");
    Ok(Json(DataResponse {
        data: ValueResponse { path, value },
    }))
}
