//! Handlers for `/dashboards/{id}/widgets`.
//!
//! Each edit applies to the dashboard's editing session at once and
//! schedules a debounced write of the whole widget list. The response
//! carries the widget as it now stands; it does not wait for the write.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use sensorboard_core::layout::{WidgetPatch, WidgetPlacement};
use sensorboard_core::types::{DbId, Props};
use serde::Deserialize;

use crate::error::AppResult;
use crate::handlers::dashboards::owned_session;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AddWidgetRequest {
    /// Widget type tag, e.g. `"temperature"`.
    #[serde(rename = "type")]
    pub widget_type: String,
    /// Overrides merged over the type's default props.
    pub props: Option<Props>,
}

/// GET /api/v1/dashboards/{id}/widgets
pub async fn list_widgets(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(dashboard_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let session = owned_session(&state, dashboard_id, auth.user_id).await?;
    let widgets = session.lock().await.widgets().to_vec();
    Ok(Json(DataResponse { data: widgets }))
}

/// POST /api/v1/dashboards/{id}/widgets
///
/// Places the widget at the first free cell for its default size.
pub async fn add_widget(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(dashboard_id): Path<DbId>,
    Json(input): Json<AddWidgetRequest>,
) -> AppResult<impl IntoResponse> {
    let session = owned_session(&state, dashboard_id, auth.user_id).await?;
    let widget = session
        .lock()
        .await
        .add_widget(&input.widget_type, input.props)?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: widget })))
}

/// PUT /api/v1/dashboards/{id}/widgets
///
/// Replace the whole list, as after a drag or resize on the grid.
pub async fn set_widgets(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(dashboard_id): Path<DbId>,
    Json(widgets): Json<Vec<WidgetPlacement>>,
) -> AppResult<impl IntoResponse> {
    let session = owned_session(&state, dashboard_id, auth.user_id).await?;
    let mut session = session.lock().await;
    session.set_widgets(widgets);
    Ok(Json(DataResponse {
        data: session.widgets().to_vec(),
    }))
}

/// DELETE /api/v1/dashboards/{id}/widgets
pub async fn clear_widgets(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(dashboard_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let session = owned_session(&state, dashboard_id, auth.user_id).await?;
    session.lock().await.clear_all();
    tracing::info!(dashboard_id, "Dashboard cleared");
    Ok(StatusCode::NO_CONTENT)
}

/// PATCH /api/v1/dashboards/{id}/widgets/{widget_id}
///
/// Sizes are clamped to the type's constraints and positions to the grid.
pub async fn update_widget(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((dashboard_id, widget_id)): Path<(DbId, String)>,
    Json(patch): Json<WidgetPatch>,
) -> AppResult<impl IntoResponse> {
    let session = owned_session(&state, dashboard_id, auth.user_id).await?;
    let widget = session.lock().await.update_widget(&widget_id, patch)?;
    Ok(Json(DataResponse { data: widget }))
}

/// PUT /api/v1/dashboards/{id}/widgets/{widget_id}/settings
///
/// Merge settings-form values into the widget's props. Answers 422 with one
/// message per invalid field and leaves the widget unchanged.
pub async fn update_settings(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((dashboard_id, widget_id)): Path<(DbId, String)>,
    Json(values): Json<Props>,
) -> AppResult<impl IntoResponse> {
    let session = owned_session(&state, dashboard_id, auth.user_id).await?;
    let widget = session.lock().await.update_settings(&widget_id, values)?;
    Ok(Json(DataResponse { data: widget }))
}

/// DELETE /api/v1/dashboards/{id}/widgets/{widget_id}
pub async fn delete_widget(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((dashboard_id, widget_id)): Path<(DbId, String)>,
) -> AppResult<impl IntoResponse> {
    let session = owned_session(&state, dashboard_id, auth.user_id).await?;
    session.lock().await.delete_widget(&widget_id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/dashboards/{id}/widgets/{widget_id}/duplicate
pub async fn duplicate_widget(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((dashboard_id, widget_id)): Path<(DbId, String)>,
) -> AppResult<impl IntoResponse> {
    let session = owned_session(&state, dashboard_id, auth.user_id).await?;
    let copy = session.lock().await.duplicate_widget(&widget_id)?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: copy })))
}
