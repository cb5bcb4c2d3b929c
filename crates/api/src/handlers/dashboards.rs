//! Handlers for the `/dashboards` resource.
//!
//! Every dashboard belongs to one user; requests for someone else's
//! dashboard answer 404. Widget edits go through the dashboard's editing
//! session (see [`super::widgets`]) and are written back by its debounced
//! persistence; this module covers the dashboard record itself, explicit
//! saves, save status, and edit mode.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use sensorboard_core::error::CoreError;
use sensorboard_core::layout::{LayoutState, WidgetPlacement};
use sensorboard_core::types::DbId;
use sensorboard_db::models::dashboard::{CreateDashboard, Dashboard, LayoutConfig, UpdateDashboard};
use sensorboard_db::repositories::DashboardRepo;
use sensorboard_sync::{PersistenceStatus, SharedSession};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::handlers::validation_failed;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct CreateDashboardRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,
    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
    /// Initial widget list, e.g. when importing or copying a dashboard.
    pub widgets: Option<Vec<WidgetPlacement>>,
    pub layout_config: Option<LayoutConfig>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateDashboardRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
    pub layout_config: Option<LayoutConfig>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct EditModeRequest {
    pub enabled: bool,
}

/// A dashboard with its effective layout config and, while an editing
/// session is open, the session's current widgets and save status.
#[derive(Debug, Serialize)]
pub struct DashboardDetail {
    #[serde(flatten)]
    pub dashboard: Dashboard,
    pub layout: LayoutConfig,
    pub editing: bool,
    pub edit_mode: bool,
    pub status: PersistenceStatus,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Load a dashboard if `user_id` owns it.
pub(crate) async fn find_owned(state: &AppState, id: DbId, user_id: DbId) -> AppResult<Dashboard> {
    DashboardRepo::find_for_user(&state.pool, id, user_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "dashboard",
            id,
        }))
}

/// The editing session of a dashboard owned by `user_id`, opened from the
/// stored widget list if nobody has it open yet.
pub(crate) async fn owned_session(
    state: &AppState,
    id: DbId,
    user_id: DbId,
) -> AppResult<SharedSession> {
    let dashboard = find_owned(state, id, user_id).await?;
    state
        .sessions
        .get_or_open(id, || async move {
            dashboard.placements().map_err(|e| {
                AppError::InternalError(format!("Stored widgets of dashboard {id} are unreadable: {e}"))
            })
        })
        .await
}

fn effective_layout(dashboard: &Dashboard, state: &AppState) -> LayoutConfig {
    dashboard
        .layout_config
        .clone()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_else(|| default_layout(state))
}

fn default_layout(state: &AppState) -> LayoutConfig {
    LayoutConfig {
        cols: state.config.grid.cols,
        ..LayoutConfig::default()
    }
}

fn to_json<T: Serialize>(value: &T) -> AppResult<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| AppError::InternalError(e.to_string()))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/dashboards
pub async fn list_dashboards(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<impl IntoResponse> {
    let dashboards = DashboardRepo::list_by_user(&state.pool, auth.user_id).await?;
    Ok(Json(DataResponse { data: dashboards }))
}

/// POST /api/v1/dashboards
///
/// Supplied widgets are normalized (sizes clamped to their type's
/// constraints, positions kept) before being stored.
pub async fn create_dashboard(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<CreateDashboardRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate().map_err(|e| validation_failed(&e))?;

    let widgets = match input.widgets {
        Some(widgets) => {
            let layout = LayoutState::with_widgets(state.config.grid, widgets);
            Some(to_json(&layout.widgets())?)
        }
        None => None,
    };
    let layout_config = input.layout_config.unwrap_or_else(|| default_layout(&state));

    let create = CreateDashboard {
        name: input.name.trim().to_string(),
        description: input.description,
        widgets,
        layout_config: Some(to_json(&layout_config)?),
        is_public: input.is_public,
    };
    let dashboard = DashboardRepo::create(&state.pool, auth.user_id, &create).await?;

    tracing::info!(
        dashboard_id = dashboard.id,
        user_id = auth.user_id,
        "Dashboard created"
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: dashboard })))
}

/// GET /api/v1/dashboards/{id}
pub async fn get_dashboard(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let mut dashboard = find_owned(&state, id, auth.user_id).await?;
    let layout = effective_layout(&dashboard, &state);

    let (editing, edit_mode, status) = match state.sessions.get(id).await {
        Some(session) => {
            let session = session.lock().await;
            dashboard.widgets = to_json(&session.widgets())?;
            (true, session.edit_mode(), session.status())
        }
        None => (false, false, PersistenceStatus::default()),
    };

    Ok(Json(DataResponse {
        data: DashboardDetail {
            dashboard,
            layout,
            editing,
            edit_mode,
            status,
        },
    }))
}

/// PUT /api/v1/dashboards/{id}
pub async fn update_dashboard(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateDashboardRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate().map_err(|e| validation_failed(&e))?;

    let update = UpdateDashboard {
        name: input.name.map(|n| n.trim().to_string()),
        description: input.description,
        layout_config: input.layout_config.as_ref().map(to_json).transpose()?,
        is_public: input.is_public,
    };
    let dashboard = DashboardRepo::update(&state.pool, id, auth.user_id, &update)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "dashboard",
            id,
        }))?;

    Ok(Json(DataResponse { data: dashboard }))
}

/// DELETE /api/v1/dashboards/{id}
///
/// Closes the editing session without a final save and disconnects live
/// viewers.
pub async fn delete_dashboard(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let deleted = DashboardRepo::delete(&state.pool, id, auth.user_id).await?;
    if !deleted {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "dashboard",
            id,
        }));
    }

    state.sessions.close(id).await;
    let viewers = state.ws_manager.close_dashboard(id).await;
    tracing::info!(dashboard_id = id, viewers, "Dashboard deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/dashboards/{id}/save
///
/// Write the current widget list immediately, cancelling any pending
/// autosave. Answers 502 if the write fails; the failure is also recorded
/// in the save status.
pub async fn save_dashboard(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let session = owned_session(&state, id, auth.user_id).await?;
    // Other requests keep editing while the write is in flight.
    let save = session.lock().await.prepare_save();
    save.run().await?;
    let status = session.lock().await.status();
    Ok(Json(DataResponse { data: status }))
}

/// GET /api/v1/dashboards/{id}/status
pub async fn get_status(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    find_owned(&state, id, auth.user_id).await?;
    let status = match state.sessions.get(id).await {
        Some(session) => session.lock().await.status(),
        None => PersistenceStatus::default(),
    };
    Ok(Json(DataResponse { data: status }))
}

/// DELETE /api/v1/dashboards/{id}/status/error
///
/// Dismiss the last save error.
pub async fn clear_status_error(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    find_owned(&state, id, auth.user_id).await?;
    if let Some(session) = state.sessions.get(id).await {
        session.lock().await.clear_error();
    }
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/dashboards/{id}/edit-mode
///
/// Live feeds of the dashboard suspend their bindings while edit mode is on.
pub async fn set_edit_mode(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<EditModeRequest>,
) -> AppResult<impl IntoResponse> {
    let session = owned_session(&state, id, auth.user_id).await?;
    session.lock().await.set_edit_mode(input.enabled);
    Ok(Json(DataResponse {
        data: EditModeRequest {
            enabled: input.enabled,
        },
    }))
}
