use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use sensorboard_core::error::CoreError;
use sensorboard_realtime::RealtimeError;
use sensorboard_sync::StoreError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps the domain errors of each crate and adds HTTP-specific variants.
/// Every variant renders as `{ "error", "code" }`; validation failures add a
/// `details` array with one message per offending field.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// A dashboard write-back failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The realtime value store rejected a read or write.
    #[error(transparent)]
    Realtime(#[from] RealtimeError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

pub type AppResult<T> = Result<T, AppError>;

/// Unique violations on a `uq_` constraint become [`CoreError::Conflict`];
/// everything else stays a database error.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if let Some(msg) = conflict_message(db_err.code().as_deref(), db_err.constraint()) {
                return AppError::Core(CoreError::Conflict(msg));
            }
        }
        AppError::Database(err)
    }
}

/// PostgreSQL `unique_violation` on one of our named unique constraints.
fn conflict_message(code: Option<&str>, constraint: Option<&str>) -> Option<String> {
    match (code, constraint) {
        (Some("23505"), Some(constraint)) if constraint.starts_with("uq_") => Some(format!(
            "Duplicate value violates unique constraint: {constraint}"
        )),
        _ => None,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut details: Option<Vec<String>> = None;

        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::WidgetNotFound(id) => (
                    StatusCode::NOT_FOUND,
                    "WIDGET_NOT_FOUND",
                    format!("Widget {id} not found"),
                ),
                CoreError::UnknownWidgetType(tag) => (
                    StatusCode::BAD_REQUEST,
                    "UNKNOWN_WIDGET_TYPE",
                    format!("Unknown widget type: {tag}"),
                ),
                CoreError::ValidationFailed(errors) => {
                    details = Some(errors.clone());
                    (
                        StatusCode::UNPROCESSABLE_ENTITY,
                        "VALIDATION_FAILED",
                        "Validation failed".to_string(),
                    )
                }
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                CoreError::Unauthorized(msg) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
                }
                CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
            },

            // --- Database errors ---
            AppError::Database(err) => classify_sqlx_error(err),

            // --- Store errors ---
            AppError::Store(StoreError::NotFound(id)) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("Dashboard with id {id} not found"),
            ),
            AppError::Store(err @ StoreError::Write(_)) => {
                tracing::warn!(error = %err, "Dashboard write failed");
                (StatusCode::BAD_GATEWAY, "PERSISTENCE_WRITE_FAILED", err.to_string())
            }

            // --- Realtime errors ---
            AppError::Realtime(err) => match err {
                RealtimeError::NotConfigured => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "REALTIME_NOT_CONFIGURED",
                    err.to_string(),
                ),
                RealtimeError::InvalidPath(_) => {
                    (StatusCode::BAD_REQUEST, "INVALID_PATH", err.to_string())
                }
                RealtimeError::SubscribeFailed { .. } | RealtimeError::Store(_) => {
                    tracing::warn!(error = %err, "Realtime store error");
                    (StatusCode::BAD_GATEWAY, "REALTIME_ERROR", err.to_string())
                }
            },

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        };

        let mut body = json!({
            "error": message,
            "code": code,
        });
        if let Some(details) = details {
            body["details"] = json!(details);
        }

        (status, axum::Json(body)).into_response()
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Everything else maps to 500 with a sanitized message. Unique violations
///   never reach here; they are turned into conflicts on conversion.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        other => {
            tracing::error!(error = %other, "Database error");
            internal()
        }
    }
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;

    use super::*;

    async fn render(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn validation_failures_carry_details() {
        let err = CoreError::ValidationFailed(vec![
            "Firebase Path is required".into(),
            "Decimal Precision must be at most 3".into(),
        ]);
        let (status, body) = render(err.into()).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "VALIDATION_FAILED");
        assert_eq!(body["details"][0], "Firebase Path is required");
        assert_eq!(body["details"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn unknown_widget_type_is_bad_request() {
        let (status, body) = render(CoreError::UnknownWidgetType("radar".into()).into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "UNKNOWN_WIDGET_TYPE");
        assert!(body.get("details").is_none());
    }

    #[tokio::test]
    async fn store_and_realtime_errors_map_to_gateway_statuses() {
        let (status, body) = render(StoreError::Write("timeout".into()).into()).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "Failed to save dashboard: timeout");

        let (status, _) = render(RealtimeError::NotConfigured.into()).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let (status, _) = render(RealtimeError::InvalidPath("/a.b".into()).into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn conflicts_render_as_409() {
        let msg = conflict_message(Some("23505"), Some("uq_users_email")).unwrap();
        let (status, body) = render(CoreError::Conflict(msg).into()).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "CONFLICT");
        assert_eq!(
            body["error"],
            "Duplicate value violates unique constraint: uq_users_email"
        );
    }

    #[test]
    fn only_named_unique_violations_are_conflicts() {
        assert!(conflict_message(Some("23505"), Some("uq_users_email")).is_some());
        assert!(conflict_message(Some("23505"), Some("users_pkey")).is_none());
        assert!(conflict_message(Some("23503"), Some("uq_users_email")).is_none());
        assert!(conflict_message(None, None).is_none());
    }

    #[tokio::test]
    async fn missing_rows_are_not_found() {
        let (status, _) = render(sqlx::Error::RowNotFound.into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn internal_messages_are_sanitized() {
        let (status, body) = render(AppError::InternalError("secret detail".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "An internal error occurred");
    }
}
