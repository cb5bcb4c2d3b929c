//! JWT-based authentication extractor.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use sensorboard_core::error::CoreError;
use sensorboard_core::types::DbId;

use crate::auth::jwt::validate_token;
use crate::error::AppError;
use crate::state::AppState;

/// The user behind the `Authorization: Bearer <token>` header.
///
/// Add it as a handler parameter to require authentication:
///
/// ```ignore
/// async fn list(auth: AuthUser) -> AppResult<Json<()>> {
///     tracing::info!(user_id = auth.user_id, "listing");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: DbId,
    pub email: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Missing Authorization header".into(),
                ))
            })?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid Authorization format. Expected: Bearer <token>".into(),
            ))
        })?;

        AuthUser::from_token(token, state)
    }
}

impl AuthUser {
    /// Authenticate a raw token. The live WebSocket uses this for tokens
    /// passed as a query parameter, since browsers cannot set headers on an
    /// upgrade request.
    pub fn from_token(token: &str, state: &AppState) -> Result<Self, AppError> {
        let claims = validate_token(token, &state.config.jwt).map_err(|_| {
            AppError::Core(CoreError::Unauthorized("Invalid or expired token".into()))
        })?;

        Ok(AuthUser {
            user_id: claims.sub,
            email: claims.email,
        })
    }
}
