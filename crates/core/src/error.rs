use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Widget not found: {0}")]
    WidgetNotFound(String),

    #[error("Unknown widget type: {0}")]
    UnknownWidgetType(String),

    #[error("Validation failed: {}", .0.join("; "))]
    ValidationFailed(Vec<String>),

    #[error("Validation failed: {0}")]
    Validation(String),

    /// A write would break a uniqueness rule, e.g. a second account with
    /// the same email.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),
}
