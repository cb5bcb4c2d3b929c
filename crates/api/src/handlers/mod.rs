//! HTTP handlers, one module per resource.

pub mod auth;
pub mod catalog;
pub mod dashboards;
pub mod values;
pub mod widgets;

use sensorboard_core::error::CoreError;
use validator::ValidationErrors;

/// Flatten `validator` output into one message per failed rule, sorted so
/// responses are stable.
pub(crate) fn validation_messages(errors: &ValidationErrors) -> Vec<String> {
    let mut messages: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(message) => message.to_string(),
                None => format!("{field} is invalid"),
            })
        })
        .collect();
    messages.sort();
    messages
}

pub(crate) fn validation_failed(errors: &ValidationErrors) -> CoreError {
    CoreError::ValidationFailed(validation_messages(errors))
}
