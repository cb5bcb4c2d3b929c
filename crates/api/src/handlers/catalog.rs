//! Handlers for the widget catalog. Public; no authentication.

use axum::extract::{Path, Query};
use axum::response::IntoResponse;
use axum::Json;
use sensorboard_core::catalog::{self, WidgetCategory};
use sensorboard_core::settings::{self, SettingsSchema};
use sensorboard_core::types::Props;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::response::DataResponse;

#[derive(Debug, Deserialize)]
pub struct CatalogQuery {
    pub category: Option<WidgetCategory>,
}

#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    pub schema: SettingsSchema,
    /// Values the settings form starts from for a new widget.
    pub defaults: Props,
}

/// GET /api/v1/catalog
pub async fn list_catalog(Query(query): Query<CatalogQuery>) -> impl IntoResponse {
    let entries: Vec<_> = match query.category {
        Some(category) => catalog::entries_by_category(category),
        None => catalog::all_entries().iter().collect(),
    };
    Json(DataResponse { data: entries })
}

/// GET /api/v1/catalog/{type}/settings
pub async fn get_settings_schema(Path(tag): Path<String>) -> AppResult<impl IntoResponse> {
    let widget_type = catalog::parse_widget_type(&tag)?;
    let schema = settings::schema_for(widget_type);
    let defaults = settings::default_values(&schema);
    Ok(Json(DataResponse {
        data: SettingsResponse { schema, defaults },
    }))
}
