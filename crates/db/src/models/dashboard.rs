//! Dashboard entity model and DTOs.

use sensorboard_core::layout::WidgetPlacement;
use sensorboard_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `dashboards` table.
///
/// `widgets` is kept as raw JSON so a row written by a newer client with an
/// unfamiliar widget type still loads; use [`Dashboard::placements`] for the
/// typed list.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Dashboard {
    pub id: DbId,
    pub user_id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub widgets: serde_json::Value,
    pub layout_config: Option<serde_json::Value>,
    pub is_public: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Dashboard {
    pub fn placements(&self) -> Result<Vec<WidgetPlacement>, serde_json::Error> {
        serde_json::from_value(self.widgets.clone())
    }
}

/// Grid settings saved alongside the widgets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutConfig {
    pub grid_width: u32,
    pub cols: u32,
    pub row_height: u32,
    pub margin: [u32; 2],
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            grid_width: 1200,
            cols: 12,
            row_height: 60,
            margin: [16, 16],
        }
    }
}

/// DTO for creating a dashboard.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateDashboard {
    pub name: String,
    pub description: Option<String>,
    /// Defaults to an empty list.
    pub widgets: Option<serde_json::Value>,
    pub layout_config: Option<serde_json::Value>,
    pub is_public: Option<bool>,
}

/// DTO for renaming or reconfiguring a dashboard. Widgets are written
/// separately through [`crate::repositories::DashboardRepo::update_widgets`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateDashboard {
    pub name: Option<String>,
    pub description: Option<String>,
    pub layout_config: Option<serde_json::Value>,
    pub is_public: Option<bool>,
}
