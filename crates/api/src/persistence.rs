//! PostgreSQL-backed [`DashboardStore`].

use async_trait::async_trait;
use sensorboard_core::layout::WidgetPlacement;
use sensorboard_core::types::DbId;
use sensorboard_db::repositories::DashboardRepo;
use sensorboard_db::DbPool;
use sensorboard_sync::{DashboardStore, StoreError};

/// Writes widget lists into `dashboards.widgets`.
#[derive(Clone)]
pub struct PgDashboardStore {
    pool: DbPool,
}

impl PgDashboardStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DashboardStore for PgDashboardStore {
    async fn save_widgets(
        &self,
        dashboard_id: DbId,
        widgets: &[WidgetPlacement],
    ) -> Result<(), StoreError> {
        let json = serde_json::to_value(widgets).map_err(|e| StoreError::Write(e.to_string()))?;

        let written = DashboardRepo::update_widgets(&self.pool, dashboard_id, &json)
            .await
            .map_err(|e| StoreError::Write(e.to_string()))?;

        if !written {
            return Err(StoreError::NotFound(dashboard_id));
        }
        tracing::debug!(dashboard_id, widget_count = widgets.len(), "Widgets persisted");
        Ok(())
    }
}
