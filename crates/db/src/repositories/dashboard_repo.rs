//! Repository for the `dashboards` table.
//!
//! Every read and write that originates from a user request is scoped by
//! `user_id`; a dashboard owned by someone else behaves as if it did not
//! exist.

use sensorboard_core::types::DbId;
use sqlx::PgPool;

use crate::models::dashboard::{CreateDashboard, Dashboard, UpdateDashboard};

const COLUMNS: &str = "id, user_id, name, description, widgets, layout_config, \
                       is_public, created_at, updated_at";

pub struct DashboardRepo;

impl DashboardRepo {
    /// List a user's dashboards, most recently updated first.
    pub async fn list_by_user(pool: &PgPool, user_id: DbId) -> Result<Vec<Dashboard>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM dashboards WHERE user_id = $1 ORDER BY updated_at DESC, id DESC"
        );
        sqlx::query_as::<_, Dashboard>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Find one dashboard if `user_id` owns it.
    pub async fn find_for_user(
        pool: &PgPool,
        id: DbId,
        user_id: DbId,
    ) -> Result<Option<Dashboard>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM dashboards WHERE id = $1 AND user_id = $2");
        sqlx::query_as::<_, Dashboard>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn create(
        pool: &PgPool,
        user_id: DbId,
        input: &CreateDashboard,
    ) -> Result<Dashboard, sqlx::Error> {
        let query = format!(
            "INSERT INTO dashboards (user_id, name, description, widgets, layout_config, is_public)
             VALUES ($1, $2, $3, COALESCE($4, '[]'::jsonb), $5, COALESCE($6, false))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Dashboard>(&query)
            .bind(user_id)
            .bind(&input.name)
            .bind(&input.description)
            .bind(&input.widgets)
            .bind(&input.layout_config)
            .bind(input.is_public)
            .fetch_one(pool)
            .await
    }

    /// Apply the non-`None` fields of `input`. Returns `None` when the
    /// dashboard does not exist or belongs to another user.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        user_id: DbId,
        input: &UpdateDashboard,
    ) -> Result<Option<Dashboard>, sqlx::Error> {
        let query = format!(
            "UPDATE dashboards SET
                name = COALESCE($3, name),
                description = COALESCE($4, description),
                layout_config = COALESCE($5, layout_config),
                is_public = COALESCE($6, is_public)
             WHERE id = $1 AND user_id = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Dashboard>(&query)
            .bind(id)
            .bind(user_id)
            .bind(&input.name)
            .bind(&input.description)
            .bind(&input.layout_config)
            .bind(input.is_public)
            .fetch_optional(pool)
            .await
    }

    /// Overwrite the widget list. Called by the autosave path, which has
    /// already checked ownership when the editing session was opened.
    ///
    /// Returns `true` if a row was written.
    pub async fn update_widgets(
        pool: &PgPool,
        id: DbId,
        widgets: &serde_json::Value,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE dashboards SET widgets = $2 WHERE id = $1")
            .bind(id)
            .bind(widgets)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a dashboard owned by `user_id`. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId, user_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM dashboards WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
