//! Repository for the `srs_sync_settings` table.

use sqlx::PgPool;
use wordloop_core::sync_settings::DEFAULT_MAX_DIFFERENCE_MINUTES;
use wordloop_core::types::DbId;

use crate::models::sync_setting::{SyncSettingRow, UpdateSyncSettings};

const COLUMNS: &str = "\
    user_id, enabled, max_difference_minutes, excluded_folder_ids, created_at, updated_at";

/// Provides persistence operations for auto-sync settings.
pub struct SyncSettingRepo;

impl SyncSettingRepo {
    /// The stored settings row, if the user has saved any.
    pub async fn find(pool: &PgPool, user_id: DbId) -> Result<Option<SyncSettingRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM srs_sync_settings WHERE user_id = $1");
        sqlx::query_as::<_, SyncSettingRow>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Create or patch a user's settings. Fields left `None` keep their
    /// stored value, or the default on first write.
    pub async fn upsert(
        pool: &PgPool,
        user_id: DbId,
        body: &UpdateSyncSettings,
    ) -> Result<SyncSettingRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO srs_sync_settings \
                (user_id, enabled, max_difference_minutes, excluded_folder_ids) \
             VALUES ($1, COALESCE($2, TRUE), COALESCE($3, $5), COALESCE($4, '{{}}'::BIGINT[])) \
             ON CONFLICT (user_id) DO UPDATE SET \
                enabled = COALESCE($2, srs_sync_settings.enabled), \
                max_difference_minutes = COALESCE($3, srs_sync_settings.max_difference_minutes), \
                excluded_folder_ids = COALESCE($4, srs_sync_settings.excluded_folder_ids), \
                updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SyncSettingRow>(&query)
            .bind(user_id)
            .bind(body.enabled)
            .bind(body.max_difference_minutes)
            .bind(body.excluded_folder_ids.as_deref())
            .bind(DEFAULT_MAX_DIFFERENCE_MINUTES)
            .fetch_one(pool)
            .await
    }
}
