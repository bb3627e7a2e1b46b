//! Auto-sync settings rows (`srs_sync_settings`).

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use wordloop_core::sync_settings::AutoSyncSettings;
use wordloop_core::types::{DbId, Timestamp};

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SyncSettingRow {
    pub user_id: DbId,
    pub enabled: bool,
    pub max_difference_minutes: i32,
    pub excluded_folder_ids: Vec<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<SyncSettingRow> for AutoSyncSettings {
    fn from(row: SyncSettingRow) -> Self {
        AutoSyncSettings {
            enabled: row.enabled,
            max_difference_minutes: row.max_difference_minutes,
            excluded_folder_ids: row.excluded_folder_ids,
        }
    }
}

/// Patch for a user's settings. Absent fields keep their stored (or
/// default) value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSyncSettings {
    pub enabled: Option<bool>,
    pub max_difference_minutes: Option<i32>,
    pub excluded_folder_ids: Option<Vec<DbId>>,
}
