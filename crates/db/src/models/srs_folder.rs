//! Study folder rows (`srs_folders`).

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use wordloop_core::folder::Folder;
use wordloop_core::types::{DbId, Timestamp};

/// A row from the `srs_folders` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SrsFolderRow {
    pub id: DbId,
    pub user_id: DbId,
    pub name: String,
    pub parent_id: Option<DbId>,
    pub scheduled_offset: i32,
    pub created_at: Timestamp,
}

impl From<SrsFolderRow> for Folder {
    fn from(row: SrsFolderRow) -> Self {
        Folder {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            parent_id: row.parent_id,
            scheduled_offset: row.scheduled_offset,
            created_at: row.created_at,
        }
    }
}

/// DTO for creating a folder. `parent_id == None` creates a day root.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSrsFolder {
    pub user_id: DbId,
    pub name: String,
    pub parent_id: Option<DbId>,
    pub scheduled_offset: Option<i32>,
}
