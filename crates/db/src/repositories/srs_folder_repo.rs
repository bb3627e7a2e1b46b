//! Repository for the `srs_folders` table.

use sqlx::PgPool;
use wordloop_core::types::DbId;

use crate::models::srs_folder::{CreateSrsFolder, SrsFolderRow};

const COLUMNS: &str = "id, user_id, name, parent_id, scheduled_offset, created_at";

/// Provides persistence operations for study folders.
pub struct SrsFolderRepo;

impl SrsFolderRepo {
    /// Insert a folder. Name and parent rules are checked by the caller.
    pub async fn create(pool: &PgPool, input: &CreateSrsFolder) -> Result<SrsFolderRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO srs_folders (user_id, name, parent_id, scheduled_offset) \
             VALUES ($1, $2, $3, COALESCE($4, 0)) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SrsFolderRow>(&query)
            .bind(input.user_id)
            .bind(input.name.trim())
            .bind(input.parent_id)
            .bind(input.scheduled_offset)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<SrsFolderRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM srs_folders WHERE id = $1");
        sqlx::query_as::<_, SrsFolderRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Subfolders of a root, in schedule order.
    pub async fn list_children(
        pool: &PgPool,
        parent_id: DbId,
    ) -> Result<Vec<SrsFolderRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM srs_folders \
             WHERE parent_id = $1 \
             ORDER BY scheduled_offset, id"
        );
        sqlx::query_as::<_, SrsFolderRow>(&query)
            .bind(parent_id)
            .fetch_all(pool)
            .await
    }

    /// Every subfolder owned by a user.
    pub async fn list_subfolders_for_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<SrsFolderRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM srs_folders \
             WHERE user_id = $1 AND parent_id IS NOT NULL \
             ORDER BY id"
        );
        sqlx::query_as::<_, SrsFolderRow>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Distinct owners of at least one subfolder.
    pub async fn list_users_with_subfolders(pool: &PgPool) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT DISTINCT user_id FROM srs_folders \
             WHERE parent_id IS NOT NULL \
             ORDER BY user_id",
        )
        .fetch_all(pool)
        .await
    }
}
