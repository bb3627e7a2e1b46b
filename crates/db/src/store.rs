//! PostgreSQL [`CardStore`].

use wordloop_core::card::Card;
use wordloop_core::due_queue::DueFilter;
use wordloop_core::folder::Folder;
use wordloop_core::store::{CardStore, StoreError, TimerBatch};
use wordloop_core::sync_settings::AutoSyncSettings;
use wordloop_core::types::{DbId, Timestamp};

use crate::models::srs_card::SrsCardRow;
use crate::repositories::{SrsCardRepo, SrsFolderRepo, SyncSettingRepo};
use crate::DbPool;

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn cards(rows: Vec<SrsCardRow>) -> Result<Vec<Card>, StoreError> {
    rows.into_iter().map(Card::try_from).collect()
}

/// [`CardStore`] backed by the repositories in this crate.
#[derive(Clone)]
pub struct PgCardStore {
    pool: DbPool,
}

impl PgCardStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

impl CardStore for PgCardStore {
    async fn find_card(&self, id: DbId) -> Result<Option<Card>, StoreError> {
        SrsCardRepo::find_by_id(&self.pool, id)
            .await
            .map_err(backend)?
            .map(Card::try_from)
            .transpose()
    }

    async fn update_card(&self, card: &Card) -> Result<Card, StoreError> {
        if let Some(row) = SrsCardRepo::update_checked(&self.pool, card)
            .await
            .map_err(backend)?
        {
            return Card::try_from(row);
        }

        // Distinguish a lost race from a vanished row.
        match SrsCardRepo::find_by_id(&self.pool, card.id)
            .await
            .map_err(backend)?
        {
            Some(_) => Err(StoreError::VersionConflict {
                card_id: card.id,
                expected: card.version,
            }),
            None => Err(StoreError::NotFound {
                entity: "Card",
                id: card.id,
            }),
        }
    }

    async fn list_folder_cards(&self, folder_id: DbId) -> Result<Vec<Card>, StoreError> {
        cards(
            SrsCardRepo::list_by_folder(&self.pool, folder_id)
                .await
                .map_err(backend)?,
        )
    }

    async fn batch_update_timers(&self, batch: &TimerBatch) -> Result<u64, StoreError> {
        SrsCardRepo::apply_timer_batch(&self.pool, batch)
            .await
            .map_err(backend)?
            .ok_or(StoreError::GuardFailed {
                folder_id: batch.folder_id,
                stage: batch.stage,
            })
    }

    async fn find_due_cards(
        &self,
        user_id: DbId,
        as_of: Timestamp,
        filter: &DueFilter,
    ) -> Result<Vec<Card>, StoreError> {
        cards(
            SrsCardRepo::find_due(&self.pool, user_id, as_of, filter)
                .await
                .map_err(backend)?,
        )
    }

    async fn refresh_overdue_flags(
        &self,
        user_id: DbId,
        as_of: Timestamp,
    ) -> Result<u64, StoreError> {
        SrsCardRepo::refresh_overdue(&self.pool, user_id, as_of)
            .await
            .map_err(backend)
    }

    async fn find_folder(&self, id: DbId) -> Result<Option<Folder>, StoreError> {
        Ok(SrsFolderRepo::find_by_id(&self.pool, id)
            .await
            .map_err(backend)?
            .map(Folder::from))
    }

    async fn list_subfolders_for_user(&self, user_id: DbId) -> Result<Vec<Folder>, StoreError> {
        Ok(SrsFolderRepo::list_subfolders_for_user(&self.pool, user_id)
            .await
            .map_err(backend)?
            .into_iter()
            .map(Folder::from)
            .collect())
    }

    async fn list_users_with_subfolders(&self) -> Result<Vec<DbId>, StoreError> {
        SrsFolderRepo::list_users_with_subfolders(&self.pool)
            .await
            .map_err(backend)
    }

    async fn sync_settings(&self, user_id: DbId) -> Result<AutoSyncSettings, StoreError> {
        Ok(SyncSettingRepo::find(&self.pool, user_id)
            .await
            .map_err(backend)?
            .map(AutoSyncSettings::from)
            .unwrap_or_default())
    }
}
