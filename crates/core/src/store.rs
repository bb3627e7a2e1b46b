//! Persistence boundary for the SRS services.
//!
//! [`CardStore`] is the only way the services reach storage. The `db` crate
//! provides the PostgreSQL implementation; unit tests use an in-memory one.

use std::future::Future;

use serde::Serialize;

use crate::card::Card;
use crate::due_queue::DueFilter;
use crate::error::CoreError;
use crate::folder::Folder;
use crate::sync_settings::AutoSyncSettings;
use crate::types::{DbId, Timestamp};

/// Errors surfaced by a [`CardStore`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: DbId },

    /// The card's stored version no longer matches the version that was read.
    #[error("Card {card_id} is no longer at version {expected}")]
    VersionConflict { card_id: DbId, expected: i32 },

    /// A timer batch no longer matched the stored cards and was rolled back.
    #[error("Timer batch for folder {folder_id} stage {stage} no longer matches stored cards")]
    GuardFailed { folder_id: DbId, stage: u8 },

    /// A stored row violates a card invariant.
    #[error("Invalid stored data: {0}")]
    Corrupt(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => CoreError::NotFound { entity, id },
            StoreError::VersionConflict { card_id, .. } => {
                CoreError::ConcurrencyConflict { card_id }
            }
            StoreError::GuardFailed { .. } => CoreError::Conflict(err.to_string()),
            StoreError::Corrupt(msg) => CoreError::Validation(msg),
            StoreError::Backend(msg) => CoreError::Internal(msg),
        }
    }
}

/// One timer value written to a set of cards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimerAssignment {
    pub card_ids: Vec<DbId>,
    pub at: Timestamp,
}

/// A card id with the version it had when the batch was planned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CardVersion {
    pub card_id: DbId,
    pub version: i32,
}

/// All timer writes for one (folder, stage) group.
///
/// Applied atomically: either every listed card is updated or none is. An
/// implementation must refuse the batch (with [`StoreError::GuardFailed`]) if
/// any listed card was written since it was read (its version differs from
/// `expected`), has left the folder or stage, or if the write would move its
/// timer later than its stored value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimerBatch {
    pub folder_id: DbId,
    pub stage: u8,
    /// Read versions of every card the batch touches.
    pub expected: Vec<CardVersion>,
    pub next_review: Option<TimerAssignment>,
    pub waiting: Option<TimerAssignment>,
}

impl TimerBatch {
    pub fn is_empty(&self) -> bool {
        self.next_review.is_none() && self.waiting.is_none()
    }

    pub fn expected_version(&self, card_id: DbId) -> Option<i32> {
        self.expected
            .iter()
            .find(|v| v.card_id == card_id)
            .map(|v| v.version)
    }

    /// Every touched card has an expected version.
    pub fn is_fully_versioned(&self) -> bool {
        self.card_ids()
            .iter()
            .all(|id| self.expected_version(*id).is_some())
    }

    /// Distinct cards touched by the batch.
    pub fn card_ids(&self) -> Vec<DbId> {
        let mut ids: Vec<DbId> = self
            .next_review
            .iter()
            .chain(self.waiting.iter())
            .flat_map(|a| a.card_ids.iter().copied())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

/// Storage operations required by the SRS services.
pub trait CardStore: Send + Sync {
    fn find_card(
        &self,
        id: DbId,
    ) -> impl Future<Output = Result<Option<Card>, StoreError>> + Send;

    /// Persist every review field of `card`, but only if the stored row is
    /// still at `card.version`. Returns the stored card with its new version.
    fn update_card(&self, card: &Card) -> impl Future<Output = Result<Card, StoreError>> + Send;

    /// All cards assigned to `folder_id`, ordered by stage then id.
    fn list_folder_cards(
        &self,
        folder_id: DbId,
    ) -> impl Future<Output = Result<Vec<Card>, StoreError>> + Send;

    /// Apply a [`TimerBatch`] in one transaction. Returns the number of cards
    /// updated.
    fn batch_update_timers(
        &self,
        batch: &TimerBatch,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;

    /// The user's cards due at `as_of` matching `filter`, ordered by
    /// `next_review_at` (never-reviewed first) then id. `filter.limit` is
    /// applied when set.
    fn find_due_cards(
        &self,
        user_id: DbId,
        as_of: Timestamp,
        filter: &DueFilter,
    ) -> impl Future<Output = Result<Vec<Card>, StoreError>> + Send;

    /// Persist the cached overdue flags of the user's active cards so they
    /// match [`Card::refresh_overdue`] at `as_of`. Returns rows changed.
    fn refresh_overdue_flags(
        &self,
        user_id: DbId,
        as_of: Timestamp,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;

    fn find_folder(
        &self,
        id: DbId,
    ) -> impl Future<Output = Result<Option<Folder>, StoreError>> + Send;

    /// Every subfolder (non-root folder) the user owns.
    fn list_subfolders_for_user(
        &self,
        user_id: DbId,
    ) -> impl Future<Output = Result<Vec<Folder>, StoreError>> + Send;

    /// Distinct owners of at least one subfolder, ascending.
    fn list_users_with_subfolders(
        &self,
    ) -> impl Future<Output = Result<Vec<DbId>, StoreError>> + Send;

    /// The user's auto-sync settings, or defaults when none are stored.
    fn sync_settings(
        &self,
        user_id: DbId,
    ) -> impl Future<Output = Result<AutoSyncSettings, StoreError>> + Send;
}
