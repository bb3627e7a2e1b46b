//! Review submission.
//!
//! [`ReviewScheduler::submit_review`] is the single write path for answers.
//! It applies the outcome to the card state machine, persists the result
//! under optimistic locking and then, when the user has it enabled, pulls
//! the card's study folder back into sync.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::card::{Card, Difficulty, ReviewOutcome};
use crate::error::CoreError;
use crate::store::{CardStore, StoreError};
use crate::timer_sync::{SyncReport, TimerSynchronizer};
use crate::types::{DbId, Timestamp};

/// Attempts made before a version conflict is reported to the caller.
pub const MAX_REVIEW_ATTEMPTS: u32 = 2;

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewRequest {
    pub card_id: DbId,
    pub user_id: DbId,
    pub outcome: ReviewOutcome,
    pub now: Timestamp,
}

impl ReviewRequest {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.card_id <= 0 {
            return Err(CoreError::Validation("card_id must be positive".into()));
        }
        if self.user_id <= 0 {
            return Err(CoreError::Validation("user_id must be positive".into()));
        }
        Ok(())
    }
}

/// Before/after figures for one review.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewStatistics {
    pub previous_stage: u8,
    /// New stage minus previous stage.
    pub stage_change: i32,
    pub previous_success_rate: f64,
    pub new_success_rate: f64,
    pub total_reviews: u32,
    pub difficulty: Difficulty,
}

impl ReviewStatistics {
    fn between(before: &Card, after: &Card) -> Self {
        Self {
            previous_stage: before.stage,
            stage_change: i32::from(after.stage) - i32::from(before.stage),
            previous_success_rate: before.success_rate(),
            new_success_rate: after.success_rate(),
            total_reviews: after.correct_total + after.wrong_total,
            difficulty: after.difficulty_assessment(),
        }
    }
}

/// What the post-review folder sync did.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AutoSyncOutcome {
    /// The card is global or sits in a root folder.
    NotApplicable,
    Disabled,
    Excluded { folder_id: DbId },
    Completed(SyncReport),
    /// The sync failed; the review itself was still saved.
    Failed { folder_id: DbId, error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewResult {
    pub card: Card,
    pub statistics: ReviewStatistics,
    pub auto_sync: AutoSyncOutcome,
}

pub struct ReviewScheduler<S> {
    store: Arc<S>,
    synchronizer: TimerSynchronizer<S>,
}

impl<S: CardStore> ReviewScheduler<S> {
    pub fn new(store: Arc<S>, synchronizer: TimerSynchronizer<S>) -> Self {
        Self {
            store,
            synchronizer,
        }
    }

    /// Record one answer for a card.
    ///
    /// A write that loses an optimistic-lock race is retried once against a
    /// fresh read. If the second attempt also loses, the caller gets a
    /// retryable [`CoreError::ConcurrencyConflict`] and nothing is written.
    pub async fn submit_review(&self, request: &ReviewRequest) -> Result<ReviewResult, CoreError> {
        request.validate()?;

        let mut attempt = 1;
        let (before, saved) = loop {
            let card = self.load_reviewable(request).await?;
            let mut updated = card.clone();
            updated.apply(request.outcome, request.now);
            updated.updated_at = request.now;
            updated.validate()?;

            match self.store.update_card(&updated).await {
                Ok(saved) => break (card, saved),
                Err(StoreError::VersionConflict { card_id, .. }) if attempt < MAX_REVIEW_ATTEMPTS => {
                    tracing::debug!(card_id, attempt, "Review lost a version race, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        };

        tracing::info!(
            card_id = saved.id,
            user_id = saved.user_id,
            outcome = ?request.outcome,
            stage = saved.stage,
            "Review recorded"
        );

        let statistics = ReviewStatistics::between(&before, &saved);
        let auto_sync = self.auto_sync(&saved).await;

        Ok(ReviewResult {
            card: saved,
            statistics,
            auto_sync,
        })
    }

    async fn load_reviewable(&self, request: &ReviewRequest) -> Result<Card, CoreError> {
        let card = self
            .store
            .find_card(request.card_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Card",
                id: request.card_id,
            })?;

        if card.user_id != request.user_id {
            return Err(CoreError::Forbidden(format!(
                "Card {} belongs to another user",
                card.id
            )));
        }
        if card.is_mastered {
            return Err(CoreError::Conflict(format!(
                "Card {} is mastered and no longer reviewed",
                card.id
            )));
        }
        if card.is_frozen(request.now) {
            return Err(CoreError::Conflict(format!("Card {} is frozen", card.id)));
        }
        Ok(card)
    }

    /// Never fails: sync problems are logged and reported in the outcome.
    async fn auto_sync(&self, card: &Card) -> AutoSyncOutcome {
        let Some(folder_id) = card.folder_id else {
            return AutoSyncOutcome::NotApplicable;
        };

        match self.try_auto_sync(card.user_id, folder_id).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(
                    card_id = card.id,
                    folder_id,
                    error = %e,
                    "Auto-sync after review failed"
                );
                AutoSyncOutcome::Failed {
                    folder_id,
                    error: e.to_string(),
                }
            }
        }
    }

    async fn try_auto_sync(&self, user_id: DbId, folder_id: DbId) -> Result<AutoSyncOutcome, CoreError> {
        let settings = self.store.sync_settings(user_id).await?;
        if !settings.enabled {
            return Ok(AutoSyncOutcome::Disabled);
        }
        if settings.excludes(folder_id) {
            return Ok(AutoSyncOutcome::Excluded { folder_id });
        }

        match self.store.find_folder(folder_id).await? {
            Some(folder) if folder.is_sync_scope() => {}
            _ => return Ok(AutoSyncOutcome::NotApplicable),
        }

        let report = self
            .synchronizer
            .with_tolerance(settings.tolerance())
            .execute(folder_id)
            .await?;
        Ok(AutoSyncOutcome::Completed(report))
    }
}
