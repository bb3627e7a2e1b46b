//! Folder timer synchronizer.
//!
//! [`TimerSynchronizer`] pulls the cards of a study subfolder back onto a
//! shared review time, one (folder, stage) group at a time:
//!
//! 1. Load the folder's cards and group them by stage ([`plan_folder`]).
//! 2. Groups already in sync are left alone.
//! 3. Groups whose drift is within tolerance are rewritten to their
//!    earliest timer in a single atomic batch.
//! 4. Groups whose drift exceeds tolerance are reported as skipped.
//!
//! Failure isolation is per group: a batch that cannot commit is reported as
//! failed and the remaining groups still run. Running the sync again on
//! synchronized data changes nothing.

use std::sync::Arc;

use chrono::Duration;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::card::Card;
use crate::error::CoreError;
use crate::folder::Folder;
use crate::store::CardStore;
use crate::sync_plan::{plan_folder, GroupPlan, SyncCandidate, TimerDrift};
use crate::types::{DbId, Timestamp};

/* --------------------------------------------------------------------------
Result types
-------------------------------------------------------------------------- */

/// Preview of one (folder, stage) group.
#[derive(Debug, Clone, Serialize)]
pub struct SyncGroupPreview {
    pub stage: u8,
    pub cards: Vec<SyncCandidate>,
    pub can_sync: bool,
    /// Largest drift of either timer across the group, in whole seconds
    /// rounded up.
    pub time_difference_secs: i64,
    /// Target `next_review_at`, when that dimension would be rewritten.
    pub sync_to_time: Option<Timestamp>,
    pub next_review: TimerDrift,
    pub waiting: TimerDrift,
}

impl From<GroupPlan> for SyncGroupPreview {
    fn from(plan: GroupPlan) -> Self {
        let can_sync = plan.can_sync();
        let sync_to_time = plan.next_review.assignment().map(|a| a.at);
        Self {
            stage: plan.stage,
            time_difference_secs: plan.next_review.drift_secs.max(plan.waiting.drift_secs),
            sync_to_time,
            can_sync,
            cards: plan.cards,
            next_review: plan.next_review,
            waiting: plan.waiting,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncPreview {
    pub folder_id: DbId,
    pub tolerance_minutes: i64,
    pub groups: Vec<SyncGroupPreview>,
    /// Cards in groups that would be rewritten.
    pub total_syncable_cards: usize,
}

/// What happened to one group during a sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GroupOutcome {
    Synced {
        cards_updated: u64,
        next_review_at: Option<Timestamp>,
        waiting_until: Option<Timestamp>,
    },
    AlreadySynchronized,
    /// Drift exceeds tolerance. Informational, not an error.
    Skipped { reason: String },
    /// The group's batch could not be committed and was rolled back.
    Failed { error: String },
    /// The sync was cancelled before this group was reached.
    NotAttempted,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupSyncResult {
    pub stage: u8,
    pub card_count: usize,
    pub drift_secs: i64,
    #[serde(flatten)]
    pub outcome: GroupOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub folder_id: DbId,
    pub groups: Vec<GroupSyncResult>,
    pub synced_groups: usize,
    pub skipped_groups: usize,
    pub failed_groups: usize,
    pub total_synced_cards: u64,
    pub cancelled: bool,
}

impl SyncReport {
    fn new(folder_id: DbId) -> Self {
        Self {
            folder_id,
            groups: Vec::new(),
            synced_groups: 0,
            skipped_groups: 0,
            failed_groups: 0,
            total_synced_cards: 0,
            cancelled: false,
        }
    }

    fn push(&mut self, result: GroupSyncResult) {
        match &result.outcome {
            GroupOutcome::Synced { cards_updated, .. } => {
                self.synced_groups += 1;
                self.total_synced_cards += cards_updated;
            }
            GroupOutcome::Skipped { .. } => self.skipped_groups += 1,
            GroupOutcome::Failed { .. } => self.failed_groups += 1,
            GroupOutcome::AlreadySynchronized | GroupOutcome::NotAttempted => {}
        }
        self.groups.push(result);
    }
}

/// Totals for a multi-folder sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub users_processed: usize,
    pub folders_processed: usize,
    pub folders_excluded: usize,
    pub folders_failed: usize,
    pub synced_groups: usize,
    pub failed_groups: usize,
    pub total_synced_cards: u64,
    pub cancelled: bool,
}

impl SweepReport {
    fn absorb(&mut self, other: SweepReport) {
        self.users_processed += other.users_processed;
        self.folders_processed += other.folders_processed;
        self.folders_excluded += other.folders_excluded;
        self.folders_failed += other.folders_failed;
        self.synced_groups += other.synced_groups;
        self.failed_groups += other.failed_groups;
        self.total_synced_cards += other.total_synced_cards;
        self.cancelled |= other.cancelled;
    }
}

/* --------------------------------------------------------------------------
TimerSynchronizer
-------------------------------------------------------------------------- */

pub struct TimerSynchronizer<S> {
    store: Arc<S>,
    tolerance: Duration,
}

impl<S> Clone for TimerSynchronizer<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            tolerance: self.tolerance,
        }
    }
}

impl<S: CardStore> TimerSynchronizer<S> {
    pub fn new(store: Arc<S>, tolerance: Duration) -> Self {
        Self { store, tolerance }
    }

    /// The same synchronizer with a different drift tolerance.
    pub fn with_tolerance(&self, tolerance: Duration) -> Self {
        Self {
            store: Arc::clone(&self.store),
            tolerance,
        }
    }

    pub fn tolerance(&self) -> Duration {
        self.tolerance
    }

    async fn load_scope(&self, folder_id: DbId) -> Result<(Folder, Vec<Card>), CoreError> {
        let folder = self
            .store
            .find_folder(folder_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Folder",
                id: folder_id,
            })?;
        folder.ensure_sync_scope()?;
        let cards = self.store.list_folder_cards(folder_id).await?;
        Ok((folder, cards))
    }

    /// Report what [`execute`](Self::execute) would do, without writing.
    pub async fn preview(&self, folder_id: DbId) -> Result<SyncPreview, CoreError> {
        let (_, cards) = self.load_scope(folder_id).await?;
        let groups: Vec<SyncGroupPreview> = plan_folder(&cards, self.tolerance)
            .into_iter()
            .map(SyncGroupPreview::from)
            .collect();
        let total_syncable_cards = groups
            .iter()
            .filter(|g| g.can_sync)
            .map(|g| g.cards.len())
            .sum();

        Ok(SyncPreview {
            folder_id,
            tolerance_minutes: self.tolerance.num_minutes(),
            groups,
            total_syncable_cards,
        })
    }

    /// Synchronize every group of `folder_id`.
    pub async fn execute(&self, folder_id: DbId) -> Result<SyncReport, CoreError> {
        self.execute_cancellable(folder_id, &CancellationToken::new())
            .await
    }

    /// Synchronize every group of `folder_id`, stopping between groups once
    /// `cancel` fires. A group already being written always completes.
    pub async fn execute_cancellable(
        &self,
        folder_id: DbId,
        cancel: &CancellationToken,
    ) -> Result<SyncReport, CoreError> {
        let (_, cards) = self.load_scope(folder_id).await?;
        let mut report = SyncReport::new(folder_id);

        for plan in plan_folder(&cards, self.tolerance) {
            let card_count = plan.cards.len();
            let drift_secs = plan.next_review.drift_secs;

            let outcome = if cancel.is_cancelled() {
                report.cancelled = true;
                GroupOutcome::NotAttempted
            } else {
                self.sync_group(folder_id, &plan).await
            };

            report.push(GroupSyncResult {
                stage: plan.stage,
                card_count,
                drift_secs,
                outcome,
            });
        }

        if report.synced_groups > 0 || report.failed_groups > 0 {
            tracing::info!(
                folder_id,
                synced_groups = report.synced_groups,
                skipped_groups = report.skipped_groups,
                failed_groups = report.failed_groups,
                total_synced_cards = report.total_synced_cards,
                "Folder timers synchronized"
            );
        }
        Ok(report)
    }

    async fn sync_group(&self, folder_id: DbId, plan: &GroupPlan) -> GroupOutcome {
        let Some(batch) = plan.to_batch(folder_id) else {
            return if plan.is_skipped() {
                tracing::debug!(
                    folder_id,
                    stage = plan.stage,
                    drift_secs = plan.next_review.drift_secs,
                    "Sync skipped, drift exceeds tolerance"
                );
                GroupOutcome::Skipped {
                    reason: plan.skip_reason(self.tolerance),
                }
            } else {
                GroupOutcome::AlreadySynchronized
            };
        };

        match self.store.batch_update_timers(&batch).await {
            Ok(cards_updated) => GroupOutcome::Synced {
                cards_updated,
                next_review_at: batch.next_review.as_ref().map(|a| a.at),
                waiting_until: batch.waiting.as_ref().map(|a| a.at),
            },
            Err(e) => {
                tracing::warn!(
                    folder_id,
                    stage = plan.stage,
                    error = %e,
                    "Timer batch rolled back"
                );
                GroupOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    /// Synchronize all of one user's subfolders.
    ///
    /// Uses the user's stored tolerance and skips their excluded folders. A
    /// folder that cannot be loaded is counted as failed; the sweep goes on.
    pub async fn synchronize_user(
        &self,
        user_id: DbId,
        cancel: &CancellationToken,
    ) -> Result<SweepReport, CoreError> {
        let settings = self.store.sync_settings(user_id).await?;
        let synchronizer = self.with_tolerance(settings.tolerance());
        let folders = self.store.list_subfolders_for_user(user_id).await?;

        let mut sweep = SweepReport {
            users_processed: 1,
            ..Default::default()
        };

        for folder in folders {
            if cancel.is_cancelled() {
                sweep.cancelled = true;
                break;
            }
            if settings.excludes(folder.id) {
                sweep.folders_excluded += 1;
                continue;
            }

            match synchronizer.execute_cancellable(folder.id, cancel).await {
                Ok(report) => {
                    sweep.folders_processed += 1;
                    sweep.synced_groups += report.synced_groups;
                    sweep.failed_groups += report.failed_groups;
                    sweep.total_synced_cards += report.total_synced_cards;
                    sweep.cancelled |= report.cancelled;
                }
                Err(e) => {
                    sweep.folders_failed += 1;
                    tracing::error!(user_id, folder_id = folder.id, error = %e, "Folder sync failed");
                }
            }
        }

        Ok(sweep)
    }

    /// Synchronize the subfolders of every user who has any.
    pub async fn synchronize_all(&self, cancel: &CancellationToken) -> Result<SweepReport, CoreError> {
        let users = self.store.list_users_with_subfolders().await?;
        let mut total = SweepReport::default();

        for user_id in users {
            if cancel.is_cancelled() {
                total.cancelled = true;
                break;
            }
            match self.synchronize_user(user_id, cancel).await {
                Ok(report) => total.absorb(report),
                Err(e) => {
                    tracing::error!(user_id, error = %e, "User sync sweep failed");
                }
            }
        }

        tracing::info!(
            users = total.users_processed,
            folders = total.folders_processed,
            total_synced_cards = total.total_synced_cards,
            cancelled = total.cancelled,
            "Timer sync sweep finished"
        );
        Ok(total)
    }
}

/* --------------------------------------------------------------------------
Tests
-------------------------------------------------------------------------- */
