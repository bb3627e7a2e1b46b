//! Drift measurement for folder timer groups.
//!
//! Cards reviewed together in one subfolder should come due together, but
//! each review computes its own timestamps, so siblings drift apart by
//! seconds or minutes. This module groups a folder's cards by stage and
//! decides, per timer dimension, whether the group can be pulled onto one
//! shared time. It performs no I/O; [`crate::timer_sync`] applies the plans.
//!
//! The shared time is always the group's *earliest* value, so a sync only
//! ever makes cards available sooner.

use std::collections::BTreeMap;

use chrono::Duration;
use serde::Serialize;

use crate::card::{Card, ItemType};
use crate::store::{CardVersion, TimerAssignment, TimerBatch};
use crate::types::{DbId, Timestamp};

/// Default drift tolerance, in minutes.
pub const DEFAULT_SYNC_TOLERANCE_MINUTES: i64 = 60;

/// Whole seconds in `d`, rounded up so sub-second drift reports as 1.
fn ceil_secs(d: Duration) -> i64 {
    let secs = d.num_seconds();
    if d > Duration::seconds(secs) {
        secs + 1
    } else {
        secs
    }
}

/// Outcome of measuring one timer dimension of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftVerdict {
    /// Fewer than two cards carry this timer.
    NotApplicable,
    /// Every card already shares one value.
    InSync,
    /// Drift is positive and within tolerance.
    Syncable,
    /// Drift exceeds tolerance; left untouched.
    ExceedsTolerance,
}

/// Spread of one timer dimension across a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimerDrift {
    pub verdict: DriftVerdict,
    /// Cards carrying a value for this timer.
    pub card_ids: Vec<DbId>,
    pub earliest: Option<Timestamp>,
    pub latest: Option<Timestamp>,
    pub drift_secs: i64,
}

impl TimerDrift {
    fn measure(values: &[(DbId, Timestamp)], tolerance: Duration) -> Self {
        let card_ids: Vec<DbId> = values.iter().map(|(id, _)| *id).collect();
        let earliest = values.iter().map(|(_, t)| *t).min();
        let latest = values.iter().map(|(_, t)| *t).max();

        let (verdict, drift_secs) = match (earliest, latest) {
            (Some(min), Some(max)) if values.len() >= 2 => {
                let drift = max - min;
                let verdict = if drift == Duration::zero() {
                    DriftVerdict::InSync
                } else if drift <= tolerance {
                    DriftVerdict::Syncable
                } else {
                    DriftVerdict::ExceedsTolerance
                };
                (verdict, ceil_secs(drift))
            }
            _ => (DriftVerdict::NotApplicable, 0),
        };

        Self {
            verdict,
            card_ids,
            earliest,
            latest,
            drift_secs,
        }
    }

    /// The write that brings this dimension in sync, if one is allowed.
    pub fn assignment(&self) -> Option<TimerAssignment> {
        match (self.verdict, self.earliest) {
            (DriftVerdict::Syncable, Some(at)) => Some(TimerAssignment {
                card_ids: self.card_ids.clone(),
                at,
            }),
            _ => None,
        }
    }
}

/// A card as listed in a sync preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncCandidate {
    pub card_id: DbId,
    pub item_type: ItemType,
    pub item_id: DbId,
    pub next_review_at: Option<Timestamp>,
    pub waiting_until: Option<Timestamp>,
    pub version: i32,
}

/// Synchronization plan for the cards of one folder at one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupPlan {
    pub stage: u8,
    pub cards: Vec<SyncCandidate>,
    pub next_review: TimerDrift,
    pub waiting: TimerDrift,
}

impl GroupPlan {
    /// At least one dimension has drift within tolerance.
    pub fn can_sync(&self) -> bool {
        self.next_review.verdict == DriftVerdict::Syncable
            || self.waiting.verdict == DriftVerdict::Syncable
    }

    /// Nothing can be synced and at least one dimension is out of tolerance.
    pub fn is_skipped(&self) -> bool {
        !self.can_sync()
            && (self.next_review.verdict == DriftVerdict::ExceedsTolerance
                || self.waiting.verdict == DriftVerdict::ExceedsTolerance)
    }

    /// Human-readable reason a group was skipped.
    pub fn skip_reason(&self, tolerance: Duration) -> String {
        let drift = self.next_review.drift_secs.max(self.waiting.drift_secs);
        format!(
            "Drift of {} minutes exceeds tolerance of {} minutes",
            drift / 60,
            tolerance.num_minutes()
        )
    }

    /// The writes this plan allows, pinned to the versions the plan was
    /// computed from.
    pub fn to_batch(&self, folder_id: DbId) -> Option<TimerBatch> {
        let mut batch = TimerBatch {
            folder_id,
            stage: self.stage,
            expected: Vec::new(),
            next_review: self.next_review.assignment(),
            waiting: self.waiting.assignment(),
        };
        if batch.is_empty() {
            return None;
        }
        let touched = batch.card_ids();
        batch.expected = self
            .cards
            .iter()
            .filter(|c| touched.contains(&c.card_id))
            .map(|c| CardVersion {
                card_id: c.card_id,
                version: c.version,
            })
            .collect();
        Some(batch)
    }
}

/// Group `cards` by stage and measure each group's drift.
///
/// Only cards with a `next_review_at` take part, and only groups with at
/// least two such cards are returned, ordered by stage.
pub fn plan_folder(cards: &[Card], tolerance: Duration) -> Vec<GroupPlan> {
    let mut by_stage: BTreeMap<u8, Vec<&Card>> = BTreeMap::new();
    for card in cards.iter().filter(|c| c.next_review_at.is_some()) {
        by_stage.entry(card.stage).or_default().push(card);
    }

    by_stage
        .into_iter()
        .filter(|(_, group)| group.len() >= 2)
        .map(|(stage, mut group)| {
            group.sort_by_key(|c| c.id);

            let next_review: Vec<(DbId, Timestamp)> = group
                .iter()
                .filter_map(|c| c.next_review_at.map(|t| (c.id, t)))
                .collect();
            let waiting: Vec<(DbId, Timestamp)> = group
                .iter()
                .filter_map(|c| c.waiting_until.map(|t| (c.id, t)))
                .collect();

            GroupPlan {
                stage,
                cards: group
                    .iter()
                    .map(|c| SyncCandidate {
                        card_id: c.id,
                        item_type: c.item_type,
                        item_id: c.item_id,
                        next_review_at: c.next_review_at,
                        waiting_until: c.waiting_until,
                        version: c.version,
                    })
                    .collect(),
                next_review: TimerDrift::measure(&next_review, tolerance),
                waiting: TimerDrift::measure(&waiting, tolerance),
            }
        })
        .collect()
}
