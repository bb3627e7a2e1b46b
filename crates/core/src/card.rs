//! SRS card review state machine.
//!
//! A card tracks one learner's progress on one study item. It climbs a fixed
//! ladder of review stages on correct answers, slides back on wrong answers,
//! and after enough full cycles at the top stage becomes mastered.
//!
//! The card has two macro-states: **active** (`is_mastered == false`, any
//! stage) and **mastered** (`is_mastered == true`, `next_review_at == None`).
//! Mastered is terminal for scheduling but the card stays queryable.

use std::fmt;
use std::str::FromStr;

use chrono::{Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Highest stage on the review ladder.
pub const MAX_STAGE: u8 = 5;

/// Review interval in days, indexed by stage.
pub const STAGE_INTERVALS_DAYS: [i64; 6] = [1, 3, 7, 21, 60, 180];

/// Consecutive wrong answers at which a miss drops two stages instead of one.
pub const WRONG_STREAK_THRESHOLD: u32 = 3;

/// Completed top-stage cycles needed before a card is mastered.
pub const MASTERY_REQUIRED_CYCLES: u32 = 3;

/// Check-in delay for a card that finished a cycle but is not yet mastered.
pub const MASTERY_CHECK_IN_MONTHS: u32 = 6;

/// How long past `next_review_at` a due card must sit before it is overdue.
pub const OVERDUE_AFTER_DAYS: i64 = 1;

/// Length of the overdue window reported through `overdue_deadline`.
pub const OVERDUE_WINDOW_DAYS: i64 = 1;

/// Interval until the next review for a card sitting at `stage`.
///
/// Stages above [`MAX_STAGE`] use the top interval.
pub fn stage_interval(stage: u8) -> Duration {
    let idx = usize::from(stage.min(MAX_STAGE));
    Duration::days(STAGE_INTERVALS_DAYS[idx])
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Kind of study item a card points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Vocab,
    Grammar,
    Idiom,
    Phrase,
}

impl ItemType {
    pub const ALL: [ItemType; 4] = [
        ItemType::Vocab,
        ItemType::Grammar,
        ItemType::Idiom,
        ItemType::Phrase,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ItemType::Vocab => "vocab",
            ItemType::Grammar => "grammar",
            ItemType::Idiom => "idiom",
            ItemType::Phrase => "phrase",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ItemType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                let valid: Vec<&str> = ItemType::ALL.iter().map(|t| t.as_str()).collect();
                CoreError::Validation(format!(
                    "Invalid item type '{s}'. Must be one of: {}",
                    valid.join(", ")
                ))
            })
    }
}

/// Result of a single review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewOutcome {
    Correct,
    Wrong,
}

impl ReviewOutcome {
    pub fn is_correct(self) -> bool {
        matches!(self, ReviewOutcome::Correct)
    }
}

/// Informational difficulty classification derived from answer history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// Display state of a card at a given instant.
///
/// Evaluated in declaration order: a frozen card that is also past due
/// reports `Frozen`. `WaitingCorrect` is the cooling window after a correct
/// answer; `WaitingWrong` is a card scheduled again after a miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CardStatus {
    Mastered,
    Frozen,
    Overdue,
    WaitingCorrect,
    WaitingWrong,
    New,
    Due,
    Scheduled,
}

// ---------------------------------------------------------------------------
// Card
// ---------------------------------------------------------------------------

/// Review state for one (user, item) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Card {
    pub id: DbId,
    pub user_id: DbId,
    pub item_type: ItemType,
    pub item_id: DbId,
    pub category_id: Option<DbId>,
    /// `None` means the card is global and never folder-synchronized.
    pub folder_id: Option<DbId>,

    pub stage: u8,
    pub correct_total: u32,
    pub wrong_total: u32,
    pub wrong_streak_count: u32,

    pub next_review_at: Option<Timestamp>,
    pub waiting_until: Option<Timestamp>,
    pub frozen_until: Option<Timestamp>,
    pub last_reviewed_at: Option<Timestamp>,

    pub is_overdue: bool,
    pub overdue_deadline: Option<Timestamp>,

    pub is_mastered: bool,
    pub master_cycles: u32,
    pub mastered_at: Option<Timestamp>,

    pub is_today_study: bool,
    pub today_first_result: Option<bool>,
    pub today_study_date: Option<NaiveDate>,

    pub is_from_wrong_answer: bool,

    /// Optimistic-concurrency token; bumped by storage on every write.
    pub version: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Card {
    /// A freshly enrolled card: stage 0, no timers, no history.
    pub fn new(
        id: DbId,
        user_id: DbId,
        item_type: ItemType,
        item_id: DbId,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            user_id,
            item_type,
            item_id,
            category_id: None,
            folder_id: None,
            stage: 0,
            correct_total: 0,
            wrong_total: 0,
            wrong_streak_count: 0,
            next_review_at: None,
            waiting_until: None,
            frozen_until: None,
            last_reviewed_at: None,
            is_overdue: false,
            overdue_deadline: None,
            is_mastered: false,
            master_cycles: 0,
            mastered_at: None,
            is_today_study: false,
            today_first_result: None,
            today_study_date: None,
            is_from_wrong_answer: false,
            version: 1,
            created_at,
            updated_at: created_at,
        }
    }

    /// Check the structural invariants that must hold after every mutation.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.stage > MAX_STAGE {
            return Err(CoreError::Validation(format!(
                "Card {} has stage {} outside 0..={MAX_STAGE}",
                self.id, self.stage
            )));
        }
        if self.is_mastered && self.next_review_at.is_some() {
            return Err(CoreError::Validation(format!(
                "Card {} is mastered but still has a next review time",
                self.id
            )));
        }
        if self.is_mastered && self.master_cycles < MASTERY_REQUIRED_CYCLES {
            return Err(CoreError::Validation(format!(
                "Card {} is mastered after only {} cycles",
                self.id, self.master_cycles
            )));
        }
        Ok(())
    }

    // -- Review transitions -----------------------------------------------

    /// Apply a review outcome at `now`.
    pub fn apply(&mut self, outcome: ReviewOutcome, now: Timestamp) {
        match outcome {
            ReviewOutcome::Correct => self.process_correct_answer(now),
            ReviewOutcome::Wrong => self.process_wrong_answer(now),
        }
    }

    /// Record a correct answer: climb one stage, or complete a mastery cycle
    /// when already at the top.
    pub fn process_correct_answer(&mut self, now: Timestamp) {
        self.correct_total += 1;
        self.wrong_streak_count = 0;
        self.is_from_wrong_answer = false;
        self.last_reviewed_at = Some(now);
        self.record_first_of_day(true, now);

        if self.stage < MAX_STAGE {
            self.stage += 1;
            self.schedule_next_review(now);
            self.waiting_until = self.next_review_at;
        } else {
            self.advance_to_mastery(now);
        }
    }

    /// Record a wrong answer and slide back down the ladder.
    ///
    /// The regression uses the streak *after* this miss is counted, so the
    /// third consecutive miss is already a double drop.
    pub fn process_wrong_answer(&mut self, now: Timestamp) {
        self.wrong_total += 1;
        self.wrong_streak_count += 1;
        self.is_from_wrong_answer = true;
        self.last_reviewed_at = Some(now);
        self.record_first_of_day(false, now);

        let drop = if self.wrong_streak_count >= WRONG_STREAK_THRESHOLD {
            2
        } else {
            1
        };
        self.stage = self.stage.saturating_sub(drop);
        self.waiting_until = None;
        self.schedule_next_review(now);
    }

    /// Set `next_review_at` from the interval of the current stage and clear
    /// the cached overdue flags.
    pub fn schedule_next_review(&mut self, now: Timestamp) {
        self.next_review_at = Some(now + stage_interval(self.stage));
        self.is_overdue = false;
        self.overdue_deadline = None;
    }

    /// Complete one top-stage cycle; the last required cycle masters the card.
    pub fn advance_to_mastery(&mut self, now: Timestamp) {
        self.master_cycles += 1;
        self.is_overdue = false;
        self.overdue_deadline = None;
        self.waiting_until = None;

        if self.master_cycles >= MASTERY_REQUIRED_CYCLES {
            self.is_mastered = true;
            self.mastered_at = Some(now);
            self.next_review_at = None;
        } else {
            let check_in = now
                .checked_add_months(Months::new(MASTERY_CHECK_IN_MONTHS))
                .unwrap_or_else(|| now + Duration::days(183));
            self.next_review_at = Some(check_in);
        }
    }

    fn record_first_of_day(&mut self, correct: bool, now: Timestamp) {
        let today = now.date_naive();
        if self.today_study_date != Some(today) {
            self.is_today_study = true;
            self.today_first_result = Some(correct);
            self.today_study_date = Some(today);
        }
    }

    // -- Queries ----------------------------------------------------------

    pub fn is_frozen(&self, now: Timestamp) -> bool {
        self.frozen_until.is_some_and(|t| t > now)
    }

    pub fn is_waiting(&self, now: Timestamp) -> bool {
        self.waiting_until.is_some_and(|t| t > now)
    }

    /// Whether the card belongs in a review session at `now`.
    ///
    /// A never-reviewed card (no `next_review_at`, not mastered) is due.
    pub fn is_due_for_review(&self, now: Timestamp) -> bool {
        if self.is_mastered || self.is_frozen(now) || self.is_waiting(now) {
            return false;
        }
        self.next_review_at.map_or(true, |t| t <= now)
    }

    /// Due, and at least [`OVERDUE_AFTER_DAYS`] past its review time.
    pub fn is_overdue_for_review(&self, now: Timestamp) -> bool {
        self.is_due_for_review(now)
            && self
                .next_review_at
                .is_some_and(|t| now - t >= Duration::days(OVERDUE_AFTER_DAYS))
    }

    /// Fraction of reviews answered correctly; `0.0` before the first review.
    pub fn success_rate(&self) -> f64 {
        let total = self.correct_total + self.wrong_total;
        if total == 0 {
            return 0.0;
        }
        f64::from(self.correct_total) / f64::from(total)
    }

    pub fn difficulty_assessment(&self) -> Difficulty {
        let rate = self.success_rate();
        if rate >= 0.8 && self.wrong_streak_count == 0 {
            Difficulty::Easy
        } else if rate >= 0.6 && self.wrong_streak_count <= 1 {
            Difficulty::Medium
        } else {
            Difficulty::Hard
        }
    }

    pub fn status(&self, now: Timestamp) -> CardStatus {
        if self.is_mastered {
            CardStatus::Mastered
        } else if self.is_frozen(now) {
            CardStatus::Frozen
        } else if self.is_overdue_for_review(now) {
            CardStatus::Overdue
        } else if self.is_waiting(now) {
            CardStatus::WaitingCorrect
        } else {
            match self.next_review_at {
                None => CardStatus::New,
                Some(t) if t <= now => CardStatus::Due,
                Some(_) if self.is_from_wrong_answer => CardStatus::WaitingWrong,
                Some(_) => CardStatus::Scheduled,
            }
        }
    }

    /// Recompute the cached overdue flags for `now`. Returns `true` if they
    /// changed.
    pub fn refresh_overdue(&mut self, now: Timestamp) -> bool {
        let overdue = self.is_overdue_for_review(now);
        let deadline = if overdue {
            self.next_review_at.map(|t| {
                t + Duration::days(OVERDUE_AFTER_DAYS) + Duration::days(OVERDUE_WINDOW_DAYS)
            })
        } else {
            None
        };
        let changed = overdue != self.is_overdue || deadline != self.overdue_deadline;
        self.is_overdue = overdue;
        self.overdue_deadline = deadline;
        changed
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
