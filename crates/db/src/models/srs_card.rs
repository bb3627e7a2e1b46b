//! Review card rows (`srs_cards`).
//!
//! Counters are stored as `INTEGER` and the stage as `SMALLINT`; converting a
//! row into a [`Card`] checks the ranges and the card invariants, so corrupt
//! rows surface as [`StoreError::Corrupt`] instead of panics.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use wordloop_core::card::{Card, ItemType};
use wordloop_core::store::StoreError;
use wordloop_core::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A row from the `srs_cards` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SrsCardRow {
    pub id: DbId,
    pub user_id: DbId,
    pub item_type: String,
    pub item_id: DbId,
    pub category_id: Option<DbId>,
    pub folder_id: Option<DbId>,
    pub stage: i16,
    pub correct_total: i32,
    pub wrong_total: i32,
    pub wrong_streak_count: i32,
    pub next_review_at: Option<Timestamp>,
    pub waiting_until: Option<Timestamp>,
    pub frozen_until: Option<Timestamp>,
    pub last_reviewed_at: Option<Timestamp>,
    pub is_overdue: bool,
    pub overdue_deadline: Option<Timestamp>,
    pub is_mastered: bool,
    pub master_cycles: i32,
    pub mastered_at: Option<Timestamp>,
    pub is_today_study: bool,
    pub today_first_result: Option<bool>,
    pub today_study_date: Option<NaiveDate>,
    pub is_from_wrong_answer: bool,
    pub version: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

fn counter(row_id: DbId, field: &str, value: i32) -> Result<u32, StoreError> {
    u32::try_from(value)
        .map_err(|_| StoreError::Corrupt(format!("Card {row_id} has negative {field} ({value})")))
}

impl TryFrom<SrsCardRow> for Card {
    type Error = StoreError;

    fn try_from(row: SrsCardRow) -> Result<Self, Self::Error> {
        let item_type: ItemType = row
            .item_type
            .parse()
            .map_err(|e: wordloop_core::error::CoreError| StoreError::Corrupt(e.to_string()))?;
        let stage = u8::try_from(row.stage)
            .map_err(|_| StoreError::Corrupt(format!("Card {} has stage {}", row.id, row.stage)))?;

        let card = Card {
            id: row.id,
            user_id: row.user_id,
            item_type,
            item_id: row.item_id,
            category_id: row.category_id,
            folder_id: row.folder_id,
            stage,
            correct_total: counter(row.id, "correct_total", row.correct_total)?,
            wrong_total: counter(row.id, "wrong_total", row.wrong_total)?,
            wrong_streak_count: counter(row.id, "wrong_streak_count", row.wrong_streak_count)?,
            next_review_at: row.next_review_at,
            waiting_until: row.waiting_until,
            frozen_until: row.frozen_until,
            last_reviewed_at: row.last_reviewed_at,
            is_overdue: row.is_overdue,
            overdue_deadline: row.overdue_deadline,
            is_mastered: row.is_mastered,
            master_cycles: counter(row.id, "master_cycles", row.master_cycles)?,
            mastered_at: row.mastered_at,
            is_today_study: row.is_today_study,
            today_first_result: row.today_first_result,
            today_study_date: row.today_study_date,
            is_from_wrong_answer: row.is_from_wrong_answer,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        };
        card.validate()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        Ok(card)
    }
}

// ---------------------------------------------------------------------------
// Create DTO
// ---------------------------------------------------------------------------

/// DTO for enrolling an item for review.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSrsCard {
    pub user_id: DbId,
    pub item_type: ItemType,
    pub item_id: DbId,
    pub category_id: Option<DbId>,
    pub folder_id: Option<DbId>,
    /// Enrolled from a wrong-answer note rather than a study session.
    #[serde(default)]
    pub is_from_wrong_answer: bool,
}
