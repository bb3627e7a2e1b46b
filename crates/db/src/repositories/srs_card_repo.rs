//! Repository for the `srs_cards` table.

use std::collections::BTreeSet;

use sqlx::PgPool;
use wordloop_core::card::{Card, OVERDUE_AFTER_DAYS, OVERDUE_WINDOW_DAYS};
use wordloop_core::due_queue::DueFilter;
use wordloop_core::store::TimerBatch;
use wordloop_core::types::{DbId, Timestamp};

use crate::models::srs_card::{CreateSrsCard, SrsCardRow};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "\
    id, user_id, item_type, item_id, category_id, folder_id, \
    stage, correct_total, wrong_total, wrong_streak_count, \
    next_review_at, waiting_until, frozen_until, last_reviewed_at, \
    is_overdue, overdue_deadline, is_mastered, master_cycles, mastered_at, \
    is_today_study, today_first_result, today_study_date, \
    is_from_wrong_answer, version, created_at, updated_at";

/// Due condition at `$2`, shared by the due query and the overdue refresh.
const DUE_AT_2: &str = "\
    NOT is_mastered \
    AND (frozen_until IS NULL OR frozen_until <= $2) \
    AND (waiting_until IS NULL OR waiting_until <= $2) \
    AND (next_review_at IS NULL OR next_review_at <= $2)";

fn counter(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// Provides persistence operations for review cards.
pub struct SrsCardRepo;

impl SrsCardRepo {
    /// Enroll an item for review. Enrolling an already enrolled item returns
    /// the existing card unchanged.
    pub async fn create(pool: &PgPool, input: &CreateSrsCard) -> Result<SrsCardRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO srs_cards \
                (user_id, item_type, item_id, category_id, folder_id, is_from_wrong_answer) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (user_id, item_type, item_id) DO NOTHING \
             RETURNING {COLUMNS}"
        );
        let inserted = sqlx::query_as::<_, SrsCardRow>(&query)
            .bind(input.user_id)
            .bind(input.item_type.as_str())
            .bind(input.item_id)
            .bind(input.category_id)
            .bind(input.folder_id)
            .bind(input.is_from_wrong_answer)
            .fetch_optional(pool)
            .await?;
        if let Some(row) = inserted {
            return Ok(row);
        }

        let query = format!(
            "SELECT {COLUMNS} FROM srs_cards \
             WHERE user_id = $1 AND item_type = $2 AND item_id = $3"
        );
        sqlx::query_as::<_, SrsCardRow>(&query)
            .bind(input.user_id)
            .bind(input.item_type.as_str())
            .bind(input.item_id)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<SrsCardRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM srs_cards WHERE id = $1");
        sqlx::query_as::<_, SrsCardRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Write every review field of `card` if the row is still at
    /// `card.version`, bumping the version.
    ///
    /// Returns `None` when the id is unknown or the version moved on.
    pub async fn update_checked(
        pool: &PgPool,
        card: &Card,
    ) -> Result<Option<SrsCardRow>, sqlx::Error> {
        let query = format!(
            "UPDATE srs_cards SET \
                stage = $3, correct_total = $4, wrong_total = $5, wrong_streak_count = $6, \
                next_review_at = $7, waiting_until = $8, frozen_until = $9, last_reviewed_at = $10, \
                is_overdue = $11, overdue_deadline = $12, \
                is_mastered = $13, master_cycles = $14, mastered_at = $15, \
                is_today_study = $16, today_first_result = $17, today_study_date = $18, \
                is_from_wrong_answer = $19, folder_id = $20, \
                version = version + 1, updated_at = $21 \
             WHERE id = $1 AND version = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SrsCardRow>(&query)
            .bind(card.id)
            .bind(card.version)
            .bind(i16::from(card.stage))
            .bind(counter(card.correct_total))
            .bind(counter(card.wrong_total))
            .bind(counter(card.wrong_streak_count))
            .bind(card.next_review_at)
            .bind(card.waiting_until)
            .bind(card.frozen_until)
            .bind(card.last_reviewed_at)
            .bind(card.is_overdue)
            .bind(card.overdue_deadline)
            .bind(card.is_mastered)
            .bind(counter(card.master_cycles))
            .bind(card.mastered_at)
            .bind(card.is_today_study)
            .bind(card.today_first_result)
            .bind(card.today_study_date)
            .bind(card.is_from_wrong_answer)
            .bind(card.folder_id)
            .bind(card.updated_at)
            .fetch_optional(pool)
            .await
    }

    /// Cards assigned to a folder, ordered by stage then id.
    pub async fn list_by_folder(
        pool: &PgPool,
        folder_id: DbId,
    ) -> Result<Vec<SrsCardRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM srs_cards WHERE folder_id = $1 ORDER BY stage, id"
        );
        sqlx::query_as::<_, SrsCardRow>(&query)
            .bind(folder_id)
            .fetch_all(pool)
            .await
    }

    /// Apply a timer batch in one transaction.
    ///
    /// The touched rows are first locked at the versions the batch was
    /// planned from, so a review committed after planning fails the batch and
    /// a review arriving later waits for it and then sees a new version. Each
    /// assignment then only touches cards still in the batch's folder and
    /// stage whose stored timer is not earlier than the target. If any check
    /// fails the transaction is rolled back and `None` is returned. Otherwise
    /// returns the number of distinct cards updated; each gets exactly one
    /// version bump.
    pub async fn apply_timer_batch(
        pool: &PgPool,
        batch: &TimerBatch,
    ) -> Result<Option<u64>, sqlx::Error> {
        if !batch.is_fully_versioned() {
            return Ok(None);
        }
        let (ids, versions): (Vec<DbId>, Vec<i32>) = batch
            .expected
            .iter()
            .map(|v| (v.card_id, v.version))
            .unzip();

        let mut tx = pool.begin().await?;
        let locked: Vec<DbId> = sqlx::query_scalar(
            "SELECT c.id FROM srs_cards c \
             JOIN UNNEST($1::BIGINT[], $2::INT[]) AS e(id, version) \
               ON c.id = e.id AND c.version = e.version \
             FOR UPDATE OF c",
        )
        .bind(&ids)
        .bind(&versions)
        .fetch_all(&mut *tx)
        .await?;

        if locked.len() != ids.len() {
            tracing::debug!(
                folder_id = batch.folder_id,
                stage = batch.stage,
                expected = ids.len(),
                matched = locked.len(),
                "Timer batch planned from stale versions, rolling back"
            );
            tx.rollback().await?;
            return Ok(None);
        }

        let mut touched = BTreeSet::new();

        let assignments = [
            (batch.next_review.as_ref(), "next_review_at"),
            (batch.waiting.as_ref(), "waiting_until"),
        ];
        for (assignment, column) in assignments {
            let Some(assignment) = assignment else {
                continue;
            };
            let query = format!(
                "UPDATE srs_cards SET {column} = $1, updated_at = NOW() \
                 WHERE id = ANY($2) AND folder_id = $3 AND stage = $4 AND {column} >= $1 \
                 RETURNING id"
            );
            let updated: Vec<DbId> = sqlx::query_scalar(&query)
                .bind(assignment.at)
                .bind(&assignment.card_ids)
                .bind(batch.folder_id)
                .bind(i16::from(batch.stage))
                .fetch_all(&mut *tx)
                .await?;

            if updated.len() != assignment.card_ids.len() {
                tracing::debug!(
                    folder_id = batch.folder_id,
                    stage = batch.stage,
                    column,
                    expected = assignment.card_ids.len(),
                    matched = updated.len(),
                    "Timer batch guard mismatch, rolling back"
                );
                tx.rollback().await?;
                return Ok(None);
            }
            touched.extend(updated);
        }

        let ids: Vec<DbId> = touched.into_iter().collect();
        sqlx::query("UPDATE srs_cards SET version = version + 1 WHERE id = ANY($1)")
            .bind(&ids)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(ids.len() as u64))
    }

    /// Due cards for a user at `as_of`, never-reviewed first, then by
    /// `next_review_at` and id. A `None` limit returns every match.
    pub async fn find_due(
        pool: &PgPool,
        user_id: DbId,
        as_of: Timestamp,
        filter: &DueFilter,
    ) -> Result<Vec<SrsCardRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM srs_cards \
             WHERE user_id = $1 AND {DUE_AT_2} \
               AND ($3::TEXT IS NULL OR item_type = $3) \
               AND ($4::BIGINT IS NULL OR folder_id = $4) \
               AND ($5::BIGINT IS NULL OR category_id = $5) \
             ORDER BY next_review_at ASC NULLS FIRST, id \
             LIMIT $6"
        );
        sqlx::query_as::<_, SrsCardRow>(&query)
            .bind(user_id)
            .bind(as_of)
            .bind(filter.item_type.map(|t| t.as_str()))
            .bind(filter.folder_id)
            .bind(filter.category_id)
            .bind(filter.limit)
            .fetch_all(pool)
            .await
    }

    /// Owners of at least one card that is not yet mastered.
    pub async fn list_active_user_ids(pool: &PgPool) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT DISTINCT user_id FROM srs_cards WHERE NOT is_mastered ORDER BY user_id",
        )
        .fetch_all(pool)
        .await
    }

    /// Recompute the cached overdue flags of a user's active cards at
    /// `as_of`, writing only rows whose flags change. The version is left
    /// alone; these columns are derived data.
    pub async fn refresh_overdue(
        pool: &PgPool,
        user_id: DbId,
        as_of: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let query = format!(
            "WITH computed AS ( \
                SELECT id, \
                       ({DUE_AT_2} AND next_review_at IS NOT NULL \
                        AND next_review_at <= $2 - make_interval(days => $3)) AS overdue, \
                       next_review_at \
                FROM srs_cards \
                WHERE user_id = $1 AND NOT is_mastered \
             ), flagged AS ( \
                SELECT id, overdue, \
                       CASE WHEN overdue \
                            THEN next_review_at + make_interval(days => $3 + $4) \
                       END AS deadline \
                FROM computed \
             ) \
             UPDATE srs_cards c \
             SET is_overdue = f.overdue, overdue_deadline = f.deadline \
             FROM flagged f \
             WHERE c.id = f.id \
               AND (c.is_overdue IS DISTINCT FROM f.overdue \
                    OR c.overdue_deadline IS DISTINCT FROM f.deadline)"
        );
        let result = sqlx::query(&query)
            .bind(user_id)
            .bind(as_of)
            .bind(OVERDUE_AFTER_DAYS as i32)
            .bind(OVERDUE_WINDOW_DAYS as i32)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Set or clear the freeze on a card. Returns `None` if it does not exist.
    pub async fn set_frozen_until(
        pool: &PgPool,
        id: DbId,
        frozen_until: Option<Timestamp>,
    ) -> Result<Option<SrsCardRow>, sqlx::Error> {
        let query = format!(
            "UPDATE srs_cards \
             SET frozen_until = $2, version = version + 1, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SrsCardRow>(&query)
            .bind(id)
            .bind(frozen_until)
            .fetch_optional(pool)
            .await
    }

    /// Return a card to its freshly enrolled state, keeping identity and
    /// folder placement.
    pub async fn reset(pool: &PgPool, id: DbId) -> Result<Option<SrsCardRow>, sqlx::Error> {
        let query = format!(
            "UPDATE srs_cards SET \
                stage = 0, correct_total = 0, wrong_total = 0, wrong_streak_count = 0, \
                next_review_at = NULL, waiting_until = NULL, frozen_until = NULL, \
                last_reviewed_at = NULL, is_overdue = FALSE, overdue_deadline = NULL, \
                is_mastered = FALSE, master_cycles = 0, mastered_at = NULL, \
                is_today_study = FALSE, today_first_result = NULL, today_study_date = NULL, \
                is_from_wrong_answer = FALSE, \
                version = version + 1, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SrsCardRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
