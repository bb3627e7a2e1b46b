//! Integration tests for the services running on [`PgCardStore`].
//!
//! - Folder sync collapses a drifted group and is idempotent
//! - A stale timer batch is rolled back as a whole
//! - A review committed after planning makes the batch fail
//! - Both timer dimensions sync in one group with one version bump per card
//! - Reviews persist through the versioned write path

use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{DateTime, Duration, TimeZone, Utc};
use sqlx::PgPool;
use wordloop_core::card::{Card, ItemType, ReviewOutcome};
use wordloop_core::review::{AutoSyncOutcome, ReviewRequest, ReviewScheduler};
use wordloop_core::store::{CardStore, CardVersion, StoreError, TimerAssignment, TimerBatch};
use wordloop_core::sync_plan::plan_folder;
use wordloop_core::timer_sync::TimerSynchronizer;
use wordloop_db::models::srs_card::CreateSrsCard;
use wordloop_db::models::srs_folder::CreateSrsFolder;
use wordloop_db::repositories::{SrsCardRepo, SrsFolderRepo};
use wordloop_db::PgCardStore;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
}

/// Create a root folder with one subfolder; returns the subfolder id.
async fn subfolder(pool: &PgPool) -> i64 {
    let root = SrsFolderRepo::create(
        pool,
        &CreateSrsFolder {
            user_id: 1,
            name: "Day 1".into(),
            parent_id: None,
            scheduled_offset: None,
        },
    )
    .await
    .unwrap();
    SrsFolderRepo::create(
        pool,
        &CreateSrsFolder {
            user_id: 1,
            name: "Morning".into(),
            parent_id: Some(root.id),
            scheduled_offset: Some(0),
        },
    )
    .await
    .unwrap()
    .id
}

async fn card_in_folder(
    store: &PgCardStore,
    folder_id: i64,
    item_id: i64,
    stage: u8,
    offset_min: i64,
) -> Card {
    let row = SrsCardRepo::create(
        store.pool(),
        &CreateSrsCard {
            user_id: 1,
            item_type: ItemType::Vocab,
            item_id,
            category_id: None,
            folder_id: Some(folder_id),
            is_from_wrong_answer: false,
        },
    )
    .await
    .unwrap();
    let mut card = Card::try_from(row).unwrap();
    card.stage = stage;
    card.next_review_at = Some(now() + Duration::minutes(offset_min));
    store.update_card(&card).await.unwrap()
}

fn synchronizer(store: &Arc<PgCardStore>) -> TimerSynchronizer<PgCardStore> {
    TimerSynchronizer::new(Arc::clone(store), Duration::minutes(60))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn folder_sync_collapses_drift_once(pool: PgPool) {
    let store = Arc::new(PgCardStore::new(pool.clone()));
    let folder_id = subfolder(&pool).await;
    let mut ids = Vec::new();
    for (item, offset) in [(1, 7), (2, 0), (3, 12), (4, 3), (5, 9)] {
        ids.push(card_in_folder(&store, folder_id, item, 2, offset).await.id);
    }

    let sync = synchronizer(&store);
    let preview = sync.preview(folder_id).await.unwrap();
    assert_eq!(preview.total_syncable_cards, 5);

    let report = sync.execute(folder_id).await.unwrap();
    assert_eq!(report.synced_groups, 1);
    assert_eq!(report.total_synced_cards, 5);

    for id in &ids {
        let card = store.find_card(*id).await.unwrap().unwrap();
        assert_eq!(card.next_review_at, Some(now()));
        assert_eq!(card.stage, 2);
    }

    let again = sync.execute(folder_id).await.unwrap();
    assert_eq!(again.synced_groups, 0);
    assert_eq!(again.total_synced_cards, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn stale_batch_rolls_back_entirely(pool: PgPool) {
    let store = PgCardStore::new(pool.clone());
    let folder_id = subfolder(&pool).await;
    let a = card_in_folder(&store, folder_id, 1, 3, 0).await;
    let b = card_in_folder(&store, folder_id, 2, 3, 20).await;

    // `b` is reviewed between planning and writing and leaves stage 3.
    let mut moved = b.clone();
    moved.stage = 4;
    store.update_card(&moved).await.unwrap();

    let batch = TimerBatch {
        folder_id,
        stage: 3,
        expected: vec![
            CardVersion {
                card_id: a.id,
                version: a.version,
            },
            CardVersion {
                card_id: b.id,
                version: b.version,
            },
        ],
        next_review: Some(TimerAssignment {
            card_ids: vec![a.id, b.id],
            at: now(),
        }),
        waiting: None,
    };
    let err = store.batch_update_timers(&batch).await.unwrap_err();
    assert_matches!(err, StoreError::GuardFailed { stage: 3, .. });

    // Nothing was written, not even to the card that still matched.
    let a_after = store.find_card(a.id).await.unwrap().unwrap();
    assert_eq!(a_after.version, a.version);
    let b_after = store.find_card(b.id).await.unwrap().unwrap();
    assert_eq!(b_after.next_review_at, b.next_review_at);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn review_after_planning_fails_the_batch(pool: PgPool) {
    let store = PgCardStore::new(pool.clone());
    let folder_id = subfolder(&pool).await;
    card_in_folder(&store, folder_id, 1, 0, 0).await;
    let b = card_in_folder(&store, folder_id, 2, 0, 10).await;

    let cards = store.list_folder_cards(folder_id).await.unwrap();
    let batch = plan_folder(&cards, Duration::minutes(60))[0]
        .to_batch(folder_id)
        .unwrap();

    // A miss at stage 0 stays at stage 0 with a later timer.
    let mut reviewed = b.clone();
    reviewed.apply(ReviewOutcome::Wrong, now() + Duration::hours(2));
    let reviewed = store.update_card(&reviewed).await.unwrap();
    assert_eq!(reviewed.stage, 0);

    let err = store.batch_update_timers(&batch).await.unwrap_err();
    assert_matches!(err, StoreError::GuardFailed { stage: 0, .. });

    let stored = store.find_card(b.id).await.unwrap().unwrap();
    assert_eq!(stored.next_review_at, reviewed.next_review_at);
    assert_eq!(stored.version, reviewed.version);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn both_timer_dimensions_sync_with_one_bump_per_card(pool: PgPool) {
    let store = Arc::new(PgCardStore::new(pool.clone()));
    let folder_id = subfolder(&pool).await;

    let mut cards = Vec::new();
    for (item, next, waiting) in [(1, 0, Some(5)), (2, 7, Some(12)), (3, 3, None)] {
        let mut card = card_in_folder(&store, folder_id, item, 2, next).await;
        card.waiting_until = waiting.map(|m| now() + Duration::minutes(m));
        cards.push(store.update_card(&card).await.unwrap());
    }

    let report = synchronizer(&store).execute(folder_id).await.unwrap();
    assert_eq!(report.synced_groups, 1);
    assert_eq!(report.total_synced_cards, 3);

    for before in &cards {
        let after = store.find_card(before.id).await.unwrap().unwrap();
        assert_eq!(after.version, before.version + 1);
        assert_eq!(after.next_review_at, Some(now()));
        let expected_waiting = before
            .waiting_until
            .map(|_| now() + Duration::minutes(5));
        assert_eq!(after.waiting_until, expected_waiting);
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn review_round_trip_with_auto_sync(pool: PgPool) {
    let store = Arc::new(PgCardStore::new(pool.clone()));
    let folder_id = subfolder(&pool).await;
    let sibling = card_in_folder(&store, folder_id, 1, 3, 0).await;
    let mut target = card_in_folder(&store, folder_id, 2, 2, 0).await;

    // Sibling reached stage 3 a few minutes before this review.
    let mut early = sibling.clone();
    early.next_review_at = Some(now() + Duration::days(21) - Duration::minutes(4));
    store.update_card(&early).await.unwrap();
    target.next_review_at = Some(now() - Duration::hours(1));
    store.update_card(&target).await.unwrap();

    let scheduler = ReviewScheduler::new(Arc::clone(&store), synchronizer(&store));
    let result = scheduler
        .submit_review(&ReviewRequest {
            card_id: target.id,
            user_id: 1,
            outcome: ReviewOutcome::Correct,
            now: now(),
        })
        .await
        .unwrap();

    assert_eq!(result.card.stage, 3);
    assert_eq!(result.statistics.stage_change, 1);
    let report = assert_matches!(result.auto_sync, AutoSyncOutcome::Completed(r) => r);
    assert_eq!(report.synced_groups, 1);

    let stored = store.find_card(target.id).await.unwrap().unwrap();
    assert_eq!(
        stored.next_review_at,
        Some(now() + Duration::days(21) - Duration::minutes(4))
    );
}
