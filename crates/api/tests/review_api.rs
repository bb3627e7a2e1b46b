//! Integration tests for review submission and card administration.

mod common;

use axum::http::StatusCode;
use common::{body_json, create_folder, delete, enroll, get, post, post_json, put_json};
use serde_json::json;
use sqlx::PgPool;
use wordloop_core::card::Card;
use wordloop_db::repositories::SrsCardRepo;

const NOW: &str = "2025-03-01T09:00:00Z";

#[sqlx::test(migrations = "../../db/migrations")]
async fn review_advances_new_card(pool: PgPool) {
    let app = common::build_test_app(pool);
    let root = create_folder(app.clone(), 1, "Day 1", None).await;
    let card_id = enroll(app.clone(), root, 10).await;

    let response = post_json(
        app.clone(),
        &format!("/api/v1/cards/{card_id}/review"),
        json!({ "user_id": 1, "outcome": "correct", "now": NOW }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let data = &json["data"];
    assert_eq!(data["card"]["stage"], 1);
    assert_eq!(data["card"]["correct_total"], 1);
    assert_eq!(data["card"]["next_review_at"], "2025-03-04T09:00:00Z");
    assert_eq!(data["card"]["waiting_until"], "2025-03-04T09:00:00Z");
    assert_eq!(data["statistics"]["previous_stage"], 0);
    assert_eq!(data["statistics"]["stage_change"], 1);
    // Root folders are not sync scopes.
    assert_eq!(data["auto_sync"]["status"], "not_applicable");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn review_rejects_other_users_and_unknown_cards(pool: PgPool) {
    let app = common::build_test_app(pool);
    let root = create_folder(app.clone(), 1, "Day 1", None).await;
    let card_id = enroll(app.clone(), root, 10).await;

    let response = post_json(
        app.clone(),
        &format!("/api/v1/cards/{card_id}/review"),
        json!({ "user_id": 2, "outcome": "wrong" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["code"], "FORBIDDEN");

    let response = post_json(
        app.clone(),
        "/api/v1/cards/99999/review",
        json!({ "user_id": 1, "outcome": "wrong" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = post_json(
        app,
        &format!("/api/v1/cards/{card_id}/review"),
        json!({ "user_id": 1, "outcome": "maybe" }),
    )
    .await;
    assert!(response.status().is_client_error());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn mastered_card_cannot_be_reviewed(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let root = create_folder(app.clone(), 1, "Day 1", None).await;
    let card_id = enroll(app.clone(), root, 10).await;

    let row = SrsCardRepo::find_by_id(&pool, card_id).await.unwrap().unwrap();
    let mut card = Card::try_from(row).unwrap();
    card.stage = 5;
    card.master_cycles = 3;
    card.is_mastered = true;
    SrsCardRepo::update_checked(&pool, &card).await.unwrap().unwrap();

    let response = post_json(
        app,
        &format!("/api/v1/cards/{card_id}/review"),
        json!({ "user_id": 1, "outcome": "correct", "now": NOW }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(json["code"], "CONFLICT");
    assert!(json.get("retryable").is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn freeze_unfreeze_and_reset(pool: PgPool) {
    let app = common::build_test_app(pool);
    let root = create_folder(app.clone(), 1, "Day 1", None).await;
    let card_id = enroll(app.clone(), root, 10).await;

    let response = put_json(
        app.clone(),
        &format!("/api/v1/cards/{card_id}/freeze"),
        json!({ "until": "2100-01-01T00:00:00Z" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["status"], "frozen");

    // Frozen cards refuse reviews.
    let response = post_json(
        app.clone(),
        &format!("/api/v1/cards/{card_id}/review"),
        json!({ "user_id": 1, "outcome": "correct" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = delete(app.clone(), &format!("/api/v1/cards/{card_id}/freeze")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["status"], "new");

    let response = put_json(
        app.clone(),
        &format!("/api/v1/cards/{card_id}/freeze"),
        json!({ "until": "2000-01-01T00:00:00Z" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    post_json(
        app.clone(),
        &format!("/api/v1/cards/{card_id}/review"),
        json!({ "user_id": 1, "outcome": "correct", "now": NOW }),
    )
    .await;
    let response = post(app.clone(), &format!("/api/v1/cards/{card_id}/reset")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["stage"], 0);
    assert_eq!(json["data"]["correct_total"], 0);
    assert!(json["data"]["next_review_at"].is_null());

    let response = get(app, "/api/v1/cards/99999").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn wrong_answer_flag_follows_reviews(pool: PgPool) {
    let app = common::build_test_app(pool);
    let root = create_folder(app.clone(), 1, "Day 1", None).await;
    let card_id = enroll(app.clone(), root, 10).await;

    let response = post_json(
        app.clone(),
        &format!("/api/v1/cards/{card_id}/review"),
        json!({ "user_id": 1, "outcome": "wrong" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["data"]["card"]["is_from_wrong_answer"],
        true
    );

    let response = get(app.clone(), &format!("/api/v1/cards/{card_id}")).await;
    assert_eq!(body_json(response).await["data"]["status"], "waiting_wrong");

    let response = post_json(
        app.clone(),
        &format!("/api/v1/cards/{card_id}/review"),
        json!({ "user_id": 1, "outcome": "correct" }),
    )
    .await;
    assert_eq!(
        body_json(response).await["data"]["card"]["is_from_wrong_answer"],
        false
    );

    let response = get(app, &format!("/api/v1/cards/{card_id}")).await;
    assert_eq!(body_json(response).await["data"]["status"], "waiting_correct");
}
