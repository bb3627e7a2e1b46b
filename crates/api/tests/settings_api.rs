//! Integration tests for per-user sync settings.

mod common;

use axum::http::StatusCode;
use common::{body_json, get, put_json};
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "../../db/migrations")]
async fn settings_default_then_patch(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = get(app.clone(), "/api/v1/users/7/sync-settings").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["enabled"], true);
    assert_eq!(json["data"]["max_difference_minutes"], 60);
    assert_eq!(json["data"]["excluded_folder_ids"], json!([]));

    let response = put_json(
        app.clone(),
        "/api/v1/users/7/sync-settings",
        json!({ "enabled": false }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["enabled"], false);
    assert_eq!(json["data"]["max_difference_minutes"], 60);

    let response = put_json(
        app.clone(),
        "/api/v1/users/7/sync-settings",
        json!({ "max_difference_minutes": 15, "excluded_folder_ids": [3, 4] }),
    )
    .await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["enabled"], false);
    assert_eq!(json["data"]["max_difference_minutes"], 15);
    assert_eq!(json["data"]["excluded_folder_ids"], json!([3, 4]));

    let response = get(app, "/api/v1/users/7/sync-settings").await;
    assert_eq!(body_json(response).await["data"]["max_difference_minutes"], 15);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn settings_reject_out_of_range_tolerance(pool: PgPool) {
    let app = common::build_test_app(pool);

    for minutes in [0, 1441] {
        let response = put_json(
            app.clone(),
            "/api/v1/users/7/sync-settings",
            json!({ "max_difference_minutes": minutes }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
    }
}
