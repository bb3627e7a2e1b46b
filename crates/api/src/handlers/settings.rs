//! Handlers for per-user auto-sync settings.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use wordloop_core::sync_settings::{validate_max_difference_minutes, AutoSyncSettings};
use wordloop_core::types::DbId;
use wordloop_db::models::sync_setting::UpdateSyncSettings;
use wordloop_db::repositories::SyncSettingRepo;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/users/{user_id}/sync-settings
///
/// Stored settings, or the defaults when the user has never saved any.
pub async fn get(
    State(state): State<AppState>,
    Path(user_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let settings = SyncSettingRepo::find(&state.pool, user_id)
        .await?
        .map(AutoSyncSettings::from)
        .unwrap_or_default();
    Ok(Json(DataResponse { data: settings }))
}

/// PUT /api/v1/users/{user_id}/sync-settings
///
/// Patch the settings; absent fields keep their current value.
pub async fn update(
    State(state): State<AppState>,
    Path(user_id): Path<DbId>,
    Json(body): Json<UpdateSyncSettings>,
) -> AppResult<impl IntoResponse> {
    if let Some(minutes) = body.max_difference_minutes {
        validate_max_difference_minutes(minutes)?;
    }
    let settings = AutoSyncSettings::from(SyncSettingRepo::upsert(&state.pool, user_id, &body).await?);

    tracing::info!(
        user_id,
        enabled = settings.enabled,
        max_difference_minutes = settings.max_difference_minutes,
        excluded = settings.excluded_folder_ids.len(),
        "Sync settings updated"
    );
    Ok(Json(DataResponse { data: settings }))
}
