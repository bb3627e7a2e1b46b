//! Handlers for folder timer synchronization.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use tokio_util::sync::CancellationToken;
use wordloop_core::types::DbId;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/folders/{id}/sync/preview
///
/// Per-stage drift report for a subfolder. Never writes.
pub async fn preview(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let preview = state.synchronizer.preview(id).await?;
    Ok(Json(DataResponse { data: preview }))
}

/// POST /api/v1/folders/{id}/sync
///
/// Pull each stage group of a subfolder onto its earliest timer, using the
/// server's configured tolerance.
pub async fn execute(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let report = state.synchronizer.execute(id).await?;
    Ok(Json(DataResponse { data: report }))
}

/// POST /api/v1/users/{user_id}/sync
///
/// Synchronize every subfolder the user owns, honouring their settings.
pub async fn sweep_user(
    State(state): State<AppState>,
    Path(user_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let report = state
        .synchronizer
        .synchronize_user(user_id, &CancellationToken::new())
        .await?;
    tracing::info!(
        user_id,
        folders = report.folders_processed,
        total_synced_cards = report.total_synced_cards,
        "User sync sweep finished"
    );
    Ok(Json(DataResponse { data: report }))
}
