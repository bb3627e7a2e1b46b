//! Handlers for a user's review queue.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use wordloop_core::due_queue::DueFilter;
use wordloop_core::types::DbId;

use crate::error::AppResult;
use crate::handlers::cards::CardView;
use crate::query::{AsOfParams, DueQueueParams};
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/users/{user_id}/due?as_of=&item_type=&folder_id=&category_id=&limit=
///
/// Cards due for review, never-reviewed first, then earliest due.
pub async fn list_due(
    State(state): State<AppState>,
    Path(user_id): Path<DbId>,
    Query(params): Query<DueQueueParams>,
) -> AppResult<impl IntoResponse> {
    let as_of = params.as_of.unwrap_or_else(Utc::now);
    let cards = state
        .due_queue
        .find_due(user_id, as_of, &params.filter())
        .await?;
    let data: Vec<CardView> = cards.into_iter().map(|c| CardView::at(c, as_of)).collect();
    Ok(Json(DataResponse { data }))
}

/// GET /api/v1/users/{user_id}/overdue?as_of=
pub async fn list_overdue(
    State(state): State<AppState>,
    Path(user_id): Path<DbId>,
    Query(params): Query<AsOfParams>,
) -> AppResult<impl IntoResponse> {
    let as_of = params.as_of.unwrap_or_else(Utc::now);
    let cards = state
        .due_queue
        .find_overdue(user_id, as_of, &DueFilter::default())
        .await?;
    let data: Vec<CardView> = cards.into_iter().map(|c| CardView::at(c, as_of)).collect();
    Ok(Json(DataResponse { data }))
}
