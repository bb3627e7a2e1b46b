//! Handlers for the `/cards` resource.
//!
//! Review submission plus the administrative freeze and reset operations.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use wordloop_core::card::{Card, CardStatus, ReviewOutcome};
use wordloop_core::error::CoreError;
use wordloop_core::review::ReviewRequest;
use wordloop_core::types::{DbId, Timestamp};
use wordloop_db::models::srs_card::SrsCardRow;
use wordloop_db::repositories::SrsCardRepo;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// A card together with its display status at the time of the request.
#[derive(Debug, Serialize)]
pub struct CardView {
    #[serde(flatten)]
    pub card: Card,
    pub status: CardStatus,
}

impl CardView {
    pub fn at(card: Card, now: Timestamp) -> Self {
        let status = card.status(now);
        Self { card, status }
    }
}

/// Convert a stored row, reporting invalid rows as domain errors.
pub(crate) fn to_card(row: SrsCardRow) -> AppResult<Card> {
    Ok(Card::try_from(row).map_err(CoreError::from)?)
}

fn card_not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound { entity: "Card", id })
}

/// Request body for `POST /cards/{id}/review`.
#[derive(Debug, Deserialize)]
pub struct ReviewBody {
    pub user_id: DbId,
    pub outcome: ReviewOutcome,
    /// Review instant; defaults to the server clock.
    pub now: Option<Timestamp>,
}

/// Request body for `PUT /cards/{id}/freeze`.
#[derive(Debug, Deserialize)]
pub struct FreezeBody {
    pub until: Timestamp,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/cards/{id}/review
///
/// Record a correct or wrong answer. Returns the updated card, before/after
/// statistics, and the outcome of the automatic folder sync.
pub async fn submit_review(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(body): Json<ReviewBody>,
) -> AppResult<impl IntoResponse> {
    let request = ReviewRequest {
        card_id: id,
        user_id: body.user_id,
        outcome: body.outcome,
        now: body.now.unwrap_or_else(Utc::now),
    };
    let result = state.reviews.submit_review(&request).await?;
    Ok(Json(DataResponse { data: result }))
}

/// GET /api/v1/cards/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let row = SrsCardRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| card_not_found(id))?;
    let view = CardView::at(to_card(row)?, Utc::now());
    Ok(Json(DataResponse { data: view }))
}

/// PUT /api/v1/cards/{id}/freeze
///
/// Exclude a card from review until `until`, which must be in the future.
pub async fn freeze(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(body): Json<FreezeBody>,
) -> AppResult<impl IntoResponse> {
    let now = Utc::now();
    if body.until <= now {
        return Err(AppError::Core(CoreError::Validation(
            "Freeze end must be in the future".into(),
        )));
    }
    let row = SrsCardRepo::set_frozen_until(&state.pool, id, Some(body.until))
        .await?
        .ok_or_else(|| card_not_found(id))?;

    tracing::info!(card_id = id, until = %body.until, "Card frozen");
    Ok(Json(DataResponse {
        data: CardView::at(to_card(row)?, now),
    }))
}

/// DELETE /api/v1/cards/{id}/freeze
pub async fn unfreeze(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let row = SrsCardRepo::set_frozen_until(&state.pool, id, None)
        .await?
        .ok_or_else(|| card_not_found(id))?;

    tracing::info!(card_id = id, "Card unfrozen");
    Ok(Json(DataResponse {
        data: CardView::at(to_card(row)?, Utc::now()),
    }))
}

/// POST /api/v1/cards/{id}/reset
///
/// Return a card to its freshly enrolled state.
pub async fn reset(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let row = SrsCardRepo::reset(&state.pool, id)
        .await?
        .ok_or_else(|| card_not_found(id))?;

    tracing::info!(card_id = id, "Card reset");
    Ok(Json(DataResponse {
        data: CardView::at(to_card(row)?, Utc::now()),
    }))
}
