//! Handlers for the `/folders` resource.
//!
//! Day roots, their study subfolders, and enrollment of items into a folder.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use wordloop_core::card::ItemType;
use wordloop_core::error::CoreError;
use wordloop_core::folder::{validate_folder_name, validate_parent, Folder};
use wordloop_core::types::DbId;
use wordloop_db::models::srs_card::CreateSrsCard;
use wordloop_db::models::srs_folder::{CreateSrsFolder, SrsFolderRow};
use wordloop_db::repositories::{SrsCardRepo, SrsFolderRepo};
use wordloop_db::DbPool;

use crate::error::{AppError, AppResult};
use crate::handlers::cards::{to_card, CardView};
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /folders/{id}/cards`. The card belongs to the
/// folder's owner.
#[derive(Debug, Deserialize)]
pub struct EnrollBody {
    pub item_type: ItemType,
    pub item_id: DbId,
    pub category_id: Option<DbId>,
    /// Set when the item comes from the learner's wrong-answer notes.
    #[serde(default)]
    pub is_from_wrong_answer: bool,
}

/// Load a folder or fail with 404.
async fn ensure_folder_exists(pool: &DbPool, id: DbId) -> AppResult<SrsFolderRow> {
    SrsFolderRepo::find_by_id(pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Folder",
            id,
        }))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/folders
///
/// Create a day root (`parent_id` absent) or a study subfolder under one of
/// the user's roots.
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<CreateSrsFolder>,
) -> AppResult<impl IntoResponse> {
    validate_folder_name(&input.name)?;
    if let Some(parent_id) = input.parent_id {
        let parent = Folder::from(ensure_folder_exists(&state.pool, parent_id).await?);
        validate_parent(&parent, input.user_id)?;
    }

    let folder = SrsFolderRepo::create(&state.pool, &input).await?;
    tracing::info!(
        folder_id = folder.id,
        user_id = folder.user_id,
        parent_id = ?folder.parent_id,
        "Folder created"
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: folder })))
}

/// GET /api/v1/folders/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let folder = ensure_folder_exists(&state.pool, id).await?;
    Ok(Json(DataResponse { data: folder }))
}

/// GET /api/v1/folders/{id}/children
///
/// Subfolders of a root, ordered by `scheduled_offset`.
pub async fn list_children(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    ensure_folder_exists(&state.pool, id).await?;
    let children = SrsFolderRepo::list_children(&state.pool, id).await?;
    Ok(Json(DataResponse { data: children }))
}

/// POST /api/v1/folders/{id}/cards
///
/// Enroll an item into the folder. Enrolling an item the user already has a
/// card for returns that card unchanged.
pub async fn enroll_card(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(body): Json<EnrollBody>,
) -> AppResult<impl IntoResponse> {
    let folder = ensure_folder_exists(&state.pool, id).await?;
    if body.item_id <= 0 {
        return Err(AppError::Core(CoreError::Validation(
            "item_id must be positive".into(),
        )));
    }

    let input = CreateSrsCard {
        user_id: folder.user_id,
        item_type: body.item_type,
        item_id: body.item_id,
        category_id: body.category_id,
        folder_id: Some(folder.id),
        is_from_wrong_answer: body.is_from_wrong_answer,
    };
    let card = to_card(SrsCardRepo::create(&state.pool, &input).await?)?;

    tracing::info!(
        card_id = card.id,
        folder_id = folder.id,
        item_type = %card.item_type,
        item_id = card.item_id,
        "Item enrolled"
    );
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: CardView::at(card, Utc::now()),
        }),
    ))
}

/// GET /api/v1/folders/{id}/cards
///
/// Cards assigned to the folder, ordered by stage then id.
pub async fn list_cards(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    ensure_folder_exists(&state.pool, id).await?;
    let now = Utc::now();
    let cards = SrsCardRepo::list_by_folder(&state.pool, id)
        .await?
        .into_iter()
        .map(|row| to_card(row).map(|card| CardView::at(card, now)))
        .collect::<AppResult<Vec<_>>>()?;
    Ok(Json(DataResponse { data: cards }))
}
