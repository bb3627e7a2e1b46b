//! Route definitions for study folders and their synchronization.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{folders, sync};
use crate::state::AppState;

/// Routes mounted at `/folders`.
///
/// ```text
/// POST   /                    -> create
/// GET    /{id}                -> get_by_id
/// GET    /{id}/children       -> list_children
/// GET    /{id}/cards          -> list_cards
/// POST   /{id}/cards          -> enroll_card
/// GET    /{id}/sync/preview   -> sync::preview
/// POST   /{id}/sync           -> sync::execute
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(folders::create))
        .route("/{id}", get(folders::get_by_id))
        .route("/{id}/children", get(folders::list_children))
        .route(
            "/{id}/cards",
            get(folders::list_cards).post(folders::enroll_card),
        )
        .route("/{id}/sync/preview", get(sync::preview))
        .route("/{id}/sync", post(sync::execute))
}
