//! Route definitions for review cards.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::cards;
use crate::state::AppState;

/// Routes mounted at `/cards`.
///
/// ```text
/// GET    /{id}            -> get_by_id
/// POST   /{id}/review     -> submit_review
/// PUT    /{id}/freeze     -> freeze
/// DELETE /{id}/freeze     -> unfreeze
/// POST   /{id}/reset      -> reset
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(cards::get_by_id))
        .route("/{id}/review", post(cards::submit_review))
        .route("/{id}/freeze", put(cards::freeze).delete(cards::unfreeze))
        .route("/{id}/reset", post(cards::reset))
}
