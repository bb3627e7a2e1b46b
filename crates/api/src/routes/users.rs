//! Route definitions for user-scoped queues and settings.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{due, settings, sync};
use crate::state::AppState;

/// Routes mounted at `/users`.
///
/// ```text
/// GET    /{user_id}/due             -> due::list_due
/// GET    /{user_id}/overdue         -> due::list_overdue
/// POST   /{user_id}/sync            -> sync::sweep_user
/// GET    /{user_id}/sync-settings   -> settings::get
/// PUT    /{user_id}/sync-settings   -> settings::update
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{user_id}/due", get(due::list_due))
        .route("/{user_id}/overdue", get(due::list_overdue))
        .route("/{user_id}/sync", post(sync::sweep_user))
        .route(
            "/{user_id}/sync-settings",
            get(settings::get).put(settings::update),
        )
}
