pub mod cards;
pub mod folders;
pub mod health;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /cards/{id}                                      get
/// /cards/{id}/review                               submit review (POST)
/// /cards/{id}/freeze                               freeze (PUT), unfreeze (DELETE)
/// /cards/{id}/reset                                reset (POST)
///
/// /folders                                         create (POST)
/// /folders/{id}                                    get
/// /folders/{id}/children                           list subfolders
/// /folders/{id}/cards                              list, enroll (GET, POST)
/// /folders/{id}/sync/preview                       drift preview (GET)
/// /folders/{id}/sync                               synchronize (POST)
///
/// /users/{user_id}/due                             due queue (GET)
/// /users/{user_id}/overdue                         overdue cards (GET)
/// /users/{user_id}/sync                            sweep all subfolders (POST)
/// /users/{user_id}/sync-settings                   get, update (GET, PUT)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/cards", cards::router())
        .nest("/folders", folders::router())
        .nest("/users", users::router())
}
