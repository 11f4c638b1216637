pub mod health;
pub mod ping;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /ping                                  ping (POST, authenticated)
///
/// /users/me                              caller's aggregate (GET)
/// /users/me/achievements                 caller's achievements (GET)
/// /users/me/progress?course_id=          lessonId -> done map (GET)
/// /users/me/progress/{doc_id}            read (GET), client write (PUT)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(ping::router())
        .nest("/users/me", users::router())
}
