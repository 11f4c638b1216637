use axum::routing::get;
use axum::Router;

use crate::handlers::{progress, users};
use crate::state::AppState;

/// Routes mounted at `/users/me`.
///
/// ```text
/// GET  /                      -> get_me
/// GET  /achievements          -> list_achievements
/// GET  /progress              -> course_progress
/// GET  /progress/{doc_id}     -> get_progress
/// PUT  /progress/{doc_id}     -> put_progress
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(users::get_me))
        .route("/achievements", get(users::list_achievements))
        .route("/progress", get(progress::course_progress))
        .route(
            "/progress/{doc_id}",
            get(progress::get_progress).put(progress::put_progress),
        )
}
