use axum::routing::post;
use axum::Router;

use crate::handlers::ping;
use crate::state::AppState;

/// Routes mounted at `/ping`.
pub fn router() -> Router<AppState> {
    Router::new().route("/ping", post(ping::ping))
}
