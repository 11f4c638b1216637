//! Authenticated health-check callable.

use axum::Json;
use serde::Serialize;

use crate::middleware::auth::AuthUser;

#[derive(Debug, Serialize)]
pub struct PingResponse {
    pub ok: bool,
    pub uid: String,
}

/// POST /api/v1/ping
///
/// Echoes the caller's uid. Unauthenticated callers are rejected by the
/// [`AuthUser`] extractor with `401 UNAUTHENTICATED`.
pub async fn ping(user: AuthUser) -> Json<PingResponse> {
    Json(PingResponse {
        ok: true,
        uid: user.uid,
    })
}
