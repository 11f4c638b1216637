use std::sync::Arc;

use ailingo_events::ChangeBus;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: ailingo_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Change bus every progress write is published on.
    pub bus: Arc<ChangeBus>,
}
