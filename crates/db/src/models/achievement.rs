//! Achievement model.

use ailingo_core::types::Timestamp;
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `achievements` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Achievement {
    pub uid: String,
    pub code: String,
    pub title: String,
    pub earned_at: Timestamp,
    pub meta: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
