//! User aggregate model.

use ailingo_core::rewards::StreakState;
use ailingo_core::types::{DayKey, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `users` table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct UserAggregate {
    pub uid: String,
    pub xp_total: i64,
    pub lessons_completed_count: i64,
    pub streak: i32,
    pub last_active_date: Option<DayKey>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl UserAggregate {
    pub fn streak_state(&self) -> StreakState {
        StreakState {
            streak: self.streak,
            last_active_date: self.last_active_date,
        }
    }
}
