//! Progress record model and client write DTO.

use ailingo_core::progress::{ProgressKey, ProgressStatus};
use ailingo_core::types::Timestamp;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `progress` table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub uid: String,
    pub doc_id: String,
    pub course_id: String,
    pub lesson_id: String,
    pub status: String,
    pub finalized: bool,
    pub xp_earned: Option<i32>,
    pub xp_reward: Option<i32>,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ProgressRecord {
    /// Parsed status. Rows are constrained to known values, so `None` means
    /// the row came from somewhere other than this database.
    pub fn status(&self) -> Option<ProgressStatus> {
        self.status.parse().ok()
    }

    pub fn is_completed(&self) -> bool {
        self.status() == Some(ProgressStatus::Completed)
    }

    /// Whether the client should display this lesson as done.
    pub fn is_done(&self) -> bool {
        self.is_completed() || self.finalized
    }

    pub fn key(&self) -> ProgressKey {
        ProgressKey {
            course_id: self.course_id.clone(),
            lesson_id: self.lesson_id.clone(),
        }
    }
}

/// Fields a client may merge into its own progress record.
///
/// `finalized`, `xp_earned` and `completed_at` are owned by settlement and
/// are never written through this DTO.
#[derive(Debug, Clone)]
pub struct WriteProgress {
    pub status: ProgressStatus,
    pub xp_reward: Option<i32>,
}

/// Before/after images of one client write.
#[derive(Debug, Clone)]
pub struct ProgressWrite {
    pub before: Option<ProgressRecord>,
    pub after: ProgressRecord,
}
