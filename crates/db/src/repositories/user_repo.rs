//! Repository for the `users` table.

use sqlx::PgPool;

use crate::models::user::UserAggregate;

/// Column list for `users` queries.
pub(crate) const COLUMNS: &str =
    "uid, xp_total, lessons_completed_count, streak, last_active_date, created_at, updated_at";

/// Read access to user aggregates. All writes happen in settlement.
pub struct UserRepo;

impl UserRepo {
    /// Find a user's aggregate. `None` until their first finalization.
    pub async fn find(pool: &PgPool, uid: &str) -> Result<Option<UserAggregate>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE uid = $1");
        sqlx::query_as::<_, UserAggregate>(&query)
            .bind(uid)
            .fetch_optional(pool)
            .await
    }
}
