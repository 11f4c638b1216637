//! Repository for the `achievements` table.

use sqlx::PgPool;

use crate::models::achievement::Achievement;

/// Column list for `achievements` queries.
pub(crate) const COLUMNS: &str = "uid, code, title, earned_at, meta, created_at, updated_at";

pub struct AchievementRepo;

impl AchievementRepo {
    /// List a user's achievements, earliest first.
    pub async fn list_for_user(pool: &PgPool, uid: &str) -> Result<Vec<Achievement>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM achievements \
             WHERE uid = $1 \
             ORDER BY earned_at, code"
        );
        sqlx::query_as::<_, Achievement>(&query)
            .bind(uid)
            .fetch_all(pool)
            .await
    }

    /// Find one achievement by code.
    pub async fn find(
        pool: &PgPool,
        uid: &str,
        code: &str,
    ) -> Result<Option<Achievement>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM achievements WHERE uid = $1 AND code = $2");
        sqlx::query_as::<_, Achievement>(&query)
            .bind(uid)
            .bind(code)
            .fetch_optional(pool)
            .await
    }
}
