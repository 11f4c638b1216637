//! Repository for the `progress` table.

use ailingo_core::progress::ProgressKey;
use ailingo_core::types::Timestamp;
use sqlx::PgPool;

use crate::models::progress::{ProgressRecord, ProgressWrite, WriteProgress};

/// Column list for `progress` queries.
pub(crate) const COLUMNS: &str = "uid, doc_id, course_id, lesson_id, status, finalized, \
     xp_earned, xp_reward, completed_at, created_at, updated_at";

/// Provides reads and client writes for progress records.
pub struct ProgressRepo;

impl ProgressRepo {
    /// Find one progress record.
    pub async fn find(
        pool: &PgPool,
        uid: &str,
        doc_id: &str,
    ) -> Result<Option<ProgressRecord>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM progress WHERE uid = $1 AND doc_id = $2");
        sqlx::query_as::<_, ProgressRecord>(&query)
            .bind(uid)
            .bind(doc_id)
            .fetch_optional(pool)
            .await
    }

    /// Merge a client write into the user's progress record.
    ///
    /// Creates the record if absent. Only `status`, `xp_reward` (when given)
    /// and `updated_at` are touched. The previous row is read under a row lock
    /// in the same transaction so the returned before/after pair describes
    /// exactly this write.
    pub async fn write_from_client(
        pool: &PgPool,
        uid: &str,
        key: &ProgressKey,
        input: &WriteProgress,
    ) -> Result<ProgressWrite, sqlx::Error> {
        let doc_id = key.doc_id();
        let mut tx = pool.begin().await?;

        let select = format!(
            "SELECT {COLUMNS} FROM progress WHERE uid = $1 AND doc_id = $2 FOR UPDATE"
        );
        let before = sqlx::query_as::<_, ProgressRecord>(&select)
            .bind(uid)
            .bind(&doc_id)
            .fetch_optional(&mut *tx)
            .await?;

        let upsert = format!(
            "INSERT INTO progress (uid, doc_id, course_id, lesson_id, status, xp_reward) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (uid, doc_id) DO UPDATE SET \
                 status = EXCLUDED.status, \
                 xp_reward = COALESCE(EXCLUDED.xp_reward, progress.xp_reward), \
                 updated_at = now() \
             RETURNING {COLUMNS}"
        );
        let after = sqlx::query_as::<_, ProgressRecord>(&upsert)
            .bind(uid)
            .bind(&doc_id)
            .bind(&key.course_id)
            .bind(&key.lesson_id)
            .bind(input.status.as_str())
            .bind(input.xp_reward)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(ProgressWrite { before, after })
    }

    /// List a user's progress records for one course, ordered by lesson id.
    pub async fn list_for_course(
        pool: &PgPool,
        uid: &str,
        course_id: &str,
    ) -> Result<Vec<ProgressRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM progress \
             WHERE uid = $1 AND course_id = $2 \
             ORDER BY lesson_id"
        );
        sqlx::query_as::<_, ProgressRecord>(&query)
            .bind(uid)
            .bind(course_id)
            .fetch_all(pool)
            .await
    }

    /// Completed records not yet finalized whose last write is older than
    /// `updated_before`, oldest first.
    pub async fn list_awaiting_settlement(
        pool: &PgPool,
        updated_before: Timestamp,
        limit: i64,
    ) -> Result<Vec<ProgressRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM progress \
             WHERE status = 'completed' AND NOT finalized AND updated_at < $1 \
             ORDER BY updated_at \
             LIMIT $2"
        );
        sqlx::query_as::<_, ProgressRecord>(&query)
            .bind(updated_before)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
