//! The settlement transaction: credit one completed lesson exactly once.
//!
//! Every read and write of one settlement attempt runs in a single
//! `SERIALIZABLE` transaction spanning the progress row, the user aggregate
//! and the achievement row. Two attempts racing on the same user either
//! serialize cleanly or one of them fails with a serialization error and must
//! be re-run from the top; [`SettlementRepo::is_conflict`] identifies those
//! errors. The `finalized` flag read inside the transaction makes re-runs and
//! duplicate deliveries no-ops.

use ailingo_core::progress::{ProgressKey, ProgressStatus};
use ailingo_core::rewards::{plan_settlement, SettlementPlan, XpSources};
use ailingo_core::types::Timestamp;
use chrono::FixedOffset;
use sqlx::PgPool;

use super::{progress_repo, user_repo};
use crate::models::progress::ProgressRecord;
use crate::models::user::UserAggregate;

/// PostgreSQL `serialization_failure`.
const SQLSTATE_SERIALIZATION_FAILURE: &str = "40001";
/// PostgreSQL `deadlock_detected`.
const SQLSTATE_DEADLOCK_DETECTED: &str = "40P01";
/// PostgreSQL `unique_violation`, raised when two first-time upserts race.
const SQLSTATE_UNIQUE_VIOLATION: &str = "23505";

/// Input for one settlement attempt.
#[derive(Debug, Clone)]
pub struct SettlementRequest<'a> {
    pub uid: &'a str,
    pub key: &'a ProgressKey,
    /// `xp_earned` carried by the triggering after-image.
    pub after_xp_earned: Option<i32>,
    /// `xp_reward` proposed by the client in the triggering after-image.
    pub after_xp_reward: Option<i32>,
    /// Invocation time; also decides the streak day.
    pub now: Timestamp,
    /// Offset the streak day is computed in.
    pub day_offset: FixedOffset,
}

/// Rows written by a successful settlement.
#[derive(Debug, Clone)]
pub struct Settlement {
    pub plan: SettlementPlan,
    pub user: UserAggregate,
    pub progress: ProgressRecord,
}

#[derive(Debug, Clone)]
pub enum SettleOutcome {
    /// The record was already finalized; nothing was written.
    AlreadyFinalized,
    Settled(Settlement),
}

pub struct SettlementRepo;

impl SettlementRepo {
    /// Run one settlement attempt.
    ///
    /// On any error the transaction is rolled back with nothing written.
    pub async fn settle(
        pool: &PgPool,
        req: &SettlementRequest<'_>,
    ) -> Result<SettleOutcome, sqlx::Error> {
        let doc_id = req.key.doc_id();
        let mut tx = pool.begin().await?;

        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await?;

        let progress_query = format!(
            "SELECT {} FROM progress WHERE uid = $1 AND doc_id = $2",
            progress_repo::COLUMNS
        );
        let progress = sqlx::query_as::<_, ProgressRecord>(&progress_query)
            .bind(req.uid)
            .bind(&doc_id)
            .fetch_optional(&mut *tx)
            .await?;

        let user_query = format!("SELECT {} FROM users WHERE uid = $1", user_repo::COLUMNS);
        let user = sqlx::query_as::<_, UserAggregate>(&user_query)
            .bind(req.uid)
            .fetch_optional(&mut *tx)
            .await?;

        if progress.as_ref().is_some_and(|p| p.finalized) {
            tx.rollback().await?;
            tracing::info!(uid = req.uid, doc_id = %doc_id, "Lesson already finalized");
            return Ok(SettleOutcome::AlreadyFinalized);
        }

        let plan = plan_settlement(
            XpSources {
                stored_xp_earned: progress.as_ref().and_then(|p| p.xp_earned),
                after_xp_earned: req.after_xp_earned,
                after_xp_reward: req.after_xp_reward,
            },
            user.as_ref()
                .map(UserAggregate::streak_state)
                .unwrap_or_default(),
            req.now,
            req.day_offset,
        );

        let user_upsert = format!(
            "INSERT INTO users (uid, xp_total, lessons_completed_count, streak, last_active_date, updated_at) \
             VALUES ($1, $2, 1, $3, $4, $5) \
             ON CONFLICT (uid) DO UPDATE SET \
                 xp_total = users.xp_total + EXCLUDED.xp_total, \
                 lessons_completed_count = users.lessons_completed_count + 1, \
                 streak = EXCLUDED.streak, \
                 last_active_date = EXCLUDED.last_active_date, \
                 updated_at = EXCLUDED.updated_at \
             RETURNING {}",
            user_repo::COLUMNS
        );
        let user = sqlx::query_as::<_, UserAggregate>(&user_upsert)
            .bind(req.uid)
            .bind(i64::from(plan.xp_award))
            .bind(plan.streak)
            .bind(plan.today)
            .bind(req.now)
            .fetch_one(&mut *tx)
            .await?;

        let progress_upsert = format!(
            "INSERT INTO progress \
                 (uid, doc_id, course_id, lesson_id, status, finalized, xp_earned, xp_reward, completed_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, TRUE, $6, $7, $8, $8) \
             ON CONFLICT (uid, doc_id) DO UPDATE SET \
                 finalized = TRUE, \
                 xp_earned = EXCLUDED.xp_earned, \
                 completed_at = COALESCE(progress.completed_at, EXCLUDED.completed_at), \
                 updated_at = EXCLUDED.updated_at \
             RETURNING {}",
            progress_repo::COLUMNS
        );
        let progress = sqlx::query_as::<_, ProgressRecord>(&progress_upsert)
            .bind(req.uid)
            .bind(&doc_id)
            .bind(&req.key.course_id)
            .bind(&req.key.lesson_id)
            .bind(ProgressStatus::Completed.as_str())
            .bind(plan.xp_award)
            .bind(req.after_xp_reward)
            .bind(req.now)
            .fetch_one(&mut *tx)
            .await?;

        if let Some(badge) = &plan.badge {
            let achievement_upsert =
                "INSERT INTO achievements (uid, code, title, earned_at, meta, updated_at) \
                 VALUES ($1, $2, $3, $4, $5, $4) \
                 ON CONFLICT (uid, code) DO UPDATE SET \
                     title = EXCLUDED.title, \
                     meta = EXCLUDED.meta, \
                     updated_at = EXCLUDED.updated_at";
            sqlx::query(achievement_upsert)
                .bind(req.uid)
                .bind(&badge.code)
                .bind(&badge.title)
                .bind(req.now)
                .bind(badge.meta())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        tracing::debug!(
            uid = req.uid,
            doc_id = %doc_id,
            xp_award = plan.xp_award,
            streak = plan.streak,
            badge = plan.badge.as_ref().map(|b| b.code.as_str()),
            "Settlement committed",
        );

        Ok(SettleOutcome::Settled(Settlement {
            plan,
            user,
            progress,
        }))
    }

    /// Whether `err` is a transaction conflict that should be retried by
    /// re-running the whole settlement.
    pub fn is_conflict(err: &sqlx::Error) -> bool {
        match err {
            sqlx::Error::Database(db_err) => matches!(
                db_err.code().as_deref(),
                Some(SQLSTATE_SERIALIZATION_FAILURE)
                    | Some(SQLSTATE_DEADLOCK_DETECTED)
                    | Some(SQLSTATE_UNIQUE_VIOLATION)
            ),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_database_errors_are_not_conflicts() {
        assert!(!SettlementRepo::is_conflict(&sqlx::Error::RowNotFound));
        assert!(!SettlementRepo::is_conflict(&sqlx::Error::PoolTimedOut));
    }
}
