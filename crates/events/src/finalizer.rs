//! The progress finalizer: credits a completed lesson exactly once.
//!
//! [`Finalizer::finalize`] is invoked for every write to a progress record,
//! possibly several times for the same write and concurrently for records of
//! the same user. Writes that are not completions are skipped without
//! touching the database. Completions are settled by
//! [`SettlementRepo::settle`], re-run from the top whenever the serializable
//! transaction reports a conflict.

use ailingo_core::types::Timestamp;
use ailingo_db::repositories::{Settlement, SettleOutcome, SettlementRepo, SettlementRequest};
use ailingo_db::DbPool;
use chrono::{FixedOffset, Offset, Utc};

use crate::backoff::{next_delay, BackoffConfig};
use crate::bus::ProgressChange;

/// Default number of attempts for one settlement before giving up.
const DEFAULT_MAX_TX_ATTEMPTS: u32 = 5;

/// Default number of trigger deliveries for one change before giving up.
const DEFAULT_MAX_DELIVERY_ATTEMPTS: u32 = 5;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Finalizer configuration.
#[derive(Debug, Clone)]
pub struct FinalizerConfig {
    /// Offset used to decide which calendar day "now" falls on.
    pub day_offset: FixedOffset,
    /// Attempts per invocation when the settlement transaction conflicts.
    pub max_tx_attempts: u32,
    /// Backoff between conflicting settlement attempts.
    pub tx_backoff: BackoffConfig,
    /// Invocations per change when the finalizer fails.
    pub max_delivery_attempts: u32,
    /// Backoff between failed invocations.
    pub delivery_backoff: BackoffConfig,
}

impl Default for FinalizerConfig {
    fn default() -> Self {
        Self {
            day_offset: Utc.fix(),
            max_tx_attempts: DEFAULT_MAX_TX_ATTEMPTS,
            tx_backoff: BackoffConfig::transaction(),
            max_delivery_attempts: DEFAULT_MAX_DELIVERY_ATTEMPTS,
            delivery_backoff: BackoffConfig::delivery(),
        }
    }
}

impl FinalizerConfig {
    /// Load finalizer configuration from environment variables.
    ///
    /// | Env Var                           | Default |
    /// |-----------------------------------|---------|
    /// | `STREAK_UTC_OFFSET_MINUTES`       | `0`     |
    /// | `FINALIZER_MAX_TX_ATTEMPTS`       | `5`     |
    /// | `FINALIZER_MAX_DELIVERY_ATTEMPTS` | `5`     |
    ///
    /// # Panics
    ///
    /// Panics if a variable is set but does not parse, or if the offset is
    /// outside ±24h.
    pub fn from_env() -> Self {
        let offset_minutes: i32 = std::env::var("STREAK_UTC_OFFSET_MINUTES")
            .unwrap_or_else(|_| "0".into())
            .parse()
            .expect("STREAK_UTC_OFFSET_MINUTES must be a valid i32");
        let day_offset = FixedOffset::east_opt(offset_minutes * 60)
            .expect("STREAK_UTC_OFFSET_MINUTES must be within ±1440");

        let max_tx_attempts: u32 = std::env::var("FINALIZER_MAX_TX_ATTEMPTS")
            .unwrap_or_else(|_| DEFAULT_MAX_TX_ATTEMPTS.to_string())
            .parse()
            .expect("FINALIZER_MAX_TX_ATTEMPTS must be a valid u32");

        let max_delivery_attempts: u32 = std::env::var("FINALIZER_MAX_DELIVERY_ATTEMPTS")
            .unwrap_or_else(|_| DEFAULT_MAX_DELIVERY_ATTEMPTS.to_string())
            .parse()
            .expect("FINALIZER_MAX_DELIVERY_ATTEMPTS must be a valid u32");

        Self {
            day_offset,
            max_tx_attempts: max_tx_attempts.max(1),
            max_delivery_attempts: max_delivery_attempts.max(1),
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Outcome / error
// ---------------------------------------------------------------------------

/// Result of one finalizer invocation.
#[derive(Debug, Clone)]
pub enum FinalizeOutcome {
    /// The write was not a completion (or the record is gone). Nothing ran.
    Skipped,
    /// The record had already been settled. Nothing was written.
    AlreadyFinalized,
    /// This invocation credited the completion.
    Settled(Settlement),
}

#[derive(Debug, thiserror::Error)]
pub enum FinalizeError {
    /// A non-retryable database error; the transaction was rolled back.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Every attempt conflicted with a concurrent transaction.
    #[error("Settlement still conflicting after {attempts} attempts: {source}")]
    Contended {
        attempts: u32,
        #[source]
        source: sqlx::Error,
    },
}

// ---------------------------------------------------------------------------
// Finalizer
// ---------------------------------------------------------------------------

pub struct Finalizer {
    pool: DbPool,
    config: FinalizerConfig,
}

impl Finalizer {
    pub fn new(pool: DbPool, config: FinalizerConfig) -> Self {
        Self { pool, config }
    }

    pub fn config(&self) -> &FinalizerConfig {
        &self.config
    }

    /// Finalize `change` using the current time.
    pub async fn finalize(&self, change: &ProgressChange) -> Result<FinalizeOutcome, FinalizeError> {
        self.finalize_at(change, Utc::now()).await
    }

    /// Finalize `change` as if invoked at `now`.
    pub async fn finalize_at(
        &self,
        change: &ProgressChange,
        now: Timestamp,
    ) -> Result<FinalizeOutcome, FinalizeError> {
        let Some(after) = change.after.as_ref().filter(|a| a.is_completed()) else {
            tracing::debug!(
                uid = %change.uid,
                doc_id = %change.doc_id,
                "Not a completion, skipping",
            );
            return Ok(FinalizeOutcome::Skipped);
        };

        let key = after.key();
        let request = SettlementRequest {
            uid: &change.uid,
            key: &key,
            after_xp_earned: after.xp_earned,
            after_xp_reward: after.xp_reward,
            now,
            day_offset: self.config.day_offset,
        };

        let mut delay = self.config.tx_backoff.initial_delay;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match SettlementRepo::settle(&self.pool, &request).await {
                Ok(SettleOutcome::AlreadyFinalized) => {
                    return Ok(FinalizeOutcome::AlreadyFinalized);
                }
                Ok(SettleOutcome::Settled(settlement)) => {
                    tracing::info!(
                        uid = %change.uid,
                        doc_id = %change.doc_id,
                        xp_award = settlement.plan.xp_award,
                        streak = settlement.plan.streak,
                        attempt,
                        "Finalized completion",
                    );
                    return Ok(FinalizeOutcome::Settled(settlement));
                }
                Err(e) if SettlementRepo::is_conflict(&e) => {
                    if attempt >= self.config.max_tx_attempts {
                        return Err(FinalizeError::Contended {
                            attempts: attempt,
                            source: e,
                        });
                    }
                    tracing::debug!(
                        uid = %change.uid,
                        doc_id = %change.doc_id,
                        attempt,
                        error = %e,
                        "Settlement conflicted, retrying",
                    );
                }
                Err(e) => return Err(e.into()),
            }

            tokio::time::sleep(delay).await;
            delay = next_delay(delay, &self.config.tx_backoff);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_utc_day() {
        let config = FinalizerConfig::default();
        assert_eq!(config.day_offset.local_minus_utc(), 0);
        assert_eq!(config.max_tx_attempts, DEFAULT_MAX_TX_ATTEMPTS);
    }
}
