//! Periodic redelivery of unsettled completions.
//!
//! Publishing on the change bus is fire-and-forget: a lagging subscriber, a
//! restart between write and settlement, or an exhausted delivery budget can
//! all leave a completed record with `finalized = false`. The sweep finds
//! those records and publishes them again. Settlement is idempotent, so a
//! record that is settled concurrently by its original delivery is harmless.

use std::sync::Arc;
use std::time::Duration;

use ailingo_core::types::Timestamp;
use ailingo_db::repositories::ProgressRepo;
use ailingo_db::DbPool;
use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::bus::{ChangeBus, ProgressChange};

/// Default interval between sweeps.
const DEFAULT_INTERVAL_SECS: u64 = 60;

/// Default age a completion must reach before it is considered stuck.
const DEFAULT_GRACE_SECS: u64 = 120;

/// Maximum records republished per sweep.
const DEFAULT_BATCH_SIZE: i64 = 500;

/// Sweep configuration.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    pub interval: Duration,
    pub grace: Duration,
    pub batch_size: i64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            grace: Duration::from_secs(DEFAULT_GRACE_SECS),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl SweepConfig {
    /// Load sweep configuration from environment variables.
    ///
    /// | Env Var                    | Default |
    /// |----------------------------|---------|
    /// | `REDELIVERY_INTERVAL_SECS` | `60`    |
    /// | `REDELIVERY_GRACE_SECS`    | `120`   |
    pub fn from_env() -> Self {
        let interval_secs: u64 = std::env::var("REDELIVERY_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_INTERVAL_SECS);
        let grace_secs: u64 = std::env::var("REDELIVERY_GRACE_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_GRACE_SECS);

        Self {
            interval: Duration::from_secs(interval_secs.max(1)),
            grace: Duration::from_secs(grace_secs),
            ..Self::default()
        }
    }
}

/// Background service republishing stuck completions.
pub struct RedeliverySweep {
    pool: DbPool,
    bus: Arc<ChangeBus>,
    config: SweepConfig,
}

impl RedeliverySweep {
    pub fn new(pool: DbPool, bus: Arc<ChangeBus>, config: SweepConfig) -> Self {
        Self { pool, bus, config }
    }

    /// Run the sweep loop until `cancel` is triggered.
    pub async fn run(self, cancel: CancellationToken) {
        tracing::info!(
            interval_secs = self.config.interval.as_secs(),
            grace_secs = self.config.grace.as_secs(),
            "Redelivery sweep started"
        );

        let mut interval = tokio::time::interval(self.config.interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Redelivery sweep stopping");
                    break;
                }
                _ = interval.tick() => {
                    match self.sweep_once(Utc::now()).await {
                        Ok(0) => tracing::debug!("Redelivery sweep: nothing to redeliver"),
                        Ok(republished) => {
                            tracing::info!(republished, "Redelivery sweep: republished stuck completions");
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Redelivery sweep: query failed");
                        }
                    }
                }
            }
        }
    }

    /// Republish every completion older than the grace period as of `now`.
    ///
    /// Returns the number of changes published.
    pub async fn sweep_once(&self, now: Timestamp) -> Result<usize, sqlx::Error> {
        let grace = chrono::Duration::from_std(self.config.grace)
            .unwrap_or_else(|_| chrono::Duration::seconds(DEFAULT_GRACE_SECS as i64));
        let cutoff = now - grace;

        let stuck =
            ProgressRepo::list_awaiting_settlement(&self.pool, cutoff, self.config.batch_size)
                .await?;
        let count = stuck.len();

        for record in stuck {
            tracing::debug!(uid = %record.uid, doc_id = %record.doc_id, "Republishing completion");
            self.bus
                .publish(ProgressChange::new(record.uid.clone(), record.doc_id.clone()).with_after(record));
        }

        Ok(count)
    }
}
