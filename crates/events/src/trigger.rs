//! Change-triggered activation of the finalizer.
//!
//! [`ProgressTrigger`] subscribes to the [`ChangeBus`](crate::bus::ChangeBus)
//! and activates the [`Finalizer`] once per published change, each activation
//! in its own task so changes for different records settle concurrently. A
//! failed activation is redelivered with backoff; a change that still fails
//! after the configured number of deliveries is left for the
//! [`RedeliverySweep`](crate::sweep::RedeliverySweep).

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_util::task::TaskTracker;

use crate::backoff::next_delay;
use crate::bus::ProgressChange;
use crate::finalizer::{FinalizeError, FinalizeOutcome, Finalizer};

/// Background service that finalizes every published progress change.
pub struct ProgressTrigger {
    finalizer: Arc<Finalizer>,
}

impl ProgressTrigger {
    pub fn new(finalizer: Arc<Finalizer>) -> Self {
        Self { finalizer }
    }

    /// Run the trigger loop.
    ///
    /// Exits when the channel is closed (i.e. the bus is dropped), after
    /// every in-flight activation has finished.
    pub async fn run(self, mut receiver: broadcast::Receiver<ProgressChange>) {
        let tracker = TaskTracker::new();

        loop {
            match receiver.recv().await {
                Ok(change) => {
                    let finalizer = Arc::clone(&self.finalizer);
                    tracker.spawn(async move {
                        // Failures are logged inside `deliver`.
                        let _ = deliver(&finalizer, &change).await;
                    });
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(
                        skipped = n,
                        "Progress trigger lagged, skipped changes are left to the redelivery sweep"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Change bus closed, progress trigger shutting down");
                    break;
                }
            }
        }

        tracker.close();
        tracker.wait().await;
    }
}

/// Activate the finalizer for one change, redelivering on failure.
///
/// Returns the outcome of the first successful activation, or the error of
/// the last one once the delivery budget is spent.
pub async fn deliver(
    finalizer: &Finalizer,
    change: &ProgressChange,
) -> Result<FinalizeOutcome, FinalizeError> {
    let config = finalizer.config();
    let mut delay = config.delivery_backoff.initial_delay;
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        match finalizer.finalize(change).await {
            Ok(outcome) => return Ok(outcome),
            Err(e) if attempt >= config.max_delivery_attempts => {
                tracing::error!(
                    uid = %change.uid,
                    doc_id = %change.doc_id,
                    attempt,
                    error = %e,
                    "Finalization failed, giving up on this delivery",
                );
                return Err(e);
            }
            Err(e) => {
                tracing::warn!(
                    uid = %change.uid,
                    doc_id = %change.doc_id,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Finalization failed, redelivering",
                );
            }
        }

        tokio::time::sleep(delay).await;
        delay = next_delay(delay, &config.delivery_backoff);
    }
}
