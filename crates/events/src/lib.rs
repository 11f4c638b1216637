//! Change-triggered progress finalization.
//!
//! This crate turns progress-record writes into reward settlement:
//!
//! - [`ChangeBus`] -- in-process publish/subscribe hub for [`ProgressChange`]s,
//!   backed by `tokio::sync::broadcast`.
//! - [`Finalizer`] -- settles one change: guard, serializable settlement
//!   transaction, conflict retry.
//! - [`ProgressTrigger`] -- background service activating the finalizer for
//!   every published change, each activation in its own task, with
//!   redelivery on failure.
//! - [`RedeliverySweep`] -- periodic re-publication of completions that were
//!   never settled (dropped or exhausted deliveries).

pub mod backoff;
pub mod bus;
pub mod finalizer;
pub mod sweep;
pub mod trigger;

pub use bus::{ChangeBus, ProgressChange};
pub use finalizer::{FinalizeError, FinalizeOutcome, Finalizer, FinalizerConfig};
pub use sweep::{RedeliverySweep, SweepConfig};
pub use trigger::ProgressTrigger;
