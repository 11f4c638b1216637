//! Domain logic for the AiLingo progress backend.
//!
//! This crate has no IO: it defines the shared types, the error enum, the
//! progress-record identity rules and the reward rules (XP award, streak
//! continuation, streak badges) used by the settlement transaction.

pub mod error;
pub mod progress;
pub mod rewards;
pub mod types;
