//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that accept
//! `&PgPool` as the first argument.

pub mod achievement_repo;
pub mod progress_repo;
pub mod settlement_repo;
pub mod user_repo;

pub use achievement_repo::AchievementRepo;
pub use progress_repo::ProgressRepo;
pub use settlement_repo::{Settlement, SettleOutcome, SettlementRepo, SettlementRequest};
pub use user_repo::UserRepo;
