//! Request handlers.
//!
//! Handlers delegate to the repositories in `ailingo_db` and map errors via
//! [`AppError`](crate::error::AppError). Every handler acts on the
//! authenticated caller's own data only.

pub mod ping;
pub mod progress;
pub mod users;
