//! Request extractors shared by authenticated handlers.
//!
//! - [`auth::AuthUser`] -- Extracts the caller's uid from a JWT Bearer token.

pub mod auth;
