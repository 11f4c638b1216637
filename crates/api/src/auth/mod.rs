//! Authentication primitives.
//!
//! - [`jwt`] -- JWT access-token generation and validation. The token
//!   subject is the caller's uid.

pub mod jwt;
