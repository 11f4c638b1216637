//! Row structs and DTOs.
//!
//! Each submodule contains a `FromRow` + `Serialize` entity struct matching
//! the database row, and where the client writes the table, a write DTO.

pub mod achievement;
pub mod progress;
pub mod user;
