//! Row structs and DTOs.
//!
//! Each submodule contains a `FromRow` entity matching the table, a create
//! DTO for inserts, and, where rows are patched, an update DTO whose fields
//! are all optional.

pub mod dashboard;
pub mod user;
