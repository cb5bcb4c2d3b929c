//! Authentication primitives.
//!
//! - [`password`] -- Argon2id hashing and the password strength rule.
//! - [`jwt`] -- access-token issue and validation.

pub mod jwt;
pub mod password;
