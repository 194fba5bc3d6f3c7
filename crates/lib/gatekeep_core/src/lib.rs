//! # gatekeep_core
//!
//! Identity and access core for Gatekeep: roles, claims, token issuance,
//! the identity store and its cache, password-reset secrets, authentication
//! strategies and the authorization evaluator.

pub mod auth;
pub mod authz;
pub mod client;
pub mod error;
pub mod migrate;
pub mod models;
pub mod resets;
pub mod role;
pub mod strategy;
pub mod users;

pub use error::{AuthError, ErrorKind, FieldError};

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
