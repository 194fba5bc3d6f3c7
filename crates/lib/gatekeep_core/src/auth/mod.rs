//! Credential issuance and verification.
//!
//! Provides the signing key set, the token issuer/verifier, password hashing
//! and random secret generation shared by `gatekeep_api` and dependent
//! services.

pub mod keys;
pub mod password;
pub mod secret;
pub mod token;

pub use keys::KeySet;
pub use token::TokenIssuer;
