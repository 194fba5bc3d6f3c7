//! Identity domain models.
//!
//! Internal domain types, distinct from the HTTP request/response models
//! defined by `gatekeep_api`.

pub mod auth;
pub mod reset;
pub mod user;

pub use auth::{Claims, TokenPair};
pub use reset::ResetSecret;
pub use user::{NewUser, UpdateUser, User};
