//! Password-reset one-time secrets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A one-time secret that authorizes a single password change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetSecret {
    pub email: String,
    pub token: String,
    pub expiry_at: DateTime<Utc>,
}

impl ResetSecret {
    /// Expiry is absolute: a secret is dead from `expiry_at` onward.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiry_at
    }
}
