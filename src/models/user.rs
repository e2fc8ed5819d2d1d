//! Account and credential exchange types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered account, as returned by the register endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Token response from the login and refresh endpoints.
///
/// `expires_in` and `token_type` are advisory; the client does no expiry
/// bookkeeping of its own and relies on the server rejecting stale tokens.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub token_type: Option<String>,
}
