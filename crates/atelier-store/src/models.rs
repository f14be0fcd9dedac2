//! Platform-side model structs that never cross the public wire.
//!
//! The domain models shared with the client SDK live in `atelier-shared`;
//! only the identity-provider internals (accounts and sessions) are private
//! to the store and server.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A portal account. The primary key is the contact email address.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    pub email: String,
    /// Hex-encoded salted password hash. Opaque to the store; the server's
    /// auth module computes and verifies it.
    pub password_hash: String,
    /// Hex-encoded salt.
    pub salt: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

/// An issued session token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    /// Opaque random token, presented as a bearer credential.
    pub token: String,
    pub email: String,
    pub is_admin: bool,
    /// Remembered sessions survive restarts and never expire on their own;
    /// non-remembered ones are purged after the configured TTL.
    pub remember: bool,
    pub created_at: DateTime<Utc>,
}
