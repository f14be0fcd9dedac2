//! Request/response payloads exchanged between the portal server and the
//! client SDK.

use serde::{Deserialize, Serialize};

use crate::types::SenderTag;

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// Persist the session across browser/process restarts.
    #[serde(default = "default_remember")]
    pub remember: bool,
}

fn default_remember() -> bool {
    true
}

/// Identity exposed to protected views once a session is confirmed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionInfo {
    pub email: String,
    pub admin: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub session: SessionInfo,
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Field-level status update for a record. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: Option<String>,
    pub progress: Option<i64>,
    pub due_date: Option<String>,
    pub next_milestone: Option<String>,
    pub staging_url: Option<String>,
    pub payment_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRecord {
    pub contact_email: String,
}

/// Body of the atomic message append. The server assigns the timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMessage {
    pub sender: SenderTag,
    pub text: String,
}

/// Result of storing a blob: the name it was stored under and the durable
/// download reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub name: String,
    pub url: String,
}

// ---------------------------------------------------------------------------
// Content
// ---------------------------------------------------------------------------

/// Create/update payload for a blog post.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostInput {
    pub title: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
}

/// Create payload for a portfolio item.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortfolioInput {
    pub title: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub order: Option<i64>,
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// Background notification pushed to admin consoles.
///
/// `url` is where an "open" action should navigate; dismissal has no
/// server-side effect.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
    pub url: String,
}

/// JSON error body returned by the API on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_remember_defaults_to_true() {
        let req: LoginRequest =
            serde_json::from_str(r#"{"email":"a@b.c","password":"pw"}"#).unwrap();
        assert!(req.remember);
    }

    #[test]
    fn status_update_fields_are_optional() {
        let update: StatusUpdate = serde_json::from_str(r#"{"progress":42}"#).unwrap();
        assert_eq!(update.progress, Some(42));
        assert!(update.status.is_none());
    }
}
