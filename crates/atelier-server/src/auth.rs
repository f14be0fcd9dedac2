//! Credentials and sessions.
//!
//! Passwords are stored as hex-encoded salted BLAKE3 digests; session
//! tokens are opaque random bearer credentials persisted in the store. Any
//! credential failure surfaces as the single `Access Denied` error, with no
//! retry automation.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use rand::RngCore;
use tracing::{info, warn};

use atelier_shared::protocol::{LoginRequest, LoginResponse, SessionInfo};
use atelier_store::{Account, Database, Session, StoreError};

use crate::api::AppState;
use crate::error::ServerError;

/// Generate a random hex salt (16 bytes).
pub fn generate_salt() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Generate a random hex session token (32 bytes).
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Salted password digest, hex encoded.
pub fn hash_password(salt_hex: &str, password: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(salt_hex.as_bytes());
    hasher.update(password.as_bytes());
    hasher.finalize().to_hex().to_string()
}

/// Constant-time password check against a stored account.
pub fn verify_password(account: &Account, password: &str) -> bool {
    use subtle::ConstantTimeEq;

    let computed = hash_password(&account.salt, password);
    let computed_bytes = computed.as_bytes();
    let stored_bytes = account.password_hash.as_bytes();

    computed_bytes.len() == stored_bytes.len()
        && computed_bytes.ct_eq(stored_bytes).unwrap_u8() == 1
}

/// Create an account if the email is not registered yet. Used for startup
/// seeding and test fixtures; existing accounts are left untouched.
pub fn ensure_account(
    db: &Database,
    email: &str,
    password: &str,
    is_admin: bool,
) -> Result<(), StoreError> {
    match db.get_account(email) {
        Ok(_) => Ok(()),
        Err(StoreError::NotFound) => {
            let salt = generate_salt();
            let account = Account {
                email: email.to_string(),
                password_hash: hash_password(&salt, password),
                salt,
                is_admin,
                created_at: Utc::now(),
            };
            info!(email = %email, admin = is_admin, "Creating account");
            db.create_account(&account)
        }
        Err(e) => Err(e),
    }
}

// ---------------------------------------------------------------------------
// Session extraction
// ---------------------------------------------------------------------------

/// Pull the bearer token out of the `Authorization` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let auth = headers.get("authorization")?.to_str().ok()?;
    let token = auth.strip_prefix("Bearer ").unwrap_or(auth).trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Resolve the caller's session or fail with `Access Denied`.
///
/// Non-remembered sessions past the configured TTL are revoked on sight.
pub fn require_session(state: &AppState, headers: &HeaderMap) -> Result<Session, ServerError> {
    let token = bearer_token(headers).ok_or(ServerError::AccessDenied)?;

    let db = state.store()?;
    let session = db.get_session(&token).map_err(|e| match e {
        StoreError::NotFound => ServerError::AccessDenied,
        other => ServerError::Store(other),
    })?;

    if !session.remember {
        let age = Utc::now() - session.created_at;
        if age > chrono::Duration::seconds(state.config.session_ttl_secs as i64) {
            let _ = db.delete_session(&token);
            return Err(ServerError::AccessDenied);
        }
    }

    Ok(session)
}

/// Like [`require_session`], but only for admin-flagged sessions.
pub fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<Session, ServerError> {
    let session = require_session(state, headers)?;
    if !session.is_admin {
        return Err(ServerError::Forbidden("Admin session required".into()));
    }
    Ok(session)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ServerError> {
    let db = state.store()?;

    let account = db.get_account(&req.email).map_err(|e| match e {
        StoreError::NotFound => {
            warn!(email = %req.email, "Login attempt for unknown account");
            ServerError::AccessDenied
        }
        other => ServerError::Store(other),
    })?;

    if !verify_password(&account, &req.password) {
        warn!(email = %req.email, "Login attempt with wrong password");
        return Err(ServerError::AccessDenied);
    }

    let session = Session {
        token: generate_token(),
        email: account.email.clone(),
        is_admin: account.is_admin,
        remember: req.remember,
        created_at: Utc::now(),
    };
    db.create_session(&session)?;

    info!(email = %account.email, remember = req.remember, "Signed in");

    Ok(Json(LoginResponse {
        token: session.token,
        session: SessionInfo {
            email: account.email,
            admin: account.is_admin,
        },
    }))
}

pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ServerError> {
    let Some(token) = bearer_token(&headers) else {
        return Ok(Json(serde_json::json!({ "signed_out": false })));
    };

    let deleted = state.store()?.delete_session(&token)?;
    if deleted {
        info!("Signed out");
    }
    Ok(Json(serde_json::json!({ "signed_out": deleted })))
}

/// Session-change probe: returns the identity behind the bearer token, or
/// 401 when no valid session exists.
pub async fn session_info(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SessionInfo>, ServerError> {
    let session = require_session(&state, &headers)?;
    Ok(Json(SessionInfo {
        email: session.email,
        admin: session.is_admin,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_account(password: &str) -> Account {
        let salt = generate_salt();
        Account {
            email: "c@atelier.example".into(),
            password_hash: hash_password(&salt, password),
            salt,
            is_admin: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn verify_accepts_correct_password() {
        let account = test_account("correct horse");
        assert!(verify_password(&account, "correct horse"));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let account = test_account("correct horse");
        assert!(!verify_password(&account, "battery staple"));
        assert!(!verify_password(&account, ""));
    }

    #[test]
    fn salts_make_hashes_distinct() {
        let a = test_account("same password");
        let b = test_account("same password");
        assert_ne!(a.password_hash, b.password_hash);
    }

    #[test]
    fn tokens_are_long_and_unique() {
        let t1 = generate_token();
        let t2 = generate_token();
        assert_eq!(t1.len(), 64);
        assert_ne!(t1, t2);
    }

    #[test]
    fn bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert!(bearer_token(&headers).is_none());

        headers.insert("authorization", "Bearer abc123".parse().unwrap());
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc123"));

        headers.insert("authorization", "Bearer ".parse().unwrap());
        assert!(bearer_token(&headers).is_none());
    }
}
