//! Session guard: the authentication gate in front of every protected view.
//!
//! The guard owns a watchable [`SessionState`]. Views render nothing while
//! the state is [`SessionState::Unknown`], redirect to the login surface on
//! [`SessionState::SignedOut`], and get the caller's identity from
//! [`SessionState::SignedIn`]. There is no retry automation anywhere: a
//! failed identity call simply lands on `SignedOut`.
//!
//! With `remember = true` the bearer token is persisted to the platform
//! config directory, and [`SessionGuard::restore`] resumes the session on
//! the next launch.

use std::path::PathBuf;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use atelier_shared::protocol::SessionInfo;

use crate::error::{ClientError, Result};
use crate::http::PortalApi;

/// Authentication state of the portal client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Not yet determined (initial render: show nothing / a loader).
    Unknown,
    /// Confirmed absence of a session (redirect to login).
    SignedOut,
    /// Confirmed identity.
    SignedIn(SessionInfo),
}

impl SessionState {
    pub fn identity(&self) -> Option<&SessionInfo> {
        match self {
            SessionState::SignedIn(info) => Some(info),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct PersistedSession {
    token: String,
    email: String,
}

pub struct SessionGuard {
    api: PortalApi,
    state: watch::Sender<SessionState>,
    storage_path: Option<PathBuf>,
}

impl SessionGuard {
    /// Guard with the default persistence location
    /// (`<config dir>/atelier/session.json`).
    pub fn new(api: PortalApi) -> Self {
        let storage_path = ProjectDirs::from("com", "atelier", "atelier")
            .map(|dirs| dirs.config_dir().join("session.json"));
        Self::with_storage(api, storage_path)
    }

    /// Guard with an explicit persistence path (`None` disables persistence
    /// entirely). Used by tests and embedders with custom layouts.
    pub fn with_storage(api: PortalApi, storage_path: Option<PathBuf>) -> Self {
        let (state, _) = watch::channel(SessionState::Unknown);
        Self {
            api,
            state,
            storage_path,
        }
    }

    /// Register for session-state change notifications. Dropping the
    /// receiver is the whole teardown.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn current(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn identity(&self) -> Option<SessionInfo> {
        self.current().identity().cloned()
    }

    /// Identity of the signed-in caller, or [`ClientError::NoSession`] -
    /// the signal for a protected view to redirect to login.
    pub fn require(&self) -> Result<SessionInfo> {
        self.identity().ok_or(ClientError::NoSession)
    }

    /// Resume a persisted session, if any.
    ///
    /// A rejected token is cleared; any other provider failure (the portal
    /// being unreachable, say) keeps the token on disk but still lands on
    /// `SignedOut` for this launch.
    pub async fn restore(&self) -> SessionState {
        let Some(persisted) = self.load_persisted() else {
            self.state.send_replace(SessionState::SignedOut);
            return SessionState::SignedOut;
        };

        self.api.set_token(Some(persisted.token));
        match self.api.session().await {
            Ok(info) => {
                info!(email = %info.email, "Session restored");
                let state = SessionState::SignedIn(info);
                self.state.send_replace(state.clone());
                state
            }
            Err(ClientError::AccessDenied) => {
                debug!("Persisted session no longer valid");
                self.api.set_token(None);
                self.clear_persisted();
                self.state.send_replace(SessionState::SignedOut);
                SessionState::SignedOut
            }
            Err(e) => {
                warn!(error = %e, "Session restore failed");
                self.api.set_token(None);
                self.state.send_replace(SessionState::SignedOut);
                SessionState::SignedOut
            }
        }
    }

    /// Email + password sign-in.
    ///
    /// Wrong credentials surface as [`ClientError::AccessDenied`] and never
    /// transition the state to signed-in.
    pub async fn sign_in(
        &self,
        email: &str,
        password: &str,
        remember: bool,
    ) -> Result<SessionInfo> {
        match self.api.login(email, password, remember).await {
            Ok(login) => {
                if remember {
                    self.persist(&login.token, &login.session.email);
                } else {
                    self.clear_persisted();
                }
                self.state
                    .send_replace(SessionState::SignedIn(login.session.clone()));
                Ok(login.session)
            }
            Err(e) => {
                self.state.send_replace(SessionState::SignedOut);
                Err(e)
            }
        }
    }

    /// Revoke the session server-side (best effort) and forget it locally.
    pub async fn sign_out(&self) {
        if let Err(e) = self.api.logout().await {
            warn!(error = %e, "Server-side sign-out failed");
            self.api.set_token(None);
        }
        self.clear_persisted();
        self.state.send_replace(SessionState::SignedOut);
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    fn load_persisted(&self) -> Option<PersistedSession> {
        let path = self.storage_path.as_ref()?;
        let raw = std::fs::read_to_string(path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(persisted) => Some(persisted),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unreadable session file");
                None
            }
        }
    }

    fn persist(&self, token: &str, email: &str) {
        let Some(path) = &self.storage_path else {
            return;
        };
        let persisted = PersistedSession {
            token: token.to_string(),
            email: email.to_string(),
        };
        let write = || -> std::io::Result<()> {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let json = serde_json::to_string(&persisted)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
            std::fs::write(path, json)
        };
        if let Err(e) = write() {
            warn!(path = %path.display(), error = %e, "Failed to persist session");
        }
    }

    fn clear_persisted(&self) {
        let Some(path) = &self.storage_path else {
            return;
        };
        if let Err(e) = std::fs::remove_file(path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path.display(), error = %e, "Failed to clear session file");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_api() -> PortalApi {
        // Nothing listens on port 9; provider calls fail fast.
        PortalApi::new("http://127.0.0.1:9")
    }

    #[tokio::test]
    async fn restore_without_persisted_session_is_signed_out() {
        let guard = SessionGuard::with_storage(unreachable_api(), None);
        assert_eq!(guard.current(), SessionState::Unknown);

        assert_eq!(guard.restore().await, SessionState::SignedOut);
        assert!(guard.require().is_err());
    }

    #[tokio::test]
    async fn provider_failure_during_restore_degrades_to_signed_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, r#"{"token":"tok","email":"c@x.y"}"#).unwrap();

        let guard = SessionGuard::with_storage(unreachable_api(), Some(path.clone()));
        assert_eq!(guard.restore().await, SessionState::SignedOut);

        // A transport failure is not a rejection: the token survives for the
        // next launch.
        assert!(path.exists());
    }

    #[tokio::test]
    async fn failed_sign_in_notifies_watchers_of_signed_out() {
        let guard = SessionGuard::with_storage(unreachable_api(), None);
        let mut rx = guard.subscribe();

        assert!(guard.sign_in("c@x.y", "pw", false).await.is_err());

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), SessionState::SignedOut);
    }

    #[tokio::test]
    async fn corrupt_session_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "not json").unwrap();

        let guard = SessionGuard::with_storage(unreachable_api(), Some(path));
        assert_eq!(guard.restore().await, SessionState::SignedOut);
    }
}
