use thiserror::Error;

/// Errors surfaced by the client SDK.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Invalid credentials or a missing/expired session. The display string
    /// is exactly what the login surface shows.
    #[error("Access Denied")]
    AccessDenied,

    /// The API rejected the request with a structured error body.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Transport-level failure reaching the portal.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A protected operation was attempted without a confirmed session.
    #[error("No active session")]
    NoSession,

    /// A record operation was attempted while the dashboard has no record.
    #[error("No active project record")]
    NoActiveRecord,

    #[error("Message text is empty")]
    EmptyMessage,

    #[error("File is empty")]
    EmptyFile,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ClientError>;
