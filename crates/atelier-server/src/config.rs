//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Server configuration.
#[derive(Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// Explicit database file path. When unset, the platform data directory
    /// is used.
    /// Env: `DATABASE_PATH`
    pub database_path: Option<PathBuf>,

    /// Filesystem path where uploaded assets are stored.
    /// Env: `ASSET_STORAGE_PATH`
    /// Default: `./assets`
    pub asset_storage_path: PathBuf,

    /// Maximum asset size in bytes (50 MiB).
    pub max_asset_size: usize,

    /// Base URL used to mint durable asset download references.
    /// Env: `PUBLIC_BASE_URL`
    /// Default: `http://127.0.0.1:8080`
    pub public_base_url: String,

    /// Human-readable name for this portal instance.
    /// Env: `INSTANCE_NAME`
    /// Default: `"Atelier Studio"`
    pub instance_name: String,

    /// Admin account seeded at startup (when `ADMIN_PASSWORD` is set).
    /// Env: `ADMIN_EMAIL`
    /// Default: `studio@atelier.example`
    pub admin_email: String,

    /// Password for the seeded admin account. No seeding when unset.
    /// Env: `ADMIN_PASSWORD`
    pub admin_password: Option<String>,

    /// Lifetime of non-remembered sessions, in seconds.
    /// Env: `SESSION_TTL_SECS`
    /// Default: 86400 (one day)
    pub session_ttl_secs: u64,

    /// Transactional email API endpoint. Mail is disabled when unset.
    /// Env: `MAIL_API_URL`
    pub mail_api_url: Option<String>,

    /// Bearer key for the mail API.
    /// Env: `MAIL_API_KEY`
    pub mail_api_key: String,

    /// Sender address for outgoing notifications.
    /// Env: `MAIL_FROM`
    /// Default: `Atelier Studio <no-reply@atelier.example>`
    pub mail_from: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], 8080).into(),
            database_path: None,
            asset_storage_path: PathBuf::from("./assets"),
            max_asset_size: 50 * 1024 * 1024, // 50 MiB
            public_base_url: "http://127.0.0.1:8080".to_string(),
            instance_name: "Atelier Studio".to_string(),
            admin_email: "studio@atelier.example".to_string(),
            admin_password: None,
            session_ttl_secs: 86_400,
            mail_api_url: None,
            mail_api_key: String::new(),
            mail_from: "Atelier Studio <no-reply@atelier.example>".to_string(),
        }
    }
}

// Manual Debug so credentials never end up in logs.
impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("http_addr", &self.http_addr)
            .field("database_path", &self.database_path)
            .field("asset_storage_path", &self.asset_storage_path)
            .field("max_asset_size", &self.max_asset_size)
            .field("public_base_url", &self.public_base_url)
            .field("instance_name", &self.instance_name)
            .field("admin_email", &self.admin_email)
            .field("admin_password", &self.admin_password.as_ref().map(|_| "<set>"))
            .field("session_ttl_secs", &self.session_ttl_secs)
            .field("mail_api_url", &self.mail_api_url)
            .field("mail_from", &self.mail_from)
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(
                    value = %addr,
                    "Invalid HTTP_ADDR, using default"
                );
            }
        }

        if let Ok(path) = std::env::var("DATABASE_PATH") {
            config.database_path = Some(PathBuf::from(path));
        }

        if let Ok(path) = std::env::var("ASSET_STORAGE_PATH") {
            config.asset_storage_path = PathBuf::from(path);
        }

        if let Ok(url) = std::env::var("PUBLIC_BASE_URL") {
            config.public_base_url = url.trim_end_matches('/').to_string();
        }

        if let Ok(name) = std::env::var("INSTANCE_NAME") {
            config.instance_name = name;
        }

        if let Ok(email) = std::env::var("ADMIN_EMAIL") {
            config.admin_email = email;
        }

        if let Ok(password) = std::env::var("ADMIN_PASSWORD") {
            if !password.is_empty() {
                config.admin_password = Some(password);
            }
        }

        if let Ok(val) = std::env::var("SESSION_TTL_SECS") {
            if let Ok(n) = val.parse::<u64>() {
                config.session_ttl_secs = n;
            }
        }

        if let Ok(url) = std::env::var("MAIL_API_URL") {
            if !url.is_empty() {
                config.mail_api_url = Some(url);
            }
        }

        if let Ok(key) = std::env::var("MAIL_API_KEY") {
            config.mail_api_key = key;
        }

        if let Ok(from) = std::env::var("MAIL_FROM") {
            config.mail_from = from;
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}
