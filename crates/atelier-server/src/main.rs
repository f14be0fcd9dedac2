//! Portal server binary: load configuration, open the store, seed the admin
//! account, and serve the HTTP API until Ctrl+C.

use std::time::Duration;

use tracing::info;
use tracing_subscriber::EnvFilter;

use atelier_server::api::{self, AppState};
use atelier_server::asset_store::AssetStore;
use atelier_server::auth;
use atelier_server::config::ServerConfig;
use atelier_store::Database;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,atelier_server=debug")),
        )
        .init();

    info!("Starting Atelier portal server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Initialize subsystems
    // -----------------------------------------------------------------------
    let db = match &config.database_path {
        Some(path) => Database::open_at(path)?,
        None => Database::open_default()?,
    };

    if let Some(password) = &config.admin_password {
        auth::ensure_account(&db, &config.admin_email, password, true)?;
    } else {
        tracing::warn!("ADMIN_PASSWORD not set, no admin account seeded");
    }

    let assets =
        AssetStore::new(config.asset_storage_path.clone(), config.max_asset_size).await?;

    let http_addr = config.http_addr;
    let state = AppState::new(db, assets, config);

    // -----------------------------------------------------------------------
    // 4. Spawn background tasks
    // -----------------------------------------------------------------------

    // Periodic purge of expired non-remembered sessions (every 10 minutes).
    let purge_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(600));
        loop {
            interval.tick().await;
            let ttl = chrono::Duration::seconds(purge_state.config.session_ttl_secs as i64);
            let purged = purge_state
                .store()
                .and_then(|db| db.purge_expired_sessions(ttl).map_err(Into::into));
            match purged {
                Ok(0) => {}
                Ok(n) => info!(purged = n, "Purged expired sessions"),
                Err(e) => tracing::error!(error = %e, "Session purge failed"),
            }
        }
    });

    // Periodic throttle cleanup (every 5 minutes, drop windows idle >10 min).
    let throttle = state.throttle.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(300));
        loop {
            interval.tick().await;
            throttle.purge_stale(Duration::from_secs(600)).await;
        }
    });

    // -----------------------------------------------------------------------
    // 5. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
