//! Application state and HTTP router.

use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    extract::{DefaultBodyLimit, State},
    http::Method,
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use atelier_store::{Database, RecordWatch};

use crate::asset_store::AssetStore;
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::mailer::Mailer;
use crate::notify::NotifyHub;
use crate::throttle::{throttle_middleware, Throttle};
use crate::{auth, content, notify, records};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Mutex<Database>>,
    pub assets: Arc<AssetStore>,
    pub watch: RecordWatch,
    pub notify: NotifyHub,
    pub mailer: Arc<Mailer>,
    pub throttle: Throttle,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(db: Database, assets: AssetStore, config: ServerConfig) -> Self {
        let mailer = Arc::new(Mailer::from_config(&config));
        Self {
            store: Arc::new(Mutex::new(db)),
            assets: Arc::new(assets),
            watch: RecordWatch::new(),
            notify: NotifyHub::new(),
            mailer,
            throttle: Throttle::default(),
            config: Arc::new(config),
        }
    }

    /// Lock the store for one repository call (plus, for mutations, the
    /// snapshot publish that must share the critical section).
    pub fn store(&self) -> Result<MutexGuard<'_, Database>, ServerError> {
        self.store
            .lock()
            .map_err(|e| ServerError::Internal(format!("Store lock poisoned: {e}")))
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    let body_limit = state.config.max_asset_size + 1024 * 1024;

    Router::new()
        .route("/health", get(health_check))
        .route("/info", get(server_info))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/session", get(auth::session_info))
        .route(
            "/records",
            get(records::query_records).post(records::create_record),
        )
        .route(
            "/records/{id}",
            get(records::get_record).delete(records::delete_record),
        )
        .route("/records/{id}/status", put(records::update_status))
        .route(
            "/records/{id}/messages",
            put(records::put_messages).post(records::append_message),
        )
        .route(
            "/records/{id}/assets",
            put(records::put_assets).post(records::upload_asset),
        )
        .route("/records/{id}/watch", get(records::watch_record))
        .route("/assets/{id}/{filename}", get(records::download_asset))
        .route("/posts", get(content::list_posts).post(content::create_post))
        .route(
            "/posts/{id}",
            get(content::fetch_post)
                .put(content::update_post)
                .delete(content::delete_post),
        )
        .route(
            "/projects",
            get(content::list_projects).post(content::create_portfolio_item),
        )
        .route("/projects/{id}", axum::routing::delete(content::delete_portfolio_item))
        .route("/notify/watch", get(notify::watch_notifications))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn_with_state(
            state.throttle.clone(),
            throttle_middleware,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct ServerInfoResponse {
    name: String,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn server_info(State(state): State<AppState>) -> Json<ServerInfoResponse> {
    Json(ServerInfoResponse {
        name: state.config.instance_name.clone(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Bind and serve until the task is cancelled or the listener fails.
pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    serve_on(listener, state).await
}

/// Serve on an already-bound listener. Integration tests use this with an
/// ephemeral port.
pub async fn serve_on(
    listener: tokio::net::TcpListener,
    state: AppState,
) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %listener.local_addr()?, "Starting HTTP API server");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}
