#![allow(dead_code)]

//! Test harness: boots the real portal server on an ephemeral port with a
//! throwaway database, a seeded admin account, and a seeded client account.

use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::watch;

use atelier_client::PortalApi;
use atelier_server::api::{self, AppState};
use atelier_server::asset_store::AssetStore;
use atelier_server::auth;
use atelier_server::config::ServerConfig;
use atelier_shared::models::ProjectRecord;
use atelier_store::Database;

pub const ADMIN_EMAIL: &str = "studio@atelier.example";
pub const ADMIN_PASSWORD: &str = "studio-pass";
pub const CLIENT_EMAIL: &str = "client@example.com";
pub const CLIENT_PASSWORD: &str = "client-pass";

pub struct TestPortal {
    pub base_url: String,
    pub state: AppState,
    _dir: TempDir,
    task: tokio::task::JoinHandle<()>,
}

impl TestPortal {
    pub async fn start() -> Self {
        let dir = TempDir::new().unwrap();

        let db = Database::open_at(&dir.path().join("portal.db")).unwrap();
        auth::ensure_account(&db, ADMIN_EMAIL, ADMIN_PASSWORD, true).unwrap();
        auth::ensure_account(&db, CLIENT_EMAIL, CLIENT_PASSWORD, false).unwrap();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let assets = AssetStore::new(dir.path().join("assets"), 1024 * 1024)
            .await
            .unwrap();

        let config = ServerConfig {
            http_addr: addr,
            public_base_url: format!("http://{addr}"),
            ..Default::default()
        };
        let state = AppState::new(db, assets, config);

        let serve_state = state.clone();
        let task = tokio::spawn(async move {
            let _ = api::serve_on(listener, serve_state).await;
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
            _dir: dir,
            task,
        }
    }

    pub fn api(&self) -> PortalApi {
        PortalApi::new(&self.base_url)
    }
}

impl Drop for TestPortal {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Wait (with a timeout) until the mirrored snapshot satisfies `pred`.
pub async fn wait_for_snapshot<F>(
    rx: &mut watch::Receiver<Option<ProjectRecord>>,
    mut pred: F,
) -> ProjectRecord
where
    F: FnMut(&ProjectRecord) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Some(record) = rx.borrow().clone() {
                if pred(&record) {
                    return record;
                }
            }
            rx.changed().await.expect("subscription closed");
        }
    })
    .await
    .expect("timed out waiting for a matching snapshot")
}
