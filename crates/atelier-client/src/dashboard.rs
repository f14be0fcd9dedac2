//! The client dashboard core.
//!
//! View state machine: `Loading → NoRecord | RecordActive`. Locating runs
//! one equality-filtered query on the signed-in contact address; an empty
//! result is the normal `NoRecord` state (not an error, and no subscription
//! is opened), a failed query logs and degrades to `NoRecord`, and a
//! non-empty result takes the first record in store order and opens the
//! live subscription on it.
//!
//! `send_message` and `upload_asset` implement the read-modify-write
//! contract over the *most recently mirrored snapshot*: they clone its
//! array, append locally, and write the whole array back. If another writer
//! committed in between, that write is overwritten - the documented
//! lost-update hazard of the pattern.

use chrono::Utc;
use tokio::sync::watch;
use tracing::error;

use atelier_shared::models::{AssetEntry, MessageEntry, ProjectRecord};
use atelier_shared::protocol::SessionInfo;
use atelier_shared::types::{RecordId, SenderTag};

use crate::error::{ClientError, Result};
use crate::http::PortalApi;
use crate::subscription::RecordSubscription;

/// Dashboard view state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardState {
    Loading,
    /// No record matches the contact address: render the empty state.
    NoRecord,
    /// A record was located and its live subscription is running.
    RecordActive(RecordId),
}

pub struct Dashboard {
    api: PortalApi,
    identity: SessionInfo,
    state: watch::Sender<DashboardState>,
    subscription: Option<RecordSubscription>,
    uploading: watch::Sender<bool>,
}

impl Dashboard {
    /// Build the dashboard for a confirmed identity (from the session
    /// guard). The state starts at `Loading` until [`Self::locate`] runs.
    pub fn new(api: PortalApi, identity: SessionInfo) -> Self {
        let (state, _) = watch::channel(DashboardState::Loading);
        let (uploading, _) = watch::channel(false);
        Self {
            api,
            identity,
            state,
            subscription: None,
            uploading,
        }
    }

    pub fn identity(&self) -> &SessionInfo {
        &self.identity
    }

    pub fn state(&self) -> DashboardState {
        self.state.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<DashboardState> {
        self.state.subscribe()
    }

    /// `true` while an asset upload is in flight.
    pub fn uploading(&self) -> watch::Receiver<bool> {
        self.uploading.subscribe()
    }

    /// Map the signed-in contact address to its record and start mirroring
    /// it. Re-running replaces any previous subscription.
    pub async fn locate(&mut self) -> DashboardState {
        self.close();
        self.state.send_replace(DashboardState::Loading);

        let records = match self.api.find_records(&self.identity.email).await {
            Ok(records) => records,
            Err(e) => {
                // Query failures degrade to the empty state; no retry.
                error!(contact = %self.identity.email, error = %e, "Record lookup failed");
                self.state.send_replace(DashboardState::NoRecord);
                return DashboardState::NoRecord;
            }
        };

        // Multiple matches are possible (uniqueness is assumed, not
        // enforced); the first in store order is "the" record.
        let Some(record) = records.into_iter().next() else {
            self.state.send_replace(DashboardState::NoRecord);
            return DashboardState::NoRecord;
        };

        let id = record.id;
        self.subscription = Some(RecordSubscription::open(self.api.clone(), id));

        let state = DashboardState::RecordActive(id);
        self.state.send_replace(state.clone());
        state
    }

    /// The most recently mirrored snapshot of the active record.
    pub fn record(&self) -> Option<ProjectRecord> {
        self.subscription.as_ref().and_then(|sub| sub.latest())
    }

    /// Receiver over mirrored snapshots, for reactive rendering.
    pub fn watch_record(&self) -> Option<watch::Receiver<Option<ProjectRecord>>> {
        self.subscription.as_ref().map(|sub| sub.receiver())
    }

    /// Append a message to the record's log as the client.
    ///
    /// On success the returned array is what was written; the caller clears
    /// the input field and scrolls to the newest entry.
    pub async fn send_message(&self, text: &str) -> Result<Vec<MessageEntry>> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ClientError::EmptyMessage);
        }
        let record = self.record().ok_or(ClientError::NoActiveRecord)?;

        let mut messages = record.messages;
        messages.push(MessageEntry {
            sender: SenderTag::Client,
            text: text.to_string(),
            timestamp: Utc::now(),
        });
        self.api.put_messages(record.id, &messages).await?;

        Ok(messages)
    }

    /// Upload a file to the record's asset folder and append its metadata.
    ///
    /// Sequential steps, each independently failable: (1) store the blob -
    /// same-name uploads overwrite, last write wins; (2) receive the durable
    /// download reference; (3) write the extended asset array back. Failing
    /// before (3) leaves the record untouched; failing *at* (3) leaves an
    /// orphaned blob with no metadata entry.
    pub async fn upload_asset(&self, file_name: &str, bytes: Vec<u8>) -> Result<AssetEntry> {
        if bytes.is_empty() {
            return Err(ClientError::EmptyFile);
        }
        let record = self.record().ok_or(ClientError::NoActiveRecord)?;

        self.uploading.send_replace(true);
        let result = self.upload_inner(record, file_name, bytes).await;
        self.uploading.send_replace(false);
        result
    }

    async fn upload_inner(
        &self,
        record: ProjectRecord,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<AssetEntry> {
        let uploaded = self.api.upload_asset(record.id, file_name, bytes).await?;

        let entry = AssetEntry {
            name: uploaded.name,
            url: uploaded.url,
            uploader: SenderTag::Client,
            timestamp: Utc::now(),
        };

        let mut assets = record.assets;
        assets.push(entry.clone());
        self.api.put_assets(record.id, &assets).await?;

        Ok(entry)
    }

    /// Tear down the live subscription (also runs on drop via the
    /// subscription's own drop guard).
    pub fn close(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.cancel();
        }
    }
}
