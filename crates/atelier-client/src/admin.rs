//! The admin console core: the privileged, symmetric writer.
//!
//! Everything the dashboard reads, the console can write: status fields,
//! the message log (as `agency`), and the asset log. Array writes use the
//! same read-modify-write pattern as the dashboard - here the "read" is a
//! fresh fetch rather than a mirrored snapshot, but the hazard is identical
//! when a client and an operator write concurrently.

use chrono::Utc;

use atelier_shared::models::{AssetEntry, MessageEntry, PortfolioItem, Post, ProjectRecord};
use atelier_shared::protocol::{PortfolioInput, PostInput, SessionInfo, StatusUpdate};
use atelier_shared::types::{PostId, RecordId, SenderTag};
use uuid::Uuid;

use crate::error::{ClientError, Result};
use crate::http::PortalApi;
use crate::subscription::{NotificationFeed, RecordSubscription};

pub struct AdminConsole {
    api: PortalApi,
}

impl AdminConsole {
    /// Build the console for a confirmed identity. Non-admin identities are
    /// turned away here, before any privileged call is attempted.
    pub fn new(api: PortalApi, identity: &SessionInfo) -> Result<Self> {
        if !identity.admin {
            return Err(ClientError::AccessDenied);
        }
        Ok(Self { api })
    }

    // ------------------------------------------------------------------
    // Records
    // ------------------------------------------------------------------

    /// All project records, unfiltered.
    pub async fn list_records(&self) -> Result<Vec<ProjectRecord>> {
        self.api.list_records().await
    }

    pub async fn record(&self, id: RecordId) -> Result<ProjectRecord> {
        self.api.get_record(id).await
    }

    /// Open a record for a new client.
    pub async fn open_record(&self, contact_email: &str) -> Result<ProjectRecord> {
        self.api.create_record(contact_email).await
    }

    pub async fn delete_record(&self, id: RecordId) -> Result<()> {
        self.api.delete_record(id).await
    }

    /// Field-level status/progress/links update.
    pub async fn update_status(
        &self,
        id: RecordId,
        update: &StatusUpdate,
    ) -> Result<ProjectRecord> {
        self.api.update_status(id, update).await
    }

    /// Append a message as the agency: fresh read, local append, whole-array
    /// write-back.
    pub async fn send_message(&self, id: RecordId, text: &str) -> Result<Vec<MessageEntry>> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ClientError::EmptyMessage);
        }

        let record = self.api.get_record(id).await?;
        let mut messages = record.messages;
        messages.push(MessageEntry {
            sender: SenderTag::Agency,
            text: text.to_string(),
            timestamp: Utc::now(),
        });
        self.api.put_messages(id, &messages).await?;

        Ok(messages)
    }

    /// Upload a deliverable for the client. Same three-step flow as the
    /// dashboard upload, with `uploader = agency` (which is what triggers
    /// the email notice to the client).
    pub async fn upload_asset(
        &self,
        id: RecordId,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<AssetEntry> {
        if bytes.is_empty() {
            return Err(ClientError::EmptyFile);
        }

        let uploaded = self.api.upload_asset(id, file_name, bytes).await?;

        let entry = AssetEntry {
            name: uploaded.name,
            url: uploaded.url,
            uploader: SenderTag::Agency,
            timestamp: Utc::now(),
        };

        let record = self.api.get_record(id).await?;
        let mut assets = record.assets;
        assets.push(entry.clone());
        self.api.put_assets(id, &assets).await?;

        Ok(entry)
    }

    /// Live view of one record while it is open in the console.
    pub fn watch_record(&self, id: RecordId) -> RecordSubscription {
        RecordSubscription::open(self.api.clone(), id)
    }

    /// Background notification feed (new client messages and uploads).
    pub fn notifications(&self) -> NotificationFeed {
        NotificationFeed::open(self.api.clone())
    }

    // ------------------------------------------------------------------
    // Content management
    // ------------------------------------------------------------------

    pub async fn publish_post(&self, input: &PostInput) -> Result<Post> {
        self.api.create_post(input).await
    }

    pub async fn revise_post(&self, id: PostId, input: &PostInput) -> Result<Post> {
        self.api.update_post(id, input).await
    }

    pub async fn delete_post(&self, id: PostId) -> Result<()> {
        self.api.delete_post(id).await
    }

    pub async fn add_portfolio_item(&self, input: &PortfolioInput) -> Result<PortfolioItem> {
        self.api.create_portfolio_item(input).await
    }

    pub async fn remove_portfolio_item(&self, id: Uuid) -> Result<()> {
        self.api.delete_portfolio_item(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_admin_identities_are_rejected() {
        let api = PortalApi::new("http://127.0.0.1:9");
        let identity = SessionInfo {
            email: "c@x.y".into(),
            admin: false,
        };
        assert!(matches!(
            AdminConsole::new(api, &identity),
            Err(ClientError::AccessDenied)
        ));
    }
}
