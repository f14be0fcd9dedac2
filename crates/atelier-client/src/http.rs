//! Typed HTTP client for the portal API.
//!
//! [`PortalApi`] is cheap to clone; clones share the bearer token, so a
//! [`crate::session::SessionGuard`] signing in makes every surface built on
//! the same instance authenticated at once.

use std::sync::{Arc, RwLock};

use reqwest::RequestBuilder;
use uuid::Uuid;

use atelier_shared::models::{AssetEntry, MessageEntry, PortfolioItem, Post, ProjectRecord};
use atelier_shared::protocol::{
    CreateRecord, ErrorBody, LoginRequest, LoginResponse, NewMessage, PortfolioInput, PostInput,
    SessionInfo, StatusUpdate, UploadResponse,
};
use atelier_shared::types::{PostId, RecordId};

use crate::error::{ClientError, Result};

#[derive(Clone)]
pub struct PortalApi {
    http: reqwest::Client,
    base_url: String,
    token: Arc<RwLock<Option<String>>>,
}

impl PortalApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: Arc::new(RwLock::new(None)),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn set_token(&self, token: Option<String>) {
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = token;
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Map non-success statuses onto the client error taxonomy.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ClientError::AccessDenied);
        }
        let message = response
            .json::<ErrorBody>()
            .await
            .map(|body| body.error)
            .unwrap_or_else(|_| status.to_string());
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    // ------------------------------------------------------------------
    // Auth
    // ------------------------------------------------------------------

    pub async fn login(
        &self,
        email: &str,
        password: &str,
        remember: bool,
    ) -> Result<LoginResponse> {
        let response = self
            .http
            .post(self.url("/auth/login"))
            .json(&LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
                remember,
            })
            .send()
            .await?;
        let login: LoginResponse = Self::check(response).await?.json().await?;
        self.set_token(Some(login.token.clone()));
        Ok(login)
    }

    pub async fn logout(&self) -> Result<()> {
        let response = self
            .authorize(self.http.post(self.url("/auth/logout")))
            .send()
            .await?;
        Self::check(response).await?;
        self.set_token(None);
        Ok(())
    }

    pub async fn session(&self) -> Result<SessionInfo> {
        let response = self
            .authorize(self.http.get(self.url("/auth/session")))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    // ------------------------------------------------------------------
    // Records
    // ------------------------------------------------------------------

    /// Equality-filtered lookup by contact address, in store order.
    pub async fn find_records(&self, contact: &str) -> Result<Vec<ProjectRecord>> {
        let response = self
            .authorize(self.http.get(self.url("/records")))
            .query(&[("contact", contact)])
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Unfiltered listing (admin only).
    pub async fn list_records(&self) -> Result<Vec<ProjectRecord>> {
        let response = self
            .authorize(self.http.get(self.url("/records")))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    pub async fn get_record(&self, id: RecordId) -> Result<ProjectRecord> {
        let response = self
            .authorize(self.http.get(self.url(&format!("/records/{id}"))))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    pub async fn create_record(&self, contact_email: &str) -> Result<ProjectRecord> {
        let response = self
            .authorize(self.http.post(self.url("/records")))
            .json(&CreateRecord {
                contact_email: contact_email.to_string(),
            })
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    pub async fn delete_record(&self, id: RecordId) -> Result<()> {
        let response = self
            .authorize(self.http.delete(self.url(&format!("/records/{id}"))))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    pub async fn update_status(
        &self,
        id: RecordId,
        update: &StatusUpdate,
    ) -> Result<ProjectRecord> {
        let response = self
            .authorize(self.http.put(self.url(&format!("/records/{id}/status"))))
            .json(update)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Whole-array write-back of the message log (read-modify-write).
    pub async fn put_messages(
        &self,
        id: RecordId,
        messages: &[MessageEntry],
    ) -> Result<ProjectRecord> {
        let response = self
            .authorize(self.http.put(self.url(&format!("/records/{id}/messages"))))
            .json(&messages)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Atomic message append (the corrected primitive).
    pub async fn append_message(&self, id: RecordId, message: &NewMessage) -> Result<MessageEntry> {
        let response = self
            .authorize(self.http.post(self.url(&format!("/records/{id}/messages"))))
            .json(message)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Whole-array write-back of the asset log (read-modify-write).
    pub async fn put_assets(&self, id: RecordId, assets: &[AssetEntry]) -> Result<ProjectRecord> {
        let response = self
            .authorize(self.http.put(self.url(&format!("/records/{id}/assets"))))
            .json(&assets)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Store a blob under the record and mint its durable download URL.
    pub async fn upload_asset(
        &self,
        id: RecordId,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadResponse> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .authorize(self.http.post(self.url(&format!("/records/{id}/assets"))))
            .multipart(form)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Fetch a durable download reference (absolute URL).
    pub async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.http.get(url).send().await?;
        Ok(Self::check(response).await?.bytes().await?.to_vec())
    }

    // ------------------------------------------------------------------
    // Content
    // ------------------------------------------------------------------

    pub async fn list_posts(&self) -> Result<Vec<Post>> {
        let response = self.http.get(self.url("/posts")).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Public read; the server bumps the post's view counter.
    pub async fn fetch_post(&self, id: PostId) -> Result<Post> {
        let response = self.http.get(self.url(&format!("/posts/{id}"))).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    pub async fn create_post(&self, input: &PostInput) -> Result<Post> {
        let response = self
            .authorize(self.http.post(self.url("/posts")))
            .json(input)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    pub async fn update_post(&self, id: PostId, input: &PostInput) -> Result<Post> {
        let response = self
            .authorize(self.http.put(self.url(&format!("/posts/{id}"))))
            .json(input)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    pub async fn delete_post(&self, id: PostId) -> Result<()> {
        let response = self
            .authorize(self.http.delete(self.url(&format!("/posts/{id}"))))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    pub async fn list_projects(&self) -> Result<Vec<PortfolioItem>> {
        let response = self.http.get(self.url("/projects")).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    pub async fn create_portfolio_item(&self, input: &PortfolioInput) -> Result<PortfolioItem> {
        let response = self
            .authorize(self.http.post(self.url("/projects")))
            .json(input)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    pub async fn delete_portfolio_item(&self, id: Uuid) -> Result<()> {
        let response = self
            .authorize(self.http.delete(self.url(&format!("/projects/{id}"))))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Event streams
    // ------------------------------------------------------------------

    /// Open an SSE response for the subscription pumps.
    pub(crate) async fn open_event_stream(&self, path: &str) -> Result<reqwest::Response> {
        let response = self
            .authorize(self.http.get(self.url(path)))
            .header("accept", "text/event-stream")
            .send()
            .await?;
        Self::check(response).await
    }
}
