//! Domain model structs for the portal.
//!
//! Every struct derives `Serialize` and `Deserialize` so the same shape is
//! used in the store, over the HTTP API, and in SSE snapshot frames.
//! Missing fields are normalized here, at the model boundary, rather than
//! at every call site: arrays default to empty, `progress` to 0, and a
//! portfolio item without an `order` sorts last.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{PostId, RecordId, SenderTag};

// ---------------------------------------------------------------------------
// Project record
// ---------------------------------------------------------------------------

/// One entry in a record's message log.
///
/// Entries are append-only: no documented flow ever mutates, removes, or
/// reorders them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageEntry {
    pub sender: SenderTag,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// One entry in a record's asset log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssetEntry {
    /// Original file name (also the storage key within the record's folder).
    pub name: String,
    /// Durable, publicly fetchable download reference.
    pub url: String,
    pub uploader: SenderTag,
    pub timestamp: DateTime<Utc>,
}

/// The per-client document backing both the dashboard and the admin console.
///
/// The `messages` and `assets` arrays are the only shared mutable state with
/// more than one writer. Whole-array write-back (the read-modify-write
/// pattern) is last-write-wins; see the store crate for the atomic append
/// alternative.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectRecord {
    pub id: RecordId,
    /// Lookup key from an authenticated session to its record. Assumed
    /// unique; the store does not enforce it.
    pub contact_email: String,
    /// Free-text display status label.
    #[serde(default)]
    pub status: String,
    /// 0-100 by convention, not clamped anywhere.
    #[serde(default)]
    pub progress: i64,
    #[serde(default)]
    pub due_date: String,
    #[serde(default)]
    pub next_milestone: String,
    #[serde(default)]
    pub staging_url: Option<String>,
    #[serde(default)]
    pub payment_url: Option<String>,
    #[serde(default)]
    pub messages: Vec<MessageEntry>,
    #[serde(default)]
    pub assets: Vec<AssetEntry>,
    pub created_at: DateTime<Utc>,
}

impl ProjectRecord {
    /// A fresh record for a contact address, with every display field at its
    /// stated default.
    pub fn new(contact_email: impl Into<String>) -> Self {
        Self {
            id: RecordId::new(),
            contact_email: contact_email.into(),
            status: String::new(),
            progress: 0,
            due_date: String::new(),
            next_milestone: String::new(),
            staging_url: None,
            payment_url: None,
            messages: Vec::new(),
            assets: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Blog post
// ---------------------------------------------------------------------------

/// A journal entry. Created and edited through the admin console, read-only
/// everywhere else.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Post {
    pub id: PostId,
    pub title: String,
    #[serde(default)]
    pub category: String,
    /// Display date string, kept verbatim as entered.
    #[serde(default)]
    pub date: String,
    /// Newline-delimited paragraphs.
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    /// Incremented atomically by the store on every public fetch.
    #[serde(default)]
    pub views: i64,
    pub created_at: DateTime<Utc>,
}

impl Post {
    /// Split the body into its non-empty paragraphs.
    pub fn paragraphs(&self) -> impl Iterator<Item = &str> {
        self.body.split('\n').map(str::trim).filter(|p| !p.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Portfolio item
// ---------------------------------------------------------------------------

/// A public portfolio entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PortfolioItem {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub image: Option<String>,
    /// Explicit display position. Items without one sort last.
    #[serde(default)]
    pub order: Option<i64>,
}

impl PortfolioItem {
    /// Sort key with missing `order` defaulting to the lowest priority.
    pub fn sort_key(&self) -> i64 {
        self.order.unwrap_or(i64::MAX)
    }
}

/// Sort portfolio items by their explicit order, missing values last,
/// ties broken by title so the result is stable across loads.
pub fn sort_portfolio(items: &mut [PortfolioItem]) {
    items.sort_by(|a, b| {
        a.sort_key()
            .cmp(&b.sort_key())
            .then_with(|| a.title.cmp(&b.title))
    });
}
