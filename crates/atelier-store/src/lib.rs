//! # atelier-store
//!
//! Document store for the Atelier portal, backed by SQLite.
//!
//! The crate exposes a synchronous [`Database`] handle that wraps a
//! `rusqlite::Connection` and provides typed repository methods for every
//! collection: `clients` (project records), `posts`, `projects` (portfolio),
//! `accounts`, and `sessions`.
//!
//! Two write contracts exist for the record arrays, deliberately side by
//! side:
//! - whole-array write-back ([`Database::set_messages`] /
//!   [`Database::set_assets`]) - the last-write-wins pattern the portal UIs
//!   use, with its documented lost-update race, and
//! - atomic append ([`Database::append_message`] /
//!   [`Database::append_asset`]) - the corrected primitive, implemented as a
//!   single SQL statement so concurrent appends cannot clobber each other.
//!
//! [`watch::RecordWatch`] is the in-process hub that fans each committed
//! record snapshot out to live subscribers.

pub mod accounts;
pub mod database;
pub mod migrations;
pub mod models;
pub mod portfolio;
pub mod posts;
pub mod records;
pub mod watch;

mod error;

pub use database::Database;
pub use error::StoreError;
pub use models::*;
pub use watch::RecordWatch;
