//! # atelier-server
//!
//! HTTP backend for the Atelier client portal.
//!
//! This crate provides:
//! - **Auth/session API** (email + password sign-in, bearer sessions with a
//!   "remember across restarts" mode)
//! - **Project record API**: contact-address lookup, field-level status
//!   updates, whole-array message/asset write-back, atomic append, and an
//!   SSE live subscription per record
//! - **Asset storage** on disk under `clients/{record_id}/{filename}` with
//!   durable download URLs (same-name uploads overwrite: last write wins)
//! - **Content API** for blog posts (with an atomic view counter) and the
//!   portfolio
//! - **Admin push notifications** over SSE and a transactional-email
//!   notifier for freshly uploaded assets
//! - **Per-IP request throttling** to protect against abuse
//!
//! The library half exists so integration tests can boot the real server on
//! an ephemeral port; `main.rs` is a thin binary around it.

pub mod api;
pub mod asset_store;
pub mod auth;
pub mod config;
pub mod content;
pub mod error;
pub mod mailer;
pub mod notify;
pub mod records;
pub mod sse;
pub mod throttle;

pub use api::AppState;
pub use config::ServerConfig;
pub use error::ServerError;
