//! # atelier-client
//!
//! Headless client SDK for the Atelier portal.
//!
//! The SDK mirrors the portal surfaces without any presentation layer:
//! - [`session::SessionGuard`] - sign-in/sign-out against the portal's
//!   identity API, with a watchable session state and optional persistence
//!   across restarts
//! - [`dashboard::Dashboard`] - the client-facing view core: locate "the"
//!   record for the signed-in contact, mirror live snapshots, send messages,
//!   upload assets
//! - [`admin::AdminConsole`] - the privileged counterpart writing to the
//!   same records
//! - [`contact::ContactForm`] - the public contact form, submitted to a
//!   third-party relay with a honeypot field
//!
//! Views embed these types and render from the `watch` channels they expose.

pub mod admin;
pub mod contact;
pub mod dashboard;
pub mod http;
pub mod session;
pub mod subscription;

mod error;

pub use error::ClientError;
pub use http::PortalApi;
