//! # atelier-shared
//!
//! Domain model types shared by the Atelier portal store, server, and
//! client SDK.
//!
//! The portal revolves around one document per client (the
//! [`models::ProjectRecord`]) plus two read-mostly content collections
//! (blog posts and portfolio items). Everything that crosses the wire or
//! the storage boundary lives here so that all three crates agree on a
//! single, explicitly-defaulted shape.

pub mod models;
pub mod protocol;
pub mod types;
