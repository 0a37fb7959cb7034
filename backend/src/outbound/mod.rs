//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: PostgreSQL-backed repositories using Diesel ORM
//! - **artifacts**: filesystem storage for rendered certificates
//! - **rendering**: SVG certificate renderer
//!
//! Adapters are thin translators that convert between domain types and
//! infrastructure-specific representations.

pub mod artifacts;
pub mod persistence;
pub mod rendering;
