//! Core types, engine and trait definitions for the Préfecture portal.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage, blob hosting and notification delivery are reached through the
//! [`store::PortalStore`], [`blob::BlobStore`] and [`notify::Notifier`]
//! traits; the other crates of the workspace provide implementations.

pub mod blob;
pub mod catalog;
pub mod document;
pub mod error;
pub mod lifecycle;
pub mod notify;
pub mod portal;
pub mod profile;
pub mod question;
pub mod reaction;
pub mod reactions;
pub mod session;
pub mod store;

pub use catalog::Catalog;
pub use error::{Denial, Error, Resource, Result};
pub use portal::Portal;
