//! SQLite backend for the Préfecture portal.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every guarded write is a single
//! statement inside a transaction, which makes the dedicated thread the
//! serialisation point for concurrent requests.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
