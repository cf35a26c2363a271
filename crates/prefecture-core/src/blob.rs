//! The `BlobStore` trait: where document bytes live.

use std::{future::Future, time::Duration};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A time-limited download address for a blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedLink {
  pub url:        String,
  pub expires_at: DateTime<Utc>,
}

/// Object storage keyed by relative path.
pub trait BlobStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Store `bytes` at `path`, refusing to overwrite. Returns the durable
  /// reference URL of the blob.
  fn put<'a>(
    &'a self,
    path: &'a str,
    bytes: Bytes,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + 'a;

  /// Remove the blob at `path`. Removing a missing blob is not an error.
  fn remove<'a>(
    &'a self,
    path: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Derive a signed URL for `path` valid for `ttl`.
  fn sign(&self, path: &str, ttl: Duration) -> Result<SignedLink, Self::Error>;
}
