//! [`FsBlobStore`]: document bytes on the local filesystem, served back
//! through HMAC-signed, expiring `/files/...` URLs.

use std::{
  io::ErrorKind,
  path::{Component, Path, PathBuf},
  time::Duration,
};

use bytes::Bytes;
use chrono::Utc;
use hmac::{Hmac, Mac};
use prefecture_core::blob::{BlobStore, SignedLink};
use sha2::Sha256;
use thiserror::Error;
use tokio::io::AsyncWriteExt as _;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum BlobError {
  #[error("blob i/o error: {0}")]
  Io(#[from] std::io::Error),

  #[error("invalid blob path: {0:?}")]
  InvalidPath(String),

  #[error("link lifetime out of range")]
  InvalidTtl,

  #[error("signing key rejected")]
  InvalidKey,

  #[error("signature does not match")]
  BadSignature,

  #[error("link has expired")]
  Expired,
}

/// Blobs stored under `root`, addressed by relative path.
#[derive(Clone)]
pub struct FsBlobStore {
  root:     PathBuf,
  base_url: String,
  secret:   Vec<u8>,
}

impl FsBlobStore {
  pub fn new(root: impl Into<PathBuf>, base_url: &str, secret: impl AsRef<[u8]>) -> Self {
    Self {
      root:     root.into(),
      base_url: base_url.trim_end_matches('/').to_owned(),
      secret:   secret.as_ref().to_vec(),
    }
  }

  /// Map a relative blob path onto the filesystem, refusing anything that
  /// could escape `root`.
  fn resolve(&self, path: &str) -> Result<PathBuf, BlobError> {
    let rel = Path::new(path);
    let clean = !path.is_empty()
      && rel.components().all(|c| matches!(c, Component::Normal(_)));
    if !clean {
      return Err(BlobError::InvalidPath(path.to_owned()));
    }
    Ok(self.root.join(rel))
  }

  fn mac(&self, path: &str, expires: i64) -> Result<HmacSha256, BlobError> {
    let mut mac =
      HmacSha256::new_from_slice(&self.secret).map_err(|_| BlobError::InvalidKey)?;
    mac.update(path.as_bytes());
    mac.update(b"\n");
    mac.update(expires.to_string().as_bytes());
    Ok(mac)
  }

  /// Check a signature produced by [`BlobStore::sign`].
  pub fn verify(&self, path: &str, expires: i64, sig: &str) -> Result<(), BlobError> {
    let sig = hex::decode(sig).map_err(|_| BlobError::BadSignature)?;
    self
      .mac(path, expires)?
      .verify_slice(&sig)
      .map_err(|_| BlobError::BadSignature)?;
    if Utc::now().timestamp() > expires {
      return Err(BlobError::Expired);
    }
    Ok(())
  }

  /// Read a whole blob into memory.
  pub async fn read(&self, path: &str) -> Result<Bytes, BlobError> {
    let full = self.resolve(path)?;
    Ok(Bytes::from(tokio::fs::read(full).await?))
  }
}

impl BlobStore for FsBlobStore {
  type Error = BlobError;

  async fn put(&self, path: &str, bytes: Bytes) -> Result<String, BlobError> {
    let full = self.resolve(path)?;
    if let Some(parent) = full.parent() {
      tokio::fs::create_dir_all(parent).await?;
    }
    let mut file = tokio::fs::OpenOptions::new()
      .write(true)
      .create_new(true)
      .open(&full)
      .await?;
    file.write_all(&bytes).await?;
    file.flush().await?;
    Ok(format!("{}/files/{path}", self.base_url))
  }

  async fn remove(&self, path: &str) -> Result<(), BlobError> {
    let full = self.resolve(path)?;
    match tokio::fs::remove_file(full).await {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
      Err(e) => Err(e.into()),
    }
  }

  fn sign(&self, path: &str, ttl: Duration) -> Result<SignedLink, BlobError> {
    self.resolve(path)?;
    let ttl = chrono::Duration::from_std(ttl).map_err(|_| BlobError::InvalidTtl)?;
    let expires_at = Utc::now() + ttl;
    let expires = expires_at.timestamp();
    let sig = hex::encode(self.mac(path, expires)?.finalize().into_bytes());
    Ok(SignedLink {
      url: format!("{}/files/{path}?expires={expires}&sig={sig}", self.base_url),
      expires_at,
    })
  }
}
