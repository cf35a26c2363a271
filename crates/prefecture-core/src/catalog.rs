//! [`Catalog`]: uploaded reference documents.
//!
//! Uploads are two-phase: the blob is written first, then the metadata row.
//! If the row cannot be written the blob is removed again on a best-effort
//! basis; a failed removal leaves an orphaned blob and is only logged.

use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  blob::{BlobStore, SignedLink},
  document::{Document, DocumentDraft, Level, storage_path_for},
  error::Resource,
  profile::Caller,
  store::PortalStore,
};

/// Default lifetime of a signed download link.
pub const DEFAULT_LINK_TTL: Duration = Duration::from_secs(3600);

pub struct Catalog<S, B> {
  store:    Arc<S>,
  blobs:    Arc<B>,
  link_ttl: Duration,
}

impl<S, B> Clone for Catalog<S, B> {
  fn clone(&self) -> Self {
    Self {
      store:    Arc::clone(&self.store),
      blobs:    Arc::clone(&self.blobs),
      link_ttl: self.link_ttl,
    }
  }
}

fn not_found(document_id: Uuid) -> Error {
  Error::NotFound { kind: Resource::Document, id: document_id }
}

impl<S: PortalStore, B: BlobStore> Catalog<S, B> {
  pub fn new(store: Arc<S>, blobs: Arc<B>) -> Self {
    Self { store, blobs, link_ttl: DEFAULT_LINK_TTL }
  }

  pub fn with_link_ttl(mut self, ttl: Duration) -> Self {
    self.link_ttl = ttl;
    self
  }

  /// Documents newest first, optionally for one level.
  pub async fn list(&self, caller: &Caller, level: Option<Level>) -> Result<Vec<Document>> {
    caller.require_member()?;
    self.store.list_documents(level).await.map_err(Error::transient)
  }

  /// Store a new document; admin only.
  pub async fn upload(
    &self,
    caller: &Caller,
    draft: &DocumentDraft,
    bytes: Bytes,
  ) -> Result<Document> {
    let admin = caller.require_admin()?;
    let meta = draft.validate()?;
    if bytes.is_empty() {
      return Err(Error::invalid("file", "the uploaded file is empty"));
    }

    let document_id = Uuid::new_v4();
    let storage_path = storage_path_for(document_id, &meta.file_name);
    let size_bytes = bytes.len() as u64;
    let content_hash = hex_digest(&bytes);

    let url = self
      .blobs
      .put(&storage_path, bytes)
      .await
      .map_err(Error::transient)?;

    let document = Document {
      document_id,
      name: meta.name,
      level: meta.level,
      file_name: meta.file_name,
      size_bytes,
      content_hash,
      url,
      storage_path,
      uploaded_by: admin.user_id,
      created_at: Utc::now(),
    };

    if let Err(e) = self.store.insert_document(document.clone()).await {
      if let Err(cleanup) = self.blobs.remove(&document.storage_path).await {
        warn!(
          storage_path = %document.storage_path,
          error = %cleanup,
          "failed to remove blob after metadata insert failed"
        );
      }
      return Err(Error::transient(e));
    }

    info!(%document_id, level = %document.level, size_bytes, "document uploaded");
    Ok(document)
  }

  /// Remove a document's metadata, then its blob; admin only.
  pub async fn delete(&self, caller: &Caller, document_id: Uuid) -> Result<()> {
    caller.require_admin()?;

    let document = self
      .store
      .delete_document(document_id)
      .await
      .map_err(Error::transient)?
      .ok_or_else(|| not_found(document_id))?;

    if let Err(e) = self.blobs.remove(&document.storage_path).await {
      warn!(
        storage_path = %document.storage_path,
        error = %e,
        "document row deleted but blob removal failed"
      );
    }
    info!(%document_id, "document deleted");
    Ok(())
  }

  /// A fresh signed download link for a document.
  pub async fn link(&self, caller: &Caller, document_id: Uuid) -> Result<SignedLink> {
    caller.require_member()?;

    let document = self
      .store
      .get_document(document_id)
      .await
      .map_err(Error::transient)?
      .ok_or_else(|| not_found(document_id))?;

    self
      .blobs
      .sign(&document.storage_path, self.link_ttl)
      .map_err(Error::transient)
  }
}

fn hex_digest(bytes: &[u8]) -> String { hex::encode(Sha256::digest(bytes)) }
