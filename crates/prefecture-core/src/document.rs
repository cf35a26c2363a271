//! Reference documents (exercises, past exams) filed by academic level.
//!
//! File bytes live in a [`crate::blob::BlobStore`]; the database keeps only
//! metadata plus the storage path the blob can be re-addressed by.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use uuid::Uuid;

use crate::{Error, Result};

/// Academic year a document is aimed at.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Level {
  L1,
  L2,
  L3,
  Master1,
  Master2,
}

impl Level {
  pub fn parse_field(raw: &str) -> Result<Self> {
    raw
      .trim()
      .parse()
      .map_err(|_| Error::invalid("level", format!("unknown level {raw:?}")))
  }
}

/// Stored metadata for an uploaded document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
  pub document_id:  Uuid,
  pub name:         String,
  pub level:        Level,
  /// The file name as uploaded.
  pub file_name:    String,
  pub size_bytes:   u64,
  /// SHA-256 hex digest of the content.
  pub content_hash: String,
  /// Durable, unsigned reference to the blob.
  pub url:          String,
  /// Blob key, kept so signed links can be regenerated.
  pub storage_path: String,
  pub uploaded_by:  Uuid,
  pub created_at:   DateTime<Utc>,
}

/// Upload metadata supplied alongside the file bytes.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentDraft {
  pub name:      String,
  pub level:     String,
  pub file_name: String,
}

/// The validated form of a [`DocumentDraft`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentMeta {
  pub name:      String,
  pub level:     Level,
  pub file_name: String,
}

impl DocumentDraft {
  pub fn validate(&self) -> Result<DocumentMeta> {
    let name = self.name.trim();
    if name.is_empty() {
      return Err(Error::invalid("name", "a document name is required"));
    }
    let file_name = self.file_name.trim();
    if file_name.is_empty() {
      return Err(Error::invalid("file_name", "the original file name is required"));
    }
    Ok(DocumentMeta {
      name:      name.to_owned(),
      level:     Level::parse_field(&self.level)?,
      file_name: file_name.to_owned(),
    })
  }
}

/// Generate a fresh blob key for `file_name`, keeping a sanitised extension.
pub fn storage_path_for(document_id: Uuid, file_name: &str) -> String {
  let ext = file_name
    .rsplit_once('.')
    .map(|(_, ext)| ext.to_ascii_lowercase())
    .filter(|ext| {
      !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric())
    })
    .unwrap_or_else(|| "bin".to_owned());
  format!("documents/{}.{ext}", document_id.simple())
}
