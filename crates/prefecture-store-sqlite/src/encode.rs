//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microseconds, `Z`
//! suffix) so that text ordering matches chronological ordering. Enums are
//! stored as their canonical lowercase names. UUIDs are stored as hyphenated
//! lowercase strings.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use prefecture_core::{
  document::{Document, Level},
  profile::{Account, Profile, Role},
  question::{Question, QuestionStatus, Theme},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Enums ───────────────────────────────────────────────────────────────────

fn decode_enum<T: FromStr>(column: &'static str, s: &str) -> Result<T> {
  s.parse()
    .map_err(|_| Error::Decode { column, value: s.to_owned() })
}

/// Every spelling of `status` the `questions.status` column may hold.
///
/// Only the first entry is ever written; the rest are legacy values that
/// still have to match guards and filters.
pub fn status_spellings(status: QuestionStatus) -> &'static [&'static str] {
  match status {
    QuestionStatus::Pending => &["pending", "en_attente"],
    QuestionStatus::Answered => &["answered", "approved", "repondu", "approuve"],
  }
}

/// SQL predicate matching any spelling of `status`. The spellings are
/// compile-time constants, so inlining them is safe.
pub fn status_predicate(status: QuestionStatus) -> String {
  let list = status_spellings(status)
    .iter()
    .map(|s| format!("'{s}'"))
    .collect::<Vec<_>>()
    .join(", ");
  format!("status IN ({list})")
}

pub fn encode_status(status: QuestionStatus) -> &'static str {
  status_spellings(status)[0]
}

pub fn encode_bool(b: bool) -> i64 { i64::from(b) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// The column list every `questions` read selects, in [`RawQuestion`] order.
pub const QUESTION_COLUMNS: &str = "question_id, title, full_text, theme, \
                                    official_answer, status, visible, \
                                    author_id, created_at";

/// Raw values read directly from a `questions` row.
pub struct RawQuestion {
  pub question_id:     String,
  pub title:           String,
  pub full_text:       String,
  pub theme:           String,
  pub official_answer: Option<String>,
  pub status:          String,
  pub visible:         i64,
  pub author_id:       String,
  pub created_at:      String,
}

impl RawQuestion {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      question_id:     row.get(0)?,
      title:           row.get(1)?,
      full_text:       row.get(2)?,
      theme:           row.get(3)?,
      official_answer: row.get(4)?,
      status:          row.get(5)?,
      visible:         row.get(6)?,
      author_id:       row.get(7)?,
      created_at:      row.get(8)?,
    })
  }

  pub fn into_question(self) -> Result<Question> {
    Ok(Question {
      question_id:     decode_uuid(&self.question_id)?,
      title:           self.title,
      full_text:       self.full_text,
      theme:           decode_enum::<Theme>("theme", &self.theme)?,
      official_answer: self.official_answer,
      status:          decode_enum::<QuestionStatus>("status", &self.status)?,
      visible:         self.visible != 0,
      author_id:       decode_uuid(&self.author_id)?,
      created_at:      decode_dt(&self.created_at)?,
    })
  }
}

pub const PROFILE_COLUMNS: &str =
  "user_id, email, role, first_name, last_name, created_at";

/// Raw values read directly from a `profiles` row.
pub struct RawProfile {
  pub user_id:    String,
  pub email:      String,
  pub role:       String,
  pub first_name: Option<String>,
  pub last_name:  Option<String>,
  pub created_at: String,
}

impl RawProfile {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:    row.get(0)?,
      email:      row.get(1)?,
      role:       row.get(2)?,
      first_name: row.get(3)?,
      last_name:  row.get(4)?,
      created_at: row.get(5)?,
    })
  }

  pub fn into_profile(self) -> Result<Profile> {
    Ok(Profile {
      user_id:    decode_uuid(&self.user_id)?,
      email:      self.email,
      role:       decode_enum::<Role>("role", &self.role)?,
      first_name: self.first_name,
      last_name:  self.last_name,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from an `accounts` row.
pub struct RawAccount {
  pub user_id:       String,
  pub email:         String,
  pub password_hash: String,
  pub created_at:    String,
}

impl RawAccount {
  pub fn into_account(self) -> Result<Account> {
    Ok(Account {
      user_id:       decode_uuid(&self.user_id)?,
      email:         self.email,
      password_hash: self.password_hash,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

pub const DOCUMENT_COLUMNS: &str = "document_id, name, level, file_name, \
                                    size_bytes, content_hash, url, \
                                    storage_path, uploaded_by, created_at";

/// Raw values read directly from a `documents` row.
pub struct RawDocument {
  pub document_id:  String,
  pub name:         String,
  pub level:        String,
  pub file_name:    String,
  pub size_bytes:   i64,
  pub content_hash: String,
  pub url:          String,
  pub storage_path: String,
  pub uploaded_by:  String,
  pub created_at:   String,
}

impl RawDocument {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      document_id:  row.get(0)?,
      name:         row.get(1)?,
      level:        row.get(2)?,
      file_name:    row.get(3)?,
      size_bytes:   row.get(4)?,
      content_hash: row.get(5)?,
      url:          row.get(6)?,
      storage_path: row.get(7)?,
      uploaded_by:  row.get(8)?,
      created_at:   row.get(9)?,
    })
  }

  pub fn into_document(self) -> Result<Document> {
    let size_bytes = u64::try_from(self.size_bytes).map_err(|_| Error::Decode {
      column: "size_bytes",
      value:  self.size_bytes.to_string(),
    })?;
    Ok(Document {
      document_id: decode_uuid(&self.document_id)?,
      name: self.name,
      level: decode_enum::<Level>("level", &self.level)?,
      file_name: self.file_name,
      size_bytes,
      content_hash: self.content_hash,
      url: self.url,
      storage_path: self.storage_path,
      uploaded_by: decode_uuid(&self.uploaded_by)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}
