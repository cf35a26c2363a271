//! Error types for `prefecture-core`.

use std::fmt;

use thiserror::Error;
use uuid::Uuid;

/// Why a caller was refused an operation.
///
/// Each variant renders a message fit for showing to the person who
/// triggered the action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
  /// No authenticated identity accompanied the request.
  NotAuthenticated,
  /// The operation is reserved to the Préfecture.
  NotAdmin,
  /// Only the author of a question may change it.
  NotAuthor,
  /// The question has been answered and is frozen for its author.
  AlreadyAnswered,
  /// The question has no official answer yet, so it cannot be published.
  NotYetAnswered,
}

impl fmt::Display for Denial {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let msg = match self {
      Self::NotAuthenticated => "you must be signed in",
      Self::NotAdmin => "this action is reserved to administrators",
      Self::NotAuthor => "you are not the author of this question",
      Self::AlreadyAnswered => {
        "this question has already been answered and can no longer be changed"
      }
      Self::NotYetAnswered => "this question has not been answered yet",
    };
    f.write_str(msg)
  }
}

/// The kind of record a [`Error::NotFound`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
  Question,
  Document,
  Profile,
}

impl fmt::Display for Resource {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Question => "question",
      Self::Document => "document",
      Self::Profile => "profile",
    })
  }
}

#[derive(Debug, Error)]
pub enum Error {
  /// Malformed input; `field` names the offending field.
  #[error("invalid {field}: {reason}")]
  Validation { field: &'static str, reason: String },

  #[error("permission denied: {0}")]
  Permission(Denial),

  /// The record does not exist, or the caller is not allowed to see it.
  #[error("{kind} not found: {id}")]
  NotFound { kind: Resource, id: Uuid },

  /// The backing store (or blob store) failed; retrying may succeed.
  #[error("backing store unavailable: {0}")]
  Transient(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
    Self::Validation { field, reason: reason.into() }
  }

  pub fn transient<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Transient(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
