//! Best-effort notification of the Préfecture when a question arrives.

use serde::Serialize;
use uuid::Uuid;

use crate::question::{Question, Theme};

/// What the Préfecture is told about a new submission. Carries no author
/// identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Submission {
  pub question_id: Uuid,
  pub theme:       Theme,
  pub full_text:   String,
}

impl From<&Question> for Submission {
  fn from(q: &Question) -> Self {
    Self {
      question_id: q.question_id,
      theme:       q.theme,
      full_text:   q.full_text.clone(),
    }
  }
}

/// Fan-out of submission notices.
///
/// Implementations must return immediately: any I/O is dispatched in the
/// background, never awaited by the submitting request, never retried, and
/// failures are only logged.
pub trait Notifier: Send + Sync {
  fn question_submitted(&self, submission: Submission);
}

/// Discards every notice.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
  fn question_submitted(&self, submission: Submission) {
    tracing::debug!(question_id = %submission.question_id, "notifications disabled");
  }
}
