//! Question types: the moderated unit of the portal.
//!
//! A question is submitted by a student, answered by the Préfecture, and
//! only then may be published. `status` and `visible` are independent
//! columns; the public feed requires both.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use uuid::Uuid;

use crate::{Error, Result, profile::Caller};

/// Number of characters of the full text kept as the title.
pub const TITLE_LEN: usize = 100;

// ─── Theme ───────────────────────────────────────────────────────────────────

/// The closed set of topics a question may be filed under.
///
/// Parsing accepts the canonical identifier as well as the French label used
/// by the faculty, ignoring ASCII case.
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
#[serde(rename_all = "snake_case")]
#[strum(ascii_case_insensitive)]
pub enum Theme {
  #[strum(to_string = "examination", serialize = "examen")]
  Examination,
  #[strum(to_string = "internship", serialize = "stage")]
  Internship,
  #[strum(to_string = "tutored_project", serialize = "projet tutoré")]
  TutoredProject,
  #[strum(to_string = "lecture_hall", serialize = "auditoire")]
  LectureHall,
  #[strum(to_string = "chaplaincy", serialize = "aumonerie")]
  Chaplaincy,
  #[strum(to_string = "cohort", serialize = "promotion")]
  Cohort,
  #[strum(to_string = "faculty", serialize = "faculté")]
  Faculty,
  #[strum(to_string = "university", serialize = "université")]
  University,
  #[strum(to_string = "proposal", serialize = "proposition")]
  Proposal,
  #[strum(to_string = "opportunity", serialize = "opportunité")]
  Opportunity,
  #[strum(to_string = "activity", serialize = "activité")]
  Activity,
  #[strum(to_string = "election")]
  Election,
}

impl Theme {
  /// Parse user input into a theme, reporting the `theme` field on failure.
  pub fn parse_field(raw: &str) -> Result<Self> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
      return Err(Error::invalid("theme", "a theme is required"));
    }
    trimmed
      .parse()
      .map_err(|_| Error::invalid("theme", format!("unknown theme {trimmed:?}")))
  }

  /// The French label the faculty uses for this theme.
  pub fn label(self) -> &'static str {
    match self {
      Self::Examination => "examen",
      Self::Internship => "stage",
      Self::TutoredProject => "projet tutoré",
      Self::LectureHall => "auditoire",
      Self::Chaplaincy => "aumonerie",
      Self::Cohort => "promotion",
      Self::Faculty => "faculté",
      Self::University => "université",
      Self::Proposal => "proposition",
      Self::Opportunity => "opportunité",
      Self::Activity => "activité",
      Self::Election => "election",
    }
  }
}

// ─── Status ──────────────────────────────────────────────────────────────────

/// Moderation state of a question.
///
/// The portal has historically written the terminal state both as
/// `answered`/`repondu` and as `approved`/`approuve`. All four spellings
/// decode to [`QuestionStatus::Answered`].
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(ascii_case_insensitive)]
pub enum QuestionStatus {
  #[serde(alias = "en_attente")]
  #[strum(to_string = "pending", serialize = "en_attente")]
  Pending,
  #[serde(alias = "approved", alias = "repondu", alias = "approuve")]
  #[strum(
    to_string = "answered",
    serialize = "approved",
    serialize = "repondu",
    serialize = "approuve"
  )]
  Answered,
}

impl QuestionStatus {
  /// Terminal questions are frozen for their author.
  pub fn is_terminal(self) -> bool { matches!(self, Self::Answered) }
}

// ─── Question ────────────────────────────────────────────────────────────────

/// A stored question. Not serialisable on purpose: `author_id` must never
/// leave the server; use [`Question::view_for`] to build a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
  pub question_id:     Uuid,
  /// First [`TITLE_LEN`] characters of `full_text`; never edited directly.
  pub title:           String,
  pub full_text:       String,
  pub theme:           Theme,
  /// Present exactly when `status` is [`QuestionStatus::Answered`].
  pub official_answer: Option<String>,
  pub status:          QuestionStatus,
  pub visible:         bool,
  pub author_id:       Uuid,
  pub created_at:      DateTime<Utc>,
}

impl Question {
  /// Whether the question belongs in the public feed.
  pub fn is_public(&self) -> bool { self.visible && self.status.is_terminal() }

  /// The read-side visibility predicate.
  ///
  /// Anonymous callers see nothing, admins see everything, students see
  /// public questions and their own.
  pub fn is_visible_to(&self, caller: &Caller) -> bool {
    match caller {
      Caller::Anonymous => false,
      Caller::Member(m) if m.is_admin() => true,
      Caller::Member(m) => self.is_public() || self.author_id == m.user_id,
    }
  }

  /// Project the question for `caller`, replacing the author identity with
  /// an ownership flag.
  pub fn view_for(&self, caller: &Caller) -> QuestionView {
    QuestionView {
      question_id:     self.question_id,
      title:           self.title.clone(),
      full_text:       self.full_text.clone(),
      theme:           self.theme,
      official_answer: self.official_answer.clone(),
      status:          self.status,
      visible:         self.visible,
      mine:            caller.user_id() == Some(self.author_id),
      created_at:      self.created_at,
    }
  }
}

/// The outward-facing shape of a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionView {
  pub question_id:     Uuid,
  pub title:           String,
  pub full_text:       String,
  pub theme:           Theme,
  pub official_answer: Option<String>,
  pub status:          QuestionStatus,
  pub visible:         bool,
  /// `true` when the caller authored the question.
  pub mine:            bool,
  pub created_at:      DateTime<Utc>,
}

/// Derive the short title from the full text.
pub fn derive_title(full_text: &str) -> String {
  full_text.trim().chars().take(TITLE_LEN).collect()
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// A student's submission or revision. `theme` is raw input and is checked
/// against [`Theme`] by [`QuestionDraft::validate`].
#[derive(Debug, Clone, Deserialize)]
pub struct QuestionDraft {
  pub theme:     String,
  pub full_text: String,
}

/// The validated content of a [`QuestionDraft`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Content {
  pub theme:     Theme,
  pub full_text: String,
  pub title:     String,
}

impl QuestionDraft {
  pub fn new(theme: impl Into<String>, full_text: impl Into<String>) -> Self {
    Self { theme: theme.into(), full_text: full_text.into() }
  }

  pub fn validate(&self) -> Result<Content> {
    let theme = Theme::parse_field(&self.theme)?;
    let full_text = self.full_text.trim();
    if full_text.is_empty() {
      return Err(Error::invalid("full_text", "the question text is required"));
    }
    Ok(Content {
      theme,
      full_text: full_text.to_owned(),
      title: derive_title(full_text),
    })
  }
}

fn default_admin_status() -> QuestionStatus { QuestionStatus::Answered }

fn default_visible() -> bool { true }

/// An entry created directly by the Préfecture (FAQ style). Defaults to an
/// answered, visible question.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminDraft {
  pub theme:           String,
  pub full_text:       String,
  pub official_answer: Option<String>,
  #[serde(default = "default_admin_status")]
  pub status:          QuestionStatus,
  #[serde(default = "default_visible")]
  pub visible:         bool,
}

impl AdminDraft {
  /// Validate the draft, keeping the answer/status pairing intact.
  pub fn validate(&self) -> Result<(Content, Option<String>)> {
    let content = QuestionDraft::new(self.theme.clone(), self.full_text.clone())
      .validate()?;

    let answer = self
      .official_answer
      .as_deref()
      .map(str::trim)
      .filter(|a| !a.is_empty())
      .map(str::to_owned);

    match (self.status, &answer) {
      (QuestionStatus::Answered, None) => Err(Error::invalid(
        "official_answer",
        "an answered question needs an official answer",
      )),
      (QuestionStatus::Pending, Some(_)) => Err(Error::invalid(
        "official_answer",
        "a pending question cannot carry an official answer",
      )),
      _ => Ok((content, answer)),
    }
  }
}
