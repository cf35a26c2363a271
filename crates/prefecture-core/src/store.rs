//! The `PortalStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g.
//! `prefecture-store-sqlite`). It is the enforcement point for every
//! authorization predicate on writes: guarded updates and deletes are
//! compare-and-swap operations that only touch a row whose current state
//! satisfies the [`Guard`], so callers never read-then-write.

use std::future::Future;

use serde::Serialize;
use uuid::Uuid;

use crate::{
  document::{Document, Level},
  profile::{Account, NewProfile, Profile, ProfileNames, Role},
  question::{Content, Question, QuestionStatus, Theme},
  reaction::{ReactionKind, Tally},
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Which rows a listing may draw from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
  /// `visible = true` and a terminal status.
  Public,
  /// Every question written by this user, whatever its state.
  AuthoredBy(Uuid),
  /// Everything; moderation only.
  All,
}

/// Parameters for [`PortalStore::list_questions`]. Results are always
/// ordered newest first, ties broken by id.
#[derive(Debug, Clone)]
pub struct QuestionQuery {
  pub scope:  Scope,
  pub status: Option<QuestionStatus>,
  pub theme:  Option<Theme>,
  /// Case-insensitive substring filter over the full text.
  pub text:   Option<String>,
  pub limit:  usize,
  pub offset: usize,
}

impl QuestionQuery {
  pub fn new(scope: Scope) -> Self {
    Self { scope, status: None, theme: None, text: None, limit: 100, offset: 0 }
  }
}

/// Precondition a guarded write checks against the row's current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
  /// No precondition beyond existence.
  Always,
  /// The row is `pending` and was written by this user.
  PendingAuthoredBy(Uuid),
  /// The row is currently in this status.
  InStatus(QuestionStatus),
}

/// A single-row mutation applied by [`PortalStore::update_question`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionChange {
  /// Replace theme, text and title; re-queue as `pending`, hidden.
  Revise(Content),
  /// Record the official answer and move to `answered`.
  Answer(String),
  /// Set the `visible` flag.
  Visibility(bool),
}

/// One page of an offset-paginated listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
  pub items:     Vec<T>,
  /// Zero-based page index.
  pub page:      usize,
  pub page_size: usize,
  pub has_more:  bool,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the portal's backing store.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait PortalStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Accounts ──────────────────────────────────────────────────────────

  /// Persist new credentials. Returns `false` if the email is taken.
  fn create_account(
    &self,
    account: Account,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Look up credentials by (normalised) email.
  fn find_account<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + 'a;

  // ── Profiles ──────────────────────────────────────────────────────────

  /// Insert the profile if absent and return the stored row. An existing
  /// profile is returned untouched.
  fn ensure_profile(
    &self,
    input: NewProfile,
  ) -> impl Future<Output = Result<Profile, Self::Error>> + Send + '_;

  fn get_profile(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Option<Profile>, Self::Error>> + Send + '_;

  /// All profiles, oldest first.
  fn list_profiles(
    &self,
  ) -> impl Future<Output = Result<Vec<Profile>, Self::Error>> + Send + '_;

  /// Overwrite the display-name fields. Returns `None` if no such profile.
  fn update_profile_names(
    &self,
    user_id: Uuid,
    names: ProfileNames,
  ) -> impl Future<Output = Result<Option<Profile>, Self::Error>> + Send + '_;

  /// Change a user's role. Returns `false` if no such profile.
  fn set_role(
    &self,
    user_id: Uuid,
    role: Role,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Questions ─────────────────────────────────────────────────────────

  fn insert_question(
    &self,
    question: Question,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn get_question(
    &self,
    question_id: Uuid,
  ) -> impl Future<Output = Result<Option<Question>, Self::Error>> + Send + '_;

  fn list_questions<'a>(
    &'a self,
    query: &'a QuestionQuery,
  ) -> impl Future<Output = Result<Vec<Question>, Self::Error>> + Send + 'a;

  /// Apply `change` only if the row exists and satisfies `guard`, as one
  /// atomic statement. Returns the updated row, or `None` if nothing
  /// matched.
  fn update_question(
    &self,
    question_id: Uuid,
    guard: Guard,
    change: QuestionChange,
  ) -> impl Future<Output = Result<Option<Question>, Self::Error>> + Send + '_;

  /// Delete the row only if it satisfies `guard`. Reactions go with it.
  /// Returns `false` if nothing matched.
  fn delete_question(
    &self,
    question_id: Uuid,
    guard: Guard,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Reactions ─────────────────────────────────────────────────────────

  /// Atomically apply the toggle rule of [`crate::reaction::toggled`] to the
  /// `(question_id, user_id)` row and return the reaction now held.
  fn toggle_reaction(
    &self,
    question_id: Uuid,
    user_id: Uuid,
    kind: ReactionKind,
  ) -> impl Future<Output = Result<Option<ReactionKind>, Self::Error>> + Send + '_;

  /// Exact counts per kind, plus `viewer`'s own reaction if given.
  fn tally(
    &self,
    question_id: Uuid,
    viewer: Option<Uuid>,
  ) -> impl Future<Output = Result<Tally, Self::Error>> + Send + '_;

  // ── Documents ─────────────────────────────────────────────────────────

  fn insert_document(
    &self,
    document: Document,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn get_document(
    &self,
    document_id: Uuid,
  ) -> impl Future<Output = Result<Option<Document>, Self::Error>> + Send + '_;

  /// Documents newest first, optionally restricted to one level.
  fn list_documents(
    &self,
    level: Option<Level>,
  ) -> impl Future<Output = Result<Vec<Document>, Self::Error>> + Send + '_;

  /// Remove the metadata row, returning it so the blob can be cleaned up.
  fn delete_document(
    &self,
    document_id: Uuid,
  ) -> impl Future<Output = Result<Option<Document>, Self::Error>> + Send + '_;
}
