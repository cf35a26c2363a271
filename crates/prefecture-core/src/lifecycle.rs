//! The question lifecycle: submission, revision, moderation, publication.
//!
//! ```text
//!   create ──► pending ──answer──► answered ──publish──► answered + visible
//!                ▲   │                 │
//!   edit (author)┘   └ delete (author) └ admin_delete, unpublish
//! ```
//!
//! Every transition is a single guarded write against the store. When the
//! guard does not match, the current row is read back only to tell the
//! caller why.

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
  Denial, Error, Result,
  portal::{Portal, not_found},
  profile::{Caller, Member},
  question::{AdminDraft, Question, QuestionDraft, QuestionStatus, QuestionView, Theme},
  store::{Guard, Page, PortalStore, QuestionChange, QuestionQuery, Scope},
};

/// Optional narrowing applied to any question listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
  pub theme: Option<Theme>,
  pub text:  Option<String>,
}

impl Filter {
  /// Build a filter from raw query-string values; blanks are ignored.
  pub fn parse(theme: Option<&str>, text: Option<&str>) -> Result<Self> {
    let theme = theme
      .filter(|t| !t.trim().is_empty())
      .map(Theme::parse_field)
      .transpose()?;
    let text = text.map(str::trim).filter(|t| !t.is_empty()).map(str::to_owned);
    Ok(Self { theme, text })
  }
}

impl<S: PortalStore> Portal<S> {
  // ── Student transitions ───────────────────────────────────────────────

  /// Submit a new question. It starts `pending` and hidden whatever the
  /// caller's role; the Préfecture is notified in the background.
  pub async fn create(
    &self,
    caller: &Caller,
    draft: &QuestionDraft,
  ) -> Result<QuestionView> {
    let member = caller.require_member()?;
    let content = draft.validate()?;

    let question = Question {
      question_id:     Uuid::new_v4(),
      title:           content.title,
      full_text:       content.full_text,
      theme:           content.theme,
      official_answer: None,
      status:          QuestionStatus::Pending,
      visible:         false,
      author_id:       member.user_id,
      created_at:      Utc::now(),
    };

    self
      .store
      .insert_question(question.clone())
      .await
      .map_err(Error::transient)?;
    info!(question_id = %question.question_id, theme = %question.theme, "question submitted");

    self.notifier.question_submitted((&question).into());
    Ok(question.view_for(caller))
  }

  /// Revise one's own pending question. The question goes back to the
  /// moderation queue, hidden.
  pub async fn edit(
    &self,
    caller: &Caller,
    question_id: Uuid,
    draft: &QuestionDraft,
  ) -> Result<QuestionView> {
    let member = caller.require_member()?;
    let content = draft.validate()?;

    let updated = self
      .store
      .update_question(
        question_id,
        Guard::PendingAuthoredBy(member.user_id),
        QuestionChange::Revise(content),
      )
      .await
      .map_err(Error::transient)?;

    match updated {
      Some(q) => {
        info!(%question_id, "question revised");
        Ok(q.view_for(caller))
      }
      None => Err(self.author_refusal(question_id, member).await),
    }
  }

  /// Withdraw one's own pending question.
  pub async fn delete(&self, caller: &Caller, question_id: Uuid) -> Result<()> {
    let member = caller.require_member()?;

    let deleted = self
      .store
      .delete_question(question_id, Guard::PendingAuthoredBy(member.user_id))
      .await
      .map_err(Error::transient)?;

    if deleted {
      info!(%question_id, "question withdrawn by author");
      Ok(())
    } else {
      Err(self.author_refusal(question_id, member).await)
    }
  }

  /// Explain why an author-guarded write matched nothing.
  async fn author_refusal(&self, question_id: Uuid, member: Member) -> Error {
    let err = match self.store.get_question(question_id).await {
      Err(e) => return Error::transient(e),
      Ok(None) => not_found(question_id),
      Ok(Some(q)) if q.author_id != member.user_id => {
        Error::Permission(Denial::NotAuthor)
      }
      Ok(Some(_)) => Error::Permission(Denial::AlreadyAnswered),
    };
    debug!(%question_id, user_id = %member.user_id, error = %err, "author write refused");
    err
  }

  // ── Préfecture transitions ────────────────────────────────────────────

  /// Record the official answer. Answering an already answered question is
  /// a no-op that leaves the existing answer in place.
  pub async fn answer(
    &self,
    caller: &Caller,
    question_id: Uuid,
    answer_text: &str,
  ) -> Result<QuestionView> {
    caller.require_admin()?;
    let answer_text = answer_text.trim();
    if answer_text.is_empty() {
      return Err(Error::invalid("official_answer", "the answer text is required"));
    }

    let updated = self
      .store
      .update_question(
        question_id,
        Guard::InStatus(QuestionStatus::Pending),
        QuestionChange::Answer(answer_text.to_owned()),
      )
      .await
      .map_err(Error::transient)?;

    if let Some(q) = updated {
      info!(%question_id, "question answered");
      return Ok(q.view_for(caller));
    }

    let current = self
      .store
      .get_question(question_id)
      .await
      .map_err(Error::transient)?
      .ok_or_else(|| not_found(question_id))?;
    debug!(%question_id, "question already answered; keeping existing answer");
    Ok(current.view_for(caller))
  }

  /// Make an answered question visible in the public feed.
  pub async fn publish(&self, caller: &Caller, question_id: Uuid) -> Result<QuestionView> {
    caller.require_admin()?;

    let updated = self
      .store
      .update_question(
        question_id,
        Guard::InStatus(QuestionStatus::Answered),
        QuestionChange::Visibility(true),
      )
      .await
      .map_err(Error::transient)?;

    if let Some(q) = updated {
      info!(%question_id, "question published");
      return Ok(q.view_for(caller));
    }

    match self.store.get_question(question_id).await.map_err(Error::transient)? {
      None => Err(not_found(question_id)),
      Some(_) => {
        debug!(%question_id, "refusing to publish an unanswered question");
        Err(Error::Permission(Denial::NotYetAnswered))
      }
    }
  }

  /// Take a question out of the public feed without touching its status.
  pub async fn unpublish(&self, caller: &Caller, question_id: Uuid) -> Result<QuestionView> {
    caller.require_admin()?;

    let q = self
      .store
      .update_question(question_id, Guard::Always, QuestionChange::Visibility(false))
      .await
      .map_err(Error::transient)?
      .ok_or_else(|| not_found(question_id))?;
    info!(%question_id, "question hidden");
    Ok(q.view_for(caller))
  }

  /// Remove a question in any state.
  pub async fn admin_delete(&self, caller: &Caller, question_id: Uuid) -> Result<()> {
    caller.require_admin()?;

    let deleted = self
      .store
      .delete_question(question_id, Guard::Always)
      .await
      .map_err(Error::transient)?;
    if !deleted {
      return Err(not_found(question_id));
    }
    info!(%question_id, "question deleted by admin");
    Ok(())
  }

  /// Create a question directly in any status/visibility combination,
  /// bypassing the student queue.
  pub async fn admin_create(
    &self,
    caller: &Caller,
    draft: &AdminDraft,
  ) -> Result<QuestionView> {
    let admin = caller.require_admin()?;
    let (content, official_answer) = draft.validate()?;

    let question = Question {
      question_id: Uuid::new_v4(),
      title: content.title,
      full_text: content.full_text,
      theme: content.theme,
      official_answer,
      status: draft.status,
      visible: draft.visible,
      author_id: admin.user_id,
      created_at: Utc::now(),
    };

    self
      .store
      .insert_question(question.clone())
      .await
      .map_err(Error::transient)?;
    info!(
      question_id = %question.question_id,
      status = %question.status,
      visible = question.visible,
      "question created by admin"
    );
    Ok(question.view_for(caller))
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Published questions, newest first.
  pub async fn public_feed(
    &self,
    caller: &Caller,
    page: usize,
    filter: &Filter,
  ) -> Result<Page<QuestionView>> {
    caller.require_member()?;
    self.page_of(caller, self.query(Scope::Public, None, filter), page).await
  }

  /// Everything the caller has written, in any state.
  pub async fn my_questions(
    &self,
    caller: &Caller,
    page: usize,
    filter: &Filter,
  ) -> Result<Page<QuestionView>> {
    let member = caller.require_member()?;
    let query = self.query(Scope::AuthoredBy(member.user_id), None, filter);
    self.page_of(caller, query, page).await
  }

  /// The moderation view: all questions, optionally by status.
  pub async fn moderation_queue(
    &self,
    caller: &Caller,
    status: Option<QuestionStatus>,
    page: usize,
    filter: &Filter,
  ) -> Result<Page<QuestionView>> {
    caller.require_admin()?;
    self.page_of(caller, self.query(Scope::All, status, filter), page).await
  }

  /// A single question, if the caller may see it.
  pub async fn question(&self, caller: &Caller, question_id: Uuid) -> Result<QuestionView> {
    caller.require_member()?;
    Ok(self.visible_question(caller, question_id).await?.view_for(caller))
  }

  fn query(
    &self,
    scope: Scope,
    status: Option<QuestionStatus>,
    filter: &Filter,
  ) -> QuestionQuery {
    QuestionQuery {
      status,
      theme: filter.theme,
      text: filter.text.clone(),
      ..QuestionQuery::new(scope)
    }
  }

  async fn page_of(
    &self,
    caller: &Caller,
    mut query: QuestionQuery,
    page: usize,
  ) -> Result<Page<QuestionView>> {
    // One extra row tells us whether another page exists.
    query.limit = self.page_size.saturating_add(1);
    query.offset = page.saturating_mul(self.page_size);

    let mut rows = self
      .store
      .list_questions(&query)
      .await
      .map_err(Error::transient)?;
    let has_more = rows.len() > self.page_size;
    rows.truncate(self.page_size);

    Ok(Page {
      items: rows.iter().map(|q| q.view_for(caller)).collect(),
      page,
      page_size: self.page_size,
      has_more,
    })
  }
}
