//! [`SqliteStore`]: the SQLite implementation of [`PortalStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::{
  OptionalExtension as _, TransactionBehavior, functions::FunctionFlags, types::Value,
};
use tracing::debug;
use uuid::Uuid;

use prefecture_core::{
  document::{Document, Level},
  profile::{Account, NewProfile, Profile, ProfileNames, Role},
  question::{Question, QuestionStatus},
  reaction::{ReactionKind, Tally, toggled},
  store::{Guard, PortalStore, QuestionChange, QuestionQuery, Scope},
};

use crate::{
  Result,
  encode::{
    DOCUMENT_COLUMNS, PROFILE_COLUMNS, QUESTION_COLUMNS, RawAccount, RawDocument,
    RawProfile, RawQuestion, encode_bool, encode_dt, encode_status, encode_uuid,
    status_predicate,
  },
  error::Error,
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A portal store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref().to_owned();
    let conn = tokio_rusqlite::Connection::open(&path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    debug!(path = %path.display(), "sqlite store opened");
    Ok(store)
  }

  /// Open an in-memory store; useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        // SQLite's own lower() only folds ASCII.
        conn.create_scalar_function(
          "fold",
          1,
          FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
          |ctx| Ok(ctx.get::<Option<String>>(0)?.map(|s| s.to_lowercase())),
        )?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

/// Read one question row by id.
fn select_question(
  conn: &rusqlite::Connection,
  id: &str,
) -> rusqlite::Result<Option<RawQuestion>> {
  conn
    .query_row(
      &format!("SELECT {QUESTION_COLUMNS} FROM questions WHERE question_id = ?1"),
      rusqlite::params![id],
      RawQuestion::from_row,
    )
    .optional()
}

fn select_profile(
  conn: &rusqlite::Connection,
  id: &str,
) -> rusqlite::Result<Option<RawProfile>> {
  conn
    .query_row(
      &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = ?1"),
      rusqlite::params![id],
      RawProfile::from_row,
    )
    .optional()
}

/// Render `guard` as a SQL predicate, pushing its parameters onto `params`.
fn guard_sql(guard: Guard, params: &mut Vec<Value>) -> String {
  match guard {
    Guard::Always => "1 = 1".to_owned(),
    Guard::PendingAuthoredBy(author) => {
      params.push(Value::Text(encode_uuid(author)));
      format!(
        "{} AND author_id = ?{}",
        status_predicate(QuestionStatus::Pending),
        params.len()
      )
    }
    Guard::InStatus(status) => status_predicate(status),
  }
}

/// Render `change` as a `SET` list, pushing its parameters onto `params`.
fn change_sql(change: QuestionChange, params: &mut Vec<Value>) -> String {
  match change {
    QuestionChange::Revise(content) => {
      let base = params.len();
      params.push(Value::Text(content.theme.to_string()));
      params.push(Value::Text(content.full_text));
      params.push(Value::Text(content.title));
      format!(
        "theme = ?{}, full_text = ?{}, title = ?{}, status = '{}', visible = 0, \
         official_answer = NULL",
        base + 1,
        base + 2,
        base + 3,
        encode_status(QuestionStatus::Pending),
      )
    }
    QuestionChange::Answer(text) => {
      params.push(Value::Text(text));
      format!(
        "official_answer = ?{}, status = '{}'",
        params.len(),
        encode_status(QuestionStatus::Answered)
      )
    }
    QuestionChange::Visibility(visible) => {
      params.push(Value::Integer(encode_bool(visible)));
      format!("visible = ?{}", params.len())
    }
  }
}

// ─── PortalStore impl ────────────────────────────────────────────────────────

impl PortalStore for SqliteStore {
  type Error = Error;

  // ── Accounts ──────────────────────────────────────────────────────────────

  async fn create_account(&self, account: Account) -> Result<bool> {
    let id_str = encode_uuid(account.user_id);
    let at_str = encode_dt(account.created_at);

    let inserted = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "INSERT INTO accounts (user_id, email, password_hash, created_at)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT DO NOTHING",
          rusqlite::params![id_str, account.email, account.password_hash, at_str],
        )?;
        Ok(n == 1)
      })
      .await?;
    Ok(inserted)
  }

  async fn find_account(&self, email: &str) -> Result<Option<Account>> {
    let email = email.to_owned();

    let raw: Option<RawAccount> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT user_id, email, password_hash, created_at
               FROM accounts WHERE email = ?1",
              rusqlite::params![email],
              |row| {
                Ok(RawAccount {
                  user_id:       row.get(0)?,
                  email:         row.get(1)?,
                  password_hash: row.get(2)?,
                  created_at:    row.get(3)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawAccount::into_account).transpose()
  }

  // ── Profiles ──────────────────────────────────────────────────────────────

  async fn ensure_profile(&self, input: NewProfile) -> Result<Profile> {
    let user_id = input.user_id;
    let id_str = encode_uuid(user_id);
    let at_str = encode_dt(Utc::now());
    let role_str = Role::default().to_string();

    let raw: Option<RawProfile> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO profiles (user_id, email, role, first_name, last_name, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)
           ON CONFLICT (user_id) DO NOTHING",
          rusqlite::params![
            id_str,
            input.email,
            role_str,
            input.first_name,
            input.last_name,
            at_str,
          ],
        )?;
        let raw = select_profile(&tx, &id_str)?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw
      .ok_or_else(|| Error::Decode { column: "user_id", value: user_id.to_string() })?
      .into_profile()
  }

  async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>> {
    let id_str = encode_uuid(user_id);
    let raw = self
      .conn
      .call(move |conn| Ok(select_profile(conn, &id_str)?))
      .await?;
    raw.map(RawProfile::into_profile).transpose()
  }

  async fn list_profiles(&self) -> Result<Vec<Profile>> {
    let raws: Vec<RawProfile> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {PROFILE_COLUMNS} FROM profiles ORDER BY created_at, user_id"
        ))?;
        let rows = stmt
          .query_map([], RawProfile::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawProfile::into_profile).collect()
  }

  async fn update_profile_names(
    &self,
    user_id: Uuid,
    names: ProfileNames,
  ) -> Result<Option<Profile>> {
    let id_str = encode_uuid(user_id);

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let n = tx.execute(
          "UPDATE profiles SET first_name = ?2, last_name = ?3 WHERE user_id = ?1",
          rusqlite::params![id_str, names.first_name, names.last_name],
        )?;
        let raw = if n == 1 { select_profile(&tx, &id_str)? } else { None };
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw.map(RawProfile::into_profile).transpose()
  }

  async fn set_role(&self, user_id: Uuid, role: Role) -> Result<bool> {
    let id_str = encode_uuid(user_id);
    let role_str = role.to_string();

    let n = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE profiles SET role = ?2 WHERE user_id = ?1",
          rusqlite::params![id_str, role_str],
        )?)
      })
      .await?;
    Ok(n == 1)
  }

  // ── Questions ─────────────────────────────────────────────────────────────

  async fn insert_question(&self, question: Question) -> Result<()> {
    let id_str     = encode_uuid(question.question_id);
    let theme_str  = question.theme.to_string();
    let status_str = encode_status(question.status);
    let visible    = encode_bool(question.visible);
    let author_str = encode_uuid(question.author_id);
    let at_str     = encode_dt(question.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO questions (
             question_id, title, full_text, theme, official_answer,
             status, visible, author_id, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![
            id_str,
            question.title,
            question.full_text,
            theme_str,
            question.official_answer,
            status_str,
            visible,
            author_str,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_question(&self, question_id: Uuid) -> Result<Option<Question>> {
    let id_str = encode_uuid(question_id);
    let raw = self
      .conn
      .call(move |conn| Ok(select_question(conn, &id_str)?))
      .await?;
    raw.map(RawQuestion::into_question).transpose()
  }

  async fn list_questions(&self, query: &QuestionQuery) -> Result<Vec<Question>> {
    let mut conds: Vec<String> = vec![];
    let mut params: Vec<Value> = vec![];

    match query.scope {
      Scope::Public => {
        conds.push(format!(
          "visible = 1 AND {}",
          status_predicate(QuestionStatus::Answered)
        ));
      }
      Scope::AuthoredBy(author) => {
        params.push(Value::Text(encode_uuid(author)));
        conds.push(format!("author_id = ?{}", params.len()));
      }
      Scope::All => {}
    }
    if let Some(status) = query.status {
      conds.push(status_predicate(status));
    }
    if let Some(theme) = query.theme {
      params.push(Value::Text(theme.to_string()));
      conds.push(format!("theme = ?{}", params.len()));
    }
    if let Some(text) = &query.text {
      params.push(Value::Text(text.to_lowercase()));
      conds.push(format!("instr(fold(full_text), ?{}) > 0", params.len()));
    }

    let where_clause = if conds.is_empty() {
      String::new()
    } else {
      format!("WHERE {}", conds.join(" AND "))
    };

    params.push(Value::Integer(i64::try_from(query.limit).unwrap_or(i64::MAX)));
    let limit_idx = params.len();
    params.push(Value::Integer(i64::try_from(query.offset).unwrap_or(i64::MAX)));
    let offset_idx = params.len();

    let sql = format!(
      "SELECT {QUESTION_COLUMNS} FROM questions
       {where_clause}
       ORDER BY created_at DESC, question_id DESC
       LIMIT ?{limit_idx} OFFSET ?{offset_idx}"
    );

    let raws: Vec<RawQuestion> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), RawQuestion::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawQuestion::into_question).collect()
  }

  async fn update_question(
    &self,
    question_id: Uuid,
    guard: Guard,
    change: QuestionChange,
  ) -> Result<Option<Question>> {
    let id_str = encode_uuid(question_id);
    let mut params = vec![Value::Text(id_str.clone())];
    let set_clause = change_sql(change, &mut params);
    let guard_clause = guard_sql(guard, &mut params);
    let sql = format!(
      "UPDATE questions SET {set_clause} WHERE question_id = ?1 AND {guard_clause}"
    );

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let n = tx.execute(&sql, rusqlite::params_from_iter(params))?;
        let raw = if n == 1 { select_question(&tx, &id_str)? } else { None };
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw.map(RawQuestion::into_question).transpose()
  }

  async fn delete_question(&self, question_id: Uuid, guard: Guard) -> Result<bool> {
    let mut params = vec![Value::Text(encode_uuid(question_id))];
    let guard_clause = guard_sql(guard, &mut params);
    let sql = format!("DELETE FROM questions WHERE question_id = ?1 AND {guard_clause}");

    let n = self
      .conn
      .call(move |conn| Ok(conn.execute(&sql, rusqlite::params_from_iter(params))?))
      .await?;
    Ok(n == 1)
  }

  // ── Reactions ─────────────────────────────────────────────────────────────

  async fn toggle_reaction(
    &self,
    question_id: Uuid,
    user_id: Uuid,
    kind: ReactionKind,
  ) -> Result<Option<ReactionKind>> {
    let qid_str = encode_uuid(question_id);
    let uid_str = encode_uuid(user_id);
    let at_str = encode_dt(Utc::now());

    let held = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let current: Option<String> = tx
          .query_row(
            "SELECT kind FROM question_reactions
             WHERE question_id = ?1 AND user_id = ?2",
            rusqlite::params![qid_str, uid_str],
            |r| r.get(0),
          )
          .optional()?;
        let current = current.and_then(|s| s.parse::<ReactionKind>().ok());

        let held = toggled(current, kind);
        match held {
          None => {
            tx.execute(
              "DELETE FROM question_reactions WHERE question_id = ?1 AND user_id = ?2",
              rusqlite::params![qid_str, uid_str],
            )?;
          }
          Some(new_kind) => {
            tx.execute(
              "INSERT INTO question_reactions (question_id, user_id, kind, reacted_at)
               VALUES (?1, ?2, ?3, ?4)
               ON CONFLICT (question_id, user_id)
               DO UPDATE SET kind = excluded.kind, reacted_at = excluded.reacted_at",
              rusqlite::params![qid_str, uid_str, new_kind.to_string(), at_str],
            )?;
          }
        }
        tx.commit()?;
        Ok(held)
      })
      .await?;
    Ok(held)
  }

  async fn tally(&self, question_id: Uuid, viewer: Option<Uuid>) -> Result<Tally> {
    let qid_str = encode_uuid(question_id);
    let viewer_str = viewer.map(encode_uuid);

    let (likes, dislikes, own): (i64, i64, Option<String>) = self
      .conn
      .call(move |conn| {
        let (likes, dislikes) = conn.query_row(
          "SELECT
             COALESCE(SUM(kind = 'like'), 0),
             COALESCE(SUM(kind = 'dislike'), 0)
           FROM question_reactions WHERE question_id = ?1",
          rusqlite::params![qid_str],
          |r| Ok((r.get::<_, i64>(0)?, r.get::<_, i64>(1)?)),
        )?;

        let own = match viewer_str {
          Some(uid) => conn
            .query_row(
              "SELECT kind FROM question_reactions
               WHERE question_id = ?1 AND user_id = ?2",
              rusqlite::params![qid_str, uid],
              |r| r.get(0),
            )
            .optional()?,
          None => None,
        };
        Ok((likes, dislikes, own))
      })
      .await?;

    let caller_reaction = own
      .map(|s| {
        s.parse::<ReactionKind>()
          .map_err(|_| Error::Decode { column: "kind", value: s })
      })
      .transpose()?;

    Ok(Tally {
      like_count: u64::try_from(likes).unwrap_or(0),
      dislike_count: u64::try_from(dislikes).unwrap_or(0),
      caller_reaction,
    })
  }

  // ── Documents ─────────────────────────────────────────────────────────────

  async fn insert_document(&self, document: Document) -> Result<()> {
    let id_str       = encode_uuid(document.document_id);
    let level_str    = document.level.to_string();
    let size         = i64::try_from(document.size_bytes).unwrap_or(i64::MAX);
    let uploader_str = encode_uuid(document.uploaded_by);
    let at_str       = encode_dt(document.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO documents (
             document_id, name, level, file_name, size_bytes,
             content_hash, url, storage_path, uploaded_by, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
          rusqlite::params![
            id_str,
            document.name,
            level_str,
            document.file_name,
            size,
            document.content_hash,
            document.url,
            document.storage_path,
            uploader_str,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_document(&self, document_id: Uuid) -> Result<Option<Document>> {
    let id_str = encode_uuid(document_id);

    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE document_id = ?1"),
              rusqlite::params![id_str],
              RawDocument::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawDocument::into_document).transpose()
  }

  async fn list_documents(&self, level: Option<Level>) -> Result<Vec<Document>> {
    let level_str = level.map(|l| l.to_string());

    let raws: Vec<RawDocument> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {DOCUMENT_COLUMNS} FROM documents
           WHERE ?1 IS NULL OR level = ?1
           ORDER BY created_at DESC, document_id DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![level_str], RawDocument::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawDocument::into_document).collect()
  }

  async fn delete_document(&self, document_id: Uuid) -> Result<Option<Document>> {
    let id_str = encode_uuid(document_id);

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let raw = tx
          .query_row(
            &format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE document_id = ?1"),
            rusqlite::params![id_str],
            RawDocument::from_row,
          )
          .optional()?;
        if raw.is_some() {
          tx.execute(
            "DELETE FROM documents WHERE document_id = ?1",
            rusqlite::params![id_str],
          )?;
        }
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw.map(RawDocument::into_document).transpose()
  }
}
