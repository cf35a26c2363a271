//! Handlers for the student-facing `/questions` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/questions` | Public feed; `?page=&theme=&q=` |
//! | `POST`   | `/questions` | Body: `{"theme":"stage","full_text":"..."}` |
//! | `GET`    | `/questions/mine` | The caller's own questions, any state |
//! | `GET`    | `/questions/:id` | 404 unless visible to the caller |
//! | `PUT`    | `/questions/:id` | Author only, while pending |
//! | `DELETE` | `/questions/:id` | Author only, while pending |

use axum::{
  Extension, Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use prefecture_core::{
  Portal,
  lifecycle::Filter,
  profile::Caller,
  question::{QuestionDraft, QuestionView},
  store::{Page, PortalStore},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

// ─── Listings ────────────────────────────────────────────────────────────────

/// Query parameters shared by every question listing.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  /// Zero-based page index.
  #[serde(default)]
  pub page:  usize,
  pub theme: Option<String>,
  /// Free-text filter over the question body.
  pub q:     Option<String>,
}

impl ListParams {
  pub fn filter(&self) -> Result<Filter, ApiError> {
    Ok(Filter::parse(self.theme.as_deref(), self.q.as_deref())?)
  }
}

/// `GET /questions[?page=&theme=&q=]`
pub async fn feed<S: PortalStore + 'static>(
  State(portal): State<Portal<S>>,
  Extension(caller): Extension<Caller>,
  Query(params): Query<ListParams>,
) -> Result<Json<Page<QuestionView>>, ApiError> {
  let filter = params.filter()?;
  Ok(Json(portal.public_feed(&caller, params.page, &filter).await?))
}

/// `GET /questions/mine[?page=&theme=&q=]`
pub async fn mine<S: PortalStore + 'static>(
  State(portal): State<Portal<S>>,
  Extension(caller): Extension<Caller>,
  Query(params): Query<ListParams>,
) -> Result<Json<Page<QuestionView>>, ApiError> {
  let filter = params.filter()?;
  Ok(Json(portal.my_questions(&caller, params.page, &filter).await?))
}

// ─── Single question ─────────────────────────────────────────────────────────

/// `POST /questions`
pub async fn create<S: PortalStore + 'static>(
  State(portal): State<Portal<S>>,
  Extension(caller): Extension<Caller>,
  Json(draft): Json<QuestionDraft>,
) -> Result<impl IntoResponse, ApiError> {
  let question = portal.create(&caller, &draft).await?;
  Ok((StatusCode::CREATED, Json(question)))
}

/// `GET /questions/:id`
pub async fn get_one<S: PortalStore + 'static>(
  State(portal): State<Portal<S>>,
  Extension(caller): Extension<Caller>,
  Path(id): Path<Uuid>,
) -> Result<Json<QuestionView>, ApiError> {
  Ok(Json(portal.question(&caller, id).await?))
}

/// `PUT /questions/:id`
pub async fn edit<S: PortalStore + 'static>(
  State(portal): State<Portal<S>>,
  Extension(caller): Extension<Caller>,
  Path(id): Path<Uuid>,
  Json(draft): Json<QuestionDraft>,
) -> Result<Json<QuestionView>, ApiError> {
  Ok(Json(portal.edit(&caller, id, &draft).await?))
}

/// `DELETE /questions/:id`
pub async fn delete<S: PortalStore + 'static>(
  State(portal): State<Portal<S>>,
  Extension(caller): Extension<Caller>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  portal.delete(&caller, id).await?;
  Ok(StatusCode::NO_CONTENT)
}
