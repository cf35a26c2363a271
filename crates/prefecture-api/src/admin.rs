//! Handlers for the Préfecture's `/admin/questions` endpoints.
//!
//! Every route requires an admin caller; the engine enforces it.

use axum::{
  Extension, Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use prefecture_core::{
  Error, Portal,
  lifecycle::Filter,
  profile::Caller,
  question::{AdminDraft, QuestionStatus, QuestionView},
  store::{Page, PortalStore},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Default, Deserialize)]
pub struct QueueParams {
  #[serde(default)]
  pub page:   usize,
  /// `pending` or `answered` (legacy spellings accepted); all when absent.
  pub status: Option<String>,
  pub theme:  Option<String>,
  pub q:      Option<String>,
}

/// `GET /admin/questions[?status=&page=&theme=&q=]`
pub async fn queue<S: PortalStore + 'static>(
  State(portal): State<Portal<S>>,
  Extension(caller): Extension<Caller>,
  Query(params): Query<QueueParams>,
) -> Result<Json<Page<QuestionView>>, ApiError> {
  let status = params
    .status
    .as_deref()
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(|s| {
      s.parse::<QuestionStatus>()
        .map_err(|_| Error::invalid("status", format!("unknown status {s:?}")))
    })
    .transpose()?;
  let filter = Filter::parse(params.theme.as_deref(), params.q.as_deref())?;
  Ok(Json(portal.moderation_queue(&caller, status, params.page, &filter).await?))
}

/// `POST /admin/questions`: create an entry directly, FAQ style.
pub async fn create<S: PortalStore + 'static>(
  State(portal): State<Portal<S>>,
  Extension(caller): Extension<Caller>,
  Json(draft): Json<AdminDraft>,
) -> Result<impl IntoResponse, ApiError> {
  let question = portal.admin_create(&caller, &draft).await?;
  Ok((StatusCode::CREATED, Json(question)))
}

#[derive(Debug, Deserialize)]
pub struct AnswerBody {
  pub official_answer: String,
}

/// `POST /admin/questions/:id/answer`
pub async fn answer<S: PortalStore + 'static>(
  State(portal): State<Portal<S>>,
  Extension(caller): Extension<Caller>,
  Path(id): Path<Uuid>,
  Json(body): Json<AnswerBody>,
) -> Result<Json<QuestionView>, ApiError> {
  Ok(Json(portal.answer(&caller, id, &body.official_answer).await?))
}

/// `POST /admin/questions/:id/publish`
pub async fn publish<S: PortalStore + 'static>(
  State(portal): State<Portal<S>>,
  Extension(caller): Extension<Caller>,
  Path(id): Path<Uuid>,
) -> Result<Json<QuestionView>, ApiError> {
  Ok(Json(portal.publish(&caller, id).await?))
}

/// `POST /admin/questions/:id/unpublish`
pub async fn unpublish<S: PortalStore + 'static>(
  State(portal): State<Portal<S>>,
  Extension(caller): Extension<Caller>,
  Path(id): Path<Uuid>,
) -> Result<Json<QuestionView>, ApiError> {
  Ok(Json(portal.unpublish(&caller, id).await?))
}

/// `DELETE /admin/questions/:id`
pub async fn delete<S: PortalStore + 'static>(
  State(portal): State<Portal<S>>,
  Extension(caller): Extension<Caller>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  portal.admin_delete(&caller, id).await?;
  Ok(StatusCode::NO_CONTENT)
}
