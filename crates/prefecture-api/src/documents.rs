//! Handlers for `/documents` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/documents` | Optional `?level=L1\|L2\|L3\|MASTER1\|MASTER2` |
//! | `POST`   | `/documents` | `?name=&level=&file_name=`, raw file as body; admin |
//! | `DELETE` | `/documents/:id` | Admin |
//! | `GET`    | `/documents/:id/link` | Fresh signed download URL |

use axum::{
  Extension, Json,
  body::Bytes,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use prefecture_core::{
  Catalog,
  blob::{BlobStore, SignedLink},
  document::{Document, DocumentDraft, Level},
  profile::Caller,
  store::PortalStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

/// Largest accepted upload body.
pub const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  pub level: Option<String>,
}

/// `GET /documents[?level=]`
pub async fn list<S, B>(
  State(catalog): State<Catalog<S, B>>,
  Extension(caller): Extension<Caller>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Document>>, ApiError>
where
  S: PortalStore + 'static,
  B: BlobStore + 'static,
{
  let level = params
    .level
    .as_deref()
    .filter(|l| !l.trim().is_empty())
    .map(Level::parse_field)
    .transpose()?;
  Ok(Json(catalog.list(&caller, level).await?))
}

/// `POST /documents?name=&level=&file_name=`
pub async fn upload<S, B>(
  State(catalog): State<Catalog<S, B>>,
  Extension(caller): Extension<Caller>,
  Query(draft): Query<DocumentDraft>,
  body: Bytes,
) -> Result<impl IntoResponse, ApiError>
where
  S: PortalStore + 'static,
  B: BlobStore + 'static,
{
  let document = catalog.upload(&caller, &draft, body).await?;
  Ok((StatusCode::CREATED, Json(document)))
}

/// `DELETE /documents/:id`
pub async fn delete<S, B>(
  State(catalog): State<Catalog<S, B>>,
  Extension(caller): Extension<Caller>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: PortalStore + 'static,
  B: BlobStore + 'static,
{
  catalog.delete(&caller, id).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `GET /documents/:id/link`
pub async fn link<S, B>(
  State(catalog): State<Catalog<S, B>>,
  Extension(caller): Extension<Caller>,
  Path(id): Path<Uuid>,
) -> Result<Json<SignedLink>, ApiError>
where
  S: PortalStore + 'static,
  B: BlobStore + 'static,
{
  Ok(Json(catalog.link(&caller, id).await?))
}
