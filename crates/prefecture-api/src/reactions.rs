//! Handlers for `/questions/:id/reactions`.

use axum::{
  Extension, Json,
  extract::{Path, State},
};
use prefecture_core::{
  Portal,
  profile::Caller,
  reaction::{ReactionKind, Tally},
  store::PortalStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct ReactBody {
  pub kind: ReactionKind,
}

/// `GET /questions/:id/reactions`
pub async fn tally<S: PortalStore + 'static>(
  State(portal): State<Portal<S>>,
  Extension(caller): Extension<Caller>,
  Path(id): Path<Uuid>,
) -> Result<Json<Tally>, ApiError> {
  Ok(Json(portal.tally(&caller, id).await?))
}

/// `POST /questions/:id/reactions`: body `{"kind":"like"}`. Sending the
/// reaction already held withdraws it.
pub async fn react<S: PortalStore + 'static>(
  State(portal): State<Portal<S>>,
  Extension(caller): Extension<Caller>,
  Path(id): Path<Uuid>,
  Json(body): Json<ReactBody>,
) -> Result<Json<Tally>, ApiError> {
  Ok(Json(portal.react(&caller, id, body.kind).await?))
}
