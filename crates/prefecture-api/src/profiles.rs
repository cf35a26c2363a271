//! Handlers for `/me` and `/profiles`.

use axum::{Extension, Json, extract::State};
use prefecture_core::{
  Portal,
  profile::{Caller, Profile, ProfileNames},
  store::PortalStore,
};

use crate::error::ApiError;

/// `GET /me`
pub async fn me<S: PortalStore + 'static>(
  State(portal): State<Portal<S>>,
  Extension(caller): Extension<Caller>,
) -> Result<Json<Profile>, ApiError> {
  Ok(Json(portal.profile(&caller).await?))
}

/// `PATCH /me`: body `{"first_name":"..","last_name":".."}`; blanks clear.
pub async fn update_me<S: PortalStore + 'static>(
  State(portal): State<Portal<S>>,
  Extension(caller): Extension<Caller>,
  Json(names): Json<ProfileNames>,
) -> Result<Json<Profile>, ApiError> {
  Ok(Json(portal.update_names(&caller, names).await?))
}

/// `GET /profiles` (admin)
pub async fn list<S: PortalStore + 'static>(
  State(portal): State<Portal<S>>,
  Extension(caller): Extension<Caller>,
) -> Result<Json<Vec<Profile>>, ApiError> {
  Ok(Json(portal.profiles(&caller).await?))
}
