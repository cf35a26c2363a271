//! HTTP Basic authentication against stored argon2 credentials.
//!
//! The middleware turns every request into a [`Caller`]: no `Authorization`
//! header yields [`Caller::Anonymous`], valid credentials yield the member
//! (creating the profile on first sign-in), and anything else is a 401.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum::{
  extract::{Request, State},
  http::{HeaderMap, header},
  middleware::Next,
  response::Response,
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use prefecture_core::{
  Portal,
  profile::{Caller, normalize_email},
  store::PortalStore,
};
use rand_core::OsRng;
use tracing::debug;

use crate::{AppState, error::Error};

/// Hash a password into an argon2 PHC string.
pub fn hash_password(password: &str) -> Result<String, Error> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| Error::Hash(e.to_string()))
}

fn verify_password(password: &str, phc: &str) -> Result<(), Error> {
  let parsed = PasswordHash::new(phc).map_err(|_| Error::Unauthorized)?;
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed)
    .map_err(|_| Error::Unauthorized)
}

/// Decode a `Basic` authorization header, if one is present.
pub fn basic_credentials(headers: &HeaderMap) -> Result<Option<(String, String)>, Error> {
  let Some(value) = headers.get(header::AUTHORIZATION) else {
    return Ok(None);
  };
  let value = value.to_str().map_err(|_| Error::Unauthorized)?;
  let encoded = value.strip_prefix("Basic ").ok_or(Error::Unauthorized)?;
  let decoded = B64.decode(encoded.trim()).map_err(|_| Error::Unauthorized)?;
  let creds = String::from_utf8(decoded).map_err(|_| Error::Unauthorized)?;
  let (user, password) = creds.split_once(':').ok_or(Error::Unauthorized)?;
  Ok(Some((user.to_owned(), password.to_owned())))
}

/// Check an email/password pair and establish the caller's session.
pub async fn sign_in<S: PortalStore>(
  portal: &Portal<S>,
  email: &str,
  password: &str,
) -> Result<Caller, Error> {
  let email = normalize_email(email).map_err(|_| Error::Unauthorized)?;
  let account = portal
    .store()
    .find_account(&email)
    .await
    .map_err(prefecture_core::Error::transient)?
    .ok_or(Error::Unauthorized)?;

  verify_password(password, &account.password_hash)?;
  Ok(portal.sign_in(&account).await?)
}

/// Middleware attaching the request's [`Caller`] as an extension.
pub async fn authenticate<S: PortalStore + 'static>(
  State(state): State<AppState<S>>,
  mut req: Request,
  next: Next,
) -> Result<Response, Error> {
  let caller = match basic_credentials(req.headers())? {
    None => Caller::Anonymous,
    Some((email, password)) => match sign_in(&state.portal, &email, &password).await {
      Ok(caller) => caller,
      Err(e) => {
        debug!(error = %e, "sign-in refused");
        return Err(e);
      }
    },
  };
  req.extensions_mut().insert(caller);
  Ok(next.run(req).await)
}
