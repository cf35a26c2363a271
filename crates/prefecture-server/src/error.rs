//! Error types and axum `IntoResponse` implementation for the server's own
//! routes. Portal errors are rendered by [`prefecture_api::ApiError`].

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use prefecture_api::ApiError;
use serde_json::json;
use thiserror::Error;

use crate::blob::BlobError;

#[derive(Debug, Error)]
pub enum Error {
  /// Credentials were presented but did not check out.
  #[error("unauthorized")]
  Unauthorized,

  #[error("password hashing failed: {0}")]
  Hash(String),

  #[error(transparent)]
  Portal(#[from] prefecture_core::Error),

  #[error(transparent)]
  Blob(#[from] BlobError),
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    match self {
      Error::Unauthorized => {
        let mut res = (
          StatusCode::UNAUTHORIZED,
          Json(json!({ "error": "invalid credentials", "kind": "permission" })),
        )
          .into_response();
        res.headers_mut().insert(
          header::WWW_AUTHENTICATE,
          HeaderValue::from_static("Basic realm=\"prefecture\""),
        );
        res
      }
      Error::Hash(msg) => {
        tracing::error!(error = %msg, "password hashing failed");
        (
          StatusCode::INTERNAL_SERVER_ERROR,
          Json(json!({ "error": "internal error", "kind": "internal" })),
        )
          .into_response()
      }
      Error::Portal(e) => ApiError::from(e).into_response(),
      Error::Blob(BlobError::BadSignature | BlobError::Expired | BlobError::InvalidPath(_)) => {
        (
          StatusCode::FORBIDDEN,
          Json(json!({ "error": "invalid or expired link", "kind": "permission" })),
        )
          .into_response()
      }
      Error::Blob(BlobError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "file not found", "kind": "not_found" })),
      )
        .into_response(),
      Error::Blob(e) => {
        tracing::error!(error = %e, "blob store failure");
        (
          StatusCode::SERVICE_UNAVAILABLE,
          Json(json!({ "error": "the service is temporarily unavailable", "kind": "transient" })),
        )
          .into_response()
      }
    }
  }
}
