//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use prefecture_core::{Denial, Error};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Portal(#[from] Error),
}

impl ApiError {
  /// HTTP status and the machine-readable `kind` reported in the body.
  fn classify(&self) -> (StatusCode, &'static str) {
    match self {
      Self::Portal(Error::Validation { .. }) => {
        (StatusCode::UNPROCESSABLE_ENTITY, "validation")
      }
      Self::Portal(Error::Permission(Denial::NotAuthenticated)) => {
        (StatusCode::UNAUTHORIZED, "permission")
      }
      Self::Portal(Error::Permission(_)) => (StatusCode::FORBIDDEN, "permission"),
      Self::Portal(Error::NotFound { .. }) => (StatusCode::NOT_FOUND, "not_found"),
      Self::Portal(Error::Transient(_)) => {
        (StatusCode::SERVICE_UNAVAILABLE, "transient")
      }
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, kind) = self.classify();
    let body = match &self {
      ApiError::Portal(Error::Validation { field, reason }) => {
        json!({ "error": reason, "kind": kind, "field": field })
      }
      ApiError::Portal(Error::Transient(e)) => {
        tracing::error!(error = %e, "backing store failure");
        json!({ "error": "the service is temporarily unavailable", "kind": kind })
      }
      ApiError::Portal(Error::Permission(denial)) => {
        json!({ "error": denial.to_string(), "kind": kind })
      }
      other => json!({ "error": other.to_string(), "kind": kind }),
    };
    (status, Json(body)).into_response()
  }
}
