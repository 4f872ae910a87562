//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Bodies follow one convention: field validation failures are a map of
//! field name to messages, everything else is `{"detail": "..."}`.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use malaria24_core::validation::FieldErrors;
use serde_json::json;
use thiserror::Error;

pub const NOT_AUTHENTICATED: &str = "Authentication credentials were not provided.";
pub const PERMISSION_DENIED: &str = "You do not have permission to perform this action.";

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("validation failed: {0}")]
  Validation(FieldErrors),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("forbidden: {0}")]
  Forbidden(&'static str),

  #[error("not found")]
  NotFound,

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }
}

impl From<FieldErrors> for ApiError {
  fn from(errors: FieldErrors) -> Self { Self::Validation(errors) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    match self {
      ApiError::Validation(errors) => (StatusCode::BAD_REQUEST, Json(errors)).into_response(),
      ApiError::BadRequest(detail) => {
        (StatusCode::BAD_REQUEST, Json(json!({ "detail": detail }))).into_response()
      }
      ApiError::Forbidden(detail) => {
        (StatusCode::FORBIDDEN, Json(json!({ "detail": detail }))).into_response()
      }
      ApiError::NotFound => {
        (StatusCode::NOT_FOUND, Json(json!({ "detail": "Not found." }))).into_response()
      }
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store error while handling request");
        (
          StatusCode::INTERNAL_SERVER_ERROR,
          Json(json!({ "detail": "A server error occurred." })),
        )
          .into_response()
      }
    }
  }
}
