//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Maps the core error taxonomy onto HTTP status codes: missing entities to
//! 404, scope/ownership failures to 403, state-machine violations to 422
//! (user-correctable), concurrency conflicts to 409, backend faults to 500.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use sitrep_core::Error as CoreError;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("authentication required")]
  Unauthorized,

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error(transparent)]
  Core(#[from] CoreError),
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match &self {
      ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Core(core) => match core {
        CoreError::SituationNotFound(_)
        | CoreError::StructureNotFound(_)
        | CoreError::UserNotFound(_)
        | CoreError::CategoryNotFound(_) => StatusCode::NOT_FOUND,
        CoreError::Forbidden(_) => StatusCode::FORBIDDEN,
        CoreError::InvalidTransition { .. }
        | CoreError::DuplicatePeriod { .. }
        | CoreError::EmptyRejectionComment => StatusCode::UNPROCESSABLE_ENTITY,
        CoreError::Conflict(_) | CoreError::OwnedSituationsExist(_) => {
          StatusCode::CONFLICT
        }
        CoreError::Serialization(_) | CoreError::Storage(_) => {
          StatusCode::INTERNAL_SERVER_ERROR
        }
      },
    };
    (status, Json(json!({ "error": self.to_string() }))).into_response()
  }
}
