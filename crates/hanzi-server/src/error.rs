//! Server error type and axum `IntoResponse` implementation.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unauthorized")]
  Unauthorized,

  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("internal error: {0}")]
  Internal(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      Error::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
      Error::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      Error::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      Error::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      Error::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m.clone()),
      Error::Store(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };

    let is_unauthorized = matches!(self, Error::Unauthorized);
    let mut res = (status, Json(json!({ "error": message }))).into_response();
    if is_unauthorized {
      res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Bearer realm=\"hanzi\""),
      );
    }
    res
  }
}
