use log::*;

use actix_web::{
  error::ResponseError,
  http::{header, StatusCode},
  HttpResponse,
};
use serde_json::Value as JsonValue;

use libreauth::pass;

use jsonwebtoken::errors::Error as JwtError;

use thiserror::Error;

use crate::fragments::{ErrorMessages, Fragment};

/// Response header telling the client swap script to navigate the whole page.
pub const CLIENT_REDIRECT_HEADER: &str = "FX-Redirect";

pub const LOGIN_PATH: &str = "/login";

#[derive(Error, Debug)]
pub enum Error {
  // 303 to the login page, for endpoints reached by normal navigation.
  #[error("login required")]
  LoginRequired,

  // 401 + FX-Redirect, for endpoints only reached through the swap script.
  #[error("client redirect: {0}")]
  ClientRedirect(String),

  // 401
  #[error("unauthorized: {0}")]
  Unauthorized(JsonValue),

  // 403
  #[error("forbidden: {0}")]
  Forbidden(String),

  // 404
  #[error("not found: {0}")]
  NotFound(String),

  // 405
  #[error("method not allowed")]
  MethodNotAllowed,

  // 419
  #[error("CSRF token invalid")]
  CsrfMismatch,

  // 422
  #[error("unprocessable entity: {0:?}")]
  UnprocessableEntity(Vec<String>),

  // 400
  #[error("bad request: {0}")]
  BadRequest(String),

  // Uniqueness violation in storage.  Never sent to the client as-is.
  #[error("conflict: {0}")]
  Conflict(String),

  // 500
  #[error("internal server error")]
  InternalServerError,

  // Json error
  #[error("Json error: {source}")]
  JsonError {
    #[from]
    source: serde_json::Error,
  },

  // Password error
  #[error("Password error: {0}")]
  PasswordError(String),

  #[error("JWT error")]
  JwtError {
    #[from]
    source: JwtError,
  },

  #[error("disconnected: {0}")]
  DisconnectedError(String),

  #[error("postgres error")]
  PgError {
    #[from]
    source: tokio_postgres::error::Error,
  },

  #[error("std io error")]
  IOError {
    #[from]
    source: std::io::Error,
  },

  #[error("config error")]
  ConfigError {
    #[from]
    source: config::ConfigError,
  },

  #[error(transparent)]
  Other(#[from] anyhow::Error),
}

impl From<pass::ErrorCode> for Error {
  fn from(code: pass::ErrorCode) -> Self {
    Error::PasswordError(format!("code={:?}", code))
  }
}

impl Error {
  pub fn validation(message: &str) -> Self {
    Error::UnprocessableEntity(vec![message.to_string()])
  }

  /// True for storage uniqueness violations.
  pub fn is_conflict(&self) -> bool {
    matches!(self, Error::Conflict(_))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

pub fn csrf_status() -> StatusCode {
  StatusCode::from_u16(419).unwrap_or(StatusCode::FORBIDDEN)
}

fn plain_text(status: StatusCode, message: &str) -> HttpResponse {
  HttpResponse::build(status)
    .content_type("text/plain; charset=utf-8")
    .body(message.to_string())
}

// the ResponseError trait lets us convert errors to http responses with appropriate data
// https://actix.rs/docs/errors/
impl ResponseError for Error {
  fn status_code(&self) -> StatusCode {
    match self {
      Error::LoginRequired => StatusCode::SEE_OTHER,
      Error::ClientRedirect(_) | Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
      Error::Forbidden(_) => StatusCode::FORBIDDEN,
      Error::NotFound(_) => StatusCode::NOT_FOUND,
      Error::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
      Error::CsrfMismatch => csrf_status(),
      Error::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
      Error::BadRequest(_) => StatusCode::BAD_REQUEST,
      Error::DisconnectedError(_) => StatusCode::BAD_GATEWAY,
      _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn error_response(&self) -> HttpResponse {
    match self {
      Error::LoginRequired => {
        HttpResponse::SeeOther()
          .insert_header((header::LOCATION, LOGIN_PATH))
          .finish()
      },
      Error::ClientRedirect(ref location) => {
        HttpResponse::Unauthorized()
          .insert_header((CLIENT_REDIRECT_HEADER, location.as_str()))
          .finish()
      },
      Error::Unauthorized(ref message) => HttpResponse::Unauthorized().json(message),
      Error::Forbidden(ref message) => plain_text(StatusCode::FORBIDDEN, message),
      Error::NotFound(ref message) => plain_text(StatusCode::NOT_FOUND, message),
      Error::MethodNotAllowed => plain_text(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed"),
      Error::CsrfMismatch => plain_text(csrf_status(), "CSRF token invalid"),
      Error::UnprocessableEntity(ref messages) => {
        HttpResponse::UnprocessableEntity()
          .content_type("text/html; charset=utf-8")
          .body(ErrorMessages { messages: messages.clone() }.render())
      },
      Error::BadRequest(ref message) => plain_text(StatusCode::BAD_REQUEST, message),
      Error::DisconnectedError(ref message) => plain_text(StatusCode::BAD_GATEWAY, message),
      ref err => {
        error!("InternalServerError: {:?}", err);
        plain_text(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
      },
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn csrf_failure_uses_419() {
    let resp = Error::CsrfMismatch.error_response();
    assert_eq!(resp.status().as_u16(), 419);
  }

  #[test]
  fn client_redirect_sets_header() {
    let resp = Error::ClientRedirect(LOGIN_PATH.to_string()).error_response();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(resp.headers().get(CLIENT_REDIRECT_HEADER).unwrap(), "/login");
  }

  #[test]
  fn login_required_redirects_to_login() {
    let resp = Error::LoginRequired.error_response();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/login");
  }

  #[test]
  fn conflicts_are_internal_when_unhandled() {
    let err = Error::Conflict("username".into());
    assert!(err.is_conflict());
    assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
  }
}
