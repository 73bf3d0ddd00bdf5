use futures::future::{ready, Ready};

use actix_web::{
  cookie::{time::{Duration, OffsetDateTime}, Cookie, SameSite},
  dev::Payload,
  http::header::{HeaderMap, AUTHORIZATION},
  FromRequest, HttpMessage, HttpRequest,
};

use crate::error::*;
use crate::models::User;
use super::AuthConfig;

const TOKEN_PREFIX: &str = "bearer";

/// Per-request identity, resolved once by the `Authenticate` middleware.
#[derive(Debug, Clone, Default)]
pub struct Session {
  pub user: Option<User>,
  pub csrf_token: String,
}

impl Session {
  pub fn user_id(&self) -> Option<i32> {
    self.user.as_ref().map(|u| u.id)
  }

  /// Current user, or a redirect of the whole page to the login form.
  pub fn require(&self) -> Result<&User> {
    self.user.as_ref().ok_or(Error::LoginRequired)
  }

  /// Current user, or a redirect signal for the client swap script.
  pub fn require_for_swap(&self) -> Result<&User> {
    self.user.as_ref().ok_or_else(|| Error::ClientRedirect(LOGIN_PATH.to_string()))
  }
}

impl FromRequest for Session {
  type Error = actix_web::Error;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
    ready(Ok(req.extensions().get::<Session>().cloned().unwrap_or_default()))
  }
}

/// `Authorization: Bearer <token>` value, if present and well formed.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
  let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
  let (scheme, token) = value.split_at(value.find(char::is_whitespace)?);
  if !scheme.eq_ignore_ascii_case(TOKEN_PREFIX) {
    return None;
  }
  let token = token.trim();
  if token.is_empty() {
    None
  } else {
    Some(token.to_string())
  }
}

/// Session token from the header, falling back to the session cookie.
pub fn request_token(headers: &HeaderMap, cookie: Option<Cookie<'_>>) -> Option<String> {
  bearer_token(headers).or_else(|| {
    cookie.map(|c| c.value().to_string()).filter(|v| !v.is_empty())
  })
}

pub fn session_cookie(auth: &AuthConfig, token: String) -> Cookie<'static> {
  Cookie::build(auth.cookie_name.clone(), token)
    .path("/")
    .http_only(true)
    .same_site(SameSite::Lax)
    .max_age(Duration::days(auth.token_days))
    .expires(OffsetDateTime::now_utc() + Duration::days(auth.token_days))
    .finish()
}

/// Already-expired cookie with the session cookie's name and attributes.
pub fn removal_cookie(auth: &AuthConfig) -> Cookie<'static> {
  let mut cookie = Cookie::build(auth.cookie_name.clone(), "")
    .path("/")
    .http_only(true)
    .same_site(SameSite::Lax)
    .finish();
  cookie.make_removal();
  cookie
}
