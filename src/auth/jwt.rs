use serde::{Deserialize, Serialize};

use chrono::{Duration, Utc};

use jsonwebtoken::{
  encode, Header, EncodingKey,
  decode, DecodingKey,
  Algorithm, Validation
};

use log::*;

use crate::error::*;
use crate::models::User;
use super::AuthConfig;

/// Session token claims.  Only `sub` is trusted for identity; profile
/// fields are always re-read from storage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
  pub sub: String,
  pub username: String,
  pub email: String,
  pub iat: i64,
  pub exp: i64,
}

impl Claims {
  pub fn user_id(&self) -> Option<i32> {
    self.sub.parse().ok()
  }
}

pub fn issue_token(auth: &AuthConfig, user_id: i32, username: &str, email: &str) -> Result<String> {
  let now = Utc::now();
  let claims = Claims {
    sub: user_id.to_string(),
    username: username.to_string(),
    email: email.to_string(),
    iat: now.timestamp(),
    exp: (now + Duration::days(auth.token_days)).timestamp(),
  };
  encode_claims(auth, &claims)
}

fn encode_claims(auth: &AuthConfig, claims: &Claims) -> Result<String> {
  let header = Header::new(Algorithm::HS256);
  let secret = &EncodingKey::from_secret(auth.secret.as_ref());
  Ok(encode(&header, claims, secret)?)
}

/// Verify signature and expiry.  Any failure is `None`.
pub fn validate_token(auth: &AuthConfig, token: &str) -> Option<Claims> {
  let secret_key = DecodingKey::from_secret(auth.secret.as_ref());
  let mut validation = Validation::new(Algorithm::HS256);
  validation.leeway = 0;
  match decode::<Claims>(token, &secret_key, &validation) {
    Ok(data) => Some(data.claims),
    Err(err) => {
      debug!("Rejected session token: {}", err);
      None
    },
  }
}

pub trait GenerateJwt {
  fn generate_jwt(&self, auth: &AuthConfig) -> Result<String>;
}

pub trait DecodeJwt {
  fn decode_jwt(&self, auth: &AuthConfig) -> Option<Claims>;
}

impl GenerateJwt for User {
  fn generate_jwt(&self, auth: &AuthConfig) -> Result<String> {
    issue_token(auth, self.id, &self.username, &self.email)
  }
}

impl DecodeJwt for str {
  fn decode_jwt(&self, auth: &AuthConfig) -> Option<Claims> {
    validate_token(auth, self)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn auth() -> AuthConfig {
    AuthConfig::new("test-secret")
  }

  #[test]
  fn issued_token_round_trips_claims() {
    let token = issue_token(&auth(), 42, "jake", "jake@jake.jake").unwrap();
    let claims = token.as_str().decode_jwt(&auth()).unwrap();
    assert_eq!(claims.user_id(), Some(42));
    assert_eq!(claims.username, "jake");
    assert_eq!(claims.email, "jake@jake.jake");
    assert_eq!(claims.exp - claims.iat, 7 * 24 * 3600);
  }

  #[test]
  fn wrong_secret_is_rejected() {
    let token = issue_token(&auth(), 1, "a", "a@a").unwrap();
    assert_eq!(validate_token(&AuthConfig::new("other"), &token), None);
  }

  #[test]
  fn expired_token_is_rejected() {
    let now = Utc::now().timestamp();
    let claims = Claims {
      sub: "1".into(),
      username: "a".into(),
      email: "a@a".into(),
      iat: now - 7200,
      exp: now - 3600,
    };
    let token = encode_claims(&auth(), &claims).unwrap();
    assert_eq!(validate_token(&auth(), &token), None);
  }

  #[test]
  fn garbage_is_rejected() {
    assert_eq!(validate_token(&auth(), "not.a.token"), None);
    assert_eq!(validate_token(&auth(), ""), None);
  }
}
