pub mod jwt;
pub mod pass;
pub mod csrf;
pub mod session;

pub use self::{
  jwt::*,
  session::*,
};

use crate::app::AppConfig;
use crate::error::*;

pub const DEFAULT_COOKIE_NAME: &str = "jwt_token";
pub const DEFAULT_TOKEN_DAYS: i64 = 7;

/// Server secret and session cookie settings.
#[derive(Debug, Clone)]
pub struct AuthConfig {
  pub secret: String,
  pub cookie_name: String,
  pub token_days: i64,
}

impl AuthConfig {
  pub fn new(secret: &str) -> Self {
    Self {
      secret: secret.to_string(),
      cookie_name: DEFAULT_COOKIE_NAME.to_string(),
      token_days: DEFAULT_TOKEN_DAYS,
    }
  }

  pub fn load(config: &AppConfig) -> Result<Self> {
    let secret = match config.get_str("auth.secret")? {
      Some(secret) if !secret.is_empty() => secret,
      _ => dotenv::var("JWT_SECRET")
        .map_err(|_| anyhow::anyhow!("auth.secret or JWT_SECRET must be set"))?,
    };
    let mut auth = Self::new(&secret);
    if let Some(name) = config.get_str("auth.cookie_name")? {
      auth.cookie_name = name;
    }
    if let Some(days) = config.get_int("auth.token_days")? {
      auth.token_days = days.max(1);
    }
    Ok(auth)
  }
}
