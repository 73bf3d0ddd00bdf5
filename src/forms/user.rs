use serde::{Deserialize, Serialize};

use crate::models::{User, Profile};

pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct LoginUser {
  #[serde(default)]
  pub email: String,
  #[serde(default)]
  pub password: String,
}

#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct RegisterUser {
  #[serde(default)]
  pub username: String,
  #[serde(default)]
  pub email: String,
  #[serde(default)]
  pub password: String,
}

impl RegisterUser {
  pub fn validate(&self) -> Vec<String> {
    let mut errors = Vec::new();
    if self.username.trim().is_empty() {
      errors.push("username can't be blank".to_string());
    }
    if self.email.trim().is_empty() {
      errors.push("email can't be blank".to_string());
    }
    if self.password.chars().count() < MIN_PASSWORD_LEN {
      errors.push(format!("password must be at least {} characters", MIN_PASSWORD_LEN));
    }
    errors
  }
}

#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct UpdateUser {
  #[serde(default)]
  pub username: String,
  #[serde(default)]
  pub email: String,
  pub password: Option<String>,
  pub bio: Option<String>,
  pub image: Option<String>,
}

impl UpdateUser {
  /// New password, if one was actually typed in.
  pub fn new_password(&self) -> Option<&str> {
    self.password.as_deref().filter(|p| !p.is_empty())
  }

  pub fn validate(&self) -> Vec<String> {
    let mut errors = Vec::new();
    if self.username.trim().is_empty() {
      errors.push("username can't be blank".to_string());
    }
    if self.email.trim().is_empty() {
      errors.push("email can't be blank".to_string());
    }
    if let Some(password) = self.new_password() {
      if password.chars().count() < MIN_PASSWORD_LEN {
        errors.push(format!("password must be at least {} characters", MIN_PASSWORD_LEN));
      }
    }
    errors
  }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileOut {
  pub profile: Profile,
}

#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct SessionUser {
  pub username: String,
  pub email: String,
  pub bio: Option<String>,
  pub image: Option<String>,
}

impl From<&User> for SessionUser {
  fn from(user: &User) -> Self {
    SessionUser {
      username: user.username.clone(),
      email: user.email.clone(),
      bio: user.bio.clone(),
      image: user.image.clone(),
    }
  }
}

#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionOut {
  pub user: Option<SessionUser>,
  pub csrf_token: String,
}
