use chrono::NaiveDateTime;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
  pub id: i32,
  pub username: String,
  pub email: String,
  #[serde(skip_serializing)]
  pub password: String,
  pub bio: Option<String>,
  pub image: Option<String>,
  pub created_at: NaiveDateTime,
  pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profile {
  #[serde(skip)]
  pub user_id: i32,
  pub username: String,
  pub bio: Option<String>,
  pub image: Option<String>,
  pub following: bool,
}

/// Insert payload.  The password is already hashed.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
  pub username: String,
  pub email: String,
  pub password_hash: String,
}

/// Profile update.  `password_hash` is only set when a new password was given.
#[derive(Debug, Clone, PartialEq)]
pub struct UserChanges {
  pub username: String,
  pub email: String,
  pub bio: Option<String>,
  pub image: Option<String>,
  pub password_hash: Option<String>,
}
