use chrono::NaiveDateTime;

use serde::{Deserialize, Serialize};

use crate::models::*;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommentDetails {
  pub id: i32,
  #[serde(skip)]
  pub article_id: i32,
  pub created_at: NaiveDateTime,
  pub updated_at: NaiveDateTime,
  pub body: String,
  pub author: user::Profile,
}
