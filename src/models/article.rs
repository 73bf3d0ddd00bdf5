use chrono::NaiveDateTime;

use serde::{Deserialize, Serialize};

use crate::models::*;

/// Article projection with author, live tag list and live favorites count.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ArticleDetails {
  #[serde(skip)]
  pub id: i32,
  pub slug: String,
  pub title: String,
  pub description: String,
  pub body: String,
  pub tag_list: Vec<String>,
  pub created_at: NaiveDateTime,
  pub updated_at: NaiveDateTime,
  pub favorited: bool,
  pub favorites_count: i64,
  pub author: user::Profile,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewArticle {
  pub title: String,
  pub description: String,
  pub body: String,
  pub tag_list: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArticleChanges {
  pub title: String,
  pub description: String,
  pub body: String,
  /// `None` keeps the current tag set.
  pub tag_list: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArticleFilter {
  pub tag: Option<String>,
  pub author: Option<String>,
  pub favorited_by: Option<String>,
  pub limit: i64,
  pub offset: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
  pub items: Vec<T>,
  pub total: i64,
}

/// Trim tag names, drop empties and duplicates, keep first-seen order.
pub fn clean_tags<I, S>(tags: I) -> Vec<String>
where
  I: IntoIterator<Item = S>,
  S: AsRef<str>,
{
  let mut out: Vec<String> = Vec::new();
  for tag in tags {
    let tag = tag.as_ref().trim();
    if !tag.is_empty() && !out.iter().any(|t| t == tag) {
      out.push(tag.to_string());
    }
  }
  out
}

/// URL-safe slug for a title.  Never empty.
pub fn slug_for_title(title: &str) -> String {
  let slug = slug::slugify(title);
  if slug.is_empty() {
    "n-a".to_string()
  } else {
    slug
  }
}

/// First of `base`, `base-1`, `base-2`, ... for which `taken` is false.
pub fn next_free_slug<F>(base: &str, taken: F) -> String
where
  F: Fn(&str) -> bool,
{
  if !taken(base) {
    return base.to_string();
  }
  let mut count = 1;
  loop {
    let candidate = format!("{}-{}", base, count);
    if !taken(&candidate) {
      return candidate;
    }
    count += 1;
  }
}
