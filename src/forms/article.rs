use serde::{Deserialize, Serialize};

use crate::models::{ArticleChanges, ArticleFilter, NewArticle, clean_tags};

#[derive(Debug, Serialize, Deserialize)]
pub struct ArticleOut<T> {
  pub article: T,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleList<T> {
  pub articles: Vec<T>,
  pub articles_count: i64,
}

#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ArticleRequest {
  pub tag: Option<String>,
  pub author: Option<String>,
  pub favorited: Option<String>,
  pub limit: Option<i64>,
  pub offset: Option<i64>,
}

impl ArticleRequest {
  pub fn into_filter(self, page_size: i64) -> ArticleFilter {
    ArticleFilter {
      tag: self.tag.filter(|t| !t.is_empty()),
      author: self.author.filter(|a| !a.is_empty()),
      favorited_by: self.favorited.filter(|f| !f.is_empty()),
      limit: self.limit.unwrap_or(page_size).clamp(1, 100),
      offset: self.offset.unwrap_or(0).max(0),
    }
  }
}

#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct FeedRequest {
  pub limit: Option<i64>,
  pub offset: Option<i64>,
}

/// Display variant flags for the favorite button, from the query string.
#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct FavoriteVariant {
  pub align: Option<String>,
  pub variant: Option<String>,
}

impl FavoriteVariant {
  pub fn align_right(&self) -> bool {
    self.align.as_deref() == Some("right")
  }

  pub fn compact(&self) -> bool {
    self.variant.as_deref() == Some("compact")
  }
}

/// Editor form.  `tags` is a comma separated list.
#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ArticleForm {
  #[serde(default)]
  pub title: String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub body: String,
  pub tags: Option<String>,
}

impl ArticleForm {
  pub fn validate(&self) -> Vec<String> {
    if self.title.trim().is_empty()
      || self.description.trim().is_empty()
      || self.body.trim().is_empty() {
      vec!["Title, description, and body are required".to_string()]
    } else {
      Vec::new()
    }
  }

  fn tag_list(&self) -> Option<Vec<String>> {
    self.tags.as_ref().map(|tags| clean_tags(tags.split(',')))
  }

  pub fn to_new_article(&self) -> NewArticle {
    NewArticle {
      title: self.title.trim().to_string(),
      description: self.description.clone(),
      body: self.body.clone(),
      tag_list: self.tag_list().unwrap_or_default(),
    }
  }

  pub fn to_changes(&self) -> ArticleChanges {
    ArticleChanges {
      title: self.title.trim().to_string(),
      description: self.description.clone(),
      body: self.body.clone(),
      tag_list: self.tag_list(),
    }
  }
}

#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct TagRequest {
  pub q: Option<String>,
  pub min: Option<i64>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn tags_field_is_split_and_trimmed() {
    let form = ArticleForm {
      title: " Hello ".into(),
      description: "d".into(),
      body: "b".into(),
      tags: Some("rust, web ,,rust".into()),
    };
    let article = form.to_new_article();
    assert_eq!(article.title, "Hello");
    assert_eq!(article.tag_list, vec!["rust", "web"]);
  }

  #[test]
  fn missing_tags_field_keeps_tag_set() {
    let form = ArticleForm {
      title: "t".into(),
      description: "d".into(),
      body: "b".into(),
      tags: None,
    };
    assert_eq!(form.to_changes().tag_list, None);
  }

  #[test]
  fn blank_fields_fail_validation() {
    let form = ArticleForm { title: "t".into(), ..Default::default() };
    assert_eq!(form.validate().len(), 1);
  }

  #[test]
  fn favorite_variant_flags() {
    let v = FavoriteVariant { align: Some("right".into()), variant: Some("compact".into()) };
    assert!(v.align_right() && v.compact());
    let v = FavoriteVariant { align: Some("left".into()), variant: None };
    assert!(!v.align_right() && !v.compact());
  }
}
