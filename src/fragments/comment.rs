use chrono::NaiveDateTime;

use crate::models::CommentDetails;
use crate::util::{attr, month_day, segment, text};

use super::{Fragment, FragmentKind};

pub const DEFAULT_AVATAR: &str = "/img/smiley-cyrus.avif";

#[derive(Debug, Clone, PartialEq)]
pub struct CommentCard {
  pub id: i32,
  pub body: String,
  pub author_username: String,
  pub author_image: Option<String>,
  pub created_at: NaiveDateTime,
  pub article_slug: String,
  pub can_delete: bool,
}

impl CommentCard {
  /// Card for `comment` as seen by `viewer`.
  pub fn new(comment: &CommentDetails, article_slug: &str, viewer: Option<i32>) -> Self {
    CommentCard {
      id: comment.id,
      body: comment.body.clone(),
      author_username: comment.author.username.clone(),
      author_image: comment.author.image.clone(),
      created_at: comment.created_at,
      article_slug: article_slug.to_string(),
      can_delete: viewer == Some(comment.author.user_id),
    }
  }

  fn avatar(&self) -> &str {
    match self.author_image.as_deref().map(str::trim) {
      Some(image) if !image.is_empty() => image,
      _ => DEFAULT_AVATAR,
    }
  }
}

impl Fragment for CommentCard {
  const KIND: FragmentKind = FragmentKind::CommentCard;

  fn render(&self) -> String {
    let profile = attr(&format!("/profile/{}", segment(&self.author_username)));
    let mod_options = if self.can_delete {
      let url = format!("/article/{}/comment/{}", segment(&self.article_slug), self.id);
      format!(
        r##"<span class="mod-options"><i class="ion-trash-a" fx-action="{}" fx-method="DELETE" fx-target="#comment-{}" fx-swap="outerHTML"></i></span>"##,
        attr(&url), self.id)
    } else {
      String::new()
    };
    format!(r#"<div class="card" id="comment-{id}">
  <div class="card-block">
    <p class="card-text">{body}</p>
  </div>
  <div class="card-footer">
    <a href="{profile}" class="comment-author"><img src="{image}" class="comment-author-img" /></a>
    &nbsp;
    <a href="{profile}" class="comment-author">{author}</a>
    <span class="date-posted">{date}</span>{mod_options}
  </div>
</div>"#,
      id = self.id,
      body = text(&self.body),
      profile = profile,
      image = attr(self.avatar()),
      author = text(&self.author_username),
      date = month_day(&self.created_at),
      mod_options = mod_options,
    )
  }
}
