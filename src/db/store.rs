use async_trait::async_trait;

use crate::error::*;
use crate::models::*;

/// User rows and the follow association.
///
/// `create` and `update` return `Error::Conflict` on a duplicate username or
/// email.  `follow`/`unfollow` are idempotent.
#[async_trait(?Send)]
pub trait UserStore {
  async fn create(&self, user: &NewUser) -> Result<i32>;

  async fn get_by_id(&self, id: i32) -> Result<Option<User>>;

  async fn get_by_username(&self, username: &str) -> Result<Option<User>>;

  async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

  async fn update(&self, id: i32, changes: &UserChanges) -> Result<bool>;

  async fn update_password(&self, id: i32, password_hash: &str) -> Result<()>;

  async fn profile(&self, viewer: Option<i32>, username: &str) -> Result<Option<Profile>>;

  async fn follow(&self, follower_id: i32, followed_id: i32) -> Result<()>;

  async fn unfollow(&self, follower_id: i32, followed_id: i32) -> Result<()>;

  async fn is_following(&self, follower_id: i32, followed_id: i32) -> Result<bool>;
}

/// Articles, their tag sets and the favorite association.
///
/// Tag lists and favorites counts are always computed from the association
/// rows at read time.  Multi-step writes apply completely or not at all.
#[async_trait(?Send)]
pub trait ArticleStore {
  /// Returns the new, unique slug.
  async fn create(&self, author_id: i32, article: &NewArticle) -> Result<String>;

  /// `None` when the article is missing or not owned by `author_id`.
  async fn update(&self, slug: &str, author_id: i32, changes: &ArticleChanges) -> Result<Option<String>>;

  async fn delete(&self, slug: &str, author_id: i32) -> Result<bool>;

  async fn get_by_slug(&self, viewer: Option<i32>, slug: &str) -> Result<Option<ArticleDetails>>;

  async fn list(&self, viewer: Option<i32>, filter: &ArticleFilter) -> Result<Page<ArticleDetails>>;

  /// Articles by authors `user_id` follows.
  async fn feed(&self, user_id: i32, limit: i64, offset: i64) -> Result<Page<ArticleDetails>>;

  async fn favorite(&self, user_id: i32, article_id: i32) -> Result<()>;

  async fn unfavorite(&self, user_id: i32, article_id: i32) -> Result<()>;

  async fn is_favorited(&self, user_id: i32, article_id: i32) -> Result<bool>;

  async fn favorites_count(&self, article_id: i32) -> Result<i64>;

  /// Tag names used by at least `min_count` articles, most used first.
  async fn tags(&self, min_count: i64) -> Result<Vec<String>>;
}

#[async_trait(?Send)]
pub trait CommentStore {
  /// Returns the stored row, re-read with its author.
  async fn create(&self, article_id: i32, author_id: i32, body: &str) -> Result<CommentDetails>;

  /// Only deletes when `author_id` wrote the comment.
  async fn delete(&self, id: i32, author_id: i32) -> Result<bool>;

  async fn get_by_id(&self, viewer: Option<i32>, id: i32) -> Result<Option<CommentDetails>>;

  /// Newest first.
  async fn list_by_article(&self, viewer: Option<i32>, article_id: i32) -> Result<Vec<CommentDetails>>;
}
