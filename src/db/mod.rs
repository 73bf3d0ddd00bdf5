use log::*;

use std::rc::Rc;
use std::sync::Arc;

pub mod util;

mod store;
pub use self::store::*;

mod client;
pub use self::client::*;

mod user;
mod article;
mod comment;
pub use self::{
  user::UserService,
  article::ArticleService,
  comment::CommentService,
};

mod memory;
pub use self::memory::MemoryStore;

mod tag;
pub use self::tag::*;

use crate::error::*;
use crate::models::*;

pub const MEMORY_URL: &str = "memory:";

/// Per-worker handle on the stores plus the shared tag cache.
///
/// Article writes go through `DbService` so the tag cache is invalidated
/// whenever a tag set may change.
#[derive(Clone)]
pub struct DbService {
  pub user: Rc<dyn UserStore>,
  pub article: Rc<dyn ArticleStore>,
  pub comment: Rc<dyn CommentStore>,
  pg: Option<(UserService, ArticleService, CommentService)>,
  tag_cache: Arc<TagCache>,
}

impl DbService {
  pub fn memory(store: &MemoryStore, tag_cache: Arc<TagCache>) -> DbService {
    let store = Rc::new(store.clone());
    DbService {
      user: store.clone(),
      article: store.clone(),
      comment: store,
      pg: None,
      tag_cache,
    }
  }

  /// Postgres stores on a new per-worker client.  Must run inside the
  /// worker's runtime, the client connects in a background task.
  pub fn postgres(db_url: &str, tag_cache: Arc<TagCache>) -> Result<DbService> {
    let shared_cl = SharedClient::new(db_url);
    let user = UserService::new(shared_cl.clone())?;
    let article = ArticleService::new(shared_cl.clone())?;
    let comment = CommentService::new(shared_cl)?;

    Ok(DbService {
      user: Rc::new(user.clone()),
      article: Rc::new(article.clone()),
      comment: Rc::new(comment.clone()),
      pg: Some((user, article, comment)),
      tag_cache,
    })
  }

  /// Pick the backend from `db.url`.
  pub fn connect(db_url: &str, memory: Option<&MemoryStore>, tag_cache: Arc<TagCache>) -> Result<DbService> {
    if db_url == MEMORY_URL {
      let store = memory.ok_or_else(|| anyhow::anyhow!("memory store not initialized"))?;
      Ok(Self::memory(store, tag_cache))
    } else {
      Self::postgres(db_url, tag_cache)
    }
  }

  /// Prepare every statement, surfacing schema errors at startup.
  pub async fn prepare(&self) -> Result<()> {
    if let Some((user, article, comment)) = &self.pg {
      info!("DBService: Prepare UserService.");
      user.prepare().await?;
      info!("DBService: Prepare ArticleService.");
      article.prepare().await?;
      info!("DBService: Prepare CommentService.");
      comment.prepare().await?;
    }

    info!("DBService: finished.");
    Ok(())
  }

  pub async fn create_article(&self, author_id: i32, article: &NewArticle) -> Result<String> {
    let slug = self.article.create(author_id, article).await?;
    self.tag_cache.invalidate();
    Ok(slug)
  }

  pub async fn update_article(&self, slug: &str, author_id: i32, changes: &ArticleChanges) -> Result<Option<String>> {
    let res = self.article.update(slug, author_id, changes).await?;
    if res.is_some() && changes.tag_list.is_some() {
      self.tag_cache.invalidate();
    }
    Ok(res)
  }

  pub async fn delete_article(&self, slug: &str, author_id: i32) -> Result<bool> {
    let deleted = self.article.delete(slug, author_id).await?;
    if deleted {
      self.tag_cache.invalidate();
    }
    Ok(deleted)
  }

  /// Tag catalog through the cache.
  pub async fn tags(&self, min_count: i64) -> Result<Vec<String>> {
    let generation = match self.tag_cache.get(min_count) {
      CachedTags::Hit(tags) => return Ok(tags),
      CachedTags::Miss(generation) => generation,
    };
    let tags = self.article.tags(min_count).await?;
    self.tag_cache.put(min_count, generation, tags.clone());
    Ok(tags)
  }
}
