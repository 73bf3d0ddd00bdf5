use log::*;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};

use crate::error::*;
use crate::models::*;

use super::store::*;

#[derive(Debug, Clone)]
struct ArticleRow {
  id: i32,
  author_id: i32,
  slug: String,
  title: String,
  description: String,
  body: String,
  created_at: NaiveDateTime,
  updated_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
struct CommentRow {
  id: i32,
  article_id: i32,
  author_id: i32,
  body: String,
  created_at: NaiveDateTime,
  updated_at: NaiveDateTime,
}

/// Tables of the in-memory backend.  Same shape as `sql/schema.sql`.
#[derive(Debug, Default)]
struct MemoryData {
  last_id: i32,
  users: BTreeMap<i32, User>,
  articles: BTreeMap<i32, ArticleRow>,
  tags: BTreeMap<String, i32>,
  // (article_id, tag_id)
  article_tags: BTreeSet<(i32, i32)>,
  comments: BTreeMap<i32, CommentRow>,
  // (user_id, article_id)
  favorites: BTreeSet<(i32, i32)>,
  // (follower_id, followed_id)
  follows: BTreeSet<(i32, i32)>,
}

fn now() -> NaiveDateTime {
  Utc::now().naive_utc()
}

impl MemoryData {
  fn next_id(&mut self) -> i32 {
    self.last_id += 1;
    self.last_id
  }

  fn user_by_name(&self, username: &str) -> Option<&User> {
    self.users.values().find(|u| u.username == username)
  }

  fn check_unique_user(&self, id: Option<i32>, username: &str, email: &str) -> Result<()> {
    for user in self.users.values() {
      if Some(user.id) == id {
        continue;
      }
      if user.username == username {
        return Err(Error::Conflict("users_username_key".into()));
      }
      if user.email == email {
        return Err(Error::Conflict("users_email_key".into()));
      }
    }
    Ok(())
  }

  fn profile(&self, viewer: Option<i32>, user: &User) -> Profile {
    Profile {
      user_id: user.id,
      username: user.username.clone(),
      bio: user.bio.clone(),
      image: user.image.clone(),
      following: viewer.map_or(false, |v| self.follows.contains(&(v, user.id))),
    }
  }

  fn tag_list(&self, article_id: i32) -> Vec<String> {
    let mut names: Vec<String> = self.tags.iter()
      .filter(|(_, id)| self.article_tags.contains(&(article_id, **id)))
      .map(|(name, _)| name.clone())
      .collect();
    names.sort();
    names
  }

  fn favorites_count(&self, article_id: i32) -> i64 {
    self.favorites.iter().filter(|(_, a)| *a == article_id).count() as i64
  }

  fn article_details(&self, viewer: Option<i32>, row: &ArticleRow) -> Option<ArticleDetails> {
    let author = self.users.get(&row.author_id)?;
    Some(ArticleDetails {
      id: row.id,
      slug: row.slug.clone(),
      title: row.title.clone(),
      description: row.description.clone(),
      body: row.body.clone(),
      tag_list: self.tag_list(row.id),
      created_at: row.created_at,
      updated_at: row.updated_at,
      favorited: viewer.map_or(false, |v| self.favorites.contains(&(v, row.id))),
      favorites_count: self.favorites_count(row.id),
      author: self.profile(viewer, author),
    })
  }

  fn comment_details(&self, viewer: Option<i32>, row: &CommentRow) -> Option<CommentDetails> {
    let author = self.users.get(&row.author_id)?;
    Some(CommentDetails {
      id: row.id,
      article_id: row.article_id,
      created_at: row.created_at,
      updated_at: row.updated_at,
      body: row.body.clone(),
      author: self.profile(viewer, author),
    })
  }

  fn article_by_slug(&self, slug: &str) -> Option<&ArticleRow> {
    self.articles.values().find(|a| a.slug == slug)
  }

  fn unique_slug(&self, title: &str, own_id: Option<i32>) -> String {
    next_free_slug(&slug_for_title(title), |slug| {
      self.articles.values().any(|a| a.slug == slug && Some(a.id) != own_id)
    })
  }

  /// Replace the article's tag set, creating missing tags.
  fn set_tags(&mut self, article_id: i32, tags: &[String]) {
    self.article_tags.retain(|(a, _)| *a != article_id);
    for name in clean_tags(tags) {
      let tag_id = match self.tags.get(&name) {
        Some(id) => *id,
        None => {
          let id = self.next_id();
          self.tags.insert(name, id);
          id
        },
      };
      self.article_tags.insert((article_id, tag_id));
    }
  }

  fn page(&self, viewer: Option<i32>, rows: Vec<&ArticleRow>, limit: i64, offset: i64) -> Page<ArticleDetails> {
    let total = rows.len() as i64;
    let items = rows.into_iter()
      .rev()
      .skip(offset.max(0) as usize)
      .take(limit.max(0) as usize)
      .filter_map(|row| self.article_details(viewer, row))
      .collect();
    Page { items, total }
  }
}

/// In-memory backend, shared by every worker of a server.
///
/// Each operation holds the lock for its whole read or write, so multi-step
/// writes are never observed half-applied.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
  data: Arc<Mutex<MemoryData>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Default::default()
  }

  fn lock(&self) -> Result<MutexGuard<'_, MemoryData>> {
    self.data.lock().map_err(|_| {
      error!("MemoryStore: lock poisoned.");
      anyhow::anyhow!("memory store lock poisoned").into()
    })
  }
}

#[async_trait(?Send)]
impl UserStore for MemoryStore {
  async fn create(&self, user: &NewUser) -> Result<i32> {
    let mut data = self.lock()?;
    data.check_unique_user(None, &user.username, &user.email)?;
    let id = data.next_id();
    let ts = now();
    data.users.insert(id, User {
      id,
      username: user.username.clone(),
      email: user.email.clone(),
      password: user.password_hash.clone(),
      bio: None,
      image: None,
      created_at: ts,
      updated_at: ts,
    });
    Ok(id)
  }

  async fn get_by_id(&self, id: i32) -> Result<Option<User>> {
    Ok(self.lock()?.users.get(&id).cloned())
  }

  async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
    Ok(self.lock()?.user_by_name(username).cloned())
  }

  async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
    Ok(self.lock()?.users.values().find(|u| u.email == email).cloned())
  }

  async fn update(&self, id: i32, changes: &UserChanges) -> Result<bool> {
    let mut data = self.lock()?;
    data.check_unique_user(Some(id), &changes.username, &changes.email)?;
    match data.users.get_mut(&id) {
      Some(user) => {
        user.username = changes.username.clone();
        user.email = changes.email.clone();
        user.bio = changes.bio.clone();
        user.image = changes.image.clone();
        if let Some(hash) = &changes.password_hash {
          user.password = hash.clone();
        }
        user.updated_at = now();
        Ok(true)
      },
      None => Ok(false),
    }
  }

  async fn update_password(&self, id: i32, password_hash: &str) -> Result<()> {
    if let Some(user) = self.lock()?.users.get_mut(&id) {
      user.password = password_hash.to_string();
    }
    Ok(())
  }

  async fn profile(&self, viewer: Option<i32>, username: &str) -> Result<Option<Profile>> {
    let data = self.lock()?;
    Ok(data.user_by_name(username).map(|u| data.profile(viewer, u)))
  }

  async fn follow(&self, follower_id: i32, followed_id: i32) -> Result<()> {
    self.lock()?.follows.insert((follower_id, followed_id));
    Ok(())
  }

  async fn unfollow(&self, follower_id: i32, followed_id: i32) -> Result<()> {
    self.lock()?.follows.remove(&(follower_id, followed_id));
    Ok(())
  }

  async fn is_following(&self, follower_id: i32, followed_id: i32) -> Result<bool> {
    Ok(self.lock()?.follows.contains(&(follower_id, followed_id)))
  }
}

#[async_trait(?Send)]
impl ArticleStore for MemoryStore {
  async fn create(&self, author_id: i32, article: &NewArticle) -> Result<String> {
    let mut data = self.lock()?;
    if !data.users.contains_key(&author_id) {
      return Err(Error::NotFound("author".into()));
    }
    let slug = data.unique_slug(&article.title, None);
    let id = data.next_id();
    let ts = now();
    data.articles.insert(id, ArticleRow {
      id,
      author_id,
      slug: slug.clone(),
      title: article.title.clone(),
      description: article.description.clone(),
      body: article.body.clone(),
      created_at: ts,
      updated_at: ts,
    });
    data.set_tags(id, &article.tag_list);
    Ok(slug)
  }

  async fn update(&self, slug: &str, author_id: i32, changes: &ArticleChanges) -> Result<Option<String>> {
    let mut data = self.lock()?;
    let row = match data.article_by_slug(slug) {
      Some(row) if row.author_id == author_id => row.clone(),
      _ => return Ok(None),
    };
    let new_slug = if row.title != changes.title {
      data.unique_slug(&changes.title, Some(row.id))
    } else {
      row.slug.clone()
    };
    if let Some(article) = data.articles.get_mut(&row.id) {
      article.slug = new_slug.clone();
      article.title = changes.title.clone();
      article.description = changes.description.clone();
      article.body = changes.body.clone();
      article.updated_at = now();
    }
    if let Some(tags) = &changes.tag_list {
      data.set_tags(row.id, tags);
    }
    Ok(Some(new_slug))
  }

  async fn delete(&self, slug: &str, author_id: i32) -> Result<bool> {
    let mut data = self.lock()?;
    let id = match data.article_by_slug(slug) {
      Some(row) if row.author_id == author_id => row.id,
      _ => return Ok(false),
    };
    data.articles.remove(&id);
    data.article_tags.retain(|(a, _)| *a != id);
    data.favorites.retain(|(_, a)| *a != id);
    data.comments.retain(|_, c| c.article_id != id);
    Ok(true)
  }

  async fn get_by_slug(&self, viewer: Option<i32>, slug: &str) -> Result<Option<ArticleDetails>> {
    let data = self.lock()?;
    Ok(data.article_by_slug(slug).and_then(|row| data.article_details(viewer, row)))
  }

  async fn list(&self, viewer: Option<i32>, filter: &ArticleFilter) -> Result<Page<ArticleDetails>> {
    let data = self.lock()?;
    let tag_id = match &filter.tag {
      Some(tag) => match data.tags.get(tag) {
        Some(id) => Some(*id),
        None => return Ok(Page { items: vec![], total: 0 }),
      },
      None => None,
    };
    let author_id = match &filter.author {
      Some(name) => match data.user_by_name(name) {
        Some(user) => Some(user.id),
        None => return Ok(Page { items: vec![], total: 0 }),
      },
      None => None,
    };
    let favorited_by = match &filter.favorited_by {
      Some(name) => match data.user_by_name(name) {
        Some(user) => Some(user.id),
        None => return Ok(Page { items: vec![], total: 0 }),
      },
      None => None,
    };
    let rows = data.articles.values()
      .filter(|a| tag_id.map_or(true, |t| data.article_tags.contains(&(a.id, t))))
      .filter(|a| author_id.map_or(true, |u| a.author_id == u))
      .filter(|a| favorited_by.map_or(true, |u| data.favorites.contains(&(u, a.id))))
      .collect();
    Ok(data.page(viewer, rows, filter.limit, filter.offset))
  }

  async fn feed(&self, user_id: i32, limit: i64, offset: i64) -> Result<Page<ArticleDetails>> {
    let data = self.lock()?;
    let rows = data.articles.values()
      .filter(|a| data.follows.contains(&(user_id, a.author_id)))
      .collect();
    Ok(data.page(Some(user_id), rows, limit, offset))
  }

  async fn favorite(&self, user_id: i32, article_id: i32) -> Result<()> {
    let mut data = self.lock()?;
    if data.articles.contains_key(&article_id) {
      data.favorites.insert((user_id, article_id));
    }
    Ok(())
  }

  async fn unfavorite(&self, user_id: i32, article_id: i32) -> Result<()> {
    self.lock()?.favorites.remove(&(user_id, article_id));
    Ok(())
  }

  async fn is_favorited(&self, user_id: i32, article_id: i32) -> Result<bool> {
    Ok(self.lock()?.favorites.contains(&(user_id, article_id)))
  }

  async fn favorites_count(&self, article_id: i32) -> Result<i64> {
    Ok(self.lock()?.favorites_count(article_id))
  }

  async fn tags(&self, min_count: i64) -> Result<Vec<String>> {
    let data = self.lock()?;
    let mut counts: HashMap<i32, i64> = HashMap::new();
    for (_, tag_id) in data.article_tags.iter() {
      *counts.entry(*tag_id).or_insert(0) += 1;
    }
    let mut tags: Vec<(i64, &String)> = data.tags.iter()
      .map(|(name, id)| (counts.get(id).copied().unwrap_or(0), name))
      .filter(|(count, _)| *count >= min_count)
      .collect();
    tags.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));
    Ok(tags.into_iter().map(|(_, name)| name.clone()).collect())
  }
}

#[async_trait(?Send)]
impl CommentStore for MemoryStore {
  async fn create(&self, article_id: i32, author_id: i32, body: &str) -> Result<CommentDetails> {
    let mut data = self.lock()?;
    if !data.articles.contains_key(&article_id) {
      return Err(Error::NotFound("article".into()));
    }
    let id = data.next_id();
    let ts = now();
    let row = CommentRow {
      id,
      article_id,
      author_id,
      body: body.to_string(),
      created_at: ts,
      updated_at: ts,
    };
    data.comments.insert(id, row.clone());
    data.comment_details(Some(author_id), &row)
      .ok_or_else(|| Error::NotFound("author".into()))
  }

  async fn delete(&self, id: i32, author_id: i32) -> Result<bool> {
    let mut data = self.lock()?;
    match data.comments.get(&id) {
      Some(row) if row.author_id == author_id => {
        data.comments.remove(&id);
        Ok(true)
      },
      _ => Ok(false),
    }
  }

  async fn get_by_id(&self, viewer: Option<i32>, id: i32) -> Result<Option<CommentDetails>> {
    let data = self.lock()?;
    Ok(data.comments.get(&id).and_then(|row| data.comment_details(viewer, row)))
  }

  async fn list_by_article(&self, viewer: Option<i32>, article_id: i32) -> Result<Vec<CommentDetails>> {
    let data = self.lock()?;
    Ok(data.comments.values()
      .rev()
      .filter(|c| c.article_id == article_id)
      .filter_map(|c| data.comment_details(viewer, c))
      .collect())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  fn new_user(name: &str) -> NewUser {
    NewUser {
      username: name.into(),
      email: format!("{}@example.com", name),
      password_hash: "hash".into(),
    }
  }

  fn new_article(title: &str, tags: &[&str]) -> NewArticle {
    NewArticle {
      title: title.into(),
      description: "desc".into(),
      body: "body".into(),
      tag_list: tags.iter().map(|t| t.to_string()).collect(),
    }
  }

  #[actix_rt::test]
  async fn duplicate_users_conflict() {
    let store = MemoryStore::new();
    UserStore::create(&store, &new_user("jake")).await.unwrap();
    let err = UserStore::create(&store, &new_user("jake")).await.unwrap_err();
    assert!(err.is_conflict());

    let mut other = new_user("jane");
    other.email = "jake@example.com".into();
    assert!(UserStore::create(&store, &other).await.unwrap_err().is_conflict());
  }

  #[actix_rt::test]
  async fn slugs_are_unique_and_stable_on_update() {
    let store = MemoryStore::new();
    let author = UserStore::create(&store, &new_user("jake")).await.unwrap();
    let first = ArticleStore::create(&store, author, &new_article("Hello World", &[])).await.unwrap();
    let second = ArticleStore::create(&store, author, &new_article("Hello World", &[])).await.unwrap();
    assert_eq!(first, "hello-world");
    assert_eq!(second, "hello-world-1");

    // Same title keeps the slug, a new title re-slugs.
    let changes = ArticleChanges {
      title: "Hello World".into(),
      description: "d".into(),
      body: "b".into(),
      tag_list: None,
    };
    let slug = ArticleStore::update(&store, &second, author, &changes).await.unwrap();
    assert_eq!(slug.as_deref(), Some("hello-world-1"));
    let changes = ArticleChanges { title: "Goodbye".into(), ..changes };
    let slug = ArticleStore::update(&store, &second, author, &changes).await.unwrap();
    assert_eq!(slug.as_deref(), Some("goodbye"));
  }

  #[actix_rt::test]
  async fn update_and_delete_enforce_ownership() {
    let store = MemoryStore::new();
    let jake = UserStore::create(&store, &new_user("jake")).await.unwrap();
    let jane = UserStore::create(&store, &new_user("jane")).await.unwrap();
    let slug = ArticleStore::create(&store, jake, &new_article("Mine", &[])).await.unwrap();

    let changes = ArticleChanges { title: "Stolen".into(), ..Default::default() };
    assert_eq!(ArticleStore::update(&store, &slug, jane, &changes).await.unwrap(), None);
    assert!(!ArticleStore::delete(&store, &slug, jane).await.unwrap());
    assert!(ArticleStore::get_by_slug(&store, None, &slug).await.unwrap().is_some());
    assert!(ArticleStore::delete(&store, &slug, jake).await.unwrap());
    assert!(ArticleStore::get_by_slug(&store, None, &slug).await.unwrap().is_none());
  }

  #[actix_rt::test]
  async fn tag_sets_are_replaced_only_when_given() {
    let store = MemoryStore::new();
    let jake = UserStore::create(&store, &new_user("jake")).await.unwrap();
    let slug = ArticleStore::create(&store, jake, &new_article("Tags", &["web", "rust", "rust"])).await.unwrap();
    let article = ArticleStore::get_by_slug(&store, None, &slug).await.unwrap().unwrap();
    assert_eq!(article.tag_list, vec!["rust", "web"]);

    let keep = ArticleChanges { title: "Tags".into(), ..Default::default() };
    ArticleStore::update(&store, &slug, jake, &keep).await.unwrap();
    let article = ArticleStore::get_by_slug(&store, None, &slug).await.unwrap().unwrap();
    assert_eq!(article.tag_list, vec!["rust", "web"]);

    let replace = ArticleChanges { tag_list: Some(vec!["actix".into()]), ..keep };
    ArticleStore::update(&store, &slug, jake, &replace).await.unwrap();
    let article = ArticleStore::get_by_slug(&store, None, &slug).await.unwrap().unwrap();
    assert_eq!(article.tag_list, vec!["actix"]);
  }

  #[actix_rt::test]
  async fn tag_catalog_by_popularity() {
    let store = MemoryStore::new();
    let jake = UserStore::create(&store, &new_user("jake")).await.unwrap();
    ArticleStore::create(&store, jake, &new_article("A", &["rust", "web"])).await.unwrap();
    ArticleStore::create(&store, jake, &new_article("B", &["rust"])).await.unwrap();
    assert_eq!(ArticleStore::tags(&store, 1).await.unwrap(), vec!["rust", "web"]);
    assert_eq!(ArticleStore::tags(&store, 2).await.unwrap(), vec!["rust"]);
  }

  #[actix_rt::test]
  async fn favorites_are_idempotent_and_counted_live() {
    let store = MemoryStore::new();
    let jake = UserStore::create(&store, &new_user("jake")).await.unwrap();
    let jane = UserStore::create(&store, &new_user("jane")).await.unwrap();
    let slug = ArticleStore::create(&store, jake, &new_article("Fav", &[])).await.unwrap();
    let id = ArticleStore::get_by_slug(&store, None, &slug).await.unwrap().unwrap().id;

    store.favorite(jane, id).await.unwrap();
    store.favorite(jane, id).await.unwrap();
    assert_eq!(store.favorites_count(id).await.unwrap(), 1);
    store.favorite(jake, id).await.unwrap();
    assert_eq!(store.favorites_count(id).await.unwrap(), 2);

    store.unfavorite(jane, id).await.unwrap();
    store.unfavorite(jane, id).await.unwrap();
    assert!(!store.is_favorited(jane, id).await.unwrap());
    assert_eq!(store.favorites_count(id).await.unwrap(), 1);

    let article = ArticleStore::get_by_slug(&store, Some(jake), &slug).await.unwrap().unwrap();
    assert!(article.favorited);
    assert_eq!(article.favorites_count, 1);
  }

  #[actix_rt::test]
  async fn feed_lists_followed_authors() {
    let store = MemoryStore::new();
    let jake = UserStore::create(&store, &new_user("jake")).await.unwrap();
    let jane = UserStore::create(&store, &new_user("jane")).await.unwrap();
    ArticleStore::create(&store, jake, &new_article("By Jake", &[])).await.unwrap();
    ArticleStore::create(&store, jane, &new_article("By Jane", &[])).await.unwrap();

    assert_eq!(store.feed(jane, 10, 0).await.unwrap().total, 0);
    store.follow(jane, jake).await.unwrap();
    store.follow(jane, jake).await.unwrap();
    let feed = store.feed(jane, 10, 0).await.unwrap();
    assert_eq!(feed.total, 1);
    assert_eq!(feed.items[0].slug, "by-jake");
    assert!(feed.items[0].author.following);
  }

  #[actix_rt::test]
  async fn comments_newest_first_and_owned() {
    let store = MemoryStore::new();
    let jake = UserStore::create(&store, &new_user("jake")).await.unwrap();
    let jane = UserStore::create(&store, &new_user("jane")).await.unwrap();
    let slug = ArticleStore::create(&store, jake, &new_article("Talk", &[])).await.unwrap();
    let id = ArticleStore::get_by_slug(&store, None, &slug).await.unwrap().unwrap().id;

    let first = CommentStore::create(&store, id, jake, "first").await.unwrap();
    let second = CommentStore::create(&store, id, jane, "second").await.unwrap();
    let list = store.list_by_article(None, id).await.unwrap();
    assert_eq!(list.iter().map(|c| c.body.as_str()).collect::<Vec<_>>(), vec!["second", "first"]);

    assert!(!CommentStore::delete(&store, first.id, jane).await.unwrap());
    assert!(CommentStore::delete(&store, second.id, jane).await.unwrap());
    assert_eq!(store.list_by_article(None, id).await.unwrap().len(), 1);
  }
}
