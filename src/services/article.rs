use log::*;

use actix_web::{
  get, post, web, HttpResponse,
};

use crate::error::*;
use crate::app::*;
use crate::auth::Session;
use crate::models::*;
use crate::forms::article::*;
use crate::fragments::{FavoriteButton, Fragment};
use crate::db::DbService;
use crate::util::segment;

use super::see_other;

pub const DEFAULT_PAGE_SIZE: i64 = 10;

fn not_found() -> Error {
  Error::NotFound("Article not found".to_string())
}

/// Favorite an article, answering with the refreshed favorite button.
#[post("/article/{slug}/favorite")]
async fn favorite(
  db: web::Data<DbService>,
  session: Session,
  slug: web::Path<String>,
  variant: web::Query<FavoriteVariant>,
) -> Result<HttpResponse> {
  toggle_favorite(&db, &session, &slug, &variant, true).await
}

#[post("/article/{slug}/unfavorite")]
async fn unfavorite(
  db: web::Data<DbService>,
  session: Session,
  slug: web::Path<String>,
  variant: web::Query<FavoriteVariant>,
) -> Result<HttpResponse> {
  toggle_favorite(&db, &session, &slug, &variant, false).await
}

async fn toggle_favorite(
  db: &DbService,
  session: &Session,
  slug: &str,
  variant: &FavoriteVariant,
  on: bool,
) -> Result<HttpResponse> {
  let user = session.require_for_swap()?;
  let article = db.article.get_by_slug(Some(user.id), slug).await?
    .ok_or_else(not_found)?;

  if on {
    db.article.favorite(user.id, article.id).await?;
  } else {
    db.article.unfavorite(user.id, article.id).await?;
  }

  // Render from storage as it is now, never from `article`.
  let count = db.article.favorites_count(article.id).await?;
  let is_favorited = db.article.is_favorited(user.id, article.id).await?;
  debug!("favorite: slug={} on={} count={} favorited={}", slug, on, count, is_favorited);

  Ok(FavoriteButton {
    slug: article.slug,
    count,
    is_favorited,
    align_right: variant.align_right(),
    compact: variant.compact(),
  }.respond())
}

/// Delete an owned article, then go home.
#[post("/article/{slug}/delete")]
async fn delete_article(
  db: web::Data<DbService>,
  session: Session,
  slug: web::Path<String>,
) -> Result<HttpResponse> {
  let user = session.require()?;
  if db.article.get_by_slug(None, &slug).await?.is_none() {
    return Err(not_found());
  }
  if !db.delete_article(&slug, user.id).await? {
    info!("delete_article: user {} denied for '{}'", user.id, slug);
    return Err(Error::Forbidden("Failed to delete article".to_string()));
  }
  Ok(see_other("/"))
}

/// Publish a new article.
#[post("/editor")]
async fn create_article(
  db: web::Data<DbService>,
  session: Session,
  form: web::Form<ArticleForm>,
) -> Result<HttpResponse> {
  let user = session.require()?;
  let errors = form.validate();
  if !errors.is_empty() {
    return Err(Error::UnprocessableEntity(errors));
  }
  let slug = db.create_article(user.id, &form.to_new_article()).await?;
  info!("Article created: {}", slug);
  Ok(see_other(&format!("/article/{}", segment(&slug))))
}

/// Edit an owned article.  A title change re-slugs it.
#[post("/editor/{slug}")]
async fn update_article(
  db: web::Data<DbService>,
  session: Session,
  slug: web::Path<String>,
  form: web::Form<ArticleForm>,
) -> Result<HttpResponse> {
  let user = session.require()?;
  let article = db.article.get_by_slug(None, &slug).await?
    .ok_or_else(not_found)?;
  if article.author.user_id != user.id {
    return Err(Error::Forbidden("You can only edit your own articles".to_string()));
  }
  let errors = form.validate();
  if !errors.is_empty() {
    return Err(Error::UnprocessableEntity(errors));
  }
  match db.update_article(&slug, user.id, &form.to_changes()).await? {
    Some(new_slug) => Ok(see_other(&format!("/article/{}", segment(&new_slug)))),
    None => Err(Error::Forbidden("Failed to update article".to_string())),
  }
}

/// Get list of articles
#[get("/articles")]
async fn list(
  cfg: web::Data<ArticleService>,
  db: web::Data<DbService>,
  session: Session,
  req: web::Query<ArticleRequest>,
) -> Result<HttpResponse> {
  let filter = req.into_inner().into_filter(cfg.page_size);
  let page = db.article.list(session.user_id(), &filter).await?;

  Ok(HttpResponse::Ok().json(ArticleList::<ArticleDetails> {
    articles: page.items,
    articles_count: page.total,
  }))
}

/// Articles by followed authors.
#[get("/articles/feed")]
async fn feed(
  cfg: web::Data<ArticleService>,
  db: web::Data<DbService>,
  session: Session,
  req: web::Query<FeedRequest>,
) -> Result<HttpResponse> {
  let user = session.user.as_ref().ok_or_else(|| {
    Error::Unauthorized(json!({
      "error": "authorization required",
    }))
  })?;
  let filter = ArticleRequest {
    limit: req.limit,
    offset: req.offset,
    ..Default::default()
  }.into_filter(cfg.page_size);
  let page = db.article.feed(user.id, filter.limit, filter.offset).await?;

  Ok(HttpResponse::Ok().json(ArticleList::<ArticleDetails> {
    articles: page.items,
    articles_count: page.total,
  }))
}

/// get article by slug
#[get("/articles/{slug}")]
async fn get_article(
  db: web::Data<DbService>,
  session: Session,
  slug: web::Path<String>,
) -> Result<HttpResponse> {
  let article = db.article.get_by_slug(session.user_id(), &slug).await?
    .ok_or_else(not_found)?;
  Ok(HttpResponse::Ok().json(ArticleOut::<ArticleDetails> {
    article,
  }))
}

#[derive(Debug, Clone)]
pub struct ArticleService {
  pub page_size: i64,
}

impl super::Service for ArticleService {
  fn load_app_config(&mut self, config: &AppConfig, _prefix: &str) -> Result<()> {
    self.page_size = config.get_int("Article.page_size")?.unwrap_or(DEFAULT_PAGE_SIZE);
    Ok(())
  }

  fn web_config(&self, web: &mut web::ServiceConfig) {
    web
      .app_data(web::Data::new(self.clone()))
      .service(favorite)
      .service(unfavorite)
      .service(delete_article)
      .service(create_article)
      .service(update_article);
  }

  fn api_config(&self, web: &mut web::ServiceConfig) {
    web
      .service(list)
      .service(feed)
      .service(get_article);
  }
}

pub fn new_factory() -> ArticleService {
  ArticleService {
    page_size: DEFAULT_PAGE_SIZE,
  }
}
