use log::*;

use actix_web::{
  get, post, web, HttpResponse,
};

use crate::error::*;
use crate::app::*;
use crate::auth::Session;
use crate::forms::comment::*;
use crate::fragments::{CommentCard, Fragment};
use crate::db::DbService;

/// Add a comment, answering with its card.
#[post("/article/{slug}/comments")]
async fn create_comment(
  db: web::Data<DbService>,
  session: Session,
  slug: web::Path<String>,
  form: web::Form<CreateComment>,
) -> Result<HttpResponse> {
  let user = session.require()?;
  let article = db.article.get_by_slug(Some(user.id), &slug).await?
    .ok_or_else(|| Error::NotFound("Article not found".to_string()))?;
  let body = form.body.trim();
  if body.is_empty() {
    return Err(Error::BadRequest("Comment body is required".to_string()));
  }

  let comment = db.comment.create(article.id, user.id, body).await?;
  debug!("Comment {} added to '{}'", comment.id, article.slug);
  Ok(CommentCard::new(&comment, &article.slug, Some(user.id)).respond())
}

/// Delete an owned comment.  Empty body on success so the client drops the
/// card.
async fn delete_comment(
  db: web::Data<DbService>,
  session: Session,
  path: web::Path<(String, String)>,
) -> Result<HttpResponse> {
  let user = session.require()?;
  let (_slug, id) = path.into_inner();
  let deleted = match id.parse::<i32>() {
    Ok(id) => db.comment.delete(id, user.id).await?,
    Err(_) => false,
  };
  if deleted {
    Ok(HttpResponse::Ok().content_type("text/html; charset=utf-8").finish())
  } else {
    info!("delete_comment: user {} denied for comment {}", user.id, id);
    Err(Error::Forbidden("Failed to delete comment".to_string()))
  }
}

async fn method_not_allowed() -> Result<HttpResponse> {
  Err(Error::MethodNotAllowed)
}

/// Comments on an article, newest first.
#[get("/articles/{slug}/comments")]
async fn list(
  db: web::Data<DbService>,
  session: Session,
  slug: web::Path<String>,
) -> Result<HttpResponse> {
  let article = db.article.get_by_slug(session.user_id(), &slug).await?
    .ok_or_else(|| Error::NotFound("Article not found".to_string()))?;
  let comments = db.comment.list_by_article(session.user_id(), article.id).await?;
  Ok(HttpResponse::Ok().json(CommentList {
    comments,
  }))
}

#[derive(Debug, Clone, Default)]
pub struct CommentService {
}

impl super::Service for CommentService {
  fn load_app_config(&mut self, _config: &AppConfig, _prefix: &str) -> Result<()> {
    Ok(())
  }

  fn web_config(&self, web: &mut web::ServiceConfig) {
    web
      .service(create_comment)
      .service(
        web::resource("/article/{slug}/comment/{id}")
          .route(web::delete().to(delete_comment))
          .default_service(web::to(method_not_allowed))
      );
  }

  fn api_config(&self, web: &mut web::ServiceConfig) {
    web.service(list);
  }
}

pub fn new_factory() -> CommentService {
  Default::default()
}
