use log::*;

use actix_web::{
  get, post, web, HttpResponse,
};

use crate::error::*;
use crate::app::*;
use crate::auth::Session;
use crate::forms::ProfileOut;
use crate::fragments::{FollowButton, Fragment};
use crate::db::DbService;

fn not_found() -> Error {
  Error::NotFound("User not found".to_string())
}

/// follow a user
#[post("/profile/{username}/follow")]
async fn follow(
  db: web::Data<DbService>,
  session: Session,
  username: web::Path<String>,
) -> Result<HttpResponse> {
  toggle_follow(&db, &session, &username, true).await
}

/// unfollow a user
#[post("/profile/{username}/unfollow")]
async fn unfollow(
  db: web::Data<DbService>,
  session: Session,
  username: web::Path<String>,
) -> Result<HttpResponse> {
  toggle_follow(&db, &session, &username, false).await
}

async fn toggle_follow(db: &DbService, session: &Session, username: &str, on: bool) -> Result<HttpResponse> {
  let user = session.require_for_swap()?;
  let target = db.user.get_by_username(username).await?
    .ok_or_else(not_found)?;
  if target.id == user.id {
    let message = if on { "Cannot follow yourself" } else { "Cannot unfollow yourself" };
    return Err(Error::BadRequest(message.to_string()));
  }

  if on {
    db.user.follow(user.id, target.id).await?;
  } else {
    db.user.unfollow(user.id, target.id).await?;
  }

  let is_following = db.user.is_following(user.id, target.id).await?;
  debug!("follow: {} -> {} on={} following={}", user.id, target.id, on, is_following);

  Ok(FollowButton {
    username: target.username,
    is_following,
  }.respond())
}

/// get profile by username
#[get("/profiles/{username}")]
async fn get_profile(
  db: web::Data<DbService>,
  session: Session,
  username: web::Path<String>,
) -> Result<HttpResponse> {
  let profile = db.user.profile(session.user_id(), &username).await?
    .ok_or_else(not_found)?;
  Ok(HttpResponse::Ok().json(ProfileOut {
    profile,
  }))
}

#[derive(Debug, Clone, Default)]
pub struct ProfileService {
}

impl super::Service for ProfileService {
  fn load_app_config(&mut self, _config: &AppConfig, _prefix: &str) -> Result<()> {
    Ok(())
  }

  fn web_config(&self, web: &mut web::ServiceConfig) {
    web
      .service(follow)
      .service(unfollow);
  }

  fn api_config(&self, web: &mut web::ServiceConfig) {
    web.service(get_profile);
  }
}

pub fn new_factory() -> ProfileService {
  Default::default()
}
