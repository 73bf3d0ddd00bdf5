use actix_web::{
  get, web, HttpResponse,
};

use crate::error::*;
use crate::app::*;
use crate::forms::TagRequest;
use crate::db::DbService;

pub const DEFAULT_MIN_COUNT: i64 = 1;

/// Tag names by popularity, optionally filtered by a case-insensitive
/// substring.
#[get("/tags")]
async fn list(
  cfg: web::Data<TagService>,
  db: web::Data<DbService>,
  req: web::Query<TagRequest>,
) -> Result<HttpResponse> {
  let min_count = req.min.unwrap_or(cfg.min_count).max(0);
  let mut tags = db.tags(min_count).await?;
  if let Some(q) = req.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
    let q = q.to_lowercase();
    tags.retain(|tag| tag.to_lowercase().contains(&q));
  }
  Ok(HttpResponse::Ok().json(tags))
}

#[derive(Debug, Clone)]
pub struct TagService {
  pub min_count: i64,
}

impl super::Service for TagService {
  fn load_app_config(&mut self, config: &AppConfig, _prefix: &str) -> Result<()> {
    self.min_count = config.get_int("tags.min_count")?.unwrap_or(DEFAULT_MIN_COUNT);
    Ok(())
  }

  fn web_config(&self, web: &mut web::ServiceConfig) {
    web.app_data(web::Data::new(self.clone()));
  }

  fn api_config(&self, web: &mut web::ServiceConfig) {
    web.service(list);
  }
}

pub fn new_factory() -> TagService {
  TagService {
    min_count: DEFAULT_MIN_COUNT,
  }
}
