use actix_web::{
  get, http::header, web, HttpResponse,
};

use crate::error::*;
use crate::app::*;

const FRAGMENTS_JS: &str = include_str!("../../static/js/fragments.js");

/// Client swap script.
#[get("/js/fragments.js")]
async fn fragments_js() -> HttpResponse {
  HttpResponse::Ok()
    .content_type("application/javascript; charset=utf-8")
    .insert_header((header::CACHE_CONTROL, "public, max-age=3600"))
    .body(FRAGMENTS_JS)
}

#[derive(Debug, Clone, Default)]
pub struct AssetsService {
}

impl super::Service for AssetsService {
  fn load_app_config(&mut self, _config: &AppConfig, _prefix: &str) -> Result<()> {
    Ok(())
  }

  fn web_config(&self, web: &mut web::ServiceConfig) {
    web.service(fragments_js);
  }
}

pub fn new_factory() -> AssetsService {
  Default::default()
}
