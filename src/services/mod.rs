use log::*;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use actix_web::{http::header, web, HttpResponse};

use crate::error::*;
use crate::app::*;
use crate::auth::AuthConfig;
use crate::db::{DbService, MemoryStore, TagCache, DEFAULT_TAG_TTL, MEMORY_URL};

mod user;
mod profile;
mod article;
mod comment;
mod tag;
mod assets;

type BoxService = Box<dyn Service>;

pub trait Service: ServiceClone + Send {
  /// Load Service config from AppConfig.
  fn load_app_config(&mut self, config: &AppConfig, prefix: &str) -> Result<()>;

  /// Setup page and fragment endpoints.
  fn web_config(&self, _web: &mut web::ServiceConfig) {
  }

  /// Setup JSON endpoints, mounted under `/api`.
  fn api_config(&self, _web: &mut web::ServiceConfig) {
  }
}

pub trait ServiceClone {
  fn clone_box(&self) -> BoxService;
}

impl<T> ServiceClone for T
where
    T: 'static + Service + Clone,
{
  fn clone_box(&self) -> BoxService {
    Box::new(self.clone())
  }
}

impl Clone for BoxService {
  fn clone(&self) -> BoxService {
    self.clone_box()
  }
}

/// Endpoint groups of one server plus what every worker needs to build its
/// `DbService`.
#[derive(Clone)]
pub struct Services {
  db_url: String,
  memory: Option<MemoryStore>,
  tag_cache: Arc<TagCache>,
  auth: AuthConfig,
  services: Vec<BoxService>,
}

impl Services {
  pub fn new(auth: AuthConfig) -> Services {
    Services {
      db_url: MEMORY_URL.to_string(),
      memory: None,
      tag_cache: Arc::new(TagCache::default()),
      auth,
      services: Vec::new(),
    }
  }

  fn load_service(&mut self, name: &str, config: &AppConfig, prefix: &str) -> Result<BoxService> {
    let mut service: BoxService = match name {
      "User" => Box::new(user::new_factory()),
      "Profile" => Box::new(profile::new_factory()),
      "Article" => Box::new(article::new_factory()),
      "Comment" => Box::new(comment::new_factory()),
      "Tag" => Box::new(tag::new_factory()),
      "Assets" => Box::new(assets::new_factory()),
      _ => {
        return Err(anyhow::anyhow!("Unknown Service: {}", name).into());
      },
    };

    service.load_app_config(config, prefix)?;
    Ok(service)
  }

  /// Load Service config from AppConfig.
  pub fn load_app_config(&mut self, config: &AppConfig, prefix: &str) -> Result<()> {
    // DB config
    self.db_url = config.get_str("db.url")?
      .ok_or_else(|| anyhow::anyhow!("db.url must be set"))?;
    if self.db_url == MEMORY_URL {
      info!("Using in-memory storage.");
      self.memory = Some(MemoryStore::new());
    }

    let ttl = config.get_int("tags.cache_ttl_secs")?
      .map(|secs| Duration::from_secs(secs.max(0) as u64))
      .unwrap_or(DEFAULT_TAG_TTL);
    self.tag_cache = Arc::new(TagCache::new(ttl));

    let mut loaded: HashMap<String, bool> = HashMap::new();
    let list = config.get_str_list(&format!("{}.services", prefix))?
      .ok_or_else(|| anyhow::anyhow!("missing list of services: {}.services", prefix))?;
    for name in list.into_iter() {
      info!("Loading {}Service config", name);
      // check if it is loaded already.
      if loaded.contains_key(&name) {
        return Err(anyhow::anyhow!("can't load service multiple times: {}", name).into());
      }
      loaded.insert(name.clone(), true);
      // load service
      let service = self.load_service(&name, config, prefix)?;
      self.services.push(service);
    }
    Ok(())
  }

  /// Storage for the current worker.
  pub fn db(&self) -> Result<DbService> {
    DbService::connect(&self.db_url, self.memory.as_ref(), self.tag_cache.clone())
  }

  /// Prepare every statement once, so schema problems show up at startup.
  pub async fn check_db(&self) -> Result<()> {
    self.db()?.prepare().await
  }

  /// Setup Service endpoints.
  pub fn web_config(&self, web: &mut web::ServiceConfig) {
    // Create DbService for worker.
    match self.db() {
      Ok(db) => {
        web.app_data(web::Data::new(db));
      },
      Err(err) => {
        error!("Failed to init db: {:?}", err);
      },
    }
    web.app_data(web::Data::new(self.auth.clone()));

    for service in self.services.iter() {
      service.web_config(web);
    }
    web.service(
      web::scope("/api")
        .configure(|web| {
          for service in self.services.iter() {
            service.api_config(web);
          }
        })
    );
  }
}

pub fn config_services(config: &AppConfig, prefix: &str) -> Result<Services> {
  let mut services = Services::new(AuthConfig::load(config)?);
  services.load_app_config(config, prefix)?;
  Ok(services)
}

/// Full-page redirect after a form post.
pub(crate) fn see_other(location: &str) -> HttpResponse {
  HttpResponse::SeeOther()
    .insert_header((header::LOCATION, location))
    .finish()
}
