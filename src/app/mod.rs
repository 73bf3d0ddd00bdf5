use actix_web::{
  body::MessageBody,
  dev::{ServiceFactory, ServiceRequest, ServiceResponse},
  middleware::Logger,
  App,
};

mod config;
pub use self::config::*;

pub mod commands;
pub use self::commands::*;

use crate::middleware::{Authenticate, CsrfGuard};
use crate::services::Services;

/// Build the application for one worker: session loading runs first, then
/// CSRF enforcement, then routing.
pub fn build_app(services: &Services) -> App<
  impl ServiceFactory<
    ServiceRequest,
    Config = (),
    Response = ServiceResponse<impl MessageBody>,
    Error = actix_web::Error,
    InitError = (),
  >,
> {
  let services = services.clone();
  App::new()
    .wrap(CsrfGuard)
    .wrap(Authenticate)
    .wrap(Logger::default())
    .configure(move |web| services.web_config(web))
}
