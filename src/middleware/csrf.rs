use log::*;

use std::rc::Rc;

use futures::future::{ok, LocalBoxFuture, Ready};

use actix_web::{
  body::EitherBody,
  dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
  http::Method,
  web, Error, HttpMessage, ResponseError,
};

use crate::auth::csrf::{tokens_match, CSRF_FIELD, CSRF_HEADER};
use crate::auth::Session;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Reject state-changing requests that don't carry the caller's CSRF token,
/// before any handler runs.
///
/// The token is taken from the `X-CSRF-Token` header, then the `csrf_token`
/// form field, then the `csrf_token` query parameter.  Must be wrapped inside
/// [`Authenticate`](super::Authenticate).
pub struct CsrfGuard;

impl<S, B> Transform<S, ServiceRequest> for CsrfGuard
where
  S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
  S::Future: 'static,
  B: 'static,
{
  type Response = ServiceResponse<EitherBody<B>>;
  type Error = Error;
  type InitError = ();
  type Transform = CsrfMiddleware<S>;
  type Future = Ready<Result<Self::Transform, Self::InitError>>;

  fn new_transform(&self, service: S) -> Self::Future {
    ok(CsrfMiddleware {
      service: Rc::new(service),
    })
  }
}

pub struct CsrfMiddleware<S> {
  service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for CsrfMiddleware<S>
where
  S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
  S::Future: 'static,
  B: 'static,
{
  type Response = ServiceResponse<EitherBody<B>>;
  type Error = Error;
  type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

  forward_ready!(service);

  fn call(&self, mut req: ServiceRequest) -> Self::Future {
    let service = self.service.clone();
    Box::pin(async move {
      if is_safe(req.method()) {
        return service.call(req).await.map(ServiceResponse::map_into_left_body);
      }

      let expected = req.extensions().get::<Session>()
        .map(|s| s.csrf_token.clone())
        .unwrap_or_default();
      let submitted = submitted_token(&mut req).await;
      if tokens_match(submitted.as_deref(), &expected) {
        service.call(req).await.map(ServiceResponse::map_into_left_body)
      } else {
        warn!("CSRF token rejected: {} {}", req.method(), req.path());
        let resp = crate::error::Error::CsrfMismatch.error_response();
        Ok(req.into_response(resp).map_into_right_body())
      }
    })
  }
}

fn is_safe(method: &Method) -> bool {
  method == Method::GET || method == Method::HEAD || method == Method::OPTIONS
}

fn form_field(data: &[u8], name: &str) -> Option<String> {
  url::form_urlencoded::parse(data)
    .find(|(key, _)| key == name)
    .map(|(_, value)| value.into_owned())
    .filter(|value| !value.is_empty())
}

async fn submitted_token(req: &mut ServiceRequest) -> Option<String> {
  let header = req.headers().get(CSRF_HEADER)
    .and_then(|value| value.to_str().ok())
    .filter(|value| !value.is_empty())
    .map(str::to_string);
  if header.is_some() {
    return header;
  }

  if req.content_type() == FORM_CONTENT_TYPE {
    // Read the body, then hand it back for the handler's extractor.
    match req.extract::<web::Bytes>().await {
      Ok(body) => {
        let field = form_field(&body, CSRF_FIELD);
        req.set_payload(Payload::from(body));
        if field.is_some() {
          return field;
        }
      },
      Err(err) => {
        debug!("CSRF: failed to read form body: {}", err);
      },
    }
  }

  form_field(req.query_string().as_bytes(), CSRF_FIELD)
}
