use log::*;

use std::rc::Rc;

use futures::future::{ok, LocalBoxFuture, Ready};

use actix_web::{
  dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
  web, Error, HttpMessage,
};

use crate::auth::{csrf, request_token, AuthConfig, DecodeJwt, Session};
use crate::db::DbService;

/// Resolve the caller's identity once per request and store it as a
/// [`Session`] in the request extensions.
///
/// A missing, invalid or expired token, or a token for a deleted user, is the
/// same as being logged out.  Never rejects a request.
pub struct Authenticate;

impl<S, B> Transform<S, ServiceRequest> for Authenticate
where
  S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
  S::Future: 'static,
  B: 'static,
{
  type Response = ServiceResponse<B>;
  type Error = Error;
  type InitError = ();
  type Transform = AuthenticateMiddleware<S>;
  type Future = Ready<Result<Self::Transform, Self::InitError>>;

  fn new_transform(&self, service: S) -> Self::Future {
    ok(AuthenticateMiddleware {
      service: Rc::new(service),
    })
  }
}

pub struct AuthenticateMiddleware<S> {
  service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AuthenticateMiddleware<S>
where
  S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
  S::Future: 'static,
  B: 'static,
{
  type Response = ServiceResponse<B>;
  type Error = Error;
  type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

  forward_ready!(service);

  fn call(&self, req: ServiceRequest) -> Self::Future {
    let service = self.service.clone();
    Box::pin(async move {
      let session = load_session(&req).await;
      debug!("Session: user_id={:?}", session.user_id());
      req.extensions_mut().insert(session);
      service.call(req).await
    })
  }
}

async fn load_session(req: &ServiceRequest) -> Session {
  let auth = match req.app_data::<web::Data<AuthConfig>>() {
    Some(auth) => auth.clone(),
    None => {
      error!("AuthConfig missing from app data.");
      return Session::default();
    },
  };

  let user = match request_token(req.headers(), req.cookie(&auth.cookie_name)) {
    Some(token) => current_user(req, &auth, &token).await,
    None => None,
  };

  let csrf_token = match csrf::token_for(&auth.secret, user.as_ref().map(|u| u.id)) {
    Ok(token) => token,
    Err(err) => {
      error!("Failed to derive CSRF token: {:?}", err);
      String::new()
    },
  };

  Session {
    user,
    csrf_token,
  }
}

/// Validate the token, then re-read the user by the id it names.
async fn current_user(req: &ServiceRequest, auth: &AuthConfig, token: &str) -> Option<crate::models::User> {
  let claims = token.decode_jwt(auth)?;
  let user_id = claims.user_id()?;
  let db = req.app_data::<web::Data<DbService>>()?;
  match db.user.get_by_id(user_id).await {
    Ok(user) => user,
    Err(err) => {
      error!("Failed to load session user {}: {:?}", user_id, err);
      None
    },
  }
}
