use log::*;

use actix_web::{
  get, post, web, HttpResponse,
};

use crate::error::*;
use crate::app::*;
use crate::forms::*;
use crate::models::*;
use crate::auth::{pass, removal_cookie, session_cookie, AuthConfig, GenerateJwt, Session};
use crate::db::DbService;
use crate::util::segment;

/// Storage conflict on username/email as a form error.
fn conflict_message(err: &Error) -> Option<String> {
  match err {
    Error::Conflict(constraint) if constraint.contains("email") => {
      Some("email has already been taken".to_string())
    },
    Error::Conflict(_) => Some("username has already been taken".to_string()),
    _ => None,
  }
}

/// Redirect `location`, carrying a fresh session cookie for `user`.
fn start_session(auth: &AuthConfig, user: &User, location: &str) -> Result<HttpResponse> {
  let token = user.generate_jwt(auth)?;
  let mut resp = super::see_other(location);
  resp.add_cookie(&session_cookie(auth, token))
    .map_err(|e| anyhow::anyhow!("set cookie: {}", e))?;
  Ok(resp)
}

/// login user
#[post("/login")]
async fn login(
  auth: web::Data<AuthConfig>,
  db: web::Data<DbService>,
  form: web::Form<LoginUser>,
) -> Result<HttpResponse> {
  let invalid = || Error::validation("email or password is invalid");
  // Get user from database
  let user = db.user.get_by_email(form.email.trim()).await?
    .ok_or_else(invalid)?;

  let res = pass::check_password(&user.password, &form.password)?;
  if !res.is_valid {
    info!("login: bad password for user {}", user.id);
    return Err(invalid());
  }
  if res.needs_update {
    // Rehash password.
    info!("login: rehash password for user {}", user.id);
    let hash = pass::hash_password(&form.password)?;
    db.user.update_password(user.id, &hash).await?;
  }
  start_session(&auth, &user, "/")
}

/// register new user
#[post("/register")]
async fn register(
  cfg: web::Data<UserService>,
  auth: web::Data<AuthConfig>,
  db: web::Data<DbService>,
  form: web::Form<RegisterUser>,
) -> Result<HttpResponse> {
  if !cfg.allow_register {
    return Err(Error::Forbidden("Registration is disabled".to_string()));
  }
  let errors = form.validate();
  if !errors.is_empty() {
    return Err(Error::UnprocessableEntity(errors));
  }

  let new_user = NewUser {
    username: form.username.trim().to_string(),
    email: form.email.trim().to_string(),
    password_hash: pass::hash_password(&form.password)?,
  };
  let id = match db.user.create(&new_user).await {
    Ok(id) => id,
    Err(err) => match conflict_message(&err) {
      Some(message) => return Err(Error::UnprocessableEntity(vec![message])),
      None => return Err(err),
    },
  };
  let user = db.user.get_by_id(id).await?
    .ok_or(Error::InternalServerError)?;
  info!("Registered user {}", user.id);
  start_session(&auth, &user, "/")
}

#[post("/logout")]
async fn logout(
  auth: web::Data<AuthConfig>,
) -> Result<HttpResponse> {
  let mut resp = super::see_other("/");
  resp.add_cookie(&removal_cookie(&auth))
    .map_err(|e| anyhow::anyhow!("set cookie: {}", e))?;
  Ok(resp)
}

/// update profile fields, re-issuing the session for the new identity.
#[post("/settings")]
async fn settings(
  auth: web::Data<AuthConfig>,
  db: web::Data<DbService>,
  session: Session,
  form: web::Form<UpdateUser>,
) -> Result<HttpResponse> {
  let user = session.require()?;
  let errors = form.validate();
  if !errors.is_empty() {
    return Err(Error::UnprocessableEntity(errors));
  }

  let password_hash = match form.new_password() {
    Some(password) => Some(pass::hash_password(password)?),
    None => None,
  };
  let non_empty = |v: &Option<String>| v.as_deref().map(str::trim).filter(|v| !v.is_empty()).map(str::to_string);
  let changes = UserChanges {
    username: form.username.trim().to_string(),
    email: form.email.trim().to_string(),
    bio: non_empty(&form.bio),
    image: non_empty(&form.image),
    password_hash,
  };
  if let Err(err) = db.user.update(user.id, &changes).await {
    return match conflict_message(&err) {
      Some(message) => Err(Error::UnprocessableEntity(vec![message])),
      None => Err(err),
    };
  }
  let user = db.user.get_by_id(user.id).await?
    .ok_or(Error::LoginRequired)?;
  start_session(&auth, &user, &format!("/profile/{}", segment(&user.username)))
}

/// Current user and the CSRF token for scripted clients.
#[get("/session")]
async fn get_session(
  session: Session,
) -> Result<HttpResponse> {
  Ok(HttpResponse::Ok().json(SessionOut {
    user: session.user.as_ref().map(SessionUser::from),
    csrf_token: session.csrf_token.clone(),
  }))
}

#[derive(Debug, Clone)]
pub struct UserService {
  pub allow_register: bool,
}

impl super::Service for UserService {
  fn load_app_config(&mut self, config: &AppConfig, _prefix: &str) -> Result<()> {
    self.allow_register = config.get_bool("User.allow_register")?.unwrap_or(true);
    Ok(())
  }

  fn web_config(&self, web: &mut web::ServiceConfig) {
    web
      .app_data(web::Data::new(self.clone()))
      .service(register)
      .service(login)
      .service(logout)
      .service(settings);
  }

  fn api_config(&self, web: &mut web::ServiceConfig) {
    web.service(get_session);
  }
}

pub fn new_factory() -> UserService {
  UserService {
    allow_register: true,
  }
}
