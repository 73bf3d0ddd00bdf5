#![allow(dead_code)]

use actix_http::Request;
use actix_web::{
  body::MessageBody,
  cookie::Cookie,
  dev::{Service, ServiceResponse},
  http::{header, StatusCode},
  test::{self, TestRequest},
};
use serde_json::Value;

use fast_conduit::app::AppConfig;
use fast_conduit::services::{config_services, Services};

pub const PASSWORD: &str = "password123";

const CONFIG: &str = r#"
servers = ["web"]

[web]
listen = "127.0.0.1:0"
services = ["User", "Profile", "Article", "Comment", "Tag", "Assets"]

[db]
url = "memory:"

[auth]
secret = "integration-test-secret"

[tags]
cache_ttl_secs = 60
"#;

/// Fresh services on an empty in-memory store.
pub fn services() -> Services {
  let config = AppConfig::from_toml(CONFIG).unwrap();
  config_services(&config, "web").unwrap()
}

/// A logged-in browser: session cookie plus the matching CSRF token.
#[derive(Debug, Clone)]
pub struct Client {
  pub username: String,
  pub cookie: Cookie<'static>,
  pub csrf: String,
}

impl Client {
  pub fn get(&self, uri: &str) -> TestRequest {
    TestRequest::get().uri(uri).cookie(self.cookie.clone())
  }

  /// POST with the CSRF header.
  pub fn post(&self, uri: &str) -> TestRequest {
    self.post_without_token(uri).insert_header(("X-CSRF-Token", self.csrf.as_str()))
  }

  pub fn post_without_token(&self, uri: &str) -> TestRequest {
    TestRequest::post().uri(uri).cookie(self.cookie.clone())
  }

  pub fn delete(&self, uri: &str) -> TestRequest {
    TestRequest::delete()
      .uri(uri)
      .cookie(self.cookie.clone())
      .insert_header(("X-CSRF-Token", self.csrf.as_str()))
  }
}

pub async fn session<S, B>(app: &S, cookie: Option<&Cookie<'static>>) -> Value
where
  S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
  B: MessageBody,
{
  let mut req = TestRequest::get().uri("/api/session");
  if let Some(cookie) = cookie {
    req = req.cookie(cookie.clone());
  }
  test::call_and_read_body_json(app, req.to_request()).await
}

pub async fn anonymous_csrf<S, B>(app: &S) -> String
where
  S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
  B: MessageBody,
{
  session(app, None).await["csrfToken"].as_str().unwrap().to_string()
}

pub fn session_cookie<B>(resp: &ServiceResponse<B>) -> Cookie<'static> {
  resp.response().cookies()
    .find(|c| c.name() == "jwt_token")
    .expect("session cookie")
    .into_owned()
}

/// Register through the form endpoint and return the logged-in client.
pub async fn register<S, B>(app: &S, username: &str) -> Client
where
  S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
  B: MessageBody,
{
  let csrf = anonymous_csrf(app).await;
  let email = format!("{}@example.com", username);
  let req = TestRequest::post()
    .uri("/register")
    .insert_header(("X-CSRF-Token", csrf.as_str()))
    .set_form([("username", username), ("email", email.as_str()), ("password", PASSWORD)])
    .to_request();
  let resp = test::call_service(app, req).await;
  assert_eq!(resp.status(), StatusCode::SEE_OTHER, "register {}", username);
  let cookie = session_cookie(&resp);

  let csrf = session(app, Some(&cookie)).await["csrfToken"].as_str().unwrap().to_string();
  Client {
    username: username.to_string(),
    cookie,
    csrf,
  }
}

/// Publish an article through the editor form, returning its slug.
pub async fn create_article<S, B>(app: &S, client: &Client, title: &str, tags: &str) -> String
where
  S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
  B: MessageBody,
{
  let req = client.post("/editor")
    .set_form([("title", title), ("description", "about"), ("body", "text"), ("tags", tags)])
    .to_request();
  let resp = test::call_service(app, req).await;
  assert_eq!(resp.status(), StatusCode::SEE_OTHER);
  let location = resp.headers().get(header::LOCATION).unwrap().to_str().unwrap();
  location.trim_start_matches("/article/").to_string()
}

pub async fn article_json<S, B>(app: &S, slug: &str) -> Value
where
  S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
  B: MessageBody,
{
  let req = TestRequest::get().uri(&format!("/api/articles/{}", slug)).to_request();
  let json: Value = test::call_and_read_body_json(app, req).await;
  json["article"].clone()
}

pub async fn body_text<B: MessageBody>(resp: ServiceResponse<B>) -> String {
  let body = test::read_body(resp).await;
  String::from_utf8(body.to_vec()).unwrap()
}
