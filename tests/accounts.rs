mod common;

use actix_web::{
  http::{header, StatusCode},
  test,
};
use pretty_assertions::assert_eq;

use fast_conduit::app::build_app;

use common::*;

#[actix_web::test]
async fn register_starts_a_session() {
  let app = test::init_service(build_app(&services())).await;
  let jake = register(&app, "jake").await;

  let session = session(&app, Some(&jake.cookie)).await;
  assert_eq!(session["user"]["username"], "jake");
  assert_eq!(session["user"]["email"], "jake@example.com");
  assert_eq!(session["csrfToken"], jake.csrf.as_str());
  assert_ne!(jake.csrf, anonymous_csrf(&app).await);
}

#[actix_web::test]
async fn duplicate_registration_is_a_form_error() {
  let app = test::init_service(build_app(&services())).await;
  register(&app, "jake").await;
  let csrf = anonymous_csrf(&app).await;

  let req = test::TestRequest::post()
    .uri("/register")
    .insert_header(("X-CSRF-Token", csrf.as_str()))
    .set_form([("username", "jake"), ("email", "other@example.com"), ("password", PASSWORD)])
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
  assert!(body_text(resp).await.contains("username has already been taken"));

  let req = test::TestRequest::post()
    .uri("/register")
    .insert_header(("X-CSRF-Token", csrf.as_str()))
    .set_form([("username", "jacob"), ("email", "jake@example.com"), ("password", PASSWORD)])
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
  assert!(body_text(resp).await.contains("email has already been taken"));
}

#[actix_web::test]
async fn register_validates_fields() {
  let app = test::init_service(build_app(&services())).await;
  let csrf = anonymous_csrf(&app).await;

  let req = test::TestRequest::post()
    .uri("/register")
    .insert_header(("X-CSRF-Token", csrf.as_str()))
    .set_form([("username", " "), ("email", "a@example.com"), ("password", "short")])
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
  let html = body_text(resp).await;
  assert!(html.starts_with(r#"<ul class="error-messages">"#));
  assert!(html.contains("username can't be blank"));
  assert!(html.contains("password must be at least 8 characters"));
}

#[actix_web::test]
async fn login_and_logout() {
  let app = test::init_service(build_app(&services())).await;
  register(&app, "jake").await;
  let csrf = anonymous_csrf(&app).await;

  let req = test::TestRequest::post()
    .uri("/login")
    .insert_header(("X-CSRF-Token", csrf.as_str()))
    .set_form([("email", "jake@example.com"), ("password", "wrong password")])
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
  assert!(body_text(resp).await.contains("email or password is invalid"));

  let req = test::TestRequest::post()
    .uri("/login")
    .insert_header(("X-CSRF-Token", csrf.as_str()))
    .set_form([("email", "jake@example.com"), ("password", PASSWORD)])
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::SEE_OTHER);
  assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/");
  let cookie = session_cookie(&resp);
  let session = session(&app, Some(&cookie)).await;
  assert_eq!(session["user"]["username"], "jake");

  let req = test::TestRequest::post()
    .uri("/logout")
    .cookie(cookie.clone())
    .insert_header(("X-CSRF-Token", session["csrfToken"].as_str().unwrap()))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::SEE_OTHER);
  let removed = session_cookie(&resp);
  assert_eq!(removed.value(), "");
}

#[actix_web::test]
async fn unknown_session_token_is_anonymous() {
  let app = test::init_service(build_app(&services())).await;
  let cookie = actix_web::cookie::Cookie::new("jwt_token", "not-a-jwt");
  let session = session(&app, Some(&cookie)).await;
  assert!(session["user"].is_null());
  assert_eq!(session["csrfToken"], anonymous_csrf(&app).await.as_str());
}

#[actix_web::test]
async fn settings_update_profile_and_reissue_session() {
  let app = test::init_service(build_app(&services())).await;
  let jake = register(&app, "jake").await;
  register(&app, "jane").await;

  let req = jake.post("/settings")
    .set_form([("username", "jane"), ("email", "jake@example.com")])
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

  let req = jake.post("/settings")
    .set_form([
      ("username", "jacob"),
      ("email", "jacob@example.com"),
      ("bio", "I work at statefarm"),
      ("password", ""),
    ])
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::SEE_OTHER);
  assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/profile/jacob");
  let cookie = session_cookie(&resp);

  let session = session(&app, Some(&cookie)).await;
  assert_eq!(session["user"]["username"], "jacob");
  assert_eq!(session["user"]["bio"], "I work at statefarm");

  // Empty password field keeps the old password.
  let csrf = anonymous_csrf(&app).await;
  let req = test::TestRequest::post()
    .uri("/login")
    .insert_header(("X-CSRF-Token", csrf.as_str()))
    .set_form([("email", "jacob@example.com"), ("password", PASSWORD)])
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::SEE_OTHER);
}

#[actix_web::test]
async fn settings_requires_login() {
  let app = test::init_service(build_app(&services())).await;
  let csrf = anonymous_csrf(&app).await;
  let req = test::TestRequest::post()
    .uri("/settings")
    .insert_header(("X-CSRF-Token", csrf.as_str()))
    .set_form([("username", "x"), ("email", "x@example.com")])
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::SEE_OTHER);
  assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/login");
}
