mod common;

use actix_web::{
  http::{header, StatusCode},
  test,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use fast_conduit::app::build_app;

use common::*;

#[actix_web::test]
async fn slugs_stay_unique() {
  let app = test::init_service(build_app(&services())).await;
  let author = register(&app, "author").await;

  assert_eq!(create_article(&app, &author, "Hello World", "").await, "hello-world");
  assert_eq!(create_article(&app, &author, "Hello, World!", "").await, "hello-world-1");
}

#[actix_web::test]
async fn editor_updates_own_articles_only() {
  let app = test::init_service(build_app(&services())).await;
  let author = register(&app, "author").await;
  let other = register(&app, "other").await;
  let slug = create_article(&app, &author, "First Draft", "rust, web").await;
  let uri = format!("/editor/{}", slug);

  let form = [("title", "Stolen"), ("description", "d"), ("body", "b")];
  let resp = test::call_service(&app, other.post(&uri).set_form(form).to_request()).await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);
  assert_eq!(body_text(resp).await, "You can only edit your own articles");

  let form = [("title", ""), ("description", "d"), ("body", "b")];
  let resp = test::call_service(&app, author.post(&uri).set_form(form).to_request()).await;
  assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

  // No tags field: the tag set is kept.
  let form = [("title", "Final Copy"), ("description", "d"), ("body", "b")];
  let resp = test::call_service(&app, author.post(&uri).set_form(form).to_request()).await;
  assert_eq!(resp.status(), StatusCode::SEE_OTHER);
  assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/article/final-copy");

  let article = article_json(&app, "final-copy").await;
  assert_eq!(article["title"], "Final Copy");
  assert_eq!(article["tagList"], json!(["rust", "web"]));

  let resp = test::call_service(&app,
    author.post("/editor/missing").set_form(form).to_request()).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn list_filters_and_feed() {
  let app = test::init_service(build_app(&services())).await;
  let jake = register(&app, "jake").await;
  let jane = register(&app, "jane").await;
  create_article(&app, &jake, "Rust Tips", "rust").await;
  create_article(&app, &jane, "Web Tips", "web").await;

  let list: Value = test::call_and_read_body_json(&app,
    test::TestRequest::get().uri("/api/articles").to_request()).await;
  assert_eq!(list["articlesCount"], 2);
  // Newest first.
  assert_eq!(list["articles"][0]["slug"], "web-tips");

  let list: Value = test::call_and_read_body_json(&app,
    test::TestRequest::get().uri("/api/articles?tag=rust").to_request()).await;
  assert_eq!(list["articlesCount"], 1);
  assert_eq!(list["articles"][0]["author"]["username"], "jake");

  let list: Value = test::call_and_read_body_json(&app,
    test::TestRequest::get().uri("/api/articles?author=jane&limit=1").to_request()).await;
  assert_eq!(list["articles"][0]["slug"], "web-tips");

  let resp = test::call_service(&app, test::TestRequest::get().uri("/api/articles/feed").to_request()).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

  test::call_service(&app, jake.post("/profile/jane/follow").to_request()).await;
  let feed: Value = test::call_and_read_body_json(&app, jake.get("/api/articles/feed").to_request()).await;
  assert_eq!(feed["articlesCount"], 1);
  assert_eq!(feed["articles"][0]["slug"], "web-tips");
  assert_eq!(feed["articles"][0]["author"]["following"], true);
}

#[actix_web::test]
async fn favorited_filter_and_flags() {
  let app = test::init_service(build_app(&services())).await;
  let jake = register(&app, "jake").await;
  let jane = register(&app, "jane").await;
  let slug = create_article(&app, &jake, "Liked", "").await;
  create_article(&app, &jake, "Ignored", "").await;
  test::call_service(&app, jane.post(&format!("/article/{}/favorite", slug)).to_request()).await;

  let list: Value = test::call_and_read_body_json(&app,
    test::TestRequest::get().uri("/api/articles?favorited=jane").to_request()).await;
  assert_eq!(list["articlesCount"], 1);
  assert_eq!(list["articles"][0]["slug"], slug.as_str());

  let article: Value = test::call_and_read_body_json(&app,
    jane.get(&format!("/api/articles/{}", slug)).to_request()).await;
  assert_eq!(article["article"]["favorited"], true);
  assert_eq!(article_json(&app, &slug).await["favorited"], false);

  let resp = test::call_service(&app, test::TestRequest::get().uri("/api/articles/missing").to_request()).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn tag_catalog() {
  let app = test::init_service(build_app(&services())).await;
  let jake = register(&app, "jake").await;
  create_article(&app, &jake, "One", "rust, web").await;
  create_article(&app, &jake, "Two", "rust, Rustacean").await;
  create_article(&app, &jake, "Three", "rust").await;

  let tags: Value = test::call_and_read_body_json(&app,
    test::TestRequest::get().uri("/api/tags").to_request()).await;
  assert_eq!(tags, json!(["rust", "Rustacean", "web"]));

  let tags: Value = test::call_and_read_body_json(&app,
    test::TestRequest::get().uri("/api/tags?min=2").to_request()).await;
  assert_eq!(tags, json!(["rust"]));

  let tags: Value = test::call_and_read_body_json(&app,
    test::TestRequest::get().uri("/api/tags?q=RUST").to_request()).await;
  assert_eq!(tags, json!(["rust", "Rustacean"]));

  // Deleting an article refreshes the cached catalog.
  test::call_service(&app, jake.post("/article/one/delete").to_request()).await;
  let tags: Value = test::call_and_read_body_json(&app,
    test::TestRequest::get().uri("/api/tags").to_request()).await;
  assert_eq!(tags, json!(["rust", "Rustacean"]));
}

#[actix_web::test]
async fn comment_list_is_newest_first() {
  let app = test::init_service(build_app(&services())).await;
  let jake = register(&app, "jake").await;
  let slug = create_article(&app, &jake, "Thread", "").await;
  for body in ["first", "second"] {
    let req = jake.post(&format!("/article/{}/comments", slug)).set_form([("body", body)]).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
  }

  let list: Value = test::call_and_read_body_json(&app,
    test::TestRequest::get().uri(&format!("/api/articles/{}/comments", slug)).to_request()).await;
  assert_eq!(list["comments"][0]["body"], "second");
  assert_eq!(list["comments"][1]["body"], "first");
  assert_eq!(list["comments"][0]["author"]["username"], "jake");
}

#[actix_web::test]
async fn swap_script_is_served() {
  let app = test::init_service(build_app(&services())).await;
  let resp = test::call_service(&app, test::TestRequest::get().uri("/js/fragments.js").to_request()).await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(resp.headers().get(header::CONTENT_TYPE).unwrap(), "application/javascript; charset=utf-8");
  assert!(body_text(resp).await.contains("fx-action"));
}
