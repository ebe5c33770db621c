use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use social_graph::{create_router, AppState, Config};

async fn app() -> Router {
    let state = AppState::new(Config::in_memory()).await.unwrap();
    create_router(state)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// Returns (user id, token).
async fn register(app: &Router, username: &str) -> (i64, String) {
    let (status, body) = send(
        app,
        Method::POST,
        "/register",
        None,
        Some(json!({ "username": username, "password": "pass1234" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    (
        body["user"]["id"].as_i64().unwrap(),
        body["token"].as_str().unwrap().to_string(),
    )
}

async fn create_post(app: &Router, token: &str, title: &str) -> i64 {
    let (status, body) = send(
        app,
        Method::POST,
        "/posts",
        Some(token),
        Some(json!({ "title": title, "content": "body" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_health() {
    let app = app().await;
    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "healthy" }));
}

#[tokio::test]
async fn test_follow_like_feed_scenario() {
    let app = app().await;
    let (_alice, alice_token) = register(&app, "alice").await;
    let (bob, bob_token) = register(&app, "bob").await;

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/users/{}/follow", bob),
        Some(&alice_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": "You are now following bob." }));

    let (_, inbox) = send(&app, Method::GET, "/notifications", Some(&bob_token), None).await;
    let inbox = inbox.as_array().unwrap().clone();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0]["verb"], "started following");
    assert_eq!(inbox[0]["actor_username"], "alice");

    let post = create_post(&app, &bob_token, "Hello").await;

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/posts/{}/like", post),
        Some(&alice_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "detail": "Post liked successfully." }));

    let (_, inbox) = send(&app, Method::GET, "/notifications", Some(&bob_token), None).await;
    let inbox = inbox.as_array().unwrap().clone();
    assert_eq!(inbox.len(), 2);
    assert_eq!(inbox[0]["verb"], "liked");
    assert_eq!(inbox[0]["target"], json!({ "type": "post", "id": post }));

    let (status, feed) = send(&app, Method::GET, "/feed", Some(&alice_token), None).await;
    assert_eq!(status, StatusCode::OK);
    let feed = feed.as_array().unwrap().clone();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0]["id"], post);
    assert_eq!(feed[0]["likes_count"], 1);

    let (_, own_feed) = send(&app, Method::GET, "/feed", Some(&bob_token), None).await;
    assert_eq!(own_feed, json!([]));
}

#[tokio::test]
async fn test_like_errors() {
    let app = app().await;
    let (_, alice_token) = register(&app, "alice").await;
    let (_, bob_token) = register(&app, "bob").await;
    let post = create_post(&app, &bob_token, "Hello").await;
    let like = format!("/posts/{}/like", post);
    let unlike = format!("/posts/{}/unlike", post);

    send(&app, Method::POST, &like, Some(&alice_token), None).await;
    let (status, body) = send(&app, Method::POST, &like, Some(&alice_token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "You have already liked this post.");

    let (status, body) = send(&app, Method::POST, &unlike, Some(&alice_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "detail": "Post unliked successfully." }));

    let (status, body) = send(&app, Method::POST, &unlike, Some(&alice_token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "You have not liked this post.");

    let (status, _) = send(&app, Method::POST, "/posts/9999/like", Some(&alice_token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_follow_self_and_missing_user() {
    let app = app().await;
    let (alice, alice_token) = register(&app, "alice").await;

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/users/{}/follow", alice),
        Some(&alice_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "You cannot follow yourself.");

    let (status, _) = send(&app, Method::POST, "/users/424242/follow", Some(&alice_token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_authentication_rules() {
    let app = app().await;
    let (_, bob_token) = register(&app, "bob").await;
    let post = create_post(&app, &bob_token, "Hello").await;

    // Anonymous reads are allowed, anonymous writes are not
    let (status, _) = send(&app, Method::GET, "/posts", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, Method::GET, &format!("/posts/{}", post), None, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send(
        &app,
        Method::POST,
        "/posts",
        None,
        Some(json!({ "title": "x", "content": "y" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], 401);
    let (status, _) = send(&app, Method::GET, "/feed", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // A bad token is rejected even on public routes
    let (status, body) = send(&app, Method::GET, "/posts", Some("not-a-real-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid token.");
}

#[tokio::test]
async fn test_login_returns_same_token() {
    let app = app().await;
    let (_, token) = register(&app, "alice").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/login",
        None,
        Some(json!({ "username": "alice", "password": "pass1234" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token"], token);

    let (status, body) = send(
        &app,
        Method::POST,
        "/login",
        None,
        Some(json!({ "username": "alice", "password": "nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid credentials");

    let (status, _) = send(
        &app,
        Method::POST,
        "/register",
        None,
        Some(json!({ "username": "alice", "password": "other" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_owner_only_mutations() {
    let app = app().await;
    let (_, alice_token) = register(&app, "alice").await;
    let (_, bob_token) = register(&app, "bob").await;
    let post = create_post(&app, &bob_token, "Hello").await;
    let uri = format!("/posts/{}", post);

    let (status, _) = send(
        &app,
        Method::PATCH,
        &uri,
        Some(&alice_token),
        Some(json!({ "title": "Hijacked" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, Method::DELETE, &uri, Some(&alice_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        Method::PATCH,
        &uri,
        Some(&bob_token),
        Some(json!({ "title": "Edited" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Edited");
    assert_eq!(body["content"], "body");

    let (status, _) = send(
        &app,
        Method::PUT,
        &uri,
        Some(&bob_token),
        Some(json!({ "title": "Only title" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, Method::DELETE, &uri, Some(&bob_token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);
    let (status, _) = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_comments_and_notifications() {
    let app = app().await;
    let (_, alice_token) = register(&app, "alice").await;
    let (_, bob_token) = register(&app, "bob").await;
    let post = create_post(&app, &bob_token, "Hello").await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/comments",
        Some(&alice_token),
        Some(json!({ "post": post, "content": "   " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, comment) = send(
        &app,
        Method::POST,
        "/comments",
        Some(&alice_token),
        Some(json!({ "post": post, "content": "Nice!" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(comment["author"], "alice");

    let (_, listed) = send(&app, Method::GET, &format!("/comments?post={}", post), None, None).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (_, inbox) = send(&app, Method::GET, "/notifications", Some(&bob_token), None).await;
    let notification = inbox[0].clone();
    assert_eq!(notification["verb"], "commented on");
    assert_eq!(notification["is_read"], false);
    let read_uri = format!("/notifications/{}/read", notification["id"]);

    let (status, _) = send(&app, Method::POST, &read_uri, Some(&alice_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, Method::POST, &read_uri, Some(&bob_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_read"], true);

    let (_, unread) = send(
        &app,
        Method::GET,
        "/notifications?unread=true",
        Some(&bob_token),
        None,
    )
    .await;
    assert_eq!(unread, json!([]));

    let (status, _) = send(&app, Method::POST, "/notifications/9999/read", Some(&bob_token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_deleting_account_cascades() {
    let app = app().await;
    let (_, alice_token) = register(&app, "alice").await;
    let (bob, bob_token) = register(&app, "bob").await;
    let post = create_post(&app, &bob_token, "Hello").await;
    send(
        &app,
        Method::POST,
        "/comments",
        Some(&alice_token),
        Some(json!({ "post": post, "content": "Nice!" })),
    )
    .await;

    let (status, _) = send(&app, Method::DELETE, "/profile", Some(&bob_token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, Method::GET, &format!("/posts/{}", post), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, comments) = send(&app, Method::GET, "/comments", None, None).await;
    assert_eq!(comments, json!([]));
    let (status, _) = send(&app, Method::GET, &format!("/users/{}", bob), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The deleted user's token no longer authenticates
    let (status, _) = send(&app, Method::GET, "/profile", Some(&bob_token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_profile_round_trip() {
    let app = app().await;
    let (_, alice_token) = register(&app, "alice").await;
    let (bob, _) = register(&app, "bob").await;
    send(
        &app,
        Method::POST,
        &format!("/users/{}/follow", bob),
        Some(&alice_token),
        None,
    )
    .await;

    let (status, body) = send(
        &app,
        Method::PATCH,
        "/profile",
        Some(&alice_token),
        Some(json!({ "bio": "rustacean" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bio"], "rustacean");
    assert_eq!(body["following"], json!(["bob"]));
    assert!(body.get("password_hash").is_none());

    let (_, bob_profile) = send(&app, Method::GET, &format!("/users/{}", bob), None, None).await;
    assert_eq!(bob_profile["followers"], json!(["alice"]));
}

#[tokio::test]
async fn test_pagination() {
    let app = app().await;
    let (_, token) = register(&app, "alice").await;
    for title in ["one", "two", "three"] {
        create_post(&app, &token, title).await;
    }

    let (_, all) = send(&app, Method::GET, "/posts", None, None).await;
    assert_eq!(all.as_array().unwrap().len(), 3);
    assert_eq!(all[0]["title"], "three");

    let (_, page) = send(&app, Method::GET, "/posts?limit=1&offset=1", None, None).await;
    let page = page.as_array().unwrap().clone();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0]["title"], "two");

    let (status, _) = send(&app, Method::GET, "/posts?limit=abc", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_file_backed_store_persists() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::in_memory();
    config.database.url = format!("sqlite:{}", dir.path().join("social.db").display());

    let token = {
        let state = AppState::new(config.clone()).await.unwrap();
        let database = state.database.clone();
        let app = create_router(state);
        let (_, token) = register(&app, "alice").await;
        database.close().await;
        token
    };

    let app = create_router(AppState::new(config).await.unwrap());
    let (status, body) = send(&app, Method::GET, "/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
}
