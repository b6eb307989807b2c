use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::{json, Value};
use smartmarks_server::config::{Config, LogFormat};
use smartmarks_server::{app_router, build_state};
use tower::ServiceExt;

fn test_config(trusted_callback: bool) -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        database_url: None,
        jwt_secret: b"integration-secret-integration-secret".to_vec(),
        session_ttl: Duration::from_secs(3600),
        feed_capacity: 16,
        google_client_id: Some("client-123".to_string()),
        redirect_url: "http://localhost:3000/auth/callback/google".to_string(),
        trusted_callback,
        log_format: LogFormat::Text,
    }
}

async fn app() -> Router {
    let state = build_state(&test_config(true)).await.unwrap();
    app_router(state)
}

fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn sign_in(app: &Router, subject: &str) -> String {
    let response = app
        .clone()
        .oneshot(request(
            Method::POST,
            "/auth/callback/google",
            None,
            Some(json!({ "subject": subject, "email": format!("{subject}@example.com") })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["tokenType"], "Bearer");
    assert_eq!(body["user"]["id"], subject);
    body["accessToken"].as_str().unwrap().to_string()
}

async fn create(app: &Router, token: &str, url: &str, title: &str) -> Value {
    let response = app
        .clone()
        .oneshot(request(
            Method::POST,
            "/api/bookmarks",
            Some(token),
            Some(json!({ "url": url, "title": title })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    json_body(response).await
}

#[tokio::test]
async fn health_reports_ok() {
    let app = app().await;
    let response = app
        .oneshot(request(Method::GET, "/health", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["live_feeds"], 0);
}

#[tokio::test]
async fn anonymous_user_is_null() {
    let app = app().await;
    let response = app
        .oneshot(request(Method::GET, "/auth/user", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, Value::Null);
}

#[tokio::test]
async fn sign_in_redirects_to_provider() {
    let app = app().await;
    let response = app
        .oneshot(request(Method::GET, "/auth/sign-in/google", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response.headers()[header::LOCATION].to_str().unwrap();
    assert!(location.starts_with("https://accounts.google.com/"));
    assert!(location.contains("client_id=client-123"));
}

#[tokio::test]
async fn unknown_provider_is_rejected() {
    let app = app().await;
    let response = app
        .oneshot(request(Method::GET, "/auth/sign-in/myspace", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"], "Sign-in provider 'myspace' is not supported");
}

#[tokio::test]
async fn callback_hidden_unless_trusted() {
    let state = build_state(&test_config(false)).await.unwrap();
    let app = app_router(state);
    let response = app
        .oneshot(request(
            Method::POST,
            "/auth/callback/google",
            None,
            Some(json!({ "subject": "alice" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_requires_session() {
    let app = app().await;
    let response = app
        .oneshot(request(
            Method::POST,
            "/api/bookmarks",
            None,
            Some(json!({ "url": "https://example.com", "title": "Example" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["error"], "You must be logged in to add a bookmark");
}

#[tokio::test]
async fn create_rejects_blank_title() {
    let app = app().await;
    let token = sign_in(&app, "alice").await;
    let response = app
        .oneshot(request(
            Method::POST,
            "/api/bookmarks",
            Some(&token),
            Some(json!({ "url": "https://example.com", "title": "   " })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn list_is_scoped_and_newest_first() {
    let app = app().await;
    let alice = sign_in(&app, "alice").await;
    let bob = sign_in(&app, "bob").await;

    create(&app, &alice, "https://a.com", "A").await;
    create(&app, &bob, "https://b.com", "B").await;
    create(&app, &alice, "https://c.com", "C").await;

    let response = app
        .clone()
        .oneshot(request(Method::GET, "/api/bookmarks", Some(&alice), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    let titles: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["C", "A"]);
    assert!(body
        .as_array()
        .unwrap()
        .iter()
        .all(|b| b["user_id"] == "alice"));
}

#[tokio::test]
async fn delete_enforces_ownership() {
    let app = app().await;
    let alice = sign_in(&app, "alice").await;
    let bob = sign_in(&app, "bob").await;

    let mark = create(&app, &alice, "https://a.com", "A").await;
    let uri = format!("/api/bookmarks/{}", mark["id"].as_str().unwrap());

    let response = app
        .clone()
        .oneshot(request(Method::DELETE, &uri, Some(&bob), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(request(Method::DELETE, &uri, Some(&alice), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(request(Method::DELETE, &uri, Some(&alice), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn sign_out_revokes_session() {
    let app = app().await;
    let token = sign_in(&app, "alice").await;

    let response = app
        .clone()
        .oneshot(request(Method::GET, "/auth/user", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(json_body(response).await["id"], "alice");

    let response = app
        .clone()
        .oneshot(request(Method::POST, "/auth/sign-out", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(request(Method::GET, "/api/bookmarks", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_bodies_get_json_errors() {
    let app = app().await;
    let token = sign_in(&app, "alice").await;

    let response = app
        .clone()
        .oneshot(request(
            Method::POST,
            "/api/bookmarks",
            Some(&token),
            Some(json!({ "url": "https://x.com" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("title"));

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/bookmarks")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await["error"].is_string());
}

#[tokio::test]
async fn non_uuid_id_gets_json_error() {
    let app = app().await;
    let token = sign_in(&app, "alice").await;

    let response = app
        .oneshot(request(
            Method::DELETE,
            "/api/bookmarks/not-a-uuid",
            Some(&token),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await["error"].is_string());
}

#[tokio::test]
async fn unconfigured_provider_is_a_bad_request() {
    let mut config = test_config(true);
    config.google_client_id = None;
    let app = app_router(build_state(&config).await.unwrap());

    let response = app
        .oneshot(request(Method::GET, "/auth/sign-in/google", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(
        body["error"],
        "Sign-in with 'google' is not configured for this server"
    );
}
