use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use futures::{SinkExt, StreamExt};
use smartmarks_core::{ChangeEvent, FeedMessage, MutationBoundary, User};
use smartmarks_server::config::{Config, LogFormat};
use smartmarks_server::{app_router, build_state, AppState};
use tokio::net::TcpListener;
use tokio_tungstenite::{connect_async, tungstenite};
use tower::ServiceExt;
use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;

fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        database_url: None,
        jwt_secret: b"integration-secret-integration-secret".to_vec(),
        session_ttl: Duration::from_secs(3600),
        feed_capacity: 16,
        google_client_id: None,
        redirect_url: "http://localhost:3000/auth/callback/google".to_string(),
        trusted_callback: false,
        log_format: LogFormat::Text,
    }
}

/// Serve the app on an ephemeral port
async fn serve() -> (AppState, String) {
    let state = build_state(&test_config()).await.unwrap();
    let app = app_router(state.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (state, format!("ws://{}/ws/bookmarks", addr))
}

async fn wait_for_subscribers(state: &AppState, user: &User, expected: usize) {
    for _ in 0..100 {
        if state.feed.subscriber_count(&user.id) == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!(
        "expected {} subscribers, found {}",
        expected,
        state.feed.subscriber_count(&user.id)
    );
}

#[tokio::test]
async fn feed_requires_session() {
    let state = build_state(&test_config()).await.unwrap();
    let app = app_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/ws/bookmarks")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn feed_rejects_invalid_query_token() {
    let (_state, url) = serve().await;

    let err = connect_async(format!("{url}?token=not-a-token"))
        .await
        .unwrap_err();

    match err {
        tungstenite::Error::Http(response) => {
            assert_eq!(response.status().as_u16(), 401)
        }
        other => panic!("unexpected handshake error: {other}"),
    }
}

#[tokio::test]
async fn feed_streams_own_changes_and_releases_on_close() {
    let (state, url) = serve().await;
    let alice = User::new("alice", "google");
    let bob = User::new("bob", "google");
    let token = state.auth.issue_token(&alice).unwrap();

    let (mut socket, _) = connect_async(format!("{url}?token={token}")).await.unwrap();
    wait_for_subscribers(&state, &alice, 1).await;

    // Bob's change goes to Bob's channel only
    state
        .service
        .for_user(Some(bob))
        .create("https://b.com", "B")
        .await
        .unwrap();
    let created = state
        .service
        .for_user(Some(alice.clone()))
        .create("https://a.com", "A")
        .await
        .unwrap();

    let frame = socket.next().await.unwrap().unwrap();
    let message = FeedMessage::from_frame(frame.to_text().unwrap());
    assert_eq!(message, FeedMessage::Change(ChangeEvent::insert(created)));

    socket.close(None).await.unwrap();
    wait_for_subscribers(&state, &alice, 0).await;
    assert_eq!(state.feed.channel_count(), 0);
}

#[derive(Clone, Default)]
struct LogBuffer {
    buffer: Arc<Mutex<Vec<u8>>>,
}

struct LogBufferGuard {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBufferGuard;

    fn make_writer(&'a self) -> Self::Writer {
        LogBufferGuard {
            buffer: self.buffer.clone(),
        }
    }
}

impl Write for LogBufferGuard {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn request_spans_omit_query_token() {
    let logs = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_max_level(Level::DEBUG)
        .with_ansi(false)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let state = build_state(&test_config()).await.unwrap();
    let app = app_router(state);
    let response = app
        .oneshot(
            Request::builder()
                .uri("/ws/bookmarks?token=secret-session-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let output = String::from_utf8(logs.buffer.lock().unwrap().clone()).unwrap();
    assert!(output.contains("/ws/bookmarks"));
    assert!(!output.contains("secret-session-token"));
}
