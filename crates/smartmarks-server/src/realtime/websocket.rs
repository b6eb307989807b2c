use axum::{
    extract::{
        rejection::QueryRejection,
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::Response,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use smartmarks_core::{ChangeFeed, Subscription, UserId};
use std::sync::Arc;

use crate::auth::RequestAuth;
use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Deserialize)]
struct FeedParams {
    /// Browsers cannot set headers on a WebSocket handshake
    token: Option<String>,
}

/// WebSocket handler streaming the caller's bookmark changes.
///
/// The session is checked before the upgrade so anonymous callers get a
/// plain 401.
async fn ws_handler(
    State(state): State<AppState>,
    auth: RequestAuth,
    params: Result<Query<FeedParams>, QueryRejection>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, AppError> {
    let auth = if auth.user().is_some() {
        auth
    } else {
        let Query(params) = params?;
        RequestAuth::from_token(Arc::clone(&state.auth), params.token.as_deref())
    };
    let owner = auth.require_user("open the bookmark feed")?.id.clone();
    let ws = ws.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;

    let subscription = state.feed.subscribe(&owner).await?;
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, subscription, owner)))
}

async fn handle_socket(socket: WebSocket, mut subscription: Subscription, owner: UserId) {
    let (mut sender, mut receiver) = socket.split();

    // Forward feed messages to this client; the subscription is released
    // when this task ends or is aborted
    let mut send_task = tokio::spawn(async move {
        while let Some(message) = subscription.next().await {
            let frame = match serde_json::to_string(&message) {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::error!("Failed to encode feed message: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    // The feed is push-only; client frames other than close are ignored
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Close(_) => break,
                Message::Text(_) | Message::Binary(_) => {
                    tracing::debug!("Ignoring client frame on the bookmark feed");
                }
                _ => {}
            }
        }
    });

    // Wait for either task to complete
    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
        }
        _ = &mut recv_task => {
            send_task.abort();
        }
    }

    tracing::debug!("Bookmark feed closed for {}", owner);
}

pub fn router() -> Router<AppState> {
    Router::new().route("/ws/bookmarks", get(ws_handler))
}
