//! WebSocket endpoint for the realtime chat gateway.

use crate::auth::{AuthUser, bearer_token};
use crate::error::ApiError;
use crate::gateway::{ConnectionId, ServerEvent};
use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, error, info, warn};

/// Handshake query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct WsQuery {
    /// Access token, as an alternative to the `Authorization` header.
    pub token: Option<String>,
}

/// WebSocket upgrade handler.
///
/// The credential is verified before upgrading; a failed check answers 401
/// and no socket is opened.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<WsQuery>,
    headers: HeaderMap,
) -> Response {
    let token = query
        .token
        .as_deref()
        .filter(|t| !t.is_empty())
        .or_else(|| bearer_token(&headers));

    let Some(token) = token else {
        return ApiError::Unauthorized("No token provided".to_string()).into_response();
    };

    let user = match state.auth.verify(token).await {
        Ok(user) => user,
        Err(e) => {
            debug!("WebSocket handshake rejected: {}", e);
            return e.into_response();
        }
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state, user))
}

/// Handle an individual WebSocket connection.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>, user: AuthUser) {
    let (id, events) = state.gateway.connect(user);
    let (sender, mut receiver) = socket.split();

    info!("WebSocket client {} connected as user {}", id, user.user_id);

    let ping_interval = Duration::from_secs(state.config.server.ws_ping_interval_secs);
    let mut send_task = tokio::spawn(forward_events(id, sender, events, ping_interval));

    // Frames are handled one at a time, so a connection's events are
    // processed in arrival order.
    let gateway = Arc::clone(&state.gateway);
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    debug!("Received WebSocket message from {}: {}", id, text.as_str());
                    gateway.handle_text(id, text.as_str()).await;
                }
                Ok(Message::Binary(_)) => {
                    gateway.send_to(
                        id,
                        ServerEvent::Error {
                            message: "Binary frames are not supported".to_string(),
                            code: "MALFORMED_FRAME".to_string(),
                        },
                    );
                }
                Ok(Message::Close(_)) => {
                    debug!("WebSocket client {} sent close", id);
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("WebSocket error on {}: {}", id, e);
                    break;
                }
            }
        }
    });

    // Wait for either task to complete
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    }

    state.gateway.disconnect(id);
    info!("WebSocket connection {} closed", id);
}

/// Drains the connection's event channel into the socket, interleaving
/// keep-alive pings.
async fn forward_events(
    id: ConnectionId,
    mut sender: SplitSink<WebSocket, Message>,
    mut events: UnboundedReceiver<ServerEvent>,
    ping_interval: Duration,
) {
    let mut ticker = tokio::time::interval(ping_interval);
    ticker.tick().await;

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                let json = match serde_json::to_string(&event) {
                    Ok(json) => json,
                    Err(e) => {
                        error!("Failed to serialize event for {}: {}", id, e);
                        continue;
                    }
                };
                if sender.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
            _ = ticker.tick() => {
                if sender.send(Message::Ping(Bytes::new())).await.is_err() {
                    break;
                }
            }
        }
    }
}
