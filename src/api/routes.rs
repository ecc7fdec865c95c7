//! Route configuration.

use crate::api::middleware::{require_admin, require_auth};
use crate::api::{handlers, websocket};
use crate::state::AppState;
use axum::Router;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use std::sync::Arc;

/// Creates the API router.
///
/// `/health` and `/ws` are public at the router level; the socket endpoint
/// authenticates its own handshake. Everything under `/api/v1` requires a
/// bearer token.
pub fn create_router(state: Arc<AppState>) -> Router {
    let admin = Router::new()
        .route("/chat/sessions/all", get(handlers::list_all_sessions))
        .route("/chat/{session_id}/assign", post(handlers::assign_admin))
        .route_layer(from_fn(require_admin));

    let api = Router::new()
        // Orders
        .route("/orders", get(handlers::list_orders))
        .route("/orders/option", post(handlers::open_order))
        .route("/orders/{order_id}", get(handlers::get_order))
        .route("/orders/{order_id}/complete", post(handlers::settle_order))
        // Chat
        .route("/chat/session", get(handlers::get_or_create_session))
        .route("/chat/sessions", get(handlers::list_sessions))
        .route("/chat/unread", get(handlers::unread_count))
        .route("/chat/message", post(handlers::send_message))
        .route("/chat/{session_id}/messages", get(handlers::list_messages))
        .route("/chat/{session_id}/read", post(handlers::mark_read))
        .route("/chat/{session_id}/close", post(handlers::close_session))
        .merge(admin)
        .route_layer(from_fn_with_state(Arc::clone(&state), require_auth));

    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // WebSocket
        .route("/ws", get(websocket::ws_handler))
        .nest("/api/v1", api)
        .with_state(state)
}
