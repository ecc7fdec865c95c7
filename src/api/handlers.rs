//! API request handlers.

use crate::auth::AuthUser;
use crate::chat::{NewMessage, PageRequest};
use crate::db::{ChatMessage, ChatSession, Order};
use crate::error::ApiError;
use crate::models::{
    AssignAdminRequest, HealthResponse, MarkReadResponse, MessagesQuery, MessagesResponse,
    OpenOrderRequest, OrderListResponse, SendMessageRequest, SessionListQuery,
    SessionListResponse, SettleOrderResponse, UnreadCountResponse,
};
use crate::orders::OpenOrder;
use crate::state::AppState;
use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use std::sync::Arc;
use uuid::Uuid;

// ============================================================================
// Health
// ============================================================================

/// Health check endpoint.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        store: state.store_kind.to_string(),
        connections: state.gateway.connection_count(),
    })
}

// ============================================================================
// Orders
// ============================================================================

/// Opens an option order for the caller.
///
/// Extractor rejections are reported as `VALIDATION_ERROR` like any other
/// malformed input.
///
/// # Errors
/// Validation, unknown user or insufficient balance.
pub async fn open_order(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    request: Result<Json<OpenOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let Json(request) = request?;
    let order = state
        .orders
        .open(
            user.user_id,
            OpenOrder {
                symbol: request.symbol,
                amount: request.amount,
                duration_seconds: request.duration,
                ror: request.ror,
                entry_price: request.entry_price,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// Lists the caller's orders.
pub async fn list_orders(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<OrderListResponse>, ApiError> {
    let orders = state.orders.list_for(user.user_id).await?;
    Ok(Json(OrderListResponse {
        total: orders.len(),
        orders,
    }))
}

/// Returns one of the caller's orders.
pub async fn get_order(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    order_id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Order>, ApiError> {
    let Path(order_id) = order_id?;
    Ok(Json(state.orders.get(user.user_id, order_id).await?))
}

/// Settles one of the caller's ACTIVE orders.
///
/// # Errors
/// `ORDER_NOT_FOUND`, `FORBIDDEN`, or `INVALID_STATE` when already settled.
pub async fn settle_order(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    order_id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<SettleOrderResponse>, ApiError> {
    let Path(order_id) = order_id?;
    let settlement = state.orders.settle(user.user_id, order_id).await?;
    Ok(Json(SettleOrderResponse {
        order: settlement.order,
        new_balance: settlement.new_balance,
    }))
}

// ============================================================================
// Chat sessions
// ============================================================================

/// Returns the caller's OPEN session, creating it if needed.
pub async fn get_or_create_session(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<ChatSession>, ApiError> {
    Ok(Json(
        state.chat.get_or_create_open_session(user.user_id).await?,
    ))
}

/// Lists sessions visible to the caller.
pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<SessionListResponse>, ApiError> {
    let sessions = state.chat.list_sessions_for(&user, None).await?;
    Ok(Json(SessionListResponse { sessions }))
}

/// Lists every session, optionally filtered by status. Admin only.
pub async fn list_all_sessions(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    query: Result<Query<SessionListQuery>, QueryRejection>,
) -> Result<Json<SessionListResponse>, ApiError> {
    let Query(query) = query?;
    let sessions = state.chat.list_sessions_for(&user, query.status).await?;
    Ok(Json(SessionListResponse { sessions }))
}

/// Unread messages waiting for the caller.
pub async fn unread_count(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<UnreadCountResponse>, ApiError> {
    let count = state.chat.unread_count(&user).await?;
    Ok(Json(UnreadCountResponse { count }))
}

/// Assigns an admin (the caller by default) to a session. Admin only.
pub async fn assign_admin(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    session_id: Result<Path<Uuid>, PathRejection>,
    request: Result<Option<Json<AssignAdminRequest>>, JsonRejection>,
) -> Result<Json<ChatSession>, ApiError> {
    let Path(session_id) = session_id?;
    let admin_id = request?
        .and_then(|Json(r)| r.admin_id)
        .unwrap_or(user.user_id);
    Ok(Json(state.chat.assign_admin(session_id, admin_id).await?))
}

/// Closes a session the caller can access.
pub async fn close_session(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    session_id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ChatSession>, ApiError> {
    let Path(session_id) = session_id?;
    Ok(Json(state.chat.close(session_id, &user).await?))
}

// ============================================================================
// Chat messages
// ============================================================================

/// Returns a page of a session's messages, oldest first.
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    session_id: Result<Path<Uuid>, PathRejection>,
    query: Result<Query<MessagesQuery>, QueryRejection>,
) -> Result<Json<MessagesResponse>, ApiError> {
    let Path(session_id) = session_id?;
    let Query(query) = query?;
    let page = state
        .chat
        .list_messages(
            session_id,
            &user,
            PageRequest {
                page: query.page,
                limit: query.limit,
            },
        )
        .await?;
    Ok(Json(page))
}

/// Posts a message and relays it to the session's realtime room.
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    request: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ChatMessage>), ApiError> {
    let Json(request) = request?;
    let posted = state
        .chat
        .append(
            request.session_id,
            &user,
            NewMessage {
                body: request.message,
                image_url: request.image_url,
                audio_url: request.audio_url,
            },
        )
        .await?;
    state.gateway.publish_message(&posted);
    Ok((StatusCode::CREATED, Json(posted.message)))
}

/// Marks the session read for the caller and tells the other members.
pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    session_id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<MarkReadResponse>, ApiError> {
    let Path(session_id) = session_id?;
    let marked = state.chat.mark_read(session_id, &user).await?;
    if marked.is_some() {
        state.gateway.publish_read(session_id, user.user_id, None);
    }
    Ok(Json(MarkReadResponse {
        marked: marked.unwrap_or(0),
    }))
}
