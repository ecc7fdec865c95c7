//! Request and response models for the REST API.

use crate::chat::{MessagePage, SessionSummary};
use crate::db::{ChatStatus, Order};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Health
// ============================================================================

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service version.
    pub version: String,
    /// Active storage backend, `memory` or `postgres`.
    pub store: String,
    /// Open realtime connections.
    pub connections: usize,
}

// ============================================================================
// Orders
// ============================================================================

/// Request to open an option order.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenOrderRequest {
    /// Instrument symbol.
    pub symbol: String,
    /// Stake.
    pub amount: Decimal,
    /// Term in seconds.
    pub duration: i64,
    /// Rate of return in percent.
    pub ror: Decimal,
    /// Instrument price at open.
    pub entry_price: Decimal,
}

/// Result of settling an order.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleOrderResponse {
    /// The completed order.
    pub order: Order,
    /// Owner balance after the credit.
    pub new_balance: Decimal,
}

/// The caller's orders.
#[derive(Debug, Serialize)]
pub struct OrderListResponse {
    /// Orders, newest first.
    pub orders: Vec<Order>,
    /// Number of orders.
    pub total: usize,
}

// ============================================================================
// Chat
// ============================================================================

/// Query parameters for the admin session listing.
#[derive(Debug, Default, Deserialize)]
pub struct SessionListQuery {
    /// Only sessions in this status.
    pub status: Option<ChatStatus>,
}

/// Session listing.
#[derive(Debug, Serialize)]
pub struct SessionListResponse {
    /// Sessions, most recently active first.
    pub sessions: Vec<SessionSummary>,
}

/// Query parameters for message paging.
#[derive(Debug, Default, Deserialize)]
pub struct MessagesQuery {
    /// 1-based page number.
    pub page: Option<u32>,
    /// Page size.
    pub limit: Option<u32>,
}

/// A page of messages.
pub type MessagesResponse = MessagePage;

/// Request to post a chat message.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    /// Target session.
    pub session_id: Uuid,
    /// Text body.
    #[serde(default)]
    pub message: Option<String>,
    /// Image attachment URL.
    #[serde(default)]
    pub image_url: Option<String>,
    /// Audio attachment URL.
    #[serde(default)]
    pub audio_url: Option<String>,
}

/// Result of marking a session read.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadResponse {
    /// Messages newly marked read.
    pub marked: u64,
}

/// Request to assign an admin to a session.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignAdminRequest {
    /// Admin to assign; the caller when omitted.
    #[serde(default)]
    pub admin_id: Option<Uuid>,
}

/// Unread message count.
#[derive(Debug, Serialize)]
pub struct UnreadCountResponse {
    /// Unread messages waiting for the caller.
    pub count: u64,
}
