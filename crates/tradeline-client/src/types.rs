//! Request and response types for the Tradeline API.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(test)]
mod tests;

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Opened, awaiting settlement.
    Active,
    /// Settled and credited.
    Completed,
    /// Cancelled before settlement.
    Cancelled,
    /// Failed before settlement.
    Failed,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "ACTIVE"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Cancelled => write!(f, "CANCELLED"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

/// Chat session status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChatStatus {
    /// Accepting messages.
    Open,
    /// Closed.
    Closed,
    /// Reserved.
    Waiting,
}

impl std::fmt::Display for ChatStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "OPEN"),
            Self::Closed => write!(f, "CLOSED"),
            Self::Waiting => write!(f, "WAITING"),
        }
    }
}

/// Which side of the conversation authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SenderType {
    /// Customer-authored.
    User,
    /// Admin-authored.
    Admin,
}

// ============================================================================
// Health
// ============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service version.
    pub version: String,
    /// Storage backend.
    pub store: String,
    /// Open realtime connections.
    pub connections: usize,
}

/// Error body returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message.
    pub error: String,
    /// Error code.
    pub code: String,
}

// ============================================================================
// Orders
// ============================================================================

/// Option order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Order identifier.
    pub id: Uuid,
    /// Owner.
    pub user_id: Uuid,
    /// Instrument symbol.
    pub symbol: String,
    /// Stake.
    pub amount: Decimal,
    /// Settlement currency.
    pub currency: String,
    /// Rate of return in percent.
    pub ror: Decimal,
    /// Instrument price at open.
    pub entry_price: Decimal,
    /// Term in seconds.
    pub duration_seconds: i64,
    /// Lifecycle status.
    pub status: OrderStatus,
    /// Opening time.
    pub start_date: DateTime<Utc>,
    /// Maturity time.
    pub end_date: DateTime<Utc>,
    /// Credited profit, once settled.
    pub profit: Option<Decimal>,
    /// Outcome, once settled.
    pub is_won: Option<bool>,
    /// Human-readable summary.
    pub description: String,
    /// Soft-delete flag.
    pub is_active: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

/// Request to open an option order.
#[derive(Debug, Clone, Serialize, Deserialize)]
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
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleOrderResponse {
    /// The completed order.
    pub order: Order,
    /// Owner balance after the credit.
    pub new_balance: Decimal,
}

/// The caller's orders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderListResponse {
    /// Orders, newest first.
    pub orders: Vec<Order>,
    /// Number of orders.
    pub total: usize,
}

// ============================================================================
// Chat
// ============================================================================

/// Chat session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    /// Session identifier.
    pub id: Uuid,
    /// Customer who owns the session.
    pub user_id: Uuid,
    /// Assigned admin.
    pub admin_id: Option<Uuid>,
    /// Session status.
    pub status: ChatStatus,
    /// Time of the latest message.
    pub last_message_at: DateTime<Utc>,
    /// Soft-delete flag.
    pub is_active: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Message identifier.
    pub id: Uuid,
    /// Session.
    pub session_id: Uuid,
    /// Author.
    pub user_id: Uuid,
    /// Author's side.
    pub sender_type: SenderType,
    /// Text body, possibly empty for attachment-only messages.
    pub message: String,
    /// Image attachment URL.
    pub image_url: Option<String>,
    /// Audio attachment URL.
    pub audio_url: Option<String>,
    /// Read by the other side.
    pub is_read: bool,
    /// Time it was read.
    pub read_at: Option<DateTime<Utc>>,
    /// Soft-delete flag.
    pub is_active: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// A session with its latest message and the viewer's unread count.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    /// The session.
    #[serde(flatten)]
    pub session: ChatSession,
    /// Latest message.
    pub last_message: Option<ChatMessage>,
    /// Unread messages from the other side.
    pub unread_count: u64,
}

/// Session listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionListResponse {
    /// Sessions, most recently active first.
    pub sessions: Vec<SessionSummary>,
}

/// Query for the admin session listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionListQuery {
    /// Only sessions in this status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ChatStatus>,
}

/// Query for message paging.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessagesQuery {
    /// 1-based page number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// Page size.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// Pagination metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// 1-based page number.
    pub page: u32,
    /// Page size.
    pub limit: u32,
    /// Total messages in the session.
    pub total: u64,
    /// Number of pages.
    pub total_pages: u64,
}

/// One page of messages, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesResponse {
    /// Messages.
    pub messages: Vec<ChatMessage>,
    /// Pagination metadata.
    pub pagination: Pagination,
}

/// Request to post a chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    /// Target session.
    pub session_id: Uuid,
    /// Text body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Image attachment URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Audio attachment URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
}

impl SendMessageRequest {
    /// A text-only message.
    #[must_use]
    pub fn text(session_id: Uuid, message: impl Into<String>) -> Self {
        Self {
            session_id,
            message: Some(message.into()),
            image_url: None,
            audio_url: None,
        }
    }
}

/// Result of marking a session read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkReadResponse {
    /// Messages newly marked read.
    pub marked: u64,
}

/// Request to assign an admin to a session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignAdminRequest {
    /// Admin to assign; the caller when omitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_id: Option<Uuid>,
}

/// Unread message count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnreadCountResponse {
    /// Unread messages waiting for the caller.
    pub count: u64,
}
