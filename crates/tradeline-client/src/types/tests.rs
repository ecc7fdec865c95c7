//! Unit tests for types module.

use super::*;
use std::str::FromStr;

// ============================================================================
// Enum Tests
// ============================================================================

#[test]
fn test_order_status_wire_format() {
    assert_eq!(
        serde_json::to_string(&OrderStatus::Completed).unwrap(),
        "\"COMPLETED\""
    );
    let status: OrderStatus = serde_json::from_str("\"ACTIVE\"").unwrap();
    assert_eq!(status, OrderStatus::Active);
    assert_eq!(format!("{}", OrderStatus::Failed), "FAILED");
}

#[test]
fn test_chat_status_display_matches_wire() {
    for status in [ChatStatus::Open, ChatStatus::Closed, ChatStatus::Waiting] {
        let wire = serde_json::to_string(&status).unwrap();
        assert_eq!(wire, format!("\"{}\"", status));
    }
}

// ============================================================================
// Order Tests
// ============================================================================

#[test]
fn test_order_deserialization() {
    let json = r#"{
        "id": "6f1c7e5e-4d0b-4f7e-9d4c-0f3a1b2c3d4e",
        "userId": "0b6c1f3a-2a4e-4d57-9a1e-7c4b5d6e7f80",
        "symbol": "BTC/USD",
        "amount": "100",
        "currency": "USDT",
        "ror": "5",
        "entryPrice": "50000.25",
        "durationSeconds": 60,
        "status": "COMPLETED",
        "startDate": "2025-01-01T00:00:00Z",
        "endDate": "2025-01-01T00:01:00Z",
        "profit": "5",
        "isWon": true,
        "description": "Option order: BTC/USD - 5% ROR for 60s",
        "isActive": true,
        "createdAt": "2025-01-01T00:00:00Z",
        "updatedAt": "2025-01-01T00:01:00Z"
    }"#;

    let order: Order = serde_json::from_str(json).unwrap();
    assert_eq!(order.symbol, "BTC/USD");
    assert_eq!(order.amount, Decimal::from(100));
    assert_eq!(order.entry_price, Decimal::from_str("50000.25").unwrap());
    assert_eq!(order.status, OrderStatus::Completed);
    assert_eq!(order.profit, Some(Decimal::from(5)));
    assert_eq!(order.is_won, Some(true));
}

#[test]
fn test_open_order_request_serialization() {
    let request = OpenOrderRequest {
        symbol: "ETH/USD".to_string(),
        amount: Decimal::from(50),
        duration: 300,
        ror: Decimal::from_str("7.5").unwrap(),
        entry_price: Decimal::from(3000),
    };

    let json = serde_json::to_value(&request).unwrap();
    assert_eq!(json["symbol"], "ETH/USD");
    assert_eq!(json["duration"], 300);
    assert_eq!(json["ror"], "7.5");
    assert!(json.get("entryPrice").is_some());
}

// ============================================================================
// Chat Tests
// ============================================================================

#[test]
fn test_session_summary_flattened() {
    let json = r#"{
        "id": "6f1c7e5e-4d0b-4f7e-9d4c-0f3a1b2c3d4e",
        "userId": "0b6c1f3a-2a4e-4d57-9a1e-7c4b5d6e7f80",
        "adminId": null,
        "status": "OPEN",
        "lastMessageAt": "2025-01-01T00:00:00Z",
        "isActive": true,
        "createdAt": "2025-01-01T00:00:00Z",
        "lastMessage": null,
        "unreadCount": 3
    }"#;

    let summary: SessionSummary = serde_json::from_str(json).unwrap();
    assert_eq!(summary.session.status, ChatStatus::Open);
    assert!(summary.session.admin_id.is_none());
    assert!(summary.last_message.is_none());
    assert_eq!(summary.unread_count, 3);
}

#[test]
fn test_send_message_request_skips_absent_fields() {
    let session_id = Uuid::new_v4();
    let request = SendMessageRequest::text(session_id, "hello");

    let json = serde_json::to_value(&request).unwrap();
    assert_eq!(json["sessionId"], session_id.to_string());
    assert_eq!(json["message"], "hello");
    assert!(json.get("imageUrl").is_none());
    assert!(json.get("audioUrl").is_none());
}

#[test]
fn test_messages_query_encoding() {
    let query = MessagesQuery {
        page: Some(2),
        limit: None,
    };
    assert_eq!(serde_urlencoded::to_string(&query).unwrap(), "page=2");
    assert_eq!(
        serde_urlencoded::to_string(MessagesQuery::default()).unwrap(),
        ""
    );
}

#[test]
fn test_session_list_query_encoding() {
    let query = SessionListQuery {
        status: Some(ChatStatus::Closed),
    };
    assert_eq!(serde_urlencoded::to_string(&query).unwrap(), "status=CLOSED");
}

#[test]
fn test_messages_response_deserialization() {
    let json = r#"{
        "messages": [],
        "pagination": {"page": 1, "limit": 50, "total": 0, "totalPages": 0}
    }"#;

    let page: MessagesResponse = serde_json::from_str(json).unwrap();
    assert!(page.messages.is_empty());
    assert_eq!(page.pagination.limit, 50);
    assert_eq!(page.pagination.total_pages, 0);
}

#[test]
fn test_error_response_deserialization() {
    let body: ErrorResponse =
        serde_json::from_str(r#"{"error":"Order not found","code":"ORDER_NOT_FOUND"}"#).unwrap();
    assert_eq!(body.code, "ORDER_NOT_FOUND");
}
