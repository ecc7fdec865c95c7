//! Unit tests for client module.

use super::*;

// ============================================================================
// ClientConfig Tests
// ============================================================================

#[test]
fn test_client_config_default() {
    let config = ClientConfig::default();

    assert_eq!(config.base_url, "http://localhost:8080");
    assert_eq!(config.timeout, Duration::from_secs(30));
}

#[test]
fn test_client_config_custom() {
    let config = ClientConfig {
        base_url: "http://api.example.com:9000".to_string(),
        timeout: Duration::from_secs(60),
    };

    assert_eq!(config.base_url, "http://api.example.com:9000");
    assert_eq!(config.timeout, Duration::from_secs(60));
}

// ============================================================================
// TradelineClient Creation Tests
// ============================================================================

#[test]
fn test_client_new() {
    let client = TradelineClient::new(ClientConfig::default());

    assert!(client.is_ok());
}

#[test]
fn test_client_base_url_trimmed() {
    let client = TradelineClient::with_base_url("http://localhost:8080/").unwrap();

    assert_eq!(client.ws_url(), "ws://localhost:8080/ws");
    assert_eq!(client.api_url("/orders"), "http://localhost:8080/api/v1/orders");
}

#[test]
fn test_client_ws_url_https() {
    let client = TradelineClient::with_base_url("https://api.example.com").unwrap();

    assert_eq!(client.ws_url(), "wss://api.example.com/ws");
}

#[test]
fn test_client_token() {
    let client = TradelineClient::with_base_url("http://localhost:8080").unwrap();
    assert!(client.token().is_none());
    assert_eq!(client.authenticated_ws_url(), "ws://localhost:8080/ws");

    let client = client.with_token("abc");
    assert_eq!(client.token(), Some("abc"));
    assert_eq!(
        client.authenticated_ws_url(),
        "ws://localhost:8080/ws?token=abc"
    );
}

// ============================================================================
// URL Building Tests
// ============================================================================

#[test]
fn test_with_query_omits_empty() {
    assert_eq!(
        with_query("/chat/x/messages", Some(&MessagesQuery::default())),
        "/chat/x/messages"
    );
    assert_eq!(
        with_query::<MessagesQuery>("/chat/x/messages", None),
        "/chat/x/messages"
    );
}

#[test]
fn test_with_query_appends_params() {
    let query = MessagesQuery {
        page: Some(3),
        limit: Some(20),
    };
    assert_eq!(
        with_query("/chat/x/messages", Some(&query)),
        "/chat/x/messages?page=3&limit=20"
    );
}
