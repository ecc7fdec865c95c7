//! Unit tests for error module.

use super::*;

#[test]
fn test_api_error_display() {
    let error = Error::Api {
        status: 400,
        code: "INVALID_REQUEST".to_string(),
        message: "Bad request".to_string(),
    };

    let display = format!("{}", error);
    assert!(display.contains("400"));
    assert!(display.contains("INVALID_REQUEST"));
    assert!(display.contains("Bad request"));
}

#[test]
fn test_not_found_error_display() {
    let error = Error::NotFound {
        code: "ORDER_NOT_FOUND".to_string(),
        message: "Order not found".to_string(),
    };

    let display = format!("{}", error);
    assert!(display.contains("Not found"));
    assert!(display.contains("Order not found"));
}

#[test]
fn test_connection_closed_error_display() {
    let error = Error::ConnectionClosed;

    let display = format!("{}", error);
    assert!(display.contains("Connection closed"));
}

#[test]
fn test_code_and_status_accessors() {
    let api = Error::Api {
        status: 409,
        code: "CONFLICT".to_string(),
        message: "taken".to_string(),
    };
    assert_eq!(api.code(), Some("CONFLICT"));
    assert_eq!(api.status(), Some(409));

    let not_found = Error::NotFound {
        code: "SESSION_NOT_FOUND".to_string(),
        message: "Session not found".to_string(),
    };
    assert_eq!(not_found.code(), Some("SESSION_NOT_FOUND"));
    assert_eq!(not_found.status(), Some(404));

    assert_eq!(Error::ConnectionClosed.code(), None);
    assert_eq!(Error::ConnectionClosed.status(), None);
}

#[test]
fn test_empty_code_is_none() {
    let error = Error::Api {
        status: 502,
        code: String::new(),
        message: "bad gateway".to_string(),
    };
    assert_eq!(error.code(), None);
}
