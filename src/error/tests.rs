//! Unit tests for error module.

use super::*;
use rust_decimal_macros::dec;

// ============================================================================
// ErrorResponse Tests
// ============================================================================

#[test]
fn test_error_response_serialization() {
    let response = ErrorResponse {
        error: "Something went wrong".to_string(),
        code: "INTERNAL_ERROR".to_string(),
    };

    let json = serde_json::to_string(&response).unwrap();
    assert!(json.contains("\"error\":\"Something went wrong\""));
    assert!(json.contains("\"code\":\"INTERNAL_ERROR\""));
}

// ============================================================================
// ApiError Display Tests
// ============================================================================

#[test]
fn test_api_error_invalid_request_display() {
    let error = ApiError::InvalidRequest("Missing required field".to_string());
    assert_eq!(
        format!("{}", error),
        "Invalid request: Missing required field"
    );
}

#[test]
fn test_api_error_insufficient_balance_display() {
    let error = ApiError::InsufficientBalance {
        available: dec!(10),
        required: dec!(50),
    };
    assert_eq!(
        format!("{}", error),
        "Insufficient balance: available 10, required 50"
    );
}

#[test]
fn test_api_error_session_not_found_display() {
    let error = ApiError::session_not_found();
    assert_eq!(format!("{}", error), "Not found: Chat session not found");
}

#[test]
fn test_api_error_order_not_found_display() {
    let error = ApiError::OrderNotFound("abc".to_string());
    assert_eq!(format!("{}", error), "Order not found: abc");
}

// ============================================================================
// ApiError Classification Tests
// ============================================================================

#[test]
fn test_api_error_codes_are_distinct() {
    let errors = [
        ApiError::InvalidRequest(String::new()),
        ApiError::Unauthorized(String::new()),
        ApiError::Forbidden(String::new()),
        ApiError::NotFound(String::new()),
        ApiError::UserNotFound(String::new()),
        ApiError::OrderNotFound(String::new()),
        ApiError::InsufficientBalance {
            available: Decimal::ZERO,
            required: Decimal::ONE,
        },
        ApiError::InvalidState(String::new()),
        ApiError::Conflict(String::new()),
        ApiError::Transient(String::new()),
        ApiError::Internal(String::new()),
    ];

    let mut codes: Vec<&str> = errors.iter().map(ApiError::code).collect();
    codes.sort_unstable();
    codes.dedup();
    assert_eq!(codes.len(), errors.len());
}

#[test]
fn test_only_transient_is_retryable() {
    assert!(ApiError::Transient("pool timed out".to_string()).is_retryable());
    assert!(!ApiError::InvalidState("settled".to_string()).is_retryable());
    assert!(!ApiError::Internal("boom".to_string()).is_retryable());
}

// ============================================================================
// ApiError IntoResponse Tests
// ============================================================================

#[test]
fn test_api_error_invalid_request_into_response() {
    let response = ApiError::InvalidRequest("Bad input".to_string()).into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[test]
fn test_api_error_unauthorized_into_response() {
    let response = ApiError::Unauthorized("No token provided".to_string()).into_response();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[test]
fn test_api_error_forbidden_into_response() {
    let response = ApiError::Forbidden("Admin only".to_string()).into_response();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[test]
fn test_api_error_not_found_into_response() {
    let response = ApiError::session_not_found().into_response();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[test]
fn test_api_error_invalid_state_into_response() {
    let response = ApiError::InvalidState("Order already settled".to_string()).into_response();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[test]
fn test_api_error_transient_into_response() {
    let response = ApiError::Transient("pool timed out".to_string()).into_response();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[test]
fn test_api_error_internal_into_response() {
    let response = ApiError::Internal("Server error".to_string()).into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

// ============================================================================
// StoreError Mapping Tests
// ============================================================================

#[test]
fn test_store_error_conflict_maps_to_conflict() {
    let error: ApiError = StoreError::Conflict("duplicate key".to_string()).into();
    assert_eq!(error.code(), "CONFLICT");
}

#[test]
fn test_store_error_unavailable_maps_to_transient() {
    let error: ApiError = StoreError::Unavailable("pool timed out".to_string()).into();
    assert!(error.is_retryable());
}

#[test]
fn test_store_error_decode_maps_to_internal() {
    let error: ApiError = StoreError::Decode("bad status".to_string()).into();
    assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
