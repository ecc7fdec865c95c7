//! Health check and authentication gate tests.

use tradeline_tests::TestServer;

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::spawn().await;
    let client = server.anonymous_client();

    let health = client.health_check().await.expect("Health check failed");

    assert_eq!(health.status, "healthy");
    assert_eq!(health.store, "memory");
    assert_eq!(health.connections, 0);
    assert!(!health.version.is_empty());
}

#[tokio::test]
async fn test_api_requires_token() {
    let server = TestServer::spawn().await;
    let client = server.anonymous_client();

    let err = client.list_orders().await.unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert_eq!(err.code(), Some("UNAUTHORIZED"));
}

#[tokio::test]
async fn test_api_rejects_forged_token() {
    let server = TestServer::spawn().await;
    let client = server.anonymous_client().with_token("not-a-jwt");

    let err = client.get_or_create_session().await.unwrap_err();
    assert_eq!(err.status(), Some(401));
}

#[tokio::test]
async fn test_deactivated_user_is_rejected() {
    let server = TestServer::spawn().await;
    let customer = server.customer(rust_decimal::Decimal::ZERO).await;

    assert!(customer.client.list_orders().await.is_ok());
    assert!(server.store.deactivate_user(customer.id()));

    let err = customer.client.list_orders().await.unwrap_err();
    assert_eq!(err.status(), Some(401));
}
