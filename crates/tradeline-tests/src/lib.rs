//! Integration tests for the Tradeline API.
//!
//! Each test spawns the full router on an ephemeral local port over a fresh
//! in-memory store, seeds the users it needs and talks to it through
//! `tradeline-client`.

use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tradeline_backend::api::create_router;
use tradeline_backend::config::Config;
use tradeline_backend::db::{MemoryStore, Role, Store, User};
use tradeline_backend::state::AppState;
use tradeline_client::{ClientConfig, TradelineClient, WsClient, WsEvent};
use uuid::Uuid;

/// Signing secret used by every test server.
pub const TEST_JWT_SECRET: &str = "integration-test-secret";

/// How long a test waits for a realtime event.
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// A running server plus handles on its state.
pub struct TestServer {
    /// `http://127.0.0.1:<port>`.
    pub base_url: String,
    /// Shared application state of the running server.
    pub state: Arc<AppState>,
    /// The server's store, for seeding and inspection.
    pub store: Arc<MemoryStore>,
}

/// A seeded user with a client authenticated as them.
pub struct TestUser {
    /// The stored user.
    pub user: User,
    /// Client carrying the user's access token.
    pub client: TradelineClient,
}

impl TestUser {
    /// User id.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.user.id
    }

    /// Opens an authenticated realtime connection.
    ///
    /// # Panics
    /// Panics if the connection fails.
    pub async fn connect_ws(&self) -> WsClient {
        WsClient::connect(&self.client.authenticated_ws_url())
            .await
            .expect("Failed to connect to WebSocket")
    }
}

impl TestServer {
    /// Starts a server on an ephemeral port.
    ///
    /// # Panics
    /// Panics if the listener cannot be bound.
    pub async fn spawn() -> Self {
        let mut config = Config::default();
        config.auth.jwt_secret = TEST_JWT_SECRET.to_string();

        let store = Arc::new(MemoryStore::new());
        let state = Arc::new(AppState::new(config, store.clone(), "memory"));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Listener has no address");

        let app = create_router(Arc::clone(&state));
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
            store,
        }
    }

    /// A client without credentials.
    ///
    /// # Panics
    /// Panics if the client cannot be built.
    #[must_use]
    pub fn anonymous_client(&self) -> TradelineClient {
        TradelineClient::new(ClientConfig {
            base_url: self.base_url.clone(),
            timeout: Duration::from_secs(10),
        })
        .expect("Failed to create client")
    }

    /// Seeds a user and returns a client authenticated as them.
    ///
    /// # Panics
    /// Panics if the user cannot be stored or the token cannot be issued.
    pub async fn seed_user(&self, role: Role, balance: Decimal) -> TestUser {
        let user = User::new(format!("{}@example.com", Uuid::new_v4()), role, balance);
        self.store
            .insert_user(&user)
            .await
            .expect("Failed to seed user");
        let token = self
            .state
            .auth
            .issue_access_token(user.id)
            .expect("Failed to issue token");
        let client = self.anonymous_client().with_token(token);
        TestUser { user, client }
    }

    /// Seeds a customer with `balance`.
    pub async fn customer(&self, balance: Decimal) -> TestUser {
        self.seed_user(Role::Customer, balance).await
    }

    /// Seeds an admin.
    pub async fn admin(&self) -> TestUser {
        self.seed_user(Role::Admin, Decimal::ZERO).await
    }
}

/// Waits for the next event, panicking on timeout or a closed socket.
///
/// # Panics
/// Panics if no event arrives within [`EVENT_TIMEOUT`].
pub async fn next_event(ws: &mut WsClient) -> WsEvent {
    match tokio::time::timeout(EVENT_TIMEOUT, ws.recv()).await {
        Ok(Some(event)) => event,
        Ok(None) => panic!("WebSocket closed unexpectedly"),
        Err(_) => panic!("Timeout waiting for WebSocket event"),
    }
}

/// Asserts that no event arrives within `wait`.
///
/// # Panics
/// Panics if an event arrives.
pub async fn expect_silence(ws: &mut WsClient, wait: Duration) {
    if let Ok(Some(event)) = tokio::time::timeout(wait, ws.recv()).await {
        panic!("Unexpected WebSocket event: {:?}", event);
    }
}
