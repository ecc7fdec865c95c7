//! HTTP client for the Tradeline API.

use crate::error::Error;
use crate::types::*;
use reqwest::{Client, RequestBuilder};
use std::time::Duration;
use uuid::Uuid;

#[cfg(test)]
mod tests;

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the API (e.g., "http://localhost:8080").
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// HTTP client for the Tradeline API.
///
/// Every `/api/v1` call carries the access token set with
/// [`TradelineClient::with_token`].
#[derive(Debug, Clone)]
pub struct TradelineClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl TradelineClient {
    /// Creates a new client with the given configuration.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Creates a new client with default configuration.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn with_base_url(base_url: &str) -> Result<Self, Error> {
        Self::new(ClientConfig {
            base_url: base_url.to_string(),
            ..Default::default()
        })
    }

    /// Returns a client that authenticates as the holder of `token`.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// The access token in use.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    // ========================================================================
    // Health
    // ========================================================================

    /// Performs a health check.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn health_check(&self) -> Result<HealthResponse, Error> {
        let url = format!("{}/health", self.base_url);
        let resp = self.client.get(&url).send().await?;
        self.handle_response(resp).await
    }

    // ========================================================================
    // Orders
    // ========================================================================

    /// Lists the caller's orders.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn list_orders(&self) -> Result<OrderListResponse, Error> {
        let resp = self.get("/orders").send().await?;
        self.handle_response(resp).await
    }

    /// Opens an option order.
    ///
    /// # Errors
    /// Returns error if the request fails or the order is rejected.
    pub async fn open_order(&self, request: &OpenOrderRequest) -> Result<Order, Error> {
        let resp = self.post("/orders/option").json(request).send().await?;
        self.handle_response(resp).await
    }

    /// Gets one of the caller's orders.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn get_order(&self, order_id: Uuid) -> Result<Order, Error> {
        let resp = self.get(&format!("/orders/{}", order_id)).send().await?;
        self.handle_response(resp).await
    }

    /// Settles one of the caller's orders.
    ///
    /// # Errors
    /// Returns error if the request fails or the order is not ACTIVE.
    pub async fn settle_order(&self, order_id: Uuid) -> Result<SettleOrderResponse, Error> {
        let resp = self
            .post(&format!("/orders/{}/complete", order_id))
            .send()
            .await?;
        self.handle_response(resp).await
    }

    // ========================================================================
    // Chat Sessions
    // ========================================================================

    /// Gets the caller's OPEN session, creating it if needed.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn get_or_create_session(&self) -> Result<ChatSession, Error> {
        let resp = self.get("/chat/session").send().await?;
        self.handle_response(resp).await
    }

    /// Lists the sessions visible to the caller.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn list_sessions(&self) -> Result<SessionListResponse, Error> {
        let resp = self.get("/chat/sessions").send().await?;
        self.handle_response(resp).await
    }

    /// Lists every session. Admin only.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn list_all_sessions(
        &self,
        query: Option<&SessionListQuery>,
    ) -> Result<SessionListResponse, Error> {
        let path = with_query("/chat/sessions/all", query);
        let resp = self.get(&path).send().await?;
        self.handle_response(resp).await
    }

    /// Unread messages waiting for the caller.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn unread_count(&self) -> Result<UnreadCountResponse, Error> {
        let resp = self.get("/chat/unread").send().await?;
        self.handle_response(resp).await
    }

    /// Assigns an admin to a session; the caller when `admin_id` is `None`.
    /// Admin only.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn assign_admin(
        &self,
        session_id: Uuid,
        admin_id: Option<Uuid>,
    ) -> Result<ChatSession, Error> {
        let resp = self
            .post(&format!("/chat/{}/assign", session_id))
            .json(&AssignAdminRequest { admin_id })
            .send()
            .await?;
        self.handle_response(resp).await
    }

    /// Closes a session.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn close_session(&self, session_id: Uuid) -> Result<ChatSession, Error> {
        let resp = self
            .post(&format!("/chat/{}/close", session_id))
            .send()
            .await?;
        self.handle_response(resp).await
    }

    // ========================================================================
    // Chat Messages
    // ========================================================================

    /// Sends a message.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn send_message(&self, request: &SendMessageRequest) -> Result<ChatMessage, Error> {
        let resp = self.post("/chat/message").json(request).send().await?;
        self.handle_response(resp).await
    }

    /// Gets a page of a session's messages.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn list_messages(
        &self,
        session_id: Uuid,
        query: Option<&MessagesQuery>,
    ) -> Result<MessagesResponse, Error> {
        let path = with_query(&format!("/chat/{}/messages", session_id), query);
        let resp = self.get(&path).send().await?;
        self.handle_response(resp).await
    }

    /// Marks the other side's messages in a session as read.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn mark_read(&self, session_id: Uuid) -> Result<MarkReadResponse, Error> {
        let resp = self
            .post(&format!("/chat/{}/read", session_id))
            .send()
            .await?;
        self.handle_response(resp).await
    }

    // ========================================================================
    // WebSocket
    // ========================================================================

    /// Returns the WebSocket URL for this client.
    #[must_use]
    pub fn ws_url(&self) -> String {
        let ws_base = self
            .base_url
            .replace("http://", "ws://")
            .replace("https://", "wss://");
        format!("{}/ws", ws_base)
    }

    /// Returns the WebSocket URL carrying this client's token as a query
    /// parameter.
    #[must_use]
    pub fn authenticated_ws_url(&self) -> String {
        match &self.token {
            Some(token) => format!("{}?token={}", self.ws_url(), token),
            None => self.ws_url(),
        }
    }

    // ========================================================================
    // Internal Helpers
    // ========================================================================

    fn api_url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.authorize(self.client.get(self.api_url(path)))
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.authorize(self.client.post(self.api_url(path)))
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let status = resp.status();

        if status.is_success() {
            return Ok(resp.json().await?);
        }

        let text = resp.text().await.unwrap_or_default();
        let (code, message) = match serde_json::from_str::<ErrorResponse>(&text) {
            Ok(body) => (body.code, body.error),
            Err(_) => (String::new(), text),
        };

        if status.as_u16() == 404 {
            Err(Error::NotFound { code, message })
        } else {
            Err(Error::Api {
                status: status.as_u16(),
                code,
                message,
            })
        }
    }
}

fn with_query<Q: serde::Serialize>(path: &str, query: Option<&Q>) -> String {
    let mut url = path.to_string();
    if let Some(q) = query {
        let params = serde_urlencoded::to_string(q).unwrap_or_default();
        if !params.is_empty() {
            url.push_str(&format!("?{}", params));
        }
    }
    url
}
