//! HTTP client library for the Tradeline API.
//!
//! This crate provides a typed client for the Tradeline backend: the REST
//! endpoints for orders and support chat, plus the realtime chat gateway.
//!
//! # Example
//!
//! ```no_run
//! use tradeline_client::{ClientConfig, TradelineClient};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), tradeline_client::Error> {
//!     let client = TradelineClient::new(ClientConfig {
//!         base_url: "http://localhost:8080".into(),
//!         timeout: Duration::from_secs(30),
//!     })?
//!     .with_token("eyJ...");
//!
//!     let health = client.health_check().await?;
//!     println!("Status: {}", health.status);
//!
//!     let session = client.get_or_create_session().await?;
//!     println!("Session: {}", session.id);
//!
//!     Ok(())
//! }
//! ```

mod client;
mod error;
mod types;
mod websocket;

pub use client::{ClientConfig, TradelineClient};
pub use error::Error;
pub use types::*;
pub use websocket::{WsClient, WsCommand, WsEvent};
