//! # Tradeline Backend - Option Orders and Support Chat
//!
//! Backend for a trading front end: customers open fixed-rate option orders
//! against their account balance and talk to support staff through a chat
//! that is available both over REST and over a realtime WebSocket gateway.
//! Built with [Axum](https://crates.io/crates/axum) for async HTTP handling and
//! [sqlx](https://crates.io/crates/sqlx) for PostgreSQL persistence.
//!
//! ## Key Features
//!
//! - **Order Settlement**: Orders are opened against the caller's balance and
//!   settled exactly once, crediting `amount * ror / 100`, even under
//!   concurrent settle requests.
//!
//! - **Support Chat**: One OPEN session per customer, paginated history,
//!   read receipts and per-side unread counts.
//!
//! - **Realtime Gateway**: Room-based fan-out of new messages, read receipts,
//!   typing indicators and new-chat notifications for admins.
//!
//! - **Pluggable Storage**: Every component talks to a [`db::Store`]; an
//!   in-memory store serves tests and local runs, PostgreSQL serves
//!   production.
//!
//! - **Structured Logging**: Request tracing with `tower-http` and `tracing`.
//!
//! ## Module Structure
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`api`] | Route handlers, auth middleware, router and socket endpoint |
//! | [`auth`] | Access token issuing and verification |
//! | [`chat`] | Chat sessions, messages, read state and access rules |
//! | [`config`] | TOML configuration with environment overrides |
//! | [`db`] | Store trait, schema types, memory and PostgreSQL stores |
//! | [`error`] | API error types with `IntoResponse` implementation |
//! | [`gateway`] | Realtime connections, rooms and the event protocol |
//! | [`models`] | Request/response DTOs |
//! | [`orders`] | Order opening and settlement |
//! | [`state`] | Application state management |
//!
//! ## API Endpoints
//!
//! ### Public
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | GET | `/health` | Health check |
//! | GET | `/ws` | WebSocket gateway (`?token=` or `Authorization`) |
//!
//! ### Orders
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | GET | `/api/v1/orders` | List the caller's orders |
//! | POST | `/api/v1/orders/option` | Open an order |
//! | GET | `/api/v1/orders/{order_id}` | Get an order |
//! | POST | `/api/v1/orders/{order_id}/complete` | Settle an order |
//!
//! ### Chat
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | GET | `/api/v1/chat/session` | Get or create the caller's OPEN session |
//! | GET | `/api/v1/chat/sessions` | Sessions visible to the caller |
//! | GET | `/api/v1/chat/sessions/all` | Every session (admin) |
//! | GET | `/api/v1/chat/unread` | Unread count for the caller |
//! | POST | `/api/v1/chat/message` | Send a message |
//! | GET | `/api/v1/chat/{session_id}/messages` | Paginated history |
//! | POST | `/api/v1/chat/{session_id}/read` | Mark the counterpart's messages read |
//! | POST | `/api/v1/chat/{session_id}/assign` | Assign an admin (admin) |
//! | POST | `/api/v1/chat/{session_id}/close` | Close a session |
//!
//! ## Realtime Protocol
//!
//! Frames are JSON text of the form `{"event": "...", "data": {...}}`.
//! Clients send `join-sessions`, `join-session`, `send-message`, `mark-read`
//! and `typing`; the server answers with `sessions-joined`,
//! `session-joined`, `user-joined`, `new-message`, `new-chat-request`,
//! `messages-read`, `user-typing` and `error`.
//!
//! ## Quick Start
//!
//! ```bash
//! # In-memory store
//! JWT_SECRET=dev-secret cargo run --bin tradeline-backend
//!
//! # PostgreSQL
//! DATABASE_URL=postgres://localhost/tradeline JWT_SECRET=dev-secret \
//!     cargo run --bin tradeline-backend
//! ```

pub mod api;
pub mod auth;
pub mod chat;
pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod models;
pub mod orders;
pub mod state;
