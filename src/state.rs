//! Application state management.

use crate::auth::AuthVerifier;
use crate::chat::ChatRegistry;
use crate::config::Config;
use crate::db::{MemoryStore, Store};
use crate::gateway::Gateway;
use crate::orders::OrderEngine;
use std::sync::Arc;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Persistent store.
    pub store: Arc<dyn Store>,
    /// Access token verifier.
    pub auth: AuthVerifier,
    /// Order settlement engine.
    pub orders: OrderEngine,
    /// Chat session registry.
    pub chat: ChatRegistry,
    /// Realtime gateway shared by the socket endpoint and REST handlers.
    pub gateway: Arc<Gateway>,
    /// Application configuration.
    pub config: Config,
    /// Storage backend label reported by `/health`.
    pub store_kind: &'static str,
}

impl AppState {
    /// Wires every component over `store`.
    #[must_use]
    pub fn new(config: Config, store: Arc<dyn Store>, store_kind: &'static str) -> Self {
        let auth = AuthVerifier::new(
            Arc::clone(&store),
            &config.auth.jwt_secret,
            config.auth.access_token_ttl_secs,
        );
        let orders = OrderEngine::new(Arc::clone(&store));
        let chat = ChatRegistry::new(Arc::clone(&store), config.chat.clone());
        let gateway = Arc::new(Gateway::new(chat.clone()));

        Self {
            store,
            auth,
            orders,
            chat,
            gateway,
            config,
            store_kind,
        }
    }

    /// Creates state over a fresh in-memory store.
    #[must_use]
    pub fn in_memory(config: Config) -> Self {
        Self::new(config, Arc::new(MemoryStore::new()), "memory")
    }
}
