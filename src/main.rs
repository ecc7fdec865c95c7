//! Tradeline Backend Server
//!
//! REST and WebSocket server for option orders and the support chat.

use anyhow::{Context, bail};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tradeline_backend::api::create_router;
use tradeline_backend::config::Config;
use tradeline_backend::db::{DatabasePool, MemoryStore, PgStore, Store};
use tradeline_backend::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("failed to load configuration")?;
    if config.auth.jwt_secret.is_empty() {
        bail!("auth.jwt_secret is empty; set it in the config file or JWT_SECRET");
    }

    let (store, store_kind): (Arc<dyn Store>, &'static str) = match &config.database.url {
        Some(url) => {
            let db = DatabasePool::new(url, &config.database)
                .await
                .context("failed to connect to database")?;
            if config.database.run_migrations {
                db.run_migrations()
                    .await
                    .context("failed to run migrations")?;
                info!("Database migrations applied");
            }
            (Arc::new(PgStore::new(db)), "postgres")
        }
        None => {
            warn!("No database configured, using the in-memory store");
            (Arc::new(MemoryStore::new()), "memory")
        }
    };

    let host = config.server.host.clone();
    let port = config.server.port;
    let state = Arc::new(AppState::new(config, store, store_kind));

    info!(
        "Starting Tradeline Backend on {}:{} ({} store)",
        host, port, store_kind
    );

    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the router
    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start the server
    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
