//! Creates or promotes an admin account and prints an access token for it.
//!
//! ```bash
//! DATABASE_URL=postgres://localhost/tradeline JWT_SECRET=dev-secret \
//!     cargo run --bin create-admin -- support@example.com
//! ```

use anyhow::{Context, bail};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tradeline_backend::auth::AuthVerifier;
use tradeline_backend::config::Config;
use tradeline_backend::db::{DatabasePool, PgStore, Role};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let Some(email) = std::env::args().nth(1) else {
        bail!("usage: create-admin <email>");
    };

    let config = Config::from_env().context("failed to load configuration")?;
    if config.auth.jwt_secret.is_empty() {
        bail!("auth.jwt_secret is empty; set it in the config file or JWT_SECRET");
    }
    let Some(url) = config.database.url.as_deref() else {
        bail!("no database configured; set database.url or DATABASE_URL");
    };

    let db = DatabasePool::new(url, &config.database)
        .await
        .context("failed to connect to database")?;
    if config.database.run_migrations {
        db.run_migrations()
            .await
            .context("failed to run migrations")?;
    }

    let admin_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO users (id, email, role, is_active)
        VALUES ($1, $2, $3, TRUE)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role, is_active = TRUE
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&email)
    .bind(Role::Admin.as_str())
    .fetch_one(db.pool())
    .await
    .context("failed to upsert admin")?;

    info!("Admin {} ready with id {}", email, admin_id);

    let verifier = AuthVerifier::new(
        Arc::new(PgStore::new(db)),
        &config.auth.jwt_secret,
        config.auth.access_token_ttl_secs,
    );
    let token = verifier.issue_access_token(admin_id)?;

    println!("id:    {admin_id}");
    println!("token: {token}");
    Ok(())
}
