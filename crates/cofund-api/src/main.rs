//! # cofund-api — Binary Entry Point
//!
//! Reads configuration from the environment, connects the optional
//! database, hydrates the engine, and serves the API.
//! `LOG_FORMAT=json` switches log output to JSON lines.

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use cofund_api::state::{AppConfig, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::from_env();
    tracing::info!(?config, "configuration loaded");
    if config.auth_token.is_none() {
        tracing::warn!("AUTH_TOKEN not set, bearer secrets are not checked");
    }

    // Initialize database pool (optional: absent means in-memory only).
    let db_pool = cofund_api::db::init_pool(&config)
        .await
        .context("database initialization failed")?;

    let port = config.port;
    let state = AppState::new(config).with_db(db_pool);

    // Hydrate the engine from the database (if connected).
    state
        .hydrate_from_db()
        .await
        .map_err(anyhow::Error::msg)
        .context("database hydration failed")?;

    let app = cofund_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("cofund API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Install the global subscriber. `RUST_LOG` overrides the default `info`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
