//! # Application State
//!
//! Shared state for the Axum application: the lifecycle engine, the
//! optional database pool, and configuration.
//!
//! The engine's in-memory store is the arbitration point: every mutation
//! commits there first, under the project's lock. When a database is
//! configured, handlers then write the committed aggregate through with
//! [`AppState::persist`]. On startup [`AppState::hydrate_from_db`] loads
//! every stored aggregate back into the engine.

use std::sync::Arc;

use sqlx::PgPool;

use cofund_core::ProjectId;
use cofund_engine::{AggregateStore, Engine};

use crate::error::AppError;

// -- Configuration ------------------------------------------------------------

/// Application configuration.
///
/// Custom `Debug` redacts the `auth_token` and the database URL.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Shared bearer secret. `None` disables the secret check.
    pub auth_token: Option<String>,
    /// `None` means in-memory only.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
}

impl AppConfig {
    /// Build configuration from `PORT`, `AUTH_TOKEN`, `DATABASE_URL` and
    /// `DATABASE_MAX_CONNECTIONS`. Unparseable numbers fall back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            auth_token: non_empty("AUTH_TOKEN"),
            database_url: non_empty("DATABASE_URL"),
            database_max_connections: lookup("DATABASE_MAX_CONNECTIONS")
                .and_then(|n| n.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.database_max_connections),
        }
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field(
                "auth_token",
                &self.auth_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field("database_max_connections", &self.database_max_connections)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_token: None,
            database_url: None,
            database_max_connections: 10,
        }
    }
}

// -- Application State --------------------------------------------------------

/// Shared application state. Clone-friendly via `Arc`.
#[derive(Debug, Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    /// PostgreSQL pool for write-through persistence. `None` in
    /// in-memory-only mode.
    pub db_pool: Option<PgPool>,
    pub config: AppConfig,
}

impl AppState {
    /// In-memory state on the system clock.
    pub fn new(config: AppConfig) -> Self {
        Self::with_engine(Engine::in_memory(), config)
    }

    /// State around a pre-built engine (tests drive a manual clock this way).
    pub fn with_engine(engine: Engine, config: AppConfig) -> Self {
        Self {
            engine: Arc::new(engine),
            db_pool: None,
            config,
        }
    }

    /// Attach a database pool.
    pub fn with_db(mut self, pool: Option<PgPool>) -> Self {
        self.db_pool = pool;
        self
    }

    /// Write the committed state of one project through to the database.
    ///
    /// A project that no longer exists in memory is deleted. No-op without
    /// a pool. The in-memory commit has already happened, so a failure here
    /// is reported as an internal error and logged.
    pub async fn persist(&self, project_id: ProjectId) -> Result<(), AppError> {
        let Some(pool) = &self.db_pool else {
            return Ok(());
        };
        let result = match self.engine.store().load(project_id) {
            Some(aggregate) => crate::db::projects::upsert(pool, &aggregate).await.map(|_| ()),
            None => crate::db::projects::delete(pool, project_id).await.map(|_| ()),
        };
        result.map_err(|e| {
            tracing::error!(project = %project_id, error = %e, "failed to persist project");
            AppError::Internal(
                "project change recorded in-memory but database persist failed".into(),
            )
        })
    }

    /// Load every stored project into the engine. No-op without a pool.
    pub async fn hydrate_from_db(&self) -> Result<(), String> {
        let pool = match &self.db_pool {
            Some(pool) => pool,
            None => return Ok(()),
        };

        let aggregates = crate::db::projects::load_all(pool)
            .await
            .map_err(|e| format!("failed to load projects: {e}"))?;
        let count = aggregates.len();
        for aggregate in aggregates {
            let id = aggregate.project.id;
            self.engine
                .store()
                .insert(aggregate)
                .map_err(|e| format!("failed to hydrate {id}: {e}"))?;
        }

        tracing::info!(projects = count, "Hydrated in-memory store from database");
        Ok(())
    }
}
