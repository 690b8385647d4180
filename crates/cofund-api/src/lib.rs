//! # cofund-api — HTTP Service for the Lifecycle Engine
//!
//! Exposes the `cofund-engine` operations over Axum. Handlers translate
//! JSON to engine calls, map [`EngineError`](cofund_engine::EngineError)
//! to HTTP statuses, and write committed projects through to PostgreSQL
//! when a database is configured.
//!
//! ## API Surface
//!
//! | Prefix                          | Module                     |
//! |---------------------------------|----------------------------|
//! | `/v1/projects/*`                | [`routes::projects`]       |
//! | `/v1/stages/*`                  | [`routes::stages`]         |
//! | `/v1/requests/*`, `/v1/offers/*`| [`routes::offers`]         |
//! | `/v1/projects/:id/observations`, `/v1/observations/*` | [`routes::observations`] |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → AuthMiddleware → Handler
//! ```
//!
//! ## OpenAPI
//!
//! Generated via utoipa derive macros, served at `/openapi.json`.

pub mod auth;
pub mod db;
pub mod error;
pub mod extractors;
pub mod openapi;
pub mod routes;
pub mod state;
pub mod views;

use axum::middleware::from_fn;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;
use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
///
/// Health probes (`/health/*`) are mounted outside the auth middleware
/// so they remain accessible without credentials.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };

    // Authenticated API routes.
    let api = Router::new()
        .merge(routes::projects::router())
        .merge(routes::stages::router())
        .merge(routes::offers::router())
        .merge(routes::observations::router())
        .merge(openapi::router())
        .layer(from_fn(auth::auth_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(axum::Extension(auth_config))
        .with_state(state);

    // Unauthenticated health probes.
    let health = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness));

    Router::new().merge(health).merge(api)
}

/// Liveness probe: 200 while the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: 200 once state has been hydrated and the router built.
async fn readiness() -> &'static str {
    "ready"
}
