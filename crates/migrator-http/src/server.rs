//! Router assembly and server lifecycle.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use migrator_core::{Config, MigratorError, MigratorResult};
use migrator_db::{Connector, Metrics};

use crate::handlers;
use crate::middleware::request_id;
use crate::state::AppState;

/// Assemble the full route table over the shared state.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/", get(handlers::build_info))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        // v1, the legacy REST flavor
        .route("/v1/config", get(handlers::config))
        .route(
            "/v1/tenants",
            get(handlers::tenants_get).post(handlers::tenants_post),
        )
        .route("/v1/migrations/source", get(handlers::migrations_source))
        .route("/v1/migrations/applied", get(handlers::migrations_applied))
        .route("/v1/migrations", post(handlers::migrations_post))
        // v2, the current flavor
        .route("/v2/config", get(handlers::config))
        .route(
            "/v2/versions",
            get(handlers::versions_get).post(handlers::versions_post),
        )
        .route("/v2/versions/:id", get(handlers::version_by_id))
        .route("/v2/migrations/:id", get(handlers::migration_by_id))
        .route("/v2/tenants", post(handlers::tenants_post_v2))
        .layer(axum::middleware::from_fn(request_id));

    let prefix = state.config.path_prefix.trim().to_string();
    let api = api.with_state(state);

    if prefix.is_empty() || prefix == "/" {
        api
    } else if prefix.starts_with('/') {
        Router::new().nest(&prefix, api)
    } else {
        Router::new().nest(&format!("/{}", prefix), api)
    }
}

/// Bootstrap the database, bind the port and serve until shutdown.
///
/// Every failure in here is a startup failure; the binary maps it to exit
/// code 1.
pub async fn serve(config: Config) -> MigratorResult<()> {
    let config = Arc::new(config);

    // Connects and runs the idempotent schema bootstrap; an unreachable
    // database fails startup here.
    let connector = Connector::new(config.clone()).await?;
    let state = AppState::new(config.clone(), connector.pool(), Arc::new(Metrics::new()));

    let router = build_router(state);

    let addr = format!("0.0.0.0:{}", config.http_port());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| MigratorError::config(format!("could not bind {}: {}", addr, e)))?;

    tracing::info!(addr = %addr, "migrator listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| MigratorError::config(format!("server error: {}", e)))
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("shutdown signal received");
    }
}
