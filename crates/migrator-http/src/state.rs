//! Shared server state and the per-request coordinator.

use std::sync::Arc;

use migrator_core::{Config, MigratorResult};
use migrator_db::{Connector, Coordinator, DatabasePool, Metrics};

/// State shared across requests: the config, the connection pool created at
/// startup and the metrics counters. Everything else is per-request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pool: Arc<dyn DatabasePool>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(config: Arc<Config>, pool: Arc<dyn DatabasePool>, metrics: Arc<Metrics>) -> AppState {
        AppState {
            config,
            pool,
            metrics,
        }
    }

    /// Build the coordinator serving one request. The connector borrows the
    /// shared pool, so construction is cheap and disposal happens on drop at
    /// the end of the request on every exit path.
    pub fn coordinator(&self) -> MigratorResult<Coordinator> {
        let connector = Connector::from_pool(self.config.clone(), self.pool.clone())?;
        Ok(Coordinator::new(
            self.config.clone(),
            connector,
            self.metrics.clone(),
        ))
    }
}
