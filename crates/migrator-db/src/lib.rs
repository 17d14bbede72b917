//! Database side of the schema migrator: SQL dialects, sqlx-backed
//! connection pools, the transactional connector and the request-scoped
//! coordinator with its observers.

pub mod backends;
pub mod connector;
pub mod coordinator;
pub mod dialect;
pub mod metrics;
pub mod notifier;

pub use backends::{connect_pool, DatabasePool};
pub use connector::Connector;
pub use coordinator::{Coordinator, HealthStatus};
pub use dialect::{dialect_for_driver, Dialect};
pub use metrics::Metrics;
pub use notifier::Notifier;
