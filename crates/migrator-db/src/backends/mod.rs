//! Database backends.
//!
//! One module per family, all behind the `DatabasePool` trait object. The
//! MSSQL family is dialect-complete but has no driver in this build; its
//! drivers resolve a dialect and then fail pool construction explicitly.

pub mod core;
mod mysql;
mod postgres;

use std::sync::Arc;

use migrator_core::{MigratorError, MigratorResult};

pub use self::core::{DatabasePool, DatabaseRow, DatabaseTransaction, DatabaseValue, ExecResult};
pub use self::mysql::MySqlBackendPool;
pub use self::postgres::PostgresPool;

pub(crate) const POOL_MAX_CONNECTIONS: u32 = 10;
pub(crate) const POOL_ACQUIRE_TIMEOUT_SECONDS: u64 = 30;

/// Open the pooled handle for the configured driver.
pub async fn connect_pool(driver: &str, data_source: &str) -> MigratorResult<Arc<dyn DatabasePool>> {
    match driver {
        "postgres" => Ok(Arc::new(PostgresPool::connect(data_source).await?)),
        "mysql" => Ok(Arc::new(MySqlBackendPool::connect(data_source).await?)),
        "mssql" | "sqlserver" => Err(MigratorError::UnsupportedDriver {
            driver: driver.to_string(),
        }),
        other => Err(MigratorError::UnknownDriver {
            driver: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_driver_fails_before_any_connection() {
        let err = match connect_pool("abcxyz", "postgres://ignored").await {
            Err(e) => e,
            Ok(_) => panic!("expected an error"),
        };
        assert_eq!(err.to_string(), "unknown driver: abcxyz");
    }

    #[tokio::test]
    async fn mssql_driver_reports_missing_backend() {
        let err = match connect_pool("sqlserver", "server=ignored").await {
            Err(e) => e,
            Ok(_) => panic!("expected an error"),
        };
        assert!(err.to_string().contains("no database backend"));
    }
}
