//! Per-RDBMS SQL strings and capability flags.
//!
//! Every SQL statement the connector issues comes from a `Dialect`
//! implementation; the core never assembles SQL itself. The only statement
//! built from caller input is `create_schema_sql`, whose schema argument
//! must have been validated upstream.

mod mssql;
mod mysql;
mod postgres;

pub use mssql::MsSqlDialect;
pub use mysql::MySqlDialect;
pub use postgres::PostgresDialect;

use migrator_core::{MigratorError, MigratorResult};

/// Schema holding all migrator bookkeeping objects.
pub const MIGRATOR_SCHEMA: &str = "migrator";
pub const MIGRATOR_TENANTS_TABLE: &str = "migrator_tenants";
pub const MIGRATOR_MIGRATIONS_TABLE: &str = "migrator_migrations";
pub const MIGRATOR_VERSIONS_TABLE: &str = "migrator_versions";

/// Capability interface for one database family.
///
/// Parameter placeholders (`$n`, `?`, `@pN`) are owned by the dialect and
/// baked into the returned statements. Families where
/// `last_insert_id_supported` is false embed `RETURNING id` (or
/// `OUTPUT inserted.id`) in `version_insert_sql` instead.
pub trait Dialect: Send + Sync {
    /// Idempotent schema creation for the given (pre-validated) name.
    fn create_schema_sql(&self, schema: &str) -> String;

    fn create_tenants_table_sql(&self) -> String;
    fn create_migrations_table_sql(&self) -> String;
    /// Versions DDL is a sequence: table plus supporting indexes and
    /// constraints, each statement idempotent on its own.
    fn create_versions_table_sql(&self) -> Vec<String>;

    /// Default tenant listing; overridable via `tenantSelectSQL` in config.
    fn tenant_select_sql(&self) -> String;
    /// Default tenant insert; overridable via `tenantInsertSQL` in config.
    fn tenant_insert_sql(&self) -> String;

    fn version_insert_sql(&self) -> String;
    fn migration_insert_sql(&self) -> String;

    fn versions_select_sql(&self) -> String;
    fn version_by_id_sql(&self) -> String;
    fn versions_by_file_sql(&self) -> String;
    fn migration_by_id_sql(&self) -> String;
    fn migration_select_sql(&self) -> String;

    /// Whether the driver reports generated keys on insert. When false the
    /// connector reads the version id from the insert's result row.
    fn last_insert_id_supported(&self) -> bool;
}

/// Resolve the dialect for a configured driver string.
pub fn dialect_for_driver(driver: &str) -> MigratorResult<Box<dyn Dialect>> {
    match driver {
        "postgres" => Ok(Box::new(PostgresDialect)),
        "mysql" => Ok(Box::new(MySqlDialect)),
        "mssql" | "sqlserver" => Ok(Box::new(MsSqlDialect)),
        other => Err(MigratorError::UnknownDriver {
            driver: other.to_string(),
        }),
    }
}
