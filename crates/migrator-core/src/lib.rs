//! Core building blocks of the schema migrator: configuration, domain
//! types, error handling and the migration source loader.

pub mod checksum;
pub mod config;
pub mod error;
pub mod loader;
pub mod types;

pub use checksum::compute_checksum;
pub use config::Config;
pub use error::{MigratorError, MigratorResult};
pub use loader::Loader;
pub use types::{
    Action, AppliedMigration, Migration, MigrationKind, MigrationResults, Tenant, Version,
};
