//! Domain types for source and applied migrations, tenants and versions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{MigratorError, MigratorResult};

/// Classification of a migration source file.
///
/// Migrations are immutable, applied exactly once per target schema and
/// drift-checked by checksum. Scripts are re-applied on every run and are
/// not drift-checked. Single artifacts target their own source directory as
/// schema; tenant artifacts fan out across all tenant schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MigrationKind {
    SingleMigration,
    TenantMigration,
    SingleScript,
    TenantScript,
}

impl MigrationKind {
    /// Integer code stored in the `type` column of `migrator_migrations`.
    pub fn code(&self) -> i32 {
        match self {
            MigrationKind::SingleMigration => 1,
            MigrationKind::TenantMigration => 2,
            MigrationKind::SingleScript => 3,
            MigrationKind::TenantScript => 4,
        }
    }

    pub fn from_code(code: i32) -> MigratorResult<Self> {
        match code {
            1 => Ok(MigrationKind::SingleMigration),
            2 => Ok(MigrationKind::TenantMigration),
            3 => Ok(MigrationKind::SingleScript),
            4 => Ok(MigrationKind::TenantScript),
            other => Err(MigratorError::database(format!(
                "invalid migration type code: {}",
                other
            ))),
        }
    }

    /// Tie-break rank used by the loader when file names collide across
    /// source directories: single migrations run before tenant migrations,
    /// migrations before scripts.
    pub fn order_rank(&self) -> u8 {
        match self {
            MigrationKind::SingleMigration => 0,
            MigrationKind::TenantMigration => 1,
            MigrationKind::SingleScript => 2,
            MigrationKind::TenantScript => 3,
        }
    }

    /// Tenant kinds are expanded across all tenant schemas on apply.
    pub fn is_tenant_kind(&self) -> bool {
        matches!(
            self,
            MigrationKind::TenantMigration | MigrationKind::TenantScript
        )
    }

    /// Script kinds are re-applied on every run and skip drift checks.
    pub fn is_script_kind(&self) -> bool {
        matches!(
            self,
            MigrationKind::SingleScript | MigrationKind::TenantScript
        )
    }
}

/// A migration source file discovered on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Migration {
    /// File name only, the primary sort key.
    pub name: String,
    /// Configured directory the file came from, relative to the base dir.
    pub source_dir: String,
    /// `source_dir + "/" + name`, the stable identifier.
    pub file: String,
    #[serde(rename = "migrationType")]
    pub kind: MigrationKind,
    /// Full SQL text, possibly containing schema placeholder tokens.
    pub contents: String,
    /// Hex SHA-256 of `contents`.
    pub check_sum: String,
}

/// A tenant; its name doubles as the database schema name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub name: String,
}

/// A migration row recorded in the database.
///
/// For tenant kinds one row exists per tenant per apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedMigration {
    pub id: i64,
    #[serde(flatten)]
    pub migration: Migration,
    /// Schema the migration was applied against.
    pub schema: String,
    pub applied_at: DateTime<Utc>,
    pub version_id: i64,
}

/// A named group of every migration row inserted during one apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    pub id: i64,
    pub name: String,
    pub created: DateTime<Utc>,
    pub applied_migrations: Vec<AppliedMigration>,
}

/// What to do with the SQL of each pending migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    /// Substitute the schema placeholder and execute the SQL.
    Apply,
    /// Record apply history without executing the SQL; used to bring the
    /// bookkeeping in line with a pre-existing database.
    Sync,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Apply => write!(f, "apply"),
            Action::Sync => write!(f, "sync"),
        }
    }
}

/// Summary of a single apply invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationResults {
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration of the apply, in milliseconds.
    pub duration_ms: i64,
    /// Number of tenants the apply fanned out over.
    pub tenants: i32,
    pub single_migrations: i32,
    pub single_scripts: i32,
    /// Distinct tenant migrations, counted once each.
    pub tenant_migrations: i32,
    pub tenant_scripts: i32,
    /// Tenant migrations multiplied by the tenants they ran against.
    pub tenant_migrations_total: i32,
    pub tenant_scripts_total: i32,
    pub migrations_grand_total: i32,
    pub scripts_grand_total: i32,
}

impl MigrationResults {
    /// Fresh result with all counters at zero; also the return value of a
    /// zero-migration apply, which persists nothing.
    pub fn new(started_at: DateTime<Utc>) -> Self {
        MigrationResults {
            started_at,
            duration_ms: 0,
            tenants: 0,
            single_migrations: 0,
            single_scripts: 0,
            tenant_migrations: 0,
            tenant_scripts: 0,
            tenant_migrations_total: 0,
            tenant_scripts_total: 0,
            migrations_grand_total: 0,
            scripts_grand_total: 0,
        }
    }

    /// Fill in the derived totals once counting is finished.
    pub fn finalize(&mut self, finished_at: DateTime<Utc>) {
        self.duration_ms = (finished_at - self.started_at).num_milliseconds();
        self.migrations_grand_total = self.tenant_migrations_total + self.single_migrations;
        self.scripts_grand_total = self.tenant_scripts_total + self.single_scripts;
    }
}
