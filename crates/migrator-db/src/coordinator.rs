//! Orchestration layer exposed to the HTTP shell.
//!
//! A coordinator lives for one request: it owns a loader and a connector,
//! verifies checksums, computes the pending set, delegates to the connector
//! and fires the observers after a successful commit.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use migrator_core::{
    Action, AppliedMigration, Config, Loader, Migration, MigrationResults, MigratorError,
    MigratorResult, Tenant, Version,
};

use crate::connector::Connector;
use crate::metrics::Metrics;
use crate::notifier::Notifier;

/// Tenant names end up in schema DDL, so they are locked down to
/// identifier characters before any SQL is issued.
static TENANT_NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new("^[A-Za-z_][A-Za-z0-9_]*$").expect("tenant name pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    #[serde(rename = "UP")]
    Up,
    #[serde(rename = "DOWN")]
    Down,
}

pub struct Coordinator {
    loader: Loader,
    connector: Connector,
    metrics: Arc<Metrics>,
    notifier: Notifier,
}

impl Coordinator {
    pub fn new(config: Arc<Config>, connector: Connector, metrics: Arc<Metrics>) -> Coordinator {
        Coordinator {
            loader: Loader::new(config.clone()),
            notifier: Notifier::new(config),
            connector,
            metrics,
        }
    }

    pub fn get_source_migrations(&self) -> MigratorResult<Vec<Migration>> {
        self.loader.get_source_migrations()
    }

    pub async fn get_applied_migrations(&self) -> MigratorResult<Vec<AppliedMigration>> {
        self.connector.get_applied_migrations().await
    }

    pub async fn get_tenants(&self) -> MigratorResult<Vec<Tenant>> {
        self.connector.get_tenants().await
    }

    pub async fn get_versions(&self) -> MigratorResult<Vec<Version>> {
        self.connector.get_versions().await
    }

    pub async fn get_versions_by_file(&self, file: &str) -> MigratorResult<Vec<Version>> {
        self.connector.get_versions_by_file(file).await
    }

    pub async fn get_version_by_id(&self, id: i64) -> MigratorResult<Version> {
        self.connector.get_version_by_id(id).await
    }

    pub async fn get_db_migration_by_id(&self, id: i64) -> MigratorResult<AppliedMigration> {
        self.connector.get_db_migration_by_id(id).await
    }

    /// Compare source checksums against every applied row with the same
    /// file. Scripts are exempt; they are expected to change.
    pub async fn verify_source_migrations_check_sums(
        &self,
    ) -> MigratorResult<(bool, Vec<Migration>)> {
        let source = self.loader.get_source_migrations()?;
        let applied = self.connector.get_applied_migrations().await?;
        let offending = find_offending(&source, &applied);
        Ok((offending.is_empty(), offending))
    }

    /// Apply all outstanding source migrations as a new named version.
    pub async fn create_version(
        &self,
        version_name: &str,
        action: Action,
        dry_run: bool,
    ) -> MigratorResult<(MigrationResults, Option<Version>)> {
        let source = self.loader.get_source_migrations()?;
        let applied = self.connector.get_applied_migrations().await?;

        let offending = find_offending(&source, &applied);
        if !offending.is_empty() {
            tracing::error!(
                offending = offending.len(),
                "checksum verification failed"
            );
            return Err(MigratorError::ChecksumVerificationFailed { offending });
        }

        let pending = compute_pending(source, &applied);
        tracing::info!(pending = pending.len(), "applying pending migrations");

        let (results, version) = self
            .connector
            .create_version(version_name, action, dry_run, &pending)
            .await?;

        if !dry_run && version.is_some() {
            self.metrics.observe_version_created(&results);
            self.notifier.notify(&results).await;
        }

        Ok((results, version))
    }

    /// Register a new tenant and run all tenant migrations against it.
    pub async fn add_tenant_and_apply_migrations(
        &self,
        tenant_name: &str,
        version_name: &str,
        action: Action,
        dry_run: bool,
    ) -> MigratorResult<(MigrationResults, Option<Version>)> {
        validate_tenant_name(tenant_name)?;

        let source = self.loader.get_source_migrations()?;
        let tenant_migrations: Vec<Migration> = source
            .into_iter()
            .filter(|m| m.kind.is_tenant_kind())
            .collect();

        let (results, version) = self
            .connector
            .create_tenant(version_name, action, dry_run, tenant_name, &tenant_migrations)
            .await?;

        if !dry_run {
            self.metrics.observe_tenant_created(&results);
            self.notifier.notify(&results).await;
        }

        Ok((results, version))
    }

    pub async fn health_check(&self) -> HealthStatus {
        match self.connector.ping().await {
            Ok(()) => HealthStatus::Up,
            Err(e) => {
                tracing::warn!(error = %e, "health check failed");
                HealthStatus::Down
            }
        }
    }
}

pub fn validate_tenant_name(name: &str) -> MigratorResult<()> {
    if TENANT_NAME_PATTERN.is_match(name) {
        Ok(())
    } else {
        Err(MigratorError::InvalidTenantName {
            name: name.to_string(),
        })
    }
}

/// Source migrations (migration kinds only) whose checksum no longer
/// matches any applied row recorded for the same file.
fn find_offending(source: &[Migration], applied: &[AppliedMigration]) -> Vec<Migration> {
    let mut checksums_by_file: HashMap<&str, Vec<&str>> = HashMap::new();
    for row in applied {
        checksums_by_file
            .entry(row.migration.file.as_str())
            .or_default()
            .push(row.migration.check_sum.as_str());
    }

    source
        .iter()
        .filter(|m| !m.kind.is_script_kind())
        .filter(|m| {
            checksums_by_file
                .get(m.file.as_str())
                .map(|sums| sums.iter().any(|sum| *sum != m.check_sum))
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}

/// The pending set: migration kinds not yet recorded under their file,
/// plus every script kind unconditionally. Input order is preserved.
fn compute_pending(source: Vec<Migration>, applied: &[AppliedMigration]) -> Vec<Migration> {
    let applied_files: HashSet<&str> = applied
        .iter()
        .map(|row| row.migration.file.as_str())
        .collect();

    source
        .into_iter()
        .filter(|m| m.kind.is_script_kind() || !applied_files.contains(m.file.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use migrator_core::MigrationKind;

    fn source(file: &str, kind: MigrationKind, check_sum: &str) -> Migration {
        let (source_dir, name) = file.rsplit_once('/').unwrap();
        Migration {
            name: name.to_string(),
            source_dir: source_dir.to_string(),
            file: file.to_string(),
            kind,
            contents: "select 1".to_string(),
            check_sum: check_sum.to_string(),
        }
    }

    fn applied(file: &str, kind: MigrationKind, check_sum: &str, schema: &str) -> AppliedMigration {
        AppliedMigration {
            id: 1,
            migration: source(file, kind, check_sum),
            schema: schema.to_string(),
            applied_at: Utc::now(),
            version_id: 1,
        }
    }

    #[test]
    fn pending_set_skips_applied_migration_kinds() {
        let src = vec![
            source("public/a.sql", MigrationKind::SingleMigration, "s1"),
            source("public/b.sql", MigrationKind::SingleMigration, "s2"),
            source("tenants/c.sql", MigrationKind::TenantMigration, "s3"),
        ];
        let db = vec![applied(
            "public/a.sql",
            MigrationKind::SingleMigration,
            "s1",
            "public",
        )];

        let pending = compute_pending(src, &db);
        let files: Vec<&str> = pending.iter().map(|m| m.file.as_str()).collect();
        assert_eq!(files, vec!["public/b.sql", "tenants/c.sql"]);
    }

    #[test]
    fn pending_set_always_includes_scripts() {
        let src = vec![
            source("scripts/s.sql", MigrationKind::SingleScript, "s1"),
            source("tenants-scripts/t.sql", MigrationKind::TenantScript, "s2"),
        ];
        let db = vec![
            applied("scripts/s.sql", MigrationKind::SingleScript, "s1", "scripts"),
            applied(
                "tenants-scripts/t.sql",
                MigrationKind::TenantScript,
                "s2",
                "abc",
            ),
        ];

        let pending = compute_pending(src.clone(), &db);
        assert_eq!(pending.len(), 2);
    }

    #[test]
    fn second_apply_of_same_tree_is_scripts_only() {
        let src = vec![
            source("public/a.sql", MigrationKind::SingleMigration, "s1"),
            source("tenants/b.sql", MigrationKind::TenantMigration, "s2"),
            source("scripts/s.sql", MigrationKind::SingleScript, "s3"),
        ];
        let db = vec![
            applied("public/a.sql", MigrationKind::SingleMigration, "s1", "public"),
            applied("tenants/b.sql", MigrationKind::TenantMigration, "s2", "abc"),
            applied("tenants/b.sql", MigrationKind::TenantMigration, "s2", "def"),
            applied("scripts/s.sql", MigrationKind::SingleScript, "s3", "scripts"),
        ];

        let pending = compute_pending(src, &db);
        let files: Vec<&str> = pending.iter().map(|m| m.file.as_str()).collect();
        assert_eq!(files, vec!["scripts/s.sql"]);
    }

    #[test]
    fn drift_on_any_applied_row_flags_the_file() {
        let src = vec![source(
            "tenants/a.sql",
            MigrationKind::TenantMigration,
            "new-sum",
        )];
        // one tenant still carries the original checksum
        let db = vec![
            applied("tenants/a.sql", MigrationKind::TenantMigration, "new-sum", "abc"),
            applied("tenants/a.sql", MigrationKind::TenantMigration, "old-sum", "def"),
        ];

        let offending = find_offending(&src, &db);
        assert_eq!(offending.len(), 1);
        assert_eq!(offending[0].file, "tenants/a.sql");
    }

    #[test]
    fn matching_checksums_produce_no_offenders() {
        let src = vec![source(
            "public/a.sql",
            MigrationKind::SingleMigration,
            "sum",
        )];
        let db = vec![applied(
            "public/a.sql",
            MigrationKind::SingleMigration,
            "sum",
            "public",
        )];

        assert!(find_offending(&src, &db).is_empty());
    }

    #[test]
    fn unapplied_migrations_are_never_offending() {
        let src = vec![source(
            "public/new.sql",
            MigrationKind::SingleMigration,
            "sum",
        )];

        assert!(find_offending(&src, &[]).is_empty());
    }

    #[test]
    fn script_drift_is_ignored() {
        let src = vec![source(
            "scripts/s.sql",
            MigrationKind::SingleScript,
            "new-sum",
        )];
        let db = vec![applied(
            "scripts/s.sql",
            MigrationKind::SingleScript,
            "old-sum",
            "scripts",
        )];

        assert!(find_offending(&src, &db).is_empty());
    }

    #[test]
    fn tenant_names_are_validated_before_any_sql() {
        assert!(validate_tenant_name("new_tenant_1").is_ok());
        assert!(validate_tenant_name("_leading_underscore").is_ok());
        assert!(validate_tenant_name("Tenant").is_ok());

        assert!(validate_tenant_name("").is_err());
        assert!(validate_tenant_name("1starts_with_digit").is_err());
        assert!(validate_tenant_name("bad-dash").is_err());
        assert!(validate_tenant_name("x; drop table tenants").is_err());
        assert!(validate_tenant_name("name with space").is_err());
    }

    #[test]
    fn health_status_serializes_upper_case() {
        assert_eq!(serde_json::to_string(&HealthStatus::Up).unwrap(), "\"UP\"");
        assert_eq!(
            serde_json::to_string(&HealthStatus::Down).unwrap(),
            "\"DOWN\""
        );
    }
}
