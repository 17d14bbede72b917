//! Low-level database operations: tenants, versions, applied migrations and
//! the transactional apply protocol.
//!
//! One shared implementation delegates every family-specific SQL string to
//! the `Dialect` injected at construction. All reads return empty sequences
//! on no rows, never null.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;

use migrator_core::{
    Action, AppliedMigration, Config, Migration, MigrationKind, MigrationResults, MigratorError,
    MigratorResult, Tenant, Version,
};

use crate::backends::{connect_pool, DatabasePool, DatabaseRow, DatabaseTransaction, DatabaseValue};
use crate::dialect::{dialect_for_driver, Dialect, MIGRATOR_SCHEMA};

pub struct Connector {
    config: Arc<Config>,
    dialect: Box<dyn Dialect>,
    pool: Arc<dyn DatabasePool>,
}

impl Connector {
    /// Resolve the dialect, open the pool and run the idempotent schema
    /// bootstrap. Intended for startup; per-request connectors reuse the
    /// pool via `from_pool`.
    pub async fn new(config: Arc<Config>) -> MigratorResult<Connector> {
        let dialect = dialect_for_driver(&config.driver)?;
        let pool = connect_pool(&config.driver, &config.data_source).await?;
        let connector = Connector {
            config,
            dialect,
            pool,
        };
        connector.bootstrap().await?;
        Ok(connector)
    }

    /// Wrap an existing pool without re-running the bootstrap.
    pub fn from_pool(config: Arc<Config>, pool: Arc<dyn DatabasePool>) -> MigratorResult<Connector> {
        let dialect = dialect_for_driver(&config.driver)?;
        Ok(Connector {
            config,
            dialect,
            pool,
        })
    }

    pub fn pool(&self) -> Arc<dyn DatabasePool> {
        self.pool.clone()
    }

    /// Create the migrator schema and bookkeeping tables inside one
    /// transaction. The default tenants table is only created when the
    /// tenant listing has not been overridden in config.
    async fn bootstrap(&self) -> MigratorResult<()> {
        let mut tx = self.pool.begin().await?;

        tx.execute(&self.dialect.create_schema_sql(MIGRATOR_SCHEMA), &[])
            .await?;
        tx.execute(&self.dialect.create_migrations_table_sql(), &[])
            .await?;
        for sql in self.dialect.create_versions_table_sql() {
            tx.execute(&sql, &[]).await?;
        }
        if self.config.tenant_select_sql.is_empty() {
            tx.execute(&self.dialect.create_tenants_table_sql(), &[])
                .await?;
        }

        tx.commit().await?;
        tracing::info!(driver = %self.config.driver, "migrator schema bootstrap complete");
        Ok(())
    }

    pub async fn ping(&self) -> MigratorResult<()> {
        self.pool.ping().await
    }

    fn tenant_select_sql(&self) -> String {
        if self.config.tenant_select_sql.is_empty() {
            self.dialect.tenant_select_sql()
        } else {
            self.config.tenant_select_sql.clone()
        }
    }

    fn tenant_insert_sql(&self) -> String {
        if self.config.tenant_insert_sql.is_empty() {
            self.dialect.tenant_insert_sql()
        } else {
            self.config.tenant_insert_sql.clone()
        }
    }

    /// All tenants, in whatever order the tenant query returns them.
    pub async fn get_tenants(&self) -> MigratorResult<Vec<Tenant>> {
        let rows = self.pool.fetch_all(&self.tenant_select_sql(), &[]).await?;

        rows.iter()
            .map(|row| {
                Ok(Tenant {
                    name: row.get(0)?.as_string()?,
                })
            })
            .collect()
    }

    /// All versions with their migrations, newest first.
    pub async fn get_versions(&self) -> MigratorResult<Vec<Version>> {
        let rows = self
            .pool
            .fetch_all(&self.dialect.versions_select_sql(), &[])
            .await?;
        read_versions(&rows)
    }

    pub async fn get_versions_by_file(&self, file: &str) -> MigratorResult<Vec<Version>> {
        let rows = self
            .pool
            .fetch_all(&self.dialect.versions_by_file_sql(), &[file.into()])
            .await?;
        read_versions(&rows)
    }

    pub async fn get_version_by_id(&self, id: i64) -> MigratorResult<Version> {
        let rows = self
            .pool
            .fetch_all(&self.dialect.version_by_id_sql(), &[id.into()])
            .await?;

        read_versions(&rows)?
            .into_iter()
            .next()
            .ok_or_else(|| MigratorError::not_found("Version", id))
    }

    pub async fn get_db_migration_by_id(&self, id: i64) -> MigratorResult<AppliedMigration> {
        let rows = self
            .pool
            .fetch_all(&self.dialect.migration_by_id_sql(), &[id.into()])
            .await?;

        match rows.first() {
            Some(row) => read_applied_migration(row.as_ref()),
            None => Err(MigratorError::not_found("DB migration", id)),
        }
    }

    /// Flat read of the migrations table.
    pub async fn get_applied_migrations(&self) -> MigratorResult<Vec<AppliedMigration>> {
        let rows = self
            .pool
            .fetch_all(&self.dialect.migration_select_sql(), &[])
            .await?;

        rows.iter()
            .map(|row| read_applied_migration(row.as_ref()))
            .collect()
    }

    /// Apply migrations against all registered tenants under a new version.
    ///
    /// Zero migrations short-circuit to an empty result without opening a
    /// transaction or inserting a version row.
    pub async fn create_version(
        &self,
        version_name: &str,
        action: Action,
        dry_run: bool,
        migrations: &[Migration],
    ) -> MigratorResult<(MigrationResults, Option<Version>)> {
        if migrations.is_empty() {
            return Ok((MigrationResults::new(Utc::now()), None));
        }

        let tenants = self.get_tenants().await?;

        let mut tx = self.pool.begin().await?;
        let applied = self
            .apply_migrations_in_tx(tx.as_mut(), version_name, action, &tenants, migrations)
            .await;

        self.conclude(tx, applied, action, dry_run).await
    }

    /// Create a tenant schema, register the tenant and apply the given
    /// migrations to it, all in one transaction.
    ///
    /// The tenant name must have been validated by the caller; it is
    /// interpolated into schema DDL.
    pub async fn create_tenant(
        &self,
        version_name: &str,
        action: Action,
        dry_run: bool,
        tenant_name: &str,
        migrations: &[Migration],
    ) -> MigratorResult<(MigrationResults, Option<Version>)> {
        let mut tx = self.pool.begin().await?;

        let applied = async {
            tx.execute(&self.dialect.create_schema_sql(tenant_name), &[])
                .await
                .map_err(|e| {
                    MigratorError::database(format!("create schema failed: {}", e))
                })?;
            tx.execute(&self.tenant_insert_sql(), &[tenant_name.into()])
                .await
                .map_err(|e| {
                    MigratorError::database(format!("failed to add tenant entry: {}", e))
                })?;

            let tenants = vec![Tenant {
                name: tenant_name.to_string(),
            }];
            self.apply_migrations_in_tx(tx.as_mut(), version_name, action, &tenants, migrations)
                .await
        }
        .await;

        self.conclude(tx, applied, action, dry_run).await
    }

    /// Transaction epilogue: read the version back inside the transaction,
    /// then commit, or roll back on dry-run and on any failure. Failures
    /// always propagate the original error.
    async fn conclude(
        &self,
        mut tx: Box<dyn DatabaseTransaction>,
        applied: MigratorResult<(MigrationResults, i64)>,
        action: Action,
        dry_run: bool,
    ) -> MigratorResult<(MigrationResults, Option<Version>)> {
        let (results, version_id) = match applied {
            Ok(applied) => applied,
            Err(e) => {
                tracing::error!(error = %e, "apply failed, rolling back transaction");
                let _ = tx.rollback().await;
                return Err(e);
            }
        };

        let version = match self.get_version_by_id_in_tx(tx.as_mut(), version_id).await {
            Ok(version) => version,
            Err(e) => {
                let _ = tx.rollback().await;
                return Err(e);
            }
        };

        if dry_run {
            tracing::info!("running in dry-run mode, calling rollback");
            tx.rollback().await?;
        } else {
            tracing::info!(action = %action, "committing transaction");
            tx.commit().await?;
        }

        Ok((results, Some(version)))
    }

    /// The apply protocol: insert the version header, then walk the
    /// already-sorted migrations, fanning tenant kinds across all tenant
    /// schemas, substituting the schema placeholder and recording one row
    /// per (migration, schema).
    async fn apply_migrations_in_tx(
        &self,
        tx: &mut dyn DatabaseTransaction,
        version_name: &str,
        action: Action,
        tenants: &[Tenant],
        migrations: &[Migration],
    ) -> MigratorResult<(MigrationResults, i64)> {
        let mut results = MigrationResults::new(Utc::now());
        results.tenants = tenants.len() as i32;

        let placeholder = self.config.schema_placeholder();

        let version_insert_sql = self.dialect.version_insert_sql();
        let version_id = if self.dialect.last_insert_id_supported() {
            tx.execute(&version_insert_sql, &[version_name.into()])
                .await?
                .last_insert_id
                .ok_or_else(|| {
                    MigratorError::database("driver reported no insert id for version row")
                })?
        } else {
            tx.fetch_optional(&version_insert_sql, &[version_name.into()])
                .await?
                .ok_or_else(|| MigratorError::database("version insert returned no id row"))?
                .get(0)?
                .as_i64()?
        };

        let migration_insert_sql = self.dialect.migration_insert_sql();

        for migration in migrations {
            let schemas: Vec<String> = if migration.kind.is_tenant_kind() {
                tenants.iter().map(|t| t.name.clone()).collect()
            } else {
                vec![source_dir_schema(&migration.source_dir)]
            };

            for schema in &schemas {
                tracing::info!(
                    kind = migration.kind.code(),
                    schema = %schema,
                    file = %migration.file,
                    "applying migration"
                );

                if action == Action::Apply {
                    let contents = migration.contents.replace(placeholder, schema);
                    tx.execute(&contents, &[]).await.map_err(|e| {
                        MigratorError::database(format!(
                            "SQL migration {} failed with error: {}",
                            migration.file, e
                        ))
                    })?;
                }

                tx.execute(
                    &migration_insert_sql,
                    &[
                        migration.name.as_str().into(),
                        migration.source_dir.as_str().into(),
                        migration.file.as_str().into(),
                        DatabaseValue::Int32(migration.kind.code()),
                        schema.as_str().into(),
                        migration.contents.as_str().into(),
                        migration.check_sum.as_str().into(),
                        DatabaseValue::Int64(version_id),
                    ],
                )
                .await
                .map_err(|e| {
                    MigratorError::database(format!("failed to add migration entry: {}", e))
                })?;
            }

            match migration.kind {
                MigrationKind::SingleMigration => results.single_migrations += 1,
                MigrationKind::SingleScript => results.single_scripts += 1,
                MigrationKind::TenantMigration => {
                    results.tenant_migrations += 1;
                    results.tenant_migrations_total += schemas.len() as i32;
                }
                MigrationKind::TenantScript => {
                    results.tenant_scripts += 1;
                    results.tenant_scripts_total += schemas.len() as i32;
                }
            }
        }

        results.finalize(Utc::now());
        Ok((results, version_id))
    }

    async fn get_version_by_id_in_tx(
        &self,
        tx: &mut dyn DatabaseTransaction,
        id: i64,
    ) -> MigratorResult<Version> {
        let rows = tx
            .fetch_all(&self.dialect.version_by_id_sql(), &[id.into()])
            .await?;

        read_versions(&rows)?
            .into_iter()
            .next()
            .ok_or_else(|| MigratorError::not_found("Version", id))
    }
}

/// Schema for single kinds: the base name of their source directory.
fn source_dir_schema(source_dir: &str) -> String {
    Path::new(source_dir)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| source_dir.to_string())
}

/// Group joined version/migration rows into `Version` values, newest
/// version first, migrations in insertion order. Versions without
/// migrations surface with an empty list (the join is a left join).
fn read_versions(rows: &[Box<dyn DatabaseRow>]) -> MigratorResult<Vec<Version>> {
    let mut versions: Vec<Version> = Vec::new();
    let mut index_by_id: HashMap<i64, usize> = HashMap::new();

    for row in rows {
        let version_id = row.get(0)?.as_i64()?;

        if !index_by_id.contains_key(&version_id) {
            index_by_id.insert(version_id, versions.len());
            versions.push(Version {
                id: version_id,
                name: row.get(1)?.as_string()?,
                created: row.get(2)?.as_datetime()?,
                applied_migrations: Vec::new(),
            });
        }

        let migration_id = row.get(3)?;
        if migration_id.is_null() {
            continue;
        }

        let version = &mut versions[index_by_id[&version_id]];
        version.applied_migrations.push(AppliedMigration {
            id: migration_id.as_i64()?,
            migration: Migration {
                name: row.get(4)?.as_string()?,
                source_dir: row.get(5)?.as_string()?,
                file: row.get(6)?.as_string()?,
                kind: MigrationKind::from_code(row.get(7)?.as_i32()?)?,
                contents: row.get(10)?.as_string()?,
                check_sum: row.get(11)?.as_string()?,
            },
            schema: row.get(8)?.as_string()?,
            applied_at: row.get(9)?.as_datetime()?,
            version_id,
        });
    }

    versions.sort_by(|a, b| b.id.cmp(&a.id));
    Ok(versions)
}

/// Decode one flat `migrator_migrations` row.
fn read_applied_migration(row: &dyn DatabaseRow) -> MigratorResult<AppliedMigration> {
    Ok(AppliedMigration {
        id: row.get(0)?.as_i64()?,
        migration: Migration {
            name: row.get(1)?.as_string()?,
            source_dir: row.get(2)?.as_string()?,
            file: row.get(3)?.as_string()?,
            kind: MigrationKind::from_code(row.get(4)?.as_i32()?)?,
            contents: row.get(7)?.as_string()?,
            check_sum: row.get(8)?.as_string()?,
        },
        schema: row.get(5)?.as_string()?,
        applied_at: row.get(6)?.as_datetime()?,
        version_id: row.get(9)?.opt_i64()?.unwrap_or_default(),
    })
}
