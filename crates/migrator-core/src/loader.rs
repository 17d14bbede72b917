//! Migration source loader.
//!
//! Walks the configured source directories, classifies files into the four
//! migration kinds and returns a single totally-ordered sequence. The loader
//! is stateless: every call re-reads the filesystem, and concurrent calls
//! are safe.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::checksum::compute_checksum;
use crate::config::Config;
use crate::error::{MigratorError, MigratorResult};
use crate::types::{Migration, MigrationKind};

/// Discovers migration source files under `config.base_dir`.
pub struct Loader {
    config: Arc<Config>,
}

impl Loader {
    pub fn new(config: Arc<Config>) -> Self {
        Loader { config }
    }

    /// Enumerate all configured source directories and return their files
    /// as migrations in apply order.
    ///
    /// The order is total: file name ascending, then kind
    /// (single migrations, tenant migrations, single scripts, tenant
    /// scripts), then source directory ascending. A missing directory fails
    /// the whole call with an error naming the joined path.
    pub fn get_source_migrations(&self) -> MigratorResult<Vec<Migration>> {
        let mut migrations = Vec::new();

        let groups = [
            (&self.config.single_migrations, MigrationKind::SingleMigration),
            (&self.config.tenant_migrations, MigrationKind::TenantMigration),
            (&self.config.single_scripts, MigrationKind::SingleScript),
            (&self.config.tenant_scripts, MigrationKind::TenantScript),
        ];

        for (dirs, kind) in groups {
            for dir in dirs {
                self.read_source_dir(dir, kind, &mut migrations)?;
            }
        }

        migrations.sort_by(|a, b| {
            a.name
                .cmp(&b.name)
                .then_with(|| a.kind.order_rank().cmp(&b.kind.order_rank()))
                .then_with(|| a.source_dir.cmp(&b.source_dir))
        });

        tracing::debug!(count = migrations.len(), "loaded source migrations");

        Ok(migrations)
    }

    fn read_source_dir(
        &self,
        source_dir: &str,
        kind: MigrationKind,
        migrations: &mut Vec<Migration>,
    ) -> MigratorResult<()> {
        let dir: PathBuf = Path::new(&self.config.base_dir).join(source_dir);

        let entries = fs::read_dir(&dir).map_err(|e| MigratorError::SourceDir {
            path: dir.display().to_string(),
            source: e,
        })?;

        for entry in entries {
            let entry = entry.map_err(|e| MigratorError::SourceDir {
                path: dir.display().to_string(),
                source: e,
            })?;

            // Non-recursive walk: plain files only.
            let file_type = entry.file_type().map_err(|e| MigratorError::SourceDir {
                path: entry.path().display().to_string(),
                source: e,
            })?;
            if !file_type.is_file() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().into_owned();
            let contents =
                fs::read_to_string(entry.path()).map_err(|e| MigratorError::SourceDir {
                    path: entry.path().display().to_string(),
                    source: e,
                })?;
            let check_sum = compute_checksum(&contents);

            migrations.push(Migration {
                file: format!("{}/{}", source_dir, name),
                name,
                source_dir: source_dir.to_string(),
                kind,
                contents,
                check_sum,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_sql(base: &Path, dir: &str, name: &str, contents: &str) {
        let dir = base.join(dir);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(name), contents).unwrap();
    }

    fn loader_for(base_dir: &Path, configure: impl FnOnce(&mut Config)) -> Loader {
        let mut config = Config::from_str(&format!(
            "baseDir: {}\ndriver: postgres\ndataSource: unused\n",
            base_dir.display()
        ))
        .unwrap();
        configure(&mut config);
        Loader::new(Arc::new(config))
    }

    #[test]
    fn missing_base_dir_fails_naming_the_path() {
        let loader = loader_for(Path::new("xyzabc"), |c| {
            c.single_migrations = vec!["migrations/config".to_string()];
        });

        let err = loader.get_source_migrations().unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("xyzabc/migrations/config: "), "{message}");
        assert!(message.contains("o such file or directory"), "{message}");
    }

    #[test]
    fn missing_migrations_dir_fails_naming_the_path() {
        let tmp = TempDir::new().unwrap();
        write_sql(tmp.path(), "migrations/config", "201602160001.sql", "select 1");

        let loader = loader_for(tmp.path(), |c| {
            c.single_migrations = vec!["migrations/abcdef".to_string()];
        });

        let err = loader.get_source_migrations().unwrap_err();
        assert!(err.to_string().contains("migrations/abcdef"));
    }

    #[test]
    fn orders_across_directories_by_name_kind_then_source_dir() {
        let tmp = TempDir::new().unwrap();
        write_sql(tmp.path(), "migrations/config", "201602160001.sql", "a");
        write_sql(tmp.path(), "migrations/config", "201602160002.sql", "b");
        write_sql(tmp.path(), "migrations/tenants", "201602160002.sql", "c");
        write_sql(tmp.path(), "migrations/tenants", "201602160003.sql", "d");
        write_sql(tmp.path(), "migrations/tenants", "201602160004.sql", "e");
        write_sql(tmp.path(), "migrations/tenants", "201602160005.sql", "f");
        write_sql(tmp.path(), "migrations/ref", "201602160003.sql", "g");
        write_sql(tmp.path(), "migrations/ref", "201602160004.sql", "h");
        write_sql(tmp.path(), "migrations/config-scripts", "201912181227.sql", "i");
        write_sql(
            tmp.path(),
            "migrations/tenants-scripts",
            "201912181228.sql",
            "j",
        );

        let loader = loader_for(tmp.path(), |c| {
            c.single_migrations =
                vec!["migrations/config".to_string(), "migrations/ref".to_string()];
            c.tenant_migrations = vec!["migrations/tenants".to_string()];
            c.single_scripts = vec!["migrations/config-scripts".to_string()];
            c.tenant_scripts = vec!["migrations/tenants-scripts".to_string()];
        });

        let migrations = loader.get_source_migrations().unwrap();
        let files: Vec<&str> = migrations.iter().map(|m| m.file.as_str()).collect();

        assert_eq!(
            files,
            vec![
                "migrations/config/201602160001.sql",
                "migrations/config/201602160002.sql",
                "migrations/tenants/201602160002.sql",
                "migrations/ref/201602160003.sql",
                "migrations/tenants/201602160003.sql",
                "migrations/ref/201602160004.sql",
                "migrations/tenants/201602160004.sql",
                "migrations/tenants/201602160005.sql",
                "migrations/config-scripts/201912181227.sql",
                "migrations/tenants-scripts/201912181228.sql",
            ]
        );
    }

    #[test]
    fn same_name_single_migration_sorts_before_tenant_copy() {
        let tmp = TempDir::new().unwrap();
        write_sql(tmp.path(), "tenants", "20200101.sql", "tenant copy");
        write_sql(tmp.path(), "public", "20200101.sql", "single copy");

        let loader = loader_for(tmp.path(), |c| {
            c.single_migrations = vec!["public".to_string()];
            c.tenant_migrations = vec!["tenants".to_string()];
        });

        let migrations = loader.get_source_migrations().unwrap();
        assert_eq!(migrations[0].kind, MigrationKind::SingleMigration);
        assert_eq!(migrations[1].kind, MigrationKind::TenantMigration);
    }

    #[test]
    fn same_name_and_kind_tie_breaks_on_source_dir() {
        let tmp = TempDir::new().unwrap();
        write_sql(tmp.path(), "ref", "20200101.sql", "ref copy");
        write_sql(tmp.path(), "config", "20200101.sql", "config copy");

        let loader = loader_for(tmp.path(), |c| {
            c.single_migrations = vec!["ref".to_string(), "config".to_string()];
        });

        let migrations = loader.get_source_migrations().unwrap();
        assert_eq!(migrations[0].source_dir, "config");
        assert_eq!(migrations[1].source_dir, "ref");
    }

    #[test]
    fn populates_file_contents_and_checksum() {
        let tmp = TempDir::new().unwrap();
        write_sql(
            tmp.path(),
            "tenants",
            "20200101.sql",
            "create table {schema}.settings (k int)",
        );

        let loader = loader_for(tmp.path(), |c| {
            c.tenant_migrations = vec!["tenants".to_string()];
        });

        let migrations = loader.get_source_migrations().unwrap();
        assert_eq!(migrations.len(), 1);
        let m = &migrations[0];
        assert_eq!(m.name, "20200101.sql");
        assert_eq!(m.source_dir, "tenants");
        assert_eq!(m.file, "tenants/20200101.sql");
        assert_eq!(m.contents, "create table {schema}.settings (k int)");
        assert_eq!(m.check_sum, compute_checksum(&m.contents));
    }

    #[test]
    fn subdirectories_are_not_descended_into() {
        let tmp = TempDir::new().unwrap();
        write_sql(tmp.path(), "public", "20200101.sql", "a");
        write_sql(tmp.path(), "public/nested", "20200102.sql", "b");

        let loader = loader_for(tmp.path(), |c| {
            c.single_migrations = vec!["public".to_string()];
        });

        let migrations = loader.get_source_migrations().unwrap();
        assert_eq!(migrations.len(), 1);
        assert_eq!(migrations[0].name, "20200101.sql");
    }

    #[test]
    fn every_call_rereads_the_filesystem() {
        let tmp = TempDir::new().unwrap();
        write_sql(tmp.path(), "public", "20200101.sql", "a");

        let loader = loader_for(tmp.path(), |c| {
            c.single_migrations = vec!["public".to_string()];
        });

        assert_eq!(loader.get_source_migrations().unwrap().len(), 1);
        write_sql(tmp.path(), "public", "20200102.sql", "b");
        assert_eq!(loader.get_source_migrations().unwrap().len(), 2);
    }
}
