//! Apply counters, rendered in Prometheus text exposition format.

use std::sync::atomic::{AtomicU64, Ordering};

use migrator_core::MigrationResults;

#[derive(Debug, Default)]
pub struct Metrics {
    versions_created: AtomicU64,
    tenants_created: AtomicU64,
    single_migrations_applied: AtomicU64,
    tenant_migrations_applied: AtomicU64,
    single_scripts_applied: AtomicU64,
    tenant_scripts_applied: AtomicU64,
}

impl Metrics {
    pub fn new() -> Metrics {
        Metrics::default()
    }

    /// Record a committed `createVersion` apply.
    pub fn observe_version_created(&self, results: &MigrationResults) {
        self.versions_created.fetch_add(1, Ordering::Relaxed);
        self.observe_applied(results);
    }

    /// Record a committed `createTenant` apply.
    pub fn observe_tenant_created(&self, results: &MigrationResults) {
        self.tenants_created.fetch_add(1, Ordering::Relaxed);
        self.versions_created.fetch_add(1, Ordering::Relaxed);
        self.observe_applied(results);
    }

    fn observe_applied(&self, results: &MigrationResults) {
        self.single_migrations_applied
            .fetch_add(results.single_migrations.max(0) as u64, Ordering::Relaxed);
        self.tenant_migrations_applied.fetch_add(
            results.tenant_migrations_total.max(0) as u64,
            Ordering::Relaxed,
        );
        self.single_scripts_applied
            .fetch_add(results.single_scripts.max(0) as u64, Ordering::Relaxed);
        self.tenant_scripts_applied.fetch_add(
            results.tenant_scripts_total.max(0) as u64,
            Ordering::Relaxed,
        );
    }

    /// Prometheus text exposition of all counters.
    pub fn render(&self) -> String {
        let mut out = String::new();

        out.push_str("# HELP migrator_versions_created Number of versions created.\n");
        out.push_str("# TYPE migrator_versions_created counter\n");
        out.push_str(&format!(
            "migrator_versions_created {}\n",
            self.versions_created.load(Ordering::Relaxed)
        ));

        out.push_str("# HELP migrator_tenants_created Number of tenants created.\n");
        out.push_str("# TYPE migrator_tenants_created counter\n");
        out.push_str(&format!(
            "migrator_tenants_created {}\n",
            self.tenants_created.load(Ordering::Relaxed)
        ));

        out.push_str(
            "# HELP migrator_migrations_applied Number of applied migrations and scripts, by type.\n",
        );
        out.push_str("# TYPE migrator_migrations_applied counter\n");
        for (label, counter) in [
            ("single_migrations", &self.single_migrations_applied),
            ("tenant_migrations", &self.tenant_migrations_applied),
            ("single_scripts", &self.single_scripts_applied),
            ("tenant_scripts", &self.tenant_scripts_applied),
        ] {
            out.push_str(&format!(
                "migrator_migrations_applied{{type=\"{}\"}} {}\n",
                label,
                counter.load(Ordering::Relaxed)
            ));
        }

        out
    }
}
