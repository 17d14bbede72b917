//! Scripted in-memory database pool for connector and coordinator tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use migrator_core::{MigratorError, MigratorResult};
use migrator_db::backends::{
    DatabasePool, DatabaseRow, DatabaseTransaction, DatabaseValue, ExecResult,
};

pub struct Row(pub Vec<DatabaseValue>);

impl DatabaseRow for Row {
    fn get(&self, index: usize) -> MigratorResult<DatabaseValue> {
        self.0
            .get(index)
            .cloned()
            .ok_or_else(|| MigratorError::database(format!("no column at index {}", index)))
    }

    fn len(&self) -> usize {
        self.0.len()
    }
}

/// Everything the fake database remembers across the test.
#[derive(Default)]
pub struct FakeState {
    /// Names served for any tenant-listing query.
    pub tenants: Vec<String>,
    /// Rows served for the applied-migrations select.
    pub applied: Vec<Vec<DatabaseValue>>,
    /// Non-insert SQL executed inside transactions, in order.
    pub executed: Vec<String>,
    /// Parameter tuples of migration-row inserts, in order.
    pub inserted: Vec<Vec<DatabaseValue>>,
    /// Names passed to version-row inserts.
    pub version_names: Vec<String>,
    pub queries: Vec<String>,
    pub begins: usize,
    pub committed: bool,
    pub rolled_back: bool,
    /// Any executed SQL containing this marker fails the statement.
    pub fail_on: Option<String>,
}

pub const FAKE_VERSION_ID: i64 = 42;

#[derive(Clone, Default)]
pub struct FakePool(pub Arc<Mutex<FakeState>>);

impl FakePool {
    pub fn with_tenants(tenants: &[&str]) -> FakePool {
        let pool = FakePool::default();
        pool.0.lock().unwrap().tenants = tenants.iter().map(|t| t.to_string()).collect();
        pool
    }

    pub fn state(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.0.lock().unwrap()
    }

    /// Register an applied-migrations row in table column order.
    #[allow(clippy::too_many_arguments)]
    pub fn push_applied(&self, id: i64, file: &str, kind: i32, schema: &str, check_sum: &str) {
        let (source_dir, name) = file.rsplit_once('/').unwrap();
        let created = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        self.state().applied.push(vec![
            id.into(),
            name.into(),
            source_dir.into(),
            file.into(),
            kind.into(),
            schema.into(),
            created.into(),
            "select 1".into(),
            check_sum.into(),
            1i64.into(),
        ]);
    }
}

#[async_trait]
impl DatabasePool for FakePool {
    async fn execute(&self, sql: &str, _params: &[DatabaseValue]) -> MigratorResult<ExecResult> {
        self.state().queries.push(sql.to_string());
        Ok(ExecResult {
            rows_affected: 0,
            last_insert_id: None,
        })
    }

    async fn fetch_all(
        &self,
        sql: &str,
        _params: &[DatabaseValue],
    ) -> MigratorResult<Vec<Box<dyn DatabaseRow>>> {
        let state = &mut *self.state();
        state.queries.push(sql.to_string());

        if sql.contains("migrator_migrations") || sql.contains("[migrator].[migrator_migrations]")
        {
            return Ok(state
                .applied
                .iter()
                .map(|row| Box::new(Row(row.clone())) as Box<dyn DatabaseRow>)
                .collect());
        }

        // anything else is a tenant listing, default or overridden
        Ok(state
            .tenants
            .iter()
            .map(|name| Box::new(Row(vec![name.as_str().into()])) as Box<dyn DatabaseRow>)
            .collect())
    }

    async fn begin(&self) -> MigratorResult<Box<dyn DatabaseTransaction>> {
        self.state().begins += 1;
        Ok(Box::new(FakeTx(self.0.clone())))
    }

    async fn ping(&self) -> MigratorResult<()> {
        Ok(())
    }

    async fn close(&self) {}
}

pub struct FakeTx(Arc<Mutex<FakeState>>);

impl FakeTx {
    fn version_rows(state: &FakeState) -> Vec<Box<dyn DatabaseRow>> {
        let created = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let version_name = state
            .version_names
            .last()
            .cloned()
            .unwrap_or_else(|| "unnamed".to_string());

        if state.inserted.is_empty() {
            return vec![Box::new(Row(vec![
                FAKE_VERSION_ID.into(),
                version_name.as_str().into(),
                created.into(),
                DatabaseValue::Null,
                DatabaseValue::Null,
                DatabaseValue::Null,
                DatabaseValue::Null,
                DatabaseValue::Null,
                DatabaseValue::Null,
                DatabaseValue::Null,
                DatabaseValue::Null,
                DatabaseValue::Null,
            ]))];
        }

        state
            .inserted
            .iter()
            .enumerate()
            .map(|(i, params)| {
                // insert order: name, source_dir, filename, type, db_schema,
                // contents, checksum, version_id
                Box::new(Row(vec![
                    FAKE_VERSION_ID.into(),
                    version_name.as_str().into(),
                    created.into(),
                    (i as i64 + 1).into(),
                    params[0].clone(),
                    params[1].clone(),
                    params[2].clone(),
                    params[3].clone(),
                    params[4].clone(),
                    created.into(),
                    params[5].clone(),
                    params[6].clone(),
                ])) as Box<dyn DatabaseRow>
            })
            .collect()
    }
}

#[async_trait]
impl DatabaseTransaction for FakeTx {
    async fn execute(&mut self, sql: &str, params: &[DatabaseValue]) -> MigratorResult<ExecResult> {
        let state = &mut *self.0.lock().unwrap();

        if let Some(marker) = &state.fail_on {
            if sql.contains(marker.as_str()) {
                return Err(MigratorError::database(format!("forced failure: {}", sql)));
            }
        }

        if sql.contains("migrator_migrations") && sql.starts_with("insert") {
            state.inserted.push(params.to_vec());
            return Ok(ExecResult {
                rows_affected: 1,
                last_insert_id: None,
            });
        }

        if sql.contains("migrator_versions") && sql.starts_with("insert") {
            state.version_names.push(params[0].as_string()?);
            return Ok(ExecResult {
                rows_affected: 1,
                last_insert_id: Some(FAKE_VERSION_ID),
            });
        }

        state.executed.push(sql.to_string());
        Ok(ExecResult {
            rows_affected: 0,
            last_insert_id: None,
        })
    }

    async fn fetch_all(
        &mut self,
        _sql: &str,
        _params: &[DatabaseValue],
    ) -> MigratorResult<Vec<Box<dyn DatabaseRow>>> {
        let state = &*self.0.lock().unwrap();
        Ok(Self::version_rows(state))
    }

    async fn fetch_optional(
        &mut self,
        sql: &str,
        params: &[DatabaseValue],
    ) -> MigratorResult<Option<Box<dyn DatabaseRow>>> {
        let state = &mut *self.0.lock().unwrap();

        if sql.contains("migrator_versions") && sql.starts_with("insert") {
            state.version_names.push(params[0].as_string()?);
            return Ok(Some(Box::new(Row(vec![FAKE_VERSION_ID.into()]))));
        }

        Ok(None)
    }

    async fn commit(self: Box<Self>) -> MigratorResult<()> {
        self.0.lock().unwrap().committed = true;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> MigratorResult<()> {
        self.0.lock().unwrap().rolled_back = true;
        Ok(())
    }
}
