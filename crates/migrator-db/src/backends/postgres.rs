//! PostgreSQL backend over sqlx.

use async_trait::async_trait;
use migrator_core::{MigratorError, MigratorResult};
use sqlx::postgres::{PgArguments, PgPoolOptions, PgRow};
use sqlx::{Column, Pool, Postgres, Row, TypeInfo};

use super::core::{DatabasePool, DatabaseRow, DatabaseTransaction, DatabaseValue, ExecResult};
use super::POOL_ACQUIRE_TIMEOUT_SECONDS;
use super::POOL_MAX_CONNECTIONS;

pub struct PostgresPool {
    pool: Pool<Postgres>,
}

impl PostgresPool {
    /// Connect eagerly so unreachable targets fail at construction.
    pub async fn connect(data_source: &str) -> MigratorResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(POOL_MAX_CONNECTIONS)
            .acquire_timeout(std::time::Duration::from_secs(POOL_ACQUIRE_TIMEOUT_SECONDS))
            .connect(data_source)
            .await
            .map_err(|e| MigratorError::connection(e.to_string()))?;

        Ok(PostgresPool { pool })
    }
}

#[async_trait]
impl DatabasePool for PostgresPool {
    async fn execute(&self, sql: &str, params: &[DatabaseValue]) -> MigratorResult<ExecResult> {
        let result = bind_params(sqlx::query(sql), params)
            .execute(&self.pool)
            .await
            .map_err(|e| MigratorError::database(e.to_string()))?;

        Ok(ExecResult {
            rows_affected: result.rows_affected(),
            last_insert_id: None,
        })
    }

    async fn fetch_all(
        &self,
        sql: &str,
        params: &[DatabaseValue],
    ) -> MigratorResult<Vec<Box<dyn DatabaseRow>>> {
        let rows = bind_params(sqlx::query(sql), params)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| MigratorError::database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|row| Box::new(PostgresRow { row }) as Box<dyn DatabaseRow>)
            .collect())
    }

    async fn begin(&self) -> MigratorResult<Box<dyn DatabaseTransaction>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| MigratorError::transaction(e.to_string()))?;

        Ok(Box::new(PostgresTransaction { tx }))
    }

    async fn ping(&self) -> MigratorResult<()> {
        sqlx::query("select 1")
            .execute(&self.pool)
            .await
            .map_err(|e| MigratorError::connection(e.to_string()))?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

pub struct PostgresTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl DatabaseTransaction for PostgresTransaction {
    async fn execute(&mut self, sql: &str, params: &[DatabaseValue]) -> MigratorResult<ExecResult> {
        let result = bind_params(sqlx::query(sql), params)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| MigratorError::database(e.to_string()))?;

        Ok(ExecResult {
            rows_affected: result.rows_affected(),
            last_insert_id: None,
        })
    }

    async fn fetch_all(
        &mut self,
        sql: &str,
        params: &[DatabaseValue],
    ) -> MigratorResult<Vec<Box<dyn DatabaseRow>>> {
        let rows = bind_params(sqlx::query(sql), params)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| MigratorError::database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|row| Box::new(PostgresRow { row }) as Box<dyn DatabaseRow>)
            .collect())
    }

    async fn fetch_optional(
        &mut self,
        sql: &str,
        params: &[DatabaseValue],
    ) -> MigratorResult<Option<Box<dyn DatabaseRow>>> {
        let row = bind_params(sqlx::query(sql), params)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| MigratorError::database(e.to_string()))?;

        Ok(row.map(|row| Box::new(PostgresRow { row }) as Box<dyn DatabaseRow>))
    }

    async fn commit(self: Box<Self>) -> MigratorResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| MigratorError::transaction(e.to_string()))
    }

    async fn rollback(self: Box<Self>) -> MigratorResult<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| MigratorError::transaction(e.to_string()))
    }
}

struct PostgresRow {
    row: PgRow,
}

impl DatabaseRow for PostgresRow {
    fn get(&self, index: usize) -> MigratorResult<DatabaseValue> {
        decode_column(&self.row, index)
    }

    fn len(&self) -> usize {
        self.row.len()
    }
}

fn bind_params<'a>(
    mut query: sqlx::query::Query<'a, Postgres, PgArguments>,
    params: &'a [DatabaseValue],
) -> sqlx::query::Query<'a, Postgres, PgArguments> {
    for param in params {
        query = match param {
            DatabaseValue::Null => query.bind(Option::<String>::None),
            DatabaseValue::Int32(v) => query.bind(*v),
            DatabaseValue::Int64(v) => query.bind(*v),
            DatabaseValue::String(v) => query.bind(v.as_str()),
            DatabaseValue::DateTime(v) => query.bind(*v),
        };
    }
    query
}

fn decode_column(row: &PgRow, index: usize) -> MigratorResult<DatabaseValue> {
    let column = row
        .columns()
        .get(index)
        .ok_or_else(|| MigratorError::database(format!("no column at index {}", index)))?;

    let type_name = column.type_info().name();
    let decode_err =
        |e: sqlx::Error| MigratorError::database(format!("column {}: {}", index, e));

    match type_name {
        "INT2" => Ok(row
            .try_get::<Option<i16>, _>(index)
            .map_err(decode_err)?
            .map(|v| DatabaseValue::Int32(v as i32))
            .unwrap_or(DatabaseValue::Null)),
        "INT4" => Ok(row
            .try_get::<Option<i32>, _>(index)
            .map_err(decode_err)?
            .map(DatabaseValue::Int32)
            .unwrap_or(DatabaseValue::Null)),
        "INT8" => Ok(row
            .try_get::<Option<i64>, _>(index)
            .map_err(decode_err)?
            .map(DatabaseValue::Int64)
            .unwrap_or(DatabaseValue::Null)),
        "TIMESTAMPTZ" => Ok(row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(index)
            .map_err(decode_err)?
            .map(DatabaseValue::DateTime)
            .unwrap_or(DatabaseValue::Null)),
        "TIMESTAMP" => Ok(row
            .try_get::<Option<chrono::NaiveDateTime>, _>(index)
            .map_err(decode_err)?
            .map(|v| DatabaseValue::DateTime(v.and_utc()))
            .unwrap_or(DatabaseValue::Null)),
        _ => Ok(row
            .try_get::<Option<String>, _>(index)
            .map_err(decode_err)?
            .map(DatabaseValue::String)
            .unwrap_or(DatabaseValue::Null)),
    }
}
