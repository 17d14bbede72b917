//! Core database backend traits.
//!
//! The connector works against these trait objects only; the per-family
//! modules implement them over sqlx pools. Statements arrive fully formed
//! from the dialect layer, so the surface is small: execute, fetch, and an
//! owned transaction with commit/rollback.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use migrator_core::{MigratorError, MigratorResult};

/// Value moved between the connector and a database backend.
#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseValue {
    Null,
    Int32(i32),
    Int64(i64),
    String(String),
    DateTime(DateTime<Utc>),
}

impl DatabaseValue {
    pub fn is_null(&self) -> bool {
        matches!(self, DatabaseValue::Null)
    }

    pub fn as_i64(&self) -> MigratorResult<i64> {
        match self {
            DatabaseValue::Int32(v) => Ok(*v as i64),
            DatabaseValue::Int64(v) => Ok(*v),
            other => Err(type_error("integer", other)),
        }
    }

    pub fn as_i32(&self) -> MigratorResult<i32> {
        match self {
            DatabaseValue::Int32(v) => Ok(*v),
            DatabaseValue::Int64(v) => Ok(*v as i32),
            other => Err(type_error("integer", other)),
        }
    }

    /// Like `as_i64` but maps SQL NULL to `None`.
    pub fn opt_i64(&self) -> MigratorResult<Option<i64>> {
        match self {
            DatabaseValue::Null => Ok(None),
            other => other.as_i64().map(Some),
        }
    }

    pub fn as_string(&self) -> MigratorResult<String> {
        match self {
            DatabaseValue::String(v) => Ok(v.clone()),
            other => Err(type_error("string", other)),
        }
    }

    pub fn as_datetime(&self) -> MigratorResult<DateTime<Utc>> {
        match self {
            DatabaseValue::DateTime(v) => Ok(*v),
            other => Err(type_error("timestamp", other)),
        }
    }
}

fn type_error(expected: &str, got: &DatabaseValue) -> MigratorError {
    MigratorError::database(format!("expected {} column, got {:?}", expected, got))
}

impl From<i32> for DatabaseValue {
    fn from(value: i32) -> Self {
        DatabaseValue::Int32(value)
    }
}

impl From<i64> for DatabaseValue {
    fn from(value: i64) -> Self {
        DatabaseValue::Int64(value)
    }
}

impl From<String> for DatabaseValue {
    fn from(value: String) -> Self {
        DatabaseValue::String(value)
    }
}

impl From<&str> for DatabaseValue {
    fn from(value: &str) -> Self {
        DatabaseValue::String(value.to_string())
    }
}

impl From<DateTime<Utc>> for DatabaseValue {
    fn from(value: DateTime<Utc>) -> Self {
        DatabaseValue::DateTime(value)
    }
}

/// Outcome of an execute, mirroring the driver's statement result.
#[derive(Debug, Clone, Copy)]
pub struct ExecResult {
    pub rows_affected: u64,
    /// Generated key of the inserted row, where the family reports one.
    pub last_insert_id: Option<i64>,
}

/// A single fetched row, accessed positionally.
pub trait DatabaseRow: Send + Sync {
    fn get(&self, index: usize) -> MigratorResult<DatabaseValue>;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An owned transaction; dropping without commit rolls back.
#[async_trait]
pub trait DatabaseTransaction: Send {
    async fn execute(&mut self, sql: &str, params: &[DatabaseValue]) -> MigratorResult<ExecResult>;

    async fn fetch_all(
        &mut self,
        sql: &str,
        params: &[DatabaseValue],
    ) -> MigratorResult<Vec<Box<dyn DatabaseRow>>>;

    async fn fetch_optional(
        &mut self,
        sql: &str,
        params: &[DatabaseValue],
    ) -> MigratorResult<Option<Box<dyn DatabaseRow>>>;

    async fn commit(self: Box<Self>) -> MigratorResult<()>;

    async fn rollback(self: Box<Self>) -> MigratorResult<()>;
}

/// A shared connection pool for one database family.
#[async_trait]
pub trait DatabasePool: Send + Sync {
    async fn execute(&self, sql: &str, params: &[DatabaseValue]) -> MigratorResult<ExecResult>;

    async fn fetch_all(
        &self,
        sql: &str,
        params: &[DatabaseValue],
    ) -> MigratorResult<Vec<Box<dyn DatabaseRow>>>;

    async fn begin(&self) -> MigratorResult<Box<dyn DatabaseTransaction>>;

    /// Round-trip liveness probe backing the health endpoint.
    async fn ping(&self) -> MigratorResult<()>;

    async fn close(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_widening_and_narrowing() {
        assert_eq!(DatabaseValue::Int32(7).as_i64().unwrap(), 7);
        assert_eq!(DatabaseValue::Int64(7).as_i32().unwrap(), 7);
        assert!(DatabaseValue::String("7".into()).as_i64().is_err());
    }

    #[test]
    fn opt_i64_maps_null_to_none() {
        assert_eq!(DatabaseValue::Null.opt_i64().unwrap(), None);
        assert_eq!(DatabaseValue::Int64(3).opt_i64().unwrap(), Some(3));
    }

    #[test]
    fn string_and_datetime_accessors_check_types() {
        assert_eq!(DatabaseValue::from("abc").as_string().unwrap(), "abc");
        assert!(DatabaseValue::Null.as_string().is_err());

        let now = Utc::now();
        assert_eq!(DatabaseValue::from(now).as_datetime().unwrap(), now);
        assert!(DatabaseValue::Int64(0).as_datetime().is_err());
    }
}
