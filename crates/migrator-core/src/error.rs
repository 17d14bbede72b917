//! Error types shared across the migrator crates.
//!
//! The core propagates every unexpected failure as a `MigratorError` so the
//! HTTP shell stays the single place where errors are turned into responses.

use thiserror::Error;

use crate::types::Migration;

/// Result type for migrator operations
pub type MigratorResult<T> = Result<T, MigratorError>;

/// Errors raised by the migrator core
#[derive(Error, Debug)]
pub enum MigratorError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("unknown driver: {driver}")]
    UnknownDriver { driver: String },

    #[error("no database backend compiled for driver: {driver}")]
    UnsupportedDriver { driver: String },

    #[error("{path}: {source}")]
    SourceDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to connect to database: {message}")]
    Connection { message: String },

    #[error("Database error: {message}")]
    Database { message: String },

    #[error("Transaction error: {message}")]
    Transaction { message: String },

    #[error("{resource} not found ID: {id}")]
    NotFound { resource: String, id: i64 },

    #[error("Invalid tenant name: {name}")]
    InvalidTenantName { name: String },

    #[error("Checksum verification failed. Please review offending migrations.")]
    ChecksumVerificationFailed { offending: Vec<Migration> },
}

impl MigratorError {
    pub fn config<T: Into<String>>(message: T) -> Self {
        MigratorError::Config {
            message: message.into(),
        }
    }

    pub fn connection<T: Into<String>>(message: T) -> Self {
        MigratorError::Connection {
            message: message.into(),
        }
    }

    pub fn database<T: Into<String>>(message: T) -> Self {
        MigratorError::Database {
            message: message.into(),
        }
    }

    pub fn transaction<T: Into<String>>(message: T) -> Self {
        MigratorError::Transaction {
            message: message.into(),
        }
    }

    pub fn not_found<T: Into<String>>(resource: T, id: i64) -> Self {
        MigratorError::NotFound {
            resource: resource.into(),
            id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_driver_message_names_the_driver() {
        let err = MigratorError::UnknownDriver {
            driver: "abcxyz".to_string(),
        };
        assert_eq!(err.to_string(), "unknown driver: abcxyz");
    }

    #[test]
    fn connection_error_message_is_stable() {
        let err = MigratorError::connection("timed out");
        assert!(err.to_string().contains("Failed to connect to database"));
    }

    #[test]
    fn source_dir_error_names_the_path() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "No such file or directory");
        let err = MigratorError::SourceDir {
            path: "xyzabc/migrations/config".to_string(),
            source: io,
        };
        assert!(err.to_string().starts_with("xyzabc/migrations/config: "));
        assert!(err.to_string().contains("No such file or directory"));
    }
}
