//! Error types for MySQL sessions.

use strata_migrate::MigrationError;
use thiserror::Error;

/// Result type for MySQL operations.
pub type MysqlResult<T> = Result<T, MysqlError>;

/// Error type for MySQL operations.
#[derive(Error, Debug)]
pub enum MysqlError {
    /// MySQL driver error.
    #[error("MySQL error: {0}")]
    Mysql(#[from] mysql_async::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connecting took longer than the configured timeout.
    #[error("Timeout error: {0}")]
    Timeout(String),
}

impl MysqlError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a timeout error.
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Attach the statement that failed.
    pub fn into_migration_error(self, sql: impl Into<String>) -> MigrationError {
        MigrationError::exec(sql, self.to_string())
    }
}

impl From<MysqlError> for MigrationError {
    fn from(err: MysqlError) -> Self {
        err.into_migration_error("")
    }
}
