//! Error types for the migrator.

use strata_schema::SchemaError;
use thiserror::Error;

/// Result type alias for migration operations.
pub type MigrateResult<T> = Result<T, MigrationError>;

/// Errors that can occur during migration operations.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// A model reference could not be turned into a descriptor.
    #[error("Parse error: {0}")]
    Parse(#[from] SchemaError),

    /// A named field, index or constraint does not exist on the model.
    #[error("{kind} '{name}' not found on table '{table}'")]
    Lookup {
        /// What was looked up (`field`, `index`, `constraint`).
        kind: &'static str,
        /// Requested name.
        name: String,
        /// Table searched.
        table: String,
    },

    /// A column resolved to an empty SQL type.
    #[error("Empty data type for column '{table}.{column}'")]
    EmptyDataType {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// A statement failed to execute.
    #[error("Failed to execute `{sql}`: {message}")]
    Exec {
        /// Rendered statement.
        sql: String,
        /// Driver error message.
        message: String,
    },

    /// The operation is not available.
    #[error("{0} is not supported")]
    Unsupported(&'static str),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl MigrationError {
    /// Create a lookup error.
    pub fn lookup(kind: &'static str, name: impl Into<String>, table: impl Into<String>) -> Self {
        Self::Lookup {
            kind,
            name: name.into(),
            table: table.into(),
        }
    }

    /// Create an execution error.
    pub fn exec(sql: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Exec {
            sql: sql.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Check if the error was raised before anything reached the database.
    pub fn is_client_side(&self) -> bool {
        !matches!(self, Self::Exec { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_display() {
        let err = MigrationError::lookup("index", "idx_missing", "users");
        assert_eq!(
            err.to_string(),
            "index 'idx_missing' not found on table 'users'"
        );
    }

    #[test]
    fn test_parse_from_schema_error() {
        let err: MigrationError = SchemaError::EmptyTableName.into();
        assert!(matches!(err, MigrationError::Parse(_)));
        assert!(err.to_string().contains("empty table name"));
    }

    #[test]
    fn test_is_client_side() {
        assert!(MigrationError::Unsupported("views").is_client_side());
        assert!(!MigrationError::exec("DROP TABLE `x`", "denied").is_client_side());
    }
}
