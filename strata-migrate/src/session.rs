//! Database sessions.

use crate::error::MigrateResult;
use crate::statement::{SqlValue, Statement};

/// A result row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    values: Vec<SqlValue>,
}

impl Row {
    /// Create a row from its values.
    pub fn new(values: Vec<SqlValue>) -> Self {
        Self { values }
    }

    /// Get a value by position.
    pub fn get(&self, index: usize) -> Option<&SqlValue> {
        self.values.get(index)
    }

    /// Get an integer by position.
    pub fn get_i64(&self, index: usize) -> Option<i64> {
        self.get(index).and_then(SqlValue::as_i64)
    }

    /// Get a string by position.
    pub fn get_str(&self, index: usize) -> Option<&str> {
        self.get(index).and_then(SqlValue::as_str)
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the row has no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<Vec<SqlValue>> for Row {
    fn from(values: Vec<SqlValue>) -> Self {
        Self::new(values)
    }
}

/// A connection that executes statements one at a time.
///
/// Implementations render statements with their own dialect.
#[async_trait::async_trait]
pub trait Session: Send + Sync {
    /// Execute a statement, returning the number of affected rows.
    async fn execute(&self, statement: &Statement) -> MigrateResult<u64>;

    /// Run a query and collect its rows.
    async fn query(&self, statement: &Statement) -> MigrateResult<Vec<Row>>;
}
