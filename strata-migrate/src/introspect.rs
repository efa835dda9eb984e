//! Catalog queries against the live database.
//!
//! Existence checks never fail: a query error is logged and reported as
//! "not found".

use tracing::debug;

use crate::dialect::Dialect;
use crate::error::{MigrateResult, MigrationError};
use crate::session::Session;
use crate::statement::{Arg, Statement};

/// A live column as reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnType {
    /// Column name.
    pub name: String,
    /// Full column type (e.g. `varchar(64)`).
    pub data_type: String,
    /// Whether the column accepts NULL.
    pub nullable: bool,
    /// Default expression.
    pub default: Option<String>,
}

/// Read-only view of the current database schema.
pub struct Introspector<'a> {
    session: &'a dyn Session,
    dialect: &'a dyn Dialect,
}

impl<'a> Introspector<'a> {
    /// Create an introspector over a session.
    pub fn new(session: &'a dyn Session, dialect: &'a dyn Dialect) -> Self {
        Self { session, dialect }
    }

    /// Name of the current database.
    pub async fn current_database(&self) -> MigrateResult<String> {
        let statement = self.dialect.current_database();
        let rows = self.session.query(&statement).await?;
        rows.first()
            .and_then(|row| row.get_str(0))
            .map(str::to_string)
            .ok_or_else(|| {
                MigrationError::exec(
                    statement.to_sql(self.dialect),
                    "no database selected",
                )
            })
    }

    /// Check if a base table exists.
    pub async fn has_table(&self, table: &str) -> bool {
        self.exists(table, |db| {
            Statement::new(
                "SELECT count(*) FROM information_schema.tables WHERE table_schema = ? AND table_name = ? AND table_type = ?",
            )
            .arg(Arg::value(db))
            .arg(Arg::value(table))
            .arg(Arg::value("BASE TABLE"))
        })
        .await
    }

    /// Check if a column exists.
    pub async fn has_column(&self, table: &str, column: &str) -> bool {
        self.exists(table, |db| {
            Statement::new(
                "SELECT count(*) FROM information_schema.columns WHERE table_schema = ? AND table_name = ? AND column_name = ?",
            )
            .arg(Arg::value(db))
            .arg(Arg::value(table))
            .arg(Arg::value(column))
        })
        .await
    }

    /// Check if a foreign-key or check constraint exists.
    pub async fn has_constraint(&self, table: &str, name: &str) -> bool {
        self.exists(table, |db| {
            Statement::new(
                "SELECT count(*) FROM information_schema.table_constraints WHERE constraint_schema = ? AND table_name = ? AND constraint_name = ?",
            )
            .arg(Arg::value(db))
            .arg(Arg::value(table))
            .arg(Arg::value(name))
        })
        .await
    }

    /// Check if an index exists.
    pub async fn has_index(&self, table: &str, name: &str) -> bool {
        self.exists(table, |db| {
            Statement::new(
                "SELECT count(*) FROM information_schema.statistics WHERE table_schema = ? AND table_name = ? AND index_name = ?",
            )
            .arg(Arg::value(db))
            .arg(Arg::value(table))
            .arg(Arg::value(name))
        })
        .await
    }

    /// Columns of a table, in ordinal order.
    pub async fn column_types(&self, table: &str) -> MigrateResult<Vec<ColumnType>> {
        let db = self.current_database().await?;
        let statement = Statement::new(
            "SELECT column_name, column_type, is_nullable, column_default FROM information_schema.columns WHERE table_schema = ? AND table_name = ? ORDER BY ordinal_position",
        )
        .arg(Arg::value(db))
        .arg(Arg::value(table));

        let rows = self.session.query(&statement).await?;
        Ok(rows
            .iter()
            .filter_map(|row| {
                Some(ColumnType {
                    name: row.get_str(0)?.to_string(),
                    data_type: row.get_str(1).unwrap_or_default().to_string(),
                    nullable: row
                        .get_str(2)
                        .is_some_and(|v| v.eq_ignore_ascii_case("YES")),
                    default: row.get_str(3).map(str::to_string),
                })
            })
            .collect())
    }

    async fn exists<F>(&self, table: &str, build: F) -> bool
    where
        F: FnOnce(String) -> Statement,
    {
        let db = match self.current_database().await {
            Ok(db) => db,
            Err(e) => {
                debug!(table = %table, error = %e, "Cannot determine current database");
                return false;
            }
        };

        let statement = build(db);
        match self.session.query(&statement).await {
            Ok(rows) => rows.first().and_then(|r| r.get_i64(0)).unwrap_or(0) > 0,
            Err(e) => {
                debug!(table = %table, error = %e, "Catalog query failed");
                false
            }
        }
    }
}
