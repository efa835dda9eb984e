//! Migrator configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{MigrateResult, MigrationError};

/// Configuration for the [`Migrator`](crate::Migrator).
///
/// Can be built in code or loaded from TOML:
///
/// ```toml
/// create_index_after_create_table = true
/// table_options = "ENGINE=InnoDB"
/// auto_migrate_indexes = false
/// dry_run = false
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MigratorConfig {
    /// Create indexes with separate statements after `CREATE TABLE` instead
    /// of inline.
    pub create_index_after_create_table: bool,
    /// Options appended to every `CREATE TABLE`.
    pub table_options: Option<String>,
    /// Let `auto_migrate` create missing indexes on existing tables.
    pub auto_migrate_indexes: bool,
    /// Render DDL into the report without executing it.
    pub dry_run: bool,
}

impl MigratorConfig {
    /// Create a new configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Defer index creation until after the table exists.
    pub fn create_index_after_create_table(mut self, defer: bool) -> Self {
        self.create_index_after_create_table = defer;
        self
    }

    /// Set the table options.
    pub fn table_options(mut self, options: impl Into<String>) -> Self {
        self.table_options = Some(options.into());
        self
    }

    /// Create missing indexes during `auto_migrate`.
    pub fn auto_migrate_indexes(mut self, enabled: bool) -> Self {
        self.auto_migrate_indexes = enabled;
        self
    }

    /// Enable dry-run mode.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Load configuration from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> MigrateResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            MigrationError::config(format!("cannot read {}: {e}", path.display()))
        })?;

        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> MigrateResult<Self> {
        toml::from_str(content).map_err(|e| MigrationError::config(e.to_string()))
    }

    /// The table options, if set and non-blank.
    pub fn table_options_clause(&self) -> Option<&str> {
        self.table_options
            .as_deref()
            .map(str::trim)
            .filter(|o| !o.is_empty())
    }
}
