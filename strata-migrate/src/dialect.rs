//! Dialect rules: quoting, literal escaping and type naming.

use strata_schema::{ColumnDescriptor, DataType, IndexOption};

use crate::statement::{SqlValue, Statement};

/// Database-specific rendering rules, chosen once per migrator.
pub trait Dialect: Send + Sync + std::fmt::Debug {
    /// Dialect name for logging.
    fn name(&self) -> &'static str;

    /// Quote a single identifier.
    fn quote_identifier(&self, ident: &str) -> String;

    /// Quote a table name, honoring `schema.table` qualification.
    fn quote_table(&self, table: &str) -> String {
        table
            .split('.')
            .map(|part| self.quote_identifier(part))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Render a string as an escaped SQL literal.
    fn explain(&self, value: &str) -> String;

    /// Render a bound value as a SQL literal.
    fn explain_value(&self, value: &SqlValue) -> String {
        match value {
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Int(v) => v.to_string(),
            SqlValue::Text(s) => self.explain(s),
        }
    }

    /// Name the SQL type of a column. May return an empty string for types
    /// the dialect does not know.
    fn data_type_of(&self, column: &ColumnDescriptor) -> String;

    /// Query returning the current database name in its first column.
    fn current_database(&self) -> Statement;

    /// Render one index entry: the quoted column, or the expression in its
    /// place; a positive prefix length only applies to columns.
    fn build_index_option(&self, option: &IndexOption) -> String {
        let mut sql = match &option.expression {
            Some(expr) if !expr.is_empty() => expr.clone(),
            _ => {
                let mut col = self.quote_identifier(&option.column);
                if let Some(length) = option.length.filter(|l| *l > 0) {
                    col.push_str(&format!("({length})"));
                }
                col
            }
        };

        if let Some(collate) = option.collate.as_ref().filter(|c| !c.is_empty()) {
            sql.push_str(" COLLATE ");
            sql.push_str(collate);
        }
        if let Some(sort) = option.sort {
            sql.push(' ');
            sql.push_str(sort.as_str());
        }

        sql
    }

    /// Template for altering a column's type: table, column, full type.
    fn alter_column_template(&self) -> &'static str {
        "ALTER TABLE ? ALTER COLUMN ? TYPE ?"
    }
}

/// MySQL rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct MysqlDialect;

impl MysqlDialect {
    fn int_type(size: Option<u32>) -> &'static str {
        match size {
            Some(s) if s <= 8 => "tinyint",
            Some(s) if s <= 16 => "smallint",
            Some(s) if s <= 24 => "mediumint",
            Some(s) if s <= 32 => "int",
            _ => "bigint",
        }
    }
}

impl Dialect for MysqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        format!("`{}`", ident.replace('`', "``"))
    }

    fn explain(&self, value: &str) -> String {
        let escaped = value.replace('\\', "\\\\").replace('\'', "''");
        format!("'{escaped}'")
    }

    fn data_type_of(&self, column: &ColumnDescriptor) -> String {
        match &column.data_type {
            DataType::Bool => "boolean".to_string(),
            DataType::Int => Self::int_type(column.size).to_string(),
            DataType::Uint => format!("{} unsigned", Self::int_type(column.size)),
            DataType::Float => match (column.precision, column.scale) {
                (Some(p), Some(s)) if p > 0 => format!("decimal({p},{s})"),
                _ if column.size.is_some_and(|s| s <= 32) => "float".to_string(),
                _ => "double".to_string(),
            },
            DataType::String => match column.size {
                Some(s @ 1..=65535) => format!("varchar({s})"),
                Some(65536..=16_777_215) => "mediumtext".to_string(),
                Some(s) if s > 0 => "longtext".to_string(),
                // Keyed text columns need a bounded length.
                _ if column.primary_key || column.unique => "varchar(191)".to_string(),
                _ => "longtext".to_string(),
            },
            DataType::Time => match column.precision {
                Some(p) if p > 0 => format!("datetime({p})"),
                Some(_) => "datetime".to_string(),
                None => "datetime(3)".to_string(),
            },
            DataType::Bytes => match column.size {
                Some(s @ 1..=65535) => format!("varbinary({s})"),
                _ => "longblob".to_string(),
            },
            DataType::Json => "json".to_string(),
            DataType::Uuid => "char(36)".to_string(),
            DataType::Custom(name) => name.to_string(),
        }
    }

    fn current_database(&self) -> Statement {
        Statement::new("SELECT DATABASE()")
    }

    fn alter_column_template(&self) -> &'static str {
        "ALTER TABLE ? MODIFY COLUMN ? ?"
    }
}
