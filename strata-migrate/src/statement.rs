//! Statement templates with positional arguments.
//!
//! A [`Statement`] is a SQL template in which every `?` is filled by the next
//! [`Arg`]. Identifiers are quoted by the [`Dialect`] at render time, raw
//! fragments are spliced verbatim, and values stay bound parameters.
//!
//! ```rust
//! use strata_migrate::{Arg, MysqlDialect, Statement};
//!
//! let stmt = Statement::new("ALTER TABLE ? RENAME COLUMN ? TO ?")
//!     .arg(Arg::table("users"))
//!     .arg(Arg::column("name"))
//!     .arg(Arg::column("full_name"));
//!
//! assert_eq!(
//!     stmt.to_sql(&MysqlDialect),
//!     "ALTER TABLE `users` RENAME COLUMN `name` TO `full_name`"
//! );
//! ```

use smol_str::SmolStr;

use crate::dialect::Dialect;

/// A bound value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    /// SQL NULL.
    Null,
    /// Integer.
    Int(i64),
    /// Text.
    Text(String),
}

impl SqlValue {
    /// Get the value as an integer, parsing text if needed.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Null => None,
        }
    }

    /// Get the value as text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Check if the value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

/// One template argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// A table name, possibly schema-qualified.
    Table(SmolStr),
    /// A column name.
    Column(SmolStr),
    /// A constraint or index name.
    Name(SmolStr),
    /// A parenthesized list of column names.
    Columns(Vec<SmolStr>),
    /// A fragment spliced verbatim.
    Raw(String),
    /// A parenthesized list of verbatim fragments.
    RawList(Vec<String>),
    /// A bound value.
    Value(SqlValue),
}

impl Arg {
    /// A table argument.
    pub fn table(name: impl Into<SmolStr>) -> Self {
        Self::Table(name.into())
    }

    /// A column argument.
    pub fn column(name: impl Into<SmolStr>) -> Self {
        Self::Column(name.into())
    }

    /// A constraint or index name argument.
    pub fn name(name: impl Into<SmolStr>) -> Self {
        Self::Name(name.into())
    }

    /// A column list argument.
    pub fn columns<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        Self::Columns(names.into_iter().map(Into::into).collect())
    }

    /// A raw fragment.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::Raw(sql.into())
    }

    /// A bound value.
    pub fn value(value: impl Into<SqlValue>) -> Self {
        Self::Value(value.into())
    }

    fn write(&self, dialect: &dyn Dialect, out: &mut String, params: Option<&mut Vec<SqlValue>>) {
        match self {
            Self::Table(name) => out.push_str(&dialect.quote_table(name)),
            Self::Column(name) | Self::Name(name) => {
                out.push_str(&dialect.quote_identifier(name))
            }
            Self::Columns(names) => {
                let quoted: Vec<String> =
                    names.iter().map(|n| dialect.quote_identifier(n)).collect();
                out.push('(');
                out.push_str(&quoted.join(","));
                out.push(')');
            }
            Self::Raw(sql) => out.push_str(sql),
            Self::RawList(parts) => {
                out.push('(');
                out.push_str(&parts.join(","));
                out.push(')');
            }
            Self::Value(value) => match params {
                Some(params) => {
                    out.push('?');
                    params.push(value.clone());
                }
                None => out.push_str(&dialect.explain_value(value)),
            },
        }
    }
}

/// A SQL template plus its ordered arguments.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Statement {
    sql: String,
    args: Vec<Arg>,
}

impl Statement {
    /// Create a statement from a template.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            args: Vec::new(),
        }
    }

    /// Append an argument.
    pub fn arg(mut self, arg: Arg) -> Self {
        self.args.push(arg);
        self
    }

    /// Append several arguments.
    pub fn args(mut self, args: impl IntoIterator<Item = Arg>) -> Self {
        self.args.extend(args);
        self
    }

    /// Append another statement's template and arguments.
    pub fn push(&mut self, other: Statement) {
        self.sql.push_str(&other.sql);
        self.args.extend(other.args);
    }

    /// Append template text without arguments.
    pub fn push_sql(&mut self, sql: &str) {
        self.sql.push_str(sql);
    }

    /// Join fragments with a separator.
    pub fn join(parts: impl IntoIterator<Item = Statement>, sep: &str) -> Self {
        let mut out = Statement::default();
        for (i, part) in parts.into_iter().enumerate() {
            if i > 0 {
                out.sql.push_str(sep);
            }
            out.push(part);
        }
        out
    }

    /// The template.
    pub fn template(&self) -> &str {
        &self.sql
    }

    /// The arguments.
    pub fn arguments(&self) -> &[Arg] {
        &self.args
    }

    /// Render to SQL with `?` placeholders for values, plus the values.
    pub fn render(&self, dialect: &dyn Dialect) -> (String, Vec<SqlValue>) {
        let mut params = Vec::new();
        let sql = self.substitute(dialect, Some(&mut params));
        (sql, params)
    }

    /// Render to SQL with values inlined as escaped literals.
    pub fn to_sql(&self, dialect: &dyn Dialect) -> String {
        self.substitute(dialect, None)
    }

    // Single pass: placeholders inside substituted arguments are never
    // expanded again. Surplus placeholders stay literal.
    fn substitute(&self, dialect: &dyn Dialect, mut params: Option<&mut Vec<SqlValue>>) -> String {
        let mut out = String::with_capacity(self.sql.len() + self.args.len() * 8);
        let mut args = self.args.iter();

        for ch in self.sql.chars() {
            if ch != '?' {
                out.push(ch);
                continue;
            }
            match args.next() {
                Some(arg) => arg.write(dialect, &mut out, params.as_deref_mut()),
                None => out.push('?'),
            }
        }

        out
    }
}
