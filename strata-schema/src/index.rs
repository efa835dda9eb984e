//! Index and check-constraint descriptors.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Sort direction of an index column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
    /// Ascending order.
    #[default]
    Asc,
    /// Descending order.
    Desc,
}

impl SortOrder {
    /// Get the SQL keyword.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// One entry of an index: a column or an expression.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IndexOption {
    /// Indexed column name.
    pub column: SmolStr,
    /// Raw SQL expression replacing the column.
    pub expression: Option<String>,
    /// Prefix length for prefix-indexable types.
    pub length: Option<u32>,
    /// Collation.
    pub collate: Option<SmolStr>,
    /// Sort direction.
    pub sort: Option<SortOrder>,
}

impl IndexOption {
    /// Index a column.
    pub fn column(column: impl Into<SmolStr>) -> Self {
        Self {
            column: column.into(),
            ..Default::default()
        }
    }

    /// Index an expression.
    pub fn expression(expression: impl Into<String>) -> Self {
        Self {
            expression: Some(expression.into()),
            ..Default::default()
        }
    }

    /// Set the prefix length.
    pub fn length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    /// Set the collation.
    pub fn collate(mut self, collate: impl Into<SmolStr>) -> Self {
        self.collate = Some(collate.into());
        self
    }

    /// Set the sort direction.
    pub fn sort(mut self, sort: SortOrder) -> Self {
        self.sort = Some(sort);
        self
    }
}

/// An index on a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDescriptor {
    /// Index name.
    pub name: SmolStr,
    /// Indexed columns or expressions, in order.
    pub fields: Vec<IndexOption>,
    /// Index class (`UNIQUE`, `FULLTEXT`, `SPATIAL`).
    pub class: Option<SmolStr>,
    /// Index type (`BTREE`, `HASH`).
    pub index_type: Option<SmolStr>,
    /// Index comment.
    pub comment: Option<String>,
}

impl IndexDescriptor {
    /// Create an index over `fields`.
    pub fn new(name: impl Into<SmolStr>, fields: Vec<IndexOption>) -> Self {
        Self {
            name: name.into(),
            fields,
            class: None,
            index_type: None,
            comment: None,
        }
    }

    /// Create a unique index over `fields`.
    pub fn unique(name: impl Into<SmolStr>, fields: Vec<IndexOption>) -> Self {
        Self::new(name, fields).class("UNIQUE")
    }

    /// Set the index class.
    pub fn class(mut self, class: impl Into<SmolStr>) -> Self {
        self.class = Some(class.into());
        self
    }

    /// Set the index type.
    pub fn index_type(mut self, index_type: impl Into<SmolStr>) -> Self {
        self.index_type = Some(index_type.into());
        self
    }

    /// Set the comment.
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Check if the index covers `column`.
    pub fn covers(&self, column: &str) -> bool {
        self.fields.iter().any(|f| f.column == column)
    }
}

/// A named `CHECK` constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckConstraintDescriptor {
    /// Constraint name.
    pub name: SmolStr,
    /// Boolean SQL expression.
    pub expression: String,
    /// Field the check was declared on, if any.
    pub field: Option<SmolStr>,
}

impl CheckConstraintDescriptor {
    /// Create a check constraint.
    pub fn new(name: impl Into<SmolStr>, expression: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expression: expression.into(),
            field: None,
        }
    }

    /// Attach the check to a field.
    pub fn field(mut self, field: impl Into<SmolStr>) -> Self {
        self.field = Some(field.into());
        self
    }
}
