//! Error types for model description and validation.

// These warnings are false positives - the fields are used by derive macros
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors raised while turning a model into a [`ModelDescriptor`](crate::ModelDescriptor).
#[derive(Error, Debug, Clone, PartialEq, Diagnostic)]
pub enum SchemaError {
    /// The model has no usable table name.
    #[error("model has an empty table name")]
    #[diagnostic(code(strata::schema::empty_table))]
    EmptyTableName,

    /// Invalid model definition.
    #[error("invalid model `{table}`: {message}")]
    #[diagnostic(code(strata::schema::invalid_model))]
    InvalidModel { table: String, message: String },

    /// Invalid column definition.
    #[error("invalid column `{table}.{column}`: {message}")]
    #[diagnostic(code(strata::schema::invalid_column))]
    InvalidColumn {
        table: String,
        column: String,
        message: String,
    },

    /// Invalid relationship definition.
    #[error("invalid relationship `{table}.{relationship}`: {message}")]
    #[diagnostic(code(strata::schema::invalid_relationship))]
    InvalidRelationship {
        table: String,
        relationship: String,
        message: String,
    },

    /// Invalid index definition.
    #[error("invalid index `{table}.{index}`: {message}")]
    #[diagnostic(code(strata::schema::invalid_index))]
    InvalidIndex {
        table: String,
        index: String,
        message: String,
    },

    /// Duplicate definition.
    #[error("duplicate {kind} `{name}` in `{table}`")]
    #[diagnostic(code(strata::schema::duplicate))]
    Duplicate {
        table: String,
        kind: String,
        name: String,
    },

    /// The referenced model could not be described.
    #[error("cannot describe model `{name}`: {message}")]
    #[diagnostic(
        code(strata::schema::unresolved_model),
        help("make sure the model is registered with a descriptor")
    )]
    UnresolvedModel { name: String, message: String },
}

impl SchemaError {
    /// Create an invalid model error.
    pub fn invalid_model(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidModel {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Create an invalid column error.
    pub fn invalid_column(
        table: impl Into<String>,
        column: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidColumn {
            table: table.into(),
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create an invalid relationship error.
    pub fn invalid_relationship(
        table: impl Into<String>,
        relationship: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidRelationship {
            table: table.into(),
            relationship: relationship.into(),
            message: message.into(),
        }
    }

    /// Create an invalid index error.
    pub fn invalid_index(
        table: impl Into<String>,
        index: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidIndex {
            table: table.into(),
            index: index.into(),
            message: message.into(),
        }
    }

    /// Create a duplicate definition error.
    pub fn duplicate(
        table: impl Into<String>,
        kind: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self::Duplicate {
            table: table.into(),
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Create an unresolved model error.
    pub fn unresolved(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UnresolvedModel {
            name: name.into(),
            message: message.into(),
        }
    }
}
