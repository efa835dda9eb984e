//! Column descriptors.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Semantic type of a column, independent of any dialect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    /// Boolean.
    Bool,
    /// Signed integer.
    Int,
    /// Unsigned integer.
    Uint,
    /// Floating point.
    Float,
    /// Text. Defaults on textual columns are rendered as escaped literals.
    String,
    /// Date and time.
    Time,
    /// Binary data.
    Bytes,
    /// JSON document.
    Json,
    /// UUID.
    Uuid,
    /// A type only the dialect (or an explicit override) knows how to name.
    Custom(SmolStr),
}

impl DataType {
    /// Check if values of this type are written as quoted literals.
    pub fn is_textual(&self) -> bool {
        matches!(self, Self::String | Self::Uuid)
    }

    /// Get the type name as a string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Uint => "uint",
            Self::Float => "float",
            Self::String => "string",
            Self::Time => "time",
            Self::Bytes => "bytes",
            Self::Json => "json",
            Self::Uuid => "uuid",
            Self::Custom(name) => name.as_str(),
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A column of a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Entity-side field name (e.g. `UserID`).
    pub field: SmolStr,
    /// Database column name (e.g. `user_id`).
    pub name: SmolStr,
    /// Semantic type.
    pub data_type: DataType,
    /// Explicit SQL type, used verbatim when set.
    pub db_type: Option<String>,
    /// Size hint for sized types (varchar length, integer width).
    pub size: Option<u32>,
    /// Numeric precision.
    pub precision: Option<u32>,
    /// Numeric scale.
    pub scale: Option<u32>,
    /// Part of the primary key.
    pub primary_key: bool,
    /// Auto increment.
    pub auto_increment: bool,
    /// NOT NULL.
    pub not_null: bool,
    /// UNIQUE.
    pub unique: bool,
    /// Default value. Textual defaults hold the unescaped value; other
    /// defaults hold a raw SQL token such as `CURRENT_TIMESTAMP`.
    pub default_value: Option<String>,
}

impl ColumnDescriptor {
    /// Create a column whose field name equals its column name.
    pub fn new(name: impl Into<SmolStr>, data_type: DataType) -> Self {
        let name = name.into();
        Self {
            field: name.clone(),
            name,
            data_type,
            db_type: None,
            size: None,
            precision: None,
            scale: None,
            primary_key: false,
            auto_increment: false,
            not_null: false,
            unique: false,
            default_value: None,
        }
    }

    /// Set the entity-side field name.
    pub fn field(mut self, field: impl Into<SmolStr>) -> Self {
        self.field = field.into();
        self
    }

    /// Override the SQL type.
    pub fn db_type(mut self, db_type: impl Into<String>) -> Self {
        self.db_type = Some(db_type.into());
        self
    }

    /// Set the size hint.
    pub fn size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    /// Set precision and scale.
    pub fn precision(mut self, precision: u32, scale: u32) -> Self {
        self.precision = Some(precision);
        self.scale = Some(scale);
        self
    }

    /// Mark as (part of) the primary key.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Mark as auto increment.
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Mark as NOT NULL.
    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Mark as UNIQUE.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Set the default value.
    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// The default value, if one is set and non-empty.
    pub fn default(&self) -> Option<&str> {
        self.default_value.as_deref().filter(|v| !v.is_empty())
    }

    /// Check if the field or column name matches `name`.
    pub fn matches(&self, name: &str) -> bool {
        self.field == name || self.name == name
    }
}
