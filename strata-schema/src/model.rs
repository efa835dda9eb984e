//! Model descriptors and the ways callers refer to models.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::column::ColumnDescriptor;
use crate::error::{SchemaError, SchemaResult};
use crate::index::{CheckConstraintDescriptor, IndexDescriptor};
use crate::relation::{ConstraintDescriptor, RelationshipDescriptor};

/// An entity type that can describe its table.
///
/// Every entity registers a descriptor constructor; nothing is discovered
/// at runtime.
///
/// ```rust
/// use strata_schema::{ColumnDescriptor, DataType, Model, ModelDescriptor, SchemaResult};
///
/// struct Tag;
///
/// impl Model for Tag {
///     fn describe() -> SchemaResult<ModelDescriptor> {
///         ModelDescriptor::builder("tags")
///             .column(ColumnDescriptor::new("id", DataType::Int).primary_key())
///             .column(ColumnDescriptor::new("label", DataType::String).not_null())
///             .build()
///     }
/// }
///
/// assert_eq!(Tag::describe().unwrap().table, "tags");
/// ```
pub trait Model {
    /// Build the descriptor for this entity.
    fn describe() -> SchemaResult<ModelDescriptor>;
}

/// Structured metadata for one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Table name.
    pub table: SmolStr,
    /// Columns, in declaration order.
    pub columns: Vec<ColumnDescriptor>,
    /// Relationships, in declaration order.
    pub relationships: Vec<RelationshipDescriptor>,
    /// Indexes, in declaration order.
    pub indexes: Vec<IndexDescriptor>,
    /// Check constraints, in declaration order.
    pub checks: Vec<CheckConstraintDescriptor>,
}

impl ModelDescriptor {
    /// Start describing `table`.
    pub fn builder(table: impl Into<SmolStr>) -> ModelBuilder {
        ModelBuilder::new(table)
    }

    /// Look up a column by field or column name.
    pub fn look_up_field(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .or_else(|| self.columns.iter().find(|c| c.field == name))
    }

    /// Look up an index by name, or by the name of a field it covers.
    pub fn look_index(&self, name: &str) -> Option<&IndexDescriptor> {
        if let Some(idx) = self.indexes.iter().find(|i| i.name == name) {
            return Some(idx);
        }

        let column = self.look_up_field(name).map(|c| c.name.as_str())?;
        self.indexes.iter().find(|i| i.covers(column))
    }

    /// Look up a check constraint by name.
    pub fn check_constraint(&self, name: &str) -> Option<&CheckConstraintDescriptor> {
        self.checks.iter().find(|c| c.name == name)
    }

    /// Look up a foreign-key constraint by name.
    pub fn foreign_key(&self, name: &str) -> Option<&ConstraintDescriptor> {
        self.constraints().find(|c| c.name == name)
    }

    /// All foreign-key constraints implied by relationships.
    pub fn constraints(&self) -> impl Iterator<Item = &ConstraintDescriptor> {
        self.relationships.iter().filter_map(|r| r.parse_constraint())
    }

    /// Join-table models of many-to-many relationships.
    pub fn join_tables(&self) -> impl Iterator<Item = &ModelSource> {
        self.relationships.iter().filter_map(|r| r.join_table.as_ref())
    }

    /// Primary-key columns, in declaration order.
    pub fn primary_fields(&self) -> Vec<&ColumnDescriptor> {
        self.columns.iter().filter(|c| c.primary_key).collect()
    }

    /// Tables this model references through foreign keys, self-references
    /// excluded.
    pub fn dependencies(&self) -> Vec<&ConstraintDescriptor> {
        self.constraints().filter(|c| !c.is_self_reference()).collect()
    }
}

/// Builder for [`ModelDescriptor`]; `build` validates the description.
#[derive(Debug, Clone)]
pub struct ModelBuilder {
    model: ModelDescriptor,
}

impl ModelBuilder {
    /// Create a builder for `table`.
    pub fn new(table: impl Into<SmolStr>) -> Self {
        Self {
            model: ModelDescriptor {
                table: table.into(),
                columns: vec![],
                relationships: vec![],
                indexes: vec![],
                checks: vec![],
            },
        }
    }

    /// Add a column.
    pub fn column(mut self, column: ColumnDescriptor) -> Self {
        self.model.columns.push(column);
        self
    }

    /// Add a relationship.
    pub fn relationship(mut self, relationship: RelationshipDescriptor) -> Self {
        self.model.relationships.push(relationship);
        self
    }

    /// Add an index.
    pub fn index(mut self, index: IndexDescriptor) -> Self {
        self.model.indexes.push(index);
        self
    }

    /// Add a check constraint.
    pub fn check(mut self, check: CheckConstraintDescriptor) -> Self {
        self.model.checks.push(check);
        self
    }

    /// Validate and return the descriptor.
    pub fn build(mut self) -> SchemaResult<ModelDescriptor> {
        let table = self.model.table.clone();
        if table.trim().is_empty() {
            return Err(SchemaError::EmptyTableName);
        }

        let mut columns = HashSet::new();
        for column in &self.model.columns {
            if column.name.is_empty() {
                return Err(SchemaError::invalid_column(
                    table.as_str(),
                    column.field.as_str(),
                    "column name is empty",
                ));
            }
            if !columns.insert(column.name.clone()) {
                return Err(SchemaError::duplicate(
                    table.as_str(),
                    "column",
                    column.name.as_str(),
                ));
            }
        }

        let mut constraints = HashSet::new();
        for rel in &mut self.model.relationships {
            let Some(constraint) = rel.constraint.as_mut() else {
                continue;
            };
            constraint.table = table.clone();

            if constraint.name.is_empty() {
                return Err(SchemaError::invalid_relationship(
                    table.as_str(),
                    rel.name.as_str(),
                    "foreign key has no name",
                ));
            }
            if constraint.foreign_keys.is_empty()
                || constraint.foreign_keys.len() != constraint.references.len()
            {
                return Err(SchemaError::invalid_relationship(
                    table.as_str(),
                    rel.name.as_str(),
                    format!(
                        "foreign key `{}` has {} column(s) but references {}",
                        constraint.name,
                        constraint.foreign_keys.len(),
                        constraint.references.len()
                    ),
                ));
            }
            if !constraints.insert(constraint.name.clone()) {
                return Err(SchemaError::duplicate(
                    table.as_str(),
                    "constraint",
                    constraint.name.as_str(),
                ));
            }
        }

        for check in &self.model.checks {
            if check.name.is_empty() || check.expression.trim().is_empty() {
                return Err(SchemaError::invalid_model(
                    table.as_str(),
                    "check constraints need a name and an expression",
                ));
            }
            if !constraints.insert(check.name.clone()) {
                return Err(SchemaError::duplicate(
                    table.as_str(),
                    "constraint",
                    check.name.as_str(),
                ));
            }
        }

        let mut indexes = HashSet::new();
        for index in &self.model.indexes {
            if index.name.is_empty() {
                return Err(SchemaError::invalid_index(
                    table.as_str(),
                    "",
                    "index has no name",
                ));
            }
            if index.fields.is_empty() {
                return Err(SchemaError::invalid_index(
                    table.as_str(),
                    index.name.as_str(),
                    "index has no columns",
                ));
            }
            if index
                .fields
                .iter()
                .any(|f| f.column.is_empty() && f.expression.is_none())
            {
                return Err(SchemaError::invalid_index(
                    table.as_str(),
                    index.name.as_str(),
                    "index entries need a column or an expression",
                ));
            }
            if !indexes.insert(index.name.clone()) {
                return Err(SchemaError::duplicate(
                    table.as_str(),
                    "index",
                    index.name.as_str(),
                ));
            }
        }

        tracing::trace!(
            table = %table,
            columns = self.model.columns.len(),
            relationships = self.model.relationships.len(),
            "Described model"
        );
        Ok(self.model)
    }
}

/// A shareable factory producing a [`ModelDescriptor`].
///
/// Stands in for "instantiate the referenced entity and describe it" when a
/// model has to be pulled into a migration it was not listed in.
#[derive(Clone)]
pub struct ModelSource {
    name: SmolStr,
    build: Arc<dyn Fn() -> SchemaResult<ModelDescriptor> + Send + Sync>,
}

impl ModelSource {
    /// Create a source from a constructor.
    pub fn new<F>(name: impl Into<SmolStr>, build: F) -> Self
    where
        F: Fn() -> SchemaResult<ModelDescriptor> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            build: Arc::new(build),
        }
    }

    /// Source for an entity type.
    pub fn of<T: Model + 'static>() -> Self {
        let name = std::any::type_name::<T>()
            .rsplit("::")
            .next()
            .unwrap_or_default();
        Self::new(name, T::describe)
    }

    /// Source returning a copy of an existing descriptor.
    pub fn from_descriptor(model: ModelDescriptor) -> Self {
        let name = model.table.clone();
        Self::new(name, move || Ok(model.clone()))
    }

    /// A human-readable name for diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Build the descriptor.
    pub fn describe(&self) -> SchemaResult<ModelDescriptor> {
        (self.build)()
    }
}

impl std::fmt::Debug for ModelSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelSource")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl PartialEq for ModelSource {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

/// A reference to a model: either a literal table name or something that
/// can be described.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelRef {
    /// A literal table name; carries no descriptor.
    Table(SmolStr),
    /// A describable model.
    Model(ModelSource),
}

impl ModelRef {
    /// Reference an entity type.
    pub fn of<T: Model + 'static>() -> Self {
        Self::Model(ModelSource::of::<T>())
    }

    /// Reference a literal table name.
    pub fn table(name: impl Into<SmolStr>) -> Self {
        Self::Table(name.into())
    }

    /// The literal table name, if this is one.
    pub fn as_table(&self) -> Option<&str> {
        match self {
            Self::Table(name) => Some(name),
            Self::Model(_) => None,
        }
    }

    /// A display name: the table name or the model source name.
    pub fn name(&self) -> &str {
        match self {
            Self::Table(name) => name,
            Self::Model(source) => source.name(),
        }
    }
}

impl From<&str> for ModelRef {
    fn from(name: &str) -> Self {
        Self::Table(name.into())
    }
}

impl From<String> for ModelRef {
    fn from(name: String) -> Self {
        Self::Table(name.into())
    }
}

impl From<ModelSource> for ModelRef {
    fn from(source: ModelSource) -> Self {
        Self::Model(source)
    }
}

impl From<ModelDescriptor> for ModelRef {
    fn from(model: ModelDescriptor) -> Self {
        Self::Model(ModelSource::from_descriptor(model))
    }
}

impl std::fmt::Display for ModelRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::DataType;
    use crate::index::IndexOption;

    fn users() -> ModelBuilder {
        ModelDescriptor::builder("users")
            .column(
                ColumnDescriptor::new("id", DataType::Int)
                    .field("ID")
                    .primary_key()
                    .auto_increment(),
            )
            .column(ColumnDescriptor::new("name", DataType::String).field("Name"))
    }

    #[test]
    fn test_build_valid_model() {
        let model = users()
            .index(IndexDescriptor::new(
                "idx_users_name",
                vec![IndexOption::column("name")],
            ))
            .build()
            .unwrap();

        assert_eq!(model.table, "users");
        assert_eq!(model.columns.len(), 2);
        assert_eq!(model.primary_fields().len(), 1);
    }

    #[test]
    fn test_empty_table_name() {
        let err = ModelDescriptor::builder("  ").build().unwrap_err();
        assert_eq!(err, SchemaError::EmptyTableName);
    }

    #[test]
    fn test_duplicate_column() {
        let err = users()
            .column(ColumnDescriptor::new("name", DataType::String))
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::Duplicate { ref kind, .. } if kind == "column"));
    }

    #[test]
    fn test_mismatched_foreign_key_columns() {
        let err = users()
            .relationship(RelationshipDescriptor::belongs_to(
                "Team",
                ConstraintDescriptor::foreign_key("fk_users_team", "teams")
                    .columns(["team_id", "team_region"])
                    .references(["id"]),
            ))
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidRelationship { .. }));
    }

    #[test]
    fn test_index_without_columns() {
        let err = users()
            .index(IndexDescriptor::new("idx_empty", vec![]))
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidIndex { .. }));
    }

    #[test]
    fn test_constraint_owner_is_filled_in() {
        let model = users()
            .relationship(RelationshipDescriptor::belongs_to(
                "Team",
                ConstraintDescriptor::foreign_key("fk_users_team", "teams")
                    .columns(["team_id"])
                    .references(["id"]),
            ))
            .build()
            .unwrap();

        let fk = model.foreign_key("fk_users_team").unwrap();
        assert_eq!(fk.table, "users");
        assert_eq!(model.dependencies().len(), 1);
    }

    #[test]
    fn test_self_reference_is_not_a_dependency() {
        let model = users()
            .relationship(RelationshipDescriptor::belongs_to(
                "Manager",
                ConstraintDescriptor::foreign_key("fk_users_manager", "users")
                    .columns(["manager_id"])
                    .references(["id"]),
            ))
            .build()
            .unwrap();

        assert_eq!(model.constraints().count(), 1);
        assert!(model.dependencies().is_empty());
    }

    #[test]
    fn test_look_up_field() {
        let model = users().build().unwrap();
        assert_eq!(model.look_up_field("Name").unwrap().name, "name");
        assert_eq!(model.look_up_field("name").unwrap().field, "Name");
        assert!(model.look_up_field("email").is_none());
    }

    #[test]
    fn test_look_index_by_field() {
        let model = users()
            .index(IndexDescriptor::new(
                "idx_users_name",
                vec![IndexOption::column("name")],
            ))
            .build()
            .unwrap();

        assert_eq!(model.look_index("idx_users_name").unwrap().name, "idx_users_name");
        assert_eq!(model.look_index("Name").unwrap().name, "idx_users_name");
        assert!(model.look_index("idx_missing").is_none());
    }

    #[test]
    fn test_descriptor_json_skips_sources() {
        let model = users()
            .relationship(RelationshipDescriptor::belongs_to(
                "Team",
                ConstraintDescriptor::foreign_key("fk_users_team", "teams")
                    .columns(["team_id"])
                    .references(["id"])
                    .reference_model(ModelSource::of::<Team>()),
            ))
            .build()
            .unwrap();

        let json = serde_json::to_value(&model).unwrap();
        assert_eq!(json["table"], "users");
        assert!(json["relationships"][0]["constraint"]
            .get("reference_model")
            .is_none());

        let back: ModelDescriptor = serde_json::from_value(json).unwrap();
        assert!(back.relationships[0].constraint.as_ref().unwrap().reference_model.is_none());
    }

    struct Team;

    impl Model for Team {
        fn describe() -> SchemaResult<ModelDescriptor> {
            ModelDescriptor::builder("teams")
                .column(ColumnDescriptor::new("id", DataType::Int).primary_key())
                .build()
        }
    }

    #[test]
    fn test_model_ref_of_type() {
        let r = ModelRef::of::<Team>();
        assert_eq!(r.name(), "Team");
        assert!(r.as_table().is_none());

        let ModelRef::Model(source) = r else {
            panic!("expected a model reference");
        };
        assert_eq!(source.describe().unwrap().table, "teams");
    }

    #[test]
    fn test_model_ref_from_str() {
        let r: ModelRef = "audit_log".into();
        assert_eq!(r.as_table(), Some("audit_log"));
        assert_eq!(r.to_string(), "audit_log");
    }
}
