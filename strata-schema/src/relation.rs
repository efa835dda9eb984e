//! Relationships, foreign-key constraints and join tables.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::column::{ColumnDescriptor, DataType};
use crate::error::SchemaResult;
use crate::model::{ModelDescriptor, ModelSource};

/// The kind of relationship between two models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationKind {
    /// This model holds the foreign key.
    BelongsTo,
    /// The other model holds a foreign key to this one (single row).
    HasOne,
    /// The other model holds a foreign key to this one (many rows).
    HasMany,
    /// Both sides are linked through a join table.
    ManyToMany,
}

impl RelationKind {
    /// Check if this side of the relationship owns the foreign key.
    pub fn owns_foreign_key(&self) -> bool {
        matches!(self, Self::BelongsTo)
    }
}

impl std::fmt::Display for RelationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BelongsTo => write!(f, "n:1"),
            Self::HasOne => write!(f, "1:1"),
            Self::HasMany => write!(f, "1:n"),
            Self::ManyToMany => write!(f, "m:n"),
        }
    }
}

/// Referential action for foreign keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferentialAction {
    /// Cascade the operation.
    Cascade,
    /// Restrict the operation (error if references exist).
    Restrict,
    /// No action (deferred check).
    NoAction,
    /// Set to null.
    SetNull,
    /// Set to default value.
    SetDefault,
}

impl ReferentialAction {
    /// Parse from string (`Cascade`, `SET NULL`, `set_null`, ...).
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().replace(['_', ' '], "").as_str() {
            "CASCADE" => Some(Self::Cascade),
            "RESTRICT" => Some(Self::Restrict),
            "NOACTION" => Some(Self::NoAction),
            "SETNULL" => Some(Self::SetNull),
            "SETDEFAULT" => Some(Self::SetDefault),
            _ => None,
        }
    }

    /// Get the SQL keyword(s).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cascade => "CASCADE",
            Self::Restrict => "RESTRICT",
            Self::NoAction => "NO ACTION",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
        }
    }
}

/// A foreign-key constraint owned by one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintDescriptor {
    /// Constraint name.
    pub name: SmolStr,
    /// Table holding the foreign key. Filled in by the model builder.
    pub table: SmolStr,
    /// Field that introduced the constraint, if any.
    pub field: Option<SmolStr>,
    /// Foreign-key columns, in order.
    pub foreign_keys: Vec<SmolStr>,
    /// Referenced table.
    pub reference_table: SmolStr,
    /// Referenced columns, in order.
    pub references: Vec<SmolStr>,
    /// How to describe the referenced model when it is not part of the
    /// migration set.
    #[serde(skip)]
    pub reference_model: Option<ModelSource>,
    /// ON DELETE action.
    pub on_delete: Option<ReferentialAction>,
    /// ON UPDATE action.
    pub on_update: Option<ReferentialAction>,
}

impl ConstraintDescriptor {
    /// Create a foreign key `name` referencing `reference_table`.
    pub fn foreign_key(name: impl Into<SmolStr>, reference_table: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            table: SmolStr::default(),
            field: None,
            foreign_keys: vec![],
            reference_table: reference_table.into(),
            references: vec![],
            reference_model: None,
            on_delete: None,
            on_update: None,
        }
    }

    /// Set the foreign-key columns.
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        self.foreign_keys = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Set the referenced columns.
    pub fn references<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        self.references = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Set the field that introduced the constraint.
    pub fn field(mut self, field: impl Into<SmolStr>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Set the referenced model, used for dependency discovery.
    pub fn reference_model(mut self, source: ModelSource) -> Self {
        self.reference_model = Some(source);
        self
    }

    /// Set the ON DELETE action.
    pub fn on_delete(mut self, action: ReferentialAction) -> Self {
        self.on_delete = Some(action);
        self
    }

    /// Set the ON UPDATE action.
    pub fn on_update(mut self, action: ReferentialAction) -> Self {
        self.on_update = Some(action);
        self
    }

    /// Check if the constraint points back at its own table.
    pub fn is_self_reference(&self) -> bool {
        self.table == self.reference_table
    }
}

/// A relationship declared on a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipDescriptor {
    /// Relationship (field) name.
    pub name: SmolStr,
    /// Relationship kind.
    pub kind: RelationKind,
    /// Table on the other side.
    pub target_table: SmolStr,
    /// Foreign key implied by this relationship, for the owning side.
    pub constraint: Option<ConstraintDescriptor>,
    /// Join table model, for many-to-many relationships.
    #[serde(skip)]
    pub join_table: Option<ModelSource>,
}

impl RelationshipDescriptor {
    /// A relationship where this model holds the foreign key.
    pub fn belongs_to(name: impl Into<SmolStr>, constraint: ConstraintDescriptor) -> Self {
        Self {
            name: name.into(),
            kind: RelationKind::BelongsTo,
            target_table: constraint.reference_table.clone(),
            constraint: Some(constraint),
            join_table: None,
        }
    }

    /// A one-to-one relationship whose foreign key lives on the other table.
    pub fn has_one(name: impl Into<SmolStr>, target_table: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            kind: RelationKind::HasOne,
            target_table: target_table.into(),
            constraint: None,
            join_table: None,
        }
    }

    /// A one-to-many relationship whose foreign key lives on the other table.
    pub fn has_many(name: impl Into<SmolStr>, target_table: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            kind: RelationKind::HasMany,
            target_table: target_table.into(),
            constraint: None,
            join_table: None,
        }
    }

    /// A many-to-many relationship through `join_table`.
    pub fn many_to_many(
        name: impl Into<SmolStr>,
        target_table: impl Into<SmolStr>,
        join_table: ModelSource,
    ) -> Self {
        Self {
            name: name.into(),
            kind: RelationKind::ManyToMany,
            target_table: target_table.into(),
            constraint: None,
            join_table: Some(join_table),
        }
    }

    /// The foreign-key constraint implied by this relationship, if any.
    pub fn parse_constraint(&self) -> Option<&ConstraintDescriptor> {
        self.constraint.as_ref()
    }
}

/// One side of a join table.
#[derive(Debug, Clone)]
pub struct JoinSide {
    table: SmolStr,
    model: Option<ModelSource>,
    columns: Vec<(SmolStr, SmolStr, DataType)>,
    on_delete: Option<ReferentialAction>,
}

impl JoinSide {
    /// A side referencing `table`.
    pub fn new(table: impl Into<SmolStr>) -> Self {
        Self {
            table: table.into(),
            model: None,
            columns: vec![],
            on_delete: None,
        }
    }

    /// Add a join column `column` referencing `reference` on the side table.
    pub fn column(
        mut self,
        column: impl Into<SmolStr>,
        reference: impl Into<SmolStr>,
        data_type: DataType,
    ) -> Self {
        self.columns.push((column.into(), reference.into(), data_type));
        self
    }

    /// Set the referenced model, used for dependency discovery.
    pub fn model(mut self, source: ModelSource) -> Self {
        self.model = Some(source);
        self
    }

    /// Set the ON DELETE action of this side's foreign key.
    pub fn on_delete(mut self, action: ReferentialAction) -> Self {
        self.on_delete = Some(action);
        self
    }
}

/// Builder for the implicit table of a many-to-many relationship.
///
/// The join model gets one NOT NULL primary-key column per join column and
/// one foreign key per side.
#[derive(Debug, Clone)]
pub struct JoinTable {
    name: SmolStr,
    sides: Vec<JoinSide>,
}

impl JoinTable {
    /// Create a join table named `name`.
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            sides: vec![],
        }
    }

    /// Add a side.
    pub fn side(mut self, side: JoinSide) -> Self {
        self.sides.push(side);
        self
    }

    /// Describe the join model.
    pub fn describe(&self) -> SchemaResult<ModelDescriptor> {
        let mut builder = ModelDescriptor::builder(self.name.clone());

        for side in &self.sides {
            for (column, _, data_type) in &side.columns {
                builder = builder.column(
                    ColumnDescriptor::new(column.clone(), data_type.clone())
                        .primary_key()
                        .not_null(),
                );
            }

            let name = format!("fk_{}_{}", self.name, side.table);
            let mut constraint = ConstraintDescriptor::foreign_key(name, side.table.clone())
                .columns(side.columns.iter().map(|(c, _, _)| c.clone()))
                .references(side.columns.iter().map(|(_, r, _)| r.clone()));
            if let Some(model) = &side.model {
                constraint = constraint.reference_model(model.clone());
            }
            if let Some(action) = side.on_delete {
                constraint = constraint.on_delete(action);
            }

            builder = builder.relationship(RelationshipDescriptor::belongs_to(
                side.table.clone(),
                constraint,
            ));
        }

        builder.build()
    }

    /// Turn the builder into a model source.
    pub fn into_source(self) -> ModelSource {
        let name = self.name.clone();
        ModelSource::new(name, move || self.describe())
    }
}
