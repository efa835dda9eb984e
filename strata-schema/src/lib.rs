//! # strata-schema
//!
//! Model descriptors for the Strata schema migrator.
//!
//! This crate provides:
//! - Column, index, check and foreign-key descriptors
//! - Relationships, including implicit many-to-many join tables
//! - The [`Model`] trait entities implement to describe their table
//! - [`ModelRef`], the argument every migrator operation accepts
//!
//! ## Example
//!
//! ```rust
//! use strata_schema::{
//!     ColumnDescriptor, ConstraintDescriptor, DataType, ModelDescriptor, RelationshipDescriptor,
//! };
//!
//! let orders = ModelDescriptor::builder("orders")
//!     .column(ColumnDescriptor::new("id", DataType::Int).primary_key().auto_increment())
//!     .column(ColumnDescriptor::new("user_id", DataType::Int).not_null())
//!     .relationship(RelationshipDescriptor::belongs_to(
//!         "User",
//!         ConstraintDescriptor::foreign_key("fk_orders_user", "users")
//!             .columns(["user_id"])
//!             .references(["id"]),
//!     ))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(orders.dependencies()[0].reference_table, "users");
//! ```

pub mod column;
pub mod error;
pub mod index;
pub mod model;
pub mod relation;

pub use column::{ColumnDescriptor, DataType};
pub use error::{SchemaError, SchemaResult};
pub use index::{CheckConstraintDescriptor, IndexDescriptor, IndexOption, SortOrder};
pub use model::{Model, ModelBuilder, ModelDescriptor, ModelRef, ModelSource};
pub use relation::{
    ConstraintDescriptor, JoinSide, JoinTable, ReferentialAction, RelationKind,
    RelationshipDescriptor,
};
