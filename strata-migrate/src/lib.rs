//! # strata-migrate
//!
//! Additive schema migrations driven by model descriptors.
//!
//! This crate provides:
//! - A dependency resolver ordering models so referenced tables come first
//! - Pure DDL builders parameterized by a [`Dialect`]
//! - Catalog introspection through `information_schema`
//! - The [`Migrator`], which creates, diffs and drops tables over a [`Session`]
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌────────────────┐     ┌──────────────┐
//! │ ModelRef[]   │────▶│ reorder        │────▶│ Migrator     │
//! └──────────────┘     └────────────────┘     └──────────────┘
//!                                               │         │
//!                                               ▼         ▼
//!                                       ┌────────────┐ ┌────────┐
//!                                       │Introspector│ │ sql::* │
//!                                       └────────────┘ └────────┘
//!                                               │         │
//!                                               ▼         ▼
//!                                            ┌───────────────┐
//!                                            │    Session    │
//!                                            └───────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use strata_migrate::{Migrator, MigratorConfig};
//! use strata_schema::ModelRef;
//!
//! async fn migrate(session: &dyn strata_migrate::Session) -> strata_migrate::MigrateResult<()> {
//!     let migrator = Migrator::mysql(MigratorConfig::new());
//!     let report = migrator
//!         .auto_migrate(session, &[ModelRef::of::<User>(), ModelRef::of::<Order>()])
//!         .await?;
//!     println!("{}", report.summary());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod deferred;
pub mod dialect;
pub mod error;
pub mod introspect;
pub mod logging;
pub mod migrator;
pub mod reorder;
pub mod session;
pub mod sql;
pub mod statement;

// Re-exports
pub use config::MigratorConfig;
pub use deferred::{DeferredFailure, DeferredQueue, DeferredTask};
pub use dialect::{Dialect, MysqlDialect};
pub use error::{MigrateResult, MigrationError};
pub use introspect::{ColumnType, Introspector};
pub use migrator::{MigrationReport, Migrator};
pub use reorder::{ResolvedModel, reorder};
pub use session::{Row, Session};
pub use sql::CreateTablePlan;
pub use statement::{Arg, SqlValue, Statement};
