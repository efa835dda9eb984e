//! The migration driver.

use std::sync::Arc;

use strata_schema::{ModelDescriptor, ModelRef, SchemaError};
use tracing::{debug, info, warn};

use crate::config::MigratorConfig;
use crate::deferred::{DeferredFailure, DeferredQueue, DeferredTask};
use crate::dialect::{Dialect, MysqlDialect};
use crate::error::{MigrateResult, MigrationError};
use crate::introspect::{ColumnType, Introspector};
use crate::reorder::{ResolvedModel, reorder};
use crate::session::Session;
use crate::sql;
use crate::statement::Statement;

/// Outcome of a multi-statement migration call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MigrationReport {
    /// Statements executed (or planned, in dry-run mode), rendered with
    /// values inlined, in order.
    pub executed: Vec<String>,
    /// Deferred work that failed without aborting the call.
    pub deferred_failures: Vec<DeferredFailure>,
    /// Whether statements were only planned.
    pub dry_run: bool,
}

impl MigrationReport {
    /// Check if nothing was executed and nothing failed.
    pub fn is_empty(&self) -> bool {
        self.executed.is_empty() && self.deferred_failures.is_empty()
    }

    /// Check if any deferred work failed.
    pub fn has_failures(&self) -> bool {
        !self.deferred_failures.is_empty()
    }

    /// Get a summary of the report.
    pub fn summary(&self) -> String {
        if self.is_empty() {
            return "No changes".to_string();
        }

        let verb = if self.dry_run { "planned" } else { "executed" };
        let mut parts = vec![format!("{} statement(s) {}", self.executed.len(), verb)];
        if self.has_failures() {
            parts.push(format!(
                "{} deferred failure(s)",
                self.deferred_failures.len()
            ));
        }
        parts.join(", ")
    }
}

/// Creates, diffs and drops tables for a set of models.
///
/// Every operation takes the session it runs on; the migrator itself holds
/// only the dialect and configuration.
#[derive(Debug, Clone)]
pub struct Migrator {
    dialect: Arc<dyn Dialect>,
    config: MigratorConfig,
}

impl Migrator {
    /// Create a migrator for a dialect.
    pub fn new(dialect: impl Dialect + 'static, config: MigratorConfig) -> Self {
        Self {
            dialect: Arc::new(dialect),
            config,
        }
    }

    /// Create a MySQL migrator.
    pub fn mysql(config: MigratorConfig) -> Self {
        Self::new(MysqlDialect, config)
    }

    /// The dialect.
    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    /// The configuration.
    pub fn config(&self) -> &MigratorConfig {
        &self.config
    }

    fn introspector<'a>(&'a self, session: &'a dyn Session) -> Introspector<'a> {
        Introspector::new(session, self.dialect.as_ref())
    }

    async fn run(&self, session: &dyn Session, statement: &Statement) -> MigrateResult<String> {
        let sql = statement.to_sql(self.dialect.as_ref());
        if self.config.dry_run {
            debug!(sql = %sql, "Dry run, statement not executed");
            return Ok(sql);
        }

        debug!(sql = %sql, "Executing statement");
        session.execute(statement).await?;
        Ok(sql)
    }

    fn report(&self) -> MigrationReport {
        MigrationReport {
            dry_run: self.config.dry_run,
            ..Default::default()
        }
    }

    // ---------------------------------------------------------------------
    // Tables
    // ---------------------------------------------------------------------

    /// Create tables for the given models, referenced tables first.
    ///
    /// Deferred indexes and missing join tables are created after each
    /// table; their failures are collected in the report.
    pub async fn create_tables(
        &self,
        session: &dyn Session,
        models: &[ModelRef],
    ) -> MigrateResult<MigrationReport> {
        let mut report = self.report();

        for model in reorder(models, false)? {
            let model = require_descriptor(model)?;
            let mut queue = DeferredQueue::new();
            self.create_model(session, &model, &mut queue, &mut report)
                .await?;
            self.drain(session, &mut queue, &mut report).await;
        }

        info!(summary = %report.summary(), "Created tables");
        Ok(report)
    }

    /// Drop tables, referencing tables before the tables they reference.
    pub async fn drop_tables(
        &self,
        session: &dyn Session,
        models: &[ModelRef],
    ) -> MigrateResult<MigrationReport> {
        let mut report = self.report();

        for model in reorder(models, false)?.iter().rev() {
            report
                .executed
                .push(self.run(session, &sql::drop_table(model.table())).await?);
            info!(table = %model.table(), "Dropped table");
        }

        Ok(report)
    }

    /// Bring the database up to date with the models without dropping or
    /// altering anything.
    ///
    /// Referenced models missing from `models` are included when their
    /// constraints carry a model source. Missing tables are created;
    /// existing tables get their missing columns, foreign keys and checks
    /// (and indexes, when enabled).
    pub async fn auto_migrate(
        &self,
        session: &dyn Session,
        models: &[ModelRef],
    ) -> MigrateResult<MigrationReport> {
        let mut report = self.report();
        let introspector = self.introspector(session);

        for model in reorder(models, true)? {
            let model = match model {
                ResolvedModel::Model(model) => model,
                ResolvedModel::Table(name) => {
                    if !introspector.has_table(&name).await {
                        return Err(bare_table(&name));
                    }
                    debug!(table = %name, "Nothing to migrate for a bare table name");
                    continue;
                }
            };

            let mut queue = DeferredQueue::new();
            if introspector.has_table(&model.table).await {
                self.migrate_model(session, &model, &mut queue, &mut report)
                    .await?;
            } else {
                self.create_model(session, &model, &mut queue, &mut report)
                    .await?;
            }
            self.drain(session, &mut queue, &mut report).await;
        }

        info!(summary = %report.summary(), "Auto-migration finished");
        Ok(report)
    }

    async fn create_model(
        &self,
        session: &dyn Session,
        model: &ModelDescriptor,
        queue: &mut DeferredQueue,
        report: &mut MigrationReport,
    ) -> MigrateResult<()> {
        let plan = sql::create_table(self.dialect.as_ref(), &self.config, model)?;
        report.executed.push(self.run(session, &plan.statement).await?);
        info!(table = %model.table, "Created table");

        for index in plan.deferred_indexes {
            queue.push(DeferredTask::CreateIndex {
                table: model.table.clone(),
                index,
            });
        }
        for source in plan.join_tables {
            queue.push(DeferredTask::JoinTable {
                source,
                migrate_existing: false,
            });
        }
        Ok(())
    }

    async fn migrate_model(
        &self,
        session: &dyn Session,
        model: &ModelDescriptor,
        queue: &mut DeferredQueue,
        report: &mut MigrationReport,
    ) -> MigrateResult<()> {
        let introspector = self.introspector(session);
        let dialect = self.dialect.as_ref();
        let table = model.table.as_str();

        for column in &model.columns {
            if !introspector.has_column(table, &column.name).await {
                let stmt = sql::add_column(dialect, table, column)?;
                report.executed.push(self.run(session, &stmt).await?);
                info!(table = %table, column = %column.name, "Added column");
            }
        }

        for constraint in model.constraints() {
            if !introspector.has_constraint(table, &constraint.name).await {
                let stmt = sql::add_foreign_key(table, constraint);
                report.executed.push(self.run(session, &stmt).await?);
                info!(table = %table, constraint = %constraint.name, "Added foreign key");
            }
        }

        for check in &model.checks {
            if !introspector.has_constraint(table, &check.name).await {
                let stmt = sql::add_check(table, check);
                report.executed.push(self.run(session, &stmt).await?);
                info!(table = %table, constraint = %check.name, "Added check constraint");
            }
        }

        if self.config.auto_migrate_indexes {
            for index in &model.indexes {
                if !introspector.has_index(table, &index.name).await {
                    let stmt = sql::create_index(dialect, table, index);
                    report.executed.push(self.run(session, &stmt).await?);
                    info!(table = %table, index = %index.name, "Added index");
                }
            }
        }

        for source in model.join_tables() {
            queue.push(DeferredTask::JoinTable {
                source: source.clone(),
                migrate_existing: true,
            });
        }
        Ok(())
    }

    async fn drain(
        &self,
        session: &dyn Session,
        queue: &mut DeferredQueue,
        report: &mut MigrationReport,
    ) {
        while let Some(task) = queue.pop() {
            let description = task.to_string();
            if let Err(e) = self.run_deferred(session, task, queue, report).await {
                warn!(task = %description, error = %e, "Deferred work failed");
                report.deferred_failures.push(DeferredFailure {
                    task: description,
                    message: e.to_string(),
                });
            }
        }
    }

    async fn run_deferred(
        &self,
        session: &dyn Session,
        task: DeferredTask,
        queue: &mut DeferredQueue,
        report: &mut MigrationReport,
    ) -> MigrateResult<()> {
        match task {
            DeferredTask::CreateIndex { table, index } => {
                let stmt = sql::create_index(self.dialect.as_ref(), &table, &index);
                report.executed.push(self.run(session, &stmt).await?);
            }
            DeferredTask::JoinTable {
                source,
                migrate_existing,
            } => {
                let model = source.describe()?;
                if !self.introspector(session).has_table(&model.table).await {
                    self.create_model(session, &model, queue, report).await?;
                } else if migrate_existing {
                    self.migrate_model(session, &model, queue, report).await?;
                }
            }
        }
        Ok(())
    }

    /// Rename a table.
    pub async fn rename_table(
        &self,
        session: &dyn Session,
        old: impl Into<ModelRef>,
        new: impl Into<ModelRef>,
    ) -> MigrateResult<()> {
        let old = ResolvedModel::resolve(&old.into())?;
        let new = ResolvedModel::resolve(&new.into())?;
        self.run(session, &sql::rename_table(old.table(), new.table()))
            .await?;
        Ok(())
    }

    /// Check if the model's table exists.
    pub async fn has_table(
        &self,
        session: &dyn Session,
        model: impl Into<ModelRef>,
    ) -> MigrateResult<bool> {
        let target = ResolvedModel::resolve(&model.into())?;
        Ok(self.introspector(session).has_table(target.table()).await)
    }

    // ---------------------------------------------------------------------
    // Columns
    // ---------------------------------------------------------------------

    /// Add the column declared for `field`.
    pub async fn add_column(
        &self,
        session: &dyn Session,
        model: impl Into<ModelRef>,
        field: &str,
    ) -> MigrateResult<()> {
        let target = ResolvedModel::resolve(&model.into())?;
        let model = descriptor_for(&target, "field", field)?;
        let column = model
            .look_up_field(field)
            .ok_or_else(|| MigrationError::lookup("field", field, model.table.as_str()))?;

        let stmt = sql::add_column(self.dialect.as_ref(), &model.table, column)?;
        self.run(session, &stmt).await?;
        Ok(())
    }

    /// Drop a column, resolved through the descriptor when possible.
    pub async fn drop_column(
        &self,
        session: &dyn Session,
        model: impl Into<ModelRef>,
        name: &str,
    ) -> MigrateResult<()> {
        let target = ResolvedModel::resolve(&model.into())?;
        let column = column_name(&target, name);
        self.run(session, &sql::drop_column(target.table(), &column))
            .await?;
        Ok(())
    }

    /// Change a column to its declared type.
    pub async fn alter_column(
        &self,
        session: &dyn Session,
        model: impl Into<ModelRef>,
        field: &str,
    ) -> MigrateResult<()> {
        let target = ResolvedModel::resolve(&model.into())?;
        let model = descriptor_for(&target, "field", field)?;
        let column = model
            .look_up_field(field)
            .ok_or_else(|| MigrationError::lookup("field", field, model.table.as_str()))?;

        let stmt = sql::alter_column(self.dialect.as_ref(), &model.table, column)?;
        self.run(session, &stmt).await?;
        Ok(())
    }

    /// Rename a column.
    pub async fn rename_column(
        &self,
        session: &dyn Session,
        model: impl Into<ModelRef>,
        old: &str,
        new: &str,
    ) -> MigrateResult<()> {
        let target = ResolvedModel::resolve(&model.into())?;
        let old = column_name(&target, old);
        let new = column_name(&target, new);
        self.run(session, &sql::rename_column(target.table(), &old, &new))
            .await?;
        Ok(())
    }

    /// Check if a column exists.
    pub async fn has_column(
        &self,
        session: &dyn Session,
        model: impl Into<ModelRef>,
        field: &str,
    ) -> MigrateResult<bool> {
        let target = ResolvedModel::resolve(&model.into())?;
        let column = column_name(&target, field);
        Ok(self
            .introspector(session)
            .has_column(target.table(), &column)
            .await)
    }

    /// Live columns of the model's table.
    pub async fn column_types(
        &self,
        session: &dyn Session,
        model: impl Into<ModelRef>,
    ) -> MigrateResult<Vec<ColumnType>> {
        let target = ResolvedModel::resolve(&model.into())?;
        self.introspector(session)
            .column_types(target.table())
            .await
    }

    // ---------------------------------------------------------------------
    // Constraints
    // ---------------------------------------------------------------------

    /// Create a check or foreign-key constraint by name.
    ///
    /// A field name is accepted too and creates that field's constraints,
    /// see [`Migrator::create_field_constraints`].
    pub async fn create_constraint(
        &self,
        session: &dyn Session,
        model: impl Into<ModelRef>,
        name: &str,
    ) -> MigrateResult<()> {
        let target = ResolvedModel::resolve(&model.into())?;
        let model = descriptor_for(&target, "constraint", name)?;
        let table = model.table.as_str();

        if let Some(check) = model.check_constraint(name) {
            self.run(session, &sql::add_check(table, check)).await?;
            return Ok(());
        }

        let foreign_key = model.foreign_key(name).or_else(|| {
            model
                .relationships
                .iter()
                .find(|r| r.name == name)
                .and_then(|r| r.parse_constraint())
        });
        if let Some(constraint) = foreign_key {
            self.run(session, &sql::add_foreign_key(table, constraint))
                .await?;
            return Ok(());
        }

        if model.look_up_field(name).is_some() {
            warn!(
                table = %table,
                field = %name,
                "create_constraint called with a field name, use create_field_constraints"
            );
            return self
                .field_constraints(session, model, name)
                .await;
        }

        Err(MigrationError::lookup("constraint", name, table))
    }

    /// Create the check constraints declared on `field` and the indexes
    /// named after the foreign keys it owns.
    pub async fn create_field_constraints(
        &self,
        session: &dyn Session,
        model: impl Into<ModelRef>,
        field: &str,
    ) -> MigrateResult<()> {
        let target = ResolvedModel::resolve(&model.into())?;
        let model = descriptor_for(&target, "field", field)?;
        self.field_constraints(session, model, field).await
    }

    async fn field_constraints(
        &self,
        session: &dyn Session,
        model: &ModelDescriptor,
        field: &str,
    ) -> MigrateResult<()> {
        let table = model.table.as_str();
        let column = model
            .look_up_field(field)
            .ok_or_else(|| MigrationError::lookup("field", field, table))?;
        let owned_by = |owner: Option<&str>| owner.is_some_and(|o| column.matches(o));

        let mut created = 0;
        for check in model.checks.iter().filter(|c| owned_by(c.field.as_deref())) {
            self.run(session, &sql::add_check(table, check)).await?;
            created += 1;
        }

        for constraint in model
            .constraints()
            .filter(|c| owned_by(c.field.as_deref()))
        {
            if let Some(index) = model.indexes.iter().find(|i| i.name == constraint.name) {
                let stmt = sql::create_index(self.dialect.as_ref(), table, index);
                self.run(session, &stmt).await?;
                created += 1;
            }
        }

        if created == 0 {
            return Err(MigrationError::lookup("constraint", field, table));
        }
        Ok(())
    }

    /// Drop a constraint.
    pub async fn drop_constraint(
        &self,
        session: &dyn Session,
        model: impl Into<ModelRef>,
        name: &str,
    ) -> MigrateResult<()> {
        let target = ResolvedModel::resolve(&model.into())?;
        let name = constraint_name(&target, name);
        self.run(session, &sql::drop_constraint(target.table(), &name))
            .await?;
        Ok(())
    }

    /// Check if a constraint exists.
    pub async fn has_constraint(
        &self,
        session: &dyn Session,
        model: impl Into<ModelRef>,
        name: &str,
    ) -> MigrateResult<bool> {
        let target = ResolvedModel::resolve(&model.into())?;
        let name = constraint_name(&target, name);
        Ok(self
            .introspector(session)
            .has_constraint(target.table(), &name)
            .await)
    }

    // ---------------------------------------------------------------------
    // Indexes
    // ---------------------------------------------------------------------

    /// Create an index declared on the model.
    pub async fn create_index(
        &self,
        session: &dyn Session,
        model: impl Into<ModelRef>,
        name: &str,
    ) -> MigrateResult<()> {
        let target = ResolvedModel::resolve(&model.into())?;
        let model = descriptor_for(&target, "index", name)?;
        let index = model
            .look_index(name)
            .ok_or_else(|| MigrationError::lookup("index", name, model.table.as_str()))?;

        let stmt = sql::create_index(self.dialect.as_ref(), &model.table, index);
        self.run(session, &stmt).await?;
        Ok(())
    }

    /// Drop an index.
    pub async fn drop_index(
        &self,
        session: &dyn Session,
        model: impl Into<ModelRef>,
        name: &str,
    ) -> MigrateResult<()> {
        let target = ResolvedModel::resolve(&model.into())?;
        let name = index_name(&target, name);
        self.run(session, &sql::drop_index(target.table(), &name))
            .await?;
        Ok(())
    }

    /// Rename an index.
    pub async fn rename_index(
        &self,
        session: &dyn Session,
        model: impl Into<ModelRef>,
        old: &str,
        new: &str,
    ) -> MigrateResult<()> {
        let target = ResolvedModel::resolve(&model.into())?;
        let old = index_name(&target, old);
        self.run(session, &sql::rename_index(target.table(), &old, new))
            .await?;
        Ok(())
    }

    /// Check if an index exists.
    pub async fn has_index(
        &self,
        session: &dyn Session,
        model: impl Into<ModelRef>,
        name: &str,
    ) -> MigrateResult<bool> {
        let target = ResolvedModel::resolve(&model.into())?;
        let name = index_name(&target, name);
        Ok(self
            .introspector(session)
            .has_index(target.table(), &name)
            .await)
    }

    // ---------------------------------------------------------------------
    // Views and database
    // ---------------------------------------------------------------------

    /// Views are not supported.
    pub async fn create_view(
        &self,
        _session: &dyn Session,
        _name: &str,
        _query: &Statement,
    ) -> MigrateResult<()> {
        Err(MigrationError::Unsupported("views"))
    }

    /// Views are not supported.
    pub async fn drop_view(&self, _session: &dyn Session, _name: &str) -> MigrateResult<()> {
        Err(MigrationError::Unsupported("views"))
    }

    /// Name of the current database.
    pub async fn current_database(&self, session: &dyn Session) -> MigrateResult<String> {
        self.introspector(session).current_database().await
    }
}

fn bare_table(name: &str) -> MigrationError {
    SchemaError::unresolved(name, "a bare table name has no columns to create").into()
}

fn require_descriptor(model: ResolvedModel) -> MigrateResult<ModelDescriptor> {
    match model {
        ResolvedModel::Model(model) => Ok(model),
        ResolvedModel::Table(name) => Err(bare_table(&name)),
    }
}

fn descriptor_for<'a>(
    target: &'a ResolvedModel,
    kind: &'static str,
    name: &str,
) -> MigrateResult<&'a ModelDescriptor> {
    target
        .descriptor()
        .ok_or_else(|| MigrationError::lookup(kind, name, target.table()))
}

fn column_name(target: &ResolvedModel, name: &str) -> String {
    target
        .descriptor()
        .and_then(|m| m.look_up_field(name))
        .map(|c| c.name.to_string())
        .unwrap_or_else(|| name.to_string())
}

fn index_name(target: &ResolvedModel, name: &str) -> String {
    target
        .descriptor()
        .and_then(|m| m.look_index(name))
        .map(|i| i.name.to_string())
        .unwrap_or_else(|| name.to_string())
}

fn constraint_name(target: &ResolvedModel, name: &str) -> String {
    target
        .descriptor()
        .and_then(|m| {
            m.relationships
                .iter()
                .find(|r| r.name == name)
                .and_then(|r| r.parse_constraint())
        })
        .map(|c| c.name.to_string())
        .unwrap_or_else(|| name.to_string())
}
