//! Shared fixtures: an in-memory session and a few models.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};

use parking_lot::Mutex;
use strata_migrate::{Arg, MigrateResult, MigrationError, MysqlDialect, Row, Session, SqlValue, Statement};
use strata_schema::{
    CheckConstraintDescriptor, ColumnDescriptor, ConstraintDescriptor, DataType, IndexDescriptor,
    IndexOption, JoinSide, JoinTable, Model, ModelDescriptor, ModelSource, ReferentialAction,
    RelationshipDescriptor, SchemaResult,
};

/// A live table in the fake database.
#[derive(Debug, Clone, Default)]
pub struct FakeTable {
    pub columns: Vec<String>,
    pub constraints: BTreeSet<String>,
    pub indexes: BTreeSet<String>,
}

#[derive(Debug, Default)]
struct State {
    tables: BTreeMap<String, FakeTable>,
    executed: Vec<String>,
    fail_when: Vec<String>,
    fail_queries: bool,
}

/// A session that interprets the statements the migrator emits and keeps
/// the resulting schema in memory.
#[derive(Debug, Default)]
pub struct FakeDb {
    state: Mutex<State>,
}

impl FakeDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-create a table with the given columns.
    pub fn with_table(self, table: &str, columns: &[&str]) -> Self {
        self.state.lock().tables.insert(
            table.to_string(),
            FakeTable {
                columns: columns.iter().map(|c| c.to_string()).collect(),
                ..Default::default()
            },
        );
        self
    }

    /// Make every statement whose rendered SQL contains `needle` fail.
    pub fn fail_when(&self, needle: &str) {
        self.state.lock().fail_when.push(needle.to_string());
    }

    /// Make every catalog query fail.
    pub fn fail_queries(&self) {
        self.state.lock().fail_queries = true;
    }

    /// Rendered SQL of every executed statement.
    pub fn executed(&self) -> Vec<String> {
        self.state.lock().executed.clone()
    }

    pub fn clear_log(&self) {
        self.state.lock().executed.clear();
    }

    pub fn table(&self, name: &str) -> Option<FakeTable> {
        self.state.lock().tables.get(name).cloned()
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.state.lock().tables.contains_key(name)
    }

    pub fn table_names(&self) -> Vec<String> {
        self.state.lock().tables.keys().cloned().collect()
    }
}

fn ident(arg: Option<&Arg>) -> String {
    match arg {
        Some(Arg::Table(n) | Arg::Column(n) | Arg::Name(n)) => n.to_string(),
        other => panic!("expected an identifier, got {other:?}"),
    }
}

fn value(arg: Option<&Arg>) -> String {
    match arg {
        Some(Arg::Value(SqlValue::Text(s))) => s.clone(),
        other => panic!("expected a text value, got {other:?}"),
    }
}

fn fail(sql: &str, message: impl Into<String>) -> MigrationError {
    MigrationError::exec(sql, message)
}

impl State {
    fn table_mut(&mut self, sql: &str, name: &str) -> MigrateResult<&mut FakeTable> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| fail(sql, format!("Table '{name}' doesn't exist")))
    }

    fn require_reference(&self, sql: &str, owner: &str, referenced: &str) -> MigrateResult<()> {
        if owner == referenced || self.tables.contains_key(referenced) {
            Ok(())
        } else {
            Err(fail(sql, format!("referenced table '{referenced}' doesn't exist")))
        }
    }

    fn create_table(&mut self, sql: &str, stmt: &Statement) -> MigrateResult<()> {
        let template = stmt.template();
        let args = stmt.arguments();
        let name = ident(args.first());
        if self.tables.contains_key(&name) {
            return Err(fail(sql, format!("Table '{name}' already exists")));
        }

        let start = "CREATE TABLE ? (".len();
        let end = template.rfind(')').unwrap_or(template.len());
        let mut table = FakeTable::default();
        let mut pos = 1;

        for clause in template[start..end].split(',') {
            let arity = clause.matches('?').count();
            let clause_args = &args[pos..pos + arity];
            if clause.starts_with("CONSTRAINT ? FOREIGN KEY") {
                self.require_reference(sql, &name, &ident(clause_args.get(2)))?;
                table.constraints.insert(ident(clause_args.first()));
            } else if clause.starts_with("CONSTRAINT ? CHECK") {
                table.constraints.insert(ident(clause_args.first()));
            } else if clause.contains("INDEX ? ?") {
                table.indexes.insert(ident(clause_args.get(1)));
            } else if clause == "? ?" {
                table.columns.push(ident(clause_args.first()));
            }
            pos += arity;
        }

        self.tables.insert(name, table);
        Ok(())
    }

    fn apply(&mut self, sql: &str, stmt: &Statement) -> MigrateResult<()> {
        let template = stmt.template();
        let args = stmt.arguments();

        if template.starts_with("CREATE TABLE ? (") {
            return self.create_table(sql, stmt);
        }
        if template.starts_with("CREATE ?INDEX ? ON ??") {
            let index = ident(args.get(1));
            let table = self.table_mut(sql, &ident(args.get(2)))?;
            if !table.indexes.insert(index.clone()) {
                return Err(fail(sql, format!("Duplicate key name '{index}'")));
            }
            return Ok(());
        }
        if template == "DROP TABLE IF EXISTS ?" {
            self.tables.remove(&ident(args.first()));
            return Ok(());
        }
        if template == "DROP INDEX ? ON ?" {
            let index = ident(args.first());
            let table = self.table_mut(sql, &ident(args.get(1)))?;
            if !table.indexes.remove(&index) {
                return Err(fail(sql, format!("Can't DROP '{index}'")));
            }
            return Ok(());
        }

        let name = ident(args.first());
        if template.starts_with("ALTER TABLE ? ADD CONSTRAINT ? FOREIGN KEY") {
            self.require_reference(sql, &name, &ident(args.get(3)))?;
            let constraint = ident(args.get(1));
            let table = self.table_mut(sql, &name)?;
            if !table.constraints.insert(constraint.clone()) {
                return Err(fail(sql, format!("Duplicate constraint '{constraint}'")));
            }
        } else if template.starts_with("ALTER TABLE ? ADD CONSTRAINT ? CHECK") {
            let constraint = ident(args.get(1));
            let table = self.table_mut(sql, &name)?;
            if !table.constraints.insert(constraint.clone()) {
                return Err(fail(sql, format!("Duplicate constraint '{constraint}'")));
            }
        } else if template == "ALTER TABLE ? ADD ? ?" {
            let column = ident(args.get(1));
            let table = self.table_mut(sql, &name)?;
            if table.columns.contains(&column) {
                return Err(fail(sql, format!("Duplicate column name '{column}'")));
            }
            table.columns.push(column);
        } else if template == "ALTER TABLE ? DROP COLUMN ?" {
            let column = ident(args.get(1));
            let table = self.table_mut(sql, &name)?;
            table.columns.retain(|c| *c != column);
        } else if template == "ALTER TABLE ? RENAME COLUMN ? TO ?" {
            let (old, new) = (ident(args.get(1)), ident(args.get(2)));
            let table = self.table_mut(sql, &name)?;
            for column in table.columns.iter_mut().filter(|c| **c == old) {
                *column = new.clone();
            }
        } else if template == "ALTER TABLE ? MODIFY COLUMN ? ?" {
            let column = ident(args.get(1));
            let table = self.table_mut(sql, &name)?;
            if !table.columns.contains(&column) {
                return Err(fail(sql, format!("Unknown column '{column}'")));
            }
        } else if template == "ALTER TABLE ? RENAME TO ?" {
            let table = self
                .tables
                .remove(&name)
                .ok_or_else(|| fail(sql, format!("Table '{name}' doesn't exist")))?;
            self.tables.insert(ident(args.get(1)), table);
        } else if template == "ALTER TABLE ? RENAME INDEX ? TO ?" {
            let (old, new) = (ident(args.get(1)), ident(args.get(2)));
            let table = self.table_mut(sql, &name)?;
            if !table.indexes.remove(&old) {
                return Err(fail(sql, format!("Key '{old}' doesn't exist")));
            }
            table.indexes.insert(new);
        } else if template == "ALTER TABLE ? DROP CONSTRAINT ?" {
            let constraint = ident(args.get(1));
            let table = self.table_mut(sql, &name)?;
            if !table.constraints.remove(&constraint) {
                return Err(fail(sql, format!("Constraint '{constraint}' doesn't exist")));
            }
        } else {
            return Err(fail(sql, "unsupported statement"));
        }
        Ok(())
    }

    fn count(&self, stmt: &Statement) -> i64 {
        let template = stmt.template();
        let args = stmt.arguments();
        let table = value(args.get(1));
        let Some(live) = self.tables.get(&table) else {
            return 0;
        };

        let found = if template.contains("information_schema.tables") {
            true
        } else {
            let name = value(args.get(2));
            if template.contains("information_schema.columns") {
                live.columns.contains(&name)
            } else if template.contains("information_schema.table_constraints") {
                live.constraints.contains(&name)
            } else if template.contains("information_schema.statistics") {
                live.indexes.contains(&name)
            } else {
                false
            }
        };
        i64::from(found)
    }
}

#[async_trait::async_trait]
impl Session for FakeDb {
    async fn execute(&self, statement: &Statement) -> MigrateResult<u64> {
        let sql = statement.to_sql(&MysqlDialect);
        let mut state = self.state.lock();

        if state.fail_when.iter().any(|needle| sql.contains(needle.as_str())) {
            return Err(fail(&sql, "injected failure"));
        }

        state.apply(&sql, statement)?;
        state.executed.push(sql);
        Ok(0)
    }

    async fn query(&self, statement: &Statement) -> MigrateResult<Vec<Row>> {
        let state = self.state.lock();
        if state.fail_queries {
            return Err(fail(&statement.to_sql(&MysqlDialect), "server has gone away"));
        }

        let template = statement.template();
        if template == "SELECT DATABASE()" {
            return Ok(vec![Row::new(vec![SqlValue::from("app")])]);
        }
        if template.starts_with("SELECT column_name, column_type") {
            let table = value(statement.arguments().get(1));
            let columns = state
                .tables
                .get(&table)
                .map(|t| t.columns.clone())
                .unwrap_or_default();
            return Ok(columns
                .into_iter()
                .map(|c| {
                    Row::new(vec![
                        SqlValue::Text(c),
                        SqlValue::from("bigint"),
                        SqlValue::from("YES"),
                        SqlValue::Null,
                    ])
                })
                .collect());
        }
        if template.starts_with("SELECT count(*)") {
            return Ok(vec![Row::new(vec![SqlValue::Int(state.count(statement))])]);
        }

        Err(fail(&statement.to_sql(&MysqlDialect), "unsupported query"))
    }
}

// -------------------------------------------------------------------------
// Models
// -------------------------------------------------------------------------

pub struct User;

impl Model for User {
    fn describe() -> SchemaResult<ModelDescriptor> {
        ModelDescriptor::builder("users")
            .column(
                ColumnDescriptor::new("id", DataType::Int)
                    .field("ID")
                    .primary_key()
                    .auto_increment(),
            )
            .column(
                ColumnDescriptor::new("name", DataType::String)
                    .field("Name")
                    .size(64)
                    .not_null()
                    .default_value("O'Neil"),
            )
            .column(
                ColumnDescriptor::new("email", DataType::String)
                    .field("Email")
                    .unique(),
            )
            .index(IndexDescriptor::new(
                "idx_users_name",
                vec![IndexOption::column("name")],
            ))
            .build()
    }
}

pub struct Order;

impl Model for Order {
    fn describe() -> SchemaResult<ModelDescriptor> {
        ModelDescriptor::builder("orders")
            .column(
                ColumnDescriptor::new("id", DataType::Int)
                    .field("ID")
                    .primary_key()
                    .auto_increment(),
            )
            .column(
                ColumnDescriptor::new("user_id", DataType::Int)
                    .field("UserID")
                    .not_null(),
            )
            .column(ColumnDescriptor::new("amount", DataType::Int).field("Amount"))
            .relationship(RelationshipDescriptor::belongs_to(
                "User",
                ConstraintDescriptor::foreign_key("fk_orders_user", "users")
                    .columns(["user_id"])
                    .references(["id"])
                    .field("UserID")
                    .reference_model(ModelSource::of::<User>())
                    .on_delete(ReferentialAction::Cascade),
            ))
            .index(IndexDescriptor::new(
                "fk_orders_user",
                vec![IndexOption::column("user_id")],
            ))
            .check(CheckConstraintDescriptor::new("chk_orders_amount", "amount >= 0").field("Amount"))
            .build()
    }
}

pub struct Language;

impl Model for Language {
    fn describe() -> SchemaResult<ModelDescriptor> {
        ModelDescriptor::builder("languages")
            .column(ColumnDescriptor::new("code", DataType::String).size(8).primary_key())
            .build()
    }
}

pub fn user_languages() -> JoinTable {
    JoinTable::new("user_languages")
        .side(
            JoinSide::new("speakers")
                .column("speaker_id", "id", DataType::Int)
                .on_delete(ReferentialAction::Cascade),
        )
        .side(
            JoinSide::new("languages")
                .column("language_code", "code", DataType::String)
                .model(ModelSource::of::<Language>()),
        )
}

/// A user model with a many-to-many relationship to languages.
pub struct Speaker;

impl Model for Speaker {
    fn describe() -> SchemaResult<ModelDescriptor> {
        ModelDescriptor::builder("speakers")
            .column(ColumnDescriptor::new("id", DataType::Int).primary_key())
            .relationship(RelationshipDescriptor::many_to_many(
                "Languages",
                "languages",
                user_languages().into_source(),
            ))
            .build()
    }
}

/// A model named `table` with one foreign key per entry of `references`.
pub fn linked(table: &str, references: &[&str]) -> ModelDescriptor {
    let mut builder = ModelDescriptor::builder(table)
        .column(ColumnDescriptor::new("id", DataType::Int).primary_key());
    for reference in references {
        let column = format!("{reference}_id");
        builder = builder
            .column(ColumnDescriptor::new(column.as_str(), DataType::Int))
            .relationship(RelationshipDescriptor::belongs_to(
                *reference,
                ConstraintDescriptor::foreign_key(format!("fk_{table}_{reference}"), *reference)
                    .columns([column.as_str()])
                    .references(["id"]),
            ));
    }
    builder.build().expect("valid test model")
}
