//! DDL statement builders.
//!
//! Every builder is pure: it turns descriptors into a [`Statement`] and never
//! touches a session. Column types are resolved through the [`Dialect`].

use strata_schema::{
    CheckConstraintDescriptor, ColumnDescriptor, ConstraintDescriptor, IndexDescriptor,
    IndexOption, ModelDescriptor, ModelSource,
};

use crate::config::MigratorConfig;
use crate::dialect::Dialect;
use crate::error::{MigrateResult, MigrationError};
use crate::statement::{Arg, Statement};

/// A `CREATE TABLE` statement plus the work that must follow it.
#[derive(Debug, Clone)]
pub struct CreateTablePlan {
    /// The `CREATE TABLE` statement.
    pub statement: Statement,
    /// Indexes to create once the table exists, in declaration order.
    pub deferred_indexes: Vec<IndexDescriptor>,
    /// Join tables of many-to-many relationships, in declaration order.
    pub join_tables: Vec<ModelSource>,
}

/// Resolve the SQL type of a column: the explicit override, else the
/// dialect's mapping.
pub fn data_type_of(
    dialect: &dyn Dialect,
    table: &str,
    column: &ColumnDescriptor,
) -> MigrateResult<String> {
    let data_type = match column.db_type.as_deref().map(str::trim) {
        Some(explicit) if !explicit.is_empty() => explicit.to_string(),
        _ => dialect.data_type_of(column),
    };

    if data_type.trim().is_empty() {
        return Err(MigrationError::EmptyDataType {
            table: table.to_string(),
            column: column.name.to_string(),
        });
    }
    Ok(data_type)
}

/// The column type followed by `AUTO_INCREMENT`, `NOT NULL`, `UNIQUE` and
/// `DEFAULT`, in that order, each only when set.
pub fn full_data_type(
    dialect: &dyn Dialect,
    table: &str,
    column: &ColumnDescriptor,
) -> MigrateResult<String> {
    let mut sql = data_type_of(dialect, table, column)?;

    if column.auto_increment {
        sql.push_str(" AUTO_INCREMENT");
    }
    if column.not_null {
        sql.push_str(" NOT NULL");
    }
    if column.unique {
        sql.push_str(" UNIQUE");
    }
    if let Some(default) = column.default() {
        sql.push_str(" DEFAULT ");
        if column.data_type.is_textual() {
            sql.push_str(&dialect.explain(default));
        } else {
            sql.push_str(default);
        }
    }

    Ok(sql)
}

/// `CONSTRAINT ? FOREIGN KEY ? REFERENCES ??` with its referential actions.
pub fn build_constraint(constraint: &ConstraintDescriptor) -> Statement {
    let mut stmt = Statement::new("CONSTRAINT ? FOREIGN KEY ? REFERENCES ??")
        .arg(Arg::name(constraint.name.clone()))
        .arg(Arg::columns(constraint.foreign_keys.iter().cloned()))
        .arg(Arg::table(constraint.reference_table.clone()))
        .arg(Arg::columns(constraint.references.iter().cloned()));

    if let Some(action) = constraint.on_delete {
        stmt.push_sql(" ON DELETE ");
        stmt.push_sql(action.as_str());
    }
    if let Some(action) = constraint.on_update {
        stmt.push_sql(" ON UPDATE ");
        stmt.push_sql(action.as_str());
    }

    stmt
}

/// Render one index entry.
pub fn build_index_option(dialect: &dyn Dialect, option: &IndexOption) -> String {
    dialect.build_index_option(option)
}

fn index_columns(dialect: &dyn Dialect, index: &IndexDescriptor) -> Arg {
    Arg::RawList(
        index
            .fields
            .iter()
            .map(|opt| build_index_option(dialect, opt))
            .collect(),
    )
}

fn index_class(index: &IndexDescriptor) -> Arg {
    match index.class.as_deref().map(str::trim) {
        Some(class) if !class.is_empty() => Arg::raw(format!("{class} ")),
        _ => Arg::raw(""),
    }
}

/// Build the `CREATE TABLE` statement for a model.
///
/// Clauses, in order: columns, the primary key (unless a column type already
/// declares one), inline indexes, foreign keys, checks.
pub fn create_table(
    dialect: &dyn Dialect,
    config: &MigratorConfig,
    model: &ModelDescriptor,
) -> MigrateResult<CreateTablePlan> {
    let mut clauses = Vec::new();
    let mut primary_key_in_type = false;

    for column in &model.columns {
        let full = full_data_type(dialect, &model.table, column)?;
        primary_key_in_type |= full.to_ascii_uppercase().contains("PRIMARY KEY");
        clauses.push(
            Statement::new("? ?")
                .arg(Arg::column(column.name.clone()))
                .arg(Arg::raw(full)),
        );
    }

    let primary = model.primary_fields();
    if !primary_key_in_type && !primary.is_empty() {
        clauses.push(
            Statement::new("PRIMARY KEY ?")
                .arg(Arg::columns(primary.iter().map(|c| c.name.clone()))),
        );
    }

    let mut deferred_indexes = Vec::new();
    for index in &model.indexes {
        if config.create_index_after_create_table {
            deferred_indexes.push(index.clone());
            continue;
        }

        let mut clause = Statement::new("?INDEX ? ?")
            .arg(index_class(index))
            .arg(Arg::name(index.name.clone()))
            .arg(index_columns(dialect, index));
        if let Some(comment) = index.comment.as_deref().filter(|c| !c.is_empty()) {
            clause.push(Statement::new(" COMMENT ?").arg(Arg::value(comment)));
        }
        if let Some(index_type) = index.index_type.as_deref().filter(|t| !t.is_empty()) {
            clause.push(Statement::new(" USING ?").arg(Arg::raw(index_type)));
        }
        clauses.push(clause);
    }

    for constraint in model.constraints() {
        clauses.push(build_constraint(constraint));
    }

    for check in &model.checks {
        clauses.push(check_clause(check));
    }

    let mut statement = Statement::new("CREATE TABLE ? (").arg(Arg::table(model.table.clone()));
    statement.push(Statement::join(clauses, ","));
    statement.push_sql(")");
    if let Some(options) = config.table_options_clause() {
        statement.push(Statement::new(" ?").arg(Arg::raw(options)));
    }

    Ok(CreateTablePlan {
        statement,
        deferred_indexes,
        join_tables: model.join_tables().cloned().collect(),
    })
}

fn check_clause(check: &CheckConstraintDescriptor) -> Statement {
    Statement::new("CONSTRAINT ? CHECK (?)")
        .arg(Arg::name(check.name.clone()))
        .arg(Arg::raw(check.expression.clone()))
}

/// `CREATE [class ]INDEX ? ON ??[ COMMENT ?][ USING type]`.
pub fn create_index(dialect: &dyn Dialect, table: &str, index: &IndexDescriptor) -> Statement {
    let mut stmt = Statement::new("CREATE ?INDEX ? ON ??")
        .arg(index_class(index))
        .arg(Arg::name(index.name.clone()))
        .arg(Arg::table(table))
        .arg(index_columns(dialect, index));

    if let Some(comment) = index.comment.as_deref().filter(|c| !c.is_empty()) {
        stmt.push(Statement::new(" COMMENT ?").arg(Arg::value(comment)));
    }
    if let Some(index_type) = index.index_type.as_deref().filter(|t| !t.is_empty()) {
        stmt.push(Statement::new(" USING ?").arg(Arg::raw(index_type)));
    }

    stmt
}

/// `DROP INDEX ? ON ?`.
pub fn drop_index(table: &str, name: &str) -> Statement {
    Statement::new("DROP INDEX ? ON ?")
        .arg(Arg::name(name))
        .arg(Arg::table(table))
}

/// `ALTER TABLE ? RENAME INDEX ? TO ?`.
pub fn rename_index(table: &str, old: &str, new: &str) -> Statement {
    Statement::new("ALTER TABLE ? RENAME INDEX ? TO ?")
        .arg(Arg::table(table))
        .arg(Arg::name(old))
        .arg(Arg::name(new))
}

/// `ALTER TABLE ? ADD ? ?`.
pub fn add_column(
    dialect: &dyn Dialect,
    table: &str,
    column: &ColumnDescriptor,
) -> MigrateResult<Statement> {
    Ok(Statement::new("ALTER TABLE ? ADD ? ?")
        .arg(Arg::table(table))
        .arg(Arg::column(column.name.clone()))
        .arg(Arg::raw(full_data_type(dialect, table, column)?)))
}

/// `ALTER TABLE ? DROP COLUMN ?`.
pub fn drop_column(table: &str, column: &str) -> Statement {
    Statement::new("ALTER TABLE ? DROP COLUMN ?")
        .arg(Arg::table(table))
        .arg(Arg::column(column))
}

/// Change a column's type using the dialect's template.
pub fn alter_column(
    dialect: &dyn Dialect,
    table: &str,
    column: &ColumnDescriptor,
) -> MigrateResult<Statement> {
    Ok(Statement::new(dialect.alter_column_template())
        .arg(Arg::table(table))
        .arg(Arg::column(column.name.clone()))
        .arg(Arg::raw(full_data_type(dialect, table, column)?)))
}

/// `ALTER TABLE ? RENAME COLUMN ? TO ?`.
pub fn rename_column(table: &str, old: &str, new: &str) -> Statement {
    Statement::new("ALTER TABLE ? RENAME COLUMN ? TO ?")
        .arg(Arg::table(table))
        .arg(Arg::column(old))
        .arg(Arg::column(new))
}

/// `ALTER TABLE ? RENAME TO ?`.
pub fn rename_table(old: &str, new: &str) -> Statement {
    Statement::new("ALTER TABLE ? RENAME TO ?")
        .arg(Arg::table(old))
        .arg(Arg::table(new))
}

/// `DROP TABLE IF EXISTS ?`.
pub fn drop_table(table: &str) -> Statement {
    Statement::new("DROP TABLE IF EXISTS ?").arg(Arg::table(table))
}

/// `ALTER TABLE ? ADD CONSTRAINT ? FOREIGN KEY ...`.
pub fn add_foreign_key(table: &str, constraint: &ConstraintDescriptor) -> Statement {
    let mut stmt = Statement::new("ALTER TABLE ? ADD ").arg(Arg::table(table));
    stmt.push(build_constraint(constraint));
    stmt
}

/// `ALTER TABLE ? ADD CONSTRAINT ? CHECK (?)`.
pub fn add_check(table: &str, check: &CheckConstraintDescriptor) -> Statement {
    let mut stmt = Statement::new("ALTER TABLE ? ADD ").arg(Arg::table(table));
    stmt.push(check_clause(check));
    stmt
}

/// `ALTER TABLE ? DROP CONSTRAINT ?`.
pub fn drop_constraint(table: &str, name: &str) -> Statement {
    Statement::new("ALTER TABLE ? DROP CONSTRAINT ?")
        .arg(Arg::table(table))
        .arg(Arg::name(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::MysqlDialect;
    use pretty_assertions::assert_eq;
    use strata_schema::{
        DataType, JoinSide, JoinTable, ReferentialAction, RelationshipDescriptor, SortOrder,
    };

    fn orders() -> ModelDescriptor {
        ModelDescriptor::builder("orders")
            .column(
                ColumnDescriptor::new("id", DataType::Int)
                    .primary_key()
                    .auto_increment(),
            )
            .column(ColumnDescriptor::new("user_id", DataType::Int).not_null())
            .column(
                ColumnDescriptor::new("status", DataType::String)
                    .size(16)
                    .default_value("new"),
            )
            .relationship(RelationshipDescriptor::belongs_to(
                "User",
                ConstraintDescriptor::foreign_key("fk_orders_user", "users")
                    .columns(["user_id"])
                    .references(["id"])
                    .on_delete(ReferentialAction::Cascade),
            ))
            .index(IndexDescriptor::new(
                "idx_orders_status",
                vec![IndexOption::column("status")],
            ))
            .check(CheckConstraintDescriptor::new("chk_orders_user", "user_id > 0"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_full_data_type_clause_order() {
        let col = ColumnDescriptor::new("code", DataType::String)
            .size(8)
            .auto_increment()
            .not_null()
            .unique()
            .default_value("x");
        assert_eq!(
            full_data_type(&MysqlDialect, "t", &col).unwrap(),
            "varchar(8) AUTO_INCREMENT NOT NULL UNIQUE DEFAULT 'x'"
        );
    }

    #[test]
    fn test_textual_default_is_escaped() {
        let col = ColumnDescriptor::new("name", DataType::String)
            .size(32)
            .default_value("O'Brien");
        assert_eq!(
            full_data_type(&MysqlDialect, "users", &col).unwrap(),
            "varchar(32) DEFAULT 'O''Brien'"
        );
    }

    #[test]
    fn test_uuid_default_is_quoted() {
        let col = ColumnDescriptor::new("token", DataType::Uuid)
            .default_value("550e8400-e29b-41d4-a716-446655440000");
        assert_eq!(
            full_data_type(&MysqlDialect, "sessions", &col).unwrap(),
            "char(36) DEFAULT '550e8400-e29b-41d4-a716-446655440000'"
        );

        let col = col.default_value("00000000000000000000000000000000");
        assert_eq!(
            full_data_type(&MysqlDialect, "sessions", &col).unwrap(),
            "char(36) DEFAULT '00000000000000000000000000000000'"
        );
    }

    #[test]
    fn test_raw_default_is_verbatim() {
        let col = ColumnDescriptor::new("created_at", DataType::Time)
            .default_value("CURRENT_TIMESTAMP(3)");
        assert_eq!(
            full_data_type(&MysqlDialect, "users", &col).unwrap(),
            "datetime(3) DEFAULT CURRENT_TIMESTAMP(3)"
        );
    }

    #[test]
    fn test_empty_data_type() {
        let col = ColumnDescriptor::new("shape", DataType::Custom("".into()));
        let err = data_type_of(&MysqlDialect, "places", &col).unwrap_err();
        assert!(matches!(
            err,
            MigrationError::EmptyDataType { ref table, ref column } if table == "places" && column == "shape"
        ));
    }

    #[test]
    fn test_explicit_db_type_wins() {
        let col = ColumnDescriptor::new("id", DataType::Int).db_type("serial PRIMARY KEY");
        assert_eq!(
            data_type_of(&MysqlDialect, "t", &col).unwrap(),
            "serial PRIMARY KEY"
        );
    }

    #[test]
    fn test_build_constraint() {
        let fk = ConstraintDescriptor::foreign_key("fk_a_b", "b")
            .columns(["b_id", "b_region"])
            .references(["id", "region"])
            .on_delete(ReferentialAction::SetNull)
            .on_update(ReferentialAction::Cascade);

        assert_eq!(
            build_constraint(&fk).to_sql(&MysqlDialect),
            "CONSTRAINT `fk_a_b` FOREIGN KEY (`b_id`,`b_region`) REFERENCES `b`(`id`,`region`) ON DELETE SET NULL ON UPDATE CASCADE"
        );
    }

    #[test]
    fn test_create_table() {
        let plan = create_table(&MysqlDialect, &MigratorConfig::new(), &orders()).unwrap();

        assert_eq!(
            plan.statement.to_sql(&MysqlDialect),
            "CREATE TABLE `orders` (\
             `id` bigint AUTO_INCREMENT,\
             `user_id` bigint NOT NULL,\
             `status` varchar(16) DEFAULT 'new',\
             PRIMARY KEY (`id`),\
             INDEX `idx_orders_status` (`status`),\
             CONSTRAINT `fk_orders_user` FOREIGN KEY (`user_id`) REFERENCES `users`(`id`) ON DELETE CASCADE,\
             CONSTRAINT `chk_orders_user` CHECK (user_id > 0))"
        );
        assert!(plan.deferred_indexes.is_empty());
        assert!(plan.join_tables.is_empty());
    }

    #[test]
    fn test_create_table_defers_indexes() {
        let config = MigratorConfig::new()
            .create_index_after_create_table(true)
            .table_options("ENGINE=InnoDB");
        let plan = create_table(&MysqlDialect, &config, &orders()).unwrap();
        let sql = plan.statement.to_sql(&MysqlDialect);

        assert!(!sql.contains("INDEX"));
        assert!(sql.ends_with(") ENGINE=InnoDB"));
        assert!(!sql.contains(",)"));
        assert_eq!(plan.deferred_indexes.len(), 1);
        assert_eq!(plan.deferred_indexes[0].name, "idx_orders_status");
    }

    #[test]
    fn test_create_table_primary_key_in_type() {
        let model = ModelDescriptor::builder("tokens")
            .column(
                ColumnDescriptor::new("id", DataType::Int)
                    .db_type("bigint PRIMARY KEY")
                    .primary_key(),
            )
            .build()
            .unwrap();
        let plan = create_table(&MysqlDialect, &MigratorConfig::new(), &model).unwrap();

        assert_eq!(
            plan.statement.to_sql(&MysqlDialect),
            "CREATE TABLE `tokens` (`id` bigint PRIMARY KEY)"
        );
    }

    #[test]
    fn test_create_table_returns_join_tables() {
        let join = JoinTable::new("user_languages")
            .side(JoinSide::new("users").column("user_id", "id", DataType::Int))
            .side(JoinSide::new("languages").column("language_id", "id", DataType::Int));
        let model = ModelDescriptor::builder("users")
            .column(ColumnDescriptor::new("id", DataType::Int).primary_key())
            .relationship(RelationshipDescriptor::many_to_many(
                "Languages",
                "languages",
                join.into_source(),
            ))
            .build()
            .unwrap();

        let plan = create_table(&MysqlDialect, &MigratorConfig::new(), &model).unwrap();
        assert_eq!(plan.join_tables.len(), 1);
        assert!(!plan.statement.to_sql(&MysqlDialect).contains("user_languages"));
    }

    #[test]
    fn test_create_index() {
        let index = IndexDescriptor::unique(
            "idx_users_email",
            vec![
                IndexOption::column("email").length(20),
                IndexOption::column("tenant").sort(SortOrder::Desc),
            ],
        )
        .comment("login")
        .index_type("BTREE");

        assert_eq!(
            create_index(&MysqlDialect, "users", &index).to_sql(&MysqlDialect),
            "CREATE UNIQUE INDEX `idx_users_email` ON `users`(`email`(20),`tenant` DESC) COMMENT 'login' USING BTREE"
        );
    }

    #[test]
    fn test_index_class_does_not_take_a_placeholder() {
        let index = IndexDescriptor::new("idx_docs_body", vec![IndexOption::column("body")])
            .class("FULLTEXT?");

        assert_eq!(
            create_index(&MysqlDialect, "docs", &index).to_sql(&MysqlDialect),
            "CREATE FULLTEXT? INDEX `idx_docs_body` ON `docs`(`body`)"
        );

        let model = ModelDescriptor::builder("docs")
            .column(ColumnDescriptor::new("body", DataType::String).size(255))
            .index(index)
            .build()
            .unwrap();
        let plan = create_table(&MysqlDialect, &MigratorConfig::new(), &model).unwrap();
        assert_eq!(
            plan.statement.to_sql(&MysqlDialect),
            "CREATE TABLE `docs` (`body` varchar(255),FULLTEXT? INDEX `idx_docs_body` (`body`))"
        );
    }

    #[test]
    fn test_single_statements() {
        let d = MysqlDialect;
        let col = ColumnDescriptor::new("age", DataType::Int).size(32).not_null();

        assert_eq!(
            add_column(&d, "users", &col).unwrap().to_sql(&d),
            "ALTER TABLE `users` ADD `age` int NOT NULL"
        );
        assert_eq!(
            alter_column(&d, "users", &col).unwrap().to_sql(&d),
            "ALTER TABLE `users` MODIFY COLUMN `age` int NOT NULL"
        );
        assert_eq!(
            drop_column("users", "age").to_sql(&d),
            "ALTER TABLE `users` DROP COLUMN `age`"
        );
        assert_eq!(
            rename_column("users", "age", "years").to_sql(&d),
            "ALTER TABLE `users` RENAME COLUMN `age` TO `years`"
        );
        assert_eq!(
            rename_table("users", "people").to_sql(&d),
            "ALTER TABLE `users` RENAME TO `people`"
        );
        assert_eq!(drop_table("users").to_sql(&d), "DROP TABLE IF EXISTS `users`");
        assert_eq!(
            drop_index("users", "idx_a").to_sql(&d),
            "DROP INDEX `idx_a` ON `users`"
        );
        assert_eq!(
            rename_index("users", "idx_a", "idx_b").to_sql(&d),
            "ALTER TABLE `users` RENAME INDEX `idx_a` TO `idx_b`"
        );
        assert_eq!(
            drop_constraint("users", "chk_age").to_sql(&d),
            "ALTER TABLE `users` DROP CONSTRAINT `chk_age`"
        );
        assert_eq!(
            add_check("users", &CheckConstraintDescriptor::new("chk_age", "age >= 0")).to_sql(&d),
            "ALTER TABLE `users` ADD CONSTRAINT `chk_age` CHECK (age >= 0)"
        );
    }
}
