//! A migration session over one MySQL connection.

use mysql_async::prelude::*;
use mysql_async::{Conn, Params, Value};
use strata_migrate::{MigrateResult, MysqlDialect, Row, Session, SqlValue, Statement};
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::MysqlConfig;
use crate::error::{MysqlError, MysqlResult};

/// A [`Session`] backed by a single MySQL connection.
///
/// DDL is sent as text with values inlined, since MySQL does not prepare
/// most schema statements. Catalog queries bind their values.
pub struct MysqlSession {
    conn: Mutex<Conn>,
    dialect: MysqlDialect,
}

impl MysqlSession {
    /// Wrap an open connection.
    pub fn new(conn: Conn) -> Self {
        Self {
            conn: Mutex::new(conn),
            dialect: MysqlDialect,
        }
    }

    /// Open a dedicated connection outside any pool.
    pub async fn connect(config: &MysqlConfig) -> MysqlResult<Self> {
        let conn = Conn::new(config.to_opts_builder()).await?;
        debug!(host = %config.host, database = %config.database, "Connected to MySQL");
        Ok(Self::new(conn))
    }

    /// Close the connection.
    pub async fn disconnect(self) -> MysqlResult<()> {
        self.conn.into_inner().disconnect().await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl Session for MysqlSession {
    async fn execute(&self, statement: &Statement) -> MigrateResult<u64> {
        let sql = statement.to_sql(&self.dialect);
        debug!(sql = %sql, "Executing statement");

        let mut conn = self.conn.lock().await;
        conn.query_drop(sql.as_str())
            .await
            .map_err(|e| MysqlError::from(e).into_migration_error(&sql))?;
        Ok(conn.affected_rows())
    }

    async fn query(&self, statement: &Statement) -> MigrateResult<Vec<Row>> {
        let (sql, params) = statement.render(&self.dialect);
        debug!(sql = %sql, params = params.len(), "Running query");

        let mut conn = self.conn.lock().await;
        let result = if params.is_empty() {
            conn.query::<mysql_async::Row, _>(sql.as_str()).await
        } else {
            let params = Params::Positional(params.iter().map(to_mysql_value).collect());
            conn.exec::<mysql_async::Row, _, _>(sql.as_str(), params).await
        };
        let rows = result.map_err(|e| MysqlError::from(e).into_migration_error(&sql))?;

        Ok(rows.iter().map(from_mysql_row).collect())
    }
}

fn to_mysql_value(value: &SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::NULL,
        SqlValue::Int(i) => Value::Int(*i),
        SqlValue::Text(s) => Value::from(s.as_str()),
    }
}

fn from_mysql_row(row: &mysql_async::Row) -> Row {
    (0..row.len())
        .map(|i| row.as_ref(i).map(from_mysql_value).unwrap_or(SqlValue::Null))
        .collect::<Vec<_>>()
        .into()
}

/// Catalog results are text or integers; anything else is rendered as text.
fn from_mysql_value(value: &Value) -> SqlValue {
    match value {
        Value::NULL => SqlValue::Null,
        Value::Int(i) => SqlValue::Int(*i),
        Value::UInt(u) => match i64::try_from(*u) {
            Ok(i) => SqlValue::Int(i),
            Err(_) => SqlValue::Text(u.to_string()),
        },
        Value::Bytes(bytes) => SqlValue::Text(String::from_utf8_lossy(bytes).into_owned()),
        Value::Float(f) => SqlValue::Text(f.to_string()),
        Value::Double(d) => SqlValue::Text(d.to_string()),
        Value::Date(year, month, day, hour, minute, second, micro) => SqlValue::Text(format!(
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}.{:06}",
            year, month, day, hour, minute, second, micro
        )),
        Value::Time(negative, days, hours, minutes, seconds, micro) => SqlValue::Text(format!(
            "{}{}:{:02}:{:02}.{:06}",
            if *negative { "-" } else { "" },
            days * 24 + u32::from(*hours),
            minutes,
            seconds,
            micro
        )),
    }
}
