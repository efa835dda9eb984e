//! Connection pool for MySQL.

use std::sync::Arc;

use mysql_async::{Conn, Opts, Pool, PoolConstraints, PoolOpts};
use tracing::{debug, info};

use crate::config::MysqlConfig;
use crate::error::{MysqlError, MysqlResult};
use crate::session::MysqlSession;

/// Connection limits for the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Maximum number of connections in the pool.
    pub max_connections: usize,
    /// Minimum number of connections to keep alive.
    pub min_connections: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 1,
        }
    }
}

/// A pool of MySQL connections handing out migration sessions.
#[derive(Clone)]
pub struct MysqlPool {
    inner: Pool,
    config: Arc<MysqlConfig>,
}

impl MysqlPool {
    /// Create a pool from configuration.
    pub async fn new(config: MysqlConfig) -> MysqlResult<Self> {
        Self::with_pool_config(config, PoolConfig::default()).await
    }

    /// Create a pool with custom limits.
    pub async fn with_pool_config(
        config: MysqlConfig,
        pool_config: PoolConfig,
    ) -> MysqlResult<Self> {
        let constraints =
            PoolConstraints::new(pool_config.min_connections, pool_config.max_connections)
                .ok_or_else(|| {
                    MysqlError::config(format!(
                        "min_connections ({}) exceeds max_connections ({})",
                        pool_config.min_connections, pool_config.max_connections
                    ))
                })?;
        let opts = config
            .to_opts_builder()
            .pool_opts(PoolOpts::new().with_constraints(constraints));

        let pool = Pool::new(Opts::from(opts));

        info!(
            host = %config.host,
            port = %config.port,
            database = %config.database,
            max_connections = %pool_config.max_connections,
            "MySQL connection pool created"
        );

        Ok(Self {
            inner: pool,
            config: Arc::new(config),
        })
    }

    /// Create a pool from a `mysql://` URL.
    pub async fn from_url(url: impl AsRef<str>) -> MysqlResult<Self> {
        Self::new(MysqlConfig::from_url(url)?).await
    }

    /// Check out a connection and wrap it in a session.
    ///
    /// The connection returns to the pool when the session is dropped.
    pub async fn session(&self) -> MysqlResult<MysqlSession> {
        Ok(MysqlSession::new(self.get_conn().await?))
    }

    async fn get_conn(&self) -> MysqlResult<Conn> {
        debug!("Acquiring connection from pool");
        match self.config.connect_timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.inner.get_conn())
                .await
                .map_err(|_| {
                    MysqlError::timeout(format!("no connection after {}s", timeout.as_secs()))
                })?
                .map_err(MysqlError::from),
            None => Ok(self.inner.get_conn().await?),
        }
    }

    /// The connection settings.
    pub fn config(&self) -> &MysqlConfig {
        &self.config
    }

    /// Disconnect all connections and close the pool.
    pub async fn disconnect(self) -> MysqlResult<()> {
        self.inner.disconnect().await?;
        info!("MySQL connection pool closed");
        Ok(())
    }
}
