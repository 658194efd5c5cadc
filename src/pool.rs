//! Pool and connection wrappers.
//!
//! Pooling itself is delegated to `deadpool-postgres`; this module adopts a
//! pool (or builds one from options) and layers the scanning query surface
//! on top. A `Connection` is a checked-out client with the same surface
//! plus transactions and prepared statements.

use std::sync::Arc;

use deadpool_postgres::{Manager, ManagerConfig, RecyclingMethod, Runtime};
use serde::de::DeserializeOwned;
use tokio_postgres::types::ToSql;
use tokio_postgres::NoTls;
use tracing::debug;

use crate::error::{Error, Result};
use crate::mapper::{default_mapper, Mapper, NameFn};
use crate::rebind::rebind;
use crate::result::ExecResult;
use crate::row::Row;
use crate::rows::Rows;
use crate::transaction::Transaction;

// ============================================================================
// Pool Configuration
// ============================================================================

/// Options for building a pool from a connection URL.
#[derive(Debug, Clone)]
pub struct PoolOptions {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections
    pub max_connections: usize,
    /// Application name reported to the server
    pub application_name: Option<String>,
}

impl PoolOptions {
    /// Create options with defaults for the given URL.
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            max_connections: 10,
            application_name: None,
        }
    }

    /// Set the maximum number of connections.
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the application name reported to the server.
    pub fn application_name(mut self, name: &str) -> Self {
        self.application_name = Some(name.to_string());
        self
    }
}

// ============================================================================
// Pool
// ============================================================================

/// A scanning query interface over a `deadpool-postgres` pool.
#[derive(Clone)]
pub struct Pool {
    pool: deadpool_postgres::Pool,
    mapper: Arc<Mapper>,
    lenient: bool,
}

impl Pool {
    /// Build a pool from options and adopt it.
    pub async fn connect(options: PoolOptions) -> Result<Self> {
        let mut config: tokio_postgres::Config = options
            .url
            .parse()
            .map_err(|e: tokio_postgres::Error| Error::Config(e.to_string()))?;
        if let Some(name) = &options.application_name {
            config.application_name(name);
        }

        let manager = Manager::from_config(
            config,
            NoTls,
            ManagerConfig {
                recycling_method: RecyclingMethod::Fast,
            },
        );
        let pool = deadpool_postgres::Pool::builder(manager)
            .max_size(options.max_connections)
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|e| Error::Config(e.to_string()))?;

        Self::from_pool(pool).await
    }

    /// Adopt an existing pool.
    ///
    /// Verifies that a live connection can be acquired, so a dead pool
    /// fails here rather than at the first query.
    pub async fn from_pool(pool: deadpool_postgres::Pool) -> Result<Self> {
        let client = pool.get().await?;
        if client.is_closed() {
            return Err(Error::Pool(
                "acquired dead connection from pool".to_string(),
            ));
        }
        drop(client);

        Ok(Self {
            pool,
            mapper: default_mapper(),
            lenient: false,
        })
    }

    /// Switch to lenient scanning: columns with no matching destination
    /// field are ignored instead of erroring.
    pub fn lenient(mut self) -> Self {
        self.lenient = true;
        self
    }

    /// Replace the column-name normalization function.
    pub fn set_name_fn(&mut self, name_fn: NameFn) {
        self.mapper = Arc::new(Mapper::new(name_fn));
    }

    /// The mapper used for column-name normalization.
    pub fn mapper(&self) -> &Arc<Mapper> {
        &self.mapper
    }

    /// Check out a connection from the pool.
    pub async fn acquire(&self) -> Result<Connection> {
        debug!("acquiring connection");
        let client = self.pool.get().await?;
        Ok(Connection {
            client,
            mapper: Arc::clone(&self.mapper),
            lenient: self.lenient,
        })
    }

    /// Run a query on a pooled connection and wrap the result set.
    pub async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<Rows> {
        self.acquire().await?.query(sql, params).await
    }

    /// Run a query expected to return a single row.
    ///
    /// Errors are deferred into the returned `Row` and surface at scan
    /// time.
    pub async fn query_row(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Row {
        match self.acquire().await {
            Ok(conn) => conn.query_row(sql, params).await,
            Err(e) => Row::new(Err(e)),
        }
    }

    /// Run a query and scan every row into a destination vector.
    pub async fn query_scan<T: DeserializeOwned>(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<T>> {
        self.query(sql, params).await?.scan_all()
    }

    /// Execute a statement that returns no rows.
    pub async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<ExecResult> {
        self.acquire().await?.execute(sql, params).await
    }

    /// Rewrite `?` placeholders to `$n`.
    pub fn rebind(&self, query: &str) -> String {
        rebind(query)
    }

    /// Name of the wrapped driver.
    pub fn driver_name(&self) -> &'static str {
        "tokio-postgres"
    }
}

// ============================================================================
// Connection
// ============================================================================

/// A connection checked out from the pool.
///
/// When dropped, the connection is returned to the pool.
pub struct Connection {
    client: deadpool_postgres::Object,
    mapper: Arc<Mapper>,
    lenient: bool,
}

impl Connection {
    /// Run a query and wrap the result set.
    pub async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<Rows> {
        debug!(sql, "query");
        let stmt = self.client.prepare_cached(sql).await?;
        let columns: Vec<String> = stmt
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        let rows = self.client.query(&stmt, params).await?;
        Ok(Rows::new(
            rows,
            columns,
            Arc::clone(&self.mapper),
            self.lenient,
        ))
    }

    /// Run a query expected to return a single row; errors defer to scan
    /// time.
    pub async fn query_row(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Row {
        Row::new(self.query(sql, params).await)
    }

    /// Run a query and scan every row into a destination vector.
    pub async fn query_scan<T: DeserializeOwned>(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<T>> {
        self.query(sql, params).await?.scan_all()
    }

    /// Execute a statement that returns no rows.
    pub async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<ExecResult> {
        debug!(sql, "execute");
        let stmt = self.client.prepare_cached(sql).await?;
        let affected = self.client.execute(&stmt, params).await?;
        Ok(ExecResult::new(affected))
    }

    /// Prepare a statement through the connection's statement cache.
    pub async fn prepare(&self, sql: &str) -> Result<tokio_postgres::Statement> {
        self.client.prepare_cached(sql).await.map_err(Into::into)
    }

    /// Begin a transaction on this connection.
    pub async fn transaction(&mut self) -> Result<Transaction<'_>> {
        debug!("begin transaction");
        let tx = self.client.transaction().await?;
        Ok(Transaction::new(
            tx,
            Arc::clone(&self.mapper),
            self.lenient,
        ))
    }

    /// Rewrite `?` placeholders to `$n`.
    pub fn rebind(&self, query: &str) -> String {
        rebind(query)
    }

    /// Name of the wrapped driver.
    pub fn driver_name(&self) -> &'static str {
        "tokio-postgres"
    }

    /// Check if the underlying connection has closed.
    pub fn is_closed(&self) -> bool {
        self.client.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_options_builder() {
        let options = PoolOptions::new("postgresql://localhost/test")
            .max_connections(20)
            .application_name("pgscan-test");

        assert_eq!(options.url, "postgresql://localhost/test");
        assert_eq!(options.max_connections, 20);
        assert_eq!(options.application_name.as_deref(), Some("pgscan-test"));
    }

    #[test]
    fn test_pool_options_defaults() {
        let options = PoolOptions::new("postgresql://localhost/test");
        assert_eq!(options.max_connections, 10);
        assert!(options.application_name.is_none());
    }
}
