//! Transaction wrapper.
//!
//! Same query surface as a connection; transaction semantics beyond
//! commit/rollback pass straight through to the driver.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio_postgres::types::ToSql;
use tracing::debug;

use crate::error::Result;
use crate::mapper::Mapper;
use crate::rebind::rebind;
use crate::result::ExecResult;
use crate::row::Row;
use crate::rows::Rows;

pub struct Transaction<'a> {
    tx: deadpool_postgres::Transaction<'a>,
    mapper: Arc<Mapper>,
    lenient: bool,
}

impl<'a> Transaction<'a> {
    pub(crate) fn new(
        tx: deadpool_postgres::Transaction<'a>,
        mapper: Arc<Mapper>,
        lenient: bool,
    ) -> Self {
        Self {
            tx,
            mapper,
            lenient,
        }
    }

    /// Run a query inside the transaction and wrap the result set.
    pub async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<Rows> {
        debug!(sql, "query in transaction");
        let stmt = self.tx.prepare_cached(sql).await?;
        let columns: Vec<String> = stmt
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        let rows = self.tx.query(&stmt, params).await?;
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
        debug!(sql, "execute in transaction");
        let stmt = self.tx.prepare_cached(sql).await?;
        let affected = self.tx.execute(&stmt, params).await?;
        Ok(ExecResult::new(affected))
    }

    /// Commit the transaction.
    pub async fn commit(self) -> Result<()> {
        debug!("commit transaction");
        self.tx.commit().await.map_err(Into::into)
    }

    /// Roll back the transaction.
    pub async fn rollback(self) -> Result<()> {
        debug!("rollback transaction");
        self.tx.rollback().await.map_err(Into::into)
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
