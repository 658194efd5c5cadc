//! Execute results.

use crate::error::{Error, Result};

/// Result of a statement that returns no rows (INSERT, UPDATE, DELETE).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecResult {
    rows_affected: u64,
}

impl ExecResult {
    pub(crate) fn new(rows_affected: u64) -> Self {
        Self { rows_affected }
    }

    /// Number of rows the statement affected.
    pub fn rows_affected(&self) -> u64 {
        self.rows_affected
    }

    /// PostgreSQL has no last-insert-id; use a `RETURNING` clause instead.
    pub fn last_insert_id(&self) -> Result<u64> {
        Err(Error::Unsupported(
            "PostgreSQL does not report a last insert id, use a query with RETURNING",
        ))
    }
}
