//! Single-row wrapper.
//!
//! `Row` defers its query error to scan time: `query_row` never fails at
//! the call site, and the error (or `RowNotFound` for an empty result)
//! surfaces when the caller scans.

use std::collections::HashMap;

use serde::de::DeserializeOwned;

use crate::error::{replay, Error, Result};
use crate::rows::Rows;
use crate::value::PgValue;

pub struct Row {
    inner: Result<Rows>,
}

impl Row {
    pub(crate) fn new(inner: Result<Rows>) -> Self {
        Self { inner }
    }

    /// Scan the row into a `Deserialize` destination.
    ///
    /// Returns `RowNotFound` if the query matched no rows. Extra rows
    /// beyond the first are ignored.
    pub fn struct_scan<T: DeserializeOwned>(self) -> Result<T> {
        let mut rows = self.inner?;
        rows.struct_scan()?.ok_or(Error::RowNotFound)
    }

    /// Scan the row into a raw-column-name → value map.
    pub fn map_scan(self) -> Result<HashMap<String, PgValue>> {
        let mut rows = self.inner?;
        rows.map_scan()?.ok_or(Error::RowNotFound)
    }

    /// Scan the row into a positional value vector.
    pub fn slice_scan(self) -> Result<Vec<PgValue>> {
        let mut rows = self.inner?;
        rows.slice_scan()?.ok_or(Error::RowNotFound)
    }

    /// Column names of the result, or the deferred query error.
    pub fn columns(&self) -> Result<&[String]> {
        match &self.inner {
            Ok(rows) => Ok(rows.columns()),
            Err(e) => Err(replay(e)),
        }
    }

    /// The deferred query error, if the query failed.
    pub fn err(&self) -> Option<&Error> {
        self.inner.as_ref().err()
    }
}

impl std::fmt::Debug for Row {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            Ok(rows) => f.debug_struct("Row").field("rows", rows).finish(),
            Err(e) => f.debug_struct("Row").field("err", e).finish(),
        }
    }
}
