//! Result-set wrapper with struct/map/slice scanning.
//!
//! `Rows` buffers the driver rows of one query. Column names come from the
//! prepared statement, so zero-row results still report their columns.
//! Scanning advances a cursor; the first scan failure is sticky and makes
//! later scans short-circuit, so a loop over a damaged result set stops at
//! the damage instead of running past it.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde::de::DeserializeOwned;
use smallvec::SmallVec;

use crate::de::scan_struct;
use crate::error::{replay, Error, Result};
use crate::mapper::Mapper;
use crate::value::PgValue;

/// Inline storage for row values; most tables fit 16 columns.
pub(crate) type ValueBuf = SmallVec<[PgValue; 16]>;

pub struct Rows {
    rows: Vec<tokio_postgres::Row>,
    cursor: usize,
    /// Raw column names, as reported by the statement.
    columns: Arc<[String]>,
    /// Normalized names, computed on the first struct scan.
    normalized: OnceCell<Arc<[String]>>,
    mapper: Arc<Mapper>,
    lenient: bool,
    /// First scan error; later scans short-circuit on it.
    err: Option<Error>,
}

impl Rows {
    pub(crate) fn new(
        rows: Vec<tokio_postgres::Row>,
        columns: Vec<String>,
        mapper: Arc<Mapper>,
        lenient: bool,
    ) -> Self {
        Self {
            rows,
            cursor: 0,
            columns: columns.into(),
            normalized: OnceCell::new(),
            mapper,
            lenient,
            err: None,
        }
    }

    /// Raw column names of the result set.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Total number of buffered rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The sticky scan error, if any scan has failed.
    ///
    /// Later scans replay this error instead of advancing. Variants without
    /// a structured copy (notably [`Error::Driver`]) replay as
    /// [`Error::Scan`] with the rendered message.
    pub fn err(&self) -> Option<&Error> {
        self.err.as_ref()
    }

    /// Consume the result set, surfacing the sticky error if one occurred.
    pub fn close(self) -> Result<()> {
        match self.err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Scan the next row into a `Deserialize` destination.
    ///
    /// Returns `Ok(None)` once the result set is exhausted.
    pub fn struct_scan<T: DeserializeOwned>(&mut self) -> Result<Option<T>> {
        self.check_err()?;
        if self.cursor >= self.rows.len() {
            return Ok(None);
        }
        let names = Arc::clone(self.normalized_names());
        let values = self.record(self.decode_row(self.cursor))?;
        let scanned = self.record(scan_struct(&names, &values, self.lenient))?;
        self.cursor += 1;
        Ok(Some(scanned))
    }

    /// Scan the next row into a raw-column-name → value map.
    pub fn map_scan(&mut self) -> Result<Option<HashMap<String, PgValue>>> {
        self.check_err()?;
        if self.cursor >= self.rows.len() {
            return Ok(None);
        }
        let values = self.record(self.decode_row(self.cursor))?;
        self.cursor += 1;
        let map = self
            .columns
            .iter()
            .cloned()
            .zip(values)
            .collect();
        Ok(Some(map))
    }

    /// Scan the next row into a positional value vector.
    pub fn slice_scan(&mut self) -> Result<Option<Vec<PgValue>>> {
        self.check_err()?;
        if self.cursor >= self.rows.len() {
            return Ok(None);
        }
        let values = self.record(self.decode_row(self.cursor))?;
        self.cursor += 1;
        Ok(Some(values.into_vec()))
    }

    /// Drain the remaining rows into a vector of destinations.
    pub fn scan_all<T: DeserializeOwned>(mut self) -> Result<Vec<T>> {
        let mut out = Vec::with_capacity(self.rows.len() - self.cursor);
        while let Some(item) = self.struct_scan()? {
            out.push(item);
        }
        Ok(out)
    }

    fn check_err(&self) -> Result<()> {
        match &self.err {
            Some(e) => Err(replay(e)),
            None => Ok(()),
        }
    }

    fn normalized_names(&self) -> &Arc<[String]> {
        self.normalized
            .get_or_init(|| self.mapper.normalized(&self.columns))
    }

    fn decode_row(&self, index: usize) -> Result<ValueBuf> {
        let row = &self.rows[index];
        let mut values = ValueBuf::new();
        for i in 0..row.len() {
            let value = row.try_get::<_, PgValue>(i).map_err(|e| Error::Decode {
                column: self
                    .columns
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| i.to_string()),
                message: e.to_string(),
            })?;
            values.push(value);
        }
        Ok(values)
    }

    /// Record the first failure so later scans short-circuit.
    fn record<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if self.err.is_none() {
                self.err = Some(replay(e));
            }
        }
        result
    }
}

impl std::fmt::Debug for Rows {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rows")
            .field("rows", &self.rows.len())
            .field("cursor", &self.cursor)
            .field("columns", &self.columns)
            .finish()
    }
}
