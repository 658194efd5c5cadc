//! Error types for pgscan.
//!
//! Driver and pool failures are forwarded; everything the shim itself can
//! fail on (configuration, decoding, scanning) gets its own variant.

use std::fmt::Display;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Error reported by the underlying tokio-postgres driver.
    #[error("driver error: {0}")]
    Driver(#[from] tokio_postgres::Error),

    /// Error acquiring a connection from the deadpool pool.
    #[error("pool error: {0}")]
    Pool(String),

    /// Invalid connection URL or pool configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A column value could not be decoded into a `PgValue`.
    #[error("decode error for column {column}: {message}")]
    Decode { column: String, message: String },

    /// Struct scanning failed (type mismatch, malformed destination, ...).
    #[error("scan error: {0}")]
    Scan(String),

    /// Strict-mode scan found a column with no matching destination field.
    #[error("missing destination field for column {0}")]
    MissingField(String),

    /// A single-row query returned no rows.
    #[error("no rows in result set")]
    RowNotFound,

    /// Operation the underlying driver does not support.
    #[error("unsupported: {0}")]
    Unsupported(&'static str),
}

impl From<deadpool_postgres::PoolError> for Error {
    fn from(e: deadpool_postgres::PoolError) -> Self {
        Error::Pool(e.to_string())
    }
}

// The row deserializer uses `Error` directly as its serde error type.
impl serde::de::Error for Error {
    fn custom<T: Display>(msg: T) -> Self {
        Error::Scan(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Rebuild an error for replay. Driver errors are not `Clone`, so sticky
/// error state keeps a structured copy where possible and a rendered one
/// otherwise: a replayed `Driver` or `Pool` error comes back as
/// `Scan(rendered)`, not its original variant.
pub(crate) fn replay(e: &Error) -> Error {
    match e {
        Error::MissingField(column) => Error::MissingField(column.clone()),
        Error::RowNotFound => Error::RowNotFound,
        Error::Decode { column, message } => Error::Decode {
            column: column.clone(),
            message: message.clone(),
        },
        Error::Unsupported(what) => Error::Unsupported(what),
        other => Error::Scan(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replay_keeps_structured_variants() {
        assert!(matches!(
            replay(&Error::MissingField("id".into())),
            Error::MissingField(c) if c == "id"
        ));
        assert!(matches!(replay(&Error::RowNotFound), Error::RowNotFound));
        assert!(matches!(
            replay(&Error::Decode { column: "age".into(), message: "bad int".into() }),
            Error::Decode { column, message } if column == "age" && message == "bad int"
        ));
        assert!(matches!(
            replay(&Error::Unsupported("last insert id")),
            Error::Unsupported("last insert id")
        ));
    }

    #[test]
    fn test_replay_renders_unclonable_variants_as_scan() {
        let replayed = replay(&Error::Pool("connection closed".into()));
        match replayed {
            Error::Scan(message) => assert!(message.contains("connection closed")),
            other => panic!("expected Scan, got {other:?}"),
        }
    }
}
