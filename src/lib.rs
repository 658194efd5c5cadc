//! Struct-scanning query interface for tokio-postgres connection pools.
//!
//! This crate gives a `deadpool-postgres` pool a convenience query surface
//! in which result rows populate caller-supplied structs: column names are
//! normalized (lowercased by default) and matched against `serde` field
//! names, with `#[serde(rename = "...")]` as the column tag and
//! `#[serde(flatten)]` for embedded structs.
//!
//! Architecture:
//! - `mapper`: cached column-name normalization
//! - `value`: dynamic `PgValue` decode/encode via the driver's type system
//! - `de`: serde deserializer over a decoded row (the struct-scan core)
//! - `rows` / `row`: result-set and single-row wrappers
//! - `pool` / `transaction`: pool, connection and transaction wrappers
//! - `rebind`: `?` → `$n` placeholder rewriting
//!
//! Pooling, the wire protocol, and per-type value codecs are delegated to
//! `tokio-postgres` and `deadpool-postgres`.
//!
//! ```no_run
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct User {
//!     id: i64,
//!     name: String,
//! }
//!
//! # async fn demo() -> pgscan::Result<()> {
//! let pool = pgscan::Pool::connect(
//!     pgscan::PoolOptions::new("postgresql://localhost/app"),
//! )
//! .await?;
//!
//! let users: Vec<User> = pool
//!     .query_scan("SELECT id, name FROM users", &[])
//!     .await?;
//! # let _ = users;
//! # Ok(())
//! # }
//! ```

mod de;
mod error;
mod mapper;
mod pool;
mod rebind;
mod result;
mod row;
mod rows;
mod transaction;
mod value;

#[cfg(test)]
mod tests;

pub use error::{Error, Result};
pub use mapper::{default_mapper, lowercase, Mapper, NameFn};
pub use pool::{Connection, Pool, PoolOptions};
pub use rebind::rebind;
pub use result::ExecResult;
pub use row::Row;
pub use rows::Rows;
pub use transaction::Transaction;
pub use value::{JsonValue, PgValue};
