//! Dynamic PostgreSQL values.
//!
//! `PgValue` is the untyped bridge between driver rows and the scanning
//! layer: every result column can be fetched as a `PgValue` regardless of
//! its declared type, and dynamic values can be bound back as parameters.
//!
//! Per-type wire decoding is delegated to the driver's own `FromSql` impls
//! (including the chrono/uuid/serde_json integrations); types we do not
//! model keep their raw bytes and OID.

use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use tokio_postgres::types::{to_sql_checked, FromSql, IsNull, ToSql, Type};
use uuid::Uuid;

pub use serde_json::Value as JsonValue;

type BoxError = Box<dyn std::error::Error + Sync + Send>;

/// A dynamically typed PostgreSQL value.
#[derive(Debug, Clone, PartialEq)]
pub enum PgValue {
    Null,
    Bool(bool),
    Int2(i16),
    Int4(i32),
    Int8(i64),
    Float4(f32),
    Float8(f64),
    Text(String),
    Bytea(Vec<u8>),
    Uuid(Uuid),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Date(NaiveDate),
    Time(NaiveTime),
    Json(JsonValue),
    /// Types we don't handle specially - raw bytes plus the type OID.
    Raw { oid: u32, data: Vec<u8> },
}

impl PgValue {
    /// Check if this value is NULL.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, PgValue::Null)
    }

    /// Short name of the value's shape, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            PgValue::Null => "null",
            PgValue::Bool(_) => "bool",
            PgValue::Int2(_) => "int2",
            PgValue::Int4(_) => "int4",
            PgValue::Int8(_) => "int8",
            PgValue::Float4(_) => "float4",
            PgValue::Float8(_) => "float8",
            PgValue::Text(_) => "text",
            PgValue::Bytea(_) => "bytea",
            PgValue::Uuid(_) => "uuid",
            PgValue::Timestamp(_) => "timestamp",
            PgValue::TimestampTz(_) => "timestamptz",
            PgValue::Date(_) => "date",
            PgValue::Time(_) => "time",
            PgValue::Json(_) => "json",
            PgValue::Raw { .. } => "raw",
        }
    }
}

fn is_text_like(ty: &Type) -> bool {
    *ty == Type::TEXT
        || *ty == Type::VARCHAR
        || *ty == Type::BPCHAR
        || *ty == Type::NAME
        || *ty == Type::UNKNOWN
}

impl<'a> FromSql<'a> for PgValue {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        let value = match ty {
            t if *t == Type::BOOL => PgValue::Bool(bool::from_sql(ty, raw)?),
            t if *t == Type::INT2 => PgValue::Int2(i16::from_sql(ty, raw)?),
            t if *t == Type::INT4 => PgValue::Int4(i32::from_sql(ty, raw)?),
            t if *t == Type::INT8 => PgValue::Int8(i64::from_sql(ty, raw)?),
            t if *t == Type::OID => PgValue::Int8(i64::from(u32::from_sql(ty, raw)?)),
            t if *t == Type::FLOAT4 => PgValue::Float4(f32::from_sql(ty, raw)?),
            t if *t == Type::FLOAT8 => PgValue::Float8(f64::from_sql(ty, raw)?),
            t if is_text_like(t) => PgValue::Text(String::from_sql(ty, raw)?),
            t if *t == Type::BYTEA => PgValue::Bytea(raw.to_vec()),
            t if *t == Type::UUID => PgValue::Uuid(Uuid::from_sql(ty, raw)?),
            t if *t == Type::TIMESTAMP => PgValue::Timestamp(NaiveDateTime::from_sql(ty, raw)?),
            t if *t == Type::TIMESTAMPTZ => {
                PgValue::TimestampTz(DateTime::<Utc>::from_sql(ty, raw)?)
            }
            t if *t == Type::DATE => PgValue::Date(NaiveDate::from_sql(ty, raw)?),
            t if *t == Type::TIME => PgValue::Time(NaiveTime::from_sql(ty, raw)?),
            t if *t == Type::JSON || *t == Type::JSONB => {
                PgValue::Json(JsonValue::from_sql(ty, raw)?)
            }
            t => PgValue::Raw {
                oid: t.oid(),
                data: raw.to_vec(),
            },
        };
        Ok(value)
    }

    fn from_sql_null(_ty: &Type) -> Result<Self, BoxError> {
        Ok(PgValue::Null)
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

impl ToSql for PgValue {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match self {
            PgValue::Null => Ok(IsNull::Yes),
            PgValue::Bool(v) => v.to_sql(ty, out),
            PgValue::Int2(v) => v.to_sql(ty, out),
            PgValue::Int4(v) => v.to_sql(ty, out),
            PgValue::Int8(v) => v.to_sql(ty, out),
            PgValue::Float4(v) => v.to_sql(ty, out),
            PgValue::Float8(v) => v.to_sql(ty, out),
            PgValue::Text(v) => v.to_sql(ty, out),
            PgValue::Bytea(v) => v.to_sql(ty, out),
            PgValue::Uuid(v) => v.to_sql(ty, out),
            PgValue::Timestamp(v) => v.to_sql(ty, out),
            PgValue::TimestampTz(v) => v.to_sql(ty, out),
            PgValue::Date(v) => v.to_sql(ty, out),
            PgValue::Time(v) => v.to_sql(ty, out),
            PgValue::Json(v) => v.to_sql(ty, out),
            PgValue::Raw { data, .. } => {
                out.extend_from_slice(data);
                Ok(IsNull::No)
            }
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}
