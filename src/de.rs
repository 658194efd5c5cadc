//! Row deserialization - the struct-scan core.
//!
//! A decoded row (normalized column names plus `PgValue`s) is exposed to
//! serde as a map, so any `Deserialize` destination works: plain structs,
//! renamed fields (`#[serde(rename = "...")]` is the column-tag analog),
//! and embedded structs through `#[serde(flatten)]`.
//!
//! Strict mode checks that every column has a matching destination field.
//! The check runs in `deserialize_struct`, where serde hands us the
//! destination's field list; when the destination uses `flatten`, serde
//! drives plain map deserialization instead and the check cannot apply.
//!
//! Duplicate column names (`SELECT a, a`) are rejected: derived
//! destinations fail with serde's duplicate-field error rather than
//! letting the last occurrence win. Alias duplicated columns instead.

use serde::de::value::{StrDeserializer, U8Deserializer};
use serde::de::{DeserializeOwned, DeserializeSeed, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::forward_to_deserialize_any;

use crate::error::{Error, Result};
use crate::value::PgValue;

/// Scan one decoded row into a `Deserialize` destination.
pub(crate) fn scan_struct<T: DeserializeOwned>(
    names: &[String],
    values: &[PgValue],
    lenient: bool,
) -> Result<T> {
    T::deserialize(RowDeserializer {
        names,
        values,
        lenient,
    })
}

fn json_err(e: serde_json::Error) -> Error {
    Error::Scan(e.to_string())
}

// ============================================================================
// Row Deserializer
// ============================================================================

struct RowDeserializer<'a> {
    names: &'a [String],
    values: &'a [PgValue],
    lenient: bool,
}

impl<'de, 'a> Deserializer<'de> for RowDeserializer<'a> {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_map(RowAccess {
            names: self.names,
            values: self.values,
            index: 0,
        })
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        if !self.lenient {
            for name in self.names {
                if !fields.contains(&name.as_str()) {
                    return Err(Error::MissingField(name.clone()));
                }
            }
        }
        self.deserialize_any(visitor)
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf option unit unit_struct newtype_struct seq tuple
        tuple_struct map enum identifier ignored_any
    }
}

struct RowAccess<'a> {
    names: &'a [String],
    values: &'a [PgValue],
    index: usize,
}

impl<'de, 'a> MapAccess<'de> for RowAccess<'a> {
    type Error = Error;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>> {
        if self.index >= self.names.len() {
            return Ok(None);
        }
        let name = self.names[self.index].as_str();
        seed.deserialize(StrDeserializer::new(name)).map(Some)
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value> {
        let value = &self.values[self.index];
        self.index += 1;
        seed.deserialize(PgValueDeserializer { value })
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.names.len() - self.index)
    }
}

// ============================================================================
// Value Deserializer
// ============================================================================

struct PgValueDeserializer<'a> {
    value: &'a PgValue,
}

impl<'a> PgValueDeserializer<'a> {
    fn mismatch(&self, expected: &str) -> Error {
        Error::Scan(format!(
            "cannot deserialize {} value as {}",
            self.value.kind(),
            expected
        ))
    }
}

impl<'de, 'a> Deserializer<'de> for PgValueDeserializer<'a> {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.value {
            PgValue::Null => visitor.visit_unit(),
            PgValue::Bool(v) => visitor.visit_bool(*v),
            PgValue::Int2(v) => visitor.visit_i16(*v),
            PgValue::Int4(v) => visitor.visit_i32(*v),
            PgValue::Int8(v) => visitor.visit_i64(*v),
            PgValue::Float4(v) => visitor.visit_f32(*v),
            PgValue::Float8(v) => visitor.visit_f64(*v),
            PgValue::Text(s) => visitor.visit_str(s),
            PgValue::Bytea(b) => visitor.visit_bytes(b),
            // Temporal and uuid values bridge through the string forms their
            // serde impls parse.
            PgValue::Uuid(u) => visitor.visit_string(u.to_string()),
            PgValue::Timestamp(t) => {
                visitor.visit_string(t.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
            }
            PgValue::TimestampTz(t) => visitor.visit_string(t.to_rfc3339()),
            PgValue::Date(d) => visitor.visit_string(d.format("%Y-%m-%d").to_string()),
            PgValue::Time(t) => visitor.visit_string(t.format("%H:%M:%S%.f").to_string()),
            PgValue::Json(v) => v.clone().deserialize_any(visitor).map_err(json_err),
            PgValue::Raw { data, .. } => visitor.visit_bytes(data),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        if self.value.is_null() {
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        match self.value {
            PgValue::Text(s) => visitor.visit_enum(StrDeserializer::new(s)),
            PgValue::Json(v) => v
                .clone()
                .deserialize_enum(name, variants, visitor)
                .map_err(json_err),
            _ => Err(self.mismatch("enum")),
        }
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.value {
            // Vec<u8> destinations deserialize as a sequence of bytes.
            PgValue::Bytea(b) => visitor.visit_seq(BytesSeqAccess { iter: b.iter() }),
            PgValue::Raw { data, .. } => visitor.visit_seq(BytesSeqAccess { iter: data.iter() }),
            PgValue::Json(v) => v.clone().deserialize_seq(visitor).map_err(json_err),
            _ => self.deserialize_any(visitor),
        }
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.value {
            PgValue::Bytea(b) => visitor.visit_bytes(b),
            PgValue::Raw { data, .. } => visitor.visit_bytes(data),
            PgValue::Text(s) => visitor.visit_str(s),
            _ => self.deserialize_any(visitor),
        }
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_bytes(visitor)
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        unit unit_struct tuple tuple_struct map struct identifier ignored_any
    }
}

struct BytesSeqAccess<'a> {
    iter: std::slice::Iter<'a, u8>,
}

impl<'de, 'a> SeqAccess<'de> for BytesSeqAccess<'a> {
    type Error = Error;

    fn next_element_seed<T: DeserializeSeed<'de>>(&mut self, seed: T) -> Result<Option<T::Value>> {
        match self.iter.next() {
            Some(b) => seed.deserialize(U8Deserializer::new(*b)).map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use serde::Deserialize;
    use uuid::Uuid;

    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct User {
        id: i64,
        name: String,
        active: bool,
    }

    #[test]
    fn test_scan_plain_struct() {
        let user: User = scan_struct(
            &names(&["id", "name", "active"]),
            &[
                PgValue::Int8(7),
                PgValue::Text("alice".to_string()),
                PgValue::Bool(true),
            ],
            false,
        )
        .unwrap();

        assert_eq!(
            user,
            User {
                id: 7,
                name: "alice".to_string(),
                active: true,
            }
        );
    }

    #[test]
    fn test_scan_column_order_independent() {
        let user: User = scan_struct(
            &names(&["active", "id", "name"]),
            &[
                PgValue::Bool(false),
                PgValue::Int8(1),
                PgValue::Text("bob".to_string()),
            ],
            false,
        )
        .unwrap();
        assert_eq!(user.id, 1);
        assert_eq!(user.name, "bob");
        assert!(!user.active);
    }

    #[test]
    fn test_integer_widening() {
        // An int4 column scans into an i64 field.
        #[derive(Debug, Deserialize)]
        struct Count {
            n: i64,
        }
        let c: Count = scan_struct(&names(&["n"]), &[PgValue::Int4(42)], false).unwrap();
        assert_eq!(c.n, 42);
    }

    #[test]
    fn test_renamed_field() {
        #[derive(Debug, Deserialize)]
        struct Tagged {
            #[serde(rename = "user_id")]
            id: i32,
        }
        let t: Tagged = scan_struct(&names(&["user_id"]), &[PgValue::Int4(3)], false).unwrap();
        assert_eq!(t.id, 3);
    }

    #[test]
    fn test_option_null_and_present() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Opt {
            note: Option<String>,
        }

        let absent: Opt = scan_struct(&names(&["note"]), &[PgValue::Null], false).unwrap();
        assert_eq!(absent, Opt { note: None });

        let present: Opt = scan_struct(
            &names(&["note"]),
            &[PgValue::Text("hi".to_string())],
            false,
        )
        .unwrap();
        assert_eq!(
            present,
            Opt {
                note: Some("hi".to_string())
            }
        );
    }

    #[test]
    fn test_null_into_required_field_errors() {
        let result: Result<User> = scan_struct(
            &names(&["id", "name", "active"]),
            &[
                PgValue::Int8(7),
                PgValue::Null,
                PgValue::Bool(true),
            ],
            false,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_strict_mode_rejects_unmatched_column() {
        let result: Result<User> = scan_struct(
            &names(&["id", "name", "active", "extra"]),
            &[
                PgValue::Int8(7),
                PgValue::Text("alice".to_string()),
                PgValue::Bool(true),
                PgValue::Int4(0),
            ],
            false,
        );
        match result {
            Err(Error::MissingField(column)) => assert_eq!(column, "extra"),
            other => panic!("expected MissingField, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_lenient_mode_ignores_unmatched_column() {
        let user: User = scan_struct(
            &names(&["id", "name", "active", "extra"]),
            &[
                PgValue::Int8(7),
                PgValue::Text("alice".to_string()),
                PgValue::Bool(true),
                PgValue::Int4(0),
            ],
            true,
        )
        .unwrap();
        assert_eq!(user.id, 7);
    }

    #[test]
    fn test_duplicate_columns_rejected() {
        #[derive(Debug, Deserialize)]
        struct Single {
            #[allow(dead_code)]
            a: i64,
        }
        // serde's derived visitor refuses a repeated field, so `SELECT a, a`
        // errors rather than silently keeping the last value.
        let result: Result<Single> = scan_struct(
            &names(&["a", "a"]),
            &[PgValue::Int8(1), PgValue::Int8(2)],
            false,
        );
        assert!(matches!(result, Err(Error::Scan(ref m)) if m.contains("duplicate")));
    }

    #[test]
    fn test_embedded_struct_via_flatten() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Audit {
            created_by: String,
        }

        #[derive(Debug, Deserialize, PartialEq)]
        struct Post {
            id: i32,
            title: String,
            #[serde(flatten)]
            audit: Audit,
        }

        let post: Post = scan_struct(
            &names(&["id", "title", "created_by"]),
            &[
                PgValue::Int4(1),
                PgValue::Text("first".to_string()),
                PgValue::Text("alice".to_string()),
            ],
            // flatten goes through map deserialization, where the strict
            // check does not apply
            false,
        )
        .unwrap();

        assert_eq!(
            post,
            Post {
                id: 1,
                title: "first".to_string(),
                audit: Audit {
                    created_by: "alice".to_string()
                },
            }
        );
    }

    #[test]
    fn test_uuid_and_temporal_fields() {
        #[derive(Debug, Deserialize)]
        struct Event {
            id: Uuid,
            at: chrono::NaiveDateTime,
            tz_at: chrono::DateTime<Utc>,
            day: NaiveDate,
        }

        let id = Uuid::from_bytes([0xab; 16]);
        let at = NaiveDate::from_ymd_opt(2023, 5, 1)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();
        let tz_at = Utc.with_ymd_and_hms(2023, 5, 1, 10, 30, 0).unwrap();
        let day = NaiveDate::from_ymd_opt(2023, 5, 1).unwrap();

        let event: Event = scan_struct(
            &names(&["id", "at", "tz_at", "day"]),
            &[
                PgValue::Uuid(id),
                PgValue::Timestamp(at),
                PgValue::TimestampTz(tz_at),
                PgValue::Date(day),
            ],
            false,
        )
        .unwrap();

        assert_eq!(event.id, id);
        assert_eq!(event.at, at);
        assert_eq!(event.tz_at, tz_at);
        assert_eq!(event.day, day);
    }

    #[test]
    fn test_bytea_into_vec_u8() {
        #[derive(Debug, Deserialize)]
        struct Blob {
            data: Vec<u8>,
        }
        let blob: Blob = scan_struct(
            &names(&["data"]),
            &[PgValue::Bytea(vec![1, 2, 3])],
            false,
        )
        .unwrap();
        assert_eq!(blob.data, vec![1, 2, 3]);
    }

    #[test]
    fn test_json_column_into_nested_value() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Settings {
            theme: String,
            volume: i32,
        }

        #[derive(Debug, Deserialize)]
        struct Profile {
            settings: Settings,
        }

        let profile: Profile = scan_struct(
            &names(&["settings"]),
            &[PgValue::Json(
                serde_json::json!({"theme": "dark", "volume": 11}),
            )],
            false,
        )
        .unwrap();

        assert_eq!(
            profile.settings,
            Settings {
                theme: "dark".to_string(),
                volume: 11,
            }
        );
    }

    #[test]
    fn test_text_into_unit_enum() {
        #[derive(Debug, Deserialize, PartialEq)]
        #[serde(rename_all = "lowercase")]
        enum Status {
            Active,
            Banned,
        }

        #[derive(Debug, Deserialize)]
        struct Account {
            status: Status,
        }

        let account: Account = scan_struct(
            &names(&["status"]),
            &[PgValue::Text("banned".to_string())],
            false,
        )
        .unwrap();
        assert_eq!(account.status, Status::Banned);
    }

    #[test]
    fn test_type_mismatch_reports_kinds() {
        #[derive(Debug, Deserialize)]
        struct Wrong {
            id: bool,
        }
        let result: Result<Wrong> = scan_struct(&names(&["id"]), &[PgValue::Int4(1)], false);
        assert!(result.is_err());
    }
}
