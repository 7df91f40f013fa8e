//! Dynamically typed values bound to placeholders and decoded from rows.
//!
//! Tables are discovered at runtime, so the builders cannot know column types at
//! compile time. [`Value`] carries one scalar and adapts to whatever parameter type
//! the server inferred for its placeholder when it is bound. Numbers and text with no
//! native binary encoding for that type (`numeric`, enums, `date`, `interval`, `inet`...)
//! are sent in text format and parsed by the server.

use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use std::error::Error;
use tokio_postgres::types::{FromSql, Format, IsNull, Kind, ToSql, Type, to_sql_checked};

type BoxError = Box<dyn Error + Sync + Send>;

/// A single SQL value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    Text(String),
    Bytes(Vec<u8>),
    Json(serde_json::Value),
    Uuid(uuid::Uuid),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            Value::Decimal(v) => v.to_f64(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

/// Build a `Vec<Value>` from heterogeneous literals.
///
/// ```ignore
/// let values = pgmap::values![1, "alice", None::<String>];
/// ```
#[macro_export]
macro_rules! values {
    () => {
        ::std::vec::Vec::<$crate::Value>::new()
    };
    ($($v:expr),+ $(,)?) => {
        ::std::vec![$($crate::Value::from($v)),+]
    };
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v.into())
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    i8 => Int,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    u8 => Int,
    u16 => Int,
    u32 => Int,
    f32 => Float,
    f64 => Float,
    Decimal => Decimal,
    String => Text,
    &str => Text,
    Vec<u8> => Bytes,
    &[u8] => Bytes,
    serde_json::Value => Json,
    uuid::Uuid => Uuid,
    NaiveDate => Date,
    NaiveDateTime => Timestamp,
    DateTime<Utc> => TimestampTz,
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

fn is_json(ty: &Type) -> bool {
    *ty == Type::JSON || *ty == Type::JSONB
}

fn mismatch(what: &str, ty: &Type) -> BoxError {
    format!("cannot bind {what} to a parameter of type {ty}").into()
}

fn base_type(ty: &Type) -> &Type {
    match ty.kind() {
        Kind::Domain(inner) => base_type(inner),
        _ => ty,
    }
}

/// Whether `value` has a binary encoding for `ty`; everything else is sent as text.
fn is_native(value: &Value, ty: &Type) -> bool {
    match value {
        Value::Int(_) => [
            Type::INT2,
            Type::INT4,
            Type::INT8,
            Type::OID,
            Type::FLOAT4,
            Type::FLOAT8,
        ]
        .contains(ty),
        Value::Float(_) => *ty == Type::FLOAT4 || *ty == Type::FLOAT8,
        Value::Text(_) => is_json(ty) || *ty == Type::UUID,
        _ => true,
    }
}

fn write_text(text: &str, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    out.extend_from_slice(text.as_bytes());
    Ok(IsNull::No)
}

fn bind_int(v: i64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    if *ty == Type::INT2 {
        i16::try_from(v)?.to_sql(ty, out)
    } else if *ty == Type::INT4 {
        i32::try_from(v)?.to_sql(ty, out)
    } else if *ty == Type::INT8 {
        v.to_sql(ty, out)
    } else if *ty == Type::OID {
        u32::try_from(v)?.to_sql(ty, out)
    } else if *ty == Type::FLOAT4 {
        (v as f32).to_sql(ty, out)
    } else if *ty == Type::FLOAT8 {
        (v as f64).to_sql(ty, out)
    } else {
        Err(mismatch("an integer", ty))
    }
}

fn bind_float(v: f64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    if *ty == Type::FLOAT4 {
        (v as f32).to_sql(ty, out)
    } else if *ty == Type::FLOAT8 {
        v.to_sql(ty, out)
    } else {
        Err(mismatch("a float", ty))
    }
}

fn bind_text(v: &str, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    if is_json(ty) {
        serde_json::from_str::<serde_json::Value>(v)?.to_sql(ty, out)
    } else if *ty == Type::UUID {
        uuid::Uuid::parse_str(v)?.to_sql(ty, out)
    } else {
        Err(mismatch("text", ty))
    }
}

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        let ty = base_type(ty);
        let native = is_native(self, ty);

        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(v) => v.to_sql_checked(ty, out),
            Value::Int(v) if native => bind_int(*v, ty, out),
            Value::Int(v) => write_text(&v.to_string(), out),
            Value::Float(v) if native => bind_float(*v, ty, out),
            Value::Float(v) => write_text(&v.to_string(), out),
            Value::Decimal(v) => v.to_sql_checked(ty, out),
            Value::Text(v) if native => bind_text(v, ty, out),
            Value::Text(v) => write_text(v, out),
            Value::Bytes(v) => v.to_sql_checked(ty, out),
            Value::Json(v) => v.to_sql_checked(ty, out),
            Value::Uuid(v) => v.to_sql_checked(ty, out),
            Value::Date(v) => v.to_sql_checked(ty, out),
            Value::Timestamp(v) => v.to_sql_checked(ty, out),
            Value::TimestampTz(v) => v.to_sql_checked(ty, out),
        }
    }

    fn accepts(_: &Type) -> bool {
        true
    }

    fn encode_format(&self, ty: &Type) -> Format {
        if is_native(self, base_type(ty)) {
            Format::Binary
        } else {
            Format::Text
        }
    }

    to_sql_checked!();
}

impl<'a> FromSql<'a> for Value {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        if let Kind::Domain(inner) = ty.kind() {
            return Self::from_sql(inner, raw);
        }

        let value = if *ty == Type::BOOL {
            Value::Bool(bool::from_sql(ty, raw)?)
        } else if *ty == Type::INT2 {
            Value::Int(i16::from_sql(ty, raw)?.into())
        } else if *ty == Type::INT4 {
            Value::Int(i32::from_sql(ty, raw)?.into())
        } else if *ty == Type::INT8 {
            Value::Int(i64::from_sql(ty, raw)?)
        } else if *ty == Type::OID {
            Value::Int(u32::from_sql(ty, raw)?.into())
        } else if *ty == Type::FLOAT4 {
            Value::Float(f32::from_sql(ty, raw)?.into())
        } else if *ty == Type::FLOAT8 {
            Value::Float(f64::from_sql(ty, raw)?)
        } else if *ty == Type::NUMERIC {
            // NaN and infinities have no Decimal form.
            Decimal::from_sql(ty, raw).map_or_else(|_| Value::Bytes(raw.to_vec()), Value::Decimal)
        } else if <String as FromSql>::accepts(ty) {
            Value::Text(String::from_sql(ty, raw)?)
        } else if *ty == Type::BYTEA {
            Value::Bytes(<Vec<u8>>::from_sql(ty, raw)?)
        } else if is_json(ty) {
            Value::Json(serde_json::Value::from_sql(ty, raw)?)
        } else if *ty == Type::UUID {
            Value::Uuid(uuid::Uuid::from_sql(ty, raw)?)
        } else if *ty == Type::DATE {
            Value::Date(NaiveDate::from_sql(ty, raw)?)
        } else if *ty == Type::TIMESTAMP {
            Value::Timestamp(NaiveDateTime::from_sql(ty, raw)?)
        } else if *ty == Type::TIMESTAMPTZ {
            Value::TimestampTz(DateTime::<Utc>::from_sql(ty, raw)?)
        } else {
            // No scalar mapping (arrays, ranges, inet...): keep the wire bytes.
            Value::Bytes(raw.to_vec())
        };

        Ok(value)
    }

    fn from_sql_null(_: &Type) -> Result<Self, BoxError> {
        Ok(Value::Null)
    }

    fn accepts(_: &Type) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(value: &Value, ty: &Type) -> Result<Vec<u8>, BoxError> {
        let mut out = BytesMut::new();
        match value.to_sql_checked(ty, &mut out)? {
            IsNull::Yes => Ok(Vec::new()),
            IsNull::No => Ok(out.to_vec()),
        }
    }

    #[test]
    fn values_macro_converts_each_literal() {
        let values = values![1, "a", None::<i32>, true];
        assert_eq!(
            values,
            vec![
                Value::Int(1),
                Value::Text("a".to_string()),
                Value::Null,
                Value::Bool(true),
            ]
        );
        assert!(values![].is_empty());
    }

    #[test]
    fn int_adapts_to_inferred_width() {
        assert_eq!(encode(&Value::Int(1), &Type::INT4).unwrap(), vec![0, 0, 0, 1]);
        assert_eq!(encode(&Value::Int(1), &Type::INT2).unwrap(), vec![0, 1]);
        assert_eq!(encode(&Value::Int(1), &Type::INT8).unwrap().len(), 8);
        assert_eq!(encode(&Value::Int(42), &Type::TEXT).unwrap(), b"42".to_vec());
    }

    #[test]
    fn int_out_of_range_for_int2_fails() {
        assert!(encode(&Value::Int(70_000), &Type::INT2).is_err());
    }

    fn is_text_format(value: &Value, ty: &Type) -> bool {
        matches!(value.encode_format(ty), Format::Text)
    }

    #[test]
    fn text_is_left_to_the_server_for_non_text_types() {
        for ty in [Type::INT4, Type::DATE, Type::NUMERIC, Type::INTERVAL, Type::INET] {
            assert!(is_text_format(&Value::Text("x".into()), &ty), "{ty}");
        }
        assert_eq!(
            encode(&Value::Text("2024-01-01".into()), &Type::DATE).unwrap(),
            b"2024-01-01".to_vec()
        );

        let mood = Type::new(
            "mood".into(),
            90_001,
            Kind::Enum(vec!["happy".into(), "sad".into()]),
            "public".into(),
        );
        assert!(is_text_format(&Value::Text("happy".into()), &mood));
        assert_eq!(encode(&Value::Text("happy".into()), &mood).unwrap(), b"happy".to_vec());
    }

    #[test]
    fn numbers_bind_to_numeric_as_text() {
        assert!(is_text_format(&Value::Int(1), &Type::NUMERIC));
        assert_eq!(encode(&Value::Int(12), &Type::NUMERIC).unwrap(), b"12".to_vec());
        assert_eq!(encode(&Value::Float(1.5), &Type::NUMERIC).unwrap(), b"1.5".to_vec());
        assert!(!is_text_format(&Value::Int(1), &Type::INT8));
        assert!(!is_text_format(&Value::Float(1.5), &Type::FLOAT8));
    }

    #[test]
    fn decimal_binds_and_decodes_as_numeric() {
        let price: Decimal = "19.99".parse().unwrap();
        let raw = encode(&Value::Decimal(price), &Type::NUMERIC).unwrap();
        assert!(!is_text_format(&Value::Decimal(price), &Type::NUMERIC));
        assert_eq!(
            Value::from_sql(&Type::NUMERIC, &raw).unwrap(),
            Value::Decimal(price)
        );
        assert!(encode(&Value::Decimal(price), &Type::INT4).is_err());
    }

    #[test]
    fn text_parses_into_uuid_and_json() {
        let id = "67e55044-10b1-426f-9247-bb680e5fe0c8";
        assert_eq!(encode(&Value::Text(id.into()), &Type::UUID).unwrap().len(), 16);
        assert!(encode(&Value::Text("{\"a\":1}".into()), &Type::JSONB).is_ok());
    }

    #[test]
    fn null_binds_to_anything() {
        assert!(encode(&Value::Null, &Type::INT4).unwrap().is_empty());
        assert!(encode(&Value::Null, &Type::BYTEA).unwrap().is_empty());
    }

    #[test]
    fn decodes_scalars_by_type() {
        assert_eq!(Value::from_sql(&Type::INT4, &[0, 0, 0, 7]).unwrap(), Value::Int(7));
        assert_eq!(Value::from_sql(&Type::BOOL, &[1]).unwrap(), Value::Bool(true));
        assert_eq!(
            Value::from_sql(&Type::TEXT, b"alice").unwrap(),
            Value::Text("alice".into())
        );
        assert_eq!(
            <Value as FromSql>::from_sql_null(&Type::TEXT).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn unknown_types_decode_to_raw_bytes() {
        assert_eq!(
            Value::from_sql(&Type::INET, &[1, 2, 3]).unwrap(),
            Value::Bytes(vec![1, 2, 3])
        );
    }

    #[test]
    fn serializes_untagged() {
        let json = serde_json::to_string(&vec![Value::Int(1), Value::Null, "a".into()]).unwrap();
        assert_eq!(json, r#"[1,null,"a"]"#);
    }
}
