//! Dynamic column values.
//!
//! [`Value`] is what flows through row mappings and filters. It encodes into
//! whatever wire type the server assigned to a placeholder (so `Value::Int`
//! binds to `int2`, `int4`, `int8` or `numeric` columns alike) and decodes the
//! common scalar types back out of result rows. Enum labels travel as
//! [`Value::Text`], domains as their base type, and one-dimensional arrays of
//! any of these as [`Value::Array`].

use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::error::Error;
use std::fmt;
use tokio_postgres::types::{FromSql, IsNull, Kind, ToSql, Type};
use uuid::Uuid;

use crate::error::{DbError, DbResult};

type BoxError = Box<dyn Error + Sync + Send>;

/// A single column value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Numeric(Decimal),
    Text(String),
    Bytes(Vec<u8>),
    Json(serde_json::Value),
    Timestamp(DateTime<Utc>),
    Date(NaiveDate),
    Uuid(Uuid),
    Array(Vec<Value>),
}

impl Value {
    /// Short name of the variant, used in type mismatch errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Numeric(_) => "numeric",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Json(_) => "json",
            Value::Timestamp(_) => "timestamp",
            Value::Date(_) => "date",
            Value::Uuid(_) => "uuid",
            Value::Array(_) => "array",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Numeric(v) => write!(f, "{v}"),
            Value::Text(v) => f.write_str(v),
            Value::Bytes(v) => {
                f.write_str("\\x")?;
                for b in v {
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
            Value::Json(v) => write!(f, "{v}"),
            Value::Timestamp(v) => write!(f, "{}", v.to_rfc3339()),
            Value::Date(v) => write!(f, "{v}"),
            Value::Uuid(v) => write!(f, "{v}"),
            Value::Array(items) => {
                f.write_str("{")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("}")
            }
        }
    }
}

fn mismatch(value: &Value, ty: &Type) -> BoxError {
    format!("cannot encode {} value as {}", value.kind(), ty.name()).into()
}

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        if let Kind::Domain(base) = ty.kind() {
            return self.to_sql(base, out);
        }
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(v) if *ty == Type::BOOL => v.to_sql(ty, out),
            Value::Int(v) => match *ty {
                Type::INT2 => i16::try_from(*v)?.to_sql(ty, out),
                Type::INT4 => i32::try_from(*v)?.to_sql(ty, out),
                Type::INT8 => v.to_sql(ty, out),
                Type::OID => u32::try_from(*v)?.to_sql(ty, out),
                Type::FLOAT4 => (*v as f32).to_sql(ty, out),
                Type::FLOAT8 => (*v as f64).to_sql(ty, out),
                Type::NUMERIC => Decimal::from(*v).to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            Value::Float(v) => match *ty {
                Type::FLOAT4 => (*v as f32).to_sql(ty, out),
                Type::FLOAT8 => v.to_sql(ty, out),
                Type::NUMERIC => Decimal::try_from(*v)?.to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            Value::Numeric(v) if *ty == Type::NUMERIC => v.to_sql(ty, out),
            Value::Text(v) if <&str as ToSql>::accepts(ty) => v.as_str().to_sql(ty, out),
            // Enum values use the label text as their binary form.
            Value::Text(v) if matches!(ty.kind(), Kind::Enum(_)) => {
                out.extend_from_slice(v.as_bytes());
                Ok(IsNull::No)
            }
            Value::Bytes(v) if *ty == Type::BYTEA => v.as_slice().to_sql(ty, out),
            Value::Json(v) if matches!(*ty, Type::JSON | Type::JSONB) => v.to_sql(ty, out),
            Value::Timestamp(v) => match *ty {
                Type::TIMESTAMPTZ => v.to_sql(ty, out),
                Type::TIMESTAMP => v.naive_utc().to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            Value::Date(v) if *ty == Type::DATE => v.to_sql(ty, out),
            Value::Uuid(v) if *ty == Type::UUID => v.to_sql(ty, out),
            Value::Array(items) if matches!(ty.kind(), Kind::Array(_)) => items.to_sql(ty, out),
            _ => Err(mismatch(self, ty)),
        }
    }

    // Type checking happens per variant in `to_sql`; NULL binds to anything.
    fn accepts(_ty: &Type) -> bool {
        true
    }

    tokio_postgres::types::to_sql_checked!();
}

impl<'a> FromSql<'a> for Value {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        match ty.kind() {
            Kind::Domain(base) => return Self::from_sql(base, raw),
            Kind::Enum(_) => return Ok(Value::Text(std::str::from_utf8(raw)?.to_string())),
            Kind::Array(_) => return Ok(Value::Array(Vec::<Value>::from_sql(ty, raw)?)),
            _ => {}
        }
        let value = match *ty {
            Type::BOOL => Value::Bool(bool::from_sql(ty, raw)?),
            Type::INT2 => Value::Int(i16::from_sql(ty, raw)?.into()),
            Type::INT4 => Value::Int(i32::from_sql(ty, raw)?.into()),
            Type::INT8 => Value::Int(i64::from_sql(ty, raw)?),
            Type::OID => Value::Int(u32::from_sql(ty, raw)?.into()),
            Type::FLOAT4 => Value::Float(f32::from_sql(ty, raw)?.into()),
            Type::FLOAT8 => Value::Float(f64::from_sql(ty, raw)?),
            Type::NUMERIC => Value::Numeric(Decimal::from_sql(ty, raw)?),
            Type::BYTEA => Value::Bytes(Vec::<u8>::from_sql(ty, raw)?),
            Type::JSON | Type::JSONB => Value::Json(serde_json::Value::from_sql(ty, raw)?),
            Type::TIMESTAMPTZ => Value::Timestamp(DateTime::<Utc>::from_sql(ty, raw)?),
            Type::TIMESTAMP => Value::Timestamp(NaiveDateTime::from_sql(ty, raw)?.and_utc()),
            Type::DATE => Value::Date(NaiveDate::from_sql(ty, raw)?),
            Type::UUID => Value::Uuid(Uuid::from_sql(ty, raw)?),
            _ if <String as FromSql>::accepts(ty) => Value::Text(String::from_sql(ty, raw)?),
            _ => return Err(format!("unsupported column type {}", ty.name()).into()),
        };
        Ok(value)
    }

    fn from_sql_null(_ty: &Type) -> Result<Self, BoxError> {
        Ok(Value::Null)
    }

    fn accepts(ty: &Type) -> bool {
        match ty.kind() {
            Kind::Enum(_) => return true,
            Kind::Array(member) | Kind::Domain(member) => return <Self as FromSql>::accepts(member),
            _ => {}
        }
        matches!(
            *ty,
            Type::BOOL
                | Type::INT2
                | Type::INT4
                | Type::INT8
                | Type::OID
                | Type::FLOAT4
                | Type::FLOAT8
                | Type::NUMERIC
                | Type::BYTEA
                | Type::JSON
                | Type::JSONB
                | Type::TIMESTAMPTZ
                | Type::TIMESTAMP
                | Type::DATE
                | Type::UUID
        ) || <String as FromSql>::accepts(ty)
    }
}

macro_rules! value_from {
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

value_from! {
    bool => Bool,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    u32 => Int,
    f32 => Float,
    f64 => Float,
    Decimal => Numeric,
    String => Text,
    &str => Text,
    Vec<u8> => Bytes,
    serde_json::Value => Json,
    DateTime<Utc> => Timestamp,
    NaiveDate => Date,
    Uuid => Uuid,
    Vec<Value> => Array,
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Timestamp(v.and_utc())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Coarse grouping of declared PostgreSQL column types.
///
/// Used to reject values that cannot possibly bind to a column before the
/// statement is sent. Types outside the known families (enums, domains,
/// ranges, ...) accept any value at build time; the bind step rejects
/// encodings the column type cannot take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeFamily {
    Bool,
    Int,
    Float,
    Numeric,
    Text,
    Bytes,
    Json,
    Timestamp,
    Date,
    Uuid,
    Array,
    Other,
}

impl TypeFamily {
    /// Classify a declared type string as reported by `format_type`.
    pub fn from_declared(declared: &str) -> Self {
        let lower = declared.trim().to_ascii_lowercase();
        if lower.ends_with("[]") {
            return Self::Array;
        }
        let base = lower.split('(').next().unwrap_or_default().trim();
        match base {
            "boolean" | "bool" => Self::Bool,
            "smallint" | "integer" | "bigint" | "int" | "int2" | "int4" | "int8" | "oid"
            | "smallserial" | "serial" | "bigserial" => Self::Int,
            "real" | "double precision" | "float4" | "float8" => Self::Float,
            "numeric" | "decimal" => Self::Numeric,
            "text" | "character varying" | "varchar" | "character" | "char" | "bpchar"
            | "name" | "citext" => Self::Text,
            "bytea" => Self::Bytes,
            "json" | "jsonb" => Self::Json,
            "timestamp with time zone" | "timestamp without time zone" | "timestamp"
            | "timestamptz" => Self::Timestamp,
            "date" => Self::Date,
            "uuid" => Self::Uuid,
            _ => Self::Other,
        }
    }

    /// Whether a value of this kind can bind to a column of this family.
    pub fn accepts(self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) | (Self::Other, _) => true,
            (Self::Bool, Value::Bool(_)) => true,
            (Self::Int, Value::Int(_)) => true,
            (Self::Float, Value::Float(_) | Value::Int(_)) => true,
            (Self::Numeric, Value::Numeric(_) | Value::Int(_) | Value::Float(_)) => true,
            (Self::Text, Value::Text(_)) => true,
            (Self::Bytes, Value::Bytes(_)) => true,
            (Self::Json, Value::Json(_)) => true,
            (Self::Timestamp, Value::Timestamp(_)) => true,
            (Self::Date, Value::Date(_)) => true,
            (Self::Uuid, Value::Uuid(_)) => true,
            (Self::Array, Value::Array(_)) => true,
            _ => false,
        }
    }

    /// Parse a textual literal (e.g. from the command line) into a value of this family.
    ///
    /// The literal `NULL` (any case) always yields [`Value::Null`].
    pub fn parse_literal(self, input: &str) -> DbResult<Value> {
        if input.eq_ignore_ascii_case("null") {
            return Ok(Value::Null);
        }
        let bad = |what: &str| DbError::validation(format!("cannot parse '{input}' as {what}"));
        let value = match self {
            Self::Bool => match input.to_ascii_lowercase().as_str() {
                "true" | "t" | "yes" | "1" => Value::Bool(true),
                "false" | "f" | "no" | "0" => Value::Bool(false),
                _ => return Err(bad("boolean")),
            },
            Self::Int => Value::Int(input.parse().map_err(|_| bad("integer"))?),
            Self::Float => Value::Float(input.parse().map_err(|_| bad("float"))?),
            Self::Numeric => Value::Numeric(input.parse().map_err(|_| bad("numeric"))?),
            Self::Json => Value::Json(serde_json::from_str(input).map_err(|_| bad("json"))?),
            Self::Timestamp => Value::Timestamp(
                DateTime::parse_from_rfc3339(input)
                    .map(|dt| dt.with_timezone(&Utc))
                    .or_else(|_| {
                        NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M:%S")
                            .map(|dt| dt.and_utc())
                    })
                    .map_err(|_| bad("timestamp"))?,
            ),
            Self::Date => Value::Date(
                NaiveDate::parse_from_str(input, "%Y-%m-%d").map_err(|_| bad("date"))?,
            ),
            Self::Uuid => Value::Uuid(Uuid::parse_str(input).map_err(|_| bad("uuid"))?),
            Self::Bytes => {
                let hex = input.strip_prefix("\\x").ok_or_else(|| bad("bytea"))?;
                if !hex.is_ascii() || hex.len() % 2 != 0 {
                    return Err(bad("bytea"));
                }
                let bytes = (0..hex.len())
                    .step_by(2)
                    .map(|i| u8::from_str_radix(&hex[i..i + 2], 16))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|_| bad("bytea"))?;
                Value::Bytes(bytes)
            }
            Self::Array => match serde_json::from_str(input) {
                Ok(serde_json::Value::Array(items)) => {
                    Value::Array(items.into_iter().map(json_element).collect())
                }
                _ => return Err(bad("array (expected a JSON array)")),
            },
            Self::Text | Self::Other => Value::Text(input.to_string()),
        };
        Ok(value)
    }
}

fn json_element(v: serde_json::Value) -> Value {
    match v {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => n.as_f64().map_or(Value::Null, Value::Float),
        },
        serde_json::Value::String(s) => Value::Text(s),
        other => Value::Json(other),
    }
}
