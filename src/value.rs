//! Application-side values and the type identifiers carried alongside them.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use uuid::Uuid;

/// Identifies an application type for converter resolution.
///
/// Built-in identifiers cover every [`Value`] shape. User types are created
/// with [`AppType::new`] and placed in the hierarchy with
/// [`ConverterRegistry::declare_subtype`](crate::registry::ConverterRegistry::declare_subtype).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppType(Cow<'static, str>);

impl AppType {
    pub const BOOL: AppType = AppType(Cow::Borrowed("bool"));
    pub const I16: AppType = AppType(Cow::Borrowed("i16"));
    pub const I32: AppType = AppType(Cow::Borrowed("i32"));
    pub const I64: AppType = AppType(Cow::Borrowed("i64"));
    pub const F32: AppType = AppType(Cow::Borrowed("f32"));
    pub const F64: AppType = AppType(Cow::Borrowed("f64"));
    pub const CHAR: AppType = AppType(Cow::Borrowed("char"));
    pub const STRING: AppType = AppType(Cow::Borrowed("string"));
    pub const BYTES: AppType = AppType(Cow::Borrowed("bytes"));
    pub const DATE: AppType = AppType(Cow::Borrowed("date"));
    pub const TIME: AppType = AppType(Cow::Borrowed("time"));
    pub const TIMESTAMP: AppType = AppType(Cow::Borrowed("timestamp"));
    pub const TIMESTAMPTZ: AppType = AppType(Cow::Borrowed("timestamptz"));
    pub const UUID: AppType = AppType(Cow::Borrowed("uuid"));
    pub const JSON: AppType = AppType(Cow::Borrowed("json"));
    /// Root of every declared enum.
    pub const ENUM: AppType = AppType(Cow::Borrowed("enum"));
    /// Any value, dispatched on its natural type.
    pub const OBJECT: AppType = AppType(Cow::Borrowed("object"));

    /// Built-in identifiers.
    pub const BUILTIN: [AppType; 17] = [
        AppType::BOOL,
        AppType::I16,
        AppType::I32,
        AppType::I64,
        AppType::F32,
        AppType::F64,
        AppType::CHAR,
        AppType::STRING,
        AppType::BYTES,
        AppType::DATE,
        AppType::TIME,
        AppType::TIMESTAMP,
        AppType::TIMESTAMPTZ,
        AppType::UUID,
        AppType::JSON,
        AppType::ENUM,
        AppType::OBJECT,
    ];

    /// Create a user-defined type identifier.
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// Look up a built-in identifier by name.
    pub fn builtin(name: &str) -> Option<AppType> {
        Self::BUILTIN.into_iter().find(|t| t.name() == name)
    }
}

impl fmt::Display for AppType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AppType {
    fn from(name: &str) -> Self {
        AppType::new(name)
    }
}

/// Dynamic application value.
///
/// `Null` is the single absence marker: every converter extracts SQL NULL as
/// `Value::Null`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Char(char),
    String(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Uuid(Uuid),
    Json(serde_json::Value),
    /// Enum variant name; the concrete enum travels as the [`AppType`].
    Enum(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The built-in type this value naturally belongs to.
    pub fn natural_type(&self) -> AppType {
        match self {
            Value::Null => AppType::OBJECT,
            Value::Bool(_) => AppType::BOOL,
            Value::I16(_) => AppType::I16,
            Value::I32(_) => AppType::I32,
            Value::I64(_) => AppType::I64,
            Value::F32(_) => AppType::F32,
            Value::F64(_) => AppType::F64,
            Value::Char(_) => AppType::CHAR,
            Value::String(_) => AppType::STRING,
            Value::Bytes(_) => AppType::BYTES,
            Value::Date(_) => AppType::DATE,
            Value::Time(_) => AppType::TIME,
            Value::Timestamp(_) => AppType::TIMESTAMP,
            Value::TimestampTz(_) => AppType::TIMESTAMPTZ,
            Value::Uuid(_) => AppType::UUID,
            Value::Json(_) => AppType::JSON,
            Value::Enum(_) => AppType::ENUM,
        }
    }

    /// Widened integer view of any integral value.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I16(v) => Some(*v as i64),
            Value::I32(v) => Some(*v as i64),
            Value::I64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F32(v) => Some(*v as f64),
            Value::F64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Enum(s) => Some(s),
            _ => None,
        }
    }

    /// JSON rendering for tools and logs.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::I16(_) | Value::I32(_) | Value::I64(_) => {
                Json::Number(self.as_i64().unwrap_or_default().into())
            }
            Value::F32(_) | Value::F64(_) => self
                .as_f64()
                .and_then(serde_json::Number::from_f64)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::Json(v) => v.clone(),
            other => Json::String(other.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::I16(v) => write!(f, "{}", v),
            Value::I32(v) => write!(f, "{}", v),
            Value::I64(v) => write!(f, "{}", v),
            Value::F32(v) => write!(f, "{}", v),
            Value::F64(v) => write!(f, "{}", v),
            Value::Char(c) => write!(f, "{}", c),
            Value::String(s) => f.write_str(s),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Time(t) => write!(f, "{}", t.format("%H:%M:%S%.f")),
            Value::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S%.f")),
            Value::TimestampTz(dt) => f.write_str(&dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Value::Uuid(u) => write!(f, "{}", u.hyphenated()),
            Value::Json(v) => write!(f, "{}", v),
            Value::Enum(variant) => f.write_str(variant),
        }
    }
}

// Implement From traits for Value
impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::I16(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::I32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::F32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<char> for Value {
    fn from(v: char) -> Self {
        Value::Char(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveTime> for Value {
    fn from(v: NaiveTime) -> Self {
        Value::Time(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Timestamp(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::TimestampTz(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_from() {
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from(42i32), Value::I32(42));
        assert_eq!(Value::from("hello"), Value::String("hello".to_string()));
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some(7i64)), Value::I64(7));
    }

    #[test]
    fn test_builtin_lookup() {
        assert_eq!(AppType::builtin("i32"), Some(AppType::I32));
        assert_eq!(AppType::builtin("Invoice"), None);
    }

    #[test]
    fn test_user_type_equals_builtin_by_name() {
        assert_eq!(AppType::new("bool"), AppType::BOOL);
    }

    #[test]
    fn test_natural_type() {
        assert_eq!(Value::I16(1).natural_type(), AppType::I16);
        assert_eq!(Value::Enum("Shipped".into()).natural_type(), AppType::ENUM);
        assert_eq!(Value::Null.natural_type(), AppType::OBJECT);
    }
}
