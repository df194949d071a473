//! Wire-side types: the tags a statement or result column is declared with,
//! and the values that cross the statement/result boundary.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::BindError;

/// Target-side type identifier.
///
/// Closed set. Every tag except [`WireType::RowId`] accepts SQL NULL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum WireType {
    Bit,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Real,
    Float,
    Double,
    Numeric,
    Decimal,
    Boolean,
    Char,
    Varchar,
    LongVarchar,
    NChar,
    NVarchar,
    Clob,
    Date,
    Time,
    Timestamp,
    TimestampWithTimezone,
    Binary,
    VarBinary,
    LongVarBinary,
    Blob,
    Uuid,
    Json,
    RowId,
    Other,
    Null,
}

impl WireType {
    /// Every tag, in declaration order.
    pub const ALL: [WireType; 30] = [
        WireType::Bit,
        WireType::TinyInt,
        WireType::SmallInt,
        WireType::Integer,
        WireType::BigInt,
        WireType::Real,
        WireType::Float,
        WireType::Double,
        WireType::Numeric,
        WireType::Decimal,
        WireType::Boolean,
        WireType::Char,
        WireType::Varchar,
        WireType::LongVarchar,
        WireType::NChar,
        WireType::NVarchar,
        WireType::Clob,
        WireType::Date,
        WireType::Time,
        WireType::Timestamp,
        WireType::TimestampWithTimezone,
        WireType::Binary,
        WireType::VarBinary,
        WireType::LongVarBinary,
        WireType::Blob,
        WireType::Uuid,
        WireType::Json,
        WireType::RowId,
        WireType::Other,
        WireType::Null,
    ];

    /// Canonical SQL-style name.
    pub fn name(self) -> &'static str {
        match self {
            WireType::Bit => "BIT",
            WireType::TinyInt => "TINYINT",
            WireType::SmallInt => "SMALLINT",
            WireType::Integer => "INTEGER",
            WireType::BigInt => "BIGINT",
            WireType::Real => "REAL",
            WireType::Float => "FLOAT",
            WireType::Double => "DOUBLE",
            WireType::Numeric => "NUMERIC",
            WireType::Decimal => "DECIMAL",
            WireType::Boolean => "BOOLEAN",
            WireType::Char => "CHAR",
            WireType::Varchar => "VARCHAR",
            WireType::LongVarchar => "LONGVARCHAR",
            WireType::NChar => "NCHAR",
            WireType::NVarchar => "NVARCHAR",
            WireType::Clob => "CLOB",
            WireType::Date => "DATE",
            WireType::Time => "TIME",
            WireType::Timestamp => "TIMESTAMP",
            WireType::TimestampWithTimezone => "TIMESTAMP_WITH_TIMEZONE",
            WireType::Binary => "BINARY",
            WireType::VarBinary => "VARBINARY",
            WireType::LongVarBinary => "LONGVARBINARY",
            WireType::Blob => "BLOB",
            WireType::Uuid => "UUID",
            WireType::Json => "JSON",
            WireType::RowId => "ROWID",
            WireType::Other => "OTHER",
            WireType::Null => "NULL",
        }
    }

    /// Whether an absence marker may be bound with this tag.
    pub fn is_nullable(self) -> bool {
        !matches!(self, WireType::RowId)
    }

    /// Inclusive integer bounds for the integral tags.
    pub fn integer_bounds(self) -> Option<(i64, i64)> {
        match self {
            WireType::TinyInt => Some((i8::MIN as i64, i8::MAX as i64)),
            WireType::SmallInt => Some((i16::MIN as i64, i16::MAX as i64)),
            WireType::Integer => Some((i32::MIN as i64, i32::MAX as i64)),
            WireType::BigInt => Some((i64::MIN, i64::MAX)),
            _ => None,
        }
    }

    pub fn is_integral(self) -> bool {
        self.integer_bounds().is_some()
    }

    /// Approximate numeric tags.
    pub fn is_floating(self) -> bool {
        matches!(self, WireType::Real | WireType::Float | WireType::Double)
    }

    /// Exact numerics carried as decimal text.
    pub fn is_decimal(self) -> bool {
        matches!(self, WireType::Numeric | WireType::Decimal)
    }

    pub fn is_textual(self) -> bool {
        matches!(
            self,
            WireType::Char
                | WireType::Varchar
                | WireType::LongVarchar
                | WireType::NChar
                | WireType::NVarchar
                | WireType::Clob
        )
    }

    pub fn is_binary(self) -> bool {
        matches!(
            self,
            WireType::Binary | WireType::VarBinary | WireType::LongVarBinary | WireType::Blob
        )
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WireType {
    type Err = BindError;

    /// Accepts canonical names case-insensitively plus common driver aliases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        if let Some(w) = WireType::ALL.iter().find(|w| w.name() == upper) {
            return Ok(*w);
        }
        let alias = match upper.as_str() {
            "BOOL" => WireType::Boolean,
            "INT1" => WireType::TinyInt,
            "INT2" => WireType::SmallInt,
            "INT" | "INT4" => WireType::Integer,
            "INT8" => WireType::BigInt,
            "FLOAT4" => WireType::Real,
            "FLOAT8" | "DOUBLE PRECISION" => WireType::Double,
            "TEXT" | "STRING" | "CHARACTER VARYING" => WireType::Varchar,
            "CHARACTER" | "BPCHAR" => WireType::Char,
            "BYTEA" => WireType::VarBinary,
            "TIMESTAMPTZ" | "TIMESTAMP WITH TIME ZONE" => WireType::TimestampWithTimezone,
            "DATETIME" => WireType::Timestamp,
            "JSONB" => WireType::Json,
            _ => {
                return Err(BindError::Config(format!("Unknown wire type: '{}'", s)));
            }
        };
        Ok(alias)
    }
}

impl TryFrom<String> for WireType {
    type Error = BindError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<WireType> for String {
    fn from(w: WireType) -> Self {
        w.name().to_string()
    }
}

/// A value as carried across the statement/result boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Exact decimal, canonical text form.
    Numeric(String),
    Text(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Uuid(Uuid),
    Json(serde_json::Value),
}

impl WireValue {
    pub fn is_null(&self) -> bool {
        matches!(self, WireValue::Null)
    }

    /// Short name of the value's shape, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            WireValue::Null => "null",
            WireValue::Bool(_) => "bool",
            WireValue::Int(_) => "int",
            WireValue::Float(_) => "float",
            WireValue::Numeric(_) => "numeric",
            WireValue::Text(_) => "text",
            WireValue::Bytes(_) => "bytes",
            WireValue::Date(_) => "date",
            WireValue::Time(_) => "time",
            WireValue::Timestamp(_) => "timestamp",
            WireValue::TimestampTz(_) => "timestamptz",
            WireValue::Uuid(_) => "uuid",
            WireValue::Json(_) => "json",
        }
    }

    /// Text form used by drivers that only carry scalars and strings.
    pub fn to_text(&self) -> Option<String> {
        match self {
            WireValue::Null => None,
            WireValue::Bool(b) => Some(b.to_string()),
            WireValue::Int(i) => Some(i.to_string()),
            WireValue::Float(f) => Some(f.to_string()),
            WireValue::Numeric(s) | WireValue::Text(s) => Some(s.clone()),
            WireValue::Bytes(b) => Some(String::from_utf8_lossy(b).into_owned()),
            WireValue::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
            WireValue::Time(t) => Some(t.format("%H:%M:%S%.f").to_string()),
            WireValue::Timestamp(ts) => Some(ts.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
            WireValue::TimestampTz(dt) => Some(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            WireValue::Uuid(u) => Some(u.hyphenated().to_string()),
            WireValue::Json(v) => Some(v.to_string()),
        }
    }
}

impl fmt::Display for WireValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireValue::Null => f.write_str("NULL"),
            WireValue::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            WireValue::Text(s) => write!(f, "'{}'", s),
            other => f.write_str(&other.to_text().unwrap_or_default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_canonical_and_alias() {
        assert_eq!("varchar".parse::<WireType>().unwrap(), WireType::Varchar);
        assert_eq!("INT8".parse::<WireType>().unwrap(), WireType::BigInt);
        assert_eq!(
            "timestamptz".parse::<WireType>().unwrap(),
            WireType::TimestampWithTimezone
        );
        assert!("NOPE".parse::<WireType>().is_err());
    }

    #[test]
    fn test_display_round_trips_through_from_str() {
        for w in WireType::ALL {
            assert_eq!(w.to_string().parse::<WireType>().unwrap(), w);
        }
    }

    #[test]
    fn test_only_rowid_rejects_null() {
        let non_nullable: Vec<WireType> =
            WireType::ALL.into_iter().filter(|w| !w.is_nullable()).collect();
        assert_eq!(non_nullable, vec![WireType::RowId]);
    }

    #[test]
    fn test_integer_bounds() {
        assert_eq!(WireType::TinyInt.integer_bounds(), Some((-128, 127)));
        assert_eq!(WireType::SmallInt.integer_bounds(), Some((-32768, 32767)));
        assert_eq!(WireType::Varchar.integer_bounds(), None);
    }

    #[test]
    fn test_serde_uses_names() {
        let json = serde_json::to_string(&WireType::TimestampWithTimezone).unwrap();
        assert_eq!(json, "\"TIMESTAMP_WITH_TIMEZONE\"");
        let back: WireType = serde_json::from_str("\"bytea\"").unwrap();
        assert_eq!(back, WireType::VarBinary);
    }
}
