//! Character, binary, UUID and JSON converters.

use uuid::Uuid;

use super::{Converter, unsupported_value, unsupported_wire};
use crate::error::{BindError, BindResult};
use crate::value::{AppType, Value};
use crate::wire::{WireType, WireValue};

// ==================== String ====================

/// `string` converter.
///
/// Reading accepts any scalar wire value in its text form; bytes must be
/// valid UTF-8. Writing as NUMERIC/DECIMAL requires a decimal literal.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringConverter;

impl Converter for StringConverter {
    fn name(&self) -> &str {
        "string"
    }

    fn app_type(&self) -> AppType {
        AppType::STRING
    }

    fn wire_types(&self) -> &[WireType] {
        &[
            WireType::Varchar,
            WireType::Char,
            WireType::LongVarchar,
            WireType::NChar,
            WireType::NVarchar,
            WireType::Clob,
            WireType::Numeric,
            WireType::Decimal,
            WireType::RowId,
        ]
    }

    fn to_wire(&self, value: &Value, wire_type: WireType) -> BindResult<WireValue> {
        let Value::String(s) = value else {
            return Err(unsupported_value(&AppType::STRING, wire_type, value));
        };
        if wire_type.is_decimal() {
            if !is_decimal_literal(s) {
                return Err(BindError::conversion(
                    &AppType::STRING,
                    wire_type,
                    value,
                    "not a decimal literal",
                ));
            }
            return Ok(WireValue::Numeric(s.clone()));
        }
        Ok(WireValue::Text(s.clone()))
    }

    fn from_wire(&self, value: WireValue, observed: Option<WireType>) -> BindResult<Value> {
        match value {
            WireValue::Text(s) | WireValue::Numeric(s) => Ok(Value::String(s)),
            WireValue::Bytes(b) => String::from_utf8(b).map(Value::String).map_err(|e| {
                BindError::conversion(
                    &AppType::STRING,
                    observed.unwrap_or(WireType::VarBinary),
                    format!("<{} bytes>", e.as_bytes().len()),
                    format!("invalid UTF-8: {}", e.utf8_error()),
                )
            }),
            other => other
                .to_text()
                .map(Value::String)
                .ok_or_else(|| unsupported_wire(&AppType::STRING, observed, &other)),
        }
    }
}

fn is_decimal_literal(s: &str) -> bool {
    let s = s.trim();
    let digits = s.strip_prefix(['-', '+']).unwrap_or(s);
    let (int, frac) = digits.split_once('.').unwrap_or((digits, ""));
    !(int.is_empty() && frac.is_empty())
        && int.chars().all(|c| c.is_ascii_digit())
        && frac.chars().all(|c| c.is_ascii_digit())
}

// ==================== Char ====================

/// `char` converter. Trailing blank padding from CHAR(n) columns is ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct CharConverter;

impl Converter for CharConverter {
    fn name(&self) -> &str {
        "char"
    }

    fn app_type(&self) -> AppType {
        AppType::CHAR
    }

    fn wire_types(&self) -> &[WireType] {
        &[WireType::Char, WireType::Varchar, WireType::NChar]
    }

    fn to_wire(&self, value: &Value, wire_type: WireType) -> BindResult<WireValue> {
        match value {
            Value::Char(c) => Ok(WireValue::Text(c.to_string())),
            other => Err(unsupported_value(&AppType::CHAR, wire_type, other)),
        }
    }

    fn from_wire(&self, value: WireValue, observed: Option<WireType>) -> BindResult<Value> {
        let WireValue::Text(s) = value else {
            return Err(unsupported_wire(&AppType::CHAR, observed, &value));
        };
        let trimmed = match s.trim_end_matches(' ') {
            "" if !s.is_empty() => " ",
            t => t,
        };
        let mut chars = trimmed.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(Value::Char(c)),
            _ => Err(BindError::conversion(
                &AppType::CHAR,
                observed.unwrap_or(WireType::Char),
                &s,
                "expected exactly one character",
            )),
        }
    }
}

// ==================== Bytes ====================

/// `bytes` converter.
#[derive(Debug, Clone, Copy, Default)]
pub struct BytesConverter;

impl Converter for BytesConverter {
    fn name(&self) -> &str {
        "bytes"
    }

    fn app_type(&self) -> AppType {
        AppType::BYTES
    }

    fn wire_types(&self) -> &[WireType] {
        &[
            WireType::VarBinary,
            WireType::Binary,
            WireType::LongVarBinary,
            WireType::Blob,
        ]
    }

    fn to_wire(&self, value: &Value, wire_type: WireType) -> BindResult<WireValue> {
        match value {
            Value::Bytes(b) => Ok(WireValue::Bytes(b.clone())),
            other => Err(unsupported_value(&AppType::BYTES, wire_type, other)),
        }
    }

    fn from_wire(&self, value: WireValue, observed: Option<WireType>) -> BindResult<Value> {
        match value {
            WireValue::Bytes(b) => Ok(Value::Bytes(b)),
            WireValue::Text(s) => Ok(Value::Bytes(s.into_bytes())),
            other => Err(unsupported_wire(&AppType::BYTES, observed, &other)),
        }
    }
}

// ==================== UUID ====================

/// `uuid` converter. Character tags carry the hyphenated form, BINARY the
/// 16 raw bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidConverter;

impl Converter for UuidConverter {
    fn name(&self) -> &str {
        "uuid"
    }

    fn app_type(&self) -> AppType {
        AppType::UUID
    }

    fn wire_types(&self) -> &[WireType] {
        &[
            WireType::Uuid,
            WireType::Char,
            WireType::Varchar,
            WireType::Binary,
        ]
    }

    fn to_wire(&self, value: &Value, wire_type: WireType) -> BindResult<WireValue> {
        let Value::Uuid(u) = value else {
            return Err(unsupported_value(&AppType::UUID, wire_type, value));
        };
        match wire_type {
            WireType::Uuid => Ok(WireValue::Uuid(*u)),
            WireType::Binary => Ok(WireValue::Bytes(u.as_bytes().to_vec())),
            _ => Ok(WireValue::Text(u.hyphenated().to_string())),
        }
    }

    fn from_wire(&self, value: WireValue, observed: Option<WireType>) -> BindResult<Value> {
        let wire_type = observed.unwrap_or(WireType::Uuid);
        match value {
            WireValue::Uuid(u) => Ok(Value::Uuid(u)),
            WireValue::Text(s) => Uuid::parse_str(s.trim()).map(Value::Uuid).map_err(|e| {
                BindError::conversion(&AppType::UUID, wire_type, &s, e.to_string())
            }),
            WireValue::Bytes(b) => Uuid::from_slice(&b).map(Value::Uuid).map_err(|e| {
                BindError::conversion(
                    &AppType::UUID,
                    wire_type,
                    format!("<{} bytes>", b.len()),
                    e.to_string(),
                )
            }),
            other => Err(unsupported_wire(&AppType::UUID, observed, &other)),
        }
    }
}

// ==================== JSON ====================

/// `json` converter. Character tags carry the compact serialization.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonConverter;

impl Converter for JsonConverter {
    fn name(&self) -> &str {
        "json"
    }

    fn app_type(&self) -> AppType {
        AppType::JSON
    }

    fn wire_types(&self) -> &[WireType] {
        &[
            WireType::Json,
            WireType::Varchar,
            WireType::LongVarchar,
            WireType::Clob,
            WireType::Other,
        ]
    }

    fn to_wire(&self, value: &Value, wire_type: WireType) -> BindResult<WireValue> {
        let Value::Json(v) = value else {
            return Err(unsupported_value(&AppType::JSON, wire_type, value));
        };
        match wire_type {
            WireType::Json | WireType::Other => Ok(WireValue::Json(v.clone())),
            _ => Ok(WireValue::Text(v.to_string())),
        }
    }

    fn from_wire(&self, value: WireValue, observed: Option<WireType>) -> BindResult<Value> {
        let wire_type = observed.unwrap_or(WireType::Json);
        let parsed = match value {
            WireValue::Json(v) => Ok(v),
            WireValue::Text(ref s) => serde_json::from_str(s),
            WireValue::Bytes(ref b) => serde_json::from_slice(b),
            other => return Err(unsupported_wire(&AppType::JSON, observed, &other)),
        };
        parsed
            .map(Value::Json)
            .map_err(|e| BindError::conversion(&AppType::JSON, wire_type, "document", e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_reads_scalars_as_text() {
        assert_eq!(
            StringConverter.from_wire(WireValue::Int(42), Some(WireType::Integer)).unwrap(),
            Value::String("42".into())
        );
        assert!(StringConverter
            .from_wire(WireValue::Bytes(vec![0xff, 0xfe]), Some(WireType::Blob))
            .is_err());
    }

    #[test]
    fn test_string_as_numeric_requires_decimal() {
        assert_eq!(
            StringConverter
                .to_wire(&Value::String("-12.50".into()), WireType::Numeric)
                .unwrap(),
            WireValue::Numeric("-12.50".into())
        );
        assert!(StringConverter
            .to_wire(&Value::String("12a".into()), WireType::Numeric)
            .is_err());
        assert!(StringConverter
            .to_wire(&Value::String(".".into()), WireType::Decimal)
            .is_err());
    }

    #[test]
    fn test_char_strips_padding() {
        assert_eq!(
            CharConverter.from_wire(WireValue::Text("x   ".into()), Some(WireType::Char)).unwrap(),
            Value::Char('x')
        );
        assert_eq!(
            CharConverter.from_wire(WireValue::Text("   ".into()), Some(WireType::Char)).unwrap(),
            Value::Char(' ')
        );
        assert!(CharConverter.from_wire(WireValue::Text("xy".into()), None).is_err());
        assert!(CharConverter.from_wire(WireValue::Text(String::new()), None).is_err());
    }

    #[test]
    fn test_uuid_forms() {
        let u = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
        let bytes = UuidConverter.to_wire(&Value::Uuid(u), WireType::Binary).unwrap();
        assert_eq!(
            UuidConverter.from_wire(bytes, Some(WireType::Binary)).unwrap(),
            Value::Uuid(u)
        );
        assert_eq!(
            UuidConverter.to_wire(&Value::Uuid(u), WireType::Varchar).unwrap(),
            WireValue::Text("550e8400-e29b-41d4-a716-446655440000".into())
        );
        assert!(UuidConverter.from_wire(WireValue::Bytes(vec![1, 2]), None).is_err());
    }

    #[test]
    fn test_json_from_text() {
        let v = JsonConverter
            .from_wire(WireValue::Text(r#"{"a":[1,2]}"#.into()), Some(WireType::Varchar))
            .unwrap();
        assert_eq!(v, Value::Json(serde_json::json!({"a": [1, 2]})));
        assert!(JsonConverter.from_wire(WireValue::Text("{".into()), None).is_err());
    }
}
