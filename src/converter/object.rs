//! The `object` converter: binds any value by its natural type and reads any
//! column by its observed wire type.

use super::{
    BoolConverter, BytesConverter, CharConverter, Converter, DateConverter, FloatConverter,
    IntegerConverter, JsonConverter, StringConverter, TimeConverter, TimestampConverter,
    TimestampTzConverter, UuidConverter, unsupported_value,
};
use crate::error::BindResult;
use crate::value::{AppType, Value};
use crate::wire::{WireType, WireValue};

/// Converter for values of no fixed type.
///
/// Binding dispatches on the value's shape; reading dispatches on the wire
/// value and the observed tag. The two directions are not inverses for every
/// shape. Text comes back as `Value::String`, so a bound `Value::Char` or
/// `Value::Enum` reads back as a string. Any value bound under a tag other
/// than its natural one reads back in that tag's shape.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectConverter;

impl ObjectConverter {
    /// Default tag of the value's natural converter.
    fn natural_wire_type(value: &Value) -> WireType {
        super::builtin(&value.natural_type())
            .map(|c| c.default_wire_type())
            .unwrap_or(WireType::Other)
    }

    /// Encode through the converter of the value's natural type.
    fn encode(value: &Value, wire_type: WireType) -> BindResult<WireValue> {
        fn via(conv: &dyn Converter, value: &Value, wire_type: WireType) -> BindResult<WireValue> {
            if conv.supports(wire_type) {
                conv.to_wire(value, wire_type)
            } else {
                Err(unsupported_value(&AppType::OBJECT, wire_type, value))
            }
        }

        match value {
            Value::Bool(_) => via(&BoolConverter, value, wire_type),
            Value::I16(_) => via(&IntegerConverter::I16, value, wire_type),
            Value::I32(_) => via(&IntegerConverter::I32, value, wire_type),
            Value::I64(_) => via(&IntegerConverter::I64, value, wire_type),
            Value::F32(_) => via(&FloatConverter::F32, value, wire_type),
            Value::F64(_) => via(&FloatConverter::F64, value, wire_type),
            Value::Char(_) => via(&CharConverter, value, wire_type),
            Value::String(_) => via(&StringConverter, value, wire_type),
            Value::Bytes(_) => via(&BytesConverter, value, wire_type),
            Value::Date(_) => via(&DateConverter, value, wire_type),
            Value::Time(_) => via(&TimeConverter, value, wire_type),
            Value::Timestamp(_) => via(&TimestampConverter, value, wire_type),
            Value::TimestampTz(_) => via(&TimestampTzConverter, value, wire_type),
            Value::Uuid(_) => via(&UuidConverter, value, wire_type),
            Value::Json(_) => via(&JsonConverter, value, wire_type),
            Value::Enum(name) => via(&StringConverter, &Value::String(name.clone()), wire_type),
            Value::Null => Ok(WireValue::Null),
        }
    }
}

impl Converter for ObjectConverter {
    fn name(&self) -> &str {
        "object"
    }

    fn app_type(&self) -> AppType {
        AppType::OBJECT
    }

    fn wire_types(&self) -> &[WireType] {
        &WireType::ALL
    }

    fn default_wire_type(&self) -> WireType {
        WireType::Other
    }

    /// No request, or `OTHER`, lets the natural converter pick its own tag.
    fn effective_wire_type(&self, value: &Value, requested: Option<WireType>) -> WireType {
        match requested {
            Some(w) if w != WireType::Other => w,
            _ if value.is_null() => requested.unwrap_or(WireType::Other),
            _ => Self::natural_wire_type(value),
        }
    }

    fn to_wire(&self, value: &Value, wire_type: WireType) -> BindResult<WireValue> {
        let wire_type = match wire_type {
            WireType::Other => Self::natural_wire_type(value),
            w => w,
        };
        Self::encode(value, wire_type)
    }

    /// The wire value's own shape decides; the observed tag narrows integers
    /// and floats to the width the column declares.
    fn from_wire(&self, value: WireValue, observed: Option<WireType>) -> BindResult<Value> {
        Ok(match (value, observed) {
            (WireValue::Null, _) => Value::Null,
            (WireValue::Bool(b), _) => Value::Bool(b),
            (WireValue::Int(i), Some(WireType::TinyInt | WireType::SmallInt)) => {
                return IntegerConverter::I16.from_wire(WireValue::Int(i), observed);
            }
            (WireValue::Int(i), Some(WireType::Integer)) => {
                return IntegerConverter::I32.from_wire(WireValue::Int(i), observed);
            }
            (WireValue::Int(i), _) => Value::I64(i),
            (WireValue::Float(f), Some(WireType::Real)) => {
                return FloatConverter::F32.from_wire(WireValue::Float(f), observed);
            }
            (WireValue::Float(f), _) => Value::F64(f),
            (WireValue::Numeric(s), _) | (WireValue::Text(s), _) => Value::String(s),
            (WireValue::Bytes(b), _) => Value::Bytes(b),
            (WireValue::Date(d), _) => Value::Date(d),
            (WireValue::Time(t), _) => Value::Time(t),
            (WireValue::Timestamp(ts), _) => Value::Timestamp(ts),
            (WireValue::TimestampTz(dt), _) => Value::TimestampTz(dt),
            (WireValue::Uuid(u), _) => Value::Uuid(u),
            (WireValue::Json(v), _) => Value::Json(v),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_other_uses_natural_default() {
        assert_eq!(
            ObjectConverter.to_wire(&Value::I32(5), WireType::Other).unwrap(),
            WireValue::Int(5)
        );
        assert_eq!(
            ObjectConverter
                .to_wire(&Value::Json(serde_json::json!([1])), WireType::Other)
                .unwrap(),
            WireValue::Json(serde_json::json!([1]))
        );
    }

    #[test]
    fn test_bind_declares_natural_wire_type() {
        let mut stmt = crate::memory::MemoryStatement::new(2);
        ObjectConverter.bind(&mut stmt, 1, &Value::I16(4), None).unwrap();
        ObjectConverter.bind(&mut stmt, 2, &Value::Null, None).unwrap();
        assert_eq!(stmt.parameter(1).unwrap().wire_type, WireType::SmallInt);
        assert_eq!(stmt.parameter(2).unwrap().wire_type, WireType::Other);
    }

    #[test]
    fn test_explicit_wire_type_is_checked() {
        assert!(ObjectConverter.to_wire(&Value::Bool(true), WireType::Blob).is_err());
        assert!(ObjectConverter.to_wire(&Value::I64(1 << 40), WireType::Integer).is_err());
    }

    #[test]
    fn test_text_shapes_read_back_as_string() {
        let mut stmt = crate::memory::MemoryStatement::new(3);
        ObjectConverter.bind(&mut stmt, 1, &Value::Char('x'), None).unwrap();
        ObjectConverter
            .bind(&mut stmt, 2, &Value::Enum("Shipped".into()), None)
            .unwrap();
        ObjectConverter
            .bind(&mut stmt, 3, &Value::I32(5), Some(WireType::Varchar))
            .unwrap();
        let row = stmt.into_row().unwrap();

        let read: Vec<Value> = (0..3)
            .map(|i| ObjectConverter.extract_by_index(&row, i).unwrap())
            .collect();
        assert_eq!(
            read,
            vec![
                Value::String("x".into()),
                Value::String("Shipped".into()),
                Value::String("5".into()),
            ]
        );
    }

    #[test]
    fn test_observed_width_narrows() {
        assert_eq!(
            ObjectConverter.from_wire(WireValue::Int(3), Some(WireType::SmallInt)).unwrap(),
            Value::I16(3)
        );
        assert_eq!(
            ObjectConverter.from_wire(WireValue::Int(3), None).unwrap(),
            Value::I64(3)
        );
        assert_eq!(
            ObjectConverter.from_wire(WireValue::Float(0.5), Some(WireType::Real)).unwrap(),
            Value::F32(0.5)
        );
    }
}
