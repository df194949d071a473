//! Converters: stateless strategies that move one application type across
//! the statement/result boundary in both directions.
//!
//! A converter implements the two non-null halves, [`Converter::to_wire`] and
//! [`Converter::from_wire`]. The provided methods handle SQL NULL the same way
//! for every converter and route result columns and callable outputs through
//! a single decoding path.

pub mod enums;
pub mod numeric;
pub mod object;
pub mod temporal;
pub mod text;

pub use enums::{EnumNameConverter, EnumOrdinalConverter};
pub use numeric::{BoolConverter, FloatConverter, IntegerConverter};
pub use object::ObjectConverter;
pub use temporal::{DateConverter, TimeConverter, TimestampConverter, TimestampTzConverter};
pub use text::{BytesConverter, CharConverter, JsonConverter, StringConverter, UuidConverter};

use std::fmt;
use std::sync::Arc;

use crate::context::{CallableOutputs, Column, ParameterSink, ResultRow};
use crate::error::{BindError, BindResult};
use crate::value::{AppType, Value};
use crate::wire::{WireType, WireValue};

/// Shared handle to a registered converter.
pub type ConverterRef = Arc<dyn Converter>;

/// Moves values of one application type to and from the wire.
///
/// Implementations are stateless and deterministic, and never keep a
/// reference to a context past the call.
pub trait Converter: Send + Sync + fmt::Debug {
    /// Name used in diagnostics and listings.
    fn name(&self) -> &str;

    /// The application type this converter produces on extraction.
    fn app_type(&self) -> AppType;

    /// Wire types this converter can encode to. The first one is the default.
    fn wire_types(&self) -> &[WireType];

    /// Encode a non-null value as `wire_type`.
    fn to_wire(&self, value: &Value, wire_type: WireType) -> BindResult<WireValue>;

    /// Decode a non-null wire value. `observed` is the column's declared type
    /// when the result metadata carries one.
    fn from_wire(&self, value: WireValue, observed: Option<WireType>) -> BindResult<Value>;

    fn default_wire_type(&self) -> WireType {
        self.wire_types().first().copied().unwrap_or(WireType::Other)
    }

    fn supports(&self, wire_type: WireType) -> bool {
        self.wire_types().contains(&wire_type)
    }

    /// Wire type a bind of `value` is declared with, given the caller's request.
    fn effective_wire_type(&self, _value: &Value, requested: Option<WireType>) -> WireType {
        requested.unwrap_or_else(|| self.default_wire_type())
    }

    /// Write `value` at `position`, encoded as `wire_type` or the default.
    fn bind(
        &self,
        statement: &mut dyn ParameterSink,
        position: usize,
        value: &Value,
        wire_type: Option<WireType>,
    ) -> BindResult<()> {
        let wire_type = self.effective_wire_type(value, wire_type);
        if value.is_null() {
            if !wire_type.is_nullable() {
                return Err(BindError::conversion(
                    &self.app_type(),
                    wire_type,
                    value,
                    format!("{} does not accept NULL", wire_type),
                ));
            }
            return statement.set_null(position, wire_type);
        }
        if !self.supports(wire_type) {
            return Err(BindError::conversion(
                &self.app_type(),
                wire_type,
                value,
                format!("converter '{}' does not encode {}", self.name(), wire_type),
            ));
        }
        let encoded = self.to_wire(value, wire_type)?;
        statement.set_value(position, encoded, wire_type)
    }

    /// Read a result column by label.
    fn extract_by_name(&self, row: &dyn ResultRow, name: &str) -> BindResult<Value> {
        self.extract_column(row, Column::Name(name))
    }

    /// Read a result column by zero-based index.
    fn extract_by_index(&self, row: &dyn ResultRow, index: usize) -> BindResult<Value> {
        self.extract_column(row, Column::Index(index))
    }

    fn extract_column(&self, row: &dyn ResultRow, column: Column<'_>) -> BindResult<Value> {
        let raw = row.value(column)?;
        self.decode(raw, row.column_type(column))
    }

    /// Read a stored-procedure output parameter at a 1-based position.
    fn extract_output(&self, call: &dyn CallableOutputs, position: usize) -> BindResult<Value> {
        let raw = call.output(position)?;
        self.decode(raw, call.output_type(position))
    }

    /// Shared decoding path: SQL NULL is always `Value::Null`.
    fn decode(&self, raw: WireValue, observed: Option<WireType>) -> BindResult<Value> {
        if raw.is_null() {
            return Ok(Value::Null);
        }
        self.from_wire(raw, observed)
    }
}

/// Error for a value whose shape the converter cannot encode at all.
pub(crate) fn unsupported_value(app_type: &AppType, wire_type: WireType, value: &Value) -> BindError {
    BindError::conversion(
        app_type,
        wire_type,
        value,
        format!("expected a {} value", app_type),
    )
}

/// Error for a wire value the converter cannot decode.
pub(crate) fn unsupported_wire(
    app_type: &AppType,
    observed: Option<WireType>,
    value: &WireValue,
) -> BindError {
    BindError::conversion(
        app_type,
        observed.unwrap_or(WireType::Other),
        value,
        format!("cannot read a {} wire value", value.kind()),
    )
}

/// The built-in converter for an application type.
pub fn builtin(app_type: &AppType) -> Option<ConverterRef> {
    let converter: ConverterRef = match app_type.name() {
        "bool" => Arc::new(BoolConverter),
        "i16" => Arc::new(IntegerConverter::I16),
        "i32" => Arc::new(IntegerConverter::I32),
        "i64" => Arc::new(IntegerConverter::I64),
        "f32" => Arc::new(FloatConverter::F32),
        "f64" => Arc::new(FloatConverter::F64),
        "char" => Arc::new(CharConverter),
        "string" => Arc::new(StringConverter),
        "bytes" => Arc::new(BytesConverter),
        "date" => Arc::new(DateConverter),
        "time" => Arc::new(TimeConverter),
        "timestamp" => Arc::new(TimestampConverter),
        "timestamptz" => Arc::new(TimestampTzConverter),
        "uuid" => Arc::new(UuidConverter),
        "json" => Arc::new(JsonConverter),
        "enum" => Arc::new(EnumNameConverter::any()),
        "object" => Arc::new(ObjectConverter),
        _ => return None,
    };
    Some(converter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryCallable, MemoryRow, MemoryStatement};

    #[test]
    fn test_every_builtin_type_has_a_converter() {
        for ty in AppType::BUILTIN {
            let conv = builtin(&ty).unwrap();
            assert_eq!(conv.app_type(), ty, "converter for {}", ty);
            assert!(!conv.wire_types().is_empty());
        }
        assert!(builtin(&AppType::new("Invoice")).is_none());
    }

    #[test]
    fn test_null_on_rowid_is_refused() {
        let mut stmt = MemoryStatement::new(1);
        let err = StringConverter
            .bind(&mut stmt, 1, &Value::Null, Some(WireType::RowId))
            .unwrap_err();
        assert!(err.is_conversion());
        assert!(stmt.parameter(1).is_none());
    }

    #[test]
    fn test_undeclared_wire_type_is_refused() {
        let mut stmt = MemoryStatement::new(1);
        let err = BoolConverter
            .bind(&mut stmt, 1, &Value::Bool(true), Some(WireType::Blob))
            .unwrap_err();
        assert!(err.is_conversion());
    }

    #[test]
    fn test_bind_uses_default_wire_type() {
        let mut stmt = MemoryStatement::new(1);
        IntegerConverter::I32
            .bind(&mut stmt, 1, &Value::I32(7), None)
            .unwrap();
        let param = stmt.parameter(1).unwrap();
        assert_eq!(param.wire_type, WireType::Integer);
        assert_eq!(param.value, WireValue::Int(7));
    }

    #[test]
    fn test_row_and_callable_decode_identically() {
        let row = MemoryRow::new().with("n", WireType::SmallInt, WireValue::Int(12));
        let mut call = MemoryCallable::new();
        call.register_output(1, WireType::SmallInt, WireValue::Int(12));

        let conv = IntegerConverter::I16;
        let by_name = conv.extract_by_name(&row, "n").unwrap();
        let by_index = conv.extract_by_index(&row, 0).unwrap();
        let output = conv.extract_output(&call, 1).unwrap();
        assert_eq!(by_name, Value::I16(12));
        assert_eq!(by_index, by_name);
        assert_eq!(output, by_name);
    }
}
