//! Enum converters: store a variant by name or by ordinal position.

use super::{Converter, unsupported_value, unsupported_wire};
use crate::error::{BindError, BindResult};
use crate::value::{AppType, Value};
use crate::wire::{WireType, WireValue};

/// Stores the variant name as text. Blank padding read from CHAR and NCHAR
/// columns is dropped before the name is matched.
///
/// The converter from [`EnumNameConverter::any`] accepts every variant and is
/// registered for the `enum` root, so every declared enum falls back to it.
/// One built with [`EnumNameConverter::new`] rejects names outside its list.
#[derive(Debug, Clone)]
pub struct EnumNameConverter {
    app: AppType,
    variants: Option<Vec<String>>,
}

impl EnumNameConverter {
    pub fn any() -> Self {
        Self {
            app: AppType::ENUM,
            variants: None,
        }
    }

    pub fn new<I, S>(app: AppType, variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            app,
            variants: Some(variants.into_iter().map(Into::into).collect()),
        }
    }

    fn check(&self, name: &str, wire_type: WireType) -> BindResult<()> {
        match &self.variants {
            Some(variants) if !variants.iter().any(|v| v == name) => Err(BindError::conversion(
                &self.app,
                wire_type,
                name,
                format!("not a variant of {}", self.app),
            )),
            _ => Ok(()),
        }
    }
}

impl Converter for EnumNameConverter {
    fn name(&self) -> &str {
        "enum-name"
    }

    fn app_type(&self) -> AppType {
        self.app.clone()
    }

    fn wire_types(&self) -> &[WireType] {
        &[
            WireType::Varchar,
            WireType::Char,
            WireType::NVarchar,
            WireType::Other,
        ]
    }

    fn to_wire(&self, value: &Value, wire_type: WireType) -> BindResult<WireValue> {
        let Value::Enum(name) = value else {
            return Err(unsupported_value(&self.app, wire_type, value));
        };
        self.check(name, wire_type)?;
        Ok(WireValue::Text(name.clone()))
    }

    fn from_wire(&self, value: WireValue, observed: Option<WireType>) -> BindResult<Value> {
        let WireValue::Text(mut name) = value else {
            return Err(unsupported_wire(&self.app, observed, &value));
        };
        if matches!(observed, Some(WireType::Char | WireType::NChar)) {
            name.truncate(name.trim_end_matches(' ').len());
        }
        self.check(&name, observed.unwrap_or(WireType::Varchar))?;
        Ok(Value::Enum(name))
    }
}

/// Stores the zero-based position of the variant in a declared list.
#[derive(Debug, Clone)]
pub struct EnumOrdinalConverter {
    app: AppType,
    variants: Vec<String>,
}

impl EnumOrdinalConverter {
    pub fn new<I, S>(app: AppType, variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            app,
            variants: variants.into_iter().map(Into::into).collect(),
        }
    }
}

impl Converter for EnumOrdinalConverter {
    fn name(&self) -> &str {
        "enum-ordinal"
    }

    fn app_type(&self) -> AppType {
        self.app.clone()
    }

    fn wire_types(&self) -> &[WireType] {
        &[
            WireType::Integer,
            WireType::SmallInt,
            WireType::TinyInt,
            WireType::BigInt,
            WireType::Numeric,
        ]
    }

    fn to_wire(&self, value: &Value, wire_type: WireType) -> BindResult<WireValue> {
        let Value::Enum(name) = value else {
            return Err(unsupported_value(&self.app, wire_type, value));
        };
        let ordinal = self
            .variants
            .iter()
            .position(|v| v == name)
            .ok_or_else(|| {
                BindError::conversion(
                    &self.app,
                    wire_type,
                    name,
                    format!("not a variant of {}", self.app),
                )
            })? as i64;
        match wire_type.integer_bounds() {
            Some((_, hi)) if ordinal > hi => Err(BindError::conversion(
                &self.app,
                wire_type,
                name,
                format!("ordinal {} out of range for {}", ordinal, wire_type),
            )),
            Some(_) => Ok(WireValue::Int(ordinal)),
            None => Ok(WireValue::Numeric(ordinal.to_string())),
        }
    }

    fn from_wire(&self, value: WireValue, observed: Option<WireType>) -> BindResult<Value> {
        let wire_type = observed.unwrap_or(WireType::Integer);
        let ordinal = match value {
            WireValue::Int(i) => i,
            WireValue::Numeric(ref s) | WireValue::Text(ref s) => {
                s.trim().parse::<i64>().map_err(|e| {
                    BindError::conversion(&self.app, wire_type, s, format!("invalid ordinal: {}", e))
                })?
            }
            other => return Err(unsupported_wire(&self.app, observed, &other)),
        };
        usize::try_from(ordinal)
            .ok()
            .and_then(|i| self.variants.get(i))
            .map(|name| Value::Enum(name.clone()))
            .ok_or_else(|| {
                BindError::conversion(
                    &self.app,
                    wire_type,
                    ordinal,
                    format!("{} has {} variants", self.app, self.variants.len()),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status() -> AppType {
        AppType::new("OrderStatus")
    }

    #[test]
    fn test_name_converter_checks_variants() {
        let conv = EnumNameConverter::new(status(), ["Pending", "Shipped"]);
        assert_eq!(
            conv.to_wire(&Value::Enum("Shipped".into()), WireType::Varchar).unwrap(),
            WireValue::Text("Shipped".into())
        );
        assert!(conv
            .from_wire(WireValue::Text("Lost".into()), Some(WireType::Varchar))
            .is_err());
    }

    #[test]
    fn test_name_read_from_padded_char_column() {
        let conv = EnumNameConverter::new(status(), ["Pending", "Shipped"]);
        assert_eq!(
            conv.from_wire(WireValue::Text("Shipped   ".into()), Some(WireType::Char)).unwrap(),
            Value::Enum("Shipped".into())
        );
        assert_eq!(
            conv.from_wire(WireValue::Text("Pending ".into()), Some(WireType::NChar)).unwrap(),
            Value::Enum("Pending".into())
        );
        // Variable-width text keeps its blanks.
        assert!(conv
            .from_wire(WireValue::Text("Shipped ".into()), Some(WireType::Varchar))
            .is_err());
    }

    #[test]
    fn test_any_name_converter_accepts_everything() {
        let conv = EnumNameConverter::any();
        assert_eq!(
            conv.from_wire(WireValue::Text("Whatever".into()), None).unwrap(),
            Value::Enum("Whatever".into())
        );
    }

    #[test]
    fn test_ordinal_round_trip_and_bounds() {
        let conv = EnumOrdinalConverter::new(status(), ["Pending", "Shipped", "Delivered"]);
        assert_eq!(
            conv.to_wire(&Value::Enum("Delivered".into()), WireType::Integer).unwrap(),
            WireValue::Int(2)
        );
        assert_eq!(
            conv.from_wire(WireValue::Int(1), Some(WireType::Integer)).unwrap(),
            Value::Enum("Shipped".into())
        );
        assert!(conv.from_wire(WireValue::Int(3), None).is_err());
        assert!(conv.from_wire(WireValue::Int(-1), None).is_err());
    }
}
