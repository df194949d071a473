//! Boolean, integer and floating-point converters.

use super::{Converter, unsupported_value, unsupported_wire};
use crate::error::{BindError, BindResult};
use crate::value::{AppType, Value};
use crate::wire::{WireType, WireValue};

/// Largest integer magnitude a REAL holds exactly.
const REAL_EXACT: u64 = 1 << 24;
/// Largest integer magnitude a DOUBLE holds exactly.
const DOUBLE_EXACT: u64 = 1 << 53;

// ==================== Boolean ====================

/// `bool` converter.
///
/// Integral tags carry `1`/`0`; character tags carry `true`/`false`.
/// Reading accepts `t`, `true`, `y`, `yes`, `1` and their negatives in any case.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoolConverter;

impl Converter for BoolConverter {
    fn name(&self) -> &str {
        "bool"
    }

    fn app_type(&self) -> AppType {
        AppType::BOOL
    }

    fn wire_types(&self) -> &[WireType] {
        &[
            WireType::Boolean,
            WireType::Bit,
            WireType::TinyInt,
            WireType::SmallInt,
            WireType::Integer,
            WireType::BigInt,
            WireType::Char,
            WireType::Varchar,
        ]
    }

    fn to_wire(&self, value: &Value, wire_type: WireType) -> BindResult<WireValue> {
        let b = value
            .as_bool()
            .ok_or_else(|| unsupported_value(&AppType::BOOL, wire_type, value))?;
        match wire_type {
            WireType::Boolean | WireType::Bit => Ok(WireValue::Bool(b)),
            w if w.is_integral() => Ok(WireValue::Int(b as i64)),
            WireType::Char | WireType::Varchar => Ok(WireValue::Text(b.to_string())),
            _ => Err(unsupported_value(&AppType::BOOL, wire_type, value)),
        }
    }

    fn from_wire(&self, value: WireValue, observed: Option<WireType>) -> BindResult<Value> {
        let wire_type = observed.unwrap_or(WireType::Boolean);
        match value {
            WireValue::Bool(b) => Ok(Value::Bool(b)),
            WireValue::Int(0) => Ok(Value::Bool(false)),
            WireValue::Int(1) => Ok(Value::Bool(true)),
            WireValue::Int(i) => Err(BindError::conversion(
                &AppType::BOOL,
                wire_type,
                i,
                "only 0 and 1 map to a boolean",
            )),
            WireValue::Text(s) | WireValue::Numeric(s) => parse_bool_text(&s)
                .map(Value::Bool)
                .ok_or_else(|| {
                    BindError::conversion(&AppType::BOOL, wire_type, &s, "not a boolean literal")
                }),
            other => Err(unsupported_wire(&AppType::BOOL, observed, &other)),
        }
    }
}

fn parse_bool_text(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "t" | "true" | "y" | "yes" | "1" => Some(true),
        "f" | "false" | "n" | "no" | "0" => Some(false),
        _ => None,
    }
}

// ==================== Integer Types ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Width {
    W16,
    W32,
    W64,
}

/// Fixed-width signed integer converter.
///
/// Binding checks the value against both the application width and the
/// target tag's range. Floating tags only accept integers they hold exactly.
#[derive(Debug, Clone)]
pub struct IntegerConverter {
    app: AppType,
    width: Width,
    wires: &'static [WireType],
}

impl IntegerConverter {
    pub const I16: IntegerConverter = IntegerConverter {
        app: AppType::I16,
        width: Width::W16,
        wires: &[
            WireType::SmallInt,
            WireType::TinyInt,
            WireType::Integer,
            WireType::BigInt,
            WireType::Numeric,
            WireType::Decimal,
            WireType::Real,
            WireType::Float,
            WireType::Double,
            WireType::Char,
            WireType::Varchar,
        ],
    };

    pub const I32: IntegerConverter = IntegerConverter {
        app: AppType::I32,
        width: Width::W32,
        wires: &[
            WireType::Integer,
            WireType::TinyInt,
            WireType::SmallInt,
            WireType::BigInt,
            WireType::Numeric,
            WireType::Decimal,
            WireType::Real,
            WireType::Float,
            WireType::Double,
            WireType::Char,
            WireType::Varchar,
        ],
    };

    pub const I64: IntegerConverter = IntegerConverter {
        app: AppType::I64,
        width: Width::W64,
        wires: &[
            WireType::BigInt,
            WireType::TinyInt,
            WireType::SmallInt,
            WireType::Integer,
            WireType::Numeric,
            WireType::Decimal,
            WireType::Real,
            WireType::Float,
            WireType::Double,
            WireType::Char,
            WireType::Varchar,
        ],
    };

    fn bounds(&self) -> (i64, i64) {
        match self.width {
            Width::W16 => (i16::MIN as i64, i16::MAX as i64),
            Width::W32 => (i32::MIN as i64, i32::MAX as i64),
            Width::W64 => (i64::MIN, i64::MAX),
        }
    }

    fn check(&self, v: i64, min: i64, max: i64, wire_type: WireType, what: &str) -> BindResult<i64> {
        if v < min || v > max {
            return Err(BindError::conversion(
                &self.app,
                wire_type,
                v,
                format!("out of range for {} ({}..={})", what, min, max),
            ));
        }
        Ok(v)
    }

    fn make(&self, v: i64) -> Value {
        match self.width {
            Width::W16 => Value::I16(v as i16),
            Width::W32 => Value::I32(v as i32),
            Width::W64 => Value::I64(v),
        }
    }
}

impl Converter for IntegerConverter {
    fn name(&self) -> &str {
        self.app.name()
    }

    fn app_type(&self) -> AppType {
        self.app.clone()
    }

    fn wire_types(&self) -> &[WireType] {
        self.wires
    }

    fn to_wire(&self, value: &Value, wire_type: WireType) -> BindResult<WireValue> {
        let v = value
            .as_i64()
            .ok_or_else(|| unsupported_value(&self.app, wire_type, value))?;
        let (min, max) = self.bounds();
        let v = self.check(v, min, max, wire_type, self.app.name())?;

        if let Some((lo, hi)) = wire_type.integer_bounds() {
            return self
                .check(v, lo, hi, wire_type, wire_type.name())
                .map(WireValue::Int);
        }
        match wire_type {
            WireType::Numeric | WireType::Decimal => Ok(WireValue::Numeric(v.to_string())),
            WireType::Real | WireType::Float | WireType::Double => {
                let exact = if wire_type == WireType::Real {
                    REAL_EXACT
                } else {
                    DOUBLE_EXACT
                };
                if v.unsigned_abs() > exact {
                    return Err(BindError::conversion(
                        &self.app,
                        wire_type,
                        v,
                        format!("not exactly representable as {}", wire_type),
                    ));
                }
                Ok(WireValue::Float(v as f64))
            }
            WireType::Char | WireType::Varchar => Ok(WireValue::Text(v.to_string())),
            _ => Err(unsupported_value(&self.app, wire_type, value)),
        }
    }

    fn from_wire(&self, value: WireValue, observed: Option<WireType>) -> BindResult<Value> {
        let wire_type = observed.unwrap_or_else(|| self.default_wire_type());
        let v = match value {
            WireValue::Int(i) => i,
            WireValue::Bool(b) => b as i64,
            WireValue::Float(f) => {
                // 2^63 itself is out of range; -2^63 is not.
                if !f.is_finite() || f.fract() != 0.0 || f < -9.223_372_036_854_776e18 || f >= 9.223_372_036_854_776e18
                {
                    return Err(BindError::conversion(
                        &self.app,
                        wire_type,
                        f,
                        "not an integral value",
                    ));
                }
                f as i64
            }
            WireValue::Numeric(s) | WireValue::Text(s) => parse_integral(&s).ok_or_else(|| {
                BindError::conversion(&self.app, wire_type, &s, "not an integer literal")
            })?,
            other => return Err(unsupported_wire(&self.app, observed, &other)),
        };
        let (min, max) = self.bounds();
        self.check(v, min, max, wire_type, self.app.name())
            .map(|v| self.make(v))
    }
}

/// Integer text, allowing a zero fraction such as `42.000`.
fn parse_integral(s: &str) -> Option<i64> {
    let s = s.trim();
    if let Ok(v) = s.parse::<i64>() {
        return Some(v);
    }
    let (int, frac) = s.split_once('.')?;
    if frac.chars().all(|c| c == '0') {
        int.parse().ok()
    } else {
        None
    }
}

// ==================== Float Types ====================

/// `f32` / `f64` converter.
///
/// Binding an `f64` as REAL rounds to single precision; values beyond the
/// REAL range fail. Non-finite values cannot be written as NUMERIC.
///
/// The `f32` converter rounds every bound value to single precision and
/// rejects values outside the `f32` range on every tag. Reading a binary
/// float into `f32` must be exact; decimal text rounds to the nearest `f32`.
#[derive(Debug, Clone)]
pub struct FloatConverter {
    app: AppType,
    single: bool,
    wires: &'static [WireType],
}

impl FloatConverter {
    pub const F32: FloatConverter = FloatConverter {
        app: AppType::F32,
        single: true,
        wires: &[
            WireType::Real,
            WireType::Float,
            WireType::Double,
            WireType::Numeric,
            WireType::Decimal,
            WireType::Varchar,
        ],
    };

    pub const F64: FloatConverter = FloatConverter {
        app: AppType::F64,
        single: false,
        wires: &[
            WireType::Double,
            WireType::Float,
            WireType::Real,
            WireType::Numeric,
            WireType::Decimal,
            WireType::Varchar,
        ],
    };

    fn out_of_single_range(v: f64) -> bool {
        v.is_finite() && v.abs() > f32::MAX as f64
    }

    /// Narrow to the application width. `exact` refuses a rounded result.
    fn make(&self, v: f64, wire_type: WireType, exact: bool) -> BindResult<Value> {
        if !self.single {
            return Ok(Value::F64(v));
        }
        if Self::out_of_single_range(v) {
            return Err(BindError::conversion(&self.app, wire_type, v, "out of range for f32"));
        }
        let narrowed = v as f32;
        if exact && !v.is_nan() && narrowed as f64 != v {
            return Err(BindError::conversion(
                &self.app,
                wire_type,
                v,
                "not exactly representable as f32",
            ));
        }
        Ok(Value::F32(narrowed))
    }
}

impl Converter for FloatConverter {
    fn name(&self) -> &str {
        self.app.name()
    }

    fn app_type(&self) -> AppType {
        self.app.clone()
    }

    fn wire_types(&self) -> &[WireType] {
        self.wires
    }

    fn to_wire(&self, value: &Value, wire_type: WireType) -> BindResult<WireValue> {
        let mut v = value
            .as_f64()
            .ok_or_else(|| unsupported_value(&self.app, wire_type, value))?;
        if self.single {
            if Self::out_of_single_range(v) {
                return Err(BindError::conversion(
                    &self.app,
                    wire_type,
                    v,
                    "out of range for f32",
                ));
            }
            v = v as f32 as f64;
        }
        match wire_type {
            WireType::Real => {
                if Self::out_of_single_range(v) {
                    return Err(BindError::conversion(
                        &self.app,
                        wire_type,
                        v,
                        "out of range for REAL",
                    ));
                }
                Ok(WireValue::Float(v as f32 as f64))
            }
            WireType::Float | WireType::Double => Ok(WireValue::Float(v)),
            WireType::Numeric | WireType::Decimal => {
                if !v.is_finite() {
                    return Err(BindError::conversion(
                        &self.app,
                        wire_type,
                        v,
                        "NUMERIC has no representation for non-finite values",
                    ));
                }
                Ok(WireValue::Numeric(v.to_string()))
            }
            WireType::Varchar => Ok(WireValue::Text(v.to_string())),
            _ => Err(unsupported_value(&self.app, wire_type, value)),
        }
    }

    fn from_wire(&self, value: WireValue, observed: Option<WireType>) -> BindResult<Value> {
        let wire_type = observed.unwrap_or_else(|| self.default_wire_type());
        match value {
            WireValue::Float(f) => self.make(f, wire_type, true),
            WireValue::Int(i) => {
                let exact = if self.single { REAL_EXACT } else { DOUBLE_EXACT };
                if i.unsigned_abs() > exact {
                    return Err(BindError::conversion(
                        &self.app,
                        wire_type,
                        i,
                        format!("not exactly representable as {}", self.app),
                    ));
                }
                self.make(i as f64, wire_type, true)
            }
            WireValue::Numeric(s) | WireValue::Text(s) => {
                let v = s.trim().parse::<f64>().map_err(|e| {
                    BindError::conversion(&self.app, wire_type, &s, format!("invalid float: {}", e))
                })?;
                self.make(v, wire_type, false)
            }
            other => Err(unsupported_wire(&self.app, observed, &other)),
        }
    }
}
