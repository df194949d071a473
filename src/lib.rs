//! # wirebind: Type Converters for the Statement Boundary
//!
//! > **One registry decides how every value crosses the wire.**
//!
//! wirebind moves application values into statement parameters and back out
//! of result columns and stored-procedure outputs. Each application type is
//! served by a [`Converter`](converter::Converter); the
//! [`ConverterRegistry`](registry::ConverterRegistry) picks one per
//! (application type, wire type) pair.
//!
//! ## Quick Example
//!
//! ```rust
//! use wirebind::prelude::*;
//!
//! let registry = ConverterRegistry::with_defaults();
//!
//! let mut stmt = MemoryStatement::new(2);
//! registry.bind(&mut stmt, 1, &AppType::BOOL, &Value::Bool(true), Some(WireType::Integer))?;
//! registry.bind(&mut stmt, 2, &AppType::BOOL, &Value::Null, Some(WireType::Integer))?;
//!
//! let row = stmt.into_row()?;
//! assert_eq!(registry.extract(&row, Column::Name("$1"), Some(&AppType::BOOL))?, Value::Bool(true));
//! assert_eq!(registry.extract(&row, Column::Name("$2"), Some(&AppType::BOOL))?, Value::Null);
//! # Ok::<(), wirebind::error::BindError>(())
//! ```
//!
//! ## Resolution
//!
//! | Request                | Lookup order                                              |
//! |------------------------|-----------------------------------------------------------|
//! | `Type@TAG` (binding)   | (Type, TAG), (Type, any) if it encodes TAG, then parents  |
//! | `Type` (binding)       | (Type, any), sole converter of Type, then parents         |
//! | `Type@TAG` (extract)   | same as binding; TAG is only a hint                       |
//! | `@TAG` (extract)       | default-for-wire-type table                               |

pub mod config;
pub mod context;
pub mod converter;
pub mod driver;
pub mod error;
pub mod memory;
pub mod parser;
pub mod registry;
pub mod resolution;
pub mod value;
pub mod wire;

pub mod prelude {
    pub use crate::config::Settings;
    pub use crate::context::{CallableOutputs, Column, ParameterSink, ResultRow};
    pub use crate::converter::{Converter, ConverterRef};
    pub use crate::error::*;
    pub use crate::memory::{MemoryCallable, MemoryRow, MemoryStatement};
    pub use crate::parser::{parse_declaration, parse_request, Declaration, Request};
    pub use crate::registry::ConverterRegistry;
    pub use crate::resolution::{MatchKind, Mode, Resolution};
    pub use crate::value::{AppType, Value};
    pub use crate::wire::{WireType, WireValue};
}

/// Build a registry with the built-in converters.
///
/// # Example
///
/// ```
/// let registry = wirebind::registry();
/// assert!(registry.resolve(&wirebind::value::AppType::I32, None).is_ok());
/// ```
pub fn registry() -> registry::ConverterRegistry {
    registry::ConverterRegistry::with_defaults()
}
