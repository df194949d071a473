//! Binding contexts: the statement, result row and callable-statement
//! boundaries a converter reads from or writes to.
//!
//! Contexts are borrowed for a single call. Neither the registry nor a
//! converter keeps a reference once the call returns.

use std::fmt;

use crate::error::BindResult;
use crate::wire::{WireType, WireValue};

/// Locates one column of a result row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column<'a> {
    /// Zero-based column index.
    Index(usize),
    /// Column label, matched case-insensitively.
    Name(&'a str),
}

impl fmt::Display for Column<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Column::Index(i) => write!(f, "#{}", i),
            Column::Name(name) => write!(f, "'{}'", name),
        }
    }
}

impl From<usize> for Column<'_> {
    fn from(index: usize) -> Self {
        Column::Index(index)
    }
}

impl<'a> From<&'a str> for Column<'a> {
    fn from(name: &'a str) -> Self {
        Column::Name(name)
    }
}

/// A parameterized statement being prepared for execution.
///
/// Positions are 1-based, matching `$1`-style placeholders.
pub trait ParameterSink {
    /// Set the value at `position`, declared as `wire_type`.
    fn set_value(&mut self, position: usize, value: WireValue, wire_type: WireType)
    -> BindResult<()>;

    /// Set SQL NULL at `position`, declared as `wire_type`.
    fn set_null(&mut self, position: usize, wire_type: WireType) -> BindResult<()> {
        self.set_value(position, WireValue::Null, wire_type)
    }
}

/// One row of a tabular result.
pub trait ResultRow {
    /// Raw value of a column; `WireValue::Null` for SQL NULL.
    fn value(&self, column: Column<'_>) -> BindResult<WireValue>;

    /// Declared type of a column, when the result metadata carries one.
    fn column_type(&self, column: Column<'_>) -> Option<WireType>;

    fn column_count(&self) -> usize;
}

/// Output parameters of an executed stored-procedure call.
///
/// Positions are 1-based, like statement parameters.
pub trait CallableOutputs {
    fn output(&self, position: usize) -> BindResult<WireValue>;

    fn output_type(&self, position: usize) -> Option<WireType>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_display() {
        assert_eq!(Column::from(3).to_string(), "#3");
        assert_eq!(Column::from("email").to_string(), "'email'");
    }
}
