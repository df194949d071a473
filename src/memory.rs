//! In-memory statement, row and callable contexts.
//!
//! These hold exactly what a converter wrote, so a bind followed by an
//! extract through them shows the converter's behavior and nothing else.

use std::collections::BTreeMap;

use crate::context::{CallableOutputs, Column, ParameterSink, ResultRow};
use crate::error::{BindError, BindResult};
use crate::wire::{WireType, WireValue};

/// A value bound at one position, with its declared wire type.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundParameter {
    pub value: WireValue,
    pub wire_type: WireType,
}

/// A statement with a fixed number of placeholders.
#[derive(Debug, Clone, Default)]
pub struct MemoryStatement {
    slots: Vec<Option<BoundParameter>>,
}

impl MemoryStatement {
    pub fn new(placeholders: usize) -> Self {
        Self {
            slots: vec![None; placeholders],
        }
    }

    pub fn placeholders(&self) -> usize {
        self.slots.len()
    }

    /// The parameter at a 1-based position, if bound.
    pub fn parameter(&self, position: usize) -> Option<&BoundParameter> {
        position
            .checked_sub(1)
            .and_then(|i| self.slots.get(i))
            .and_then(Option::as_ref)
    }

    /// All parameters in position order.
    ///
    /// Fails on the first unbound placeholder; a partially bound statement
    /// must not be executed.
    pub fn parameters(&self) -> BindResult<Vec<&BoundParameter>> {
        self.slots
            .iter()
            .enumerate()
            .map(|(i, slot)| slot.as_ref().ok_or(BindError::UnboundParameter(i + 1)))
            .collect()
    }

    /// Echo the bound parameters back as a row with columns `$1..$n`.
    pub fn into_row(self) -> BindResult<MemoryRow> {
        let mut row = MemoryRow::new();
        for (i, slot) in self.slots.into_iter().enumerate() {
            let param = slot.ok_or(BindError::UnboundParameter(i + 1))?;
            row = row.with(format!("${}", i + 1), param.wire_type, param.value);
        }
        Ok(row)
    }

    /// Echo the bound parameters back as INOUT output parameters.
    pub fn into_callable(self) -> BindResult<MemoryCallable> {
        let mut call = MemoryCallable::new();
        for (i, slot) in self.slots.into_iter().enumerate() {
            let param = slot.ok_or(BindError::UnboundParameter(i + 1))?;
            call.register_output(i + 1, param.wire_type, param.value);
        }
        Ok(call)
    }
}

impl ParameterSink for MemoryStatement {
    fn set_value(
        &mut self,
        position: usize,
        value: WireValue,
        wire_type: WireType,
    ) -> BindResult<()> {
        let slot = position
            .checked_sub(1)
            .and_then(|i| self.slots.get_mut(i))
            .ok_or(BindError::InvalidPosition(position))?;
        *slot = Some(BoundParameter { value, wire_type });
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
struct MemoryColumn {
    name: String,
    wire_type: Option<WireType>,
    value: WireValue,
}

/// A single result row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryRow {
    columns: Vec<MemoryColumn>,
}

impl MemoryRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column with declared metadata.
    pub fn with(mut self, name: impl Into<String>, wire_type: WireType, value: WireValue) -> Self {
        self.columns.push(MemoryColumn {
            name: name.into(),
            wire_type: Some(wire_type),
            value,
        });
        self
    }

    /// Append a column whose metadata carries no type.
    pub fn with_untyped(mut self, name: impl Into<String>, value: WireValue) -> Self {
        self.columns.push(MemoryColumn {
            name: name.into(),
            wire_type: None,
            value,
        });
        self
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    fn find(&self, column: Column<'_>) -> Option<&MemoryColumn> {
        match column {
            Column::Index(i) => self.columns.get(i),
            Column::Name(name) => self
                .columns
                .iter()
                .find(|c| c.name.eq_ignore_ascii_case(name)),
        }
    }
}

impl ResultRow for MemoryRow {
    fn value(&self, column: Column<'_>) -> BindResult<WireValue> {
        self.find(column)
            .map(|c| c.value.clone())
            .ok_or_else(|| BindError::ColumnNotFound(column.to_string()))
    }

    fn column_type(&self, column: Column<'_>) -> Option<WireType> {
        self.find(column).and_then(|c| c.wire_type)
    }

    fn column_count(&self) -> usize {
        self.columns.len()
    }
}

/// Output parameters of a stored-procedure call.
#[derive(Debug, Clone, Default)]
pub struct MemoryCallable {
    outputs: BTreeMap<usize, BoundParameter>,
}

impl MemoryCallable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the value an output parameter returned.
    pub fn register_output(&mut self, position: usize, wire_type: WireType, value: WireValue) {
        self.outputs.insert(position, BoundParameter { value, wire_type });
    }
}

impl CallableOutputs for MemoryCallable {
    fn output(&self, position: usize) -> BindResult<WireValue> {
        self.outputs
            .get(&position)
            .map(|p| p.value.clone())
            .ok_or(BindError::InvalidPosition(position))
    }

    fn output_type(&self, position: usize) -> Option<WireType> {
        self.outputs.get(&position).map(|p| p.wire_type)
    }
}
