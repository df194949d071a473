//! Converter registry.
//!
//! Maps (application type, wire type or "any") to converters and answers
//! lookups through the policy in [`crate::resolution`]. Registration happens
//! during initialization; after [`ConverterRegistry::freeze`] the registry is
//! read-only and safe to share across threads without further coordination.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use dashmap::DashMap;
use tracing::{debug, trace, warn};

use crate::config::Settings;
use crate::context::{CallableOutputs, Column, ParameterSink, ResultRow};
use crate::converter::{self, ConverterRef, EnumNameConverter, EnumOrdinalConverter};
use crate::error::{BindError, BindResult};
use crate::parser::{Declaration, EnumStorage};
use crate::resolution::{Entry, Mode, Resolution, Table};
use crate::value::{AppType, Value};
use crate::wire::WireType;

type CacheKey = (Option<AppType>, Option<WireType>, Mode);

/// One registration, as listed by [`ConverterRegistry::entries`].
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    pub app_type: AppType,
    /// `None` for "any wire type".
    pub wire_type: Option<WireType>,
    pub converter: ConverterRef,
    /// Global registration sequence number.
    pub seq: u64,
}

/// Thread-safe converter registry.
#[derive(Debug)]
pub struct ConverterRegistry {
    table: RwLock<Table>,
    resolved: DashMap<CacheKey, ConverterRef>,
    frozen: AtomicBool,
    used: AtomicBool,
    wire_type_for_null: WireType,
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ConverterRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            table: RwLock::new(Table::default()),
            resolved: DashMap::new(),
            frozen: AtomicBool::new(false),
            used: AtomicBool::new(false),
            wire_type_for_null: WireType::Other,
        }
    }

    /// A registry holding every built-in converter under "any" plus the
    /// default-for-wire-type table.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        {
            let mut table = registry.write();
            for ty in AppType::BUILTIN {
                if let Some(conv) = converter::builtin(&ty) {
                    let seq = table.next_seq();
                    table
                        .entries
                        .entry(ty)
                        .or_default()
                        .insert(None, Entry { converter: conv, seq });
                }
            }
            for (wire, ty) in default_wire_table() {
                if let Some(conv) = converter::builtin(&ty) {
                    let seq = table.next_seq();
                    table.wire_defaults.insert(wire, Entry { converter: conv, seq });
                }
            }
            debug!(
                "Registered {} built-in converters and {} wire defaults",
                table.entries.len(),
                table.wire_defaults.len()
            );
        }
        registry
    }

    /// Build a registry from loaded settings: built-ins, then configured wire
    /// defaults, then declarations in order. Freezes if the settings say so.
    pub fn from_settings(settings: &Settings) -> BindResult<Self> {
        let registry = Self::with_defaults().with_wire_type_for_null(settings.wire_type_for_null);

        for (wire, name) in &settings.wire_defaults {
            let ty = AppType::builtin(name).ok_or_else(|| {
                BindError::Config(format!("wire default for {}: unknown type '{}'", wire, name))
            })?;
            let conv = converter::builtin(&ty)
                .ok_or_else(|| BindError::Config(format!("no built-in converter for '{}'", ty)))?;
            registry.register_default_for_wire(*wire, conv)?;
        }

        for source in &settings.declarations {
            let declaration = crate::parser::parse_declaration(source)?;
            registry.declare(&declaration)?;
        }

        if settings.freeze {
            registry.freeze();
        }
        Ok(registry)
    }

    /// Wire type used when a null is bound without one.
    pub fn with_wire_type_for_null(mut self, wire_type: WireType) -> Self {
        self.wire_type_for_null = wire_type;
        self
    }

    pub fn wire_type_for_null(&self) -> WireType {
        self.wire_type_for_null
    }

    fn read(&self) -> RwLockReadGuard<'_, Table> {
        self.table.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write access for a mutation; the resolution cache is cleared while the
    /// lock is held.
    fn write_for(&self, action: &str) -> BindResult<RwLockWriteGuard<'_, Table>> {
        if self.is_frozen() {
            return Err(BindError::RegistryFrozen(action.to_string()));
        }
        let guard = self.write();
        self.resolved.clear();
        Ok(guard)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Table> {
        self.table.write().unwrap_or_else(PoisonError::into_inner)
    }

    // ==================== Registration ====================

    /// Register `converter` for `app_type` under `wire_type`, or under "any"
    /// when `wire_type` is `None`. Replaces an existing entry for the same key.
    pub fn register(
        &self,
        app_type: AppType,
        wire_type: Option<WireType>,
        converter: ConverterRef,
    ) -> BindResult<()> {
        if let Some(wire) = wire_type {
            check_declares(&converter, wire)?;
        }
        let mut table = self.write_for("register a converter")?;
        let seq = table.next_seq();
        let slot = table.entries.entry(app_type.clone()).or_default();
        let previous = slot.insert(
            wire_type,
            Entry {
                converter: converter.clone(),
                seq,
            },
        );

        let tag = wire_type.map_or_else(|| "any".to_string(), |w| w.to_string());
        match previous {
            Some(old) if self.used.load(Ordering::Relaxed) => warn!(
                "Overriding converter '{}' for ({}, {}) with '{}' after lookups were served",
                old.converter.name(),
                app_type,
                tag,
                converter.name()
            ),
            Some(old) => debug!(
                "Overriding converter '{}' for ({}, {}) with '{}'",
                old.converter.name(),
                app_type,
                tag,
                converter.name()
            ),
            None => debug!(
                "Registered converter '{}' for ({}, {})",
                converter.name(),
                app_type,
                tag
            ),
        }
        Ok(())
    }

    /// Declare `parent` as a direct supertype of `child`. Parents are
    /// consulted in declaration order; repeating a declaration is a no-op.
    pub fn declare_subtype(&self, child: AppType, parent: AppType) -> BindResult<()> {
        let mut table = self.write_for("declare a subtype")?;
        let parents = table.parents.entry(child.clone()).or_default();
        if !parents.contains(&parent) {
            debug!("Declared {} as a subtype of {}", child, parent);
            parents.push(parent);
        }
        Ok(())
    }

    /// Set the converter used for unconstrained extraction of `wire_type`.
    pub fn register_default_for_wire(
        &self,
        wire_type: WireType,
        converter: ConverterRef,
    ) -> BindResult<()> {
        check_declares(&converter, wire_type)?;
        let mut table = self.write_for("register a wire default")?;
        let seq = table.next_seq();
        debug!(
            "Default converter for {} is now '{}'",
            wire_type,
            converter.name()
        );
        table.wire_defaults.insert(wire_type, Entry { converter, seq });
        Ok(())
    }

    /// Apply a parsed declaration.
    pub fn declare(&self, declaration: &Declaration) -> BindResult<()> {
        match declaration {
            Declaration::Subtype { name, parents } => {
                for parent in parents {
                    self.declare_subtype(name.clone(), parent.clone())?;
                }
                Ok(())
            }
            Declaration::Enum {
                name,
                storage,
                variants,
            } => {
                self.declare_subtype(name.clone(), AppType::ENUM)?;
                let conv: ConverterRef = match storage {
                    EnumStorage::Name => {
                        Arc::new(EnumNameConverter::new(name.clone(), variants.iter().cloned()))
                    }
                    EnumStorage::Ordinal => {
                        Arc::new(EnumOrdinalConverter::new(name.clone(), variants.iter().cloned()))
                    }
                };
                self.register(name.clone(), None, conv)
            }
        }
    }

    /// End the initialization phase. Later mutations fail with
    /// [`BindError::RegistryFrozen`].
    pub fn freeze(&self) {
        if !self.frozen.swap(true, Ordering::SeqCst) {
            debug!("Converter registry frozen");
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::SeqCst)
    }

    // ==================== Lookup ====================

    /// Binding resolution: the converter for `app_type` that can encode
    /// `wire_type`, or the best converter for `app_type` when no tag is given.
    pub fn resolve(&self, app_type: &AppType, wire_type: Option<WireType>) -> BindResult<ConverterRef> {
        self.lookup(Some(app_type), wire_type, Mode::Binding)
    }

    /// Extraction resolution. `observed` is a hint; with no application type
    /// the default-for-wire-type table decides.
    pub fn resolve_for_extraction(
        &self,
        app_type: Option<&AppType>,
        observed: WireType,
    ) -> BindResult<ConverterRef> {
        self.lookup(app_type, Some(observed), Mode::Extraction)
    }

    /// Resolve and report where the match came from. Bypasses the cache.
    pub fn explain(
        &self,
        app_type: Option<&AppType>,
        wire_type: Option<WireType>,
        mode: Mode,
    ) -> BindResult<Resolution> {
        self.read()
            .resolve(app_type, wire_type, mode)
            .ok_or_else(|| BindError::no_converter(app_type, wire_type))
    }

    fn lookup(
        &self,
        app_type: Option<&AppType>,
        wire_type: Option<WireType>,
        mode: Mode,
    ) -> BindResult<ConverterRef> {
        self.used.store(true, Ordering::Relaxed);
        let key = (app_type.cloned(), wire_type, mode);
        if let Some(hit) = self.resolved.get(&key) {
            return Ok(hit.value().clone());
        }

        // Cache fills happen under the read lock so a concurrent mutation
        // cannot leave a stale entry behind.
        let table = self.read();
        let resolution = table
            .resolve(app_type, wire_type, mode)
            .ok_or_else(|| BindError::no_converter(app_type, wire_type))?;
        trace!(
            "Resolved ({}, {:?}, {:?}) to '{}' via {} match at depth {}",
            app_type.map_or("<unconstrained>", |t| t.name()),
            wire_type,
            mode,
            resolution.converter.name(),
            resolution.kind,
            resolution.depth
        );
        self.resolved.insert(key, resolution.converter.clone());
        drop(table);
        Ok(resolution.converter)
    }

    /// True if an entry is registered exactly under (`app_type`, `wire_type`),
    /// without hierarchy fallback.
    pub fn has_converter(&self, app_type: &AppType, wire_type: Option<WireType>) -> bool {
        self.read()
            .entries
            .get(app_type)
            .is_some_and(|slot| slot.contains_key(&wire_type))
    }

    /// Every registration, in registration order.
    pub fn entries(&self) -> Vec<RegistryEntry> {
        let table = self.read();
        let mut entries: Vec<RegistryEntry> = table
            .entries
            .iter()
            .flat_map(|(ty, slot)| {
                slot.iter().map(move |(wire, e)| RegistryEntry {
                    app_type: ty.clone(),
                    wire_type: *wire,
                    converter: e.converter.clone(),
                    seq: e.seq,
                })
            })
            .collect();
        entries.sort_by_key(|e| e.seq);
        entries
    }

    /// The converter used for unconstrained extraction of `wire_type`.
    pub fn wire_default(&self, wire_type: WireType) -> Option<ConverterRef> {
        self.read()
            .wire_defaults
            .get(&wire_type)
            .map(|e| e.converter.clone())
    }

    /// Declared direct parents of `app_type`.
    pub fn parents(&self, app_type: &AppType) -> Vec<AppType> {
        self.read()
            .parents
            .get(app_type)
            .cloned()
            .unwrap_or_default()
    }

    // ==================== Call-site helpers ====================

    /// Resolve a converter for `app_type` and bind `value` at `position`.
    /// A null bound without a wire type is declared as
    /// [`Self::wire_type_for_null`].
    pub fn bind(
        &self,
        statement: &mut dyn ParameterSink,
        position: usize,
        app_type: &AppType,
        value: &Value,
        wire_type: Option<WireType>,
    ) -> BindResult<()> {
        let conv = self.resolve(app_type, wire_type)?;
        let wire_type = wire_type.or_else(|| value.is_null().then_some(self.wire_type_for_null));
        conv.bind(statement, position, value, wire_type)
    }

    /// Resolve from the column's metadata and read it. Without metadata the
    /// application type alone decides.
    pub fn extract(
        &self,
        row: &dyn ResultRow,
        column: Column<'_>,
        app_type: Option<&AppType>,
    ) -> BindResult<Value> {
        let conv = self.lookup(app_type, row.column_type(column), Mode::Extraction)?;
        conv.extract_column(row, column)
    }

    /// Resolve from the output's metadata and read it.
    pub fn extract_output(
        &self,
        call: &dyn CallableOutputs,
        position: usize,
        app_type: Option<&AppType>,
    ) -> BindResult<Value> {
        let conv = self.lookup(app_type, call.output_type(position), Mode::Extraction)?;
        conv.extract_output(call, position)
    }
}

fn check_declares(converter: &ConverterRef, wire_type: WireType) -> BindResult<()> {
    if converter.supports(wire_type) {
        return Ok(());
    }
    Err(BindError::IncompatibleRegistration {
        converter: converter.name().to_string(),
        wire_type,
        declared: converter
            .wire_types()
            .iter()
            .map(|w| w.name())
            .collect::<Vec<_>>()
            .join(", "),
    })
}

/// Built-in application type read for each wire type when nothing
/// constrains the extraction.
pub fn default_wire_table() -> Vec<(WireType, AppType)> {
    use WireType::*;

    WireType::ALL
        .into_iter()
        .map(|wire| {
            let ty = match wire {
                Boolean | Bit => AppType::BOOL,
                TinyInt | SmallInt => AppType::I16,
                Integer => AppType::I32,
                BigInt => AppType::I64,
                Real => AppType::F32,
                Float | Double => AppType::F64,
                Numeric | Decimal | Char | Varchar | LongVarchar | NChar | NVarchar | Clob
                | RowId => AppType::STRING,
                Date => AppType::DATE,
                Time => AppType::TIME,
                Timestamp => AppType::TIMESTAMP,
                TimestampWithTimezone => AppType::TIMESTAMPTZ,
                Binary | VarBinary | LongVarBinary | Blob => AppType::BYTES,
                WireType::Uuid => AppType::UUID,
                Json => AppType::JSON,
                Other | Null => AppType::OBJECT,
            };
            (wire, ty)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::{IntegerConverter, StringConverter};
    use crate::memory::{MemoryRow, MemoryStatement};
    use crate::wire::WireValue;

    #[test]
    fn test_defaults_resolve_every_builtin() {
        let registry = ConverterRegistry::with_defaults();
        for ty in AppType::BUILTIN {
            let conv = registry.resolve(&ty, None).unwrap();
            assert_eq!(conv.app_type(), ty);
        }
    }

    #[test]
    fn test_every_wire_type_has_a_default() {
        let registry = ConverterRegistry::with_defaults();
        for wire in WireType::ALL {
            let conv = registry.wire_default(wire).unwrap();
            assert!(conv.supports(wire), "{} default cannot encode it", wire);
        }
    }

    #[test]
    fn test_register_rejects_undeclared_tag() {
        let registry = ConverterRegistry::new();
        let err = registry
            .register(AppType::new("Invoice"), Some(WireType::Blob), Arc::new(StringConverter))
            .unwrap_err();
        assert!(matches!(err, BindError::IncompatibleRegistration { .. }));
        assert!(!registry.has_converter(&AppType::new("Invoice"), Some(WireType::Blob)));
    }

    #[test]
    fn test_override_invalidates_cache() {
        let registry = ConverterRegistry::new();
        let ty = AppType::new("Amount");
        registry
            .register(ty.clone(), None, Arc::new(IntegerConverter::I32))
            .unwrap();
        assert_eq!(registry.resolve(&ty, None).unwrap().app_type(), AppType::I32);

        registry
            .register(ty.clone(), None, Arc::new(IntegerConverter::I64))
            .unwrap();
        assert_eq!(registry.resolve(&ty, None).unwrap().app_type(), AppType::I64);
        assert_eq!(registry.entries().len(), 1);
    }

    #[test]
    fn test_frozen_registry_refuses_mutation() {
        let registry = ConverterRegistry::with_defaults();
        registry.freeze();
        assert!(registry.is_frozen());
        let err = registry
            .declare_subtype(AppType::new("A"), AppType::new("B"))
            .unwrap_err();
        assert!(matches!(err, BindError::RegistryFrozen(_)));
        assert!(registry.resolve(&AppType::I32, None).is_ok());
    }

    #[test]
    fn test_null_without_tag_uses_configured_wire_type() {
        let registry = ConverterRegistry::with_defaults().with_wire_type_for_null(WireType::Varchar);
        let mut stmt = MemoryStatement::new(1);
        registry
            .bind(&mut stmt, 1, &AppType::STRING, &Value::Null, None)
            .unwrap();
        let param = stmt.parameter(1).unwrap();
        assert_eq!(param.wire_type, WireType::Varchar);
        assert_eq!(param.value, WireValue::Null);
    }

    #[test]
    fn test_extract_without_metadata_uses_app_type() {
        let registry = ConverterRegistry::with_defaults();
        let row = MemoryRow::new().with_untyped("n", WireValue::Int(9));
        let value = registry
            .extract(&row, Column::Name("n"), Some(&AppType::I64))
            .unwrap();
        assert_eq!(value, Value::I64(9));
        assert!(registry.extract(&row, Column::Name("n"), None).is_err());
    }

    #[test]
    fn test_enum_declaration_registers_converter() {
        let registry = ConverterRegistry::with_defaults();
        let decl = crate::parser::parse_declaration("enum Level by ordinal { Low, High }").unwrap();
        registry.declare(&decl).unwrap();

        let ty = AppType::new("Level");
        assert_eq!(registry.parents(&ty), vec![AppType::ENUM]);
        let mut stmt = MemoryStatement::new(1);
        registry
            .bind(&mut stmt, 1, &ty, &Value::Enum("High".into()), None)
            .unwrap();
        assert_eq!(stmt.parameter(1).unwrap().value, WireValue::Int(1));
    }
}
