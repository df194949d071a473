//! Registry settings loaded from TOML.
//!
//! ```toml
//! wire_type_for_null = "VARCHAR"
//! freeze = true
//! declarations = [
//!     "Manager: Employee",
//!     "enum OrderStatus by ordinal { Pending, Shipped }",
//! ]
//!
//! [wire_defaults]
//! NUMERIC = "f64"
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BindError, BindResult};
use crate::wire::WireType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Wire type declared for nulls bound without one.
    pub wire_type_for_null: WireType,
    /// Freeze the registry once it is built.
    pub freeze: bool,
    /// Subtype and enum declarations, applied in order.
    pub declarations: Vec<String>,
    /// Overrides of the default-for-wire-type table: tag to built-in type name.
    pub wire_defaults: BTreeMap<WireType, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            wire_type_for_null: WireType::Other,
            freeze: false,
            declarations: Vec::new(),
            wire_defaults: BTreeMap::new(),
        }
    }
}

impl Settings {
    pub fn from_toml_str(content: &str) -> BindResult<Self> {
        toml::from_str(content).map_err(|e| BindError::Config(e.to_string()))
    }

    /// Load settings from a file.
    pub fn load(path: impl AsRef<Path>) -> BindResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let settings: Self = toml::from_str(&content)
            .map_err(|e| BindError::Config(format!("{}: {}", path.display(), e)))?;
        tracing::debug!(
            "Loaded settings from {} ({} declarations)",
            path.display(),
            settings.declarations.len()
        );
        Ok(settings)
    }

    /// `<config dir>/wirebind/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("wirebind").join("config.toml"))
    }

    /// Settings from the default location, or the defaults if no file exists.
    pub fn discover() -> BindResult<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ConverterRegistry;
    use crate::value::AppType;

    #[test]
    fn test_empty_document_gives_defaults() {
        assert_eq!(Settings::from_toml_str("").unwrap(), Settings::default());
    }

    #[test]
    fn test_full_document() {
        let settings = Settings::from_toml_str(
            r#"
            wire_type_for_null = "varchar"
            freeze = true
            declarations = ["Manager: Employee"]

            [wire_defaults]
            NUMERIC = "f64"
            "#,
        )
        .unwrap();
        assert_eq!(settings.wire_type_for_null, WireType::Varchar);
        assert!(settings.freeze);
        assert_eq!(settings.wire_defaults.get(&WireType::Numeric).map(String::as_str), Some("f64"));
    }

    #[test]
    fn test_unknown_keys_and_tags_are_rejected() {
        assert!(Settings::from_toml_str("colour = 1").is_err());
        assert!(Settings::from_toml_str("wire_type_for_null = \"SPARKLE\"").is_err());
    }

    #[test]
    fn test_registry_from_settings() {
        let settings = Settings::from_toml_str(
            r#"
            freeze = true
            declarations = ["Employee: Person", "enum Color { Red }"]

            [wire_defaults]
            NUMERIC = "f64"
            "#,
        )
        .unwrap();
        let registry = ConverterRegistry::from_settings(&settings).unwrap();
        assert!(registry.is_frozen());
        assert_eq!(registry.parents(&AppType::new("Employee")), vec![AppType::new("Person")]);
        assert_eq!(
            registry.wire_default(WireType::Numeric).unwrap().app_type(),
            AppType::F64
        );
    }

    #[test]
    fn test_bad_wire_default_type() {
        let settings = Settings::from_toml_str("[wire_defaults]\nBLOB = \"f64\"").unwrap();
        assert!(ConverterRegistry::from_settings(&settings).is_err());
        let settings = Settings::from_toml_str("[wire_defaults]\nBLOB = \"Invoice\"").unwrap();
        assert!(matches!(
            ConverterRegistry::from_settings(&settings),
            Err(BindError::Config(_))
        ));
    }
}
