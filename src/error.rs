//! Error types for wirebind.

use thiserror::Error;

use crate::value::AppType;
use crate::wire::WireType;

/// The main error type for binding and extraction.
#[derive(Debug, Error)]
pub enum BindError {
    /// A value could not be moved between its application type and a wire type.
    #[error("Cannot convert {value} between {app_type} and {wire_type}: {reason}")]
    Conversion {
        app_type: AppType,
        wire_type: WireType,
        value: String,
        reason: String,
    },

    /// Resolution found no applicable converter.
    #[error("No converter found for type '{app_type}' with wire type {}", hint(.wire_type))]
    NoConverterFound {
        app_type: String,
        wire_type: Option<WireType>,
    },

    /// A converter was registered under a wire type it does not declare.
    #[error("Converter '{converter}' cannot be registered for {wire_type}; it declares: {declared}")]
    IncompatibleRegistration {
        converter: String,
        wire_type: WireType,
        declared: String,
    },

    /// The registry no longer accepts registrations.
    #[error("Registry is frozen; cannot {0}")]
    RegistryFrozen(String),

    /// Parameter position outside the statement's placeholders.
    #[error("Parameter position {0} is out of range")]
    InvalidPosition(usize),

    /// A placeholder was left without a value.
    #[error("Parameter ${0} was never bound")]
    UnboundParameter(usize),

    /// Column lookup failed.
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    /// Failed to parse a declaration or request string.
    #[error("Parse error at position {position}: {message}")]
    Parse { position: usize, message: String },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database error reported by a driver adapter.
    #[error("Database error: {0}")]
    Database(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn hint(wire_type: &Option<WireType>) -> String {
    match wire_type {
        Some(w) => w.to_string(),
        None => "<any>".to_string(),
    }
}

impl BindError {
    /// Create a conversion error for a value.
    pub fn conversion(
        app_type: &AppType,
        wire_type: WireType,
        value: impl std::fmt::Display,
        reason: impl Into<String>,
    ) -> Self {
        Self::Conversion {
            app_type: app_type.clone(),
            wire_type,
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Create a resolution failure.
    pub fn no_converter(app_type: Option<&AppType>, wire_type: Option<WireType>) -> Self {
        Self::NoConverterFound {
            app_type: app_type
                .map(|t| t.to_string())
                .unwrap_or_else(|| "<unconstrained>".to_string()),
            wire_type,
        }
    }

    /// Create a parse error at the given position.
    pub fn parse(position: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            position,
            message: message.into(),
        }
    }

    /// True for conversion failures.
    pub fn is_conversion(&self) -> bool {
        matches!(self, Self::Conversion { .. })
    }
}

/// Result type alias for wirebind operations.
pub type BindResult<T> = Result<T, BindError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BindError::parse(5, "unexpected character");
        assert_eq!(
            err.to_string(),
            "Parse error at position 5: unexpected character"
        );
    }

    #[test]
    fn test_no_converter_names_both_sides() {
        let err = BindError::no_converter(Some(&AppType::new("Invoice")), Some(WireType::Varchar));
        assert_eq!(
            err.to_string(),
            "No converter found for type 'Invoice' with wire type VARCHAR"
        );

        let err = BindError::no_converter(None, None);
        assert_eq!(
            err.to_string(),
            "No converter found for type '<unconstrained>' with wire type <any>"
        );
    }

    #[test]
    fn test_conversion_display() {
        let err = BindError::conversion(&AppType::I64, WireType::SmallInt, 70000, "out of range");
        assert!(err.is_conversion());
        assert_eq!(
            err.to_string(),
            "Cannot convert 70000 between i64 and SMALLINT: out of range"
        );
    }
}
