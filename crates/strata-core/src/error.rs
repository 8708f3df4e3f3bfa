//! Error types for the Strata core crate.
//!
//! This module defines the error type shared by the core domain model,
//! providing structured error handling with context.

use thiserror::Error;

use crate::types::Period;
use crate::units::FxRateType;

/// A specialized Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// The main error type for core domain operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// Unit code is not present in the unit registry.
    #[error("Unknown unit: {code}")]
    UnknownUnit {
        /// The unresolved unit code.
        code: String,
    },

    /// Conversion requested between units of different categories.
    #[error("Incompatible units: {from} -> {to}")]
    IncompatibleUnits {
        /// Source unit code.
        from: String,
        /// Target unit code.
        to: String,
    },

    /// No FX rate stored for the requested pair, rate type, and period.
    #[error("Missing FX rate {from}/{to} ({rate_type}) for {period}")]
    MissingFxRate {
        /// Source currency code.
        from: String,
        /// Target currency code.
        to: String,
        /// Rate type (average, closing, opening).
        rate_type: FxRateType,
        /// Period of the lookup.
        period: Period,
    },

    /// A time-varying conversion was requested without a period.
    #[error("Conversion {from} -> {to} is time-varying and requires a period")]
    MissingPeriod {
        /// Source unit code.
        from: String,
        /// Target unit code.
        to: String,
    },

    /// Line item does not exist in the template.
    #[error("Line item not found: {line} (template {template})")]
    LineNotFound {
        /// Template code.
        template: String,
        /// Missing line item code.
        line: String,
    },

    /// A line item with the same code already exists in the template.
    #[error("Duplicate line item: {line} (template {template})")]
    DuplicateLine {
        /// Template code.
        template: String,
        /// Duplicated line item code.
        line: String,
    },

    /// A `base_value_source` string did not match `driver:CODE[@UNIT]`.
    #[error("Invalid driver source '{source_str}': {reason}")]
    InvalidDriverSource {
        /// The offending source string.
        source_str: String,
        /// What was wrong with it.
        reason: String,
    },
}

impl CoreError {
    /// Creates an unknown unit error.
    #[must_use]
    pub fn unknown_unit(code: impl Into<String>) -> Self {
        Self::UnknownUnit { code: code.into() }
    }

    /// Creates an incompatible units error.
    #[must_use]
    pub fn incompatible_units(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::IncompatibleUnits {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Creates a line not found error.
    #[must_use]
    pub fn line_not_found(template: impl Into<String>, line: impl Into<String>) -> Self {
        Self::LineNotFound {
            template: template.into(),
            line: line.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::unknown_unit("tCO2e");
        assert!(err.to_string().contains("Unknown unit"));
    }

    #[test]
    fn test_missing_fx_display() {
        let err = CoreError::MissingFxRate {
            from: "USD".to_string(),
            to: "EUR".to_string(),
            rate_type: FxRateType::Average,
            period: Period(3),
        };
        assert!(err.to_string().contains("USD/EUR"));
        assert!(err.to_string().contains("P3"));
    }
}
