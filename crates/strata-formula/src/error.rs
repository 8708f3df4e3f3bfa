//! Error types for formula parsing and evaluation.

use thiserror::Error;

/// A specialized Result type for formula operations.
pub type FormulaResult<T> = Result<T, FormulaError>;

/// Errors surfaced while parsing or evaluating a formula.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormulaError {
    /// The formula text did not parse.
    #[error("Parse error at position {position}: {message}")]
    ParseError {
        /// Byte offset into the formula text.
        position: usize,
        /// What went wrong.
        message: String,
    },

    /// No value provider claimed the reference.
    #[error("Unknown reference: {0}")]
    UnknownReference(String),

    /// Division with a zero denominator.
    #[error("Division by zero")]
    DivisionByZero,

    /// A future-shifted reference (`X[t+k]`) cannot be resolved.
    #[error("Missing dependency: {0}")]
    MissingDependency(String),

    /// `TAX_COMPUTE` named a strategy the registry does not know.
    #[error("Unknown tax strategy: {0}")]
    UnknownTaxStrategy(String),

    /// The driver provider owns the key but has no value for the context.
    #[error("Missing driver {code} for {entity}/{scenario} in period {period}")]
    MissingDriver {
        /// Entity code.
        entity: String,
        /// Scenario code.
        scenario: String,
        /// Period index.
        period: i32,
        /// Driver code.
        code: String,
    },

    /// A provider resolved the key but its unit conversion failed.
    #[error("Unit conversion failed: {0}")]
    UnitConversion(String),

    /// The FX provider owns the key but the rate table has no entry.
    #[error("Missing FX rate {from}/{to} ({rate_type}) in period {period}")]
    MissingFxRate {
        /// Source currency code.
        from: String,
        /// Target currency code.
        to: String,
        /// Rate type name.
        rate_type: String,
        /// Period index.
        period: i32,
    },
}

impl FormulaError {
    /// Creates a parse error.
    #[must_use]
    pub fn parse(position: usize, message: impl Into<String>) -> Self {
        Self::ParseError {
            position,
            message: message.into(),
        }
    }
}
