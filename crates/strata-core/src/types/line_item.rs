//! Line items: the named rows of a statement template.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::types::Section;

/// Declared sign convention for a line item.
///
/// The engine enforces nothing by default; a template opts into sign
/// checking per line through its validation rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SignConvention {
    /// Values are expected to be >= 0.
    Positive,
    /// Values are expected to be <= 0.
    Negative,
    /// No expectation.
    #[default]
    Unchecked,
}

/// Parsed form of a `base_value_source` string: `driver:CODE[@UNIT]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverSource {
    /// Driver code to look up.
    pub code: String,
    /// Unit the driver value is declared in, when it differs from the
    /// line item's unit.
    pub unit: Option<String>,
}

impl DriverSource {
    /// Create a driver source without a unit override.
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            unit: None,
        }
    }

    /// Create a driver source with an explicit unit.
    pub fn with_unit(code: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            unit: Some(unit.into()),
        }
    }
}

impl FromStr for DriverSource {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| CoreError::InvalidDriverSource {
            source_str: s.to_string(),
            reason: reason.to_string(),
        };
        let rest = s
            .strip_prefix("driver:")
            .ok_or_else(|| invalid("expected 'driver:' prefix"))?;
        let (code, unit) = match rest.split_once('@') {
            Some((code, unit)) => (code, Some(unit)),
            None => (rest, None),
        };
        if code.is_empty() {
            return Err(invalid("empty driver code"));
        }
        if let Some(unit) = unit {
            if unit.is_empty() {
                return Err(invalid("empty unit after '@'"));
            }
        }
        Ok(Self {
            code: code.to_string(),
            unit: unit.map(str::to_string),
        })
    }
}

impl fmt::Display for DriverSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.unit {
            Some(unit) => write!(f, "driver:{}@{}", self.code, unit),
            None => write!(f, "driver:{}", self.code),
        }
    }
}

/// A named row of a financial statement.
///
/// A value-bearing item carries exactly one of `formula` or
/// `base_value_source`. Setting a formula clears the driver source; the
/// template mutators maintain this invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Identifier, unique within a template.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Section this line belongs to.
    pub section: Section,
    /// Expression computing the value, if any.
    pub formula: Option<String>,
    /// Driver the value is sourced from, if any.
    pub base_value_source: Option<DriverSource>,
    /// Unit the value is expressed in.
    pub unit: Option<String>,
    /// Whether the value is computed rather than input.
    pub is_computed: bool,
    /// Whether the line is a subtotal over other lines.
    pub is_subtotal: bool,
    /// Declared sign convention.
    pub sign: SignConvention,
}

impl LineItem {
    /// Create a bare line item with no formula or driver source.
    pub fn new(code: impl Into<String>, name: impl Into<String>, section: Section) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            section,
            formula: None,
            base_value_source: None,
            unit: None,
            is_computed: false,
            is_subtotal: false,
            sign: SignConvention::Unchecked,
        }
    }

    /// Attach a formula. Clears any driver source.
    #[must_use]
    pub fn with_formula(mut self, formula: impl Into<String>) -> Self {
        self.formula = Some(formula.into());
        self.base_value_source = None;
        self.is_computed = true;
        self
    }

    /// Attach a driver source. Ignored later if a formula is also set.
    #[must_use]
    pub fn with_driver(mut self, source: DriverSource) -> Self {
        self.base_value_source = Some(source);
        self
    }

    /// Attach a unit code.
    #[must_use]
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Mark as a subtotal line.
    #[must_use]
    pub fn subtotal(mut self) -> Self {
        self.is_subtotal = true;
        self
    }

    /// Declare the sign convention.
    #[must_use]
    pub fn with_sign(mut self, sign: SignConvention) -> Self {
        self.sign = sign;
        self
    }

    /// Whether this item carries a value at all.
    #[must_use]
    pub fn carries_value(&self) -> bool {
        self.formula.is_some() || self.base_value_source.is_some()
    }

    /// The driver source, honouring formula precedence: an item with a
    /// formula never resolves through its driver source.
    #[must_use]
    pub fn effective_driver(&self) -> Option<&DriverSource> {
        if self.formula.is_some() {
            None
        } else {
            self.base_value_source.as_ref()
        }
    }
}
