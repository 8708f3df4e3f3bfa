//! Unit definitions and conversion.
//!
//! Two conversion regimes exist:
//!
//! - **Static** units (mass, energy, carbon, …) convert through a pair of
//!   factors against their category's base unit.
//! - **Time-varying** units (currencies) convert through the per-period FX
//!   table and require a period at the call site.
//!
//! The [`UnitConverter`] is the single entry point for both; the driver
//! load path and the FX value provider share one instance so their
//! semantics cannot drift apart.

mod converter;
mod fx;

pub use converter::UnitConverter;
pub use fx::{FxRateType, FxTable};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Physical or financial category of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum UnitCategory {
    /// Greenhouse gas quantities (tCO2e and friends).
    Carbon,
    /// Currencies; always time-varying.
    Currency,
    /// Mass.
    Mass,
    /// Energy.
    Energy,
    /// Volume.
    Volume,
    /// Distance.
    Distance,
    /// Dimensionless ratios and counts.
    Dimensionless,
}

/// How a unit converts to others in its category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "conversion_type", rename_all = "snake_case")]
pub enum ConversionKind {
    /// Fixed factors against the category base unit.
    Static {
        /// Multiply by this to reach the base unit.
        to_base: f64,
        /// Multiply a base-unit value by this to reach this unit.
        from_base: f64,
    },
    /// Rates looked up per period (currencies).
    TimeVarying,
}

/// A unit of measure known to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitDefinition {
    /// Unit code (e.g. `tCO2e`, `EUR`, `MWh`).
    pub code: String,
    /// Category the unit belongs to.
    pub category: UnitCategory,
    /// Conversion regime.
    pub conversion: ConversionKind,
}

impl UnitDefinition {
    /// A static unit with symmetric factors.
    pub fn fixed(code: impl Into<String>, category: UnitCategory, to_base: f64) -> Self {
        Self {
            code: code.into(),
            category,
            conversion: ConversionKind::Static {
                to_base,
                from_base: 1.0 / to_base,
            },
        }
    }

    /// A currency unit.
    pub fn currency(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            category: UnitCategory::Currency,
            conversion: ConversionKind::TimeVarying,
        }
    }
}

/// Frozen registry of unit definitions, loaded once per run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitRegistry {
    units: BTreeMap<String, UnitDefinition>,
}

impl UnitRegistry {
    /// Build a registry from an iterator of definitions. Later duplicates
    /// replace earlier ones.
    pub fn from_definitions(definitions: impl IntoIterator<Item = UnitDefinition>) -> Self {
        let mut units = BTreeMap::new();
        for definition in definitions {
            units.insert(definition.code.clone(), definition);
        }
        Self { units }
    }

    /// Look up a unit definition.
    pub fn get(&self, code: &str) -> CoreResult<&UnitDefinition> {
        self.units
            .get(code)
            .ok_or_else(|| CoreError::unknown_unit(code))
    }

    /// Whether the code is registered.
    #[must_use]
    pub fn contains(&self, code: &str) -> bool {
        self.units.contains_key(code)
    }

    /// Number of registered units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}
