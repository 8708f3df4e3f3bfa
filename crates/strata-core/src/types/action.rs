//! Management actions and their scenario bindings.
//!
//! An action describes a business intervention (LED retrofit, fuel switch,
//! …) with a default cost profile. A [`ScenarioActionBinding`] schedules it
//! within one scenario: when it triggers, and which template
//! transformations it applies while active.

use serde::{Deserialize, Serialize};

use crate::types::{Period, ScenarioId};

/// Default cost and impact profile of a management action.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostProfile {
    /// Upfront capital expenditure.
    pub capex: f64,
    /// Recurring annual operating cost (negative = saving).
    pub opex_annual: f64,
    /// Vendor-claimed annual emission reduction, tCO2e. Informational
    /// only: the MAC curve uses measured reductions.
    pub emission_reduction_annual: f64,
    /// Years the capex is amortized over.
    pub amortization_years: u32,
}

impl CostProfile {
    /// Annualized cost: amortized capex plus annual opex.
    #[must_use]
    pub fn annualized_cost(&self) -> f64 {
        let amortization = self.amortization_years.max(1) as f64;
        self.capex / amortization + self.opex_annual
    }
}

/// A business or operational intervention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagementAction {
    /// Unique action code.
    pub code: String,
    /// Category label (e.g. `energy_efficiency`).
    pub category: String,
    /// Human description.
    pub description: String,
    /// Whether the action participates in MAC curves.
    pub is_mac_relevant: bool,
    /// Default cost profile.
    pub cost: CostProfile,
}

/// When a bound action becomes active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "trigger_type", rename_all = "snake_case")]
pub enum Trigger {
    /// Active from `start` onwards, optionally until `end` (inclusive).
    Unconditional {
        /// First active period.
        start: Period,
        /// Last active period, inclusive. `None` = open-ended.
        end: Option<Period>,
    },
    /// Active exactly at `start`, or over `start..=end` when `end` is set.
    Timed {
        /// Trigger period.
        start: Period,
        /// Last active period, inclusive.
        end: Option<Period>,
    },
    /// Active when `condition` evaluates true against the previous
    /// period's values.
    Conditional {
        /// Condition expression in the formula grammar.
        condition: String,
    },
}

/// One mutation of a template line applied while an action is active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Transformation {
    /// Replace the line's formula verbatim.
    FormulaOverride {
        /// Target line code.
        line: String,
        /// Replacement formula.
        formula: String,
    },
    /// Wrap the existing formula as `(existing) * factor`.
    Multiply {
        /// Target line code.
        line: String,
        /// Multiplier.
        factor: f64,
    },
    /// Wrap the existing formula as `(existing) + amount`.
    Add {
        /// Target line code.
        line: String,
        /// Addend.
        amount: f64,
    },
    /// Like `FormulaOverride`, but only permitted on carbon-section lines.
    CarbonFormulaOverride {
        /// Target line code.
        line: String,
        /// Replacement formula.
        formula: String,
    },
}

impl Transformation {
    /// The line this transformation targets.
    #[must_use]
    pub fn target(&self) -> &str {
        match self {
            Transformation::FormulaOverride { line, .. }
            | Transformation::Multiply { line, .. }
            | Transformation::Add { line, .. }
            | Transformation::CarbonFormulaOverride { line, .. } => line,
        }
    }
}

/// An action scheduled within one scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioActionBinding {
    /// Scenario the binding belongs to.
    pub scenario: ScenarioId,
    /// Bound action code.
    pub action_code: String,
    /// Activation trigger.
    pub trigger: Trigger,
    /// Once a conditional trigger fires, stay active regardless of the
    /// condition. Ignored for unconditional and timed triggers.
    pub sticky: bool,
    /// Transformations applied, in order, while active.
    pub transformations: Vec<Transformation>,
    /// Per-scenario cost override; falls back to the action default.
    pub cost_override: Option<CostProfile>,
}

impl ScenarioActionBinding {
    /// Create a binding with no transformations.
    pub fn new(scenario: ScenarioId, action_code: impl Into<String>, trigger: Trigger) -> Self {
        Self {
            scenario,
            action_code: action_code.into(),
            trigger,
            sticky: false,
            transformations: Vec::new(),
            cost_override: None,
        }
    }

    /// Add a transformation.
    #[must_use]
    pub fn with_transformation(mut self, transformation: Transformation) -> Self {
        self.transformations.push(transformation);
        self
    }

    /// Mark the conditional trigger as sticky.
    #[must_use]
    pub fn sticky(mut self) -> Self {
        self.sticky = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_annualized_cost() {
        let cost = CostProfile {
            capex: 50_000.0,
            opex_annual: 1_000.0,
            emission_reduction_annual: 120.0,
            amortization_years: 10,
        };
        assert_relative_eq!(cost.annualized_cost(), 6_000.0);
    }

    #[test]
    fn test_annualized_cost_guards_zero_amortization() {
        let cost = CostProfile {
            capex: 10_000.0,
            opex_annual: 0.0,
            emission_reduction_annual: 0.0,
            amortization_years: 0,
        };
        assert_relative_eq!(cost.annualized_cost(), 10_000.0);
    }

    #[test]
    fn test_trigger_serde_tag() {
        let trigger = Trigger::Timed {
            start: Period(3),
            end: None,
        };
        let json = serde_json::to_string(&trigger).unwrap();
        assert!(json.contains("\"trigger_type\":\"timed\""));
    }
}
