//! Error types for the calculation engine.

use thiserror::Error;

use strata_core::error::CoreError;
use strata_core::types::{EntityId, Period, ScenarioId};
use strata_formula::FormulaError;
use strata_traits::error::StoreError;

/// A specialized Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// The main error type for engine operations.
#[derive(Error, Debug, Clone)]
pub enum EngineError {
    /// A driver value required by the template is absent.
    #[error("Missing driver {code} for {entity}/{scenario} in {period}")]
    MissingDriver {
        /// Entity code.
        entity: EntityId,
        /// Scenario code.
        scenario: ScenarioId,
        /// Period of the lookup.
        period: Period,
        /// Driver code.
        code: String,
    },

    /// The dependency graph contains a cycle.
    #[error("Circular dependency: {}", codes.join(" -> "))]
    CircularDependency {
        /// Members of the shortest detected cycle, in order.
        codes: Vec<String>,
    },

    /// A validation rule at error severity failed.
    #[error("Validation failure [{rule}] on {line}: {detail}")]
    Validation {
        /// Failed rule code.
        rule: String,
        /// Line the rule is about.
        line: String,
        /// Human-readable detail.
        detail: String,
    },

    /// A transformation could not be applied to the template.
    #[error("Action {action} failed on {line}: {reason}")]
    ActionApplication {
        /// Action code.
        action: String,
        /// Target line code.
        line: String,
        /// Why the transformation failed.
        reason: String,
    },

    /// The run was cancelled between periods.
    #[error("Run cancelled")]
    Cancelled,

    /// A formula failed to parse or evaluate.
    #[error(transparent)]
    Formula(#[from] FormulaError),

    /// A core domain operation failed (units, FX, template lookups).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Failure while evaluating one line, with debug context.
    #[error("Evaluation of {line} failed (#{position} in {template}): {source}")]
    Evaluation {
        /// Template the line belongs to.
        template: String,
        /// Line item being evaluated.
        line: String,
        /// Position of the line in the calculation order.
        position: usize,
        /// Most recently resolved identifiers, oldest first.
        recent: Vec<String>,
        /// The underlying failure.
        #[source]
        source: Box<EngineError>,
    },

    /// Failure bound to its scenario and period, as surfaced by the
    /// multi-period runner.
    #[error("Scenario {scenario} aborted at {period} for {entity}: {source}")]
    Scenario {
        /// Entity being run.
        entity: EntityId,
        /// Scenario being run.
        scenario: ScenarioId,
        /// Period that failed.
        period: Period,
        /// The underlying failure.
        #[source]
        source: Box<EngineError>,
    },
}

impl EngineError {
    /// Wrap a failure with per-line evaluation context.
    #[must_use]
    pub fn with_line_context(
        self,
        template: impl Into<String>,
        line: impl Into<String>,
        position: usize,
        recent: Vec<String>,
    ) -> Self {
        Self::Evaluation {
            template: template.into(),
            line: line.into(),
            position,
            recent,
            source: Box::new(self),
        }
    }

    /// Wrap a failure with scenario/period context.
    #[must_use]
    pub fn with_scenario_context(
        self,
        entity: EntityId,
        scenario: ScenarioId,
        period: Period,
    ) -> Self {
        Self::Scenario {
            entity,
            scenario,
            period,
            source: Box::new(self),
        }
    }

    /// The innermost error, unwrapping context layers.
    #[must_use]
    pub fn root_cause(&self) -> &EngineError {
        match self {
            EngineError::Evaluation { source, .. } | EngineError::Scenario { source, .. } => {
                source.root_cause()
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_nesting_and_root_cause() {
        let err = EngineError::from(FormulaError::DivisionByZero)
            .with_line_context("CORP", "MARGIN", 4, vec!["REVENUE".to_string()])
            .with_scenario_context(
                EntityId::new("ACME"),
                ScenarioId::new("Base"),
                Period(2),
            );

        let text = err.to_string();
        assert!(text.contains("Scenario Base"));
        assert!(text.contains("P2"));
        assert!(matches!(
            err.root_cause(),
            EngineError::Formula(FormulaError::DivisionByZero)
        ));
    }

    #[test]
    fn test_cycle_display() {
        let err = EngineError::CircularDependency {
            codes: vec!["A".to_string(), "B".to_string(), "A".to_string()],
        };
        assert_eq!(err.to_string(), "Circular dependency: A -> B -> A");
    }
}
