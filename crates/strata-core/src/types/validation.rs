//! Declarative validation rules and their evaluation report.
//!
//! Rules are declared on the template and evaluated by the engine after a
//! period has been computed. A rule at [`Severity::Error`] aborts the
//! period; a [`Severity::Warning`] is recorded in the report and the run
//! continues.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Absolute tolerance for balance, rollforward, and subtotal checks, in
/// the template's base unit.
pub const BALANCE_TOLERANCE: f64 = 0.01;

/// Severity of a validation rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Failure aborts the period.
    Error,
    /// Failure is recorded, the run continues.
    Warning,
}

/// What a validation rule checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleKind {
    /// |assets - liabilities - equity| <= tolerance.
    BalanceIdentity {
        /// Total assets line code.
        assets: String,
        /// Total liabilities line code.
        liabilities: String,
        /// Total equity line code.
        equity: String,
    },
    /// line == line[t-1] + basis, within tolerance.
    Rollforward {
        /// The rolled-forward line (e.g. `CASH`).
        line: String,
        /// The movement line (e.g. `CF_NET`).
        basis: String,
    },
    /// line == sum(components), within tolerance.
    SubtotalSum {
        /// The subtotal line.
        line: String,
        /// Its components.
        components: Vec<String>,
    },
    /// Value respects the line's declared sign convention.
    SignCheck {
        /// The checked line.
        line: String,
    },
    /// Value is expected to be non-zero.
    NonZero {
        /// The checked line.
        line: String,
    },
}

/// A validation rule attached to a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRule {
    /// Rule identifier, unique within the template.
    pub code: String,
    /// Severity when the rule fails.
    pub severity: Severity,
    /// The check itself.
    pub kind: RuleKind,
}

impl ValidationRule {
    /// Create a rule.
    pub fn new(code: impl Into<String>, severity: Severity, kind: RuleKind) -> Self {
        Self {
            code: code.into(),
            severity,
            kind,
        }
    }

    /// Standard balance identity rule at error severity.
    pub fn balance_identity(
        assets: impl Into<String>,
        liabilities: impl Into<String>,
        equity: impl Into<String>,
    ) -> Self {
        Self::new(
            "BALANCE_IDENTITY",
            Severity::Error,
            RuleKind::BalanceIdentity {
                assets: assets.into(),
                liabilities: liabilities.into(),
                equity: equity.into(),
            },
        )
    }

    /// Standard rollforward rule at error severity.
    pub fn rollforward(line: impl Into<String>, basis: impl Into<String>) -> Self {
        let line = line.into();
        Self::new(
            format!("ROLLFORWARD_{}", line),
            Severity::Error,
            RuleKind::Rollforward {
                line,
                basis: basis.into(),
            },
        )
    }
}

/// One finding from the validation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// The failed rule's code.
    pub rule_code: String,
    /// The line item the finding is about.
    pub line: String,
    /// Severity of the failed rule.
    pub severity: Severity,
    /// Human-readable detail.
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.rule_code, self.line, self.message)
    }
}

/// The outcome of running all validation rules for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ValidationReport {
    /// All findings, in rule declaration order.
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// An empty (clean) report.
    #[must_use]
    pub fn clean() -> Self {
        Self::default()
    }

    /// Record a finding.
    pub fn push(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    /// Whether any error-severity finding is present.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.issues
            .iter()
            .any(|issue| issue.severity == Severity::Error)
    }

    /// Iterate over warning-severity findings.
    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues
            .iter()
            .filter(|issue| issue.severity == Severity::Warning)
    }
}
