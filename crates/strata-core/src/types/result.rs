//! Period results: the immutable output of one engine run.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{EntityId, Period, ScenarioId, Section, StatementTemplate, ValidationReport};

/// The immutable record of all line-item values for one
/// entity/scenario/period, plus the validation outcome.
///
/// Values live in a `BTreeMap` so serialization is deterministic: two runs
/// with identical inputs produce byte-identical results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodResult {
    /// Entity the result belongs to.
    pub entity: EntityId,
    /// Scenario the result belongs to.
    pub scenario: ScenarioId,
    /// Period the result belongs to.
    pub period: Period,
    /// Code of the template actually used (base or derived clone).
    pub template_code: String,
    /// Computed value per line item code.
    pub values: BTreeMap<String, f64>,
    /// Validation findings for the period.
    pub report: ValidationReport,
}

impl PeriodResult {
    /// Value of a line item, if present.
    #[must_use]
    pub fn value(&self, code: &str) -> Option<f64> {
        self.values.get(code).copied()
    }

    /// Sum of all values in one section of the given template.
    ///
    /// Only lines flagged as subtotals are excluded, so section totals are
    /// not double-counted when a template carries both components and their
    /// subtotal.
    #[must_use]
    pub fn section_total(&self, template: &StatementTemplate, section: Section) -> f64 {
        template
            .items()
            .filter(|item| item.section == section && !item.is_subtotal)
            .filter_map(|item| self.value(&item.code))
            .sum()
    }
}
