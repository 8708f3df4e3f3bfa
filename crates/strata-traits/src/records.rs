//! Record types exchanged across the store boundary.

use serde::{Deserialize, Serialize};

use strata_core::types::{Period, PeriodResult};
use strata_core::units::FxRateType;

/// One driver value as fetched for an (entity, scenario) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverRecord {
    /// Period the value belongs to.
    pub period: Period,
    /// Driver code.
    pub code: String,
    /// Numeric value.
    pub value: f64,
    /// Unit the value is declared in.
    pub unit: String,
}

/// One FX rate row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FxRecord {
    /// Source currency code.
    pub from: String,
    /// Target currency code.
    pub to: String,
    /// Which fixing of the period.
    pub rate_type: FxRateType,
    /// Period of the rate.
    pub period: Period,
    /// The rate itself.
    pub rate: f64,
}

/// Row form of a period result, one row per line item.
///
/// Unique under (entity, scenario, period, template_code, line_item_code);
/// repeated persists overwrite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    /// Entity code.
    pub entity: String,
    /// Scenario code.
    pub scenario: String,
    /// Period.
    pub period: Period,
    /// Template actually used.
    pub template_code: String,
    /// Line item code.
    pub line_item_code: String,
    /// Computed value.
    pub value: f64,
}

impl ResultRow {
    /// Flatten a period result into rows, in line-code order.
    #[must_use]
    pub fn from_result(result: &PeriodResult) -> Vec<ResultRow> {
        result
            .values
            .iter()
            .map(|(code, value)| ResultRow {
                entity: result.entity.as_str().to_string(),
                scenario: result.scenario.as_str().to_string(),
                period: result.period,
                template_code: result.template_code.clone(),
                line_item_code: code.clone(),
                value: *value,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::types::{EntityId, ScenarioId, ValidationReport};

    #[test]
    fn test_result_rows_in_line_code_order() {
        let mut result = PeriodResult {
            entity: EntityId::new("ACME"),
            scenario: ScenarioId::new("Base"),
            period: Period(1),
            template_code: "CORP".to_string(),
            values: Default::default(),
            report: ValidationReport::clean(),
        };
        result.values.insert("REVENUE".to_string(), 100.0);
        result.values.insert("EXPENSES".to_string(), -60.0);

        let rows = ResultRow::from_result(&result);
        let codes: Vec<&str> = rows.iter().map(|r| r.line_item_code.as_str()).collect();
        assert_eq!(codes, vec!["EXPENSES", "REVENUE"]);
        assert_eq!(rows[0].template_code, "CORP");
    }
}
