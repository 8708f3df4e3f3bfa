//! JSON fixture loaders.

use serde::{Deserialize, Serialize};

use strata_core::types::{EntityId, Period, ScenarioId, StatementTemplate};
use strata_traits::error::StoreError;

use crate::store::MemoryStore;

/// One driver row in a JSON fixture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverFixture {
    /// Entity code.
    pub entity: String,
    /// Scenario code.
    pub scenario: String,
    /// Period.
    pub period: Period,
    /// Driver code.
    pub code: String,
    /// Numeric value.
    pub value: f64,
    /// Unit code.
    pub unit: String,
}

impl MemoryStore {
    /// Load templates from a JSON array of serialized templates.
    pub fn load_templates_json(&self, json: &str) -> Result<usize, StoreError> {
        let templates: Vec<StatementTemplate> =
            serde_json::from_str(json).map_err(|e| StoreError::ParseError(e.to_string()))?;
        let count = templates.len();
        for template in templates {
            self.insert_template(template);
        }
        Ok(count)
    }

    /// Load drivers from a JSON array of [`DriverFixture`] rows.
    pub fn load_drivers_json(&self, json: &str) -> Result<usize, StoreError> {
        let rows: Vec<DriverFixture> =
            serde_json::from_str(json).map_err(|e| StoreError::ParseError(e.to_string()))?;
        let count = rows.len();
        for row in rows {
            self.insert_driver(
                &EntityId::new(row.entity),
                &ScenarioId::new(row.scenario),
                row.period,
                row.code,
                row.value,
                row.unit,
            );
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_traits::store::{DriverStore, TemplateStore};

    #[tokio::test]
    async fn test_load_drivers_json() {
        let store = MemoryStore::new();
        let loaded = store
            .load_drivers_json(
                r#"[
                    {"entity": "ACME", "scenario": "Base", "period": 1,
                     "code": "REVENUE", "value": 100000.0, "unit": "EUR"},
                    {"entity": "ACME", "scenario": "Base", "period": 1,
                     "code": "EXPENSES", "value": -60000.0, "unit": "EUR"}
                ]"#,
            )
            .unwrap();
        assert_eq!(loaded, 2);

        let records = store
            .fetch_drivers(&EntityId::new("ACME"), &ScenarioId::new("Base"))
            .await
            .unwrap();
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn test_load_templates_json_round_trip() {
        use strata_core::types::{LineItem, Section};

        let mut template = StatementTemplate::new("CORP", "integrated", 1);
        template
            .insert(
                LineItem::new("NET_INCOME", "Net income", Section::ProfitAndLoss)
                    .with_formula("REVENUE + EXPENSES"),
            )
            .unwrap();
        let json = serde_json::to_string(&vec![template.clone()]).unwrap();

        let store = MemoryStore::new();
        assert_eq!(store.load_templates_json(&json).unwrap(), 1);
        let fetched = store.fetch_template("CORP").await.unwrap();
        assert_eq!(fetched, template);
    }

    #[test]
    fn test_malformed_json_is_a_parse_error() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.load_drivers_json("not json"),
            Err(StoreError::ParseError(_))
        ));
    }
}
