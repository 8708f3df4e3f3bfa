//! Driver inputs: numeric values indexed by entity, scenario, period, code.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{EntityId, Period, ScenarioId};

/// Unique key of a driver value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DriverKey {
    /// Entity the value belongs to.
    pub entity: EntityId,
    /// Scenario the value belongs to.
    pub scenario: ScenarioId,
    /// Period the value belongs to.
    pub period: Period,
    /// Driver code.
    pub code: String,
}

/// A driver value with its declared unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverValue {
    /// Numeric value.
    pub value: f64,
    /// Unit code the value is declared in.
    pub unit: String,
}

/// Exact-key lookup table of driver values.
///
/// Lookups never depend on iteration order; the map exists purely for
/// keyed access.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DriverSet {
    values: BTreeMap<DriverKey, DriverValue>,
}

impl DriverSet {
    /// Create an empty driver set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a driver value, replacing any previous value under the key.
    pub fn insert(&mut self, key: DriverKey, value: DriverValue) {
        self.values.insert(key, value);
    }

    /// Look up a driver by its exact key.
    #[must_use]
    pub fn get(
        &self,
        entity: &EntityId,
        scenario: &ScenarioId,
        period: Period,
        code: &str,
    ) -> Option<&DriverValue> {
        self.values.get(&DriverKey {
            entity: entity.clone(),
            scenario: scenario.clone(),
            period,
            code: code.to_string(),
        })
    }

    /// Number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over all entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&DriverKey, &DriverValue)> {
        self.values.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_key_lookup() {
        let mut drivers = DriverSet::new();
        drivers.insert(
            DriverKey {
                entity: EntityId::new("ACME"),
                scenario: ScenarioId::new("Base"),
                period: Period(1),
                code: "REVENUE".to_string(),
            },
            DriverValue {
                value: 100_000.0,
                unit: "EUR".to_string(),
            },
        );

        let entity = EntityId::new("ACME");
        let scenario = ScenarioId::new("Base");
        let hit = drivers.get(&entity, &scenario, Period(1), "REVENUE");
        assert_eq!(hit.map(|v| v.value), Some(100_000.0));

        assert!(drivers.get(&entity, &scenario, Period(2), "REVENUE").is_none());
        assert!(drivers.get(&entity, &scenario, Period(1), "EXPENSES").is_none());
    }
}
