//! The in-memory store backend.

use async_trait::async_trait;
use dashmap::DashMap;

use strata_core::types::{
    EntityId, ManagementAction, Period, PeriodResult, ScenarioActionBinding, ScenarioId,
    StatementTemplate,
};
use strata_core::units::{FxRateType, UnitDefinition};
use strata_traits::error::StoreError;
use strata_traits::records::{DriverRecord, FxRecord};
use strata_traits::store::{
    ActionStore, DriverStore, FxStore, ResultStore, TemplateStore, UnitStore,
};

/// An in-memory store implementing every Strata store trait.
///
/// All maps are concurrent, so one instance can back parallel scenario
/// batches. Reads sort their output where the trait contract implies a
/// stable order.
#[derive(Default)]
pub struct MemoryStore {
    templates: DashMap<String, StatementTemplate>,
    drivers: DashMap<(EntityId, ScenarioId), Vec<DriverRecord>>,
    units: DashMap<String, UnitDefinition>,
    fx: DashMap<(String, String, FxRateType, Period), f64>,
    bindings: DashMap<ScenarioId, Vec<ScenarioActionBinding>>,
    actions: DashMap<String, ManagementAction>,
    results: DashMap<(EntityId, ScenarioId, Period, String), PeriodResult>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a template, replacing any existing one with the same code.
    pub fn insert_template(&self, template: StatementTemplate) {
        self.templates.insert(template.code.clone(), template);
    }

    /// Insert one driver value.
    pub fn insert_driver(
        &self,
        entity: &EntityId,
        scenario: &ScenarioId,
        period: Period,
        code: impl Into<String>,
        value: f64,
        unit: impl Into<String>,
    ) {
        self.drivers
            .entry((entity.clone(), scenario.clone()))
            .or_default()
            .push(DriverRecord {
                period,
                code: code.into(),
                value,
                unit: unit.into(),
            });
    }

    /// Insert a unit definition.
    pub fn insert_unit(&self, unit: UnitDefinition) {
        self.units.insert(unit.code.clone(), unit);
    }

    /// Insert an FX rate.
    pub fn insert_fx(
        &self,
        from: impl Into<String>,
        to: impl Into<String>,
        rate_type: FxRateType,
        period: Period,
        rate: f64,
    ) {
        self.fx.insert((from.into(), to.into(), rate_type, period), rate);
    }

    /// Insert a scenario action binding.
    pub fn insert_binding(&self, binding: ScenarioActionBinding) {
        self.bindings
            .entry(binding.scenario.clone())
            .or_default()
            .push(binding);
    }

    /// Insert a management action.
    pub fn insert_action(&self, action: ManagementAction) {
        self.actions.insert(action.code.clone(), action);
    }

    /// Retrieve a persisted result, if any.
    #[must_use]
    pub fn result(
        &self,
        entity: &EntityId,
        scenario: &ScenarioId,
        period: Period,
        template_code: &str,
    ) -> Option<PeriodResult> {
        self.results
            .get(&(
                entity.clone(),
                scenario.clone(),
                period,
                template_code.to_string(),
            ))
            .map(|r| r.clone())
    }

    /// Number of persisted results.
    #[must_use]
    pub fn result_count(&self) -> usize {
        self.results.len()
    }
}

#[async_trait]
impl TemplateStore for MemoryStore {
    async fn fetch_template(&self, code: &str) -> Result<StatementTemplate, StoreError> {
        self.templates
            .get(code)
            .map(|t| t.clone())
            .ok_or_else(|| StoreError::NotFound(format!("template {}", code)))
    }

    async fn save_template(&self, template: &StatementTemplate) -> Result<(), StoreError> {
        self.insert_template(template.clone());
        Ok(())
    }
}

#[async_trait]
impl DriverStore for MemoryStore {
    async fn fetch_drivers(
        &self,
        entity: &EntityId,
        scenario: &ScenarioId,
    ) -> Result<Vec<DriverRecord>, StoreError> {
        let mut records = self
            .drivers
            .get(&(entity.clone(), scenario.clone()))
            .map(|r| r.clone())
            .unwrap_or_default();
        records.sort_by(|a, b| (a.period, &a.code).cmp(&(b.period, &b.code)));
        Ok(records)
    }
}

#[async_trait]
impl UnitStore for MemoryStore {
    async fn fetch_unit_definitions(&self) -> Result<Vec<UnitDefinition>, StoreError> {
        let mut units: Vec<UnitDefinition> =
            self.units.iter().map(|entry| entry.value().clone()).collect();
        units.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(units)
    }
}

#[async_trait]
impl FxStore for MemoryStore {
    async fn fetch_fx(
        &self,
        from: &str,
        to: &str,
        rate_type: FxRateType,
        period: Period,
    ) -> Result<f64, StoreError> {
        self.fx
            .get(&(from.to_string(), to.to_string(), rate_type, period))
            .map(|r| *r)
            .ok_or_else(|| {
                StoreError::NotFound(format!("fx {}/{} {} {}", from, to, rate_type, period))
            })
    }

    async fn fetch_fx_rates(&self) -> Result<Vec<FxRecord>, StoreError> {
        let mut records: Vec<FxRecord> = self
            .fx
            .iter()
            .map(|entry| {
                let (from, to, rate_type, period) = entry.key().clone();
                FxRecord {
                    from,
                    to,
                    rate_type,
                    period,
                    rate: *entry.value(),
                }
            })
            .collect();
        records.sort_by(|a, b| {
            (&a.from, &a.to, a.rate_type, a.period).cmp(&(&b.from, &b.to, b.rate_type, b.period))
        });
        Ok(records)
    }
}

#[async_trait]
impl ActionStore for MemoryStore {
    async fn fetch_scenario_actions(
        &self,
        scenario: &ScenarioId,
    ) -> Result<Vec<ScenarioActionBinding>, StoreError> {
        Ok(self
            .bindings
            .get(scenario)
            .map(|b| b.clone())
            .unwrap_or_default())
    }

    async fn fetch_management_actions(&self) -> Result<Vec<ManagementAction>, StoreError> {
        let mut actions: Vec<ManagementAction> =
            self.actions.iter().map(|entry| entry.value().clone()).collect();
        actions.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(actions)
    }
}

#[async_trait]
impl ResultStore for MemoryStore {
    async fn persist_period_result(&self, result: &PeriodResult) -> Result<(), StoreError> {
        self.results.insert(
            (
                result.entity.clone(),
                result.scenario.clone(),
                result.period,
                result.template_code.clone(),
            ),
            result.clone(),
        );
        Ok(())
    }
}
