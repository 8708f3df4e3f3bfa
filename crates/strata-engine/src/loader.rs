//! The load phase: fetch everything from the store, freeze it.
//!
//! All store I/O happens here, before any evaluation. The resulting
//! [`ModelData`] is immutable and shared by every scenario run, which is
//! what makes parallel batches safe.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::info;

use strata_core::types::{
    DriverKey, DriverSet, DriverValue, EntityId, ManagementAction, ScenarioActionBinding,
    ScenarioId,
};
use strata_core::units::{FxTable, UnitConverter, UnitRegistry};
use strata_traits::store::StoreAdapter;

use crate::engine::CompiledTemplate;
use crate::error::EngineResult;

/// Frozen model inputs for one entity.
#[derive(Clone)]
pub struct ModelData {
    /// Entity the model belongs to.
    pub entity: EntityId,
    /// Compiled base template.
    pub base: Arc<CompiledTemplate>,
    /// All driver values, exact-key addressable.
    pub drivers: Arc<DriverSet>,
    /// Unit converter over the frozen unit registry and FX table.
    pub converter: UnitConverter,
    /// Action bindings per scenario.
    pub bindings: BTreeMap<ScenarioId, Vec<ScenarioActionBinding>>,
    /// Management actions by code.
    pub actions: BTreeMap<String, ManagementAction>,
}

impl ModelData {
    /// The bindings of a scenario (empty if none are stored).
    #[must_use]
    pub fn bindings_for(&self, scenario: &ScenarioId) -> &[ScenarioActionBinding] {
        self.bindings
            .get(scenario)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Fetches and freezes model data through a [`StoreAdapter`].
pub struct ModelLoader {
    store: StoreAdapter,
}

impl ModelLoader {
    /// Loader over a store adapter.
    #[must_use]
    pub fn new(store: StoreAdapter) -> Self {
        Self { store }
    }

    /// Load the model for one entity: base template, drivers for every
    /// requested scenario, units, FX, actions, and bindings.
    pub async fn load(
        &self,
        entity: &EntityId,
        template_code: &str,
        scenarios: &[ScenarioId],
    ) -> EngineResult<ModelData> {
        let template = self.store.templates.fetch_template(template_code).await?;
        let base = CompiledTemplate::compile(template)?;

        let units = self.store.units.fetch_unit_definitions().await?;
        let registry = UnitRegistry::from_definitions(units);

        let mut fx = FxTable::new();
        for record in self.store.fx.fetch_fx_rates().await? {
            fx.insert(record.from, record.to, record.rate_type, record.period, record.rate);
        }
        let converter = UnitConverter::new(Arc::new(registry), Arc::new(fx));

        let mut drivers = DriverSet::new();
        let mut bindings = BTreeMap::new();
        for scenario in scenarios {
            for record in self.store.drivers.fetch_drivers(entity, scenario).await? {
                drivers.insert(
                    DriverKey {
                        entity: entity.clone(),
                        scenario: scenario.clone(),
                        period: record.period,
                        code: record.code,
                    },
                    DriverValue {
                        value: record.value,
                        unit: record.unit,
                    },
                );
            }
            let scenario_bindings = self.store.actions.fetch_scenario_actions(scenario).await?;
            bindings.insert(scenario.clone(), scenario_bindings);
        }

        let mut actions = BTreeMap::new();
        for action in self.store.actions.fetch_management_actions().await? {
            actions.insert(action.code.clone(), action);
        }

        info!(
            entity = %entity,
            template = template_code,
            drivers = drivers.len(),
            scenarios = scenarios.len(),
            "model loaded"
        );

        Ok(ModelData {
            entity: entity.clone(),
            base,
            drivers: Arc::new(drivers),
            converter,
            bindings,
            actions,
        })
    }
}
