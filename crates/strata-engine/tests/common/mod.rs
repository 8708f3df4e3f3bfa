//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use strata_core::types::{EntityId, Period, ScenarioId, StatementTemplate};
use strata_core::units::UnitDefinition;
use strata_engine::{ModelData, ModelLoader, ValueMap};
use strata_ext_mem::MemoryStore;
use strata_traits::store::StoreAdapter;

pub const ENTITY: &str = "ACME";
pub const SCENARIO: &str = "Base";

pub fn entity() -> EntityId {
    EntityId::new(ENTITY)
}

pub fn scenario() -> ScenarioId {
    ScenarioId::new(SCENARIO)
}

/// A store pre-seeded with the EUR currency unit.
pub fn store() -> Arc<MemoryStore> {
    init_tracing();
    let store = MemoryStore::new();
    store.insert_unit(UnitDefinition::currency("EUR"));
    Arc::new(store)
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

/// Seed per-period driver values under the base scenario.
pub fn seed_drivers(store: &MemoryStore, rows: &[(i32, &str, f64)]) {
    for (period, code, value) in rows {
        store.insert_driver(&entity(), &scenario(), Period(*period), *code, *value, "EUR");
    }
}

/// Load a frozen model for the base scenario through the store.
pub async fn load_model(store: &Arc<MemoryStore>, template: StatementTemplate) -> ModelData {
    store.insert_template(template.clone());
    let adapter = StoreAdapter::from_single(store.clone());
    ModelLoader::new(adapter)
        .load(&entity(), &template.code, &[scenario()])
        .await
        .expect("model should load")
}

pub fn opening(entries: &[(&str, f64)]) -> ValueMap {
    entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

pub fn periods(range: std::ops::RangeInclusive<i32>) -> Vec<Period> {
    range.map(Period).collect()
}
