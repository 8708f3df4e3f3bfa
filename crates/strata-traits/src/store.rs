//! Store traits for persistence backends.
//!
//! These traits define the narrow interfaces the engine sees:
//! - [`TemplateStore`]: statement templates and persisted clones
//! - [`DriverStore`]: driver values per entity and scenario
//! - [`UnitStore`]: unit definitions
//! - [`FxStore`]: FX rates
//! - [`ActionStore`]: management actions and scenario bindings
//! - [`ResultStore`]: period results
//!
//! Storage implementations are EXTENSIONS (in-memory, SQL, …); the engine
//! completes all store I/O during its load phase, before any evaluation.

use std::sync::Arc;

use async_trait::async_trait;

use strata_core::types::{
    EntityId, ManagementAction, Period, PeriodResult, ScenarioActionBinding, ScenarioId,
    StatementTemplate,
};
use strata_core::units::{FxRateType, UnitDefinition};

use crate::error::StoreError;
use crate::records::{DriverRecord, FxRecord};

/// Statement template storage.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// Fetch a template by code.
    async fn fetch_template(&self, code: &str) -> Result<StatementTemplate, StoreError>;

    /// Persist a template (used for derived clones; optional for backends
    /// that only cache in memory).
    async fn save_template(&self, template: &StatementTemplate) -> Result<(), StoreError>;
}

/// Driver value storage.
#[async_trait]
pub trait DriverStore: Send + Sync {
    /// Fetch all driver values for an (entity, scenario) pair.
    async fn fetch_drivers(
        &self,
        entity: &EntityId,
        scenario: &ScenarioId,
    ) -> Result<Vec<DriverRecord>, StoreError>;
}

/// Unit definition storage.
#[async_trait]
pub trait UnitStore: Send + Sync {
    /// Fetch every known unit definition.
    async fn fetch_unit_definitions(&self) -> Result<Vec<UnitDefinition>, StoreError>;
}

/// FX rate storage.
#[async_trait]
pub trait FxStore: Send + Sync {
    /// Fetch one rate. A missing rate is an error, never a default.
    async fn fetch_fx(
        &self,
        from: &str,
        to: &str,
        rate_type: FxRateType,
        period: Period,
    ) -> Result<f64, StoreError>;

    /// Fetch every stored rate; used by the load phase to freeze the FX
    /// table before evaluation begins.
    async fn fetch_fx_rates(&self) -> Result<Vec<FxRecord>, StoreError>;
}

/// Management action and binding storage.
#[async_trait]
pub trait ActionStore: Send + Sync {
    /// Fetch the action bindings of a scenario.
    async fn fetch_scenario_actions(
        &self,
        scenario: &ScenarioId,
    ) -> Result<Vec<ScenarioActionBinding>, StoreError>;

    /// Fetch all management actions.
    async fn fetch_management_actions(&self) -> Result<Vec<ManagementAction>, StoreError>;
}

/// Period result storage.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Persist a period result. Re-persisting the same
    /// (entity, scenario, period, template) tuple overwrites.
    async fn persist_period_result(&self, result: &PeriodResult) -> Result<(), StoreError>;
}

/// Combined store adapter handed to the engine's load phase.
#[derive(Clone)]
pub struct StoreAdapter {
    /// Template store
    pub templates: Arc<dyn TemplateStore>,
    /// Driver store
    pub drivers: Arc<dyn DriverStore>,
    /// Unit store
    pub units: Arc<dyn UnitStore>,
    /// FX store
    pub fx: Arc<dyn FxStore>,
    /// Action store
    pub actions: Arc<dyn ActionStore>,
    /// Result store
    pub results: Arc<dyn ResultStore>,
}

impl StoreAdapter {
    /// Build an adapter from one backend implementing every store trait.
    pub fn from_single<S>(store: Arc<S>) -> Self
    where
        S: TemplateStore
            + DriverStore
            + UnitStore
            + FxStore
            + ActionStore
            + ResultStore
            + 'static,
    {
        Self {
            templates: store.clone(),
            drivers: store.clone(),
            units: store.clone(),
            fx: store.clone(),
            actions: store.clone(),
            results: store,
        }
    }
}
