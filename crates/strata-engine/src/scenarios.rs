//! Scenario generation and batch execution.
//!
//! Two generation modes exist: combinatorial (every subset of the action
//! set, 2^N configurations) and diagonal (baseline plus one configuration
//! per action, used for MAC curves). Generated configurations reuse one
//! scenario's drivers and differ only in which bound actions are active.

use std::collections::BTreeMap;

use rayon::prelude::*;
use tracing::info;

use strata_core::types::{Period, ScenarioActionBinding, ScenarioId};
use strata_traits::store::ResultStore;

use crate::actions::ActionEngine;
use crate::error::{EngineError, EngineResult};
use crate::loader::ModelData;
use crate::runner::{PeriodRunner, RunOutcome, RunSpec};
use crate::state::ValueMap;

/// One generated scenario configuration: a named subset of the actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioConfig {
    /// Position in the generated sequence (the bitmask in combinatorial
    /// mode).
    pub index: usize,
    /// Scenario name ("Base", or the '+' join of active action codes).
    pub name: String,
    /// Active action codes, in action-index order.
    pub active_actions: Vec<String>,
}

/// Every subset of the action set: 2^N configurations. Action `j` is
/// active in configuration `i` iff bit `j` of `i` is set.
#[must_use]
pub fn generate_all_combinations(action_codes: &[String]) -> Vec<ScenarioConfig> {
    let n = action_codes.len();
    (0..(1usize << n))
        .map(|mask| {
            let active: Vec<String> = action_codes
                .iter()
                .enumerate()
                .filter(|(j, _)| mask & (1 << j) != 0)
                .map(|(_, code)| code.clone())
                .collect();
            ScenarioConfig {
                index: mask,
                name: config_name(&active),
                active_actions: active,
            }
        })
        .collect()
}

/// Baseline plus one single-action configuration per action: N+1 total.
#[must_use]
pub fn generate_diagonal(action_codes: &[String]) -> Vec<ScenarioConfig> {
    let mut configs = vec![ScenarioConfig {
        index: 0,
        name: "Base".to_string(),
        active_actions: Vec::new(),
    }];
    for (j, code) in action_codes.iter().enumerate() {
        configs.push(ScenarioConfig {
            index: j + 1,
            name: code.clone(),
            active_actions: vec![code.clone()],
        });
    }
    configs
}

fn config_name(active: &[String]) -> String {
    if active.is_empty() {
        "Base".to_string()
    } else {
        active.join("+")
    }
}

/// Shared parameters of a batch run.
#[derive(Debug, Clone)]
pub struct BatchSpec {
    /// Scenario whose drivers feed every configuration.
    pub driver_scenario: ScenarioId,
    /// Periods to run, ascending.
    pub periods: Vec<Period>,
    /// Opening balance sheet state.
    pub opening: ValueMap,
    /// Run configurations in parallel. Each configuration owns its run
    /// state; only frozen snapshots and the clone cache are shared.
    pub parallel: bool,
}

/// Build the run spec of one configuration from the per-action bindings.
fn spec_for_config(
    config: &ScenarioConfig,
    bindings_by_action: &BTreeMap<String, ScenarioActionBinding>,
    batch: &BatchSpec,
) -> EngineResult<RunSpec> {
    let scenario = ScenarioId::new(config.name.clone());
    let mut bindings = Vec::with_capacity(config.active_actions.len());
    for code in &config.active_actions {
        let binding = bindings_by_action
            .get(code)
            .ok_or_else(|| EngineError::ActionApplication {
                action: code.clone(),
                line: String::new(),
                reason: "no binding defined for generated configuration".to_string(),
            })?;
        let mut binding = binding.clone();
        binding.scenario = scenario.clone();
        bindings.push(binding);
    }
    Ok(RunSpec {
        scenario,
        driver_scenario: batch.driver_scenario.clone(),
        bindings,
        periods: batch.periods.clone(),
        opening: batch.opening.clone(),
    })
}

/// Run every configuration through the period runner.
///
/// Configurations are independent: a fatal error in one is captured in
/// its outcome and does not stop the others. Outcomes come back in
/// configuration order regardless of execution order.
pub fn run_batch(
    model: &ModelData,
    actions: &ActionEngine,
    bindings_by_action: &BTreeMap<String, ScenarioActionBinding>,
    configs: &[ScenarioConfig],
    batch: &BatchSpec,
) -> EngineResult<Vec<RunOutcome>> {
    let specs: Vec<RunSpec> = configs
        .iter()
        .map(|config| spec_for_config(config, bindings_by_action, batch))
        .collect::<EngineResult<_>>()?;

    info!(
        configurations = specs.len(),
        parallel = batch.parallel,
        "running scenario batch"
    );

    let outcomes = if batch.parallel {
        specs
            .par_iter()
            .map(|spec| PeriodRunner::new(model, actions).run(spec))
            .collect()
    } else {
        specs
            .iter()
            .map(|spec| PeriodRunner::new(model, actions).run(spec))
            .collect()
    };
    Ok(outcomes)
}

/// Persist every completed period result of a batch. Returns how many
/// results were written.
pub async fn persist_outcomes(
    store: &dyn ResultStore,
    outcomes: &[RunOutcome],
) -> EngineResult<usize> {
    let mut written = 0;
    for outcome in outcomes {
        for result in &outcome.results {
            store.persist_period_result(result).await?;
            written += 1;
        }
    }
    Ok(written)
}
