//! Marginal abatement cost curves from executed scenarios.
//!
//! The MAC of an action is its annualized cost divided by the emission
//! reduction *measured by running the model* with and without the action.
//! The action's own `emission_reduction_annual` metadata is never used
//! here: transformations can have indirect effects the metadata cannot
//! capture.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use strata_core::error::CoreError;
use strata_core::types::{Period, ScenarioActionBinding, ScenarioId, Trigger};

use crate::actions::ActionEngine;
use crate::error::{EngineError, EngineResult};
use crate::loader::ModelData;
use crate::runner::{PeriodRunner, RunSpec};
use crate::state::ValueMap;

/// One action's point on the MAC curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacPoint {
    /// Action code.
    pub action_code: String,
    /// Measured emission reduction, tCO2e (baseline minus with-action).
    pub reduction_tco2e: f64,
    /// Annualized cost: amortized capex plus annual opex.
    pub annualized_cost: f64,
    /// Cost per tonne abated. `None` when the measured reduction is zero.
    pub marginal_cost: Option<f64>,
    /// Running total of reduction up to and including this point.
    pub cumulative_reduction: f64,
}

/// A MAC curve: points sorted by marginal cost ascending, undefined
/// points last.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacCurve {
    /// Baseline emissions the reductions are measured against.
    pub baseline_emissions: f64,
    /// Curve points.
    pub points: Vec<MacPoint>,
}

/// Parameters of a MAC computation.
#[derive(Debug, Clone)]
pub struct MacSpec {
    /// Scenario whose drivers feed the runs.
    pub driver_scenario: ScenarioId,
    /// Line item holding total emissions in tCO2e.
    pub emissions_line: String,
    /// Opening balance sheet state.
    pub opening: ValueMap,
}

/// Compute the MAC curve over every MAC-relevant action with a binding.
///
/// Runs the baseline and one single-action scenario per action for a
/// single period, with every action forced to start in period 1.
pub fn compute_mac_curve(
    model: &ModelData,
    actions: &ActionEngine,
    bindings_by_action: &BTreeMap<String, ScenarioActionBinding>,
    spec: &MacSpec,
) -> EngineResult<MacCurve> {
    let period = Period(1);
    let baseline_emissions = run_single(
        model,
        actions,
        spec,
        ScenarioId::new("Base"),
        Vec::new(),
        period,
    )?;

    let mut points = Vec::new();
    for (code, action) in &model.actions {
        if !action.is_mac_relevant {
            continue;
        }
        let Some(binding) = bindings_by_action.get(code) else {
            continue;
        };

        // MAC runs force the action live from period 1 regardless of its
        // scheduled trigger.
        let mut binding = binding.clone();
        binding.trigger = Trigger::Unconditional {
            start: period,
            end: None,
        };
        let scenario = ScenarioId::new(format!("MAC_{}", code));
        binding.scenario = scenario.clone();

        let with_action = run_single(model, actions, spec, scenario, vec![binding.clone()], period)?;
        let reduction = baseline_emissions - with_action;

        let cost = binding.cost_override.unwrap_or(action.cost);
        let annualized = cost.annualized_cost();
        let marginal = if reduction != 0.0 {
            Some(annualized / reduction)
        } else {
            None
        };

        points.push(MacPoint {
            action_code: code.clone(),
            reduction_tco2e: reduction,
            annualized_cost: annualized,
            marginal_cost: marginal,
            cumulative_reduction: 0.0,
        });
    }

    points.sort_by(|a, b| match (a.marginal_cost, b.marginal_cost) {
        (Some(x), Some(y)) => x
            .partial_cmp(&y)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.action_code.cmp(&b.action_code)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.action_code.cmp(&b.action_code),
    });

    let mut cumulative = 0.0;
    for point in &mut points {
        cumulative += point.reduction_tco2e;
        point.cumulative_reduction = cumulative;
    }

    info!(points = points.len(), baseline = baseline_emissions, "MAC curve built");
    Ok(MacCurve {
        baseline_emissions,
        points,
    })
}

/// Run one single-period scenario and read its emissions line.
fn run_single(
    model: &ModelData,
    actions: &ActionEngine,
    spec: &MacSpec,
    scenario: ScenarioId,
    bindings: Vec<ScenarioActionBinding>,
    period: Period,
) -> EngineResult<f64> {
    let run_spec = RunSpec {
        scenario,
        driver_scenario: spec.driver_scenario.clone(),
        bindings,
        periods: vec![period],
        opening: spec.opening.clone(),
    };
    let outcome = PeriodRunner::new(model, actions).run(&run_spec);
    if let Some(error) = outcome.error {
        return Err(error);
    }
    let result = outcome
        .results
        .first()
        .ok_or(EngineError::Cancelled)?;
    result
        .value(&spec.emissions_line)
        .ok_or_else(|| {
            EngineError::Core(CoreError::LineNotFound {
                template: result.template_code.clone(),
                line: spec.emissions_line.clone(),
            })
        })
}
