//! The multi-period runner: one scenario, periods in ascending order.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use strata_core::types::{Period, PeriodResult, ScenarioActionBinding, ScenarioId};

use crate::actions::{active_bindings, ActionEngine};
use crate::engine::{PeriodContext, UnifiedEngine};
use crate::error::{EngineError, EngineResult};
use crate::loader::ModelData;
use crate::state::{RunHistory, ValueMap};

/// Cooperative cancellation flag, observed between periods.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A fresh, uncancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What to run: the scenario label, where its drivers come from, the
/// bindings in force, the period list, and the opening state.
#[derive(Debug, Clone)]
pub struct RunSpec {
    /// Scenario label results are filed under.
    pub scenario: ScenarioId,
    /// Scenario whose drivers feed the run (usually the same; differs for
    /// generated configurations that reuse the base scenario's drivers).
    pub driver_scenario: ScenarioId,
    /// Action bindings in force for this run.
    pub bindings: Vec<ScenarioActionBinding>,
    /// Periods to run, ascending.
    pub periods: Vec<Period>,
    /// Opening balance sheet state.
    pub opening: ValueMap,
}

impl RunSpec {
    /// A spec whose bindings and drivers come from the scenario itself.
    #[must_use]
    pub fn for_scenario(
        model: &ModelData,
        scenario: ScenarioId,
        periods: Vec<Period>,
        opening: ValueMap,
    ) -> Self {
        let bindings = model.bindings_for(&scenario).to_vec();
        Self {
            driver_scenario: scenario.clone(),
            scenario,
            bindings,
            periods,
            opening,
        }
    }
}

/// The outcome of a scenario run: results for every completed period,
/// plus the error that aborted the run, if any.
#[derive(Debug)]
pub struct RunOutcome {
    /// Scenario label.
    pub scenario: ScenarioId,
    /// Completed period results, in period order.
    pub results: Vec<PeriodResult>,
    /// The fatal error, if the run aborted.
    pub error: Option<EngineError>,
}

impl RunOutcome {
    /// Whether every requested period completed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// The result for a period, if it completed.
    #[must_use]
    pub fn result_for(&self, period: Period) -> Option<&PeriodResult> {
        self.results.iter().find(|r| r.period == period)
    }
}

/// Runs one scenario period by period, threading state and switching
/// templates as action activation changes.
pub struct PeriodRunner<'a> {
    model: &'a ModelData,
    actions: &'a ActionEngine,
    engine: UnifiedEngine,
    cancel: CancelToken,
}

impl<'a> PeriodRunner<'a> {
    /// Runner over a frozen model and a shared action engine.
    #[must_use]
    pub fn new(model: &'a ModelData, actions: &'a ActionEngine) -> Self {
        Self {
            model,
            actions,
            engine: UnifiedEngine::new(model.converter.clone(), model.drivers.clone()),
            cancel: CancelToken::new(),
        }
    }

    /// Attach a cancellation token.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Replace the unified engine (custom tax strategies).
    #[must_use]
    pub fn with_engine(mut self, engine: UnifiedEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Run all periods of the spec, strictly ascending.
    ///
    /// On a fatal error the run stops and the outcome carries the results
    /// completed so far together with the error, bound to its scenario
    /// and period.
    pub fn run(&self, spec: &RunSpec) -> RunOutcome {
        let mut periods = spec.periods.clone();
        periods.sort_unstable();
        periods.dedup();

        let Some(&first) = periods.first() else {
            return RunOutcome {
                scenario: spec.scenario.clone(),
                results: Vec::new(),
                error: None,
            };
        };

        let history = Rc::new(RefCell::new(RunHistory::new(first, spec.opening.clone())));
        let mut prior_values = spec.opening.clone();
        let mut fired: BTreeSet<String> = BTreeSet::new();
        let mut results = Vec::with_capacity(periods.len());

        for period in periods {
            if self.cancel.is_cancelled() {
                warn!(scenario = %spec.scenario, period = %period, "run cancelled");
                return RunOutcome {
                    scenario: spec.scenario.clone(),
                    results,
                    error: Some(EngineError::Cancelled.with_scenario_context(
                        self.model.entity.clone(),
                        spec.scenario.clone(),
                        period,
                    )),
                };
            }

            match self.run_period(spec, period, &history, &prior_values, &mut fired) {
                Ok(result) => {
                    history.borrow_mut().record(period, result.values.clone());
                    prior_values = result.values.clone();
                    results.push(result);
                }
                Err(e) => {
                    let error = e.with_scenario_context(
                        self.model.entity.clone(),
                        spec.scenario.clone(),
                        period,
                    );
                    return RunOutcome {
                        scenario: spec.scenario.clone(),
                        results,
                        error: Some(error),
                    };
                }
            }
        }

        info!(scenario = %spec.scenario, periods = results.len(), "scenario complete");
        RunOutcome {
            scenario: spec.scenario.clone(),
            results,
            error: None,
        }
    }

    fn run_period(
        &self,
        spec: &RunSpec,
        period: Period,
        history: &Rc<RefCell<RunHistory>>,
        prior_values: &ValueMap,
        fired: &mut BTreeSet<String>,
    ) -> EngineResult<PeriodResult> {
        let active = active_bindings(&spec.bindings, period, prior_values, fired)?;
        let template =
            self.actions
                .template_for_period(&self.model.base, &spec.scenario, period, &active)?;

        let ctx = PeriodContext {
            entity: self.model.entity.clone(),
            scenario: spec.scenario.clone(),
            driver_scenario: spec.driver_scenario.clone(),
            period,
        };
        self.engine.calculate_period(&ctx, &template, history)
    }
}
