//! The action engine: trigger evaluation and template transformation.
//!
//! Between periods, the runner asks which bound actions are active, then
//! asks for the template those actions produce. Clones are cached under a
//! deterministic derived code that includes the base template, scenario,
//! period, and sorted active set, so identical requests across scenarios
//! and periods share one compiled clone.

use std::collections::BTreeSet;
use std::rc::Rc;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use strata_core::types::{
    LineItem, Period, ScenarioActionBinding, ScenarioId, Section, StatementTemplate,
    Transformation, Trigger,
};
use strata_formula::{parse_formula, Evaluator, ProviderChain};

use crate::engine::CompiledTemplate;
use crate::error::{EngineError, EngineResult};
use crate::providers::PriorValuesProvider;
use crate::state::ValueMap;

/// Determine which bindings are active for a period.
///
/// `fired` carries conditional-trigger state across periods: sticky
/// triggers stay in the set once their condition has held; non-sticky
/// triggers are re-evaluated every period. Conditions observe the
/// *previous* period's values, so an action can never react to the value
/// it is about to change.
pub fn active_bindings<'a>(
    bindings: &'a [ScenarioActionBinding],
    period: Period,
    prior_values: &ValueMap,
    fired: &mut BTreeSet<String>,
) -> EngineResult<Vec<&'a ScenarioActionBinding>> {
    let mut active = Vec::new();
    for binding in bindings {
        let is_active = match &binding.trigger {
            Trigger::Unconditional { start, end } => {
                period >= *start && end.map_or(true, |end| period <= end)
            }
            Trigger::Timed { start, end } => match end {
                Some(end) => period >= *start && period <= *end,
                None => period == *start,
            },
            Trigger::Conditional { condition } => {
                if binding.sticky && fired.contains(&binding.action_code) {
                    true
                } else {
                    let holds = evaluate_condition(condition, prior_values).map_err(|e| {
                        EngineError::ActionApplication {
                            action: binding.action_code.clone(),
                            line: condition.clone(),
                            reason: format!("trigger condition failed: {}", e),
                        }
                    })?;
                    if holds {
                        fired.insert(binding.action_code.clone());
                    } else if !binding.sticky {
                        fired.remove(&binding.action_code);
                    }
                    holds
                }
            }
        };
        if is_active {
            active.push(binding);
        }
    }
    Ok(active)
}

fn evaluate_condition(condition: &str, prior_values: &ValueMap) -> EngineResult<bool> {
    let expr = parse_formula(condition)?;
    let mut chain = ProviderChain::new();
    chain.push(Rc::new(PriorValuesProvider::new(prior_values.clone())));
    let mut evaluator = Evaluator::new(chain);
    Ok(evaluator.eval_condition(&expr)?)
}

/// Clones and transforms templates, caching compiled clones.
#[derive(Default)]
pub struct ActionEngine {
    cache: DashMap<String, Arc<CompiledTemplate>>,
}

impl ActionEngine {
    /// An engine with an empty clone cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Deterministic code for the clone a (scenario, period, active set)
    /// produces from a base template.
    #[must_use]
    pub fn derived_code(
        base: &str,
        scenario: &ScenarioId,
        period: Period,
        active: &[&ScenarioActionBinding],
    ) -> String {
        let mut codes: Vec<&str> = active.iter().map(|b| b.action_code.as_str()).collect();
        codes.sort_unstable();
        format!("{}__S{}_P{}__{}", base, scenario, period.index(), codes.join("+"))
    }

    /// The compiled template to use for a period.
    ///
    /// With no active actions this is the base itself; otherwise a cached
    /// or freshly built clone with every active binding's transformations
    /// applied, bindings in listed order, transformations in listed order
    /// within each binding.
    pub fn template_for_period(
        &self,
        base: &Arc<CompiledTemplate>,
        scenario: &ScenarioId,
        period: Period,
        active: &[&ScenarioActionBinding],
    ) -> EngineResult<Arc<CompiledTemplate>> {
        if active.is_empty() {
            return Ok(base.clone());
        }

        let code = Self::derived_code(&base.template.code, scenario, period, active);
        if let Some(cached) = self.cache.get(&code) {
            return Ok(cached.clone());
        }

        debug!(template = %code, "building derived template");
        let mut clone = base.template.clone_as(code.as_str());
        for binding in active {
            apply_transformations(&mut clone, &binding.action_code, &binding.transformations)?;
        }
        let compiled = CompiledTemplate::compile(clone)?;
        self.cache.insert(code, compiled.clone());
        Ok(compiled)
    }

    /// Number of cached derived templates.
    #[must_use]
    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }
}

/// Apply one action's transformations to a template, in order. Each
/// transformation operates on the result of the previous one.
pub fn apply_transformations(
    template: &mut StatementTemplate,
    action_code: &str,
    transformations: &[Transformation],
) -> EngineResult<()> {
    for transformation in transformations {
        apply_one(template, action_code, transformation)?;
    }
    Ok(())
}

fn apply_one(
    template: &mut StatementTemplate,
    action_code: &str,
    transformation: &Transformation,
) -> EngineResult<()> {
    let line = transformation.target().to_string();
    let action_error = |reason: String| EngineError::ActionApplication {
        action: action_code.to_string(),
        line: line.clone(),
        reason,
    };

    let item = template
        .get(&line)
        .map_err(|_| action_error("target line does not exist".to_string()))?
        .clone();

    match transformation {
        Transformation::FormulaOverride { formula, .. } => {
            template.set_formula(&line, formula.clone())?;
        }
        Transformation::CarbonFormulaOverride { formula, .. } => {
            if item.section != Section::Carbon {
                return Err(action_error(format!(
                    "carbon override targets {} line",
                    item.section
                )));
            }
            template.set_formula(&line, formula.clone())?;
        }
        Transformation::Multiply { factor, .. } => {
            let existing = wrappable_formula(template, &line, &item, action_code)?;
            template.set_formula(&line, format!("({}) * {}", existing, factor))?;
        }
        Transformation::Add { amount, .. } => {
            let existing = wrappable_formula(template, &line, &item, action_code)?;
            template.set_formula(&line, format!("({}) + {}", existing, amount))?;
        }
    }
    Ok(())
}

/// The formula a wrap operates on. A line with a formula wraps it
/// directly. A driver-backed line is first rewritten to a pass-through
/// formula referencing a shadow input line that keeps the original driver
/// source, so per-period driver lookup and unit conversion survive the
/// wrap.
fn wrappable_formula(
    template: &mut StatementTemplate,
    line: &str,
    item: &LineItem,
    action_code: &str,
) -> EngineResult<String> {
    let action_error = |reason: String| EngineError::ActionApplication {
        action: action_code.to_string(),
        line: line.to_string(),
        reason,
    };
    if let Some(formula) = &item.formula {
        return Ok(formula.clone());
    }
    let Some(source) = item.base_value_source.clone() else {
        return Err(action_error(
            "target line carries neither formula nor driver source".to_string(),
        ));
    };

    let input_code = format!("{}__INPUT", line);
    if template.contains(&input_code) {
        let existing = template.get(&input_code)?;
        if existing.base_value_source.is_none() {
            return Err(action_error(format!(
                "shadow input {} already exists with a different shape",
                input_code
            )));
        }
    } else {
        let mut input = LineItem::new(
            input_code.clone(),
            format!("{} (driver input)", item.name),
            item.section,
        );
        input.base_value_source = Some(source);
        input.unit = item.unit.clone();
        template.insert(input)?;
    }
    Ok(input_code)
}
