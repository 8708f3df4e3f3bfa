//! The unified per-period calculation engine.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;

use tracing::{debug, info};

use strata_core::types::{
    EntityId, Period, PeriodResult, ScenarioId, Severity, StatementTemplate, ValidationIssue,
};
use strata_core::units::UnitConverter;
use strata_formula::{
    parse_formula, Evaluator, Expr, FormulaError, ProviderChain, TaxStrategyRegistry,
    ValueProvider,
};

use crate::error::{EngineError, EngineResult};
use crate::graph::calculation_order;
use crate::providers::{
    CrossStatementProvider, DriverValueProvider, FxValueProvider, InMemoryProvider,
    TimeSeriesProvider,
};
use crate::state::RunHistory;
use crate::validation::run_rules;

/// A template with its formulas parsed and its calculation order built.
///
/// Compilation happens once per template (base or derived clone); every
/// period then reuses the parsed expressions and the order.
#[derive(Debug)]
pub struct CompiledTemplate {
    /// The template itself, with its cached order attached.
    pub template: StatementTemplate,
    /// Parsed formula per computed line.
    pub formulas: BTreeMap<String, Expr>,
    /// Topological calculation order over all line items.
    pub order: Vec<String>,
}

impl CompiledTemplate {
    /// Parse every formula and build the calculation order.
    pub fn compile(mut template: StatementTemplate) -> EngineResult<Arc<Self>> {
        let mut formulas = BTreeMap::new();
        for item in template.items() {
            if let Some(formula) = &item.formula {
                let expr = parse_formula(formula).map_err(|e| {
                    EngineError::from(e).with_line_context(
                        template.code.clone(),
                        item.code.clone(),
                        0,
                        Vec::new(),
                    )
                })?;
                formulas.insert(item.code.clone(), expr);
            }
        }
        let order = calculation_order(&template, &formulas)?;
        template.set_cached_order(order.clone());
        Ok(Arc::new(Self {
            template,
            formulas,
            order,
        }))
    }
}

/// Identifies what one engine invocation computes.
#[derive(Debug, Clone)]
pub struct PeriodContext {
    /// Entity being calculated.
    pub entity: EntityId,
    /// Scenario label the result is filed under.
    pub scenario: ScenarioId,
    /// Scenario whose drivers feed the calculation (differs from
    /// `scenario` for generated configurations).
    pub driver_scenario: ScenarioId,
    /// Period being calculated.
    pub period: Period,
}

/// Computes one period of one scenario against one compiled template.
#[derive(Clone)]
pub struct UnifiedEngine {
    converter: UnitConverter,
    drivers: Arc<strata_core::types::DriverSet>,
    tax: TaxStrategyRegistry,
}

impl UnifiedEngine {
    /// Engine over frozen driver and unit snapshots.
    #[must_use]
    pub fn new(converter: UnitConverter, drivers: Arc<strata_core::types::DriverSet>) -> Self {
        Self {
            converter,
            drivers,
            tax: TaxStrategyRegistry::with_defaults(),
        }
    }

    /// Replace the tax strategy registry.
    #[must_use]
    pub fn with_tax_strategies(mut self, tax: TaxStrategyRegistry) -> Self {
        self.tax = tax;
        self
    }

    /// Calculate one period.
    ///
    /// Walks the calculation order, evaluating formulas and resolving
    /// driver-sourced lines, then runs the template's validation rules.
    /// Any evaluation failure or error-severity validation failure is
    /// fatal for the period: no partial result is returned.
    pub fn calculate_period(
        &self,
        ctx: &PeriodContext,
        compiled: &CompiledTemplate,
        history: &Rc<RefCell<RunHistory>>,
    ) -> EngineResult<PeriodResult> {
        let template = &compiled.template;
        info!(
            entity = %ctx.entity,
            scenario = %ctx.scenario,
            period = %ctx.period,
            template = %template.code,
            "calculating period"
        );

        let memory = Rc::new(InMemoryProvider::new());
        let time_series = Rc::new(TimeSeriesProvider::new(history.clone(), ctx.period));
        let driver = Rc::new(DriverValueProvider::for_template(
            template,
            ctx.entity.clone(),
            ctx.driver_scenario.clone(),
            ctx.period,
            self.drivers.clone(),
            self.converter.clone(),
        ));

        let mut chain = ProviderChain::new();
        chain.push(memory.clone());
        chain.push(time_series.clone());
        chain.push(Rc::new(CrossStatementProvider::new(memory.clone())));
        chain.push(driver.clone());
        chain.push(Rc::new(FxValueProvider::new(
            self.converter.clone(),
            ctx.period,
        )));

        let mut evaluator = Evaluator::with_tax_strategies(chain, self.tax.clone());

        for (position, code) in compiled.order.iter().enumerate() {
            let value = if let Some(expr) = compiled.formulas.get(code) {
                evaluator.eval(expr)
            } else if driver.maps(code) {
                driver.value(&strata_formula::RefExpr::bare(code.clone()))
            } else {
                // Carries no value (header or spacer line).
                continue;
            };

            match value {
                Ok(value) => {
                    debug!(line = %code, value, "line computed");
                    memory.insert(code, value);
                }
                Err(e) => {
                    return Err(self.line_error(e, ctx).with_line_context(
                        template.code.clone(),
                        code.clone(),
                        position,
                        evaluator.trace(),
                    ));
                }
            }
        }

        let values = memory.snapshot();
        let mut report = run_rules(compiled, &values, &history.borrow(), ctx.period);
        for line in time_series.defaulted_reads() {
            report.push(ValidationIssue {
                rule_code: "OPENING_DEFAULT".to_string(),
                line,
                severity: Severity::Warning,
                message: "no opening value; boundary read defaulted to 0".to_string(),
            });
        }

        if report.has_errors() {
            let issue = report
                .issues
                .iter()
                .find(|issue| issue.severity == Severity::Error)
                .cloned()
                .unwrap_or_else(|| ValidationIssue {
                    rule_code: "UNKNOWN".to_string(),
                    line: String::new(),
                    severity: Severity::Error,
                    message: "validation failed".to_string(),
                });
            return Err(EngineError::Validation {
                rule: issue.rule_code,
                line: issue.line,
                detail: issue.message,
            });
        }

        Ok(PeriodResult {
            entity: ctx.entity.clone(),
            scenario: ctx.scenario.clone(),
            period: ctx.period,
            template_code: template.code.clone(),
            values,
            report,
        })
    }

    /// Promote provider failures to their typed engine forms.
    fn line_error(&self, error: FormulaError, ctx: &PeriodContext) -> EngineError {
        match error {
            FormulaError::MissingDriver { code, .. } => EngineError::MissingDriver {
                entity: ctx.entity.clone(),
                scenario: ctx.driver_scenario.clone(),
                period: ctx.period,
                code,
            },
            other => EngineError::Formula(other),
        }
    }
}
