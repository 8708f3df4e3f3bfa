//! Validation rule evaluation.
//!
//! Runs after a period has been computed. Declared rules come from the
//! template; on top of those, every subtotal line whose formula is a pure
//! additive expression is re-checked against its stored components.

use std::rc::Rc;

use strata_core::types::{
    Period, RuleKind, Severity, SignConvention, ValidationIssue, ValidationReport,
    BALANCE_TOLERANCE,
};
use strata_formula::{Evaluator, Expr, ProviderChain};

use crate::engine::CompiledTemplate;
use crate::providers::PriorValuesProvider;
use crate::state::{RunHistory, ValueMap};

/// Run all checks for one computed period.
pub fn run_rules(
    compiled: &CompiledTemplate,
    values: &ValueMap,
    history: &RunHistory,
    period: Period,
) -> ValidationReport {
    let mut report = ValidationReport::clean();
    let template = &compiled.template;

    for rule in &template.validation_rules {
        match &rule.kind {
            RuleKind::BalanceIdentity {
                assets,
                liabilities,
                equity,
            } => {
                let a = value_or_zero(values, assets);
                let l = value_or_zero(values, liabilities);
                let e = value_or_zero(values, equity);
                let gap = a - l - e;
                if gap.abs() > BALANCE_TOLERANCE {
                    report.push(ValidationIssue {
                        rule_code: rule.code.clone(),
                        line: assets.clone(),
                        severity: rule.severity,
                        message: format!(
                            "{} - {} - {} = {:.4} exceeds tolerance {}",
                            assets, liabilities, equity, gap, BALANCE_TOLERANCE
                        ),
                    });
                }
            }
            RuleKind::Rollforward { line, basis } => {
                let Some(current) = values.get(line).copied() else {
                    report.push(missing_line(rule.code.clone(), line, rule.severity));
                    continue;
                };
                let prior = history.lookup(line, period.offset(-1)).unwrap_or(0.0);
                let movement = value_or_zero(values, basis);
                let gap = current - (prior + movement);
                if gap.abs() > BALANCE_TOLERANCE {
                    report.push(ValidationIssue {
                        rule_code: rule.code.clone(),
                        line: line.clone(),
                        severity: rule.severity,
                        message: format!(
                            "{} = {:.4}, expected {:.4} + {:.4} (off by {:.4})",
                            line, current, prior, movement, gap
                        ),
                    });
                }
            }
            RuleKind::SubtotalSum { line, components } => {
                let Some(current) = values.get(line).copied() else {
                    report.push(missing_line(rule.code.clone(), line, rule.severity));
                    continue;
                };
                let sum: f64 = components.iter().map(|c| value_or_zero(values, c)).sum();
                if (current - sum).abs() > BALANCE_TOLERANCE {
                    report.push(ValidationIssue {
                        rule_code: rule.code.clone(),
                        line: line.clone(),
                        severity: rule.severity,
                        message: format!(
                            "{} = {:.4} but components sum to {:.4}",
                            line, current, sum
                        ),
                    });
                }
            }
            RuleKind::SignCheck { line } => {
                let Some(current) = values.get(line).copied() else {
                    continue;
                };
                let sign = template
                    .get(line)
                    .map(|item| item.sign)
                    .unwrap_or(SignConvention::Unchecked);
                let violated = match sign {
                    SignConvention::Positive => current < 0.0,
                    SignConvention::Negative => current > 0.0,
                    SignConvention::Unchecked => false,
                };
                if violated {
                    report.push(ValidationIssue {
                        rule_code: rule.code.clone(),
                        line: line.clone(),
                        severity: rule.severity,
                        message: format!("{} = {:.4} violates declared sign convention", line, current),
                    });
                }
            }
            RuleKind::NonZero { line } => {
                if value_or_zero(values, line) == 0.0 {
                    report.push(ValidationIssue {
                        rule_code: rule.code.clone(),
                        line: line.clone(),
                        severity: rule.severity,
                        message: format!("{} is zero", line),
                    });
                }
            }
        }
    }

    subtotal_consistency(compiled, values, &mut report);
    report
}

/// Automatic check: a subtotal whose formula is a pure sum of other lines
/// must equal that sum over the stored values.
fn subtotal_consistency(compiled: &CompiledTemplate, values: &ValueMap, report: &mut ValidationReport) {
    for item in compiled.template.items() {
        if !item.is_subtotal {
            continue;
        }
        let Some(expr) = compiled.formulas.get(&item.code) else {
            continue;
        };
        if !expr.is_pure_additive() {
            continue;
        }
        let Some(stored) = values.get(&item.code).copied() else {
            continue;
        };
        let Some(recomputed) = eval_over_values(expr, values) else {
            continue;
        };
        if (stored - recomputed).abs() > BALANCE_TOLERANCE {
            report.push(ValidationIssue {
                rule_code: "SUBTOTAL_CONSISTENCY".to_string(),
                line: item.code.clone(),
                severity: Severity::Warning,
                message: format!(
                    "{} = {:.4} but its components sum to {:.4}",
                    item.code, stored, recomputed
                ),
            });
        }
    }
}

/// Evaluate an expression against a plain value map. Returns `None` when
/// the expression references anything outside the map.
fn eval_over_values(expr: &Expr, values: &ValueMap) -> Option<f64> {
    let mut chain = ProviderChain::new();
    chain.push(Rc::new(PriorValuesProvider::new(values.clone())));
    Evaluator::new(chain).eval(expr).ok()
}

fn value_or_zero(values: &ValueMap, line: &str) -> f64 {
    values.get(line).copied().unwrap_or(0.0)
}

fn missing_line(rule_code: String, line: &str, severity: Severity) -> ValidationIssue {
    ValidationIssue {
        rule_code,
        line: line.to_string(),
        severity,
        message: format!("{} has no computed value", line),
    }
}
