//! Formula evaluation over a provider chain.

use crate::ast::{BinaryOp, CompareOp, Expr, LogicalOp, UnaryOp};
use crate::error::{FormulaError, FormulaResult};
use crate::functions::{TaxStrategyRegistry, DEFAULT_TAX_STRATEGIES};
use crate::provider::ProviderChain;

/// How many resolved identifiers the trace remembers.
pub const TRACE_CAPACITY: usize = 16;

/// Ring buffer of the most recently resolved identifiers.
///
/// Attached to engine errors as debug context: when a formula fails, the
/// trace shows what the evaluator touched on the way there.
#[derive(Debug, Clone, Default)]
pub struct TraceRing {
    entries: Vec<String>,
    next: usize,
}

impl TraceRing {
    /// An empty trace.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a resolved identifier.
    pub fn record(&mut self, name: String) {
        if self.entries.len() < TRACE_CAPACITY {
            self.entries.push(name);
        } else {
            self.entries[self.next] = name;
        }
        self.next = (self.next + 1) % TRACE_CAPACITY;
    }

    /// The recorded identifiers, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<String> {
        if self.entries.len() < TRACE_CAPACITY {
            self.entries.clone()
        } else {
            let mut out = Vec::with_capacity(TRACE_CAPACITY);
            out.extend_from_slice(&self.entries[self.next..]);
            out.extend_from_slice(&self.entries[..self.next]);
            out
        }
    }
}

/// Evaluates parsed formulas against a provider chain.
pub struct Evaluator {
    chain: ProviderChain,
    tax: TaxStrategyRegistry,
    trace: TraceRing,
}

impl Evaluator {
    /// Create an evaluator with the default tax strategies.
    #[must_use]
    pub fn new(chain: ProviderChain) -> Self {
        Self {
            chain,
            tax: DEFAULT_TAX_STRATEGIES.clone(),
            trace: TraceRing::new(),
        }
    }

    /// Create an evaluator with a custom tax strategy registry.
    #[must_use]
    pub fn with_tax_strategies(chain: ProviderChain, tax: TaxStrategyRegistry) -> Self {
        Self {
            chain,
            tax,
            trace: TraceRing::new(),
        }
    }

    /// Evaluate an expression to a number.
    pub fn eval(&mut self, expr: &Expr) -> FormulaResult<f64> {
        match expr {
            Expr::Number(value) => Ok(*value),
            Expr::Str(_) => Err(FormulaError::parse(
                0,
                "string literal in arithmetic context",
            )),
            Expr::Ref(reference) => {
                self.trace.record(reference.to_string());
                self.chain.resolve(reference)
            }
            Expr::Unary {
                op: UnaryOp::Neg,
                expr,
            } => Ok(-self.eval(expr)?),
            Expr::Binary { op, lhs, rhs } => {
                let left = self.eval(lhs)?;
                let right = self.eval(rhs)?;
                match op {
                    BinaryOp::Add => Ok(left + right),
                    BinaryOp::Sub => Ok(left - right),
                    BinaryOp::Mul => Ok(left * right),
                    BinaryOp::Div => {
                        if right == 0.0 {
                            Err(FormulaError::DivisionByZero)
                        } else {
                            Ok(left / right)
                        }
                    }
                    BinaryOp::Pow => Ok(left.powf(right)),
                }
            }
            Expr::Compare { op, lhs, rhs } => {
                let left = self.eval(lhs)?;
                let right = self.eval(rhs)?;
                let holds = match op {
                    CompareOp::Lt => left < right,
                    CompareOp::Le => left <= right,
                    CompareOp::Eq => left == right,
                    CompareOp::Ne => left != right,
                    CompareOp::Ge => left >= right,
                    CompareOp::Gt => left > right,
                };
                Ok(if holds { 1.0 } else { 0.0 })
            }
            Expr::Logical { op, lhs, rhs } => {
                let left = self.eval(lhs)? != 0.0;
                let value = match op {
                    LogicalOp::And => left && self.eval(rhs)? != 0.0,
                    LogicalOp::Or => left || self.eval(rhs)? != 0.0,
                };
                Ok(if value { 1.0 } else { 0.0 })
            }
            Expr::Call { function, args } => self.call(function, args),
        }
    }

    /// Evaluate an expression as a condition: nonzero is true.
    pub fn eval_condition(&mut self, expr: &Expr) -> FormulaResult<bool> {
        Ok(self.eval(expr)? != 0.0)
    }

    /// The most recently resolved identifiers, oldest first.
    #[must_use]
    pub fn trace(&self) -> Vec<String> {
        self.trace.snapshot()
    }

    fn call(&mut self, function: &str, args: &[Expr]) -> FormulaResult<f64> {
        match function {
            "SUM" => {
                let mut total = 0.0;
                for arg in args {
                    total += self.eval(arg)?;
                }
                Ok(total)
            }
            "AVG" => {
                let mut total = 0.0;
                for arg in args {
                    total += self.eval(arg)?;
                }
                Ok(total / args.len() as f64)
            }
            "MIN" => {
                let mut best = f64::INFINITY;
                for arg in args {
                    best = best.min(self.eval(arg)?);
                }
                Ok(best)
            }
            "MAX" => {
                let mut best = f64::NEG_INFINITY;
                for arg in args {
                    best = best.max(self.eval(arg)?);
                }
                Ok(best)
            }
            "ABS" => Ok(self.eval(&args[0])?.abs()),
            // Only the taken branch is evaluated.
            "IF" => {
                if self.eval_condition(&args[0])? {
                    self.eval(&args[1])
                } else {
                    self.eval(&args[2])
                }
            }
            "TAX_COMPUTE" => {
                let base = self.eval(&args[0])?;
                let Expr::Str(strategy) = &args[1] else {
                    return Err(FormulaError::parse(
                        0,
                        "TAX_COMPUTE strategy must be a string literal",
                    ));
                };
                let mut extra = Vec::with_capacity(args.len().saturating_sub(2));
                for arg in &args[2..] {
                    extra.push(self.eval(arg)?);
                }
                self.tax.compute(strategy, base, &extra)
            }
            other => Err(FormulaError::UnknownReference(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::RefExpr;
    use crate::parser::parse_formula;
    use crate::provider::ValueProvider;
    use approx::assert_relative_eq;
    use std::collections::BTreeMap;
    use std::rc::Rc;

    struct MapProvider {
        values: BTreeMap<String, f64>,
    }

    impl ValueProvider for MapProvider {
        fn owns(&self, reference: &RefExpr) -> bool {
            reference.is_current() && self.values.contains_key(&reference.name)
        }

        fn value(&self, reference: &RefExpr) -> FormulaResult<f64> {
            Ok(self.values[&reference.name])
        }
    }

    fn evaluator(values: &[(&str, f64)]) -> Evaluator {
        let mut map = BTreeMap::new();
        for (name, value) in values {
            map.insert((*name).to_string(), *value);
        }
        let mut chain = ProviderChain::new();
        chain.push(Rc::new(MapProvider { values: map }));
        Evaluator::new(chain)
    }

    fn eval(source: &str, values: &[(&str, f64)]) -> FormulaResult<f64> {
        let expr = parse_formula(source).unwrap();
        evaluator(values).eval(&expr)
    }

    #[test]
    fn test_arithmetic() {
        assert_relative_eq!(eval("1 + 2 * 3", &[]).unwrap(), 7.0);
        assert_relative_eq!(eval("(1 + 2) * 3", &[]).unwrap(), 9.0);
        assert_relative_eq!(eval("2 ^ 3 ^ 2", &[]).unwrap(), 512.0);
        assert_relative_eq!(eval("-2 ^ 2", &[]).unwrap(), 4.0);
        assert_relative_eq!(eval("10 / 4", &[]).unwrap(), 2.5);
    }

    #[test]
    fn test_references() {
        let values = [("REVENUE", 100_000.0), ("EXPENSES", -60_000.0)];
        assert_relative_eq!(eval("REVENUE + EXPENSES", &values).unwrap(), 40_000.0);
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(eval("1 / 0", &[]).unwrap_err(), FormulaError::DivisionByZero);
    }

    #[test]
    fn test_unknown_reference() {
        assert!(matches!(
            eval("MISSING + 1", &[]).unwrap_err(),
            FormulaError::UnknownReference(_)
        ));
    }

    #[test]
    fn test_builtins() {
        assert_relative_eq!(eval("SUM(1, 2, 3)", &[]).unwrap(), 6.0);
        assert_relative_eq!(eval("AVG(2, 4, 6)", &[]).unwrap(), 4.0);
        assert_relative_eq!(eval("MIN(3, 1, 2)", &[]).unwrap(), 1.0);
        assert_relative_eq!(eval("MAX(3, 1, 2)", &[]).unwrap(), 3.0);
        assert_relative_eq!(eval("ABS(-5)", &[]).unwrap(), 5.0);
    }

    #[test]
    fn test_if_takes_one_branch() {
        // The untaken branch would divide by zero.
        assert_relative_eq!(eval("IF(1 > 0, 42, 1 / 0)", &[]).unwrap(), 42.0);
        assert!(eval("IF(1 < 0, 42, 1 / 0)", &[]).is_err());
    }

    #[test]
    fn test_comparisons_in_arithmetic() {
        assert_relative_eq!(eval("(2 > 1) + (1 > 2)", &[]).unwrap(), 1.0);
    }

    #[test]
    fn test_logical_short_circuit() {
        assert_relative_eq!(eval("1 > 2 AND 1 / 0 > 0", &[]).unwrap(), 0.0);
        assert_relative_eq!(eval("2 > 1 OR 1 / 0 > 0", &[]).unwrap(), 1.0);
    }

    #[test]
    fn test_tax_compute() {
        let values = [("PRETAX_INCOME", 80_000.0)];
        assert_relative_eq!(
            eval("TAX_COMPUTE(PRETAX_INCOME, 'flat_rate', 0.25)", &values).unwrap(),
            20_000.0
        );
    }

    #[test]
    fn test_trace_records_resolutions() {
        let expr = parse_formula("A + B").unwrap();
        let mut evaluator = evaluator(&[("A", 1.0), ("B", 2.0)]);
        evaluator.eval(&expr).unwrap();
        assert_eq!(evaluator.trace(), vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn test_trace_ring_wraps() {
        let mut ring = TraceRing::new();
        for i in 0..20 {
            ring.record(format!("ID{}", i));
        }
        let snapshot = ring.snapshot();
        assert_eq!(snapshot.len(), TRACE_CAPACITY);
        assert_eq!(snapshot.first().map(String::as_str), Some("ID4"));
        assert_eq!(snapshot.last().map(String::as_str), Some("ID19"));
    }
}
