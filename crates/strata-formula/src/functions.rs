//! Built-in functions and the tax strategy registry.

use std::collections::BTreeMap;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::ast::Expr;
use crate::error::{FormulaError, FormulaResult};

/// Names of all built-in functions.
pub const BUILTIN_FUNCTIONS: &[&str] = &["SUM", "AVG", "MIN", "MAX", "ABS", "IF", "TAX_COMPUTE"];

/// Validate a call's name, arity, and string-literal placement at parse
/// time. String literals are only legal as the strategy argument of
/// `TAX_COMPUTE`.
pub fn check_call(function: &str, args: &[Expr], position: usize) -> FormulaResult<()> {
    let arity_error = |expected: &str| {
        FormulaError::parse(
            position,
            format!("{} expects {}, got {} argument(s)", function, expected, args.len()),
        )
    };

    match function {
        "SUM" | "AVG" | "MIN" | "MAX" => {
            if args.is_empty() {
                return Err(arity_error("at least 1 argument"));
            }
            reject_strings(function, args, position)
        }
        "ABS" => {
            if args.len() != 1 {
                return Err(arity_error("exactly 1 argument"));
            }
            reject_strings(function, args, position)
        }
        "IF" => {
            if args.len() != 3 {
                return Err(arity_error("exactly 3 arguments"));
            }
            reject_strings(function, args, position)
        }
        "TAX_COMPUTE" => {
            if args.len() < 2 {
                return Err(arity_error("at least 2 arguments"));
            }
            if !matches!(args[1], Expr::Str(_)) {
                return Err(FormulaError::parse(
                    position,
                    "TAX_COMPUTE expects a strategy name string as its second argument",
                ));
            }
            for (index, arg) in args.iter().enumerate() {
                if index != 1 && matches!(arg, Expr::Str(_)) {
                    return Err(FormulaError::parse(
                        position,
                        "TAX_COMPUTE accepts a string only as its second argument",
                    ));
                }
            }
            Ok(())
        }
        _ => Err(FormulaError::parse(
            position,
            format!("unknown function '{}'", function),
        )),
    }
}

fn reject_strings(function: &str, args: &[Expr], position: usize) -> FormulaResult<()> {
    if args.iter().any(|arg| matches!(arg, Expr::Str(_))) {
        return Err(FormulaError::parse(
            position,
            format!("{} does not accept string arguments", function),
        ));
    }
    Ok(())
}

/// A pluggable tax computation dispatched through `TAX_COMPUTE`.
pub trait TaxStrategy: Send + Sync {
    /// Strategy name as referenced from formulas.
    fn name(&self) -> &str;

    /// Compute the tax amount for `base` with the strategy's extra
    /// numeric arguments.
    fn compute(&self, base: f64, extra: &[f64]) -> FormulaResult<f64>;
}

/// Flat-rate tax: `base * rate`.
struct FlatRate;

impl TaxStrategy for FlatRate {
    fn name(&self) -> &str {
        "flat_rate"
    }

    fn compute(&self, base: f64, extra: &[f64]) -> FormulaResult<f64> {
        let rate = extra.first().copied().unwrap_or(0.0);
        Ok(base * rate)
    }
}

/// Flat rate above a tax-free allowance: `max(base - allowance, 0) * rate`.
struct Allowance;

impl TaxStrategy for Allowance {
    fn name(&self) -> &str {
        "allowance"
    }

    fn compute(&self, base: f64, extra: &[f64]) -> FormulaResult<f64> {
        let rate = extra.first().copied().unwrap_or(0.0);
        let allowance = extra.get(1).copied().unwrap_or(0.0);
        Ok((base - allowance).max(0.0) * rate)
    }
}

/// Registry of tax strategies consulted by `TAX_COMPUTE`.
#[derive(Clone, Default)]
pub struct TaxStrategyRegistry {
    strategies: BTreeMap<String, Arc<dyn TaxStrategy>>,
}

impl TaxStrategyRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry with the built-in strategies (`flat_rate`,
    /// `allowance`) pre-registered.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(FlatRate));
        registry.register(Arc::new(Allowance));
        registry
    }

    /// Register a strategy under its own name.
    pub fn register(&mut self, strategy: Arc<dyn TaxStrategy>) {
        self.strategies.insert(strategy.name().to_string(), strategy);
    }

    /// Dispatch a computation to the named strategy.
    pub fn compute(&self, name: &str, base: f64, extra: &[f64]) -> FormulaResult<f64> {
        let strategy = self
            .strategies
            .get(name)
            .ok_or_else(|| FormulaError::UnknownTaxStrategy(name.to_string()))?;
        strategy.compute(base, extra)
    }
}

impl std::fmt::Debug for TaxStrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaxStrategyRegistry")
            .field("strategies", &self.strategies.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Shared default registry used when an evaluator is built without one.
pub static DEFAULT_TAX_STRATEGIES: Lazy<TaxStrategyRegistry> =
    Lazy::new(TaxStrategyRegistry::with_defaults);
