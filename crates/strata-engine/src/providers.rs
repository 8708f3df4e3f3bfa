//! Concrete value providers installed by the engine.
//!
//! Chain order is fixed: in-memory, time-series, cross-statement, driver,
//! FX. The first provider that owns a reference wins; a reference nobody
//! owns fails evaluation with `UnknownReference`.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;
use std::sync::Arc;

use strata_core::types::{DriverSet, EntityId, Period, ScenarioId, Section, StatementTemplate};
use strata_core::units::UnitConverter;
use strata_formula::{FormulaError, FormulaResult, RefExpr, ValueProvider};

use crate::state::{RunHistory, ValueMap};

// =============================================================================
// IN-MEMORY PROVIDER
// =============================================================================

/// Values computed so far in the current period, keyed by bare line code.
#[derive(Default)]
pub struct InMemoryProvider {
    values: RefCell<ValueMap>,
}

impl InMemoryProvider {
    /// An empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a computed value.
    pub fn insert(&self, code: &str, value: f64) {
        self.values.borrow_mut().insert(code.to_string(), value);
    }

    /// Read a stored value.
    #[must_use]
    pub fn get(&self, code: &str) -> Option<f64> {
        self.values.borrow().get(code).copied()
    }

    /// Copy of all stored values.
    #[must_use]
    pub fn snapshot(&self) -> ValueMap {
        self.values.borrow().clone()
    }
}

impl ValueProvider for InMemoryProvider {
    fn owns(&self, reference: &RefExpr) -> bool {
        reference.is_current()
            && reference.namespace.is_none()
            && self.values.borrow().contains_key(&reference.name)
    }

    fn value(&self, reference: &RefExpr) -> FormulaResult<f64> {
        self.values
            .borrow()
            .get(&reference.name)
            .copied()
            .ok_or_else(|| FormulaError::UnknownReference(reference.to_string()))
    }
}

// =============================================================================
// TIME-SERIES PROVIDER
// =============================================================================

/// Resolves time-shifted references from prior periods or the opening
/// state. Future shifts fail: the engine never computes ahead of the
/// current period.
pub struct TimeSeriesProvider {
    history: Rc<RefCell<RunHistory>>,
    period: Period,
    defaulted: RefCell<BTreeSet<String>>,
}

impl TimeSeriesProvider {
    /// Provider for the given period over the shared run history.
    #[must_use]
    pub fn new(history: Rc<RefCell<RunHistory>>, period: Period) -> Self {
        Self {
            history,
            period,
            defaulted: RefCell::new(BTreeSet::new()),
        }
    }

    /// Line codes whose boundary reads fell back to the 0 convention
    /// because the opening state had no value for them.
    #[must_use]
    pub fn defaulted_reads(&self) -> Vec<String> {
        self.defaulted.borrow().iter().cloned().collect()
    }
}

impl ValueProvider for TimeSeriesProvider {
    fn owns(&self, reference: &RefExpr) -> bool {
        reference.shift != 0
    }

    fn value(&self, reference: &RefExpr) -> FormulaResult<f64> {
        if reference.shift > 0 {
            return Err(FormulaError::MissingDependency(reference.to_string()));
        }
        let target = self.period.offset(reference.shift);
        match self.history.borrow().lookup(&reference.name, target) {
            Some(value) => Ok(value),
            None => {
                self.defaulted.borrow_mut().insert(reference.name.clone());
                Ok(0.0)
            }
        }
    }
}

// =============================================================================
// CROSS-STATEMENT PROVIDER
// =============================================================================

/// Resolves namespaced current-period references (`pl:X`, `bs:X`, …) from
/// the same in-memory map the bare codes live in.
pub struct CrossStatementProvider {
    memory: Rc<InMemoryProvider>,
}

impl CrossStatementProvider {
    /// Provider over the period's in-memory values.
    #[must_use]
    pub fn new(memory: Rc<InMemoryProvider>) -> Self {
        Self { memory }
    }
}

impl ValueProvider for CrossStatementProvider {
    fn owns(&self, reference: &RefExpr) -> bool {
        reference.is_current()
            && reference
                .namespace
                .as_deref()
                .is_some_and(|ns| Section::from_prefix(ns).is_some())
    }

    fn value(&self, reference: &RefExpr) -> FormulaResult<f64> {
        self.memory
            .get(&reference.name)
            .ok_or_else(|| FormulaError::UnknownReference(reference.to_string()))
    }
}

// =============================================================================
// DRIVER PROVIDER
// =============================================================================

/// How one line maps to its driver.
#[derive(Debug, Clone)]
struct DriverMapping {
    driver_code: String,
    /// Unit override from `driver:CODE@UNIT`, if declared.
    source_unit: Option<String>,
    line_unit: Option<String>,
}

/// Resolves line codes the template maps to drivers, converting units.
///
/// The template mapping table is the single source of truth: a line whose
/// formula is set never resolves here, even if a driver with the same
/// code exists.
pub struct DriverValueProvider {
    entity: EntityId,
    scenario: ScenarioId,
    period: Period,
    mapping: BTreeMap<String, DriverMapping>,
    drivers: Arc<DriverSet>,
    converter: UnitConverter,
}

impl DriverValueProvider {
    /// Build the mapping table for a template.
    #[must_use]
    pub fn for_template(
        template: &StatementTemplate,
        entity: EntityId,
        scenario: ScenarioId,
        period: Period,
        drivers: Arc<DriverSet>,
        converter: UnitConverter,
    ) -> Self {
        let mut mapping = BTreeMap::new();
        for item in template.items() {
            if let Some(source) = item.effective_driver() {
                mapping.insert(
                    item.code.clone(),
                    DriverMapping {
                        driver_code: source.code.clone(),
                        source_unit: source.unit.clone(),
                        line_unit: item.unit.clone(),
                    },
                );
            }
        }
        Self {
            entity,
            scenario,
            period,
            mapping,
            drivers,
            converter,
        }
    }

    /// Whether the template maps this line to a driver.
    #[must_use]
    pub fn maps(&self, code: &str) -> bool {
        self.mapping.contains_key(code)
    }
}

impl ValueProvider for DriverValueProvider {
    fn owns(&self, reference: &RefExpr) -> bool {
        reference.is_current()
            && reference.namespace.is_none()
            && self.mapping.contains_key(&reference.name)
    }

    fn value(&self, reference: &RefExpr) -> FormulaResult<f64> {
        let mapping = self
            .mapping
            .get(&reference.name)
            .ok_or_else(|| FormulaError::UnknownReference(reference.to_string()))?;

        let record = self
            .drivers
            .get(&self.entity, &self.scenario, self.period, &mapping.driver_code)
            .ok_or_else(|| FormulaError::MissingDriver {
                entity: self.entity.as_str().to_string(),
                scenario: self.scenario.as_str().to_string(),
                period: self.period.index(),
                code: mapping.driver_code.clone(),
            })?;

        // Convert from the record's declared unit into the line's unit
        // (or the explicit @UNIT override when the line declares none).
        let target_unit = mapping
            .line_unit
            .as_deref()
            .or(mapping.source_unit.as_deref())
            .unwrap_or(&record.unit);
        self.converter
            .convert(record.value, &record.unit, target_unit, Some(self.period))
            .map_err(|e| match e {
                strata_core::error::CoreError::MissingFxRate {
                    from,
                    to,
                    rate_type,
                    period,
                } => FormulaError::MissingFxRate {
                    from,
                    to,
                    rate_type: rate_type.to_string(),
                    period: period.index(),
                },
                other => FormulaError::UnitConversion(other.to_string()),
            })
    }
}

// =============================================================================
// FX PROVIDER
// =============================================================================

/// Resolves `FX_<FROM>_<TO>[_<TYPE>]` references for the current period,
/// caching per key.
pub struct FxValueProvider {
    converter: UnitConverter,
    period: Period,
    cache: RefCell<BTreeMap<String, f64>>,
}

impl FxValueProvider {
    /// Provider for the given period.
    #[must_use]
    pub fn new(converter: UnitConverter, period: Period) -> Self {
        Self {
            converter,
            period,
            cache: RefCell::new(BTreeMap::new()),
        }
    }

    fn parse_key(name: &str) -> Option<(String, String, strata_core::units::FxRateType)> {
        let parts: Vec<&str> = name.split('_').collect();
        match parts.as_slice() {
            ["FX", from, to] => Some((
                (*from).to_string(),
                (*to).to_string(),
                strata_core::units::FxRateType::Average,
            )),
            ["FX", from, to, suffix] => suffix
                .parse()
                .ok()
                .map(|rate_type| ((*from).to_string(), (*to).to_string(), rate_type)),
            _ => None,
        }
    }
}

impl ValueProvider for FxValueProvider {
    fn owns(&self, reference: &RefExpr) -> bool {
        reference.is_current()
            && reference.namespace.is_none()
            && Self::parse_key(&reference.name).is_some()
    }

    fn value(&self, reference: &RefExpr) -> FormulaResult<f64> {
        if let Some(rate) = self.cache.borrow().get(&reference.name) {
            return Ok(*rate);
        }
        let (from, to, rate_type) = Self::parse_key(&reference.name)
            .ok_or_else(|| FormulaError::UnknownReference(reference.to_string()))?;
        let rate = self
            .converter
            .fx_rate(&from, &to, rate_type, self.period)
            .map_err(|_| FormulaError::MissingFxRate {
                from: from.clone(),
                to: to.clone(),
                rate_type: rate_type.to_string(),
                period: self.period.index(),
            })?;
        self.cache
            .borrow_mut()
            .insert(reference.name.clone(), rate);
        Ok(rate)
    }
}

// =============================================================================
// PRIOR-VALUES PROVIDER
// =============================================================================

/// Resolves conditional-trigger references against the previous period's
/// values. Missing names follow the same 0 convention as boundary reads,
/// so a trigger can reference a line before it first carries a value.
pub struct PriorValuesProvider {
    values: ValueMap,
}

impl PriorValuesProvider {
    /// Provider over a snapshot of prior values.
    #[must_use]
    pub fn new(values: ValueMap) -> Self {
        Self { values }
    }
}

impl ValueProvider for PriorValuesProvider {
    fn owns(&self, reference: &RefExpr) -> bool {
        reference.is_current()
    }

    fn value(&self, reference: &RefExpr) -> FormulaResult<f64> {
        Ok(self.values.get(&reference.name).copied().unwrap_or(0.0))
    }
}
