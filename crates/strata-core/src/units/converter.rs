//! The unit converter shared by driver resolution and the FX provider.

use std::sync::Arc;

use crate::error::{CoreError, CoreResult};
use crate::types::Period;
use crate::units::{ConversionKind, FxRateType, FxTable, UnitRegistry};

/// Converts values between units.
///
/// Holds frozen shared snapshots of the unit registry and FX table, so the
/// converter itself is cheap to clone and safe to consult from parallel
/// scenario runs.
#[derive(Debug, Clone)]
pub struct UnitConverter {
    registry: Arc<UnitRegistry>,
    fx: Arc<FxTable>,
}

impl UnitConverter {
    /// Create a converter over frozen unit and FX snapshots.
    pub fn new(registry: Arc<UnitRegistry>, fx: Arc<FxTable>) -> Self {
        Self { registry, fx }
    }

    /// Convert `value` from `from` to `to`.
    ///
    /// - Same unit code: identity, no registry lookup.
    /// - Different categories: [`CoreError::IncompatibleUnits`].
    /// - Both static: `value * to_base(from) * from_base(to)`.
    /// - Either side time-varying: period-average FX rate; `period` is
    ///   required and a missing rate is fatal.
    pub fn convert(
        &self,
        value: f64,
        from: &str,
        to: &str,
        period: Option<Period>,
    ) -> CoreResult<f64> {
        if from == to {
            return Ok(value);
        }

        let from_def = self.registry.get(from)?;
        let to_def = self.registry.get(to)?;

        if from_def.category != to_def.category {
            return Err(CoreError::incompatible_units(from, to));
        }

        match (from_def.conversion, to_def.conversion) {
            (
                ConversionKind::Static { to_base, .. },
                ConversionKind::Static { from_base, .. },
            ) => Ok(value * to_base * from_base),
            _ => {
                let period = period.ok_or_else(|| CoreError::MissingPeriod {
                    from: from.to_string(),
                    to: to.to_string(),
                })?;
                let rate = self.fx.rate(from, to, FxRateType::Average, period)?;
                Ok(value * rate)
            }
        }
    }

    /// Direct FX rate lookup for a specific rate type.
    pub fn fx_rate(
        &self,
        from: &str,
        to: &str,
        rate_type: FxRateType,
        period: Period,
    ) -> CoreResult<f64> {
        self.fx.rate(from, to, rate_type, period)
    }

    /// The underlying unit registry.
    #[must_use]
    pub fn registry(&self) -> &UnitRegistry {
        &self.registry
    }
}
