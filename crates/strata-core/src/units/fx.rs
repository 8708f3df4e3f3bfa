//! Per-period FX rates.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::Period;

/// Which fixing of a period an FX rate represents.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum FxRateType {
    /// Period-average rate; the default when a reference omits the type.
    #[default]
    Average,
    /// Period-closing rate.
    Closing,
    /// Period-opening rate.
    Opening,
}

impl FxRateType {
    /// Uppercase suffix form used in `FX_FROM_TO_TYPE` references.
    #[must_use]
    pub fn suffix(&self) -> &'static str {
        match self {
            FxRateType::Average => "AVERAGE",
            FxRateType::Closing => "CLOSING",
            FxRateType::Opening => "OPENING",
        }
    }
}

impl FromStr for FxRateType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AVERAGE" => Ok(FxRateType::Average),
            "CLOSING" => Ok(FxRateType::Closing),
            "OPENING" => Ok(FxRateType::Opening),
            _ => Err(()),
        }
    }
}

impl fmt::Display for FxRateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FxRateType::Average => "average",
            FxRateType::Closing => "closing",
            FxRateType::Opening => "opening",
        };
        write!(f, "{}", name)
    }
}

/// Frozen table of FX rates keyed by (from, to, rate type, period).
///
/// Lookups are exact-key; a missing rate is fatal for the requesting
/// period. The table is built during the load phase and never mutated
/// while a run is in flight.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FxTable {
    rates: BTreeMap<(String, String, FxRateType, Period), f64>,
}

impl FxTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a rate.
    pub fn insert(
        &mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        rate_type: FxRateType,
        period: Period,
        rate: f64,
    ) {
        self.rates
            .insert((from.into(), to.into(), rate_type, period), rate);
    }

    /// Look up a rate. Same-currency pairs are always 1.
    pub fn rate(
        &self,
        from: &str,
        to: &str,
        rate_type: FxRateType,
        period: Period,
    ) -> CoreResult<f64> {
        if from == to {
            return Ok(1.0);
        }
        self.rates
            .get(&(from.to_string(), to.to_string(), rate_type, period))
            .copied()
            .ok_or_else(|| CoreError::MissingFxRate {
                from: from.to_string(),
                to: to.to_string(),
                rate_type,
                period,
            })
    }

    /// Number of stored rates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rates.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rate_lookup() {
        let mut table = FxTable::new();
        table.insert("USD", "EUR", FxRateType::Average, Period(1), 0.92);

        let rate = table
            .rate("USD", "EUR", FxRateType::Average, Period(1))
            .unwrap();
        assert_relative_eq!(rate, 0.92);
    }

    #[test]
    fn test_same_currency_is_identity() {
        let table = FxTable::new();
        let rate = table
            .rate("EUR", "EUR", FxRateType::Closing, Period(4))
            .unwrap();
        assert_relative_eq!(rate, 1.0);
    }

    #[test]
    fn test_missing_rate_is_fatal() {
        let table = FxTable::new();
        let err = table
            .rate("USD", "EUR", FxRateType::Average, Period(1))
            .unwrap_err();
        assert!(matches!(err, CoreError::MissingFxRate { .. }));
    }

    #[test]
    fn test_rate_types_are_distinct() {
        let mut table = FxTable::new();
        table.insert("USD", "EUR", FxRateType::Average, Period(1), 0.92);
        table.insert("USD", "EUR", FxRateType::Closing, Period(1), 0.95);

        assert_relative_eq!(
            table
                .rate("USD", "EUR", FxRateType::Closing, Period(1))
                .unwrap(),
            0.95
        );
        assert!(table
            .rate("USD", "EUR", FxRateType::Opening, Period(1))
            .is_err());
    }
}
