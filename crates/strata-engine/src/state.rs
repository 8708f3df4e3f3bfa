//! Run state threaded across periods.

use std::collections::BTreeMap;

use strata_core::types::Period;

/// Line-item code to value, ordered for deterministic output.
pub type ValueMap = BTreeMap<String, f64>;

/// Accumulated values of a run: the opening state plus every completed
/// period's result map.
///
/// Time-shifted references resolve here. At the boundary, `X[t-1]` reads
/// the opening state; a line with no opening value defaults to 0 by
/// convention and the engine flags the read as a warning.
#[derive(Debug, Clone)]
pub struct RunHistory {
    first_period: Period,
    opening: ValueMap,
    by_period: BTreeMap<Period, ValueMap>,
}

impl RunHistory {
    /// Start a history at `first_period` with the supplied opening state.
    #[must_use]
    pub fn new(first_period: Period, opening: ValueMap) -> Self {
        Self {
            first_period,
            opening,
            by_period: BTreeMap::new(),
        }
    }

    /// Record a completed period's values.
    pub fn record(&mut self, period: Period, values: ValueMap) {
        self.by_period.insert(period, values);
    }

    /// Look up a line's value as of `period`.
    ///
    /// Returns `None` when the line has no recorded value there; the
    /// caller decides whether that defaults to 0 or is an error.
    #[must_use]
    pub fn lookup(&self, name: &str, period: Period) -> Option<f64> {
        if period < self.first_period {
            if period == self.first_period.offset(-1) {
                return self.opening.get(name).copied();
            }
            return None;
        }
        self.by_period.get(&period).and_then(|v| v.get(name)).copied()
    }

    /// Whether `period` falls before the run and is covered by the
    /// opening state.
    #[must_use]
    pub fn is_opening(&self, period: Period) -> bool {
        period == self.first_period.offset(-1)
    }

    /// The most recently recorded period's values, if any.
    #[must_use]
    pub fn latest(&self) -> Option<&ValueMap> {
        self.by_period.values().next_back()
    }

    /// The opening state.
    #[must_use]
    pub fn opening(&self) -> &ValueMap {
        &self.opening
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, f64)]) -> ValueMap {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_boundary_reads_opening() {
        let history = RunHistory::new(Period(1), map(&[("CASH", 1_000_000.0)]));
        assert_eq!(history.lookup("CASH", Period(0)), Some(1_000_000.0));
        assert_eq!(history.lookup("CASH", Period(-1)), None);
        assert_eq!(history.lookup("REVENUE", Period(0)), None);
    }

    #[test]
    fn test_recorded_periods_take_over() {
        let mut history = RunHistory::new(Period(1), map(&[("CASH", 1_000_000.0)]));
        history.record(Period(1), map(&[("CASH", 1_080_000.0)]));

        assert_eq!(history.lookup("CASH", Period(0)), Some(1_000_000.0));
        assert_eq!(history.lookup("CASH", Period(1)), Some(1_080_000.0));
        assert_eq!(history.latest().and_then(|v| v.get("CASH")), Some(&1_080_000.0));
    }
}
