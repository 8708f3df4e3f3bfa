//! Statement templates: the declarative model a scenario executes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::{LineItem, ValidationRule};

/// The declarative specification of a statement: line items keyed by code,
/// plus the validation rules the engine runs after each period.
///
/// Line items live in a `BTreeMap` so every walk over the template is
/// deterministic regardless of insertion order. The calculation order is
/// cached after the first dependency sort and invalidated by any mutation
/// that can change the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementTemplate {
    /// Unique template code.
    pub code: String,
    /// Statement type label (e.g. `integrated`).
    pub statement_type: String,
    /// Template version.
    pub version: u32,
    /// Line items keyed by code.
    items: BTreeMap<String, LineItem>,
    /// Validation rules evaluated after each period.
    pub validation_rules: Vec<ValidationRule>,
    /// Cached calculation order, if the dependency sort has run.
    #[serde(skip)]
    calc_order: Option<Vec<String>>,
}

impl StatementTemplate {
    /// Create an empty template.
    pub fn new(code: impl Into<String>, statement_type: impl Into<String>, version: u32) -> Self {
        Self {
            code: code.into(),
            statement_type: statement_type.into(),
            version,
            items: BTreeMap::new(),
            validation_rules: Vec::new(),
            calc_order: None,
        }
    }

    /// Insert a line item. Fails if the code is already taken.
    pub fn insert(&mut self, item: LineItem) -> CoreResult<()> {
        if self.items.contains_key(&item.code) {
            return Err(CoreError::DuplicateLine {
                template: self.code.clone(),
                line: item.code,
            });
        }
        self.calc_order = None;
        self.items.insert(item.code.clone(), item);
        Ok(())
    }

    /// Insert a line item, replacing any existing one with the same code.
    pub fn upsert(&mut self, item: LineItem) {
        self.calc_order = None;
        self.items.insert(item.code.clone(), item);
    }

    /// Add a validation rule.
    pub fn add_rule(&mut self, rule: ValidationRule) {
        self.validation_rules.push(rule);
    }

    /// Look up a line item.
    pub fn get(&self, code: &str) -> CoreResult<&LineItem> {
        self.items.get(code).ok_or_else(|| CoreError::LineNotFound {
            template: self.code.clone(),
            line: code.to_string(),
        })
    }

    /// Whether a line item exists.
    #[must_use]
    pub fn contains(&self, code: &str) -> bool {
        self.items.contains_key(code)
    }

    /// Iterate over line items in code order.
    pub fn items(&self) -> impl Iterator<Item = &LineItem> {
        self.items.values()
    }

    /// Number of line items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the template has no line items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Replace a line's formula and clear its driver source.
    ///
    /// Invalidates the cached calculation order. Reference resolution is
    /// checked lazily at evaluation time so staged transformations can pass
    /// through intermediate states.
    pub fn set_formula(&mut self, code: &str, formula: impl Into<String>) -> CoreResult<()> {
        let template_code = self.code.clone();
        let item = self
            .items
            .get_mut(code)
            .ok_or_else(|| CoreError::LineNotFound {
                template: template_code,
                line: code.to_string(),
            })?;
        item.formula = Some(formula.into());
        item.base_value_source = None;
        item.is_computed = true;
        self.calc_order = None;
        Ok(())
    }

    /// Clear a line's driver source without touching its formula.
    pub fn clear_base_value_source(&mut self, code: &str) -> CoreResult<()> {
        let template_code = self.code.clone();
        let item = self
            .items
            .get_mut(code)
            .ok_or_else(|| CoreError::LineNotFound {
                template: template_code,
                line: code.to_string(),
            })?;
        item.base_value_source = None;
        self.calc_order = None;
        Ok(())
    }

    /// Deep-copy the template under a new code.
    ///
    /// The clone shares no mutable state with the source; mutating it never
    /// changes the source template.
    #[must_use]
    pub fn clone_as(&self, new_code: impl Into<String>) -> Self {
        let mut clone = self.clone();
        clone.code = new_code.into();
        clone.calc_order = None;
        clone
    }

    /// The cached calculation order, if any.
    #[must_use]
    pub fn cached_order(&self) -> Option<&[String]> {
        self.calc_order.as_deref()
    }

    /// Attach a computed calculation order.
    pub fn set_cached_order(&mut self, order: Vec<String>) {
        self.calc_order = Some(order);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Section;

    fn template() -> StatementTemplate {
        let mut t = StatementTemplate::new("TEST", "integrated", 1);
        t.insert(LineItem::new("REVENUE", "Revenue", Section::ProfitAndLoss))
            .unwrap();
        t.insert(
            LineItem::new("NET_INCOME", "Net income", Section::ProfitAndLoss)
                .with_formula("REVENUE"),
        )
        .unwrap();
        t
    }

    #[test]
    fn test_insert_rejects_duplicates() {
        let mut t = template();
        let err = t
            .insert(LineItem::new("REVENUE", "Again", Section::ProfitAndLoss))
            .unwrap_err();
        assert!(matches!(err, CoreError::DuplicateLine { .. }));
    }

    #[test]
    fn test_set_formula_clears_driver_source() {
        let mut t = StatementTemplate::new("TEST", "integrated", 1);
        t.insert(
            LineItem::new("REVENUE", "Revenue", Section::ProfitAndLoss)
                .with_driver("driver:REVENUE".parse().unwrap()),
        )
        .unwrap();

        t.set_formula("REVENUE", "100 * 2").unwrap();
        let item = t.get("REVENUE").unwrap();
        assert_eq!(item.formula.as_deref(), Some("100 * 2"));
        assert!(item.base_value_source.is_none());
    }

    #[test]
    fn test_mutation_invalidates_cached_order() {
        let mut t = template();
        t.set_cached_order(vec!["REVENUE".to_string(), "NET_INCOME".to_string()]);
        assert!(t.cached_order().is_some());

        t.set_formula("NET_INCOME", "REVENUE * 2").unwrap();
        assert!(t.cached_order().is_none());
    }

    #[test]
    fn test_clone_isolation() {
        let source = template();
        let mut clone = source.clone_as("TEST_CLONE");
        clone.set_formula("NET_INCOME", "REVENUE * 0.5").unwrap();

        assert_eq!(
            source.get("NET_INCOME").unwrap().formula.as_deref(),
            Some("REVENUE")
        );
        assert_eq!(
            clone.get("NET_INCOME").unwrap().formula.as_deref(),
            Some("REVENUE * 0.5")
        );
    }

    #[test]
    fn test_lookup_missing_line() {
        let t = template();
        assert!(matches!(
            t.get("MISSING"),
            Err(CoreError::LineNotFound { .. })
        ));
    }
}
