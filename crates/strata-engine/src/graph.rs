//! Dependency extraction and calculation ordering.
//!
//! Every formula contributes edges from the line items it references to
//! itself. Only current-period, in-template references count: time-shifted
//! references resolve from prior state and namespace prefixes are stripped
//! before matching, so neither can create a cycle. Driver-sourced items
//! have no outgoing edges.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use strata_core::types::StatementTemplate;
use strata_formula::Expr;

use crate::error::{EngineError, EngineResult};

/// In-template dependencies of one parsed formula: the referenced line
/// codes, deduplicated, namespace stripped.
fn formula_dependencies(template: &StatementTemplate, expr: &Expr) -> BTreeSet<String> {
    expr.references()
        .into_iter()
        .filter(|reference| reference.is_current() && template.contains(&reference.name))
        .map(|reference| reference.name.clone())
        .collect()
}

/// Compute the calculation order for a template via Kahn's algorithm.
///
/// Ties among ready nodes break lexically, so the order is reproducible
/// for any insertion order of the inputs. A leftover node means a cycle;
/// the error reports the members of the shortest one.
pub fn calculation_order(
    template: &StatementTemplate,
    formulas: &BTreeMap<String, Expr>,
) -> EngineResult<Vec<String>> {
    let mut dependents: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut dependencies: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    let mut in_degree: BTreeMap<String, usize> = BTreeMap::new();

    for item in template.items() {
        in_degree.insert(item.code.clone(), 0);
    }
    for (line, expr) in formulas {
        let deps = formula_dependencies(template, expr);
        *in_degree.entry(line.clone()).or_insert(0) += deps.len();
        for dep in &deps {
            dependents.entry(dep.clone()).or_default().push(line.clone());
        }
        dependencies.insert(line.clone(), deps);
    }

    let mut ready: BTreeSet<String> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(code, _)| code.clone())
        .collect();

    let mut order = Vec::with_capacity(in_degree.len());
    while let Some(next) = ready.iter().next().cloned() {
        ready.remove(&next);
        if let Some(children) = dependents.get(&next) {
            for child in children {
                if let Some(degree) = in_degree.get_mut(child) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert(child.clone());
                    }
                }
            }
        }
        order.push(next);
    }

    if order.len() < in_degree.len() {
        let done: BTreeSet<&String> = order.iter().collect();
        let remaining: BTreeSet<String> = in_degree
            .keys()
            .filter(|code| !done.contains(code))
            .cloned()
            .collect();
        let cycle = shortest_cycle(&remaining, &dependencies);
        return Err(EngineError::CircularDependency { codes: cycle });
    }

    Ok(order)
}

/// Find the shortest cycle within the residual subgraph, walking from each
/// node through its dependencies back to itself. Deterministic: nodes are
/// visited in lexical order and the first shortest cycle wins.
fn shortest_cycle(
    remaining: &BTreeSet<String>,
    dependencies: &BTreeMap<String, BTreeSet<String>>,
) -> Vec<String> {
    let mut best: Option<Vec<String>> = None;

    for start in remaining {
        let mut queue = VecDeque::new();
        let mut parent: BTreeMap<&str, &str> = BTreeMap::new();
        queue.push_back(start.as_str());

        'bfs: while let Some(node) = queue.pop_front() {
            let Some(deps) = dependencies.get(node) else {
                continue;
            };
            for dep in deps {
                if !remaining.contains(dep) {
                    continue;
                }
                if dep == start {
                    // Reconstruct start -> ... -> node -> start.
                    let mut chain = Vec::new();
                    let mut cursor = node;
                    while cursor != start.as_str() {
                        chain.push(cursor.to_string());
                        match parent.get(cursor) {
                            Some(prev) => cursor = prev,
                            None => break,
                        }
                    }
                    chain.reverse();
                    let mut path = vec![start.clone()];
                    path.extend(chain);
                    path.push(start.clone());
                    if best.as_ref().map_or(true, |b| path.len() < b.len()) {
                        best = Some(path);
                    }
                    break 'bfs;
                }
                if !parent.contains_key(dep.as_str()) {
                    parent.insert(dep, node);
                    queue.push_back(dep);
                }
            }
        }
    }

    best.unwrap_or_else(|| remaining.iter().cloned().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::types::{LineItem, Section};
    use strata_formula::parse_formula;

    fn compile(template: &StatementTemplate) -> BTreeMap<String, Expr> {
        template
            .items()
            .filter_map(|item| {
                item.formula
                    .as_ref()
                    .map(|f| (item.code.clone(), parse_formula(f).unwrap()))
            })
            .collect()
    }

    fn template(lines: &[(&str, Option<&str>)]) -> StatementTemplate {
        let mut t = StatementTemplate::new("T", "integrated", 1);
        for (code, formula) in lines {
            let mut item = LineItem::new(*code, *code, Section::ProfitAndLoss);
            if let Some(f) = formula {
                item = item.with_formula(*f);
            }
            t.insert(item).unwrap();
        }
        t
    }

    #[test]
    fn test_dependencies_come_first() {
        let t = template(&[
            ("NET_INCOME", Some("REVENUE + EXPENSES")),
            ("REVENUE", None),
            ("EXPENSES", None),
            ("MARGIN", Some("NET_INCOME / REVENUE")),
        ]);
        let order = calculation_order(&t, &compile(&t)).unwrap();

        let pos = |code: &str| order.iter().position(|c| c == code).unwrap();
        assert!(pos("REVENUE") < pos("NET_INCOME"));
        assert!(pos("EXPENSES") < pos("NET_INCOME"));
        assert!(pos("NET_INCOME") < pos("MARGIN"));
    }

    #[test]
    fn test_lexical_tie_break() {
        let t = template(&[("C", None), ("A", None), ("B", None)]);
        let order = calculation_order(&t, &compile(&t)).unwrap();
        assert_eq!(order, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_time_shift_is_not_an_edge() {
        let t = template(&[
            ("CF_NET", Some("NET_INCOME")),
            ("NET_INCOME", None),
            ("CASH", Some("CASH[t-1] + CF_NET")),
        ]);
        let order = calculation_order(&t, &compile(&t)).unwrap();
        let pos = |code: &str| order.iter().position(|c| c == code).unwrap();
        assert!(pos("CF_NET") < pos("CASH"));
    }

    #[test]
    fn test_namespace_stripped_for_in_template_refs() {
        let t = template(&[
            ("RETAINED", Some("pl:NET_INCOME")),
            ("NET_INCOME", Some("REVENUE")),
            ("REVENUE", None),
        ]);
        let order = calculation_order(&t, &compile(&t)).unwrap();
        let pos = |code: &str| order.iter().position(|c| c == code).unwrap();
        assert!(pos("NET_INCOME") < pos("RETAINED"));
    }

    #[test]
    fn test_cycle_detection_reports_members() {
        let t = template(&[
            ("A", Some("B + 1")),
            ("B", Some("C + 1")),
            ("C", Some("A + 1")),
            ("OK", None),
        ]);
        let err = calculation_order(&t, &compile(&t)).unwrap_err();
        let EngineError::CircularDependency { codes } = err else {
            panic!("expected cycle error");
        };
        assert_eq!(codes.first(), codes.last());
        assert_eq!(codes.len(), 4);
    }

    #[test]
    fn test_self_reference_is_a_cycle() {
        let t = template(&[("A", Some("A + 1"))]);
        let err = calculation_order(&t, &compile(&t)).unwrap_err();
        assert!(matches!(err, EngineError::CircularDependency { .. }));
    }

    #[test]
    fn test_shortest_cycle_is_reported() {
        // Two cycles: A<->B (length 2) and C->D->E->C (length 3).
        let t = template(&[
            ("A", Some("B")),
            ("B", Some("A")),
            ("C", Some("E")),
            ("D", Some("C")),
            ("E", Some("D")),
        ]);
        let err = calculation_order(&t, &compile(&t)).unwrap_err();
        let EngineError::CircularDependency { codes } = err else {
            panic!("expected cycle error");
        };
        assert_eq!(codes.len(), 3);
    }
}
