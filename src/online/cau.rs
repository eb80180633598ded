//! Common-ancestor-unit computation (§4.10 point 2), ground on
//! `original_source/src/dlvhex/CAUAlgorithms.cpp`: kept as its own
//! module, independent of `OnlineModelBuilder`, so it can be exercised
//! against small hand-built evaluation graphs.

use crate::eval_graph::EvalGraph;
use rustc_hash::{FxHashMap, FxHashSet};

/// Every unit reachable from `unit` by following `depends_on` edges,
/// including `unit` itself.
pub fn ancestors(eval_graph: &EvalGraph, unit: usize) -> FxHashSet<usize> {
    let mut seen = FxHashSet::default();
    let mut stack = vec![unit];
    while let Some(u) = stack.pop() {
        if seen.insert(u) {
            for dep in &eval_graph.units[u].depends_on {
                stack.push(dep.to);
            }
        }
    }
    seen
}

/// Units that are an ancestor of at least two of `predecessors` — the
/// set a join over exactly those predecessors must keep consistent
/// across branches.
pub fn find_caus_among(eval_graph: &EvalGraph, predecessors: &[usize]) -> Vec<usize> {
    let mut occurrence: FxHashMap<usize, usize> = FxHashMap::default();
    for &p in predecessors {
        for a in ancestors(eval_graph, p) {
            *occurrence.entry(a).or_insert(0) += 1;
        }
    }
    let mut caus: Vec<usize> = occurrence
        .into_iter()
        .filter(|&(_, count)| count >= 2)
        .map(|(a, _)| a)
        .collect();
    caus.sort_unstable();
    caus
}

/// `findCAUs` specialised to one unit's direct predecessors (§4.10
/// point 2).
pub fn find_caus(eval_graph: &EvalGraph, unit: usize) -> Vec<usize> {
    let predecessors: Vec<usize> = eval_graph.units[unit].depends_on.iter().map(|d| d.to).collect();
    find_caus_among(eval_graph, &predecessors)
}

/// Labels each of `predecessors` "relevant for join-filtering" iff some
/// CAU sits on a path to it, i.e. is one of its own ancestors.
pub fn mark_join_relevance_among(
    eval_graph: &EvalGraph,
    predecessors: &[usize],
    caus: &[usize],
) -> FxHashMap<usize, bool> {
    let cau_set: FxHashSet<usize> = caus.iter().copied().collect();
    predecessors
        .iter()
        .map(|&p| {
            let anc = ancestors(eval_graph, p);
            (p, cau_set.iter().any(|c| anc.contains(c)))
        })
        .collect()
}

/// `markJoinRelevance` specialised to one unit's direct predecessors
/// (§4.10 point 2).
pub fn mark_join_relevance(eval_graph: &EvalGraph, unit: usize, caus: &[usize]) -> FxHashMap<usize, bool> {
    let predecessors: Vec<usize> = eval_graph.units[unit].depends_on.iter().map(|d| d.to).collect();
    mark_join_relevance_among(eval_graph, &predecessors, caus)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::PluginTable;
    use crate::graph::component::Component;
    use crate::model_generator::PlainModelGeneratorFactory;
    use crate::registry::Registry;
    use rustc_hash::FxHashMap as Map;
    use std::sync::Arc;

    /// Builds `U1 -> U2, U1 -> U3, {U2,U3} -> U4` directly (bypassing
    /// `build_eval_graph`, which only ever produces one unit per
    /// component) to exercise the diamond shape from spec.md's CAU
    /// scenario.
    fn diamond_graph() -> EvalGraph {
        use crate::eval_graph::{EvalUnit, EvalUnitDep};

        let reg = Arc::new(Registry::new());
        let plugins = Arc::new(PluginTable::default());
        let factory_for = || -> Arc<dyn crate::model_generator::ModelGeneratorFactory> {
            Arc::new(PlainModelGeneratorFactory::new(
                reg.clone(),
                plugins.clone(),
                Component::default(),
                Map::default(),
            )) as Arc<_>
        };

        EvalGraph {
            units: vec![
                EvalUnit { component: 0, factory: factory_for(), depends_on: vec![] },
                EvalUnit {
                    component: 1,
                    factory: factory_for(),
                    depends_on: vec![EvalUnitDep { to: 0, join_order: 0 }],
                },
                EvalUnit {
                    component: 2,
                    factory: factory_for(),
                    depends_on: vec![EvalUnitDep { to: 0, join_order: 0 }],
                },
                EvalUnit {
                    component: 3,
                    factory: factory_for(),
                    depends_on: vec![
                        EvalUnitDep { to: 1, join_order: 0 },
                        EvalUnitDep { to: 2, join_order: 1 },
                    ],
                },
            ],
        }
    }

    #[test]
    fn diamond_shared_root_is_the_only_cau() {
        let eg = diamond_graph();
        let caus = find_caus(&eg, 3);
        assert_eq!(caus, vec![0]);
    }

    #[test]
    fn both_branches_of_the_diamond_are_join_relevant() {
        let eg = diamond_graph();
        let caus = find_caus(&eg, 3);
        let relevance = mark_join_relevance(&eg, 3, &caus);
        assert_eq!(relevance.get(&1), Some(&true));
        assert_eq!(relevance.get(&2), Some(&true));
    }

    #[test]
    fn a_unit_with_independent_predecessors_has_no_caus() {
        let reg = Arc::new(Registry::new());
        let plugins = Arc::new(PluginTable::default());
        let factory = || -> Arc<dyn crate::model_generator::ModelGeneratorFactory> {
            Arc::new(PlainModelGeneratorFactory::new(
                reg.clone(),
                plugins.clone(),
                Component::default(),
                Map::default(),
            )) as Arc<_>
        };
        let eg = EvalGraph {
            units: vec![
                crate::eval_graph::EvalUnit { component: 0, factory: factory(), depends_on: vec![] },
                crate::eval_graph::EvalUnit { component: 1, factory: factory(), depends_on: vec![] },
                crate::eval_graph::EvalUnit {
                    component: 2,
                    factory: factory(),
                    depends_on: vec![
                        crate::eval_graph::EvalUnitDep { to: 0, join_order: 0 },
                        crate::eval_graph::EvalUnitDep { to: 1, join_order: 1 },
                    ],
                },
            ],
        };
        assert!(find_caus(&eg, 2).is_empty());
    }
}
