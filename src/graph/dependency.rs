//! Per-atom/per-rule dependency graph with typed edges (§4.3), built on
//! `petgraph` the way `other_examples/manifests/brurucy-shapiro` and
//! `other_examples/manifests/teeaychem-otter_sat` build their rule/clause
//! dependency graphs.

use crate::id::ID;
use crate::registry::Registry;
use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::FxHashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DepEdgeKind {
    PositiveRegular,
    NegativeRegular,
    PositiveExternal,
    NegativeExternal,
    Disjunctive,
    AuxInput,
}

impl DepEdgeKind {
    pub fn is_negative(self) -> bool {
        matches!(self, DepEdgeKind::NegativeRegular | DepEdgeKind::NegativeExternal)
    }

    pub fn is_external(self) -> bool {
        matches!(self, DepEdgeKind::PositiveExternal | DepEdgeKind::NegativeExternal)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DepNode {
    Atom(ID),
    Rule(ID),
}

pub struct DependencyGraph {
    pub graph: DiGraph<DepNode, DepEdgeKind>,
    node_index: FxHashMap<ID, NodeIndex>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        DependencyGraph {
            graph: DiGraph::new(),
            node_index: FxHashMap::default(),
        }
    }

    pub fn node_for(&mut self, id: ID) -> NodeIndex {
        let node = if id.is_rule() { DepNode::Rule(id) } else { DepNode::Atom(id) };
        *self
            .node_index
            .entry(id)
            .or_insert_with(|| self.graph.add_node(node))
    }

    pub fn add_dep_edge(&mut self, from: ID, to: ID, kind: DepEdgeKind) {
        let a = self.node_for(from);
        let b = self.node_for(to);
        self.graph.add_edge(a, b, kind);
    }

    pub fn node_index_of(&self, id: ID) -> Option<NodeIndex> {
        self.node_index.get(&id).copied()
    }

    /// Builds the dependency graph from the rule set (§4.3): a
    /// head-atom-to-rule edge per head atom, a rule-to-body-literal edge
    /// per body literal (typed by polarity and external-ness),
    /// pairwise disjunctive edges between head atoms of the same rule,
    /// and an aux-input edge from each inner external atom to its
    /// auxiliary-input predicate.
    pub fn build(registry: &Registry, rules: &[ID]) -> Self {
        let mut g = DependencyGraph::new();
        for &rule_id in rules {
            let Some(rule) = registry.rule(rule_id) else { continue };
            g.node_for(rule_id);

            for &head_atom in &rule.head {
                g.add_dep_edge(head_atom, rule_id, DepEdgeKind::PositiveRegular);
            }
            if rule.head.len() >= 2 {
                for i in 0..rule.head.len() {
                    for j in 0..rule.head.len() {
                        if i != j {
                            g.add_dep_edge(rule.head[i], rule.head[j], DepEdgeKind::Disjunctive);
                        }
                    }
                }
            }

            for lit in &rule.body {
                let is_external = lit.atom.is_external_atom();
                let kind = match (is_external, lit.naf) {
                    (false, false) => DepEdgeKind::PositiveRegular,
                    (false, true) => DepEdgeKind::NegativeRegular,
                    (true, false) => DepEdgeKind::PositiveExternal,
                    (true, true) => DepEdgeKind::NegativeExternal,
                };
                g.add_dep_edge(rule_id, lit.atom, kind);

                if is_external {
                    if let Some(ea) = registry.external_atom(lit.atom) {
                        if let Some(aux_pred) = ea.aux_input_predicate {
                            g.add_dep_edge(lit.atom, aux_pred, DepEdgeKind::AuxInput);
                        }
                    }
                }

                if lit.atom.is_aggregate_atom() {
                    if let Some(agg) = registry.aggregate_atom(lit.atom) {
                        for inner_lit in &agg.body {
                            let inner_kind = if inner_lit.naf {
                                DepEdgeKind::NegativeRegular
                            } else {
                                DepEdgeKind::PositiveRegular
                            };
                            g.add_dep_edge(lit.atom, inner_lit.atom, inner_kind);
                        }
                    }
                }
            }
        }
        g
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}
