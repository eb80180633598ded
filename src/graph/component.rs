//! SCC condensation of the dependency graph into components with
//! per-component metadata (§4.3), ground on
//! `original_source/include/dlvhex2/ComponentGraph.h`.

use super::dependency::{DepEdgeKind, DepNode, DependencyGraph};
use crate::external::ExtSourceProperties;
use crate::id::ID;
use crate::registry::Registry;
use crate::term::Literal;
use petgraph::algo::tarjan_scc;
use petgraph::graph::NodeIndex;
use rustc_hash::{FxHashMap, FxHashSet};

#[derive(Clone, Debug, Default)]
pub struct Component {
    pub inner_rules: Vec<ID>,
    pub inner_constraints: Vec<ID>,
    pub inner_external_atoms: Vec<ID>,
    pub outer_external_atoms: Vec<ID>,
    pub defined_predicates: FxHashSet<ID>,
    pub disjunctive_heads: bool,
    pub negative_dependency_between_rules: bool,
    pub inner_eatoms_nonmonotonic: bool,
    pub outer_eatoms_nonmonotonic: bool,
    pub component_is_monotonic: bool,
    pub fixed_domain: bool,
    /// Set when an inner rule's body contains an aggregate atom that
    /// cyclically depends, through its own body, on an atom defined in
    /// this same component (§4.3).
    pub recursive_aggregates: bool,
    /// Per inner rule, the body literals whose predicate is defined in a
    /// strictly earlier component.
    pub stratified_literals: FxHashMap<ID, Vec<Literal>>,
}

pub struct ComponentGraph {
    pub components: Vec<Component>,
    /// `(from, to)` with `from` depending on `to`, i.e. `to` must be
    /// evaluated first — components are already listed in evaluation
    /// order (index 0 first).
    pub edges: Vec<(usize, usize)>,
}

impl ComponentGraph {
    /// Condenses `dep` via Tarjan SCC and derives metadata for every
    /// resulting component, consulting `ext_props` for the monotonicity
    /// of external atoms.
    pub fn build(
        registry: &Registry,
        dep: &DependencyGraph,
        ext_props: &FxHashMap<ID, ExtSourceProperties>,
    ) -> Self {
        // `tarjan_scc` returns components in reverse topological order
        // (a component containing only sinks comes first); we reverse so
        // `components[0]` has no dependencies, matching "evaluation
        // order" elsewhere in this crate.
        let mut sccs = tarjan_scc(&dep.graph);
        sccs.reverse();

        let mut scc_of: FxHashMap<NodeIndex, usize> = FxHashMap::default();
        for (idx, scc) in sccs.iter().enumerate() {
            for &node in scc {
                scc_of.insert(node, idx);
            }
        }

        let mut components: Vec<Component> = (0..sccs.len()).map(|_| Component::default()).collect();

        for (idx, scc) in sccs.iter().enumerate() {
            for &node in scc {
                match dep.graph[node] {
                    DepNode::Rule(rule_id) => {
                        let Some(rule) = registry.rule(rule_id) else { continue };
                        if rule.kind.constraint {
                            components[idx].inner_constraints.push(rule_id);
                        } else {
                            components[idx].inner_rules.push(rule_id);
                        }
                        if rule.head.len() >= 2 {
                            components[idx].disjunctive_heads = true;
                        }
                        for head in &rule.head {
                            if let Some(atom) = registry.ordinary_atom(*head) {
                                components[idx].defined_predicates.insert(atom.predicate());
                            }
                        }
                        for lit in &rule.body {
                            if lit.atom.is_external_atom() {
                                let atom_scc = dep.node_index_of(lit.atom).and_then(|n| scc_of.get(&n)).copied();
                                if atom_scc == Some(idx) {
                                    if !components[idx].inner_external_atoms.contains(&lit.atom) {
                                        components[idx].inner_external_atoms.push(lit.atom);
                                    }
                                } else if !components[idx].outer_external_atoms.contains(&lit.atom) {
                                    components[idx].outer_external_atoms.push(lit.atom);
                                }
                            }
                            if lit.atom.is_aggregate_atom() {
                                // The aggregate atom's own node was linked to
                                // its body literals in `DependencyGraph::build`;
                                // if Tarjan folded it into this same SCC, the
                                // aggregate cyclically depends on something it
                                // aggregates over.
                                let atom_scc = dep.node_index_of(lit.atom).and_then(|n| scc_of.get(&n)).copied();
                                if atom_scc == Some(idx) {
                                    components[idx].recursive_aggregates = true;
                                }
                            }
                        }
                    }
                    DepNode::Atom(_) => {}
                }
            }
        }

        // Inner SCC edges: used for negative-dependency-between-rules.
        for edge in dep.graph.edge_indices() {
            let (a, b) = dep.graph.edge_endpoints(edge).unwrap();
            let kind = dep.graph[edge];
            let (Some(&ca), Some(&cb)) = (scc_of.get(&a), scc_of.get(&b)) else { continue };
            if ca == cb && kind == DepEdgeKind::NegativeRegular {
                components[ca].negative_dependency_between_rules = true;
            }
        }

        for component in &mut components {
            component.inner_eatoms_nonmonotonic = component
                .inner_external_atoms
                .iter()
                .any(|id| is_nonmonotonic(ext_props, *id));
            component.outer_eatoms_nonmonotonic = component
                .outer_external_atoms
                .iter()
                .any(|id| is_nonmonotonic(ext_props, *id));
            component.component_is_monotonic = !component.negative_dependency_between_rules
                && !component.disjunctive_heads
                && !component.inner_eatoms_nonmonotonic;
            component.fixed_domain = component
                .inner_external_atoms
                .iter()
                .all(|id| has_fixed_domain(ext_props, *id));
        }

        // Cross-component edges, derived from the condensation: an edge
        // from component `ca` to `cb` exists if any dependency-graph edge
        // crosses between their members.
        let mut edge_set: FxHashSet<(usize, usize)> = FxHashSet::default();
        for edge in dep.graph.edge_indices() {
            let (a, b) = dep.graph.edge_endpoints(edge).unwrap();
            let (Some(&ca), Some(&cb)) = (scc_of.get(&a), scc_of.get(&b)) else { continue };
            if ca != cb {
                edge_set.insert((ca, cb));
            }
        }

        for component in &mut components {
            stratify(registry, component, &components, &scc_of, dep);
        }

        ComponentGraph {
            components,
            edges: edge_set.into_iter().collect(),
        }
    }

    /// Merges `originals` into one new component, appending a *copy* of
    /// `shared` (constraint-only components safe to duplicate across
    /// units) to it, and rejects collapses that would create a cycle
    /// among the remaining components (§4.3).
    pub fn collapse_components(&mut self, originals: &[usize], shared: &[usize]) -> Result<usize, String> {
        for &s in shared {
            if !self.components[s].inner_rules.is_empty() {
                return Err(format!(
                    "component {s} is not constraint-only; cannot be shared across units"
                ));
            }
        }

        let mut merged = Component::default();
        merged.fixed_domain = true;
        for &idx in originals.iter().chain(shared.iter()) {
            let c = &self.components[idx];
            merged.inner_rules.extend(c.inner_rules.iter().copied());
            merged.inner_constraints.extend(c.inner_constraints.iter().copied());
            merged.inner_external_atoms.extend(c.inner_external_atoms.iter().copied());
            merged.outer_external_atoms.extend(c.outer_external_atoms.iter().copied());
            merged.defined_predicates.extend(c.defined_predicates.iter().copied());
            merged.disjunctive_heads |= c.disjunctive_heads;
            merged.negative_dependency_between_rules |= c.negative_dependency_between_rules;
            merged.inner_eatoms_nonmonotonic |= c.inner_eatoms_nonmonotonic;
            merged.outer_eatoms_nonmonotonic |= c.outer_eatoms_nonmonotonic;
            merged.recursive_aggregates |= c.recursive_aggregates;
            merged.fixed_domain &= c.fixed_domain;
        }
        merged.component_is_monotonic = !merged.negative_dependency_between_rules
            && !merged.disjunctive_heads
            && !merged.inner_eatoms_nonmonotonic;

        let originals_set: FxHashSet<usize> = originals.iter().copied().collect();
        let new_idx = self.components.len();
        self.components.push(merged);

        let mut new_edges = Vec::new();
        for &(from, to) in &self.edges {
            let from_mapped = if originals_set.contains(&from) { new_idx } else { from };
            let to_mapped = if originals_set.contains(&to) { new_idx } else { to };
            if from_mapped != to_mapped {
                new_edges.push((from_mapped, to_mapped));
            }
        }
        if creates_cycle(&new_edges, self.components.len()) {
            self.components.pop();
            return Err("collapse would create a cycle between components".to_string());
        }
        self.edges = new_edges;
        Ok(new_idx)
    }
}

fn is_nonmonotonic(ext_props: &FxHashMap<ID, ExtSourceProperties>, ea_id: ID) -> bool {
    let Some(props) = ext_props.get(&ea_id) else { return true };
    (0..props.monotonic_inputs.len().max(props.antimonotonic_inputs.len()))
        .any(|pos| !props.input_is_monotonic(pos) && !props.input_is_antimonotonic(pos))
}

fn has_fixed_domain(ext_props: &FxHashMap<ID, ExtSourceProperties>, ea_id: ID) -> bool {
    // An atom has a fixed domain if it cannot invent values outside its
    // input's domain; we treat "provides support sets" (a plugin that
    // declares the exact set of possibly-true outputs up front) as the
    // signal that output positions are domain-restricted via input.
    ext_props.get(&ea_id).map(|p| p.provides_support_sets).unwrap_or(false)
}

fn stratify(
    registry: &Registry,
    component: &mut Component,
    components: &[Component],
    scc_of: &FxHashMap<NodeIndex, usize>,
    dep: &DependencyGraph,
) {
    for &rule_id in &component.inner_rules {
        let Some(rule) = registry.rule(rule_id) else { continue };
        let Some(rule_node) = dep.node_index_of(rule_id) else { continue };
        let Some(&own_idx) = scc_of.get(&rule_node) else { continue };
        let mut strat = Vec::new();
        for lit in &rule.body {
            if lit.atom.is_external_atom() {
                continue;
            }
            let Some(atom) = registry.ordinary_atom(lit.atom) else { continue };
            let predicate = atom.predicate();
            let defined_earlier = components[..own_idx]
                .iter()
                .any(|c| c.defined_predicates.contains(&predicate));
            if defined_earlier {
                strat.push(*lit);
            }
        }
        component.stratified_literals.insert(rule_id, strat);
    }
}

fn creates_cycle(edges: &[(usize, usize)], node_count: usize) -> bool {
    let mut adj: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    for &(from, to) in edges {
        adj[from].push(to);
    }
    let mut state = vec![0u8; node_count]; // 0 unvisited, 1 in-progress, 2 done
    fn visit(node: usize, adj: &[Vec<usize>], state: &mut [u8]) -> bool {
        state[node] = 1;
        for &next in &adj[node] {
            match state[next] {
                1 => return true,
                0 => {
                    if visit(next, adj, state) {
                        return true;
                    }
                }
                _ => {}
            }
        }
        state[node] = 2;
        false
    }
    (0..node_count).any(|n| state[n] == 0 && visit(n, adj, &mut state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::{AggregateAtom, AggregateFunction, Rule, RuleKind};

    #[test]
    fn acyclic_dependency_yields_two_components() {
        let reg = Registry::new();
        let a = reg.store_constant("a", false);
        let b = reg.store_constant("b", false);
        let atom_a = reg.store_ordinary_ground_atom(vec![a]);
        let atom_b = reg.store_ordinary_ground_atom(vec![b]);

        let rule_b = reg.store_rule(Rule {
            head: vec![atom_b],
            body: vec![],
            kind: RuleKind::default(),
        });
        let rule_a = reg.store_rule(Rule {
            head: vec![atom_a],
            body: vec![Literal::pos(atom_b)],
            kind: RuleKind::default(),
        });

        let dep = DependencyGraph::build(&reg, &[rule_a, rule_b]);
        let cg = ComponentGraph::build(&reg, &dep, &FxHashMap::default());
        assert_eq!(cg.components.len(), 2);
        assert!(!cg.components[0].disjunctive_heads);
    }

    #[test]
    fn mutual_recursion_collapses_into_one_component() {
        let reg = Registry::new();
        let a = reg.store_constant("a", false);
        let b = reg.store_constant("b", false);
        let atom_a = reg.store_ordinary_ground_atom(vec![a]);
        let atom_b = reg.store_ordinary_ground_atom(vec![b]);

        let rule_a = reg.store_rule(Rule {
            head: vec![atom_a],
            body: vec![Literal::pos(atom_b)],
            kind: RuleKind::default(),
        });
        let rule_b = reg.store_rule(Rule {
            head: vec![atom_b],
            body: vec![Literal::pos(atom_a)],
            kind: RuleKind::default(),
        });

        let dep = DependencyGraph::build(&reg, &[rule_a, rule_b]);
        let cg = ComponentGraph::build(&reg, &dep, &FxHashMap::default());
        assert_eq!(cg.components.len(), 1);
        assert_eq!(cg.components[0].inner_rules.len(), 2);
    }

    #[test]
    fn disjunctive_head_is_flagged() {
        let reg = Registry::new();
        let a = reg.store_constant("a", false);
        let b = reg.store_constant("b", false);
        let atom_a = reg.store_ordinary_ground_atom(vec![a]);
        let atom_b = reg.store_ordinary_ground_atom(vec![b]);

        let rule = reg.store_rule(Rule {
            head: vec![atom_a, atom_b],
            body: vec![],
            kind: RuleKind {
                disjunctive: true,
                ..Default::default()
            },
        });

        let dep = DependencyGraph::build(&reg, &[rule]);
        let cg = ComponentGraph::build(&reg, &dep, &FxHashMap::default());
        assert!(cg.components.iter().any(|c| c.disjunctive_heads));
        assert!(!cg.components.iter().any(|c| c.component_is_monotonic && c.disjunctive_heads));
    }

    #[test]
    fn aggregate_cycling_through_its_own_defined_atom_is_flagged() {
        let reg = Registry::new();
        let p = reg.store_constant("p", false);
        let atom_p = reg.store_ordinary_ground_atom(vec![p]);
        let count_var = reg.store_variable("C", false);

        let agg_id = reg.store_aggregate_atom(AggregateAtom {
            result_var: count_var,
            function: AggregateFunction::Count,
            local_variables: vec![],
            body: vec![Literal::pos(atom_p)],
        });

        let rule = reg.store_rule(Rule {
            head: vec![atom_p],
            body: vec![Literal::pos(agg_id)],
            kind: RuleKind::default(),
        });

        let dep = DependencyGraph::build(&reg, &[rule]);
        let cg = ComponentGraph::build(&reg, &dep, &FxHashMap::default());
        assert_eq!(cg.components.len(), 1);
        assert!(cg.components[0].recursive_aggregates);
    }

    #[test]
    fn non_recursive_aggregate_is_not_flagged() {
        let reg = Registry::new();
        let p = reg.store_constant("p", false);
        let q = reg.store_constant("q", false);
        let atom_p = reg.store_ordinary_ground_atom(vec![p]);
        let atom_q = reg.store_ordinary_ground_atom(vec![q]);
        let count_var = reg.store_variable("C", false);

        let agg_id = reg.store_aggregate_atom(AggregateAtom {
            result_var: count_var,
            function: AggregateFunction::Count,
            local_variables: vec![],
            body: vec![Literal::pos(atom_q)],
        });

        let rule = reg.store_rule(Rule {
            head: vec![atom_p],
            body: vec![Literal::pos(agg_id)],
            kind: RuleKind::default(),
        });

        let dep = DependencyGraph::build(&reg, &[rule]);
        let cg = ComponentGraph::build(&reg, &dep, &FxHashMap::default());
        assert!(!cg.components.iter().any(|c| c.recursive_aggregates));
    }
}
