//! Liberal domain-expansion safety (§4.4), ground on
//! `original_source/include/dlvhex2/LiberalSafetyChecker.h`: a fixpoint
//! over an attribute dependency graph, weaker than textbook strong
//! safety because it lets well-behaved external atoms bind variables.

use crate::external::ExtSourceProperties;
use crate::id::ID;
use crate::registry::Registry;
use crate::term::{ExternalAtom, Rule};
use rustc_hash::{FxHashMap, FxHashSet};

pub type VariableLocation = (ID, ID);

/// Hook run at every fixpoint iteration; may declare additional bounded
/// variables from application-specific safety criteria (§4.4).
pub trait LiberalSafetyPlugin: Send + Sync {
    fn run(&self, checker: &LiberalSafetyChecker) -> Vec<VariableLocation>;
}

pub struct LiberalSafetyChecker<'a> {
    registry: &'a Registry,
    idb: &'a [ID],
    ext_props: &'a FxHashMap<ID, ExtSourceProperties>,
    bounded_variables: FxHashSet<VariableLocation>,
    necessary_external_atoms: FxHashSet<ID>,
}

impl<'a> LiberalSafetyChecker<'a> {
    pub fn new(registry: &'a Registry, idb: &'a [ID], ext_props: &'a FxHashMap<ID, ExtSourceProperties>) -> Self {
        LiberalSafetyChecker {
            registry,
            idb,
            ext_props,
            bounded_variables: FxHashSet::default(),
            necessary_external_atoms: FxHashSet::default(),
        }
    }

    pub fn bounded_variables(&self) -> &FxHashSet<VariableLocation> {
        &self.bounded_variables
    }

    pub fn is_external_atom_necessary_for_domain_expansion_safety(&self, ea_id: ID) -> bool {
        self.necessary_external_atoms.contains(&ea_id)
    }

    fn add_bounded_variable(&mut self, vl: VariableLocation) -> bool {
        self.bounded_variables.insert(vl)
    }

    /// Runs the fixpoint described in §4.4 and returns whether every
    /// variable occurring in every rule head ended up bounded.
    pub fn compute_domain_expansion_safety(&mut self, plugins: &[std::sync::Arc<dyn LiberalSafetyPlugin>]) -> bool {
        self.seed_ordinary_bindings();

        loop {
            let mut changed = false;
            changed |= self.propagate_external_bindings();

            for plugin in plugins {
                for vl in plugin.run(self) {
                    if self.add_bounded_variable(vl) {
                        changed = true;
                    }
                }
            }

            if !changed {
                break;
            }
        }

        self.all_head_variables_bounded()
    }

    /// Positive ordinary body literals bind every variable occurring in
    /// their argument tuple directly — the textbook strong-safety case.
    fn seed_ordinary_bindings(&mut self) {
        for &rule_id in self.idb {
            let Some(rule) = self.registry.rule(rule_id) else { continue };
            for lit in &rule.body {
                if lit.naf || lit.atom.is_external_atom() {
                    continue;
                }
                let Some(atom) = self.registry.ordinary_atom(lit.atom) else { continue };
                for &arg in &atom.args[1..] {
                    if arg.sub_kind() == crate::id::SUBKIND_VARIABLE {
                        self.add_bounded_variable((rule_id, arg));
                    }
                }
            }
        }
    }

    /// A positive external atom whose input variables are all already
    /// bounded can be evaluated; its output variables become bounded
    /// ("bounded by external"), and the atom is recorded as necessary for
    /// safety (§4.4). An input position is also treated as bounded when
    /// `ExtSourceProperties::well_ordering_by_string_length` pairs it with
    /// an already-bounded output — the output's string length bounds the
    /// input's, the mechanism dlvhex uses to accept recursive
    /// string-decomposition atoms that bind "backwards".
    fn propagate_external_bindings(&mut self) -> bool {
        let mut changed = false;
        for &rule_id in self.idb {
            let Some(rule) = self.registry.rule(rule_id) else { continue };
            for lit in &rule.body {
                if lit.naf || !lit.atom.is_external_atom() {
                    continue;
                }
                let Some(ea) = self.registry.external_atom(lit.atom) else { continue };
                let props = self.ext_props.get(&lit.atom);

                let inputs_bounded = ea.inputs.iter().enumerate().all(|(pos, &input)| {
                    is_bound(&self.bounded_variables, rule_id, input)
                        || well_ordering_allows(props, &self.bounded_variables, rule_id, &ea, pos)
                });
                if !inputs_bounded {
                    continue;
                }
                let monotonic_enough = props
                    .map(|p| p.provides_support_sets || p.functional || p.is_monotonic())
                    .unwrap_or(true);
                if !monotonic_enough {
                    continue;
                }

                let well_ordering_bound_positions: Vec<ID> = ea
                    .inputs
                    .iter()
                    .enumerate()
                    .filter(|&(pos, &input)| {
                        input.sub_kind() == crate::id::SUBKIND_VARIABLE
                            && !is_bound(&self.bounded_variables, rule_id, input)
                            && well_ordering_allows(props, &self.bounded_variables, rule_id, &ea, pos)
                    })
                    .map(|(_, &input)| input)
                    .collect();
                for input in well_ordering_bound_positions {
                    if self.add_bounded_variable((rule_id, input)) {
                        changed = true;
                    }
                }

                self.necessary_external_atoms.insert(lit.atom);
                for &out in &ea.outputs {
                    if out.sub_kind() == crate::id::SUBKIND_VARIABLE
                        && self.add_bounded_variable((rule_id, out))
                    {
                        changed = true;
                    }
                }
            }
        }
        changed
    }

    fn all_head_variables_bounded(&self) -> bool {
        for &rule_id in self.idb {
            let Some(rule) = self.registry.rule(rule_id) else { continue };
            for &head in &rule.head {
                for var in self.registry.get_variables_in(head, false, false) {
                    if !self.bounded_variables.contains(&(rule_id, var)) {
                        return false;
                    }
                }
            }
        }
        true
    }
}

fn is_bound(bounded: &FxHashSet<VariableLocation>, rule_id: ID, term: ID) -> bool {
    term.sub_kind() != crate::id::SUBKIND_VARIABLE || bounded.contains(&(rule_id, term))
}

/// True iff `ExtSourceProperties::well_ordering_by_string_length` pairs
/// input position `pos` with an output position that is already bound.
fn well_ordering_allows(
    props: Option<&ExtSourceProperties>,
    bounded: &FxHashSet<VariableLocation>,
    rule_id: ID,
    ea: &ExternalAtom,
    pos: usize,
) -> bool {
    let Some(props) = props else { return false };
    props.well_ordering_by_string_length.iter().any(|&(in_idx, out_idx)| {
        in_idx == pos
            && ea
                .outputs
                .get(out_idx)
                .is_some_and(|&out| is_bound(bounded, rule_id, out))
    })
}

/// Convenience wrapper matching §4.4's entry point: builds a checker for
/// `idb`, runs the fixpoint, and reports the verdict plus which external
/// atoms were necessary to reach it.
pub struct SafetyReport {
    pub is_domain_expansion_safe: bool,
    pub necessary_external_atoms: FxHashSet<ID>,
    pub bounded_variables: FxHashSet<VariableLocation>,
}

pub fn check_liberal_safety(
    registry: &Registry,
    idb: &[ID],
    ext_props: &FxHashMap<ID, ExtSourceProperties>,
    plugins: &[std::sync::Arc<dyn LiberalSafetyPlugin>],
) -> SafetyReport {
    let mut checker = LiberalSafetyChecker::new(registry, idb, ext_props);
    let safe = checker.compute_domain_expansion_safety(plugins);
    SafetyReport {
        is_domain_expansion_safe: safe,
        necessary_external_atoms: checker.necessary_external_atoms.clone(),
        bounded_variables: checker.bounded_variables.clone(),
    }
}
