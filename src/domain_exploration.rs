//! Domain-predicate exploration (§4.11), ground on
//! `original_source/include/dlvhex2/LiberalSafetyChecker.h`'s "necessary
//! for domain expansion" output: synthesises a domain atom and a choice
//! rule per such external atom, then grounds and evaluates iteratively
//! until no new domain atom appears, bounded by a freeze count.

use crate::error::HexResult;
use crate::external::cache::EAInputTupleCache;
use crate::external::evaluator::{evaluate_external_atom, EvalParams, IntegrationCallback};
use crate::external::learning::replacement_atom;
use crate::external::{ExtSourceProperties, InputType, NogoodContainer, PluginAtom, PluginTable};
use crate::id::ID;
use crate::interpretation::Interpretation;
use crate::model_generator::rewrite_rules;
use crate::predicate_mask::{ExternalAtomMask, PredicateMask};
use crate::registry::aux;
use crate::registry::Registry;
use crate::solver::{solve, GroundProgram};
use crate::term::{ExternalAtom, Literal, Rule, RuleKind};
use rustc_hash::FxHashSet;
use std::sync::Arc;

pub struct DomainExplorer {
    registry: Arc<Registry>,
    plugins: Arc<PluginTable>,
    null_freeze_count: usize,
}

impl DomainExplorer {
    pub fn new(registry: Arc<Registry>, plugins: Arc<PluginTable>, null_freeze_count: usize) -> Self {
        DomainExplorer { registry, plugins, null_freeze_count }
    }

    /// Runs §4.11's loop over `idb` for the external atoms liberal
    /// safety marked necessary for domain expansion, seeded by `edb`.
    /// Returns the final `d_p` fact set — meant to be unioned into the
    /// EDB handed to the real evaluation graph (§4.11's last line).
    pub fn explore(&self, idb: &[ID], necessary: &[ID], edb: &Interpretation) -> HexResult<Interpretation> {
        let xidb = rewrite_rules(&self.registry, idb)?;
        let choice_rules = self.build_choice_rules(necessary)?;

        let mut domain_facts = Interpretation::new();
        let mut seen: FxHashSet<(ID, Vec<ID>)> = FxHashSet::default();
        let tuple_cache = EAInputTupleCache::new();

        for _ in 0..self.null_freeze_count {
            let mut facts = edb.clone();
            facts.union_with(&domain_facts);

            let mut program = GroundProgram::new();
            program.rules.extend(xidb.iter().cloned());
            program.rules.extend(choice_rules.iter().cloned());
            let base = solve(&program, &facts)?.into_iter().next().unwrap_or_else(|| facts.clone());

            let mut newly_observed = false;
            for &ea_id in necessary {
                let Some(ea) = self.registry.external_atom(ea_id) else { continue };
                let Some(plugin) = self.plugins.get(&ea.predicate) else { continue };
                let mut mask = ExternalAtomMask::new(ea_id, &ea);
                mask.collect_output_atoms(&self.registry);
                let mut nogoods = NogoodContainer::default();
                let props = plugin.ext_source_properties();
                let view = self.input_restricted_view(&ea, plugin.as_ref(), &props, &base, edb);
                let params = EvalParams {
                    registry: &self.registry,
                    ea_id,
                    interpretation: &view,
                    assigned: Some(&view),
                    changed: None,
                    plugin: plugin.as_ref(),
                    tuple_cache: &tuple_cache,
                    fingerprint_cache: None,
                };
                let mut collector = DomainFactCollector {
                    domain_facts: &mut domain_facts,
                    seen: &mut seen,
                    changed: &mut newly_observed,
                };
                evaluate_external_atom(&params, &mut mask, &ea, &mut nogoods, &mut collector)?;
            }

            if !newly_observed {
                break;
            }
        }

        Ok(domain_facts)
    }

    /// Restricts `base` per input position before it is handed to the
    /// plugin (§4.11 paragraph 2): an antimonotonic predicate input has
    /// its extension stripped entirely, a monotonic one is taken only
    /// from `edb` ("stratified"), and anything else (nonmonotonic, or a
    /// non-predicate position) is left as the fully enumerated `base`.
    fn input_restricted_view(
        &self,
        ea: &ExternalAtom,
        plugin: &dyn PluginAtom,
        props: &ExtSourceProperties,
        base: &Interpretation,
        edb: &Interpretation,
    ) -> Interpretation {
        let mut view = base.clone();
        for (pos, &input) in ea.inputs.iter().enumerate() {
            if plugin.input_type(pos) != InputType::Predicate {
                continue;
            }
            let mut pm = PredicateMask::new();
            pm.add_predicate(input);
            pm.update(&self.registry);
            let pred_mask = pm.mask();

            if props.input_is_antimonotonic(pos) {
                view.diff_with(pred_mask);
            } else if props.input_is_monotonic(pos) {
                let mut from_edb = edb.clone();
                from_edb.intersect_with(pred_mask);
                view.diff_with(pred_mask);
                view.union_with(&from_edb);
            }
        }
        view
    }

    /// §4.11's choice rule: `r_p(I,O) ∨ n_p(I,O) ← d_p(I,O)`, one per
    /// necessary external atom occurrence — "forces the grounder to
    /// consider every plausible output" once a `d_p` fact exists for it.
    fn build_choice_rules(&self, necessary: &[ID]) -> HexResult<Vec<Rule>> {
        let mut rules = Vec::with_capacity(necessary.len());
        for &ea_id in necessary {
            let Some(ea) = self.registry.external_atom(ea_id) else { continue };
            let Some(r_atom) = replacement_atom(&self.registry, ea_id, &ea.inputs, &ea.outputs) else { continue };
            let n_atom = self.registry.swap_external_aux(r_atom)?;
            let d_atom = self.domain_atom(ea_id, &ea)?;

            rules.push(Rule {
                head: vec![r_atom, n_atom],
                body: vec![Literal::pos(d_atom)],
                kind: RuleKind { disjunctive: true, ..Default::default() },
            });
        }
        Ok(rules)
    }

    fn domain_atom(&self, ea_id: ID, ea: &ExternalAtom) -> HexResult<ID> {
        let d_pred = self.registry.aux_constant(aux::AUX_DOMAIN, ea_id)?;
        let mut args = vec![d_pred];
        args.extend(ea.inputs.iter().copied());
        args.extend(ea.outputs.iter().copied());
        Ok(self.registry.store_ordinary_ground_atom(args))
    }
}

/// Converts each accepted output tuple into a `d_p` fact instead of an
/// `r_p` replacement atom (§4.11 point 1), deduplicating by
/// `(ea_id, input ++ output)` so a tuple already seen does not reopen
/// exploration — standing in for §4.11's "homomorphic aux-input atoms
/// excluded in subsequent iterations" without a unifier to detect
/// homomorphism modulo nulls (this crate's pipeline has no nulls).
struct DomainFactCollector<'a> {
    domain_facts: &'a mut Interpretation,
    seen: &'a mut FxHashSet<(ID, Vec<ID>)>,
    changed: &'a mut bool,
}

impl<'a> IntegrationCallback for DomainFactCollector<'a> {
    fn eatom(&mut self, _ea_id: ID, _ea: &ExternalAtom) {}
    fn input(&mut self, _tuple: &[ID]) {}

    fn output(&mut self, registry: &Registry, ea_id: ID, ea: &ExternalAtom, tuple: &[ID]) -> HexResult<()> {
        let mut key = ea.inputs.clone();
        key.extend_from_slice(tuple);
        if !self.seen.insert((ea_id, key.clone())) {
            return Ok(());
        }
        let d_pred = registry.aux_constant(aux::AUX_DOMAIN, ea_id)?;
        let mut args = vec![d_pred];
        args.extend(key);
        let atom_id = registry.store_ordinary_ground_atom(args);
        self.domain_facts.set(atom_id.address);
        *self.changed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::{Answer, AnswerTuple, ExtSourceProperties, InputType, PluginAtom, Query};

    struct FixedValues(Vec<ID>);
    impl PluginAtom for FixedValues {
        fn predicate(&self) -> &str {
            "value"
        }
        fn input_arity(&self) -> usize {
            0
        }
        fn output_arity(&self) -> usize {
            1
        }
        fn input_type(&self, _pos: usize) -> InputType {
            InputType::Constant
        }
        fn ext_source_properties(&self) -> ExtSourceProperties {
            ExtSourceProperties::default()
        }
        fn retrieve(&self, _query: &Query<'_>, answer: &mut Answer, _nogoods: &mut NogoodContainer) -> HexResult<()> {
            for &v in &self.0 {
                answer.tuples.push(AnswerTuple(vec![v]));
            }
            Ok(())
        }
    }

    #[test]
    fn exploration_converts_plugin_outputs_into_domain_facts_and_reaches_a_fixpoint() {
        let reg = Arc::new(Registry::new());
        let value = reg.store_constant("value", false);
        let one = reg.store_constant("1", false);
        let two = reg.store_constant("2", false);
        let x = reg.store_variable("X", false);

        let ea = ExternalAtom {
            predicate: value,
            predicate_name: "value".to_string(),
            inputs: vec![],
            outputs: vec![x],
            aux_input_predicate: None,
            aux_input_mapping: vec![],
        };
        let ea_id = reg.store_external_atom(ea);

        let mut plugins = PluginTable::default();
        plugins.insert(value, Arc::new(FixedValues(vec![one, two])));
        let plugins = Arc::new(plugins);

        let explorer = DomainExplorer::new(reg.clone(), plugins, 16);
        let facts = explorer.explore(&[], &[ea_id], &Interpretation::new()).unwrap();

        let d_pred = reg.aux_constant(aux::AUX_DOMAIN, ea_id).unwrap();
        let d_one = reg.store_ordinary_ground_atom(vec![d_pred, one]);
        let d_two = reg.store_ordinary_ground_atom(vec![d_pred, two]);
        assert!(facts.contains(d_one.address));
        assert!(facts.contains(d_two.address));
        assert_eq!(facts.len(), 2);
    }

    struct PredicateInput;
    impl PluginAtom for PredicateInput {
        fn predicate(&self) -> &str {
            "p"
        }
        fn input_arity(&self) -> usize {
            1
        }
        fn output_arity(&self) -> usize {
            1
        }
        fn input_type(&self, _pos: usize) -> InputType {
            InputType::Predicate
        }
        fn ext_source_properties(&self) -> ExtSourceProperties {
            ExtSourceProperties::default()
        }
        fn retrieve(&self, _query: &Query<'_>, _answer: &mut Answer, _nogoods: &mut NogoodContainer) -> HexResult<()> {
            Ok(())
        }
    }

    #[test]
    fn antimonotonic_input_is_stripped_from_the_view() {
        let reg = Arc::new(Registry::new());
        let plugins = Arc::new(PluginTable::default());
        let explorer = DomainExplorer::new(reg.clone(), plugins, 16);

        let q = reg.store_constant("q", false);
        let a = reg.store_constant("a", false);
        let atom = reg.store_ordinary_ground_atom(vec![q, a]);

        let ea = ExternalAtom {
            predicate: reg.store_constant("p", false),
            predicate_name: "p".to_string(),
            inputs: vec![q],
            outputs: vec![reg.store_variable("X", false)],
            aux_input_predicate: None,
            aux_input_mapping: vec![],
        };

        let mut base = Interpretation::new();
        base.set(atom.address);
        let edb = base.clone();

        let props = ExtSourceProperties {
            antimonotonic_inputs: vec![true],
            ..Default::default()
        };

        let view = explorer.input_restricted_view(&ea, &PredicateInput, &props, &base, &edb);
        assert!(!view.contains(atom.address));
    }

    #[test]
    fn monotonic_input_is_taken_only_from_the_edb() {
        let reg = Arc::new(Registry::new());
        let plugins = Arc::new(PluginTable::default());
        let explorer = DomainExplorer::new(reg.clone(), plugins, 16);

        let q = reg.store_constant("q", false);
        let a = reg.store_constant("a", false);
        let b = reg.store_constant("b", false);
        let atom_a = reg.store_ordinary_ground_atom(vec![q, a]);
        let atom_b = reg.store_ordinary_ground_atom(vec![q, b]);

        let ea = ExternalAtom {
            predicate: reg.store_constant("p", false),
            predicate_name: "p".to_string(),
            inputs: vec![q],
            outputs: vec![reg.store_variable("X", false)],
            aux_input_predicate: None,
            aux_input_mapping: vec![],
        };

        let mut edb = Interpretation::new();
        edb.set(atom_a.address);
        let mut base = edb.clone();
        base.set(atom_b.address);

        let props = ExtSourceProperties {
            monotonic_inputs: vec![true],
            ..Default::default()
        };

        let view = explorer.input_restricted_view(&ea, &PredicateInput, &props, &base, &edb);
        assert!(view.contains(atom_a.address));
        assert!(!view.contains(atom_b.address));
    }
}
