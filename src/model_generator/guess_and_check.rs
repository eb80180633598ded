//! Guess-and-check model generator (§4.8), ground on
//! `original_source/src/GuessAndCheckModelGenerator.cpp`: the general
//! case, covering disjunction and nonmonotonic inner external atoms via
//! a guess of every inner external atom's truth value, a compatibility
//! check against the real plugin answer, and an optional FLP-minimality
//! verification.

use super::{rewrite_rules, strip_mask, ModelGenerator, ModelGeneratorFactory};
use crate::error::{HexError, HexResult};
use crate::external::cache::EAInputTupleCache;
use crate::external::evaluator::{evaluate_external_atom, EvalParams, VerifyAgainstGuessCallback};
use crate::external::learning::{
    filter_support_sets_by_guard, learn_from_functionality, learn_from_input_output_behavior,
    learn_from_negative_atoms, learn_from_rule, replacement_atom, LearningRule,
};
use crate::external::{Answer, ExtSourceProperties, GuardAtomSource, Nogood, NogoodContainer, PluginTable, Query};
use crate::graph::component::Component;
use crate::id::ID;
use crate::interpretation::Interpretation;
use crate::predicate_mask::ExternalAtomMask;
use crate::registry::aux;
use crate::registry::Registry;
use crate::solver::{solve, GroundProgram};
use crate::term::{Literal, Rule, RuleKind};
use rustc_hash::FxHashMap;
use std::sync::Arc;

pub struct GuessAndCheckModelGeneratorFactory {
    registry: Arc<Registry>,
    plugins: Arc<PluginTable>,
    component: Component,
    ext_props: FxHashMap<ID, ExtSourceProperties>,
    enable_flp_check: bool,
    learning_monotonicity: bool,
    enable_support_set_filtering: bool,
    guard_atom_source: Option<Arc<dyn GuardAtomSource>>,
    learning_rules: FxHashMap<ID, Vec<LearningRule>>,
    xidb: Vec<Rule>,
    gidb: Vec<Rule>,
    flp_markers: FxHashMap<usize, ID>,
}

impl GuessAndCheckModelGeneratorFactory {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: Arc<Registry>,
        plugins: Arc<PluginTable>,
        component: Component,
        ext_props: FxHashMap<ID, ExtSourceProperties>,
        enable_flp_check: bool,
        learning_monotonicity: bool,
        enable_support_set_filtering: bool,
        guard_atom_source: Option<Arc<dyn GuardAtomSource>>,
        learning_rules: FxHashMap<ID, Vec<LearningRule>>,
    ) -> Self {
        let mut rule_ids = component.inner_rules.clone();
        rule_ids.extend(component.inner_constraints.iter().copied());
        let xidb = rewrite_rules(&registry, &rule_ids).unwrap_or_default();

        let gidb = build_guessing_rules(&registry, &component.inner_external_atoms);

        let mut flp_markers = FxHashMap::default();
        for (idx, &rule_id) in rule_ids.iter().enumerate() {
            if let Ok(marker_pred) = registry.aux_constant(aux::AUX_FLP_HEAD, rule_id) {
                let marker_atom = registry.store_ordinary_ground_atom(vec![marker_pred]);
                flp_markers.insert(idx, marker_atom);
            }
        }

        GuessAndCheckModelGeneratorFactory {
            registry,
            plugins,
            component,
            ext_props,
            enable_flp_check,
            learning_monotonicity,
            enable_support_set_filtering,
            guard_atom_source,
            learning_rules,
            xidb,
            gidb,
            flp_markers,
        }
    }
}

/// §4.8 "eatom guessing rules": one disjunctive fact per inner external
/// atom occurrence — `r_p(I,O) ∨ n_p(I,O) ← aux_input(...)` if the atom
/// has an auxiliary-input predicate, else an unconditional disjunctive
/// fact, since at ground level each occurrence already names one
/// concrete input/output tuple.
fn build_guessing_rules(registry: &Registry, inner_eatoms: &[ID]) -> Vec<Rule> {
    let mut rules = Vec::with_capacity(inner_eatoms.len());
    for &ea_id in inner_eatoms {
        let Some(ea) = registry.external_atom(ea_id) else { continue };
        let Some(r_atom) = replacement_atom(registry, ea_id, &ea.inputs, &ea.outputs) else { continue };
        let Ok(n_atom) = registry.swap_external_aux(r_atom) else { continue };

        let body = match ea.aux_input_predicate {
            Some(aux_pred) => vec![Literal::pos(aux_pred)],
            None => Vec::new(),
        };
        rules.push(Rule {
            head: vec![r_atom, n_atom],
            body,
            kind: RuleKind {
                disjunctive: true,
                ..Default::default()
            },
        });
    }
    rules
}

impl ModelGeneratorFactory for GuessAndCheckModelGeneratorFactory {
    fn kind(&self) -> &'static str {
        "guess_and_check"
    }

    fn create_model_generator(&self, input: Option<Interpretation>) -> Box<dyn ModelGenerator> {
        Box::new(GuessAndCheckModelGenerator {
            registry: self.registry.clone(),
            plugins: self.plugins.clone(),
            component: self.component.clone(),
            ext_props: self.ext_props.clone(),
            enable_flp_check: self.enable_flp_check,
            learning_monotonicity: self.learning_monotonicity,
            enable_support_set_filtering: self.enable_support_set_filtering,
            guard_atom_source: self.guard_atom_source.clone(),
            learning_rules: self.learning_rules.clone(),
            xidb: self.xidb.clone(),
            gidb: self.gidb.clone(),
            flp_markers: self.flp_markers.clone(),
            mask: input.clone().unwrap_or_default(),
            seed: input.unwrap_or_default(),
            tuple_cache: EAInputTupleCache::new(),
            edb: None,
            candidates: None,
            next_candidate: 0,
            learned_nogoods: Vec::new(),
            recorded_tuples: FxHashMap::default(),
        })
    }
}

pub struct GuessAndCheckModelGenerator {
    registry: Arc<Registry>,
    plugins: Arc<PluginTable>,
    component: Component,
    ext_props: FxHashMap<ID, ExtSourceProperties>,
    enable_flp_check: bool,
    learning_monotonicity: bool,
    enable_support_set_filtering: bool,
    guard_atom_source: Option<Arc<dyn GuardAtomSource>>,
    learning_rules: FxHashMap<ID, Vec<LearningRule>>,
    xidb: Vec<Rule>,
    gidb: Vec<Rule>,
    flp_markers: FxHashMap<usize, ID>,
    mask: Interpretation,
    seed: Interpretation,
    tuple_cache: EAInputTupleCache,
    edb: Option<Interpretation>,
    candidates: Option<Vec<Interpretation>>,
    next_candidate: usize,
    learned_nogoods: Vec<Nogood>,
    recorded_tuples: FxHashMap<ID, Vec<Vec<ID>>>,
}

impl GuessAndCheckModelGenerator {
    pub fn learned_nogoods(&self) -> &[Nogood] {
        &self.learned_nogoods
    }

    fn integrate_outer_externals(&self, into: &mut Interpretation) -> HexResult<()> {
        let mut nogoods = NogoodContainer::default();
        let outer = self.component.outer_external_atoms.clone();
        for ea_id in outer {
            let Some(ea) = self.registry.external_atom(ea_id) else { continue };
            let Some(plugin) = self.plugins.get(&ea.predicate) else { continue };
            let mut ea_mask = ExternalAtomMask::new(ea_id, &ea);
            ea_mask.collect_output_atoms(&self.registry);
            let snapshot = into.clone();
            let params = EvalParams {
                registry: &self.registry,
                ea_id,
                interpretation: &snapshot,
                assigned: None,
                changed: None,
                plugin: plugin.as_ref(),
                tuple_cache: &self.tuple_cache,
                fingerprint_cache: None,
            };
            let mut callback = crate::external::evaluator::IntegrateCallback::new(into, true);
            evaluate_external_atom(&params, &mut ea_mask, &ea, &mut nogoods, &mut callback)?;
        }
        Ok(())
    }

    /// Violates a previously learned nogood iff every one of its literals
    /// is satisfied by `m` — a cheap conflict check run before the more
    /// expensive compatibility/FLP work (§9: nogoods "prune the search"
    /// one layer above the solver's own clauses, since this reference
    /// solver has no native nogood consumer).
    fn violates_learned_nogood(&self, m: &Interpretation) -> bool {
        self.learned_nogoods.iter().any(|ng| {
            ng.literals
                .iter()
                .all(|lit| m.contains(lit.atom.address) != lit.naf)
        })
    }

    /// §4.8 point 3a: re-evaluates every inner external atom under `m`
    /// and checks that the observed output matches `m`'s guess exactly.
    /// Also runs the input-output-behavior and negative-atom learners so
    /// future candidates can be pruned by `violates_learned_nogood`.
    fn is_compatible(&mut self, m: &Interpretation) -> HexResult<bool> {
        let mut compatible = true;
        let inner = self.component.inner_external_atoms.clone();
        for ea_id in inner {
            let Some(ea) = self.registry.external_atom(ea_id) else { continue };
            let Some(plugin) = self.plugins.get(&ea.predicate) else { continue };
            let props = self.ext_props.get(&ea_id).cloned().unwrap_or_default();

            let mut ea_mask = ExternalAtomMask::new(ea_id, &ea);
            ea_mask.collect_output_atoms(&self.registry);

            let r_atom = replacement_atom(&self.registry, ea_id, &ea.inputs, &ea.outputs)
                .ok_or_else(|| HexError::fatal("guess-and-check: failed to build replacement atom"))?;
            let n_atom = self.registry.swap_external_aux(r_atom)?;

            let mut remaining_guessed_true = Interpretation::new();
            if m.contains(r_atom.address) {
                remaining_guessed_true.set(r_atom.address);
            }
            let mut guessed_false = Interpretation::new();
            if m.contains(n_atom.address) {
                guessed_false.set(r_atom.address);
            }

            let mut nogoods = NogoodContainer::default();
            let params = EvalParams {
                registry: &self.registry,
                ea_id,
                interpretation: m,
                assigned: Some(m),
                changed: None,
                plugin: plugin.as_ref(),
                tuple_cache: &self.tuple_cache,
                fingerprint_cache: None,
            };

            let mut ea_compatible = true;
            {
                let mut callback = VerifyAgainstGuessCallback::new(
                    &mut remaining_guessed_true,
                    &guessed_false,
                    &self.registry,
                );
                evaluate_external_atom(&params, &mut ea_mask, &ea, &mut nogoods, &mut callback)?;
                if !callback.compatible || !remaining_guessed_true.is_empty() {
                    ea_compatible = false;
                }
            }
            if !ea_compatible {
                compatible = false;
            }

            // Learn input-output-behavior / negative-atom nogoods from one
            // direct retrieval, so later candidates can be pruned without
            // re-running the plugin (§4.9's learner table).
            let predicate_input_mask = ea_mask.predicate_input_mask().clone();
            let mut projected = m.clone();
            projected.intersect_with(&predicate_input_mask);
            let query = Query {
                ext_atom_id: ea_id,
                projected_interpretation: &projected,
                inputs: &ea.inputs,
                output_pattern: &ea.outputs,
                predicate_input_mask: &predicate_input_mask,
                assigned: Some(m),
                changed: None,
            };
            let mut answer = Answer::default();
            plugin.retrieve(&query, &mut answer, &mut nogoods)?;
            learn_from_input_output_behavior(&query, &answer, &self.registry, &props, self.learning_monotonicity, &mut nogoods);
            learn_from_negative_atoms(
                &query,
                &answer,
                &self.registry,
                &props,
                &[ea.outputs.clone()],
                self.learning_monotonicity,
                &mut nogoods,
            );
            learn_from_functionality(
                &query,
                &answer,
                &self.registry,
                &props,
                self.recorded_tuples.entry(ea_id).or_default(),
                &mut nogoods,
            );
            if let Some(rules) = self.learning_rules.get(&ea_id) {
                for rule in rules {
                    learn_from_rule(&query, &self.registry, rule, &mut nogoods);
                }
            }

            if props.provides_support_sets {
                let mut support_nogoods = NogoodContainer::default();
                plugin.learn_support_sets(&query, &mut support_nogoods)?;
                let support_nogoods = if self.enable_support_set_filtering {
                    match &self.guard_atom_source {
                        Some(source) => filter_support_sets_by_guard(&self.registry, source.as_ref(), support_nogoods.nogoods),
                        None => support_nogoods.nogoods,
                    }
                } else {
                    support_nogoods.nogoods
                };
                self.learned_nogoods.extend(support_nogoods);
            }

            self.learned_nogoods.extend(nogoods.nogoods);
        }
        Ok(compatible)
    }

    /// §4.8 point 3b: F is the set of FLP-head markers whose rule body is
    /// satisfied by `m` (a direct, deterministic derivation — no search
    /// is needed since rule bodies contain no recursion through F).
    fn flp_heads_derived(&self, m: &Interpretation) -> Interpretation {
        let mut f = Interpretation::new();
        for (idx, rule) in self.xidb.iter().enumerate() {
            let Some(&marker) = self.flp_markers.get(&idx) else { continue };
            let satisfied = rule.body.iter().all(|lit| m.contains(lit.atom.address) != lit.naf);
            if satisfied {
                f.set(marker.address);
            }
        }
        f
    }

    /// §4.8 point 3b: accept iff `m` is a subset-minimal model of its own
    /// FLP reduct, computed by re-solving `EDB ∪ xidbflpbody ∪ (M ∩
    /// guess-aux) ∪ F` and checking the result equals `m` once F is
    /// stripped back out.
    fn passes_flp_check(&self, edb: &Interpretation, m: &Interpretation) -> HexResult<bool> {
        let f = self.flp_heads_derived(m);

        let mut body_program = GroundProgram::new();
        for (idx, rule) in self.xidb.iter().enumerate() {
            let Some(&marker) = self.flp_markers.get(&idx) else { continue };
            let mut body = rule.body.clone();
            body.push(Literal::pos(marker));
            body_program.push(Rule {
                head: rule.head.clone(),
                body,
                kind: rule.kind,
            });
        }

        let mut facts = f.clone();
        facts.union_with(edb);
        for address in m.iter() {
            let atom_id = ID::new(crate::id::MAINKIND_ATOM | crate::id::SUBKIND_ORDINARY_GROUND, address);
            if let Some(atom) = self.registry.ordinary_atom(atom_id) {
                if matches!(
                    self.registry.type_of_aux(atom.predicate()),
                    Some(aux::AUX_REPLACEMENT_POS) | Some(aux::AUX_REPLACEMENT_NEG)
                ) {
                    facts.set(address);
                }
            }
        }

        let candidates = solve(&body_program, &facts)?;
        for mut candidate in candidates {
            candidate.diff_with(&f);
            if &candidate == m {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl ModelGenerator for GuessAndCheckModelGenerator {
    fn next_model(&mut self) -> HexResult<Option<Interpretation>> {
        if self.candidates.is_none() {
            let mut newint = self.seed.clone();
            self.integrate_outer_externals(&mut newint)?;

            let mut program = GroundProgram::new();
            program.rules.extend(self.xidb.iter().cloned());
            program.rules.extend(self.gidb.iter().cloned());

            let candidates = solve(&program, &newint)?;
            self.edb = Some(newint);
            self.candidates = Some(candidates);
            self.next_candidate = 0;
        }

        let candidates = self.candidates.as_ref().unwrap().clone();
        let edb = self.edb.clone().unwrap_or_default();
        while self.next_candidate < candidates.len() {
            let candidate = candidates[self.next_candidate].clone();
            self.next_candidate += 1;

            if self.violates_learned_nogood(&candidate) {
                tracing::trace!(candidate = self.next_candidate - 1, "candidate pruned by learned nogood");
                continue; // SilentDiscard (§7): pruned by a learned nogood
            }
            if !self.is_compatible(&candidate)? {
                tracing::debug!(candidate = self.next_candidate - 1, "candidate guess incompatible with plugin answer");
                continue; // SilentDiscard (§7): incompatible guess
            }
            if self.enable_flp_check && !self.passes_flp_check(&edb, &candidate)? {
                tracing::debug!(candidate = self.next_candidate - 1, "candidate rejected by FLP minimality check");
                continue; // SilentDiscard (§7): rejected by FLP minimality
            }

            let mut stripped = candidate;
            strip_aux_atoms(&self.registry, &mut stripped);
            tracing::debug!(candidate = self.next_candidate - 1, "candidate accepted as a model");
            return Ok(Some(strip_mask(stripped, &self.mask)));
        }

        Ok(None)
    }
}

/// Removes every `r`/`n` replacement atom and FLP marker before a
/// guess-and-check model is handed back to the caller (§4.8 point 3c).
fn strip_aux_atoms(registry: &Registry, m: &mut Interpretation) {
    let addresses: Vec<u32> = m.iter().collect();
    for address in addresses {
        let atom_id = ID::new(crate::id::MAINKIND_ATOM | crate::id::SUBKIND_ORDINARY_GROUND, address);
        let Some(atom) = registry.ordinary_atom(atom_id) else { continue };
        if matches!(
            registry.type_of_aux(atom.predicate()),
            Some(aux::AUX_REPLACEMENT_POS) | Some(aux::AUX_REPLACEMENT_NEG) | Some(aux::AUX_FLP_HEAD)
        ) {
            m.clear(address);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::{AnswerTuple, InputType};
    use crate::term::ExternalAtom;

    struct FixedMember(Vec<ID>);
    impl crate::external::PluginAtom for FixedMember {
        fn predicate(&self) -> &str {
            "member"
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
        fn retrieve(&self, query: &Query<'_>, answer: &mut Answer, _nogoods: &mut NogoodContainer) -> HexResult<()> {
            for &v in &self.0 {
                answer.tuples.push(AnswerTuple(vec![v]));
            }
            let _ = query;
            Ok(())
        }
    }

    fn is_replacement_or_marker(reg: &Registry, addr: u32) -> bool {
        let atom_id = ID::new(crate::id::MAINKIND_ATOM | crate::id::SUBKIND_ORDINARY_GROUND, addr);
        reg.ordinary_atom(atom_id)
            .map(|atom| {
                matches!(
                    reg.type_of_aux(atom.predicate()),
                    Some(aux::AUX_REPLACEMENT_POS) | Some(aux::AUX_REPLACEMENT_NEG) | Some(aux::AUX_FLP_HEAD)
                )
            })
            .unwrap_or(false)
    }

    #[test]
    fn compatible_guess_yields_a_model_with_no_leftover_auxiliaries() {
        let reg = Arc::new(Registry::new());
        let member = reg.store_constant("member", false);
        let one = reg.store_constant("1", false);

        let ea = ExternalAtom {
            predicate: member,
            predicate_name: "member".to_string(),
            inputs: vec![],
            outputs: vec![one],
            aux_input_predicate: None,
            aux_input_mapping: vec![],
        };
        let ea_id = reg.store_external_atom(ea.clone());

        let mut plugins = PluginTable::default();
        plugins.insert(member, Arc::new(FixedMember(vec![one])));
        let plugins = Arc::new(plugins);

        let mut component = Component::default();
        component.inner_external_atoms.push(ea_id);

        let factory = GuessAndCheckModelGeneratorFactory::new(
            reg.clone(),
            plugins,
            component,
            FxHashMap::default(),
            true,
            true,
            true,
            None,
            FxHashMap::default(),
        );

        let mut gen = factory.create_model_generator(None);
        let mut found_one_model = false;
        while let Some(model) = gen.next_model().unwrap() {
            found_one_model = true;
            for addr in model.iter() {
                assert!(!is_replacement_or_marker(&reg, addr));
            }
        }
        assert!(found_one_model);
    }

    #[test]
    fn flp_check_rejects_the_nonminimal_model_of_a_mutual_support_cycle() {
        let reg = Arc::new(Registry::new());
        let plugins = Arc::new(PluginTable::default());

        let a = reg.store_constant("a", false);
        let b = reg.store_constant("b", false);
        let atom_a = reg.store_ordinary_ground_atom(vec![a]);
        let atom_b = reg.store_ordinary_ground_atom(vec![b]);

        // a :- b.  b :- a.
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

        let mut component = Component::default();
        component.inner_rules.push(rule_a);
        component.inner_rules.push(rule_b);
        component.disjunctive_heads = false;
        component.negative_dependency_between_rules = false;

        let factory = GuessAndCheckModelGeneratorFactory::new(
            reg.clone(),
            plugins,
            component,
            FxHashMap::default(),
            true,
            true,
            true,
            None,
            FxHashMap::default(),
        );

        // The classical ASP semantics already reject {a,b} as non-stable
        // (no support without assuming one of them); the reference solver
        // used by this generator's candidate step therefore never even
        // proposes it, and FLP-minimality is exercised vacuously here —
        // what matters is that the only surviving model is empty.
        let mut gen = factory.create_model_generator(None);
        let model = gen.next_model().unwrap();
        assert!(model.is_none() || model.unwrap().is_empty());
    }

    struct SupportSetPlugin {
        guarded_atom: ID,
        plain_atom: ID,
    }
    impl crate::external::PluginAtom for SupportSetPlugin {
        fn predicate(&self) -> &str {
            "member"
        }
        fn input_arity(&self) -> usize {
            0
        }
        fn output_arity(&self) -> usize {
            0
        }
        fn input_type(&self, _pos: usize) -> InputType {
            InputType::Constant
        }
        fn ext_source_properties(&self) -> ExtSourceProperties {
            ExtSourceProperties {
                provides_support_sets: true,
                ..Default::default()
            }
        }
        fn retrieve(&self, _query: &Query<'_>, _answer: &mut Answer, _nogoods: &mut NogoodContainer) -> HexResult<()> {
            Ok(())
        }
        fn learn_support_sets(&self, _query: &Query<'_>, nogoods: &mut NogoodContainer) -> HexResult<()> {
            nogoods.add(Nogood {
                literals: vec![Literal::pos(self.plain_atom), Literal::pos(self.guarded_atom)],
            });
            Ok(())
        }
    }

    fn support_set_generator(
        guard_atom_source: Option<Arc<dyn GuardAtomSource>>,
        enable_support_set_filtering: bool,
    ) -> (Arc<Registry>, ID, GuessAndCheckModelGenerator) {
        let reg = Arc::new(Registry::new());
        let member = reg.store_constant("member", false);
        let p = reg.store_constant("p", false);
        let plain_atom = reg.store_ordinary_ground_atom(vec![p]);
        let guarded_atom = reg.aux_constant(aux::AUX_GUARD, member).unwrap();

        let ea = ExternalAtom {
            predicate: member,
            predicate_name: "member".to_string(),
            inputs: vec![],
            outputs: vec![],
            aux_input_predicate: None,
            aux_input_mapping: vec![],
        };
        let ea_id = reg.store_external_atom(ea);

        let mut plugins = PluginTable::default();
        plugins.insert(
            member,
            Arc::new(SupportSetPlugin { guarded_atom, plain_atom }),
        );
        let plugins = Arc::new(plugins);

        let mut component = Component::default();
        component.inner_external_atoms.push(ea_id);

        let gen = GuessAndCheckModelGenerator {
            registry: reg.clone(),
            plugins,
            component,
            ext_props: FxHashMap::default(),
            enable_flp_check: false,
            learning_monotonicity: true,
            enable_support_set_filtering,
            guard_atom_source,
            learning_rules: FxHashMap::default(),
            xidb: Vec::new(),
            gidb: Vec::new(),
            flp_markers: FxHashMap::default(),
            mask: Interpretation::new(),
            seed: Interpretation::new(),
            tuple_cache: EAInputTupleCache::new(),
            edb: None,
            candidates: None,
            next_candidate: 0,
            learned_nogoods: Vec::new(),
            recorded_tuples: FxHashMap::default(),
        };
        (reg, plain_atom, gen)
    }

    #[test]
    fn held_guard_is_stripped_from_a_learned_support_set() {
        let (_reg, plain_atom, mut gen) =
            support_set_generator(Some(Arc::new(crate::external::AlwaysTrueGuardSource)), true);

        let m = Interpretation::new();
        gen.is_compatible(&m).unwrap();

        assert!(gen.learned_nogoods.iter().any(|ng| {
            ng.literals == [Literal::pos(plain_atom)]
        }));
    }

    #[test]
    fn violated_guard_drops_the_whole_support_set() {
        let (_reg, _plain_atom, mut gen) =
            support_set_generator(Some(Arc::new(crate::external::AlwaysFalseGuardSource)), true);

        let m = Interpretation::new();
        gen.is_compatible(&m).unwrap();

        assert!(gen.learned_nogoods.is_empty());
    }

    #[test]
    fn unfiltered_support_set_passes_through_without_a_guard_source() {
        let (_reg, _plain_atom, mut gen) = support_set_generator(None, true);

        let m = Interpretation::new();
        gen.is_compatible(&m).unwrap();

        assert_eq!(gen.learned_nogoods.len(), 1);
        assert_eq!(gen.learned_nogoods[0].literals.len(), 2);
    }
}
