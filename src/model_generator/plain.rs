//! Plain model generator (§4.6), ground on
//! `original_source/src/PlainModelGenerator.cpp`: for units without inner
//! external atoms, only outer externals need evaluating before the
//! (possibly empty) rewritten IDB is solved.

use super::{rewrite_rules, strip_mask, ModelGenerator, ModelGeneratorFactory};
use crate::error::HexResult;
use crate::external::cache::EAInputTupleCache;
use crate::external::evaluator::{evaluate_external_atom, EvalParams, IntegrateCallback};
use crate::external::{ExtSourceProperties, NogoodContainer, PluginTable};
use crate::graph::component::Component;
use crate::id::ID;
use crate::interpretation::Interpretation;
use crate::predicate_mask::ExternalAtomMask;
use crate::registry::Registry;
use crate::solver::{solve, GroundProgram};
use crate::term::Rule;
use rustc_hash::FxHashMap;
use std::sync::Arc;

pub struct PlainModelGeneratorFactory {
    registry: Arc<Registry>,
    plugins: Arc<PluginTable>,
    component: Component,
    ext_props: FxHashMap<ID, ExtSourceProperties>,
    xidb: Vec<Rule>,
}

impl PlainModelGeneratorFactory {
    pub fn new(
        registry: Arc<Registry>,
        plugins: Arc<PluginTable>,
        component: Component,
        ext_props: FxHashMap<ID, ExtSourceProperties>,
    ) -> Self {
        let mut rule_ids = component.inner_rules.clone();
        rule_ids.extend(component.inner_constraints.iter().copied());
        let xidb = rewrite_rules(&registry, &rule_ids).unwrap_or_default();
        PlainModelGeneratorFactory {
            registry,
            plugins,
            component,
            ext_props,
            xidb,
        }
    }
}

impl ModelGeneratorFactory for PlainModelGeneratorFactory {
    fn kind(&self) -> &'static str {
        "plain"
    }

    fn create_model_generator(&self, input: Option<Interpretation>) -> Box<dyn ModelGenerator> {
        Box::new(PlainModelGenerator {
            registry: self.registry.clone(),
            plugins: self.plugins.clone(),
            component: self.component.clone(),
            xidb: self.xidb.clone(),
            mask: input.clone().unwrap_or_default(),
            seed: input.unwrap_or_default(),
            tuple_cache: EAInputTupleCache::new(),
            exhausted: false,
        })
    }
}

pub struct PlainModelGenerator {
    registry: Arc<Registry>,
    plugins: Arc<PluginTable>,
    component: Component,
    xidb: Vec<Rule>,
    mask: Interpretation,
    seed: Interpretation,
    tuple_cache: EAInputTupleCache,
    exhausted: bool,
}

impl PlainModelGenerator {
    /// §4.6 point 2: evaluate every outer external atom against `into`
    /// and fold their replacement atoms back in.
    fn integrate_outer_externals(&self, into: &mut Interpretation) -> HexResult<()> {
        let mut nogoods = NogoodContainer::default();
        for &ea_id in &self.component.outer_external_atoms {
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
            let mut callback = IntegrateCallback::new(into, true);
            evaluate_external_atom(&params, &mut ea_mask, &ea, &mut nogoods, &mut callback)?;
        }
        Ok(())
    }
}

impl ModelGenerator for PlainModelGenerator {
    fn next_model(&mut self) -> HexResult<Option<Interpretation>> {
        if self.exhausted {
            return Ok(None);
        }
        self.exhausted = true;

        let mut newint = self.seed.clone();
        self.integrate_outer_externals(&mut newint)?;

        if self.xidb.is_empty() {
            return Ok(Some(strip_mask(newint, &self.mask)));
        }

        let program = GroundProgram { rules: self.xidb.clone() };
        let answer_sets = solve(&program, &newint)?;
        match answer_sets.into_iter().next() {
            Some(model) => Ok(Some(strip_mask(model, &self.mask))),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::{Literal, RuleKind};

    #[test]
    fn no_idb_yields_seed_minus_mask() {
        let reg = Arc::new(Registry::new());
        let plugins = Arc::new(PluginTable::default());
        let a = reg.store_constant("a", false);
        let atom_a = reg.store_ordinary_ground_atom(vec![a]);

        let component = Component::default();
        let factory = PlainModelGeneratorFactory::new(reg.clone(), plugins, component, FxHashMap::default());

        let mut seed = Interpretation::new();
        seed.set(atom_a.address);
        let mut gen = factory.create_model_generator(Some(seed));
        let model = gen.next_model().unwrap().unwrap();
        assert!(model.is_empty());
        assert!(gen.next_model().unwrap().is_none());
    }

    #[test]
    fn solves_inner_rules_over_seed() {
        let reg = Arc::new(Registry::new());
        let plugins = Arc::new(PluginTable::default());
        let a = reg.store_constant("a", false);
        let b = reg.store_constant("b", false);
        let atom_a = reg.store_ordinary_ground_atom(vec![a]);
        let atom_b = reg.store_ordinary_ground_atom(vec![b]);
        let rule_id = reg.store_rule(Rule {
            head: vec![atom_b],
            body: vec![Literal::pos(atom_a)],
            kind: RuleKind::default(),
        });

        let mut component = Component::default();
        component.inner_rules.push(rule_id);

        let factory = PlainModelGeneratorFactory::new(reg.clone(), plugins, component, FxHashMap::default());
        let mut seed = Interpretation::new();
        seed.set(atom_a.address);
        let mut gen = factory.create_model_generator(Some(seed));
        let model = gen.next_model().unwrap().unwrap();
        assert!(!model.contains(atom_a.address));
        assert!(model.contains(atom_b.address));
    }
}
