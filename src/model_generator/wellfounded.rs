//! Wellfounded model generator (§4.7), ground on
//! `original_source/src/GenuineWellfoundedModelGenerator.cpp`: iterates a
//! fixpoint over monotonic inner external atoms until the rewritten IDB's
//! unique answer set stops changing.

use super::{rewrite_rules, strip_mask, ModelGenerator, ModelGeneratorFactory};
use crate::error::{HexError, HexResult};
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

pub struct WellfoundedModelGeneratorFactory {
    registry: Arc<Registry>,
    plugins: Arc<PluginTable>,
    component: Component,
    xidb: Vec<Rule>,
    iteration_cap: usize,
}

impl WellfoundedModelGeneratorFactory {
    pub fn new(
        registry: Arc<Registry>,
        plugins: Arc<PluginTable>,
        component: Component,
        _ext_props: FxHashMap<ID, ExtSourceProperties>,
        iteration_cap: usize,
    ) -> Self {
        let mut rule_ids = component.inner_rules.clone();
        rule_ids.extend(component.inner_constraints.iter().copied());
        let xidb = rewrite_rules(&registry, &rule_ids).unwrap_or_default();
        WellfoundedModelGeneratorFactory {
            registry,
            plugins,
            component,
            xidb,
            iteration_cap,
        }
    }
}

impl ModelGeneratorFactory for WellfoundedModelGeneratorFactory {
    fn kind(&self) -> &'static str {
        "wellfounded"
    }

    fn create_model_generator(&self, input: Option<Interpretation>) -> Box<dyn ModelGenerator> {
        Box::new(WellfoundedModelGenerator {
            registry: self.registry.clone(),
            plugins: self.plugins.clone(),
            component: self.component.clone(),
            xidb: self.xidb.clone(),
            iteration_cap: self.iteration_cap,
            mask: input.clone().unwrap_or_default(),
            seed: input.unwrap_or_default(),
            tuple_cache: EAInputTupleCache::new(),
            exhausted: false,
        })
    }
}

pub struct WellfoundedModelGenerator {
    registry: Arc<Registry>,
    plugins: Arc<PluginTable>,
    component: Component,
    xidb: Vec<Rule>,
    iteration_cap: usize,
    mask: Interpretation,
    seed: Interpretation,
    tuple_cache: EAInputTupleCache,
    exhausted: bool,
}

impl WellfoundedModelGenerator {
    fn integrate_externals(&self, atoms: &[ID], into: &mut Interpretation) -> HexResult<()> {
        let mut nogoods = NogoodContainer::default();
        for &ea_id in atoms {
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

    fn solve_unique(&self, facts: &Interpretation) -> HexResult<Interpretation> {
        let program = GroundProgram {
            rules: self.xidb.clone(),
        };
        let answer_sets = solve(&program, facts)?;
        match answer_sets.len() {
            1 => Ok(answer_sets.into_iter().next().unwrap()),
            0 => Err(HexError::fatal(
                "wellfounded unit's rewritten IDB is inconsistent under the current fixpoint interpretation",
            )),
            n => Err(HexError::wellfounded_nonunique(ID::new(0, 0), n)),
        }
    }
}

impl ModelGenerator for WellfoundedModelGenerator {
    /// §4.7's loop: seed with `EDB ∪ outer-eatom augmentation` done once,
    /// then repeatedly evaluate inner externals against the current
    /// interpretation and re-solve until the rewritten IDB's unique
    /// answer set stops changing. Subsequent calls return no further
    /// model, per §4.7's final line.
    fn next_model(&mut self) -> HexResult<Option<Interpretation>> {
        if self.exhausted {
            return Ok(None);
        }
        self.exhausted = true;

        let mut int = self.seed.clone();
        self.integrate_externals(&self.component.outer_external_atoms.clone(), &mut int)?;

        for round in 0..self.iteration_cap {
            let mut newint = int.clone();
            self.integrate_externals(&self.component.inner_external_atoms.clone(), &mut newint)?;

            let model = self.solve_unique(&newint)?;
            if model == newint {
                tracing::debug!(round, "wellfounded fixpoint converged");
                return Ok(Some(strip_mask(model, &self.mask)));
            }
            int = model;
        }

        tracing::debug!(cap = self.iteration_cap, "wellfounded iteration cap exceeded");
        Err(HexError::wellfounded_limit(ID::new(0, 0), self.iteration_cap))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::{Literal, RuleKind};

    #[test]
    fn transitive_reachability_converges() {
        let reg = Arc::new(Registry::new());
        let plugins = Arc::new(PluginTable::default());

        let edge = reg.store_constant("edge", false);
        let reach = reg.store_constant("reach", false);
        let s = reg.store_constant("s", false);
        let t = reg.store_constant("t", false);
        let u = reg.store_constant("u", false);
        let x = reg.store_variable("X", false);
        let y = reg.store_variable("Y", false);

        let edge_st = reg.store_ordinary_ground_atom(vec![edge, s, t]);
        let edge_tu = reg.store_ordinary_ground_atom(vec![edge, t, u]);
        let reach_s = reg.store_ordinary_ground_atom(vec![reach, s]);

        let edge_xy = reg.store_ordinary_nonground_atom(vec![edge, x, y]);
        let reach_x = reg.store_ordinary_nonground_atom(vec![reach, x]);
        let reach_y = reg.store_ordinary_nonground_atom(vec![reach, y]);

        // reach(X) :- edge(X,Y), reach(Y). (kept non-ground to illustrate
        // intent; the solver only ever sees grounded instances below)
        let _rule_shape = Rule {
            head: vec![reach_x],
            body: vec![Literal::pos(edge_xy), Literal::pos(reach_y)],
            kind: RuleKind::default(),
        };

        // Ground instantiations actually exercised by the wellfounded loop.
        let reach_t = reg.store_ordinary_ground_atom(vec![reach, t]);
        let reach_u = reg.store_ordinary_ground_atom(vec![reach, u]);
        let rule_t = reg.store_rule(Rule {
            head: vec![reach_t],
            body: vec![Literal::pos(edge_st), Literal::pos(reach_s)],
            kind: RuleKind::default(),
        });
        let rule_u = reg.store_rule(Rule {
            head: vec![reach_u],
            body: vec![Literal::pos(edge_tu), Literal::pos(reach_t)],
            kind: RuleKind::default(),
        });

        let mut component = Component::default();
        component.inner_rules.push(rule_t);
        component.inner_rules.push(rule_u);

        let factory = WellfoundedModelGeneratorFactory::new(
            reg.clone(),
            plugins,
            component,
            FxHashMap::default(),
            1000,
        );

        let mut seed = Interpretation::new();
        seed.set(edge_st.address);
        seed.set(edge_tu.address);
        seed.set(reach_s.address);

        let mut gen = factory.create_model_generator(Some(seed));
        let model = gen.next_model().unwrap().unwrap();
        assert!(model.contains(reach_t.address));
        assert!(model.contains(reach_u.address));
        assert!(gen.next_model().unwrap().is_none());
    }
}
