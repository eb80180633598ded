//! Evaluation graph construction (§4.5), ground on
//! `original_source/src/EvalGraphBuilder.cpp`: turns the component graph
//! into a DAG of evaluation units, each bound to a model-generator
//! factory chosen by the table in §4.5.

use crate::config::EvalConfig;
use crate::external::{ExtSourceProperties, PluginTable};
use crate::graph::component::{Component, ComponentGraph};
use crate::id::ID;
use crate::model_generator::{
    GuessAndCheckModelGeneratorFactory, ModelGeneratorFactory, PlainModelGeneratorFactory,
    WellfoundedModelGeneratorFactory,
};
use crate::registry::Registry;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Overrides the entire §4.5 selection table for a program.
pub trait CustomModelGeneratorProvider: Send + Sync {
    fn factory_for(&self, component: &Component) -> Arc<dyn ModelGeneratorFactory>;
}

pub struct EvalUnitDep {
    pub to: usize,
    pub join_order: u32,
}

pub struct EvalUnit {
    pub component: usize,
    pub factory: Arc<dyn ModelGeneratorFactory>,
    pub depends_on: Vec<EvalUnitDep>,
}

pub struct EvalGraph {
    pub units: Vec<EvalUnit>,
}

impl EvalGraph {
    /// Units in dependency order: every `depends_on` entry names an
    /// earlier index, since `ComponentGraph::build` already orders
    /// components that way and this builder preserves it one unit per
    /// component.
    pub fn topological_order(&self) -> Vec<usize> {
        (0..self.units.len()).collect()
    }
}

/// Builds one evaluation unit per component (no cross-unit collapsing
/// beyond what `ComponentGraph::collapse_components` already performed),
/// selecting a model-generator factory per §4.5's table. `registry` and
/// `plugins` are captured by every factory so later `next_model()` calls
/// need no extra context beyond the input interpretation (§6).
pub fn build_eval_graph(
    cg: &ComponentGraph,
    ext_props: &FxHashMap<ID, ExtSourceProperties>,
    config: &EvalConfig,
    registry: &Arc<Registry>,
    plugins: &Arc<PluginTable>,
) -> EvalGraph {
    let mut units = Vec::with_capacity(cg.components.len());
    for component in &cg.components {
        let factory = select_factory(component, ext_props, config, registry, plugins);
        units.push(EvalUnit {
            component: units.len(),
            factory,
            depends_on: Vec::new(),
        });
    }

    for &(from, to) in &cg.edges {
        let join_order = units[from].depends_on.len() as u32;
        units[from].depends_on.push(EvalUnitDep { to, join_order });
    }

    EvalGraph { units }
}

fn select_factory(
    component: &Component,
    ext_props: &FxHashMap<ID, ExtSourceProperties>,
    config: &EvalConfig,
    registry: &Arc<Registry>,
    plugins: &Arc<PluginTable>,
) -> Arc<dyn ModelGeneratorFactory> {
    if let Some(provider) = &config.custom_model_generator_provider {
        return provider.factory_for(component);
    }

    if component.inner_external_atoms.is_empty() && !config.force_guess_and_check {
        return Arc::new(PlainModelGeneratorFactory::new(
            registry.clone(),
            plugins.clone(),
            component.clone(),
            ext_props.clone(),
        ));
    }

    let wellfounded_eligible = !component.inner_eatoms_nonmonotonic
        && !component.recursive_aggregates
        && !component.negative_dependency_between_rules
        && !component.disjunctive_heads
        && !config.force_guess_and_check;

    if wellfounded_eligible {
        Arc::new(WellfoundedModelGeneratorFactory::new(
            registry.clone(),
            plugins.clone(),
            component.clone(),
            ext_props.clone(),
            config.wellfounded_iteration_cap,
        ))
    } else {
        Arc::new(GuessAndCheckModelGeneratorFactory::new(
            registry.clone(),
            plugins.clone(),
            component.clone(),
            ext_props.clone(),
            config.enable_flp_check,
            config.external_learning_monotonicity,
            config.enable_support_set_filtering,
            config.guard_atom_source.clone(),
            config.learning_rules.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::PluginTable;
    use crate::graph::dependency::DependencyGraph;
    use crate::registry::Registry;
    use crate::term::{Literal, Rule, RuleKind};

    #[test]
    fn component_without_externals_gets_plain_factory() {
        let reg = Arc::new(Registry::new());
        let plugins = Arc::new(PluginTable::default());
        let a = reg.store_constant("a", false);
        let atom_a = reg.store_ordinary_ground_atom(vec![a]);
        let rule = reg.store_rule(Rule {
            head: vec![atom_a],
            body: vec![],
            kind: RuleKind::default(),
        });
        let dep = DependencyGraph::build(&reg, &[rule]);
        let cg = ComponentGraph::build(&reg, &dep, &FxHashMap::default());
        let config = EvalConfig::default();
        let eg = build_eval_graph(&cg, &FxHashMap::default(), &config, &reg, &plugins);
        assert_eq!(eg.units.len(), cg.components.len());
        assert_eq!(eg.units[0].factory.kind(), "plain");
    }

    #[test]
    fn force_guess_and_check_overrides_everything() {
        let reg = Arc::new(Registry::new());
        let plugins = Arc::new(PluginTable::default());
        let a = reg.store_constant("a", false);
        let atom_a = reg.store_ordinary_ground_atom(vec![a]);
        let rule = reg.store_rule(Rule {
            head: vec![atom_a],
            body: vec![],
            kind: RuleKind::default(),
        });
        let dep = DependencyGraph::build(&reg, &[rule]);
        let cg = ComponentGraph::build(&reg, &dep, &FxHashMap::default());
        let config = EvalConfig::default().with_force_guess_and_check(true);
        let eg = build_eval_graph(&cg, &FxHashMap::default(), &config, &reg, &plugins);
        assert_eq!(eg.units[0].factory.kind(), "guess_and_check");
    }

    #[test]
    fn dependency_edges_get_increasing_join_order() {
        let reg = Arc::new(Registry::new());
        let plugins = Arc::new(PluginTable::default());
        let a = reg.store_constant("a", false);
        let b = reg.store_constant("b", false);
        let c = reg.store_constant("c", false);
        let atom_a = reg.store_ordinary_ground_atom(vec![a]);
        let atom_b = reg.store_ordinary_ground_atom(vec![b]);
        let atom_c = reg.store_ordinary_ground_atom(vec![c]);
        let rule_c = reg.store_rule(Rule { head: vec![atom_c], body: vec![], kind: RuleKind::default() });
        let rule_b = reg.store_rule(Rule { head: vec![atom_b], body: vec![], kind: RuleKind::default() });
        let rule_a = reg.store_rule(Rule {
            head: vec![atom_a],
            body: vec![Literal::pos(atom_b), Literal::pos(atom_c)],
            kind: RuleKind::default(),
        });
        let dep = DependencyGraph::build(&reg, &[rule_a, rule_b, rule_c]);
        let cg = ComponentGraph::build(&reg, &dep, &FxHashMap::default());
        let config = EvalConfig::default();
        let eg = build_eval_graph(&cg, &FxHashMap::default(), &config, &reg, &plugins);
        for unit in &eg.units {
            let orders: Vec<u32> = unit.depends_on.iter().map(|d| d.join_order).collect();
            let mut sorted = orders.clone();
            sorted.sort();
            assert_eq!(orders, sorted);
        }
    }
}
