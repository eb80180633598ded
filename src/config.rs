//! Evaluation-wide configuration (§0.3). There is no outer CLI to parse
//! this from — callers construct it directly, the way the teacher builds
//! a `World` via `World::new()` / `World::from_seed(..)`.

use crate::eval_graph::CustomModelGeneratorProvider;
use crate::external::learning::LearningRule;
use crate::external::GuardAtomSource;
use crate::id::ID;
use crate::safety::LiberalSafetyPlugin;
use rustc_hash::FxHashMap;
use std::sync::Arc;

#[derive(Clone)]
pub struct EvalConfig {
    /// §4.5 `ForceGC`: always select GuessAndCheck regardless of the
    /// component's monotonicity.
    pub force_guess_and_check: bool,
    /// §4.10: cache successful per-unit outputs instead of recomputing
    /// them on revisit.
    pub retain_models: bool,
    /// §4.7: fatal if the wellfounded fixpoint exceeds this many rounds.
    pub wellfounded_iteration_cap: usize,
    /// §4.11: bound on domain-exploration outer rounds.
    pub liberal_safety_null_freeze_count: usize,
    /// §6: whether the auxiliary-input predicate is prefixed into
    /// replacement atoms.
    pub include_aux_input_in_auxiliaries: bool,
    /// §4.9: skip learner literals whose direction cannot flip the
    /// outcome given the external atom's declared monotonicity.
    pub external_learning_monotonicity: bool,
    /// §4.8: whether FLP minimality is checked at all.
    pub enable_flp_check: bool,
    /// §4.9: whether support-set nogoods are filtered against guard
    /// atoms before being handed to the solver.
    pub enable_support_set_filtering: bool,
    /// §9: resolves guard atoms for support-set filtering. `None` leaves
    /// support-set nogoods unfiltered.
    pub guard_atom_source: Option<Arc<dyn GuardAtomSource>>,
    /// §4.9: user-supplied `learnFromRule` instances, keyed by the
    /// external atom they apply to.
    pub learning_rules: FxHashMap<ID, Vec<LearningRule>>,
    pub custom_model_generator_provider: Option<Arc<dyn CustomModelGeneratorProvider>>,
    pub liberal_safety_plugins: Vec<Arc<dyn LiberalSafetyPlugin>>,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            force_guess_and_check: false,
            retain_models: true,
            wellfounded_iteration_cap: 10_000,
            liberal_safety_null_freeze_count: 16,
            include_aux_input_in_auxiliaries: true,
            external_learning_monotonicity: true,
            enable_flp_check: true,
            enable_support_set_filtering: true,
            guard_atom_source: None,
            learning_rules: FxHashMap::default(),
            custom_model_generator_provider: None,
            liberal_safety_plugins: Vec::new(),
        }
    }
}

impl EvalConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_force_guess_and_check(mut self, force: bool) -> Self {
        self.force_guess_and_check = force;
        self
    }

    pub fn with_retain_models(mut self, retain: bool) -> Self {
        self.retain_models = retain;
        self
    }

    pub fn with_wellfounded_iteration_cap(mut self, cap: usize) -> Self {
        self.wellfounded_iteration_cap = cap;
        self
    }

    pub fn with_custom_model_generator_provider(
        mut self,
        provider: Arc<dyn CustomModelGeneratorProvider>,
    ) -> Self {
        self.custom_model_generator_provider = Some(provider);
        self
    }

    pub fn with_liberal_safety_plugin(mut self, plugin: Arc<dyn LiberalSafetyPlugin>) -> Self {
        self.liberal_safety_plugins.push(plugin);
        self
    }

    pub fn with_guard_atom_source(mut self, source: Arc<dyn GuardAtomSource>) -> Self {
        self.guard_atom_source = Some(source);
        self
    }

    pub fn with_learning_rule(mut self, ea_id: ID, rule: LearningRule) -> Self {
        self.learning_rules.entry(ea_id).or_default().push(rule);
        self
    }
}
