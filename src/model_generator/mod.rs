//! Model-generator family (§4.5-§4.8), ground on
//! `original_source/src/{PlainModelGenerator,GenuineWellfoundedModelGenerator,GuessAndCheckModelGenerator}.cpp`.
//! The source's `BaseModelGenerator ← Plain|Wellfounded|GuessAndCheck`
//! class hierarchy is modelled here as trait objects: one factory per
//! evaluation unit, each producing a lazy stream of unit-local models.

pub mod guess_and_check;
pub mod plain;
pub mod wellfounded;

pub use guess_and_check::GuessAndCheckModelGeneratorFactory;
pub use plain::PlainModelGeneratorFactory;
pub use wellfounded::WellfoundedModelGeneratorFactory;

use crate::error::{HexError, HexResult};
use crate::external::learning::replacement_atom;
use crate::id::ID;
use crate::interpretation::Interpretation;
use crate::registry::Registry;
use crate::term::{Literal, Rule};

/// One per evaluation unit (§4.5); captures everything a unit's
/// generator needs so `create_model_generator` needs nothing but the
/// input interpretation (§6).
pub trait ModelGeneratorFactory: Send + Sync {
    fn kind(&self) -> &'static str;
    fn create_model_generator(&self, input: Option<Interpretation>) -> Box<dyn ModelGenerator>;
}

/// A lazy, pull-based stream of unit-local models (§5: `next_model` is a
/// suspension point and may invoke the solver or a plugin on every call).
pub trait ModelGenerator {
    fn next_model(&mut self) -> HexResult<Option<Interpretation>>;
}

/// Replaces every external-atom literal in `rule`'s body with a literal
/// over its `r`/`n` replacement atom, preserving naf (§4.6 "rewritten
/// IDB"). Rules reaching a model generator are fully ground, so an
/// external-atom occurrence's declared inputs/outputs are already the
/// concrete tuple this literal denotes.
pub(crate) fn rewrite_rule(registry: &Registry, rule: &Rule) -> HexResult<Rule> {
    let mut body = Vec::with_capacity(rule.body.len());
    for lit in &rule.body {
        if lit.atom.is_external_atom() {
            let ea = registry
                .external_atom(lit.atom)
                .ok_or_else(|| HexError::fatal("literal marked external does not resolve"))?;
            let r_atom = replacement_atom(registry, lit.atom, &ea.inputs, &ea.outputs)
                .ok_or_else(|| HexError::fatal("failed to mint replacement atom while rewriting a rule"))?;
            body.push(Literal { atom: r_atom, naf: lit.naf });
        } else {
            body.push(*lit);
        }
    }
    Ok(Rule {
        head: rule.head.clone(),
        body,
        kind: rule.kind,
    })
}

pub(crate) fn rewrite_rules(registry: &Registry, rule_ids: &[ID]) -> HexResult<Vec<Rule>> {
    rule_ids
        .iter()
        .filter_map(|&id| registry.rule(id))
        .map(|rule| rewrite_rule(registry, &rule))
        .collect()
}

/// Strips `mask`'s bits from `model`, the "remove the input mask" step
/// every generator performs before yielding (§4.6-§4.8).
pub(crate) fn strip_mask(mut model: Interpretation, mask: &Interpretation) -> Interpretation {
    model.diff_with(mask);
    model
}
