//! External interfaces consumed by the evaluator (§6): the `PluginAtom`
//! trait plugins implement, and the query/answer/nogood types that cross
//! the boundary in §4.9.

pub mod cache;
pub mod evaluator;
pub mod learning;

use crate::error::HexResult;
use crate::id::ID;
use crate::interpretation::Interpretation;
use crate::term::Literal;
use rustc_hash::FxHashMap;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputType {
    Constant,
    Predicate,
    Tuple,
}

/// Declared monotonicity/well-ordering properties of one external atom,
/// consulted by component analysis (§4.3) and by the nogood learners
/// (§4.9).
#[derive(Clone, Debug, Default)]
pub struct ExtSourceProperties {
    /// Per input position: is truth of the output monotonic in this
    /// position's extension?
    pub monotonic_inputs: Vec<bool>,
    pub antimonotonic_inputs: Vec<bool>,
    pub functional: bool,
    /// Prefix length after which output tuples are expected to be
    /// functionally determined, when `functional` is set.
    pub functional_start: usize,
    pub provides_partial_answer: bool,
    pub provides_support_sets: bool,
    /// `(input position, output position)` pairs declared well-ordered
    /// by string length.
    pub well_ordering_by_string_length: Vec<(usize, usize)>,
}

impl ExtSourceProperties {
    pub fn is_monotonic(&self) -> bool {
        self.monotonic_inputs.iter().all(|m| *m)
            && self.antimonotonic_inputs.iter().all(|m| !*m)
    }

    pub fn input_is_monotonic(&self, pos: usize) -> bool {
        self.monotonic_inputs.get(pos).copied().unwrap_or(false)
    }

    pub fn input_is_antimonotonic(&self, pos: usize) -> bool {
        self.antimonotonic_inputs.get(pos).copied().unwrap_or(false)
    }
}

/// One call into a plugin: the projected interpretation, the concrete
/// input tuple, the output pattern, and (for incremental evaluation) the
/// partial-answer hints `assigned`/`changed`.
pub struct Query<'a> {
    pub ext_atom_id: ID,
    pub projected_interpretation: &'a Interpretation,
    pub inputs: &'a [ID],
    pub output_pattern: &'a [ID],
    pub predicate_input_mask: &'a Interpretation,
    pub assigned: Option<&'a Interpretation>,
    pub changed: Option<&'a Interpretation>,
}

/// One output tuple returned by `retrieve`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnswerTuple(pub Vec<ID>);

#[derive(Default, Clone)]
pub struct Answer {
    pub tuples: Vec<AnswerTuple>,
}

/// A signed literal used in a learned nogood (§4.9): `Literal` plus
/// whether it is a replacement-atom literal standing for an external
/// atom's truth (carried so learners can target `r`/`n` auxiliaries
/// specifically).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Nogood {
    pub literals: Vec<Literal>,
}

#[derive(Default)]
pub struct NogoodContainer {
    pub nogoods: Vec<Nogood>,
}

impl NogoodContainer {
    pub fn add(&mut self, nogood: Nogood) {
        self.nogoods.push(nogood);
    }
}

/// The interface a plugin implements to provide one external predicate
/// (§6). Implementors own all I/O and any long-running foreign calls;
/// the core never blocks on anything except `retrieve`/`learn_support_sets`.
pub trait PluginAtom: Send + Sync {
    fn predicate(&self) -> &str;
    fn input_arity(&self) -> usize;
    fn output_arity(&self) -> usize;
    fn input_type(&self, pos: usize) -> InputType;
    fn ext_source_properties(&self) -> ExtSourceProperties;

    fn retrieve(&self, query: &Query<'_>, answer: &mut Answer, nogoods: &mut NogoodContainer) -> HexResult<()>;

    /// Called once per external atom instance if the plugin declares
    /// `provides_support_sets`.
    fn learn_support_sets(&self, _query: &Query<'_>, _nogoods: &mut NogoodContainer) -> HexResult<()> {
        Ok(())
    }
}

/// Resolves a guard atom's truth against an external knowledge source
/// (§9 open question: the ontology/triple-store collaborator is not part
/// of this crate, only this narrow seam is).
pub trait GuardAtomSource: Send + Sync {
    /// `Err` signals the source could not decide (e.g. an inconsistent
    /// Abox) rather than "false" — callers must not conflate the two.
    fn holds(&self, atom: ID) -> Result<bool, String>;
}

pub struct AlwaysTrueGuardSource;
impl GuardAtomSource for AlwaysTrueGuardSource {
    fn holds(&self, _atom: ID) -> Result<bool, String> {
        Ok(true)
    }
}

pub struct AlwaysFalseGuardSource;
impl GuardAtomSource for AlwaysFalseGuardSource {
    fn holds(&self, _atom: ID) -> Result<bool, String> {
        Ok(false)
    }
}

/// Binds each external atom's predicate symbol to the plugin implementing
/// it. Registration itself (loading a `(name, version)` pair) is out of
/// scope (§6); this crate only needs the resulting lookup.
pub type PluginTable = FxHashMap<ID, Arc<dyn PluginAtom>>;
