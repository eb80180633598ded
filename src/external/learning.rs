//! Conflict-driven nogood learners consulted while a guess-and-check
//! model generator evaluates external atoms (§4.9), ground on
//! `original_source/src/ExternalLearningHelper.cpp`.

use super::{Answer, ExtSourceProperties, GuardAtomSource, Nogood, NogoodContainer, Query};
use crate::id::{Address, ID, MAINKIND_ATOM, SUBKIND_ORDINARY_GROUND};
use crate::registry::aux;
use crate::registry::Registry;
use crate::term::Literal;

pub(crate) fn replacement_atom(registry: &Registry, ea_id: ID, inputs: &[ID], outputs: &[ID]) -> Option<ID> {
    let r_pred = registry.aux_constant(aux::AUX_REPLACEMENT_POS, ea_id).ok()?;
    let mut args = vec![r_pred];
    args.extend_from_slice(inputs);
    args.extend_from_slice(outputs);
    Some(registry.store_ordinary_ground_atom(args))
}

/// Every true bit of the projected interpretation becomes a positive
/// premise literal, except positions declared monotonic/antimonotonic in
/// the direction that cannot flip the outcome (`ExternalLearningMonotonicity`, §4.9).
fn input_premise_literals(
    query: &Query<'_>,
    registry: &Registry,
    props: &ExtSourceProperties,
    skip_by_monotonicity: bool,
) -> Vec<Literal> {
    let mut literals = Vec::new();
    for address in query.projected_interpretation.iter() {
        let atom_id = ID::new(MAINKIND_ATOM | SUBKIND_ORDINARY_GROUND, address);
        let Some(atom) = registry.ordinary_atom(atom_id) else { continue };
        if skip_by_monotonicity {
            let pos = query.inputs.iter().position(|&i| i == atom.predicate());
            if let Some(pos) = pos {
                if props.input_is_monotonic(pos) {
                    continue;
                }
            }
        }
        literals.push(Literal::pos(atom_id));
    }
    literals
}

/// Encodes "this input forces this output": `{premises, ¬r-aux}`.
pub fn learn_from_input_output_behavior(
    query: &Query<'_>,
    answer: &Answer,
    registry: &Registry,
    props: &ExtSourceProperties,
    skip_by_monotonicity: bool,
    nogoods: &mut NogoodContainer,
) {
    for tuple in &answer.tuples {
        let Some(r_atom) = replacement_atom(registry, query.ext_atom_id, query.inputs, &tuple.0) else { continue };
        let mut literals = input_premise_literals(query, registry, props, skip_by_monotonicity);
        literals.push(Literal::neg(r_atom));
        nogoods.add(Nogood { literals });
    }
}

/// If the atom is declared functional after prefix `functional_start`,
/// two distinct outputs sharing that prefix cannot be simultaneously
/// true: `{r-aux(prev), r-aux(new)}`.
pub fn learn_from_functionality(
    query: &Query<'_>,
    answer: &Answer,
    registry: &Registry,
    props: &ExtSourceProperties,
    recorded_tuples: &mut Vec<Vec<ID>>,
    nogoods: &mut NogoodContainer,
) {
    if !props.functional {
        return;
    }
    let prefix = props.functional_start;
    for tuple in &answer.tuples {
        for prev in recorded_tuples.iter() {
            if prev.len() != tuple.0.len() || prev == &tuple.0 {
                continue;
            }
            let shares_prefix = prev.len() >= prefix && tuple.0[..prefix] == prev[..prefix];
            if !shares_prefix {
                continue;
            }
            if let (Some(r_prev), Some(r_new)) = (
                replacement_atom(registry, query.ext_atom_id, query.inputs, prev),
                replacement_atom(registry, query.ext_atom_id, query.inputs, &tuple.0),
            ) {
                nogoods.add(Nogood {
                    literals: vec![Literal::pos(r_prev), Literal::pos(r_new)],
                });
            }
        }
        recorded_tuples.push(tuple.0.clone());
    }
}

/// For each candidate output tuple *absent* from `answer`, encodes "this
/// input forbids this output": `{premises, r-aux}`.
pub fn learn_from_negative_atoms(
    query: &Query<'_>,
    answer: &Answer,
    registry: &Registry,
    props: &ExtSourceProperties,
    candidate_outputs: &[Vec<ID>],
    skip_by_monotonicity: bool,
    nogoods: &mut NogoodContainer,
) {
    for candidate in candidate_outputs {
        if answer.tuples.iter().any(|t| &t.0 == candidate) {
            continue;
        }
        let Some(r_atom) = replacement_atom(registry, query.ext_atom_id, query.inputs, candidate) else { continue };
        let mut literals = input_premise_literals(query, registry, props, skip_by_monotonicity);
        literals.push(Literal::pos(r_atom));
        nogoods.add(Nogood { literals });
    }
}

/// A user-supplied learning rule of the form `out(X) :- in1(X), not in2(X).`
/// (§4.9): whenever `in1`'s argument is true and `in2`'s is not, the
/// external atom's output at that argument is forced true.
#[derive(Clone)]
pub struct LearningRule {
    pub positive_input_predicate: ID,
    pub negative_input_predicate: Option<ID>,
}

/// Grounds `rule` over every element of `positive_input_predicate`'s
/// extension within the projected interpretation (`learnFromRule`).
pub fn learn_from_rule(query: &Query<'_>, registry: &Registry, rule: &LearningRule, nogoods: &mut NogoodContainer) {
    for address in query.projected_interpretation.iter() {
        ground_one(query, registry, rule, address, nogoods);
    }
}

/// Same derivation restricted to one already-ground instantiation
/// (`learnFromGroundRule`).
pub fn learn_from_ground_rule(query: &Query<'_>, registry: &Registry, rule: &LearningRule, address: Address, nogoods: &mut NogoodContainer) {
    ground_one(query, registry, rule, address, nogoods);
}

fn ground_one(query: &Query<'_>, registry: &Registry, rule: &LearningRule, address: Address, nogoods: &mut NogoodContainer) {
    let atom_id = ID::new(MAINKIND_ATOM | SUBKIND_ORDINARY_GROUND, address);
    let Some(atom) = registry.ordinary_atom(atom_id) else { return };
    if atom.predicate() != rule.positive_input_predicate {
        return;
    }
    let Some(&arg) = atom.args.get(1) else { return };

    if let Some(neg_pred) = rule.negative_input_predicate {
        let negated_holds = query.projected_interpretation.iter().any(|a| {
            let id = ID::new(MAINKIND_ATOM | SUBKIND_ORDINARY_GROUND, a);
            registry
                .ordinary_atom(id)
                .map(|other| other.predicate() == neg_pred && other.args.get(1) == Some(&arg))
                .unwrap_or(false)
        });
        if negated_holds {
            return;
        }
    }

    let Some(r_atom) = replacement_atom(registry, query.ext_atom_id, query.inputs, &[arg]) else { return };
    nogoods.add(Nogood {
        literals: vec![Literal::pos(atom_id), Literal::neg(r_atom)],
    });
}

/// Support-set learning (§4.9): the plugin's general nogoods are
/// filtered against guard atoms (auxiliary symbols of type `o`) by
/// asking `guard_source` whether the guard holds. A held guard is
/// removed from its nogood (it is now tautologically satisfied); a
/// violated guard drops the whole nogood; an inconsistent verdict keeps
/// the guard unfiltered and is logged, per §9's inherited placeholder
/// behaviour.
pub fn filter_support_sets_by_guard(registry: &Registry, guard_source: &dyn GuardAtomSource, support_sets: Vec<Nogood>) -> Vec<Nogood> {
    let mut kept = Vec::with_capacity(support_sets.len());
    for mut nogood in support_sets {
        let mut filtered = Vec::with_capacity(nogood.literals.len());
        let mut dropped = false;
        for lit in nogood.literals.drain(..) {
            if registry.type_of_aux(lit.atom) != Some(aux::AUX_GUARD) {
                filtered.push(lit);
                continue;
            }
            match guard_source.holds(lit.atom) {
                Ok(true) => {}
                Ok(false) => {
                    dropped = true;
                    break;
                }
                Err(_) => {
                    tracing::warn!("support-set filtering skipped: guard source reported inconsistency");
                    filtered.push(lit);
                }
            }
        }
        if !dropped {
            kept.push(Nogood { literals: filtered });
        }
    }
    kept
}
