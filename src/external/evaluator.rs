//! External-atom evaluation protocol (§4.9), ground on
//! `original_source/include/dlvhex2/ExternalLearningHelper.h`: projects
//! the interpretation, enumerates input tuples, calls the plugin,
//! verifies the answer, and integrates it back via a callback.

use super::cache::{EAInputTupleCache, QueryFingerprintCache};
use super::{Answer, NogoodContainer, PluginAtom, Query};
use crate::error::{HexError, HexResult};
use crate::id::ID;
use crate::interpretation::Interpretation;
use crate::predicate_mask::ExternalAtomMask;
use crate::registry::Registry;
use crate::registry::aux;
use crate::term::ExternalAtom;

/// Receives the output of one external-atom evaluation as it streams in
/// (§4.9 point 6): `eatom` once at the start, `input` once per input
/// tuple tried, `output` once per accepted output tuple.
pub trait IntegrationCallback {
    fn eatom(&mut self, ea_id: ID, ea: &ExternalAtom);
    fn input(&mut self, tuple: &[ID]);
    fn output(&mut self, registry: &Registry, ea_id: ID, ea: &ExternalAtom, tuple: &[ID]) -> HexResult<()>;
}

/// Stores an `r`-replacement ground atom for every accepted output
/// tuple, the default callback used by plain/wellfounded model
/// generators and by guess-and-check's compatibility-set construction.
pub struct IntegrateCallback<'a> {
    pub interpretation: &'a mut Interpretation,
    pub include_aux_input_in_auxiliaries: bool,
    current_input: Vec<ID>,
}

impl<'a> IntegrateCallback<'a> {
    pub fn new(interpretation: &'a mut Interpretation, include_aux_input_in_auxiliaries: bool) -> Self {
        IntegrateCallback {
            interpretation,
            include_aux_input_in_auxiliaries,
            current_input: Vec::new(),
        }
    }
}

impl<'a> IntegrationCallback for IntegrateCallback<'a> {
    fn eatom(&mut self, _ea_id: ID, _ea: &ExternalAtom) {}

    fn input(&mut self, tuple: &[ID]) {
        self.current_input = tuple.to_vec();
    }

    fn output(&mut self, registry: &Registry, ea_id: ID, _ea: &ExternalAtom, tuple: &[ID]) -> HexResult<()> {
        let r_pred = registry.aux_constant(aux::AUX_REPLACEMENT_POS, ea_id)?;
        let mut args = vec![r_pred];
        if self.include_aux_input_in_auxiliaries {
            args.extend(self.current_input.iter().copied());
        }
        args.extend_from_slice(tuple);
        let atom_id = registry.store_ordinary_ground_atom(args);
        self.interpretation.set(atom_id.address);
        Ok(())
    }
}

/// Checks a guessed model's `r`-auxiliaries against what the plugin
/// actually produces (§4.8 compatibility testing): clears matched bits
/// from a working copy of the guess's positive set, and records whether
/// any guessed-true tuple went unconfirmed or any guessed-false tuple
/// was produced anyway.
pub struct VerifyAgainstGuessCallback<'a> {
    pub remaining_guessed_true: &'a mut Interpretation,
    pub guessed_false: &'a Interpretation,
    pub registry: &'a Registry,
    pub compatible: bool,
    current_input: Vec<ID>,
}

impl<'a> VerifyAgainstGuessCallback<'a> {
    pub fn new(
        remaining_guessed_true: &'a mut Interpretation,
        guessed_false: &'a Interpretation,
        registry: &'a Registry,
    ) -> Self {
        VerifyAgainstGuessCallback {
            remaining_guessed_true,
            guessed_false,
            registry,
            compatible: true,
            current_input: Vec::new(),
        }
    }
}

impl<'a> IntegrationCallback for VerifyAgainstGuessCallback<'a> {
    fn eatom(&mut self, _ea_id: ID, _ea: &ExternalAtom) {}
    fn input(&mut self, tuple: &[ID]) {
        self.current_input = tuple.to_vec();
    }

    fn output(&mut self, registry: &Registry, ea_id: ID, _ea: &ExternalAtom, tuple: &[ID]) -> HexResult<()> {
        let r_pred = registry.aux_constant(aux::AUX_REPLACEMENT_POS, ea_id)?;
        let mut args = vec![r_pred];
        args.extend(self.current_input.iter().copied());
        args.extend_from_slice(tuple);
        let atom_id = registry.store_ordinary_ground_atom(args);
        if self.guessed_false.contains(atom_id.address) {
            self.compatible = false;
        } else {
            self.remaining_guessed_true.clear(atom_id.address);
        }
        Ok(())
    }
}

pub struct EvalParams<'a> {
    pub registry: &'a Registry,
    pub ea_id: ID,
    pub interpretation: &'a Interpretation,
    pub assigned: Option<&'a Interpretation>,
    pub changed: Option<&'a Interpretation>,
    pub plugin: &'a dyn PluginAtom,
    pub tuple_cache: &'a EAInputTupleCache,
    pub fingerprint_cache: Option<&'a QueryFingerprintCache>,
}

/// Runs §4.9 steps 1-6 for one external atom against one interpretation.
#[tracing::instrument(level = "debug", skip_all, fields(external_atom = %ea.predicate_name))]
pub fn evaluate_external_atom(
    params: &EvalParams<'_>,
    mask: &mut ExternalAtomMask,
    ea: &ExternalAtom,
    nogoods: &mut NogoodContainer,
    callback: &mut dyn IntegrationCallback,
) -> HexResult<()> {
    mask.update(params.registry, ea);
    callback.eatom(params.ea_id, ea);

    let predicate_input_mask = mask.predicate_input_mask().clone();
    let mut projected = params.interpretation.clone();
    projected.intersect_with(&predicate_input_mask);

    let input_tuples = enumerate_input_tuples(params.registry, ea, &projected, params.tuple_cache)?;
    tracing::trace!(input_tuple_count = input_tuples.len(), "enumerated external-atom input tuples");

    let mut output_count = 0usize;
    for inputs in input_tuples {
        callback.input(&inputs);

        let query = Query {
            ext_atom_id: params.ea_id,
            projected_interpretation: &projected,
            inputs: &inputs,
            output_pattern: &ea.outputs,
            predicate_input_mask: &predicate_input_mask,
            assigned: params.assigned,
            changed: params.changed,
        };

        let answer = retrieve_with_cache(params, &query, nogoods)?;

        for tuple in &answer.tuples {
            verify_output_tuple(ea, &tuple.0).map_err(|e| e.with_atom_context(&ea.predicate_name))?;
            callback.output(params.registry, params.ea_id, ea, &tuple.0)?;
            output_count += 1;
        }
    }
    tracing::debug!(output_count, nogoods_learned = nogoods.nogoods.len(), "external-atom evaluation complete");

    Ok(())
}

fn retrieve_with_cache(params: &EvalParams<'_>, query: &Query<'_>, nogoods: &mut NogoodContainer) -> HexResult<Answer> {
    let fingerprint = params.fingerprint_cache.map(|_| {
        let bits: Vec<u32> = query.projected_interpretation.iter().collect();
        QueryFingerprintCache::fingerprint(params.ea_id, &bits, query.inputs)
    });

    if let (Some(cache), Some(fp)) = (params.fingerprint_cache, fingerprint) {
        if let Some(cached) = cache.get(&fp) {
            return Ok(cached);
        }
        let mut answer = Answer::default();
        params.plugin.retrieve(query, &mut answer, nogoods)?;
        cache.insert(fp, &answer);
        return Ok(answer);
    }

    let mut answer = Answer::default();
    params.plugin.retrieve(query, &mut answer, nogoods)?;
    Ok(answer)
}

/// Input tuples for one evaluation call (§4.9 point 3): the atom's
/// declared inputs if there is no auxiliary-input predicate, otherwise
/// one substituted tuple per true bit of the aux-input mask.
fn enumerate_input_tuples(
    registry: &Registry,
    ea: &ExternalAtom,
    projected: &Interpretation,
    cache: &EAInputTupleCache,
) -> HexResult<Vec<Vec<ID>>> {
    let Some(aux_pred) = ea.aux_input_predicate else {
        return Ok(vec![ea.inputs.clone()]);
    };

    let mut tuples = Vec::new();
    for address in projected.iter() {
        let atom_id = ID::new(crate::id::MAINKIND_ATOM | crate::id::SUBKIND_ORDINARY_GROUND, address);
        let Some(atom) = registry.ordinary_atom(atom_id) else { continue };
        if atom.predicate() != aux_pred {
            continue;
        }
        let tuple = cache.get_or_insert_with(address, || {
            let mut inputs = ea.inputs.clone();
            for (aux_pos, targets) in ea.aux_input_mapping.iter().enumerate() {
                if let Some(&value) = atom.args.get(aux_pos + 1) {
                    for &target in targets {
                        if target < inputs.len() {
                            inputs[target] = value;
                        }
                    }
                }
            }
            inputs
        });
        tuples.push(tuple);
    }
    Ok(tuples)
}

/// §4.9 point 5: position-wise unification of one answer tuple against
/// the output pattern. Variables in the pattern match anything; nested
/// terms are not unified structurally (the plugin is trusted to return
/// ground output); constants must match exactly.
fn verify_output_tuple(ea: &ExternalAtom, tuple: &[ID]) -> HexResult<()> {
    if tuple.len() != ea.outputs.len() {
        return Err(HexError::bad_arity(&ea.predicate_name, ea.outputs.len(), tuple.len()));
    }
    for (pattern, value) in ea.outputs.iter().zip(tuple.iter()) {
        if value.sub_kind() == crate::id::SUBKIND_VARIABLE {
            return Err(HexError::returned_variable(&ea.predicate_name));
        }
        if pattern.sub_kind() != crate::id::SUBKIND_VARIABLE && pattern != value {
            return Err(HexError::plugin(
                &ea.predicate_name,
                "returned tuple does not match the declared output pattern",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::{AnswerTuple, ExtSourceProperties, InputType};

    struct ConstantMember;
    impl PluginAtom for ConstantMember {
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
        fn retrieve(&self, _query: &Query<'_>, answer: &mut Answer, _nogoods: &mut NogoodContainer) -> HexResult<()> {
            answer.tuples.push(AnswerTuple(vec![ID::new(crate::id::MAINKIND_TERM, 0)]));
            Ok(())
        }
    }

    #[test]
    fn evaluate_integrates_output_as_replacement_atom() {
        let reg = Registry::new();
        let member = reg.store_constant("member", false);
        let x = reg.store_variable("X", false);
        let ea = ExternalAtom {
            predicate: member,
            predicate_name: "member".to_string(),
            inputs: vec![],
            outputs: vec![x],
            aux_input_predicate: None,
            aux_input_mapping: vec![],
        };
        let ea_id = reg.store_external_atom(ea.clone());
        let mut mask = ExternalAtomMask::new(ea_id, &ea);
        mask.collect_output_atoms(&reg);

        let interp = Interpretation::new();
        let plugin = ConstantMember;
        let tuple_cache = EAInputTupleCache::new();
        let params = EvalParams {
            registry: &reg,
            ea_id,
            interpretation: &interp,
            assigned: None,
            changed: None,
            plugin: &plugin,
            tuple_cache: &tuple_cache,
            fingerprint_cache: None,
        };

        let mut nogoods = NogoodContainer::default();
        let mut out_interp = Interpretation::new();
        let mut callback = IntegrateCallback::new(&mut out_interp, true);
        evaluate_external_atom(&params, &mut mask, &ea, &mut nogoods, &mut callback).unwrap();

        assert_eq!(out_interp.len(), 1);
    }
}
