//! `PredicateMask` / `ExternalAtomMask` (§4.2), ground on
//! `original_source/src/PredicateMask.cpp`: a bitset kept up to date by
//! rescanning only the atoms added since the last `update()`.

use crate::id::{Address, ID, MAINKIND_ATOM, SUBKIND_ORDINARY_GROUND};
use crate::interpretation::Interpretation;
use crate::registry::Registry;
use crate::term::ExternalAtom;
use rustc_hash::FxHashSet;

pub struct PredicateMask {
    predicates: FxHashSet<ID>,
    mask: Interpretation,
    watermark: Address,
}

impl PredicateMask {
    pub fn new() -> Self {
        PredicateMask {
            predicates: FxHashSet::default(),
            mask: Interpretation::new(),
            watermark: 0,
        }
    }

    pub fn add_predicate(&mut self, p: ID) {
        if self.predicates.insert(p) {
            self.watermark = 0;
        }
    }

    pub fn contains(&self, address: Address) -> bool {
        self.mask.contains(address)
    }

    pub fn mask(&self) -> &Interpretation {
        &self.mask
    }

    /// Scans ground-atom addresses `>= watermark` and sets bits for
    /// matches, then advances the watermark to the current ground-atom
    /// count.
    pub fn update(&mut self, registry: &Registry) {
        let count = registry.ground_atom_count() as Address;
        let mut addr = self.watermark;
        while addr < count {
            let id = ID::new(MAINKIND_ATOM | SUBKIND_ORDINARY_GROUND, addr);
            if let Some(atom) = registry.ordinary_atom(id) {
                if self.predicates.contains(&atom.predicate()) {
                    self.mask.set(addr);
                }
            }
            addr += 1;
        }
        self.watermark = count;
    }
}

impl Default for PredicateMask {
    fn default() -> Self {
        Self::new()
    }
}

/// Specialises `PredicateMask` to watch one external atom's replacement
/// atoms: the final mask includes exactly the `r`/`n` atoms whose
/// argument tuple matches the external atom's input pattern (§4.2.2).
/// `trigger` is a plain `PredicateMask` over the aux-input predicate,
/// used only to detect "an aux-input ground atom newly became true" —
/// the condition under which candidate outputs are worth re-testing.
pub struct ExternalAtomMask {
    trigger: PredicateMask,
    ea_id: ID,
    output_atoms: Vec<ID>,
    mask: Interpretation,
}

impl ExternalAtomMask {
    pub fn new(ea_id: ID, ea: &ExternalAtom) -> Self {
        let mut trigger = PredicateMask::new();
        if let Some(aux_pred) = ea.aux_input_predicate {
            trigger.add_predicate(aux_pred);
        }
        ExternalAtomMask {
            trigger,
            ea_id,
            output_atoms: Vec::new(),
            mask: Interpretation::new(),
        }
    }

    /// Collects, once, the `r`/`n` atoms whose predicate could possibly
    /// refer to this external atom (same source, compatible arity).
    pub fn collect_output_atoms(&mut self, registry: &Registry) {
        self.output_atoms.clear();
        for id in registry.ground_atom_ids() {
            if let Some(atom) = registry.ordinary_atom(id) {
                let predicate = atom.predicate();
                if let Some(source) = registry.id_from_aux_constant(predicate) {
                    if source == self.ea_id {
                        self.output_atoms.push(id);
                    }
                }
            }
        }
    }

    /// Re-tests every candidate output atom against the external atom's
    /// input pattern if the aux-input trigger mask grew since the last
    /// call (position-wise unification: variable positions of the input
    /// pattern match anything, constant positions must match exactly).
    pub fn update(&mut self, registry: &Registry, ea: &ExternalAtom) {
        let before = self.trigger.mask().len();
        self.trigger.update(registry);
        let grew = self.trigger.mask().len() > before;
        if !grew && before > 0 {
            return;
        }
        for out_id in self.output_atoms.clone() {
            let address = out_id.address;
            if self.match_output_atom(registry, ea, out_id) {
                self.mask.set(address);
            } else {
                self.mask.clear(address);
            }
        }
    }

    fn match_output_atom(&self, registry: &Registry, ea: &ExternalAtom, out_id: ID) -> bool {
        let out_atom = match registry.ordinary_atom(out_id) {
            Some(a) => a,
            None => return false,
        };
        let expected_arity = ea.input_arity() + ea.output_arity();
        if out_atom.arity() != expected_arity {
            return false;
        }
        let pattern: Vec<ID> = ea.inputs.iter().chain(ea.outputs.iter()).copied().collect();
        for (p, a) in pattern.iter().zip(out_atom.args[1..].iter()) {
            if p.is_term() && p.sub_kind() == crate::id::SUBKIND_VARIABLE {
                continue;
            }
            if p != a {
                return false;
            }
        }
        true
    }

    pub fn contains(&self, address: Address) -> bool {
        self.mask.contains(address)
    }

    /// The replacement-atom match mask (§4.2.2) — NOT what §4.9 point 2
    /// calls "predicate-input-mask"; see [`Self::predicate_input_mask`].
    pub fn mask(&self) -> &Interpretation {
        &self.mask
    }

    /// The mask over this atom's auxiliary-input predicate, used to
    /// project an interpretation down to what `retrieve` is actually
    /// allowed to see (§4.9 point 2), ground on
    /// `BaseModelGenerator::projectEAtomInputInterpretation`.
    pub fn predicate_input_mask(&self) -> &Interpretation {
        self.trigger.mask()
    }
}
