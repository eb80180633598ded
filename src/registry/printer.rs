//! Minimal analogue of the original's `Printhelpers.h`: renders an [`ID`]
//! back to ground-atom text for debug output, `tracing` fields, and
//! `HexError` messages. Not a general pretty-printer — no alignment or
//! tabular output, just enough to make a nogood or rejected model
//! readable.

use super::Registry;
use crate::id::ID;

impl Registry {
    pub fn print_id(&self, id: ID) -> String {
        if id.is_fail() {
            return "ID_FAIL".to_string();
        }
        if id.is_term() {
            return self
                .term_text(id)
                .unwrap_or_else(|| format!("{id:?}"));
        }
        if id.is_atom() {
            if let Some(text) = self.ordinary_atom_text(id) {
                return text;
            }
            if let Some(text) = self.external_atom_text(id) {
                return text;
            }
        }
        format!("{id:?}")
    }

    pub fn print_literal(&self, lit: crate::term::Literal) -> String {
        if lit.naf {
            format!("not {}", self.print_id(lit.atom))
        } else {
            self.print_id(lit.atom)
        }
    }

    pub fn print_interpretation(&self, interp: &crate::interpretation::Interpretation) -> String {
        let atoms: Vec<String> = interp
            .iter()
            .map(|addr| self.print_id(ID::new(crate::id::MAINKIND_ATOM | crate::id::SUBKIND_ORDINARY_GROUND, addr)))
            .collect();
        format!("{{{}}}", atoms.join(", "))
    }

    fn external_atom_text(&self, id: ID) -> Option<String> {
        if !id.is_external_atom() {
            return None;
        }
        let ea = self.external_atom(id)?;
        let inputs: Vec<String> = ea.inputs.iter().map(|i| self.print_id(*i)).collect();
        let outputs: Vec<String> = ea.outputs.iter().map(|o| self.print_id(*o)).collect();
        Some(format!(
            "&{}[{}]({})",
            ea.predicate_name,
            inputs.join(","),
            outputs.join(",")
        ))
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        f.debug_struct("Registry")
            .field("terms", &inner.terms.len())
            .field("ordinary_ground_atoms", &inner.ordinary_ground_atoms.len())
            .field("ordinary_nonground_atoms", &inner.ordinary_nonground_atoms.len())
            .field("external_atoms", &inner.external_atoms.len())
            .field("rules", &inner.rules.len())
            .finish()
    }
}
