//! Interning of terms, ordinary atoms, rules, external atoms; minting and
//! inverse-mapping of auxiliary symbols; the auxiliary predicate mask
//! (§4.1). The registry is the sole piece of cross-component shared
//! mutable state (§5): reads take a shared lock, writes an exclusive one
//! held only as long as it takes to intern or mint.

pub mod aux;
mod printer;

use crate::error::{HexError, HexResult};
use crate::id::*;
use crate::interpretation::Interpretation;
use crate::term::{AggregateAtom, ExternalAtom, OrdinaryAtom, Rule};
use aux::AuxTable;
use rustc_hash::FxHashMap;
use std::sync::RwLock;

#[derive(Default)]
struct Inner {
    terms: Vec<crate::term::Term>,
    term_text_index: FxHashMap<String, ID>,

    ordinary_ground_atoms: Vec<OrdinaryAtom>,
    ground_atom_index: FxHashMap<String, ID>,

    ordinary_nonground_atoms: Vec<OrdinaryAtom>,
    nonground_atom_index: FxHashMap<String, ID>,

    external_atoms: Vec<ExternalAtom>,

    aggregates: Vec<AggregateAtom>,

    rules: Vec<Rule>,
    rule_index: FxHashMap<RuleKey, ID>,

    aux: AuxTable,
    aux_predicate_terms: rustc_hash::FxHashSet<ID>,
    aux_ground_atom_mask: Interpretation,
}

#[derive(Clone, PartialEq, Eq, Hash)]
struct RuleKey {
    head: Vec<ID>,
    body: Vec<(ID, bool)>,
    kind: crate::term::RuleKind,
}

impl RuleKey {
    fn of(rule: &Rule) -> Self {
        let mut head = rule.head.clone();
        head.sort();
        head.dedup();
        RuleKey {
            head,
            body: rule.body.iter().map(|l| (l.atom, l.naf)).collect(),
            kind: rule.kind,
        }
    }
}

#[derive(Default)]
pub struct Registry {
    inner: RwLock<Inner>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- terms -----------------------------------------------------

    pub fn store_constant(&self, name: &str, aux: bool) -> ID {
        self.store_term_by_text(
            name,
            crate::term::Term::Constant(name.to_string()),
            SUBKIND_CONSTANT,
            aux,
        )
    }

    pub fn store_integer(&self, value: i64) -> ID {
        let text = value.to_string();
        self.store_term_by_text(
            &text,
            crate::term::Term::Integer(value),
            SUBKIND_INTEGER,
            false,
        )
    }

    pub fn store_variable(&self, name: &str, aux: bool) -> ID {
        let anonymous = name == "_";
        self.store_term_by_text(
            name,
            crate::term::Term::Variable {
                name: name.to_string(),
                anonymous,
            },
            SUBKIND_VARIABLE,
            aux,
        )
    }

    pub fn store_nested_term(&self, symbol: &str, args: Vec<ID>) -> ID {
        let text = {
            let inner = self.inner.read().unwrap();
            let print_arg = |id: ID| self.print_id_locked(&inner, id);
            crate::term::Term::Nested {
                symbol: symbol.to_string(),
                args: args.clone(),
            }
            .canonical_text(print_arg)
        };
        self.store_term_by_text(
            &text,
            crate::term::Term::Nested {
                symbol: symbol.to_string(),
                args,
            },
            SUBKIND_NESTED,
            false,
        )
    }

    fn store_term_by_text(
        &self,
        text: &str,
        term: crate::term::Term,
        sub_kind: u32,
        aux: bool,
    ) -> ID {
        let mut inner = self.inner.write().unwrap();
        if let Some(id) = inner.term_text_index.get(text) {
            return *id;
        }
        let address = inner.terms.len() as Address;
        let mut kind = MAINKIND_TERM | sub_kind;
        if aux {
            kind |= PROP_AUX;
        }
        let id = ID::new(kind, address);
        inner.terms.push(term);
        inner.term_text_index.insert(text.to_string(), id);
        id
    }

    pub fn term(&self, id: ID) -> Option<crate::term::Term> {
        let inner = self.inner.read().unwrap();
        inner.terms.get(id.address as usize).cloned()
    }

    pub fn term_text(&self, id: ID) -> Option<String> {
        let inner = self.inner.read().unwrap();
        Some(self.print_id_locked(&inner, id))
    }

    fn print_id_locked(&self, inner: &Inner, id: ID) -> String {
        match inner.terms.get(id.address as usize) {
            Some(t) => t.canonical_text(|arg| self.print_id_locked(inner, arg)),
            None => format!("{id:?}"),
        }
    }

    // ---- ordinary atoms ---------------------------------------------

    pub fn store_ordinary_ground_atom(&self, args: Vec<ID>) -> ID {
        self.store_ordinary_atom(args, true)
    }

    pub fn store_ordinary_nonground_atom(&self, args: Vec<ID>) -> ID {
        self.store_ordinary_atom(args, false)
    }

    fn store_ordinary_atom(&self, args: Vec<ID>, ground: bool) -> ID {
        let mut inner = self.inner.write().unwrap();
        let text = {
            let parts: Vec<String> = args.iter().map(|a| self.print_id_locked(&inner, *a)).collect();
            if parts.len() == 1 {
                parts[0].clone()
            } else {
                format!("{}({})", parts[0], parts[1..].join(","))
            }
        };
        let (table, index): (&mut Vec<OrdinaryAtom>, &mut FxHashMap<String, ID>) = if ground {
            (&mut inner.ordinary_ground_atoms, &mut inner.ground_atom_index)
        } else {
            (
                &mut inner.ordinary_nonground_atoms,
                &mut inner.nonground_atom_index,
            )
        };
        if let Some(id) = index.get(&text) {
            return *id;
        }
        let address = table.len() as Address;
        let sub_kind = if ground {
            SUBKIND_ORDINARY_GROUND
        } else {
            SUBKIND_ORDINARY_NONGROUND
        };
        let id = ID::new(MAINKIND_ATOM | sub_kind, address);
        let predicate = args[0];
        table.push(OrdinaryAtom {
            args,
            ground,
            text: text.clone(),
        });
        index.insert(text, id);
        if ground && inner.aux_predicate_terms.contains(&predicate) {
            inner.aux_ground_atom_mask.set(address);
        }
        id
    }

    pub fn ordinary_atom(&self, id: ID) -> Option<OrdinaryAtom> {
        let inner = self.inner.read().unwrap();
        self.ordinary_atom_locked(&inner, id)
    }

    fn ordinary_atom_locked(&self, inner: &Inner, id: ID) -> Option<OrdinaryAtom> {
        if !id.is_atom() {
            return None;
        }
        match id.sub_kind() {
            SUBKIND_ORDINARY_GROUND => inner.ordinary_ground_atoms.get(id.address as usize).cloned(),
            SUBKIND_ORDINARY_NONGROUND => inner
                .ordinary_nonground_atoms
                .get(id.address as usize)
                .cloned(),
            _ => None,
        }
    }

    fn ordinary_atom_text(&self, id: ID) -> Option<String> {
        self.ordinary_atom(id).map(|a| a.text)
    }

    pub fn ground_atom_count(&self) -> usize {
        self.inner.read().unwrap().ordinary_ground_atoms.len()
    }

    pub fn ground_atom_ids(&self) -> Vec<ID> {
        let inner = self.inner.read().unwrap();
        (0..inner.ordinary_ground_atoms.len() as Address)
            .map(|a| ID::new(MAINKIND_ATOM | SUBKIND_ORDINARY_GROUND, a))
            .collect()
    }

    // ---- external atoms ----------------------------------------------

    pub fn store_external_atom(&self, ea: ExternalAtom) -> ID {
        let mut inner = self.inner.write().unwrap();
        let address = inner.external_atoms.len() as Address;
        let id = ID::new(MAINKIND_ATOM | SUBKIND_EXTERNAL, address);
        inner.external_atoms.push(ea);
        id
    }

    pub fn external_atom(&self, id: ID) -> Option<ExternalAtom> {
        if !id.is_external_atom() {
            return None;
        }
        let inner = self.inner.read().unwrap();
        inner.external_atoms.get(id.address as usize).cloned()
    }

    // ---- aggregate atoms ------------------------------------------------

    pub fn store_aggregate_atom(&self, agg: AggregateAtom) -> ID {
        let mut inner = self.inner.write().unwrap();
        let address = inner.aggregates.len() as Address;
        let id = ID::new(MAINKIND_ATOM | SUBKIND_AGGREGATE, address);
        inner.aggregates.push(agg);
        id
    }

    pub fn aggregate_atom(&self, id: ID) -> Option<AggregateAtom> {
        if !id.is_aggregate_atom() {
            return None;
        }
        let inner = self.inner.read().unwrap();
        inner.aggregates.get(id.address as usize).cloned()
    }

    // ---- rules ---------------------------------------------------------

    pub fn store_rule(&self, rule: Rule) -> ID {
        let mut inner = self.inner.write().unwrap();
        let key = RuleKey::of(&rule);
        if let Some(id) = inner.rule_index.get(&key) {
            return *id;
        }
        let address = inner.rules.len() as Address;
        let mut kind = MAINKIND_RULE;
        if rule.kind.disjunctive {
            kind |= PROP_DISJUNCTIVE;
        }
        if rule.kind.contains_external_atoms {
            kind |= PROP_EXTATOMS_IN_BODY;
        }
        let id = ID::new(kind, address);
        inner.rules.push(rule);
        inner.rule_index.insert(key, id);
        id
    }

    pub fn rule(&self, id: ID) -> Option<Rule> {
        let inner = self.inner.read().unwrap();
        inner.rules.get(id.address as usize).cloned()
    }

    // ---- auxiliary symbols ---------------------------------------------

    /// Idempotent: the first call for `(ty, source)` mints a fresh
    /// constant; later calls return the same id. Fails loudly on a name
    /// collision with any previously interned symbol — that indicates a
    /// prior bug, not a legitimate race (§4.1).
    pub fn aux_constant(&self, ty: char, source: ID) -> HexResult<ID> {
        if !aux::is_known_aux_type(ty) {
            return Err(HexError::fatal(format!("aux_constant: unknown auxiliary type '{ty}'")));
        }
        {
            let inner = self.inner.read().unwrap();
            if let Some(existing) = inner.aux.lookup(ty, source) {
                return Ok(existing);
            }
        }
        let mut inner = self.inner.write().unwrap();
        if let Some(existing) = inner.aux.lookup(ty, source) {
            return Ok(existing);
        }
        let symbol = AuxTable::symbol_for(ty, source);
        if inner.aux.symbol_is_taken(&symbol) || inner.term_text_index.contains_key(&symbol) {
            return Err(HexError::aux_collision(&symbol));
        }
        let address = inner.terms.len() as Address;
        let id = ID::new(MAINKIND_TERM | SUBKIND_CONSTANT | PROP_AUX, address);
        inner
            .terms
            .push(crate::term::Term::Constant(symbol.clone()));
        inner.term_text_index.insert(symbol.clone(), id);
        inner.aux.insert(ty, source, symbol, id);
        inner.aux_predicate_terms.insert(id);
        Ok(id)
    }

    pub fn id_from_aux_constant(&self, id: ID) -> Option<ID> {
        self.inner.read().unwrap().aux.reverse(id)
    }

    pub fn type_of_aux(&self, id: ID) -> Option<char> {
        self.inner.read().unwrap().aux.type_of(id)
    }

    pub fn aux_ground_atom_mask(&self) -> Interpretation {
        self.inner.read().unwrap().aux_ground_atom_mask.clone()
    }

    /// Given a ground replacement atom over an `r`/`n` auxiliary
    /// predicate, returns the atom over the opposite polarity (minting
    /// it if necessary), preserving argument tuple and kind flags.
    pub fn swap_external_aux(&self, atom_id: ID) -> HexResult<ID> {
        let atom = self
            .ordinary_atom(atom_id)
            .ok_or_else(|| HexError::fatal("swap_external_aux: atom id does not resolve"))?;
        let predicate = atom.predicate();
        let ty = self
            .type_of_aux(predicate)
            .ok_or_else(|| HexError::fatal("swap_external_aux: predicate is not an auxiliary"))?;
        let (opposite_ty, source) = match ty {
            aux::AUX_REPLACEMENT_POS => (
                aux::AUX_REPLACEMENT_NEG,
                self.id_from_aux_constant(predicate).unwrap(),
            ),
            aux::AUX_REPLACEMENT_NEG => (
                aux::AUX_REPLACEMENT_POS,
                self.id_from_aux_constant(predicate).unwrap(),
            ),
            _ => {
                return Err(HexError::fatal(
                    "swap_external_aux: predicate is not a replacement auxiliary",
                ))
            }
        };
        let opposite_predicate = self.aux_constant(opposite_ty, source)?;
        let mut args = atom.args.clone();
        args[0] = opposite_predicate;
        let new_id = self.store_ordinary_ground_atom(args);
        Ok(ID::new(
            new_id.kind | (atom_id.kind & PROPERTY_MASK),
            new_id.address,
        ))
    }

    // ---- variables ------------------------------------------------------

    /// Recursively collects variable term IDs occurring in `id`, which
    /// may be a term, an atom, a rule, or an aggregate atom.
    /// `include_local_agg` controls whether variables bound only inside an
    /// aggregate's own comprehension (`AggregateAtom::local_variables`) are
    /// reported, as opposed to the aggregate's externally-bound
    /// `result_var` and any outer variable it shares with `body` (§4.1).
    pub fn get_variables_in(&self, id: ID, include_anonymous: bool, include_local_agg: bool) -> Vec<ID> {
        let mut out = Vec::new();
        self.collect_variables(id, include_anonymous, include_local_agg, &mut out);
        out
    }

    fn collect_variables(&self, id: ID, include_anonymous: bool, include_local_agg: bool, out: &mut Vec<ID>) {
        if id.is_term() {
            if id.sub_kind() == SUBKIND_VARIABLE {
                if let Some(crate::term::Term::Variable { anonymous, .. }) = self.term(id) {
                    if include_anonymous || !anonymous {
                        if !out.contains(&id) {
                            out.push(id);
                        }
                    }
                }
                return;
            }
            if id.sub_kind() == SUBKIND_NESTED {
                if let Some(crate::term::Term::Nested { args, .. }) = self.term(id) {
                    for a in args {
                        self.collect_variables(a, include_anonymous, include_local_agg, out);
                    }
                }
            }
            return;
        }
        if id.is_atom() {
            if let Some(atom) = self.ordinary_atom(id) {
                for a in &atom.args[1..] {
                    self.collect_variables(*a, include_anonymous, include_local_agg, out);
                }
                return;
            }
            if let Some(ea) = self.external_atom(id) {
                for a in ea.inputs.iter().chain(ea.outputs.iter()) {
                    self.collect_variables(*a, include_anonymous, include_local_agg, out);
                }
                return;
            }
            if let Some(agg) = self.aggregate_atom(id) {
                self.collect_variables(agg.result_var, include_anonymous, include_local_agg, out);
                for lit in &agg.body {
                    let mut body_vars = Vec::new();
                    self.collect_variables(lit.atom, include_anonymous, include_local_agg, &mut body_vars);
                    for v in body_vars {
                        if (include_local_agg || !agg.local_variables.contains(&v)) && !out.contains(&v) {
                            out.push(v);
                        }
                    }
                }
            }
            return;
        }
        if id.is_rule() {
            if let Some(rule) = self.rule(id) {
                for h in &rule.head {
                    self.collect_variables(*h, include_anonymous, include_local_agg, out);
                }
                for lit in &rule.body {
                    self.collect_variables(lit.atom, include_anonymous, include_local_agg, out);
                }
            }
        }
    }

    /// Substitutes `v` with `by` throughout `term`, re-interning nested
    /// terms that change.
    pub fn replace_variables_in_term(&self, term: ID, v: ID, by: ID) -> ID {
        if term == v {
            return by;
        }
        if term.sub_kind() == SUBKIND_NESTED {
            if let Some(crate::term::Term::Nested { symbol, args }) = self.term(term) {
                let new_args: Vec<ID> = args
                    .iter()
                    .map(|a| self.replace_variables_in_term(*a, v, by))
                    .collect();
                if new_args != args {
                    return self.store_nested_term(&symbol, new_args);
                }
            }
        }
        term
    }
}
