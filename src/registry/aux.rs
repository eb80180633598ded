//! Auxiliary-symbol minting and its inverse lookup (§3 "Auxiliary
//! symbols", §6 on-wire format `aux_<type>_<kindhex>_<addrhex>`).

use crate::id::ID;
use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use rustc_hash::FxHashSet;

/// Types used by this crate, per §3: `r`/`n` replacement predicates,
/// `i` auxiliary-input predicate, `f` FLP-check head, `d` domain
/// predicate, `o` ontology/guard. The remaining letters the original
/// reserves (`s,h,q,w,g,c,0`) belong to collaborator plugins this crate
/// does not implement and are accepted by `mint` but never produced by
/// this crate itself.
pub const AUX_REPLACEMENT_POS: char = 'r';
pub const AUX_REPLACEMENT_NEG: char = 'n';
pub const AUX_INPUT: char = 'i';
pub const AUX_FLP_HEAD: char = 'f';
pub const AUX_DOMAIN: char = 'd';
pub const AUX_GUARD: char = 'o';

/// Every type character §3 names, including the ones reserved for
/// collaborators this crate never mints itself. Built once and shared
/// across every `Registry` instance, since the set is a fixed property
/// of the on-wire format rather than per-program state.
static KNOWN_AUX_TYPES: Lazy<FxHashSet<char>> = Lazy::new(|| {
    [
        AUX_REPLACEMENT_POS,
        AUX_REPLACEMENT_NEG,
        AUX_INPUT,
        AUX_FLP_HEAD,
        AUX_DOMAIN,
        AUX_GUARD,
        's', 'h', 'q', 'w', 'g', 'c', '0',
    ]
    .into_iter()
    .collect()
});

/// `true` iff `ty` is one of §3's reserved aux-type characters. A type
/// outside this set would mint a symbol no collaborator could interpret.
pub fn is_known_aux_type(ty: char) -> bool {
    KNOWN_AUX_TYPES.contains(&ty)
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
struct AuxKey {
    ty: char,
    source: ID,
}

#[derive(Default)]
pub struct AuxTable {
    by_key: FxHashMap<AuxKey, ID>,
    by_id: FxHashMap<ID, (char, ID)>,
    symbols: FxHashMap<String, ID>,
}

impl AuxTable {
    pub fn symbol_for(ty: char, source: ID) -> String {
        format!("aux_{}_{:x}_{:x}", ty, source.kind, source.address)
    }

    /// Returns `Some(existing_id)` if `(ty, source)` was minted before.
    pub fn lookup(&self, ty: char, source: ID) -> Option<ID> {
        self.by_key.get(&AuxKey { ty, source }).copied()
    }

    pub fn symbol_is_taken(&self, symbol: &str) -> bool {
        self.symbols.contains_key(symbol)
    }

    /// Records a freshly minted aux id. Caller must have already
    /// verified `!symbol_is_taken(&symbol)`.
    pub fn insert(&mut self, ty: char, source: ID, symbol: String, id: ID) {
        self.by_key.insert(AuxKey { ty, source }, id);
        self.by_id.insert(id, (ty, source));
        self.symbols.insert(symbol, id);
    }

    pub fn reverse(&self, id: ID) -> Option<ID> {
        self.by_id.get(&id).map(|(_, source)| *source)
    }

    pub fn type_of(&self, id: ID) -> Option<char> {
        self.by_id.get(&id).map(|(ty, _)| *ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::{MAINKIND_TERM, SUBKIND_CONSTANT};

    #[test]
    fn insert_then_lookup_round_trips() {
        let mut table = AuxTable::default();
        let source = ID::new(MAINKIND_TERM | SUBKIND_CONSTANT, 7);
        let minted = ID::new(MAINKIND_TERM | SUBKIND_CONSTANT, 99);
        let symbol = AuxTable::symbol_for(AUX_REPLACEMENT_POS, source);

        assert!(table.lookup(AUX_REPLACEMENT_POS, source).is_none());
        table.insert(AUX_REPLACEMENT_POS, source, symbol.clone(), minted);

        assert_eq!(table.lookup(AUX_REPLACEMENT_POS, source), Some(minted));
        assert_eq!(table.reverse(minted), Some(source));
        assert_eq!(table.type_of(minted), Some(AUX_REPLACEMENT_POS));
        assert!(table.symbol_is_taken(&symbol));
    }
}
