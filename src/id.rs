//! Interned identifiers: a tagged, totally ordered `(kind, address)` pair.
//!
//! `kind` packs a main kind, a sub-kind, and property flags into one
//! `u32`. `address` indexes into the table the main kind selects. IDs are
//! `Copy` and compare by `(kind, address)`, so two IDs referring to the
//! same registry slot always compare equal regardless of how they were
//! constructed.

use std::fmt;

pub type Address = u32;

// Main kind, bits 30..=31.
const MAIN_SHIFT: u32 = 30;
const MAIN_MASK: u32 = 0b11 << MAIN_SHIFT;
pub const MAINKIND_TERM: u32 = 0 << MAIN_SHIFT;
pub const MAINKIND_ATOM: u32 = 1 << MAIN_SHIFT;
pub const MAINKIND_LITERAL: u32 = 2 << MAIN_SHIFT;
pub const MAINKIND_RULE: u32 = 3 << MAIN_SHIFT;

// Sub kind, bits 26..=29.
const SUB_SHIFT: u32 = 26;
const SUB_MASK: u32 = 0b1111 << SUB_SHIFT;
/// Bits available to property flags (everything below the sub-kind field).
pub const PROPERTY_MASK: u32 = (1 << SUB_SHIFT) - 1;
pub const SUBKIND_CONSTANT: u32 = 0 << SUB_SHIFT;
pub const SUBKIND_INTEGER: u32 = 1 << SUB_SHIFT;
pub const SUBKIND_VARIABLE: u32 = 2 << SUB_SHIFT;
pub const SUBKIND_NESTED: u32 = 3 << SUB_SHIFT;
pub const SUBKIND_ORDINARY_GROUND: u32 = 4 << SUB_SHIFT;
pub const SUBKIND_ORDINARY_NONGROUND: u32 = 5 << SUB_SHIFT;
pub const SUBKIND_BUILTIN: u32 = 6 << SUB_SHIFT;
pub const SUBKIND_AGGREGATE: u32 = 7 << SUB_SHIFT;
pub const SUBKIND_EXTERNAL: u32 = 8 << SUB_SHIFT;
pub const SUBKIND_MODULE: u32 = 9 << SUB_SHIFT;

// Property flags, bits 0..=15.
pub const PROP_NAF: u32 = 1 << 0;
pub const PROP_AUX: u32 = 1 << 1;
pub const PROP_EXTERNAL_AUX: u32 = 1 << 2;
pub const PROP_EXTERNAL_INPUT_AUX: u32 = 1 << 3;
pub const PROP_DISJUNCTIVE: u32 = 1 << 4;
pub const PROP_EXTATOMS_IN_BODY: u32 = 1 << 5;

/// `ID_FAIL` is distinguishable from every real id: no real entity is ever
/// stored with both main-kind bits set in this combination and address
/// `u32::MAX`.
pub const ID_FAIL: ID = ID {
    kind: MAIN_MASK | SUB_MASK,
    address: u32::MAX,
};

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ID {
    pub kind: u32,
    pub address: Address,
}

impl ID {
    pub const fn new(kind: u32, address: Address) -> Self {
        ID { kind, address }
    }

    pub fn main_kind(self) -> u32 {
        self.kind & MAIN_MASK
    }

    pub fn sub_kind(self) -> u32 {
        self.kind & SUB_MASK
    }

    pub fn has_property(self, flag: u32) -> bool {
        self.kind & flag != 0
    }

    pub fn with_property(self, flag: u32) -> Self {
        ID::new(self.kind | flag, self.address)
    }

    pub fn without_property(self, flag: u32) -> Self {
        ID::new(self.kind & !flag, self.address)
    }

    pub fn is_fail(self) -> bool {
        self == ID_FAIL
    }

    pub fn is_term(self) -> bool {
        self.main_kind() == MAINKIND_TERM
    }

    pub fn is_atom(self) -> bool {
        self.main_kind() == MAINKIND_ATOM
    }

    pub fn is_literal(self) -> bool {
        self.main_kind() == MAINKIND_LITERAL
    }

    pub fn is_rule(self) -> bool {
        self.main_kind() == MAINKIND_RULE
    }

    pub fn is_external_atom(self) -> bool {
        self.is_atom() && self.sub_kind() == SUBKIND_EXTERNAL
    }

    pub fn is_ordinary_ground_atom(self) -> bool {
        self.is_atom() && self.sub_kind() == SUBKIND_ORDINARY_GROUND
    }

    pub fn is_aggregate_atom(self) -> bool {
        self.is_atom() && self.sub_kind() == SUBKIND_AGGREGATE
    }

    pub fn is_aux(self) -> bool {
        self.has_property(PROP_AUX)
    }
}

impl fmt::Debug for ID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_fail() {
            return write!(f, "ID_FAIL");
        }
        write!(f, "ID({:#010x},{})", self.kind, self.address)
    }
}
