//! Ground data model: terms, ordinary atoms, external atoms, rules.
//!
//! These types are stored by value in the registry's tables; every
//! cross-reference between them is an [`ID`], never a borrow, so the
//! tables can grow without invalidating anything a model generator holds.

use crate::id::ID;

/// One entry of the term table (§3 "Term").
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Term {
    /// Interned string constant. `aux_…`-prefixed names are reserved for
    /// auxiliary symbols minted by the registry.
    Constant(String),
    /// Address doubles as the integer value for small, commonly used
    /// integers; the canonical text form is the decimal rendering.
    Integer(i64),
    /// Capitalised symbol; `anonymous` marks the `_` wildcard variable.
    Variable { name: String, anonymous: bool },
    /// Function symbol applied to argument IDs, e.g. `f(X,1)`. The
    /// printed form is derived from `symbol` and `args` and re-interned
    /// as a `Constant` so nested terms still have a canonical text key.
    Nested { symbol: String, args: Vec<ID> },
}

impl Term {
    /// Canonical printed form used as the secondary (text) key for
    /// interning. Recursion terminates because `args` are IDs, not terms.
    pub fn canonical_text(&self, print_arg: impl Fn(ID) -> String) -> String {
        match self {
            Term::Constant(s) => s.clone(),
            Term::Integer(i) => i.to_string(),
            Term::Variable { name, .. } => name.clone(),
            Term::Nested { symbol, args } => {
                let rendered: Vec<String> = args.iter().map(|a| print_arg(*a)).collect();
                format!("{}({})", symbol, rendered.join(","))
            }
        }
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, Term::Variable { .. })
    }
}

/// An ordinary atom: a predicate applied to a tuple of argument term IDs.
/// `args[0]` is the predicate symbol's term ID.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OrdinaryAtom {
    pub args: Vec<ID>,
    pub ground: bool,
    /// Canonicalised printed form; the unique secondary key (§3).
    pub text: String,
}

impl OrdinaryAtom {
    pub fn predicate(&self) -> ID {
        self.args[0]
    }

    pub fn arity(&self) -> usize {
        self.args.len() - 1
    }
}

/// A single body literal: an atom id plus a negation-as-failure bit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Literal {
    pub atom: ID,
    pub naf: bool,
}

impl Literal {
    pub fn pos(atom: ID) -> Self {
        Literal { atom, naf: false }
    }

    pub fn neg(atom: ID) -> Self {
        Literal { atom, naf: true }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct RuleKind {
    pub disjunctive: bool,
    pub constraint: bool,
    pub contains_external_atoms: bool,
}

/// Head disjunction + body of literals, interned by structural equality
/// of the (order-irrelevant) head set, the (order-sensitive) body, and
/// `kind`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Rule {
    pub head: Vec<ID>,
    pub body: Vec<Literal>,
    pub kind: RuleKind,
}

impl Rule {
    pub fn is_fact(&self) -> bool {
        self.body.is_empty() && !self.kind.constraint
    }
}

/// `&p[I](O)`: predicate name, input tuple, output pattern, and the
/// optional auxiliary-input machinery described in §3.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ExternalAtom {
    pub predicate: ID,
    pub predicate_name: String,
    pub inputs: Vec<ID>,
    pub outputs: Vec<ID>,
    pub aux_input_predicate: Option<ID>,
    /// For each position of the auxiliary-input tuple, the positions of
    /// `inputs` it feeds into.
    pub aux_input_mapping: Vec<Vec<usize>>,
}

impl ExternalAtom {
    pub fn input_arity(&self) -> usize {
        self.inputs.len()
    }

    pub fn output_arity(&self) -> usize {
        self.outputs.len()
    }
}

/// An aggregate function symbol (`#count`, `#sum`, `#min`, `#max`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AggregateFunction {
    Count,
    Sum,
    Min,
    Max,
}

/// `result_var = #function{ local_variables : body }` (§3 lists
/// `aggregate` as a real sub-kind). `local_variables` are bound only
/// within the comprehension, never by the outer rule — `get_variables_in`'s
/// `include_local_agg` flag controls whether they are reported as part of
/// a rule's free variables.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AggregateAtom {
    pub result_var: ID,
    pub function: AggregateFunction,
    pub local_variables: Vec<ID>,
    pub body: Vec<Literal>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_term_canonical_text() {
        let t = Term::Nested {
            symbol: "f".to_string(),
            args: vec![ID::new(0, 1), ID::new(0, 2)],
        };
        let text = t.canonical_text(|id| format!("t{}", id.address));
        assert_eq!(text, "f(t1,t2)");
    }

    #[test]
    fn literal_polarity_constructors() {
        let atom = ID::new(crate::id::MAINKIND_ATOM, 0);
        assert!(!Literal::pos(atom).naf);
        assert!(Literal::neg(atom).naf);
    }
}
