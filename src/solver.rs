//! A reference ground-ASP solver standing in for "an off-the-shelf ASP
//! solver" (§4.6-§4.8 treat solving as a pluggable step): brute-force
//! candidate enumeration plus GL-reduct minimality checking. Correct, not
//! competitive — real deployments plug a dedicated solver in here.

use crate::error::{HexError, HexResult};
use crate::id::ID;
use crate::interpretation::Interpretation;
use crate::term::{Literal, Rule};
use rustc_hash::FxHashSet;

/// Ground atom universes above this size make the 2^n subset enumeration
/// (used twice: once for candidates, once per candidate for minimality)
/// impractically slow; this solver is for tests and small units, not
/// production grounding sizes.
const MAX_UNIVERSE: usize = 18;

#[derive(Default)]
pub struct GroundProgram {
    pub rules: Vec<Rule>,
}

impl GroundProgram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    fn universe(&self) -> Vec<ID> {
        let mut seen = FxHashSet::default();
        let mut atoms = Vec::new();
        for rule in &self.rules {
            for &h in &rule.head {
                if seen.insert(h) {
                    atoms.push(h);
                }
            }
            for lit in &rule.body {
                if seen.insert(lit.atom) {
                    atoms.push(lit.atom);
                }
            }
        }
        atoms
    }
}

/// Every answer set of `program`, with `facts` additionally forced true
/// in every candidate.
pub fn solve(program: &GroundProgram, facts: &Interpretation) -> HexResult<Vec<Interpretation>> {
    let universe = program.universe();
    if universe.len() > MAX_UNIVERSE {
        return Err(HexError::fatal(format!(
            "reference solver cannot handle a ground program with {} atoms (cap {MAX_UNIVERSE})",
            universe.len()
        )));
    }

    let mut answer_sets = Vec::new();
    for mask in 0u64..(1u64 << universe.len()) {
        let mut candidate = subset_from_mask(&universe, mask);
        candidate.union_with(facts);
        if !satisfies(&program.rules, &candidate, facts) {
            continue;
        }
        if is_stable_model(&universe, program, &candidate, facts) {
            answer_sets.push(candidate);
        }
    }
    Ok(answer_sets)
}

fn subset_from_mask(universe: &[ID], mask: u64) -> Interpretation {
    let mut interp = Interpretation::new();
    for (i, atom) in universe.iter().enumerate() {
        if mask & (1 << i) != 0 {
            interp.set(atom.address);
        }
    }
    interp
}

fn body_satisfied(body: &[Literal], m: &Interpretation) -> bool {
    body.iter().all(|lit| m.contains(lit.atom.address) != lit.naf)
}

fn satisfies(rules: &[Rule], m: &Interpretation, facts: &Interpretation) -> bool {
    if !facts.is_subset_of(m) {
        return false;
    }
    for rule in rules {
        if !body_satisfied(&rule.body, m) {
            continue;
        }
        if rule.head.is_empty() {
            return false; // violated constraint
        }
        if !rule.head.iter().any(|h| m.contains(h.address)) {
            return false;
        }
    }
    true
}

/// GL-reduct of `program` w.r.t. `m`: drops rules whose naf literal is
/// true in `m` (inapplicable), and drops the now-vacuous naf literals
/// from the remaining rules' bodies.
fn reduct(program: &GroundProgram, m: &Interpretation) -> Vec<(Vec<ID>, Vec<ID>)> {
    program
        .rules
        .iter()
        .filter(|rule| !rule.body.iter().any(|lit| lit.naf && m.contains(lit.atom.address)))
        .map(|rule| {
            let positive_body: Vec<ID> = rule.body.iter().filter(|l| !l.naf).map(|l| l.atom).collect();
            (rule.head.clone(), positive_body)
        })
        .collect()
}

fn satisfies_positive(reduct_rules: &[(Vec<ID>, Vec<ID>)], m: &Interpretation, facts: &Interpretation) -> bool {
    if !facts.is_subset_of(m) {
        return false;
    }
    for (head, body) in reduct_rules {
        if !body.iter().all(|a| m.contains(a.address)) {
            continue;
        }
        if head.is_empty() {
            return false;
        }
        if !head.iter().any(|h| m.contains(h.address)) {
            return false;
        }
    }
    true
}

/// `m` is a stable model iff it is a subset-minimal model of its own
/// GL-reduct (the standard Gelfond-Lifschitz stability test).
fn is_stable_model(universe: &[ID], program: &GroundProgram, m: &Interpretation, facts: &Interpretation) -> bool {
    let reduct_rules = reduct(program, m);
    if !satisfies_positive(&reduct_rules, m, facts) {
        return false;
    }

    let m_positions: Vec<usize> = universe
        .iter()
        .enumerate()
        .filter(|(_, a)| m.contains(a.address))
        .map(|(i, _)| i)
        .collect();
    let top = 1u64 << m_positions.len();
    for sub_mask in 0u64..top {
        if sub_mask == top - 1 {
            continue; // m itself, not a strict subset
        }
        let mut candidate = Interpretation::new();
        for (i, &pos) in m_positions.iter().enumerate() {
            if sub_mask & (1 << i) != 0 {
                candidate.set(universe[pos].address);
            }
        }
        if satisfies_positive(&reduct_rules, &candidate, facts) {
            return false;
        }
    }
    true
}
