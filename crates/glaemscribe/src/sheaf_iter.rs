//! Enumerates the token combinations a [`SheafChain`] stands for.
//!
//! Two kinds of breadth are at play, and they behave differently:
//!
//! - Plain (non-pointer) alternation sheaves like `[a/e/i]` each contribute
//!   their full set of alternatives to a Cartesian product computed *within
//!   one cohort step* — several source spellings collapsing onto a single
//!   destination.
//! - Pointer sheaves (`{NAME}`) select exactly one alternative per cohort
//!   step and advance together across steps; they are what produces
//!   parallel many-to-many rules (`a->A`, `e->E`, `i->I`) when the same
//!   variable is referenced on both the source and destination sides.
//!
//! [`Rule::finalize`](crate::rule_group::Rule::finalize) drives both
//! iterators — source and destination — in lockstep by cohort step, pairing
//! *every* source combination of a step with the step's single (first)
//! destination combination, mirroring how the reference engine's rule
//! enumeration behaves.

use crate::error::ModeError;
use crate::sheaf::{fragment_into_token, SheafChain, Token};

pub struct SheafChainIterator<'a> {
    chain: &'a SheafChain,
    cardinality: usize,
    step: usize,
}

impl<'a> SheafChainIterator<'a> {
    /// Build an iterator over `chain`. Every pointer cohort referenced in
    /// the chain must have the same number of alternatives — otherwise
    /// there's no well-defined lockstep cardinality and this is a compile
    /// error.
    pub fn new(chain: &'a SheafChain, line: u32) -> Result<Self, ModeError> {
        let mut cardinality: Option<usize> = None;
        for sheaf in &chain.sheaves {
            if let crate::sheaf::Sheaf::Pointer { cohort, alternatives } = sheaf {
                match cardinality {
                    None => cardinality = Some(alternatives.len()),
                    Some(n) if n == alternatives.len() => {}
                    Some(n) => {
                        return Err(ModeError::compile(
                            line,
                            format!(
                                "pointer cohort '{cohort}' has {} alternatives, expected {n} to match other cohorts in the same chain",
                                alternatives.len()
                            ),
                        ));
                    }
                }
            }
        }
        Ok(SheafChainIterator { chain, cardinality: cardinality.unwrap_or(1), step: 0 })
    }

    pub fn cardinality(&self) -> usize {
        self.cardinality
    }

    /// All token combinations at the current cohort step: the Cartesian
    /// product of every plain alternation sheaf's fragments, with pointer
    /// sheaves fixed to their `step`-th alternative.
    pub fn combinations(&self) -> Vec<Vec<Token>> {
        let mut combos: Vec<Vec<Token>> = vec![Vec::new()];

        for sheaf in &self.chain.sheaves {
            let choices: Vec<Token> = match sheaf {
                crate::sheaf::Sheaf::Alternatives(frags) => {
                    frags.iter().cloned().map(fragment_into_token).collect()
                }
                crate::sheaf::Sheaf::Pointer { alternatives, .. } => {
                    let idx = self.step % alternatives.len().max(1);
                    vec![fragment_into_token(alternatives[idx].clone())]
                }
            };

            let mut next = Vec::with_capacity(combos.len() * choices.len());
            for combo in &combos {
                for choice in &choices {
                    let mut extended = combo.clone();
                    extended.push(choice.clone());
                    next.push(extended);
                }
            }
            combos = next;
        }

        combos
    }

    /// Advance to the next cohort step. Returns `false` once every step has
    /// been consumed (always `false` immediately for a chain with no
    /// pointer cohorts, since there is only ever one step).
    pub fn advance(&mut self) -> bool {
        if self.step + 1 < self.cardinality {
            self.step += 1;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{RuleGroupVar, VarTable};
    use crate::sheaf::parse_chain;

    #[test]
    fn no_pointer_chain_has_single_step() {
        let vars = VarTable::new();
        let chain = parse_chain(&vars, 1, "[a/e/i]").unwrap();
        let iter = SheafChainIterator::new(&chain, 1).unwrap();
        assert_eq!(iter.cardinality(), 1);
        assert_eq!(iter.combinations().len(), 3);
    }

    #[test]
    fn pointer_chain_steps_through_each_alternative() {
        let mut vars = VarTable::new();
        vars.insert(RuleGroupVar::pointer("VOW", "a/e/i"));
        let chain = parse_chain(&vars, 1, "{VOW}").unwrap();
        let mut iter = SheafChainIterator::new(&chain, 1).unwrap();
        assert_eq!(iter.cardinality(), 3);

        let mut seen = Vec::new();
        loop {
            seen.push(iter.combinations()[0][0].as_str().to_string());
            if !iter.advance() {
                break;
            }
        }
        assert_eq!(seen, vec!["a", "e", "i"]);
    }

    #[test]
    fn mismatched_cohort_cardinality_is_an_error() {
        let mut vars = VarTable::new();
        vars.insert(RuleGroupVar::pointer("A", "a/b"));
        vars.insert(RuleGroupVar::pointer("B", "x/y/z"));
        let chain = parse_chain(&vars, 1, "{A}{B}").unwrap();
        assert!(SheafChainIterator::new(&chain, 1).is_err());
    }

    #[test]
    fn plain_alternation_and_pointer_combine_within_a_step() {
        let mut vars = VarTable::new();
        vars.insert(RuleGroupVar::pointer("P", "x/y"));
        let chain = parse_chain(&vars, 1, "[a/b]{P}").unwrap();
        let iter = SheafChainIterator::new(&chain, 1).unwrap();
        // step 0: {a,b} x {x} => 2 combinations, each length 2
        let combos = iter.combinations();
        assert_eq!(combos.len(), 2);
        assert!(combos.iter().all(|c| c.len() == 2));
    }
}
