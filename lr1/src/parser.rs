//! Table-driven LR(1) parse driver.

use log::trace;

use crate::collection::Collection;
use crate::error::{ConstructionError, ParseError};
use crate::grammar::Grammar;
use crate::resolver::Resolver;
use crate::symbol::Symbol;

/// One reduction performed while driving a parse: a production's left-hand
/// side replacing its right-hand side on the stack. The sequence of steps
/// returned by a successful [`LR1Parser::parse`] is a rightmost derivation
/// in reverse, enough for a collaborator to build a parse tree without this
/// crate needing to know what a tree looks like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReduceStep {
    /// The non-terminal reduced to.
    pub nonterminal: Symbol,
    /// The right-hand side that was replaced.
    pub production_rhs: Vec<Symbol>,
}

/// An LR(1) parser: a grammar plus its canonical collection, immutable and
/// shareable across concurrent parses. `parse` only mutates a local stack.
#[derive(Debug, Clone)]
pub struct LR1Parser {
    grammar: Grammar,
    collection: Collection,
}

impl LR1Parser {
    /// Builds the canonical collection for `grammar` under `resolver` and
    /// wraps it as a parser.
    pub fn build(grammar: Grammar, resolver: Resolver) -> Result<Self, ConstructionError> {
        let collection = Collection::build(&grammar, resolver)?;
        Ok(Self { grammar, collection })
    }

    /// The grammar this parser was built from.
    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    /// The canonical collection this parser drives over.
    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    /// Drives the shift/reduce loop over `tokens`, appending the
    /// end-of-input marker. Returns the sequence of reductions performed on
    /// acceptance.
    ///
    /// The stack holds alternating symbols and state indices, bottom
    /// sentinel `($, 0)` first. An item for an epsilon production (`A ->
    /// #`) is a reduce item immediately at dot `0` (see [`crate::item`]): it
    /// competes for the lookahead like any other reduce item during
    /// construction, and at parse time it pops zero stack pairs before
    /// pushing the reduced non-terminal and its goto state.
    ///
    /// Returns nothing on acceptance; a collaborator that wants the
    /// rightmost derivation to build a tree from should call
    /// [`LR1Parser::parse_trace`] instead.
    pub fn parse(&self, tokens: &[(Symbol, String)]) -> Result<(), ParseError> {
        self.parse_trace(tokens).map(|_| ())
    }

    /// Same drive loop as [`LR1Parser::parse`], but returns the sequence of
    /// reductions performed (a rightmost derivation in reverse) on
    /// acceptance, for a collaborator that wants to build a parse tree.
    pub fn parse_trace(&self, tokens: &[(Symbol, String)]) -> Result<Vec<ReduceStep>, ParseError> {
        let mut stream: Vec<Symbol> = tokens.iter().map(|(symbol, _)| symbol.clone()).collect();
        stream.push(Symbol::end_marker());

        let mut stack: Vec<(Symbol, usize)> = vec![(Symbol::end_marker(), 0)];
        let mut pos = 0;
        let mut reductions: Vec<ReduceStep> = Vec::new();

        loop {
            let state = stack.last().expect("stack never empties below the bottom sentinel").1;
            let lookahead = stream[pos].clone();

            if let Some(target) = self.collection.state(state).shift_on(&lookahead) {
                trace!("state {state}: shift {lookahead} -> state {target}");
                stack.push((lookahead, target));
                pos += 1;
                continue;
            }

            if let Some(item) = self.collection.state(state).reduce_on(&lookahead) {
                let production = item.production.clone();
                trace!("state {state}: reduce by {production} on lookahead {lookahead}");
                // The epsilon production pops zero stack pairs: nothing was
                // ever shifted for it to begin with.
                let pop_count = if production.is_epsilon() { 0 } else { production.rhs.len() };

                if stack.len() <= pop_count {
                    return Err(ParseError::Internal {
                        message: format!("stack underflow reducing by {production}"),
                    });
                }
                let split = stack.len() - pop_count;
                let popped = stack.split_off(split);
                for (expected, (actual, _)) in production.rhs.iter().zip(popped.iter()) {
                    if expected != actual {
                        return Err(ParseError::Internal {
                            message: format!(
                                "reduce by {production} expected to pop {expected} but found {actual}"
                            ),
                        });
                    }
                }

                let lhs = production.lhs.clone();
                if lhs == *self.collection.start_symbol() && lookahead.is_end_marker() {
                    reductions.push(ReduceStep {
                        nonterminal: lhs,
                        production_rhs: production.rhs,
                    });
                    return Ok(reductions);
                }

                let prior_state = stack.last().expect("bottom sentinel always remains").1;
                let goto_state = self
                    .collection
                    .state(prior_state)
                    .shift_on(&lhs)
                    .ok_or_else(|| ParseError::Internal {
                        message: format!("no goto on {lhs} from state {prior_state}"),
                    })?;
                stack.push((lhs.clone(), goto_state));
                reductions.push(ReduceStep {
                    nonterminal: lhs,
                    production_rhs: production.rhs,
                });
                continue;
            }

            return Err(ParseError::NoTransition { state, lookahead });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Grammar;
    use crate::resolver::{resolve_shift, resolve_throw};
    use std::collections::HashMap;

    fn build(rules: &[&str]) -> (Grammar, LR1Parser) {
        let grammar = Grammar::from_rules(rules.iter().copied()).unwrap();
        let parser = LR1Parser::build(grammar.clone(), resolve_throw()).unwrap();
        (grammar, parser)
    }

    #[test]
    fn s1_accepts_well_formed_input() {
        let (grammar, parser) = build(&["S -> C C", "C -> e C | d"]);
        let tokens = grammar.lex(["edeeed"], &HashMap::new()).unwrap();
        assert!(parser.parse(&tokens).is_ok());

        let tokens = grammar.lex(["dd"], &HashMap::new()).unwrap();
        assert!(parser.parse(&tokens).is_ok());
    }

    #[test]
    fn s1_rejects_malformed_input() {
        let (grammar, parser) = build(&["S -> C C", "C -> e C | d"]);
        let tokens = grammar.lex(["d"], &HashMap::new()).unwrap();
        assert!(parser.parse(&tokens).is_err());

        let tokens = grammar.lex(["edede"], &HashMap::new()).unwrap();
        assert!(parser.parse(&tokens).is_err());
    }

    #[test]
    fn accept_is_the_final_reduction_of_the_original_start_symbol() {
        let (grammar, parser) = build(&["S -> C C", "C -> e C | d"]);
        let tokens = grammar.lex(["dd"], &HashMap::new()).unwrap();
        let reductions = parser.parse_trace(&tokens).unwrap();
        let last = reductions.last().unwrap();
        assert_eq!(last.nonterminal, Symbol::new("S"));
    }

    #[test]
    fn epsilon_productions_are_taken_for_free() {
        let (grammar, parser) = build(&["S -> A b", "A -> a | #"]);
        let tokens = grammar.lex(["b"], &HashMap::new()).unwrap();
        assert!(parser.parse(&tokens).is_ok());

        let tokens = grammar.lex(["a b"], &HashMap::new()).unwrap();
        assert!(parser.parse(&tokens).is_ok());
    }

    #[test]
    fn dangling_else_resolved_by_preferring_shift() {
        let grammar =
            Grammar::from_rules(["S -> if E then S | if E then S else S | other", "E -> e"]).unwrap();
        let parser = LR1Parser::build(grammar.clone(), resolve_shift()).unwrap();
        let tokens = grammar
            .lex(["if e then if e then other else other"], &HashMap::new())
            .unwrap();
        assert!(parser.parse(&tokens).is_ok());
    }

    #[test]
    fn epsilon_vs_shift_conflict_is_settled_by_the_resolver_not_hardcoded_priority() {
        // S -> A a ; A -> a | # : the lone "a" token can only be accepted by
        // treating A as epsilon and shifting "a" for S's own literal, so
        // resolve_reduce (epsilon wins the conflict on lookahead "a") must
        // accept it, while resolve_shift (the literal "a" alternative of A
        // wins instead, leaving nothing for S's trailing "a") must not.
        let grammar = Grammar::from_rules(["S -> A a", "A -> a | #"]).unwrap();

        let reduce_parser = LR1Parser::build(grammar.clone(), crate::resolver::resolve_reduce()).unwrap();
        let tokens = grammar.lex(["a"], &HashMap::new()).unwrap();
        assert!(reduce_parser.parse(&tokens).is_ok());

        let shift_parser = LR1Parser::build(grammar.clone(), resolve_shift()).unwrap();
        let tokens = grammar.lex(["a"], &HashMap::new()).unwrap();
        assert!(shift_parser.parse(&tokens).is_err());
    }

    #[test]
    fn no_transition_reports_state_and_lookahead() {
        let (grammar, parser) = build(&["S -> a b"]);
        let tokens = grammar.lex(["a a"], &HashMap::new()).unwrap();
        match parser.parse(&tokens) {
            Err(ParseError::NoTransition { lookahead, .. }) => {
                assert_eq!(lookahead, Symbol::new("a"));
            }
            other => panic!("expected NoTransition, got {other:?}"),
        }
    }
}
