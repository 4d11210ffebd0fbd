//! Computes the nullable set, FIRST sets, and FOLLOW sets of a grammar as
//! monotone fixpoints.

use std::collections::{HashMap, HashSet};

use log::{debug, trace};

use crate::grammar::Grammar;
use crate::symbol::Symbol;

/// Returns the set of non-terminals that derive the empty string.
pub fn nullable(grammar: &Grammar) -> HashSet<Symbol> {
    let mut nullable: HashSet<Symbol> = HashSet::new();
    let mut pass = 0;

    loop {
        let before = nullable.len();
        pass += 1;

        for nt in grammar.nonterms() {
            if nullable.contains(nt) {
                continue;
            }
            let derives_empty = grammar.productions_for(nt).iter().any(|production| {
                production.is_epsilon()
                    || production
                        .rhs
                        .iter()
                        .all(|symbol| grammar.is_nonterminal(symbol) && nullable.contains(symbol))
            });
            if derives_empty {
                nullable.insert(nt.clone());
            }
        }

        trace!("nullable fixpoint pass {pass}: {} nullable so far", nullable.len());
        if nullable.len() == before {
            debug!("nullable converged after {pass} passes: {nullable:?}");
            return nullable;
        }
    }
}

/// Returns `FIRST(X)` for every non-terminal `X`, including the epsilon
/// symbol when `X` is nullable.
pub fn first_sets(grammar: &Grammar, nullable: &HashSet<Symbol>) -> HashMap<Symbol, HashSet<Symbol>> {
    let mut first: HashMap<Symbol, HashSet<Symbol>> =
        grammar.nonterms().iter().map(|nt| (nt.clone(), HashSet::new())).collect();

    loop {
        let before: usize = first.values().map(HashSet::len).sum();

        for production in grammar.all_productions() {
            if production.is_epsilon() {
                first.get_mut(&production.lhs).unwrap().insert(Symbol::epsilon());
                continue;
            }

            let mut whole_rhs_nullable = true;
            for symbol in &production.rhs {
                if grammar.is_terminal(symbol) {
                    first.get_mut(&production.lhs).unwrap().insert(symbol.clone());
                    whole_rhs_nullable = false;
                    break;
                }

                // symbol is a non-terminal.
                let symbol_first: Vec<Symbol> = first
                    .get(symbol)
                    .map(|set| set.iter().filter(|s| !s.is_epsilon()).cloned().collect())
                    .unwrap_or_default();
                first.get_mut(&production.lhs).unwrap().extend(symbol_first);

                if !nullable.contains(symbol) {
                    whole_rhs_nullable = false;
                    break;
                }
            }

            if whole_rhs_nullable {
                first.get_mut(&production.lhs).unwrap().insert(Symbol::epsilon());
            }
        }

        let after: usize = first.values().map(HashSet::len).sum();
        if after == before {
            debug!("first sets converged, {after} total terminals across all sets");
            return first;
        }
    }
}

/// Returns `FOLLOW(X)` for every non-terminal `X`. `FOLLOW(start)` always
/// contains the end-of-input marker.
pub fn follow_sets(
    grammar: &Grammar,
    nullable: &HashSet<Symbol>,
    first: &HashMap<Symbol, HashSet<Symbol>>,
) -> HashMap<Symbol, HashSet<Symbol>> {
    let mut follow: HashMap<Symbol, HashSet<Symbol>> =
        grammar.nonterms().iter().map(|nt| (nt.clone(), HashSet::new())).collect();
    follow.get_mut(grammar.start()).unwrap().insert(Symbol::end_marker());

    loop {
        let before: usize = follow.values().map(HashSet::len).sum();

        for production in grammar.all_productions() {
            for (i, symbol) in production.rhs.iter().enumerate() {
                if !grammar.is_nonterminal(symbol) {
                    continue;
                }

                let beta = &production.rhs[i + 1..];
                let beta_first = first_of_sequence(beta, grammar, nullable, first);
                follow
                    .get_mut(symbol)
                    .unwrap()
                    .extend(beta_first.iter().filter(|s| !s.is_epsilon()).cloned());

                if beta.is_empty() || beta.iter().all(|s| nullable.contains(s)) {
                    let lhs_follow: Vec<Symbol> = follow.get(&production.lhs).unwrap().iter().cloned().collect();
                    follow.get_mut(symbol).unwrap().extend(lhs_follow);
                }
            }
        }

        let after: usize = follow.values().map(HashSet::len).sum();
        if after == before {
            debug!("follow sets converged, {after} total terminals across all sets");
            return follow;
        }
    }
}

/// `FIRST` of a sequence of symbols (a production's right-hand side, or a
/// suffix of one): the union of `FIRST` of each symbol up to and including
/// the first one that cannot derive epsilon; includes the epsilon symbol iff
/// every symbol in the sequence is nullable (vacuously true for an empty
/// sequence).
fn first_of_sequence(
    symbols: &[Symbol],
    grammar: &Grammar,
    nullable: &HashSet<Symbol>,
    first: &HashMap<Symbol, HashSet<Symbol>>,
) -> HashSet<Symbol> {
    let mut result = HashSet::new();

    for symbol in symbols {
        if grammar.is_terminal(symbol) {
            result.insert(symbol.clone());
            return result;
        }

        let symbol_first = first.get(symbol).cloned().unwrap_or_default();
        result.extend(symbol_first.iter().filter(|s| !s.is_epsilon()).cloned());

        if !nullable.contains(symbol) {
            return result;
        }
    }

    result.insert(Symbol::epsilon());
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Grammar;

    fn sets(rules: &[&str]) -> (HashSet<Symbol>, HashMap<Symbol, HashSet<Symbol>>, HashMap<Symbol, HashSet<Symbol>>) {
        let g = Grammar::from_rules(rules.iter().copied()).unwrap();
        let null = nullable(&g);
        let first = first_sets(&g, &null);
        let follow = follow_sets(&g, &null, &first);
        (null, first, follow)
    }

    #[test]
    fn s1_first_sets() {
        let (_, first, _) = sets(&["S -> C C", "C -> e C | d"]);
        assert_eq!(
            first[&Symbol::new("S")],
            HashSet::from([Symbol::new("e"), Symbol::new("d")])
        );
        assert_eq!(
            first[&Symbol::new("C")],
            HashSet::from([Symbol::new("e"), Symbol::new("d")])
        );
    }

    #[test]
    fn s2_first_sets_with_epsilon() {
        let (_, first, _) = sets(&[
            "S -> A B C",
            "A -> a | #",
            "B -> A D | b",
            "C -> c d",
            "D -> d | #",
        ]);
        assert_eq!(
            first[&Symbol::new("S")],
            HashSet::from([Symbol::new("a"), Symbol::new("d"), Symbol::new("b"), Symbol::new("c")])
        );
        assert_eq!(
            first[&Symbol::new("A")],
            HashSet::from([Symbol::new("a"), Symbol::epsilon()])
        );
        assert_eq!(
            first[&Symbol::new("B")],
            HashSet::from([
                Symbol::new("a"),
                Symbol::new("d"),
                Symbol::new("b"),
                Symbol::epsilon()
            ])
        );
        assert_eq!(first[&Symbol::new("C")], HashSet::from([Symbol::new("c")]));
        assert_eq!(
            first[&Symbol::new("D")],
            HashSet::from([Symbol::new("d"), Symbol::epsilon()])
        );
    }

    #[test]
    fn nullable_is_monotone_when_adding_a_rule() {
        let before = nullable(&Grammar::from_rules(["S -> a", "A -> #"]).unwrap());
        let after = nullable(&Grammar::from_rules(["S -> a | A", "A -> #"]).unwrap());
        assert!(before.is_subset(&after));
    }

    #[test]
    fn first_contains_epsilon_iff_nullable() {
        let g = Grammar::from_rules(["S -> A b", "A -> a | #"]).unwrap();
        let null = nullable(&g);
        let first = first_sets(&g, &null);
        for nt in g.nonterms() {
            assert_eq!(first[nt].contains(&Symbol::epsilon()), null.contains(nt));
        }
    }

    #[test]
    fn follow_of_start_contains_end_marker() {
        let (null, first, follow) = sets(&["S -> a"]);
        let _ = (null, first);
        assert!(follow[&Symbol::new("S")].contains(&Symbol::end_marker()));
    }
}
