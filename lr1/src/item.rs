//! LR(1) items, the `lookahead` helper, and item closure.

use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::{Hash, Hasher};

use crate::grammar::{Grammar, Production};
use crate::symbol::{Symbol, INHERIT_MARKER};

/// An LR(1) item: a production, a dot position, and a lookahead set.
///
/// Two items are equal iff their productions, dot positions, and lookahead
/// sets (compared as sets) are all equal. Hashing sorts the lookahead set
/// first so that hashing is stable under permutation of its elements.
#[derive(Debug, Clone)]
pub struct Item {
    /// The production this item walks.
    pub production: Production,
    /// The dot position, `0..=production.rhs.len()`.
    pub dot: usize,
    /// The set of terminals that may follow a reduction by this item.
    pub lookahead: HashSet<Symbol>,
}

impl Item {
    /// Builds the initial item for `production` with the dot before the
    /// first symbol and lookahead set `lookahead`.
    pub fn new(production: Production, lookahead: HashSet<Symbol>) -> Self {
        Self {
            production,
            dot: 0,
            lookahead,
        }
    }

    /// The non-terminal this item reduces to.
    pub fn nonterminal(&self) -> &Symbol {
        &self.production.lhs
    }

    /// Whether the dot has reached the end of the production. The epsilon
    /// production (`rhs == [#]`) is a reduce item immediately at dot `0`: it
    /// has no symbol to shift over, so it pops zero stack pairs when reduced
    /// (see [`crate::parser`]) and competes as an ordinary reduce action in
    /// [`crate::collection`]'s conflict resolution, the same as any other
    /// reduce item.
    pub fn is_reduce(&self) -> bool {
        self.production.is_epsilon() || self.dot >= self.production.rhs.len()
    }

    /// The symbol immediately after the dot, or `None` if this is a reduce
    /// item.
    pub fn current(&self) -> Option<&Symbol> {
        if self.is_reduce() {
            None
        } else {
            Some(&self.production.rhs[self.dot])
        }
    }

    /// Advances the dot past the current symbol.
    pub fn advanced(&self) -> Item {
        Item {
            production: self.production.clone(),
            dot: self.dot + 1,
            lookahead: self.lookahead.clone(),
        }
    }

    /// Expands this item into the closure of items reachable from it,
    /// breadth-first, by repeatedly expanding the non-terminal immediately
    /// after the dot. See [`closure_many`].
    pub fn closure(self, grammar: &Grammar, nullable: &HashSet<Symbol>) -> Vec<Item> {
        closure_many(vec![self], grammar, nullable)
    }
}

impl PartialEq for Item {
    fn eq(&self, other: &Self) -> bool {
        self.production == other.production && self.dot == other.dot && self.lookahead == other.lookahead
    }
}

impl Eq for Item {}

impl Hash for Item {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.production.hash(state);
        self.dot.hash(state);
        let mut sorted: Vec<&Symbol> = self.lookahead.iter().collect();
        sorted.sort();
        sorted.hash(state);
    }
}

impl std::fmt::Display for Item {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The epsilon production is a reduce item at dot 0 with nothing left
        // to shift over; render its dot past the `#` rather than before it,
        // matching every other reduce item's "dot at the end" rendering.
        let split = if self.production.is_epsilon() {
            self.production.rhs.len()
        } else {
            self.dot.min(self.production.rhs.len())
        };
        let before: Vec<String> = self.production.rhs[..split].iter().map(Symbol::to_string).collect();
        let after: Vec<String> = self.production.rhs[split..].iter().map(Symbol::to_string).collect();
        let mut lookaheads: Vec<&Symbol> = self.lookahead.iter().collect();
        lookaheads.sort();
        let lookahead_str = lookaheads
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(",");

        write!(
            f,
            "{} -> {} . {} {{{}}}",
            self.nonterminal(),
            before.join(" "),
            after.join(" "),
            lookahead_str
        )
    }
}

/// Computes the set of terminals that may immediately follow the symbol at
/// `production.rhs[dotpos]` within `production` alone, not accounting for
/// whatever follows `production`'s left-hand side in an enclosing context.
///
/// When the remainder of the production (past `dotpos`) can vanish entirely
/// — because `dotpos` is the last symbol, or everything after it is
/// nullable — the result includes [`INHERIT_MARKER`] to signal that the
/// caller must substitute in the lookahead of the enclosing item. This
/// sentinel must never leak past [`Item::closure`].
///
/// Memoizes which non-terminals have already been expanded on the current
/// traversal to avoid infinite descent through recursive productions.
pub fn lookahead(
    production: &Production,
    dotpos: usize,
    grammar: &Grammar,
    nullable: &HashSet<Symbol>,
) -> HashSet<Symbol> {
    if dotpos + 1 >= production.rhs.len() {
        return HashSet::from([Symbol::new(INHERIT_MARKER)]);
    }

    let mut result: HashSet<Symbol> = HashSet::new();
    let mut expanded: HashSet<Symbol> = HashSet::new();
    let mut worklist: VecDeque<Vec<Symbol>> = VecDeque::new();
    worklist.push_back(production.rhs[dotpos + 1..].to_vec());

    while let Some(tail) = worklist.pop_front() {
        let mut stopped = false;

        for token in &tail {
            if token.is_epsilon() {
                continue;
            }

            if grammar.is_nonterminal(token) {
                if !expanded.insert(token.clone()) {
                    if nullable.contains(token) {
                        continue;
                    }
                    stopped = true;
                    break;
                }
                for prod in grammar.productions_for(token) {
                    worklist.push_back(prod.rhs.clone());
                }
                if !nullable.contains(token) {
                    stopped = true;
                    break;
                }
            } else {
                result.insert(token.clone());
                stopped = true;
                break;
            }
        }

        if !stopped {
            result.insert(Symbol::new(INHERIT_MARKER));
        }
    }

    result
}

/// Breadth-first closure of one or more seed items sharing a single state.
/// For an item `A -> α . B β {L}` with `B` a non-terminal, adds `B -> . γ
/// {L'}` for every production `B -> γ`, where `L'` is [`lookahead`] of the
/// enclosing item with [`INHERIT_MARKER`] replaced by that item's own
/// lookahead set. Reduce items contribute nothing further. Items already
/// produced (by full (production, dot, lookahead) equality) are not
/// re-added, whether they arrived as a seed or were generated along the way
/// — this is what lets [`crate::collection`] close a whole goto set (several
/// seeds at once) with the same dedup guarantee a single-item closure gives.
pub(crate) fn closure_many(starts: Vec<Item>, grammar: &Grammar, nullable: &HashSet<Symbol>) -> Vec<Item> {
    let mut result: Vec<Item> = Vec::new();
    let mut seen: HashSet<Item> = HashSet::new();
    let mut queue: VecDeque<Item> = VecDeque::new();
    queue.extend(starts);

    // Raw (pre-substitution) `lookahead()` results, keyed by (production,
    // dot), shared across every item that closes over the same production.
    let mut raw_cache: HashMap<(Production, usize), HashSet<Symbol>> = HashMap::new();

    while let Some(current) = queue.pop_front() {
        if !seen.insert(current.clone()) {
            continue;
        }

        if !current.is_reduce() {
            let sym = current.current().unwrap().clone();
            if grammar.is_nonterminal(&sym) {
                let key = (current.production.clone(), current.dot);
                let raw = raw_cache
                    .entry(key)
                    .or_insert_with(|| lookahead(&current.production, current.dot, grammar, nullable))
                    .clone();

                let mut effective = raw;
                if effective.remove(&Symbol::new(INHERIT_MARKER)) {
                    effective.extend(current.lookahead.iter().cloned());
                }

                for prod in grammar.productions_for(&sym) {
                    queue.push_back(Item::new(prod.clone(), effective.clone()));
                }
            }
        }

        result.push(current);
    }

    debug_assert!(
        result
            .iter()
            .all(|item| !item.lookahead.contains(&Symbol::new(INHERIT_MARKER))),
        "inherit-marker sentinel leaked out of item closure"
    );

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::nullable as compute_nullable;

    fn grammar(rules: &[&str]) -> Grammar {
        Grammar::from_rules(rules.iter().copied()).unwrap()
    }

    #[test]
    fn reduce_item_has_no_current_symbol() {
        let g = grammar(["S -> a b"]);
        let prod = g.productions_for(&Symbol::new("S"))[0].clone();
        let item = Item::new(prod, HashSet::from([Symbol::end_marker()]));
        assert_eq!(item.current(), Some(&Symbol::new("a")));
        let item = item.advanced().advanced();
        assert!(item.is_reduce());
        assert_eq!(item.current(), None);
    }

    #[test]
    fn epsilon_item_is_a_reduce_item_immediately_at_dot_zero() {
        let g = grammar(["S -> a | #"]);
        let eps = g
            .productions_for(&Symbol::new("S"))
            .iter()
            .find(|p| p.is_epsilon())
            .unwrap()
            .clone();
        let item = Item::new(eps, HashSet::from([Symbol::end_marker()]));
        assert!(item.is_reduce());
        assert_eq!(item.current(), None);
    }

    #[test]
    fn lookahead_of_last_symbol_is_inherit_marker() {
        let g = grammar(["S -> A B", "A -> a", "B -> b"]);
        let null = compute_nullable(&g);
        let prod = g.productions_for(&Symbol::new("S"))[0].clone();
        // dot at position 1 (B): nothing follows B in this production.
        let lh = lookahead(&prod, 1, &g, &null);
        assert_eq!(lh, HashSet::from([Symbol::new(INHERIT_MARKER)]));
    }

    #[test]
    fn lookahead_skips_nullable_prefix() {
        let g = grammar(["S -> A b", "A -> a | #"]);
        let null = compute_nullable(&g);
        let prod = g.productions_for(&Symbol::new("S"))[0].clone();
        // dot at position 0 (A): the tail is "b" after A, regardless of
        // whether A itself is nullable (A is not part of the tail here).
        let lh = lookahead(&prod, 0, &g, &null);
        assert_eq!(lh, HashSet::from([Symbol::new("b")]));
    }

    #[test]
    fn closure_expands_nonterminal_after_dot() {
        let g = grammar(["S -> A", "A -> a"]);
        let null = compute_nullable(&g);
        let prod = g.productions_for(&Symbol::new("S"))[0].clone();
        let start = Item::new(prod, HashSet::from([Symbol::end_marker()]));
        let items = closure_many(vec![start], &g, &null);
        assert!(items.iter().any(|i| i.nonterminal() == &Symbol::new("A")));
    }
}
