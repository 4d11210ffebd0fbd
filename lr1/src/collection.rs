//! Canonical LR(1) collection: the state graph built by closure and goto
//! over the grammar augmented with a fresh start production.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use log::{debug, trace, warn};

use crate::compute;
use crate::error::ConstructionError;
use crate::grammar::Grammar;
use crate::item::{closure_many, Item};
use crate::resolver::Resolver;
use crate::symbol::Symbol;

/// A single LR(1) automaton state: a closed item set plus the shift/goto
/// and reduce action tables derived from it.
///
/// No symbol appears in both tables, and no terminal appears twice in the
/// reduce table with items of different productions — either there was no
/// conflict, or a [`Resolver`] settled one in favor of a single winner.
#[derive(Debug, Clone)]
pub struct ItemSet {
    /// Items in this state, in the order closure produced them. Stable
    /// across runs for identical input, used for deterministic output.
    pub items: Vec<Item>,
    /// Shift/goto actions: symbol -> (successor state index, the item in
    /// this state whose dot advances over that symbol).
    shift: Vec<(Symbol, usize, Item)>,
    /// Reduce actions: lookahead terminal -> the reducing item.
    reduce: Vec<(Symbol, Item)>,
}

impl ItemSet {
    fn new(items: Vec<Item>) -> Self {
        Self {
            items,
            shift: Vec::new(),
            reduce: Vec::new(),
        }
    }

    /// The successor state index on `symbol`, if this state shifts or
    /// gotos on it.
    pub fn shift_on(&self, symbol: &Symbol) -> Option<usize> {
        self.shift.iter().find(|(s, _, _)| s == symbol).map(|(_, idx, _)| *idx)
    }

    /// The item that reduces on lookahead `symbol`, if this state reduces
    /// on it.
    pub fn reduce_on(&self, symbol: &Symbol) -> Option<&Item> {
        self.reduce.iter().find(|(s, _)| s == symbol).map(|(_, item)| item)
    }

    /// Symbols this state shifts or gotos on, in table order.
    pub fn shift_symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.shift.iter().map(|(s, _, _)| s)
    }

    /// Terminals this state reduces on, in table order.
    pub fn reduce_symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.reduce.iter().map(|(s, _)| s)
    }
}

/// The canonical collection of LR(1) states for a grammar: a dense array of
/// states with state 0 as the initial state, transitions addressed by
/// integer index rather than pointer.
#[derive(Debug, Clone)]
pub struct Collection {
    states: Vec<ItemSet>,
    /// The grammar's own start symbol, pre-augmentation — what [`crate::parser`]
    /// checks a final reduce against to decide whether to accept.
    start_symbol: Symbol,
}

impl Collection {
    /// Builds the canonical collection for `grammar`, settling conflicts
    /// with `resolver`.
    pub fn build(grammar: &Grammar, resolver: Resolver) -> Result<Self, ConstructionError> {
        debug!("building canonical collection for grammar starting at {}", grammar.start());
        let (augmented, new_start) = grammar.augmented();
        let nullable = compute::nullable(&augmented);

        let start_production = augmented.productions_for(&new_start)[0].clone();
        let start_item = Item::new(start_production, HashSet::from([Symbol::end_marker()]));
        let initial_items = closure_many(vec![start_item], &augmented, &nullable);

        let mut fingerprints: HashMap<String, usize> = HashMap::new();
        fingerprints.insert(fingerprint(&initial_items), 0);

        let mut queue: VecDeque<usize> = VecDeque::new();
        queue.push_back(0);

        let mut tables: Vec<ItemSet> = vec![ItemSet::new(initial_items)];

        while let Some(state_idx) = queue.pop_front() {
            trace!("expanding state {state_idx} ({} items)", tables[state_idx].items.len());
            // Distinct symbols appearing after the dot in this state, in
            // first-occurrence order, so shift-table iteration is stable.
            let mut symbols: Vec<Symbol> = Vec::new();
            let mut seen_symbols: HashSet<Symbol> = HashSet::new();
            for item in &tables[state_idx].items {
                if let Some(sym) = item.current() {
                    if seen_symbols.insert(sym.clone()) {
                        symbols.push(sym.clone());
                    }
                }
            }

            for symbol in &symbols {
                let shifting_item = tables[state_idx]
                    .items
                    .iter()
                    .find(|item| item.current() == Some(symbol))
                    .cloned()
                    .expect("symbol collected from an item with that current symbol");

                let mut advanced: Vec<Item> = Vec::new();
                let mut seen_advanced: HashSet<Item> = HashSet::new();
                for item in &tables[state_idx].items {
                    if item.current() == Some(symbol) {
                        let next = item.advanced();
                        if seen_advanced.insert(next.clone()) {
                            advanced.push(next);
                        }
                    }
                }

                let goto_items = closure_many(advanced, &augmented, &nullable);
                let fp = fingerprint(&goto_items);
                let successor = match fingerprints.get(&fp) {
                    Some(&idx) => idx,
                    None => {
                        let idx = tables.len();
                        tables.push(ItemSet::new(goto_items));
                        fingerprints.insert(fp, idx);
                        queue.push_back(idx);
                        idx
                    }
                };

                tables[state_idx].shift.push((symbol.clone(), successor, shifting_item));
            }

            let reduce_items: Vec<Item> = tables[state_idx]
                .items
                .iter()
                .filter(|item| item.is_reduce())
                .cloned()
                .collect();

            for item in reduce_items {
                debug_assert!(
                    !item.lookahead.contains(&Symbol::new(crate::symbol::INHERIT_MARKER)),
                    "inherit-marker sentinel leaked into a reduce item's lookahead set"
                );

                let mut lookaheads: Vec<&Symbol> = item.lookahead.iter().collect();
                lookaheads.sort();

                for terminal in lookaheads {
                    install_reduce(&mut tables[state_idx], state_idx, terminal.clone(), item.clone(), resolver)?;
                }
            }
        }

        debug!("canonical collection built: {} states", tables.len());
        Ok(Self {
            states: tables,
            start_symbol: grammar.start().clone(),
        })
    }

    /// All states, state 0 first (the initial state).
    pub fn states(&self) -> &[ItemSet] {
        &self.states
    }

    /// The state at `index`.
    pub fn state(&self, index: usize) -> &ItemSet {
        &self.states[index]
    }

    /// The number of states in the collection.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Whether the collection has no states (never true for a collection
    /// produced by [`Collection::build`]).
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// The grammar's own start symbol (before augmentation with `S'`). A
    /// reduce by this non-terminal on lookahead `$` is the accept action.
    pub fn start_symbol(&self) -> &Symbol {
        &self.start_symbol
    }
}

/// Installs a reduce action for `terminal` in `state`, resolving a
/// shift/reduce or reduce/reduce conflict against whatever is already
/// installed for that terminal.
fn install_reduce(
    state: &mut ItemSet,
    state_idx: usize,
    terminal: Symbol,
    item: Item,
    resolver: Resolver,
) -> Result<(), ConstructionError> {
    if let Some(existing_idx) = state.reduce.iter().position(|(s, _)| *s == terminal) {
        let existing = state.reduce[existing_idx].1.clone();
        if existing == item {
            return Ok(());
        }
        match resolver.resolve(&existing, &item) {
            Some(winner) => {
                warn!(
                    "reduce/reduce conflict in state {state_idx} on {terminal} resolved in favor of {winner}"
                );
                state.reduce[existing_idx].1 = winner;
            }
            None => {
                return Err(ConstructionError::ReduceReduceConflict {
                    state: state_idx,
                    lookahead: terminal,
                    first_item: existing.to_string(),
                    second_item: item.to_string(),
                });
            }
        }
        return Ok(());
    }

    if let Some(shift_idx) = state.shift.iter().position(|(s, _, _)| *s == terminal) {
        let shift_item = state.shift[shift_idx].2.clone();
        match resolver.resolve(&shift_item, &item) {
            Some(winner) => {
                warn!("shift/reduce conflict in state {state_idx} on {terminal} resolved in favor of {winner}");
                if winner.is_reduce() {
                    state.shift.remove(shift_idx);
                    state.reduce.push((terminal, item));
                }
                // else: shift wins, nothing to install.
            }
            None => {
                return Err(ConstructionError::ShiftReduceConflict {
                    state: state_idx,
                    lookahead: terminal,
                    shift_item: shift_item.to_string(),
                    reduce_item: item.to_string(),
                });
            }
        }
        return Ok(());
    }

    state.reduce.push((terminal, item));
    Ok(())
}

/// A fingerprint identifying a closed item set up to item order: the sorted
/// `Display` form of each item, joined. Two goto results with the same
/// fingerprint are the same automaton state and are merged to the same
/// index.
fn fingerprint(items: &[Item]) -> String {
    let mut rendered: Vec<String> = items.iter().map(Item::to_string).collect();
    rendered.sort();
    rendered.join("\n")
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, state) in self.states.iter().enumerate() {
            writeln!(f, "state {idx}:")?;
            for item in &state.items {
                let marker = if item.is_reduce() {
                    "(R)".to_string()
                } else {
                    match item.current().and_then(|sym| state.shift_on(sym)) {
                        Some(target) => format!("(S{target})"),
                        None => "(??)".to_string(),
                    }
                };
                writeln!(f, "  {item} {marker}")?;
            }
        }
        Ok(())
    }
}
