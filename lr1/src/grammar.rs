//! Grammar model: productions, non-terminal/terminal classification, and the
//! textual rule-line scanner that builds a [`Grammar`] from a rule list.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use log::{debug, warn};

use crate::error::{GrammarError, LexError};
use crate::symbol::Symbol;

/// A single production `lhs -> rhs`.
///
/// `rhs == [Symbol::epsilon()]` is the explicit epsilon production; any other
/// production never contains the epsilon symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Production {
    /// Left-hand side, always a non-terminal.
    pub lhs: Symbol,
    /// Right-hand side, a sequence of symbols.
    pub rhs: Vec<Symbol>,
}

impl Production {
    /// Whether this production is the epsilon production.
    pub fn is_epsilon(&self) -> bool {
        self.rhs.len() == 1 && self.rhs[0].is_epsilon()
    }
}

impl fmt::Display for Production {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ->", self.lhs)?;
        for sym in &self.rhs {
            write!(f, " {sym}")?;
        }
        Ok(())
    }
}

/// A context-free grammar parsed from rule lines of the shape
/// `LHS -> ALT1 | ALT2 | ...`.
#[derive(Debug, Clone)]
pub struct Grammar {
    start: Symbol,
    /// Non-terminals in first-declared order, start symbol first.
    order: Vec<Symbol>,
    nonterminals: HashSet<Symbol>,
    terminals: HashSet<Symbol>,
    /// All productions, in the order they were added.
    productions: Vec<Production>,
    /// The same productions grouped by left-hand side, preserving order.
    by_lhs: HashMap<Symbol, Vec<Production>>,
}

impl Grammar {
    /// Parses a grammar out of rule lines, each `LHS -> ALT1 | ALT2 | ...`.
    ///
    /// The first left-hand side encountered becomes the start symbol. Blank
    /// lines are ignored. See the module documentation for the quoting and
    /// escaping rules recognized inside an alternative.
    pub fn from_rules<I, S>(lines: I) -> Result<Self, GrammarError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut start: Option<Symbol> = None;
        let mut order: Vec<Symbol> = Vec::new();
        let mut seen_lhs: HashSet<Symbol> = HashSet::new();
        let mut productions: Vec<Production> = Vec::new();
        let mut dedup: HashSet<(Symbol, Vec<Symbol>)> = HashSet::new();
        let mut saw_any_line = false;

        for raw in lines {
            let line = raw.as_ref().trim();
            if line.is_empty() {
                continue;
            }
            saw_any_line = true;

            let arrow_count = line.matches("->").count();
            if arrow_count == 0 {
                return Err(GrammarError::MissingArrow {
                    line: line.to_string(),
                });
            }
            if arrow_count > 1 {
                return Err(GrammarError::DuplicateArrow {
                    line: line.to_string(),
                });
            }

            let (lhs_str, rhs_str) = line.split_once("->").unwrap();
            let lhs_str = lhs_str.trim();
            if lhs_str.is_empty() {
                return Err(GrammarError::MissingArrow {
                    line: line.to_string(),
                });
            }
            let lhs = Symbol::new(lhs_str);

            if start.is_none() {
                start = Some(lhs.clone());
            }
            if seen_lhs.insert(lhs.clone()) {
                order.push(lhs.clone());
            }

            for alternative in rhs_str.split('|') {
                let tokens = tokenize_alternative(alternative)?;
                if tokens.is_empty() {
                    return Err(GrammarError::EmptyAlternative {
                        lhs: lhs_str.to_string(),
                    });
                }

                let rhs: Vec<Symbol> = if tokens.len() == 1 && tokens[0] == "#" {
                    vec![Symbol::epsilon()]
                } else {
                    tokens
                        .into_iter()
                        .filter(|t| t != "#")
                        .map(Symbol::new)
                        .collect()
                };

                if dedup.insert((lhs.clone(), rhs.clone())) {
                    productions.push(Production {
                        lhs: lhs.clone(),
                        rhs,
                    });
                }
            }
        }

        if !saw_any_line {
            return Err(GrammarError::EmptyGrammar);
        }
        let start = start.ok_or(GrammarError::EmptyGrammar)?;

        let nonterminals = seen_lhs;
        let mut terminals = HashSet::new();
        for production in &productions {
            for symbol in &production.rhs {
                if !symbol.is_epsilon() && !nonterminals.contains(symbol) {
                    terminals.insert(symbol.clone());
                }
            }
        }

        let by_lhs = group_by_lhs(&productions);

        for nt in &order {
            if !by_lhs.contains_key(nt) {
                return Err(GrammarError::NoProductions {
                    nonterminal: nt.clone(),
                });
            }
        }

        debug!(
            "parsed grammar: start = {start}, {} non-terminals, {} terminals, {} productions",
            order.len(),
            terminals.len(),
            productions.len()
        );

        let grammar = Self {
            start,
            order,
            nonterminals,
            terminals,
            productions,
            by_lhs,
        };
        grammar.warn_on_unreachable_nonterms();

        Ok(grammar)
    }

    /// Logs a warning (does not fail construction) for every non-terminal
    /// that cannot be reached from the start symbol by any derivation. Rules
    /// for an unreachable non-terminal are kept, not stripped — see §3 of
    /// the grammar's invariants.
    fn warn_on_unreachable_nonterms(&self) {
        let mut reached: HashSet<Symbol> = HashSet::from([self.start.clone()]);
        let mut queue: VecDeque<Symbol> = VecDeque::from([self.start.clone()]);

        while let Some(nt) = queue.pop_front() {
            for production in self.productions_for(&nt) {
                for symbol in &production.rhs {
                    if self.is_nonterminal(symbol) && reached.insert(symbol.clone()) {
                        queue.push_back(symbol.clone());
                    }
                }
            }
        }

        for nt in &self.order {
            if !reached.contains(nt) {
                warn!("non-terminal {nt} is not reachable from the start symbol {}", self.start);
            }
        }
    }

    /// The start symbol (the first left-hand side declared).
    pub fn start(&self) -> &Symbol {
        &self.start
    }

    /// All non-terminals, start symbol first, otherwise in declaration order.
    pub fn nonterms(&self) -> &[Symbol] {
        &self.order
    }

    /// All terminals.
    pub fn terminals(&self) -> &HashSet<Symbol> {
        &self.terminals
    }

    /// Whether `symbol` is a non-terminal of this grammar.
    pub fn is_nonterminal(&self, symbol: &Symbol) -> bool {
        self.nonterminals.contains(symbol)
    }

    /// Whether `symbol` is a terminal of this grammar.
    pub fn is_terminal(&self, symbol: &Symbol) -> bool {
        self.terminals.contains(symbol)
    }

    /// All productions of the grammar, in declaration order.
    pub fn all_productions(&self) -> &[Production] {
        &self.productions
    }

    /// The productions of a single non-terminal, in declaration order.
    /// Empty if `nt` is not a non-terminal of this grammar.
    pub fn productions_for(&self, nt: &Symbol) -> &[Production] {
        self.by_lhs.get(nt).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The set of non-terminals that derive the empty string. Thin wrapper
    /// around [`crate::compute::nullable`] recomputed on each call, since the
    /// grammar caches no analysis sets of its own.
    pub fn nullable(&self) -> HashSet<Symbol> {
        crate::compute::nullable(self)
    }

    /// `FIRST(X)` for every non-terminal `X`. Thin wrapper around
    /// [`crate::compute::first_sets`].
    pub fn first_sets(&self) -> HashMap<Symbol, HashSet<Symbol>> {
        crate::compute::first_sets(self, &self.nullable())
    }

    /// `FOLLOW(X)` for every non-terminal `X`. Thin wrapper around
    /// [`crate::compute::follow_sets`].
    pub fn follow_sets(&self) -> HashMap<Symbol, HashSet<Symbol>> {
        let nullable = self.nullable();
        let first = crate::compute::first_sets(self, &nullable);
        crate::compute::follow_sets(self, &nullable, &first)
    }

    /// Tokenizes `lines` against this grammar's terminals, honoring
    /// `regex_sources` overrides. Convenience wrapper around
    /// [`crate::lexer::Lexer`] for callers that don't need to reuse a lexer
    /// across several inputs.
    pub fn lex<I, S>(
        &self,
        lines: I,
        regex_sources: &HashMap<String, String>,
    ) -> Result<Vec<(Symbol, String)>, LexError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        crate::lexer::Lexer::new(self, regex_sources)?.tokenize(lines)
    }

    /// Checks that `regex_sources` builds a valid lexer for this grammar
    /// (every name is one of this grammar's terminals and every regex source
    /// compiles) without lexing any input. A caller loading a grammar file
    /// and a lexer-config file together can use this to report a single
    /// [`GrammarError`] for either file, the way the lower-level [`LexError`]
    /// folds into this higher-level error via `From`.
    pub fn validate_lexer_config(&self, regex_sources: &HashMap<String, String>) -> Result<(), GrammarError> {
        crate::lexer::Lexer::new(self, regex_sources)?;
        Ok(())
    }

    /// Builds the augmented grammar `S' -> S` used to seed canonical
    /// collection construction, returning the new grammar and its fresh
    /// start symbol.
    pub(crate) fn augmented(&self) -> (Grammar, Symbol) {
        let new_start = Symbol::new(format!("{}'", self.start.as_str()));

        let mut order = vec![new_start.clone()];
        order.extend(self.order.iter().cloned());

        let mut nonterminals = self.nonterminals.clone();
        nonterminals.insert(new_start.clone());

        let mut productions = vec![Production {
            lhs: new_start.clone(),
            rhs: vec![self.start.clone()],
        }];
        productions.extend(self.productions.iter().cloned());

        let by_lhs = group_by_lhs(&productions);

        let grammar = Grammar {
            start: new_start.clone(),
            order,
            nonterminals,
            terminals: self.terminals.clone(),
            productions,
            by_lhs,
        };

        (grammar, new_start)
    }
}

fn group_by_lhs(productions: &[Production]) -> HashMap<Symbol, Vec<Production>> {
    let mut by_lhs: HashMap<Symbol, Vec<Production>> = HashMap::new();
    for production in productions {
        by_lhs
            .entry(production.lhs.clone())
            .or_default()
            .push(production.clone());
    }
    by_lhs
}

impl PartialEq for Grammar {
    fn eq(&self, other: &Self) -> bool {
        if self.start != other.start || self.nonterminals != other.nonterminals {
            return false;
        }
        for nt in &self.nonterminals {
            let ours: HashSet<&Vec<Symbol>> =
                self.productions_for(nt).iter().map(|p| &p.rhs).collect();
            let theirs: HashSet<&Vec<Symbol>> =
                other.productions_for(nt).iter().map(|p| &p.rhs).collect();
            if ours != theirs {
                return false;
            }
        }
        true
    }
}

impl Eq for Grammar {}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for nt in &self.order {
            let alts: Vec<String> = self
                .productions_for(nt)
                .iter()
                .map(|p| {
                    p.rhs
                        .iter()
                        .map(Symbol::to_string)
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .collect();
            writeln!(f, "{} -> {}", nt, alts.join(" | "))?;
        }
        Ok(())
    }
}

/// Lexes a single alternative (the text between `|`s) into tokens.
///
/// A quoted span `"..."` preserves interior whitespace. A backslash escapes
/// the next character outside quotes and is literal inside quotes. A quote
/// character appearing in the middle of a non-whitespace run (not at a token
/// boundary) is an error, as is an unterminated quote or a trailing escape.
fn tokenize_alternative(alternative: &str) -> Result<Vec<String>, GrammarError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;
    let mut escape = false;
    let mut at_boundary = true;

    // A trailing space flushes whatever token is in progress, mirroring the
    // reference tokenizer's `for c in rhs + " "` trick.
    for c in alternative.chars().chain(std::iter::once(' ')) {
        if escape {
            current.push(c);
            escape = false;
            at_boundary = false;
            continue;
        }

        if c == ' ' || c == '\t' {
            if in_quote {
                current.push(c);
            } else {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                at_boundary = true;
            }
            continue;
        }

        if c == '"' {
            if !in_quote && !at_boundary {
                return Err(GrammarError::UnterminatedQuote {
                    alternative: alternative.to_string(),
                });
            }
            in_quote = !in_quote;
            at_boundary = false;
            continue;
        }

        if c == '\\' && !in_quote {
            escape = true;
            at_boundary = false;
            continue;
        }

        current.push(c);
        at_boundary = false;
    }

    if in_quote {
        return Err(GrammarError::UnterminatedQuote {
            alternative: alternative.to_string(),
        });
    }
    if escape {
        return Err(GrammarError::TrailingEscape {
            alternative: alternative.to_string(),
        });
    }

    Ok(tokens)
}
