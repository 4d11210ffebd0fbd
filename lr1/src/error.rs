//! Error types surfaced by grammar construction, lexing, automaton
//! construction, and parsing.
//!
//! Each phase gets its own enum with a hand-written [`std::fmt::Display`]
//! impl, the way the rest of this workspace reports errors (no `thiserror`).
//! Nothing here panics on well-formed input; invariant violations are a
//! distinct [`ParseError::Internal`] variant rather than a panic.

use std::fmt;

use crate::symbol::Symbol;

/// Errors raised while parsing rule lines into a [`crate::grammar::Grammar`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrammarError {
    /// A rule line did not contain `->`.
    MissingArrow {
        /// The offending line.
        line: String,
    },
    /// A rule line contained more than one `->`.
    DuplicateArrow {
        /// The offending line.
        line: String,
    },
    /// A quoted span (`"..."`) was never closed.
    UnterminatedQuote {
        /// The offending alternative.
        alternative: String,
    },
    /// A backslash escape appeared at the end of an alternative with nothing
    /// to escape.
    TrailingEscape {
        /// The offending alternative.
        alternative: String,
    },
    /// An alternative lexed to zero tokens (e.g. all whitespace).
    EmptyAlternative {
        /// The left-hand side whose alternative was empty.
        lhs: String,
    },
    /// A non-terminal ended up with no productions at all.
    NoProductions {
        /// The orphaned non-terminal.
        nonterminal: Symbol,
    },
    /// No rule lines were supplied.
    EmptyGrammar,
    /// A lexer config paired with this grammar (e.g. via
    /// [`crate::grammar::Grammar::validate_lexer_config`]) failed to build —
    /// most commonly a malformed regex source or a name that isn't one of
    /// this grammar's terminals.
    LexerConfig(LexError),
}

impl From<LexError> for GrammarError {
    fn from(value: LexError) -> Self {
        Self::LexerConfig(value)
    }
}

impl fmt::Display for GrammarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingArrow { line } => write!(f, "rule line missing \"->\": {line:?}"),
            Self::DuplicateArrow { line } => {
                write!(f, "rule line has more than one \"->\": {line:?}")
            }
            Self::UnterminatedQuote { alternative } => {
                write!(f, "unterminated quote in alternative: {alternative:?}")
            }
            Self::TrailingEscape { alternative } => {
                write!(f, "trailing escape in alternative: {alternative:?}")
            }
            Self::EmptyAlternative { lhs } => {
                write!(f, "empty alternative in production of {lhs:?}")
            }
            Self::NoProductions { nonterminal } => {
                write!(f, "non-terminal {nonterminal} has no productions")
            }
            Self::EmptyGrammar => write!(f, "grammar has no rules"),
            Self::LexerConfig(e) => write!(f, "invalid lexer config: {e}"),
        }
    }
}

impl std::error::Error for GrammarError {}

/// Errors raised while lexing input lines against a grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    /// No literal terminal or regex terminal matched at the current
    /// position. Carries the remaining unmatched text on the current line.
    UnrecognizedToken {
        /// The text starting at the point where no rule matched.
        remaining: String,
    },
    /// A regex source supplied in the lexer config failed to compile.
    InvalidRegex {
        /// The name the regex was registered under.
        name: String,
        /// The compiler's error message.
        message: String,
    },
    /// A name in the lexer config does not correspond to any grammar
    /// terminal.
    UnknownRegexName {
        /// The offending name.
        name: String,
    },
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnrecognizedToken { remaining } => {
                write!(f, "no rule matches input starting at: {remaining:?}")
            }
            Self::InvalidRegex { name, message } => {
                write!(f, "invalid regex for terminal {name:?}: {message}")
            }
            Self::UnknownRegexName { name } => {
                write!(f, "lexer config names {name:?}, which is not a grammar terminal")
            }
        }
    }
}

impl std::error::Error for LexError {}

/// Errors raised while constructing the canonical LR(1) collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstructionError {
    /// A resolver was asked to settle a shift/reduce conflict and declined.
    ShiftReduceConflict {
        /// Index of the state being built.
        state: usize,
        /// The lookahead terminal both actions compete on.
        lookahead: Symbol,
        /// Textual form of the shifting item.
        shift_item: String,
        /// Textual form of the reducing item.
        reduce_item: String,
    },
    /// A resolver was asked to settle a reduce/reduce conflict and declined.
    ReduceReduceConflict {
        /// Index of the state being built.
        state: usize,
        /// The lookahead terminal both actions compete on.
        lookahead: Symbol,
        /// Textual form of the first reducing item.
        first_item: String,
        /// Textual form of the second reducing item.
        second_item: String,
    },
}

impl fmt::Display for ConstructionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShiftReduceConflict {
                state,
                lookahead,
                shift_item,
                reduce_item,
            } => write!(
                f,
                "shift/reduce conflict in state {state} on {lookahead}: \"{shift_item}\" vs \"{reduce_item}\""
            ),
            Self::ReduceReduceConflict {
                state,
                lookahead,
                first_item,
                second_item,
            } => write!(
                f,
                "reduce/reduce conflict in state {state} on {lookahead}: \"{first_item}\" vs \"{second_item}\""
            ),
        }
    }
}

impl std::error::Error for ConstructionError {}

/// Errors raised while driving the parser over a token stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// No shift or reduce action is defined for the current lookahead in the
    /// current state.
    NoTransition {
        /// The state the parser was in.
        state: usize,
        /// The lookahead terminal that had no action.
        lookahead: Symbol,
    },
    /// An internal invariant was violated during a reduce (stack too
    /// shallow, or the popped symbols didn't match the reducing production).
    /// This indicates a bug in automaton construction, not bad input.
    Internal {
        /// Description of what went wrong.
        message: String,
    },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoTransition { state, lookahead } => {
                write!(f, "no transition in state {state} for lookahead {lookahead}")
            }
            Self::Internal { message } => write!(f, "internal parser error: {message}"),
        }
    }
}

impl std::error::Error for ParseError {}
