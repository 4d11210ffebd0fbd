//! Longest-match lexer: tokenizes input lines against a grammar's literal
//! terminals plus an optional set of named regex terminals.

use std::collections::{HashMap, HashSet};

use regex::Regex;

use crate::error::LexError;
use crate::grammar::Grammar;
use crate::symbol::Symbol;

/// Tokenizes text against a grammar's terminals.
///
/// A terminal name appearing in the regex map is recognized only by its
/// compiled pattern, never by literal string match, even though the name
/// still appears in [`Grammar::terminals`]. Regex sources are compiled
/// eagerly at construction time: an invalid pattern is a construction error,
/// not a per-line lex error.
pub struct Lexer<'g> {
    grammar: &'g Grammar,
    /// Literal terminals (not shadowed by a regex), sorted for deterministic
    /// iteration. Matching still picks the longest match among these, not
    /// the first.
    literals: Vec<Symbol>,
    /// Regex-backed terminals, sorted by name for deterministic iteration.
    regexes: Vec<(Symbol, Regex)>,
}

impl<'g> Lexer<'g> {
    /// Builds a lexer for `grammar`. `regex_sources` maps a terminal name to
    /// an uncompiled regex source; every name must already be a terminal of
    /// `grammar`.
    pub fn new(grammar: &'g Grammar, regex_sources: &HashMap<String, String>) -> Result<Self, LexError> {
        let mut names: Vec<&String> = regex_sources.keys().collect();
        names.sort();

        let mut regex_names: HashSet<Symbol> = HashSet::new();
        let mut regexes = Vec::new();
        for name in names {
            let symbol = Symbol::new(name.as_str());
            if !grammar.terminals().contains(&symbol) {
                return Err(LexError::UnknownRegexName { name: name.clone() });
            }
            let pattern = format!("^(?:{})", regex_sources[name]);
            let compiled = Regex::new(&pattern).map_err(|e| LexError::InvalidRegex {
                name: name.clone(),
                message: e.to_string(),
            })?;
            regex_names.insert(symbol.clone());
            regexes.push((symbol, compiled));
        }

        let mut literals: Vec<Symbol> = grammar
            .terminals()
            .iter()
            .filter(|t| !regex_names.contains(*t))
            .cloned()
            .collect();
        literals.sort();

        Ok(Self {
            grammar,
            literals,
            regexes,
        })
    }

    /// The grammar this lexer was built from.
    pub fn grammar(&self) -> &Grammar {
        self.grammar
    }

    /// Tokenizes `lines`, producing `(terminal, raw-lexeme)` pairs. Each
    /// non-empty, whitespace-stripped line is scanned left to right:
    /// whitespace between tokens is skipped, and at each position the
    /// longest matching rule wins, literal terminals checked before regex
    /// terminals so a tie in match length favors the literal.
    pub fn tokenize<I, S>(&self, lines: I) -> Result<Vec<(Symbol, String)>, LexError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tokens = Vec::new();

        for raw in lines {
            let line = raw.as_ref().trim();
            if line.is_empty() {
                continue;
            }

            let mut pos = 0;
            while pos < line.len() {
                let remaining = &line[pos..];
                let skip = remaining.len() - remaining.trim_start().len();
                if skip > 0 {
                    pos += skip;
                    continue;
                }

                match self.longest_match(remaining) {
                    Some((symbol, len)) => {
                        tokens.push((symbol.clone(), remaining[..len].to_string()));
                        pos += len;
                    }
                    None => {
                        return Err(LexError::UnrecognizedToken {
                            remaining: remaining.to_string(),
                        });
                    }
                }
            }
        }

        Ok(tokens)
    }

    /// The best (symbol, match length) starting at the beginning of
    /// `remaining`, or `None` if nothing matches.
    fn longest_match(&self, remaining: &str) -> Option<(&Symbol, usize)> {
        let mut best: Option<(&Symbol, usize)> = None;

        for literal in &self.literals {
            let text = literal.as_str();
            if remaining.starts_with(text) {
                let len = text.len();
                if best.map_or(true, |(_, best_len)| len > best_len) {
                    best = Some((literal, len));
                }
            }
        }

        for (symbol, regex) in &self.regexes {
            if let Some(mat) = regex.find(remaining) {
                if mat.start() == 0 {
                    let len = mat.end();
                    if best.map_or(true, |(_, best_len)| len > best_len) {
                        best = Some((symbol, len));
                    }
                }
            }
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Grammar;

    #[test]
    fn longest_match_among_literals() {
        let g = Grammar::from_rules(["S -> abc | abcd"]).unwrap();
        let lexer = Lexer::new(&g, &HashMap::new()).unwrap();
        let tokens = lexer.tokenize(["abcd abc"]).unwrap();
        assert_eq!(
            tokens,
            vec![
                (Symbol::new("abcd"), "abcd".to_string()),
                (Symbol::new("abc"), "abc".to_string()),
            ]
        );
    }

    #[test]
    fn regex_wins_on_longer_match() {
        let g = Grammar::from_rules(["S -> abc | ID"]).unwrap();
        let regex_map = HashMap::from([("ID".to_string(), "[a-z]+".to_string())]);
        let lexer = Lexer::new(&g, &regex_map).unwrap();
        let tokens = lexer.tokenize(["abcd abc"]).unwrap();
        assert_eq!(
            tokens,
            vec![
                (Symbol::new("ID"), "abcd".to_string()),
                (Symbol::new("abc"), "abc".to_string()),
            ]
        );
    }

    #[test]
    fn literal_wins_on_equal_length_tie() {
        let g = Grammar::from_rules(["S -> abc | ID"]).unwrap();
        let regex_map = HashMap::from([("ID".to_string(), "[a-z]{3}".to_string())]);
        let lexer = Lexer::new(&g, &regex_map).unwrap();
        let tokens = lexer.tokenize(["abc"]).unwrap();
        assert_eq!(tokens, vec![(Symbol::new("abc"), "abc".to_string())]);
    }

    #[test]
    fn unrecognized_character_is_an_error() {
        let g = Grammar::from_rules(["S -> a"]).unwrap();
        let lexer = Lexer::new(&g, &HashMap::new()).unwrap();
        assert!(matches!(
            lexer.tokenize(["a!"]).unwrap_err(),
            LexError::UnrecognizedToken { .. }
        ));
    }

    #[test]
    fn regex_name_must_be_a_grammar_terminal() {
        let g = Grammar::from_rules(["S -> a"]).unwrap();
        let regex_map = HashMap::from([("NUM".to_string(), "[0-9]+".to_string())]);
        assert!(matches!(
            Lexer::new(&g, &regex_map).unwrap_err(),
            LexError::UnknownRegexName { .. }
        ));
    }

    #[test]
    fn invalid_regex_source_is_a_construction_error() {
        let g = Grammar::from_rules(["S -> ID"]).unwrap();
        let regex_map = HashMap::from([("ID".to_string(), "[a-z".to_string())]);
        assert!(matches!(
            Lexer::new(&g, &regex_map).unwrap_err(),
            LexError::InvalidRegex { .. }
        ));
    }
}
