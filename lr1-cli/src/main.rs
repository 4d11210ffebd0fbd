//! Command-line driver for the `lr1` grammar-analysis and parsing library.
//!
//! Loads a grammar rule file plus an optional lexer regex-config file, builds
//! the canonical LR(1) collection, and drives a parse over each input file.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser as ClapParser, ValueEnum};
use colored::Colorize;
use log::{debug, info};

use lr1::{resolve_reduce, resolve_shift, resolve_throw, Grammar, LR1Parser, Resolver};

/// Command line arguments accepted by the `cfg-lr1` binary.
#[derive(Clone, PartialEq, Eq, ClapParser)]
#[command(version, about)]
struct Args {
    /// Path to the grammar rule file (`LHS -> RHS1 | RHS2 | ...` per line).
    #[arg(short, long)]
    grammar: PathBuf,
    /// Path to an optional lexer regex-config file (`NAME=regex` per line).
    #[arg(short, long)]
    lexer_config: Option<PathBuf>,
    /// Conflict resolution policy for shift/reduce and reduce/reduce conflicts.
    #[arg(short, long, value_enum, default_value = "throw")]
    resolver: ResolverArg,
    /// Print the canonical collection before parsing any input.
    #[arg(long)]
    dump_states: bool,
    /// Print the sequence of reductions performed on a successful parse.
    #[arg(long)]
    trace: bool,
    /// Display messages that aid in tracing grammar and parser construction.
    #[arg(short, long)]
    verbose: bool,
    /// Input files to lex and parse.
    input_files: Vec<PathBuf>,
}

/// Conflict resolution policies selectable from the command line.
#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ResolverArg {
    /// Fail construction on the first unresolved conflict.
    Throw,
    /// Prefer shifting.
    Shift,
    /// Prefer reducing.
    Reduce,
}

impl From<ResolverArg> for Resolver {
    fn from(value: ResolverArg) -> Self {
        match value {
            ResolverArg::Throw => resolve_throw(),
            ResolverArg::Shift => resolve_shift(),
            ResolverArg::Reduce => resolve_reduce(),
        }
    }
}

/// Parses a `NAME=regex-source` file into the map [`Grammar::lex`] expects.
fn read_lexer_config(path: &PathBuf) -> Result<HashMap<String, String>, String> {
    let text = fs::read_to_string(path).map_err(|e| format!("reading {path:?}: {e}"))?;
    let mut map = HashMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (name, source) = line
            .split_once('=')
            .ok_or_else(|| format!("lexer config line missing \"=\": {line:?}"))?;
        map.insert(name.trim().to_string(), source.trim().to_string());
    }
    Ok(map)
}

fn main() -> ExitCode {
    env_logger::init();

    let args = Args::parse();

    if args.verbose {
        info!("grammar file: {:?}", args.grammar);
        info!("input files: {:?}", args.input_files);
    }

    let grammar_text = match fs::read_to_string(&args.grammar) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("{} reading {:?}: {e}", "[ERROR]".red(), args.grammar);
            return ExitCode::FAILURE;
        }
    };

    let grammar = match Grammar::from_rules(grammar_text.lines()) {
        Ok(grammar) => grammar,
        Err(e) => {
            eprintln!("{} {e}", "[ERROR]".red());
            return ExitCode::FAILURE;
        }
    };
    debug!("grammar has {} non-terminals", grammar.nonterms().len());

    let regex_map = match &args.lexer_config {
        Some(path) => match read_lexer_config(path) {
            Ok(map) => map,
            Err(e) => {
                eprintln!("{} {e}", "[ERROR]".red());
                return ExitCode::FAILURE;
            }
        },
        None => HashMap::new(),
    };

    let parser = match LR1Parser::build(grammar, args.resolver.into()) {
        Ok(parser) => parser,
        Err(e) => {
            eprintln!("{} {e}", "[ERROR]".red());
            return ExitCode::FAILURE;
        }
    };
    info!("built canonical collection with {} states", parser.collection().len());

    if args.dump_states {
        println!("<< Canonical Collection >>\n{}", parser.collection());
    }

    if args.input_files.is_empty() {
        return ExitCode::SUCCESS;
    }

    let mut all_ok = true;

    for path in &args.input_files {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                eprintln!("{} reading {path:?}: {e}", "[ERROR]".red());
                all_ok = false;
                continue;
            }
        };

        let tokens = match parser.grammar().lex(text.lines(), &regex_map) {
            Ok(tokens) => tokens,
            Err(e) => {
                eprintln!("{} {path:?}: {e}", "[ERROR]".red());
                all_ok = false;
                continue;
            }
        };

        match parser.parse_trace(&tokens) {
            Ok(reductions) => {
                println!("{} {path:?} accepted", "[OK]".green());
                if args.trace {
                    println!("<< Reduction Trace >>");
                    for step in &reductions {
                        let rhs: Vec<String> = step.production_rhs.iter().map(ToString::to_string).collect();
                        println!("  {} -> {}", step.nonterminal, rhs.join(" "));
                    }
                }
            }
            Err(e) => {
                eprintln!("{} {path:?}: {e}", "[ERROR]".red());
                all_ok = false;
            }
        }
    }

    if all_ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
