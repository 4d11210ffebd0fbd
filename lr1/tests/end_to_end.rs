//! End-to-end construction and parsing scenarios spanning several modules:
//! grammar parsing, FIRST-set computation, canonical collection
//! construction with an explicit conflict resolver, and the parse driver.

use std::collections::HashMap;

use lr1::{resolve_shift, resolve_throw, Grammar, LR1Parser, Symbol};

/// A small C-subset grammar (function declarations, typed parameters,
/// control flow, expressions) exercised with a named-regex lexer config,
/// the way a real caller would hand this library a language front end.
fn c_subset_grammar() -> Grammar {
    Grammar::from_rules([
        "program -> declaration-list",
        "declaration-list -> declaration-list declaration | declaration",
        "declaration -> var-declaration | fun-declaration",
        "var-declaration -> TYPE ID ; | TYPE ID [ NUM ] ;",
        "fun-declaration -> TYPE ID ( params ) compound-stmt",
        "params -> param-list | void",
        "param-list -> param-list , param | param",
        "param -> TYPE ID | TYPE ID [ ]",
        "TYPE -> int | float | void",
        "compound-stmt -> { local-declarations statement-list }",
        "local-declarations -> local-declarations var-declaration | #",
        "statement-list -> statement-list statement | #",
        "statement -> expression-stmt | compound-stmt | selection-stmt | iteration-stmt | return-stmt",
        "expression-stmt -> expression ; | ;",
        "selection-stmt -> if ( expression ) statement | if ( expression ) statement else statement",
        "iteration-stmt -> while ( expression ) statement",
        "return-stmt -> return ; | return expression ;",
        "expression -> var = expression | simple-expression",
        "var -> ID | ID [ expression ]",
        "simple-expression -> additive-expression RELOP additive-expression | additive-expression",
        "additive-expression -> additive-expression ADDOP term | term",
        "term -> term MULOP factor | factor",
        "factor -> ( expression ) | var | call | NUM",
        "call -> ID ( args )",
        "args -> arg-list | #",
        "arg-list -> arg-list , expression | expression",
    ])
    .expect("C-subset grammar is well-formed")
}

fn c_subset_regex_map() -> HashMap<String, String> {
    HashMap::from([
        ("NUM".to_string(), r"[0-9]+\.[0-9]+|[0-9]+".to_string()),
        ("ID".to_string(), "[A-Za-z]+".to_string()),
        ("RELOP".to_string(), "<=|<|>|>=|==|!=".to_string()),
        ("ADDOP".to_string(), r"[+\-]".to_string()),
        ("MULOP".to_string(), "[*/]".to_string()),
    ])
}

#[test]
fn s4_c_subset_program_parses_with_dangling_else_resolved_by_shift() {
    let grammar = c_subset_grammar();
    let parser = LR1Parser::build(grammar, resolve_shift()).expect("dangling-else is shift/reduce only");

    let tokens = parser
        .grammar()
        .lex(["int main(void) { return 0; }"], &c_subset_regex_map())
        .unwrap();

    let reductions = parser.parse_trace(&tokens).expect("a minimal valid program should parse");
    assert_eq!(reductions.last().unwrap().nonterminal, Symbol::new("program"));
}

#[test]
fn s4_dangling_else_binds_to_the_nearest_if() {
    let grammar = c_subset_grammar();
    let parser = LR1Parser::build(grammar, resolve_shift()).unwrap();

    let tokens = parser
        .grammar()
        .lex(
            [
                "int main(void) {",
                "if (1 > 0) { return 0; } else { return 1; }",
                "}",
            ],
            &c_subset_regex_map(),
        )
        .unwrap();

    assert!(parser.parse(&tokens).is_ok());
}

#[test]
fn s4_without_a_resolver_the_dangling_else_conflict_is_reported() {
    let grammar = c_subset_grammar();
    assert!(LR1Parser::build(grammar, resolve_throw()).is_err());
}

#[test]
fn first_sets_of_the_c_subset_type_nonterminal() {
    let grammar = c_subset_grammar();
    let nullable = lr1::compute::nullable(&grammar);
    let first = lr1::compute::first_sets(&grammar, &nullable);
    assert_eq!(
        first[&Symbol::new("TYPE")],
        std::collections::HashSet::from([
            Symbol::new("int"),
            Symbol::new("float"),
            Symbol::new("void"),
        ])
    );
}

#[test]
fn unrecognized_character_in_program_text_is_a_lex_error() {
    let grammar = c_subset_grammar();
    let err = grammar.lex(["int main(void) { @ }"], &c_subset_regex_map()).unwrap_err();
    assert!(matches!(err, lr1::LexError::UnrecognizedToken { .. }));
}
