//! Tests for grammar construction and what completion sees of it.

use atn_complete::completion::Recognizer;
use atn_complete::error::GrammarError;
use atn_complete::grammar::{Expr, Grammar, GrammarBuilder, Terminal};
use atn_complete::lexer::{CharSet, Pattern, TokenSource};
use atn_complete::EOF;

/// value  : object | array | STRING | NUMBER | 'true' | 'false' | 'null' ;
/// object : '{' (pair (',' pair)*)? '}' ;
/// pair   : STRING ':' value ;
/// array  : '[' (value (',' value)*)? ']' ;
fn json() -> Grammar {
    let list = |item: &str, open: &str, close: &str| {
        Expr::seq(vec![
            Expr::lit(open),
            Expr::opt(Expr::seq(vec![
                Expr::rule(item),
                Expr::star(Expr::seq(vec![Expr::lit(","), Expr::rule(item)])),
            ])),
            Expr::lit(close),
        ])
    };

    GrammarBuilder::new()
        .rule(
            "value",
            Expr::alt(vec![
                Expr::rule("object"),
                Expr::rule("array"),
                Expr::token("STRING"),
                Expr::token("NUMBER"),
                Expr::lit("true"),
                Expr::lit("false"),
                Expr::lit("null"),
            ]),
        )
        .rule("object", list("pair", "{", "}"))
        .rule(
            "pair",
            Expr::seq(vec![Expr::token("STRING"), Expr::lit(":"), Expr::rule("value")]),
        )
        .rule("array", list("value", "[", "]"))
        .token(
            "STRING",
            Pattern::Seq(vec![
                Pattern::literal("\""),
                Pattern::zero_or_more(Pattern::NotCharClass(CharSet::of_chars("\""))),
                Pattern::literal("\""),
            ]),
        )
        .token("NUMBER", Pattern::one_or_more(Pattern::CharClass(CharSet::digits())))
        .skip("WS", Pattern::one_or_more(Pattern::CharClass(CharSet::whitespace())))
        .build()
        .unwrap()
}

#[test]
fn test_json_grammar_tables() {
    let grammar = json();

    assert_eq!(grammar.rule_names(), &["value", "object", "pair", "array"]);
    // true false null { , } : [ ]
    assert_eq!(grammar.vocabulary().max_token_type(), 12);
    assert_eq!(grammar.vocabulary().display_name(1), "true");
    assert_eq!(grammar.vocabulary().display_name(10), "STRING");
    assert_eq!(grammar.vocabulary().display_name(EOF), "EOF");
    assert_eq!(grammar.lexer().rule_names().len(), 12);
}

#[test]
fn test_json_completion() {
    let grammar = json();
    let completer = grammar.autocompleter();

    assert_eq!(
        completer.complete("").unwrap().names(),
        vec!["{", "[", "STRING", "NUMBER", "true", "false", "null"]
    );
    assert_eq!(completer.complete("{").unwrap().names(), vec!["STRING", "}"]);
    assert_eq!(completer.complete("{ \"a\"").unwrap().names(), vec![":"]);
    assert_eq!(completer.complete("{ \"a\" : 1").unwrap().names(), vec![",", "}"]);
    assert_eq!(completer.complete("[1, [").unwrap().names(), completer.complete("[").unwrap().names());
    assert!(completer.complete("[1]").unwrap().is_empty());
}

#[test]
fn test_json_contexts() {
    let grammar = json();
    let completion = grammar.autocompleter().complete("{ \"a\" :").unwrap();

    let string = completion.get("STRING").unwrap();
    assert!(string.has_context(&["value", "object", "pair", "value"]));
    let open = completion.get("[").unwrap();
    assert!(open.has_context(&["value", "object", "pair", "value", "array"]));
}

#[test]
fn test_literal_shared_with_lexer_rule() {
    // r : 'let' ID ; LET : 'let' ;
    let grammar = GrammarBuilder::new()
        .rule("r", Expr::seq(vec![Expr::lit("let"), Expr::token("ID")]))
        .token("LET", Pattern::literal("let"))
        .token("ID", Pattern::one_or_more(Pattern::CharClass(CharSet::letters())))
        .skip("WS", Pattern::literal(" "))
        .build()
        .unwrap();

    // No implicit token: 'let' is LET.
    assert_eq!(grammar.vocabulary().max_token_type(), 3);
    assert_eq!(grammar.autocompleter().complete("").unwrap().names(), vec!["LET"]);
    assert_eq!(grammar.autocompleter().complete("let").unwrap().names(), vec!["ID"]);
}

#[test]
fn test_sets_and_wildcards() {
    // r : ('a' | B | EOF) . ;
    let grammar = GrammarBuilder::new()
        .rule(
            "r",
            Expr::seq(vec![
                Expr::set([Terminal::lit("a"), Terminal::token("B"), Terminal::Eof]),
                Expr::any(),
            ]),
        )
        .token("B", Pattern::literal("b"))
        .build()
        .unwrap();

    let completion = grammar.autocompleter().complete("").unwrap();
    assert_eq!(completion.names(), vec!["EOF", "a", "B"]);
    assert_eq!(grammar.autocompleter().complete("b").unwrap().names(), vec!["a", "B"]);
}

#[test]
fn test_non_greedy_loop_suggests_exit_first() {
    // r : 'x'*? 'y' ;
    let grammar = GrammarBuilder::new()
        .rule("r", Expr::seq(vec![Expr::star_non_greedy(Expr::lit("x")), Expr::lit("y")]))
        .build()
        .unwrap();

    assert_eq!(grammar.autocompleter().complete("xx").unwrap().names(), vec!["y", "x"]);
}

#[test]
fn test_plus_requires_one_iteration() {
    let grammar = GrammarBuilder::new()
        .rule("r", Expr::seq(vec![Expr::plus(Expr::lit("x")), Expr::lit("y")]))
        .build()
        .unwrap();

    assert_eq!(grammar.autocompleter().complete("").unwrap().names(), vec!["x"]);
    assert_eq!(grammar.autocompleter().complete("x").unwrap().names(), vec!["x", "y"]);
}

#[test]
fn test_grammar_errors() {
    let error = GrammarBuilder::new().build().unwrap_err();
    assert_eq!(error, GrammarError::EmptyGrammar);

    let error = GrammarBuilder::new()
        .rule("r", Expr::rule("nowhere"))
        .build()
        .unwrap_err();
    assert_eq!(error.to_string(), "rule 'r' references undefined rule 'nowhere'");

    let error = GrammarBuilder::new()
        .rule("r", Expr::star(Expr::opt(Expr::lit("x"))))
        .build()
        .unwrap_err();
    assert_eq!(error.to_string(), "rule 'r' repeats a block that can match the empty string");

    let error = GrammarBuilder::new()
        .rule("a", Expr::seq(vec![Expr::rule("b"), Expr::lit("x")]))
        .rule("b", Expr::seq(vec![Expr::rule("a"), Expr::lit("y")]))
        .build()
        .unwrap_err();
    assert!(matches!(error, GrammarError::LeftRecursion(_)));
}

#[test]
fn test_grammar_is_a_token_source() {
    let grammar = json();
    let tokens = grammar.tokenize("{\"k\": [1, true]}").unwrap();
    let types: Vec<_> = tokens.iter().map(|token| token.token_type).collect();
    // { STRING : [ NUMBER , true ] }
    assert_eq!(types, vec![4, 10, 7, 8, 11, 5, 1, 9, 6]);
    assert!(grammar.lexer_atn().is_default_channel(10));
    assert!(!grammar.lexer_atn().is_default_channel(12));
}
