//! Serde round trips of configuration and results.

#![cfg(feature = "serialize")]

use atn_complete::completion::{AutocompleteConfig, Completion, RecoveryRule};
use atn_complete::grammar::{Expr, GrammarBuilder};
use atn_complete::Recognizer;

#[test]
fn test_config_from_json() {
    let config: AutocompleteConfig = serde_json::from_str(
        r#"{
            "initial_rule": 1,
            "suggest_rules": [2],
            "recovery": [{
                "if_in_rule": 1,
                "and_find_token": 3,
                "then": "FinishRule",
                "skip_one": true,
                "nested": true
            }]
        }"#,
    )
    .unwrap();

    assert_eq!(config.initial_rule, 1);
    assert!(config.suggest_rules.contains(&2));
    assert_eq!(config.recovery, vec![RecoveryRule::finish_rule(1, 3).skip_one()]);
    // Missing fields keep their defaults.
    assert!(config.first_token_cache);
}

#[test]
fn test_completion_round_trip() {
    let grammar = GrammarBuilder::new()
        .rule("first", Expr::seq(vec![Expr::lit("x"), Expr::rule("second")]))
        .rule("second", Expr::alt(vec![Expr::lit("a"), Expr::lit("b")]))
        .build()
        .unwrap();
    let completion = grammar.autocompleter().complete("x").unwrap();

    let json = serde_json::to_string(&completion).unwrap();
    let restored: Completion = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, completion);
    assert_eq!(restored.names(), vec!["a", "b"]);
}

#[test]
fn test_atn_round_trip() {
    let grammar = GrammarBuilder::new()
        .rule("r", Expr::seq(vec![Expr::lit("a"), Expr::star(Expr::lit("b"))]))
        .build()
        .unwrap();

    let json = serde_json::to_value(grammar.atn()).unwrap();
    let restored: atn_complete::Atn = serde_json::from_value(json).unwrap();
    assert_eq!(&restored, grammar.atn());
}
