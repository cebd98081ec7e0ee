//! Structural checks run before a grammar is compiled.
//!
//! The completion engine forgets visited states whenever it crosses a rule
//! boundary, so a cycle of rule calls that consumes nothing would never end.
//! Such grammars (left recursion through nullable prefixes, closures over
//! nullable blocks) are rejected here.

use crate::error::GrammarError;
use crate::grammar::builder::{RuleBody, RuleDef};
use crate::grammar::{Expr, Terminal};
use crate::lexer::LexRule;
use hashbrown::{HashMap, HashSet};
use smallvec::SmallVec;

pub(crate) type RuleTable<'g> = HashMap<&'g str, usize, ahash::RandomState>;

type Calls = SmallVec<[usize; 4]>;

/// Validate parser and lexer rules together.
///
/// # Errors
///
/// Returns the first problem found, in this order: an empty grammar,
/// duplicate names, empty literals, undefined references, closures over
/// nullable blocks, left recursion.
pub(crate) fn validate_grammar(
    rules: &[RuleDef],
    lexer_rules: &[LexRule],
) -> Result<(), GrammarError> {
    if rules.is_empty() {
        return Err(GrammarError::EmptyGrammar);
    }

    let table = rule_table(rules)?;
    let mut tokens: HashSet<&str, ahash::RandomState> = HashSet::default();
    for lexer_rule in lexer_rules {
        if !tokens.insert(lexer_rule.name.as_str()) {
            return Err(GrammarError::DuplicateToken(lexer_rule.name.to_string()));
        }
    }

    for rule in rules {
        for expr in rule.body.exprs() {
            check_references(&rule.name, expr, &table, &tokens)?;
        }
    }

    let nullable = compute_nullable(rules, &table);
    check_closures(rules, &table, &nullable)?;

    let cycles = detect_left_recursion(rules, &table, &nullable);
    if cycles.is_empty() {
        Ok(())
    } else {
        Err(GrammarError::LeftRecursion(cycles))
    }
}

pub(crate) fn rule_table(rules: &[RuleDef]) -> Result<RuleTable<'_>, GrammarError> {
    let mut table = RuleTable::default();
    for (index, rule) in rules.iter().enumerate() {
        if table.insert(rule.name.as_str(), index).is_some() {
            return Err(GrammarError::DuplicateRule(rule.name.to_string()));
        }
    }
    Ok(table)
}

fn check_references(
    rule: &str,
    expr: &Expr,
    table: &RuleTable<'_>,
    tokens: &HashSet<&str, ahash::RandomState>,
) -> Result<(), GrammarError> {
    let mut error = None;
    expr.walk(&mut |node| {
        if error.is_some() {
            return;
        }
        error = match node {
            Expr::Rule(name) if !table.contains_key(name.as_str()) => Some(GrammarError::UndefinedRule {
                rule: rule.to_string(),
                name: name.to_string(),
            }),
            Expr::Token(name) if !tokens.contains(name.as_str()) => Some(GrammarError::UndefinedToken {
                rule: rule.to_string(),
                name: name.to_string(),
            }),
            Expr::Literal(text) if text.is_empty() => Some(GrammarError::EmptyLiteral {
                rule: rule.to_string(),
            }),
            Expr::Set(terminals) | Expr::Not(terminals) => terminals.iter().find_map(|terminal| match terminal {
                Terminal::Token(name) if !tokens.contains(name.as_str()) => Some(GrammarError::UndefinedToken {
                    rule: rule.to_string(),
                    name: name.to_string(),
                }),
                Terminal::Literal(text) if text.is_empty() => Some(GrammarError::EmptyLiteral {
                    rule: rule.to_string(),
                }),
                _ => None,
            }),
            _ => None,
        };
    });
    error.map_or(Ok(()), Err)
}

/// Scan the left edge of `expr`: push every rule that can be called before a
/// token is consumed and return whether `expr` can match nothing at all.
fn left_edge(expr: &Expr, table: &RuleTable<'_>, nullable: &[bool], calls: &mut Calls) -> bool {
    match expr {
        Expr::Literal(_) | Expr::Token(_) | Expr::Eof | Expr::Set(_) | Expr::Not(_) | Expr::Any => false,
        Expr::Empty => true,
        Expr::Rule(name) => match table.get(name.as_str()) {
            Some(&index) => {
                calls.push(index);
                nullable.get(index).copied().unwrap_or(false)
            }
            None => false,
        },
        Expr::Seq(parts) => {
            for part in parts {
                if !left_edge(part, table, nullable, calls) {
                    return false;
                }
            }
            true
        }
        Expr::Alt(alternatives) => {
            // Every alternative contributes calls, so no short-circuit.
            let mut any = alternatives.is_empty();
            for alternative in alternatives {
                any |= left_edge(alternative, table, nullable, calls);
            }
            any
        }
        Expr::Optional { expr, .. } | Expr::Star { expr, .. } => {
            left_edge(expr, table, nullable, calls);
            true
        }
        Expr::Plus { expr, .. } => left_edge(expr, table, nullable, calls),
    }
}

fn body_left_edge(body: &RuleBody, table: &RuleTable<'_>, nullable: &[bool], calls: &mut Calls) -> bool {
    match body {
        RuleBody::Plain(expr) => left_edge(expr, table, nullable, calls),
        RuleBody::Precedence {
            primaries,
            operators,
        } => {
            let mut any = false;
            for primary in primaries {
                any |= left_edge(primary, table, nullable, calls);
            }
            if any {
                // An empty primary exposes the operator loop.
                for operator in operators {
                    left_edge(operator, table, nullable, calls);
                }
            }
            any
        }
    }
}

/// Least fixpoint of "can derive the empty string" over all rules.
pub(crate) fn compute_nullable(rules: &[RuleDef], table: &RuleTable<'_>) -> Vec<bool> {
    let mut nullable = vec![false; rules.len()];
    let mut scratch = Calls::new();
    let mut changed = true;
    while changed {
        changed = false;
        for (index, rule) in rules.iter().enumerate() {
            if nullable[index] {
                continue;
            }
            scratch.clear();
            if body_left_edge(&rule.body, table, &nullable, &mut scratch) {
                nullable[index] = true;
                changed = true;
            }
        }
    }
    nullable
}

fn check_closures(rules: &[RuleDef], table: &RuleTable<'_>, nullable: &[bool]) -> Result<(), GrammarError> {
    let mut scratch = Calls::new();
    for rule in rules {
        let mut repeats_empty = false;
        for expr in rule.body.exprs() {
            expr.walk(&mut |node| {
                if let Expr::Star { expr, .. } | Expr::Plus { expr, .. } = node {
                    scratch.clear();
                    repeats_empty |= left_edge(expr, table, nullable, &mut scratch);
                }
            });
        }
        // Operators of a precedence rule sit inside its loop as well.
        if let RuleBody::Precedence { operators, .. } = &rule.body {
            for operator in operators {
                scratch.clear();
                repeats_empty |= left_edge(operator, table, nullable, &mut scratch);
            }
        }
        if repeats_empty {
            return Err(GrammarError::NullableClosure {
                rule: rule.name.to_string(),
            });
        }
    }
    Ok(())
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    New,
    OnPath,
    Done,
}

/// Every cycle of rules calling each other without consuming a token.
fn detect_left_recursion(rules: &[RuleDef], table: &RuleTable<'_>, nullable: &[bool]) -> Vec<Vec<String>> {
    let edges: Vec<Calls> = rules
        .iter()
        .map(|rule| {
            let mut calls = Calls::new();
            body_left_edge(&rule.body, table, nullable, &mut calls);
            calls
        })
        .collect();

    let mut marks = vec![Mark::New; rules.len()];
    let mut cycles = Vec::new();
    for root in 0..rules.len() {
        if marks[root] != Mark::New {
            continue;
        }
        // Iterative DFS: (rule, next edge to examine).
        let mut path: Vec<(usize, usize)> = vec![(root, 0)];
        marks[root] = Mark::OnPath;
        while let Some(top) = path.last_mut() {
            let node = top.0;
            let Some(&callee) = edges[node].get(top.1) else {
                marks[node] = Mark::Done;
                path.pop();
                continue;
            };
            top.1 += 1;
            match marks[callee] {
                Mark::New => {
                    marks[callee] = Mark::OnPath;
                    path.push((callee, 0));
                }
                Mark::OnPath => {
                    let start = path.iter().position(|&(rule, _)| rule == callee).unwrap_or(0);
                    let mut cycle: Vec<String> = path[start..]
                        .iter()
                        .map(|&(rule, _)| rules[rule].name.to_string())
                        .collect();
                    cycle.push(rules[callee].name.to_string());
                    cycles.push(cycle);
                }
                Mark::Done => {}
            }
        }
    }
    cycles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Pattern;

    fn plain(name: &str, expr: Expr) -> RuleDef {
        RuleDef {
            name: name.into(),
            body: RuleBody::Plain(expr),
        }
    }

    fn lex(name: &str) -> LexRule {
        LexRule::new(name, Pattern::literal(name.to_lowercase()))
    }

    #[test]
    fn test_valid_grammar() {
        let rules = vec![
            plain("a", Expr::seq(vec![Expr::opt(Expr::rule("b")), Expr::token("X")])),
            plain("b", Expr::star(Expr::lit("y"))),
        ];
        assert_eq!(validate_grammar(&rules, &[lex("X")]), Ok(()));
    }

    #[test]
    fn test_empty_grammar() {
        assert_eq!(validate_grammar(&[], &[]), Err(GrammarError::EmptyGrammar));
    }

    #[test]
    fn test_undefined_references() {
        let rules = vec![plain("a", Expr::rule("missing"))];
        assert_eq!(
            validate_grammar(&rules, &[]),
            Err(GrammarError::UndefinedRule {
                rule: "a".into(),
                name: "missing".into()
            })
        );

        let rules = vec![plain("a", Expr::not([Terminal::token("NOPE")]))];
        assert!(matches!(
            validate_grammar(&rules, &[]),
            Err(GrammarError::UndefinedToken { .. })
        ));
    }

    #[test]
    fn test_duplicates() {
        let rules = vec![plain("a", Expr::lit("x")), plain("a", Expr::lit("y"))];
        assert_eq!(validate_grammar(&rules, &[]), Err(GrammarError::DuplicateRule("a".into())));

        let rules = vec![plain("a", Expr::lit("x"))];
        assert_eq!(
            validate_grammar(&rules, &[lex("X"), lex("X")]),
            Err(GrammarError::DuplicateToken("X".into()))
        );
    }

    #[test]
    fn test_empty_literal() {
        let rules = vec![plain("a", Expr::lit(""))];
        assert_eq!(
            validate_grammar(&rules, &[]),
            Err(GrammarError::EmptyLiteral { rule: "a".into() })
        );
    }

    #[test]
    fn test_nullable_fixpoint() {
        let rules = vec![
            plain("a", Expr::seq(vec![Expr::rule("b"), Expr::rule("c")])),
            plain("b", Expr::opt(Expr::lit("x"))),
            plain("c", Expr::alt(vec![Expr::lit("y"), Expr::rule("b")])),
            plain("d", Expr::plus(Expr::lit("z"))),
        ];
        let table = rule_table(&rules).unwrap();
        assert_eq!(compute_nullable(&rules, &table), vec![true, true, true, false]);
    }

    #[test]
    fn test_closure_over_nullable_block() {
        let rules = vec![
            plain("a", Expr::star(Expr::rule("b"))),
            plain("b", Expr::opt(Expr::lit("x"))),
        ];
        assert_eq!(
            validate_grammar(&rules, &[]),
            Err(GrammarError::NullableClosure { rule: "a".into() })
        );
    }

    #[test]
    fn test_direct_left_recursion() {
        let rules = vec![plain(
            "expr",
            Expr::alt(vec![
                Expr::seq(vec![Expr::rule("expr"), Expr::lit("+"), Expr::lit("1")]),
                Expr::lit("1"),
            ]),
        )];
        assert_eq!(
            validate_grammar(&rules, &[]),
            Err(GrammarError::LeftRecursion(vec![vec!["expr".into(), "expr".into()]]))
        );
    }

    #[test]
    fn test_indirect_left_recursion_through_nullable_prefix() {
        let rules = vec![
            plain("a", Expr::seq(vec![Expr::rule("opt"), Expr::rule("b")])),
            plain("b", Expr::seq(vec![Expr::rule("a"), Expr::lit("x")])),
            plain("opt", Expr::opt(Expr::lit("o"))),
        ];
        assert_eq!(
            validate_grammar(&rules, &[]),
            Err(GrammarError::LeftRecursion(vec![vec!["a".into(), "b".into(), "a".into()]]))
        );
    }

    #[test]
    fn test_right_recursion_is_fine() {
        let rules = vec![plain(
            "list",
            Expr::seq(vec![Expr::lit("x"), Expr::opt(Expr::rule("list"))]),
        )];
        assert_eq!(validate_grammar(&rules, &[]), Ok(()));
    }

    #[test]
    fn test_precedence_rule_operators_must_consume() {
        let rules = vec![RuleDef {
            name: "e".into(),
            body: RuleBody::Precedence {
                primaries: vec![Expr::lit("1")],
                operators: vec![Expr::opt(Expr::lit("+"))],
            },
        }];
        assert_eq!(
            validate_grammar(&rules, &[]),
            Err(GrammarError::NullableClosure { rule: "e".into() })
        );
    }
}
