//! Parser ATN construction.
//!
//! Every rule gets a start and a stop state; expressions are wired between
//! them Thompson-style. Blocks with more than one way forward get a decision
//! state whose outgoing edges are ordered by preference: greedy blocks list
//! the "enter" edge first, non-greedy blocks the "exit" edge.

use crate::atn::{Atn, IntervalSet, RuleIndex, StateId, StateKind, TokenType, Transition, EOF};
use crate::error::GrammarError;
use crate::grammar::builder::{RuleBody, RuleDef};
use crate::grammar::validate::RuleTable;
use crate::grammar::{Expr, Terminal};
use hashbrown::HashMap;

/// Token types of literals and lexer rule names.
#[derive(Debug, Default)]
pub(crate) struct TokenTable<'g> {
    pub literals: HashMap<&'g str, TokenType, ahash::RandomState>,
    pub symbols: HashMap<&'g str, TokenType, ahash::RandomState>,
}

pub(crate) fn compile_atn(
    rules: &[RuleDef],
    table: &RuleTable<'_>,
    tokens: &TokenTable<'_>,
    max_token_type: TokenType,
) -> Result<Atn, GrammarError> {
    let mut atn = Atn::new(max_token_type);
    for _ in rules {
        atn.add_rule();
    }

    let mut compiler = Compiler {
        atn,
        table,
        tokens,
        current: "",
    };
    for (index, rule) in rules.iter().enumerate() {
        compiler.current = rule.name.as_str();
        let (Some(start), Some(stop)) = (compiler.atn.rule_start(index), compiler.atn.rule_stop(index)) else {
            continue;
        };
        let end = match &rule.body {
            RuleBody::Plain(expr) => compiler.expr(index, expr, start)?,
            RuleBody::Precedence {
                primaries,
                operators,
            } => compiler.precedence_body(index, primaries, operators, start)?,
        };
        compiler.atn.add_transition(end, Transition::Epsilon { target: stop });
    }
    Ok(compiler.atn)
}

struct Compiler<'a, 'g> {
    atn: Atn,
    table: &'a RuleTable<'g>,
    tokens: &'a TokenTable<'g>,
    /// Rule being compiled, for error messages.
    current: &'a str,
}

impl Compiler<'_, '_> {
    fn expr(&mut self, rule: RuleIndex, expr: &Expr, from: StateId) -> Result<StateId, GrammarError> {
        let end = match expr {
            Expr::Literal(text) => {
                let label = self.terminal(&Terminal::Literal(text.clone()))?;
                self.consume(rule, from, |target| Transition::Atom { target, label })
            }
            Expr::Token(name) => {
                let label = self.terminal(&Terminal::Token(name.clone()))?;
                self.consume(rule, from, |target| Transition::Atom { target, label })
            }
            Expr::Eof => self.consume(rule, from, |target| Transition::Atom { target, label: EOF }),
            Expr::Set(terminals) => {
                let set = self.label(terminals)?;
                self.consume(rule, from, |target| Transition::Set { target, set })
            }
            Expr::Not(terminals) => {
                let set = self.label(terminals)?;
                self.consume(rule, from, |target| Transition::NotSet { target, set })
            }
            Expr::Any => self.consume(rule, from, |target| Transition::Wildcard { target }),
            Expr::Rule(name) => {
                let callee = self.callee(name)?;
                self.call(rule, callee, from, 0)
            }
            Expr::Seq(parts) => {
                let mut current = from;
                for part in parts {
                    current = self.expr(rule, part, current)?;
                }
                current
            }
            Expr::Alt(alternatives) => {
                let decision = self.linked(rule, from, StateKind::Decision);
                let join = self.atn.add_state(rule, StateKind::Basic);
                for alternative in alternatives {
                    let entry = self.linked(rule, decision, StateKind::Basic);
                    let end = self.expr(rule, alternative, entry)?;
                    self.epsilon(end, join);
                }
                join
            }
            Expr::Optional { expr, greedy } => {
                let decision = self.linked(rule, from, StateKind::Decision);
                let body = self.atn.add_state(rule, StateKind::Basic);
                let join = self.atn.add_state(rule, StateKind::Basic);
                self.choose(decision, body, join, *greedy);
                let end = self.expr(rule, expr, body)?;
                self.epsilon(end, join);
                join
            }
            Expr::Star { expr, greedy } => {
                let entry = self.linked(rule, from, StateKind::Decision);
                let body = self.atn.add_state(rule, StateKind::Basic);
                let exit = self.atn.add_state(rule, StateKind::Basic);
                self.choose(entry, body, exit, *greedy);
                let end = self.expr(rule, expr, body)?;
                self.epsilon(end, entry);
                exit
            }
            Expr::Plus { expr, greedy } => {
                let body = self.linked(rule, from, StateKind::Basic);
                let end = self.expr(rule, expr, body)?;
                let loop_back = self.linked(rule, end, StateKind::Decision);
                let exit = self.atn.add_state(rule, StateKind::Basic);
                self.choose(loop_back, body, exit, *greedy);
                exit
            }
            Expr::Empty => from,
        };
        Ok(end)
    }

    /// Left-recursion elimination for `e : e op_0 e | ... | e op_{n-1} e | primary ;`.
    ///
    /// Operator `k` only applies while the invocation's precedence is at most
    /// `n - k`, and its right operand is parsed at precedence `n - k + 1`.
    fn precedence_body(
        &mut self,
        rule: RuleIndex,
        primaries: &[Expr],
        operators: &[Expr],
        from: StateId,
    ) -> Result<StateId, GrammarError> {
        let primary_end = self.expr(rule, &Expr::Alt(primaries.to_vec()), from)?;
        let entry = self.linked(rule, primary_end, StateKind::Decision);
        let count = i32::try_from(operators.len()).unwrap_or(i32::MAX);

        for (k, operator) in (0_i32..).zip(operators) {
            let precedence = count - k;
            let guarded = self.atn.add_state(rule, StateKind::Basic);
            self.atn.add_transition(
                entry,
                Transition::PrecedencePredicate {
                    target: guarded,
                    precedence,
                },
            );
            let operator_end = self.expr(rule, operator, guarded)?;
            let follow = self.call(rule, rule, operator_end, precedence + 1);
            self.epsilon(follow, entry);
        }

        Ok(self.linked(rule, entry, StateKind::Basic))
    }

    fn call(&mut self, rule: RuleIndex, callee: RuleIndex, from: StateId, precedence: i32) -> StateId {
        let follow = self.atn.add_state(rule, StateKind::Basic);
        if let Some(target) = self.atn.rule_start(callee) {
            self.atn.add_transition(
                from,
                Transition::RuleCall {
                    target,
                    rule: callee,
                    follow,
                    precedence,
                },
            );
        }
        follow
    }

    fn consume(&mut self, rule: RuleIndex, from: StateId, edge: impl FnOnce(StateId) -> Transition) -> StateId {
        let next = self.atn.add_state(rule, StateKind::Basic);
        self.atn.add_transition(from, edge(next));
        next
    }

    /// New state reached from `from` by an epsilon edge.
    fn linked(&mut self, rule: RuleIndex, from: StateId, kind: StateKind) -> StateId {
        let next = self.atn.add_state(rule, kind);
        self.epsilon(from, next);
        next
    }

    fn epsilon(&mut self, from: StateId, target: StateId) {
        self.atn.add_transition(from, Transition::Epsilon { target });
    }

    fn choose(&mut self, decision: StateId, enter: StateId, exit: StateId, greedy: bool) {
        let (first, second) = if greedy { (enter, exit) } else { (exit, enter) };
        self.epsilon(decision, first);
        self.epsilon(decision, second);
    }

    fn callee(&self, name: &str) -> Result<RuleIndex, GrammarError> {
        self.table
            .get(name)
            .copied()
            .ok_or_else(|| GrammarError::UndefinedRule {
                rule: self.current.to_string(),
                name: name.to_string(),
            })
    }

    fn terminal(&self, terminal: &Terminal) -> Result<TokenType, GrammarError> {
        let found = match terminal {
            Terminal::Literal(text) => self.tokens.literals.get(text.as_str()),
            Terminal::Token(name) => self.tokens.symbols.get(name.as_str()),
            Terminal::Eof => return Ok(EOF),
        };
        found.copied().ok_or_else(|| GrammarError::UndefinedToken {
            rule: self.current.to_string(),
            name: match terminal {
                Terminal::Literal(text) => format!("'{text}'"),
                Terminal::Token(name) => name.to_string(),
                Terminal::Eof => "EOF".to_string(),
            },
        })
    }

    fn label(&self, terminals: &[Terminal]) -> Result<IntervalSet, GrammarError> {
        let mut set = IntervalSet::new();
        for terminal in terminals {
            set.add_one(self.terminal(terminal)?);
        }
        Ok(set)
    }
}
