//! # Error Types
//!
//! - [`CompletionError`]: fatal failures of one completion request
//! - [`LexerError`]: the input could not be tokenized before the caret
//! - [`GrammarError`]: a grammar could not be compiled into an ATN
//!
//! Dead ends inside the traversal are not errors: a branch that cannot
//! continue simply contributes no suggestions.
//!
//! When the `diagnostics` feature is enabled, errors implement
//! [`miette::Diagnostic`].

use crate::atn::RuleIndex;
use crate::text::TextRange;
use thiserror::Error;

#[cfg(feature = "diagnostics")]
use miette::Diagnostic;

#[derive(Debug, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum CompletionError {
    /// The configured starting rule is not a rule of the automaton.
    #[error("unexpected starting rule: {rule}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(completion::invalid_initial_rule)))]
    InvalidInitialRule { rule: RuleIndex },

    #[error(transparent)]
    #[cfg_attr(feature = "diagnostics", diagnostic(transparent))]
    Lexer(#[from] LexerError),
}

/// Lexical error with its location.
///
/// Lines are 1-based and columns 0-based.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
#[error("line {line}:{column} {kind}")]
pub struct LexerError {
    #[cfg_attr(feature = "diagnostics", label)]
    pub span: TextRange,
    pub line: u32,
    pub column: u32,
    #[source]
    pub kind: LexerErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum LexerErrorKind {
    #[error("token recognition error at: '{char}'")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(lexer::unexpected_char)))]
    UnexpectedChar { char: char },
}

impl LexerErrorKind {
    #[must_use]
    pub const fn unexpected_char(char: char) -> Self {
        Self::UnexpectedChar { char }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum GrammarError {
    #[error("grammar defines no parser rules")]
    EmptyGrammar,

    #[error("rule '{rule}' references undefined rule '{name}'")]
    UndefinedRule { rule: String, name: String },

    #[error("rule '{rule}' references undefined token '{name}'")]
    UndefinedToken { rule: String, name: String },

    #[error("rule '{0}' is defined more than once")]
    DuplicateRule(String),

    #[error("token '{0}' is defined more than once")]
    DuplicateToken(String),

    #[error("rule '{rule}' uses an empty literal")]
    EmptyLiteral { rule: String },

    #[error("rule '{rule}' repeats a block that can match the empty string")]
    NullableClosure { rule: String },

    #[error("left recursion through {}", format_cycles(.0))]
    LeftRecursion(Vec<Vec<String>>),
}

fn format_cycles(cycles: &[Vec<String>]) -> String {
    cycles
        .iter()
        .map(|cycle| cycle.join(" -> "))
        .collect::<Vec<_>>()
        .join("; ")
}
