//! # Grammar Module
//!
//! A small combined-grammar compiler producing the parser ATN, the token
//! vocabulary and a lexer in one step, so completion can be driven without an
//! external parser generator.
//!
//! ## Overview
//!
//! - [`Expr`]: right-hand sides of parser rules
//! - [`GrammarBuilder`]: collects parser and lexer rules and compiles them
//! - [`Grammar`]: the compiled result, usable directly as the recognizer and
//!   token source of an [`Autocompleter`]
//! - [`Vocabulary`]: literal and symbolic token names
//!
//! ## Usage
//!
//! ```rust
//! use atn_complete::grammar::{Expr, GrammarBuilder};
//!
//! // r : 'A' ('B' | 'C' | 'D') EOF ;
//! let grammar = GrammarBuilder::new()
//!     .rule(
//!         "r",
//!         Expr::seq(vec![
//!             Expr::lit("A"),
//!             Expr::alt(vec![Expr::lit("B"), Expr::lit("C"), Expr::lit("D")]),
//!             Expr::eof(),
//!         ]),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let completion = grammar.autocompleter().complete("A").unwrap();
//! assert_eq!(completion.names(), vec!["B", "C", "D"]);
//! ```

pub mod builder;
pub(crate) mod compile;
pub mod expr;
pub(crate) mod validate;
pub mod vocabulary;

pub use builder::GrammarBuilder;
pub use expr::{Expr, Terminal};
pub use vocabulary::Vocabulary;

use crate::atn::{Atn, LexerAtn, RuleIndex};
use crate::completion::{Autocompleter, Recognizer};
use crate::error::LexerError;
use crate::lexer::{Lexer, Token, TokenSource};
use compact_str::CompactString;

/// A compiled combined grammar.
#[derive(Debug, Clone)]
pub struct Grammar {
    atn: Atn,
    rule_names: Vec<CompactString>,
    vocabulary: Vocabulary,
    lexer: Lexer,
}

impl Grammar {
    #[must_use]
    pub fn rule_index(&self, name: &str) -> Option<RuleIndex> {
        self.rule_names.iter().position(|rule| rule == name)
    }

    #[must_use]
    pub const fn lexer(&self) -> &Lexer {
        &self.lexer
    }

    /// Completion over this grammar with the default configuration.
    #[must_use]
    pub fn autocompleter(&self) -> Autocompleter<'_, Self, Self> {
        Autocompleter::new(self, self)
    }
}

impl Recognizer for Grammar {
    fn atn(&self) -> &Atn {
        &self.atn
    }

    fn rule_names(&self) -> &[CompactString] {
        &self.rule_names
    }

    fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }
}

impl TokenSource for Grammar {
    fn tokenize(&self, input: &str) -> Result<Vec<Token>, LexerError> {
        self.lexer.tokenize(input)
    }

    fn lexer_atn(&self) -> &LexerAtn {
        self.lexer.lexer_atn()
    }
}
