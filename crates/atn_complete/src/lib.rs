//! # atn_complete
//!
//! Grammar-driven code completion: given the text in front of the caret, find
//! every token (or configured rule) a parser could accept next.
//!
//! ## Overview
//!
//! Completion works on the augmented transition network (ATN) a grammar
//! compiles to, not on a parser:
//!
//! - **Exhaustive**: every alternative is explored, so every candidate is found
//! - **Contextual**: each suggestion carries the rule chains that led to it
//! - **Precedence aware**: left-recursive operator rules only suggest operators
//!   that may legally appear at the caret
//! - **Recovering**: configurable recovery rules skip past malformed input
//! - **Fast**: a per-call first-token cache replaces descents at the caret
//!
//! ## Quick Start
//!
//! ```rust
//! use atn_complete::{AutocompleteConfig, CharSet, Expr, GrammarBuilder, Pattern};
//!
//! // expr : expr '*' expr | expr '+' expr | NUM ;
//! let grammar = GrammarBuilder::new()
//!     .precedence_rule("expr", vec![Expr::token("NUM")], vec![Expr::lit("*"), Expr::lit("+")])
//!     .token("NUM", Pattern::one_or_more(Pattern::CharClass(CharSet::digits())))
//!     .skip("WS", Pattern::one_or_more(Pattern::CharClass(CharSet::whitespace())))
//!     .build()
//!     .unwrap();
//!
//! let completer = grammar.autocompleter();
//! assert_eq!(completer.complete("1 +").unwrap().names(), vec!["NUM"]);
//! assert_eq!(completer.complete("1 + 2").unwrap().names(), vec!["*", "+"]);
//!
//! let without_cache = grammar
//!     .autocompleter()
//!     .with_config(AutocompleteConfig::default().with_first_token_cache(false));
//! assert_eq!(without_cache.complete("1 + 2").unwrap().names(), vec!["*", "+"]);
//! ```
//!
//! ## Modules
//!
//! - [`atn`]: the transition network and lexer command lookup
//! - [`grammar`]: a combined-grammar compiler producing ATN, vocabulary and lexer
//! - [`lexer`]: tokenization and the [`TokenSource`] seam
//! - [`completion`]: the traversal engine and the [`Autocompleter`] façade
//! - [`error`]: error types
//! - [`text`]: offsets and line/column positions

pub mod atn;
pub mod completion;
pub mod error;
pub mod grammar;
pub mod lexer;
pub mod text;

// Re-export commonly used types
pub use atn::{Atn, LexerAtn, RuleIndex, StateId, TokenType, Transition, EOF};
pub use completion::{
    AutocompleteConfig, Autocompleter, Completion, Recognizer, RecoveryRule, RecoveryStats, RecoveryTarget,
    RuleSet, Suggestion, SuggestionId,
};
pub use error::{CompletionError, GrammarError, LexerError};
pub use grammar::{Expr, Grammar, GrammarBuilder, Terminal, Vocabulary};
pub use lexer::{CharSet, LexRule, Lexer, LexerBuilder, Pattern, Token, TokenSource};
pub use text::{TextRange, TextSize};
