//! # Lexer Module
//!
//! Tokenization of the text in front of the caret.
//!
//! The completion engine only needs two things from a lexer: the tokens of the
//! input and the lexer ATN, which tells it which token types are routed off the
//! default channel. Both are exposed through [`TokenSource`], so any lexer can
//! drive completion. [`LexerBuilder`] provides a ready-made one.
//!
//! ## Usage
//!
//! ```rust
//! use atn_complete::lexer::{CharSet, LexerBuilder, Pattern, TokenSource};
//!
//! let lexer = LexerBuilder::new()
//!     .token("NUM", Pattern::one_or_more(Pattern::CharClass(CharSet::digits())))
//!     .token("PLUS", Pattern::literal("+"))
//!     .skip("WS", Pattern::one_or_more(Pattern::CharClass(CharSet::whitespace())))
//!     .build();
//!
//! let tokens = lexer.tokenize("1 + 2").unwrap();
//! assert_eq!(tokens.len(), 3);
//! assert_eq!(tokens[1].text, "+");
//! ```

pub mod builder;
pub mod nfa;
pub mod token;

pub use builder::{CharSet, LexRule, LexerBuilder, Pattern};
pub use nfa::Lexer;
pub use token::Token;

use crate::atn::LexerAtn;
use crate::error::LexerError;

/// Source of tokens for completion.
pub trait TokenSource {
    /// Tokenize the whole input, hidden-channel tokens included.
    ///
    /// # Errors
    ///
    /// Returns the first lexical error encountered.
    fn tokenize(&self, input: &str) -> Result<Vec<Token>, LexerError>;

    /// The ATN the lexer was generated from.
    fn lexer_atn(&self) -> &LexerAtn;
}
