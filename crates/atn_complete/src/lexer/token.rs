use crate::atn::{TokenType, DEFAULT_CHANNEL};
use crate::text::TextRange;
use compact_str::CompactString;
#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// A token produced by a [`TokenSource`](crate::lexer::TokenSource).
///
/// ```rust
/// use atn_complete::lexer::Token;
/// use atn_complete::text::TextRange;
///
/// let token = Token::new(3, "let", TextRange::from_indices(0, 3));
/// assert!(token.is_default_channel());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Token {
    pub token_type: TokenType,
    /// Channel the lexer placed the token on; `0` is what the parser sees.
    pub channel: i32,
    pub text: CompactString,
    pub range: TextRange,
}

impl Token {
    /// Default-channel token.
    #[must_use]
    pub fn new(token_type: TokenType, text: impl Into<CompactString>, range: TextRange) -> Self {
        Self {
            token_type,
            channel: DEFAULT_CHANNEL,
            text: text.into(),
            range,
        }
    }

    #[must_use]
    pub fn on_channel(mut self, channel: i32) -> Self {
        self.channel = channel;
        self
    }

    #[inline]
    #[must_use]
    pub fn is_default_channel(&self) -> bool {
        self.channel == DEFAULT_CHANNEL
    }
}
