use crate::atn::{TokenType, EOF};
use compact_str::{format_compact, CompactString};
#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Token names of a grammar, indexed by token type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Vocabulary {
    /// Quoted literal names (`'+'`), where a token has one.
    literal_names: Vec<Option<CompactString>>,
    symbolic_names: Vec<Option<CompactString>>,
}

impl Vocabulary {
    /// Both tables are indexed by token type; slot `0` is unused.
    #[must_use]
    pub fn new(
        literal_names: Vec<Option<CompactString>>,
        symbolic_names: Vec<Option<CompactString>>,
    ) -> Self {
        Self {
            literal_names,
            symbolic_names,
        }
    }

    #[must_use]
    pub fn max_token_type(&self) -> TokenType {
        let len = self.literal_names.len().max(self.symbolic_names.len());
        TokenType::try_from(len.saturating_sub(1)).unwrap_or(TokenType::MAX)
    }

    #[must_use]
    pub fn literal_name(&self, token_type: TokenType) -> Option<&str> {
        slot(&self.literal_names, token_type)
    }

    #[must_use]
    pub fn symbolic_name(&self, token_type: TokenType) -> Option<&str> {
        slot(&self.symbolic_names, token_type)
    }

    /// Human-readable name: symbolic name, else the literal without its
    /// quotes, else `EOF` for the end-of-input type.
    ///
    /// ```rust
    /// use atn_complete::grammar::Vocabulary;
    ///
    /// let vocabulary = Vocabulary::new(
    ///     vec![None, Some("'+'".into()), None],
    ///     vec![None, None, Some("ID".into())],
    /// );
    /// assert_eq!(vocabulary.display_name(1), "+");
    /// assert_eq!(vocabulary.display_name(2), "ID");
    /// assert_eq!(vocabulary.display_name(-1), "EOF");
    /// ```
    #[must_use]
    pub fn display_name(&self, token_type: TokenType) -> CompactString {
        if let Some(symbolic) = self.symbolic_name(token_type) {
            return symbolic.into();
        }
        if let Some(literal) = self.literal_name(token_type) {
            return strip_quotes(literal).into();
        }
        if token_type == EOF {
            return CompactString::const_new("EOF");
        }
        format_compact!("{token_type}")
    }
}

fn slot(names: &[Option<CompactString>], token_type: TokenType) -> Option<&str> {
    usize::try_from(token_type)
        .ok()
        .and_then(|index| names.get(index))
        .and_then(Option::as_deref)
}

fn strip_quotes(literal: &str) -> &str {
    literal
        .strip_prefix('\'')
        .and_then(|inner| inner.strip_suffix('\''))
        .unwrap_or(literal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbolic_name_wins_over_literal() {
        let vocabulary = Vocabulary::new(vec![None, Some("'A'".into())], vec![None, Some("A".into())]);
        assert_eq!(vocabulary.display_name(1), "A");
        assert_eq!(vocabulary.literal_name(1), Some("'A'"));
    }

    #[test]
    fn test_unknown_types_fall_back_to_number() {
        let vocabulary = Vocabulary::default();
        assert_eq!(vocabulary.display_name(EOF), "EOF");
        assert_eq!(vocabulary.display_name(7), "7");
        assert_eq!(vocabulary.symbolic_name(-3), None);
    }

    #[test]
    fn test_max_token_type() {
        let vocabulary = Vocabulary::new(vec![None, None, None], vec![None]);
        assert_eq!(vocabulary.max_token_type(), 2);
        assert_eq!(Vocabulary::default().max_token_type(), 0);
    }

    #[test]
    fn test_strip_quotes_keeps_unquoted_text() {
        assert_eq!(strip_quotes("'+'"), "+");
        assert_eq!(strip_quotes("'"), "'");
        assert_eq!(strip_quotes("plain"), "plain");
    }
}
