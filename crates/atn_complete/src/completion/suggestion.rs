//! Suggestions as found by the engine and as returned to callers.

use crate::atn::{RuleIndex, TokenType};
use crate::grammar::Vocabulary;
use compact_str::CompactString;
use hashbrown::HashMap;
#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Rules enclosing a suggestion, outermost first.
pub type RuleChain = SmallVec<[RuleIndex; 8]>;

/// Identity of a suggestion. Tokens and rules never compare equal, even when
/// their raw numbers coincide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum SuggestionId {
    Token(TokenType),
    Rule(RuleIndex),
}

/// A suggestion before name resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSuggestion {
    pub id: SuggestionId,
    /// One chain per distinct path that produced this suggestion.
    pub contexts: SmallVec<[RuleChain; 1]>,
}

impl RawSuggestion {
    #[must_use]
    pub fn new(id: SuggestionId, context: RuleChain) -> Self {
        let mut contexts = SmallVec::new();
        contexts.push(context);
        Self { id, contexts }
    }
}

/// De-duplicate by identity, keeping first-seen order.
///
/// Contexts of duplicates are appended to the first occurrence; a chain that
/// is already recorded is not repeated.
///
/// ```rust
/// use atn_complete::completion::{merge, RawSuggestion, SuggestionId};
/// use smallvec::smallvec;
///
/// let merged = merge(vec![
///     RawSuggestion::new(SuggestionId::Token(2), smallvec![0]),
///     RawSuggestion::new(SuggestionId::Rule(2), smallvec![0]),
///     RawSuggestion::new(SuggestionId::Token(2), smallvec![0, 1]),
/// ]);
/// assert_eq!(merged.len(), 2);
/// assert_eq!(merged[0].contexts.len(), 2);
/// ```
#[must_use]
pub fn merge(suggestions: impl IntoIterator<Item = RawSuggestion>) -> Vec<RawSuggestion> {
    let mut merged: Vec<RawSuggestion> = Vec::new();
    let mut positions: HashMap<SuggestionId, usize, ahash::RandomState> = HashMap::default();

    for suggestion in suggestions {
        match positions.get(&suggestion.id) {
            Some(&position) => {
                let existing = &mut merged[position];
                for context in suggestion.contexts {
                    if !existing.contexts.contains(&context) {
                        existing.contexts.push(context);
                    }
                }
            }
            None => {
                positions.insert(suggestion.id, merged.len());
                merged.push(suggestion);
            }
        }
    }

    merged
}

/// A completion candidate with display names resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Suggestion {
    pub id: SuggestionId,
    /// Token display name or rule name.
    pub name: CompactString,
    /// Enclosing rule names per path, outermost first.
    pub contexts: Vec<Vec<CompactString>>,
}

impl Suggestion {
    pub(crate) fn resolve(raw: RawSuggestion, rule_names: &[CompactString], vocabulary: &Vocabulary) -> Self {
        let rule_name = |rule: RuleIndex| {
            rule_names
                .get(rule)
                .cloned()
                .unwrap_or_else(|| compact_str::format_compact!("<rule {rule}>"))
        };
        let name = match raw.id {
            SuggestionId::Token(token_type) => vocabulary.display_name(token_type),
            SuggestionId::Rule(rule) => rule_name(rule),
        };
        let contexts = raw
            .contexts
            .iter()
            .map(|chain| chain.iter().map(|&rule| rule_name(rule)).collect())
            .collect();

        Self {
            id: raw.id,
            name,
            contexts,
        }
    }

    #[must_use]
    pub const fn is_rule(&self) -> bool {
        matches!(self.id, SuggestionId::Rule(_))
    }

    #[must_use]
    pub const fn token_type(&self) -> Option<TokenType> {
        match self.id {
            SuggestionId::Token(token_type) => Some(token_type),
            SuggestionId::Rule(_) => None,
        }
    }

    #[must_use]
    pub const fn rule(&self) -> Option<RuleIndex> {
        match self.id {
            SuggestionId::Rule(rule) => Some(rule),
            SuggestionId::Token(_) => None,
        }
    }

    /// Whether one of the paths ran exactly through `chain`.
    #[must_use]
    pub fn has_context(&self, chain: &[&str]) -> bool {
        self.contexts.iter().any(|context| context.iter().map(CompactString::as_str).eq(chain.iter().copied()))
    }
}

impl fmt::Display for Suggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
