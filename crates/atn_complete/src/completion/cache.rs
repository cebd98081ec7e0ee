//! Per-call cache of what every rule can start with.

use crate::atn::{Atn, RuleIndex, TokenType};
use crate::completion::engine::{CaretStream, Engine, EngineOptions};
use crate::completion::suggestion::{merge, RawSuggestion, SuggestionId};
use crate::completion::RuleSet;
use hashbrown::HashSet;
use tracing::debug;

/// First suggestions of one rule explored in isolation.
#[derive(Debug, Clone, Default)]
pub struct CacheEntry {
    /// Merged suggestions; chains start with the rule itself.
    pub suggestions: Vec<RawSuggestion>,
    first_tokens: HashSet<TokenType, ahash::RandomState>,
    /// Whether the rule can complete without consuming a token.
    pub nullable: bool,
}

impl CacheEntry {
    #[must_use]
    pub fn starts_with(&self, token_type: TokenType) -> bool {
        self.first_tokens.contains(&token_type)
    }
}

/// Rule index to [`CacheEntry`].
///
/// Built once per completion call by running the engine on every rule with
/// nothing but the caret as input.
#[derive(Debug, Clone, Default)]
pub struct FirstTokenCache {
    entries: Vec<CacheEntry>,
}

impl FirstTokenCache {
    #[must_use]
    pub fn build(atn: &Atn) -> Self {
        let tokens = CaretStream::caret_only();
        let none = RuleSet::default();
        let options = EngineOptions {
            suggest_rules: &none,
            recovery: &[],
            cache: None,
        };

        let entries: Vec<CacheEntry> = (0..atn.rule_count())
            .map(|rule| {
                let traversal = Engine::new(atn, &tokens, options).run(rule);
                let suggestions = merge(traversal.suggestions);
                let first_tokens = suggestions
                    .iter()
                    .filter_map(|suggestion| match suggestion.id {
                        SuggestionId::Token(token_type) => Some(token_type),
                        SuggestionId::Rule(_) => None,
                    })
                    .collect();
                CacheEntry {
                    suggestions,
                    first_tokens,
                    nullable: traversal.reached_end,
                }
            })
            .collect();

        debug!(
            rules = entries.len(),
            suggestions = entries.iter().map(|entry| entry.suggestions.len()).sum::<usize>(),
            nullable = entries.iter().filter(|entry| entry.nullable).count(),
            "first-token cache built"
        );
        Self { entries }
    }

    #[must_use]
    pub fn entry(&self, rule: RuleIndex) -> Option<&CacheEntry> {
        self.entries.get(rule)
    }

    /// Whether a call into `rule` can succeed with `token_type` next.
    ///
    /// Nullable rules and rules without an entry never rule a token out.
    #[must_use]
    pub fn may_start_with(&self, rule: RuleIndex, token_type: TokenType) -> bool {
        self.entry(rule)
            .map_or(true, |entry| entry.nullable || entry.starts_with(token_type))
    }

    #[must_use]
    pub fn is_nullable(&self, rule: RuleIndex) -> bool {
        self.entry(rule).is_some_and(|entry| entry.nullable)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
