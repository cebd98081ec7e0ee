//! # Completion
//!
//! The [`Autocompleter`] façade: tokenize the input, simulate the parser ATN up
//! to the caret and report what could come next.
//!
//! ## Pipeline
//!
//! 1. Check that the configured starting rule exists.
//! 2. Tokenize with the [`TokenSource`]; drop off-channel tokens unless
//!    [`AutocompleteConfig::include_non_default_channel_tokens`] is set.
//! 3. Build the [`FirstTokenCache`] (unless disabled).
//! 4. Run the [`Engine`] from the starting rule.
//! 5. [`merge`] duplicates, optionally drop tokens whose lexer rule can put
//!    them off the default channel, and resolve names.
//!
//! ## Example
//!
//! ```rust
//! use atn_complete::completion::AutocompleteConfig;
//! use atn_complete::grammar::{Expr, GrammarBuilder};
//!
//! // first : 'x' second ; second : 'a' ;
//! let grammar = GrammarBuilder::new()
//!     .rule("first", Expr::seq(vec![Expr::lit("x"), Expr::rule("second")]))
//!     .rule("second", Expr::lit("a"))
//!     .build()
//!     .unwrap();
//!
//! let completion = grammar.autocompleter().complete("x").unwrap();
//! assert_eq!(completion.names(), vec!["a"]);
//! assert!(completion.suggestions[0].has_context(&["first", "second"]));
//!
//! let rules_only = grammar
//!     .autocompleter()
//!     .with_config(AutocompleteConfig::default().with_suggest_rules([1]))
//!     .complete("x")
//!     .unwrap();
//! assert_eq!(rules_only.names(), vec!["second"]);
//! assert!(rules_only.suggestions[0].is_rule());
//! ```

pub mod cache;
pub mod engine;
pub mod recovery;
pub mod suggestion;

pub use cache::{CacheEntry, FirstTokenCache};
pub use engine::{CaretStream, Engine, EngineOptions, Lookahead, Traversal};
pub use recovery::{RecoveryAttempts, RecoveryRule, RecoveryStats, RecoveryTarget};
pub use suggestion::{merge, RawSuggestion, RuleChain, Suggestion, SuggestionId};

use crate::atn::{Atn, RuleIndex};
use crate::error::CompletionError;
use crate::grammar::Vocabulary;
use crate::lexer::TokenSource;
use compact_str::CompactString;
use hashbrown::HashSet;
#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Set of rule indices.
pub type RuleSet = HashSet<RuleIndex, ahash::RandomState>;

/// The parser side of a grammar: its ATN and the names needed for display.
pub trait Recognizer {
    fn atn(&self) -> &Atn;

    /// Rule names indexed by rule.
    fn rule_names(&self) -> &[CompactString];

    fn vocabulary(&self) -> &Vocabulary;
}

/// Options of an [`Autocompleter`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serialize", serde(default))]
pub struct AutocompleteConfig {
    /// Drop suggested tokens whose lexer rule can emit them off the default
    /// channel (or skip them).
    pub ignore_suggestions_in_non_default_channels: bool,
    /// Rule the simulation starts from.
    pub initial_rule: RuleIndex,
    /// Rules suggested as a whole instead of by their first tokens.
    pub suggest_rules: RuleSet,
    /// Recovery rules; for a given rule the first one listed applies.
    pub recovery: Vec<RecoveryRule>,
    /// Feed tokens lexed onto other channels to the parser simulation.
    pub include_non_default_channel_tokens: bool,
    /// Build the first-token cache before traversing.
    pub first_token_cache: bool,
}

impl Default for AutocompleteConfig {
    fn default() -> Self {
        Self {
            ignore_suggestions_in_non_default_channels: false,
            initial_rule: 0,
            suggest_rules: RuleSet::default(),
            recovery: Vec::new(),
            include_non_default_channel_tokens: false,
            first_token_cache: true,
        }
    }
}

impl AutocompleteConfig {
    #[must_use]
    pub fn with_initial_rule(mut self, rule: RuleIndex) -> Self {
        self.initial_rule = rule;
        self
    }

    #[must_use]
    pub fn with_suggest_rules(mut self, rules: impl IntoIterator<Item = RuleIndex>) -> Self {
        self.suggest_rules.extend(rules);
        self
    }

    #[must_use]
    pub fn with_recovery(mut self, rule: RecoveryRule) -> Self {
        self.recovery.push(rule);
        self
    }

    #[must_use]
    pub fn with_ignore_suggestions_in_non_default_channels(mut self, ignore: bool) -> Self {
        self.ignore_suggestions_in_non_default_channels = ignore;
        self
    }

    #[must_use]
    pub fn with_non_default_channel_tokens(mut self, include: bool) -> Self {
        self.include_non_default_channel_tokens = include;
        self
    }

    #[must_use]
    pub fn with_first_token_cache(mut self, enabled: bool) -> Self {
        self.first_token_cache = enabled;
        self
    }
}

/// Result of [`Autocompleter::complete`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Completion {
    /// Distinct suggestions in discovery order.
    pub suggestions: Vec<Suggestion>,
    pub stats: RecoveryStats,
}

impl Completion {
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.suggestions.iter().map(|suggestion| suggestion.name.as_str()).collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.suggestions.is_empty()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Suggestion> {
        self.suggestions.iter().find(|suggestion| suggestion.name == name)
    }
}

/// Code completion over a recognizer and a token source.
///
/// Holds no per-call state: every call builds its own cache and statistics,
/// so one autocompleter can serve any number of requests.
#[derive(Debug, Clone)]
pub struct Autocompleter<'a, R, L> {
    recognizer: &'a R,
    lexer: &'a L,
    config: AutocompleteConfig,
}

impl<'a, R, L> Autocompleter<'a, R, L>
where
    R: Recognizer,
    L: TokenSource,
{
    #[must_use]
    pub fn new(recognizer: &'a R, lexer: &'a L) -> Self {
        Self {
            recognizer,
            lexer,
            config: AutocompleteConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: AutocompleteConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &AutocompleteConfig {
        &self.config
    }

    /// Suggestions for the end of `input`, with recovery statistics.
    ///
    /// # Errors
    ///
    /// [`CompletionError::Lexer`] if `input` cannot be tokenized, then
    /// [`CompletionError::InvalidInitialRule`] if the starting rule does not
    /// exist.
    pub fn complete(&self, input: &str) -> Result<Completion, CompletionError> {
        let tokens = self.lexer.tokenize(input)?;

        let atn = self.recognizer.atn();
        let initial_rule = self.config.initial_rule;
        if atn.rule_start(initial_rule).is_none() {
            return Err(CompletionError::InvalidInitialRule { rule: initial_rule });
        }

        let include_all = self.config.include_non_default_channel_tokens;
        let stream = CaretStream::new(
            tokens
                .iter()
                .filter(|token| include_all || token.is_default_channel())
                .map(|token| token.token_type),
        );

        let cache = self.config.first_token_cache.then(|| FirstTokenCache::build(atn));
        let options = EngineOptions {
            suggest_rules: &self.config.suggest_rules,
            recovery: &self.config.recovery,
            cache: cache.as_ref(),
        };
        let traversal = Engine::new(atn, &stream, options).run(initial_rule);

        let lexer_atn = self.lexer.lexer_atn();
        let ignore_off_channel = self.config.ignore_suggestions_in_non_default_channels;
        let rule_names = self.recognizer.rule_names();
        let vocabulary = self.recognizer.vocabulary();
        let suggestions: Vec<Suggestion> = merge(traversal.suggestions)
            .into_iter()
            .filter(|raw| match raw.id {
                SuggestionId::Token(token_type) => !ignore_off_channel || lexer_atn.is_default_channel(token_type),
                SuggestionId::Rule(_) => true,
            })
            .map(|raw| Suggestion::resolve(raw, rule_names, vocabulary))
            .collect();

        debug!(
            tokens = stream.caret_index(),
            suggestions = suggestions.len(),
            recoveries = traversal.stats.total(),
            "completion finished"
        );
        Ok(Completion {
            suggestions,
            stats: traversal.stats,
        })
    }

    /// Suggestions for the end of `input`.
    ///
    /// # Errors
    ///
    /// See [`Autocompleter::complete`].
    pub fn autocomplete(&self, input: &str) -> Result<Vec<Suggestion>, CompletionError> {
        self.complete(input).map(|completion| completion.suggestions)
    }
}
