//! # Traversal Engine
//!
//! Exhaustive simulation of a parser ATN over the tokens in front of the
//! caret. Every alternative is explored depth-first on an explicit work
//! stack; whenever a branch reaches the caret, the symbols its next
//! transition could consume become suggestions.
//!
//! ## Frames
//!
//! A frame is one pending exploration step: the state to expand, the
//! position in the token stream, the parser call stack, and the states
//! already passed since the last token was consumed. The visited list is
//! what keeps zero-width loops (`A*`, `A?`) from spinning forever; it is
//! cleared whenever a token is consumed or a rule boundary is crossed.
//!
//! ## Rule calls at the caret
//!
//! With a [`FirstTokenCache`], a call made while the caret is the next
//! token is not descended into: the callee's cached suggestions are spliced
//! in with their context chains prefixed by the caller's. With a real next
//! token, calls that cannot start with that token are pruned.
//!
//! ## Recovery
//!
//! Calls into rules that have a [`RecoveryRule`] are preceded on the stack
//! by a marker frame. The marker pops only after everything the call led to
//! has been explored; if no suggestion was added meanwhile, the branch died
//! before the caret and the recovery rule resynchronizes further ahead.

use crate::atn::{Atn, RuleIndex, StateId, StateKind, TokenType, Transition};
use crate::completion::cache::FirstTokenCache;
use crate::completion::recovery::{RecoveryRule, RecoveryStats, RecoveryTarget};
use crate::completion::suggestion::{RawSuggestion, RuleChain, SuggestionId};
use crate::completion::RuleSet;
use hashbrown::{HashMap, HashSet};
use smallvec::{smallvec, SmallVec};
use tracing::{debug, trace, warn};

/// What the simulation sees at a token index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookahead {
    Token(TokenType),
    Caret,
}

/// Token types in front of the caret, followed by the caret itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaretStream {
    tokens: Vec<TokenType>,
}

impl CaretStream {
    #[must_use]
    pub fn new(tokens: impl IntoIterator<Item = TokenType>) -> Self {
        Self {
            tokens: tokens.into_iter().collect(),
        }
    }

    /// A stream holding nothing but the caret.
    #[must_use]
    pub const fn caret_only() -> Self {
        Self { tokens: Vec::new() }
    }

    /// Index of the caret.
    #[must_use]
    pub fn caret_index(&self) -> usize {
        self.tokens.len()
    }

    #[must_use]
    pub fn lookahead(&self, index: usize) -> Option<Lookahead> {
        match self.tokens.get(index) {
            Some(&token_type) => Some(Lookahead::Token(token_type)),
            None if index == self.tokens.len() => Some(Lookahead::Caret),
            None => None,
        }
    }

    /// First index strictly after `index` holding `token_type`.
    #[must_use]
    pub fn find_after(&self, token_type: TokenType, index: usize) -> Option<usize> {
        let from = index + 1;
        self.tokens
            .get(from..)?
            .iter()
            .position(|&candidate| candidate == token_type)
            .map(|offset| from + offset)
    }
}

/// One invocation on the simulated parser call stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ContextFrame {
    rule: RuleIndex,
    /// Where the caller resumes; `None` for the starting rule.
    follow: Option<StateId>,
    precedence: i32,
}

type ContextStack = SmallVec<[ContextFrame; 8]>;
type Visited = SmallVec<[StateId; 8]>;

#[derive(Debug, Clone, Copy)]
struct RecoveryMarker {
    /// Index into the configured recovery rules.
    recovery: usize,
    suggestion_count: usize,
    precedence: i32,
}

/// Pending exploration step.
///
/// A marker frame sits at the follow state of the call it guards, with the
/// caller's context stack.
#[derive(Debug, Clone)]
struct Frame {
    state: StateId,
    token_index: usize,
    visited: Visited,
    context: ContextStack,
    /// Number of recoveries on the path leading here.
    recovery_depth: u32,
    marker: Option<RecoveryMarker>,
}

impl Frame {
    fn child(&self, state: StateId, token_index: usize, visited: Visited, context: ContextStack) -> Self {
        Self {
            state,
            token_index,
            visited,
            context,
            recovery_depth: self.recovery_depth,
            marker: None,
        }
    }

    fn precedence(&self) -> i32 {
        self.context.last().map_or(0, |top| top.precedence)
    }

    fn chain(&self) -> RuleChain {
        self.context.iter().map(|frame| frame.rule).collect()
    }
}

/// Inputs of a traversal besides the automaton and the tokens.
#[derive(Debug, Clone, Copy)]
pub struct EngineOptions<'a> {
    /// Rules reported as a whole instead of descended into at the caret.
    pub suggest_rules: &'a RuleSet,
    pub recovery: &'a [RecoveryRule],
    pub cache: Option<&'a FirstTokenCache>,
}

/// Outcome of one traversal.
#[derive(Debug, Clone, Default)]
pub struct Traversal {
    /// Suggestions in discovery order, one context each, not de-duplicated.
    pub suggestions: Vec<RawSuggestion>,
    /// Whether some branch completed the starting rule with every token consumed.
    pub reached_end: bool,
    pub stats: RecoveryStats,
}

/// Depth-first ATN simulator. One engine runs one traversal.
pub struct Engine<'a> {
    atn: &'a Atn,
    tokens: &'a CaretStream,
    options: EngineOptions<'a>,
    stack: Vec<Frame>,
    suggestions: Vec<RawSuggestion>,
    reached_end: bool,
    stats: RecoveryStats,
    /// `(recovery rule, token index)` pairs already tried.
    attempted: HashSet<(usize, usize), ahash::RandomState>,
    /// Nullability of rules simulated without a cache.
    nullable: HashMap<RuleIndex, bool, ahash::RandomState>,
}

impl<'a> Engine<'a> {
    #[must_use]
    pub fn new(atn: &'a Atn, tokens: &'a CaretStream, options: EngineOptions<'a>) -> Self {
        Self {
            atn,
            tokens,
            options,
            stack: Vec::with_capacity(64),
            suggestions: Vec::new(),
            reached_end: false,
            stats: RecoveryStats::default(),
            attempted: HashSet::default(),
            nullable: HashMap::default(),
        }
    }

    /// Simulate `rule` from its start state until every branch is exhausted.
    #[must_use]
    pub fn run(mut self, rule: RuleIndex) -> Traversal {
        let Some(start) = self.atn.rule_start(rule) else {
            warn!(rule, "traversal started from an unknown rule");
            return Traversal::default();
        };

        self.stack.push(Frame {
            state: start,
            token_index: 0,
            visited: Visited::new(),
            context: smallvec![ContextFrame {
                rule,
                follow: None,
                precedence: 0,
            }],
            recovery_depth: 0,
            marker: None,
        });

        while let Some(frame) = self.stack.pop() {
            match frame.marker {
                Some(marker) => self.check_recovery(frame, marker),
                None => self.expand(frame),
            }
        }

        Traversal {
            suggestions: self.suggestions,
            reached_end: self.reached_end,
            stats: self.stats,
        }
    }

    fn expand(&mut self, mut frame: Frame) {
        let atn = self.atn;
        let Some(state) = atn.state(frame.state) else {
            warn!(state = %frame.state, "frame points outside the automaton");
            return;
        };
        trace!(
            state = %frame.state,
            token_index = frame.token_index,
            depth = frame.context.len(),
            "expand"
        );

        let leaving_rule = state.kind == StateKind::RuleStop;
        let mut follow_only = None;
        if leaving_rule {
            match frame.context.pop() {
                Some(ContextFrame {
                    follow: Some(follow),
                    ..
                }) => follow_only = Some(follow),
                _ => {
                    if frame.token_index == self.tokens.caret_index() {
                        trace!(rule = state.rule, "starting rule completed");
                        self.reached_end = true;
                    }
                    return;
                }
            }
        }

        let lookahead = self.tokens.lookahead(frame.token_index);
        // Reverse order: the first alternative is pushed last and popped first.
        for transition in state.transitions.iter().rev() {
            let target = transition.target();
            if follow_only.is_some_and(|follow| follow != target) {
                continue;
            }
            if atn.state(target).is_none() {
                warn!(from = %state.id, target = %target, "transition target outside the automaton");
                continue;
            }

            match transition {
                Transition::Epsilon { .. } | Transition::Action { .. } => {
                    self.follow_epsilon(&frame, target, leaving_rule);
                }
                Transition::PrecedencePredicate { precedence, .. } => {
                    if *precedence < frame.precedence() {
                        trace!(precedence, current = frame.precedence(), "precedence predicate failed");
                        continue;
                    }
                    self.follow_epsilon(&frame, target, leaving_rule);
                }
                Transition::RuleCall {
                    rule,
                    follow,
                    precedence,
                    ..
                } => {
                    if frame.visited.contains(&target) {
                        continue;
                    }
                    self.call(&frame, lookahead, target, *rule, *follow, *precedence);
                }
                Transition::Atom { .. }
                | Transition::Set { .. }
                | Transition::NotSet { .. }
                | Transition::Wildcard { .. } => match lookahead {
                    Some(Lookahead::Caret) => {
                        if let Some(label) = transition.label(atn.universe()) {
                            for token_type in label.iter() {
                                self.emit(SuggestionId::Token(token_type), frame.chain());
                            }
                        }
                    }
                    Some(Lookahead::Token(token_type)) => {
                        if transition.matches(token_type, atn.universe()) {
                            let next = frame.child(target, frame.token_index + 1, Visited::new(), frame.context.clone());
                            self.stack.push(next);
                        } else {
                            trace!(state = %state.id, token_type, "dead end");
                        }
                    }
                    None => {}
                },
            }
        }
    }

    fn follow_epsilon(&mut self, frame: &Frame, target: StateId, leaving_rule: bool) {
        if frame.visited.contains(&target) {
            return;
        }
        let visited = if leaving_rule {
            Visited::new()
        } else {
            let mut visited = frame.visited.clone();
            visited.push(target);
            visited
        };
        let next = frame.child(target, frame.token_index, visited, frame.context.clone());
        self.stack.push(next);
    }

    fn call(
        &mut self,
        frame: &Frame,
        lookahead: Option<Lookahead>,
        target: StateId,
        rule: RuleIndex,
        follow: StateId,
        precedence: i32,
    ) {
        match (lookahead, self.options.cache) {
            (Some(Lookahead::Caret), cache) => {
                if self.options.suggest_rules.contains(&rule) {
                    self.emit(SuggestionId::Rule(rule), frame.chain());
                    if self.is_nullable(rule) {
                        self.skip_call(frame, follow);
                    }
                    return;
                }
                if let Some(cache) = cache {
                    self.splice(cache, rule, frame);
                    if cache.is_nullable(rule) {
                        self.skip_call(frame, follow);
                    }
                    return;
                }
            }
            (Some(Lookahead::Token(token_type)), Some(cache)) => {
                if !cache.may_start_with(rule, token_type) {
                    trace!(rule, token_type, "call pruned by first-token cache");
                    return;
                }
            }
            _ => {}
        }

        let mut callee_context = frame.context.clone();
        callee_context.push(ContextFrame {
            rule,
            follow: Some(follow),
            precedence,
        });

        if let Some(recovery) = self.options.recovery.iter().position(|r| r.if_in_rule == rule) {
            let mut marker = frame.child(follow, frame.token_index, Visited::new(), frame.context.clone());
            marker.marker = Some(RecoveryMarker {
                recovery,
                suggestion_count: self.suggestions.len(),
                precedence,
            });
            self.stack.push(marker);
        }

        let entry = frame.child(target, frame.token_index, Visited::new(), callee_context);
        self.stack.push(entry);
    }

    /// Whether `rule` can complete without consuming a token.
    ///
    /// Without a cache the rule is simulated on its own over a caret-only
    /// stream, once per engine.
    fn is_nullable(&mut self, rule: RuleIndex) -> bool {
        if let Some(cache) = self.options.cache {
            return cache.is_nullable(rule);
        }
        if let Some(&nullable) = self.nullable.get(&rule) {
            return nullable;
        }
        let tokens = CaretStream::caret_only();
        let none = RuleSet::default();
        let options = EngineOptions {
            suggest_rules: &none,
            recovery: &[],
            cache: None,
        };
        let nullable = Engine::new(self.atn, &tokens, options).run(rule).reached_end;
        trace!(rule, nullable, "nullability computed without cache");
        self.nullable.insert(rule, nullable);
        nullable
    }

    /// Continue at `follow` as if the called rule matched nothing.
    fn skip_call(&mut self, frame: &Frame, follow: StateId) {
        let next = frame.child(follow, frame.token_index, Visited::new(), frame.context.clone());
        self.stack.push(next);
    }

    /// Copy the cached first suggestions of `rule`, re-rooted at the caller.
    ///
    /// A token found below a rule listed in `suggest_rules` is reported as
    /// that rule instead.
    fn splice(&mut self, cache: &FirstTokenCache, rule: RuleIndex, frame: &Frame) {
        let Some(entry) = cache.entry(rule) else {
            return;
        };
        let prefix = frame.chain();
        for cached in &entry.suggestions {
            for cached_chain in &cached.contexts {
                let findable = match cached.id {
                    SuggestionId::Token(_) => cached_chain
                        .iter()
                        .position(|rule| self.options.suggest_rules.contains(rule)),
                    SuggestionId::Rule(_) => None,
                };
                let (id, inner) = match findable {
                    Some(position) => (SuggestionId::Rule(cached_chain[position]), &cached_chain[..position]),
                    None => (cached.id, &cached_chain[..]),
                };
                let mut chain = prefix.clone();
                chain.extend_from_slice(inner);
                self.emit(id, chain);
            }
        }
    }

    fn emit(&mut self, id: SuggestionId, chain: RuleChain) {
        trace!(?id, ?chain, "suggestion at caret");
        self.suggestions.push(RawSuggestion::new(id, chain));
    }

    fn check_recovery(&mut self, frame: Frame, marker: RecoveryMarker) {
        if self.suggestions.len() != marker.suggestion_count {
            return;
        }
        let Some(&rule) = self.options.recovery.get(marker.recovery) else {
            return;
        };
        if !rule.nested && frame.recovery_depth > 0 {
            trace!(%rule, "recovery not allowed inside a recovered exploration");
            return;
        }
        if !self.attempted.insert((marker.recovery, frame.token_index)) {
            return;
        }

        let Some(found) = self.tokens.find_after(rule.and_find_token, frame.token_index) else {
            debug!(%rule, token_index = frame.token_index, "no synchronization token ahead");
            return;
        };
        let resume_at = if rule.skip_one { found + 1 } else { found };

        let (state, context) = match rule.then {
            RecoveryTarget::GoToRule(target) => {
                let Some(start) = self.atn.rule_start(target) else {
                    warn!(%rule, "recovery target is not a rule");
                    return;
                };
                let mut context = frame.context.clone();
                context.push(ContextFrame {
                    rule: target,
                    follow: Some(frame.state),
                    precedence: marker.precedence,
                });
                (start, context)
            }
            RecoveryTarget::FinishRule => (frame.state, frame.context.clone()),
        };

        self.stats.record(&rule);
        debug!(%rule, failed_at = frame.token_index, resume_at, "recovering");
        self.stack.push(Frame {
            state,
            token_index: resume_at,
            visited: Visited::new(),
            context,
            recovery_depth: frame.recovery_depth + 1,
            marker: None,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atn::StateKind;
    use crate::completion::suggestion::merge;
    use crate::completion::Recognizer;
    use crate::grammar::{Expr, Grammar, GrammarBuilder};

    fn run(grammar: &Grammar, tokens: &[TokenType]) -> Traversal {
        let stream = CaretStream::new(tokens.iter().copied());
        let none = RuleSet::default();
        let options = EngineOptions {
            suggest_rules: &none,
            recovery: &[],
            cache: None,
        };
        Engine::new(grammar.atn(), &stream, options).run(0)
    }

    fn ids(traversal: &Traversal) -> Vec<SuggestionId> {
        merge(traversal.suggestions.clone()).into_iter().map(|s| s.id).collect()
    }

    #[test]
    fn test_caret_stream_lookahead() {
        let stream = CaretStream::new([4, 5, 4]);
        assert_eq!(stream.lookahead(0), Some(Lookahead::Token(4)));
        assert_eq!(stream.lookahead(3), Some(Lookahead::Caret));
        assert_eq!(stream.lookahead(4), None);
        assert_eq!(stream.caret_index(), 3);
        assert_eq!(stream.find_after(4, 0), Some(2));
        assert_eq!(stream.find_after(4, 2), None);
        assert_eq!(stream.find_after(5, 9), None);
        assert_eq!(CaretStream::caret_only().lookahead(0), Some(Lookahead::Caret));
    }

    #[test]
    fn test_consumes_then_suggests_alternatives_in_order() {
        // r : 'a' ('b' | 'c') ;
        let grammar = GrammarBuilder::new()
            .rule(
                "r",
                Expr::seq(vec![Expr::lit("a"), Expr::alt(vec![Expr::lit("b"), Expr::lit("c")])]),
            )
            .build()
            .unwrap();

        let traversal = run(&grammar, &[1]);
        assert_eq!(ids(&traversal), vec![SuggestionId::Token(2), SuggestionId::Token(3)]);
        assert!(!traversal.reached_end);
    }

    #[test]
    fn test_reached_end_when_start_rule_completes() {
        let grammar = GrammarBuilder::new()
            .rule("r", Expr::opt(Expr::lit("a")))
            .build()
            .unwrap();

        let empty = run(&grammar, &[]);
        assert_eq!(ids(&empty), vec![SuggestionId::Token(1)]);
        assert!(empty.reached_end);

        let consumed = run(&grammar, &[1]);
        assert!(consumed.suggestions.is_empty());
        assert!(consumed.reached_end);
    }

    #[test]
    fn test_mismatching_token_kills_branch() {
        let grammar = GrammarBuilder::new()
            .rule("r", Expr::seq(vec![Expr::lit("a"), Expr::lit("b")]))
            .build()
            .unwrap();

        let traversal = run(&grammar, &[2]);
        assert!(traversal.suggestions.is_empty());
        assert!(!traversal.reached_end);
    }

    #[test]
    fn test_loops_terminate_and_allow_repetition() {
        // r : 'a'* 'b' ;
        let grammar = GrammarBuilder::new()
            .rule("r", Expr::seq(vec![Expr::star(Expr::lit("a")), Expr::lit("b")]))
            .build()
            .unwrap();

        let traversal = run(&grammar, &[1, 1, 1]);
        assert_eq!(ids(&traversal), vec![SuggestionId::Token(1), SuggestionId::Token(2)]);
    }

    #[test]
    fn test_context_chain_follows_rule_calls() {
        let grammar = GrammarBuilder::new()
            .rule("first", Expr::seq(vec![Expr::lit("x"), Expr::rule("second")]))
            .rule("second", Expr::lit("a"))
            .build()
            .unwrap();

        let traversal = run(&grammar, &[1]);
        assert_eq!(traversal.suggestions.len(), 1);
        assert_eq!(traversal.suggestions[0].contexts[0].as_slice(), &[0, 1]);
    }

    #[test]
    fn test_return_resumes_only_at_calling_site() {
        // first : inner 'x' ; other : inner 'y' ; inner : 'a' ;
        let grammar = GrammarBuilder::new()
            .rule("first", Expr::seq(vec![Expr::rule("inner"), Expr::lit("x")]))
            .rule("other", Expr::seq(vec![Expr::rule("inner"), Expr::lit("y")]))
            .rule("inner", Expr::lit("a"))
            .build()
            .unwrap();

        // 'x' = 1, 'y' = 2, 'a' = 3
        let traversal = run(&grammar, &[3]);
        assert_eq!(ids(&traversal), vec![SuggestionId::Token(1)]);
    }

    #[test]
    fn test_suggest_rules_without_cache() {
        let grammar = GrammarBuilder::new()
            .rule("first", Expr::seq(vec![Expr::lit("x"), Expr::rule("second")]))
            .rule("second", Expr::lit("a"))
            .build()
            .unwrap();
        let stream = CaretStream::new([1]);
        let suggest: RuleSet = [1].into_iter().collect();
        let options = EngineOptions {
            suggest_rules: &suggest,
            recovery: &[],
            cache: None,
        };

        let traversal = Engine::new(grammar.atn(), &stream, options).run(0);
        assert_eq!(ids(&traversal), vec![SuggestionId::Rule(1)]);
        assert_eq!(traversal.suggestions[0].contexts[0].as_slice(), &[0]);
    }

    #[test]
    fn test_nullable_suggest_rule_without_cache_continues_after_call() {
        // r : 'a' opt 'c' ; opt : 'b'? ;
        let grammar = GrammarBuilder::new()
            .rule("r", Expr::seq(vec![Expr::lit("a"), Expr::rule("opt"), Expr::lit("c")]))
            .rule("opt", Expr::opt(Expr::lit("b")))
            .build()
            .unwrap();
        let vocabulary = grammar.vocabulary();
        let token = |name: &str| {
            (1..=vocabulary.max_token_type())
                .find(|&token_type| vocabulary.display_name(token_type) == name)
                .unwrap()
        };
        let (a, c) = (token("a"), token("c"));
        let stream = CaretStream::new([a]);
        let suggest: RuleSet = [1].into_iter().collect();
        let options = EngineOptions {
            suggest_rules: &suggest,
            recovery: &[],
            cache: None,
        };

        let traversal = Engine::new(grammar.atn(), &stream, options).run(0);
        assert_eq!(ids(&traversal), vec![SuggestionId::Rule(1), SuggestionId::Token(c)]);
    }

    #[test]
    fn test_precedence_predicates_limit_operators() {
        // expr : expr '*' expr | expr '+' expr | '1' ;
        let grammar = GrammarBuilder::new()
            .precedence_rule("expr", vec![Expr::lit("1")], vec![Expr::lit("*"), Expr::lit("+")])
            .build()
            .unwrap();
        let (one, times, plus) = (1, 2, 3);

        // 1 + 1 | : the right operand of '+' may still take '*', but not '+'.
        let traversal = run(&grammar, &[one, plus, one]);
        let merged = merge(traversal.suggestions);
        assert_eq!(merged[0].id, SuggestionId::Token(times));
        let times_chains: Vec<&[RuleIndex]> = merged[0].contexts.iter().map(|c| c.as_slice()).collect();
        assert_eq!(times_chains, vec![&[0, 0][..], &[0][..]]);
        assert_eq!(merged[1].id, SuggestionId::Token(plus));
        assert_eq!(merged[1].contexts.len(), 1);
        assert_eq!(merged[1].contexts[0].as_slice(), &[0]);

        // 1 * 1 | : nothing binds tighter than '*' inside its right operand.
        let traversal = run(&grammar, &[one, times, one]);
        let merged = merge(traversal.suggestions);
        for suggestion in &merged {
            assert!(suggestion.contexts.iter().all(|chain| chain.as_slice() == [0]));
        }
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_transition_outside_automaton_is_dead_end() {
        let mut atn = Atn::new(2);
        let rule = atn.add_rule();
        let start = atn.rule_start(rule).unwrap();
        let matched = atn.add_state(rule, StateKind::Basic);
        atn.add_transition(start, Transition::Epsilon { target: StateId(99) });
        atn.add_transition(start, Transition::Atom { target: matched, label: 2 });

        let stream = CaretStream::caret_only();
        let none = RuleSet::default();
        let options = EngineOptions {
            suggest_rules: &none,
            recovery: &[],
            cache: None,
        };
        let traversal = Engine::new(&atn, &stream, options).run(rule);
        assert_eq!(ids(&traversal), vec![SuggestionId::Token(2)]);
    }

    #[test]
    fn test_unknown_start_rule_yields_nothing() {
        let atn = Atn::new(1);
        let stream = CaretStream::caret_only();
        let none = RuleSet::default();
        let options = EngineOptions {
            suggest_rules: &none,
            recovery: &[],
            cache: None,
        };
        let traversal = Engine::new(&atn, &stream, options).run(3);
        assert!(traversal.suggestions.is_empty());
        assert!(!traversal.reached_end);
    }
}
