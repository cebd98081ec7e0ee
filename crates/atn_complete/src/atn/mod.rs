//! # Augmented Transition Networks
//!
//! The read-only graph a grammar compiles to: states grouped by rule, each
//! with an ordered list of outgoing [`Transition`]s. The completion engine
//! walks parser ATNs; the lexer inspects (and simulates) lexer ATNs built
//! from the same types, where labels are code points instead of token types.
//!
//! ## Building a graph
//!
//! ```rust
//! use atn_complete::atn::{Atn, StateKind, Transition};
//!
//! // r : 'A' ;   with 'A' as token type 1
//! let mut atn = Atn::new(1);
//! let rule = atn.add_rule();
//! let start = atn.rule_start(rule).unwrap();
//! let stop = atn.rule_stop(rule).unwrap();
//! let matched = atn.add_state(rule, StateKind::Basic);
//! atn.add_transition(start, Transition::Atom { target: matched, label: 1 });
//! atn.add_transition(matched, Transition::Epsilon { target: stop });
//! assert_eq!(atn.rule_count(), 1);
//! ```

pub mod interval_set;
pub mod lexer_actions;

pub use interval_set::{Interval, IntervalSet};
pub use lexer_actions::{find_lexer_actions, LexerAction, LexerAtn};

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// Token type code. Negative values are reserved (see [`EOF`]).
pub type TokenType = i32;

/// Index of a rule in the grammar's rule table.
pub type RuleIndex = usize;

/// Token type of the end-of-input symbol.
pub const EOF: TokenType = -1;

/// Lowest token type a grammar may assign.
pub const MIN_USER_TOKEN_TYPE: TokenType = 1;

/// Channel of tokens the parser sees.
pub const DEFAULT_CHANNEL: i32 = 0;

/// Conventional channel for whitespace and comments.
pub const HIDDEN_CHANNEL: i32 = 1;

/// Highest Unicode scalar value, the universe bound of lexer ATNs.
pub const MAX_CODE_POINT: i32 = 0x10_FFFF;

/// State identifier, an index into [`Atn::states`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct StateId(pub u32);

impl StateId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum StateKind {
    Basic,
    /// State with more than one viable outgoing branch (blocks, loops, optionals).
    Decision,
    RuleStart,
    RuleStop,
}

/// Edge between two states.
///
/// The first four variants are epsilon edges: they never consume input.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum Transition {
    Epsilon {
        target: StateId,
    },
    /// Traversable only while the enclosing rule invocation's precedence is
    /// at most `precedence`.
    PrecedencePredicate {
        target: StateId,
        precedence: i32,
    },
    /// Invocation of `rule`; `target` is the callee's start state and
    /// `follow` the state the caller resumes at once the callee returns.
    RuleCall {
        target: StateId,
        rule: RuleIndex,
        follow: StateId,
        precedence: i32,
    },
    /// Lexer command (channel, skip, mode...) executed on this path.
    Action {
        target: StateId,
        action_index: usize,
    },
    Atom {
        target: StateId,
        label: TokenType,
    },
    Set {
        target: StateId,
        set: IntervalSet,
    },
    NotSet {
        target: StateId,
        set: IntervalSet,
    },
    Wildcard {
        target: StateId,
    },
}

impl Transition {
    #[must_use]
    pub const fn target(&self) -> StateId {
        match self {
            Self::Epsilon { target }
            | Self::PrecedencePredicate { target, .. }
            | Self::RuleCall { target, .. }
            | Self::Action { target, .. }
            | Self::Atom { target, .. }
            | Self::Set { target, .. }
            | Self::NotSet { target, .. }
            | Self::Wildcard { target } => *target,
        }
    }

    #[must_use]
    pub const fn is_epsilon(&self) -> bool {
        matches!(
            self,
            Self::Epsilon { .. }
                | Self::PrecedencePredicate { .. }
                | Self::RuleCall { .. }
                | Self::Action { .. }
        )
    }

    /// Whether a symbol is matched by this edge; `universe` is the inclusive
    /// `[min, max]` symbol range used by negated sets and wildcards.
    #[must_use]
    pub fn matches(&self, symbol: i32, universe: (i32, i32)) -> bool {
        let in_universe = symbol >= universe.0 && symbol <= universe.1;
        match self {
            Self::Atom { label, .. } => *label == symbol,
            Self::Set { set, .. } => set.contains(symbol),
            Self::NotSet { set, .. } => in_universe && !set.contains(symbol),
            Self::Wildcard { .. } => in_universe,
            _ => false,
        }
    }

    /// Symbols this edge can consume, or `None` for epsilon edges.
    #[must_use]
    pub fn label(&self, universe: (i32, i32)) -> Option<IntervalSet> {
        match self {
            Self::Atom { label, .. } => Some(IntervalSet::of(*label)),
            Self::Set { set, .. } => Some(set.clone()),
            Self::NotSet { set, .. } => Some(set.complement(universe.0, universe.1)),
            Self::Wildcard { .. } => Some(IntervalSet::of_range(universe.0, universe.1)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct AtnState {
    pub id: StateId,
    pub rule: RuleIndex,
    pub kind: StateKind,
    pub transitions: Vec<Transition>,
}

/// Augmented transition network.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Atn {
    states: Vec<AtnState>,
    rule_to_start: Vec<StateId>,
    rule_to_stop: Vec<StateId>,
    max_token_type: TokenType,
}

impl Atn {
    /// Empty network whose symbol universe is `[MIN_USER_TOKEN_TYPE, max_token_type]`.
    #[must_use]
    pub fn new(max_token_type: TokenType) -> Self {
        Self {
            states: Vec::new(),
            rule_to_start: Vec::new(),
            rule_to_stop: Vec::new(),
            max_token_type,
        }
    }

    #[must_use]
    pub const fn max_token_type(&self) -> TokenType {
        self.max_token_type
    }

    /// Inclusive range of symbols negated sets and wildcards range over.
    #[must_use]
    pub const fn universe(&self) -> (i32, i32) {
        (MIN_USER_TOKEN_TYPE, self.max_token_type)
    }

    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.rule_to_start.len()
    }

    #[must_use]
    pub fn states(&self) -> &[AtnState] {
        &self.states
    }

    #[must_use]
    pub fn state(&self, id: StateId) -> Option<&AtnState> {
        self.states.get(id.index())
    }

    #[must_use]
    pub fn rule_start(&self, rule: RuleIndex) -> Option<StateId> {
        self.rule_to_start.get(rule).copied()
    }

    #[must_use]
    pub fn rule_stop(&self, rule: RuleIndex) -> Option<StateId> {
        self.rule_to_stop.get(rule).copied()
    }

    /// Register a new rule together with its start and stop states.
    pub fn add_rule(&mut self) -> RuleIndex {
        let rule = self.rule_to_start.len();
        let start = self.add_state(rule, StateKind::RuleStart);
        let stop = self.add_state(rule, StateKind::RuleStop);
        self.rule_to_start.push(start);
        self.rule_to_stop.push(stop);
        rule
    }

    pub fn add_state(&mut self, rule: RuleIndex, kind: StateKind) -> StateId {
        let id = StateId(u32::try_from(self.states.len()).unwrap_or(u32::MAX));
        self.states.push(AtnState {
            id,
            rule,
            kind,
            transitions: Vec::new(),
        });
        id
    }

    /// Append a transition to `from`.
    ///
    /// A rule call also links the callee's stop state back to the call's
    /// follow state, so every stop state lists the return sites of its rule.
    /// Edges from unknown states are ignored.
    pub fn add_transition(&mut self, from: StateId, transition: Transition) {
        if let Transition::RuleCall { rule, follow, .. } = transition {
            if let Some(stop) = self.rule_stop(rule) {
                if let Some(state) = self.states.get_mut(stop.index()) {
                    state.transitions.push(Transition::Epsilon { target: follow });
                }
            }
        }
        if let Some(state) = self.states.get_mut(from.index()) {
            state.transitions.push(transition);
        }
    }
}
