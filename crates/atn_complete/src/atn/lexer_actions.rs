//! Lexer command discovery.
//!
//! Neither a token nor the parser ATN records which channel a token type is
//! emitted on; the only place that knows is the lexer rule producing it. This
//! module walks a lexer rule's sub-graph and reports the commands (channel,
//! skip, mode...) reachable from its start state.

use crate::atn::{Atn, RuleIndex, StateId, StateKind, TokenType, Transition, DEFAULT_CHANNEL};
#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};
use hashbrown::HashSet;

/// Command attached to a lexer rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum LexerAction {
    Channel(i32),
    Skip,
    More,
    Type(TokenType),
    Mode(usize),
    PushMode(usize),
    PopMode,
}

impl LexerAction {
    /// Whether running this command keeps the token off the default channel.
    #[must_use]
    pub const fn leaves_default_channel(self) -> bool {
        match self {
            Self::Channel(channel) => channel != DEFAULT_CHANNEL,
            Self::Skip => true,
            _ => false,
        }
    }
}

/// Lexer ATN together with the tables that relate its rules to token types.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct LexerAtn {
    pub atn: Atn,
    /// Token type emitted by each lexer rule.
    pub rule_to_token_type: Vec<TokenType>,
    /// Commands referenced by [`Transition::Action`] edges.
    pub actions: Vec<LexerAction>,
}

impl LexerAtn {
    /// First lexer rule emitting `token_type`.
    #[must_use]
    pub fn rule_for_token_type(&self, token_type: TokenType) -> Option<RuleIndex> {
        self.rule_to_token_type
            .iter()
            .position(|&emitted| emitted == token_type)
    }

    /// Whether tokens of `token_type` always land on the default channel.
    ///
    /// Token types without a lexer rule (implicit or imported ones) are
    /// treated as default-channel tokens.
    #[must_use]
    pub fn is_default_channel(&self, token_type: TokenType) -> bool {
        let Some(start) = self
            .rule_for_token_type(token_type)
            .and_then(|rule| self.atn.rule_start(rule))
        else {
            return true;
        };

        !find_lexer_actions(&self.atn, start)
            .into_iter()
            .filter_map(|index| self.actions.get(index))
            .any(|action| action.leaves_default_channel())
    }
}

/// Indices of every lexer command reachable from `start`, in discovery order.
///
/// Character-matching edges are followed as well, since commands sit at the
/// end of a rule. Calls into other (fragment) rules jump straight to the call's
/// follow state: commands never compose across rules. Each state is expanded
/// at most once, which bounds the walk on cyclic graphs.
#[must_use]
pub fn find_lexer_actions(atn: &Atn, start: StateId) -> Vec<usize> {
    let mut found = Vec::new();
    let mut expanded: HashSet<StateId, ahash::RandomState> = HashSet::default();
    let mut pending = vec![start];

    while let Some(id) = pending.pop() {
        if !expanded.insert(id) {
            continue;
        }
        let Some(state) = atn.state(id) else {
            continue;
        };
        if state.kind == StateKind::RuleStop {
            continue;
        }

        for transition in state.transitions.iter().rev() {
            match transition {
                Transition::Action {
                    target,
                    action_index,
                } => {
                    if !found.contains(action_index) {
                        found.push(*action_index);
                    }
                    pending.push(*target);
                }
                Transition::RuleCall { follow, .. } => pending.push(*follow),
                other => pending.push(other.target()),
            }
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atn::{IntervalSet, MAX_CODE_POINT};

    /// `WS : [ \t]+ -> channel(1) ;` followed by `ID : [a-z]+ ;`
    fn whitespace_and_ident() -> LexerAtn {
        let mut atn = Atn::new(MAX_CODE_POINT);

        let ws = atn.add_rule();
        let ws_loop = atn.add_state(ws, StateKind::Decision);
        let ws_char = atn.add_state(ws, StateKind::Basic);
        let ws_done = atn.add_state(ws, StateKind::Basic);
        let blanks: IntervalSet = [' ' as i32, '\t' as i32].into_iter().collect();
        atn.add_transition(atn.rule_start(ws).unwrap(), Transition::Set { target: ws_char, set: blanks.clone() });
        atn.add_transition(ws_char, Transition::Epsilon { target: ws_loop });
        atn.add_transition(ws_loop, Transition::Set { target: ws_char, set: blanks });
        atn.add_transition(ws_loop, Transition::Epsilon { target: ws_done });
        atn.add_transition(ws_done, Transition::Action { target: atn.rule_stop(ws).unwrap(), action_index: 0 });

        let id = atn.add_rule();
        let id_char = atn.add_state(id, StateKind::Basic);
        atn.add_transition(
            atn.rule_start(id).unwrap(),
            Transition::Set { target: id_char, set: IntervalSet::of_range('a' as i32, 'z' as i32) },
        );
        atn.add_transition(id_char, Transition::Epsilon { target: atn.rule_start(id).unwrap() });
        atn.add_transition(id_char, Transition::Epsilon { target: atn.rule_stop(id).unwrap() });

        LexerAtn {
            atn,
            rule_to_token_type: vec![1, 2],
            actions: vec![LexerAction::Channel(1)],
        }
    }

    #[test]
    fn test_finds_action_behind_loop() {
        let lexer = whitespace_and_ident();
        let start = lexer.atn.rule_start(0).unwrap();
        assert_eq!(find_lexer_actions(&lexer.atn, start), vec![0]);
    }

    #[test]
    fn test_cyclic_rule_without_actions_terminates() {
        let lexer = whitespace_and_ident();
        let start = lexer.atn.rule_start(1).unwrap();
        assert!(find_lexer_actions(&lexer.atn, start).is_empty());
    }

    #[test]
    fn test_fragment_call_jumps_to_follow_state() {
        // NUM : DIGIT -> skip ;  fragment DIGIT : [0-9] -> channel(1) ;
        let mut atn = Atn::new(MAX_CODE_POINT);
        let num = atn.add_rule();
        let digit = atn.add_rule();

        let after_call = atn.add_state(num, StateKind::Basic);
        atn.add_transition(
            atn.rule_start(num).unwrap(),
            Transition::RuleCall { target: atn.rule_start(digit).unwrap(), rule: digit, follow: after_call, precedence: 0 },
        );
        atn.add_transition(after_call, Transition::Action { target: atn.rule_stop(num).unwrap(), action_index: 0 });

        let digit_char = atn.add_state(digit, StateKind::Basic);
        atn.add_transition(
            atn.rule_start(digit).unwrap(),
            Transition::Set { target: digit_char, set: IntervalSet::of_range('0' as i32, '9' as i32) },
        );
        atn.add_transition(digit_char, Transition::Action { target: atn.rule_stop(digit).unwrap(), action_index: 1 });

        let lexer = LexerAtn {
            atn,
            rule_to_token_type: vec![1],
            actions: vec![LexerAction::Skip, LexerAction::Channel(1)],
        };
        let start = lexer.atn.rule_start(num).unwrap();
        assert_eq!(find_lexer_actions(&lexer.atn, start), vec![0]);
        assert!(!lexer.is_default_channel(1));
    }

    #[test]
    fn test_default_channel_classification() {
        let lexer = whitespace_and_ident();

        assert!(!lexer.is_default_channel(1));
        assert!(lexer.is_default_channel(2));
        // No rule emits this type.
        assert!(lexer.is_default_channel(42));
    }

    #[test]
    fn test_skip_leaves_default_channel() {
        assert!(LexerAction::Skip.leaves_default_channel());
        assert!(LexerAction::Channel(2).leaves_default_channel());
        assert!(!LexerAction::Channel(DEFAULT_CHANNEL).leaves_default_channel());
        assert!(!LexerAction::PushMode(1).leaves_default_channel());
    }
}
