//! Lexer that runs its ATN directly as an NFA.
//!
//! At every position the lexer tracks the set of states reachable after the
//! characters consumed so far and remembers the last position at which a rule
//! stop state was reachable. The longest match wins; among rules matching the
//! same length the one defined first wins.

use crate::atn::{LexerAction, LexerAtn, RuleIndex, StateId, StateKind, TokenType, Transition};
use crate::atn::{DEFAULT_CHANNEL, MAX_CODE_POINT};
use crate::error::{LexerError, LexerErrorKind};
use crate::lexer::{Token, TokenSource};
use crate::text::{LineIndex, TextRange, TextSize};
use compact_str::CompactString;
use hashbrown::HashSet;
use smallvec::SmallVec;
use tracing::trace;

/// Code points a lexer wildcard or negated set may match.
const CHAR_UNIVERSE: (i32, i32) = (0, MAX_CODE_POINT);

type StateSet = SmallVec<[StateId; 16]>;

/// What a lexer rule produces once it matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RuleOutput {
    pub token_type: TokenType,
    pub channel: i32,
    pub skip: bool,
}

impl RuleOutput {
    pub(crate) fn from_actions(token_type: TokenType, actions: &[LexerAction]) -> Self {
        let mut output = Self {
            token_type,
            channel: DEFAULT_CHANNEL,
            skip: false,
        };
        for action in actions {
            match *action {
                LexerAction::Channel(channel) => output.channel = channel,
                LexerAction::Type(token_type) => output.token_type = token_type,
                LexerAction::Skip => output.skip = true,
                LexerAction::More
                | LexerAction::Mode(_)
                | LexerAction::PushMode(_)
                | LexerAction::PopMode => {}
            }
        }
        output
    }
}

/// Lexer built by [`LexerBuilder`](crate::lexer::LexerBuilder).
#[derive(Debug, Clone)]
pub struct Lexer {
    lexer_atn: LexerAtn,
    outputs: Vec<RuleOutput>,
    rule_names: Vec<CompactString>,
    initial: StateSet,
}

impl Lexer {
    pub(crate) fn new(
        lexer_atn: LexerAtn,
        outputs: Vec<RuleOutput>,
        rule_names: Vec<CompactString>,
    ) -> Self {
        let starts: StateSet = (0..lexer_atn.atn.rule_count())
            .filter_map(|rule| lexer_atn.atn.rule_start(rule))
            .collect();
        let mut lexer = Self {
            lexer_atn,
            outputs,
            rule_names,
            initial: StateSet::new(),
        };
        lexer.initial = lexer.closure(&starts);
        lexer
    }

    #[must_use]
    pub fn rule_names(&self) -> &[CompactString] {
        &self.rule_names
    }

    /// All states reachable from `roots` without consuming a character.
    fn closure(&self, roots: &[StateId]) -> StateSet {
        let mut seen: HashSet<StateId, ahash::RandomState> = HashSet::default();
        let mut pending: StateSet = roots.iter().copied().collect();
        let mut reached = StateSet::new();

        while let Some(id) = pending.pop() {
            if !seen.insert(id) {
                continue;
            }
            reached.push(id);
            let Some(state) = self.lexer_atn.atn.state(id) else {
                continue;
            };
            for transition in &state.transitions {
                if transition.is_epsilon() {
                    pending.push(transition.target());
                }
            }
        }

        reached
    }

    /// Rule and end offset of the longest match starting at `start`.
    fn longest_match(&self, input: &str, start: usize) -> Option<(RuleIndex, usize)> {
        let atn = &self.lexer_atn.atn;
        let mut current = self.initial.clone();
        let mut best = None;

        for (offset, c) in input[start..].char_indices() {
            let symbol = c as i32;
            let moved: StateSet = current
                .iter()
                .filter_map(|&id| atn.state(id))
                .flat_map(|state| state.transitions.iter())
                .filter(|transition| transition.matches(symbol, CHAR_UNIVERSE))
                .map(Transition::target)
                .collect();
            if moved.is_empty() {
                break;
            }

            current = self.closure(&moved);
            let accepted = current
                .iter()
                .filter_map(|&id| atn.state(id))
                .filter(|state| state.kind == StateKind::RuleStop)
                .map(|state| state.rule)
                .min();
            if let Some(rule) = accepted {
                best = Some((rule, start + offset + c.len_utf8()));
            }
        }

        best
    }

    fn error_at(input: &str, offset: usize) -> LexerError {
        let position = LineIndex::new(input).line_col(TextSize::of_index(offset));
        let c = input[offset..].chars().next().unwrap_or('\u{FFFD}');
        LexerError {
            span: TextRange::from_indices(offset, offset + c.len_utf8()),
            line: position.line + 1,
            column: position.column,
            kind: LexerErrorKind::unexpected_char(c),
        }
    }
}

impl TokenSource for Lexer {
    fn tokenize(&self, input: &str) -> Result<Vec<Token>, LexerError> {
        let mut tokens = Vec::new();
        let mut position = 0;

        while position < input.len() {
            let Some((rule, end)) = self.longest_match(input, position) else {
                return Err(Self::error_at(input, position));
            };
            let Some(output) = self.outputs.get(rule) else {
                return Err(Self::error_at(input, position));
            };
            if output.skip {
                trace!(rule, position, end, "skipped");
            } else {
                tokens.push(
                    Token::new(
                        output.token_type,
                        &input[position..end],
                        TextRange::from_indices(position, end),
                    )
                    .on_channel(output.channel),
                );
            }
            position = end;
        }

        Ok(tokens)
    }

    fn lexer_atn(&self) -> &LexerAtn {
        &self.lexer_atn
    }
}
