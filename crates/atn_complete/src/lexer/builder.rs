use crate::atn::{Atn, IntervalSet, LexerAction, LexerAtn, RuleIndex, StateId, StateKind, Transition};
use crate::atn::{HIDDEN_CHANNEL, MAX_CODE_POINT};
use crate::lexer::nfa::{Lexer, RuleOutput};
use compact_str::CompactString;
use smallvec::SmallVec;

/// Character-level pattern of a lexer rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    Literal(CompactString),
    CharClass(CharSet),
    /// Any single character outside the set (`~[...]`).
    NotCharClass(CharSet),
    Repeat {
        pattern: Box<Pattern>,
        min: usize,
        max: Option<usize>,
    },
    Seq(Vec<Pattern>),
    Alt(Vec<Pattern>),
    Any,
}

impl Pattern {
    #[must_use]
    pub fn literal(text: impl Into<CompactString>) -> Self {
        Self::Literal(text.into())
    }

    #[must_use]
    pub fn one_or_more(pattern: Self) -> Self {
        Self::Repeat {
            pattern: Box::new(pattern),
            min: 1,
            max: None,
        }
    }

    #[must_use]
    pub fn zero_or_more(pattern: Self) -> Self {
        Self::Repeat {
            pattern: Box::new(pattern),
            min: 0,
            max: None,
        }
    }

    #[must_use]
    pub fn optional(pattern: Self) -> Self {
        Self::Repeat {
            pattern: Box::new(pattern),
            min: 0,
            max: Some(1),
        }
    }

    /// The literal text if the pattern is exactly one literal.
    #[must_use]
    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Self::Literal(text) => Some(text),
            _ => None,
        }
    }
}

/// Set of inclusive character ranges (`[a-z0-9_]`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharSet {
    ranges: Vec<(char, char)>,
}

impl CharSet {
    #[must_use]
    pub const fn new(ranges: Vec<(char, char)>) -> Self {
        Self { ranges }
    }

    #[must_use]
    pub fn of_chars(chars: &str) -> Self {
        Self::new(chars.chars().map(|c| (c, c)).collect())
    }

    #[must_use]
    pub fn digits() -> Self {
        Self::new(vec![('0', '9')])
    }

    #[must_use]
    pub fn letters() -> Self {
        Self::new(vec![('a', 'z'), ('A', 'Z')])
    }

    #[must_use]
    pub fn whitespace() -> Self {
        Self::of_chars(" \t\r\n")
    }

    #[must_use]
    pub fn with_range(mut self, first: char, last: char) -> Self {
        self.ranges.push((first, last));
        self
    }

    #[must_use]
    pub fn matches(&self, c: char) -> bool {
        self.ranges.iter().any(|&(first, last)| c >= first && c <= last)
    }

    /// Code points of the set.
    #[must_use]
    pub fn to_interval_set(&self) -> IntervalSet {
        let mut set = IntervalSet::new();
        for &(first, last) in &self.ranges {
            set.add(crate::atn::Interval::inclusive(first as i32, last as i32));
        }
        set
    }
}

/// A named lexer rule and the commands it runs when it matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexRule {
    pub name: CompactString,
    pub pattern: Pattern,
    pub actions: SmallVec<[LexerAction; 2]>,
}

impl LexRule {
    #[must_use]
    pub fn new(name: impl Into<CompactString>, pattern: Pattern) -> Self {
        Self {
            name: name.into(),
            pattern,
            actions: SmallVec::new(),
        }
    }

    /// `-> channel(n)`
    #[must_use]
    pub fn channel(self, channel: i32) -> Self {
        self.action(LexerAction::Channel(channel))
    }

    /// `-> channel(HIDDEN)`
    #[must_use]
    pub fn hidden(self) -> Self {
        self.channel(HIDDEN_CHANNEL)
    }

    /// `-> skip`
    #[must_use]
    pub fn skip(self) -> Self {
        self.action(LexerAction::Skip)
    }

    #[must_use]
    pub fn action(mut self, action: LexerAction) -> Self {
        self.actions.push(action);
        self
    }
}

/// Builds a [`Lexer`] from rules; rule `i` emits token type `i + 1`.
///
/// ```rust
/// use atn_complete::lexer::{CharSet, LexRule, LexerBuilder, Pattern, TokenSource};
///
/// let lexer = LexerBuilder::new()
///     .token("LET", Pattern::literal("let"))
///     .token("ID", Pattern::one_or_more(Pattern::CharClass(CharSet::letters())))
///     .rule(LexRule::new("WS", Pattern::one_or_more(Pattern::CharClass(CharSet::whitespace()))).hidden())
///     .build();
///
/// let tokens = lexer.tokenize("let x").unwrap();
/// assert_eq!(tokens.iter().map(|t| t.token_type).collect::<Vec<_>>(), vec![1, 3, 2]);
/// ```
#[derive(Debug, Default)]
pub struct LexerBuilder {
    rules: SmallVec<[LexRule; 16]>,
}

impl LexerBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn rule(mut self, rule: LexRule) -> Self {
        self.rules.push(rule);
        self
    }

    #[must_use]
    pub fn token(self, name: impl Into<CompactString>, pattern: Pattern) -> Self {
        self.rule(LexRule::new(name, pattern))
    }

    #[must_use]
    pub fn hidden(self, name: impl Into<CompactString>, pattern: Pattern) -> Self {
        self.rule(LexRule::new(name, pattern).hidden())
    }

    #[must_use]
    pub fn skip(self, name: impl Into<CompactString>, pattern: Pattern) -> Self {
        self.rule(LexRule::new(name, pattern).skip())
    }

    /// Compile every rule into one character-level ATN.
    #[must_use]
    pub fn build(self) -> Lexer {
        let mut atn = Atn::new(MAX_CODE_POINT);
        let mut actions = Vec::new();
        let mut rule_to_token_type = Vec::with_capacity(self.rules.len());
        let mut outputs = Vec::with_capacity(self.rules.len());
        let mut names = Vec::with_capacity(self.rules.len());

        for (index, rule) in self.rules.into_iter().enumerate() {
            let token_type = i32::try_from(index + 1).unwrap_or(i32::MAX);
            let rule_index = atn.add_rule();
            let (start, stop) = match (atn.rule_start(rule_index), atn.rule_stop(rule_index)) {
                (Some(start), Some(stop)) => (start, stop),
                _ => continue,
            };

            let mut end = compile_pattern(&mut atn, rule_index, &rule.pattern, start);
            for &action in &rule.actions {
                let next = atn.add_state(rule_index, StateKind::Basic);
                atn.add_transition(
                    end,
                    Transition::Action {
                        target: next,
                        action_index: actions.len(),
                    },
                );
                actions.push(action);
                end = next;
            }
            atn.add_transition(end, Transition::Epsilon { target: stop });

            rule_to_token_type.push(token_type);
            outputs.push(RuleOutput::from_actions(token_type, &rule.actions));
            names.push(rule.name);
        }

        Lexer::new(
            LexerAtn {
                atn,
                rule_to_token_type,
                actions,
            },
            outputs,
            names,
        )
    }
}

/// Thompson-style construction: wire `pattern` after `from`, return its end state.
fn compile_pattern(atn: &mut Atn, rule: RuleIndex, pattern: &Pattern, from: StateId) -> StateId {
    match pattern {
        Pattern::Literal(text) => text.chars().fold(from, |current, c| {
            let next = atn.add_state(rule, StateKind::Basic);
            atn.add_transition(
                current,
                Transition::Atom {
                    target: next,
                    label: c as i32,
                },
            );
            next
        }),
        Pattern::CharClass(chars) => consume(atn, rule, from, |target| Transition::Set {
            target,
            set: chars.to_interval_set(),
        }),
        Pattern::NotCharClass(chars) => consume(atn, rule, from, |target| Transition::NotSet {
            target,
            set: chars.to_interval_set(),
        }),
        Pattern::Any => consume(atn, rule, from, |target| Transition::Wildcard { target }),
        Pattern::Seq(parts) => parts
            .iter()
            .fold(from, |current, part| compile_pattern(atn, rule, part, current)),
        Pattern::Alt(alternatives) => {
            let decision = atn.add_state(rule, StateKind::Decision);
            let join = atn.add_state(rule, StateKind::Basic);
            atn.add_transition(from, Transition::Epsilon { target: decision });
            for alternative in alternatives {
                let entry = atn.add_state(rule, StateKind::Basic);
                atn.add_transition(decision, Transition::Epsilon { target: entry });
                let end = compile_pattern(atn, rule, alternative, entry);
                atn.add_transition(end, Transition::Epsilon { target: join });
            }
            join
        }
        Pattern::Repeat { pattern, min, max } => {
            let mut current = from;
            for _ in 0..*min {
                current = compile_pattern(atn, rule, pattern, current);
            }
            match max {
                None => {
                    let entry = atn.add_state(rule, StateKind::Decision);
                    let body = atn.add_state(rule, StateKind::Basic);
                    let exit = atn.add_state(rule, StateKind::Basic);
                    atn.add_transition(current, Transition::Epsilon { target: entry });
                    atn.add_transition(entry, Transition::Epsilon { target: body });
                    atn.add_transition(entry, Transition::Epsilon { target: exit });
                    let body_end = compile_pattern(atn, rule, pattern, body);
                    atn.add_transition(body_end, Transition::Epsilon { target: entry });
                    exit
                }
                Some(max) => {
                    for _ in *min..*max {
                        let decision = atn.add_state(rule, StateKind::Decision);
                        let body = atn.add_state(rule, StateKind::Basic);
                        let join = atn.add_state(rule, StateKind::Basic);
                        atn.add_transition(current, Transition::Epsilon { target: decision });
                        atn.add_transition(decision, Transition::Epsilon { target: body });
                        atn.add_transition(decision, Transition::Epsilon { target: join });
                        let body_end = compile_pattern(atn, rule, pattern, body);
                        atn.add_transition(body_end, Transition::Epsilon { target: join });
                        current = join;
                    }
                    current
                }
            }
        }
    }
}

fn consume(
    atn: &mut Atn,
    rule: RuleIndex,
    from: StateId,
    edge: impl FnOnce(StateId) -> Transition,
) -> StateId {
    let next = atn.add_state(rule, StateKind::Basic);
    atn.add_transition(from, edge(next));
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::TokenSource;

    #[test]
    fn test_builder_assigns_token_types_in_order() {
        let lexer = LexerBuilder::new()
            .token("A", Pattern::literal("a"))
            .hidden("WS", Pattern::literal(" "))
            .skip("COMMENT", Pattern::literal("#"))
            .build();

        assert_eq!(lexer.lexer_atn().rule_to_token_type, vec![1, 2, 3]);
        assert_eq!(lexer.rule_names(), &["A", "WS", "COMMENT"]);
        assert_eq!(
            lexer.lexer_atn().actions,
            vec![LexerAction::Channel(HIDDEN_CHANNEL), LexerAction::Skip]
        );
    }

    #[test]
    fn test_lex_rule_commands() {
        let rule = LexRule::new("WS", Pattern::Any).hidden().action(LexerAction::PushMode(2));
        assert_eq!(
            rule.actions.as_slice(),
            &[LexerAction::Channel(HIDDEN_CHANNEL), LexerAction::PushMode(2)]
        );
    }

    #[test]
    fn test_char_set_matches_and_intervals() {
        let set = CharSet::digits().with_range('a', 'c');

        assert!(set.matches('5'));
        assert!(set.matches('b'));
        assert!(!set.matches('d'));
        assert_eq!(set.to_interval_set().len(), 13);
    }

    #[test]
    fn test_pattern_as_literal() {
        assert_eq!(Pattern::literal("let").as_literal(), Some("let"));
        assert_eq!(Pattern::one_or_more(Pattern::Any).as_literal(), None);
    }

    #[test]
    fn test_literal_compiles_to_atom_chain() {
        let lexer = LexerBuilder::new().token("LET", Pattern::literal("let")).build();
        let atn = &lexer.lexer_atn().atn;
        let atoms: Vec<i32> = atn
            .states()
            .iter()
            .flat_map(|state| state.transitions.iter())
            .filter_map(|transition| match transition {
                Transition::Atom { label, .. } => Some(*label),
                _ => None,
            })
            .collect();

        assert_eq!(atoms, vec!['l' as i32, 'e' as i32, 't' as i32]);
    }
}
