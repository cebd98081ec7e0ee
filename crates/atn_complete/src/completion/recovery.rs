//! Recovery rules: how to keep completing past a construct that cannot be
//! parsed.
//!
//! When the exploration of a rule dies before the caret (e.g. a malformed
//! statement), a matching [`RecoveryRule`] scans forward for a
//! synchronization token and resumes the simulation there.

use crate::atn::{RuleIndex, TokenType};
#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where to resume once the synchronization token is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum RecoveryTarget {
    /// Re-enter this rule from its start state.
    GoToRule(RuleIndex),
    /// Continue after the failed rule call, as if the rule had completed.
    FinishRule,
}

impl fmt::Display for RecoveryTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GoToRule(rule) => write!(f, "rule {rule}"),
            Self::FinishRule => f.write_str("finish"),
        }
    }
}

/// Recovery configuration for failures inside one rule.
///
/// ```rust
/// use atn_complete::completion::{RecoveryRule, RecoveryTarget};
///
/// // If `stat` (rule 1) dies, find the next `;` (token 4) and start the
/// // next statement after it.
/// let rule = RecoveryRule::go_to_rule(1, 4, 1).skip_one();
/// assert_eq!(rule.then, RecoveryTarget::GoToRule(1));
/// assert!(rule.skip_one && rule.nested);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct RecoveryRule {
    pub if_in_rule: RuleIndex,
    pub and_find_token: TokenType,
    pub then: RecoveryTarget,
    /// Resume after the synchronization token instead of at it.
    pub skip_one: bool,
    /// Also fire inside an exploration that was itself resumed by a recovery.
    pub nested: bool,
}

impl RecoveryRule {
    #[must_use]
    pub const fn go_to_rule(if_in_rule: RuleIndex, and_find_token: TokenType, rule: RuleIndex) -> Self {
        Self {
            if_in_rule,
            and_find_token,
            then: RecoveryTarget::GoToRule(rule),
            skip_one: false,
            nested: true,
        }
    }

    #[must_use]
    pub const fn finish_rule(if_in_rule: RuleIndex, and_find_token: TokenType) -> Self {
        Self {
            if_in_rule,
            and_find_token,
            then: RecoveryTarget::FinishRule,
            skip_one: false,
            nested: true,
        }
    }

    #[must_use]
    pub const fn skip_one(mut self) -> Self {
        self.skip_one = true;
        self
    }

    #[must_use]
    pub const fn not_nested(mut self) -> Self {
        self.nested = false;
        self
    }
}

impl fmt::Display for RecoveryRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "in rule {} find token {} then {}",
            self.if_in_rule, self.and_find_token, self.then
        )
    }
}

/// Attempt counter for one recovery rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct RecoveryAttempts {
    pub rule: RecoveryRule,
    pub attempts: usize,
}

/// Recovery diagnostics of one completion call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct RecoveryStats {
    recoveries: Vec<RecoveryAttempts>,
}

impl RecoveryStats {
    pub(crate) fn record(&mut self, rule: &RecoveryRule) {
        match self.recoveries.iter_mut().find(|entry| entry.rule == *rule) {
            Some(entry) => entry.attempts += 1,
            None => self.recoveries.push(RecoveryAttempts {
                rule: *rule,
                attempts: 1,
            }),
        }
    }

    /// Successful synchronizations performed with `rule`.
    #[must_use]
    pub fn attempts(&self, rule: &RecoveryRule) -> usize {
        self.recoveries
            .iter()
            .find(|entry| entry.rule == *rule)
            .map_or(0, |entry| entry.attempts)
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.recoveries.iter().map(|entry| entry.attempts).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.recoveries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RecoveryAttempts> {
        self.recoveries.iter()
    }
}

impl fmt::Display for RecoveryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.recoveries.is_empty() {
            return f.write_str("no recoveries");
        }
        for (index, entry) in self.recoveries.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "[{}]: {}", entry.rule, entry.attempts)?;
        }
        Ok(())
    }
}
