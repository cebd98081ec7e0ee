use crate::atn::TokenType;
use crate::error::GrammarError;
use crate::grammar::compile::{compile_atn, TokenTable};
use crate::grammar::validate::{rule_table, validate_grammar};
use crate::grammar::{Expr, Grammar, Vocabulary};
use crate::lexer::{LexRule, LexerBuilder, Pattern};
use compact_str::{format_compact, CompactString};
use hashbrown::{HashMap, HashSet};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RuleBody {
    Plain(Expr),
    /// Left-recursive binary-operator rule; see [`GrammarBuilder::precedence_rule`].
    Precedence {
        primaries: Vec<Expr>,
        operators: Vec<Expr>,
    },
}

impl RuleBody {
    pub(crate) fn exprs(&self) -> impl Iterator<Item = &Expr> {
        let (first, rest): (&[Expr], &[Expr]) = match self {
            Self::Plain(expr) => (std::slice::from_ref(expr), &[]),
            Self::Precedence {
                primaries,
                operators,
            } => (primaries, operators),
        };
        first.iter().chain(rest)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RuleDef {
    pub name: CompactString,
    pub body: RuleBody,
}

/// Builder for combined (parser + lexer) grammars.
///
/// Parser rules are numbered in declaration order; the first one is the
/// default starting rule for completion.
///
/// # Example
///
/// ```rust
/// use atn_complete::grammar::{Expr, GrammarBuilder};
/// use atn_complete::lexer::Pattern;
///
/// // r : A A 'B' ;  A : 'A' ;
/// let grammar = GrammarBuilder::new()
///     .rule("r", Expr::seq(vec![Expr::token("A"), Expr::token("A"), Expr::lit("B")]))
///     .token("A", Pattern::literal("A"))
///     .build()
///     .unwrap();
///
/// let names: Vec<_> = grammar.autocompleter().autocomplete("AA").unwrap()
///     .into_iter().map(|s| s.name).collect();
/// assert_eq!(names, vec!["B"]);
/// ```
#[derive(Debug, Default)]
pub struct GrammarBuilder {
    rules: Vec<RuleDef>,
    lexer_rules: Vec<LexRule>,
}

impl GrammarBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn rule(mut self, name: impl Into<CompactString>, expr: Expr) -> Self {
        self.rules.push(RuleDef {
            name: name.into(),
            body: RuleBody::Plain(expr),
        });
        self
    }

    /// Left-recursive rule `name : name op name | ... | primary ;`.
    ///
    /// `operators` are the parts between the two operands, tightest binding
    /// first; each binary alternative is left-associative.
    ///
    /// ```rust
    /// use atn_complete::grammar::{Expr, GrammarBuilder};
    ///
    /// // expr : expr '*' expr | expr '+' expr | '1' ;
    /// let grammar = GrammarBuilder::new()
    ///     .precedence_rule("expr", vec![Expr::lit("1")], vec![Expr::lit("*"), Expr::lit("+")])
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(grammar.rule_index("expr"), Some(0));
    /// ```
    #[must_use]
    pub fn precedence_rule(
        mut self,
        name: impl Into<CompactString>,
        primaries: Vec<Expr>,
        operators: Vec<Expr>,
    ) -> Self {
        self.rules.push(RuleDef {
            name: name.into(),
            body: RuleBody::Precedence {
                primaries,
                operators,
            },
        });
        self
    }

    #[must_use]
    pub fn token(self, name: impl Into<CompactString>, pattern: Pattern) -> Self {
        self.lexer_rule(LexRule::new(name, pattern))
    }

    /// Lexer rule emitting on the hidden channel.
    #[must_use]
    pub fn hidden(self, name: impl Into<CompactString>, pattern: Pattern) -> Self {
        self.lexer_rule(LexRule::new(name, pattern).hidden())
    }

    #[must_use]
    pub fn skip(self, name: impl Into<CompactString>, pattern: Pattern) -> Self {
        self.lexer_rule(LexRule::new(name, pattern).skip())
    }

    #[must_use]
    pub fn lexer_rule(mut self, rule: LexRule) -> Self {
        self.lexer_rules.push(rule);
        self
    }

    /// Validate the rules and compile both automata.
    ///
    /// Literals used in parser rules become implicit tokens, numbered from `1`
    /// in order of first use, unless a lexer rule consists of exactly that
    /// literal. Lexer rules follow in declaration order.
    ///
    /// # Errors
    ///
    /// Returns a [`GrammarError`] for undefined or duplicate names, empty
    /// literals, closures over nullable blocks and left recursion.
    pub fn build(self) -> Result<Grammar, GrammarError> {
        validate_grammar(&self.rules, &self.lexer_rules)?;
        let table = rule_table(&self.rules)?;

        let mut literal_rules: HashMap<&str, usize, ahash::RandomState> = HashMap::default();
        for (index, lexer_rule) in self.lexer_rules.iter().enumerate() {
            if let Some(text) = lexer_rule.pattern.as_literal() {
                literal_rules.entry(text).or_insert(index);
            }
        }

        let mut implicit: Vec<&str> = Vec::new();
        let mut seen: HashSet<&str, ahash::RandomState> = HashSet::default();
        for rule in &self.rules {
            for expr in rule.body.exprs() {
                for text in expr.literals() {
                    if !literal_rules.contains_key(text) && seen.insert(text) {
                        implicit.push(text);
                    }
                }
            }
        }

        let max_token_type = to_token_type(implicit.len() + self.lexer_rules.len());
        let slots = implicit.len() + self.lexer_rules.len() + 1;
        let mut literal_names = vec![None; slots];
        let mut symbolic_names = vec![None; slots];
        let mut tokens = TokenTable::default();
        let mut lexer = LexerBuilder::new();

        for (index, text) in implicit.iter().enumerate() {
            let token_type = to_token_type(index + 1);
            tokens.literals.insert(*text, token_type);
            literal_names[index + 1] = Some(format_compact!("'{text}'"));
            lexer = lexer.token(format_compact!("T__{index}"), Pattern::literal(*text));
        }
        for (index, lexer_rule) in self.lexer_rules.iter().enumerate() {
            let slot = implicit.len() + index + 1;
            let token_type = to_token_type(slot);
            tokens.symbols.insert(lexer_rule.name.as_str(), token_type);
            symbolic_names[slot] = Some(lexer_rule.name.clone());
            if let Some(text) = lexer_rule.pattern.as_literal() {
                tokens.literals.entry(text).or_insert(token_type);
                literal_names[slot] = Some(format_compact!("'{text}'"));
            }
            lexer = lexer.rule(lexer_rule.clone());
        }

        let atn = compile_atn(&self.rules, &table, &tokens, max_token_type)?;
        debug!(
            rules = self.rules.len(),
            implicit_tokens = implicit.len(),
            max_token_type,
            states = atn.states().len(),
            "grammar compiled"
        );

        Ok(Grammar {
            atn,
            rule_names: self.rules.iter().map(|rule| rule.name.clone()).collect(),
            vocabulary: Vocabulary::new(literal_names, symbolic_names),
            lexer: lexer.build(),
        })
    }
}

fn to_token_type(value: usize) -> TokenType {
    TokenType::try_from(value).unwrap_or(TokenType::MAX)
}
