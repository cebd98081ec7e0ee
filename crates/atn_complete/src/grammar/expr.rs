use compact_str::CompactString;
use smallvec::SmallVec;

/// A single terminal inside a token set (`('a' | B)` or `~('a' | B)`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Terminal {
    Literal(CompactString),
    Token(CompactString),
    Eof,
}

impl Terminal {
    #[must_use]
    pub fn lit(text: impl Into<CompactString>) -> Self {
        Self::Literal(text.into())
    }

    #[must_use]
    pub fn token(name: impl Into<CompactString>) -> Self {
        Self::Token(name.into())
    }
}

/// Right-hand side of a parser rule.
///
/// # Example
///
/// ```rust
/// use atn_complete::grammar::Expr;
///
/// // 'A' 'B'? 'C' EOF
/// let rhs = Expr::seq(vec![
///     Expr::lit("A"),
///     Expr::opt(Expr::lit("B")),
///     Expr::lit("C"),
///     Expr::eof(),
/// ]);
/// assert!(!rhs.is_trivially_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// Quoted literal; becomes an implicit token unless a lexer rule matches
    /// exactly this text.
    Literal(CompactString),
    /// Reference to a lexer rule by name.
    Token(CompactString),
    Eof,
    /// Reference to a parser rule by name.
    Rule(CompactString),
    Set(SmallVec<[Terminal; 4]>),
    Not(SmallVec<[Terminal; 4]>),
    Any,
    Seq(Vec<Expr>),
    Alt(Vec<Expr>),
    Optional { expr: Box<Expr>, greedy: bool },
    Star { expr: Box<Expr>, greedy: bool },
    Plus { expr: Box<Expr>, greedy: bool },
    Empty,
}

impl Expr {
    #[must_use]
    pub fn lit(text: impl Into<CompactString>) -> Self {
        Self::Literal(text.into())
    }

    #[must_use]
    pub fn token(name: impl Into<CompactString>) -> Self {
        Self::Token(name.into())
    }

    #[must_use]
    pub fn rule(name: impl Into<CompactString>) -> Self {
        Self::Rule(name.into())
    }

    #[must_use]
    pub const fn eof() -> Self {
        Self::Eof
    }

    #[must_use]
    pub const fn any() -> Self {
        Self::Any
    }

    #[must_use]
    pub fn set(terminals: impl IntoIterator<Item = Terminal>) -> Self {
        Self::Set(terminals.into_iter().collect())
    }

    #[must_use]
    pub fn not(terminals: impl IntoIterator<Item = Terminal>) -> Self {
        Self::Not(terminals.into_iter().collect())
    }

    #[must_use]
    pub const fn seq(exprs: Vec<Self>) -> Self {
        Self::Seq(exprs)
    }

    #[must_use]
    pub const fn alt(exprs: Vec<Self>) -> Self {
        Self::Alt(exprs)
    }

    #[must_use]
    pub fn opt(expr: Self) -> Self {
        Self::Optional {
            expr: Box::new(expr),
            greedy: true,
        }
    }

    #[must_use]
    pub fn star(expr: Self) -> Self {
        Self::Star {
            expr: Box::new(expr),
            greedy: true,
        }
    }

    #[must_use]
    pub fn plus(expr: Self) -> Self {
        Self::Plus {
            expr: Box::new(expr),
            greedy: true,
        }
    }

    /// `expr??`
    #[must_use]
    pub fn opt_non_greedy(expr: Self) -> Self {
        Self::Optional {
            expr: Box::new(expr),
            greedy: false,
        }
    }

    /// `expr*?`
    #[must_use]
    pub fn star_non_greedy(expr: Self) -> Self {
        Self::Star {
            expr: Box::new(expr),
            greedy: false,
        }
    }

    /// `expr+?`
    #[must_use]
    pub fn plus_non_greedy(expr: Self) -> Self {
        Self::Plus {
            expr: Box::new(expr),
            greedy: false,
        }
    }

    #[must_use]
    pub const fn empty() -> Self {
        Self::Empty
    }

    /// `true` for `Empty` and for sequences/alternations of nothing but `Empty`.
    #[must_use]
    pub fn is_trivially_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Seq(exprs) | Self::Alt(exprs) => exprs.iter().all(Self::is_trivially_empty),
            _ => false,
        }
    }

    /// Visit this expression and every nested one, parents first.
    pub fn walk<'e>(&'e self, visit: &mut impl FnMut(&'e Self)) {
        visit(self);
        match self {
            Self::Seq(exprs) | Self::Alt(exprs) => {
                for expr in exprs {
                    expr.walk(visit);
                }
            }
            Self::Optional { expr, .. } | Self::Star { expr, .. } | Self::Plus { expr, .. } => {
                expr.walk(visit);
            }
            _ => {}
        }
    }

    /// Literal texts in order of appearance, set members included.
    pub(crate) fn literals(&self) -> Vec<&str> {
        let mut found = Vec::new();
        self.walk(&mut |expr| match expr {
            Self::Literal(text) => found.push(text.as_str()),
            Self::Set(terminals) | Self::Not(terminals) => {
                for terminal in terminals {
                    if let Terminal::Literal(text) = terminal {
                        found.push(text.as_str());
                    }
                }
            }
            _ => {}
        });
        found
    }
}
