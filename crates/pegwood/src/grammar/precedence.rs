//! # Operator Precedence
//!
//! Builds layered rules for infix, prefix and postfix operators from a
//! precedence table, so grammars never hand-write precedence climbing.
//!
//! Levels are listed tightest-binding first. Each level parses the level
//! before it as its operand. Parenthesized sub-expressions re-enter the top
//! level.
//!
//! Result shape: every application of a level is one [`Group`](crate::Token::Group).
//! A left-associative chain stays flat inside its group: `1+2+3` gives
//! `[[1, '+', 2, '+', 3]]`. A right-associative chain nests to the right:
//! `2^3^4` gives `[[2, '^', [3, '^', 4]]]`.
//!
//! ```rust
//! use pegwood::{Associativity, Expr, GrammarBuilder, InfixNotation, OperatorLevel};
//!
//! let grammar = GrammarBuilder::new()
//!     .infix_notation(
//!         "arith",
//!         InfixNotation::new(Expr::integer())
//!             .level(OperatorLevel::infix(Expr::one_of("* /"), Associativity::Left))
//!             .level(OperatorLevel::infix(Expr::one_of("+ -"), Associativity::Left)),
//!     )
//!     .entry_point("arith")
//!     .build()
//!     .unwrap();
//! let results = grammar.parse("3*4+5", true).unwrap();
//! assert_eq!(results.to_string(), "[[[3, '*', 4], '+', 5]]");
//! ```

use compact_str::{format_compact, CompactString};

use crate::grammar::action::ParseAction;
use crate::grammar::expr::Expr;

/// How operators of equal precedence group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Associativity {
    /// `a op b op c` is `(a op b) op c`; results stay one flat group
    Left,
    /// `a op b op c` is `a op (b op c)`
    Right,
    /// Chaining is not allowed; `a op b` at most once per level
    None,
}

/// Where the operator sits relative to its operand(s)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fixity {
    /// `op a`
    Prefix,
    /// `a op b`
    Infix(Associativity),
    /// `a op`
    Postfix,
}

/// One row of the precedence table
#[derive(Debug, Clone)]
pub struct OperatorLevel {
    op: Expr,
    fixity: Fixity,
    action: Option<ParseAction>,
}

impl OperatorLevel {
    /// A binary operator
    #[must_use]
    pub fn infix(op: impl Into<Expr>, assoc: Associativity) -> Self {
        Self {
            op: op.into(),
            fixity: Fixity::Infix(assoc),
            action: None,
        }
    }

    /// A unary operator written before its operand; it may repeat (`--x`)
    #[must_use]
    pub fn prefix(op: impl Into<Expr>) -> Self {
        Self {
            op: op.into(),
            fixity: Fixity::Prefix,
            action: None,
        }
    }

    /// A unary operator written after its operand; it may repeat (`x!!`)
    #[must_use]
    pub fn postfix(op: impl Into<Expr>) -> Self {
        Self {
            op: op.into(),
            fixity: Fixity::Postfix,
            action: None,
        }
    }

    /// Run `action` on every group this level builds
    #[must_use]
    pub fn action(mut self, action: ParseAction) -> Self {
        self.action = Some(action);
        self
    }

    /// Number of operands: 1 for prefix/postfix, 2 for infix
    #[must_use]
    pub const fn arity(&self) -> u8 {
        match self.fixity {
            Fixity::Infix(_) => 2,
            Fixity::Prefix | Fixity::Postfix => 1,
        }
    }

    /// The operator's position and grouping
    #[must_use]
    pub const fn fixity(&self) -> Fixity {
        self.fixity
    }
}

/// A precedence table over an operand expression
#[derive(Debug, Clone)]
pub struct InfixNotation {
    operand: Expr,
    levels: Vec<OperatorLevel>,
    parens: Option<(Expr, Expr)>,
}

impl InfixNotation {
    /// Start a table; parentheses default to suppressed `(` and `)`
    #[must_use]
    pub fn new(operand: impl Into<Expr>) -> Self {
        Self {
            operand: operand.into(),
            levels: Vec::new(),
            parens: Some((Expr::literal("(").suppress(), Expr::literal(")").suppress())),
        }
    }

    /// Add the next, looser-binding level
    #[must_use]
    pub fn level(mut self, level: OperatorLevel) -> Self {
        self.levels.push(level);
        self
    }

    /// Use custom grouping brackets; pass suppressed expressions to keep them out of results
    #[must_use]
    pub fn parens(mut self, open: impl Into<Expr>, close: impl Into<Expr>) -> Self {
        self.parens = Some((open.into(), close.into()));
        self
    }

    /// Do not accept grouping brackets
    #[must_use]
    pub fn without_parens(mut self) -> Self {
        self.parens = None;
        self
    }

    /// Levels, tightest first
    #[must_use]
    pub fn levels(&self) -> &[OperatorLevel] {
        &self.levels
    }

    /// The rules this table expands to, top rule `name` last
    ///
    /// Helper rules are named `"{name}.atom"` and `"{name}.level{i}"`.
    pub(crate) fn into_rules(self, name: &str) -> Vec<(CompactString, Expr)> {
        let atom_name = format_compact!("{name}.atom");
        let atom = match self.parens {
            Some((open, close)) => self.operand | (open + Expr::rule(name) + close),
            None => self.operand,
        };

        let mut rules = vec![(atom_name.clone(), atom)];
        let mut last_name = atom_name;
        for (i, level) in self.levels.into_iter().enumerate() {
            let this_name = format_compact!("{name}.level{}", i + 1);
            let last = Expr::rule(&last_name);
            let this = Expr::rule(&this_name);
            let op = level.op;

            let application = match level.fixity {
                Fixity::Infix(Associativity::Left) => {
                    last.clone() + (op + last.clone()).one_or_more()
                }
                Fixity::Infix(Associativity::Right) => last.clone() + (op + this).one_or_more(),
                Fixity::Infix(Associativity::None) => last.clone() + op + last.clone(),
                Fixity::Prefix => op + this,
                Fixity::Postfix => last.clone() + op.one_or_more(),
            };
            let mut group = application.group();
            if let Some(action) = level.action {
                group = group.action(action);
            }

            rules.push((this_name.clone(), group | last));
            last_name = this_name;
        }

        rules.push((name.into(), Expr::rule(&last_name)));
        rules
    }
}
