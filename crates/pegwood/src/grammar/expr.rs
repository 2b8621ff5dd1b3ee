//! # Expressions
//!
//! [`Expr`] is the building block of a grammar: a cheap-to-clone shared
//! handle to an immutable expression tree. Building a new expression never
//! changes an existing one, so a sub-expression can be reused in any number
//! of places.
//!
//! Operators mirror the usual notation:
//!
//! | Rust | meaning |
//! |---|---|
//! | `a + b` | sequence |
//! | `a - b` | sequence with a commit point before `b` |
//! | `a \| b` | ordered choice |
//!
//! `&str` converts into a literal, so `key + "=" + value` reads naturally.
//!
//! Recursion goes through named rules: [`Expr::rule`] refers to a rule that
//! is bound once with [`GrammarBuilder::rule`](crate::GrammarBuilder::rule).

use std::fmt;
use std::ops::{Add, BitOr, Sub};
use std::sync::Arc;

use compact_str::CompactString;

use crate::grammar::action::ParseAction;
use crate::grammar::terminal::{order_options, NumberKind, QuotedSpec, WordSpec};
use crate::results::{ParseResults, Token};
use crate::text::CharSet;

/// Options for [`Expr::delimited_with`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelimitedSpec {
    pub(crate) min: usize,
    pub(crate) max: Option<usize>,
    pub(crate) allow_trailing: bool,
    pub(crate) keep_delimiters: bool,
    pub(crate) combine: bool,
}

impl Default for DelimitedSpec {
    fn default() -> Self {
        Self {
            min: 1,
            max: None,
            allow_trailing: false,
            keep_delimiters: false,
            combine: false,
        }
    }
}

impl DelimitedSpec {
    /// At least one item, delimiters suppressed
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Minimum number of items
    #[must_use]
    pub const fn min(mut self, min: usize) -> Self {
        self.min = min;
        self
    }

    /// Maximum number of items
    #[must_use]
    pub const fn max(mut self, max: usize) -> Self {
        self.max = Some(max);
        self
    }

    /// Accept one delimiter after the last item
    #[must_use]
    pub const fn allow_trailing(mut self) -> Self {
        self.allow_trailing = true;
        self
    }

    /// Keep delimiter tokens in the results
    #[must_use]
    pub const fn keep_delimiters(mut self) -> Self {
        self.keep_delimiters = true;
        self
    }

    /// Join items and delimiters into one string, with no whitespace allowed between them
    #[must_use]
    pub const fn combine(mut self) -> Self {
        self.combine = true;
        self.keep_delimiters = true;
        self
    }
}

#[derive(Debug, Clone)]
pub(crate) enum ExprNode {
    Empty,
    End,
    Literal {
        text: CompactString,
        caseless: bool,
    },
    Keyword {
        text: CompactString,
        caseless: bool,
        ident_chars: CharSet,
    },
    Word(WordSpec),
    OneOf {
        options: Vec<CompactString>,
        caseless: bool,
    },
    Quoted(QuotedSpec),
    Number(NumberKind),
    Regex(CompactString),
    Seq {
        children: Vec<Expr>,
        commit: Option<usize>,
    },
    Choice(Vec<Expr>),
    Opt {
        child: Expr,
        default: Option<Token>,
    },
    Repeat {
        child: Expr,
        min: usize,
        max: Option<usize>,
    },
    Delimited {
        item: Expr,
        delim: Expr,
        spec: DelimitedSpec,
    },
    Lookahead {
        child: Expr,
        negate: bool,
    },
    Suppress(Expr),
    Group(Expr),
    Combine {
        child: Expr,
        joiner: CompactString,
    },
    Rule(CompactString),
    Named {
        child: Expr,
        name: CompactString,
        accumulate: bool,
    },
    Action {
        child: Expr,
        actions: Vec<ParseAction>,
    },
    Labeled {
        child: Expr,
        label: CompactString,
    },
    /// `None` disables whitespace skipping for the subtree
    Whitespace {
        child: Expr,
        chars: Option<Arc<CharSet>>,
    },
}

/// A parsing expression
#[derive(Clone)]
pub struct Expr(pub(crate) Arc<ExprNode>);

impl Expr {
    fn from_node(node: ExprNode) -> Self {
        Self(Arc::new(node))
    }

    pub(crate) fn node(&self) -> &ExprNode {
        &self.0
    }

    pub(crate) fn ptr(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    // ---- terminals ----

    /// Matches nothing and always succeeds
    #[must_use]
    pub fn empty() -> Self {
        Self::from_node(ExprNode::Empty)
    }

    /// Succeeds only at the end of the input (after whitespace)
    #[must_use]
    pub fn end() -> Self {
        Self::from_node(ExprNode::End)
    }

    /// An exact string
    #[must_use]
    pub fn literal(text: &str) -> Self {
        Self::from_node(ExprNode::Literal {
            text: text.into(),
            caseless: false,
        })
    }

    /// A string compared case-insensitively; yields the string as written here
    #[must_use]
    pub fn caseless_literal(text: &str) -> Self {
        Self::from_node(ExprNode::Literal {
            text: text.into(),
            caseless: true,
        })
    }

    /// A string that is not part of a longer identifier
    ///
    /// Identifier characters default to alphanumerics, `_` and `$`.
    #[must_use]
    pub fn keyword(text: &str) -> Self {
        Self::keyword_with(text, CharSet::ident_chars(), false)
    }

    /// A case-insensitive keyword; yields the keyword as written here
    #[must_use]
    pub fn caseless_keyword(text: &str) -> Self {
        Self::keyword_with(text, CharSet::ident_chars(), true)
    }

    /// A keyword with custom identifier characters
    #[must_use]
    pub fn keyword_with(text: &str, ident_chars: CharSet, caseless: bool) -> Self {
        Self::from_node(ExprNode::Keyword {
            text: text.into(),
            caseless,
            ident_chars,
        })
    }

    /// A character-class word
    #[must_use]
    pub fn word(spec: WordSpec) -> Self {
        Self::from_node(ExprNode::Word(spec))
    }

    /// A word made only of characters from `chars`
    #[must_use]
    pub fn word_of(chars: impl Into<CharSet>) -> Self {
        Self::word(WordSpec::new(chars))
    }

    /// A word starting with a char from `init`, continuing with chars from `body`
    #[must_use]
    pub fn word_chars(init: impl Into<CharSet>, body: impl Into<CharSet>) -> Self {
        Self::word(WordSpec::new(init).body(body))
    }

    /// One of several whitespace-separated strings, longest-match safe
    ///
    /// `one_of("< <= >")` never returns `<` when the input holds `<=`.
    #[must_use]
    pub fn one_of(options: &str) -> Self {
        Self::one_of_list(options.split_whitespace(), false)
    }

    /// Case-insensitive [`Expr::one_of`]
    #[must_use]
    pub fn one_of_caseless(options: &str) -> Self {
        Self::one_of_list(options.split_whitespace(), true)
    }

    /// [`Expr::one_of`] over an explicit list
    pub fn one_of_list<'a>(options: impl IntoIterator<Item = &'a str>, caseless: bool) -> Self {
        Self::from_node(ExprNode::OneOf {
            options: order_options(options.into_iter().map(CompactString::from), caseless),
            caseless,
        })
    }

    /// A quoted string
    #[must_use]
    pub fn quoted(spec: QuotedSpec) -> Self {
        Self::from_node(ExprNode::Quoted(spec))
    }

    /// A string between `quote` characters, returned without the quotes
    #[must_use]
    pub fn quoted_string(quote: &str) -> Self {
        Self::quoted(QuotedSpec::new(quote))
    }

    /// `"..."` with backslash escapes, quotes kept in the result
    #[must_use]
    pub fn dbl_quoted_string() -> Self {
        Self::quoted(
            QuotedSpec::new("\"")
                .esc_char('\\')
                .esc_quote("\"\"")
                .keep_quotes(),
        )
    }

    /// `'...'` with backslash escapes, quotes kept in the result
    #[must_use]
    pub fn sgl_quoted_string() -> Self {
        Self::quoted(QuotedSpec::new("'").esc_char('\\').esc_quote("''").keep_quotes())
    }

    /// Unsigned decimal digits, converted to `Int`
    #[must_use]
    pub fn integer() -> Self {
        Self::from_node(ExprNode::Number(NumberKind::Integer))
    }

    /// Optionally signed decimal digits, converted to `Int`
    #[must_use]
    pub fn signed_integer() -> Self {
        Self::from_node(ExprNode::Number(NumberKind::SignedInteger))
    }

    /// Real or integer, optionally signed; `Float` when it has a fraction or exponent
    #[must_use]
    pub fn number() -> Self {
        Self::from_node(ExprNode::Number(NumberKind::Real))
    }

    /// A regular expression anchored at the current offset
    ///
    /// The pattern is compiled when the grammar is built; an invalid one is a
    /// [`GrammarError::InvalidRegex`](crate::GrammarError::InvalidRegex).
    #[must_use]
    pub fn regex(pattern: &str) -> Self {
        Self::from_node(ExprNode::Regex(pattern.into()))
    }

    /// A reference to the rule `name`, bound later in a [`GrammarBuilder`](crate::GrammarBuilder)
    #[must_use]
    pub fn rule(name: &str) -> Self {
        Self::from_node(ExprNode::Rule(name.into()))
    }

    // ---- combinators ----

    /// All of `items` in order
    pub fn seq(items: impl IntoIterator<Item = Expr>) -> Self {
        Self::from_node(ExprNode::Seq {
            children: items.into_iter().collect(),
            commit: None,
        })
    }

    /// All of `items` in order; a failure after the first `commit_at` items is fatal
    pub fn commit_seq(items: impl IntoIterator<Item = Expr>, commit_at: usize) -> Self {
        let children: Vec<Expr> = items.into_iter().collect();
        let commit = (commit_at < children.len()).then_some(commit_at);
        Self::from_node(ExprNode::Seq { children, commit })
    }

    /// The first of `items` that matches
    pub fn choice(items: impl IntoIterator<Item = Expr>) -> Self {
        Self::from_node(ExprNode::Choice(items.into_iter().collect()))
    }

    /// Zero or one
    #[must_use]
    pub fn opt(self) -> Self {
        Self::from_node(ExprNode::Opt {
            child: self,
            default: None,
        })
    }

    /// Zero or one, yielding `default` when absent
    #[must_use]
    pub fn optional_or(self, default: impl Into<Token>) -> Self {
        Self::from_node(ExprNode::Opt {
            child: self,
            default: Some(default.into()),
        })
    }

    /// Any number of repetitions
    #[must_use]
    pub fn zero_or_more(self) -> Self {
        self.repeat(0, None)
    }

    /// At least one repetition
    #[must_use]
    pub fn one_or_more(self) -> Self {
        self.repeat(1, None)
    }

    /// Between `min` and `max` repetitions
    #[must_use]
    pub fn repeat(self, min: usize, max: Option<usize>) -> Self {
        Self::from_node(ExprNode::Repeat {
            child: self,
            min,
            max,
        })
    }

    /// Exactly `n` repetitions
    #[must_use]
    pub fn times(self, n: usize) -> Self {
        self.repeat(n, Some(n))
    }

    /// One or more items separated by `delim`; delimiters are suppressed
    #[must_use]
    pub fn delimited(self, delim: impl Into<Expr>) -> Self {
        self.delimited_with(delim, DelimitedSpec::default())
    }

    /// Items separated by `delim`, with options
    #[must_use]
    pub fn delimited_with(self, delim: impl Into<Expr>, spec: DelimitedSpec) -> Self {
        let combine = spec.combine;
        let list = Self::from_node(ExprNode::Delimited {
            item: self,
            delim: delim.into(),
            spec,
        });
        if combine {
            list.combine()
        } else {
            list
        }
    }

    /// Succeeds without consuming input when `self` would match here
    #[must_use]
    pub fn followed_by(self) -> Self {
        Self::from_node(ExprNode::Lookahead {
            child: self,
            negate: false,
        })
    }

    /// Succeeds without consuming input when `self` would not match here
    #[must_use]
    pub fn not_followed_by(self) -> Self {
        Self::from_node(ExprNode::Lookahead {
            child: self,
            negate: true,
        })
    }

    /// Match but contribute nothing to the results
    #[must_use]
    pub fn suppress(self) -> Self {
        Self::from_node(ExprNode::Suppress(self))
    }

    /// Nest the results under one token
    #[must_use]
    pub fn group(self) -> Self {
        Self::from_node(ExprNode::Group(self))
    }

    /// Join the results into one string; no whitespace is skipped inside
    #[must_use]
    pub fn combine(self) -> Self {
        self.combine_with("")
    }

    /// Join the results into one string with `joiner` between tokens
    #[must_use]
    pub fn combine_with(self, joiner: &str) -> Self {
        Self::from_node(ExprNode::Combine {
            child: self,
            joiner: joiner.into(),
        })
    }

    /// Give the results a name; a trailing `*` makes it a list name
    #[must_use]
    pub fn named(self, name: &str) -> Self {
        match name.strip_suffix('*') {
            Some(list_name) => self.named_list(list_name),
            None => self.with_name(name, false),
        }
    }

    /// Give the results a name that accumulates one entry per match
    #[must_use]
    pub fn named_list(self, name: &str) -> Self {
        self.with_name(name, true)
    }

    fn with_name(self, name: &str, accumulate: bool) -> Self {
        Self::from_node(ExprNode::Named {
            child: self,
            name: name.into(),
            accumulate,
        })
    }

    /// Attach a parse action; actions run in attachment order
    ///
    /// A results name on `self` is applied after the action runs.
    #[must_use]
    pub fn action(self, action: ParseAction) -> Self {
        match self.node() {
            ExprNode::Named {
                child,
                name,
                accumulate,
            } => Self::from_node(ExprNode::Named {
                child: child.clone().action(action),
                name: name.clone(),
                accumulate: *accumulate,
            }),
            ExprNode::Action { child, actions } => {
                let mut actions = actions.clone();
                actions.push(action);
                Self::from_node(ExprNode::Action {
                    child: child.clone(),
                    actions,
                })
            }
            _ => Self::from_node(ExprNode::Action {
                child: self,
                actions: vec![action],
            }),
        }
    }

    /// Attach [`ParseAction::map`]
    #[must_use]
    pub fn map<F>(self, f: F) -> Self
    where
        F: Fn(&ParseResults) -> ParseResults + Send + Sync + 'static,
    {
        self.action(ParseAction::map(f))
    }

    /// Attach [`ParseAction::map_tokens`]
    #[must_use]
    pub fn map_tokens<F>(self, f: F) -> Self
    where
        F: Fn(&Token) -> Token + Send + Sync + 'static,
    {
        self.action(ParseAction::map_tokens(f))
    }

    /// Attach [`ParseAction::condition`]
    #[must_use]
    pub fn condition<F>(self, test: F) -> Self
    where
        F: Fn(&ParseResults) -> bool + Send + Sync + 'static,
    {
        self.action(ParseAction::condition(test))
    }

    /// Attach [`ParseAction::condition_with`]
    #[must_use]
    pub fn condition_with<F>(self, test: F, message: &str, fatal: bool) -> Self
    where
        F: Fn(&ParseResults) -> bool + Send + Sync + 'static,
    {
        self.action(ParseAction::condition_with(test, message, fatal))
    }

    /// Report failures at the start of this expression as `Expected <label>`
    #[must_use]
    pub fn labeled(self, label: &str) -> Self {
        Self::from_node(ExprNode::Labeled {
            child: self,
            label: label.into(),
        })
    }

    /// Skip `chars` instead of the grammar default, throughout this expression
    #[must_use]
    pub fn with_whitespace(self, chars: impl Into<CharSet>) -> Self {
        Self::from_node(ExprNode::Whitespace {
            child: self,
            chars: Some(Arc::new(chars.into())),
        })
    }

    /// Skip no whitespace anywhere inside this expression
    #[must_use]
    pub fn leave_whitespace(self) -> Self {
        Self::from_node(ExprNode::Whitespace {
            child: self,
            chars: None,
        })
    }

    fn then(self, rhs: Self, commit: bool) -> Self {
        let (mut children, mut commit_at) = match self.node() {
            ExprNode::Seq { children, commit } => (children.clone(), *commit),
            _ => (vec![self], None),
        };
        if commit && commit_at.is_none() {
            commit_at = Some(children.len());
        }
        children.push(rhs);
        Self::from_node(ExprNode::Seq {
            children,
            commit: commit_at,
        })
    }
}

impl From<&str> for Expr {
    fn from(text: &str) -> Self {
        Self::literal(text)
    }
}

impl<R: Into<Expr>> Add<R> for Expr {
    type Output = Expr;

    fn add(self, rhs: R) -> Expr {
        self.then(rhs.into(), false)
    }
}

impl<R: Into<Expr>> Sub<R> for Expr {
    type Output = Expr;

    fn sub(self, rhs: R) -> Expr {
        self.then(rhs.into(), true)
    }
}

impl<R: Into<Expr>> BitOr<R> for Expr {
    type Output = Expr;

    fn bitor(self, rhs: R) -> Expr {
        let mut alternatives = match self.node() {
            ExprNode::Choice(alternatives) => alternatives.clone(),
            _ => vec![self],
        };
        alternatives.push(rhs.into());
        Self::from_node(ExprNode::Choice(alternatives))
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.node() {
            ExprNode::Empty => f.write_str("Empty"),
            ExprNode::End => f.write_str("end of text"),
            ExprNode::Literal { text, caseless: false } => write!(f, "{:?}", text.as_str()),
            ExprNode::Literal { text, caseless: true } => write!(f, "CaselessLiteral {:?}", text.as_str()),
            ExprNode::Keyword { text, caseless: false, .. } => write!(f, "Keyword {:?}", text.as_str()),
            ExprNode::Keyword { text, caseless: true, .. } => write!(f, "CaselessKeyword {:?}", text.as_str()),
            ExprNode::Word(spec) => f.write_str(&spec.describe()),
            ExprNode::OneOf { options, .. } => {
                f.write_str("{")?;
                for (i, option) in options.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" | ")?;
                    }
                    write!(f, "{:?}", option.as_str())?;
                }
                f.write_str("}")
            }
            ExprNode::Quoted(spec) => f.write_str(&spec.describe()),
            ExprNode::Number(kind) => f.write_str(kind.describe()),
            ExprNode::Regex(pattern) => write!(f, "Re:({:?})", pattern.as_str()),
            ExprNode::Seq { children, commit } => {
                f.write_str("{")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(if *commit == Some(i) { " - " } else { " " })?;
                    }
                    write!(f, "{child}")?;
                }
                f.write_str("}")
            }
            ExprNode::Choice(alternatives) => {
                f.write_str("{")?;
                for (i, alt) in alternatives.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" | ")?;
                    }
                    write!(f, "{alt}")?;
                }
                f.write_str("}")
            }
            ExprNode::Opt { child, .. } => write!(f, "[{child}]"),
            ExprNode::Repeat { child, min: 0, max: None } => write!(f, "[{child}]..."),
            ExprNode::Repeat { child, min: 1, max: None } => write!(f, "{{{child}}}..."),
            ExprNode::Repeat { child, min, max: None } => write!(f, "{child}{{{min},...}}"),
            ExprNode::Repeat { child, min, max: Some(max) } => write!(f, "{child}{{{min},{max}}}"),
            ExprNode::Delimited { item, delim, .. } => write!(f, "{item} [{delim} {item}]..."),
            ExprNode::Lookahead { child, negate: false } => write!(f, "FollowedBy:({child})"),
            ExprNode::Lookahead { child, negate: true } => write!(f, "~{child}"),
            ExprNode::Group(child) => write!(f, "Group:({child})"),
            ExprNode::Combine { child, .. } => write!(f, "Combine:({child})"),
            ExprNode::Rule(name) => f.write_str(name),
            ExprNode::Labeled { label, .. } => f.write_str(label),
            ExprNode::Suppress(child)
            | ExprNode::Named { child, .. }
            | ExprNode::Action { child, .. }
            | ExprNode::Whitespace { child, .. } => write!(f, "{child}"),
        }
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Expr({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_flattens_sequence() {
        let e = Expr::literal("x") + "y" + "z";
        let ExprNode::Seq { children, commit } = e.node() else {
            panic!("expected a sequence");
        };
        assert_eq!(children.len(), 3);
        assert_eq!(*commit, None);
        assert_eq!(e.to_string(), r#"{"x" "y" "z"}"#);
    }

    #[test]
    fn test_commit_point_position() {
        let e = Expr::keyword("if") - "(" + Expr::rule("cond") + ")";
        let ExprNode::Seq { children, commit } = e.node() else {
            panic!("expected a sequence");
        };
        assert_eq!(children.len(), 4);
        assert_eq!(*commit, Some(1));
        assert_eq!(e.to_string(), r#"{Keyword "if" - "(" cond ")"}"#);
    }

    #[test]
    fn test_bitor_flattens_choice() {
        let e = Expr::literal("a") | "b" | "c";
        let ExprNode::Choice(alternatives) = e.node() else {
            panic!("expected a choice");
        };
        assert_eq!(alternatives.len(), 3);
    }

    #[test]
    fn test_building_does_not_mutate_operands() {
        let ab = Expr::literal("a") + "b";
        let _abc = ab.clone() + "c";
        let ExprNode::Seq { children, .. } = ab.node() else {
            panic!("expected a sequence");
        };
        assert_eq!(children.len(), 2);
    }

    #[test]
    fn test_star_suffix_means_list_name() {
        let e = Expr::word_of(CharSet::alphas()).named("alpha*");
        let ExprNode::Named { name, accumulate, .. } = e.node() else {
            panic!("expected a named expression");
        };
        assert_eq!(name.as_str(), "alpha");
        assert!(*accumulate);
    }

    #[test]
    fn test_action_goes_inside_name() {
        let e = Expr::integer().named("value").condition(|_| true);
        let ExprNode::Named { child, .. } = e.node() else {
            panic!("name should stay outermost");
        };
        assert!(matches!(child.node(), ExprNode::Action { .. }));
    }

    #[test]
    fn test_display_terminals() {
        assert_eq!(Expr::word_of(CharSet::alphas()).to_string(), "W:(A-Za-z)");
        assert_eq!(Expr::one_of("* /").to_string(), r#"{"*" | "/"}"#);
        assert_eq!(Expr::literal("x").opt().to_string(), r#"["x"]"#);
        assert_eq!(Expr::literal("x").one_or_more().to_string(), r#"{"x"}..."#);
    }
}
