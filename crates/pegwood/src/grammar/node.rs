//! Compiled grammar nodes.
//!
//! Building a grammar flattens the `Expr` trees into one arena. Each node
//! has a stable [`NodeId`] that keys the packrat cache. Whitespace settings
//! are resolved at this point, so every terminal carries the exact set it
//! skips.

use std::sync::Arc;

use compact_str::CompactString;

use crate::grammar::action::ParseAction;
use crate::grammar::expr::DelimitedSpec;
use crate::grammar::terminal::{NumberKind, QuotedSpec, WordSpec};
use crate::results::Token;
use crate::text::CharSet;

/// Index of a node in a grammar's arena
pub(crate) type NodeId = usize;

/// Whitespace skipped before a terminal; `None` skips nothing
pub(crate) type Skip = Option<Arc<CharSet>>;

#[derive(Debug)]
pub(crate) enum Node {
    Empty,
    End {
        skip: Skip,
    },
    Literal {
        text: CompactString,
        caseless: bool,
        skip: Skip,
        expected: Arc<str>,
    },
    Keyword {
        text: CompactString,
        caseless: bool,
        ident_chars: CharSet,
        skip: Skip,
        expected: Arc<str>,
    },
    Word {
        spec: WordSpec,
        skip: Skip,
        expected: Arc<str>,
    },
    OneOf {
        options: Vec<CompactString>,
        caseless: bool,
        skip: Skip,
        expected: Arc<str>,
    },
    Quoted {
        spec: QuotedSpec,
        skip: Skip,
        expected: Arc<str>,
    },
    Number {
        kind: NumberKind,
        skip: Skip,
        expected: Arc<str>,
    },
    Regex {
        re: regex::Regex,
        skip: Skip,
        expected: Arc<str>,
    },
    Seq {
        children: Vec<NodeId>,
        commit: Option<usize>,
    },
    Choice(Vec<NodeId>),
    Opt {
        child: NodeId,
        default: Option<Token>,
    },
    Repeat {
        child: NodeId,
        min: usize,
        max: Option<usize>,
        what: Arc<str>,
    },
    Delimited {
        item: NodeId,
        delim: NodeId,
        spec: DelimitedSpec,
        what: Arc<str>,
    },
    Lookahead {
        child: NodeId,
        negate: bool,
        expected: Arc<str>,
    },
    Suppress(NodeId),
    Group(NodeId),
    Combine {
        child: NodeId,
        joiner: CompactString,
        skip: Skip,
    },
    /// Reference to a rule by index
    Call(usize),
    Named {
        child: NodeId,
        name: CompactString,
        accumulate: bool,
    },
    Action {
        child: NodeId,
        actions: Vec<ParseAction>,
        skip: Skip,
    },
    Labeled {
        child: NodeId,
        skip: Skip,
        expected: Arc<str>,
    },
}

impl Node {
    /// Child nodes in evaluation order
    pub(crate) fn children(&self) -> Vec<NodeId> {
        match self {
            Self::Seq { children, .. } | Self::Choice(children) => children.clone(),
            Self::Delimited { item, delim, .. } => vec![*item, *delim],
            Self::Opt { child, .. }
            | Self::Repeat { child, .. }
            | Self::Lookahead { child, .. }
            | Self::Suppress(child)
            | Self::Group(child)
            | Self::Combine { child, .. }
            | Self::Named { child, .. }
            | Self::Action { child, .. }
            | Self::Labeled { child, .. } => vec![*child],
            _ => Vec::new(),
        }
    }

    pub(crate) const fn is_call(&self) -> bool {
        matches!(self, Self::Call(_))
    }

    pub(crate) const fn is_action(&self) -> bool {
        matches!(self, Self::Action { .. })
    }
}

/// Offset after skipping `skip` from `pos`
#[inline]
pub(crate) fn skip_whitespace(skip: &Skip, text: &str, pos: usize) -> usize {
    match skip {
        Some(chars) => pos + text.get(pos..).map_or(0, |rest| chars.span(rest)),
        None => pos,
    }
}
