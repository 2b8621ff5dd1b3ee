//! Parse actions and conditions
//!
//! An action runs after its expression matched. It sees the match's results
//! and span and may keep them, replace them, or reject the match. A
//! rejection is an ordinary failure at the match start, so an enclosing
//! choice moves on to its next alternative.

use std::fmt;
use std::sync::Arc;

use crate::results::{ParseResults, Token};

/// What an action decided
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    /// Keep the results as they are
    Keep,
    /// Replace the results
    Replace(ParseResults),
    /// Reject the match with a message
    Reject(String),
}

impl From<ParseResults> for ActionOutcome {
    fn from(results: ParseResults) -> Self {
        Self::Replace(results)
    }
}

/// The matched span handed to an action
#[derive(Debug, Clone, Copy)]
pub struct ActionContext<'t> {
    text: &'t str,
    start: usize,
    end: usize,
}

impl<'t> ActionContext<'t> {
    pub(crate) const fn new(text: &'t str, start: usize, end: usize) -> Self {
        Self { text, start, end }
    }

    /// The whole input being parsed
    #[must_use]
    pub const fn input(&self) -> &'t str {
        self.text
    }

    /// Offset where the match starts, after leading whitespace
    #[must_use]
    pub const fn start(&self) -> usize {
        self.start
    }

    /// Offset just past the match
    #[must_use]
    pub const fn end(&self) -> usize {
        self.end
    }

    /// The matched text
    #[must_use]
    pub fn matched(&self) -> &'t str {
        self.text.get(self.start..self.end).unwrap_or("")
    }
}

type TransformFn = dyn Fn(&ActionContext<'_>, &ParseResults) -> ActionOutcome + Send + Sync;
type PredicateFn = dyn Fn(&ParseResults) -> bool + Send + Sync;

#[derive(Clone)]
enum ActionKind {
    Transform(Arc<TransformFn>),
    Condition {
        test: Arc<PredicateFn>,
        message: Arc<str>,
        fatal: bool,
    },
}

/// A callback attached to an expression
///
/// Cheap to clone; the closure is shared.
#[derive(Clone)]
pub struct ParseAction {
    kind: ActionKind,
}

impl ParseAction {
    /// The general form: full control over the outcome
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&ActionContext<'_>, &ParseResults) -> ActionOutcome + Send + Sync + 'static,
    {
        Self {
            kind: ActionKind::Transform(Arc::new(f)),
        }
    }

    /// Rewrite the results
    pub fn map<F>(f: F) -> Self
    where
        F: Fn(&ParseResults) -> ParseResults + Send + Sync + 'static,
    {
        Self::new(move |_, results| ActionOutcome::Replace(f(results)))
    }

    /// Rewrite the results, or reject the match with the returned message
    pub fn try_map<F>(f: F) -> Self
    where
        F: Fn(&ParseResults) -> Result<ParseResults, String> + Send + Sync + 'static,
    {
        Self::new(move |_, results| match f(results) {
            Ok(replaced) => ActionOutcome::Replace(replaced),
            Err(message) => ActionOutcome::Reject(message),
        })
    }

    /// Convert every top-level token, dropping names
    pub fn map_tokens<F>(f: F) -> Self
    where
        F: Fn(&Token) -> Token + Send + Sync + 'static,
    {
        Self::new(move |_, results| {
            ActionOutcome::Replace(results.iter().map(|token| f(token)).collect())
        })
    }

    /// Accept the match only when `test` holds
    pub fn condition<F>(test: F) -> Self
    where
        F: Fn(&ParseResults) -> bool + Send + Sync + 'static,
    {
        Self::condition_with(test, "failed user-defined condition", false)
    }

    /// Accept the match only when `test` holds, with a custom message
    ///
    /// A fatal condition stops the whole parse instead of letting an
    /// enclosing choice try its next alternative.
    pub fn condition_with<F>(test: F, message: impl Into<Arc<str>>, fatal: bool) -> Self
    where
        F: Fn(&ParseResults) -> bool + Send + Sync + 'static,
    {
        Self {
            kind: ActionKind::Condition {
                test: Arc::new(test),
                message: message.into(),
                fatal,
            },
        }
    }

    /// Run the action; returns the outcome and whether a rejection is fatal
    pub(crate) fn apply(&self, ctx: &ActionContext<'_>, results: &ParseResults) -> (ActionOutcome, bool) {
        match &self.kind {
            ActionKind::Transform(f) => (f(ctx, results), false),
            ActionKind::Condition { test, message, fatal } => {
                if test(results) {
                    (ActionOutcome::Keep, false)
                } else {
                    (ActionOutcome::Reject(message.to_string()), *fatal)
                }
            }
        }
    }
}

impl fmt::Debug for ParseAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ActionKind::Transform(_) => f.write_str("ParseAction::Transform"),
            ActionKind::Condition { message, fatal, .. } => f
                .debug_struct("ParseAction::Condition")
                .field("message", message)
                .field("fatal", fatal)
                .finish(),
        }
    }
}

/// Parse the first token's text as an integer
///
/// A ready-made action for `Word(nums)`-style expressions.
#[must_use]
pub fn to_int() -> ParseAction {
    ParseAction::try_map(|results| {
        let token = results.first().ok_or_else(|| "expected a token".to_string())?;
        let text = token.text();
        text.parse::<i64>()
            .map(ParseResults::from_token)
            .map_err(|e| format!("invalid integer {text:?}: {e}"))
    })
}
