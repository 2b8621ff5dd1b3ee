//! # Error Types
//!
//! Error types and diagnostics for parsing.
//!
//! - [`ParseFailure`]: input did not match. It carries the furthest offset
//!   reached, its line and column, and what was expected there.
//! - [`ParseError`]: every way a parse call can end without results. This is
//!   a syntax failure, a grammar configuration problem found while parsing, or
//!   the recursion limit being hit.
//!
//! ## Diagnostics Support
//!
//! When the `diagnostics` feature is enabled, errors integrate with [`miette`]
//! and carry stable diagnostic codes.

pub mod diagnostics;

use std::fmt;

use thiserror::Error;

#[cfg(feature = "diagnostics")]
use miette::Diagnostic;

use crate::grammar::GrammarError;
use crate::text::LineIndex;

/// Longest excerpt of the input echoed back in a failure message
const FOUND_EXCERPT_CHARS: usize = 16;

/// A syntax failure: the input does not match the grammar
///
/// The position is the furthest point any terminal reached while trying to
/// match, which is almost always where the input actually goes wrong.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
#[cfg_attr(feature = "diagnostics", diagnostic(code(pegwood::parse::syntax)))]
pub struct ParseFailure {
    offset: usize,
    line: usize,
    column: usize,
    message: String,
    found: String,
    line_text: String,
    fatal: bool,
}

impl ParseFailure {
    /// Build a failure and resolve its position against `text`
    #[must_use]
    pub fn new(text: &str, offset: usize, message: impl Into<String>, fatal: bool) -> Self {
        Self::with_index(&LineIndex::new(text), text, offset, message, fatal)
    }

    /// Same as [`ParseFailure::new`] with a prebuilt line index
    #[must_use]
    pub fn with_index(
        index: &LineIndex,
        text: &str,
        offset: usize,
        message: impl Into<String>,
        fatal: bool,
    ) -> Self {
        let offset = offset.min(text.len());
        let pos = index.line_col(text, offset);
        Self {
            offset,
            line: pos.line,
            column: pos.column,
            message: message.into(),
            found: found_excerpt(text, offset),
            line_text: index.line_text(text, offset).to_owned(),
            fatal,
        }
    }

    /// Byte offset of the failure
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// One-based line number
    #[must_use]
    pub const fn line(&self) -> usize {
        self.line
    }

    /// One-based column, counted in characters
    #[must_use]
    pub const fn column(&self) -> usize {
        self.column
    }

    /// What was expected, e.g. `Expected "xyz"`
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Excerpt of the input at the failure, or `end of text`
    #[must_use]
    pub fn found(&self) -> &str {
        &self.found
    }

    /// Full text of the line containing the failure
    #[must_use]
    pub fn line_text(&self) -> &str {
        &self.line_text
    }

    /// True when the failure happened past a commit point
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        self.fatal
    }

    /// The failing line with `>!<` inserted at the failure column
    #[must_use]
    pub fn marked_line(&self) -> String {
        diagnostics::mark_line(&self.line_text, self.column, ">!<")
    }

    /// Multi-line explanation: the failing line, a caret, and the message
    #[must_use]
    pub fn explain(&self) -> String {
        format!(
            "{}\n{}\n{self}",
            self.line_text,
            diagnostics::caret_line(&self.line_text, self.column)
        )
    }
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, found {} (at char {}), (line:{}, col:{})",
            self.message, self.found, self.offset, self.line, self.column
        )
    }
}

/// Everything that can stop a parse call from producing results
#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum ParseError {
    /// The input does not match
    #[error(transparent)]
    #[cfg_attr(feature = "diagnostics", diagnostic(transparent))]
    Syntax(#[from] ParseFailure),

    /// The grammar itself is broken (unbound rule, repetition that cannot progress, ...)
    #[error("grammar error: {0}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(transparent))]
    Grammar(#[from] GrammarError),

    /// Recursion went deeper than the configured limit
    #[error("recursion limit of {limit} exceeded at char {offset}")]
    #[cfg_attr(
        feature = "diagnostics",
        diagnostic(
            code(pegwood::parse::recursion_limit),
            help("raise `ParserConfig::max_depth` or restructure the grammar")
        )
    )]
    RecursionLimit {
        /// Offset being parsed when the limit was hit
        offset: usize,
        /// The configured limit
        limit: usize,
    },
}

impl ParseError {
    /// The syntax failure, if this is one
    #[must_use]
    pub const fn as_failure(&self) -> Option<&ParseFailure> {
        match self {
            Self::Syntax(failure) => Some(failure),
            _ => None,
        }
    }

    /// True for syntax failures
    #[must_use]
    pub const fn is_syntax(&self) -> bool {
        matches!(self, Self::Syntax(_))
    }
}

/// Result alias for parse calls
pub type ParseResult<T> = Result<T, ParseError>;

fn found_excerpt(text: &str, offset: usize) -> String {
    let rest = text.get(offset..).unwrap_or("");
    if rest.is_empty() {
        return "end of text".to_owned();
    }
    let word = rest
        .split(char::is_whitespace)
        .next()
        .filter(|w| !w.is_empty())
        .unwrap_or(rest);
    let excerpt: String = word.chars().take(FOUND_EXCERPT_CHARS).collect();
    format!("{excerpt:?}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_position() {
        let failure = ParseFailure::new("ab\ncd ef", 4, "Expected \"x\"", false);
        assert_eq!(failure.line(), 2);
        assert_eq!(failure.column(), 2);
        assert_eq!(failure.line_text(), "cd ef");
        assert_eq!(failure.found(), "\"d\"");
        assert!(!failure.is_fatal());
    }

    #[test]
    fn test_failure_display() {
        let failure = ParseFailure::new("xyu", 0, "Expected \"xyz\"", false);
        assert_eq!(
            failure.to_string(),
            "Expected \"xyz\", found \"xyu\" (at char 0), (line:1, col:1)"
        );
    }

    #[test]
    fn test_failure_at_end() {
        let failure = ParseFailure::new("xy", 2, "Expected \"z\"", false);
        assert_eq!(failure.found(), "end of text");
        assert_eq!(failure.column(), 3);
        assert_eq!(failure.marked_line(), "xy>!<");
    }

    #[test]
    fn test_explain() {
        let failure = ParseFailure::new("a = 1 +", 7, "Expected number", false);
        let explained = failure.explain();
        let mut lines = explained.lines();
        assert_eq!(lines.next(), Some("a = 1 +"));
        assert_eq!(lines.next(), Some("       ^"));
    }
}
