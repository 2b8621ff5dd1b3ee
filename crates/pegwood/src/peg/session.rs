use std::ops::Range;
use std::time::Instant;

use crate::error::{ParseError, ParseFailure};
use crate::grammar::builder::{Grammar, GrammarError};
use crate::grammar::node::{skip_whitespace, NodeId};
use crate::peg::parser::{end_of_text, Evaluator, Halt};
use crate::peg::state::{Fail, PackratCache, ParseMetrics};
use crate::results::ParseResults;

/// One input text paired with its packrat cache
///
/// Repeated parses of the same text through one session reuse cached
/// outcomes, and every parse returns the same result as the first. Parse
/// actions run at most once per node and offset for the life of the session.
///
/// # Example
///
/// ```rust
/// use pegwood::{Expr, Grammar};
///
/// let grammar = Grammar::from_expr(Expr::integer().one_or_more()).unwrap();
/// let mut session = grammar.session("1 2 3");
/// let first = session.parse(true).unwrap();
/// let second = session.parse(true).unwrap();
/// assert_eq!(first, second);
/// assert!(session.metrics().cache_hits > 0);
/// ```
#[derive(Debug)]
pub struct ParseSession<'g, 't> {
    grammar: &'g Grammar,
    text: &'t str,
    cache: PackratCache,
    metrics: ParseMetrics,
}

/// A match found by [`Grammar::scan`]
#[derive(Debug, Clone, PartialEq)]
pub struct ScanMatch {
    pub results: ParseResults,
    /// Byte range of the match, leading whitespace excluded
    pub span: Range<usize>,
}

impl<'g, 't> ParseSession<'g, 't> {
    pub(crate) fn new(grammar: &'g Grammar, text: &'t str) -> Self {
        Self {
            grammar,
            text,
            cache: PackratCache::new(grammar.config.max_memo_size),
            metrics: ParseMetrics::default(),
        }
    }

    /// The text this session parses
    #[must_use]
    pub const fn text(&self) -> &'t str {
        self.text
    }

    /// Counters accumulated over every parse in this session
    #[must_use]
    pub const fn metrics(&self) -> &ParseMetrics {
        &self.metrics
    }

    /// Switch to a new text, discarding the cache and metrics
    pub fn reset(&mut self, text: &'t str) {
        self.text = text;
        self.cache.clear();
        self.metrics = ParseMetrics::default();
    }

    /// Parse from the grammar's entry point
    ///
    /// With `parse_all`, only whitespace may follow the match.
    ///
    /// # Errors
    ///
    /// [`ParseError::Syntax`] when the text does not match,
    /// [`ParseError::Grammar`] when the grammar has no entry point or a
    /// repetition stops making progress, and [`ParseError::RecursionLimit`]
    /// when nesting exceeds [`ParserConfig::max_depth`](crate::ParserConfig::max_depth).
    pub fn parse(&mut self, parse_all: bool) -> Result<ParseResults, ParseError> {
        let entry = self.grammar.entry.ok_or(GrammarError::MissingEntryPoint)?;
        self.run(entry, parse_all)
    }

    /// Parse from rule `name` instead of the entry point
    ///
    /// # Errors
    ///
    /// As [`ParseSession::parse`], plus [`GrammarError::UndefinedRule`] for an unknown rule.
    pub fn parse_rule(&mut self, name: &str, parse_all: bool) -> Result<ParseResults, ParseError> {
        let Some(&rule) = self.grammar.rules.get(name) else {
            let candidates: Vec<String> = self.grammar.rule_names().map(ToOwned::to_owned).collect();
            return Err(GrammarError::UndefinedRule {
                name: name.to_owned(),
                suggestion: crate::error::diagnostics::did_you_mean(name, &candidates),
            }
            .into());
        };
        self.run(self.grammar.rule_body(rule), parse_all)
    }

    /// Every non-overlapping match of the entry point, scanning left to right
    ///
    /// # Errors
    ///
    /// Only errors that abort a parse are returned. Offsets where the grammar
    /// does not match are skipped.
    pub fn scan(&mut self) -> Result<Vec<ScanMatch>, ParseError> {
        let entry = self.grammar.entry.ok_or(GrammarError::MissingEntryPoint)?;
        let started = Instant::now();
        let text = self.text;
        let mut found = Vec::new();
        let mut pos = 0;
        {
            let mut evaluator = Evaluator::new(self.grammar, text, &mut self.cache, &mut self.metrics);
            while pos <= text.len() {
                match evaluator.eval(entry, pos) {
                    Ok(success) => {
                        let start = skip_whitespace(&self.grammar.default_skip, text, pos).min(success.end);
                        let next = if success.end > pos { success.end } else { next_char(text, pos) };
                        found.push(ScanMatch {
                            results: success.results,
                            span: start..success.end,
                        });
                        pos = next;
                    }
                    Err(Halt::Fail(_)) => pos = next_char(text, pos),
                    Err(Halt::Error(err)) => return Err(err),
                }
            }
        }
        self.metrics.parse_time += started.elapsed();
        log::debug!("scan found {} matches in {} bytes", found.len(), text.len());
        Ok(found)
    }

    fn run(&mut self, node: NodeId, parse_all: bool) -> Result<ParseResults, ParseError> {
        let started = Instant::now();
        let text = self.text;
        log::debug!("parse start: {} bytes, parse_all={parse_all}", text.len());

        let mut evaluator = Evaluator::new(self.grammar, text, &mut self.cache, &mut self.metrics);
        let outcome = match evaluator.eval(node, 0) {
            Ok(success) if parse_all => {
                let end = skip_whitespace(&self.grammar.default_skip, text, success.end);
                if end == text.len() {
                    Ok(success.results)
                } else {
                    let fail = Fail::new(end, &end_of_text());
                    Err(Halt::Fail(fail))
                }
            }
            Ok(success) => Ok(success.results),
            Err(halt) => Err(halt),
        };
        let outcome = outcome.map_err(|halt| match halt {
            Halt::Fail(fail) => ParseError::Syntax(to_failure(text, final_failure(fail, evaluator.furthest()))),
            Halt::Error(err) => err,
        });

        self.metrics.parse_time += started.elapsed();
        match &outcome {
            Ok(results) => log::debug!(
                "parse ok: {} tokens, {} cache hits, {} misses",
                results.len(),
                self.metrics.cache_hits,
                self.metrics.cache_misses
            ),
            Err(err) => log::debug!("parse failed: {err}"),
        }
        outcome
    }
}

/// The failure to report: a fatal failure as is, otherwise the furthest
/// recorded one unless the propagated failure reaches at least as far
fn final_failure(propagated: Fail, furthest: Option<&Fail>) -> Fail {
    match furthest {
        Some(furthest) if !propagated.fatal && furthest.offset > propagated.offset => Fail {
            fatal: false,
            ..furthest.clone()
        },
        _ => propagated,
    }
}

fn to_failure(text: &str, fail: Fail) -> ParseFailure {
    ParseFailure::new(text, fail.offset, fail.message.as_ref(), fail.fatal)
}

fn next_char(text: &str, pos: usize) -> usize {
    text[pos..].chars().next().map_or(pos + 1, |c| pos + c.len_utf8())
}

impl Grammar {
    /// Open a session over `text`
    #[must_use]
    pub fn session<'g, 't>(&'g self, text: &'t str) -> ParseSession<'g, 't> {
        ParseSession::new(self, text)
    }

    /// Parse `text` from the entry point in a fresh session
    ///
    /// # Errors
    ///
    /// See [`ParseSession::parse`].
    pub fn parse(&self, text: &str, parse_all: bool) -> Result<ParseResults, ParseError> {
        self.session(text).parse(parse_all)
    }

    /// Parse `text` from rule `name` in a fresh session
    ///
    /// # Errors
    ///
    /// See [`ParseSession::parse_rule`].
    pub fn parse_rule(&self, name: &str, text: &str, parse_all: bool) -> Result<ParseResults, ParseError> {
        self.session(text).parse_rule(name, parse_all)
    }

    /// True when the whole of `text` matches the entry point
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        self.parse(text, true).is_ok()
    }

    /// Every non-overlapping match of the entry point in `text`
    ///
    /// # Errors
    ///
    /// See [`ParseSession::scan`].
    pub fn scan(&self, text: &str) -> Result<Vec<ScanMatch>, ParseError> {
        self.session(text).scan()
    }

    /// The results of every match; [`Grammar::scan`] without the spans
    ///
    /// # Errors
    ///
    /// See [`ParseSession::scan`].
    pub fn search(&self, text: &str) -> Result<Vec<ParseResults>, ParseError> {
        Ok(self.scan(text)?.into_iter().map(|m| m.results).collect())
    }
}
