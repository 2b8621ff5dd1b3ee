//! Evaluation of compiled nodes.
//!
//! Every node evaluates to a [`Success`] or a [`Halt`]. A `Halt::Fail` is an
//! ordinary non-match that callers may backtrack over. A `Halt::Error` aborts
//! the whole parse.

use std::sync::Arc;

use crate::error::ParseError;
use crate::grammar::action::{ActionContext, ActionOutcome};
use crate::grammar::builder::{Grammar, GrammarError};
use crate::grammar::node::{skip_whitespace, Node, NodeId};
use crate::grammar::terminal::{caseless_prefix, preceded_by};
use crate::peg::config::MemoScope;
use crate::peg::state::{Fail, MemoEntry, PackratCache, ParseMetrics, Success};
use crate::results::{ParseResults, Token};

pub(crate) enum Halt {
    Fail(Fail),
    Error(ParseError),
}

type Outcome = Result<Success, Halt>;

/// Remaining stack below which a nested evaluation moves to a fresh segment
const STACK_RED_ZONE: usize = 128 * 1024;
/// Size of each extra stack segment
const STACK_SEGMENT: usize = 2 * 1024 * 1024;

fn matched(end: usize, results: ParseResults) -> Outcome {
    Ok(Success { end, results })
}

fn nothing(at: usize) -> Outcome {
    matched(at, ParseResults::new())
}

/// One evaluation pass over a session's text
pub(crate) struct Evaluator<'a> {
    grammar: &'a Grammar,
    text: &'a str,
    cache: &'a mut PackratCache,
    metrics: &'a mut ParseMetrics,
    furthest: Option<Fail>,
    depth: usize,
}

impl<'a> Evaluator<'a> {
    pub(crate) fn new(
        grammar: &'a Grammar,
        text: &'a str,
        cache: &'a mut PackratCache,
        metrics: &'a mut ParseMetrics,
    ) -> Self {
        Self {
            grammar,
            text,
            cache,
            metrics,
            furthest: None,
            depth: 0,
        }
    }

    /// The furthest failure recorded so far
    pub(crate) fn furthest(&self) -> Option<&Fail> {
        self.furthest.as_ref()
    }

    /// Record a failure; the earliest one recorded wins ties
    pub(crate) fn record(&mut self, fail: &Fail) {
        if self.furthest.as_ref().map_or(true, |f| fail.offset > f.offset) {
            self.furthest = Some(fail.clone());
        }
    }

    fn fail(&mut self, offset: usize, message: &Arc<str>) -> Halt {
        let fail = Fail::new(offset, message);
        self.record(&fail);
        Halt::Fail(fail)
    }

    pub(crate) fn eval(&mut self, id: NodeId, pos: usize) -> Outcome {
        let config = &self.grammar.config;
        if self.depth >= config.max_depth {
            return Err(Halt::Error(ParseError::RecursionLimit {
                offset: pos,
                limit: config.max_depth,
            }));
        }

        let node = self.grammar.node(id);
        let memoize = config.enable_packrat
            && (config.memo_scope == MemoScope::All || node.is_call() || node.is_action());

        // one nesting level spans several frames, so `max_depth` alone
        // cannot keep a small thread stack from overflowing
        self.depth += 1;
        let outcome = stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT, || {
            if memoize {
                self.eval_memoized(id, pos)
            } else {
                self.eval_node(id, pos)
            }
        });
        self.depth -= 1;
        outcome
    }

    fn eval_memoized(&mut self, id: NodeId, pos: usize) -> Outcome {
        if let Some(entry) = self.cache.get(id, pos) {
            self.metrics.cache_hits += 1;
            let MemoEntry { outcome, furthest } = entry.clone();
            if let Some(fail) = &furthest {
                self.record(fail);
            }
            return outcome.map_err(Halt::Fail);
        }
        self.metrics.cache_misses += 1;

        let saved = self.furthest.take();
        let outcome = self.eval_node(id, pos);
        let local = std::mem::replace(&mut self.furthest, saved);

        let stored = match &outcome {
            Ok(success) => Some(Ok(success.clone())),
            Err(Halt::Fail(fail)) => Some(Err(fail.clone())),
            Err(Halt::Error(_)) => None,
        };
        if let Some(stored) = stored {
            let entry = MemoEntry {
                outcome: stored,
                furthest: local.clone(),
            };
            let pinned = self.grammar.node(id).is_action();
            if self.cache.insert(id, pos, entry, pinned) {
                self.metrics.cache_evictions += 1;
            }
        }
        if let Some(fail) = &local {
            self.record(fail);
        }
        outcome
    }

    fn eval_node(&mut self, id: NodeId, pos: usize) -> Outcome {
        self.metrics.evaluations += 1;
        let grammar = self.grammar;
        let text = self.text;

        match grammar.node(id) {
            Node::Empty => nothing(pos),
            Node::End { skip } => {
                let start = skip_whitespace(skip, text, pos);
                if start == text.len() {
                    nothing(start)
                } else {
                    Err(self.fail(start, &end_of_text()))
                }
            }
            Node::Literal { text: lit, caseless, skip, expected } => {
                let start = skip_whitespace(skip, text, pos);
                let rest = &text[start..];
                let len = if *caseless {
                    caseless_prefix(rest, lit)
                } else {
                    rest.starts_with(lit.as_str()).then_some(lit.len())
                };
                match len {
                    Some(len) => matched(start + len, ParseResults::from_token(Token::str(lit.clone()))),
                    None => Err(self.fail(start, expected)),
                }
            }
            Node::Keyword { text: kw, caseless, ident_chars, skip, expected } => {
                let start = skip_whitespace(skip, text, pos);
                let rest = &text[start..];
                let len = if *caseless {
                    caseless_prefix(rest, kw)
                } else {
                    rest.starts_with(kw.as_str()).then_some(kw.len())
                };
                let bounded = len.filter(|&len| {
                    !preceded_by(text, start, |c| ident_chars.contains(c))
                        && !rest[len..].chars().next().is_some_and(|c| ident_chars.contains(c))
                });
                match bounded {
                    Some(len) => matched(start + len, ParseResults::from_token(Token::str(kw.clone()))),
                    None => Err(self.fail(start, expected)),
                }
            }
            Node::Word { spec, skip, expected } => {
                let start = skip_whitespace(skip, text, pos);
                match spec.scan(text, start) {
                    Some(end) => matched(end, ParseResults::from_token(Token::str(&text[start..end]))),
                    None => Err(self.fail(start, expected)),
                }
            }
            Node::OneOf { options, caseless, skip, expected } => {
                let start = skip_whitespace(skip, text, pos);
                let rest = &text[start..];
                let hit = options.iter().find_map(|option| {
                    let len = if *caseless {
                        caseless_prefix(rest, option)
                    } else {
                        rest.starts_with(option.as_str()).then_some(option.len())
                    };
                    len.map(|len| (len, option))
                });
                match hit {
                    Some((len, option)) => {
                        matched(start + len, ParseResults::from_token(Token::str(option.clone())))
                    }
                    None => Err(self.fail(start, expected)),
                }
            }
            Node::Quoted { spec, skip, expected } => {
                let start = skip_whitespace(skip, text, pos);
                match spec.scan(text, start) {
                    Some((end, value)) => matched(end, ParseResults::from_token(Token::str(value))),
                    None => Err(self.fail(start, expected)),
                }
            }
            Node::Number { kind, skip, expected } => {
                let start = skip_whitespace(skip, text, pos);
                match kind.scan(text, start) {
                    Some((end, token)) => matched(end, ParseResults::from_token(token)),
                    None => Err(self.fail(start, expected)),
                }
            }
            Node::Regex { re, skip, expected } => {
                let start = skip_whitespace(skip, text, pos);
                match re.find(&text[start..]) {
                    Some(m) => {
                        let end = start + m.end();
                        matched(end, ParseResults::from_token(Token::str(&text[start..end])))
                    }
                    None => Err(self.fail(start, expected)),
                }
            }
            Node::Seq { children, commit } => self.eval_seq(children, *commit, pos),
            Node::Choice(alternatives) => self.eval_choice(alternatives, pos),
            Node::Opt { child, default } => match self.eval(*child, pos) {
                Err(Halt::Fail(fail)) if !fail.fatal => {
                    let results = default.clone().map(ParseResults::from_token).unwrap_or_default();
                    matched(pos, results)
                }
                other => other,
            },
            Node::Repeat { child, min, max, what } => self.eval_repeat(*child, *min, *max, what, pos),
            Node::Delimited { item, delim, spec, what } => {
                self.eval_delimited(*item, *delim, spec, what, pos)
            }
            Node::Lookahead { child, negate: false, .. } => {
                self.eval(*child, pos)?;
                nothing(pos)
            }
            Node::Lookahead { child, negate: true, expected } => {
                let saved = self.furthest.clone();
                let outcome = self.eval(*child, pos);
                self.furthest = saved;
                match outcome {
                    Ok(_) => Err(self.fail(pos, expected)),
                    Err(Halt::Fail(fail)) if !fail.fatal => nothing(pos),
                    Err(halt) => Err(halt),
                }
            }
            Node::Suppress(child) => {
                let success = self.eval(*child, pos)?;
                nothing(success.end)
            }
            Node::Group(child) => {
                let success = self.eval(*child, pos)?;
                matched(success.end, ParseResults::from_token(Token::Group(success.results)))
            }
            Node::Combine { child, joiner, skip } => {
                let start = skip_whitespace(skip, text, pos);
                let success = self.eval(*child, start)?;
                let joined = success.results.joined(joiner);
                matched(success.end, ParseResults::from_token(Token::str(joined)))
            }
            Node::Call(rule) => self.eval(grammar.rule_body(*rule), pos),
            Node::Named { child, name, accumulate } => {
                let mut success = self.eval(*child, pos)?;
                success.results.set_name(name, *accumulate);
                Ok(success)
            }
            Node::Action { child, actions, skip } => {
                let Success { end, mut results } = self.eval(*child, pos)?;
                let start = skip_whitespace(skip, text, pos).min(end);
                for action in actions {
                    let ctx = ActionContext::new(text, start, end);
                    match action.apply(&ctx, &results) {
                        (ActionOutcome::Keep, _) => {}
                        (ActionOutcome::Replace(replacement), _) => results = replacement,
                        (ActionOutcome::Reject(message), fatal) => {
                            let fail = Fail {
                                offset: start,
                                message: message.into(),
                                fatal,
                            };
                            self.record(&fail);
                            return Err(Halt::Fail(fail));
                        }
                    }
                }
                matched(end, results)
            }
            Node::Labeled { child, skip, expected } => match self.eval(*child, pos) {
                Err(Halt::Fail(fail)) if !fail.fatal && fail.offset <= skip_whitespace(skip, text, pos) => {
                    Err(Halt::Fail(Fail::new(fail.offset, expected)))
                }
                other => other,
            },
        }
    }

    fn eval_seq(&mut self, children: &[NodeId], commit: Option<usize>, pos: usize) -> Outcome {
        let mut results = ParseResults::new();
        let mut at = pos;
        for (i, &child) in children.iter().enumerate() {
            match self.eval(child, at) {
                Ok(success) => {
                    at = success.end;
                    results.extend(success.results);
                }
                Err(Halt::Fail(fail)) if commit.is_some_and(|c| i >= c) => {
                    return Err(Halt::Fail(fail.fatal()));
                }
                Err(halt) => return Err(halt),
            }
        }
        matched(at, results)
    }

    fn eval_choice(&mut self, alternatives: &[NodeId], pos: usize) -> Outcome {
        let mut best: Option<Fail> = None;
        for &alternative in alternatives {
            match self.eval(alternative, pos) {
                Ok(success) => return Ok(success),
                Err(Halt::Fail(fail)) if !fail.fatal => {
                    if best.as_ref().map_or(true, |b| fail.offset > b.offset) {
                        best = Some(fail);
                    }
                }
                Err(halt) => return Err(halt),
            }
        }
        let fail = best.unwrap_or_else(|| Fail::new(pos, &Arc::from("Expected one of no alternatives")));
        Err(Halt::Fail(fail))
    }

    fn eval_repeat(
        &mut self,
        child: NodeId,
        min: usize,
        max: Option<usize>,
        what: &Arc<str>,
        pos: usize,
    ) -> Outcome {
        let mut results = ParseResults::new();
        let mut at = pos;
        let mut count = 0;
        while max.map_or(true, |max| count < max) {
            match self.eval(child, at) {
                Ok(success) => {
                    let progressed = success.end != at;
                    if !progressed && max.is_none() {
                        return Err(zero_width(what, at));
                    }
                    at = success.end;
                    results.extend(success.results);
                    count += 1;
                    if !progressed && count >= min {
                        break;
                    }
                }
                Err(Halt::Fail(fail)) if !fail.fatal => {
                    if count < min {
                        return Err(Halt::Fail(fail));
                    }
                    break;
                }
                Err(halt) => return Err(halt),
            }
        }
        matched(at, results)
    }

    fn eval_delimited(
        &mut self,
        item: NodeId,
        delim: NodeId,
        spec: &crate::grammar::expr::DelimitedSpec,
        what: &Arc<str>,
        pos: usize,
    ) -> Outcome {
        let first = match self.eval(item, pos) {
            Ok(success) => success,
            Err(Halt::Fail(fail)) if !fail.fatal && spec.min == 0 => return nothing(pos),
            Err(halt) => return Err(halt),
        };
        let mut at = first.end;
        let mut results = first.results;
        let mut count = 1;
        let mut stopped_by: Option<Fail> = None;

        loop {
            let separator = match self.eval(delim, at) {
                Ok(success) => success,
                Err(Halt::Fail(fail)) if !fail.fatal => {
                    stopped_by = Some(fail);
                    break;
                }
                Err(halt) => return Err(halt),
            };
            let next = if spec.max.map_or(true, |max| count < max) {
                match self.eval(item, separator.end) {
                    Ok(success) => Some(success),
                    Err(Halt::Fail(fail)) if !fail.fatal => {
                        stopped_by = Some(fail);
                        None
                    }
                    Err(halt) => return Err(halt),
                }
            } else {
                None
            };

            let Some(next) = next else {
                if spec.allow_trailing {
                    if spec.keep_delimiters {
                        results.extend(separator.results);
                    }
                    at = separator.end;
                }
                break;
            };
            if next.end == at {
                if spec.max.is_none() {
                    return Err(zero_width(what, at));
                }
                break;
            }
            if spec.keep_delimiters {
                results.extend(separator.results);
            }
            results.extend(next.results);
            at = next.end;
            count += 1;
        }

        if count < spec.min {
            let fail = stopped_by.unwrap_or_else(|| Fail::new(at, &Arc::from(format!("Expected {what}"))));
            return Err(Halt::Fail(fail));
        }
        matched(at, results)
    }
}

pub(crate) fn end_of_text() -> Arc<str> {
    Arc::from("Expected end of text")
}

fn zero_width(what: &Arc<str>, offset: usize) -> Halt {
    Halt::Error(ParseError::Grammar(GrammarError::ZeroWidthIteration {
        expr: what.to_string(),
        offset,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::expr::Expr;
    use crate::peg::config::ParserConfig;
    use crate::text::CharSet;

    fn run(grammar: &Grammar, text: &str) -> (Result<usize, Fail>, Option<Fail>) {
        let mut cache = PackratCache::new(grammar.config.max_memo_size);
        let mut metrics = ParseMetrics::default();
        let mut evaluator = Evaluator::new(grammar, text, &mut cache, &mut metrics);
        let entry = grammar.entry.expect("entry point");
        let outcome = match evaluator.eval(entry, 0) {
            Ok(success) => Ok(success.end),
            Err(Halt::Fail(fail)) => Err(fail),
            Err(Halt::Error(err)) => panic!("unexpected error: {err}"),
        };
        (outcome, evaluator.furthest().cloned())
    }

    #[test]
    fn test_sequence_failure_is_recorded_furthest() {
        let grammar = Grammar::from_expr(Expr::literal("x") + "y" + "z").expect("builds");
        let (outcome, furthest) = run(&grammar, "xy");
        let fail = outcome.unwrap_err();
        assert_eq!(fail.offset, 2);
        assert_eq!(&*fail.message, r#"Expected "z""#);
        assert_eq!(furthest.map(|f| f.offset), Some(2));
    }

    #[test]
    fn test_choice_reports_furthest_alternative() {
        let grammar = Grammar::from_expr((Expr::literal("a") + "b") | (Expr::literal("a") + "b" + "c"))
            .expect("builds");
        let outcome = run(&grammar, "ax").0;
        let fail = outcome.unwrap_err();
        assert_eq!(fail.offset, 1);
        assert_eq!(&*fail.message, r#"Expected "b""#);
    }

    #[test]
    fn test_choice_tie_goes_to_first_alternative() {
        let grammar =
            Grammar::from_expr((Expr::literal("a") + "b") | (Expr::literal("a") + "c")).expect("builds");
        let (outcome, furthest) = run(&grammar, "ax");
        let fail = outcome.unwrap_err();
        assert_eq!(fail.offset, 1);
        assert_eq!(&*fail.message, r#"Expected "b""#);
        assert_eq!(furthest.map(|f| f.message), Some(Arc::from(r#"Expected "b""#)));
    }

    #[test]
    fn test_commit_point_blocks_backtracking() {
        let grammar =
            Grammar::from_expr((Expr::keyword("let") - Expr::word_of(CharSet::alphas())) | Expr::keyword("let"))
                .expect("builds");
        let fail = run(&grammar, "let 1").0.unwrap_err();
        assert!(fail.fatal);
        assert_eq!(fail.offset, 4);
    }

    #[test]
    fn test_negative_lookahead_hides_inner_failures() {
        let grammar =
            Grammar::from_expr((Expr::literal("ab") + "c").not_followed_by() + Expr::word_of(CharSet::alphas()))
                .expect("builds");
        let (outcome, furthest) = run(&grammar, "abd");
        assert_eq!(outcome, Ok(3));
        assert!(furthest.is_none());
    }

    #[test]
    fn test_cache_replays_furthest_failure() {
        let pair = Expr::literal("a") + "b";
        let expr = (pair.clone() + "!") | (pair + "?");
        let cached = Grammar::from_expr(expr.clone()).expect("builds");
        let uncached = Grammar::builder()
            .entry(expr)
            .config(ParserConfig::without_packrat())
            .build()
            .expect("builds");
        let (with_cache, furthest_cached) = run(&cached, "ab;");
        let (without_cache, furthest_uncached) = run(&uncached, "ab;");
        assert_eq!(with_cache, without_cache);
        assert_eq!(furthest_cached, furthest_uncached);
        assert_eq!(furthest_cached.map(|f| f.offset), Some(2));
    }

    #[test]
    fn test_recursion_limit() {
        let grammar = Grammar::builder()
            .rule("nest", (Expr::literal("(") + Expr::rule("nest") + ")") | "x")
            .entry_point("nest")
            .config(ParserConfig {
                max_depth: 20,
                ..ParserConfig::default()
            })
            .build()
            .expect("builds");
        let mut cache = PackratCache::new(1000);
        let mut metrics = ParseMetrics::default();
        let mut evaluator = Evaluator::new(&grammar, "((((((((((((((((((((x))))))))))))))))))))", &mut cache, &mut metrics);
        let entry = grammar.entry.expect("entry point");
        assert!(matches!(
            evaluator.eval(entry, 0),
            Err(Halt::Error(ParseError::RecursionLimit { limit: 20, .. }))
        ));
    }
}
