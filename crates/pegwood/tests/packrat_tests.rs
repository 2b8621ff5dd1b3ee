//! Packrat cache tests
//!
//! Memoization must never change what a parse returns. These tests compare
//! cached and uncached parses and check the cache bookkeeping.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use pegwood::{
    Associativity, CharSet, Expr, Grammar, GrammarBuilder, InfixNotation, MemoScope, OperatorLevel, ParseError,
    ParserConfig,
};

fn arithmetic(config: ParserConfig) -> Grammar {
    GrammarBuilder::new()
        .infix_notation(
            "arith",
            InfixNotation::new(Expr::integer() | Expr::word_of(CharSet::alphas()))
                .level(OperatorLevel::infix(Expr::one_of("* /"), Associativity::Left))
                .level(OperatorLevel::infix(Expr::one_of("+ -"), Associativity::Left)),
        )
        .entry_point("arith")
        .config(config)
        .build()
        .expect("arithmetic grammar")
}

const INPUTS: &[&str] = &["1", "a*b+c", "(1+2)*(3-4)/x", "((((5))))", "1+", "2*(3", "x y"];

/// Test that packrat parsing gives the same outcome as plain backtracking
#[test]
fn test_cache_does_not_change_results() {
    let cached = arithmetic(ParserConfig::default());
    let uncached = arithmetic(ParserConfig::without_packrat());
    let rules_only = arithmetic(ParserConfig {
        memo_scope: MemoScope::Rules,
        ..ParserConfig::default()
    });

    for input in INPUTS {
        let expected = uncached.parse(input, true);
        for grammar in [&cached, &rules_only] {
            match (&expected, grammar.parse(input, true)) {
                (Ok(a), Ok(b)) => assert_eq!(a, &b, "{input:?}"),
                (Err(a), Err(b)) => assert_eq!(a.to_string(), b.to_string(), "{input:?}"),
                (a, b) => panic!("{input:?}: {a:?} vs {b:?}"),
            }
        }
    }
}

/// Test that a second parse in one session is served from the cache
#[test]
fn test_session_reuses_cache() {
    let grammar = arithmetic(ParserConfig::default());
    let mut session = grammar.session("(1+2)*3");
    let first = session.parse(true).expect("parses");
    let misses = session.metrics().cache_misses;
    let hits = session.metrics().cache_hits;

    let second = session.parse(true).expect("parses");
    assert_eq!(first, second);
    assert_eq!(session.metrics().cache_misses, misses);
    assert!(session.metrics().cache_hits > hits);
}

/// Test that without packrat nothing is cached
#[test]
fn test_disabled_cache_records_nothing() {
    let grammar = arithmetic(ParserConfig::without_packrat());
    let mut session = grammar.session("1+2");
    session.parse(true).expect("parses");
    assert_eq!(session.metrics().cache_hits, 0);
    assert_eq!(session.metrics().cache_misses, 0);
    assert!(session.metrics().evaluations > 0);
}

fn counted_grammar(config: ParserConfig, counter: &Arc<AtomicUsize>) -> Grammar {
    let counter = Arc::clone(counter);
    let number = Expr::integer().map(move |results| {
        counter.fetch_add(1, Ordering::SeqCst);
        results.clone()
    });
    GrammarBuilder::new()
        .entry((number.clone() + "x") | (number + "y"))
        .config(config)
        .build()
        .expect("builds")
}

/// Test that an action fires once per offset when cached, on every attempt otherwise
#[test]
fn test_actions_run_once_per_position() {
    let counter = Arc::new(AtomicUsize::new(0));
    let grammar = counted_grammar(ParserConfig::default(), &counter);
    grammar.parse("5 y", true).expect("parses");
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    // rule-only scope still memoizes action nodes
    let counter = Arc::new(AtomicUsize::new(0));
    let grammar = counted_grammar(
        ParserConfig {
            memo_scope: MemoScope::Rules,
            ..ParserConfig::default()
        },
        &counter,
    );
    grammar.parse("5 y", true).expect("parses");
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    let counter = Arc::new(AtomicUsize::new(0));
    let grammar = counted_grammar(ParserConfig::without_packrat(), &counter);
    grammar.parse("5 y", true).expect("parses");
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

/// Test that a tiny cache is cleared when full and still gives correct results
#[test]
fn test_cache_eviction() {
    let grammar = arithmetic(ParserConfig {
        max_memo_size: 4,
        ..ParserConfig::default()
    });
    let mut session = grammar.session("(1+2)*(3-4)/x");
    let results = session.parse(true).expect("parses");
    assert!(session.metrics().cache_evictions > 0);

    let reference = arithmetic(ParserConfig::without_packrat());
    assert_eq!(results, reference.parse("(1+2)*(3-4)/x", true).expect("parses"));
}

/// Test that clearing a full cache does not run actions a second time
#[test]
fn test_eviction_keeps_action_results() {
    let counter = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&counter);
    let number = Expr::integer().map(move |results| {
        counted.fetch_add(1, Ordering::SeqCst);
        results.clone()
    });
    let filler = Expr::word_of("abcde").zero_or_more();
    let grammar = GrammarBuilder::new()
        .entry((number.clone() + filler.clone() + "x") | (number + filler + "y"))
        .config(ParserConfig {
            max_memo_size: 2,
            ..ParserConfig::default()
        })
        .build()
        .expect("builds");

    let mut session = grammar.session("5 a b c d e y");
    let results = session.parse(true).expect("parses");
    assert_eq!(results.len(), 7);
    assert!(session.metrics().cache_evictions > 0);
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

/// Test deep nesting against the recursion limit
#[test]
fn test_recursion_limit() {
    let grammar = arithmetic(ParserConfig {
        max_depth: 64,
        ..ParserConfig::default()
    });
    let deep = format!("{}1{}", "(".repeat(40), ")".repeat(40));
    let err = grammar.parse(&deep, true).expect_err("too deep");
    assert!(matches!(err, ParseError::RecursionLimit { limit: 64, .. }));

    let shallow = "(1)";
    assert!(grammar.matches(shallow));
}

/// Test that default settings survive deep nesting on an ordinary thread stack
#[test]
fn test_default_depth_on_default_stack() {
    let handle = thread::spawn(|| {
        let grammar = GrammarBuilder::new()
            .infix_notation(
                "arith",
                InfixNotation::new(Expr::integer())
                    .level(OperatorLevel::prefix("-"))
                    .level(OperatorLevel::infix(Expr::one_of("* /"), Associativity::Left))
                    .level(OperatorLevel::infix(Expr::one_of("+ -"), Associativity::Left)),
            )
            .entry_point("arith")
            .build()
            .expect("arithmetic grammar");
        let nested = |n: usize| format!("{}1{}", "(".repeat(n), ")".repeat(n));

        assert!(grammar.parse(&nested(10), true).is_ok());
        assert!(grammar.parse(&nested(50), true).is_ok());
        let err = grammar.parse(&nested(200), true).expect_err("too deep");
        assert!(matches!(err, ParseError::RecursionLimit { limit: 1000, .. }));
    });
    handle.join().expect("parse thread completes");
}

/// Test one grammar shared by several threads
#[test]
fn test_grammar_shared_across_threads() {
    let grammar = arithmetic(ParserConfig::default());
    let reference: Vec<String> = INPUTS
        .iter()
        .map(|input| format!("{:?}", grammar.parse(input, true).map_err(|e| e.to_string())))
        .collect();

    thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for (input, expected) in INPUTS.iter().zip(&reference) {
                    let got = format!("{:?}", grammar.parse(input, true).map_err(|e| e.to_string()));
                    assert_eq!(&got, expected);
                }
            });
        }
    });
}
