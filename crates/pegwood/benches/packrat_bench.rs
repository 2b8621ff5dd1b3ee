//! Packrat benchmarks
//!
//! Compares memoized and plain backtracking parses of a precedence grammar,
//! where every failed operator attempt re-parses the operand below it.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pegwood::{
    Associativity, CharSet, Expr, Grammar, GrammarBuilder, InfixNotation, MemoScope, OperatorLevel, ParserConfig,
};

fn setup_grammar(config: ParserConfig) -> Grammar {
    GrammarBuilder::new()
        .infix_notation(
            "expr",
            InfixNotation::new(Expr::number() | Expr::word_of(CharSet::alphas()))
                .level(OperatorLevel::prefix("-"))
                .level(OperatorLevel::infix("^", Associativity::Right))
                .level(OperatorLevel::infix(Expr::one_of("* / %"), Associativity::Left))
                .level(OperatorLevel::infix(Expr::one_of("+ -"), Associativity::Left))
                .level(OperatorLevel::infix(Expr::one_of("< <= > >= == !="), Associativity::None)),
        )
        .entry_point("expr")
        .config(config)
        .build()
        .expect("benchmark grammar")
}

fn nested_input(depth: usize) -> String {
    let mut text = String::from("x");
    for i in 0..depth {
        text = format!("({text} + {i}) * -y ^ 2");
    }
    text
}

fn bench_packrat_vs_backtracking(c: &mut Criterion) {
    let configs = [
        ("packrat", ParserConfig::default()),
        (
            "rules_only",
            ParserConfig {
                memo_scope: MemoScope::Rules,
                ..ParserConfig::default()
            },
        ),
        ("backtracking", ParserConfig::without_packrat()),
    ];

    let mut group = c.benchmark_group("nested_parens");
    for depth in [2, 4, 6] {
        let input = nested_input(depth);
        for (name, config) in &configs {
            let grammar = setup_grammar(config.clone());
            group.bench_with_input(BenchmarkId::new(*name, depth), &input, |b, input| {
                b.iter(|| black_box(grammar.parse(black_box(input), true)));
            });
        }
    }
    group.finish();
}

fn bench_flat_list(c: &mut Criterion) {
    let grammar = setup_grammar(ParserConfig::default());
    let input = (0..500).map(|i| i.to_string()).collect::<Vec<_>>().join(" + ");

    c.bench_function("flat_sum_500", |b| {
        b.iter(|| black_box(grammar.parse(black_box(&input), true)));
    });
}

fn bench_grammar_build(c: &mut Criterion) {
    c.bench_function("grammar_build", |b| {
        b.iter(|| black_box(setup_grammar(ParserConfig::default())));
    });
}

criterion_group!(benches, bench_packrat_vs_backtracking, bench_flat_list, bench_grammar_build);
criterion_main!(benches);
