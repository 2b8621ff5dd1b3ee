#![no_main]
use std::sync::OnceLock;

use libfuzzer_sys::fuzz_target;
use pegwood::{
    Associativity, CharSet, DelimitedSpec, Expr, Grammar, GrammarBuilder, InfixNotation, OperatorLevel, ParseError,
    ParserConfig,
};

fn grammar(config: ParserConfig) -> Grammar {
    let value = Expr::number()
        | Expr::dbl_quoted_string()
        | Expr::word_chars(CharSet::alphas(), CharSet::alphanums())
        | (Expr::literal("[").suppress()
            + Expr::rule("expr").delimited_with(",", DelimitedSpec::new().min(0).allow_trailing())
            + Expr::literal("]").suppress())
        .group();
    GrammarBuilder::new()
        .infix_notation(
            "expr",
            InfixNotation::new(value)
                .level(OperatorLevel::prefix(Expr::one_of("- !")))
                .level(OperatorLevel::infix(Expr::one_of("* /"), Associativity::Left))
                .level(OperatorLevel::infix(Expr::one_of("+ -"), Associativity::Left)),
        )
        .entry_point("expr")
        .config(config)
        .build()
        .expect("fuzz grammar")
}

static CACHED: OnceLock<Grammar> = OnceLock::new();
static UNCACHED: OnceLock<Grammar> = OnceLock::new();

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let cached = CACHED.get_or_init(|| grammar(ParserConfig::default()));
    let uncached = UNCACHED.get_or_init(|| grammar(ParserConfig::without_packrat()));

    let a = cached.parse(text, true);
    let b = uncached.parse(text, true);
    match (&a, &b) {
        (Ok(x), Ok(y)) => assert_eq!(x, y),
        (Err(ParseError::Syntax(x)), Err(ParseError::Syntax(y))) => {
            assert_eq!(x.offset(), y.offset());
            assert!(x.offset() <= text.len());
        }
        (Err(ParseError::RecursionLimit { .. }), _) | (_, Err(ParseError::RecursionLimit { .. })) => {}
        _ => panic!("cached and uncached parses disagree: {a:?} vs {b:?}"),
    }
});
