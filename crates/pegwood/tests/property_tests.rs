//! Property-based tests
//!
//! Laws that should hold for any input: literals match exactly their own
//! text, repetitions and delimited lists count what they consume, and
//! caching never changes an outcome.

#![cfg(test)]

use proptest::prelude::*;

use pegwood::{CharSet, DelimitedSpec, Expr, Grammar, GrammarBuilder, ParserConfig};

fn ident() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,7}"
}

proptest! {
    /// A literal matches its own text, with any leading whitespace
    #[test]
    fn test_literal_matches_itself(text in "[a-zA-Z0-9+*/=!]{1,12}", pad in " {0,3}") {
        let grammar = Grammar::from_expr(Expr::literal(&text)).unwrap();
        let results = grammar.parse(&format!("{pad}{text}"), true).unwrap();
        prop_assert_eq!(results.len(), 1);
        prop_assert_eq!(results[0].as_str(), Some(text.as_str()));
    }

    /// A strict prefix of a literal never matches, and fails at its start
    #[test]
    fn test_literal_rejects_prefix(text in "[a-z]{2,12}", cut in 1usize..12) {
        let cut = cut.min(text.len() - 1);
        let grammar = Grammar::from_expr(Expr::literal(&text)).unwrap();
        let err = grammar.parse(&text[..cut], true).unwrap_err();
        prop_assert_eq!(err.as_failure().map(|f| f.offset()), Some(0));
    }

    /// `one_or_more` yields one token per whitespace-separated word
    #[test]
    fn test_repetition_length(words in prop::collection::vec(ident(), 1..20)) {
        let grammar = Grammar::from_expr(Expr::word_of(CharSet::alphanums()).one_or_more()).unwrap();
        let results = grammar.parse(&words.join(" "), true).unwrap();
        prop_assert_eq!(results.len(), words.len());
        prop_assert_eq!(results.joined(" "), words.join(" "));
    }

    /// A bounded repetition never takes more than its maximum
    #[test]
    fn test_bounded_repetition(count in 0usize..10, max in 1usize..6) {
        let text = vec!["7"; count].join(" ");
        let grammar = Grammar::from_expr(Expr::integer().repeat(0, Some(max))).unwrap();
        let results = grammar.parse(&text, false).unwrap();
        prop_assert_eq!(results.len(), count.min(max));
    }

    /// Delimited lists drop their delimiters and keep every item
    #[test]
    fn test_delimited_length(items in prop::collection::vec(0i64..10_000, 1..20), spaced in any::<bool>()) {
        let sep = if spaced { ", " } else { "," };
        let text = items.iter().map(ToString::to_string).collect::<Vec<_>>().join(sep);
        let grammar = Grammar::from_expr(Expr::integer().delimited(",")).unwrap();
        let results = grammar.parse(&text, true).unwrap();
        let parsed: Vec<i64> = results.iter().filter_map(|t| t.as_int()).collect();
        prop_assert_eq!(parsed, items);
    }

    /// Kept delimiters interleave with items
    #[test]
    fn test_delimited_keeps_delimiters(items in prop::collection::vec(ident(), 1..10)) {
        let spec = DelimitedSpec::new().keep_delimiters();
        let grammar = Grammar::from_expr(Expr::word_of(CharSet::alphanums()).delimited_with(";", spec)).unwrap();
        let results = grammar.parse(&items.join(";"), true).unwrap();
        prop_assert_eq!(results.len(), items.len() * 2 - 1);
    }

    /// Parsing twice in one session gives the same outcome, cached or not
    #[test]
    fn test_parse_idempotent(text in "[a-z0-9(), ]{0,24}") {
        let build = |config: ParserConfig| {
            GrammarBuilder::new()
                .rule(
                    "item",
                    Expr::word_of(CharSet::alphanums())
                        | (Expr::literal("(").suppress() + Expr::rule("list") + Expr::literal(")").suppress()).group(),
                )
                .rule(
                    "list",
                    Expr::rule("item").delimited_with(",", DelimitedSpec::new().min(0).allow_trailing()),
                )
                .entry_point("list")
                .config(config)
                .build()
                .unwrap()
        };
        let cached = build(ParserConfig::default());
        let uncached = build(ParserConfig::without_packrat());

        let mut session = cached.session(&text);
        let first = session.parse(true).map_err(|e| e.to_string());
        let second = session.parse(true).map_err(|e| e.to_string());
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first, uncached.parse(&text, true).map_err(|e| e.to_string()));
    }
}
