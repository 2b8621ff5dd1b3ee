//! # Pegwood
//!
//! Composable parsing expressions with packrat memoization.
//!
//! ## Overview
//!
//! Pegwood builds recursive-descent parsers out of small pieces:
//!
//! - **Primitives**: literals, keywords, character-class words, quoted
//!   strings, numbers, regexes
//! - **Combinators**: sequence (`+`), commit sequence (`-`), ordered choice
//!   (`|`), optional, repetition, delimited lists, lookahead
//! - **Named results**: [`ParseResults`] keeps the token list plus named views
//! - **Parse actions**: transform or reject matches as they are made
//! - **Operator precedence**: [`InfixNotation`] turns a precedence table into rules
//! - **Packrat caching**: every `(node, offset)` outcome is memoized per session
//! - **Diagnostics**: failures report the furthest offset reached, with line
//!   and column
//!
//! ## Quick Start
//!
//! ```rust
//! use pegwood::{CharSet, Expr, GrammarBuilder};
//!
//! // greeting := word "," word "!"
//! let word = Expr::word_of(CharSet::alphas());
//! let grammar = GrammarBuilder::new()
//!     .entry(word.clone().named("salutation") + "," + word.named("name") + "!")
//!     .build()
//!     .expect("grammar is valid");
//!
//! let results = grammar.parse("Hello, World!", true).unwrap();
//! assert_eq!(results.to_string(), "['Hello', ',', 'World', '!']");
//! assert_eq!(results.get("name").unwrap().as_str(), Some("World"));
//!
//! let err = grammar.parse("Hello World!", true).unwrap_err();
//! assert_eq!(
//!     err.to_string(),
//!     "Expected \",\", found \"World!\" (at char 6), (line:1, col:7)"
//! );
//! ```
//!
//! ## Recursion
//!
//! Expressions are immutable trees, so recursive grammars go through named
//! rules: [`Expr::rule`] refers to a rule, [`GrammarBuilder::rule`] binds it.
//! Building the grammar resolves every reference and rejects left recursion.
//!
//! ## Feature Flags
//!
//! - `diagnostics`: derive `miette::Diagnostic` on error types
//! - `serialize`: derive `serde::Serialize` on [`Value`] and [`ParserConfig`]

pub mod error;
pub mod grammar;
pub mod peg;
pub mod results;
pub mod testing;
pub mod text;

// Re-export commonly used types
pub use error::{ParseError, ParseFailure, ParseResult};
pub use grammar::{
    to_int, ActionContext, ActionOutcome, Associativity, DelimitedSpec, Expr, Fixity, Grammar,
    GrammarBuilder, GrammarError, InfixNotation, NumberKind, OperatorLevel, ParseAction,
    QuotedSpec, WordSpec,
};
pub use peg::{MemoScope, ParseMetrics, ParseSession, ParserConfig, ScanMatch};
pub use results::{ParseResults, Token, Value};
pub use testing::{run_tests, RunTestsOptions, TestCase, TestRun};
pub use text::{CharSet, LineCol, LineIndex};

/// Parse `text` with a self-contained expression
///
/// Convenience for one-off parses. Grammars with rules, or expressions parsed
/// more than once, should be built with [`GrammarBuilder`] and reused.
///
/// # Errors
///
/// [`ParseError::Grammar`] if the expression does not compile (for example
/// it references a rule), otherwise as [`Grammar::parse`].
///
/// ```rust
/// use pegwood::Expr;
///
/// let digits = Expr::integer().one_or_more();
/// let results = pegwood::parse(&digits, "1 2 3", true).unwrap();
/// assert_eq!(results.len(), 3);
/// ```
pub fn parse(expr: &Expr, text: &str, parse_all: bool) -> Result<ParseResults, ParseError> {
    Grammar::from_expr(expr.clone())?.parse(text, parse_all)
}
