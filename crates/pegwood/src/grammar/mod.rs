//! # Grammar Module
//!
//! Grammar definition, compilation and validation.
//!
//! ## Overview
//!
//! - **Expressions**: [`Expr`] values composed with `+`, `-` and `|`
//! - **Terminals**: literals, keywords, words, quoted strings, numbers, regexes
//! - **Actions**: [`ParseAction`] transforms and conditions on matches
//! - **Precedence tables**: [`InfixNotation`] expands into layered rules
//! - **Building**: [`GrammarBuilder`] binds rules, compiles and validates
//!
//! ## Usage
//!
//! ```rust
//! use pegwood::{CharSet, Expr, GrammarBuilder};
//!
//! let key = Expr::word_of(CharSet::alphas()).named("key");
//! let value = Expr::integer().named("value");
//! let grammar = GrammarBuilder::new()
//!     .entry(key + Expr::literal("=").suppress() + value)
//!     .build()
//!     .unwrap();
//!
//! let results = grammar.parse("width = 80", true).unwrap();
//! assert_eq!(results.get("key").unwrap().to_string(), "'width'");
//! assert_eq!(results.get("value").unwrap().as_int(), Some(80));
//! ```

pub mod action;
pub(crate) mod analysis;
pub mod builder;
pub(crate) mod compile;
pub mod expr;
pub(crate) mod node;
pub mod precedence;
pub mod terminal;

pub use action::{to_int, ActionContext, ActionOutcome, ParseAction};
pub use builder::{Grammar, GrammarBuilder, GrammarError};
pub use expr::{DelimitedSpec, Expr};
pub use precedence::{Associativity, Fixity, InfixNotation, OperatorLevel};
pub use terminal::{NumberKind, QuotedSpec, WordSpec};
