//! # Packrat Evaluation
//!
//! Parsing runs compiled grammars inside a [`ParseSession`]. Each session
//! owns the memo table for one input text. Keeping cache state out of the
//! [`Grammar`](crate::Grammar) lets one grammar serve many threads at once.
//!
//! Ordered choice commits to the first alternative that matches. Backtracking
//! just means re-evaluating from a saved offset, and the `(node, offset)`
//! memo table keeps that linear for most grammars.

mod config;
mod parser;
mod session;
mod state;

pub use config::{MemoScope, ParserConfig};
pub use session::{ParseSession, ScanMatch};
pub use state::ParseMetrics;
