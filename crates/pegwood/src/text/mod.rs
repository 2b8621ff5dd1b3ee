//! Source text helpers: character classes and line/column positions.

pub mod charset;
pub mod line_col;

pub use charset::CharSet;
pub use line_col::{line_col, LineCol, LineIndex};
