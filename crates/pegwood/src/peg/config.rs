use crate::text::CharSet;

/// Which nodes the packrat cache memoizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum MemoScope {
    /// Every node at every offset
    #[default]
    All,
    /// Rule references and action nodes only
    ///
    /// Action nodes are always memoized so an action fires once per
    /// position and session.
    Rules,
}

/// Configuration options for parsing
///
/// Packrat parsing caches every `(node, offset)` outcome, which keeps
/// backtracking grammars linear. This struct lets you tune or disable it.
///
/// # Example
///
/// ```rust
/// use pegwood::{MemoScope, ParserConfig};
///
/// let config = ParserConfig {
///     memo_scope: MemoScope::Rules,
///     max_depth: 200,
///     ..ParserConfig::default()
/// };
/// assert!(config.enable_packrat);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct ParserConfig {
    /// Enable memoization (packrat parsing)
    pub enable_packrat: bool,

    /// Which nodes are memoized
    pub memo_scope: MemoScope,

    /// Maximum number of cache entries before the table is cleared
    pub max_memo_size: usize,

    /// Maximum evaluation depth before a parse gives up with
    /// [`ParseError::RecursionLimit`](crate::ParseError::RecursionLimit)
    pub max_depth: usize,

    /// Whitespace skipped before each terminal, unless an expression overrides it
    ///
    /// Snapshotted into the grammar when it is built.
    #[cfg_attr(feature = "serialize", serde(skip))]
    pub whitespace: CharSet,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            enable_packrat: true,
            memo_scope: MemoScope::All,
            max_memo_size: 100_000,
            max_depth: 1000,
            whitespace: CharSet::whitespace(),
        }
    }
}

impl ParserConfig {
    /// Default configuration with packrat caching turned off
    #[must_use]
    pub fn without_packrat() -> Self {
        Self {
            enable_packrat: false,
            ..Self::default()
        }
    }

    /// Replace the default whitespace set
    #[must_use]
    pub fn with_whitespace(mut self, chars: impl Into<CharSet>) -> Self {
        self.whitespace = chars.into();
        self
    }
}
