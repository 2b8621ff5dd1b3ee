use std::fmt;

use compact_str::CompactString;
use hashbrown::HashMap;

#[cfg(feature = "diagnostics")]
use miette::Diagnostic;

use crate::grammar::analysis;
use crate::grammar::compile::Compiler;
use crate::grammar::expr::Expr;
use crate::grammar::node::{Node, NodeId, Skip};
use crate::grammar::precedence::InfixNotation;
use crate::peg::ParserConfig;

/// A compiled, immutable grammar
///
/// Build one with [`GrammarBuilder`]. A grammar holds no per-parse state, so
/// it is `Send + Sync` and can serve any number of concurrent parses. Each
/// parse owns its own [`ParseSession`](crate::ParseSession).
#[derive(Debug)]
pub struct Grammar {
    pub(crate) nodes: Vec<Node>,
    pub(crate) rule_names: Vec<CompactString>,
    pub(crate) rule_bodies: Vec<NodeId>,
    pub(crate) rules: HashMap<CompactString, usize, ahash::RandomState>,
    pub(crate) entry: Option<NodeId>,
    pub(crate) default_skip: Skip,
    pub(crate) config: ParserConfig,
}

impl Grammar {
    /// Start building a grammar
    #[must_use]
    pub fn builder() -> GrammarBuilder {
        GrammarBuilder::new()
    }

    /// Compile a self-contained expression into a grammar with default configuration
    ///
    /// # Errors
    ///
    /// Fails if the expression references rules or is otherwise invalid.
    pub fn from_expr(expr: impl Into<Expr>) -> Result<Self, GrammarError> {
        GrammarBuilder::new().entry(expr).build()
    }

    /// The configuration this grammar was built with
    #[must_use]
    pub const fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Names of all rules, in binding order
    pub fn rule_names(&self) -> impl Iterator<Item = &str> {
        self.rule_names.iter().map(CompactString::as_str)
    }

    /// True when a rule called `name` exists
    #[must_use]
    pub fn has_rule(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    /// Number of compiled nodes
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub(crate) fn rule_body(&self, rule: usize) -> NodeId {
        self.rule_bodies[rule]
    }
}

enum EntryPoint {
    Rule(CompactString),
    Expr(Expr),
}

/// Builder for [`Grammar`]
///
/// Rules are the late-bound references of a grammar: [`Expr::rule`] names a
/// rule, and [`GrammarBuilder::rule`] binds it, exactly once. All references
/// are resolved and checked by [`GrammarBuilder::build`].
///
/// # Example
///
/// ```rust
/// use pegwood::{Expr, GrammarBuilder};
///
/// // list := "(" item* ")" ; item := word | list
/// let grammar = GrammarBuilder::new()
///     .rule("list", Expr::literal("(").suppress() + Expr::rule("item").zero_or_more().group() + Expr::literal(")").suppress())
///     .rule("item", Expr::word_of(pegwood::CharSet::alphas()) | Expr::rule("list"))
///     .entry_point("list")
///     .build()
///     .unwrap();
/// let results = grammar.parse("(a (b c) d)", true).unwrap();
/// assert_eq!(results.to_string(), "[['a', ['b', 'c'], 'd']]");
/// ```
pub struct GrammarBuilder {
    rules: Vec<(CompactString, Expr)>,
    entry: Option<EntryPoint>,
    config: ParserConfig,
}

impl Default for GrammarBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GrammarBuilder {
    /// Create a new builder with the default configuration
    #[must_use]
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            entry: None,
            config: ParserConfig::default(),
        }
    }

    /// Bind rule `name` to `body`
    #[must_use]
    pub fn rule(mut self, name: &str, body: impl Into<Expr>) -> Self {
        self.rules.push((name.into(), body.into()));
        self
    }

    /// Bind rule `name` to an operator-precedence table
    ///
    /// Also binds the helper rules `"{name}.atom"` and `"{name}.level{i}"`.
    #[must_use]
    pub fn infix_notation(mut self, name: &str, notation: InfixNotation) -> Self {
        self.rules.extend(notation.into_rules(name));
        self
    }

    /// Parse from rule `name` by default
    #[must_use]
    pub fn entry_point(mut self, name: &str) -> Self {
        self.entry = Some(EntryPoint::Rule(name.into()));
        self
    }

    /// Parse from `expr` by default
    #[must_use]
    pub fn entry(mut self, expr: impl Into<Expr>) -> Self {
        self.entry = Some(EntryPoint::Expr(expr.into()));
        self
    }

    /// Use `config` instead of the default configuration
    #[must_use]
    pub fn config(mut self, config: ParserConfig) -> Self {
        self.config = config;
        self
    }

    /// Resolve, validate and compile the grammar
    ///
    /// A grammar without an entry point can still be parsed rule by rule
    /// with [`Grammar::parse_rule`]; it only needs at least one rule.
    ///
    /// # Errors
    ///
    /// Returns an error if a rule is bound twice or referenced but never
    /// bound, if a rule is left-recursive, if an unbounded repetition can
    /// match empty input, or if a terminal is malformed.
    pub fn build(self) -> Result<Grammar, GrammarError> {
        if self.entry.is_none() && self.rules.is_empty() {
            return Err(GrammarError::MissingEntryPoint);
        }

        let mut rules: HashMap<CompactString, usize, ahash::RandomState> = HashMap::default();
        let mut rule_names = Vec::with_capacity(self.rules.len());
        for (name, _) in &self.rules {
            if rules.insert(name.clone(), rule_names.len()).is_some() {
                return Err(GrammarError::DuplicateRule(name.to_string()));
            }
            rule_names.push(name.clone());
        }

        let mut compiler = Compiler::new(&rules, &rule_names, &self.config);
        let mut rule_bodies = Vec::with_capacity(self.rules.len());
        for (_, body) in &self.rules {
            rule_bodies.push(compiler.compile_root(body)?);
        }
        let entry = match &self.entry {
            Some(EntryPoint::Rule(name)) => Some(compiler.call(name)?),
            Some(EntryPoint::Expr(expr)) => Some(compiler.compile_root(expr)?),
            None => None,
        };
        let (nodes, default_skip) = compiler.finish();

        let grammar = Grammar {
            nodes,
            rule_names,
            rule_bodies,
            rules,
            entry,
            default_skip,
            config: self.config,
        };
        analysis::validate(&grammar)?;

        log::debug!(
            "built grammar: {} rules, {} nodes",
            grammar.rule_names.len(),
            grammar.nodes.len()
        );
        Ok(grammar)
    }
}

impl fmt::Debug for GrammarBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrammarBuilder")
            .field("rules", &self.rules.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// A problem with the grammar itself, as opposed to the input
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum GrammarError {
    #[error("Missing entry point")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(pegwood::grammar::missing_entry_point)))]
    MissingEntryPoint,

    #[error("Undefined rule: {name}{}", .suggestion.as_ref().map(|s| format!(" (did you mean `{s}`?)")).unwrap_or_default())]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(pegwood::grammar::undefined_rule)))]
    UndefinedRule {
        name: String,
        suggestion: Option<String>,
    },

    #[error("Rule bound more than once: {0}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(pegwood::grammar::duplicate_rule)))]
    DuplicateRule(String),

    #[error("Left recursion detected: {}", format_cycles(.0))]
    #[cfg_attr(
        feature = "diagnostics",
        diagnostic(
            code(pegwood::grammar::left_recursion),
            help("rewrite the rule as a repetition, or use an InfixNotation table")
        )
    )]
    LeftRecursion(Vec<Vec<String>>),

    #[error("Repetition of an expression that can match empty input: {0}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(pegwood::grammar::nullable_repetition)))]
    NullableRepetition(String),

    #[error("Repetition made no progress at char {offset}: {expr}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(pegwood::grammar::zero_width_iteration)))]
    ZeroWidthIteration { expr: String, offset: usize },

    #[error("Invalid regex {pattern:?}: {message}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(pegwood::grammar::invalid_regex)))]
    InvalidRegex { pattern: String, message: String },

    #[error("Invalid {what}: {reason}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(pegwood::grammar::invalid_terminal)))]
    InvalidTerminal { what: String, reason: String },
}

fn format_cycles(cycles: &[Vec<String>]) -> String {
    cycles
        .iter()
        .map(|cycle| cycle.join(" -> "))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::CharSet;

    #[test]
    fn test_missing_entry_point() {
        assert_eq!(GrammarBuilder::new().build().err(), Some(GrammarError::MissingEntryPoint));
    }

    #[test]
    fn test_duplicate_rule() {
        let result = GrammarBuilder::new()
            .rule("a", "x")
            .rule("a", "y")
            .entry_point("a")
            .build();
        assert_eq!(result.err(), Some(GrammarError::DuplicateRule("a".into())));
    }

    #[test]
    fn test_undefined_rule_suggests_name() {
        let result = GrammarBuilder::new()
            .rule("operand", Expr::integer())
            .rule("sum", Expr::rule("operant") + "+" + Expr::rule("operand"))
            .entry_point("sum")
            .build();
        let Err(GrammarError::UndefinedRule { name, suggestion }) = result else {
            panic!("expected UndefinedRule, got {result:?}");
        };
        assert_eq!(name, "operant");
        assert_eq!(suggestion.as_deref(), Some("operand"));
    }

    #[test]
    fn test_undefined_entry_point() {
        let result = GrammarBuilder::new().rule("a", "x").entry_point("b").build();
        assert!(matches!(result, Err(GrammarError::UndefinedRule { .. })));
    }

    #[test]
    fn test_rule_lookup() {
        let grammar = GrammarBuilder::new()
            .rule("word", Expr::word_of(CharSet::alphas()))
            .rule("pair", Expr::rule("word") + "=" + Expr::rule("word"))
            .entry_point("pair")
            .build()
            .expect("grammar should build");
        assert!(grammar.has_rule("word"));
        assert!(!grammar.has_rule("missing"));
        assert_eq!(grammar.rule_names().collect::<Vec<_>>(), ["word", "pair"]);
    }

    #[test]
    fn test_shared_expression_compiles_once() {
        let word = Expr::word_of(CharSet::alphas());
        let shared = Grammar::from_expr(word.clone() + "=" + word.clone()).expect("builds");
        let distinct =
            Grammar::from_expr(Expr::word_of(CharSet::alphas()) + "=" + Expr::word_of(CharSet::alphas()))
                .expect("builds");
        assert_eq!(shared.node_count() + 1, distinct.node_count());
    }

    #[test]
    fn test_grammar_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Grammar>();
    }
}
