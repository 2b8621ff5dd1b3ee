//! Lowering of `Expr` trees into the node arena.
//!
//! Shared sub-expressions compile once per whitespace context. Whitespace
//! overrides are resolved here and vanish from the output: every terminal
//! records the set it skips.

use std::sync::Arc;

use compact_str::CompactString;
use hashbrown::HashMap;

use crate::error::diagnostics::did_you_mean;
use crate::grammar::builder::GrammarError;
use crate::grammar::expr::{Expr, ExprNode};
use crate::grammar::node::{Node, NodeId, Skip};
use crate::peg::ParserConfig;

/// Identity of an expression in one whitespace context
type CompileKey = (usize, usize);

pub(crate) struct Compiler<'g> {
    rules: &'g HashMap<CompactString, usize, ahash::RandomState>,
    rule_names: &'g [CompactString],
    nodes: Vec<Node>,
    compiled: HashMap<CompileKey, NodeId, ahash::RandomState>,
    calls: Vec<Option<NodeId>>,
    default_skip: Skip,
}

impl<'g> Compiler<'g> {
    pub(crate) fn new(
        rules: &'g HashMap<CompactString, usize, ahash::RandomState>,
        rule_names: &'g [CompactString],
        config: &ParserConfig,
    ) -> Self {
        let default_skip =
            (!config.whitespace.is_empty()).then(|| Arc::new(config.whitespace.clone()));
        Self {
            rules,
            rule_names,
            nodes: Vec::new(),
            compiled: HashMap::default(),
            calls: vec![None; rule_names.len()],
            default_skip,
        }
    }

    /// Compile `expr` in the grammar's default whitespace context
    pub(crate) fn compile_root(&mut self, expr: &Expr) -> Result<NodeId, GrammarError> {
        let skip = self.default_skip.clone();
        self.compile(expr, &skip)
    }

    /// The one call node for rule `name`
    pub(crate) fn call(&mut self, name: &str) -> Result<NodeId, GrammarError> {
        let Some(&rule) = self.rules.get(name) else {
            let candidates: Vec<String> = self.rule_names.iter().map(ToString::to_string).collect();
            return Err(GrammarError::UndefinedRule {
                name: name.to_owned(),
                suggestion: did_you_mean(name, &candidates),
            });
        };
        if let Some(id) = self.calls[rule] {
            return Ok(id);
        }
        let id = self.push(Node::Call(rule));
        self.calls[rule] = Some(id);
        Ok(id)
    }

    pub(crate) fn finish(self) -> (Vec<Node>, Skip) {
        (self.nodes, self.default_skip)
    }

    fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn compile(&mut self, expr: &Expr, skip: &Skip) -> Result<NodeId, GrammarError> {
        let key = (expr.ptr(), skip.as_ref().map_or(0, |chars| Arc::as_ptr(chars) as usize));
        if let Some(&id) = self.compiled.get(&key) {
            return Ok(id);
        }
        let id = self.lower(expr, skip)?;
        self.compiled.insert(key, id);
        Ok(id)
    }

    fn lower(&mut self, expr: &Expr, skip: &Skip) -> Result<NodeId, GrammarError> {
        let expected = || -> Arc<str> { format!("Expected {expr}").into() };
        let skip_here = skip.clone();

        let node = match expr.node() {
            ExprNode::Empty => Node::Empty,
            ExprNode::Literal { text, .. } if text.is_empty() => Node::Empty,
            ExprNode::End => Node::End { skip: skip_here },
            ExprNode::Literal { text, caseless } => Node::Literal {
                text: text.clone(),
                caseless: *caseless,
                skip: skip_here,
                expected: expected(),
            },
            ExprNode::Keyword { text, caseless, ident_chars } => {
                if text.is_empty() {
                    return Err(invalid("keyword", "keyword text is empty"));
                }
                Node::Keyword {
                    text: text.clone(),
                    caseless: *caseless,
                    ident_chars: ident_chars.clone(),
                    skip: skip_here,
                    expected: expected(),
                }
            }
            ExprNode::Word(spec) => {
                if spec.init.is_empty() {
                    return Err(invalid("word", "no initial characters"));
                }
                if spec.min == 0 {
                    return Err(invalid("word", "minimum length must be at least 1"));
                }
                if spec.max.is_some_and(|max| max < spec.min) {
                    return Err(invalid("word", "maximum length is below the minimum"));
                }
                Node::Word {
                    spec: spec.clone(),
                    skip: skip_here,
                    expected: expected(),
                }
            }
            ExprNode::OneOf { options, caseless } => {
                if options.is_empty() {
                    return Err(invalid("one_of", "no options given"));
                }
                Node::OneOf {
                    options: options.clone(),
                    caseless: *caseless,
                    skip: skip_here,
                    expected: expected(),
                }
            }
            ExprNode::Quoted(spec) => {
                if spec.quote.is_empty() || spec.end_quote.is_empty() {
                    return Err(invalid("quoted string", "quote string is empty"));
                }
                Node::Quoted {
                    spec: spec.clone(),
                    skip: skip_here,
                    expected: expected(),
                }
            }
            ExprNode::Number(kind) => Node::Number {
                kind: *kind,
                skip: skip_here,
                expected: expected(),
            },
            ExprNode::Regex(pattern) => {
                let re = regex::Regex::new(&format!(r"\A(?:{pattern})")).map_err(|err| {
                    GrammarError::InvalidRegex {
                        pattern: pattern.to_string(),
                        message: err.to_string(),
                    }
                })?;
                Node::Regex {
                    re,
                    skip: skip_here,
                    expected: expected(),
                }
            }
            ExprNode::Seq { children, commit } => Node::Seq {
                children: self.compile_all(children, skip)?,
                commit: *commit,
            },
            ExprNode::Choice(alternatives) => Node::Choice(self.compile_all(alternatives, skip)?),
            ExprNode::Opt { child, default } => Node::Opt {
                child: self.compile(child, skip)?,
                default: default.clone(),
            },
            ExprNode::Repeat { child, min, max } => {
                if max.is_some_and(|max| max < *min) {
                    return Err(invalid("repetition", "maximum count is below the minimum"));
                }
                Node::Repeat {
                    child: self.compile(child, skip)?,
                    min: *min,
                    max: *max,
                    what: expr.to_string().into(),
                }
            }
            ExprNode::Delimited { item, delim, spec } => {
                if spec.max.is_some_and(|max| max < spec.min) {
                    return Err(invalid("delimited list", "maximum count is below the minimum"));
                }
                Node::Delimited {
                    item: self.compile(item, skip)?,
                    delim: self.compile(delim, skip)?,
                    spec: spec.clone(),
                    what: expr.to_string().into(),
                }
            }
            ExprNode::Lookahead { child, negate } => Node::Lookahead {
                child: self.compile(child, skip)?,
                negate: *negate,
                expected: if *negate {
                    format!("Found unwanted token, {child}").into()
                } else {
                    expected()
                },
            },
            ExprNode::Suppress(child) => Node::Suppress(self.compile(child, skip)?),
            ExprNode::Group(child) => Node::Group(self.compile(child, skip)?),
            ExprNode::Combine { child, joiner } => Node::Combine {
                child: self.compile(child, &None)?,
                joiner: joiner.clone(),
                skip: skip_here,
            },
            ExprNode::Rule(name) => return self.call(name),
            ExprNode::Named { child, name, accumulate } => Node::Named {
                child: self.compile(child, skip)?,
                name: name.clone(),
                accumulate: *accumulate,
            },
            ExprNode::Action { child, actions } => Node::Action {
                child: self.compile(child, skip)?,
                actions: actions.clone(),
                skip: skip_here,
            },
            ExprNode::Labeled { child, label } => Node::Labeled {
                child: self.compile(child, skip)?,
                skip: skip.clone(),
                expected: format!("Expected {label}").into(),
            },
            ExprNode::Whitespace { child, chars } => {
                let inner = chars.clone().filter(|chars| !chars.is_empty());
                return self.compile(child, &inner);
            }
        };
        Ok(self.push(node))
    }

    fn compile_all(&mut self, exprs: &[Expr], skip: &Skip) -> Result<Vec<NodeId>, GrammarError> {
        exprs.iter().map(|expr| self.compile(expr, skip)).collect()
    }
}

fn invalid(what: &str, reason: &str) -> GrammarError {
    GrammarError::InvalidTerminal {
        what: what.to_owned(),
        reason: reason.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use crate::grammar::builder::{Grammar, GrammarError};
    use crate::grammar::expr::Expr;
    use crate::grammar::node::Node;
    use crate::grammar::terminal::WordSpec;
    use crate::text::CharSet;

    #[test]
    fn test_invalid_regex() {
        let err = Grammar::from_expr(Expr::regex("(unclosed")).unwrap_err();
        assert!(matches!(err, GrammarError::InvalidRegex { .. }));
    }

    #[test]
    fn test_word_min_zero_rejected() {
        let err = Grammar::from_expr(Expr::word(WordSpec::new(CharSet::alphas()).min(0))).unwrap_err();
        assert!(matches!(err, GrammarError::InvalidTerminal { .. }));
    }

    #[test]
    fn test_leave_whitespace_clears_skip() {
        let grammar = Grammar::from_expr(Expr::literal("x").leave_whitespace()).expect("builds");
        assert!(grammar
            .nodes
            .iter()
            .any(|node| matches!(node, Node::Literal { skip: None, .. })));
    }

    #[test]
    fn test_combine_child_skips_nothing() {
        let grammar = Grammar::from_expr((Expr::literal("a") + "b").combine()).expect("builds");
        for node in &grammar.nodes {
            if let Node::Literal { skip, .. } = node {
                assert!(skip.is_none());
            }
        }
    }

    #[test]
    fn test_rule_references_share_one_call_node() {
        let grammar = Grammar::builder()
            .rule("a", "x")
            .rule("b", Expr::rule("a") + Expr::rule("a").leave_whitespace())
            .entry_point("b")
            .build()
            .expect("builds");
        let calls = grammar.nodes.iter().filter(|node| matches!(node, Node::Call(0))).count();
        assert_eq!(calls, 1);
    }
}
