//! # Grammar Analysis
//!
//! Static checks run once by [`GrammarBuilder::build`](crate::GrammarBuilder::build):
//!
//! - Nullability: which nodes can succeed without consuming input
//! - Unbounded repetition of a nullable expression
//! - Left recursion through rule references

use hashbrown::HashSet;

use crate::grammar::builder::{Grammar, GrammarError};
use crate::grammar::node::{Node, NodeId};

/// Run every static check on a freshly compiled grammar
pub(crate) fn validate(grammar: &Grammar) -> Result<(), GrammarError> {
    let nullable = compute_nullable(grammar);
    check_repetitions(grammar, &nullable)?;

    let cycles = find_left_recursion(grammar, &nullable);
    if !cycles.is_empty() {
        return Err(GrammarError::LeftRecursion(cycles));
    }
    Ok(())
}

/// Nullability of every node, as a fixed point over rule calls
///
/// Children always precede their parent in the arena, so one ascending
/// sweep is exact for rule-free grammars. Calls need further sweeps.
pub(crate) fn compute_nullable(grammar: &Grammar) -> Vec<bool> {
    let mut nullable = vec![false; grammar.nodes.len()];
    loop {
        let mut changed = false;
        for id in 0..grammar.nodes.len() {
            if nullable[id] {
                continue;
            }
            let value = match grammar.node(id) {
                Node::Empty | Node::End { .. } | Node::Opt { .. } | Node::Lookahead { .. } => true,
                Node::Literal { .. }
                | Node::Keyword { .. }
                | Node::Word { .. }
                | Node::OneOf { .. }
                | Node::Quoted { .. }
                | Node::Number { .. } => false,
                Node::Regex { re, .. } => re.is_match(""),
                Node::Seq { children, .. } => children.iter().all(|&c| nullable[c]),
                Node::Choice(alternatives) => alternatives.iter().any(|&c| nullable[c]),
                Node::Repeat { child, min, .. } => *min == 0 || nullable[*child],
                Node::Delimited { item, spec, .. } => spec.min == 0 || nullable[*item],
                Node::Call(rule) => nullable[grammar.rule_body(*rule)],
                Node::Suppress(child)
                | Node::Group(child)
                | Node::Combine { child, .. }
                | Node::Named { child, .. }
                | Node::Action { child, .. }
                | Node::Labeled { child, .. } => nullable[*child],
            };
            if value {
                nullable[id] = true;
                changed = true;
            }
        }
        if !changed {
            return nullable;
        }
    }
}

fn check_repetitions(grammar: &Grammar, nullable: &[bool]) -> Result<(), GrammarError> {
    for node in &grammar.nodes {
        match node {
            Node::Repeat { child, max: None, what, .. } if nullable[*child] => {
                return Err(GrammarError::NullableRepetition(what.to_string()));
            }
            Node::Delimited { item, delim, spec, what } if spec.max.is_none() && nullable[*item] && nullable[*delim] => {
                return Err(GrammarError::NullableRepetition(what.to_string()));
            }
            _ => {}
        }
    }
    Ok(())
}

/// Rules reachable at the left edge of each node, before any input is consumed
fn left_calls(grammar: &Grammar, nullable: &[bool]) -> Vec<Vec<usize>> {
    let mut calls: Vec<Vec<usize>> = Vec::with_capacity(grammar.nodes.len());
    for id in 0..grammar.nodes.len() {
        let mut edge = Vec::new();
        let take = |child: NodeId, edge: &mut Vec<usize>| {
            for &rule in &calls[child] {
                if !edge.contains(&rule) {
                    edge.push(rule);
                }
            }
        };
        match grammar.node(id) {
            Node::Call(rule) => edge.push(*rule),
            Node::Seq { children, .. } => {
                for &child in children {
                    take(child, &mut edge);
                    if !nullable[child] {
                        break;
                    }
                }
            }
            Node::Delimited { item, delim, .. } => {
                take(*item, &mut edge);
                if nullable[*item] {
                    take(*delim, &mut edge);
                }
            }
            node => {
                for child in node.children() {
                    take(child, &mut edge);
                }
            }
        }
        calls.push(edge);
    }
    calls
}

/// Every left-recursive cycle, as rule names with the first repeated at the end
fn find_left_recursion(grammar: &Grammar, nullable: &[bool]) -> Vec<Vec<String>> {
    let calls = left_calls(grammar, nullable);
    let edges: Vec<&[usize]> = grammar
        .rule_bodies
        .iter()
        .map(|&body| calls[body].as_slice())
        .collect();

    let mut cycles = Vec::new();
    let mut visited = HashSet::with_hasher(ahash::RandomState::new());
    let mut path = Vec::new();
    for rule in 0..edges.len() {
        if !visited.contains(&rule) {
            left_recursion_dfs(grammar, &edges, rule, &mut visited, &mut path, &mut cycles);
        }
    }
    cycles
}

fn left_recursion_dfs(
    grammar: &Grammar,
    edges: &[&[usize]],
    current: usize,
    visited: &mut HashSet<usize, ahash::RandomState>,
    path: &mut Vec<usize>,
    cycles: &mut Vec<Vec<String>>,
) {
    if let Some(start) = path.iter().position(|&r| r == current) {
        let mut cycle: Vec<String> = path[start..]
            .iter()
            .map(|&r| grammar.rule_names[r].to_string())
            .collect();
        cycle.push(grammar.rule_names[current].to_string());
        cycles.push(cycle);
        return;
    }
    if visited.contains(&current) {
        return;
    }

    path.push(current);
    for &next in edges[current] {
        left_recursion_dfs(grammar, edges, next, visited, path, cycles);
    }
    path.pop();
    visited.insert(current);
}

#[cfg(test)]
mod tests {
    use crate::grammar::builder::{Grammar, GrammarError};
    use crate::grammar::expr::Expr;

    #[test]
    fn test_direct_left_recursion() {
        let result = Grammar::builder()
            .rule("expr", Expr::rule("expr") + "+" + Expr::integer() | Expr::integer())
            .entry_point("expr")
            .build();
        assert_eq!(
            result.err(),
            Some(GrammarError::LeftRecursion(vec![vec!["expr".into(), "expr".into()]]))
        );
    }

    #[test]
    fn test_indirect_left_recursion_through_nullable_prefix() {
        let result = Grammar::builder()
            .rule("a", Expr::literal("-").opt() + Expr::rule("b"))
            .rule("b", Expr::rule("a") + "x" | "y")
            .entry_point("a")
            .build();
        let Err(GrammarError::LeftRecursion(cycles)) = result else {
            panic!("expected left recursion");
        };
        assert_eq!(cycles, vec![vec!["a".to_string(), "b".into(), "a".into()]]);
    }

    #[test]
    fn test_non_left_recursion_is_fine() {
        let result = Grammar::builder()
            .rule("parens", Expr::literal("(") + Expr::rule("parens").opt() + ")")
            .entry_point("parens")
            .build();
        assert!(result.is_ok());
    }

    #[test]
    fn test_nullable_repetition() {
        let err = Grammar::from_expr(Expr::literal("a").opt().zero_or_more()).unwrap_err();
        assert_eq!(err, GrammarError::NullableRepetition(r#"[["a"]]..."#.into()));
    }

    #[test]
    fn test_nullable_rule_repetition() {
        let err = Grammar::builder()
            .rule("maybe", Expr::literal("a").opt())
            .rule("many", Expr::rule("maybe").one_or_more())
            .entry_point("many")
            .build()
            .unwrap_err();
        assert!(matches!(err, GrammarError::NullableRepetition(_)));
    }

    #[test]
    fn test_bounded_nullable_repetition_allowed() {
        assert!(Grammar::from_expr(Expr::literal("a").opt().repeat(0, Some(3))).is_ok());
    }
}
