//! Human-oriented multi-line rendering of results.

use std::fmt::Write;

use super::{ParseResults, Token};

/// Render `results` as its token list followed by its names, sorted
///
/// ```text
/// ['range', '=', 5280]
/// - key: 'range'
/// - value: 5280
/// ```
pub(super) fn dump(results: &ParseResults) -> String {
    let mut out = results.to_string();
    dump_names(results, 0, &mut out);
    out
}

fn dump_names(results: &ParseResults, depth: usize, out: &mut String) {
    let mut slots: Vec<_> = results.named_slots().collect();
    slots.sort_by(|a, b| a.0.cmp(b.0));
    let indent = "  ".repeat(depth);

    for (name, slot) in slots {
        let Some(value) = results.get(name) else {
            continue;
        };
        // writing to a String cannot fail
        let _ = write!(out, "\n{indent}- {name}: {value}");
        if slot.accumulate {
            continue;
        }
        if let Some(Token::Group(inner)) = slot
            .spans
            .last()
            .and_then(|r| results.tokens.get(r.clone()))
            .and_then(|tokens| match tokens {
                [one] => Some(one),
                _ => None,
            })
        {
            if inner.has_names() {
                dump_names(inner, depth + 1, out);
            }
        }
    }
}
