//! # Diagnostic Utilities
//!
//! Helpers for readable failure reports:
//! - "Did you mean?" suggestions for misspelled rule names
//! - Caret and marker rendering of a failing line

/// Suggest the closest candidate for a misspelled name
///
/// Returns `None` when nothing is at least 60% similar.
///
/// # Example
///
/// ```rust
/// use pegwood::error::diagnostics::did_you_mean;
///
/// let rules = vec!["expr".to_string(), "term".to_string()];
/// assert_eq!(did_you_mean("expt", &rules).as_deref(), Some("expr"));
/// ```
#[must_use]
pub fn did_you_mean(actual: &str, candidates: &[String]) -> Option<String> {
    let actual_lower = actual.to_lowercase();
    let mut best: Option<(&String, f64)> = None;

    for candidate in candidates {
        let similarity = string_similarity(&actual_lower, &candidate.to_lowercase());
        if similarity < 0.6 {
            continue;
        }
        match best {
            Some((_, best_sim)) if similarity <= best_sim => {}
            _ => best = Some((candidate, similarity)),
        }
    }

    best.map(|(suggestion, _)| suggestion.clone())
}

/// Insert `marker` before the 1-based character `column` of `line`
#[must_use]
pub fn mark_line(line: &str, column: usize, marker: &str) -> String {
    let split = line
        .char_indices()
        .nth(column.saturating_sub(1))
        .map_or(line.len(), |(i, _)| i);
    format!("{}{marker}{}", &line[..split], &line[split..])
}

/// A line holding only a caret under the 1-based character `column`
///
/// Tabs in the prefix are echoed so the caret lines up in a terminal.
#[must_use]
pub fn caret_line(line: &str, column: usize) -> String {
    let mut out: String = line
        .chars()
        .take(column.saturating_sub(1))
        .map(|c| if c == '\t' { '\t' } else { ' ' })
        .collect();
    let pad = column.saturating_sub(1).saturating_sub(out.chars().count());
    out.extend(std::iter::repeat(' ').take(pad));
    out.push('^');
    out
}

fn string_similarity(s1: &str, s2: &str) -> f64 {
    if s1 == s2 {
        return 1.0;
    }
    if s1.is_empty() || s2.is_empty() {
        return 0.0;
    }

    let distance = levenshtein_distance(s1, s2);
    let max_len = s1.chars().count().max(s2.chars().count());
    1.0 - (distance as f64 / max_len as f64)
}

/// Levenshtein distance, two rows at a time
fn levenshtein_distance(s1: &str, s2: &str) -> usize {
    let a: Vec<char> = s1.chars().collect();
    let b: Vec<char> = s2.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut cur = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        cur[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            cur[j + 1] = (prev[j + 1] + 1).min(cur[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}
