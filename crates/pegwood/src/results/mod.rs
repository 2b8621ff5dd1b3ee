//! # Parse Results
//!
//! [`ParseResults`] is the value every match produces. It is an ordered list
//! of [`Token`]s plus a set of names, and each name is a view over a range of
//! those tokens, not a copy.
//!
//! Naming rules:
//! - a plain name is last-write-wins
//! - a list name (`named_list`, or a trailing `*` in the name) accumulates
//!   one entry per match
//! - naming an empty result records nothing
//! - names inside a group are scoped to the group and read through it

mod dump;
mod value;

pub use value::Value;

use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Index, Range};

use compact_str::CompactString;
use smallvec::{smallvec, SmallVec};

/// A single result token
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Str(CompactString),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// A nested result produced by `Group`
    Group(ParseResults),
}

impl Token {
    /// Build a string token
    #[must_use]
    pub fn str(s: impl Into<CompactString>) -> Self {
        Self::Str(s.into())
    }

    /// The string, if this is a `Str`
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The integer, if this is an `Int`
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric value of `Int` and `Float` tokens
    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(x) => Some(*x),
            #[allow(clippy::cast_precision_loss)]
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// The nested results, if this is a `Group`
    #[must_use]
    pub const fn as_group(&self) -> Option<&ParseResults> {
        match self {
            Self::Group(results) => Some(results),
            _ => None,
        }
    }

    /// Plain text of a scalar token; groups concatenate their contents
    #[must_use]
    pub fn text(&self) -> String {
        match self {
            Self::Str(s) => s.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(x) => Value::Float(*x).to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Group(results) => results.joined(""),
        }
    }

    /// Convert into a plain list-style [`Value`]
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Str(s) => Value::Str(s.to_string()),
            Self::Int(i) => Value::Int(*i),
            Self::Float(x) => Value::Float(*x),
            Self::Bool(b) => Value::Bool(*b),
            Self::Group(results) => Value::List(results.as_list()),
        }
    }

    /// Like [`Token::to_value`], but a group that carries names becomes a `Dict`
    fn to_dict_value(&self) -> Value {
        match self {
            Self::Group(results) if results.has_names() => Value::Dict(results.as_dict()),
            other => other.to_value(),
        }
    }
}

impl From<&str> for Token {
    fn from(s: &str) -> Self {
        Self::Str(s.into())
    }
}

impl From<String> for Token {
    fn from(s: String) -> Self {
        Self::Str(s.into())
    }
}

impl From<i64> for Token {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for Token {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<bool> for Token {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<ParseResults> for Token {
    fn from(results: ParseResults) -> Self {
        Self::Group(results)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => value::fmt_quoted(f, s),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => value::fmt_float(f, *x),
            Self::Bool(b) => write!(f, "{}", Value::Bool(*b)),
            Self::Group(results) => write!(f, "{results}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct NamedSlot {
    name: CompactString,
    spans: SmallVec<[Range<usize>; 1]>,
    accumulate: bool,
}

/// Ordered tokens plus named views over them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseResults {
    tokens: Vec<Token>,
    names: SmallVec<[NamedSlot; 2]>,
}

impl ParseResults {
    /// Empty results
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Results holding one token
    #[must_use]
    pub fn from_token(token: impl Into<Token>) -> Self {
        Self {
            tokens: vec![token.into()],
            names: SmallVec::new(),
        }
    }

    /// Results holding the given tokens, unnamed
    #[must_use]
    pub fn from_tokens<I, T>(tokens: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Token>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
            names: SmallVec::new(),
        }
    }

    /// Number of top-level tokens
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// True when there are no tokens
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Top-level tokens in order
    #[must_use]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Iterate over top-level tokens
    pub fn iter(&self) -> std::slice::Iter<'_, Token> {
        self.tokens.iter()
    }

    /// First token
    #[must_use]
    pub fn first(&self) -> Option<&Token> {
        self.tokens.first()
    }

    /// Consume into the token list, dropping names
    #[must_use]
    pub fn into_tokens(self) -> Vec<Token> {
        self.tokens
    }

    /// Append one unnamed token
    pub fn push(&mut self, token: impl Into<Token>) {
        self.tokens.push(token.into());
    }

    /// Append `other`, carrying its names along
    ///
    /// An existing plain name is overwritten; list names gain the new entries.
    pub fn extend(&mut self, other: Self) {
        let shift = self.tokens.len();
        self.tokens.extend(other.tokens);
        for slot in other.names {
            let spans = slot
                .spans
                .into_iter()
                .map(|r| r.start + shift..r.end + shift);
            match self.names.iter().position(|s| s.name == slot.name) {
                Some(i) if self.names[i].accumulate || slot.accumulate => {
                    let existing = &mut self.names[i];
                    existing.accumulate = true;
                    existing.spans.extend(spans);
                }
                Some(i) => self.names[i].spans = spans.collect(),
                None => self.names.push(NamedSlot {
                    name: slot.name,
                    spans: spans.collect(),
                    accumulate: slot.accumulate,
                }),
            }
        }
    }

    /// Name the whole result
    ///
    /// Does nothing when the result is empty. A name of the same spelling from
    /// inside the match is replaced.
    pub fn set_name(&mut self, name: &str, accumulate: bool) {
        if self.tokens.is_empty() {
            return;
        }
        self.names.retain(|slot| slot.name != name);
        self.names.push(NamedSlot {
            name: name.into(),
            spans: smallvec![0..self.tokens.len()],
            accumulate,
        });
    }

    /// Drop every name, keeping tokens
    pub fn clear_names(&mut self) {
        self.names.clear();
    }

    /// True when at least one name is recorded at this level
    #[must_use]
    pub fn has_names(&self) -> bool {
        !self.names.is_empty()
    }

    /// True when `name` is recorded at this level
    #[must_use]
    pub fn contains_name(&self, name: &str) -> bool {
        self.names.iter().any(|slot| slot.name == name)
    }

    /// Names recorded at this level, in first-recorded order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(|slot| slot.name.as_str())
    }

    /// Look up a name
    ///
    /// A single-token match yields that token's value; a longer match yields a
    /// list. List names yield one entry per recorded match.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Value> {
        let slot = self.slot(name)?;
        if slot.accumulate {
            Some(Value::List(
                slot.spans.iter().map(|r| self.span_value(r)).collect(),
            ))
        } else {
            slot.spans.last().map(|r| self.span_value(r))
        }
    }

    /// First token of the latest match recorded under `name`
    #[must_use]
    pub fn token(&self, name: &str) -> Option<&Token> {
        let span = self.slot(name)?.spans.last()?;
        self.tokens.get(span.start)
    }

    /// Tokens of the latest match recorded under `name`, as their own results
    ///
    /// When the match is a single group, the group's own results are returned,
    /// so its inner names stay reachable.
    #[must_use]
    pub fn get_results(&self, name: &str) -> Option<ParseResults> {
        let span = self.slot(name)?.spans.last()?.clone();
        let tokens = self.tokens.get(span)?;
        match tokens {
            [Token::Group(inner)] => Some(inner.clone()),
            _ => Some(Self::from_tokens(tokens.iter().cloned())),
        }
    }

    /// Tokens as nested plain lists
    #[must_use]
    pub fn as_list(&self) -> Vec<Value> {
        self.tokens.iter().map(Token::to_value).collect()
    }

    /// Names as a map; named groups that carry names become nested dicts
    #[must_use]
    pub fn as_dict(&self) -> BTreeMap<String, Value> {
        let mut map = BTreeMap::new();
        for slot in &self.names {
            let value = if slot.accumulate {
                Value::List(slot.spans.iter().map(|r| self.span_dict_value(r)).collect())
            } else {
                match slot.spans.last() {
                    Some(r) => self.span_dict_value(r),
                    None => continue,
                }
            };
            map.insert(slot.name.to_string(), value);
        }
        map
    }

    /// Every scalar token in order, descending into groups
    #[must_use]
    pub fn flatten(&self) -> Vec<Token> {
        let mut out = Vec::new();
        self.flatten_into(&mut out);
        out
    }

    /// Concatenate the text of every scalar token, separated by `sep`
    #[must_use]
    pub fn joined(&self, sep: &str) -> String {
        let parts: Vec<String> = self.flatten().iter().map(Token::text).collect();
        parts.join(sep)
    }

    /// Multi-line rendering: the token list, then one `- name: value` line per name
    #[must_use]
    pub fn dump(&self) -> String {
        dump::dump(self)
    }

    fn flatten_into(&self, out: &mut Vec<Token>) {
        for token in &self.tokens {
            match token {
                Token::Group(inner) => inner.flatten_into(out),
                other => out.push(other.clone()),
            }
        }
    }

    fn slot(&self, name: &str) -> Option<&NamedSlot> {
        self.names.iter().find(|slot| slot.name == name)
    }

    fn span_value(&self, span: &Range<usize>) -> Value {
        match self.tokens.get(span.clone()).unwrap_or(&[]) {
            [one] => one.to_value(),
            many => Value::List(many.iter().map(Token::to_value).collect()),
        }
    }

    fn span_dict_value(&self, span: &Range<usize>) -> Value {
        match self.tokens.get(span.clone()).unwrap_or(&[]) {
            [one] => one.to_dict_value(),
            many => Value::List(many.iter().map(Token::to_value).collect()),
        }
    }

    fn named_slots(&self) -> impl Iterator<Item = (&str, &NamedSlot)> {
        self.names.iter().map(|slot| (slot.name.as_str(), slot))
    }
}

impl Index<usize> for ParseResults {
    type Output = Token;

    fn index(&self, index: usize) -> &Token {
        &self.tokens[index]
    }
}

impl<'a> IntoIterator for &'a ParseResults {
    type Item = &'a Token;
    type IntoIter = std::slice::Iter<'a, Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.iter()
    }
}

impl FromIterator<Token> for ParseResults {
    fn from_iter<I: IntoIterator<Item = Token>>(iter: I) -> Self {
        Self::from_tokens(iter)
    }
}

#[cfg(feature = "serialize")]
impl serde::Serialize for Token {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

/// Serialized as the nested token list; names are not included
#[cfg(feature = "serialize")]
impl serde::Serialize for ParseResults {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Value::List(self.as_list()).serialize(serializer)
    }
}

impl fmt::Display for ParseResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Value::List(self.as_list()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(token: impl Into<Token>, name: &str, accumulate: bool) -> ParseResults {
        let mut r = ParseResults::from_token(token);
        r.set_name(name, accumulate);
        r
    }

    #[test]
    fn test_plain_name_last_write_wins() {
        let mut r = named("a", "x", false);
        r.extend(named("b", "x", false));
        assert_eq!(r.get("x"), Some(Value::from("b")));
        assert_eq!(r.len(), 2);
    }

    #[test]
    fn test_accumulating_name() {
        let mut r = ParseResults::new();
        for word in ["a", "b", "c"] {
            r.extend(named(word, "w", true));
        }
        r.extend(named(1i64, "n", true));
        assert_eq!(r.get("w"), Some(Value::list(["a", "b", "c"])));
        assert_eq!(r.get("n"), Some(Value::list([1])));
    }

    #[test]
    fn test_empty_results_are_not_named() {
        let mut r = ParseResults::new();
        r.set_name("nothing", false);
        assert!(!r.has_names());
        assert_eq!(r.get("nothing"), None);
    }

    #[test]
    fn test_multi_token_name_is_list() {
        let mut r = ParseResults::from_tokens(["$", "A"]);
        r.set_name("col", false);
        let mut outer = ParseResults::from_token("=");
        outer.extend(r);
        assert_eq!(outer.get("col"), Some(Value::list(["$", "A"])));
        assert_eq!(outer.token("col").and_then(Token::as_str), Some("$"));
    }

    #[test]
    fn test_group_scopes_names() {
        let mut inner = named("range", "key", false);
        inner.push(5280);
        let mut outer = ParseResults::from_token(Token::Group(inner));
        outer.set_name("pair", false);
        assert!(!outer.contains_name("key"));
        let dict = outer.as_dict();
        let Some(Value::Dict(pair)) = dict.get("pair") else {
            panic!("expected nested dict, got {dict:?}");
        };
        assert_eq!(pair.get("key"), Some(&Value::from("range")));
        let pair = outer.get_results("pair").expect("pair");
        assert_eq!(pair.get("key"), Some(Value::from("range")));
    }

    #[test]
    fn test_joined_flattens_groups() {
        let inner = ParseResults::from_tokens(["4B", ":", "73"]);
        let mut r = ParseResults::from_token("0A");
        r.push(":");
        r.push(Token::Group(inner));
        assert_eq!(r.joined(""), "0A:4B:73");
    }

    #[test]
    fn test_display_nested() {
        let inner = ParseResults::from_tokens([Token::Int(3), Token::str("*"), Token::Int(4)]);
        let r = ParseResults::from_token(Token::Group(inner));
        assert_eq!(r.to_string(), "[[3, '*', 4]]");
    }
}
