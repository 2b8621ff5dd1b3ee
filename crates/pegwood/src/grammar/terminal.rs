//! Terminal specifications and their scanners.
//!
//! Scanners are pure: given the text and a start offset (whitespace already
//! skipped) they return the end offset of the match, or `None`.

use compact_str::CompactString;
use smallvec::SmallVec;

use crate::results::Token;
use crate::text::CharSet;

/// Character-class word: one char from `init`, then chars from `body`
#[derive(Debug, Clone, PartialEq)]
pub struct WordSpec {
    pub(crate) init: CharSet,
    pub(crate) body: CharSet,
    pub(crate) min: usize,
    pub(crate) max: Option<usize>,
    pub(crate) as_keyword: bool,
}

impl WordSpec {
    /// A word whose every character comes from `chars`
    #[must_use]
    pub fn new(chars: impl Into<CharSet>) -> Self {
        let init = chars.into();
        Self {
            body: init.clone(),
            init,
            min: 1,
            max: None,
            as_keyword: false,
        }
    }

    /// Characters allowed after the first one
    #[must_use]
    pub fn body(mut self, chars: impl Into<CharSet>) -> Self {
        self.body = chars.into();
        self
    }

    /// Minimum length in characters
    #[must_use]
    pub const fn min(mut self, min: usize) -> Self {
        self.min = min;
        self
    }

    /// Maximum length in characters; matching stops once it is reached
    #[must_use]
    pub const fn max(mut self, max: usize) -> Self {
        self.max = Some(max);
        self
    }

    /// Exactly `n` characters
    #[must_use]
    pub const fn exact(mut self, n: usize) -> Self {
        self.min = n;
        self.max = Some(n);
        self
    }

    /// Refuse to match inside a longer run of word characters
    #[must_use]
    pub const fn as_keyword(mut self) -> Self {
        self.as_keyword = true;
        self
    }

    pub(crate) fn scan(&self, text: &str, pos: usize) -> Option<usize> {
        let rest = text.get(pos..)?;
        let mut chars = rest.char_indices();
        let (_, first) = chars.next()?;
        if !self.init.contains(first) {
            return None;
        }
        if self.as_keyword && preceded_by(text, pos, |c| self.body.contains(c) || self.init.contains(c)) {
            return None;
        }

        let mut count = 1;
        let mut end = pos + first.len_utf8();
        for (i, c) in chars {
            if self.max.is_some_and(|max| count >= max) || !self.body.contains(c) {
                break;
            }
            count += 1;
            end = pos + i + c.len_utf8();
        }

        if count < self.min {
            return None;
        }
        if self.as_keyword && text[end..].chars().next().is_some_and(|c| self.body.contains(c)) {
            return None;
        }
        Some(end)
    }

    pub(crate) fn describe(&self) -> String {
        if self.init == self.body {
            format!("W:({})", self.init.describe())
        } else {
            format!("W:({}, {})", self.init.describe(), self.body.describe())
        }
    }
}

/// Quoted string scanner configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotedSpec {
    pub(crate) quote: CompactString,
    pub(crate) end_quote: CompactString,
    pub(crate) esc_char: Option<char>,
    pub(crate) esc_quote: Option<CompactString>,
    pub(crate) multiline: bool,
    pub(crate) unquote: bool,
}

impl QuotedSpec {
    /// Strings opened and closed by `quote`, returned without the quotes
    #[must_use]
    pub fn new(quote: &str) -> Self {
        Self {
            quote: quote.into(),
            end_quote: quote.into(),
            esc_char: None,
            esc_quote: None,
            multiline: false,
            unquote: true,
        }
    }

    /// Use a different closing quote
    #[must_use]
    pub fn end_quote(mut self, end: &str) -> Self {
        self.end_quote = end.into();
        self
    }

    /// Character that escapes the following character, usually `\`
    #[must_use]
    pub const fn esc_char(mut self, esc: char) -> Self {
        self.esc_char = Some(esc);
        self
    }

    /// Sequence standing for a literal closing quote, e.g. `''`
    #[must_use]
    pub fn esc_quote(mut self, esc: &str) -> Self {
        self.esc_quote = Some(esc.into());
        self
    }

    /// Allow newlines inside the quotes
    #[must_use]
    pub const fn multiline(mut self) -> Self {
        self.multiline = true;
        self
    }

    /// Return the raw text, quotes and escapes included
    #[must_use]
    pub const fn keep_quotes(mut self) -> Self {
        self.unquote = false;
        self
    }

    pub(crate) fn describe(&self) -> String {
        format!(
            "quoted string, starting with {} ending with {}",
            self.quote, self.end_quote
        )
    }

    /// Returns the end offset and the token text
    pub(crate) fn scan(&self, text: &str, pos: usize) -> Option<(usize, String)> {
        let rest = text.get(pos..)?;
        if self.quote.is_empty() || !rest.starts_with(self.quote.as_str()) {
            return None;
        }

        let mut stops: SmallVec<[u8; 4]> = SmallVec::new();
        let mut add_stop = |b: u8| {
            if !stops.contains(&b) {
                stops.push(b);
            }
        };
        add_stop(self.end_quote.as_bytes().first().copied()?);
        if let Some(eq) = self.esc_quote.as_ref().and_then(|q| q.as_bytes().first()) {
            add_stop(*eq);
        }
        if let Some(esc) = self.esc_char {
            let mut buf = [0u8; 4];
            add_stop(esc.encode_utf8(&mut buf).as_bytes()[0]);
        }
        if !self.multiline {
            add_stop(b'\n');
        }

        let bytes = text.as_bytes();
        let mut content = String::new();
        let mut i = pos + self.quote.len();
        loop {
            let skip = find_stop(&bytes[i..], &stops)?;
            content.push_str(&text[i..i + skip]);
            i += skip;
            let tail = &text[i..];

            if let Some(eq) = self.esc_quote.as_deref().filter(|eq| tail.starts_with(*eq)) {
                content.push_str(&self.end_quote);
                i += eq.len();
            } else if tail.starts_with(self.end_quote.as_str()) {
                i += self.end_quote.len();
                break;
            } else if let Some(esc) = self.esc_char.filter(|&e| tail.starts_with(e)) {
                let escaped = tail[esc.len_utf8()..].chars().next()?;
                content.push(convert_escape(escaped));
                i += esc.len_utf8() + escaped.len_utf8();
            } else if tail.starts_with('\n') && !self.multiline {
                return None;
            } else {
                let c = tail.chars().next()?;
                content.push(c);
                i += c.len_utf8();
            }
        }

        if self.unquote {
            Some((i, content))
        } else {
            Some((i, text[pos..i].to_owned()))
        }
    }
}

fn find_stop(hay: &[u8], stops: &[u8]) -> Option<usize> {
    match *stops {
        [a] => memchr::memchr(a, hay),
        [a, b] => memchr::memchr2(a, b, hay),
        [a, b, c] => memchr::memchr3(a, b, c, hay),
        _ => hay.iter().position(|b| stops.contains(b)),
    }
}

const fn convert_escape(c: char) -> char {
    match c {
        't' => '\t',
        'n' => '\n',
        'r' => '\r',
        'f' => '\u{c}',
        other => other,
    }
}

/// Which numeric literal a `Number` terminal accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumberKind {
    /// Unsigned digits, yields `Int`
    Integer,
    /// Optionally signed digits, yields `Int`
    SignedInteger,
    /// Optionally signed real or integer; yields `Float` when a fraction or exponent is present
    Real,
}

impl NumberKind {
    pub(crate) const fn describe(self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::SignedInteger => "signed integer",
            Self::Real => "number",
        }
    }

    pub(crate) fn scan(self, text: &str, pos: usize) -> Option<(usize, Token)> {
        let bytes = text.as_bytes();
        let digits_from = |i: usize| bytes[i..].iter().take_while(|b| b.is_ascii_digit()).count();

        let mut i = pos;
        if self != Self::Integer && matches!(bytes.get(i), Some(b'+' | b'-')) {
            i += 1;
        }
        let int_digits = digits_from(i);
        i += int_digits;

        let mut is_float = false;
        if self == Self::Real {
            if bytes.get(i) == Some(&b'.') {
                let frac = digits_from(i + 1);
                if int_digits > 0 || frac > 0 {
                    is_float = true;
                    i += 1 + frac;
                }
            }
            if int_digits == 0 && !is_float {
                return None;
            }
            if matches!(bytes.get(i), Some(b'e' | b'E')) {
                let mut j = i + 1;
                if matches!(bytes.get(j), Some(b'+' | b'-')) {
                    j += 1;
                }
                let exp = digits_from(j);
                if exp > 0 {
                    is_float = true;
                    i = j + exp;
                }
            }
        } else if int_digits == 0 {
            return None;
        }

        let literal = &text[pos..i];
        if is_float {
            return literal.parse::<f64>().ok().map(|x| (i, Token::Float(x)));
        }
        match literal.parse::<i64>() {
            Ok(n) => Some((i, Token::Int(n))),
            Err(_) if self == Self::Real => literal.parse::<f64>().ok().map(|x| (i, Token::Float(x))),
            Err(_) => None,
        }
    }
}

/// Order `one_of` options so that no option masks a later, longer one
///
/// `"< = > >= <="` becomes `<= < = >= >`: an option is moved ahead of any
/// earlier option that is a prefix of it. Duplicates are dropped.
#[must_use]
pub(crate) fn order_options(options: impl IntoIterator<Item = CompactString>, caseless: bool) -> Vec<CompactString> {
    let mut symbols: Vec<CompactString> = options.into_iter().filter(|s| !s.is_empty()).collect();
    let same = |a: &str, b: &str| {
        if caseless {
            a.to_lowercase() == b.to_lowercase()
        } else {
            a == b
        }
    };
    let masks = |short: &str, long: &str| {
        if caseless {
            long.to_lowercase().starts_with(&short.to_lowercase())
        } else {
            long.starts_with(short)
        }
    };

    let mut i = 0;
    while i + 1 < symbols.len() {
        let cur = symbols[i].clone();
        let mut moved = false;
        for j in i + 1..symbols.len() {
            if same(&symbols[j], &cur) {
                symbols.remove(j);
                moved = true;
                break;
            }
            if masks(&cur, &symbols[j]) {
                let other = symbols.remove(j);
                symbols.insert(i, other);
                moved = true;
                break;
            }
        }
        if !moved {
            i += 1;
        }
    }
    symbols
}

/// Byte length of `text`'s prefix matching `pattern` case-insensitively
pub(crate) fn caseless_prefix(text: &str, pattern: &str) -> Option<usize> {
    let mut text_chars = text.char_indices();
    for p in pattern.chars() {
        let (_, t) = text_chars.next()?;
        if t != p && !t.to_lowercase().eq(p.to_lowercase()) {
            return None;
        }
    }
    Some(text_chars.next().map_or(text.len(), |(i, _)| i))
}

/// True when the character just before `pos` satisfies `pred`
pub(crate) fn preceded_by(text: &str, pos: usize, pred: impl Fn(char) -> bool) -> bool {
    text[..pos].chars().next_back().is_some_and(pred)
}
