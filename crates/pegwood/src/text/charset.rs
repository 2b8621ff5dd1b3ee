//! Character classes used by `Word`, keyword boundaries and whitespace skipping.

use std::fmt;

use smallvec::SmallVec;

/// A set of characters
///
/// ASCII membership is a single bit test; everything else falls back to a
/// scan over inclusive ranges.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct CharSet {
    ascii: u128,
    /// Non-ASCII inclusive ranges
    ranges: SmallVec<[(char, char); 2]>,
}

impl CharSet {
    /// The empty set
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a character set from inclusive ranges
    #[must_use]
    pub fn from_ranges(ranges: &[(char, char)]) -> Self {
        let mut set = Self::empty();
        for &(start, end) in ranges {
            set.insert_range(start, end);
        }
        set
    }

    /// Create a character set from every character of `chars`
    #[must_use]
    pub fn from_chars(chars: &str) -> Self {
        let mut set = Self::empty();
        for c in chars.chars() {
            set.insert(c);
        }
        set
    }

    /// `[0-9]`
    #[must_use]
    pub fn nums() -> Self {
        Self::from_ranges(&[('0', '9')])
    }

    /// `[A-Za-z]`
    #[must_use]
    pub fn alphas() -> Self {
        Self::from_ranges(&[('a', 'z'), ('A', 'Z')])
    }

    /// `[A-Za-z0-9]`
    #[must_use]
    pub fn alphanums() -> Self {
        Self::alphas().union(&Self::nums())
    }

    /// `[0-9A-Fa-f]`
    #[must_use]
    pub fn hexnums() -> Self {
        Self::from_ranges(&[('0', '9'), ('a', 'f'), ('A', 'F')])
    }

    /// Every visible ASCII character (`!` through `~`)
    #[must_use]
    pub fn printables() -> Self {
        Self::from_ranges(&[('!', '~')])
    }

    /// Space, tab, carriage return and newline
    #[must_use]
    pub fn whitespace() -> Self {
        Self::from_chars(" \t\r\n")
    }

    /// Default identifier characters for keyword boundaries: alphanumerics, `_` and `$`
    #[must_use]
    pub fn ident_chars() -> Self {
        let mut set = Self::alphanums();
        set.insert('_');
        set.insert('$');
        set
    }

    /// Add a single character
    pub fn insert(&mut self, c: char) {
        self.insert_range(c, c);
    }

    /// Add an inclusive range
    pub fn insert_range(&mut self, start: char, end: char) {
        if start > end {
            return;
        }
        let mut lo = start as u32;
        while lo <= end as u32 && lo < 128 {
            self.ascii |= 1u128 << lo;
            lo += 1;
        }
        if (end as u32) >= 128 {
            let from = char::from_u32(lo.max(128)).unwrap_or(start);
            self.ranges.push((from, end));
        }
    }

    /// Set union
    #[must_use]
    pub fn union(mut self, other: &Self) -> Self {
        self.ascii |= other.ascii;
        self.ranges.extend(other.ranges.iter().copied());
        self
    }

    /// Set difference, restricted to the ASCII part of `other`
    ///
    /// Non-ASCII ranges of `self` are kept as they are.
    #[must_use]
    pub fn without(mut self, other: &Self) -> Self {
        self.ascii &= !other.ascii;
        self
    }

    /// Check if a character is in this set
    #[inline]
    #[must_use]
    pub fn contains(&self, c: char) -> bool {
        let code = c as u32;
        if code < 128 {
            self.ascii & (1u128 << code) != 0
        } else {
            self.ranges.iter().any(|&(lo, hi)| c >= lo && c <= hi)
        }
    }

    /// True when the set has no members
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ascii == 0 && self.ranges.is_empty()
    }

    /// Length in bytes of the run of members at the start of `text`
    #[must_use]
    pub fn span(&self, text: &str) -> usize {
        text.char_indices()
            .find(|&(_, c)| !self.contains(c))
            .map_or(text.len(), |(i, _)| i)
    }

    /// Compact regex-like rendering used in expectation messages, e.g. `A-Za-z`
    #[must_use]
    pub fn describe(&self) -> String {
        let mut out = String::new();
        // uppercase, lowercase and digit runs first, the way people write classes
        let order = (b'A'..=b'Z')
            .chain(b'a'..=b'z')
            .chain(b'0'..=b'9')
            .chain((0u8..128).filter(|b| !b.is_ascii_alphanumeric()));
        let codes: Vec<u8> = order.filter(|&b| self.ascii & (1u128 << b) != 0).collect();
        let mut i = 0;
        while i < codes.len() {
            let mut j = i;
            while j + 1 < codes.len() && codes[j + 1] == codes[j] + 1 {
                j += 1;
            }
            push_escaped(&mut out, codes[i] as char);
            if j > i + 1 {
                out.push('-');
            }
            if j > i {
                push_escaped(&mut out, codes[j] as char);
            }
            i = j + 1;
        }
        for &(lo, hi) in &self.ranges {
            out.push(lo);
            if hi != lo {
                out.push('-');
                out.push(hi);
            }
        }
        out
    }
}

fn push_escaped(out: &mut String, c: char) {
    match c {
        '\t' => out.push_str("\\t"),
        '\n' => out.push_str("\\n"),
        '\r' => out.push_str("\\r"),
        '-' | ']' | '\\' => {
            out.push('\\');
            out.push(c);
        }
        _ => out.push(c),
    }
}

impl From<&str> for CharSet {
    fn from(chars: &str) -> Self {
        Self::from_chars(chars)
    }
}

impl fmt::Debug for CharSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CharSet[{}]", self.describe())
    }
}
