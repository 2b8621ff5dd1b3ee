//! Line and column position utilities
//!
//! Converts byte offsets into the 1-based line/column pairs used in failure
//! messages. Columns count characters, not bytes, so a failure after a
//! multi-byte character still points at the right place.

/// A 1-based line and column position in source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LineCol {
    /// One-based line number
    pub line: usize,
    /// One-based column number (in characters)
    pub column: usize,
}

impl LineCol {
    /// Create a new line/column position
    #[must_use]
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl std::fmt::Display for LineCol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line:{}, col:{}", self.line, self.column)
    }
}

/// Line index for converting byte offsets to line/column positions
///
/// Caches line start offsets so repeated lookups are a binary search. Accepts
/// `\n`, `\r\n` and lone `\r` as line terminators.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Byte offsets of line starts (the first line starts at 0)
    line_starts: Vec<usize>,
    text_len: usize,
}

impl LineIndex {
    /// Create a new line index from source text
    ///
    /// # Example
    ///
    /// ```rust
    /// use pegwood::text::LineIndex;
    ///
    /// let index = LineIndex::new("line 1\nline 2");
    /// let pos = index.line_col("line 1\nline 2", 10);
    /// assert_eq!((pos.line, pos.column), (2, 4));
    /// ```
    #[must_use]
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        let bytes = text.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'\n' => {
                    line_starts.push(i + 1);
                    i += 1;
                }
                b'\r' => {
                    if bytes.get(i + 1) == Some(&b'\n') {
                        line_starts.push(i + 2);
                        i += 2;
                    } else {
                        line_starts.push(i + 1);
                        i += 1;
                    }
                }
                _ => i += 1,
            }
        }

        Self {
            line_starts,
            text_len: text.len(),
        }
    }

    /// Zero-based index of the line containing `offset`
    ///
    /// Offsets past the end of the text clamp to the last line.
    #[must_use]
    pub fn line_of(&self, offset: usize) -> usize {
        let offset = offset.min(self.text_len);
        match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx.saturating_sub(1),
        }
    }

    /// Convert a byte offset to a 1-based line/column position
    ///
    /// `text` must be the text the index was built from. Offsets that fall
    /// inside a multi-byte character count that character as consumed.
    #[must_use]
    pub fn line_col(&self, text: &str, offset: usize) -> LineCol {
        let offset = offset.min(self.text_len);
        let line = self.line_of(offset);
        let start = self.line_starts[line];
        let column = text
            .get(start..)
            .map_or(0, |rest| rest.char_indices().take_while(|(i, _)| start + i < offset).count());
        LineCol::new(line + 1, column + 1)
    }

    /// Number of lines in the text
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Byte offset of the start of a zero-based line
    #[must_use]
    pub fn line_start(&self, line: usize) -> Option<usize> {
        self.line_starts.get(line).copied()
    }

    /// Text of the line containing `offset`, without its terminator
    #[must_use]
    pub fn line_text<'t>(&self, text: &'t str, offset: usize) -> &'t str {
        let line = self.line_of(offset);
        let start = self.line_starts[line];
        let end = self
            .line_starts
            .get(line + 1)
            .copied()
            .unwrap_or(self.text_len);
        text.get(start..end)
            .unwrap_or("")
            .trim_end_matches(['\n', '\r'])
    }
}

/// One-shot conversion without building an index
#[must_use]
pub fn line_col(text: &str, offset: usize) -> LineCol {
    LineIndex::new(text).line_col(text, offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_line() {
        let text = "abc";
        let index = LineIndex::new(text);
        assert_eq!(index.line_col(text, 0), LineCol::new(1, 1));
        assert_eq!(index.line_col(text, 3), LineCol::new(1, 4));
    }

    #[test]
    fn test_mixed_line_endings() {
        let text = "a\nb\r\nc\rd";
        let index = LineIndex::new(text);
        assert_eq!(index.line_count(), 4);
        assert_eq!(index.line_col(text, 2), LineCol::new(2, 1));
        assert_eq!(index.line_col(text, 5), LineCol::new(3, 1));
        assert_eq!(index.line_col(text, 7), LineCol::new(4, 1));
        assert_eq!(index.line_text(text, 3), "b");
    }

    #[test]
    fn test_columns_count_chars() {
        let text = "é=x";
        // 'é' is two bytes; '=' starts at byte 2 and is the second character
        assert_eq!(line_col(text, 2), LineCol::new(1, 2));
    }

    #[test]
    fn test_offset_past_end_clamps() {
        let text = "ab\ncd";
        let index = LineIndex::new(text);
        assert_eq!(index.line_col(text, 99), LineCol::new(2, 3));
        assert_eq!(index.line_text(text, 99), "cd");
    }
}
