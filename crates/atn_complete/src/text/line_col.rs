//! Byte offset to line/column conversion for lexical error reports.

use crate::text::TextSize;

/// Zero-based line and column (column counted in UTF-8 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineCol {
    pub line: u32,
    pub column: u32,
}

impl LineCol {
    #[must_use]
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// Line start table for repeated offset lookups.
///
/// Recognizes `\n`, `\r\n` and a lone `\r` as line terminators.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<TextSize>,
    text_len: TextSize,
}

impl LineIndex {
    /// Scan `text` once and record where every line begins.
    ///
    /// ```rust
    /// use atn_complete::text::{LineIndex, TextSize};
    ///
    /// let index = LineIndex::new("let a\nlet b");
    /// assert_eq!(index.line_col(TextSize::new(8)).line, 1);
    /// ```
    #[must_use]
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![TextSize::zero()];
        let bytes = text.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'\n' => {
                    i += 1;
                    line_starts.push(TextSize::of_index(i));
                }
                b'\r' => {
                    i += if bytes.get(i + 1) == Some(&b'\n') { 2 } else { 1 };
                    line_starts.push(TextSize::of_index(i));
                }
                _ => i += 1,
            }
        }

        Self {
            line_starts,
            text_len: TextSize::of_index(text.len()),
        }
    }

    /// Position of `offset`; offsets past the end clamp to the end of the text.
    #[must_use]
    pub fn line_col(&self, offset: TextSize) -> LineCol {
        let offset = offset.min(self.text_len);
        let line = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx.saturating_sub(1),
        };
        let column = offset.get().saturating_sub(self.line_starts[line].get());

        LineCol {
            line: u32::try_from(line).unwrap_or(u32::MAX),
            column,
        }
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}
