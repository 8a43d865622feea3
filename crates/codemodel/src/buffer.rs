//! Text buffer abstraction and a rope-backed document.
//!
//! Language modes only ever read lines through [`TextBuffer`]; the concrete [`Document`] is
//! what hosts and tests edit. Every edit on a [`Document`] returns the [`DocumentDelta`]s it
//! produced so the caller can forward them to the mode that owns the derived caches.

use crate::delta::{DeltaAction, DocumentDelta};
use crate::error::CodeModelError;
use crate::position::{Position, Range};
use ropey::Rope;
use std::borrow::Cow;

/// Read access to a line-oriented text buffer.
pub trait TextBuffer {
    /// Text of `row` without its line terminator, or `None` past the end of the buffer.
    fn line(&self, row: usize) -> Option<Cow<'_, str>>;

    /// Number of rows. An empty buffer still has one (empty) row.
    fn line_count(&self) -> usize;

    /// Text of `row`, or an empty string past the end of the buffer.
    fn line_or_empty(&self, row: usize) -> Cow<'_, str> {
        self.line(row).unwrap_or(Cow::Borrowed(""))
    }
}

impl<S: AsRef<str>> TextBuffer for Vec<S> {
    fn line(&self, row: usize) -> Option<Cow<'_, str>> {
        self.get(row).map(|s| Cow::Borrowed(s.as_ref()))
    }

    fn line_count(&self) -> usize {
        self.len().max(1)
    }
}

/// A view of another buffer with the text of one row substituted.
///
/// Used when the editor asks about a line whose new content has not been committed to the
/// buffer yet (e.g. computing the indent for the row after a split line).
pub struct LineOverride<'a> {
    inner: &'a dyn TextBuffer,
    row: usize,
    text: &'a str,
}

impl<'a> LineOverride<'a> {
    /// Substitute `text` for `row` of `inner`.
    pub fn new(inner: &'a dyn TextBuffer, row: usize, text: &'a str) -> Self {
        Self { inner, row, text }
    }
}

impl TextBuffer for LineOverride<'_> {
    fn line(&self, row: usize) -> Option<Cow<'_, str>> {
        if row == self.row && row < self.inner.line_count() {
            return Some(Cow::Borrowed(self.text));
        }
        self.inner.line(row)
    }

    fn line_count(&self) -> usize {
        self.inner.line_count()
    }
}

/// A rope-backed, `\n`-separated text document.
///
/// `\r\n` and lone `\r` are normalized to `\n` on the way in.
#[derive(Debug, Clone, Default)]
pub struct Document {
    rope: Rope,
}

impl Document {
    /// Build a document from text.
    pub fn new(text: &str) -> Self {
        Self {
            rope: Rope::from_str(&normalize_newlines(text)),
        }
    }

    /// Build a document from individual lines.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = lines
            .into_iter()
            .map(|s| s.as_ref().to_string())
            .collect::<Vec<_>>()
            .join("\n");
        Self::new(&joined)
    }

    /// Complete text.
    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    /// Length of `row` in chars, excluding the line terminator.
    pub fn line_len(&self, row: usize) -> Option<usize> {
        if row >= self.rope.len_lines() {
            return None;
        }
        let start = self.rope.line_to_char(row);
        let end = if row + 1 < self.rope.len_lines() {
            self.rope.line_to_char(row + 1) - 1
        } else {
            self.rope.len_chars()
        };
        Some(end - start)
    }

    /// Clamp `pos` to the nearest valid position.
    pub fn clip_position(&self, pos: Position) -> Position {
        let last_row = self.rope.len_lines().saturating_sub(1);
        let row = pos.row.min(last_row);
        let column = pos.column.min(self.line_len(row).unwrap_or(0));
        Position::new(row, column)
    }

    fn char_offset(&self, pos: Position) -> Result<usize, CodeModelError> {
        match self.line_len(pos.row) {
            Some(len) if pos.column <= len => Ok(self.rope.line_to_char(pos.row) + pos.column),
            _ => Err(CodeModelError::PositionOutOfRange {
                row: pos.row,
                column: pos.column,
            }),
        }
    }

    fn position_of(&self, char_offset: usize) -> Position {
        let row = self.rope.char_to_line(char_offset);
        Position::new(row, char_offset - self.rope.line_to_char(row))
    }

    /// Insert `text` at `pos`.
    pub fn insert(
        &mut self,
        pos: Position,
        text: &str,
    ) -> Result<Vec<DocumentDelta>, CodeModelError> {
        let offset = self.char_offset(pos)?;
        let text = normalize_newlines(text);
        if text.is_empty() {
            return Ok(Vec::new());
        }

        self.rope.insert(offset, &text);
        let end = self.position_of(offset + text.chars().count());
        Ok(vec![DocumentDelta::new(
            DeltaAction::InsertText,
            Range { start: pos, end },
            text,
        )])
    }

    /// Remove the text in `range`.
    pub fn remove(&mut self, range: Range) -> Result<Vec<DocumentDelta>, CodeModelError> {
        let start = self.char_offset(range.start)?;
        let end = self.char_offset(range.end)?;
        if start >= end {
            return Ok(Vec::new());
        }

        let removed = self.rope.slice(start..end).to_string();
        self.rope.remove(start..end);
        Ok(vec![DocumentDelta::new(DeltaAction::RemoveText, range, removed)])
    }

    /// Replace the text in `range` with `text`.
    pub fn replace(
        &mut self,
        range: Range,
        text: &str,
    ) -> Result<Vec<DocumentDelta>, CodeModelError> {
        // Validate both ends before mutating anything.
        self.char_offset(range.start)?;
        self.char_offset(range.end)?;

        let mut deltas = self.remove(range)?;
        deltas.extend(self.insert(range.start, text)?);
        Ok(deltas)
    }

    /// Insert whole `lines` before `row` (`row == line_count()` appends).
    pub fn insert_lines<S: AsRef<str>>(
        &mut self,
        row: usize,
        lines: &[S],
    ) -> Result<Vec<DocumentDelta>, CodeModelError> {
        let line_count = self.rope.len_lines();
        if row > line_count {
            return Err(CodeModelError::PositionOutOfRange { row, column: 0 });
        }
        if lines.is_empty() {
            return Ok(Vec::new());
        }

        let raw = lines.iter().map(|l| l.as_ref()).collect::<Vec<_>>().join("\n");
        let joined = normalize_newlines(&raw);
        let inserted_rows = joined.matches('\n').count() + 1;
        if row < line_count {
            let offset = self.rope.line_to_char(row);
            self.rope.insert(offset, &format!("{joined}\n"));
        } else {
            let offset = self.rope.len_chars();
            self.rope.insert(offset, &format!("\n{joined}"));
        }

        Ok(vec![DocumentDelta::new(
            DeltaAction::InsertLines,
            Range::new(row, 0, row + inserted_rows, 0),
            format!("{joined}\n"),
        )])
    }

    /// Remove rows `first..=last`.
    pub fn remove_lines(
        &mut self,
        first: usize,
        last: usize,
    ) -> Result<Vec<DocumentDelta>, CodeModelError> {
        let line_count = self.rope.len_lines();
        if first > last || last >= line_count {
            return Err(CodeModelError::PositionOutOfRange { row: last, column: 0 });
        }

        if first == 0 && last + 1 == line_count {
            // Removing every row leaves one empty row behind, which is a text removal.
            let end = Position::new(last, self.line_len(last).unwrap_or(0));
            return self.remove(Range {
                start: Position::new(0, 0),
                end,
            });
        }

        let (start, end) = if last + 1 < line_count {
            (self.rope.line_to_char(first), self.rope.line_to_char(last + 1))
        } else {
            (self.rope.line_to_char(first) - 1, self.rope.len_chars())
        };
        let removed = self.rope.slice(start..end).to_string();
        self.rope.remove(start..end);

        Ok(vec![DocumentDelta::new(
            DeltaAction::RemoveLines,
            Range::new(first, 0, last + 1, 0),
            removed,
        )])
    }
}

impl TextBuffer for Document {
    fn line(&self, row: usize) -> Option<Cow<'_, str>> {
        if row >= self.rope.len_lines() {
            return None;
        }
        let mut text = self.rope.line(row).to_string();
        if text.ends_with('\n') {
            text.pop();
        }
        Some(Cow::Owned(text))
    }

    fn line_count(&self) -> usize {
        self.rope.len_lines()
    }
}

fn normalize_newlines(text: &str) -> Cow<'_, str> {
    if text.contains('\r') {
        Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lines_and_lengths() {
        let doc = Document::new("a\r\nbc\n");
        assert_eq!(doc.line_count(), 3);
        assert_eq!(doc.line(0).as_deref(), Some("a"));
        assert_eq!(doc.line(1).as_deref(), Some("bc"));
        assert_eq!(doc.line(2).as_deref(), Some(""));
        assert_eq!(doc.line(3), None);
        assert_eq!(doc.line_len(1), Some(2));
        assert_eq!(doc.clip_position(Position::new(9, 9)), Position::new(2, 0));
    }

    #[test]
    fn test_insert_with_newlines_reports_end_position() {
        let mut doc = Document::new("abc");
        let deltas = doc.insert(Position::new(0, 1), "x\ny\nz").unwrap();
        assert_eq!(doc.text(), "ax\ny\nzbc");
        assert_eq!(deltas.len(), 1);
        assert_eq!(deltas[0].action, DeltaAction::InsertText);
        assert_eq!(deltas[0].range, Range::new(0, 1, 2, 1));
        assert_eq!(deltas[0].row_span(), 2);
    }

    #[test]
    fn test_remove_and_replace() {
        let mut doc = Document::from_lines(["one", "two", "three"]);
        let deltas = doc.remove(Range::new(0, 2, 1, 1)).unwrap();
        assert_eq!(doc.text(), "onwo\nthree");
        assert_eq!(deltas[0].text, "e\nt");

        let deltas = doc.replace(Range::new(1, 0, 1, 2), "TH").unwrap();
        assert_eq!(doc.text(), "onwo\nTHree");
        assert_eq!(deltas.len(), 2);
        assert_eq!(deltas[0].action, DeltaAction::RemoveText);
        assert_eq!(deltas[1].action, DeltaAction::InsertText);

        assert!(doc.insert(Position::new(5, 0), "x").is_err());
        assert!(doc.remove(Range::new(0, 0, 0, 99)).is_err());
    }

    #[test]
    fn test_insert_and_remove_lines() {
        let mut doc = Document::from_lines(["a", "b"]);
        let deltas = doc.insert_lines(1, &["x", "y"]).unwrap();
        assert_eq!(doc.text(), "a\nx\ny\nb");
        assert_eq!(deltas[0].range, Range::new(1, 0, 3, 0));

        doc.insert_lines(4, &["z"]).unwrap();
        assert_eq!(doc.text(), "a\nx\ny\nb\nz");

        let deltas = doc.remove_lines(3, 4).unwrap();
        assert_eq!(doc.text(), "a\nx\ny");
        assert_eq!(deltas[0].action, DeltaAction::RemoveLines);
        assert_eq!(deltas[0].row_span(), 2);

        let deltas = doc.remove_lines(0, 2).unwrap();
        assert_eq!(doc.text(), "");
        assert_eq!(deltas[0].action, DeltaAction::RemoveText);
    }

    #[test]
    fn test_insert_lines_normalizes_line_endings() {
        let mut doc = Document::from_lines(["a", "b"]);
        let deltas = doc.insert_lines(1, &["p\r\nq", "r\rs"]).unwrap();
        assert_eq!(doc.text(), "a\np\nq\nr\ns\nb");
        assert_eq!(doc.line_count(), 6);
        assert_eq!(deltas[0].range, Range::new(1, 0, 5, 0));
    }

    #[test]
    fn test_line_override() {
        let lines = vec!["a", "b"];
        let view = LineOverride::new(&lines, 1, "override");
        assert_eq!(view.line(0).as_deref(), Some("a"));
        assert_eq!(view.line(1).as_deref(), Some("override"));
        assert_eq!(view.line(2), None);
    }
}
