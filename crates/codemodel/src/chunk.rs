//! Row classification for embedded-language chunks.
//!
//! Hosts such as C++ sources may embed code of another language between marker lines
//! (`/*** R` … `*/`). Each row is classified from its own text and the class of the row above:
//!
//! | previous              | line matches | class        |
//! |-----------------------|--------------|--------------|
//! | `Text` / `ChunkEnd`   | begin        | `ChunkStart` |
//! | `Text` / `ChunkEnd`   | -            | `Text`       |
//! | `ChunkStart` / `Body` | end          | `ChunkEnd`   |
//! | `ChunkStart` / `Body` | -            | `ChunkBody`  |
//!
//! Classes are cached as a prefix of the buffer and recomputed lazily after edits.

use crate::buffer::TextBuffer;
use crate::delta::DocumentDelta;
use crate::error::CodeModelError;
use crate::position::Range;
use regex::Regex;

/// Classification of a row relative to embedded chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RowClass {
    /// Host-language text.
    #[default]
    Text,
    /// The chunk begin marker row.
    ChunkStart,
    /// A row inside a chunk.
    ChunkBody,
    /// The chunk end marker row.
    ChunkEnd,
}

impl RowClass {
    /// Returns `true` for rows that belong to an open chunk (start or body).
    pub fn is_inside_chunk(self) -> bool {
        matches!(self, Self::ChunkStart | Self::ChunkBody)
    }
}

/// Lazily computed row classes for one buffer.
#[derive(Debug, Clone)]
pub struct ChunkTracker {
    begin: Regex,
    end: Regex,
    classes: Vec<RowClass>,
}

impl ChunkTracker {
    /// Build a tracker from begin/end marker patterns.
    pub fn new(begin: &str, end: &str) -> Result<Self, CodeModelError> {
        Ok(Self {
            begin: Regex::new(begin).map_err(|e| CodeModelError::regex(begin, e))?,
            end: Regex::new(end).map_err(|e| CodeModelError::regex(end, e))?,
            classes: Vec::new(),
        })
    }

    /// R chunks embedded in C++ comments: `/*** R` … `*/`.
    pub fn embedded_r() -> Result<Self, CodeModelError> {
        Self::new(r"^\s*/[*]{3,}\s*[Rr]\s*$", r"^\s*[*]+/")
    }

    /// Class of a row given the class of the row above.
    pub fn transition(&self, previous: RowClass, line: &str) -> RowClass {
        if previous.is_inside_chunk() {
            if self.end.is_match(line) {
                RowClass::ChunkEnd
            } else {
                RowClass::ChunkBody
            }
        } else if self.begin.is_match(line) {
            RowClass::ChunkStart
        } else {
            RowClass::Text
        }
    }

    /// Class of `row`, classifying any rows above it that are not cached yet.
    pub fn row_class(&mut self, buffer: &dyn TextBuffer, row: usize) -> RowClass {
        if row >= buffer.line_count() {
            return RowClass::Text;
        }
        while self.classes.len() <= row {
            let next = self.classes.len();
            let previous = self.classes.last().copied().unwrap_or_default();
            let class = self.transition(previous, &buffer.line_or_empty(next));
            self.classes.push(class);
        }
        self.classes[row]
    }

    /// Drop cached classes from the first edited row on.
    pub fn on_change(&mut self, delta: &DocumentDelta) {
        self.invalidate_from(delta.range.start.row);
    }

    /// Drop cached classes for `row` and everything below it.
    pub fn invalidate_from(&mut self, row: usize) {
        self.classes.truncate(row);
    }

    /// Row of the `ChunkStart` marker of the chunk containing `row`.
    pub fn chunk_start_row(&mut self, buffer: &dyn TextBuffer, row: usize) -> Option<usize> {
        let mut current = row;
        loop {
            match self.row_class(buffer, current) {
                RowClass::ChunkStart => return Some(current),
                RowClass::ChunkBody => {}
                RowClass::ChunkEnd if current == row => {}
                _ => return None,
            }
            current = current.checked_sub(1)?;
        }
    }

    /// Row of the `ChunkEnd` marker closing the chunk that contains `row`, looking at most
    /// `max_rows` rows ahead.
    pub fn chunk_end_row(
        &mut self,
        buffer: &dyn TextBuffer,
        row: usize,
        max_rows: usize,
    ) -> Option<usize> {
        if !self.row_class(buffer, row).is_inside_chunk() {
            return None;
        }
        let last = buffer
            .line_count()
            .saturating_sub(1)
            .min(row.saturating_add(max_rows));
        (row + 1..=last).find(|&r| self.row_class(buffer, r) == RowClass::ChunkEnd)
    }

    /// Fold range of the chunk whose start or end marker is on `row`: from the end of the start
    /// marker line to the start of the end marker line.
    pub fn chunk_fold_range(
        &mut self,
        buffer: &dyn TextBuffer,
        row: usize,
        max_rows: usize,
    ) -> Option<Range> {
        let (start, end) = match self.row_class(buffer, row) {
            RowClass::ChunkStart => (row, self.chunk_end_row(buffer, row, max_rows)?),
            RowClass::ChunkEnd => (self.chunk_start_row(buffer, row)?, row),
            _ => return None,
        };
        let start_column = buffer.line_or_empty(start).chars().count();
        (end > start).then(|| Range::new(start, start_column, end, 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Document;
    use crate::position::Position;

    fn classes(tracker: &mut ChunkTracker, buffer: &dyn TextBuffer) -> Vec<RowClass> {
        (0..buffer.line_count())
            .map(|row| tracker.row_class(buffer, row))
            .collect()
    }

    #[test]
    fn test_embedded_r_chunk_classes() {
        let doc = Document::from_lines([
            "int x;",
            "/*** R",
            "x <- 1",
            "*/",
            "int y;",
        ]);
        let mut tracker = ChunkTracker::embedded_r().unwrap();
        assert_eq!(
            classes(&mut tracker, &doc),
            vec![
                RowClass::Text,
                RowClass::ChunkStart,
                RowClass::ChunkBody,
                RowClass::ChunkEnd,
                RowClass::Text,
            ]
        );
        assert_eq!(tracker.chunk_start_row(&doc, 2), Some(1));
        assert_eq!(tracker.chunk_start_row(&doc, 3), Some(1));
        assert_eq!(tracker.chunk_start_row(&doc, 4), None);
        assert_eq!(tracker.chunk_end_row(&doc, 1, 10), Some(3));
        assert_eq!(tracker.chunk_fold_range(&doc, 1, 10), Some(Range::new(1, 6, 3, 0)));
        assert_eq!(tracker.chunk_fold_range(&doc, 3, 10), Some(Range::new(1, 6, 3, 0)));
    }

    #[test]
    fn test_edits_reclassify_following_rows() {
        let mut doc = Document::from_lines(["/*** R", "a", "*/", "b"]);
        let mut tracker = ChunkTracker::embedded_r().unwrap();
        assert_eq!(tracker.row_class(&doc, 3), RowClass::Text);

        // Removing the end marker leaves the chunk open to the end of the buffer.
        for delta in doc.remove(Range::new(2, 0, 2, 2)).unwrap() {
            tracker.on_change(&delta);
        }
        assert_eq!(tracker.row_class(&doc, 3), RowClass::ChunkBody);

        for delta in doc.insert(Position::new(3, 0), "*/").unwrap() {
            tracker.on_change(&delta);
        }
        assert_eq!(tracker.row_class(&doc, 3), RowClass::ChunkEnd);
        assert_eq!(tracker.chunk_fold_range(&doc, 0, 10), Some(Range::new(0, 6, 3, 0)));
    }
}
