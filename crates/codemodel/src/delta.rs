//! Structured buffer change deltas.
//!
//! Derived per-row state (token cache, chunk classification, scope trees) is kept aligned with
//! the buffer by replaying these deltas **in the order the edits happened**, before any
//! subsequent row-indexed query. Out-of-order delivery breaks the row alignment and is not
//! detectable by the consumers.

use crate::position::Range;

/// The kind of edit a [`DocumentDelta`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeltaAction {
    /// Whole lines were inserted before `range.start.row`.
    ///
    /// `range` is `(start.row, 0)..(start.row + count, 0)`.
    InsertLines,
    /// Text (possibly containing newlines) was inserted at `range.start`.
    InsertText,
    /// Whole lines `range.start.row..range.end.row` were removed.
    RemoveLines,
    /// Text (possibly containing newlines) spanning `range` was removed.
    RemoveText,
}

/// A single buffer edit.
///
/// Semantics:
/// - `range` is expressed in the coordinates of the buffer **at the time of the edit**: for
///   inserts it spans the inserted text in the post-edit buffer, for removals it spans the
///   removed text in the pre-edit buffer.
/// - `text` is the exact inserted or removed text (joined with `\n` for line actions).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentDelta {
    /// What happened.
    pub action: DeltaAction,
    /// Affected range.
    pub range: Range,
    /// Inserted or removed text.
    pub text: String,
}

impl DocumentDelta {
    /// Create a delta.
    pub fn new(action: DeltaAction, range: Range, text: impl Into<String>) -> Self {
        Self {
            action,
            range,
            text: text.into(),
        }
    }

    /// Number of rows between start and end of the range.
    ///
    /// For text actions this equals the number of newlines in `text`; for line actions it is
    /// the number of lines inserted or removed.
    pub fn row_span(&self) -> usize {
        self.range.end.row.saturating_sub(self.range.start.row)
    }

    /// Returns `true` for the two insert actions.
    pub fn is_insert(&self) -> bool {
        matches!(self.action, DeltaAction::InsertLines | DeltaAction::InsertText)
    }
}
