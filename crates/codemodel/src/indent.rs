//! Indentation helpers shared by the language modes, and the [`LanguageMode`] trait through
//! which an editor talks to a mode.

use crate::buffer::{Document, TextBuffer};
use crate::delta::DocumentDelta;
use crate::error::CodeModelError;
use crate::fold::{FoldStyle, FoldWidget};
use crate::position::Range;
use crate::token::LexerState;
use unicode_width::UnicodeWidthChar;

/// Leading whitespace of `line`.
pub fn leading_indent(line: &str) -> &str {
    let end = line
        .char_indices()
        .find(|(_, c)| !matches!(c, ' ' | '\t'))
        .map_or(line.len(), |(i, _)| i);
    &line[..end]
}

/// Returns `true` if `line` is empty or whitespace only.
pub fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Display width of `text` with tabs expanded to `tab_size` stops.
pub fn display_width(text: &str, tab_size: usize) -> usize {
    let tab_size = tab_size.max(1);
    text.chars().fold(0, |width, ch| match ch {
        '\t' => (width / tab_size + 1) * tab_size,
        _ => width + ch.width().unwrap_or(0),
    })
}

/// Display width of the first `column` chars of `line`.
pub fn column_width(line: &str, column: usize, tab_size: usize) -> usize {
    let end = line
        .char_indices()
        .nth(column)
        .map_or(line.len(), |(i, _)| i);
    display_width(&line[..end], tab_size)
}

/// Whitespace reaching display column `width`: as many `tab` units as fit, then spaces.
pub fn indent_to_column(width: usize, tab: &str, tab_size: usize) -> String {
    let tab_size = tab_size.max(1);
    let units = width / tab_size;
    let mut indent = tab.repeat(units);
    indent.push_str(&" ".repeat(width - units * tab_size));
    indent
}

/// Nearest row at or above `row` that is not blank.
pub fn previous_non_blank_row(buffer: &dyn TextBuffer, row: usize) -> Option<usize> {
    let last = row.min(buffer.line_count().checked_sub(1)?);
    (0..=last).rev().find(|&r| !is_blank(&buffer.line_or_empty(r)))
}

/// Replace the leading whitespace of `row` with `indent`.
///
/// Returns the deltas produced, which the caller forwards to the mode owning the caches.
pub fn replace_indent(
    doc: &mut Document,
    row: usize,
    indent: &str,
) -> Result<Vec<DocumentDelta>, CodeModelError> {
    let line = doc
        .line(row)
        .ok_or(CodeModelError::PositionOutOfRange { row, column: 0 })?
        .into_owned();
    let current = leading_indent(&line);
    if current == indent {
        return Ok(Vec::new());
    }
    let range = Range::new(row, 0, row, current.chars().count());
    doc.replace(range, indent)
}

/// The editor-facing surface of a language mode.
///
/// A mode owns the derived per-document state (token cache, chunk classes, scope trees) and
/// must see every buffer change through [`LanguageMode::on_change`] before it is queried again.
pub trait LanguageMode {
    /// Apply a buffer change to the mode's caches.
    fn on_change(&mut self, delta: &DocumentDelta);

    /// Indentation for the row after `row`, where `line` is the (possibly uncommitted) text
    /// of `row` and `state` the lexer state at its end.
    fn get_next_line_indent(
        &mut self,
        buffer: &dyn TextBuffer,
        state: &LexerState,
        line: &str,
        tab: &str,
        row: usize,
    ) -> String;

    /// Whether typing `input` on `line` should trigger [`LanguageMode::auto_outdent`].
    fn check_outdent(&self, state: &LexerState, line: &str, input: &str) -> bool;

    /// Re-indent `row` after an outdent trigger. Only the indentation prefix is changed.
    fn auto_outdent(&mut self, state: &LexerState, doc: &mut Document, row: usize);

    /// Fold widget for `row`.
    fn get_fold_widget(
        &mut self,
        buffer: &dyn TextBuffer,
        style: FoldStyle,
        row: usize,
    ) -> FoldWidget;

    /// Fold range opened or closed by `row`.
    fn get_fold_widget_range(
        &mut self,
        buffer: &dyn TextBuffer,
        style: FoldStyle,
        row: usize,
    ) -> Option<Range>;

    /// Lexer state at the end of `row`.
    fn end_state(&mut self, buffer: &dyn TextBuffer, row: usize) -> Option<LexerState>;
}
