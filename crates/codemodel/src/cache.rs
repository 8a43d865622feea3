//! Per-row token cache with incremental revalidation.
//!
//! The cache keeps, for every row of the buffer, the row's tokens and the lexer state at the
//! end of the row. Edits only mark rows dirty; tokens are recomputed lazily by
//! [`TokenCache::tokenize_up_to_row`], which re-tokenizes dirty rows and keeps going only
//! while the exit state differs from the one previously recorded for that row. Since a row's
//! tokens are a function of `(text, entry state)`, once the exit state re-converges every
//! following clean row is known to be correct.
//!
//! # Row bookkeeping
//!
//! - `tokens[row] == None` marks a dirty row.
//! - `end_states[row]` is the state that row `row + 1`'s cached tokens were computed with.
//!   Invalidating a row keeps that state as the convergence baseline; edits that merge or
//!   split rows move it onto the row that now precedes the first untouched row.
//!
//! Both vectors always have the same length, equal to the buffer's row count as long as every
//! buffer change is forwarded to [`TokenCache::on_change`] in order.

use crate::buffer::TextBuffer;
use crate::delta::{DeltaAction, DocumentDelta};
use crate::navigation::TokenNavigator;
use crate::token::{LexerState, LineTokens, Token, significant_tokens};
use crate::tokenizer::Tokenizer;
use regex::Regex;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct CachedRow {
    all: Vec<Token>,
    significant: Vec<Token>,
}

impl CachedRow {
    fn new(tokens: Vec<Token>) -> Self {
        let significant = significant_tokens(&tokens);
        Self {
            all: tokens,
            significant,
        }
    }
}

/// Token cache for one document, owned by one language mode instance.
#[derive(Clone)]
pub struct TokenCache {
    tokenizer: Arc<dyn Tokenizer>,
    state_filter: Option<Regex>,
    tokens: Vec<Option<CachedRow>>,
    end_states: Vec<Option<LexerState>>,
}

impl fmt::Debug for TokenCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCache")
            .field("rows", &self.tokens.len())
            .field(
                "dirty_rows",
                &self.tokens.iter().filter(|t| t.is_none()).count(),
            )
            .field("state_filter", &self.state_filter.as_ref().map(Regex::as_str))
            .finish()
    }
}

impl TokenCache {
    /// Create an empty (all-dirty) cache sized for `line_count` rows.
    pub fn new(tokenizer: Arc<dyn Tokenizer>, line_count: usize) -> Self {
        Self {
            tokenizer,
            state_filter: None,
            tokens: vec![None; line_count],
            end_states: vec![None; line_count],
        }
    }

    /// Only keep tokens for rows whose exit state name matches `filter`.
    ///
    /// Rows in other states are cached with no tokens, so embedded-language modes only see
    /// the rows that belong to their language.
    pub fn with_state_filter(mut self, filter: Regex) -> Self {
        self.state_filter = Some(filter);
        self
    }

    /// The tokenizer this cache drives.
    pub fn tokenizer(&self) -> &Arc<dyn Tokenizer> {
        &self.tokenizer
    }

    /// Number of rows tracked.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Returns `true` if no rows are tracked.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Drop everything and resize for a new buffer of `line_count` rows.
    pub fn reset(&mut self, line_count: usize) {
        self.tokens = vec![None; line_count];
        self.end_states = vec![None; line_count];
    }

    /// Returns `true` if `row` holds up-to-date tokens.
    pub fn is_row_valid(&self, row: usize) -> bool {
        self.tokens.get(row).is_some_and(Option::is_some)
    }

    /// All tokens of a clean row.
    pub fn row_tokens(&self, row: usize) -> Option<&[Token]> {
        self.tokens.get(row)?.as_ref().map(|r| r.all.as_slice())
    }

    /// Significant tokens of a row: no whitespace or comments, brackets split per character.
    ///
    /// Dirty or out-of-range rows yield an empty slice.
    pub fn significant_tokens(&self, row: usize) -> &[Token] {
        self.tokens
            .get(row)
            .and_then(Option::as_ref)
            .map_or(&[], |r| r.significant.as_slice())
    }

    /// Exit state of a clean row.
    pub fn end_state(&self, row: usize) -> Option<&LexerState> {
        if !self.is_row_valid(row) {
            return None;
        }
        self.end_states.get(row)?.as_ref()
    }

    /// Borrow the cache together with `buffer` for token navigation.
    pub fn navigator<'a>(&'a mut self, buffer: &'a dyn TextBuffer) -> TokenNavigator<'a> {
        TokenNavigator::new(self, buffer)
    }

    /// Bring rows `0..=last_row` up to date with `buffer`.
    ///
    /// `last_row` is clamped to the last row. Returns `false` only for an empty cache.
    pub fn tokenize_up_to_row(&mut self, buffer: &dyn TextBuffer, last_row: usize) -> bool {
        let line_count = buffer.line_count();
        if self.tokens.len() != line_count {
            tracing::debug!(
                cached = self.tokens.len(),
                line_count,
                "token cache length differs from buffer; resizing"
            );
            self.tokens.resize(line_count, None);
            self.end_states.resize(line_count, None);
        }
        if self.tokens.is_empty() {
            return false;
        }

        let last_row = last_row.min(self.tokens.len() - 1);
        let mut assume_good = true;
        let mut retokenized = 0usize;
        let mut row = 0usize;

        while row <= last_row {
            if assume_good && self.tokens[row].is_some() {
                row += 1;
                continue;
            }
            assume_good = false;

            let entry = match row {
                0 => self.tokenizer.initial_state(),
                _ => self.end_states[row - 1]
                    .clone()
                    .unwrap_or_else(|| self.tokenizer.initial_state()),
            };
            let line = buffer.line_or_empty(row);
            let LineTokens { tokens, state } = self.tokenizer.tokenize_line(&line, &entry);
            retokenized += 1;

            let keep = self
                .state_filter
                .as_ref()
                .is_none_or(|filter| filter.is_match(state.name()));
            self.tokens[row] = Some(if keep {
                CachedRow::new(tokens)
            } else {
                CachedRow::default()
            });

            if self.end_states[row].as_ref() == Some(&state) {
                // Converged: the following clean rows were tokenized from this same state.
                assume_good = true;
            } else {
                self.end_states[row] = Some(state);
            }
            row += 1;
        }

        if !assume_good && row < self.tokens.len() {
            // The scan stopped before re-converging; the next row's entry state changed.
            self.tokens[row] = None;
        }

        if retokenized > 0 {
            tracing::trace!(last_row, retokenized, "tokenize_up_to_row");
        }
        true
    }

    /// Mark `row` dirty.
    pub fn invalidate_row(&mut self, row: usize) {
        if let Some(slot) = self.tokens.get_mut(row) {
            *slot = None;
        }
    }

    /// Insert `count` dirty rows before `row`.
    pub fn insert_rows(&mut self, row: usize, count: usize) {
        let row = row.min(self.tokens.len());
        self.tokens.splice(row..row, std::iter::repeat_n(None, count));
        self.end_states.splice(row..row, std::iter::repeat_n(None, count));
    }

    /// Remove `count` rows starting at `row`; the row that moves into `row` is marked dirty.
    pub fn remove_rows(&mut self, row: usize, count: usize) {
        self.splice_out(row, count);
        self.invalidate_row(row);
    }

    fn splice_out(&mut self, row: usize, count: usize) {
        let start = row.min(self.tokens.len());
        let end = row.saturating_add(count).min(self.tokens.len());
        self.tokens.drain(start..end);
        self.end_states.drain(start..end);
    }

    /// Apply a buffer change. Must be called for every change, in order, before any query.
    pub fn on_change(&mut self, delta: &DocumentDelta) {
        let start = delta.range.start.row;
        let span = delta.row_span();

        match delta.action {
            DeltaAction::InsertLines => {
                self.invalidate_row(start);
                self.insert_rows(start, span);
            }
            DeltaAction::InsertText if span == 0 => self.invalidate_row(start),
            DeltaAction::InsertText => {
                // Row `start` is split; the old exit state now belongs to the last new row.
                let baseline = self.end_states.get(start).cloned().flatten();
                self.invalidate_row(start);
                if let Some(state) = self.end_states.get_mut(start) {
                    *state = None;
                }
                self.insert_rows(start + 1, span);
                if let Some(state) = self.end_states.get_mut(start + span) {
                    *state = baseline;
                }
            }
            DeltaAction::RemoveLines => {
                self.remove_rows(start, span);
                self.invalidate_row(start);
            }
            DeltaAction::RemoveText if span == 0 => self.invalidate_row(start),
            DeltaAction::RemoveText => {
                // Rows `start..=start + span` merge; keep the exit state of the last one.
                let baseline = self.end_states.get(start + span).cloned().flatten();
                self.splice_out(start + 1, span);
                if let Some(state) = self.end_states.get_mut(start) {
                    *state = baseline;
                }
                self.invalidate_row(start);
            }
        }

        tracing::trace!(
            action = ?delta.action,
            row = start,
            span,
            rows = self.tokens.len(),
            "token cache change"
        );
    }
}
