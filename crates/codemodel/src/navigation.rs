//! Token navigation over a [`TokenCache`].
//!
//! Every query tokenizes lazily: a [`TokenNavigator`] holds the cache mutably together with the
//! buffer it mirrors, and brings the cache up to date as far as the query needs before looking
//! at any row.

use crate::buffer::TextBuffer;
use crate::cache::TokenCache;
use crate::position::Position;
use crate::token::Token;
use codemodel_lang::BracketPairs;

/// A token located in the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundToken {
    /// The token itself.
    pub token: Token,
    /// Row the token is on.
    pub row: usize,
    /// Column of interest: the token start, or the query column if it lies inside the token.
    pub column: usize,
    /// Index of the token within its row (significant tokens for the `find_*` queries).
    pub index: usize,
}

impl FoundToken {
    /// Position of [`FoundToken::column`] on [`FoundToken::row`].
    pub fn position(&self) -> Position {
        Position::new(self.row, self.column)
    }
}

/// Hook called during [`TokenNavigator::walk_parens_balanced`] with the current stack of
/// unmatched brackets, the bracket just seen and its position. Returning `true` stops the walk
/// at that position.
pub type ParenHook<'h> = &'h mut dyn FnMut(&[char], char, Position) -> bool;

/// Token queries bound to one cache and its buffer.
pub struct TokenNavigator<'a> {
    cache: &'a mut TokenCache,
    buffer: &'a dyn TextBuffer,
}

impl<'a> TokenNavigator<'a> {
    /// Bind `cache` to `buffer`.
    pub fn new(cache: &'a mut TokenCache, buffer: &'a dyn TextBuffer) -> Self {
        Self { cache, buffer }
    }

    /// The underlying cache.
    pub fn cache(&self) -> &TokenCache {
        self.cache
    }

    /// The buffer being navigated.
    pub fn buffer(&self) -> &'a dyn TextBuffer {
        self.buffer
    }

    /// Tokenize up to `row`; `false` if there is nothing to tokenize.
    pub fn ensure_row(&mut self, row: usize) -> bool {
        self.cache.tokenize_up_to_row(self.buffer, row)
    }

    /// The token (among all tokens, whitespace included) covering `pos`.
    ///
    /// `head_inclusive` accepts a position on the token's first column, `tail_inclusive` one
    /// just past its last column.
    pub fn get_token_for_pos(
        &mut self,
        pos: Position,
        head_inclusive: bool,
        tail_inclusive: bool,
    ) -> Option<FoundToken> {
        self.ensure_row(pos.row);
        let tokens = self.cache.row_tokens(pos.row)?;

        tokens.iter().enumerate().find_map(|(index, token)| {
            let after_head = if head_inclusive {
                pos.column >= token.column
            } else {
                pos.column > token.column
            };
            let before_tail = if tail_inclusive {
                pos.column <= token.end_column()
            } else {
                pos.column < token.end_column()
            };
            (after_head && before_tail).then(|| FoundToken {
                token: token.clone(),
                row: pos.row,
                column: token.column,
                index,
            })
        })
    }

    /// First significant token ending after `pos`, scanning forward no further than `last_row`.
    pub fn find_next_significant_token(
        &mut self,
        pos: Position,
        last_row: usize,
    ) -> Option<FoundToken> {
        if !self.ensure_row(last_row) {
            return None;
        }
        let last_row = last_row.min(self.cache.len() - 1);

        let mut column = pos.column;
        for row in pos.row..=last_row {
            let found = self
                .cache
                .significant_tokens(row)
                .iter()
                .enumerate()
                .find(|(_, t)| t.end_column() > column);
            if let Some((index, token)) = found {
                return Some(FoundToken {
                    token: token.clone(),
                    row,
                    column: token.column.max(column),
                    index,
                });
            }
            // Past the first row any token will do.
            column = 0;
        }
        None
    }

    /// Last significant token starting before `pos`, scanning backward no further than
    /// `first_row`. On rows above `pos.row` the last token of the row is returned.
    pub fn find_previous_significant_token(
        &mut self,
        pos: Position,
        first_row: usize,
    ) -> Option<FoundToken> {
        if !self.ensure_row(pos.row) {
            return None;
        }
        let start_row = pos.row.min(self.cache.len() - 1);
        if first_row > start_row {
            return None;
        }

        for row in (first_row..=start_row).rev() {
            let tokens = self.cache.significant_tokens(row);
            let found = if row == pos.row {
                tokens
                    .iter()
                    .enumerate()
                    .rev()
                    .find(|(_, t)| t.column < pos.column)
            } else {
                tokens.iter().enumerate().next_back()
            };
            if let Some((index, token)) = found {
                return Some(FoundToken {
                    token: token.clone(),
                    row,
                    column: token.column,
                    index,
                });
            }
        }
        None
    }

    /// Visit every bracket character between `start_row` and `end_row` (both inclusive).
    ///
    /// The walk goes forward when `start_row < end_row`, backward otherwise (right to left
    /// within a row). `visitor` returns `false` to stop; the return value is `false` iff the
    /// walk was stopped.
    pub fn walk_parens<F>(&mut self, start_row: usize, end_row: usize, visitor: F) -> bool
    where
        F: FnMut(char, Position) -> bool,
    {
        self.visit_brackets(start_row, end_row, start_row < end_row, visitor)
    }

    fn visit_brackets<F>(
        &mut self,
        start_row: usize,
        end_row: usize,
        forward: bool,
        mut visitor: F,
    ) -> bool
    where
        F: FnMut(char, Position) -> bool,
    {
        if !self.ensure_row(start_row.max(end_row)) {
            return true;
        }
        let last = self.cache.len() - 1;

        let mut visit_row = |cache: &TokenCache, row: usize| -> bool {
            let mut brackets = cache
                .significant_tokens(row)
                .iter()
                .filter(|t| t.is_paren())
                .filter_map(|t| t.value.chars().next().map(|ch| (ch, t.column)));
            if forward {
                brackets.all(|(ch, column)| visitor(ch, Position::new(row, column)))
            } else {
                brackets
                    .rev()
                    .all(|(ch, column)| visitor(ch, Position::new(row, column)))
            }
        };

        if forward {
            (start_row..=end_row.min(last)).all(|row| visit_row(self.cache, row))
        } else {
            (end_row..=start_row.min(last))
                .rev()
                .all(|row| visit_row(self.cache, row))
        }
    }

    /// Walk brackets between two rows while tracking nesting.
    ///
    /// Walking backward, closers are pushed and an opener pops its complement; an opener with
    /// nothing to pop is only seen by `pre_match`, with an empty stack. Walking forward the
    /// roles swap. `pre_match` runs before the stack is updated, `post_match` after; the
    /// position at which either returns `true` is the result. A bracket that meets a
    /// non-complementary bracket on the stack aborts the walk with `None`.
    pub fn walk_parens_balanced(
        &mut self,
        start_row: usize,
        end_row: usize,
        mut pre_match: Option<ParenHook<'_>>,
        mut post_match: Option<ParenHook<'_>>,
        complements: &BracketPairs,
    ) -> Option<Position> {
        let backward = start_row >= end_row;
        let mut stack: Vec<char> = Vec::new();
        let mut result = None;

        self.walk_parens(start_row, end_row, |ch, pos| {
            if let Some(hook) = pre_match.as_mut()
                && hook(stack.as_slice(), ch, pos)
            {
                result = Some(pos);
                return false;
            }

            let (pushes, pops) = if backward {
                (complements.is_close(ch), complements.is_open(ch))
            } else {
                (complements.is_open(ch), complements.is_close(ch))
            };
            if pushes {
                stack.push(ch);
            } else if pops {
                match stack.last() {
                    Some(&top) if complements.complement(ch) == Some(top) => {
                        stack.pop();
                    }
                    Some(_) => return false,
                    None => return true,
                }
            } else {
                return true;
            }

            if let Some(hook) = post_match.as_mut()
                && hook(stack.as_slice(), ch, pos)
            {
                result = Some(pos);
                return false;
            }
            true
        });

        result
    }

    /// Position of the bracket matching the one at `pos`, searching at most `max_rows` rows
    /// away. Mismatched bracket types report no match.
    pub fn find_matching_bracket(
        &mut self,
        pos: Position,
        max_rows: usize,
        complements: &BracketPairs,
    ) -> Option<Position> {
        let found = self.get_token_for_pos(pos, true, false)?;
        if !found.token.is_paren() {
            return None;
        }
        let ch = found
            .token
            .value
            .chars()
            .nth(pos.column - found.token.column)?;

        let forward = if complements.is_open(ch) {
            true
        } else if complements.is_close(ch) {
            false
        } else {
            return None;
        };

        let end_row = if forward {
            pos.row.saturating_add(max_rows)
        } else {
            pos.row.saturating_sub(max_rows)
        };
        let mut stack = vec![ch];
        let mut matched = None;
        let mut seen_start = false;
        self.visit_brackets(pos.row, end_row, forward, |next, at| {
            if !seen_start {
                // Skip brackets on the start row up to and including the one at `pos`.
                if at == pos {
                    seen_start = true;
                }
                return true;
            }
            let (pushes, pops) = if forward {
                (complements.is_open(next), complements.is_close(next))
            } else {
                (complements.is_close(next), complements.is_open(next))
            };
            if pushes {
                stack.push(next);
            } else if pops {
                match stack.pop() {
                    Some(top) if complements.complement(next) == Some(top) => {
                        if stack.is_empty() {
                            matched = Some(at);
                            return false;
                        }
                    }
                    _ => return false,
                }
            }
            true
        });

        if matched.is_none() {
            tracing::trace!(%pos, "no matching bracket");
        }
        matched
    }
}
