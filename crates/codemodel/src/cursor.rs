//! A cursor over significant tokens.
//!
//! [`TokenCursor`] walks the significant tokens cached in a [`TokenCache`] one token at a time,
//! crossing row boundaries. It only reads the cache: callers tokenize far enough first
//! (usually through [`crate::TokenNavigator::ensure_row`]).

use crate::cache::TokenCache;
use crate::position::Position;
use crate::token::Token;

fn complement(value: &str) -> Option<&'static str> {
    Some(match value {
        "(" => ")",
        ")" => "(",
        "[" => "]",
        "]" => "[",
        "{" => "}",
        "}" => "{",
        "<" => ">",
        ">" => "<",
        _ => return None,
    })
}

/// Cursor over the significant tokens of a cache, addressed by `(row, offset)`.
#[derive(Debug, Clone, Copy)]
pub struct TokenCursor<'a> {
    cache: &'a TokenCache,
    row: usize,
    offset: usize,
}

impl<'a> TokenCursor<'a> {
    /// A cursor on the first token of row 0.
    pub fn new(cache: &'a TokenCache) -> Self {
        Self::at(cache, 0, 0)
    }

    /// A cursor on token `offset` of `row`.
    pub fn at(cache: &'a TokenCache, row: usize, offset: usize) -> Self {
        Self { cache, row, offset }
    }

    fn row_len(&self, row: usize) -> usize {
        self.cache.significant_tokens(row).len()
    }

    /// Current row.
    pub fn row(&self) -> usize {
        self.row
    }

    /// Index of the current token within its row.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Move to the start of `row`.
    pub fn move_to_start_of_row(&mut self, row: usize) {
        self.row = row;
        self.offset = 0;
    }

    /// Move to the last token of `row`; `false` if the row has no significant tokens.
    pub fn move_to_end_of_row(&mut self, row: usize) -> bool {
        self.row = row;
        match self.row_len(row) {
            0 => {
                self.offset = 0;
                false
            }
            len => {
                self.offset = len - 1;
                true
            }
        }
    }

    /// Step to the previous token, skipping empty rows. The cursor is unchanged on failure.
    pub fn move_to_previous_token(&mut self) -> bool {
        let (mut row, mut offset) = (self.row, self.offset.min(self.row_len(self.row)));
        while offset == 0 && row > 0 {
            row -= 1;
            offset = self.row_len(row);
        }
        if offset == 0 {
            return false;
        }
        self.row = row;
        self.offset = offset - 1;
        true
    }

    /// Step to the next token, not going past `max_row`. The cursor is unchanged on failure.
    pub fn move_to_next_token(&mut self, max_row: usize) -> bool {
        if self.cache.is_empty() || self.row > max_row {
            return false;
        }
        let max_row = max_row.min(self.cache.len() - 1);
        let (mut row, mut offset) = (self.row, self.offset + 1);
        while offset >= self.row_len(row) && row < max_row {
            row += 1;
            offset = 0;
        }
        if offset >= self.row_len(row) {
            return false;
        }
        self.row = row;
        self.offset = offset;
        true
    }

    /// Put the cursor on the first token of `pos.row` that ends at or after `pos.column`.
    ///
    /// If no such token exists the cursor sits just past the row's last token, where
    /// [`TokenCursor::current_token`] is `None` and the next move goes to the following row.
    pub fn seek_to_nearest_token(&mut self, pos: Position) {
        self.row = pos.row;
        let tokens = self.cache.significant_tokens(pos.row);
        self.offset = tokens
            .iter()
            .position(|t| t.end_column() >= pos.column)
            .unwrap_or(tokens.len());
    }

    /// Advance until `predicate` accepts the current token, not going past `max_row`.
    pub fn find_token<P>(&mut self, mut predicate: P, max_row: usize) -> Option<&'a Token>
    where
        P: FnMut(&Token) -> bool,
    {
        loop {
            if let Some(token) = self.current_token()
                && predicate(token)
            {
                return Some(token);
            }
            if !self.move_to_next_token(max_row) {
                return None;
            }
        }
    }

    /// The token under the cursor.
    pub fn current_token(&self) -> Option<&'a Token> {
        self.cache.significant_tokens(self.row).get(self.offset)
    }

    /// Value of the current token, or `""`.
    pub fn current_value(&self) -> &'a str {
        self.current_token().map_or("", |t| t.value.as_str())
    }

    /// Type of the current token, or `""`.
    pub fn current_type(&self) -> &'a str {
        self.current_token().map_or("", |t| t.kind.as_str())
    }

    /// Returns `true` if the current token's type has the dotted segment `part`.
    pub fn current_has_type(&self, part: &str) -> bool {
        self.current_token().is_some_and(|t| t.has_type(part))
    }

    /// Start position of the current token.
    pub fn current_position(&self) -> Option<Position> {
        self.current_token()
            .map(|t| Position::new(self.row, t.column))
    }

    /// Returns `true` if the cursor is on the first significant token of its row.
    pub fn is_first_significant_token_on_line(&self) -> bool {
        self.offset == 0
    }

    /// Returns `true` if the cursor is on the last significant token of its row.
    pub fn is_last_significant_token_on_line(&self) -> bool {
        self.offset + 1 == self.row_len(self.row)
    }

    /// A copy of the cursor moved one token back, or `None` at the start of the buffer.
    pub fn peek_back(&self) -> Option<Self> {
        let mut clone = *self;
        clone.move_to_previous_token().then_some(clone)
    }

    /// A copy of the cursor moved one token forward (up to `max_row`).
    pub fn peek_fwd(&self, max_row: usize) -> Option<Self> {
        let mut clone = *self;
        clone.move_to_next_token(max_row).then_some(clone)
    }

    /// From a closing bracket, move back to its opener. The cursor is unchanged on failure.
    pub fn bwd_to_matching_token(&mut self) -> bool {
        let this = self.current_value();
        let Some(target) = complement(this) else {
            return false;
        };
        let saved = *self;
        let mut depth = 0usize;
        while self.move_to_previous_token() {
            let value = self.current_value();
            if value == target {
                if depth == 0 {
                    return true;
                }
                depth -= 1;
            } else if value == this {
                depth += 1;
            }
        }
        *self = saved;
        false
    }

    /// From an opening bracket, move forward to its closer (up to `max_row`). The cursor is
    /// unchanged on failure.
    pub fn fwd_to_matching_token(&mut self, max_row: usize) -> bool {
        let this = self.current_value();
        let Some(target) = complement(this) else {
            return false;
        };
        let saved = *self;
        let mut depth = 0usize;
        while self.move_to_next_token(max_row) {
            let value = self.current_value();
            if value == target {
                if depth == 0 {
                    return true;
                }
                depth -= 1;
            } else if value == this {
                depth += 1;
            }
        }
        *self = saved;
        false
    }

    /// If the previous token is `)`, move onto its matching `(`.
    ///
    /// Returns `false` (cursor unchanged) when the previous token is not `)` or has no match.
    pub fn move_backward_over_matching_parens(&mut self) -> bool {
        let saved = *self;
        if self.move_to_previous_token()
            && self.current_value() == ")"
            && self.bwd_to_matching_token()
        {
            return true;
        }
        *self = saved;
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::{RuleTokenizer, TokenRule};
    use std::sync::Arc;

    fn tokenized(lines: &[&str]) -> TokenCache {
        let lexer = RuleTokenizer::builder()
            .state(
                "start",
                vec![
                    TokenRule::new(r"//.*", "comment").unwrap(),
                    TokenRule::new(r"\b(?:class|public|const)\b", "keyword").unwrap(),
                    TokenRule::new(r"[A-Za-z_]\w*", "identifier").unwrap(),
                    TokenRule::new(r"\d+", "constant.numeric").unwrap(),
                    TokenRule::new(r"[(){}\[\]]", "paren").unwrap(),
                    TokenRule::new(r"::|[:,<>=;]", "keyword.operator").unwrap(),
                    TokenRule::new(r"\s+", "text").unwrap(),
                ],
            )
            .build()
            .unwrap();
        let buffer: Vec<&str> = lines.to_vec();
        let mut cache = TokenCache::new(Arc::new(lexer), buffer.len());
        cache.tokenize_up_to_row(&buffer, usize::MAX);
        cache
    }

    #[test]
    fn test_moves_across_empty_rows() {
        let cache = tokenized(&["a b", "", "// note", "c"]);
        let mut cursor = TokenCursor::at(&cache, 3, 0);
        assert!(cursor.move_to_previous_token());
        assert_eq!((cursor.row(), cursor.current_value()), (0, "b"));
        assert!(cursor.is_last_significant_token_on_line());

        assert!(cursor.move_to_next_token(3));
        assert_eq!((cursor.row(), cursor.current_value()), (3, "c"));
        assert!(!cursor.move_to_next_token(3));
        assert_eq!(cursor.current_value(), "c");

        let mut start = TokenCursor::new(&cache);
        assert!(!start.move_to_previous_token());
        assert_eq!(start.current_value(), "a");
    }

    #[test]
    fn test_seek_and_find() {
        let cache = tokenized(&["x = f(y, z)", "w"]);
        let mut cursor = TokenCursor::new(&cache);
        cursor.seek_to_nearest_token(Position::new(0, 5));
        assert_eq!(cursor.current_value(), "f");

        let found = cursor.find_token(|t| t.has_type("identifier") && t.value == "w", 1);
        assert_eq!(found.map(|t| t.value.as_str()), Some("w"));
        assert_eq!(cursor.current_position(), Some(Position::new(1, 0)));
    }

    #[test]
    fn test_matching_tokens() {
        let cache = tokenized(&["class A : public B<C<int>> {", "  f(g(1), (2)) {}", "}"]);

        let mut cursor = TokenCursor::at(&cache, 0, 10);
        assert_eq!(cursor.current_value(), ">");
        assert!(cursor.bwd_to_matching_token());
        assert_eq!(cursor.current_position(), Some(Position::new(0, 18)));

        let mut brace = TokenCursor::at(&cache, 0, 11);
        assert_eq!(brace.current_value(), "{");
        assert!(brace.fwd_to_matching_token(2));
        assert_eq!(brace.current_position(), Some(Position::new(2, 0)));

        let mut inner = TokenCursor::at(&cache, 1, 11);
        assert_eq!(inner.current_value(), "{");
        assert!(inner.move_backward_over_matching_parens());
        assert_eq!(inner.current_position(), Some(Position::new(1, 3)));
        assert!(!inner.move_backward_over_matching_parens());
        assert_eq!(inner.peek_back().map(|c| c.current_value()), Some("f"));
    }
}
