//! Function scope tree.
//!
//! The tree mirrors the brace structure of the buffer. Every `{` opens a scope; a scope is
//! labelled with the function name when the brace belongs to `name <- function(...) {`, and is
//! anonymous otherwise. The tree is built lazily from the token cache, only as far as a query
//! needs, and edits discard the scopes at and after the edit position.

use codemodel::{Position, TextBuffer, Token, TokenCache, TokenCursor};
use std::cmp::Ordering;

/// Label of the root scope.
pub const TOP_LEVEL: &str = "(Top Level)";

/// Rows parsed past a query row, so a function whose brace follows its name closely is seen.
const PARSE_AHEAD_ROWS: usize = 30;

/// A brace scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    label: Option<String>,
    start: Position,
    end: Option<Position>,
    children: Vec<Scope>,
}

impl Scope {
    fn new(label: Option<String>, start: Position) -> Self {
        Self {
            label,
            start,
            end: None,
            children: Vec::new(),
        }
    }

    /// Function name, or `None` for an anonymous block.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Where the scope starts: the function name, or the brace for anonymous blocks. Column
    /// 0 when that token starts its line.
    pub fn start(&self) -> Position {
        self.start
    }

    /// Position just past the closing brace (start of the next row when the brace ends its
    /// line), or `None` while the scope is open.
    pub fn end(&self) -> Option<Position> {
        self.end
    }

    /// Nested scopes in source order.
    pub fn children(&self) -> &[Scope] {
        &self.children
    }

    /// Ordering of `pos` relative to this scope.
    fn compare_position(&self, pos: Position) -> Ordering {
        if pos < self.start {
            Ordering::Less
        } else if self.end.is_some_and(|end| pos >= end) {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    }

    fn search(&self, pos: Position) -> Result<usize, usize> {
        self.children
            .binary_search_by(|child| child.compare_position(pos).reverse())
    }

    fn add_child(&mut self, label: Option<String>, start: Position) -> usize {
        let (Ok(index) | Err(index)) = self.search(start);
        self.children.insert(index, Scope::new(label, start));
        index
    }

    fn find_function(&self, pos: Position) -> Option<&Scope> {
        if let Ok(index) = self.search(pos)
            && let Some(found) = self.children[index].find_function(pos)
        {
            return Some(found);
        }
        self.label.is_some().then_some(self)
    }

    /// Drop the children at and after `pos` (a child containing `pos` included) and reopen
    /// this scope. Returns where parsing must resume.
    fn invalidate_from(&mut self, pos: Position) -> Position {
        let (index, resume) = match self.search(pos) {
            Ok(index) => (index, self.children[index].start),
            Err(index) => (index, pos),
        };
        self.children.truncate(index);
        self.end = None;
        resume
    }

    fn export_functions(&self, list: &mut Vec<FunctionScope>) {
        match &self.label {
            Some(label) => {
                let mut here = FunctionScope {
                    label: label.clone(),
                    start: self.start,
                    children: Vec::new(),
                };
                for child in &self.children {
                    child.export_functions(&mut here.children);
                }
                list.push(here);
            }
            None => {
                for child in &self.children {
                    child.export_functions(list);
                }
            }
        }
    }

    /// Child indices leading from this scope to its innermost open descendant.
    fn open_path(&self, path: &mut Vec<usize>) {
        if let Some(last) = self.children.len().checked_sub(1)
            && self.children[last].end.is_none()
        {
            path.push(last);
            self.children[last].open_path(path);
        }
    }

    fn at_path_mut(&mut self, path: &[usize]) -> &mut Scope {
        path.iter()
            .fold(self, |scope, &index| &mut scope.children[index])
    }
}

/// A named function in [`ScopeTree::function_tree`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionScope {
    /// Function name.
    pub label: String,
    /// Position of the name (column 0 when it starts its line).
    pub start: Position,
    /// Functions defined inside this one.
    pub children: Vec<FunctionScope>,
}

/// Incrementally built tree of brace scopes.
#[derive(Debug, Clone)]
pub struct ScopeTree {
    root: Scope,
    parse_pos: Position,
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeTree {
    /// An empty tree; nothing is parsed yet.
    pub fn new() -> Self {
        Self {
            root: Scope::new(Some(TOP_LEVEL.to_string()), Position::default()),
            parse_pos: Position::default(),
        }
    }

    /// Position up to which tokens have been consumed.
    pub fn parse_position(&self) -> Position {
        self.parse_pos
    }

    /// Forget everything parsed at or after `pos`.
    pub fn invalidate_from(&mut self, pos: Position) {
        if self.parse_pos > pos {
            self.parse_pos = self.root.invalidate_from(pos);
        }
    }

    /// Innermost function containing `pos`, or the top-level scope.
    pub fn current_function(
        &mut self,
        cache: &mut TokenCache,
        buffer: &dyn TextBuffer,
        pos: Position,
    ) -> Option<&Scope> {
        self.build_up_to_row(cache, buffer, pos.row);
        self.root.find_function(pos)
    }

    /// All named functions, nested as in the source. Anonymous blocks are flattened away.
    pub fn function_tree(
        &mut self,
        cache: &mut TokenCache,
        buffer: &dyn TextBuffer,
    ) -> Vec<FunctionScope> {
        self.build_up_to_row(cache, buffer, usize::MAX);
        let mut list = Vec::new();
        for child in &self.root.children {
            child.export_functions(&mut list);
        }
        list
    }

    fn build_up_to_row(&mut self, cache: &mut TokenCache, buffer: &dyn TextBuffer, row: usize) {
        let max_row = row
            .saturating_add(PARSE_AHEAD_ROWS)
            .min(buffer.line_count().saturating_sub(1));
        if !cache.tokenize_up_to_row(buffer, max_row) || self.parse_pos.row > max_row {
            return;
        }

        let mut path = Vec::new();
        self.root.open_path(&mut path);

        let mut cursor = TokenCursor::new(cache);
        cursor.seek_to_nearest_token(self.parse_pos);
        // The token found by the seek is only new if it starts at or after the parse position.
        let mut pending = cursor
            .current_token()
            .is_some_and(|t| t.column >= self.parse_pos.column);

        loop {
            if !pending && !cursor.move_to_next_token(max_row) {
                break;
            }
            pending = false;
            let Some(token) = cursor.current_token() else {
                break;
            };
            self.parse_pos = Position::new(cursor.row(), token.end_column());

            match token.value.as_str() {
                "{" => {
                    let mut owner = cursor;
                    let (label, at) = if find_function_name(&mut owner) {
                        (Some(owner.current_value().to_string()), owner)
                    } else {
                        (None, cursor)
                    };
                    let column = at.current_token().map_or(0, |t| t.column);
                    let mut start = Position::new(at.row(), column);
                    if at.is_first_significant_token_on_line() {
                        start.column = 0;
                    }
                    let index = self.root.at_path_mut(&path).add_child(label, start);
                    path.push(index);
                }
                "}" => {
                    if !path.is_empty() {
                        let scope = self.root.at_path_mut(&path);
                        path.pop();
                        scope.end = Some(if cursor.is_last_significant_token_on_line() {
                            Position::new(cursor.row() + 1, 0)
                        } else {
                            Position::new(cursor.row(), token.column + 1)
                        });
                    }
                }
                _ => {}
            }
        }
        tracing::trace!(parse_pos = %self.parse_pos, "scope tree built");
    }
}

fn is_assign(token: &Token) -> bool {
    token.has_type("operator") && matches!(token.value.as_str(), "=" | "<-" | "<<-")
}

/// From a `{`, move back over `name <- function(...)`, leaving the cursor on `name`.
fn find_function_name(cursor: &mut TokenCursor<'_>) -> bool {
    if cursor.current_value() != "{" || !cursor.move_backward_over_matching_parens() {
        return false;
    }
    cursor.move_to_previous_token()
        && cursor.current_token().is_some_and(|t| t.kind == "keyword" && t.is("function"))
        && cursor.move_to_previous_token()
        && cursor.current_token().is_some_and(is_assign)
        && cursor.move_to_previous_token()
        && cursor.current_has_type("identifier")
}
