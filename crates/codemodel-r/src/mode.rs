//! The R language mode: next-line indentation, brace outdent, folding and scopes.

use crate::lexer::RLexer;
use crate::scope::{FunctionScope, Scope, ScopeTree};
use codemodel::indent::{column_width, indent_to_column, leading_indent, replace_indent};
use codemodel::{
    BracketPairs, CodeModelError, Document, DocumentDelta, FoldResolver, FoldRules, FoldStyle,
    FoldWidget, LanguageConfig, LanguageMode, LexerState, LineOverride, ModeConfig, Position,
    Range, TextBuffer, TokenCache, TokenNavigator, fold::SECTION_PATTERN,
};
use regex::Regex;
use std::sync::{Arc, LazyLock};

static CLOSING_BRACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*)\}").expect("closing brace pattern"));

const CONTROL_KEYWORDS: &[&str] = &["if", "while", "for", "function"];

/// R mode state for one document.
#[derive(Debug)]
pub struct RMode {
    config: ModeConfig,
    brackets: BracketPairs,
    cache: TokenCache,
    scopes: ScopeTree,
    folds: FoldResolver,
    state_pattern: Option<Regex>,
}

impl RMode {
    /// Mode for a document of `line_count` rows.
    pub fn new(config: ModeConfig, line_count: usize) -> Result<Self, CodeModelError> {
        let lexer = Arc::new(RLexer::new()?);
        let brackets = LanguageConfig::r().brackets;
        let rules = FoldRules::new(brackets.clone())
            .with_sections(SECTION_PATTERN)?
            .with_fenced_chunks();
        Ok(Self {
            folds: FoldResolver::new(rules, config.max_fold_rows),
            cache: TokenCache::new(lexer, line_count),
            scopes: ScopeTree::new(),
            brackets,
            config,
            state_pattern: None,
        })
    }

    /// Mode for R embedded in another language: only rows whose lexer state name matches
    /// `state_pattern` are considered R.
    pub fn embedded(
        config: ModeConfig,
        line_count: usize,
        state_pattern: &str,
    ) -> Result<Self, CodeModelError> {
        let pattern =
            Regex::new(state_pattern).map_err(|e| CodeModelError::regex(state_pattern, e))?;
        let mut mode = Self::new(config, line_count)?;
        mode.cache = mode.cache.with_state_filter(pattern.clone());
        mode.state_pattern = Some(pattern);
        Ok(mode)
    }

    /// The configuration in effect.
    pub fn config(&self) -> &ModeConfig {
        &self.config
    }

    /// The token cache.
    pub fn cache(&self) -> &TokenCache {
        &self.cache
    }

    /// Token navigation over `buffer`.
    pub fn navigator<'a>(&'a mut self, buffer: &'a dyn TextBuffer) -> TokenNavigator<'a> {
        self.cache.navigator(buffer)
    }

    /// Innermost function scope containing `pos`.
    pub fn current_function(&mut self, buffer: &dyn TextBuffer, pos: Position) -> Option<&Scope> {
        self.scopes.current_function(&mut self.cache, buffer, pos)
    }

    /// Every named function in the document.
    pub fn function_tree(&mut self, buffer: &dyn TextBuffer) -> Vec<FunctionScope> {
        self.scopes.function_tree(&mut self.cache, buffer)
    }

    /// Indentation a `}` closing the brace on `row` should get.
    ///
    /// When the row (or its trailing `{`) follows `if (...)`, `while (...)`, `for (...)` or
    /// `function(...)`, that is the indentation of the keyword's row; otherwise the
    /// indentation of `row`.
    pub fn get_brace_indent(&mut self, buffer: &dyn TextBuffer, row: usize) -> String {
        let lookback = self.config.keyword_lookback_rows;
        let brackets = self.brackets.clone();
        let mut nav = self.cache.navigator(buffer);
        nav.ensure_row(row);

        // Look before the brace itself when it ends the row.
        let column = match nav.cache().significant_tokens(row).last() {
            Some(last) if last.is("{") => last.column,
            _ => buffer.line_or_empty(row).chars().count(),
        };
        if let Some(keyword_row) = control_keyword_row(&mut nav, row, column, lookback, &brackets) {
            return indent_of(buffer, keyword_row);
        }
        indent_of(buffer, row)
    }

    fn next_line_indent(
        &mut self,
        buffer: &dyn TextBuffer,
        state: &LexerState,
        line: &str,
        tab: &str,
        row: usize,
    ) -> String {
        let default_indent = leading_indent(line).to_string();
        let lookback = self.config.keyword_lookback_rows;
        let max_lookback = self.config.max_lookback_rows;
        let tab_size = self.config.tab_size;
        let brackets = self.brackets.clone();

        let mut nav = self.cache.navigator(buffer);
        if !nav.ensure_row(row) {
            return default_indent;
        }
        if let Some(pattern) = &self.state_pattern
            && !pattern.is_match(state.name())
        {
            return default_indent;
        }

        let line_len = line.chars().count();
        let prev = nav.find_previous_significant_token(
            Position::new(row, line_len),
            row.saturating_sub(lookback),
        );

        if let Some(prev) = &prev {
            let token = &prev.token;
            if token.is_paren() && token.value.ends_with(')') {
                if let Some(keyword_row) =
                    control_keyword_row(&mut nav, row, line_len, lookback, &brackets)
                {
                    tracing::trace!(row, keyword_row, "indent after control header");
                    return indent_of(buffer, keyword_row) + tab;
                }
            } else if token.kind == "keyword" && (token.is("repeat") || token.is("else")) {
                tracing::trace!(row, keyword = %token.value, "indent after keyword");
                return indent_of(buffer, prev.row) + tab;
            } else if token.has_type("operator") && !token.is_paren() {
                let continued = nav
                    .find_previous_significant_token(Position::new(prev.row, 0), 0)
                    .is_some_and(|t| t.token.has_type("operator") && !t.token.is_paren());
                tracing::trace!(row, continued, "operator continuation");
                return if continued {
                    indent_of(buffer, prev.row)
                } else {
                    indent_of(buffer, prev.row) + tab
                };
            }
        }

        let first_row = row.saturating_sub(max_lookback);
        let mut orphan =
            |stack: &[char], ch: char, _: Position| brackets.is_open(ch) && stack.is_empty();
        if let Some(open) =
            nav.walk_parens_balanced(row, first_row, Some(&mut orphan), None, &brackets)
        {
            let after = Position::new(open.row, open.column + 1);
            return match nav.find_next_significant_token(after, row) {
                None => {
                    tracing::trace!(row, %open, "block indent inside bracket");
                    indent_of(buffer, open.row) + tab
                }
                Some(next) => {
                    tracing::trace!(row, %open, "hanging indent inside bracket");
                    let text = buffer.line_or_empty(next.row);
                    let width = column_width(&text, next.column, tab_size);
                    indent_to_column(width, tab, tab_size)
                }
            };
        }

        if first_row > 0 {
            tracing::debug!(row, max_lookback, "bracket lookback exhausted; keeping indent");
            return default_indent;
        }
        nav.find_next_significant_token(Position::new(0, 0), row)
            .map_or_else(String::new, |first| indent_of(buffer, first.row))
    }
}

/// If the last significant token before `(row, column)` closes a parenthesised header of
/// `if`, `while`, `for` or `function`, the row of that keyword.
fn control_keyword_row(
    nav: &mut TokenNavigator<'_>,
    row: usize,
    column: usize,
    lookback: usize,
    brackets: &BracketPairs,
) -> Option<usize> {
    let prev = nav.find_previous_significant_token(
        Position::new(row, column),
        row.saturating_sub(lookback),
    )?;
    if !(prev.token.is_paren() && prev.token.value.ends_with(')')) {
        return None;
    }
    let mut closed = |stack: &[char], _: char, _: Position| stack.is_empty();
    let open = nav.walk_parens_balanced(
        prev.row,
        prev.row.saturating_sub(lookback),
        None,
        Some(&mut closed),
        brackets,
    )?;
    let keyword = nav.find_previous_significant_token(open, 0)?;
    (keyword.token.kind == "keyword" && CONTROL_KEYWORDS.contains(&keyword.token.value.as_str()))
        .then_some(keyword.row)
}

fn indent_of(buffer: &dyn TextBuffer, row: usize) -> String {
    leading_indent(&buffer.line_or_empty(row)).to_string()
}

impl LanguageMode for RMode {
    fn on_change(&mut self, delta: &DocumentDelta) {
        self.cache.on_change(delta);
        self.scopes.invalidate_from(delta.range.start);
    }

    fn get_next_line_indent(
        &mut self,
        buffer: &dyn TextBuffer,
        state: &LexerState,
        line: &str,
        tab: &str,
        row: usize,
    ) -> String {
        if buffer.line(row).as_deref() == Some(line) {
            return self.next_line_indent(buffer, state, line, tab, row);
        }

        // The row's new text is not in the buffer yet.
        let overridden = LineOverride::new(buffer, row, line);
        self.cache.invalidate_row(row);
        let indent = self.next_line_indent(&overridden, state, line, tab, row);
        self.cache.invalidate_row(row);
        indent
    }

    fn check_outdent(&self, _state: &LexerState, line: &str, input: &str) -> bool {
        !line.is_empty() && line.trim().is_empty() && input.trim_start().starts_with('}')
    }

    fn auto_outdent(&mut self, _state: &LexerState, doc: &mut Document, row: usize) {
        if row == 0 {
            return;
        }
        let Some(line) = doc.line(row).map(|l| l.into_owned()) else {
            return;
        };
        let Some(prefix) = CLOSING_BRACE.captures(&line).and_then(|c| c.get(1)) else {
            return;
        };
        let brace = Position::new(row, prefix.as_str().chars().count());

        let max_rows = self.config.max_lookback_rows;
        let brackets = self.brackets.clone();
        let Some(open) = self
            .cache
            .navigator(&*doc)
            .find_matching_bracket(brace, max_rows, &brackets)
        else {
            tracing::debug!(%brace, "no matching brace to outdent to");
            return;
        };
        if open.row == row {
            return;
        }

        let indent = self.get_brace_indent(&*doc, open.row);
        match replace_indent(doc, row, &indent) {
            Ok(deltas) => {
                for delta in &deltas {
                    self.on_change(delta);
                }
            }
            Err(error) => tracing::debug!(row, %error, "auto outdent failed"),
        }
    }

    fn get_fold_widget(
        &mut self,
        buffer: &dyn TextBuffer,
        style: FoldStyle,
        row: usize,
    ) -> FoldWidget {
        let mut nav = self.cache.navigator(buffer);
        self.folds.fold_widget(&mut nav, style, row)
    }

    fn get_fold_widget_range(
        &mut self,
        buffer: &dyn TextBuffer,
        style: FoldStyle,
        row: usize,
    ) -> Option<Range> {
        let mut nav = self.cache.navigator(buffer);
        self.folds.fold_widget_range(&mut nav, style, row)
    }

    fn end_state(&mut self, buffer: &dyn TextBuffer, row: usize) -> Option<LexerState> {
        self.cache.tokenize_up_to_row(buffer, row);
        self.cache.end_state(row).cloned()
    }
}
