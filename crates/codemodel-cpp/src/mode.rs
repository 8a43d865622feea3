//! The C/C++ language mode.

use crate::lexer::CppLexer;
use crate::lookaround::{
    Direction, NakedIndent, ends_with_continuation, find_enclosing_row,
    find_matching_bracket_row, find_start_of_comment_block, indent_naked_tokens,
    is_digit_separator, line_sans_comments, row_for_open_brace_indent,
};
use codemodel::indent::{
    column_width, indent_to_column, is_blank, leading_indent, previous_non_blank_row,
    replace_indent,
};
use codemodel::{
    ChunkTracker, CodeModelError, Document, DocumentDelta, FoldResolver, FoldRules, FoldStyle,
    FoldWidget, LanguageConfig, LanguageMode, LexerState, LineOverride, ModeConfig, Position,
    Range, RowClass, TextBuffer, TokenCache,
};
use regex::Regex;
use std::sync::{Arc, LazyLock};

static COMMENT_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*/\*").expect("comment open pattern"));
static COMMENT_BODY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\*").expect("comment body pattern"));
static COMMENT_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*/\s*$").expect("comment close pattern"));
static ACCESS_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:(?:public|private|protected)(?:\s+slots)?|signals|slots)\s*:\s*$")
        .expect("access label pattern")
});
static CASE_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:case\b[^:]*[^:\s]|default)\s*:\s*$").expect("case label pattern")
});
static CONDITIONAL_HEAD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:else\s+)?(?:if|for|while)\b").expect("conditional head pattern")
});
static IF_HEAD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:\}\s*)?(?:else\s+)?if\b").expect("if head pattern")
});
static MACRO_DEFINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*#\s*define\b").expect("define pattern"));
static PREPROCESSOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*#").expect("preprocessor pattern"));
static ELSE_TYPED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*else$").expect("else pattern"));

/// What a row starts with, for outdenting.
#[derive(Debug, Clone, Copy)]
enum OutdentTrigger {
    CloseBrace(usize),
    CloseBracket(usize),
    CloseAngle,
    AccessLabel,
    CaseLabel,
    Else,
    MacroContinuation,
}

impl OutdentTrigger {
    fn classify(line: &str) -> Option<Self> {
        let indent = leading_indent(line).chars().count();
        let rest = line.trim_start();
        Some(if rest.starts_with('}') {
            Self::CloseBrace(indent)
        } else if rest.starts_with(']') {
            Self::CloseBracket(indent)
        } else if rest.starts_with('>') {
            Self::CloseAngle
        } else if ACCESS_LABEL.is_match(line) {
            Self::AccessLabel
        } else if CASE_LABEL.is_match(line) {
            Self::CaseLabel
        } else if rest == "else" || rest.starts_with("else ") || rest.starts_with("else{") {
            Self::Else
        } else if line.trim_end().ends_with('\\') {
            Self::MacroContinuation
        } else {
            return None;
        })
    }
}

/// C/C++ mode state for one document.
#[derive(Debug)]
pub struct CppMode {
    config: ModeConfig,
    language: LanguageConfig,
    cache: TokenCache,
    chunks: ChunkTracker,
    folds: FoldResolver,
}

impl CppMode {
    /// Mode for a document of `line_count` rows.
    pub fn new(config: ModeConfig, line_count: usize) -> Result<Self, CodeModelError> {
        let language = LanguageConfig::cpp();
        let rules =
            FoldRules::new(language.brackets.clone()).with_block_comments(&language.comments);
        Ok(Self {
            cache: TokenCache::new(Arc::new(CppLexer::new()?), line_count),
            chunks: ChunkTracker::embedded_r()?,
            folds: FoldResolver::new(rules, config.max_fold_rows),
            language,
            config,
        })
    }

    /// The configuration in effect.
    pub fn config(&self) -> &ModeConfig {
        &self.config
    }

    /// Comment markers and brackets of the language.
    pub fn language(&self) -> &LanguageConfig {
        &self.language
    }

    /// The token cache.
    pub fn cache(&self) -> &TokenCache {
        &self.cache
    }

    /// Classification of `row` relative to embedded R chunks.
    pub fn row_class(&mut self, buffer: &dyn TextBuffer, row: usize) -> RowClass {
        self.chunks.row_class(buffer, row)
    }

    fn next_line_indent(
        &mut self,
        buffer: &dyn TextBuffer,
        state: &LexerState,
        line: &str,
        tab: &str,
        row: usize,
    ) -> String {
        let indent = leading_indent(line).to_string();
        let lookaround = self.config.max_lookaround_rows;

        // Embedded R is indented by its own mode; keep the row's indent.
        if self.chunks.row_class(buffer, row).is_inside_chunk() {
            return indent;
        }

        // A blank row indents like the nearest code above it.
        if is_blank(line) {
            let above = row.checked_sub(1).and_then(|r| previous_non_blank_row(buffer, r));
            let Some(above) = above else {
                return indent;
            };
            let above_line = buffer.line_or_empty(above).into_owned();
            self.cache.tokenize_up_to_row(buffer, above);
            let above_state = self.cache.end_state(above).cloned();
            let above_state = above_state.unwrap_or_else(LexerState::start);
            return self.next_line_indent(buffer, &above_state, &above_line, tab, above);
        }

        if state.name() == "comment" {
            return if COMMENT_OPEN.is_match(line) {
                format!("{indent} * ")
            } else if COMMENT_BODY.is_match(line) {
                format!("{indent}* ")
            } else {
                indent
            };
        }
        if COMMENT_CLOSE.is_match(line)
            && !line.contains("/*")
            && let Some(start) = find_start_of_comment_block(buffer, row, lookaround)
        {
            return indent_of(buffer, start);
        }

        if PREPROCESSOR.is_match(line) {
            if MACRO_DEFINE.is_match(line) && line.trim_end().ends_with('\\') {
                return indent + tab;
            }
            return indent;
        }

        let code = line_sans_comments(line);
        let code = code.trim_end();

        if code.ends_with('{') {
            let owner = row_for_open_brace_indent(&mut self.cache, buffer, row);
            tracing::trace!(row, ?owner, "indent after open brace");
            return owner.map_or(indent, |r| indent_of(buffer, r)) + tab;
        }

        if ACCESS_LABEL.is_match(code) || CASE_LABEL.is_match(code) {
            return indent + tab;
        }

        if let Some(indent) = self.paren_indent(buffer, line, code, tab, row) {
            return indent;
        }

        match indent_naked_tokens(buffer, &indent, tab, row, code) {
            NakedIndent::Indent(naked) => return naked,
            NakedIndent::Row(owner) => {
                tracing::trace!(row, owner, "statement closes naked block");
                return indent_of(buffer, owner);
            }
            NakedIndent::NoMatch => {}
        }

        if code.ends_with(';') {
            let start = statement_start_row(buffer, row, lookaround);
            if start < row {
                tracing::trace!(row, start, "statement ends continuation");
                return indent_of(buffer, start);
            }
            return indent;
        }

        if ends_with_continuation(code) && !code.ends_with(',') {
            let continued = row
                .checked_sub(1)
                .is_some_and(|above| continues_to_next(&buffer.line_or_empty(above)));
            return if continued { indent } else { indent + tab };
        }

        indent
    }

    /// Indentation from parentheses that do not balance on `row`.
    ///
    /// An unclosed `(` aligns the next row with the first argument after it, or indents one
    /// level when nothing follows. Closing a paren opened on an earlier row returns to that
    /// row's indentation, one level deeper when it was a naked control header.
    fn paren_indent(
        &self,
        buffer: &dyn TextBuffer,
        line: &str,
        code: &str,
        tab: &str,
        row: usize,
    ) -> Option<String> {
        let opens = code.chars().filter(|&c| c == '(').count();
        let closes = code.chars().filter(|&c| c == ')').count();

        if opens > closes {
            let paren = unmatched_open_paren(line)?;
            let first_arg = line
                .chars()
                .enumerate()
                .skip(paren + 1)
                .find(|(_, c)| !c.is_whitespace())
                .map(|(column, _)| column)
                .filter(|&column| !line.chars().skip(column).collect::<String>().starts_with("//"));
            return Some(match first_arg {
                Some(column) => {
                    let width = column_width(line, column, self.config.tab_size);
                    indent_to_column(width, tab, self.config.tab_size)
                }
                None => format!("{}{tab}", leading_indent(line)),
            });
        }

        if closes > opens {
            let start = find_matching_bracket_row(
                ')',
                buffer,
                row,
                self.config.max_lookaround_rows,
                Direction::Backward,
            )?;
            if start == row {
                return None;
            }
            let start_line = line_sans_comments(&buffer.line_or_empty(start));
            let base = indent_of(buffer, start);
            return Some(if CONDITIONAL_HEAD.is_match(&start_line) && !code.ends_with(';') {
                base + tab
            } else {
                base
            });
        }
        None
    }

    /// Indentation `row` should get after an outdent trigger, or `None` to leave it.
    fn outdent_indent(&mut self, buffer: &dyn TextBuffer, row: usize) -> Option<String> {
        let line = buffer.line(row)?.into_owned();
        let lookaround = self.config.max_lookaround_rows;
        let tab = self.config.tab_string();

        match OutdentTrigger::classify(&line)? {
            OutdentTrigger::CloseBrace(column) => {
                let open = self.matching_open_row(buffer, row, column)?;
                let owner = self.brace_owner_row(buffer, open);
                Some(indent_of(buffer, owner))
            }
            OutdentTrigger::CloseBracket(column) => {
                let open = self.matching_open_row(buffer, row, column)?;
                Some(indent_of(buffer, open))
            }
            OutdentTrigger::CloseAngle => {
                let open =
                    find_matching_bracket_row('>', buffer, row, lookaround, Direction::Backward)?;
                (open != row).then(|| indent_of(buffer, open))
            }
            OutdentTrigger::AccessLabel => {
                let open = find_enclosing_row('}', buffer, row, lookaround)?;
                let owner = self.brace_owner_row(buffer, open);
                Some(indent_of(buffer, owner))
            }
            OutdentTrigger::CaseLabel => {
                let open = find_enclosing_row('}', buffer, row, lookaround)?;
                let owner = self.brace_owner_row(buffer, open);
                Some(indent_of(buffer, owner) + &tab)
            }
            OutdentTrigger::Else => {
                let above = row.checked_sub(1)?;
                let previous = (above.saturating_sub(lookaround)..=above)
                    .rev()
                    .find(|&r| !is_blank(&buffer.line_or_empty(r)))?;
                let previous_code = line_sans_comments(&buffer.line_or_empty(previous));
                if previous_code.trim_start().starts_with('}') {
                    let open = find_matching_bracket_row(
                        '}',
                        buffer,
                        previous,
                        lookaround,
                        Direction::Backward,
                    )?;
                    let owner = self.brace_owner_row(buffer, open);
                    return Some(indent_of(buffer, owner));
                }
                let head = (previous.saturating_sub(lookaround)..=previous)
                    .rev()
                    .find(|&r| IF_HEAD.is_match(&buffer.line_or_empty(r)))?;
                Some(indent_of(buffer, head))
            }
            OutdentTrigger::MacroContinuation => {
                let mut start = row;
                while start > 0
                    && row - start < lookaround
                    && buffer.line_or_empty(start - 1).trim_end().ends_with('\\')
                {
                    start -= 1;
                }
                (start != row && MACRO_DEFINE.is_match(&buffer.line_or_empty(start)))
                    .then(|| indent_of(buffer, start) + &tab)
            }
        }
    }

    /// Row of the bracket matching the closer at `(row, column)`, when it is on an earlier row.
    fn matching_open_row(
        &mut self,
        buffer: &dyn TextBuffer,
        row: usize,
        column: usize,
    ) -> Option<usize> {
        let open = self.cache.navigator(buffer).find_matching_bracket(
            Position::new(row, column),
            self.config.max_lookback_rows,
            &self.language.brackets,
        )?;
        (open.row != row).then_some(open.row)
    }

    fn brace_owner_row(&mut self, buffer: &dyn TextBuffer, open: usize) -> usize {
        row_for_open_brace_indent(&mut self.cache, buffer, open).unwrap_or(open)
    }

    fn chunk_fold(
        &mut self,
        buffer: &dyn TextBuffer,
        style: FoldStyle,
        row: usize,
    ) -> Option<(FoldWidget, Range)> {
        let widget = match self.chunks.row_class(buffer, row) {
            RowClass::ChunkStart => FoldWidget::Start,
            RowClass::ChunkEnd => FoldWidget::End,
            _ => return None,
        };
        let end_hidden = widget == FoldWidget::End && style != FoldStyle::MarkBeginEnd;
        if style == FoldStyle::Manual || end_hidden {
            return None;
        }
        let range = self.chunks.chunk_fold_range(buffer, row, self.config.max_fold_rows)?;
        Some((widget, range))
    }
}

/// Index of the last `(` on `line` left open at its end, ignoring literals and comments.
fn unmatched_open_paren(line: &str) -> Option<usize> {
    let chars: Vec<char> = line.chars().collect();
    let mut open = Vec::new();
    let mut quote: Option<char> = None;
    let mut index = 0;
    while index < chars.len() {
        let ch = chars[index];
        match quote {
            Some(_) if ch == '\\' => index += 1,
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None => match ch {
                '\'' if is_digit_separator(&chars, index) => {}
                '"' | '\'' => quote = Some(ch),
                '/' if chars.get(index + 1) == Some(&'/') => break,
                '(' => open.push(index),
                ')' => {
                    open.pop();
                }
                _ => {}
            },
        }
        index += 1;
    }
    open.pop()
}

/// First row of the statement ending on `row`: rows above are included while they end
/// with a continuation token.
fn statement_start_row(buffer: &dyn TextBuffer, row: usize, lookaround: usize) -> usize {
    let mut start = row;
    while start > 0
        && row - start < lookaround
        && continues_to_next(&buffer.line_or_empty(start - 1))
    {
        start -= 1;
    }
    start
}

/// Returns `true` if `line` leaves an expression open for the next row. Labels and
/// preprocessor lines end in `:` or `>` without continuing anything.
fn continues_to_next(line: &str) -> bool {
    if PREPROCESSOR.is_match(line) {
        return false;
    }
    let code = line_sans_comments(line);
    let code = code.trim_end();
    !ACCESS_LABEL.is_match(code) && !CASE_LABEL.is_match(code) && ends_with_continuation(code)
}

fn indent_of(buffer: &dyn TextBuffer, row: usize) -> String {
    leading_indent(&buffer.line_or_empty(row)).to_string()
}

impl LanguageMode for CppMode {
    fn on_change(&mut self, delta: &DocumentDelta) {
        self.cache.on_change(delta);
        self.chunks.on_change(delta);
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

        let overridden = LineOverride::new(buffer, row, line);
        self.cache.invalidate_row(row);
        self.chunks.invalidate_from(row);
        let indent = self.next_line_indent(&overridden, state, line, tab, row);
        self.cache.invalidate_row(row);
        self.chunks.invalidate_from(row);
        indent
    }

    fn check_outdent(&self, state: &LexerState, line: &str, input: &str) -> bool {
        if state.name() == "comment" {
            return false;
        }
        let typed = format!("{line}{input}");
        match input {
            "}" | "]" | ">" => line.trim().is_empty(),
            ":" => ACCESS_LABEL.is_match(&typed) || CASE_LABEL.is_match(&typed),
            "\\" => true,
            _ => ELSE_TYPED.is_match(&typed),
        }
    }

    fn auto_outdent(&mut self, _state: &LexerState, doc: &mut Document, row: usize) {
        if self.chunks.row_class(&*doc, row).is_inside_chunk() {
            return;
        }
        let Some(indent) = self.outdent_indent(&*doc, row) else {
            tracing::debug!(row, "nothing to outdent to");
            return;
        };
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
        if let Some((widget, _)) = self.chunk_fold(buffer, style, row) {
            return widget;
        }
        let mut nav = self.cache.navigator(buffer);
        self.folds.fold_widget(&mut nav, style, row)
    }

    fn get_fold_widget_range(
        &mut self,
        buffer: &dyn TextBuffer,
        style: FoldStyle,
        row: usize,
    ) -> Option<Range> {
        if let Some((_, range)) = self.chunk_fold(buffer, style, row) {
            return Some(range);
        }
        let mut nav = self.cache.navigator(buffer);
        self.folds.fold_widget_range(&mut nav, style, row)
    }

    fn end_state(&mut self, buffer: &dyn TextBuffer, row: usize) -> Option<LexerState> {
        self.cache.tokenize_up_to_row(buffer, row);
        self.cache.end_state(row).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn next_indent(lines: &[&str]) -> String {
        let buffer: Vec<String> = lines.iter().map(|s| s.to_string()).collect();
        let mut mode = CppMode::new(ModeConfig::default(), buffer.len()).unwrap();
        let row = lines.len() - 1;
        let state = mode.end_state(&buffer, row).unwrap();
        mode.get_next_line_indent(&buffer, &state, lines[row], "  ", row)
    }

    #[test]
    fn test_indent_after_open_brace() {
        assert_eq!(next_indent(&["int main() {"]), "  ");
        assert_eq!(next_indent(&["  if (x) {"]), "    ");
        assert_eq!(
            next_indent(&["Foo::Foo(int a)", "    : a_(a),", "      b_(a) {"]),
            "  "
        );
        assert_eq!(next_indent(&["class A :", "    public B {"]), "  ");
    }

    #[test]
    fn test_blank_row_indents_from_code_above() {
        assert_eq!(next_indent(&["int f() {", "  x();", ""]), "  ");
        assert_eq!(next_indent(&["int f() {", ""]), "  ");
        assert_eq!(next_indent(&["int f() {", "  x();", "", "    "]), "  ");
        assert_eq!(next_indent(&["  if (x)", ""]), "    ");
        assert_eq!(next_indent(&["", ""]), "");
    }

    #[test]
    fn test_indent_inside_block_comment() {
        assert_eq!(next_indent(&["  /**"]), "   * ");
        assert_eq!(next_indent(&["/*", " * text"]), " * ");
        assert_eq!(next_indent(&["  /*", "   * text", "   */"]), "  ");
    }

    #[test]
    fn test_indent_after_labels() {
        assert_eq!(next_indent(&["class A {", "public:"]), "  ");
        assert_eq!(next_indent(&["  case 1:"]), "    ");
        assert_eq!(next_indent(&["  default:"]), "    ");
    }

    #[test]
    fn test_unbalanced_paren_alignment() {
        assert_eq!(next_indent(&["int x = foo(a,"]), " ".repeat(12));
        assert_eq!(next_indent(&["  call("]), "    ");
        assert_eq!(next_indent(&["foo(a,", "    b);"]), "");
        assert_eq!(next_indent(&["  if (a &&", "      b)"]), "    ");
        assert_eq!(next_indent(&["  int x = 1'000 + f(a,"]), " ".repeat(20));
    }

    #[test]
    fn test_paren_opener_beyond_lookaround_keeps_row_indent() {
        let mut lines = vec!["foo(a,"];
        lines.extend(std::iter::repeat_n("    x,", 10));
        lines.push("    b);");
        assert_eq!(next_indent(&lines), "");

        let buffer: Vec<String> = lines.iter().map(|s| s.to_string()).collect();
        let config = ModeConfig {
            max_lookaround_rows: 5,
            ..ModeConfig::default()
        };
        let mut mode = CppMode::new(config, buffer.len()).unwrap();
        let row = lines.len() - 1;
        let state = mode.end_state(&buffer, row).unwrap();
        assert_eq!(mode.get_next_line_indent(&buffer, &state, lines[row], "  ", row), "    ");
    }

    #[test]
    fn test_naked_blocks() {
        assert_eq!(next_indent(&["  for (int i = 0; i < n; ++i)"]), "    ");
        assert_eq!(next_indent(&["  else"]), "    ");
        assert_eq!(next_indent(&["  if (x)", "    y();"]), "  ");
    }

    #[test]
    fn test_continuation_and_termination() {
        assert_eq!(next_indent(&["  int x = a +"]), "    ");
        assert_eq!(next_indent(&["  int x = a +", "    b +"]), "    ");
        assert_eq!(next_indent(&["  int x = a +", "    b +", "    c;"]), "  ");
        assert_eq!(next_indent(&["  int x = 1;"]), "  ");
        assert_eq!(next_indent(&["  x = f(a),"]), "  ");
    }

    #[test]
    fn test_preprocessor_lines() {
        assert_eq!(next_indent(&["#include <vector>"]), "");
        assert_eq!(next_indent(&["#define SQ(x) \\"]), "  ");
    }

    #[test]
    fn test_embedded_chunk_rows_keep_indent() {
        assert_eq!(next_indent(&["/*** R", "  f <- function() {"]), "  ");
    }

    #[test]
    fn test_check_outdent() {
        let mode = CppMode::new(ModeConfig::default(), 1).unwrap();
        let start = LexerState::start();
        assert!(mode.check_outdent(&start, "    ", "}"));
        assert!(mode.check_outdent(&start, "  ", "]"));
        assert!(mode.check_outdent(&start, "  ", ">"));
        assert!(!mode.check_outdent(&start, "  x", "}"));
        assert!(mode.check_outdent(&start, "    public", ":"));
        assert!(mode.check_outdent(&start, "    case FOO", ":"));
        assert!(!mode.check_outdent(&start, "    std:", ":"));
        assert!(mode.check_outdent(&start, "    els", "e"));
        assert!(!mode.check_outdent(&start, "    x = els", "e"));
        assert!(mode.check_outdent(&start, "  x + ", "\\"));

        let mut comment = LexerState::start();
        comment.push("comment");
        assert!(!mode.check_outdent(&comment, "    ", "}"));
    }
}
