//! Fold widgets and fold ranges.
//!
//! A [`FoldResolver`] decides whether a row opens or closes a foldable region and computes the
//! region. It understands four kinds of regions, checked in this order:
//!
//! 1. fenced chunks (` ```{r} ` … ` ``` `), paired only with a fence of the same width
//! 2. section headers (`# Title ----`), folding up to the next header
//! 3. block comments (`/*` … `*/`)
//! 4. brackets, matched through the token cache
//!
//! A region that starts and ends on the same row is never reported.

use crate::navigation::TokenNavigator;
use crate::position::{Position, Range};
use codemodel_lang::{BracketPairs, CommentConfig};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static FENCE_BEGIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(`{3,})\s*\{.*\}\s*$").expect("fence begin pattern"));
static FENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(`{3,})\s*$").expect("fence end pattern"));

/// Pattern for R-style section headers: a comment ending in four or more `-`, `=` or `#`.
pub const SECTION_PATTERN: &str = r"^\s*#.*[-=#]{4,}\s*$";

/// Which fold widgets an editor shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FoldStyle {
    /// Only region starts get a widget.
    MarkBegin,
    /// Both region starts and ends get a widget.
    #[default]
    MarkBeginEnd,
    /// No automatic widgets.
    Manual,
}

/// The widget shown next to a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FoldWidget {
    /// The row opens a region.
    Start,
    /// The row closes a region.
    End,
    /// No widget.
    #[default]
    Empty,
}

impl FoldWidget {
    /// Editor-facing name: `"start"`, `"end"` or `""`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::End => "end",
            Self::Empty => "",
        }
    }
}

/// Which region kinds a language folds.
#[derive(Debug, Clone)]
pub struct FoldRules {
    /// Brackets whose pairs fold.
    pub brackets: BracketPairs,
    /// Section header pattern.
    pub section: Option<Regex>,
    /// Fold fenced chunks.
    pub fenced_chunks: bool,
    /// Block comment markers.
    pub block_comment: Option<(String, String)>,
}

impl FoldRules {
    /// Bracket folds only.
    pub fn new(brackets: BracketPairs) -> Self {
        Self {
            brackets,
            section: None,
            fenced_chunks: false,
            block_comment: None,
        }
    }

    /// Also fold section headers matching `pattern`.
    pub fn with_sections(mut self, pattern: &str) -> Result<Self, crate::CodeModelError> {
        self.section =
            Some(Regex::new(pattern).map_err(|e| crate::CodeModelError::regex(pattern, e))?);
        Ok(self)
    }

    /// Also fold fenced chunks.
    pub fn with_fenced_chunks(mut self) -> Self {
        self.fenced_chunks = true;
        self
    }

    /// Also fold block comments, if `comments` defines them.
    pub fn with_block_comments(mut self, comments: &CommentConfig) -> Self {
        self.block_comment = comments
            .block()
            .map(|(start, end)| (start.to_string(), end.to_string()));
        self
    }
}

/// Resolves fold widgets and ranges for one language.
#[derive(Debug, Clone)]
pub struct FoldResolver {
    rules: FoldRules,
    max_rows: usize,
}

impl FoldResolver {
    /// Resolver for `rules`, never looking more than `max_rows` rows away.
    pub fn new(rules: FoldRules, max_rows: usize) -> Self {
        Self { rules, max_rows }
    }

    /// The rules in effect.
    pub fn rules(&self) -> &FoldRules {
        &self.rules
    }

    /// Widget for `row`.
    pub fn fold_widget(
        &self,
        nav: &mut TokenNavigator<'_>,
        style: FoldStyle,
        row: usize,
    ) -> FoldWidget {
        self.resolve(nav, style, row)
            .map_or(FoldWidget::Empty, |(widget, _)| widget)
    }

    /// Region opened or closed by `row`.
    pub fn fold_widget_range(
        &self,
        nav: &mut TokenNavigator<'_>,
        style: FoldStyle,
        row: usize,
    ) -> Option<Range> {
        self.resolve(nav, style, row).map(|(_, range)| range)
    }

    fn resolve(
        &self,
        nav: &mut TokenNavigator<'_>,
        style: FoldStyle,
        row: usize,
    ) -> Option<(FoldWidget, Range)> {
        if style == FoldStyle::Manual || row >= nav.buffer().line_count() {
            return None;
        }
        let line = nav.buffer().line_or_empty(row).into_owned();
        let with_end = style == FoldStyle::MarkBeginEnd;

        let found = self
            .fence_fold(nav, &line, row, with_end)
            .or_else(|| self.section_fold(nav, &line, row))
            .or_else(|| self.comment_fold(nav, &line, row, with_end))
            .or_else(|| self.bracket_fold(nav, row, with_end));

        match found {
            Some((_, range)) if range.is_single_row() => None,
            other => other,
        }
    }

    fn rows_after(&self, nav: &TokenNavigator<'_>, row: usize) -> std::ops::RangeInclusive<usize> {
        let last = nav
            .buffer()
            .line_count()
            .saturating_sub(1)
            .min(row.saturating_add(self.max_rows));
        row + 1..=last
    }

    fn rows_before(&self, row: usize) -> impl Iterator<Item = usize> {
        (row.saturating_sub(self.max_rows)..row).rev()
    }

    fn fence_fold(
        &self,
        nav: &TokenNavigator<'_>,
        line: &str,
        row: usize,
        with_end: bool,
    ) -> Option<(FoldWidget, Range)> {
        if !self.rules.fenced_chunks {
            return None;
        }
        let buffer = nav.buffer();

        if let Some(width) = fence_width(&FENCE_BEGIN, line) {
            let end = self
                .rows_after(nav, row)
                .find(|&r| fence_width(&FENCE_END, &buffer.line_or_empty(r)) == Some(width))?;
            return Some((
                FoldWidget::Start,
                Range::new(row, line.chars().count(), end, 0),
            ));
        }

        let width = fence_width(&FENCE_END, line)?;
        if !with_end {
            return None;
        }
        for r in self.rows_before(row) {
            let text = buffer.line_or_empty(r);
            if fence_width(&FENCE_BEGIN, &text) == Some(width) {
                return Some((FoldWidget::End, Range::new(r, text.chars().count(), row, 0)));
            }
            if fence_width(&FENCE_END, &text) == Some(width) {
                // That fence closes an earlier chunk.
                return None;
            }
        }
        None
    }

    fn section_fold(
        &self,
        nav: &TokenNavigator<'_>,
        line: &str,
        row: usize,
    ) -> Option<(FoldWidget, Range)> {
        let section = self.rules.section.as_ref()?;
        if !section.is_match(line) {
            return None;
        }
        let buffer = nav.buffer();
        let next_header = self
            .rows_after(nav, row)
            .find(|&r| section.is_match(&buffer.line_or_empty(r)))
            .unwrap_or(*self.rows_after(nav, row).end() + 1);

        let end = (row + 1..next_header)
            .rev()
            .find(|&r| !buffer.line_or_empty(r).trim().is_empty())?;
        let end_column = buffer.line_or_empty(end).chars().count();
        Some((
            FoldWidget::Start,
            Range::new(row, line.chars().count(), end, end_column),
        ))
    }

    fn comment_fold(
        &self,
        nav: &TokenNavigator<'_>,
        line: &str,
        row: usize,
        with_end: bool,
    ) -> Option<(FoldWidget, Range)> {
        let (open, close) = self.rules.block_comment.as_ref()?;
        let buffer = nav.buffer();

        if line.trim_start().starts_with(open.as_str()) {
            let open_at = line.find(open.as_str())?;
            if line[open_at + open.len()..].contains(close.as_str()) {
                return None;
            }
            let start = Position::new(row, char_column(line, open_at + open.len()));
            for r in self.rows_after(nav, row) {
                let text = buffer.line_or_empty(r);
                if let Some(at) = text.find(close.as_str()) {
                    return Some((
                        FoldWidget::Start,
                        Range {
                            start,
                            end: Position::new(r, char_column(&text, at)),
                        },
                    ));
                }
            }
            return None;
        }

        let close_at = line.find(close.as_str())?;
        if !with_end || line[..close_at].contains(open.as_str()) {
            return None;
        }
        let end = Position::new(row, char_column(line, close_at));
        for r in self.rows_before(row) {
            let text = buffer.line_or_empty(r);
            if let Some(at) = text.rfind(open.as_str()) {
                let start = Position::new(r, char_column(&text, at + open.len()));
                return Some((FoldWidget::End, Range { start, end }));
            }
        }
        None
    }

    fn bracket_fold(
        &self,
        nav: &mut TokenNavigator<'_>,
        row: usize,
        with_end: bool,
    ) -> Option<(FoldWidget, Range)> {
        let brackets = &self.rules.brackets;
        nav.ensure_row(row);

        let mut open: Vec<(char, usize)> = Vec::new();
        let mut orphan_closer: Option<usize> = None;
        for token in nav.cache().significant_tokens(row).iter().filter(|t| t.is_paren()) {
            let Some(ch) = token.value.chars().next() else {
                continue;
            };
            if brackets.is_open(ch) {
                open.push((ch, token.column));
            } else if brackets.is_close(ch) && open.pop().is_none() && orphan_closer.is_none() {
                orphan_closer = Some(token.column);
            }
        }

        if let Some(&(_, column)) = open.last() {
            let opener = Position::new(row, column);
            let closer = nav.find_matching_bracket(opener, self.max_rows, brackets)?;
            return Some((
                FoldWidget::Start,
                Range::new(row, column + 1, closer.row, closer.column),
            ));
        }

        let column = orphan_closer.filter(|_| with_end)?;
        let opener =
            nav.find_matching_bracket(Position::new(row, column), self.max_rows, brackets)?;
        Some((
            FoldWidget::End,
            Range::new(opener.row, opener.column + 1, row, column),
        ))
    }
}

fn fence_width(pattern: &Regex, line: &str) -> Option<usize> {
    pattern.captures(line).map(|caps| caps[1].len())
}

fn char_column(line: &str, byte: usize) -> usize {
    line[..byte].chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::TokenCache;
    use crate::tokenizer::{RuleTokenizer, TokenRule};
    use std::sync::Arc;

    fn cache(rows: usize) -> TokenCache {
        let lexer = RuleTokenizer::builder()
            .state(
                "start",
                vec![
                    TokenRule::new(r"#.*", "comment").unwrap(),
                    TokenRule::new(r"[(){}\[\]]", "paren").unwrap(),
                    TokenRule::new(r"[^\s(){}\[\]#]+", "identifier").unwrap(),
                    TokenRule::new(r"\s+", "text").unwrap(),
                ],
            )
            .build()
            .unwrap();
        TokenCache::new(Arc::new(lexer), rows)
    }

    fn resolver() -> FoldResolver {
        let rules = FoldRules::new(BracketPairs::standard())
            .with_sections(SECTION_PATTERN)
            .unwrap()
            .with_fenced_chunks()
            .with_block_comments(&CommentConfig::line_and_block("//", "/*", "*/"));
        FoldResolver::new(rules, 1000)
    }

    fn widgets(lines: &[&str], style: FoldStyle) -> Vec<&'static str> {
        let buffer: Vec<&str> = lines.to_vec();
        let mut cache = cache(buffer.len());
        let mut nav = cache.navigator(&buffer);
        let resolver = resolver();
        (0..lines.len())
            .map(|row| resolver.fold_widget(&mut nav, style, row).as_str())
            .collect()
    }

    fn range(lines: &[&str], style: FoldStyle, row: usize) -> Option<Range> {
        let buffer: Vec<&str> = lines.to_vec();
        let mut cache = cache(buffer.len());
        let mut nav = cache.navigator(&buffer);
        resolver().fold_widget_range(&mut nav, style, row)
    }

    #[test]
    fn test_fenced_chunk_fold() {
        let lines = ["```{r}", "print(1)", "```"];
        assert_eq!(widgets(&lines, FoldStyle::MarkBeginEnd), vec!["start", "", "end"]);
        assert_eq!(range(&lines, FoldStyle::MarkBeginEnd, 0), Some(Range::new(0, 6, 2, 0)));
        assert_eq!(range(&lines, FoldStyle::MarkBeginEnd, 2), Some(Range::new(0, 6, 2, 0)));
        assert_eq!(widgets(&lines, FoldStyle::MarkBegin), vec!["start", "", ""]);
    }

    #[test]
    fn test_fence_width_must_match() {
        let lines = ["````{r}", "x", "```", "````"];
        assert_eq!(range(&lines, FoldStyle::MarkBeginEnd, 0), Some(Range::new(0, 7, 3, 0)));
        assert_eq!(widgets(&["```{r}", "x", "````"], FoldStyle::MarkBeginEnd), vec!["", "", ""]);
    }

    #[test]
    fn test_bracket_folds() {
        let lines = ["f {", "  g(a,", "    b)", "}"];
        assert_eq!(
            widgets(&lines, FoldStyle::MarkBeginEnd),
            vec!["start", "start", "end", "end"]
        );
        assert_eq!(range(&lines, FoldStyle::MarkBeginEnd, 0), Some(Range::new(0, 3, 3, 0)));
        assert_eq!(range(&lines, FoldStyle::MarkBeginEnd, 2), Some(Range::new(1, 4, 2, 5)));
        assert_eq!(widgets(&lines, FoldStyle::Manual), vec!["", "", "", ""]);
    }

    #[test]
    fn test_degenerate_ranges_are_rejected() {
        assert_eq!(widgets(&["f { x }", "(a)"], FoldStyle::MarkBeginEnd), vec!["", ""]);
        assert_eq!(widgets(&["f {"], FoldStyle::MarkBeginEnd), vec![""]);
    }

    #[test]
    fn test_section_and_comment_folds() {
        let lines = ["# Setup ----", "x", "", "# Next ====", "y", "/* a", " b */"];
        assert_eq!(range(&lines, FoldStyle::MarkBegin, 0), Some(Range::new(0, 12, 1, 1)));
        assert_eq!(range(&lines, FoldStyle::MarkBegin, 3), Some(Range::new(3, 11, 6, 5)));
        assert_eq!(range(&lines, FoldStyle::MarkBeginEnd, 5), Some(Range::new(5, 2, 6, 3)));
        assert_eq!(range(&lines, FoldStyle::MarkBeginEnd, 6), Some(Range::new(5, 2, 6, 3)));
    }
}
