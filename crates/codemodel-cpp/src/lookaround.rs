//! Textual and token lookaround used by the C++ indentation rules.
//!
//! Most helpers here work on raw lines with string contents and trailing comments removed
//! (see [`line_sans_comments`]) and never look further than a caller-supplied row budget.
//! [`row_for_open_brace_indent`] walks tokens instead, because it has to step over
//! constructor initializer lists and base class lists that span rows.

use codemodel::{BracketPairs, TextBuffer, TokenCache, TokenCursor};
use regex::Regex;
use std::sync::LazyLock;

static STARTS_WITH_CONTINUATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*[,+\-/&^%$!<>.?|='":)(~]|^\s*\*[^/]|^\s*/[^*]"#)
        .expect("leading continuation pattern")
});
static ENDS_WITH_CONTINUATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[,+\-*&^%$!<>.?|='":)(~]\s*$|\*[^/]\s*$|/[^*]\s*$"#)
        .expect("trailing continuation pattern")
});
static ENDS_WITH_BACKSLASH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\\s*$").expect("backslash pattern"));
static COMMENT_BLOCK_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*/+\*").expect("comment start pattern"));
static NAKED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*[\w:]+\s*$|^\s*[\w:]+\s*\(.*\)\s*$").expect("naked token pattern")
});
static NAKED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:do|else|(?:while|for|if|else\s+if)\s*\(.*\))\s*$")
        .expect("naked block pattern")
});
static NAKED_CONDITIONAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*if\s*\(.*\)\s*$|^\s*else\s*$|^\s*else\s+if\s*\(.*\)\s*$")
        .expect("naked conditional pattern")
});
static ENDS_WITH_SEMICOLON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r";\s*$").expect("semicolon pattern"));
static ACCESS_MODIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:public|private|protected)\s*:\s*$").expect("access modifier pattern")
});

/// Keywords that own the brace following them.
const BRACE_OWNER_KEYWORDS: &[&str] = &["if", "else", "for", "while", "do", "struct", "class"];

/// Direction of a row scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Towards row 0.
    Backward,
    /// Towards the end of the buffer.
    Forward,
}

/// Result of [`indent_naked_tokens`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NakedIndent {
    /// Use this indentation.
    Indent(String),
    /// Use the indentation of this row.
    Row(usize),
    /// The rule does not apply.
    NoMatch,
}

/// Returns `true` if `line` starts with a token that continues the previous line.
pub fn starts_with_continuation(line: &str) -> bool {
    STARTS_WITH_CONTINUATION.is_match(line)
}

/// Returns `true` if `line` ends with a token that the next line must continue.
pub fn ends_with_continuation(line: &str) -> bool {
    ENDS_WITH_CONTINUATION.is_match(line)
}

/// Returns `true` for naked control lines (`if (...)`, `else`, `for (...)`, `while (...)`,
/// `do`) that govern the following statement without braces.
pub fn is_naked_block(line: &str) -> bool {
    NAKED_BLOCK.is_match(line)
}

fn is_naked(line: &str) -> bool {
    NAKED.is_match(line) || is_naked_block(line)
}

/// `line` with the contents of string and character literals, a trailing `//` comment and
/// a trailing macro `\` removed. The quotes themselves are kept, so `f("// x")` becomes
/// `f("")`. A line with an unterminated literal keeps its literals untouched.
pub fn line_sans_comments(line: &str) -> String {
    let mut out = strip_literals(line);
    if let Some(index) = out.find("//") {
        out.truncate(index);
    }
    if ENDS_WITH_BACKSLASH.is_match(&out)
        && let Some(index) = out.rfind('\\')
    {
        out.truncate(index);
    }
    out
}

/// Returns `true` if the `'` at `index` separates digits of a number, as in `1'000` or
/// `0xFF'FF`, rather than opening a character literal.
pub(crate) fn is_digit_separator(chars: &[char], index: usize) -> bool {
    if !chars.get(index + 1).is_some_and(char::is_ascii_hexdigit) {
        return false;
    }
    let start = chars[..index]
        .iter()
        .rposition(|&c| !(c.is_ascii_alphanumeric() || c == '_' || c == '\''))
        .map_or(0, |i| i + 1);
    start < index && chars[start].is_ascii_digit()
}

fn strip_literals(line: &str) -> String {
    let chars: Vec<char> = line.chars().collect();
    let mut out = String::with_capacity(line.len());
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (index, &ch) in chars.iter().enumerate() {
        match quote {
            Some(q) => {
                if escaped {
                    escaped = false;
                } else if ch == '\\' {
                    escaped = true;
                } else if ch == q {
                    quote = None;
                    out.push(ch);
                }
            }
            None => {
                if ch == '"' || (ch == '\'' && !is_digit_separator(&chars, index)) {
                    quote = Some(ch);
                }
                out.push(ch);
            }
        }
    }
    if quote.is_some() {
        line.to_string()
    } else {
        out
    }
}

fn line_sans_comments_at(buffer: &dyn TextBuffer, row: usize) -> String {
    line_sans_comments(&buffer.line_or_empty(row))
}

fn char_count(line: &str, ch: char) -> usize {
    line.chars().filter(|&c| c == ch).count()
}

/// Row holding the bracket that balances `character` on `row`.
///
/// Scans whole rows (comments stripped) from `row` in `direction`, adding the occurrences
/// of `character` and subtracting those of its complement; the first row where the running
/// balance drops to zero or below is returned. At most `max_lookaround + 1` rows are read.
pub fn find_matching_bracket_row(
    character: char,
    buffer: &dyn TextBuffer,
    row: usize,
    max_lookaround: usize,
    direction: Direction,
) -> Option<usize> {
    scan_bracket_balance(character, buffer, row, max_lookaround, direction, 0)
}

/// Row above `row` holding the unmatched opener of the `closer` pair that encloses `row`.
pub fn find_enclosing_row(
    closer: char,
    buffer: &dyn TextBuffer,
    row: usize,
    max_lookaround: usize,
) -> Option<usize> {
    let above = row.checked_sub(1)?;
    scan_bracket_balance(closer, buffer, above, max_lookaround, Direction::Backward, 1)
}

fn scan_bracket_balance(
    character: char,
    buffer: &dyn TextBuffer,
    row: usize,
    max_lookaround: usize,
    direction: Direction,
    mut balance: isize,
) -> Option<usize> {
    let complement = BracketPairs::with_angles().complement(character)?;
    let mut row = row;
    for _ in 0..=max_lookaround {
        if row >= buffer.line_count() {
            return None;
        }
        let line = line_sans_comments_at(buffer, row);
        balance += char_count(&line, character) as isize;
        balance -= char_count(&line, complement) as isize;
        if balance <= 0 {
            return Some(row);
        }
        row = match direction {
            Direction::Backward => row.checked_sub(1)?,
            Direction::Forward => row + 1,
        };
    }
    None
}

/// Nearest row at or above `row` (within `max_lookback` rows) that opens a block comment.
pub fn find_start_of_comment_block(
    buffer: &dyn TextBuffer,
    row: usize,
    max_lookback: usize,
) -> Option<usize> {
    let first = row.saturating_sub(max_lookback.saturating_sub(1));
    (first..=row)
        .rev()
        .find(|&r| COMMENT_BLOCK_START.is_match(&buffer.line_or_empty(r)))
}

/// Indentation rule for naked tokens: lines such as `BOOST_FOREACH(x, xs)` or `if (x)` that
/// govern the next statement without braces.
///
/// - A balanced naked `line` indents the next row by `tab`.
/// - A statement ending in `;` right under a naked line closes that construct: the result
///   is the row of the outermost naked line in the run, or of the nearest `if`/`else` in it.
///   An access modifier above keeps `indent`.
pub fn indent_naked_tokens(
    buffer: &dyn TextBuffer,
    indent: &str,
    tab: &str,
    row: usize,
    line: &str,
) -> NakedIndent {
    if char_count(line, '(') == char_count(line, ')') && is_naked(line) {
        return NakedIndent::Indent(format!("{indent}{tab}"));
    }

    let Some(mut lookback) = row.checked_sub(1) else {
        return NakedIndent::NoMatch;
    };
    let mut last_line = line_sans_comments_at(buffer, lookback);
    if !ENDS_WITH_SEMICOLON.is_match(line) || !is_naked(&last_line) {
        return NakedIndent::NoMatch;
    }
    if ACCESS_MODIFIER.is_match(&last_line) {
        return NakedIndent::Indent(indent.to_string());
    }

    while is_naked(&last_line) {
        if NAKED_CONDITIONAL.is_match(&last_line) {
            return NakedIndent::Row(lookback);
        }
        match lookback.checked_sub(1) {
            Some(above) => {
                lookback = above;
                last_line = line_sans_comments_at(buffer, lookback);
            }
            None => return NakedIndent::Row(0),
        }
    }
    NakedIndent::Row(lookback + 1)
}

/// Row whose indentation a block opened by the `{` on `row` should use.
///
/// Starting from the last `{` on the row, walks back over a constructor initializer list
/// (`Foo() : a_(a), b_(b) {`) or a base class list (`class Foo : public A, public B {`), then
/// over keywords and a parenthesised header, to the row of the construct owning the brace.
/// Returns `None` when the row has no `{` or the walk falls off the buffer.
pub fn row_for_open_brace_indent(
    cache: &mut TokenCache,
    buffer: &dyn TextBuffer,
    row: usize,
) -> Option<usize> {
    if !cache.tokenize_up_to_row(buffer, row) {
        return None;
    }
    let last = cache.significant_tokens(row).len().checked_sub(1)?;
    let mut cursor = TokenCursor::at(cache, row, last);

    while cursor.current_value() != "{" {
        if !cursor.move_to_previous_token() || cursor.row() != row {
            return None;
        }
    }

    bwd_over_initialization_list(&mut cursor);
    bwd_over_class_inheritance(&mut cursor);

    if cursor.current_value() == "{" && !cursor.move_to_previous_token() {
        return None;
    }
    if cursor.current_value() == "{" {
        return None;
    }

    while cursor.current_type() == "keyword" {
        if BRACE_OWNER_KEYWORDS.contains(&cursor.current_value()) {
            return Some(cursor.row());
        }
        if cursor.row() == 0 && cursor.offset() == 0 {
            return Some(0);
        }
        if !cursor.move_to_previous_token() {
            return None;
        }
    }

    // A ':' reached here ends an initializer or base list, unless it belongs to an access
    // label above the brace.
    if cursor.current_value() == ":" {
        let after_label = cursor
            .peek_back()
            .is_some_and(|c| matches!(c.current_value(), "public" | "private" | "protected"));
        if after_label {
            cursor.move_to_next_token(row);
        } else {
            cursor.move_to_previous_token();
        }
    }

    if cursor.current_value() == ":" {
        if !cursor.move_to_previous_token() {
            return None;
        }
        // Step over specifiers such as `const noexcept(x)` back to the declarator.
        loop {
            if cursor.current_value() == ")" && cursor.bwd_to_matching_token() {
                if !cursor.peek_back().is_some_and(|c| c.current_type() == "keyword") {
                    break;
                }
            } else if cursor.current_has_type("identifier") {
                break;
            }
            if !cursor.move_to_previous_token() {
                break;
            }
        }
    }

    if cursor.current_value() == ")" && !cursor.bwd_to_matching_token() {
        return None;
    }
    if cursor.current_value() == "(" && !cursor.move_to_previous_token() {
        return None;
    }
    if cursor.current_value() == "=" {
        cursor.move_to_previous_token();
    }
    Some(cursor.row())
}

/// From a `{`, step back over `: a_(a), b_{b}` and trailing specifiers, leaving the cursor
/// on the `:` that starts the list. The cursor is unchanged when there is no such list.
fn bwd_over_initialization_list(cursor: &mut TokenCursor<'_>) {
    while step_over_initializer(cursor) {}
}

fn step_over_initializer(cursor: &mut TokenCursor<'_>) -> bool {
    let mut probe = *cursor;
    loop {
        if !probe.move_to_previous_token() {
            return false;
        }
        let closer = match probe.current_value() {
            ")" => true,
            "}" => false,
            _ if probe.current_type() == "keyword" => continue,
            _ => return false,
        };
        if !probe.bwd_to_matching_token() || !probe.move_to_previous_token() {
            return false;
        }
        // `noexcept(...)` and friends are specifiers, not initializers.
        if closer && probe.current_type() == "keyword" {
            continue;
        }
        break;
    }
    if !probe.current_has_type("identifier") || !probe.move_to_previous_token() {
        return false;
    }
    if matches!(probe.current_value(), ":" | ",") {
        *cursor = probe;
        return true;
    }
    false
}

/// From a `{`, step back over `: public A, private ns::B<T>`, leaving the cursor on the `:`.
/// The cursor is unchanged when there is no base class list.
fn bwd_over_class_inheritance(cursor: &mut TokenCursor<'_>) -> bool {
    let mut probe = *cursor;
    loop {
        // Off the brace or comma, onto the last token of the base name.
        if !probe.move_to_previous_token() {
            return false;
        }
        if probe.current_has_type("constant") && !probe.move_to_previous_token() {
            return false;
        }
        if !skip_template_arguments(&mut probe) {
            return false;
        }
        if !probe.move_to_previous_token() {
            return false;
        }

        while probe.current_value() == "::" {
            if !probe.move_to_previous_token() {
                return false;
            }
            if probe.current_has_type("constant") && !probe.move_to_previous_token() {
                return false;
            }
            if !skip_template_arguments(&mut probe) || !skip_keywords(&mut probe) {
                return false;
            }
            if probe.current_has_type("identifier") && !probe.move_to_previous_token() {
                return false;
            }
        }

        if !skip_keywords(&mut probe) {
            return false;
        }
        match probe.current_value() {
            "," => continue,
            ":" => {
                *cursor = probe;
                return true;
            }
            _ => return false,
        }
    }
}

/// On a `>`, move to the token before its `<`.
fn skip_template_arguments(cursor: &mut TokenCursor<'_>) -> bool {
    if cursor.current_value() != ">" {
        return true;
    }
    cursor.bwd_to_matching_token() && cursor.move_to_previous_token()
}

fn skip_keywords(cursor: &mut TokenCursor<'_>) -> bool {
    while cursor.current_type() == "keyword" {
        if !cursor.move_to_previous_token() {
            return false;
        }
    }
    true
}
