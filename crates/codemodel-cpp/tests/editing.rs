//! C++ mode driven through a `Document`.

use codemodel::{
    Document, DocumentDelta, FoldStyle, FoldWidget, LanguageMode, LexerState, ModeConfig,
    Position, Range, RowClass, TextBuffer,
};
use codemodel_cpp::CppMode;
use pretty_assertions::assert_eq;

fn open(lines: &[&str]) -> (Document, CppMode) {
    let doc = Document::from_lines(lines);
    let mode = CppMode::new(ModeConfig::default(), doc.line_count()).unwrap();
    (doc, mode)
}

fn apply(mode: &mut CppMode, deltas: Vec<DocumentDelta>) {
    for delta in &deltas {
        mode.on_change(delta);
    }
}

fn outdent(lines: &[&str], row: usize) -> String {
    let (mut doc, mut mode) = open(lines);
    mode.auto_outdent(&LexerState::start(), &mut doc, row);
    doc.line(row).map(|l| l.into_owned()).unwrap_or_default()
}

#[test]
fn test_close_brace_outdents_to_class_row() {
    let (mut doc, mut mode) = open(&["class Foo :", "    public Bar {", "  int x;", "    "]);
    let state = LexerState::start();

    assert!(mode.check_outdent(&state, "    ", "}"));
    let deltas = doc.insert(Position::new(3, 4), "}").unwrap();
    apply(&mut mode, deltas);
    mode.auto_outdent(&state, &mut doc, 3);

    assert_eq!(doc.text(), "class Foo :\n    public Bar {\n  int x;\n}");
}

#[test]
fn test_close_brace_ignores_comparisons() {
    assert_eq!(outdent(&["  if (a < b) {", "    x = y > 2;", "    }"], 2), "  }");
}

#[test]
fn test_labels_outdent_to_their_block() {
    assert_eq!(outdent(&["class A {", "    public:"], 1), "public:");
    assert_eq!(
        outdent(&["void f(int x) {", "  switch (x) {", "      case 1:"], 2),
        "    case 1:"
    );
}

#[test]
fn test_else_outdents_to_its_if() {
    assert_eq!(outdent(&["if (x)", "    a();", "    else"], 2), "else");
    assert_eq!(outdent(&["if (x) {", "  a();", "}", "  else {"], 3), "else {");
}

#[test]
fn test_closing_bracket_and_angle() {
    assert_eq!(outdent(&["  auto v = m[", "      key", "      ]"], 2), "  ]");
    assert_eq!(
        outdent(&["template <typename T,", "          typename U", "          >"], 2),
        ">"
    );
}

#[test]
fn test_macro_continuation_is_indented_under_define() {
    assert_eq!(
        outdent(&["#define SWAP(a, b) \\", "do { \\", "  x; \\"], 1),
        "  do { \\"
    );
    // Not part of a macro: left alone.
    assert_eq!(outdent(&["int x;", "  y = \\"], 1), "  y = \\");
}

#[test]
fn test_chunk_rows_are_not_outdented() {
    assert_eq!(outdent(&["/*** R", "    }", "*/"], 1), "    }");
}

#[test]
fn test_embedded_chunk_folds() {
    let (doc, mut mode) = open(&["int x;", "/*** R", "x <- 1", "*/", "int y;"]);
    let style = FoldStyle::MarkBeginEnd;

    assert_eq!(mode.row_class(&doc, 2), RowClass::ChunkBody);
    assert_eq!(mode.get_fold_widget(&doc, style, 1), FoldWidget::Start);
    assert_eq!(mode.get_fold_widget_range(&doc, style, 1), Some(Range::new(1, 6, 3, 0)));
    assert_eq!(mode.get_fold_widget(&doc, style, 3), FoldWidget::End);
    assert_eq!(mode.get_fold_widget(&doc, style, 2), FoldWidget::Empty);
    assert_eq!(mode.get_fold_widget(&doc, FoldStyle::MarkBegin, 3), FoldWidget::Empty);
    assert_eq!(mode.get_fold_widget(&doc, FoldStyle::Manual, 1), FoldWidget::Empty);
}

#[test]
fn test_comment_and_brace_folds() {
    let (doc, mut mode) = open(&["/*", " * doc", " */", "int f() {", "  return 1;", "}"]);
    let style = FoldStyle::MarkBeginEnd;

    assert_eq!(mode.get_fold_widget(&doc, style, 0), FoldWidget::Start);
    assert_eq!(mode.get_fold_widget_range(&doc, style, 0), Some(Range::new(0, 2, 2, 1)));
    assert_eq!(mode.get_fold_widget(&doc, style, 3), FoldWidget::Start);
    assert_eq!(mode.get_fold_widget_range(&doc, style, 3), Some(Range::new(3, 9, 5, 0)));
    assert_eq!(mode.get_fold_widget(&doc, style, 5), FoldWidget::End);
}

#[test]
fn test_enter_on_blank_row_keeps_block_indent() {
    let (mut doc, mut mode) = open(&["int f() {", "  x();", "}"]);
    let tab = ModeConfig::default().tab_string();

    let deltas = doc.insert(Position::new(1, 6), "\n").unwrap();
    apply(&mut mode, deltas);
    assert_eq!(doc.line(2).as_deref(), Some(""));
    let state = mode.end_state(&doc, 2).unwrap();
    assert_eq!(mode.get_next_line_indent(&doc, &state, "", &tab, 2), "  ");
}

#[test]
fn test_indent_follows_edits() {
    let (mut doc, mut mode) = open(&["int main() {", "  return 0;", "}"]);
    let tab = ModeConfig::default().tab_string();

    let deltas = doc.replace(Range::new(1, 2, 1, 11), "if (x)").unwrap();
    apply(&mut mode, deltas);
    let line = doc.line(1).unwrap().into_owned();
    let state = mode.end_state(&doc, 1).unwrap();
    assert_eq!(mode.get_next_line_indent(&doc, &state, &line, &tab, 1), "    ");

    let deltas = doc.insert(Position::new(1, 8), " /* open").unwrap();
    apply(&mut mode, deltas);
    let state = mode.end_state(&doc, 1).unwrap();
    assert_eq!(state.name(), "comment");
    assert_eq!(
        mode.end_state(&doc, 2).map(|s| s.name().to_string()).as_deref(),
        Some("comment")
    );
}
