//! Token cache coherency under random edit sequences, plus the convergence and idempotence
//! guarantees of incremental re-tokenization.

use codemodel::{
    CountingTokenizer, Document, DocumentDelta, Position, Range, RuleTokenizer, TextBuffer,
    Token, TokenCache, TokenRule,
};
use pretty_assertions::assert_eq;
use rand::Rng;
use std::sync::Arc;

fn lexer() -> RuleTokenizer {
    RuleTokenizer::builder()
        .state(
            "start",
            vec![
                TokenRule::new(r"/\*", "comment").unwrap().push("block"),
                TokenRule::new(r#"""#, "string").unwrap().push("qqstring"),
                TokenRule::new(r"#.*", "comment").unwrap(),
                TokenRule::new(r"\d+", "constant.numeric").unwrap(),
                TokenRule::new(r"[A-Za-z_]\w*", "identifier").unwrap(),
                TokenRule::new(r"[(){}\[\]]", "paren.keyword.operator").unwrap(),
                TokenRule::new(r"<-|[+*=,-]", "keyword.operator").unwrap(),
                TokenRule::new(r"\s+", "text").unwrap(),
            ],
        )
        .state(
            "qqstring",
            vec![
                TokenRule::new(r#"(?:[^"\\]|\\.)*""#, "string").unwrap().pop(),
                TokenRule::new(r".+", "string").unwrap(),
            ],
        )
        .state(
            "block",
            vec![
                TokenRule::new(r"\*/", "comment").unwrap().pop(),
                TokenRule::new(r"(?:[^*]|\*[^/])+", "comment").unwrap(),
                TokenRule::new(r"\*", "comment").unwrap(),
            ],
        )
        .build()
        .unwrap()
}

fn sample_lines(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| match i % 7 {
            0 => format!("f{i} <- function(x, y) {{"),
            1 => "  z <- x + y # add".to_string(),
            2 => "  s <- \"multi".to_string(),
            3 => "  line\" ".to_string(),
            4 => "  /* block".to_string(),
            5 => "  end */ z[[1]]".to_string(),
            _ => "}".to_string(),
        })
        .collect()
}

fn from_scratch(doc: &Document, last_row: usize) -> Vec<Vec<Token>> {
    let mut cache = TokenCache::new(Arc::new(lexer()), doc.line_count());
    cache.tokenize_up_to_row(doc, last_row);
    (0..=last_row)
        .map(|row| cache.row_tokens(row).unwrap_or_default().to_vec())
        .collect()
}

fn cached(cache: &TokenCache, last_row: usize) -> Vec<Vec<Token>> {
    (0..=last_row)
        .map(|row| cache.row_tokens(row).unwrap_or_default().to_vec())
        .collect()
}

fn random_position(rng: &mut impl Rng, doc: &Document) -> Position {
    let row = rng.gen_range(0..doc.line_count());
    let len = doc.line_len(row).unwrap_or(0);
    Position::new(row, rng.gen_range(0..=len))
}

fn random_edit(rng: &mut impl Rng, doc: &mut Document) -> Vec<DocumentDelta> {
    const SNIPPETS: &[&str] = &["x", "\"", "/*", "*/", "\n", "a\nb", "(", "]]", " # c", "\n\n"];
    match rng.gen_range(0..5) {
        0 | 1 => {
            let pos = random_position(rng, doc);
            let text = SNIPPETS[rng.gen_range(0..SNIPPETS.len())];
            doc.insert(pos, text).unwrap()
        }
        2 => {
            let a = random_position(rng, doc);
            let b = random_position(rng, doc);
            doc.remove(Range::from_positions(a, b)).unwrap()
        }
        3 => {
            let row = rng.gen_range(0..=doc.line_count());
            doc.insert_lines(row, &["q <- \"open", "/* x */ y"]).unwrap()
        }
        _ => {
            let first = rng.gen_range(0..doc.line_count());
            let last = (first + rng.gen_range(0..3)).min(doc.line_count() - 1);
            doc.remove_lines(first, last).unwrap()
        }
    }
}

#[test]
fn test_random_edits_match_fresh_tokenization() {
    let mut rng = rand::thread_rng();

    for _ in 0..20 {
        let mut doc = Document::from_lines(sample_lines(40));
        let mut cache = TokenCache::new(Arc::new(lexer()), doc.line_count());
        cache.tokenize_up_to_row(&doc, usize::MAX);

        for _ in 0..60 {
            for delta in random_edit(&mut rng, &mut doc) {
                cache.on_change(&delta);
            }
            assert_eq!(cache.len(), doc.line_count());

            // Query a random prefix, sometimes the whole document.
            let last_row = if rng.gen_bool(0.3) {
                doc.line_count() - 1
            } else {
                rng.gen_range(0..doc.line_count())
            };
            assert!(cache.tokenize_up_to_row(&doc, last_row));
            assert_eq!(cached(&cache, last_row), from_scratch(&doc, last_row));
        }
    }
}

#[test]
fn test_single_char_edit_does_not_retokenize_following_rows() {
    let mut doc = Document::from_lines(sample_lines(210));
    let counting = Arc::new(CountingTokenizer::new(lexer()));
    let mut cache = TokenCache::new(counting.clone(), doc.line_count());
    cache.tokenize_up_to_row(&doc, usize::MAX);
    assert_eq!(counting.calls(), 210);

    // Row 99 is `  z <- x + y # add`; typing inside an identifier keeps the state.
    for delta in doc.insert(Position::new(99, 3), "z").unwrap() {
        cache.on_change(&delta);
    }
    counting.reset();
    cache.tokenize_up_to_row(&doc, usize::MAX);
    assert_eq!(counting.calls(), 1);
    assert_eq!(cached(&cache, 209), from_scratch(&doc, 209));
}

#[test]
fn test_line_split_and_join_reconverge_immediately() {
    let mut doc = Document::from_lines(sample_lines(70));
    let counting = Arc::new(CountingTokenizer::new(lexer()));
    let mut cache = TokenCache::new(counting.clone(), doc.line_count());
    cache.tokenize_up_to_row(&doc, usize::MAX);

    // Row 29 is `  z <- x + y # add`; split it after the indent.
    for delta in doc.insert(Position::new(29, 2), "\n").unwrap() {
        cache.on_change(&delta);
    }
    counting.reset();
    cache.tokenize_up_to_row(&doc, usize::MAX);
    assert_eq!(counting.calls(), 2);
    assert_eq!(cached(&cache, doc.line_count() - 1), from_scratch(&doc, doc.line_count() - 1));

    // Join rows 7..=9 back into one.
    for delta in doc.remove(Range::new(7, 5, 9, 2)).unwrap() {
        cache.on_change(&delta);
    }
    counting.reset();
    cache.tokenize_up_to_row(&doc, usize::MAX);
    assert_eq!(counting.calls(), 1);
    assert_eq!(cached(&cache, doc.line_count() - 1), from_scratch(&doc, doc.line_count() - 1));
}

#[test]
fn test_state_change_propagates_until_reconvergence() {
    let mut doc = Document::from_lines(["a", "b", "c \"", "d\"", "e", "f"]);
    let counting = Arc::new(CountingTokenizer::new(lexer()));
    let mut cache = TokenCache::new(counting.clone(), doc.line_count());
    cache.tokenize_up_to_row(&doc, 5);

    // Opening a comment on row 0 swallows everything below.
    for delta in doc.insert(Position::new(0, 1), " /*").unwrap() {
        cache.on_change(&delta);
    }
    counting.reset();
    cache.tokenize_up_to_row(&doc, 2);
    assert_eq!(counting.calls(), 3);
    // Stopped before re-converging: row 3 must be dirty.
    assert!(!cache.is_row_valid(3));

    cache.tokenize_up_to_row(&doc, 5);
    assert_eq!(counting.calls(), 6);
    assert_eq!(cache.end_state(5).map(|s| s.name()), Some("block"));
    assert_eq!(cached(&cache, 5), from_scratch(&doc, 5));
}

#[test]
fn test_repeated_queries_are_idempotent() {
    let doc = Document::from_lines(sample_lines(50));
    let counting = Arc::new(CountingTokenizer::new(lexer()));
    let mut cache = TokenCache::new(counting.clone(), doc.line_count());

    cache.tokenize_up_to_row(&doc, 30);
    let first = cached(&cache, 30);
    let calls = counting.calls();
    assert_eq!(calls, 31);

    cache.tokenize_up_to_row(&doc, 30);
    assert_eq!(counting.calls(), calls);
    assert_eq!(cached(&cache, 30), first);
}
