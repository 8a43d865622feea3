#![warn(missing_docs)]
//! `codemodel-lang` - data-driven language configuration helpers for `codemodel`.
//!
//! This crate intentionally stays lightweight and does **not** depend on any tokenizer or
//! regex machinery. It provides small structs that language modes use to describe comment
//! markers and bracket pairs, which the indentation and folding heuristics consult.

/// Comment tokens for a given language.
///
/// Folding uses the block markers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommentConfig {
    /// Line comment token (e.g. `//`, `#`).
    pub line: Option<String>,
    /// Block comment start token (e.g. `/*`).
    pub block_start: Option<String>,
    /// Block comment end token (e.g. `*/`).
    pub block_end: Option<String>,
}

impl CommentConfig {
    /// Create a config that supports only line comments.
    pub fn line(token: impl Into<String>) -> Self {
        Self {
            line: Some(token.into()),
            ..Self::default()
        }
    }

    /// Create a config that supports both line and block comments.
    pub fn line_and_block(
        line: impl Into<String>,
        block_start: impl Into<String>,
        block_end: impl Into<String>,
    ) -> Self {
        Self {
            line: Some(line.into()),
            block_start: Some(block_start.into()),
            block_end: Some(block_end.into()),
        }
    }

    /// Block comment markers, if both are configured and non-empty.
    pub fn block(&self) -> Option<(&str, &str)> {
        let start = self.block_start.as_deref().filter(|s| !s.is_empty())?;
        let end = self.block_end.as_deref().filter(|s| !s.is_empty())?;
        Some((start, end))
    }
}

/// A table of bracket complements (`(` ↔ `)`), used for balance tracking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BracketPairs {
    pairs: Vec<(char, char)>,
}

impl BracketPairs {
    /// Create a table from `(open, close)` pairs.
    pub fn new(pairs: impl IntoIterator<Item = (char, char)>) -> Self {
        Self {
            pairs: pairs.into_iter().collect(),
        }
    }

    /// `()`, `[]` and `{}`.
    pub fn standard() -> Self {
        Self::new([('(', ')'), ('[', ']'), ('{', '}')])
    }

    /// The standard pairs plus `<>`, for template-bearing C-like grammars.
    pub fn with_angles() -> Self {
        Self::new([('(', ')'), ('[', ']'), ('{', '}'), ('<', '>')])
    }

    /// Returns `true` if `ch` opens a pair.
    pub fn is_open(&self, ch: char) -> bool {
        self.pairs.iter().any(|(open, _)| *open == ch)
    }

    /// Returns `true` if `ch` closes a pair.
    pub fn is_close(&self, ch: char) -> bool {
        self.pairs.iter().any(|(_, close)| *close == ch)
    }

    /// The complement of `ch` in either direction.
    pub fn complement(&self, ch: char) -> Option<char> {
        self.pairs.iter().find_map(|&(open, close)| {
            if open == ch {
                Some(close)
            } else if close == ch {
                Some(open)
            } else {
                None
            }
        })
    }
}

impl Default for BracketPairs {
    fn default() -> Self {
        Self::standard()
    }
}

/// Static language description consumed by `codemodel` language modes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LanguageConfig {
    /// Language identifier (e.g. `"r"`, `"cpp"`).
    pub id: String,
    /// Comment markers.
    pub comments: CommentConfig,
    /// Brackets that participate in balance walks.
    pub brackets: BracketPairs,
}

impl LanguageConfig {
    /// R: `#` line comments, standard brackets.
    pub fn r() -> Self {
        Self {
            id: "r".to_string(),
            comments: CommentConfig::line("#"),
            brackets: BracketPairs::standard(),
        }
    }

    /// C/C++: `//` and `/* */` comments. Template angles share their characters with
    /// comparison and shift operators, so they are not part of the token-level pairs.
    pub fn cpp() -> Self {
        Self {
            id: "cpp".to_string(),
            comments: CommentConfig::line_and_block("//", "/*", "*/"),
            brackets: BracketPairs::standard(),
        }
    }
}
