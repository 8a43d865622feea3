//! Error types.

use thiserror::Error;

#[derive(Debug, Error)]
/// Errors produced while building language modes or editing a [`crate::Document`].
pub enum CodeModelError {
    #[error("config parse error: {0}")]
    /// YAML configuration could not be parsed.
    Config(#[from] serde_yaml::Error),

    #[error("regex compile error for pattern '{pattern}': {message}")]
    /// A tokenizer or fold rule pattern failed to compile.
    RegexCompile {
        /// The regex pattern string.
        pattern: String,
        /// The compiler error message.
        message: String,
    },

    #[error("unknown lexer state '{0}'")]
    /// A tokenizer rule transitions to a state that is not defined.
    UnknownState(String),

    #[error("position {row}:{column} is outside the document")]
    /// An edit addressed a row or column that does not exist.
    PositionOutOfRange {
        /// Zero-based row.
        row: usize,
        /// Zero-based column (in chars).
        column: usize,
    },
}

impl CodeModelError {
    /// Wrap a compile failure of `pattern`.
    pub fn regex(pattern: &str, err: regex::Error) -> Self {
        Self::RegexCompile {
            pattern: pattern.to_string(),
            message: err.to_string(),
        }
    }
}
