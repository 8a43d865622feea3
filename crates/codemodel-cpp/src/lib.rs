#![warn(missing_docs)]
//! C/C++ language mode for `codemodel`.
//!
//! [`CppMode`] implements [`codemodel::LanguageMode`] for C and C++ sources, including R code
//! embedded in `/*** R` … `*/` comments. Indentation is heuristic: the [`lookaround`] helpers
//! read a bounded window of raw lines, and only the brace-owner search walks tokens.
//!
//! ```rust
//! use codemodel::{LanguageMode, LexerState, ModeConfig};
//! use codemodel_cpp::CppMode;
//!
//! let lines = vec!["int main() {"];
//! let mut mode = CppMode::new(ModeConfig::default(), lines.len()).unwrap();
//! let indent = mode.get_next_line_indent(&lines, &LexerState::start(), lines[0], "  ", 0);
//! assert_eq!(indent, "  ");
//! ```

pub mod lexer;
pub mod lookaround;
pub mod mode;

pub use lexer::CppLexer;
pub use lookaround::{Direction, NakedIndent};
pub use mode::CppMode;
