#![warn(missing_docs)]
//! R language mode for `codemodel`.
//!
//! [`RMode`] implements [`codemodel::LanguageMode`] for R sources:
//!
//! - next-line indentation after control headers (`if (...)`, `for (...)`, `while (...)`,
//!   `function(...)`), `repeat`/`else`, trailing binary operators, and inside unbalanced
//!   brackets (block indent, or alignment with the first argument)
//! - outdent of a typed `}` to the construct that opened its block
//! - folding of brackets, `# Section ----` headers and fenced chunks
//! - a function scope tree ([`RMode::current_function`], [`RMode::function_tree`])
//!
//! ```rust
//! use codemodel::{LanguageMode, LexerState, ModeConfig};
//! use codemodel_r::RMode;
//!
//! let lines = vec!["if (x > 1) {"];
//! let mut mode = RMode::new(ModeConfig::default(), lines.len()).unwrap();
//! let indent = mode.get_next_line_indent(&lines, &LexerState::start(), lines[0], "  ", 0);
//! assert_eq!(indent, "  ");
//! ```

pub mod lexer;
pub mod mode;
pub mod scope;

pub use lexer::RLexer;
pub use mode::RMode;
pub use scope::{FunctionScope, Scope, ScopeTree};
