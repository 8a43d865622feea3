#![warn(missing_docs)]
//! Codemodel - Incremental Token Cache and Indentation Heuristics for Editor Language Modes
//!
//! # Overview
//!
//! `codemodel` is the language-independent half of an editor code model. It keeps a per-row
//! token cache in step with a mutable text buffer, answers token navigation queries on top of
//! it, and provides the building blocks language modes use to decide indentation and folding.
//! It does not render anything and owns no buffer; an editor forwards buffer changes and asks
//! questions.
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  LanguageMode (R, C++ crates)               │  ← Editor API
//! ├─────────────────────────────────────────────┤
//! │  Indent helpers · FoldResolver · Chunks     │  ← Heuristics
//! ├─────────────────────────────────────────────┤
//! │  TokenNavigator · TokenCursor               │  ← Token queries
//! ├─────────────────────────────────────────────┤
//! │  TokenCache (incremental, convergent)       │  ← Per-row tokens + states
//! ├─────────────────────────────────────────────┤
//! │  Tokenizer (RuleTokenizer)                  │  ← Line lexer
//! ├─────────────────────────────────────────────┤
//! │  TextBuffer · Document · DocumentDelta      │  ← Buffer boundary
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use codemodel::{Document, Position, RuleTokenizer, TokenCache, TokenRule, TextBuffer};
//! use std::sync::Arc;
//!
//! let lexer = RuleTokenizer::builder()
//!     .state("start", vec![
//!         TokenRule::new(r"[A-Za-z_]\w*", "identifier").unwrap(),
//!         TokenRule::new(r"[(){}]", "paren").unwrap(),
//!         TokenRule::new(r"\s+", "text").unwrap(),
//!     ])
//!     .build()
//!     .unwrap();
//!
//! let mut doc = Document::new("f(x) {\n  y\n}");
//! let mut cache = TokenCache::new(Arc::new(lexer), doc.line_count());
//!
//! for delta in doc.insert(Position::new(1, 3), "z").unwrap() {
//!     cache.on_change(&delta);
//! }
//!
//! let mut nav = cache.navigator(&doc);
//! let next = nav.find_next_significant_token(Position::new(1, 0), 2).unwrap();
//! assert_eq!(next.token.value, "yz");
//! ```
//!
//! # Module Description
//!
//! - [`buffer`] - `TextBuffer` trait, line overrides and the rope-backed `Document`
//! - [`delta`] - structured buffer change deltas
//! - [`tokenizer`] - `Tokenizer` trait and the table-driven `RuleTokenizer`
//! - [`cache`] - incremental per-row token cache
//! - [`navigation`] - significant-token search and bracket walks
//! - [`cursor`] - token-by-token cursor over significant tokens
//! - [`chunk`] - embedded chunk row classification
//! - [`fold`] - fold widgets and ranges
//! - [`indent`] - indentation helpers and the `LanguageMode` trait
//! - [`config`] - mode configuration

pub mod buffer;
pub mod cache;
pub mod chunk;
pub mod config;
pub mod cursor;
pub mod delta;
pub mod error;
pub mod fold;
pub mod indent;
pub mod navigation;
pub mod position;
pub mod token;
pub mod tokenizer;

pub use buffer::{Document, LineOverride, TextBuffer};
pub use cache::TokenCache;
pub use chunk::{ChunkTracker, RowClass};
pub use config::ModeConfig;
pub use cursor::TokenCursor;
pub use delta::{DeltaAction, DocumentDelta};
pub use error::CodeModelError;
pub use fold::{FoldResolver, FoldRules, FoldStyle, FoldWidget};
pub use indent::LanguageMode;
pub use navigation::{FoundToken, ParenHook, TokenNavigator};
pub use position::{Position, Range};
pub use token::{LexerState, LineTokens, Token};
pub use tokenizer::{CountingTokenizer, RuleTokenizer, TokenRule, Tokenizer};

pub use codemodel_lang::{BracketPairs, CommentConfig, LanguageConfig};
