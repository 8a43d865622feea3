//! Line tokenizer adapter.
//!
//! A [`Tokenizer`] turns one line plus an entry [`LexerState`] into tokens and an exit state.
//! It must be a pure, total function of `(line, state)`: the token cache only re-tokenizes
//! rows whose entry state or content changed, and stops as soon as exit states re-converge.

use crate::error::CodeModelError;
use crate::token::{LexerState, LineTokens, Token};
use regex::Regex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Token type used for characters no rule matched.
pub const TEXT_TOKEN: &str = "text";

/// A line-oriented lexer.
pub trait Tokenizer: Send + Sync {
    /// State used for row 0.
    fn initial_state(&self) -> LexerState {
        LexerState::start()
    }

    /// Tokenize `line` starting in `state`.
    ///
    /// Must not fail for any input; unknown characters become [`TEXT_TOKEN`] tokens.
    fn tokenize_line(&self, line: &str, state: &LexerState) -> LineTokens;
}

/// State transition applied after a rule matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Replace the innermost state.
    Goto(String),
    /// Enter a nested state.
    Push(String),
    /// Return to the enclosing state.
    Pop,
}

/// A single regex rule of a [`RuleTokenizer`] state.
#[derive(Debug, Clone)]
pub struct TokenRule {
    regex: Regex,
    kind: String,
    transition: Option<Transition>,
}

impl TokenRule {
    /// Create a rule matching `pattern` at the current position and emitting `kind`.
    pub fn new(pattern: &str, kind: impl Into<String>) -> Result<Self, CodeModelError> {
        let anchored = format!("^(?:{pattern})");
        let regex = Regex::new(&anchored).map_err(|e| CodeModelError::regex(pattern, e))?;
        Ok(Self {
            regex,
            kind: kind.into(),
            transition: None,
        })
    }

    /// Switch to `state` after matching.
    pub fn goto(mut self, state: &str) -> Self {
        self.transition = Some(Transition::Goto(state.to_string()));
        self
    }

    /// Push `state` after matching.
    pub fn push(mut self, state: &str) -> Self {
        self.transition = Some(Transition::Push(state.to_string()));
        self
    }

    /// Pop the innermost state after matching.
    pub fn pop(mut self) -> Self {
        self.transition = Some(Transition::Pop);
        self
    }

    /// Token type emitted by this rule.
    pub fn kind(&self) -> &str {
        &self.kind
    }
}

/// Builder for [`RuleTokenizer`].
#[derive(Debug, Default)]
pub struct RuleTokenizerBuilder {
    states: Vec<(String, Vec<TokenRule>)>,
    initial: Option<String>,
}

impl RuleTokenizerBuilder {
    /// Define (or extend) a named state.
    pub fn state(mut self, name: &str, rules: Vec<TokenRule>) -> Self {
        match self.states.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => existing.extend(rules),
            None => self.states.push((name.to_string(), rules)),
        }
        self
    }

    /// Set the initial state name (defaults to `"start"`).
    pub fn initial(mut self, name: &str) -> Self {
        self.initial = Some(name.to_string());
        self
    }

    /// Validate transitions and build the tokenizer.
    pub fn build(self) -> Result<RuleTokenizer, CodeModelError> {
        let states: HashMap<String, Vec<TokenRule>> = self.states.into_iter().collect();
        let initial = self.initial.unwrap_or_else(|| "start".to_string());
        if !states.contains_key(&initial) {
            return Err(CodeModelError::UnknownState(initial));
        }

        for rule in states.values().flatten() {
            if let Some(Transition::Goto(target) | Transition::Push(target)) = &rule.transition
                && !states.contains_key(target)
            {
                return Err(CodeModelError::UnknownState(target.clone()));
            }
        }

        Ok(RuleTokenizer {
            states,
            initial: LexerState::new(initial),
        })
    }
}

/// A table-driven regex lexer: named states, each an ordered list of [`TokenRule`]s.
///
/// At every position the first matching rule of the innermost state wins. Characters no
/// rule matches are emitted as [`TEXT_TOKEN`] (adjacent text is merged into one token).
#[derive(Debug, Clone)]
pub struct RuleTokenizer {
    states: HashMap<String, Vec<TokenRule>>,
    initial: LexerState,
}

impl RuleTokenizer {
    /// Start building a tokenizer.
    pub fn builder() -> RuleTokenizerBuilder {
        RuleTokenizerBuilder::default()
    }
}

impl Tokenizer for RuleTokenizer {
    fn initial_state(&self) -> LexerState {
        self.initial.clone()
    }

    fn tokenize_line(&self, line: &str, state: &LexerState) -> LineTokens {
        let mut state = state.clone();
        let mut tokens: Vec<Token> = Vec::new();
        let mut byte = 0usize;
        let mut column = 0usize;

        // Zero-width transitions can ping-pong between states; bound the work per line.
        let max_steps = line.len().saturating_mul(4).saturating_add(16);
        let mut steps = 0usize;

        while byte < line.len() {
            steps += 1;
            let rest = &line[byte..];
            let rules = self.states.get(state.name());

            let found = if steps > max_steps {
                None
            } else {
                // An empty match only counts when it changes state.
                rules.and_then(|rules| {
                    rules.iter().find_map(|rule| {
                        let len = rule.regex.find(rest)?.end();
                        (len > 0 || rule.transition.is_some()).then_some((rule, len))
                    })
                })
            };

            match found {
                Some((rule, len)) => {
                    if len > 0 {
                        let value = &rest[..len];
                        push_token(&mut tokens, &rule.kind, value, column);
                        column += value.chars().count();
                        byte += len;
                    }
                    match &rule.transition {
                        Some(Transition::Goto(next)) => state.goto(next),
                        Some(Transition::Push(next)) => state.push(next),
                        Some(Transition::Pop) => state.pop(),
                        None => {}
                    }
                }
                _ => {
                    let ch_len = rest.chars().next().map_or(1, char::len_utf8);
                    push_token(&mut tokens, TEXT_TOKEN, &rest[..ch_len], column);
                    column += 1;
                    byte += ch_len;
                }
            }
        }

        LineTokens { tokens, state }
    }
}

fn push_token(tokens: &mut Vec<Token>, kind: &str, value: &str, column: usize) {
    if kind == TEXT_TOKEN
        && let Some(last) = tokens.last_mut()
        && last.kind == TEXT_TOKEN
        && last.end_column() == column
    {
        last.value.push_str(value);
        return;
    }
    tokens.push(Token::new(kind, value, column));
}

/// Wraps a tokenizer and counts `tokenize_line` calls.
#[derive(Debug)]
pub struct CountingTokenizer<T> {
    inner: T,
    calls: AtomicUsize,
}

impl<T: Tokenizer> CountingTokenizer<T> {
    /// Wrap `inner`.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of lines tokenized so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    /// Reset the counter to zero.
    pub fn reset(&self) {
        self.calls.store(0, Ordering::Relaxed);
    }
}

impl<T: Tokenizer> Tokenizer for CountingTokenizer<T> {
    fn initial_state(&self) -> LexerState {
        self.inner.initial_state()
    }

    fn tokenize_line(&self, line: &str, state: &LexerState) -> LineTokens {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.inner.tokenize_line(line, state)
    }
}
