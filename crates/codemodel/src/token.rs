//! Tokens and lexer states.

use std::fmt;

/// A token produced by a [`crate::Tokenizer`] for exactly one line.
///
/// `kind` is a dotted taxonomy (`"keyword.operator"`, `"paren.keyword.operator"`); consumers
/// test individual segments with [`Token::has_type`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
    /// Dotted token type.
    pub kind: String,
    /// Token text.
    pub value: String,
    /// Start column (in chars).
    pub column: usize,
}

impl Token {
    /// Create a token.
    pub fn new(kind: impl Into<String>, value: impl Into<String>, column: usize) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
            column,
        }
    }

    /// Length of the token value in chars.
    pub fn len(&self) -> usize {
        self.value.chars().count()
    }

    /// Returns `true` if the token value is empty.
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Exclusive end column.
    pub fn end_column(&self) -> usize {
        self.column + self.len()
    }

    /// Returns `true` if any dotted segment of the type equals `part`.
    pub fn has_type(&self, part: &str) -> bool {
        self.kind.split('.').any(|segment| segment == part)
    }

    /// Returns `true` if the token value equals `value`.
    pub fn is(&self, value: &str) -> bool {
        self.value == value
    }

    /// Pure whitespace, or a comment of any flavour.
    pub fn is_whitespace_or_comment(&self) -> bool {
        self.value.chars().all(char::is_whitespace)
            || self.kind.split('.').next() == Some("comment")
    }

    /// A bracket token (`paren` segment in its type).
    pub fn is_paren(&self) -> bool {
        self.has_type("paren")
    }
}

/// Opaque lexer state carried from the end of one line to the start of the next.
///
/// Represented as a stack of state names; [`LexerState::name`] is the innermost state. Two
/// states compare equal only if the whole stack matches, which is what the token cache relies
/// on to detect convergence.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LexerState {
    stack: Vec<String>,
}

impl LexerState {
    /// A single-level state.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            stack: vec![name.into()],
        }
    }

    /// The conventional initial state, `"start"`.
    pub fn start() -> Self {
        Self::new("start")
    }

    /// Innermost state name.
    pub fn name(&self) -> &str {
        self.stack.last().map(String::as_str).unwrap_or("start")
    }

    /// Nesting depth.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Replace the innermost state.
    pub fn goto(&mut self, name: &str) {
        match self.stack.last_mut() {
            Some(top) => {
                top.clear();
                top.push_str(name);
            }
            None => self.stack.push(name.to_string()),
        }
    }

    /// Enter a nested state.
    pub fn push(&mut self, name: &str) {
        self.stack.push(name.to_string());
    }

    /// Leave the innermost state. The outermost state is never popped.
    pub fn pop(&mut self) {
        if self.stack.len() > 1 {
            self.stack.pop();
        }
    }
}

impl Default for LexerState {
    fn default() -> Self {
        Self::start()
    }
}

impl fmt::Display for LexerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.stack.join("/"))
    }
}

/// Output of tokenizing one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineTokens {
    /// Tokens ordered by column.
    pub tokens: Vec<Token>,
    /// State at the end of the line.
    pub state: LexerState,
}

/// Drop whitespace and comment tokens, and split multi-character bracket tokens (`]]`,
/// merged `){`) into one token per character so bracket walks see single characters.
pub fn significant_tokens(tokens: &[Token]) -> Vec<Token> {
    let mut out = Vec::with_capacity(tokens.len());
    for token in tokens.iter().filter(|t| !t.is_whitespace_or_comment()) {
        if token.is_paren() && token.len() > 1 {
            let split = token.value.chars().enumerate().map(|(i, ch)| {
                Token::new(token.kind.clone(), ch.to_string(), token.column + i)
            });
            out.extend(split);
        } else {
            out.push(token.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_type_matches_whole_segments() {
        let t = Token::new("paren.keyword.operator", "(", 0);
        assert!(t.has_type("paren"));
        assert!(t.has_type("operator"));
        assert!(!t.has_type("key"));
        assert!(t.is_paren());
    }

    #[test]
    fn test_significant_tokens_explodes_brackets() {
        let tokens = vec![
            Token::new("identifier", "x", 0),
            Token::new("paren.keyword.operator", "[[", 1),
            Token::new("text", " ", 3),
            Token::new("comment", "# hi", 4),
        ];
        let sig = significant_tokens(&tokens);
        assert_eq!(
            sig,
            vec![
                Token::new("identifier", "x", 0),
                Token::new("paren.keyword.operator", "[", 1),
                Token::new("paren.keyword.operator", "[", 2),
            ]
        );
    }

    #[test]
    fn test_lexer_state_stack() {
        let mut state = LexerState::start();
        state.push("qstring");
        assert_eq!(state.name(), "qstring");
        assert_eq!(state.to_string(), "start/qstring");
        state.pop();
        state.pop();
        assert_eq!(state, LexerState::start());
        state.goto("comment");
        assert_eq!(state.name(), "comment");
    }
}
