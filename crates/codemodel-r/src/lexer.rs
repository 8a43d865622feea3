//! R lexer.
//!
//! Token types follow the dotted taxonomy the indentation rules look at: `keyword`,
//! `constant.language`, `constant.numeric`, `string`, `comment`, `comment.sectionhead`,
//! `identifier`, `keyword.operator`, `paren.keyword.operator`, `punctuation` and `text`.
//! Strings may span lines (`qqstring` / `qstring` states).

use codemodel::{CodeModelError, LexerState, LineTokens, RuleTokenizer, TokenRule, Tokenizer};

/// Reserved words lexed as `keyword`.
pub const KEYWORDS: &[&str] = &[
    "function", "if", "else", "for", "in", "while", "repeat", "break", "next", "return",
    "switch",
];

/// Reserved constants lexed as `constant.language`.
pub const CONSTANTS: &[&str] = &[
    "NULL",
    "NA",
    "TRUE",
    "FALSE",
    "Inf",
    "NaN",
    "NA_integer_",
    "NA_real_",
    "NA_character_",
    "NA_complex_",
];

/// Line tokenizer for R source.
#[derive(Debug, Clone)]
pub struct RLexer {
    rules: RuleTokenizer,
}

impl RLexer {
    /// Build the lexer.
    pub fn new() -> Result<Self, CodeModelError> {
        let start = vec![
            TokenRule::new(r"#.*[-=#]{4,}\s*$", "comment.sectionhead")?,
            TokenRule::new(r"#.*", "comment")?,
            TokenRule::new(r#"""#, "string")?.push("qqstring"),
            TokenRule::new(r"'", "string")?.push("qstring"),
            TokenRule::new(r"`[^`]*`", "identifier")?,
            TokenRule::new(r"0[xX][0-9a-fA-F]+[Li]?", "constant.numeric")?,
            TokenRule::new(r"(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?[Li]?", "constant.numeric")?,
            TokenRule::new(r"[A-Za-z.][\w.]*", "identifier")?,
            TokenRule::new(r"\[\[|\]\]", "paren.keyword.operator")?,
            TokenRule::new(r"[\[\](){}]", "paren.keyword.operator")?,
            TokenRule::new(
                r"%[^%]*%|<<-|->>|<-|->|<=|>=|==|!=|\|\||&&|\|>|:::?|\*\*|[-+*/^<>=!&|~$@:?]",
                "keyword.operator",
            )?,
            TokenRule::new(r"[,;]", "punctuation")?,
            TokenRule::new(r"\s+", "text")?,
        ];

        let rules = RuleTokenizer::builder()
            .state("start", start)
            .state("qqstring", string_rules('"')?)
            .state("qstring", string_rules('\'')?)
            .build()?;
        Ok(Self { rules })
    }
}

fn string_rules(quote: char) -> Result<Vec<TokenRule>, CodeModelError> {
    Ok(vec![
        TokenRule::new(&format!(r"(?:\\.|[^{quote}\\])*{quote}"), "string")?.pop(),
        TokenRule::new(&format!(r"(?:\\.|[^{quote}\\])+"), "string")?,
        TokenRule::new(r"\\", "string")?,
    ])
}

impl Tokenizer for RLexer {
    fn tokenize_line(&self, line: &str, state: &LexerState) -> LineTokens {
        let mut out = self.rules.tokenize_line(line, state);
        for token in out.tokens.iter_mut().filter(|t| t.kind == "identifier") {
            if KEYWORDS.contains(&token.value.as_str()) {
                token.kind = "keyword".to_string();
            } else if CONSTANTS.contains(&token.value.as_str()) {
                token.kind = "constant.language".to_string();
            }
        }
        out
    }
}
