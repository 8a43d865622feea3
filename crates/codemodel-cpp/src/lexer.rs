//! C/C++ lexer.
//!
//! Block comments span lines through the `comment` state. `::` is a single
//! `keyword.operator` token so scope chains read as `name :: name` when walking backwards,
//! and `<`/`>` are always single-character tokens so template brackets can be matched.

use codemodel::{CodeModelError, LexerState, LineTokens, RuleTokenizer, TokenRule, Tokenizer};

/// Reserved words lexed as `keyword`.
pub const KEYWORDS: &[&str] = &[
    "alignas", "alignof", "asm", "auto", "bool", "break", "case", "catch", "char", "class",
    "const", "constexpr", "const_cast", "continue", "decltype", "default", "delete", "do",
    "double", "dynamic_cast", "else", "enum", "explicit", "export", "extern", "final", "float",
    "for", "friend", "goto", "if", "inline", "int", "long", "mutable", "namespace", "new",
    "noexcept", "operator", "override", "private", "protected", "public", "register",
    "reinterpret_cast", "return", "short", "signed", "sizeof", "static", "static_assert",
    "static_cast", "struct", "switch", "template", "this", "throw", "try", "typedef", "typeid",
    "typename", "union", "unsigned", "using", "virtual", "void", "volatile", "while",
];

/// Literal constants lexed as `constant.language`.
pub const CONSTANTS: &[&str] = &["true", "false", "nullptr", "NULL", "R_NilValue"];

/// Line tokenizer for C and C++.
#[derive(Debug, Clone)]
pub struct CppLexer {
    rules: RuleTokenizer,
}

impl CppLexer {
    /// Build the lexer.
    pub fn new() -> Result<Self, CodeModelError> {
        let start = vec![
            TokenRule::new(r"//.*", "comment")?,
            TokenRule::new(r"/\*.*?\*/", "comment")?,
            TokenRule::new(r"/\*", "comment")?.push("comment"),
            TokenRule::new(r#"#\s*include\s*(?:<[^>]*>|"[^"]*")?"#, "keyword.preprocessor")?,
            TokenRule::new(r"#\s*[A-Za-z_]\w*", "keyword.preprocessor")?,
            TokenRule::new(r#""(?:\\.|[^"\\])*"?"#, "string")?,
            TokenRule::new(r"'(?:\\.|[^'\\])*'?", "string")?,
            TokenRule::new(r"0[xX][0-9a-fA-F']+[uUlL]*", "constant.numeric")?,
            TokenRule::new(
                r"(?:\d[\d']*(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?[fFuUlL]*",
                "constant.numeric",
            )?,
            TokenRule::new(r"[A-Za-z_]\w*", "identifier")?,
            TokenRule::new(r"::", "keyword.operator")?,
            TokenRule::new(r"[(){}\[\]]", "paren.keyword.operator")?,
            TokenRule::new(
                r"->\*?|\+\+|--|<<=|<<|<=|>=|==|!=|&&|\|\||[-+*/%&|^]=|\.\.\.|[-+*/%&|^~!=<>?:.]",
                "keyword.operator",
            )?,
            TokenRule::new(r"[,;]", "punctuation")?,
            TokenRule::new(r"\\$", "punctuation")?,
            TokenRule::new(r"\s+", "text")?,
        ];
        let comment = vec![
            TokenRule::new(r".*?\*/", "comment")?.pop(),
            TokenRule::new(r".+", "comment")?,
        ];

        let rules = RuleTokenizer::builder()
            .state("start", start)
            .state("comment", comment)
            .build()?;
        Ok(Self { rules })
    }
}

impl Tokenizer for CppLexer {
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

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lex(line: &str, state: &LexerState) -> (Vec<(String, String)>, LexerState) {
        let out = CppLexer::new().unwrap().tokenize_line(line, state);
        let tokens = out
            .tokens
            .into_iter()
            .filter(|t| t.kind != "text")
            .map(|t| (t.kind, t.value))
            .collect();
        (tokens, out.state)
    }

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_declaration_tokens() {
        let (tokens, state) = lex("std::vector<int> v{1, 2}; // init", &LexerState::start());
        assert_eq!(
            tokens,
            pairs(&[
                ("identifier", "std"),
                ("keyword.operator", "::"),
                ("identifier", "vector"),
                ("keyword.operator", "<"),
                ("keyword", "int"),
                ("keyword.operator", ">"),
                ("identifier", "v"),
                ("paren.keyword.operator", "{"),
                ("constant.numeric", "1"),
                ("punctuation", ","),
                ("constant.numeric", "2"),
                ("paren.keyword.operator", "}"),
                ("punctuation", ";"),
                ("comment", "// init"),
            ])
        );
        assert_eq!(state, LexerState::start());
    }

    #[test]
    fn test_nested_template_closers_stay_single() {
        let (tokens, _) = lex("a<b<c>> x = nullptr;", &LexerState::start());
        let values: Vec<&str> = tokens.iter().map(|(_, v)| v.as_str()).collect();
        assert_eq!(values, vec!["a", "<", "b", "<", "c", ">", ">", "x", "=", "nullptr", ";"]);
        assert_eq!(tokens[9].0, "constant.language");
    }

    #[test]
    fn test_block_comment_spans_lines() {
        let (tokens, state) = lex("int x; /* open", &LexerState::start());
        assert_eq!(state.name(), "comment");
        assert_eq!(tokens.last().map(|(k, _)| k.as_str()), Some("comment"));

        let (tokens, state) = lex(" * still */ int y;", &state);
        assert_eq!(state, LexerState::start());
        assert_eq!(tokens[0], ("comment".to_string(), " * still */".to_string()));
        assert_eq!(tokens[1], ("keyword".to_string(), "int".to_string()));
    }

    #[test]
    fn test_preprocessor_lines() {
        let (tokens, _) = lex("#include <Rcpp.h>", &LexerState::start());
        assert_eq!(tokens, pairs(&[("keyword.preprocessor", "#include <Rcpp.h>")]));

        let (tokens, _) = lex("#define SQ(x) x * x \\", &LexerState::start());
        assert_eq!(tokens[0], ("keyword.preprocessor".to_string(), "#define".to_string()));
        assert_eq!(tokens.last().map(|(_, v)| v.as_str()), Some("\\"));
    }
}
