use crate::error::FrugalError;
use crate::utils::quote;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    pub static ref TOKEN_REGEX: Regex = Regex::new(
        r#"(/\*\*[\s\S]*?\*/|/\*[\s\S]*?\*/|//[^\n]*|#[^\n]*|"(?:\\[\s\S]|[^"\\])*"|'(?:\\[\s\S]|[^'\\])*'|[+-]?\d+(?:\.\d+)?(?:[Ee][+-]?\d+)?|[A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*|[{}()<>\[\],;:=*]|\s+)"#
    )
    .unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    DocComment,
    StringLit,
    Number,
    Identifier,
    Symbol,
    Eof,
}

#[derive(Debug, PartialEq)]
pub struct Token {
    pub kind:   TokenKind,
    pub text:   String,
    pub line:   usize,
    pub column: usize,
}

/// Interprets backslash escapes inside a string literal body. Unknown
/// escapes keep the escaped character as-is.
fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Tokenizes IDL source text. The token stream always ends with an EOF
/// token carrying the position just past the last input character. Any text
/// the master regex cannot match is a syntax error at that position.
pub fn tokenize(text: &str, file: &str) -> Result<Vec<Token>, FrugalError> {
    let mut tokens = Vec::new();
    let mut line = 1;
    let mut column = 1;
    let mut last_end = 0;

    let syntax_error = |unexpected: &str, line: usize, column: usize| FrugalError::Syntax {
        file:   file.to_string(),
        line,
        column,
        msg:    format!("unexpected text {}", quote(unexpected)),
    };

    for mat in TOKEN_REGEX.find_iter(text) {
        let (start, end) = (mat.start(), mat.end());
        let part = mat.as_str();

        if start > last_end {
            return Err(syntax_error(&text[last_end..start], line, column));
        }

        let first = part.chars().next().unwrap_or('\0');
        let kind = if part.starts_with("/**") && part.len() > 4 {
            Some(TokenKind::DocComment)
        } else if part.starts_with("/*") || part.starts_with("//") || first == '#' {
            None
        } else if first == '"' || first == '\'' {
            Some(TokenKind::StringLit)
        } else if first.is_ascii_digit() || first == '+' || first == '-' {
            Some(TokenKind::Number)
        } else if first.is_ascii_alphabetic() || first == '_' {
            Some(TokenKind::Identifier)
        } else if first.is_whitespace() {
            None
        } else {
            Some(TokenKind::Symbol)
        };

        if let Some(kind) = kind {
            let text = match kind {
                TokenKind::StringLit => unescape(&part[1..part.len() - 1]),
                _ => part.to_string(),
            };
            tokens.push(Token {
                kind,
                text,
                line,
                column,
            });
        }

        let newline_count = part.matches('\n').count();
        if newline_count > 0 {
            line += newline_count;
            if let Some(last_line_part) = part.split('\n').last() {
                column = last_line_part.chars().count() + 1;
            }
        } else {
            column += part.chars().count();
        }

        last_end = end;
    }

    if last_end != text.len() {
        return Err(syntax_error(&text[last_end..], line, column));
    }

    tokens.push(Token {
        kind:   TokenKind::Eof,
        text:   String::new(),
        line,
        column,
    });
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|t| t.text.as_str()).collect()
    }

    #[test]
    fn test_tokenize_simple_field() {
        let got = tokenize("1: i32 num,", "test").unwrap();
        assert_eq!(texts(&got), vec!["1", ":", "i32", "num", ",", ""]);
        assert_eq!(got[0].kind, TokenKind::Number);
        assert_eq!(got[2].kind, TokenKind::Identifier);
        assert_eq!(got[2].column, 4);
        assert_eq!(got.last().unwrap().kind, TokenKind::Eof);
    }

    #[test]
    fn test_tokenize_comments_skipped() {
        let input = "// line\n# hash\n/* block\nspanning */ struct";
        let got = tokenize(input, "test").unwrap();
        assert_eq!(texts(&got), vec!["struct", ""]);
        assert_eq!(got[0].line, 4);
    }

    #[test]
    fn test_tokenize_doc_comment_kept() {
        let got = tokenize("/** docs */ enum", "test").unwrap();
        assert_eq!(got[0].kind, TokenKind::DocComment);
        assert_eq!(got[0].text, "/** docs */");
        assert_eq!(got[1].text, "enum");
    }

    #[test]
    fn test_tokenize_empty_block_comment_is_not_a_doc() {
        let got = tokenize("/**/ x", "test").unwrap();
        assert_eq!(texts(&got), vec!["x", ""]);
    }

    #[test]
    fn test_tokenize_string_literals() {
        let got = tokenize(r#""dou\"ble" 'sin\'gle'"#, "test").unwrap();
        assert_eq!(got[0].kind, TokenKind::StringLit);
        assert_eq!(got[0].text, "dou\"ble");
        assert_eq!(got[1].text, "sin'gle");
    }

    #[test]
    fn test_tokenize_numbers() {
        let got = tokenize("-42 +7 3.14 1e5 2.5E-3", "test").unwrap();
        let nums: Vec<&str> = got[..5].iter().map(|t| t.text.as_str()).collect();
        assert_eq!(nums, vec!["-42", "+7", "3.14", "1e5", "2.5E-3"]);
        assert!(got[..5].iter().all(|t| t.kind == TokenKind::Number));
    }

    #[test]
    fn test_tokenize_dotted_identifier_is_one_token() {
        let got = tokenize("base.NotFound", "test").unwrap();
        assert_eq!(texts(&got), vec!["base.NotFound", ""]);
    }

    #[test]
    fn test_tokenize_unexpected_text() {
        let err = tokenize("struct ^Foo", "test").unwrap_err();
        match err {
            FrugalError::Syntax { line, column, .. } => {
                assert_eq!(line, 1);
                assert_eq!(column, 8);
            }
            other => panic!("expected a syntax error but got {:?}", other),
        }
    }
}
