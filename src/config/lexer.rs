//! Tokenizer for `gpib.conf` block syntax.
//!
//! The grammar is tiny: identifiers (`interface`, `set-reos`, `T30s`, `yes`),
//! double-quoted strings, decimal or `0x` hexadecimal integers, `{`, `}` and
//! `=`. Whitespace is insignificant. `/* ... */` block comments and `#` line
//! comments are skipped.

use crate::error::{ConfResult, GpibConfError, Position};
use std::iter::Peekable;
use std::str::Chars;

/// Lexical token kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// Bare word: block keywords, field keys, `yes`/`no`, timeout names.
    Ident(String),
    /// Contents of a double-quoted string, escapes resolved.
    Str(String),
    /// Integer literal together with its source spelling.
    Int {
        /// Numeric value.
        value: u64,
        /// Text as written, e.g. `0x0a`.
        text: String,
    },
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `=`
    Equals,
}

impl TokenKind {
    /// Human-readable description for error messages.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Ident(s) => format!("'{s}'"),
            TokenKind::Str(s) => format!("string \"{s}\""),
            TokenKind::Int { text, .. } => format!("integer {text}"),
            TokenKind::LBrace => "'{'".to_string(),
            TokenKind::RBrace => "'}'".to_string(),
            TokenKind::Equals => "'='".to_string(),
        }
    }
}

/// A token and the position of its first character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// What was read.
    pub kind: TokenKind,
    /// Where it starts.
    pub pos: Position,
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            chars: text.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    fn pos(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn syntax(pos: Position, message: impl Into<String>) -> GpibConfError {
        GpibConfError::Syntax {
            pos,
            message: message.into(),
        }
    }

    fn skip_trivia(&mut self) -> ConfResult<()> {
        loop {
            match self.chars.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('#') => {
                    while let Some(c) = self.bump() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                Some('/') => {
                    let start = self.pos();
                    self.bump();
                    if self.bump() != Some('*') {
                        return Err(Self::syntax(start, "stray '/'"));
                    }
                    let mut prev = '\0';
                    loop {
                        match self.bump() {
                            Some('/') if prev == '*' => break,
                            Some(c) => prev = c,
                            None => return Err(Self::syntax(start, "unterminated comment")),
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn next_token(&mut self) -> ConfResult<Option<Token>> {
        self.skip_trivia()?;
        let pos = self.pos();
        let Some(&c) = self.chars.peek() else {
            return Ok(None);
        };

        let kind = match c {
            '{' => {
                self.bump();
                TokenKind::LBrace
            }
            '}' => {
                self.bump();
                TokenKind::RBrace
            }
            '=' => {
                self.bump();
                TokenKind::Equals
            }
            '"' => self.string(pos)?,
            '0'..='9' => self.integer(pos)?,
            c if c.is_ascii_alphabetic() || c == '_' => self.ident(),
            other => return Err(Self::syntax(pos, format!("unexpected character '{other}'"))),
        };
        Ok(Some(Token { kind, pos }))
    }

    fn string(&mut self, start: Position) -> ConfResult<TokenKind> {
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(TokenKind::Str(out)),
                Some('\\') => match self.bump() {
                    Some('"') => out.push('"'),
                    Some('\\') => out.push('\\'),
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some('u') => out.push(self.unicode_escape()?),
                    Some(other) => {
                        return Err(Self::syntax(
                            self.pos(),
                            format!("unsupported escape '\\{other}'"),
                        ))
                    }
                    None => return Err(Self::syntax(start, "unterminated string")),
                },
                Some('\n') | None => return Err(Self::syntax(start, "unterminated string")),
                Some(c) => out.push(c),
            }
        }
    }

    /// Reads the `{hex}` part of a `\u{hex}` escape.
    fn unicode_escape(&mut self) -> ConfResult<char> {
        let pos = self.pos();
        if self.bump() != Some('{') {
            return Err(Self::syntax(pos, "expected '{' after '\\u'"));
        }
        let mut hex = String::new();
        loop {
            match self.bump() {
                Some('}') => break,
                Some(c) if c.is_ascii_hexdigit() && hex.len() < 6 => hex.push(c),
                _ => return Err(Self::syntax(pos, "malformed unicode escape")),
            }
        }
        u32::from_str_radix(&hex, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| Self::syntax(pos, format!("invalid unicode escape '\\u{{{hex}}}'")))
    }

    fn integer(&mut self, start: Position) -> ConfResult<TokenKind> {
        let mut text = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }

        let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(hex, 16),
            None => text.parse::<u64>(),
        };
        parsed
            .map(|value| TokenKind::Int {
                value,
                text: text.clone(),
            })
            .map_err(|_| Self::syntax(start, format!("malformed integer '{text}'")))
    }

    fn ident(&mut self) -> TokenKind {
        let mut text = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        TokenKind::Ident(text)
    }
}

/// Splits configuration text into tokens.
pub fn tokenize(text: &str) -> ConfResult<Vec<Token>> {
    let mut lexer = Lexer::new(text);
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token()? {
        tokens.push(token);
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<TokenKind> {
        tokenize(text)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn tokenizes_a_field() {
        assert_eq!(
            kinds("set-reos = no"),
            vec![
                TokenKind::Ident("set-reos".into()),
                TokenKind::Equals,
                TokenKind::Ident("no".into()),
            ]
        );
    }

    #[test]
    fn reads_hex_and_decimal_integers() {
        assert_eq!(
            kinds("0x0a 24"),
            vec![
                TokenKind::Int {
                    value: 10,
                    text: "0x0a".into()
                },
                TokenKind::Int {
                    value: 24,
                    text: "24".into()
                },
            ]
        );
    }

    #[test]
    fn skips_comments() {
        let text = "/* board\n settings */ interface # trailing\n{ }";
        assert_eq!(
            kinds(text),
            vec![
                TokenKind::Ident("interface".into()),
                TokenKind::LBrace,
                TokenKind::RBrace,
            ]
        );
    }

    #[test]
    fn tracks_positions() {
        let tokens = tokenize("device {\n  pad = 24\n}").unwrap();
        assert_eq!(tokens[2].pos, Position::new(2, 3));
        assert_eq!(tokens[4].pos, Position::new(2, 9));
        assert_eq!(tokens[5].pos, Position::new(3, 1));
    }

    #[test]
    fn resolves_string_escapes() {
        assert_eq!(
            kinds(r#""say \"hi\" \\ bye""#),
            vec![TokenKind::Str(r#"say "hi" \ bye"#.into())]
        );
    }

    #[test]
    fn resolves_control_escapes() {
        assert_eq!(
            kinds(r#""a\tb\nc\r\u{7}""#),
            vec![TokenKind::Str("a\tb\nc\r\u{7}".into())]
        );
        assert!(tokenize(r#""\u7""#).is_err());
        assert!(tokenize(r#""\u{d800}""#).is_err());
        assert!(tokenize(r#""\q""#).is_err());
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(tokenize("\"open").is_err());
        assert!(tokenize("/* open").is_err());
        assert!(tokenize("0xzz").is_err());
        assert!(tokenize("12ab").is_err());
        assert!(tokenize("pad = -1").is_err());
        assert!(tokenize("a / b").is_err());
    }
}
