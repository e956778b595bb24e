//! Splits SQL text into coarse tokens.
//!
//! Only the structure needed to find statement boundaries and leading
//! keywords is kept: literals and quoted identifiers are opaque spans,
//! operators are single punctuation bytes.

use memchr::memchr;
use tandem_core::{Result, TandemError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Keyword or bare identifier
    Word,
    /// Single-quoted string literal
    String,
    /// `"ident"`, `` `ident` `` or `[ident]`
    QuotedIdent,
    /// `X'..'` blob literal
    Blob,
    Number,
    /// `?`, `?NNN`, `:name`, `@name`, `$name`
    Param,
    Semicolon,
    LeftParen,
    RightParen,
    /// Any other operator or punctuation byte
    Punct,
}

/// A token and its byte span in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

impl Token {
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }

    /// Case-insensitive keyword match.
    pub fn is_keyword(&self, source: &str, keyword: &str) -> bool {
        self.kind == TokenKind::Word && self.text(source).eq_ignore_ascii_case(keyword)
    }
}

pub struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            src: source.as_bytes(),
            pos: 0,
        }
    }

    /// Tokenize the entire input, skipping whitespace and comments.
    pub fn tokenize(source: &str) -> Result<Vec<Token>> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        while let Some(token) = lexer.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    pub fn next_token(&mut self) -> Result<Option<Token>> {
        self.skip_whitespace_and_comments()?;

        let Some(ch) = self.peek() else {
            return Ok(None);
        };
        let start = self.pos;

        let kind = match ch {
            b'\'' => {
                self.lex_quoted(b'\'', "string literal")?;
                TokenKind::String
            }
            b'"' => {
                self.lex_quoted(b'"', "quoted identifier")?;
                TokenKind::QuotedIdent
            }
            b'`' => {
                self.lex_quoted(b'`', "quoted identifier")?;
                TokenKind::QuotedIdent
            }
            b'[' => {
                self.lex_bracket_id()?;
                TokenKind::QuotedIdent
            }
            b'X' | b'x' if self.peek_at(1) == Some(b'\'') => {
                self.pos += 1;
                self.lex_quoted(b'\'', "blob literal")?;
                TokenKind::Blob
            }
            b'0'..=b'9' => {
                self.lex_number();
                TokenKind::Number
            }
            b'.' if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => {
                self.lex_number();
                TokenKind::Number
            }
            b'?' | b':' | b'@' | b'$' => {
                self.pos += 1;
                self.eat_word_chars();
                TokenKind::Param
            }
            c if is_word_start(c) => {
                self.eat_word_chars();
                TokenKind::Word
            }
            b';' => {
                self.pos += 1;
                TokenKind::Semicolon
            }
            b'(' => {
                self.pos += 1;
                TokenKind::LeftParen
            }
            b')' => {
                self.pos += 1;
                TokenKind::RightParen
            }
            _ => {
                self.pos += 1;
                TokenKind::Punct
            }
        };

        Ok(Some(Token {
            kind,
            start,
            end: self.pos,
        }))
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    /// Skip whitespace, line comments (`--`), and block comments (`/* */`).
    ///
    /// Block comments do not nest.
    fn skip_whitespace_and_comments(&mut self) -> Result<()> {
        loop {
            while self.peek().is_some_and(|c| c.is_ascii_whitespace()) {
                self.pos += 1;
            }

            if self.peek() == Some(b'-') && self.peek_at(1) == Some(b'-') {
                match memchr(b'\n', &self.src[self.pos..]) {
                    Some(offset) => self.pos += offset + 1,
                    None => self.pos = self.src.len(),
                }
                continue;
            }

            if self.peek() == Some(b'/') && self.peek_at(1) == Some(b'*') {
                let start = self.pos;
                self.pos += 2;
                loop {
                    match memchr(b'*', &self.src[self.pos..]) {
                        Some(offset) => {
                            self.pos += offset + 1;
                            if self.peek() == Some(b'/') {
                                self.pos += 1;
                                break;
                            }
                        }
                        None => {
                            return Err(TandemError::parse("unterminated block comment", start));
                        }
                    }
                }
                continue;
            }

            return Ok(());
        }
    }

    /// Lex a literal delimited by `quote`, where a doubled quote is an escape.
    fn lex_quoted(&mut self, quote: u8, what: &str) -> Result<()> {
        let start = self.pos;
        self.pos += 1; // opening quote
        loop {
            match memchr(quote, &self.src[self.pos..]) {
                Some(offset) => {
                    self.pos += offset + 1;
                    if self.peek() == Some(quote) {
                        self.pos += 1;
                    } else {
                        return Ok(());
                    }
                }
                None => {
                    return Err(TandemError::parse(format!("unterminated {what}"), start));
                }
            }
        }
    }

    fn lex_bracket_id(&mut self) -> Result<()> {
        let start = self.pos;
        match memchr(b']', &self.src[self.pos..]) {
            Some(offset) => {
                self.pos += offset + 1;
                Ok(())
            }
            None => Err(TandemError::parse("unterminated quoted identifier", start)),
        }
    }

    fn lex_number(&mut self) {
        let hex = self.peek() == Some(b'0') && matches!(self.peek_at(1), Some(b'x' | b'X'));
        while let Some(c) = self.peek() {
            let exponent_sign = !hex
                && matches!(c, b'+' | b'-')
                && self.pos > 0
                && matches!(self.src[self.pos - 1], b'e' | b'E');
            if c.is_ascii_alphanumeric() || c == b'.' || c == b'_' || exponent_sign {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn eat_word_chars(&mut self) {
        while self.peek().is_some_and(is_word_char) {
            self.pos += 1;
        }
    }
}

fn is_word_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_' || c >= 0x80
}

fn is_word_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_' || c == b'$' || c >= 0x80
}
