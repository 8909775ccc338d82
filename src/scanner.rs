//! Streaming lexer over a byte buffer.
//!
//! [`Scanner`] yields `Result<Token, LoxError>` items: whitespace and `//`
//! comments are skipped, a lexing error is reported for the offending character
//! and scanning resumes right after it, and exactly one `EOF` token closes
//! the stream.  Comment skipping uses `memchr` to jump to the next newline.

use std::iter::FusedIterator;

use log::{debug, info};
use memchr::memchr;

use crate::error::{LoxError, Result};
use crate::token::{Token, TokenType};

pub struct Scanner<'a> {
    src: &'a [u8],
    start: usize, // first byte of the current lexeme
    pos: usize,   // next byte to examine
    line: usize,
    done: bool,
}

impl<'a> Scanner<'a> {
    pub fn new(src: &'a [u8]) -> Self {
        info!("Scanner created over {} bytes", src.len());

        Self {
            src,
            start: 0,
            pos: 0,
            line: 1,
            done: false,
        }
    }

    /// Scan the whole input, splitting tokens from errors.
    pub fn scan_all(self) -> (Vec<Token>, Vec<LoxError>) {
        let mut tokens = Vec::new();
        let mut errors = Vec::new();

        for item in self {
            match item {
                Ok(token) => tokens.push(token),
                Err(e) => errors.push(e),
            }
        }

        info!(
            "Scanned {} token(s) with {} error(s)",
            tokens.len(),
            errors.len()
        );
        (tokens, errors)
    }

    // ───────────────────────────── byte cursor ──────────────────────────────

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    /// Callers check [`is_at_end`](Self::is_at_end) first.
    #[inline(always)]
    fn advance(&mut self) -> u8 {
        let b = self.src[self.pos];
        self.pos += 1;
        b
    }

    /// Byte `ahead` positions past the cursor, or `0` beyond the input.
    #[inline(always)]
    fn peek_at(&self, ahead: usize) -> u8 {
        self.src.get(self.pos + ahead).copied().unwrap_or(0)
    }

    #[inline(always)]
    fn peek(&self) -> u8 {
        self.peek_at(0)
    }

    /// `if_eq` when the next byte is `expected` (consuming it), else `other`.
    #[inline(always)]
    fn either(&mut self, expected: u8, if_eq: TokenType, other: TokenType) -> TokenType {
        if self.peek() == expected {
            self.pos += 1;
            if_eq
        } else {
            other
        }
    }

    fn lexeme(&self) -> &'a [u8] {
        &self.src[self.start..self.pos]
    }

    // ───────────────────────────── trivia ───────────────────────────────────

    /// Skip whitespace, newlines and line comments up to the next lexeme.
    fn skip_trivia(&mut self) {
        while !self.is_at_end() {
            match self.peek() {
                b' ' | b'\r' | b'\t' => self.pos += 1,

                b'\n' => {
                    self.line += 1;
                    self.pos += 1;
                }

                b'/' if self.peek_at(1) == b'/' => {
                    self.pos = match memchr(b'\n', &self.src[self.pos..]) {
                        Some(offset) => self.pos + offset,
                        None => self.src.len(),
                    };
                }

                _ => return,
            }
        }
    }

    // ───────────────────────────── lexemes ──────────────────────────────────

    /// Recognise one lexeme starting at `self.start`.
    fn scan_token(&mut self) -> Result<TokenType> {
        let kind = match self.advance() {
            b'(' => TokenType::LEFT_PAREN,
            b')' => TokenType::RIGHT_PAREN,
            b'{' => TokenType::LEFT_BRACE,
            b'}' => TokenType::RIGHT_BRACE,
            b',' => TokenType::COMMA,
            b'.' => TokenType::DOT,
            b'-' => TokenType::MINUS,
            b'+' => TokenType::PLUS,
            b';' => TokenType::SEMICOLON,
            b'*' => TokenType::STAR,
            b'/' => TokenType::SLASH,

            b'!' => self.either(b'=', TokenType::BANG_EQUAL, TokenType::BANG),
            b'=' => self.either(b'=', TokenType::EQUAL_EQUAL, TokenType::EQUAL),
            b'<' => self.either(b'=', TokenType::LESS_EQUAL, TokenType::LESS),
            b'>' => self.either(b'=', TokenType::GREATER_EQUAL, TokenType::GREATER),

            b'"' => self.string()?,
            b'0'..=b'9' => self.number(),
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.identifier(),

            _ => return Err(self.unexpected_character()),
        };

        Ok(kind)
    }

    /// Error for a byte that starts no lexeme.  A multi‑byte UTF‑8 character
    /// is consumed whole and reported once; an invalid byte is skipped alone.
    fn unexpected_character(&mut self) -> LoxError {
        let rest = &self.src[self.start..];

        let decoded = (1..=rest.len().min(4)).find_map(|n| {
            std::str::from_utf8(&rest[..n])
                .ok()
                .and_then(|s| s.chars().next())
        });

        let ch = match decoded {
            Some(ch) => {
                self.pos = self.start + ch.len_utf8();
                ch
            }
            None => char::REPLACEMENT_CHARACTER,
        };

        LoxError::lex(self.line, format!("Unexpected character: {}", ch))
    }

    /// Double‑quoted literal; may span lines.
    fn string(&mut self) -> Result<TokenType> {
        let first_line = self.line;

        while !self.is_at_end() && self.peek() != b'"' {
            if self.advance() == b'\n' {
                self.line += 1;
            }
        }

        if self.is_at_end() {
            debug!("String opened on line {} never closed", first_line);
            return Err(LoxError::lex(self.line, "Unterminated string."));
        }

        self.pos += 1; // closing quote

        let body = &self.src[self.start + 1..self.pos - 1];
        Ok(TokenType::STRING(String::from_utf8_lossy(body).into_owned()))
    }

    /// Integer with an optional fractional part; no leading or trailing dot.
    fn number(&mut self) -> TokenType {
        while self.peek().is_ascii_digit() {
            self.pos += 1;
        }

        if self.peek() == b'.' && self.peek_at(1).is_ascii_digit() {
            self.pos += 1;
            while self.peek().is_ascii_digit() {
                self.pos += 1;
            }
        }

        // only ASCII digits and at most one '.', so parsing cannot fail
        let value = std::str::from_utf8(self.lexeme())
            .ok()
            .and_then(|text| text.parse::<f64>().ok())
            .unwrap_or(0.0);

        TokenType::NUMBER(value)
    }

    fn identifier(&mut self) -> TokenType {
        while matches!(self.peek(), b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_') {
            self.pos += 1;
        }

        TokenType::keyword(self.lexeme()).unwrap_or(TokenType::IDENTIFIER)
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        self.skip_trivia();

        if self.is_at_end() {
            self.done = true;
            return Some(Ok(Token::new(TokenType::EOF, "", self.line)));
        }

        self.start = self.pos;

        let item = self.scan_token().map(|kind| {
            let lexeme = String::from_utf8_lossy(self.lexeme()).into_owned();
            debug!("Scanned {:?} on line {}", kind, self.line);
            Token::new(kind, lexeme, self.line)
        });

        Some(item)
    }
}

impl<'a> FusedIterator for Scanner<'a> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenType> {
        Scanner::new(source.as_bytes())
            .filter_map(|item| item.ok().map(|t| t.token_type))
            .collect()
    }

    #[test]
    fn two_character_operators() {
        assert_eq!(
            kinds("!= == <= >= ! = < >"),
            vec![
                TokenType::BANG_EQUAL,
                TokenType::EQUAL_EQUAL,
                TokenType::LESS_EQUAL,
                TokenType::GREATER_EQUAL,
                TokenType::BANG,
                TokenType::EQUAL,
                TokenType::LESS,
                TokenType::GREATER,
                TokenType::EOF,
            ]
        );
    }

    #[test]
    fn number_needs_digits_after_dot() {
        let tokens: Vec<_> = Scanner::new(b"12.5 7.").filter_map(|t| t.ok()).collect();

        assert!(matches!(tokens[0].token_type, TokenType::NUMBER(n) if n == 12.5));
        assert!(matches!(tokens[1].token_type, TokenType::NUMBER(n) if n == 7.0));
        assert_eq!(tokens[2].token_type, TokenType::DOT);
    }

    #[test]
    fn non_ascii_character_is_one_error() {
        let results: Vec<_> = Scanner::new("é;".as_bytes()).collect();

        assert_eq!(results.len(), 3);
        let message = results[0].as_ref().map(|_| ()).unwrap_err().to_string();
        assert!(message.ends_with("Unexpected character: é"), "{}", message);
        assert!(matches!(
            &results[1],
            Ok(Token {
                token_type: TokenType::SEMICOLON,
                ..
            })
        ));
    }

    #[test]
    fn invalid_utf8_byte_is_skipped_alone() {
        let results: Vec<_> = Scanner::new(&[0xff, b'+']).collect();

        assert_eq!(results.len(), 3);
        assert!(results[0].is_err());
        assert!(matches!(
            &results[1],
            Ok(Token {
                token_type: TokenType::PLUS,
                ..
            })
        ));
    }

    #[test]
    fn exactly_one_eof() {
        let mut scanner = Scanner::new(b"// only a comment");
        assert!(matches!(
            scanner.next(),
            Some(Ok(Token {
                token_type: TokenType::EOF,
                ..
            }))
        ));
        assert!(scanner.next().is_none());
        assert!(scanner.next().is_none());
    }
}
