//! On-demand expression lexer.
//!
//! Unlike a whole-file tokenizer, the lexer hands out one token at a time
//! and can be repositioned with [`Lexer::seek`]: the expression parser
//! skips over call arguments with the balanced scanner and resumes lexing
//! after the closing parenthesis. Lexing stops at the first error.

use gdevents_types::{ErrorCode, ParseError, Span};

use crate::token::{Token, TokenKind};

/// The expression lexer.
pub struct Lexer<'src> {
    /// The full source text.
    source: &'src str,
    /// The same text as bytes.
    bytes: &'src [u8],
    /// Current byte offset into `source`.
    pos: usize,
}

impl<'src> Lexer<'src> {
    /// Create a new lexer at the start of `source`.
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
        }
    }

    /// Current byte offset.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Move to `pos` (clamped to the end of the text).
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos.min(self.bytes.len());
    }

    /// The text being lexed.
    pub fn source(&self) -> &'src str {
        self.source
    }

    /// Lex every remaining token, including the final [`TokenKind::Eof`].
    pub fn tokenize(mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                return Ok(tokens);
            }
        }
    }

    /// Scan the next token.
    pub fn next_token(&mut self) -> Result<Token, ParseError> {
        self.skip_whitespace();

        let start = self.pos;
        let Some(ch) = self.peek() else {
            return Ok(Token::new(TokenKind::Eof, Span::point(start)));
        };

        let kind = match ch {
            b'"' => return self.scan_string(),
            b'0'..=b'9' => return self.scan_number(),
            b'.' if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => {
                return self.scan_number()
            }
            c if is_identifier_start(c) => return Ok(self.scan_identifier()),
            b'+' => TokenKind::Plus,
            b'-' => TokenKind::Minus,
            b'*' => TokenKind::Star,
            b'/' => TokenKind::Slash,
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'[' => TokenKind::LBracket,
            b']' => TokenKind::RBracket,
            b',' => TokenKind::Comma,
            b'.' => TokenKind::Dot,
            b':' if self.peek_at(1) == Some(b':') => {
                self.pos += 2;
                return Ok(Token::new(TokenKind::DoubleColon, self.span_from(start)));
            }
            b'<' | b'>' | b'=' | b'!' | b'%' | b'^' | b'?' | b':' | b'&' | b'|' | b'\\' => {
                TokenKind::OtherOperator(ch as char)
            }
            _ => {
                let c = self.source[start..].chars().next().unwrap_or('?');
                return Err(ParseError::new(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("Unexpected character '{c}'"),
                    Span::new(start, start + c.len_utf8()),
                ));
            }
        };
        self.pos += 1;
        Ok(Token::new(kind, self.span_from(start)))
    }

    // ─────────────────────────────────────────────────────────────
    // Character-level helpers
    // ─────────────────────────────────────────────────────────────

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn span_from(&self, start: usize) -> Span {
        Span::new(start, self.pos)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_ascii_whitespace() {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn eat_digits(&mut self) -> usize {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        self.pos - start
    }

    // ─────────────────────────────────────────────────────────────
    // Literals
    // ─────────────────────────────────────────────────────────────

    /// `digits[.digits][e[+-]digits]` or `.digits`.
    fn scan_number(&mut self) -> Result<Token, ParseError> {
        let start = self.pos;
        self.eat_digits();
        if self.peek() == Some(b'.') {
            self.pos += 1;
            self.eat_digits();
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            self.pos += 1;
            if matches!(self.peek(), Some(b'+' | b'-')) {
                self.pos += 1;
            }
            if self.eat_digits() == 0 {
                return Err(ParseError::new(
                    ErrorCode::INVALID_NUMBER,
                    "The number has an exponent without digits",
                    Span::new(start, self.pos),
                ));
            }
        }
        if self.peek().is_some_and(is_identifier_continue) || self.peek() == Some(b'.') {
            while self
                .peek()
                .is_some_and(|c| is_identifier_continue(c) || c == b'.')
            {
                self.pos += 1;
            }
            return Err(ParseError::new(
                ErrorCode::INVALID_NUMBER,
                format!("'{}' is not a valid number", &self.source[start..self.pos]),
                self.span_from(start),
            ));
        }
        let text = self.source[start..self.pos].to_string();
        Ok(Token::new(TokenKind::Number(text), self.span_from(start)))
    }

    /// Double-quoted text; `\"` and `\\` are the only escapes.
    fn scan_string(&mut self) -> Result<Token, ParseError> {
        let start = self.pos;
        self.pos += 1;
        let mut value = String::new();
        let mut run_start = self.pos;
        loop {
            match self.peek() {
                None => {
                    return Err(ParseError::new(
                        ErrorCode::UNCLOSED_STRING,
                        "Quotes are not closed",
                        Span::new(start, self.pos),
                    ))
                }
                Some(b'"') => {
                    value.push_str(&self.source[run_start..self.pos]);
                    self.pos += 1;
                    return Ok(Token::new(TokenKind::Text(value), self.span_from(start)));
                }
                Some(b'\\') if matches!(self.peek_at(1), Some(b'"' | b'\\')) => {
                    value.push_str(&self.source[run_start..self.pos]);
                    value.push(self.bytes[self.pos + 1] as char);
                    self.pos += 2;
                    run_start = self.pos;
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    fn scan_identifier(&mut self) -> Token {
        let start = self.pos;
        while self.peek().is_some_and(is_identifier_continue) {
            self.pos += 1;
        }
        let name = self.source[start..self.pos].to_string();
        Token::new(TokenKind::Identifier(name), self.span_from(start))
    }
}

fn is_identifier_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_' || c >= 0x80
}

fn is_identifier_continue(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_' || c >= 0x80
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seek_resumes_lexing() {
        let mut lexer = Lexer::new("Foo(1, 2) + 3");
        let _ = lexer.next_token().unwrap();
        lexer.seek(9);
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Plus);
        assert_eq!(
            lexer.next_token().unwrap().kind,
            TokenKind::Number("3".into())
        );
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Eof);
    }

    #[test]
    fn test_non_ascii_identifier() {
        let tokens = Lexer::new("Énemi").tokenize().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Identifier("Énemi".into()));
    }
}
