//! Core parser infrastructure: token cursor, error helpers.

use gdevents_lexer::{Lexer, Token, TokenKind};
use gdevents_types::{ErrorCode, ParseError, Span};

/// Maximum nesting of parentheses and calls within one expression.
pub const MAX_NESTING: u32 = 64;

/// One-token lookahead over the on-demand lexer.
///
/// Tokens are lexed only when the cursor reaches them, so an invalid
/// character late in the text does not prevent earlier events from being
/// emitted.
pub(crate) struct Cursor<'src> {
    lexer: Lexer<'src>,
    current: Token,
}

impl<'src> Cursor<'src> {
    /// Create a cursor positioned on the first token of `source`.
    pub(crate) fn new(source: &'src str) -> Result<Self, ParseError> {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token()?;
        Ok(Self { lexer, current })
    }

    // ── Token Cursor ──────────────────────────────────────────────────────────

    /// Returns the current token without advancing.
    pub(crate) fn peek(&self) -> &Token {
        &self.current
    }

    /// Returns the kind of the current token.
    pub(crate) fn peek_kind(&self) -> &TokenKind {
        &self.current.kind
    }

    /// Returns the span of the current token.
    pub(crate) fn current_span(&self) -> Span {
        self.current.span
    }

    /// Returns `true` if the current token is `Eof`.
    pub(crate) fn at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    /// Consume the current token and lex the next one.
    pub(crate) fn advance(&mut self) -> Result<Token, ParseError> {
        let next = self.lexer.next_token()?;
        Ok(std::mem::replace(&mut self.current, next))
    }

    /// If the current token matches, advance and return `true`.
    pub(crate) fn eat(&mut self, kind: &TokenKind) -> Result<bool, ParseError> {
        if self.peek_kind() == kind {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Resume lexing at byte offset `pos`.
    pub(crate) fn seek(&mut self, pos: usize) -> Result<(), ParseError> {
        self.lexer.seek(pos);
        self.current = self.lexer.next_token()?;
        Ok(())
    }

    /// The full text being parsed.
    pub(crate) fn source(&self) -> &'src str {
        self.lexer.source()
    }

    // ── Error Helpers ─────────────────────────────────────────────────────────

    /// Build an error pointing at the current token.
    pub(crate) fn error_at_current(
        &self,
        code: ErrorCode,
        message: impl Into<String>,
    ) -> ParseError {
        ParseError::new(code, message, self.current_span())
    }

    /// Expect an identifier token. Returns the name and span.
    pub(crate) fn expect_identifier(
        &mut self,
        code: ErrorCode,
        message: &str,
    ) -> Result<(String, Span), ParseError> {
        match self.peek_kind() {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                let span = self.advance()?.span;
                Ok((name, span))
            }
            _ => Err(self.error_at_current(code, message)),
        }
    }
}

/// Text of `span` with surrounding whitespace removed, and the offset of
/// the first kept byte.
pub(crate) fn trimmed(source: &str, span: Span) -> (&str, usize) {
    let raw = &source[span.start..span.end];
    let leading = raw.len() - raw.trim_start().len();
    (raw.trim(), span.start + leading)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_advance_and_eat() {
        let mut cursor = Cursor::new("a + b").unwrap();
        assert_eq!(cursor.peek_kind(), &TokenKind::Identifier("a".into()));
        cursor.advance().unwrap();
        assert!(cursor.eat(&TokenKind::Plus).unwrap());
        assert!(!cursor.eat(&TokenKind::Plus).unwrap());
        cursor.advance().unwrap();
        assert!(cursor.at_end());
    }

    #[test]
    fn test_trimmed_offsets() {
        let src = "F(  12 , x)";
        assert_eq!(trimmed(src, Span::new(2, 8)), ("12", 4));
    }
}
