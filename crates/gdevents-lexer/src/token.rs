//! Token types for the expression lexer.
//!
//! Defines [`TokenKind`] covering every lexeme of math and string
//! expressions and [`Token`], which pairs a kind with a source [`Span`].

use gdevents_types::Span;
use std::fmt;

// ─────────────────────────────────────────────────────────────────────
// Token
// ─────────────────────────────────────────────────────────────────────

/// A single token produced by the expression lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// What kind of token this is.
    pub kind: TokenKind,
    /// Byte range in the lexed text.
    pub span: Span,
}

impl Token {
    /// Create a new token.
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

// ─────────────────────────────────────────────────────────────────────
// TokenKind
// ─────────────────────────────────────────────────────────────────────

/// Every token kind of the expression grammar.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // ── Literals ──────────────────────────────────────────────

    /// Numeric literal, kept as written: `42`, `3.14`, `.5`, `1e3`
    Number(String),
    /// String literal with escapes resolved: `"hello"`
    Text(String),

    // ── Names ─────────────────────────────────────────────────

    /// Function, object, behavior or constant name.
    Identifier(String),

    // ── Operators ─────────────────────────────────────────────

    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// Any other operator character (`<`, `=`, `%`, `^`, ...), which the
    /// parser rejects with a dedicated message.
    OtherOperator(char),

    // ── Punctuation ───────────────────────────────────────────

    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `,`
    Comma,
    /// `.`
    Dot,
    /// `::`
    DoubleColon,

    /// End of input.
    Eof,
}

impl TokenKind {
    /// The binary operator character, if this is one of `+ - * /`.
    pub fn operator_char(&self) -> Option<char> {
        match self {
            Self::Plus => Some('+'),
            Self::Minus => Some('-'),
            Self::Star => Some('*'),
            Self::Slash => Some('/'),
            _ => None,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "number {n}"),
            Self::Text(s) => write!(f, "text \"{s}\""),
            Self::Identifier(name) => write!(f, "'{name}'"),
            Self::Plus => write!(f, "'+'"),
            Self::Minus => write!(f, "'-'"),
            Self::Star => write!(f, "'*'"),
            Self::Slash => write!(f, "'/'"),
            Self::OtherOperator(c) => write!(f, "'{c}'"),
            Self::LParen => write!(f, "'('"),
            Self::RParen => write!(f, "')'"),
            Self::LBracket => write!(f, "'['"),
            Self::RBracket => write!(f, "']'"),
            Self::Comma => write!(f, "','"),
            Self::Dot => write!(f, "'.'"),
            Self::DoubleColon => write!(f, "'::'"),
            Self::Eof => write!(f, "end of expression"),
        }
    }
}
