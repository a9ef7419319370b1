use serde::{Deserialize, Serialize};
use std::fmt;

/// Byte range into an expression or variable-path source text.
///
/// Positions are byte offsets from the start of the *top-level* text that
/// was handed to a parser, so editors can map them back to a caret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    /// Create a new span.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Create a zero-width span at a single position.
    pub fn point(pos: usize) -> Self {
        Self::new(pos, pos)
    }

    /// Merge two spans into one that covers both.
    pub fn merge(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }

    /// Shift the span right by `base` bytes.
    ///
    /// Used when a nested text (a call argument, a subscript) was parsed
    /// on its own and its positions must be reported in the enclosing text.
    pub fn offset_by(self, base: usize) -> Span {
        Span::new(self.start + base, self.end + base)
    }

    /// Number of bytes covered.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Whether the span covers no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}..{}", self.start, self.end)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_point() {
        let s = Span::point(5);
        assert_eq!(s.start, 5);
        assert_eq!(s.end, 5);
        assert!(s.is_empty());
    }

    #[test]
    fn test_span_merge() {
        let a = Span::new(2, 4);
        let b = Span::new(7, 9);
        assert_eq!(a.merge(b), Span::new(2, 9));
        assert_eq!(b.merge(a), Span::new(2, 9));
    }

    #[test]
    fn test_span_offset() {
        assert_eq!(Span::new(1, 3).offset_by(10), Span::new(11, 13));
    }

    #[test]
    fn test_span_display() {
        assert_eq!(Span::point(3).to_string(), "3");
        assert_eq!(Span::new(3, 6).to_string(), "3..6");
    }
}
