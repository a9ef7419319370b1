use crate::{EventId, Span};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of diagnostics stored; further ones are only counted.
pub const MAX_DIAGNOSTICS: usize = 100;

/// Error category, determined by error code range.
///
/// There is no warning tier: every detected problem is either silently
/// defaulted or reported in one of these categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCategory {
    Syntax,
    UnresolvedReference,
    Arity,
}

/// Numeric error code (E100–E399).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ErrorCode(pub u16);

impl ErrorCode {
    // ── Syntax errors (E100–E199) ──
    pub const UNEXPECTED_TOKEN: Self = Self(100);
    pub const UNCLOSED_PARENTHESIS: Self = Self(101);
    pub const UNCLOSED_STRING: Self = Self(102);
    pub const INVALID_NUMBER: Self = Self(103);
    pub const MISSING_VARIABLE_NAME: Self = Self(104);
    pub const UNCLOSED_BRACKET: Self = Self(105);
    pub const INVALID_OPERATOR: Self = Self(106);
    pub const EMPTY_EXPRESSION: Self = Self(107);
    pub const WRONG_LITERAL_KIND: Self = Self(108);
    pub const MISSING_FUNCTION_NAME: Self = Self(109);
    pub const NESTING_TOO_DEEP: Self = Self(110);

    // ── Unresolved references (E200–E299) ──
    pub const UNKNOWN_FUNCTION: Self = Self(200);
    pub const UNKNOWN_OBJECT: Self = Self(201);
    pub const UNKNOWN_BEHAVIOR: Self = Self(202);
    pub const UNKNOWN_INSTRUCTION: Self = Self(203);
    pub const UNKNOWN_LINK_TARGET: Self = Self(204);
    pub const CIRCULAR_LINK: Self = Self(205);
    pub const MISMATCHED_OBJECT_TYPE: Self = Self(206);
    pub const UNKNOWN_CONSTANT: Self = Self(207);

    // ── Arity errors (E300–E399) ──
    pub const WRONG_ARG_COUNT: Self = Self(300);
    pub const MISSING_OPERAND: Self = Self(301);

    /// Get the category for this error code.
    pub fn category(self) -> ErrorCategory {
        match self.0 {
            100..=199 => ErrorCategory::Syntax,
            200..=299 => ErrorCategory::UnresolvedReference,
            300..=399 => ErrorCategory::Arity,
            _ => ErrorCategory::Syntax,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

impl ErrorCategory {
    /// Variant name (`Syntax`, `UnresolvedReference`, `Arity`).
    pub fn name(self) -> &'static str {
        match self {
            Self::Syntax => "Syntax",
            Self::UnresolvedReference => "UnresolvedReference",
            Self::Arity => "Arity",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax => write!(f, "syntax"),
            Self::UnresolvedReference => write!(f, "unresolved reference"),
            Self::Arity => write!(f, "arity"),
        }
    }
}

/// First error found while parsing an expression or a variable path.
///
/// Both parsers stop at the first problem; `span` points into the text
/// that was handed to the top-level `parse` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{span}: {code} {message}")]
pub struct ParseError {
    pub code: ErrorCode,
    pub message: String,
    pub span: Span,
}

impl ParseError {
    /// Create a new parse error.
    pub fn new(code: ErrorCode, message: impl Into<String>, span: Span) -> Self {
        Self {
            code,
            message: message.into(),
            span,
        }
    }

    /// Byte offset of the error in the parsed text.
    pub fn position(&self) -> usize {
        self.span.start
    }

    /// Re-anchor an error found in a nested text (argument, subscript)
    /// so its position refers to the enclosing text.
    pub fn offset_by(mut self, base: usize) -> Self {
        self.span = self.span.offset_by(base);
        self
    }
}

/// Where a diagnostic was raised in the event tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticLocation {
    /// Layout or external events name.
    pub sheet: String,
    /// Arena id of the event being generated, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<EventId>,
    /// Instruction type, when the problem is inside an instruction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instruction: Option<String>,
}

/// A problem recorded while compiling an event sheet.
///
/// Compilation never aborts on these: the generator substitutes a safe
/// fallback and carries on, leaving the diagnostic for the editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub code: ErrorCode,
    pub category: ErrorCategory,
    pub message: String,
    /// Byte offset into `expression` (0 when not applicable).
    pub position: usize,
    /// The expression or variable-path text the position refers to.
    pub expression: String,
    pub location: DiagnosticLocation,
}

impl Diagnostic {
    /// Create a diagnostic without expression context.
    pub fn new(code: ErrorCode, message: impl Into<String>, location: DiagnosticLocation) -> Self {
        Self {
            code,
            category: code.category(),
            message: message.into(),
            position: 0,
            expression: String::new(),
            location,
        }
    }

    /// Build a diagnostic from a parse failure of `expression`.
    pub fn from_parse_error(
        error: &ParseError,
        expression: impl Into<String>,
        location: DiagnosticLocation,
    ) -> Self {
        Self {
            code: error.code,
            category: error.code.category(),
            message: error.message.clone(),
            position: error.position(),
            expression: expression.into(),
            location,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} [{}] {}",
            self.location.sheet, self.code, self.category, self.message
        )
    }
}

/// Diagnostics collected while compiling one sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    pub errors: Vec<Diagnostic>,
    pub total_errors: usize,
}

impl Diagnostics {
    /// Create an empty collection.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Check if there are any errors.
    pub fn has_errors(&self) -> bool {
        self.total_errors > 0
    }

    /// Add an error, respecting the MAX_DIAGNOSTICS limit.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        if self.errors.len() < MAX_DIAGNOSTICS {
            self.errors.push(diagnostic);
        }
        self.total_errors += 1;
    }

    /// Append every diagnostic of `other`.
    pub fn extend(&mut self, other: Diagnostics) {
        let dropped = other.total_errors - other.errors.len();
        for diagnostic in other.errors {
            self.push(diagnostic);
        }
        self.total_errors += dropped;
    }

    /// Iterate over the stored diagnostics.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.errors.iter()
    }

    /// Whether any stored diagnostic carries `code`.
    pub fn contains_code(&self, code: ErrorCode) -> bool {
        self.errors.iter().any(|d| d.code == code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_category() {
        assert_eq!(
            ErrorCode::UNEXPECTED_TOKEN.category(),
            ErrorCategory::Syntax
        );
        assert_eq!(
            ErrorCode::UNKNOWN_LINK_TARGET.category(),
            ErrorCategory::UnresolvedReference
        );
        assert_eq!(ErrorCode::WRONG_ARG_COUNT.category(), ErrorCategory::Arity);
        assert_eq!(ErrorCategory::UnresolvedReference.name(), "UnresolvedReference");
        assert_eq!(ErrorCategory::UnresolvedReference.to_string(), "unresolved reference");
    }

    #[test]
    fn test_error_code_display() {
        assert_eq!(format!("{}", ErrorCode::UNKNOWN_FUNCTION), "E200");
        assert_eq!(format!("{}", ErrorCode::UNEXPECTED_TOKEN), "E100");
    }

    #[test]
    fn test_parse_error_offset() {
        let err = ParseError::new(ErrorCode::UNCLOSED_STRING, "Quotes are not closed", Span::point(2))
            .offset_by(7);
        assert_eq!(err.position(), 9);
        assert_eq!(err.to_string(), "9: E102 Quotes are not closed");
    }

    #[test]
    fn test_diagnostic_from_parse_error() {
        let err = ParseError::new(ErrorCode::UNKNOWN_FUNCTION, "Unknown", Span::new(3, 6));
        let diag = Diagnostic::from_parse_error(&err, "1+Foo()", DiagnosticLocation::default());
        assert_eq!(diag.position, 3);
        assert_eq!(diag.category, ErrorCategory::UnresolvedReference);
        assert_eq!(diag.expression, "1+Foo()");
    }

    #[test]
    fn test_diagnostics_cap() {
        let mut diags = Diagnostics::empty();
        for _ in 0..(MAX_DIAGNOSTICS + 5) {
            diags.push(Diagnostic::new(
                ErrorCode::UNKNOWN_OBJECT,
                "missing",
                DiagnosticLocation::default(),
            ));
        }
        assert_eq!(diags.errors.len(), MAX_DIAGNOSTICS);
        assert_eq!(diags.total_errors, MAX_DIAGNOSTICS + 5);
    }

    #[test]
    fn test_diagnostic_json_roundtrip() {
        let diag = Diagnostic::new(
            ErrorCode::UNKNOWN_LINK_TARGET,
            "No events sheet named \"Missing\"",
            DiagnosticLocation {
                sheet: "Level1".into(),
                event: Some(EventId(4)),
                instruction: None,
            },
        );
        let json = serde_json::to_string(&diag).unwrap();
        assert!(json.contains("\"category\":\"unresolvedReference\""));
        let back: Diagnostic = serde_json::from_str(&json).unwrap();
        assert_eq!(back, diag);
    }
}
