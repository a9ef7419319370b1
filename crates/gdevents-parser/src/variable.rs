//! Variable-path parsing.
//!
//! Grammar:
//! ```text
//! S := VarName X
//! X := ε | '.' S | '[' StringExpr ']' X
//! ```
//! `.`, `[` and `]` are the only delimiters; every other character, spaces
//! included, belongs to a name. Subscripts are not tokenized here: their
//! raw text is handed to the caller, which resolves it as a string
//! expression.

use gdevents_lexer::find_closing_bracket;
use gdevents_types::{ErrorCode, ParseError, Span};

/// One step of a parsed variable path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathEvent {
    /// The first name of the path.
    Root(String),
    /// A `.name` access.
    Child(String),
    /// A `[expr]` access. `offset` is where `source` starts in the path.
    Subscript { source: String, offset: usize },
}

/// Events of a variable path, plus the error that stopped parsing if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPath {
    pub events: Vec<PathEvent>,
    pub error: Option<ParseError>,
}

impl ParsedPath {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

impl IntoIterator for ParsedPath {
    type Item = PathEvent;
    type IntoIter = std::vec::IntoIter<PathEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}

/// Parser for `scenevar`, `globalvar` and `objectvar` parameters.
#[derive(Debug, Default, Clone, Copy)]
pub struct VariablePathParser;

impl VariablePathParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse `source`, feeding events to `visitor` until the end or the
    /// first error. Events already emitted are not retracted on failure.
    pub fn parse(
        &self,
        source: &str,
        visitor: &mut dyn FnMut(PathEvent),
    ) -> Result<(), ParseError> {
        let bytes = source.as_bytes();
        let mut pos = self.name(source, 0, true, visitor)?;
        while pos < bytes.len() {
            match bytes[pos] {
                b'.' => pos = self.name(source, pos + 1, false, visitor)?,
                b'[' => {
                    let close = find_closing_bracket(source, pos).ok_or_else(|| {
                        ParseError::new(
                            ErrorCode::UNCLOSED_BRACKET,
                            "Missing a closing bracket ]",
                            Span::point(pos),
                        )
                    })?;
                    visitor(PathEvent::Subscript {
                        source: source[pos + 1..close].to_string(),
                        offset: pos + 1,
                    });
                    pos = close + 1;
                }
                _ => {
                    return Err(ParseError::new(
                        ErrorCode::UNEXPECTED_TOKEN,
                        "Unexpected closing bracket ]",
                        Span::new(pos, pos + 1),
                    ))
                }
            }
        }
        Ok(())
    }

    /// Parse `source` into a [`ParsedPath`].
    pub fn parse_events(&self, source: &str) -> ParsedPath {
        let mut events = Vec::new();
        let error = self.parse(source, &mut |e| events.push(e)).err();
        ParsedPath { events, error }
    }

    /// Scan a name starting at `start`; returns the offset after it.
    fn name(
        &self,
        source: &str,
        start: usize,
        root: bool,
        visitor: &mut dyn FnMut(PathEvent),
    ) -> Result<usize, ParseError> {
        let end = source[start..]
            .find(['.', '[', ']'])
            .map_or(source.len(), |i| start + i);
        if end == start {
            return Err(ParseError::new(
                ErrorCode::MISSING_VARIABLE_NAME,
                if root {
                    "A variable name is missing"
                } else {
                    "A name should be entered after the dot"
                },
                Span::point(start),
            ));
        }
        let name = source[start..end].to_string();
        visitor(if root {
            PathEvent::Root(name)
        } else {
            PathEvent::Child(name)
        });
        Ok(end)
    }
}

/// Serialize path events back to path text.
pub fn write_path(events: &[PathEvent]) -> String {
    let mut out = String::new();
    for event in events {
        match event {
            PathEvent::Root(name) => out.push_str(name),
            PathEvent::Child(name) => {
                out.push('.');
                out.push_str(name);
            }
            PathEvent::Subscript { source, .. } => {
                out.push('[');
                out.push_str(source);
                out.push(']');
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_only() {
        let parsed = VariablePathParser::new().parse_events("score");
        assert!(parsed.is_ok());
        assert_eq!(parsed.events, vec![PathEvent::Root("score".into())]);
    }

    #[test]
    fn test_subscript_then_child() {
        let parsed = VariablePathParser::new().parse_events(r#"a["k"].b"#);
        assert_eq!(
            parsed.events,
            vec![
                PathEvent::Root("a".into()),
                PathEvent::Subscript {
                    source: "\"k\"".into(),
                    offset: 2
                },
                PathEvent::Child("b".into()),
            ]
        );
    }

    #[test]
    fn test_partial_events_kept_on_error() {
        let parsed = VariablePathParser::new().parse_events("a.b.");
        assert_eq!(
            parsed.events,
            vec![PathEvent::Root("a".into()), PathEvent::Child("b".into())]
        );
        let err = parsed.error.unwrap();
        assert_eq!(err.code, ErrorCode::MISSING_VARIABLE_NAME);
        assert_eq!(err.position(), 4);
    }
}
