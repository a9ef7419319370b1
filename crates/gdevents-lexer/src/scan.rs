//! Character-level scanning of bracketed text.
//!
//! Call arguments and variable subscripts are located without tokenizing
//! them: the scanner tracks parenthesis/bracket depth and skips over
//! double-quoted literals, where `\` escapes the next character (so `\"`
//! does not end the literal and brackets inside quotes are ignored).

use gdevents_types::{ErrorCode, ParseError, Span};

/// Arguments found between a `(` and its matching `)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentList {
    /// Raw span of each argument, untrimmed. Empty for `()`.
    pub arguments: Vec<Span>,
    /// Offset just past the closing parenthesis.
    pub end: usize,
}

/// Split the argument list opening at `open` (which must index a `(`).
pub fn scan_arguments(source: &str, open: usize) -> Result<ArgumentList, ParseError> {
    let bytes = source.as_bytes();
    let mut depth = 0usize;
    let mut arg_start = open + 1;
    let mut arguments = Vec::new();
    let mut i = open + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => i = skip_string(bytes, i)?,
            b'(' | b'[' => depth += 1,
            b')' | b']' if depth > 0 => depth -= 1,
            b',' if depth == 0 => {
                arguments.push(Span::new(arg_start, i));
                arg_start = i + 1;
            }
            b')' => {
                let last = Span::new(arg_start, i);
                if !arguments.is_empty() || !source[arg_start..i].trim().is_empty() {
                    arguments.push(last);
                }
                return Ok(ArgumentList {
                    arguments,
                    end: i + 1,
                });
            }
            _ => {}
        }
        i += 1;
    }
    Err(ParseError::new(
        ErrorCode::UNCLOSED_PARENTHESIS,
        "Missing a closing parenthesis",
        Span::point(open),
    ))
}

/// Index of the `]` matching the `[` at `open`, or `None` if the text
/// ends first (an unterminated literal also yields `None`).
pub fn find_closing_bracket(source: &str, open: usize) -> Option<usize> {
    let bytes = source.as_bytes();
    let mut depth = 0usize;
    let mut i = open + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => i = skip_string(bytes, i).ok()?,
            b'[' => depth += 1,
            b']' if depth == 0 => return Some(i),
            b']' => depth -= 1,
            _ => {}
        }
        i += 1;
    }
    None
}

/// Given `start` at an opening quote, return the index of the closing one.
fn skip_string(bytes: &[u8], start: usize) -> Result<usize, ParseError> {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return Ok(i),
            _ => i += 1,
        }
    }
    Err(ParseError::new(
        ErrorCode::UNCLOSED_STRING,
        "Quotes are not closed",
        Span::new(start, bytes.len()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts<'a>(source: &'a str, list: &ArgumentList) -> Vec<&'a str> {
        list.arguments
            .iter()
            .map(|s| &source[s.start..s.end])
            .collect()
    }

    #[test]
    fn test_split_nested_arguments() {
        let src = "F(1, G(2, 3), \"a,b)\")";
        let list = scan_arguments(src, 1).unwrap();
        assert_eq!(texts(src, &list), vec!["1", " G(2, 3)", " \"a,b)\""]);
        assert_eq!(list.end, src.len());
    }

    #[test]
    fn test_empty_argument_list() {
        let list = scan_arguments("F()", 1).unwrap();
        assert!(list.arguments.is_empty());
        assert_eq!(list.end, 3);
    }

    #[test]
    fn test_trailing_empty_argument_is_kept() {
        let src = "F(1,)";
        let list = scan_arguments(src, 1).unwrap();
        assert_eq!(texts(src, &list), vec!["1", ""]);
    }

    #[test]
    fn test_unclosed_parenthesis() {
        let err = scan_arguments("F(1, (2)", 1).unwrap_err();
        assert_eq!(err.code, ErrorCode::UNCLOSED_PARENTHESIS);
        assert_eq!(err.position(), 1);
    }

    #[test]
    fn test_closing_bracket_ignores_quoted_brackets() {
        let src = r#"a["x]\"]y"]"#;
        assert_eq!(find_closing_bracket(src, 1), Some(src.len() - 1));
    }

    #[test]
    fn test_closing_bracket_nested() {
        let src = "a[b[1]]";
        assert_eq!(find_closing_bracket(src, 1), Some(6));
        assert_eq!(find_closing_bracket("a[b[1]", 1), None);
    }
}
