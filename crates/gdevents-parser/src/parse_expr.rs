//! Math and string expression parsing.
//!
//! ```text
//! Expr         := Term (BinOp Term)*
//! Term         := Number | Text | UnaryOp Term | '(' Expr ')' | FunctionCall | Identifier
//! FunctionCall := [Object '.' [Behavior ('.' | '::')]] Name '(' ArgList? ')'
//! ```
//! There is no precedence climbing: operators are reported in source order
//! and passed through to the target language, which applies its own
//! precedence. Instead of building a tree, the parser reports what it
//! recognizes as a stream of [`ExprEvent`]s.

use gdevents_lexer::{scan_arguments, TokenKind};
use gdevents_types::{
    arity_window, ErrorCode, ExpressionKind, ExpressionLookup, ExpressionMetadata,
    ParameterMetadata, ParameterType, ParseError, Span, ValueKind,
};

use crate::parser::{trimmed, Cursor, MAX_NESTING};
use crate::variable::{PathEvent, VariablePathParser};

// ══════════════════════════════════════════════════════════════════════════════
// Events
// ══════════════════════════════════════════════════════════════════════════════

/// Something the parser recognized, in source order.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprEvent<'m> {
    /// Numeric literal, as written.
    Number(String),
    /// Text literal, escapes resolved.
    Text(String),
    /// Bareword in a math expression.
    Constant(String),
    /// Binary operator.
    Operator(char),
    /// Prefix `+` or `-`.
    UnaryOperator(char),
    /// `(` of a parenthesized sub-expression.
    OpenGroup,
    /// `)` of a parenthesized sub-expression.
    CloseGroup,
    /// An argument that was validated, fired before the call owning it.
    SubExpression {
        kind: ExpressionKind,
        source: String,
        offset: usize,
    },
    /// `Name(...)`
    StaticCall(Call<'m>),
    /// `Object.Name(...)`
    ObjectCall(Call<'m>),
    /// `Object.Behavior.Name(...)` or `Object.Behavior::Name(...)`
    BehaviorCall(Call<'m>),
}

/// A resolved function call.
#[derive(Debug, Clone, PartialEq)]
pub struct Call<'m> {
    pub object: Option<String>,
    pub behavior: Option<String>,
    pub name: String,
    pub metadata: &'m ExpressionMetadata,
    /// One entry per declared parameter: the object and behavior names in
    /// their implicit slots, `""` for code-only parameters, defaults for
    /// omitted optional ones. Extra variadic arguments follow.
    pub arguments: Vec<CallArgument>,
    pub span: Span,
}

impl Call<'_> {
    /// Index of the first parameter the user writes.
    pub fn first_written(&self) -> usize {
        match (&self.object, &self.behavior) {
            (Some(_), Some(_)) => 2,
            (Some(_), None) => 1,
            _ => 0,
        }
    }

    /// Declared parameter for argument `index`; arguments past the end of
    /// a variadic list share the variadic parameter.
    pub fn parameter(&self, index: usize) -> Option<&ParameterMetadata> {
        let params = &self.metadata.parameters;
        params.get(index).or_else(|| {
            params
                .last()
                .filter(|p| p.param_type == ParameterType::Variadic)
        })
    }
}

/// Text of one argument, trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallArgument {
    pub text: String,
    /// Offset of `text` in the top-level expression (0 if synthesized).
    pub offset: usize,
    /// Whether the user wrote it (as opposed to an implicit name, a
    /// default value or a code-only placeholder).
    pub written: bool,
}

impl CallArgument {
    fn synthesized(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            offset: 0,
            written: false,
        }
    }
}

/// Events of an expression, plus the error that stopped parsing if any.
///
/// Events emitted before the error are kept: callers must check
/// [`ParsedExpression::is_ok`] before generating code from them.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedExpression<'m> {
    pub events: Vec<ExprEvent<'m>>,
    pub error: Option<ParseError>,
}

impl<'m> ParsedExpression<'m> {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Events if parsing succeeded, else the error.
    pub fn into_result(self) -> Result<Vec<ExprEvent<'m>>, ParseError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.events),
        }
    }
}

impl<'m> IntoIterator for ParsedExpression<'m> {
    type Item = ExprEvent<'m>;
    type IntoIter = std::vec::IntoIter<ExprEvent<'m>>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Parser
// ══════════════════════════════════════════════════════════════════════════════

/// Parser for math and string expressions.
pub struct ExpressionParser<'m> {
    lookup: &'m dyn ExpressionLookup,
}

impl<'m> ExpressionParser<'m> {
    pub fn new(lookup: &'m dyn ExpressionLookup) -> Self {
        Self { lookup }
    }

    /// Parse `source` as `kind`, feeding events to `visitor` until the end
    /// or the first error.
    ///
    /// Variable-path kinds are validated without emitting events;
    /// code-only text is accepted as is.
    pub fn parse(
        &self,
        source: &str,
        kind: ExpressionKind,
        visitor: &mut dyn FnMut(ExprEvent<'m>),
    ) -> Result<(), ParseError> {
        self.parse_nested(source, kind, visitor, 0)
    }

    /// `depth` is the nesting level of the enclosing call arguments.
    fn parse_nested(
        &self,
        source: &str,
        kind: ExpressionKind,
        visitor: &mut dyn FnMut(ExprEvent<'m>),
        depth: u32,
    ) -> Result<(), ParseError> {
        match kind {
            ExpressionKind::Math | ExpressionKind::String => {}
            ExpressionKind::VariablePath => return self.validate_path(source, depth),
            ExpressionKind::CodeOnly => return Ok(()),
        }
        if source.trim().is_empty() {
            return Err(ParseError::new(
                ErrorCode::EMPTY_EXPRESSION,
                "The expression is empty",
                Span::point(0),
            ));
        }
        let mut state = ExprState {
            cursor: Cursor::new(source)?,
            kind,
            lookup: self.lookup,
            visitor,
            depth,
        };
        state.expression()?;
        state.expect_end()
    }

    /// Parse `source` into a [`ParsedExpression`].
    pub fn parse_events(&self, source: &str, kind: ExpressionKind) -> ParsedExpression<'m> {
        let mut events = Vec::new();
        let error = self.parse(source, kind, &mut |e| events.push(e)).err();
        ParsedExpression { events, error }
    }

    /// Parse as a math expression.
    pub fn parse_math(&self, source: &str) -> ParsedExpression<'m> {
        self.parse_events(source, ExpressionKind::Math)
    }

    /// Parse as a string expression.
    pub fn parse_string(&self, source: &str) -> ParsedExpression<'m> {
        self.parse_events(source, ExpressionKind::String)
    }

    /// Check `source` without keeping events.
    pub fn validate(&self, source: &str, kind: ExpressionKind) -> Result<(), ParseError> {
        self.parse(source, kind, &mut |_| {})
    }

    /// Check a variable path and every subscript in it.
    fn validate_path(&self, source: &str, depth: u32) -> Result<(), ParseError> {
        let mut subscripts = Vec::new();
        VariablePathParser::new().parse(source, &mut |event| {
            if let PathEvent::Subscript { source, offset } = event {
                subscripts.push((source, offset));
            }
        })?;
        for (text, offset) in subscripts {
            self.parse_nested(&text, ExpressionKind::String, &mut |_| {}, depth + 1)
                .map_err(|e| e.offset_by(offset))?;
        }
        Ok(())
    }
}

/// Per-parse state.
struct ExprState<'src, 'm, 'v> {
    cursor: Cursor<'src>,
    kind: ExpressionKind,
    lookup: &'m dyn ExpressionLookup,
    visitor: &'v mut dyn FnMut(ExprEvent<'m>),
    depth: u32,
}

impl<'src, 'm, 'v> ExprState<'src, 'm, 'v> {
    fn emit(&mut self, event: ExprEvent<'m>) {
        (self.visitor)(event);
    }

    fn value_kind(&self) -> ValueKind {
        ValueKind::of(self.kind)
    }

    fn is_string(&self) -> bool {
        self.kind == ExpressionKind::String
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Expression / Term
    // ══════════════════════════════════════════════════════════════════════════

    /// `Expr := Term (BinOp Term)*`
    fn expression(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(self.cursor.error_at_current(
                ErrorCode::NESTING_TOO_DEEP,
                format!("The expression is nested more than {MAX_NESTING} levels deep"),
            ));
        }
        self.term()?;
        loop {
            let kind = self.cursor.peek_kind().clone();
            if let Some(op) = kind.operator_char() {
                if self.is_string() && op != '+' {
                    return Err(self.cursor.error_at_current(
                        ErrorCode::INVALID_OPERATOR,
                        format!("The operator {op} can't be used with texts. Only + can concatenate texts"),
                    ));
                }
                self.cursor.advance()?;
                self.emit(ExprEvent::Operator(op));
                self.term()?;
            } else if let TokenKind::OtherOperator(op) = kind {
                return Err(self.invalid_operator(op));
            } else {
                break;
            }
        }
        self.depth -= 1;
        Ok(())
    }

    fn invalid_operator(&self, op: char) -> ParseError {
        let message = if self.is_string() {
            format!("The operator {op} is not supported. Only + can concatenate texts")
        } else {
            format!("The operator {op} is not supported. Available operators are + - * /")
        };
        self.cursor.error_at_current(ErrorCode::INVALID_OPERATOR, message)
    }

    /// `Term := Number | Text | UnaryOp Term | '(' Expr ')' | FunctionCall | Identifier`
    fn term(&mut self) -> Result<(), ParseError> {
        let token = self.cursor.peek().clone();
        match token.kind {
            TokenKind::Number(text) => {
                if self.is_string() {
                    return Err(self.cursor.error_at_current(
                        ErrorCode::WRONG_LITERAL_KIND,
                        "You entered a number, but a text was expected (in quotes)",
                    ));
                }
                self.cursor.advance()?;
                self.emit(ExprEvent::Number(text));
                Ok(())
            }
            TokenKind::Text(value) => {
                if !self.is_string() {
                    return Err(self.cursor.error_at_current(
                        ErrorCode::WRONG_LITERAL_KIND,
                        "You entered a text, but a number was expected",
                    ));
                }
                self.cursor.advance()?;
                self.emit(ExprEvent::Text(value));
                Ok(())
            }
            TokenKind::Plus => self.unary('+'),
            TokenKind::Minus => self.unary('-'),
            TokenKind::LParen => {
                self.cursor.advance()?;
                self.emit(ExprEvent::OpenGroup);
                self.expression()?;
                if !self.cursor.eat(&TokenKind::RParen)? {
                    return Err(ParseError::new(
                        ErrorCode::UNCLOSED_PARENTHESIS,
                        "Missing a closing parenthesis. Add a closing parenthesis for each opening parenthesis",
                        token.span,
                    ));
                }
                self.emit(ExprEvent::CloseGroup);
                Ok(())
            }
            TokenKind::Identifier(name) => self.identifier(name, token.span),
            TokenKind::Eof => Err(self.cursor.error_at_current(
                ErrorCode::UNEXPECTED_TOKEN,
                "A value is missing at the end of the expression",
            )),
            TokenKind::RParen => Err(self.cursor.error_at_current(
                ErrorCode::UNEXPECTED_TOKEN,
                "Unexpected closing parenthesis: a value was expected",
            )),
            TokenKind::OtherOperator(op) => Err(self.invalid_operator(op)),
            other => Err(self.cursor.error_at_current(
                ErrorCode::UNEXPECTED_TOKEN,
                format!("Unexpected {other}: a value was expected"),
            )),
        }
    }

    fn unary(&mut self, op: char) -> Result<(), ParseError> {
        if self.is_string() {
            return Err(self.cursor.error_at_current(
                ErrorCode::INVALID_OPERATOR,
                format!("The unary operator {op} can't be used with texts"),
            ));
        }
        self.cursor.advance()?;
        self.emit(ExprEvent::UnaryOperator(op));
        self.term()
    }

    /// After the top-level expression, only the end of input may follow.
    fn expect_end(&self) -> Result<(), ParseError> {
        match self.cursor.peek_kind() {
            TokenKind::Eof => Ok(()),
            TokenKind::RParen => Err(self.cursor.error_at_current(
                ErrorCode::UNEXPECTED_TOKEN,
                "Unexpected closing parenthesis without a matching opening one",
            )),
            _ => Err(self.cursor.error_at_current(
                ErrorCode::UNEXPECTED_TOKEN,
                "More than one term was found. Verify that your expression is correctly written",
            )),
        }
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Identifiers and calls
    // ══════════════════════════════════════════════════════════════════════════

    fn identifier(&mut self, name: String, span: Span) -> Result<(), ParseError> {
        self.cursor.advance()?;
        match self.cursor.peek_kind() {
            TokenKind::LParen => {
                let metadata = self
                    .lookup
                    .free_expression(self.value_kind(), &name)
                    .ok_or_else(|| {
                        ParseError::new(
                            ErrorCode::UNKNOWN_FUNCTION,
                            format!("Cannot find an expression called \"{name}\""),
                            span,
                        )
                    })?;
                let call = self.call(None, None, name, metadata, span)?;
                self.emit(ExprEvent::StaticCall(call));
                Ok(())
            }
            TokenKind::Dot => {
                self.cursor.advance()?;
                let (member, member_span) = self.cursor.expect_identifier(
                    ErrorCode::MISSING_FUNCTION_NAME,
                    "A name should be entered after the dot",
                )?;
                self.object_member(name, span, member, member_span)
            }
            _ if self.is_string() => Err(ParseError::new(
                ErrorCode::UNKNOWN_CONSTANT,
                format!("\"{name}\" is not a text: put it between quotes or call a function"),
                span,
            )),
            _ => {
                self.emit(ExprEvent::Constant(name));
                Ok(())
            }
        }
    }

    /// `Object.Name(...)` or `Object.Behavior[.|::]Name(...)`.
    fn object_member(
        &mut self,
        object: String,
        object_span: Span,
        member: String,
        member_span: Span,
    ) -> Result<(), ParseError> {
        if !self.lookup.has_object(&object) {
            return Err(ParseError::new(
                ErrorCode::UNKNOWN_OBJECT,
                format!("No object or group called \"{object}\" exists"),
                object_span,
            ));
        }
        match self.cursor.peek_kind() {
            TokenKind::LParen => {
                let metadata = self
                    .lookup
                    .object_expression(self.value_kind(), &object, &member)
                    .ok_or_else(|| {
                        ParseError::new(
                            ErrorCode::UNKNOWN_FUNCTION,
                            format!("No expression called \"{member}\" exists for object \"{object}\""),
                            member_span,
                        )
                    })?;
                let call = self.call(Some(object), None, member, metadata, object_span)?;
                self.emit(ExprEvent::ObjectCall(call));
                Ok(())
            }
            TokenKind::Dot | TokenKind::DoubleColon => {
                self.cursor.advance()?;
                let (function, function_span) = self.cursor.expect_identifier(
                    ErrorCode::MISSING_FUNCTION_NAME,
                    "A function name should be entered after the behavior name",
                )?;
                if self.cursor.peek_kind() != &TokenKind::LParen {
                    return Err(self.cursor.error_at_current(
                        ErrorCode::UNEXPECTED_TOKEN,
                        format!("An opening parenthesis was expected after \"{function}\""),
                    ));
                }
                if !self.lookup.object_has_behavior(&object, &member) {
                    return Err(ParseError::new(
                        ErrorCode::UNKNOWN_BEHAVIOR,
                        format!("Object \"{object}\" has no behavior called \"{member}\""),
                        member_span,
                    ));
                }
                let metadata = self
                    .lookup
                    .behavior_expression(self.value_kind(), &object, &member, &function)
                    .ok_or_else(|| {
                        ParseError::new(
                            ErrorCode::UNKNOWN_FUNCTION,
                            format!("No expression called \"{function}\" exists for behavior \"{member}\""),
                            function_span,
                        )
                    })?;
                let call = self.call(Some(object), Some(member), function, metadata, object_span)?;
                self.emit(ExprEvent::BehaviorCall(call));
                Ok(())
            }
            _ => Err(self.cursor.error_at_current(
                ErrorCode::UNEXPECTED_TOKEN,
                format!("An opening parenthesis was expected after \"{member}\""),
            )),
        }
    }

    /// Parse the argument list at the cursor (which is on `(`), check it
    /// against `metadata` and validate every argument.
    fn call(
        &mut self,
        object: Option<String>,
        behavior: Option<String>,
        name: String,
        metadata: &'m ExpressionMetadata,
        start: Span,
    ) -> Result<Call<'m>, ParseError> {
        let open = self.cursor.current_span().start;
        let source = self.cursor.source();
        let list = scan_arguments(source, open)?;
        let span = Span::new(start.start, list.end);

        let first = match (&object, &behavior) {
            (Some(_), Some(_)) => 2,
            (Some(_), None) => 1,
            _ => 0,
        };
        let (min, max) = arity_window(&metadata.parameters, first);
        let written = list.arguments.len();
        if written < min || written > max {
            let expected = if max == usize::MAX {
                format!("at least {min} argument(s)")
            } else if min == max {
                format!("{min} argument(s)")
            } else {
                format!("between {min} and {max} arguments")
            };
            return Err(ParseError::new(
                ErrorCode::WRONG_ARG_COUNT,
                format!("The function \"{name}\" expects {expected}, but {written} were given"),
                span,
            ));
        }

        let mut user_args = list.arguments.iter().map(|s| trimmed(source, *s));
        let mut arguments = Vec::with_capacity(metadata.parameters.len());
        let mut to_validate: Vec<(ExpressionKind, usize)> = Vec::new();
        for (index, param) in metadata.parameters.iter().enumerate() {
            if index < first {
                let implicit = if index == 0 { &object } else { &behavior };
                arguments.push(CallArgument::synthesized(implicit.clone().unwrap_or_default()));
                continue;
            }
            if param.is_code_only() {
                arguments.push(CallArgument::synthesized(""));
                continue;
            }
            if param.param_type == ParameterType::Variadic {
                for (text, offset) in user_args.by_ref() {
                    to_validate.push((ExpressionKind::Math, arguments.len()));
                    arguments.push(CallArgument {
                        text: text.to_string(),
                        offset,
                        written: true,
                    });
                }
                continue;
            }
            match user_args.next() {
                Some((text, _)) if text.is_empty() && param.optional => {
                    arguments.push(CallArgument::synthesized(default_argument(param)));
                }
                Some((text, offset)) => {
                    if let Some(kind) = param.param_type.expression_kind() {
                        to_validate.push((kind, arguments.len()));
                    }
                    arguments.push(CallArgument {
                        text: text.to_string(),
                        offset,
                        written: true,
                    });
                }
                None => arguments.push(CallArgument::synthesized(default_argument(param))),
            }
        }

        for (kind, index) in to_validate {
            let argument = &arguments[index];
            let offset = argument.offset;
            ExpressionParser::new(self.lookup)
                .parse_nested(&argument.text, kind, &mut |_| {}, self.depth)
                .map_err(|e| e.offset_by(offset))?;
            let event = ExprEvent::SubExpression {
                kind,
                source: argument.text.clone(),
                offset,
            };
            self.emit(event);
        }

        self.cursor.seek(list.end)?;
        Ok(Call {
            object,
            behavior,
            name,
            metadata,
            arguments,
            span,
        })
    }
}

/// Text substituted for an omitted optional argument.
fn default_argument(param: &ParameterMetadata) -> String {
    if !param.default_value.is_empty() {
        return param.default_value.clone();
    }
    match param.param_type.expression_kind() {
        Some(ExpressionKind::Math) => "0".to_string(),
        Some(ExpressionKind::String) => "\"\"".to_string(),
        _ => String::new(),
    }
}
