//! Expression and variable-path code.
//!
//! Expressions are parsed into [`ExprEvent`]s and translated one event at
//! a time. Arguments of calls are re-parsed from their text with the kind
//! their parameter declares. A text that fails to parse produces a
//! diagnostic and a fallback value (`0` or an empty text).

use gdevents_parser::{Call, ExprEvent, ExpressionParser, PathEvent, VariablePathParser};
use gdevents_types::{ExpressionKind, ParameterMetadata, ParameterType};
use log::warn;

use crate::context::CodegenContext;
use crate::generator::EventsCodeGenerator;

/// Container a variable path starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableScope<'s> {
    Scene,
    Global,
    /// Variables of an object (or of the objects of a group).
    Object(&'s str),
}

impl<'a> EventsCodeGenerator<'a> {
    /// Code of a math or string expression.
    pub fn generate_expression(
        &mut self,
        source: &str,
        kind: ExpressionKind,
        ctx: &mut CodegenContext<'_>,
    ) -> String {
        let parser = ExpressionParser::new(self.scope);
        match parser.parse_events(source, kind).into_result() {
            Ok(events) => self.expression_from_events(events, kind, ctx),
            Err(error) => {
                self.report_parse_error(&error, source);
                self.fallback(kind)
            }
        }
    }

    fn fallback(&self, kind: ExpressionKind) -> String {
        match kind {
            ExpressionKind::String => self.backend.text_literal(""),
            _ => "0".to_string(),
        }
    }

    fn expression_from_events(
        &mut self,
        events: Vec<ExprEvent<'a>>,
        kind: ExpressionKind,
        ctx: &mut CodegenContext<'_>,
    ) -> String {
        let mut out = String::new();
        for event in events {
            match event {
                ExprEvent::Number(number) => out.push_str(&number),
                ExprEvent::Text(text) => out.push_str(&self.backend.text_literal(&text)),
                ExprEvent::Constant(name) => out.push_str(&name),
                ExprEvent::Operator(op) => {
                    out.push(' ');
                    out.push(op);
                    out.push(' ');
                }
                ExprEvent::UnaryOperator(op) => {
                    // `- -x` must not become the decrement operator.
                    if out.ends_with(op) {
                        out.push(' ');
                    }
                    out.push(op);
                }
                ExprEvent::OpenGroup => out.push('('),
                ExprEvent::CloseGroup => out.push(')'),
                ExprEvent::SubExpression { .. } => {}
                ExprEvent::StaticCall(call) => {
                    let code = self.static_call(&call, ctx);
                    out.push_str(&code);
                }
                ExprEvent::ObjectCall(call) | ExprEvent::BehaviorCall(call) => {
                    let code = self.object_call(&call, kind, ctx);
                    out.push_str(&code);
                }
            }
        }
        out
    }

    fn static_call(&mut self, call: &Call<'a>, ctx: &mut CodegenContext<'_>) -> String {
        self.include_files
            .extend(call.metadata.include_files.iter().cloned());
        let args = self.call_arguments(call, 0, ctx);
        format!("{}({})", call.metadata.function_name, args.join(", "))
    }

    /// Object and behavior expressions, read from the iterated instance or
    /// from the first picked instance of each object the name expands to.
    fn object_call(
        &mut self,
        call: &Call<'a>,
        kind: ExpressionKind,
        ctx: &mut CodegenContext<'_>,
    ) -> String {
        self.include_files
            .extend(call.metadata.include_files.iter().cloned());
        let args = self.call_arguments(call, call.first_written(), ctx).join(", ");
        let function = &call.metadata.function_name;
        if call.metadata.static_function {
            return format!("{function}({args})");
        }
        let object = call.object.as_deref().unwrap_or_default();
        let mut out = self.fallback(kind);
        for real in self.scope.expand_object_name(object, ctx.current_object()) {
            ctx.objects_list_needed(&real);
            let list = self.objects_list_name(&real, ctx);
            let is_current = ctx.current_object() == Some(real.as_str());
            let instance = self
                .backend
                .instance(&list, if is_current { "i" } else { "0" });
            let member = match &call.behavior {
                Some(behavior) => self.backend.behavior_member(&instance, behavior, function),
                None => self.backend.member(&instance, function),
            };
            let invocation = format!("{member}({args})");
            out = if is_current {
                invocation
            } else {
                self.backend.first_instance_or(&list, &invocation, &out)
            };
        }
        out
    }

    /// Code of the arguments of `call` from index `first`.
    fn call_arguments(
        &mut self,
        call: &Call<'a>,
        first: usize,
        ctx: &mut CodegenContext<'_>,
    ) -> Vec<String> {
        let math = ParameterMetadata::new(ParameterType::Expression);
        let mut last_object = call.object.clone().unwrap_or_default();
        let mut args = Vec::new();
        for (index, argument) in call.arguments.iter().enumerate() {
            let parameter = call.parameter(index).unwrap_or(&math);
            if index >= first {
                args.push(self.generate_parameter(
                    &argument.text,
                    parameter,
                    ctx,
                    &last_object,
                    false,
                ));
            }
            if parameter.param_type.is_object() {
                last_object = argument.text.clone();
            }
        }
        args
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Variables
    // ══════════════════════════════════════════════════════════════════════════

    /// Code of the variable at `path`, or the bad variable when the path
    /// does not parse.
    pub fn generate_variable(
        &mut self,
        path: &str,
        scope: VariableScope<'_>,
        ctx: &mut CodegenContext<'_>,
    ) -> String {
        let parser = ExpressionParser::new(self.scope);
        if let Err(error) = parser.validate(path, ExpressionKind::VariablePath) {
            self.report_parse_error(&error, path);
            return self.backend.bad_variable().to_string();
        }
        let mut out = match scope {
            VariableScope::Scene => self.backend.scene_variables(),
            VariableScope::Global => self.backend.global_variables(),
            VariableScope::Object(object) => self.object_variables(object, ctx),
        };
        for event in VariablePathParser::new().parse_events(path) {
            out = match event {
                PathEvent::Root(name) => {
                    self.backend.variable_get(&out, &self.backend.quote(&name))
                }
                PathEvent::Child(name) => {
                    self.backend.variable_child(&out, &self.backend.quote(&name))
                }
                PathEvent::Subscript { source, .. } => {
                    let key = self.generate_expression(&source, ExpressionKind::String, ctx);
                    self.backend.variable_child(&out, &key)
                }
            };
        }
        out
    }

    fn object_variables(&mut self, object: &str, ctx: &mut CodegenContext<'_>) -> String {
        let mut out = self.backend.bad_variables_container().to_string();
        if object.is_empty() {
            warn!("object variable without an object, using the bad variables container");
            return out;
        }
        for real in self.scope.expand_object_name(object, ctx.current_object()) {
            ctx.objects_list_needed(&real);
            let list = self.objects_list_name(&real, ctx);
            out = if ctx.current_object() == Some(real.as_str()) {
                self.backend
                    .object_variables(&self.backend.instance(&list, "i"))
            } else {
                let first = self
                    .backend
                    .object_variables(&self.backend.instance(&list, "0"));
                self.backend.first_instance_or(&list, &first, &out)
            };
        }
        out
    }
}
