//! Condition, action and parameter code.

use std::collections::BTreeSet;

use gdevents_types::{
    EventId, ErrorCode, ExpressionKind, ExpressionLookup, Instruction, InstructionMetadata,
    InstructionOwner, ParameterMetadata, ParameterType,
};
use log::warn;

use crate::context::CodegenContext;
use crate::expression::VariableScope;
use crate::generator::EventsCodeGenerator;

/// Built-in condition types generated without metadata.
pub const AND_CONDITION: &str = "BuiltinCommonInstructions::And";
pub const OR_CONDITION: &str = "BuiltinCommonInstructions::Or";
pub const NOT_CONDITION: &str = "BuiltinCommonInstructions::Not";

const RELATIONAL_OPERATORS: [&str; 5] = ["<", ">", "<=", ">=", "!="];
const ASSIGNMENT_OPERATORS: [&str; 5] = ["=", "+", "-", "*", "/"];

/// What an instruction's parameters are generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Condition { inverted: bool },
    Action,
}

impl<'a> EventsCodeGenerator<'a> {
    // ══════════════════════════════════════════════════════════════════════════
    // Conditions
    // ══════════════════════════════════════════════════════════════════════════

    /// Code evaluating `conditions` in order, each one only if the previous
    /// ones are true. The result of condition `i` is stored in
    /// `condition_boolean(i, custom depth)`.
    pub(crate) fn generate_conditions_list(
        &mut self,
        conditions: &[Instruction],
        ctx: &mut CodegenContext<'_>,
    ) -> String {
        let custom_depth = ctx.custom_condition_depth();
        self.max_custom_condition_depth = self.max_custom_condition_depth.max(custom_depth);
        self.max_conditions_list_size = self.max_conditions_list_size.max(conditions.len());

        let mut out = String::new();
        for index in 0..conditions.len() {
            let boolean = self.backend.condition_boolean(index, custom_depth);
            out.push_str(&self.backend.set_boolean(&boolean, "false"));
        }
        for (index, condition) in conditions.iter().enumerate() {
            if index > 0 {
                let previous = self.backend.condition_boolean(index - 1, custom_depth);
                out.push_str(&format!("if ({}) {{\n", self.backend.read_boolean(&previous)));
            }
            let boolean = self.backend.condition_boolean(index, custom_depth);
            out.push_str("{\n");
            out.push_str(&self.generate_condition(condition, &boolean, ctx));
            out.push_str("}\n");
        }
        for _ in 1..conditions.len() {
            out.push_str("}\n");
        }
        out
    }

    /// Expression true when a list of `count` conditions all held, `None`
    /// for an empty list.
    pub(crate) fn conditions_predicate(
        &self,
        count: usize,
        ctx: &CodegenContext<'_>,
    ) -> Option<String> {
        let last = count.checked_sub(1)?;
        let boolean = self
            .backend
            .condition_boolean(last, ctx.custom_condition_depth());
        Some(self.backend.read_boolean(&boolean))
    }

    /// Code storing the result of `condition` in `boolean`.
    pub(crate) fn generate_condition(
        &mut self,
        condition: &Instruction,
        boolean: &str,
        ctx: &mut CodegenContext<'_>,
    ) -> String {
        let previous = self.current_instruction.replace(condition.type_name.clone());
        let code = match condition.type_name.as_str() {
            AND_CONDITION => self.generate_and(&condition.sub_instructions, boolean, false, ctx),
            NOT_CONDITION => self.generate_and(&condition.sub_instructions, boolean, true, ctx),
            OR_CONDITION => self.generate_or(&condition.sub_instructions, boolean, ctx),
            type_name => match self.scope.metadata().condition(type_name) {
                Some(metadata) => self.generate_condition_call(condition, metadata, boolean, ctx),
                None => self.unknown_instruction(type_name),
            },
        };
        self.current_instruction = previous;
        code
    }

    fn generate_condition_call(
        &mut self,
        condition: &Instruction,
        metadata: &'a InstructionMetadata,
        boolean: &str,
        ctx: &mut CodegenContext<'_>,
    ) -> String {
        self.include_files.extend(metadata.include_files.iter().cloned());
        if let Some(skipped) = self.check_objects(condition, metadata) {
            return skipped;
        }
        let role = Role::Condition {
            inverted: condition.inverted,
        };
        match metadata.owner {
            InstructionOwner::Free => {
                let args = self.generate_parameters(condition, metadata, ctx, role);
                let mut predicate = match metadata.value_type {
                    Some(_) => self.relational_call(metadata, &args, &metadata.function_name, 0),
                    None => format!("{}({})", metadata.function_name, args.join(", ")),
                };
                let handles_inversion = metadata
                    .parameters
                    .iter()
                    .any(|p| p.param_type == ParameterType::ConditionInverted);
                if condition.inverted && !handles_inversion {
                    predicate = format!("!({predicate})");
                }
                self.backend.set_boolean(boolean, &predicate)
            }
            InstructionOwner::Object | InstructionOwner::Behavior => {
                let object = condition.parameter(0);
                let behavior = condition.parameter(1);
                let first = if metadata.owner == InstructionOwner::Object { 1 } else { 2 };
                let mut out = String::new();
                for real in self.scope.expand_object_name(object, ctx.current_object()) {
                    ctx.set_current_object(Some(real.clone()));
                    ctx.objects_list_needed(&real);
                    let args = self.generate_parameters(condition, metadata, ctx, role);
                    let list = self.objects_list_name(&real, ctx);
                    let function = self.instance_function(&list, behavior, metadata, &metadata.function_name);
                    let mut predicate = match metadata.value_type {
                        Some(_) => self.relational_call(metadata, &args, &function, first),
                        None => format!("{function}({})", args[first.min(args.len())..].join(", ")),
                    };
                    if condition.inverted {
                        predicate = format!("!({predicate})");
                    }
                    out.push_str(&self.backend.object_condition(&list, &predicate, boolean));
                    ctx.set_current_object(None);
                }
                out
            }
        }
    }

    /// `And` and `Not`: the sub-conditions as a list in a deeper custom
    /// condition scope.
    fn generate_and(
        &mut self,
        sub_conditions: &[Instruction],
        boolean: &str,
        negate: bool,
        ctx: &mut CodegenContext<'_>,
    ) -> String {
        ctx.enter_custom_condition();
        let mut out = self.generate_conditions_list(sub_conditions, ctx);
        let predicate = self
            .conditions_predicate(sub_conditions.len(), ctx)
            .unwrap_or_else(|| "true".to_string());
        let value = if negate {
            format!("!({predicate})")
        } else {
            predicate
        };
        out.push_str(&self.backend.set_boolean(boolean, &value));
        ctx.leave_custom_condition();
        format!("{{\n{out}}}\n")
    }

    /// `Or`: each sub-condition picks from its own scope; the instances
    /// picked by true branches are merged into "final" lists that replace
    /// the enclosing ones.
    fn generate_or(
        &mut self,
        sub_conditions: &[Instruction],
        boolean: &str,
        ctx: &mut CodegenContext<'_>,
    ) -> String {
        ctx.enter_custom_condition();
        let custom_depth = ctx.custom_condition_depth();
        self.max_custom_condition_depth = self.max_custom_condition_depth.max(custom_depth);
        self.max_conditions_list_size = self.max_conditions_list_size.max(sub_conditions.len());

        let mut merged: BTreeSet<String> = BTreeSet::new();
        let mut branches = self.backend.set_boolean(boolean, "false");
        for (index, sub_condition) in sub_conditions.iter().enumerate() {
            let sub_boolean = self.backend.condition_boolean(index, custom_depth);
            let mut child = CodegenContext::inherit(ctx);
            child.forbid_reuse();
            let code = self.generate_condition(sub_condition, &sub_boolean, &mut child);
            let declarations = self.generate_objects_declarations(&child);
            branches.push_str("{\n");
            branches.push_str(&self.backend.set_boolean(&sub_boolean, "false"));
            branches.push_str(&declarations);
            branches.push_str(&code);
            branches.push_str(&format!("if ({}) {{\n", self.backend.read_boolean(&sub_boolean)));
            branches.push_str(&self.backend.set_boolean(boolean, "true"));
            for name in child.all_to_declare() {
                let list = self.objects_list_name(&name, &child);
                let final_list = self.final_list_name(&name, ctx);
                branches.push_str(&self.backend.merge_unique(&list, &final_list));
                merged.insert(name);
            }
            branches.push_str("}\n}\n");
        }

        let mut out = String::new();
        for name in &merged {
            ctx.objects_list_without_picking_needed(name);
            let final_list = self.final_list_name(name, ctx);
            self.global_declarations.insert(self.backend.global_list(&final_list));
            out.push_str(&self.backend.clear_list(&final_list));
        }
        out.push_str(&branches);
        out.push_str("{\n");
        for name in &merged {
            let final_list = self.final_list_name(name, ctx);
            let list = self.objects_list_name(name, ctx);
            out.push_str(&self.backend.copy_list(&final_list, &list));
        }
        out.push_str("}\n");
        ctx.leave_custom_condition();
        out
    }

    fn final_list_name(&mut self, object: &str, ctx: &CodegenContext<'_>) -> String {
        let base = self.mangler.objects_list_name(object);
        self.backend
            .final_objects_list(&base, ctx.depth(), ctx.custom_condition_depth())
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Actions
    // ══════════════════════════════════════════════════════════════════════════

    /// Code running `action`.
    pub(crate) fn generate_action(
        &mut self,
        action: &Instruction,
        ctx: &mut CodegenContext<'_>,
    ) -> String {
        let previous = self.current_instruction.replace(action.type_name.clone());
        let code = match self.scope.metadata().action(&action.type_name) {
            Some(metadata) => self.generate_action_call(action, metadata, ctx),
            None => self.unknown_instruction(&action.type_name),
        };
        self.current_instruction = previous;
        code
    }

    fn generate_action_call(
        &mut self,
        action: &Instruction,
        metadata: &'a InstructionMetadata,
        ctx: &mut CodegenContext<'_>,
    ) -> String {
        self.include_files.extend(metadata.include_files.iter().cloned());
        if metadata.is_async() {
            warn!(
                "asynchronous action \"{}\" generated synchronously",
                action.type_name
            );
        }
        if let Some(skipped) = self.check_objects(action, metadata) {
            return skipped;
        }
        match metadata.owner {
            InstructionOwner::Free => {
                let args = self.generate_parameters(action, metadata, ctx, Role::Action);
                let call = self.action_call(
                    metadata,
                    &args,
                    &metadata.function_name,
                    metadata.getter.as_deref(),
                    0,
                );
                format!("{call};\n")
            }
            InstructionOwner::Object | InstructionOwner::Behavior => {
                let object = action.parameter(0);
                let behavior = action.parameter(1);
                let first = if metadata.owner == InstructionOwner::Object { 1 } else { 2 };
                let mut out = String::new();
                for real in self.scope.expand_object_name(object, ctx.current_object()) {
                    ctx.set_current_object(Some(real.clone()));
                    ctx.objects_list_needed(&real);
                    let args = self.generate_parameters(action, metadata, ctx, Role::Action);
                    let list = self.objects_list_name(&real, ctx);
                    let function = self.instance_function(&list, behavior, metadata, &metadata.function_name);
                    let getter = metadata
                        .getter
                        .as_deref()
                        .map(|getter| self.instance_function(&list, behavior, metadata, getter));
                    let call = self.action_call(metadata, &args, &function, getter.as_deref(), first);
                    out.push_str(&self.backend.object_action(&list, &call));
                    ctx.set_current_object(None);
                }
                out
            }
        }
    }

    /// The asynchronous variant of `action`, when it can be generated as
    /// a task.
    pub(crate) fn async_action(&self, action: &Instruction) -> Option<&'a InstructionMetadata> {
        let metadata = self.scope.metadata().action(&action.type_name)?;
        if !metadata.is_async() {
            return None;
        }
        if metadata.owner != InstructionOwner::Free {
            warn!(
                "asynchronous action \"{}\" is not a free action, generated synchronously",
                action.type_name
            );
            return None;
        }
        Some(metadata)
    }

    /// Task registration for an asynchronous action; `remaining` actions
    /// and `sub_events` run in the continuation.
    pub(crate) fn generate_async_action(
        &mut self,
        action: &Instruction,
        metadata: &'a InstructionMetadata,
        remaining: &[Instruction],
        sub_events: &[EventId],
        ctx: &mut CodegenContext<'_>,
    ) -> String {
        let previous = self.current_instruction.replace(action.type_name.clone());
        self.include_files.extend(metadata.include_files.iter().cloned());
        let args = self.generate_parameters(action, metadata, ctx, Role::Action);
        let function = metadata
            .async_function_name
            .as_deref()
            .unwrap_or(&metadata.function_name);
        let call = format!("{function}({})", args.join(", "));
        self.current_instruction = previous;

        self.async_callbacks += 1;
        let callback = self.backend.async_callback_name(self.async_callbacks);
        self.async_captures.push(BTreeSet::new());
        let body = {
            let mut callback_ctx = CodegenContext::async_inherit(ctx);
            let code = self.generate_actions_and_sub_events(remaining, sub_events, &mut callback_ctx, true);
            let mut body = self.generate_objects_declarations(&callback_ctx);
            body.push_str(&code);
            body
        };
        let captured = self.async_captures.pop().unwrap_or_default();
        let definition = self.backend.async_callback(&callback, &body);
        self.code_outside_main.push_str(&definition);

        // A list the callback restores but this scope never declared comes
        // from an earlier suspension point: restore it here too so it can
        // be captured again.
        let declared = ctx.all_to_declare();
        for name in &captured {
            if !ctx.object_already_declared_by_parents(name) && !declared.contains(name) {
                ctx.objects_list_needed(name);
            }
        }

        let captures: Vec<(String, String)> = captured
            .into_iter()
            .map(|name| {
                let list = self.objects_list_name(&name, ctx);
                (name, list)
            })
            .collect();
        self.backend.async_task(&call, &captures, &callback)
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Calls
    // ══════════════════════════════════════════════════════════════════════════

    /// Member function of the iterated instance of `list`, through the
    /// behavior for behavior instructions.
    fn instance_function(
        &self,
        list: &str,
        behavior: &str,
        metadata: &InstructionMetadata,
        function: &str,
    ) -> String {
        let instance = self.backend.instance(list, "i");
        match metadata.owner {
            InstructionOwner::Behavior => self.backend.behavior_member(&instance, behavior, function),
            _ => self.backend.member(&instance, function),
        }
    }

    /// `function(args) op rhs` for a relational condition.
    fn relational_call(
        &mut self,
        metadata: &InstructionMetadata,
        args: &[String],
        function: &str,
        first: usize,
    ) -> String {
        let Some(op_index) = operator_index(metadata, ParameterType::RelationalOperator, first)
            .filter(|&i| i + 1 < args.len())
        else {
            self.report(
                ErrorCode::MISSING_OPERAND,
                "The relational operator has no value to compare with",
            );
            return "false".to_string();
        };
        let op = args[op_index].trim_matches('"');
        let lhs_args = without(args, first, op_index);
        format!("{function}({}) {op} {}", lhs_args.join(", "), args[op_index + 1])
    }

    /// Call of an action, applying its assignment operator if it has one.
    fn action_call(
        &mut self,
        metadata: &InstructionMetadata,
        args: &[String],
        function: &str,
        getter: Option<&str>,
        first: usize,
    ) -> String {
        let first = first.min(args.len());
        if metadata.value_type.is_none() {
            return format!("{function}({})", args[first..].join(", "));
        }
        let Some(op_index) = operator_index(metadata, ParameterType::Operator, first)
            .filter(|&i| i + 1 < args.len())
        else {
            self.report(
                ErrorCode::MISSING_OPERAND,
                "The operator has no value to apply",
            );
            return String::new();
        };
        let op = args[op_index].trim_matches('"');
        let rhs = &args[op_index + 1];
        let other_args = without(args, first, op_index);
        match getter {
            Some(getter) => {
                let value = if op == "=" {
                    rhs.clone()
                } else {
                    format!("{getter}({}) {op} ({rhs})", other_args.join(", "))
                };
                let mut setter_args = other_args;
                setter_args.push(value);
                format!("{function}({})", setter_args.join(", "))
            }
            None if op == "=" => format!("{function}({}) = ({rhs})", other_args.join(", ")),
            None => format!("{function}({}) {op}= ({rhs})", other_args.join(", ")),
        }
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Parameters
    // ══════════════════════════════════════════════════════════════════════════

    fn generate_parameters(
        &mut self,
        instruction: &Instruction,
        metadata: &InstructionMetadata,
        ctx: &mut CodegenContext<'_>,
        role: Role,
    ) -> Vec<String> {
        let inverted = match role {
            Role::Condition { inverted } => inverted,
            Role::Action => false,
        };
        let mut last_object = String::new();
        let mut args = Vec::with_capacity(metadata.parameters.len());
        for (index, parameter) in metadata.parameters.iter().enumerate() {
            let mut text = instruction.parameter(index);
            if text.is_empty() && parameter.optional {
                text = &parameter.default_value;
            }
            args.push(self.generate_parameter(text, parameter, ctx, &last_object, inverted));
            if parameter.param_type.is_object() {
                last_object = text.to_string();
            }
        }
        args
    }

    /// Code of one parameter value. `last_object` is the previous object
    /// parameter, owner of `objectvar` parameters.
    pub(crate) fn generate_parameter(
        &mut self,
        text: &str,
        parameter: &ParameterMetadata,
        ctx: &mut CodegenContext<'_>,
        last_object: &str,
        inverted: bool,
    ) -> String {
        if parameter.optional && text.trim().is_empty() {
            match parameter.param_type {
                ParameterType::Expression | ParameterType::Variadic => return "0".to_string(),
                ParameterType::String => return self.backend.text_literal(""),
                _ => {}
            }
        }
        match parameter.param_type {
            ParameterType::Expression | ParameterType::Variadic => {
                self.generate_expression(text, ExpressionKind::Math, ctx)
            }
            ParameterType::String => self.generate_expression(text, ExpressionKind::String, ctx),
            ParameterType::ObjectVar => {
                let owner = if last_object.is_empty() {
                    ctx.current_object().unwrap_or_default().to_string()
                } else {
                    last_object.to_string()
                };
                self.generate_variable(text, VariableScope::Object(&owner), ctx)
            }
            ParameterType::SceneVar => {
                self.generate_variable(text, VariableScope::Scene, ctx)
            }
            ParameterType::GlobalVar => {
                self.generate_variable(text, VariableScope::Global, ctx)
            }
            ParameterType::Object | ParameterType::Behavior => self.backend.quote(text),
            ParameterType::RelationalOperator => {
                let op = text.trim();
                let op = if op == "=" {
                    "=="
                } else if RELATIONAL_OPERATORS.contains(&op) {
                    op
                } else {
                    warn!("unknown relational operator \"{op}\", using ==");
                    "=="
                };
                self.backend.quote(op)
            }
            ParameterType::Operator => {
                let op = text.trim();
                let op = if ASSIGNMENT_OPERATORS.contains(&op) {
                    op
                } else {
                    warn!("unknown operator \"{op}\", using =");
                    "="
                };
                self.backend.quote(op)
            }
            ParameterType::Key
            | ParameterType::Mouse
            | ParameterType::Color
            | ParameterType::Layer => self.backend.quote(text),
            ParameterType::YesOrNo => {
                let yes = text.trim().eq_ignore_ascii_case("yes");
                yes.to_string()
            }
            ParameterType::TrueOrFalse => {
                let value = text.trim().eq_ignore_ascii_case("true");
                value.to_string()
            }
            ParameterType::CurrentScene => self.backend.current_scene().to_string(),
            ParameterType::ObjectList => self.objects_map(text, ctx, |ctx, name| {
                ctx.objects_list_needed(name)
            }),
            ParameterType::ObjectListOrEmptyIfJustDeclared => {
                self.objects_map(text, ctx, |ctx, name| {
                    ctx.objects_list_without_picking_needed(name)
                })
            }
            ParameterType::ObjectListWithoutPicking => self.objects_map(text, ctx, |ctx, name| {
                ctx.empty_objects_list_needed(name)
            }),
            ParameterType::ObjectPtr => self.object_ptr(text, ctx),
            ParameterType::InlineCode => parameter.extra_info.clone(),
            ParameterType::ConditionInverted => inverted.to_string(),
            ParameterType::Unknown => {
                warn!("parameter \"{text}\" of unknown type passed as a string");
                self.backend.quote(text)
            }
        }
    }

    fn objects_map(
        &mut self,
        object: &str,
        ctx: &mut CodegenContext<'_>,
        register: impl Fn(&mut CodegenContext<'_>, &str),
    ) -> String {
        let mut entries = Vec::new();
        for real in self.scope.expand_object_name(object, ctx.current_object()) {
            register(ctx, &real);
            let list = self.objects_list_name(&real, ctx);
            entries.push((real, list));
        }
        self.backend.objects_map(&entries)
    }

    fn object_ptr(&mut self, object: &str, ctx: &mut CodegenContext<'_>) -> String {
        let reals = self.scope.expand_object_name(object, ctx.current_object());
        if let Some(current) = ctx.current_object() {
            if reals.iter().any(|r| r == current) {
                let current = current.to_string();
                let list = self.objects_list_name(&current, ctx);
                return self.backend.instance(&list, "i");
            }
        }
        for real in &reals {
            ctx.objects_list_needed(real);
        }
        let mut out = self.backend.null_instance().to_string();
        for real in reals.iter().rev() {
            let list = self.objects_list_name(real, ctx);
            out = self.backend.first_instance_ptr_or(&list, &out);
        }
        out
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Checks
    // ══════════════════════════════════════════════════════════════════════════

    fn unknown_instruction(&mut self, type_name: &str) -> String {
        self.report(
            ErrorCode::UNKNOWN_INSTRUCTION,
            format!("Unknown instruction \"{type_name}\""),
        );
        "/* Unknown instruction - skipped. */\n".to_string()
    }

    /// Comment replacing the instruction when one of its object or
    /// behavior parameters does not resolve.
    fn check_objects(
        &mut self,
        instruction: &Instruction,
        metadata: &InstructionMetadata,
    ) -> Option<String> {
        for (index, parameter) in metadata.parameters.iter().enumerate() {
            if !parameter.param_type.is_object() {
                continue;
            }
            let object = instruction.parameter(index);
            if object.is_empty() && parameter.optional {
                continue;
            }
            if !self.scope.has_object_or_group(object) {
                self.report(
                    ErrorCode::UNKNOWN_OBJECT,
                    format!("Unknown object \"{object}\""),
                );
                return Some("/* Unknown object - skipped. */\n".to_string());
            }
            if !parameter.extra_info.is_empty() && self.scope.object_type(object) != parameter.extra_info {
                self.report(
                    ErrorCode::MISMATCHED_OBJECT_TYPE,
                    format!(
                        "Object \"{object}\" is not of type \"{}\"",
                        parameter.extra_info
                    ),
                );
                return Some("/* Mismatched object type - skipped. */\n".to_string());
            }
        }
        if metadata.owner == InstructionOwner::Behavior {
            let object = instruction.parameter(0);
            let behavior = instruction.parameter(1);
            if !self.scope.object_has_behavior(object, behavior) {
                self.report(
                    ErrorCode::UNKNOWN_BEHAVIOR,
                    format!("Object \"{object}\" has no behavior \"{behavior}\""),
                );
                return Some("/* Unknown behavior - skipped. */\n".to_string());
            }
        }
        None
    }
}

/// Index of the last parameter of type `op_type` at or after `first`.
fn operator_index(
    metadata: &InstructionMetadata,
    op_type: ParameterType,
    first: usize,
) -> Option<usize> {
    metadata
        .parameters
        .iter()
        .enumerate()
        .skip(first)
        .rev()
        .find(|(_, p)| p.param_type == op_type)
        .map(|(i, _)| i)
}

/// `args[first..]` without the operator and the value following it.
fn without(args: &[String], first: usize, op_index: usize) -> Vec<String> {
    args.iter()
        .enumerate()
        .skip(first)
        .filter(|&(i, _)| i != op_index && i != op_index + 1)
        .map(|(_, a)| a.clone())
        .collect()
}
