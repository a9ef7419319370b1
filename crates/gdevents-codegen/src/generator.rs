//! Events code generator: walks an event tree and emits statements.
//!
//! One [`EventsCodeGenerator`] handles one sheet. Each event kind has its
//! own arm; instructions and expressions are generated by the methods in
//! `instruction.rs` and `expression.rs`. Problems never abort the sheet:
//! they are recorded as diagnostics and replaced by fallback code.

use std::collections::{BTreeSet, HashMap};

use gdevents_types::{
    Diagnostic, DiagnosticLocation, Diagnostics, ErrorCode, Event, EventArena, EventId,
    EventKind, Expression, ExpressionKind, Instruction, LayoutScope, ParseError,
};
use log::{debug, trace, warn};

use crate::backend::{Backend, GeneratedCode};
use crate::context::CodegenContext;
use crate::error::{CodegenError, CodegenResult};
use crate::mangler::NameMangler;

/// Deepest event nesting accepted.
pub const MAX_EVENT_DEPTH: usize = 256;

pub struct EventsCodeGenerator<'a> {
    pub(crate) scope: &'a LayoutScope<'a>,
    arena: &'a EventArena,
    pub(crate) backend: &'a dyn Backend,
    pub(crate) mangler: &'a mut NameMangler,
    sheet: String,
    diagnostics: Diagnostics,
    pub(crate) include_files: BTreeSet<String>,
    pub(crate) global_declarations: BTreeSet<String>,
    pub(crate) code_outside_main: String,
    profiling_table: Vec<Option<EventId>>,
    profile_indices: HashMap<EventId, usize>,
    pub(crate) async_callbacks: usize,
    /// Objects restored from captured lists, one set per callback being
    /// generated.
    pub(crate) async_captures: Vec<BTreeSet<String>>,
    pub(crate) max_custom_condition_depth: usize,
    pub(crate) max_conditions_list_size: usize,
    current_event: Option<EventId>,
    pub(crate) current_instruction: Option<String>,
}

impl<'a> EventsCodeGenerator<'a> {
    pub fn new(
        scope: &'a LayoutScope<'a>,
        arena: &'a EventArena,
        backend: &'a dyn Backend,
        mangler: &'a mut NameMangler,
        sheet: impl Into<String>,
    ) -> Self {
        Self {
            scope,
            arena,
            backend,
            mangler,
            sheet: sheet.into(),
            diagnostics: Diagnostics::empty(),
            include_files: BTreeSet::new(),
            global_declarations: BTreeSet::new(),
            code_outside_main: String::new(),
            profiling_table: Vec::new(),
            profile_indices: HashMap::new(),
            async_callbacks: 0,
            async_captures: Vec::new(),
            max_custom_condition_depth: 0,
            max_conditions_list_size: 0,
            current_event: None,
            current_instruction: None,
        }
    }

    /// Generate the root list `events` of the sheet.
    pub fn generate(mut self, events: &[EventId]) -> CodegenResult<GeneratedCode> {
        check_tree(self.arena, events)?;
        debug!(
            "generating {} root events of \"{}\" for the {:?} backend",
            events.len(),
            self.sheet,
            self.backend.kind()
        );
        let root = CodegenContext::root();
        let events_code = self.generate_events_list(events, &root);
        let generated = GeneratedCode {
            events_code,
            global_declarations: self.global_declarations,
            code_outside_main: self.code_outside_main,
            include_files: self.include_files,
            diagnostics: self.diagnostics,
            profiling_table: self.profiling_table,
            max_depth: root.max_depth(),
            max_custom_condition_depth: self.max_custom_condition_depth,
            max_conditions_list_size: self.max_conditions_list_size,
        };
        debug!(
            "generated \"{}\": depth {}, {} diagnostics",
            self.sheet, generated.max_depth, generated.diagnostics.total_errors
        );
        Ok(generated)
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Events lists
    // ══════════════════════════════════════════════════════════════════════════

    /// Code of a list of events, each in its own scope.
    ///
    /// The last event reuses `parent`'s depth when `parent` allows it.
    pub fn generate_events_list(&mut self, events: &[EventId], parent: &CodegenContext<'_>) -> String {
        let arena = self.arena;
        let mut out = String::new();
        for (index, &id) in events.iter().enumerate() {
            let Some(event) = arena.get(id) else {
                warn!("event {id} is not in the arena, skipped");
                continue;
            };
            let timed = events.get(index + 1).copied().filter(|next| {
                !matches!(
                    arena.get(*next).map(|e| &e.kind),
                    Some(EventKind::Profile { .. })
                )
            });
            let is_last = index + 1 == events.len();
            let mut ctx = if is_last && parent.can_reuse() {
                CodegenContext::reuse(parent)
            } else {
                CodegenContext::inherit(parent)
            };
            let core = self.generate_event(id, event, timed, &mut ctx);
            let declarations = self.generate_objects_declarations(&ctx);
            out.push_str("\n{\n");
            out.push_str(&declarations);
            out.push('\n');
            out.push_str(&core);
            out.push_str("\n}\n");
        }
        out
    }

    fn generate_event(
        &mut self,
        id: EventId,
        event: &'a Event,
        timed: Option<EventId>,
        ctx: &mut CodegenContext<'_>,
    ) -> String {
        let previous_event = self.current_event.replace(id);
        trace!("event {id} ({}) at depth {}", event.kind_name(), ctx.depth());
        let code = match &event.kind {
            EventKind::Standard {
                conditions,
                actions,
            } => self.generate_standard(conditions, actions, &event.sub_events, ctx),
            EventKind::While {
                while_conditions,
                conditions,
                actions,
            } => self.generate_while(while_conditions, conditions, actions, &event.sub_events, ctx),
            EventKind::Repeat {
                count,
                conditions,
                actions,
            } => self.generate_repeat(count, conditions, actions, &event.sub_events, ctx),
            EventKind::ForEach {
                object,
                conditions,
                actions,
            } => self.generate_for_each(object, conditions, actions, &event.sub_events, ctx),
            EventKind::Group { name } => self.generate_group(name, &event.sub_events, ctx),
            EventKind::Profile { previous } => self.generate_profile(id, *previous, timed),
            EventKind::Comment { .. } => String::new(),
            EventKind::Link { target, .. } => format!(
                "/* Link to \"{}\" should have been replaced by its events */\n",
                target.replace("*/", "* /")
            ),
        };
        self.current_event = previous_event;
        code
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Event kinds
    // ══════════════════════════════════════════════════════════════════════════

    fn generate_standard(
        &mut self,
        conditions: &[Instruction],
        actions: &[Instruction],
        sub_events: &[EventId],
        ctx: &mut CodegenContext<'_>,
    ) -> String {
        let mut out = self.generate_conditions_list(conditions, ctx);
        if let Some(predicate) = self.conditions_predicate(conditions.len(), ctx) {
            out.push_str(&format!("if ({predicate}) "));
        }
        let mut actions_ctx = CodegenContext::reuse(ctx);
        let actions_code = self.generate_actions_and_sub_events(actions, sub_events, &mut actions_ctx, true);
        let declarations = self.generate_objects_declarations(&actions_ctx);
        out.push_str("{\n");
        out.push_str(&declarations);
        out.push_str(&actions_code);
        out.push_str("}\n");
        out
    }

    fn generate_while(
        &mut self,
        while_conditions: &[Instruction],
        conditions: &[Instruction],
        actions: &[Instruction],
        sub_events: &[EventId],
        parent: &mut CodegenContext<'_>,
    ) -> String {
        if while_conditions.is_empty() && conditions.is_empty() && actions.is_empty() {
            return "\n// While event not generated to prevent an infinite loop.\n".to_string();
        }
        let mut ctx = CodegenContext::inherit(parent);
        ctx.forbid_reuse();
        let while_code = self.generate_conditions_list(while_conditions, &mut ctx);
        let while_predicate = self
            .conditions_predicate(while_conditions.len(), &ctx)
            .unwrap_or_else(|| "true".to_string());
        let conditions_code = self.generate_conditions_list(conditions, &mut ctx);
        let predicate = self
            .conditions_predicate(conditions.len(), &ctx)
            .unwrap_or_else(|| "true".to_string());
        let actions_code = self.generate_actions_and_sub_events(actions, &[], &mut ctx, false);
        let sub_events_code = self.generate_events_list(sub_events, &ctx);
        let declarations = self.generate_objects_declarations(&ctx);
        let stop = format!("stopDoWhile{}", ctx.depth());

        let mut out = self.backend.local_boolean(&stop);
        out.push_str("do {\n");
        out.push_str(&declarations);
        out.push_str(&while_code);
        out.push_str(&format!("if ({while_predicate}) {{\n"));
        out.push_str(&conditions_code);
        out.push_str(&format!("if ({predicate}) {{\n"));
        out.push_str(&actions_code);
        out.push_str("\n{ //Subevents: \n");
        out.push_str(&sub_events_code);
        out.push_str("} //Subevents end.\n}\n");
        out.push_str(&format!("}} else {stop} = true;\n}} while (!{stop});\n"));
        out
    }

    fn generate_repeat(
        &mut self,
        count: &Expression,
        conditions: &[Instruction],
        actions: &[Instruction],
        sub_events: &[EventId],
        parent: &mut CodegenContext<'_>,
    ) -> String {
        let count_code = self.generate_expression(count.as_str(), ExpressionKind::Math, parent);
        let mut ctx = CodegenContext::inherit(parent);
        ctx.forbid_reuse();
        let conditions_code = self.generate_conditions_list(conditions, &mut ctx);
        let predicate = self
            .conditions_predicate(conditions.len(), &ctx)
            .unwrap_or_else(|| "true".to_string());
        let actions_code = self.generate_actions_and_sub_events(actions, sub_events, &mut ctx, false);
        let declarations = self.generate_objects_declarations(&ctx);

        let mut out = self.backend.repeat_header(&count_code, ctx.depth());
        out.push_str(&declarations);
        out.push_str(&conditions_code);
        out.push_str(&format!("if ({predicate}) {{\n"));
        out.push_str(&actions_code);
        out.push_str("}\n}\n");
        out
    }

    /// One iteration per instance of `object` picked by the parent, with
    /// only that instance picked. Instances are snapshotted before the
    /// loop so the body may create or delete instances.
    fn generate_for_each(
        &mut self,
        object: &str,
        conditions: &[Instruction],
        actions: &[Instruction],
        sub_events: &[EventId],
        parent: &mut CodegenContext<'_>,
    ) -> String {
        let reals = self.scope.expand_object_name(object, parent.current_object());
        if reals.is_empty() {
            return String::new();
        }
        for real in &reals {
            parent.objects_list_needed(real);
        }
        let sources: Vec<String> = reals
            .iter()
            .map(|real| self.objects_list_name(real, parent))
            .collect();

        let mut ctx = CodegenContext::inherit(parent);
        ctx.forbid_reuse();
        for real in &reals {
            ctx.empty_objects_list_needed(real);
        }
        let targets: Vec<String> = reals
            .iter()
            .map(|real| self.objects_list_name(real, &ctx))
            .collect();
        let conditions_code = self.generate_conditions_list(conditions, &mut ctx);
        let predicate = self
            .conditions_predicate(conditions.len(), &ctx)
            .unwrap_or_else(|| "true".to_string());
        let actions_code = self.generate_actions_and_sub_events(actions, sub_events, &mut ctx, false);
        let declarations = self.generate_objects_declarations(&ctx);

        let mut out = self.backend.for_each_header(&sources, ctx.depth());
        out.push_str(&declarations);
        out.push_str(&self.backend.for_each_pick(&targets, ctx.depth()));
        out.push_str(&conditions_code);
        out.push_str(&format!("if ({predicate}) {{\n"));
        out.push_str(&actions_code);
        out.push_str("}\n}\n");
        out
    }

    fn generate_group(
        &mut self,
        name: &str,
        sub_events: &[EventId],
        ctx: &CodegenContext<'_>,
    ) -> String {
        if sub_events.is_empty() {
            return String::new();
        }
        let mut out = self.backend.profiler_section_begin(name);
        out.push_str("\n{ //Subevents\n");
        out.push_str(&self.generate_events_list(sub_events, ctx));
        out.push_str("} //End of subevents\n");
        out.push_str(&self.backend.profiler_section_end(name));
        out
    }

    fn generate_profile(
        &mut self,
        id: EventId,
        previous: Option<EventId>,
        timed: Option<EventId>,
    ) -> String {
        let index = self.profiling_table.len();
        self.profiling_table.push(timed);
        self.profile_indices.insert(id, index);
        let mut out = String::new();
        if let Some(previous) = previous {
            match self.profile_indices.get(&previous) {
                Some(&previous_index) => out.push_str(&self.backend.profiler_stop(previous_index)),
                None => warn!("profiling marker {id} follows unknown marker {previous}"),
            }
        }
        out.push_str(&self.backend.profiler_start(index));
        out
    }

    /// Actions, then the sub-events block.
    ///
    /// With `allow_async`, the first free asynchronous action ends the
    /// list: the remaining actions and the sub-events move into its
    /// continuation.
    pub(crate) fn generate_actions_and_sub_events(
        &mut self,
        actions: &[Instruction],
        sub_events: &[EventId],
        ctx: &mut CodegenContext<'_>,
        allow_async: bool,
    ) -> String {
        let mut out = String::new();
        for (index, action) in actions.iter().enumerate() {
            if allow_async {
                if let Some(metadata) = self.async_action(action) {
                    out.push_str(&self.generate_async_action(
                        action,
                        metadata,
                        &actions[index + 1..],
                        sub_events,
                        ctx,
                    ));
                    return out;
                }
            }
            out.push('{');
            out.push_str(&self.generate_action(action, ctx));
            out.push_str("}\n");
        }
        if !sub_events.is_empty() {
            out.push_str("\n{ //Subevents\n");
            out.push_str(&self.generate_events_list(sub_events, ctx));
            out.push_str("} //End of subevents\n");
        }
        out
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Object lists
    // ══════════════════════════════════════════════════════════════════════════

    /// Name of the list holding `object` in `ctx`.
    pub fn objects_list_name(&mut self, object: &str, ctx: &CodegenContext<'_>) -> String {
        let base = self.mangler.objects_list_name(object);
        self.backend.objects_list(&base, ctx.list_depth(object))
    }

    /// Declarations of every list `ctx` registered.
    pub fn generate_objects_declarations(&mut self, ctx: &CodegenContext<'_>) -> String {
        let mut out = String::new();
        for name in ctx.to_declare() {
            let list = self.objects_list_name(name, ctx);
            let code = if ctx.is_inheriting_from_async(name) {
                self.declare_from_async(name, &list)
            } else if !ctx.object_already_declared_by_parents(name) {
                self.backend.declare_from_scene(&list, name)
            } else {
                self.declare_from_parent(name, &list, ctx)
            };
            out.push_str(&code);
            out.push('\n');
        }
        for name in ctx.to_declare_without_picking() {
            if ctx.to_declare().contains(name) {
                continue;
            }
            let list = self.objects_list_name(name, ctx);
            let code = if ctx.is_inheriting_from_async(name) {
                self.declare_from_async(name, &list)
            } else if !ctx.object_already_declared_by_parents(name) {
                self.backend.declare_empty(&list)
            } else {
                self.declare_from_parent(name, &list, ctx)
            };
            out.push_str(&code);
            out.push('\n');
        }
        for name in ctx.to_declare_empty() {
            let list = self.objects_list_name(name, ctx);
            out.push_str(&self.backend.declare_empty(&list));
            out.push('\n');
        }
        out
    }

    fn declare_from_async(&mut self, name: &str, list: &str) -> String {
        if let Some(captures) = self.async_captures.last_mut() {
            captures.insert(name.to_string());
        }
        self.backend.declare_from_async(list, name)
    }

    fn declare_from_parent(&mut self, name: &str, list: &str, ctx: &CodegenContext<'_>) -> String {
        let Some(parent) = ctx.parent() else {
            warn!("list of \"{name}\" declared by parents of a root context");
            return self.backend.declare_from_scene(list, name);
        };
        if ctx.is_same_objects_list(name, parent) {
            return format!("/* Reuse {list} */");
        }
        let parent_list = self.objects_list_name(name, parent);
        self.backend.declare_copy(list, &parent_list)
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Diagnostics
    // ══════════════════════════════════════════════════════════════════════════

    fn location(&self) -> DiagnosticLocation {
        DiagnosticLocation {
            sheet: self.sheet.clone(),
            event: self.current_event,
            instruction: self.current_instruction.clone(),
        }
    }

    pub(crate) fn report(&mut self, code: ErrorCode, message: impl Into<String>) {
        let diagnostic = Diagnostic::new(code, message, self.location());
        self.diagnostics.push(diagnostic);
    }

    pub(crate) fn report_parse_error(&mut self, error: &ParseError, source: &str) {
        let diagnostic = Diagnostic::from_parse_error(error, source, self.location());
        self.diagnostics.push(diagnostic);
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }
}

/// Fail on ids missing from the arena and on trees too deep to walk.
///
/// Walks with an explicit stack, so cycles end at the depth limit instead
/// of exhausting the call stack.
pub fn check_tree(arena: &EventArena, roots: &[EventId]) -> CodegenResult<()> {
    let mut stack: Vec<(EventId, usize)> = roots.iter().map(|&id| (id, 1)).collect();
    while let Some((id, depth)) = stack.pop() {
        if depth > MAX_EVENT_DEPTH {
            return Err(CodegenError::TooDeep {
                event: id,
                limit: MAX_EVENT_DEPTH,
            });
        }
        let event = arena.get(id).ok_or(CodegenError::MissingEvent(id))?;
        stack.extend(event.sub_events.iter().map(|&sub| (sub, depth + 1)));
    }
    Ok(())
}
