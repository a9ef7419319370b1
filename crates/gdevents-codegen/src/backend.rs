//! Target-language seam.
//!
//! The generator decides *what* code to emit; a [`Backend`] decides how
//! each construct is spelled. Two implementations exist: [`ScriptBackend`]
//! for the script runtime and [`NativeBackend`] for the native one.

use std::collections::BTreeSet;

use gdevents_types::EventId;
use serde::{Deserialize, Serialize};

use crate::native::NativeBackend;
use crate::script::ScriptBackend;

/// Which backend to generate code for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BackendKind {
    Native,
    #[default]
    Script,
}

impl BackendKind {
    /// Backend for a sheet whose mangled name is `mangled_sheet`.
    pub fn backend(self, mangled_sheet: &str) -> Box<dyn Backend> {
        match self {
            Self::Native => Box::new(NativeBackend::new(mangled_sheet)),
            Self::Script => Box::new(ScriptBackend::new(mangled_sheet)),
        }
    }
}

/// Everything the generator produced for one sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedCode {
    /// Statements of the root events list.
    pub events_code: String,
    /// Declarations placed before everything else, deduplicated.
    pub global_declarations: BTreeSet<String>,
    /// Functions placed outside the entry point (async callbacks).
    pub code_outside_main: String,
    pub include_files: BTreeSet<String>,
    pub diagnostics: gdevents_types::Diagnostics,
    /// Event timed by each profiling marker, by marker index.
    pub profiling_table: Vec<Option<EventId>>,
    pub max_depth: usize,
    pub max_custom_condition_depth: usize,
    pub max_conditions_list_size: usize,
}

/// Input of [`Backend::complete_file`].
#[derive(Debug, Clone, Copy)]
pub struct CodeFile<'a> {
    /// Name of the entry-point function.
    pub function_name: &'a str,
    /// Base list names (`GD<Object>Objects`) of every object in scope.
    pub objects_lists: &'a [String],
    pub generated: &'a GeneratedCode,
}

/// Spelling of every construct the generator emits.
///
/// `list` arguments are complete list variable names as returned by
/// [`objects_list`](Backend::objects_list); `boolean` arguments are
/// complete condition boolean names.
pub trait Backend {
    fn kind(&self) -> BackendKind;

    // ── Names ─────────────────────────────────────────────────────────────────

    /// Variable holding the picked instances of an object at `depth`.
    /// `base` is the mangled `GD<Object>Objects` name.
    fn objects_list(&self, base: &str, depth: usize) -> String;

    /// Merge target of an `Or` condition.
    fn final_objects_list(&self, base: &str, depth: usize, custom_depth: usize) -> String;

    /// Boolean holding the result of condition `index` of a list.
    fn condition_boolean(&self, index: usize, custom_depth: usize) -> String;

    /// Name of the `n`-th async callback of the sheet.
    fn async_callback_name(&self, n: usize) -> String;

    // ── Literals and values ───────────────────────────────────────────────────

    /// Double-quoted literal with `\\ \r \n "` escaped.
    fn quote(&self, text: &str) -> String {
        format!("\"{}\"", escape(text))
    }

    /// Text value usable in string expressions.
    fn text_literal(&self, text: &str) -> String {
        self.quote(text)
    }

    fn null_instance(&self) -> &'static str;

    /// Handle on the running scene passed to functions.
    fn current_scene(&self) -> &'static str;

    fn read_boolean(&self, boolean: &str) -> String;

    /// Statement assigning `value` to a condition boolean.
    fn set_boolean(&self, boolean: &str, value: &str) -> String;

    /// Statement declaring a local boolean set to false.
    fn local_boolean(&self, name: &str) -> String;

    // ── Object lists ──────────────────────────────────────────────────────────

    fn declare_from_scene(&self, list: &str, object: &str) -> String;
    fn declare_copy(&self, list: &str, parent_list: &str) -> String;
    fn declare_empty(&self, list: &str) -> String;
    fn declare_from_async(&self, list: &str, object: &str) -> String;

    /// Declaration of a list living for the whole file.
    fn global_list(&self, list: &str) -> String;
    fn clear_list(&self, list: &str) -> String;
    fn copy_list(&self, from: &str, to: &str) -> String;
    /// Append instances of `from` missing from `into`.
    fn merge_unique(&self, from: &str, into: &str) -> String;

    /// Objects-map expression registering `(object, list)` pairs.
    fn objects_map(&self, entries: &[(String, String)]) -> String;

    // ── Instances ─────────────────────────────────────────────────────────────

    /// `list[index]`
    fn instance(&self, list: &str, index: &str) -> String {
        format!("{list}[{index}]")
    }

    /// Member function `function` of `instance`, without the call.
    fn member(&self, instance: &str, function: &str) -> String;

    /// Member function `function` of a behavior of `instance`.
    fn behavior_member(&self, instance: &str, behavior: &str, function: &str) -> String;

    /// `call_on_first` when `list` is not empty, else `default`.
    fn first_instance_or(&self, list: &str, call_on_first: &str, default: &str) -> String;

    /// First instance of `list`, or `default` when it is empty.
    fn first_instance_ptr_or(&self, list: &str, default: &str) -> String;

    /// Keep the instances of `list` matching `predicate` (which reads the
    /// instance as `list[i]`), setting `boolean` if any does.
    fn object_condition(&self, list: &str, predicate: &str, boolean: &str) -> String;

    /// Run `call` (reading the instance as `list[i]`) on every instance.
    fn object_action(&self, list: &str, call: &str) -> String;

    // ── Variables ─────────────────────────────────────────────────────────────

    fn scene_variables(&self) -> String;
    fn global_variables(&self) -> String;
    fn object_variables(&self, instance: &str) -> String;
    fn bad_variables_container(&self) -> &'static str;
    fn bad_variable(&self) -> &'static str;
    fn variable_get(&self, container: &str, name: &str) -> String;
    fn variable_child(&self, variable: &str, name: &str) -> String;

    // ── Control flow ──────────────────────────────────────────────────────────

    /// Opening of a loop running `count` times, evaluated once.
    fn repeat_header(&self, count: &str, depth: usize) -> String;

    /// Snapshot of the instances of every list of `sources`, in order,
    /// then the opening of a loop over that snapshot.
    fn for_each_header(&self, sources: &[String], depth: usize) -> String;

    /// Push the current snapshot instance into the list of `targets`
    /// matching the source it came from.
    fn for_each_pick(&self, targets: &[String], depth: usize) -> String;

    // ── Profiling ─────────────────────────────────────────────────────────────

    fn profiler_start(&self, index: usize) -> String;
    fn profiler_stop(&self, index: usize) -> String;
    fn profiler_section_begin(&self, name: &str) -> String;
    fn profiler_section_end(&self, name: &str) -> String;

    // ── Async ─────────────────────────────────────────────────────────────────

    /// Definition of a continuation function.
    fn async_callback(&self, name: &str, body: &str) -> String;

    /// Registration of `call` as a task resumed by `callback`, capturing
    /// the `(object, list)` pairs.
    fn async_task(&self, call: &str, captures: &[(String, String)], callback: &str) -> String;

    // ── File ──────────────────────────────────────────────────────────────────

    fn complete_file(&self, file: &CodeFile<'_>) -> String;
}

/// Escape `\\ \r \n "` for a double-quoted literal.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            '"' => out.push_str("\\\""),
            c => out.push(c),
        }
    }
    out
}

/// Pick code for a for-each loop: `push(target, instance)` into the
/// only target, or into the target whose source range holds the index.
pub(crate) fn for_each_branches(
    targets: &[String],
    depth: usize,
    push: impl Fn(&str, &str) -> String,
) -> String {
    let instance = format!("forEachObjects{depth}[forEachIndex{depth}]");
    if let [target] = targets {
        return push(target, &instance);
    }
    let mut out = String::new();
    let mut bound = String::new();
    for (index, target) in targets.iter().enumerate() {
        if index != 0 {
            bound.push('+');
            out.push_str("else ");
        }
        bound.push_str(&format!("forEachCount{index}_{depth}"));
        out.push_str(&format!(
            "if (forEachIndex{depth} < {bound}) {{\n    {}}}\n",
            push(target, &instance)
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(escape("a\"b\\c\nd\re"), "a\\\"b\\\\c\\nd\\re");
    }

    #[test]
    fn test_backend_kind_json() {
        assert_eq!(serde_json::to_string(&BackendKind::Native).unwrap(), "\"native\"");
        let kind: BackendKind = serde_json::from_str("\"script\"").unwrap();
        assert_eq!(kind, BackendKind::Script);
        assert_eq!(BackendKind::default(), BackendKind::Script);
    }

    #[test]
    fn test_for_each_branches_split_by_source() {
        let push = |list: &str, instance: &str| format!("{list}.push({instance});\n");
        assert_eq!(
            for_each_branches(&["A2".to_string()], 2, push),
            "A2.push(forEachObjects2[forEachIndex2]);\n"
        );
        let code = for_each_branches(&["A2".to_string(), "B2".to_string()], 2, push);
        assert!(code.starts_with("if (forEachIndex2 < forEachCount0_2) {"));
        assert!(code.contains("else if (forEachIndex2 < forEachCount0_2+forEachCount1_2) {"));
        assert!(code.contains("    B2.push(forEachObjects2[forEachIndex2]);"));
    }

    #[test]
    fn test_kind_selects_backend() {
        assert_eq!(BackendKind::Native.backend("L").kind(), BackendKind::Native);
        assert_eq!(BackendKind::Script.backend("L").kind(), BackendKind::Script);
    }
}
