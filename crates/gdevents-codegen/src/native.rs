//! Native backend: C++ code for the native game runtime.
//!
//! Object lists are `std::vector<RuntimeObject*>` locals of each generated
//! scope; condition booleans and the merge lists of `Or` conditions are
//! file-level globals.

use std::fmt::Write;

use crate::backend::{for_each_branches, Backend, BackendKind, CodeFile};

const LIST_TYPE: &str = "std::vector<RuntimeObject*>";

#[derive(Debug, Clone)]
pub struct NativeBackend {
    mangled_sheet: String,
}

impl NativeBackend {
    pub fn new(mangled_sheet: &str) -> Self {
        Self {
            mangled_sheet: mangled_sheet.to_string(),
        }
    }
}

impl Backend for NativeBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Native
    }

    fn objects_list(&self, base: &str, depth: usize) -> String {
        format!("{base}{depth}")
    }

    fn final_objects_list(&self, base: &str, depth: usize, custom_depth: usize) -> String {
        format!("{base}{depth}_{custom_depth}final")
    }

    fn condition_boolean(&self, index: usize, custom_depth: usize) -> String {
        format!("condition{index}IsTrue_{custom_depth}")
    }

    fn async_callback_name(&self, n: usize) -> String {
        format!("GDAsyncCallback{}_{n}", self.mangled_sheet)
    }

    fn text_literal(&self, text: &str) -> String {
        format!("std::string({})", self.quote(text))
    }

    fn null_instance(&self) -> &'static str {
        "NULL"
    }

    fn current_scene(&self) -> &'static str {
        "*runtimeContext->scene"
    }

    fn read_boolean(&self, boolean: &str) -> String {
        boolean.to_string()
    }

    fn set_boolean(&self, boolean: &str, value: &str) -> String {
        format!("{boolean} = {value};\n")
    }

    fn local_boolean(&self, name: &str) -> String {
        format!("bool {name} = false;\n")
    }

    fn declare_from_scene(&self, list: &str, object: &str) -> String {
        format!(
            "{LIST_TYPE} {list} = runtimeContext->GetObjectsRawPointers({});",
            self.quote(object)
        )
    }

    fn declare_copy(&self, list: &str, parent_list: &str) -> String {
        // The temporary allows `list` to shadow a list of the same name.
        format!("{LIST_TYPE} & {list}T = {parent_list};\n{LIST_TYPE} {list} = {list}T;")
    }

    fn declare_empty(&self, list: &str) -> String {
        format!("{LIST_TYPE} {list};")
    }

    fn declare_from_async(&self, list: &str, object: &str) -> String {
        format!(
            "{LIST_TYPE} {list} = asyncObjectsList.GetObjects({});",
            self.quote(object)
        )
    }

    fn global_list(&self, list: &str) -> String {
        format!("{LIST_TYPE} {list};")
    }

    fn clear_list(&self, list: &str) -> String {
        format!("{list}.clear();\n")
    }

    fn copy_list(&self, from: &str, to: &str) -> String {
        format!("{to} = {from};\n")
    }

    fn merge_unique(&self, from: &str, into: &str) -> String {
        format!(
            "for (std::size_t j = 0;j < {from}.size();++j) {{\n\
             if ( std::find({into}.begin(), {into}.end(), {from}[j]) == {into}.end() )\n\
             {into}.push_back({from}[j]);\n\
             }}\n"
        )
    }

    fn objects_map(&self, entries: &[(String, String)]) -> String {
        let mut out = String::from("runtimeContext->ClearObjectListsMap()");
        for (object, list) in entries {
            let _ = write!(out, ".AddObjectListToMap({}, {list})", self.quote(object));
        }
        out.push_str(".ReturnObjectListsMap()");
        out
    }

    fn member(&self, instance: &str, function: &str) -> String {
        format!("{instance}->{function}")
    }

    fn behavior_member(&self, instance: &str, behavior: &str, function: &str) -> String {
        format!(
            "{instance}->GetBehaviorRawPointer({})->{function}",
            self.quote(behavior)
        )
    }

    fn first_instance_or(&self, list: &str, call_on_first: &str, default: &str) -> String {
        format!("(( {list}.empty() ) ? {default} : {call_on_first})")
    }

    fn first_instance_ptr_or(&self, list: &str, default: &str) -> String {
        format!("(!{list}.empty() ? {list}[0] : {default})")
    }

    fn object_condition(&self, list: &str, predicate: &str, boolean: &str) -> String {
        format!(
            "for (std::size_t i = 0, k = 0, l = {list}.size();i<l;++i) {{\n\
             if ( {predicate} ) {{\n\
             {boolean} = true;\n\
             {list}[k] = {list}[i];\n\
             ++k;\n\
             }}\n\
             if (i == l - 1) {list}.resize(k);\n\
             }}\n"
        )
    }

    fn object_action(&self, list: &str, call: &str) -> String {
        format!("for (std::size_t i = 0;i < {list}.size();++i) {{\n{call};\n}}\n")
    }

    fn scene_variables(&self) -> String {
        "runtimeContext->GetSceneVariables()".to_string()
    }

    fn global_variables(&self) -> String {
        "runtimeContext->GetGameVariables()".to_string()
    }

    fn object_variables(&self, instance: &str) -> String {
        format!("{instance}->GetVariables()")
    }

    fn bad_variables_container(&self) -> &'static str {
        "RuntimeVariablesContainer::GetBadVariablesContainer()"
    }

    fn bad_variable(&self) -> &'static str {
        "RuntimeVariablesContainer::GetBadVariable()"
    }

    fn variable_get(&self, container: &str, name: &str) -> String {
        format!("{container}.Get({name})")
    }

    fn variable_child(&self, variable: &str, name: &str) -> String {
        format!("{variable}.GetChild({name})")
    }

    fn repeat_header(&self, count: &str, depth: usize) -> String {
        format!(
            "const int repeatCount{depth} = {count};\n\
             for (int repeatIndex{depth} = 0;repeatIndex{depth} < repeatCount{depth};++repeatIndex{depth}) {{\n"
        )
    }

    fn for_each_header(&self, sources: &[String], depth: usize) -> String {
        let snapshot = format!("forEachObjects{depth}");
        let mut out = format!("{LIST_TYPE} {snapshot};\n");
        for source in sources {
            let _ = writeln!(out, "{snapshot}.insert({snapshot}.end(), {source}.begin(), {source}.end());");
        }
        if sources.len() > 1 {
            for (index, source) in sources.iter().enumerate() {
                let _ = writeln!(out, "const std::size_t forEachCount{index}_{depth} = {source}.size();");
            }
        }
        let _ = writeln!(
            out,
            "for (std::size_t forEachIndex{depth} = 0;forEachIndex{depth} < {snapshot}.size();++forEachIndex{depth}) {{"
        );
        out
    }

    fn for_each_pick(&self, targets: &[String], depth: usize) -> String {
        for_each_branches(targets, depth, |list, instance| format!("{list}.push_back({instance});\n"))
    }

    fn profiler_start(&self, index: usize) -> String {
        format!(
            "if (runtimeContext->GetProfiler()) {{ runtimeContext->GetProfiler()->StartEventTimer({index}); }}\n"
        )
    }

    fn profiler_stop(&self, index: usize) -> String {
        format!(
            "if (runtimeContext->GetProfiler()) {{ runtimeContext->GetProfiler()->StopEventTimer({index}); }}\n"
        )
    }

    fn profiler_section_begin(&self, name: &str) -> String {
        format!(
            "if (runtimeContext->GetProfiler()) {{ runtimeContext->GetProfiler()->Begin({}); }}\n",
            self.quote(name)
        )
    }

    fn profiler_section_end(&self, name: &str) -> String {
        format!(
            "if (runtimeContext->GetProfiler()) {{ runtimeContext->GetProfiler()->End({}); }}\n",
            self.quote(name)
        )
    }

    fn async_callback(&self, name: &str, body: &str) -> String {
        format!(
            "void {name}(RuntimeContext * runtimeContext, LongLivedObjectsList & asyncObjectsList)\n{{\n{body}}}\n"
        )
    }

    fn async_task(&self, call: &str, captures: &[(String, String)], callback: &str) -> String {
        let mut out = String::from("{\nLongLivedObjectsList asyncObjectsList;\n");
        for (object, list) in captures {
            let _ = writeln!(out, "asyncObjectsList.AddObjects({}, {list});", self.quote(object));
        }
        let _ = write!(
            out,
            "runtimeContext->GetAsyncTasksManager().AddTask({call}, [asyncObjectsList](RuntimeContext * runtimeContext) mutable {{ {callback}(runtimeContext, asyncObjectsList); }});\n}}\n"
        );
        out
    }

    fn complete_file(&self, file: &CodeFile<'_>) -> String {
        let generated = file.generated;
        let mut out = String::from(
            "#include <algorithm>\n#include <string>\n#include <vector>\n\
             #include \"GDCpp/Runtime/RuntimeContext.h\"\n\
             #include \"GDCpp/Runtime/RuntimeObject.h\"\n",
        );
        for include in &generated.include_files {
            let _ = writeln!(out, "#include \"{include}\"");
        }
        out.push('\n');
        for declaration in &generated.global_declarations {
            out.push_str(declaration);
            out.push('\n');
        }
        for custom_depth in 0..=generated.max_custom_condition_depth {
            for index in 0..=generated.max_conditions_list_size {
                let _ = writeln!(
                    out,
                    "bool {} = false;",
                    self.condition_boolean(index, custom_depth)
                );
            }
        }
        out.push('\n');
        out.push_str(&generated.code_outside_main);
        let _ = write!(
            out,
            "\nextern \"C\" int {}(RuntimeContext * runtimeContext)\n{{\nruntimeContext->StartNewFrame();\n",
            file.function_name
        );
        out.push_str(&generated.events_code);
        out.push_str("\nreturn 0;\n}\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::GeneratedCode;

    #[test]
    fn test_lists_are_locals() {
        let b = NativeBackend::new("L");
        let list = b.objects_list("GDPlayerObjects", 1);
        assert_eq!(list, "GDPlayerObjects1");
        assert_eq!(
            b.declare_from_scene(&list, "Player"),
            "std::vector<RuntimeObject*> GDPlayerObjects1 = runtimeContext->GetObjectsRawPointers(\"Player\");"
        );
    }

    #[test]
    fn test_text_literal_is_std_string() {
        let b = NativeBackend::new("L");
        assert_eq!(b.text_literal("a\"b"), "std::string(\"a\\\"b\")");
    }

    #[test]
    fn test_complete_file() {
        let b = NativeBackend::new("Level_32_1");
        let mut generated = GeneratedCode {
            events_code: "/* events */".into(),
            ..GeneratedCode::default()
        };
        generated.include_files.insert("Extensions/Timer.h".into());
        let code = b.complete_file(&CodeFile {
            function_name: "GDSceneEventsLevel_32_1",
            objects_lists: &[],
            generated: &generated,
        });
        assert!(code.contains("#include \"Extensions/Timer.h\""));
        assert!(code.contains("bool condition0IsTrue_0 = false;"));
        assert!(code.contains("extern \"C\" int GDSceneEventsLevel_32_1(RuntimeContext * runtimeContext)"));
        assert!(code.contains("/* events */"));
    }
}
