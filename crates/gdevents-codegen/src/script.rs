//! Script backend: code for the JavaScript game runtime.
//!
//! Everything generated for a sheet lives in the `gdjs.<Sheet>Code`
//! namespace object. Object lists and condition booleans are namespace
//! members reused across frames, booleans being `{val: bool}` cells.

use std::fmt::Write;

use crate::backend::{for_each_branches, Backend, BackendKind, CodeFile};

#[derive(Debug, Clone)]
pub struct ScriptBackend {
    namespace: String,
}

impl ScriptBackend {
    pub fn new(mangled_sheet: &str) -> Self {
        Self {
            namespace: format!("gdjs.{mangled_sheet}Code"),
        }
    }

    /// `gdjs.<Sheet>Code`
    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

impl Backend for ScriptBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Script
    }

    fn objects_list(&self, base: &str, depth: usize) -> String {
        format!("{}.{base}{depth}", self.namespace)
    }

    fn final_objects_list(&self, base: &str, depth: usize, custom_depth: usize) -> String {
        format!("{}.{base}{depth}_{custom_depth}final", self.namespace)
    }

    fn condition_boolean(&self, index: usize, custom_depth: usize) -> String {
        format!("{}.condition{index}IsTrue_{custom_depth}", self.namespace)
    }

    fn async_callback_name(&self, n: usize) -> String {
        format!("{}.asyncCallback{n}", self.namespace)
    }

    fn null_instance(&self) -> &'static str {
        "null"
    }

    fn current_scene(&self) -> &'static str {
        "runtimeScene"
    }

    fn read_boolean(&self, boolean: &str) -> String {
        format!("{boolean}.val")
    }

    fn set_boolean(&self, boolean: &str, value: &str) -> String {
        format!("{boolean}.val = {value};\n")
    }

    fn local_boolean(&self, name: &str) -> String {
        format!("let {name} = false;\n")
    }

    fn declare_from_scene(&self, list: &str, object: &str) -> String {
        format!(
            "gdjs.copyArray(runtimeScene.getObjects({}), {list});",
            self.quote(object)
        )
    }

    fn declare_copy(&self, list: &str, parent_list: &str) -> String {
        format!("gdjs.copyArray({parent_list}, {list});")
    }

    fn declare_empty(&self, list: &str) -> String {
        format!("{list}.length = 0;")
    }

    fn declare_from_async(&self, list: &str, object: &str) -> String {
        format!(
            "gdjs.copyArray(asyncObjectsList.getObjects({}), {list});",
            self.quote(object)
        )
    }

    fn global_list(&self, list: &str) -> String {
        format!("{list} = [];")
    }

    fn clear_list(&self, list: &str) -> String {
        format!("{list}.length = 0;\n")
    }

    fn copy_list(&self, from: &str, to: &str) -> String {
        format!("gdjs.copyArray({from}, {to});\n")
    }

    fn merge_unique(&self, from: &str, into: &str) -> String {
        format!(
            "for (let j = 0, jLen = {from}.length; j < jLen ; ++j) {{\n\
             if ( {into}.indexOf({from}[j]) === -1 )\n\
             {into}.push({from}[j]);\n\
             }}\n"
        )
    }

    fn objects_map(&self, entries: &[(String, String)]) -> String {
        let fields: Vec<String> = entries
            .iter()
            .map(|(object, list)| format!("{}: {list}", self.quote(object)))
            .collect();
        format!("Hashtable.newFrom({{{}}})", fields.join(", "))
    }

    fn member(&self, instance: &str, function: &str) -> String {
        format!("{instance}.{function}")
    }

    fn behavior_member(&self, instance: &str, behavior: &str, function: &str) -> String {
        format!("{instance}.getBehavior({}).{function}", self.quote(behavior))
    }

    fn first_instance_or(&self, list: &str, call_on_first: &str, default: &str) -> String {
        format!("(( {list}.length === 0 ) ? {default} : {call_on_first})")
    }

    fn first_instance_ptr_or(&self, list: &str, default: &str) -> String {
        format!("({list}.length !== 0 ? {list}[0] : {default})")
    }

    fn object_condition(&self, list: &str, predicate: &str, boolean: &str) -> String {
        format!(
            "for (let i = 0, k = 0, l = {list}.length;i<l;++i) {{\n\
             if ( {predicate} ) {{\n\
             {boolean}.val = true;\n\
             {list}[k] = {list}[i];\n\
             ++k;\n\
             }}\n\
             }}\n\
             {list}.length = k;\n"
        )
    }

    fn object_action(&self, list: &str, call: &str) -> String {
        format!("for (let i = 0, len = {list}.length ;i < len;++i) {{\n{call};\n}}\n")
    }

    fn scene_variables(&self) -> String {
        "runtimeScene.getVariables()".to_string()
    }

    fn global_variables(&self) -> String {
        "runtimeScene.getGame().getVariables()".to_string()
    }

    fn object_variables(&self, instance: &str) -> String {
        format!("{instance}.getVariables()")
    }

    fn bad_variables_container(&self) -> &'static str {
        "gdjs.VariablesContainer.badVariablesContainer"
    }

    fn bad_variable(&self) -> &'static str {
        "gdjs.VariablesContainer.badVariable"
    }

    fn variable_get(&self, container: &str, name: &str) -> String {
        format!("{container}.get({name})")
    }

    fn variable_child(&self, variable: &str, name: &str) -> String {
        format!("{variable}.getChild({name})")
    }

    fn repeat_header(&self, count: &str, depth: usize) -> String {
        format!(
            "const repeatCount{depth} = {count};\n\
             for (let repeatIndex{depth} = 0;repeatIndex{depth} < repeatCount{depth};++repeatIndex{depth}) {{\n"
        )
    }

    fn for_each_header(&self, sources: &[String], depth: usize) -> String {
        let mut out = format!("const forEachObjects{depth} = [].concat({});\n", sources.join(", "));
        if sources.len() > 1 {
            for (index, source) in sources.iter().enumerate() {
                let _ = writeln!(out, "const forEachCount{index}_{depth} = {source}.length;");
            }
        }
        let _ = writeln!(
            out,
            "for (let forEachIndex{depth} = 0;forEachIndex{depth} < forEachObjects{depth}.length;++forEachIndex{depth}) {{"
        );
        out
    }

    fn for_each_pick(&self, targets: &[String], depth: usize) -> String {
        for_each_branches(targets, depth, |list, instance| format!("{list}.push({instance});\n"))
    }

    fn profiler_start(&self, index: usize) -> String {
        format!(
            "if (runtimeScene.getProfiler()) {{ runtimeScene.getProfiler().startEventTimer({index}); }}\n"
        )
    }

    fn profiler_stop(&self, index: usize) -> String {
        format!(
            "if (runtimeScene.getProfiler()) {{ runtimeScene.getProfiler().stopEventTimer({index}); }}\n"
        )
    }

    fn profiler_section_begin(&self, name: &str) -> String {
        format!(
            "if (runtimeScene.getProfiler()) {{ runtimeScene.getProfiler().begin({}); }}\n",
            self.quote(name)
        )
    }

    fn profiler_section_end(&self, name: &str) -> String {
        format!(
            "if (runtimeScene.getProfiler()) {{ runtimeScene.getProfiler().end({}); }}\n",
            self.quote(name)
        )
    }

    fn async_callback(&self, name: &str, body: &str) -> String {
        format!("{name} = function (runtimeScene, asyncObjectsList) {{\n{body}}}\n")
    }

    fn async_task(&self, call: &str, captures: &[(String, String)], callback: &str) -> String {
        let mut out = String::from("{\nconst asyncObjectsList = new gdjs.LongLivedObjectsList();\n");
        for (object, list) in captures {
            let _ = writeln!(
                out,
                "for (const obj of {list}) asyncObjectsList.addObject({}, obj);",
                self.quote(object)
            );
        }
        let _ = write!(
            out,
            "runtimeScene.getAsyncTasksManager().addTask({call}, (runtimeScene) => ({callback}(runtimeScene, asyncObjectsList)));\n}}\n"
        );
        out
    }

    fn complete_file(&self, file: &CodeFile<'_>) -> String {
        let ns = &self.namespace;
        let generated = file.generated;
        let mut out = format!("{ns} = {{}};\n");
        for declaration in &generated.global_declarations {
            out.push_str(declaration);
            out.push('\n');
        }
        for base in file.objects_lists {
            for depth in 1..=generated.max_depth {
                let _ = writeln!(out, "{}= [];", self.objects_list(base, depth));
            }
        }
        for custom_depth in 0..=generated.max_custom_condition_depth {
            for index in 0..=generated.max_conditions_list_size {
                let _ = writeln!(
                    out,
                    "{} = {{val:false}};",
                    self.condition_boolean(index, custom_depth)
                );
            }
        }
        out.push('\n');
        out.push_str(&generated.code_outside_main);
        let _ = writeln!(out, "{ns}.{} = function(runtimeScene) {{", file.function_name);
        for base in file.objects_lists {
            for depth in 1..=generated.max_depth {
                let _ = writeln!(out, "{}.length = 0;", self.objects_list(base, depth));
            }
        }
        out.push_str(&generated.events_code);
        out.push_str("\nreturn;\n}\n");
        let _ = writeln!(out, "\ngdjs['{}']= {ns};", &ns["gdjs.".len()..]);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::GeneratedCode;

    #[test]
    fn test_names() {
        let b = ScriptBackend::new("Level1");
        assert_eq!(b.objects_list("GDPlayerObjects", 2), "gdjs.Level1Code.GDPlayerObjects2");
        assert_eq!(
            b.final_objects_list("GDPlayerObjects", 1, 1),
            "gdjs.Level1Code.GDPlayerObjects1_1final"
        );
        assert_eq!(b.condition_boolean(0, 1), "gdjs.Level1Code.condition0IsTrue_1");
        assert_eq!(b.async_callback_name(3), "gdjs.Level1Code.asyncCallback3");
    }

    #[test]
    fn test_objects_map() {
        let b = ScriptBackend::new("L");
        let map = b.objects_map(&[("Player".into(), "gdjs.LCode.GDPlayerObjects1".into())]);
        assert_eq!(map, "Hashtable.newFrom({\"Player\": gdjs.LCode.GDPlayerObjects1})");
    }

    #[test]
    fn test_complete_file_layout() {
        let b = ScriptBackend::new("L");
        let generated = GeneratedCode {
            events_code: "/* events */".into(),
            max_depth: 2,
            ..GeneratedCode::default()
        };
        let lists = vec!["GDCoinObjects".to_string()];
        let code = b.complete_file(&CodeFile {
            function_name: "func",
            objects_lists: &lists,
            generated: &generated,
        });
        assert!(code.starts_with("gdjs.LCode = {};\n"));
        assert!(code.contains("gdjs.LCode.GDCoinObjects1= [];"));
        assert!(code.contains("gdjs.LCode.GDCoinObjects2= [];"));
        assert!(!code.contains("GDCoinObjects3"));
        assert!(code.contains("gdjs.LCode.condition0IsTrue_0 = {val:false};"));
        assert!(code.contains("gdjs.LCode.func = function(runtimeScene) {"));
        assert!(code.contains("gdjs.LCode.GDCoinObjects2.length = 0;"));
        assert!(code.trim_end().ends_with("gdjs['LCode']= gdjs.LCode;"));
    }
}
