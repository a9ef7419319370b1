//! Events compiler as a WASM module for browser-based editors.
//!
//! This crate exposes the compilation entry points via `wasm-bindgen`,
//! suitable for running in a browser Web Worker.
//!
//! # Usage (JavaScript)
//!
//! ```js
//! import init, { compile } from 'gdevents-wasm';
//!
//! await init();
//!
//! const result = compile(JSON.stringify(project), JSON.stringify(registry), "Level", "");
//! console.log(JSON.parse(result));
//! // { success: true, code: "gdjs.LevelCode = {};...", codeHash: "…", diagnostics: { … }, … }
//! ```

use gdevents_compiler::CompileResult;
use gdevents_types::ErrorCode;
use wasm_bindgen::prelude::*;

fn to_json(result: &CompileResult) -> String {
    serde_json::to_string(result).unwrap_or_else(|e| {
        format!(
            r#"{{"success":false,"code":null,"codeHash":null,"diagnostics":{{"errors":[],"totalErrors":0}},"profilingTable":[],"includeFiles":[],"error":"Serialization error: {}"}}"#,
            e
        )
    })
}

/// Compile a layout of a JSON project.
///
/// Returns a JSON string containing a `CompileResult`:
/// ```json
/// {
///   "success": true,
///   "code": "gdjs.LevelCode = {};\n...",
///   "codeHash": "9f86d0…",
///   "diagnostics": { "errors": [], "totalErrors": 0 },
///   "profilingTable": [],
///   "includeFiles": [],
///   "error": null
/// }
/// ```
///
/// `options` is a JSON `CompileOptions` (`{"backend":"script","profiling":false}`)
/// or an empty string for the defaults. Malformed input sets `error`.
#[wasm_bindgen]
pub fn compile(project: &str, registry: &str, layout: &str, options: &str) -> String {
    to_json(&gdevents_compiler::compile_to_result(
        project, registry, layout, options,
    ))
}

/// Compile external events of a JSON project against their associated
/// layout. Same result shape as [`compile`].
#[wasm_bindgen]
pub fn compile_external_events(
    project: &str,
    registry: &str,
    name: &str,
    options: &str,
) -> String {
    to_json(&gdevents_compiler::compile_external_events_to_result(
        project, registry, name, options,
    ))
}

/// Like [`compile`], returning a JavaScript object instead of JSON text.
#[wasm_bindgen]
pub fn compile_value(
    project: &str,
    registry: &str,
    layout: &str,
    options: &str,
) -> Result<JsValue, JsValue> {
    let result = gdevents_compiler::compile_to_result(project, registry, layout, options);
    serde_wasm_bindgen::to_value(&result).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Category name of a diagnostic code (`Syntax`, `UnresolvedReference`,
/// `Arity`), for editors grouping diagnostics.
#[wasm_bindgen]
pub fn error_category(code: u16) -> String {
    ErrorCode(code).category().name().to_string()
}

/// Return the compiler version string.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROJECT: &str = r#"{
        "name": "Game",
        "layouts": [{ "name": "Level", "events": [0] }],
        "events": [{
            "type": "standard",
            "actions": [{ "type": "Log", "parameters": ["\"hi\""] }]
        }]
    }"#;

    const REGISTRY: &str = r#"{
        "actions": {
            "Log": {
                "functionName": "console.log",
                "parameters": [{ "type": "string" }]
            }
        }
    }"#;

    #[test]
    fn test_compile_returns_result_json() {
        let json = compile(PROJECT, REGISTRY, "Level", "");
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["success"], true);
        assert!(parsed["code"]
            .as_str()
            .unwrap()
            .contains("console.log(\"hi\");"));
    }

    #[test]
    fn test_compile_reports_malformed_input() {
        let json = compile("[]", REGISTRY, "Level", "");
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["success"], false);
        assert!(parsed["error"].is_string());
    }

    #[test]
    fn test_missing_external_events() {
        let json = compile_external_events(PROJECT, REGISTRY, "Common", "");
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["success"], false);
        assert!(parsed["error"].as_str().unwrap().contains("Common"));
    }

    #[test]
    fn test_error_category() {
        assert_eq!(error_category(102), "Syntax");
        assert_eq!(error_category(204), "UnresolvedReference");
        assert_eq!(error_category(300), "Arity");
    }

    #[test]
    fn test_version() {
        assert_eq!(version(), env!("CARGO_PKG_VERSION"));
    }
}
