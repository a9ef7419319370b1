//! Values handed to JavaScript. Run with `wasm-pack test --node`.

#![cfg(target_arch = "wasm32")]

use gdevents_wasm::{compile_value, error_category};
use wasm_bindgen_test::*;

const PROJECT: &str = r#"{
    "name": "Game",
    "layouts": [{
        "name": "Level",
        "objects": [{ "name": "Player", "type": "Sprite" }],
        "events": [0]
    }],
    "events": [{
        "type": "forEach",
        "object": "Player",
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

#[wasm_bindgen_test]
fn compile_value_is_a_result_object() {
    let value = compile_value(PROJECT, REGISTRY, "Level", "").expect("conversion failed");
    let result: serde_json::Value = serde_wasm_bindgen::from_value(value).expect("not a result");
    assert_eq!(result["success"], true);
    assert!(result["code"]
        .as_str()
        .expect("code")
        .contains("forEachObjects2"));
}

#[wasm_bindgen_test]
fn malformed_project_is_an_error_result() {
    let value = compile_value("[]", REGISTRY, "Level", "").expect("conversion failed");
    let result: serde_json::Value = serde_wasm_bindgen::from_value(value).expect("not a result");
    assert_eq!(result["success"], false);
    assert!(result["error"].is_string());
}

#[wasm_bindgen_test]
fn error_category_names() {
    assert_eq!(error_category(107), "Syntax");
    assert_eq!(error_category(201), "UnresolvedReference");
}
