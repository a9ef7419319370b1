//! End-to-end compiler tests.
//!
//! Tests verify the full pipeline: project → link splicing → preprocessing
//! → codegen → complete file, for layouts and external events, on both
//! backends, through the typed and the JSON entry points.

use gdevents_codegen::{CodegenError, NameMangler, MAX_EVENT_DEPTH};
use gdevents_compiler::{
    compile_external_events, compile_external_events_to_result, compile_layout,
    compile_to_result, CompileError, CompileOptions, CompileResult, CompiledEvents,
};
use gdevents_types::{
    ErrorCode, Event, EventId, ExternalEvents, Instruction, InstructionMetadata, Layout,
    LinkInclude, MetadataRegistry, ObjectDecl, ParameterMetadata, ParameterType, Project,
};

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn registry() -> MetadataRegistry {
    let mut r = MetadataRegistry::new();
    r.add_condition(
        "Visible",
        InstructionMetadata::object("isVisible")
            .with_parameter(ParameterMetadata::new(ParameterType::Object)),
    );
    r.add_action(
        "Log",
        InstructionMetadata::free("console.log")
            .with_include_file("debug/console.js")
            .with_parameter(ParameterMetadata::new(ParameterType::String)),
    );
    r
}

fn log(text: &str) -> Event {
    let quoted = format!("\"{text}\"");
    Event::standard(vec![], vec![Instruction::new("Log", [quoted])])
}

fn project() -> Project {
    let mut project = Project::new("Game");
    let mut layout = Layout::new("Level");
    layout.objects.push(ObjectDecl::new("Player", "Sprite"));
    project.layouts.push(layout);
    project
}

fn push_root(project: &mut Project, event: Event) -> EventId {
    let id = project.events.push(event);
    if let Some(layout) = project.layout_mut("Level") {
        layout.events.push(id);
    }
    id
}

fn add_external(project: &mut Project, name: &str, events: Vec<Event>) {
    let ids = events
        .into_iter()
        .map(|event| project.events.push(event))
        .collect();
    project.external_events.push(ExternalEvents {
        name: name.to_string(),
        associated_layout: Some("Level".to_string()),
        events: ids,
    });
}

fn compile_with(project: &Project, options: CompileOptions) -> CompiledEvents {
    init_logger();
    let mut mangler = NameMangler::new();
    compile_layout(project, "Level", &registry(), &options, &mut mangler)
        .expect("compilation failed")
}

fn compile(project: &Project) -> CompiledEvents {
    compile_with(project, CompileOptions::default())
}

// ══════════════════════════════════════════════════════════════════════════════
// 1. Complete files
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn script_layout_file() {
    let mut project = project();
    push_root(
        &mut project,
        Event::standard(
            vec![Instruction::new("Visible", ["Player"])],
            vec![Instruction::new("Log", ["\"seen\""])],
        ),
    );
    let compiled = compile(&project);

    assert!(compiled.code.starts_with("gdjs.LevelCode = {};\n"));
    assert!(compiled.code.contains("gdjs.LevelCode.GDPlayerObjects1= [];"));
    assert!(compiled.code.contains("gdjs.LevelCode.condition0IsTrue_0 = {val:false};"));
    assert!(compiled.code.contains("gdjs.LevelCode.func = function(runtimeScene) {"));
    assert!(compiled.code.contains("gdjs.LevelCode.GDPlayerObjects1.length = 0;"));
    assert!(compiled.code.contains(&compiled.events_code));
    assert!(compiled.code.trim_end().ends_with("gdjs['LevelCode']= gdjs.LevelCode;"));
    assert!(!compiled.diagnostics.has_errors());
    assert_eq!(compiled.max_depth, 1);
}

#[test]
fn native_layout_file() {
    let mut project = project();
    push_root(&mut project, log("hello"));
    let compiled = compile_with(&project, CompileOptions::native());

    assert!(compiled.code.contains("#include \"GDCpp/Runtime/RuntimeContext.h\""));
    assert!(compiled.code.contains("#include \"debug/console.js\""));
    assert!(compiled
        .code
        .contains("extern \"C\" int GDSceneEventsLevel(RuntimeContext * runtimeContext)"));
    assert!(compiled.code.contains("console.log(std::string(\"hello\"));"));
}

#[test]
fn include_files_are_collected() {
    let mut project = project();
    push_root(&mut project, log("a"));
    push_root(&mut project, log("b"));
    let compiled = compile(&project);
    assert_eq!(compiled.include_files, vec!["debug/console.js".to_string()]);
}

#[test]
fn code_hash_is_sha256_of_code() {
    let mut project = project();
    push_root(&mut project, log("a"));
    let first = compile(&project);
    assert_eq!(first.code_hash.len(), 64);
    assert!(first
        .code_hash
        .chars()
        .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));

    push_root(&mut project, log("b"));
    let second = compile(&project);
    assert_ne!(first.code_hash, second.code_hash);
}

#[test]
fn missing_layout_is_fatal() {
    init_logger();
    let mut mangler = NameMangler::new();
    let err = compile_layout(
        &project(),
        "Nowhere",
        &registry(),
        &CompileOptions::default(),
        &mut mangler,
    )
    .unwrap_err();
    assert!(matches!(err, CompileError::LayoutNotFound(name) if name == "Nowhere"));
}

// ══════════════════════════════════════════════════════════════════════════════
// 2. Links
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn link_splices_external_events() {
    let mut project = project();
    add_external(&mut project, "Common", vec![log("shared")]);
    push_root(&mut project, Event::link("Common", LinkInclude::All));
    let compiled = compile(&project);

    assert!(compiled.events_code.contains("console.log(\"shared\");"));
    assert!(!compiled.events_code.contains("Link to"));
    assert!(!compiled.diagnostics.has_errors());
}

#[test]
fn link_prefers_external_events_over_layouts() {
    let mut project = project();
    let mut other = Layout::new("Common");
    other.events.push(project.events.push(log("from layout")));
    project.layouts.push(other);
    add_external(&mut project, "Common", vec![log("from external")]);
    push_root(&mut project, Event::link("Common", LinkInclude::All));
    let compiled = compile(&project);

    assert!(compiled.events_code.contains("from external"));
    assert!(!compiled.events_code.contains("from layout"));
}

#[test]
fn link_range_is_inclusive_and_clamped() {
    let mut project = project();
    add_external(&mut project, "Common", vec![log("a"), log("b"), log("c")]);
    push_root(
        &mut project,
        Event::link("Common", LinkInclude::Range { start: 1, end: 10 }),
    );
    let compiled = compile(&project);

    assert!(!compiled.events_code.contains("\"a\""));
    assert!(compiled.events_code.contains("\"b\""));
    assert!(compiled.events_code.contains("\"c\""));
}

#[test]
fn missing_link_target_does_not_abort_siblings() {
    let mut project = project();
    let link = push_root(&mut project, Event::link("Nowhere", LinkInclude::All));
    push_root(&mut project, log("after"));
    let compiled = compile(&project);

    assert!(compiled.events_code.contains("console.log(\"after\");"));
    let diagnostic = compiled.diagnostics.iter().next().expect("diagnostic");
    assert_eq!(diagnostic.code, ErrorCode::UNKNOWN_LINK_TARGET);
    assert_eq!(diagnostic.location.event, Some(link));
    assert_eq!(diagnostic.location.sheet, "Level");
    assert_eq!(compiled.diagnostics.total_errors, 1);
}

#[test]
fn circular_links_are_reported() {
    let mut project = project();
    add_external(
        &mut project,
        "A",
        vec![log("in a"), Event::link("B", LinkInclude::All)],
    );
    add_external(
        &mut project,
        "B",
        vec![log("in b"), Event::link("A", LinkInclude::All)],
    );
    push_root(&mut project, Event::link("A", LinkInclude::All));
    push_root(&mut project, Event::link("Level", LinkInclude::All));
    let compiled = compile(&project);

    assert!(compiled.events_code.contains("in a"));
    assert!(compiled.events_code.contains("in b"));
    let circular = compiled
        .diagnostics
        .iter()
        .filter(|d| d.code == ErrorCode::CIRCULAR_LINK)
        .count();
    assert_eq!(circular, 2);
}

#[test]
fn linked_sub_events_are_spliced() {
    let mut project = project();
    add_external(&mut project, "Common", vec![log("nested")]);
    let link = project.events.push(Event::link("Common", LinkInclude::All));
    push_root(
        &mut project,
        Event::standard(vec![], vec![]).with_sub_events(vec![link]),
    );
    let compiled = compile(&project);

    assert!(compiled.events_code.contains("{ //Subevents"));
    assert!(compiled.events_code.contains("console.log(\"nested\");"));
}

#[test]
fn link_to_external_events_named_like_the_layout_is_not_circular() {
    let mut project = project();
    add_external(&mut project, "Level", vec![log("same name")]);
    push_root(&mut project, Event::link("Level", LinkInclude::All));
    let compiled = compile(&project);

    assert!(compiled.events_code.contains("console.log(\"same name\");"));
    assert!(!compiled.diagnostics.contains_code(ErrorCode::CIRCULAR_LINK));
    assert!(!compiled.diagnostics.has_errors());
}

#[test]
fn link_to_cyclic_sheet_fails_without_overflow() {
    let mut project = project();
    add_external(&mut project, "Ext", vec![log("loop")]);
    let looping = project.external_events[0].events[0];
    project.events.add_sub_event(looping, looping);
    push_root(&mut project, Event::link("Ext", LinkInclude::All));

    init_logger();
    let mut mangler = NameMangler::new();
    let error = compile_layout(
        &project,
        "Level",
        &registry(),
        &CompileOptions::default(),
        &mut mangler,
    )
    .expect_err("cyclic linked sheet must fail");
    assert!(matches!(
        error,
        CompileError::Codegen(CodegenError::TooDeep { limit: MAX_EVENT_DEPTH, .. })
    ));

    let json = serde_json::to_string(&project).unwrap();
    let result = compile_to_result(&json, &serde_json::to_string(&registry()).unwrap(), "Level", "");
    assert!(!result.success);
    assert!(result.code.is_none());
    assert!(result.error.unwrap().contains("nested deeper than"));
}

#[test]
fn links_cannot_nest_events_past_the_depth_limit() {
    let mut project = project();
    // Each sheet is a single event whose sub-event links to the next one.
    let sheets = MAX_EVENT_DEPTH + 4;
    for n in 0..sheets {
        let link = project
            .events
            .push(Event::link(format!("S{}", n + 1), LinkInclude::All));
        add_external(
            &mut project,
            &format!("S{n}"),
            vec![Event::standard(vec![], vec![]).with_sub_events(vec![link])],
        );
    }
    add_external(&mut project, &format!("S{sheets}"), vec![log("bottom")]);
    push_root(&mut project, Event::link("S0", LinkInclude::All));

    init_logger();
    let mut mangler = NameMangler::new();
    let outcome = compile_layout(
        &project,
        "Level",
        &registry(),
        &CompileOptions::default(),
        &mut mangler,
    );
    assert!(matches!(
        outcome,
        Err(CompileError::Codegen(CodegenError::TooDeep { .. }))
    ));
}

// ══════════════════════════════════════════════════════════════════════════════
// 3. Preprocessing
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn disabled_and_comment_events_are_removed() {
    let mut project = project();
    push_root(&mut project, log("off").disabled());
    push_root(&mut project, Event::comment("remember this"));
    push_root(&mut project, log("on"));
    let compiled = compile(&project);

    assert!(!compiled.events_code.contains("off"));
    assert!(!compiled.events_code.contains("remember this"));
    assert!(compiled.events_code.contains("console.log(\"on\");"));
    assert_eq!(compiled.events_code.matches("console.log(").count(), 1);
}

#[test]
fn profiling_table_maps_markers_to_events() {
    let mut project = project();
    let a = push_root(&mut project, log("a"));
    let b = push_root(&mut project, log("b"));
    let compiled = compile_with(&project, CompileOptions::default().with_profiling());

    assert_eq!(compiled.profiling_table, vec![Some(a), Some(b), None]);
    assert!(compiled.events_code.contains("startEventTimer(0)"));
    assert!(compiled.events_code.contains("stopEventTimer(1)"));
    assert!(compiled.events_code.contains("startEventTimer(2)"));
}

#[test]
fn profiling_disabled_by_default() {
    let mut project = project();
    push_root(&mut project, log("a"));
    let compiled = compile(&project);

    assert!(compiled.profiling_table.is_empty());
    assert!(!compiled.events_code.contains("EventTimer"));
}

// ══════════════════════════════════════════════════════════════════════════════
// 4. External events
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn external_events_use_associated_layout() {
    init_logger();
    let mut project = project();
    add_external(
        &mut project,
        "Common",
        vec![Event::standard(
            vec![Instruction::new("Visible", ["Player"])],
            vec![],
        )],
    );
    let mut mangler = NameMangler::new();
    let compiled = compile_external_events(
        &project,
        "Common",
        &registry(),
        &CompileOptions::native(),
        &mut mangler,
    )
    .expect("compilation failed");

    assert!(compiled
        .code
        .contains("extern \"C\" int GDExternalEventsCommon(RuntimeContext * runtimeContext)"));
    assert!(compiled
        .events_code
        .contains("runtimeContext->GetObjectsRawPointers(\"Player\")"));
    assert!(!compiled.diagnostics.has_errors());
}

#[test]
fn external_events_without_layout_are_fatal() {
    init_logger();
    let mut project = project();
    project.external_events.push(ExternalEvents {
        name: "Loose".to_string(),
        associated_layout: None,
        events: Vec::new(),
    });
    let mut mangler = NameMangler::new();
    let options = CompileOptions::default();

    let err = compile_external_events(&project, "Loose", &registry(), &options, &mut mangler)
        .unwrap_err();
    assert!(matches!(err, CompileError::NoAssociatedLayout(_)));
    let err = compile_external_events(&project, "Missing", &registry(), &options, &mut mangler)
        .unwrap_err();
    assert!(matches!(err, CompileError::ExternalEventsNotFound(_)));
}

// ══════════════════════════════════════════════════════════════════════════════
// 5. JSON entry points
// ══════════════════════════════════════════════════════════════════════════════

fn json_inputs(project: &Project) -> (String, String) {
    (
        serde_json::to_string(project).unwrap(),
        serde_json::to_string(&registry()).unwrap(),
    )
}

#[test]
fn valid_project_produces_success_result() {
    let mut project = project();
    push_root(&mut project, log("json"));
    let (project_json, registry_json) = json_inputs(&project);

    let result = compile_to_result(&project_json, &registry_json, "Level", "");
    assert!(result.success);
    assert!(result.error.is_none());
    assert!(result.code.as_deref().unwrap().contains("console.log(\"json\");"));
    assert_eq!(result.code_hash.as_deref().map(str::len), Some(64));

    let json = serde_json::to_string(&result).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed["success"], true);
    assert!(parsed["codeHash"].is_string());
    assert!(parsed["includeFiles"].is_array());
}

#[test]
fn diagnostics_keep_code_but_fail_result() {
    let mut project = project();
    push_root(&mut project, Event::link("Nowhere", LinkInclude::All));
    let (project_json, registry_json) = json_inputs(&project);

    let result = compile_to_result(&project_json, &registry_json, "Level", "{}");
    assert!(!result.success);
    assert!(result.code.is_some());
    assert!(result.diagnostics.contains_code(ErrorCode::UNKNOWN_LINK_TARGET));
}

#[test]
fn malformed_json_produces_error_result() {
    let result = compile_to_result("{not json", "{}", "Level", "");
    assert!(!result.success);
    assert!(result.code.is_none());
    assert!(result.error.as_deref().unwrap().starts_with("invalid JSON input"));

    let json = serde_json::to_string(&result).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed["success"], false);
    assert!(parsed["code"].is_null());
}

#[test]
fn options_json_selects_backend() {
    let mut project = project();
    push_root(&mut project, log("x"));
    let (project_json, registry_json) = json_inputs(&project);

    let result = compile_to_result(
        &project_json,
        &registry_json,
        "Level",
        r#"{"backend":"native","profiling":true}"#,
    );
    assert!(result.success);
    assert!(result.code.unwrap().contains("GDSceneEventsLevel"));
    assert_eq!(result.profiling_table.len(), 2);
}

#[test]
fn external_events_json_entry_point() {
    let mut project = project();
    add_external(&mut project, "Common", vec![log("ext")]);
    let (project_json, registry_json) = json_inputs(&project);

    let result = compile_external_events_to_result(&project_json, &registry_json, "Common", "");
    assert!(result.success);
    assert!(result.code.unwrap().contains("gdjs.CommonCode.func = function(runtimeScene) {"));
}

#[test]
fn compile_result_json_roundtrip() {
    let mut project = project();
    push_root(&mut project, log("rt"));
    let (project_json, registry_json) = json_inputs(&project);

    let result = compile_to_result(&project_json, &registry_json, "Level", "");
    let json = serde_json::to_string(&result).unwrap();
    let rt: CompileResult = serde_json::from_str(&json).unwrap();
    assert_eq!(rt, result);
}

// ══════════════════════════════════════════════════════════════════════════════
// 6. Determinism
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn determinism_100_iterations() {
    let mut project = project();
    add_external(&mut project, "Common", vec![log("a"), log("b")]);
    push_root(
        &mut project,
        Event::standard(vec![Instruction::new("Visible", ["Player"])], vec![]),
    );
    push_root(&mut project, Event::link("Common", LinkInclude::All));
    let options = CompileOptions::default().with_profiling();

    let first = compile_with(&project, options);
    for i in 0..100 {
        let again = compile_with(&project, options);
        assert_eq!(again.code_hash, first.code_hash, "Determinism failure at iteration {i}");
        assert_eq!(again, first);
    }
}
