//! Events compiler: orchestrates the full compilation of an event sheet.
//!
//! ```text
//! Project → Link splicing → Useless-event removal → Profiling markers → Codegen → File
//! ```
//!
//! [`compile_layout`] and [`compile_external_events`] are the typed entry
//! points; [`compile_to_result`] takes JSON and always returns a
//! serializable [`CompileResult`].

pub mod error;
pub mod options;
pub mod preprocess;

pub use error::CompileError;
pub use options::CompileOptions;
pub use preprocess::Preprocessor;

use gdevents_codegen::{BackendKind, CodeFile, EventsCodeGenerator, NameMangler};
use gdevents_types::{
    Diagnostics, EventId, Layout, LayoutScope, MetadataProvider, MetadataRegistry, Project,
    SheetKind,
};
use log::debug;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Entry-point function name of script files.
pub const SCRIPT_FUNCTION_NAME: &str = "func";

/// Output of a successful compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledEvents {
    /// Complete source file.
    pub code: String,
    /// Statements of the root events only.
    pub events_code: String,
    pub diagnostics: Diagnostics,
    /// Event timed by each profiling marker, by marker index.
    pub profiling_table: Vec<Option<EventId>>,
    pub include_files: Vec<String>,
    /// Lowercase hex SHA-256 of `code`.
    pub code_hash: String,
    pub max_depth: usize,
}

/// Compile the events of layout `layout_name`.
pub fn compile_layout(
    project: &Project,
    layout_name: &str,
    metadata: &dyn MetadataProvider,
    options: &CompileOptions,
    mangler: &mut NameMangler,
) -> Result<CompiledEvents, CompileError> {
    let layout = project
        .layout(layout_name)
        .ok_or_else(|| CompileError::LayoutNotFound(layout_name.to_string()))?;
    compile_sheet(
        project,
        layout,
        layout_name,
        &layout.events,
        SheetKind::Layout,
        metadata,
        options,
        mangler,
    )
}

/// Compile external events `name` against the objects of their associated
/// layout.
pub fn compile_external_events(
    project: &Project,
    name: &str,
    metadata: &dyn MetadataProvider,
    options: &CompileOptions,
    mangler: &mut NameMangler,
) -> Result<CompiledEvents, CompileError> {
    let external = project
        .external_events(name)
        .ok_or_else(|| CompileError::ExternalEventsNotFound(name.to_string()))?;
    let layout = external
        .associated_layout
        .as_deref()
        .and_then(|layout| project.layout(layout))
        .ok_or_else(|| CompileError::NoAssociatedLayout(name.to_string()))?;
    compile_sheet(
        project,
        layout,
        name,
        &external.events,
        SheetKind::ExternalEvents,
        metadata,
        options,
        mangler,
    )
}

#[allow(clippy::too_many_arguments)]
fn compile_sheet(
    project: &Project,
    layout: &Layout,
    sheet: &str,
    roots: &[EventId],
    kind: SheetKind,
    metadata: &dyn MetadataProvider,
    options: &CompileOptions,
    mangler: &mut NameMangler,
) -> Result<CompiledEvents, CompileError> {
    debug!(
        "compiling \"{sheet}\" ({} root events, {:?} backend, profiling {})",
        roots.len(),
        options.backend,
        options.profiling
    );
    let mut arena = project.events.clone();
    let mut preprocessor = Preprocessor::new(project, &mut arena, kind, sheet);
    let roots = preprocessor.run(roots, options.profiling)?;
    let mut diagnostics = preprocessor.into_diagnostics();

    let scope = LayoutScope::new(project, layout, metadata);
    let mangled_sheet = mangler.mangle(sheet);
    let backend = options.backend.backend(&mangled_sheet);
    let generated =
        EventsCodeGenerator::new(&scope, &arena, backend.as_ref(), mangler, sheet).generate(&roots)?;

    let function_name = match (options.backend, kind) {
        (BackendKind::Script, _) => SCRIPT_FUNCTION_NAME.to_string(),
        (BackendKind::Native, SheetKind::Layout) => mangler.scene_events_function_name(sheet),
        (BackendKind::Native, SheetKind::ExternalEvents) => {
            mangler.external_events_function_name(sheet)
        }
    };
    let objects_lists: Vec<String> = scope
        .all_object_names()
        .iter()
        .map(|object| mangler.objects_list_name(object))
        .collect();
    let code = backend.complete_file(&CodeFile {
        function_name: &function_name,
        objects_lists: &objects_lists,
        generated: &generated,
    });

    diagnostics.extend(generated.diagnostics);
    let code_hash = format!("{:x}", Sha256::digest(code.as_bytes()));
    debug!(
        "compiled \"{sheet}\": {} bytes, depth {}, {} diagnostics",
        code.len(),
        generated.max_depth,
        diagnostics.total_errors
    );
    Ok(CompiledEvents {
        code,
        events_code: generated.events_code,
        diagnostics,
        profiling_table: generated.profiling_table,
        include_files: generated.include_files.into_iter().collect(),
        code_hash,
        max_depth: generated.max_depth,
    })
}

// ══════════════════════════════════════════════════════════════════════════════
// JSON entry points
// ══════════════════════════════════════════════════════════════════════════════

/// Serializable outcome of a compilation, successful or not.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileResult {
    /// The sheet compiled without any diagnostic.
    pub success: bool,
    /// Generated file; present whenever compilation ran, even with
    /// diagnostics.
    pub code: Option<String>,
    pub code_hash: Option<String>,
    pub diagnostics: Diagnostics,
    pub profiling_table: Vec<Option<EventId>>,
    pub include_files: Vec<String>,
    /// Fatal error that prevented compilation.
    pub error: Option<String>,
}

impl From<Result<CompiledEvents, CompileError>> for CompileResult {
    fn from(outcome: Result<CompiledEvents, CompileError>) -> Self {
        match outcome {
            Ok(compiled) => Self {
                success: !compiled.diagnostics.has_errors(),
                code: Some(compiled.code),
                code_hash: Some(compiled.code_hash),
                diagnostics: compiled.diagnostics,
                profiling_table: compiled.profiling_table,
                include_files: compiled.include_files,
                error: None,
            },
            Err(error) => Self {
                error: Some(error.to_string()),
                ..Self::default()
            },
        }
    }
}

/// Inputs of the JSON entry points, decoded.
fn decode(
    project_json: &str,
    registry_json: &str,
    options_json: &str,
) -> Result<(Project, MetadataRegistry, CompileOptions), CompileError> {
    let project = serde_json::from_str(project_json)?;
    let registry = serde_json::from_str(registry_json)?;
    let options = if options_json.trim().is_empty() {
        CompileOptions::default()
    } else {
        serde_json::from_str(options_json)?
    };
    Ok((project, registry, options))
}

/// Compile layout `layout_name` of a JSON project.
///
/// `options_json` may be empty for the default options.
pub fn compile_to_result(
    project_json: &str,
    registry_json: &str,
    layout_name: &str,
    options_json: &str,
) -> CompileResult {
    decode(project_json, registry_json, options_json)
        .and_then(|(project, registry, options)| {
            let mut mangler = NameMangler::new();
            compile_layout(&project, layout_name, &registry, &options, &mut mangler)
        })
        .into()
}

/// Compile external events `name` of a JSON project.
pub fn compile_external_events_to_result(
    project_json: &str,
    registry_json: &str,
    name: &str,
    options_json: &str,
) -> CompileResult {
    decode(project_json, registry_json, options_json)
        .and_then(|(project, registry, options)| {
            let mut mangler = NameMangler::new();
            compile_external_events(&project, name, &registry, &options, &mut mangler)
        })
        .into()
}
