//! Fatal compilation errors.
//!
//! Problems inside the event tree are diagnostics and never end up here;
//! these errors mean there was nothing to compile.

use gdevents_codegen::CodegenError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("layout \"{0}\" not found")]
    LayoutNotFound(String),

    #[error("external events \"{0}\" not found")]
    ExternalEventsNotFound(String),

    /// External events are compiled against the objects of a layout.
    #[error("external events \"{0}\" have no associated layout")]
    NoAssociatedLayout(String),

    #[error("invalid JSON input: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Codegen(#[from] CodegenError),
}
