//! Events code generator: event trees to native or script source.
//!
//! # Architecture
//!
//! - [`NameMangler`] turns object and sheet names into identifiers.
//! - [`CodegenContext`] tracks, per generated scope, which object lists
//!   must be declared and which ones enclosing scopes already declared.
//! - [`EventsCodeGenerator`] walks the event tree of one sheet, emitting
//!   conditions, actions, expressions and variable accesses.
//! - [`Backend`] spells the emitted constructs for a target runtime:
//!   [`ScriptBackend`] or [`NativeBackend`], chosen by [`BackendKind`].
//!
//! Generation is total: problems in instructions are reported in
//! [`GeneratedCode::diagnostics`] and replaced by fallback code. Only a
//! malformed event tree fails with a [`CodegenError`].

pub mod backend;
pub mod context;
pub mod error;
mod expression;
pub mod generator;
mod instruction;
pub mod mangler;
pub mod native;
pub mod script;

pub use backend::{escape, Backend, BackendKind, CodeFile, GeneratedCode};
pub use context::CodegenContext;
pub use error::{CodegenError, CodegenResult};
pub use expression::VariableScope;
pub use generator::{check_tree, EventsCodeGenerator, MAX_EVENT_DEPTH};
pub use instruction::{AND_CONDITION, NOT_CONDITION, OR_CONDITION};
pub use mangler::NameMangler;
pub use native::NativeBackend;
pub use script::ScriptBackend;
