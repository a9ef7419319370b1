//! Shared types for the events compiler.
//!
//! This crate defines the data model every other stage works on:
//! - [`EventArena`] / [`Event`] / [`Instruction`] for the event tree
//! - [`Project`] / [`Layout`] / [`ExternalEvents`] for the containers
//! - [`MetadataProvider`] / [`MetadataRegistry`] for instruction signatures
//! - [`LayoutScope`] for object, group and behavior resolution
//! - [`ParseError`] / [`Diagnostic`] for error reporting

pub mod error;
pub mod event;
pub mod lookup;
pub mod metadata;
pub mod project;
pub mod span;

pub use error::{
    Diagnostic, DiagnosticLocation, Diagnostics, ErrorCategory, ErrorCode, ParseError,
    MAX_DIAGNOSTICS,
};
pub use event::{
    Event, EventArena, EventId, EventKind, Expression, ExpressionKind, Instruction, LinkInclude,
};
pub use lookup::{ExpressionLookup, LayoutScope};
pub use metadata::{
    arity_window, ExpressionMetadata, ExpressionTable, InstructionMetadata, InstructionOwner,
    MetadataProvider, MetadataRegistry, ParameterMetadata, ParameterType, ValueKind, ValueType,
};
pub use project::{
    BehaviorDecl, ExternalEvents, Layout, ObjectDecl, ObjectGroup, Project, SheetKind,
};
pub use span::Span;
