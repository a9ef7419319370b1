//! Codegen error types.

use gdevents_types::EventId;
use thiserror::Error;

/// Failures that stop generation of a whole sheet.
///
/// Problems inside instructions are never reported here: they become
/// diagnostics and the generator substitutes fallback code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodegenError {
    /// A root or sub-event id does not point into the arena.
    #[error("event {0} is not in the events arena")]
    MissingEvent(EventId),

    /// The event tree is nested deeper than the generator supports,
    /// which also catches sub-event cycles.
    #[error("events are nested deeper than {limit} levels (at event {event})")]
    TooDeep { event: EventId, limit: usize },
}

/// Codegen result type alias.
pub type CodegenResult<T> = Result<T, CodegenError>;
