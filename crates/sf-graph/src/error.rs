//! Graph-specific error types.

use sf_core::{NodeId, SfError, StreamId};
use thiserror::Error;

pub type GraphResult<T> = Result<T, GraphError>;

/// Graph construction and validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// A connection refers to a unit that doesn't exist.
    #[error("Stream {stream} refers to non-existent unit {unit}")]
    InvalidUnitRef { stream: StreamId, unit: NodeId },

    /// A connection refers to a stream that doesn't exist.
    #[error("Unit {unit} refers to non-existent stream {stream}")]
    InvalidStreamRef { unit: NodeId, stream: StreamId },

    /// A stream has more than one producing unit.
    #[error("Stream '{stream}' has more than one producer")]
    MultipleProducers { stream: String },

    /// The same unit consumes a stream twice.
    #[error("Unit '{unit}' consumes stream '{stream}' more than once")]
    DuplicateInlet { unit: String, stream: String },

    /// Two units or two streams share a name.
    #[error("Duplicate {what} name '{name}'")]
    DuplicateName { what: &'static str, name: String },

    /// Name lookup failed.
    #[error("{what} '{name}' not found")]
    NotFound { what: &'static str, name: String },
}

impl From<GraphError> for SfError {
    fn from(err: GraphError) -> Self {
        SfError::InvalidArg {
            what: err.to_string(),
        }
    }
}
