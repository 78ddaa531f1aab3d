//! Error types for simulation operations.

use sf_core::SfError;
use sf_graph::GraphError;
use sf_units::UnitError;
use thiserror::Error;

/// Errors encountered while assembling or integrating a network.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Non-physical condition: {what}")]
    NonPhysical { what: &'static str },

    #[error("Network mismatch: {what}")]
    NetworkMismatch { what: String },

    #[error("Unknown stream '{name}'")]
    UnknownStream { name: String },

    #[error("Stream '{name}' is {role}")]
    StreamRole { name: String, role: &'static str },

    #[error("Network is not initialized; call initialize first")]
    NotInitialized,

    #[error("Global state must have length {expected}, got {actual}")]
    StateLength { expected: usize, actual: usize },

    #[error(transparent)]
    Unit(#[from] UnitError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Core(#[from] SfError),
}

pub type SimResult<T> = Result<T, SimError>;
