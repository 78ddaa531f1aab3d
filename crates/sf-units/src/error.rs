//! Error types for unit operations.

use sf_core::SfError;
use thiserror::Error;

/// Errors raised by unit nodes. All of them are model-building or usage
/// errors: they are reported at the point of misuse and never retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UnitError {
    #[error("Shape mismatch: state must have length {expected} (components + flow), got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("Configuration error: {what}")]
    Configuration { what: String },

    #[error("Unknown {kind} '{value}'")]
    UnknownVariant { kind: &'static str, value: String },

    #[error("Unit '{unit}' has no state; call init_state first")]
    Uninitialized { unit: String },

    #[error("Stream '{stream}' has no state")]
    UninitializedStream { stream: String },

    #[error("Unknown stream id {id}")]
    UnknownStream { id: u32 },

    #[error("Unit '{unit}' needs {expected}, got {ins} inlet(s) and {outs} outlet(s)")]
    PortCount {
        unit: String,
        expected: &'static str,
        ins: usize,
        outs: usize,
    },

    #[error("Non-physical value: {what}")]
    NonPhysical { what: &'static str },

    #[error(transparent)]
    Core(SfError),
}

pub type UnitResult<T> = Result<T, UnitError>;

impl UnitError {
    pub(crate) fn config(what: impl Into<String>) -> Self {
        UnitError::Configuration { what: what.into() }
    }
}

impl From<SfError> for UnitError {
    fn from(e: SfError) -> Self {
        match e {
            SfError::ShapeMismatch { expected, actual } => {
                UnitError::ShapeMismatch { expected, actual }
            }
            other => UnitError::Core(other),
        }
    }
}

impl From<UnitError> for SfError {
    fn from(e: UnitError) -> Self {
        match e {
            UnitError::ShapeMismatch { expected, actual } => {
                SfError::ShapeMismatch { expected, actual }
            }
            UnitError::Core(inner) => inner,
            other => SfError::InvalidArg {
                what: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = UnitError::UnknownVariant {
            kind: "pump type",
            value: "jet".into(),
        };
        assert_eq!(err.to_string(), "Unknown pump type 'jet'");
    }

    #[test]
    fn shape_mismatch_round_trips_through_core() {
        let core = SfError::ShapeMismatch {
            expected: 4,
            actual: 2,
        };
        let unit: UnitError = core.clone().into();
        assert!(matches!(
            unit,
            UnitError::ShapeMismatch {
                expected: 4,
                actual: 2
            }
        ));
        let back: SfError = unit.into();
        assert_eq!(back, core);
    }

    #[test]
    fn other_errors_become_invalid_arg() {
        let sf: SfError = UnitError::config("bad split").into();
        assert!(matches!(sf, SfError::InvalidArg { .. }));
    }
}
