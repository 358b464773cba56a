use crate::field::Dimension;
use thiserror::Error;

/// Error type for invalid reductions.
///
/// Every sample in an averaging window being NaN is not an error; it propagates
/// as NaN in the output.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VolcstatError {
    #[error("Shape mismatch. Expected {expected:?}, got {found:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        found: Vec<usize>,
    },
    #[error("Precondition violated: {0}")]
    PreconditionViolation(String),
    #[error("Field has no {0:?} dimension")]
    MissingDimension(Dimension),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Could not read {path}: {reason}")]
    Io { path: String, reason: String },
}

/// Convenience type for `Result<T, VolcstatError>`.
pub type VolcstatResult<T> = Result<T, VolcstatError>;

impl VolcstatError {
    pub(crate) fn shape_mismatch(expected: &[usize], found: &[usize]) -> Self {
        VolcstatError::ShapeMismatch {
            expected: expected.to_vec(),
            found: found.to_vec(),
        }
    }
}
