use thiserror::Error;

use crate::model::AnnotationId;

/// Result type for review operations
pub type Result<T> = std::result::Result<T, ReviewError>;

/// Errors surfaced by the review core.
///
/// Every operation returning one of these leaves the session untouched.
#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("invalid line range {start}..={end} (document has {line_count} lines)")]
    InvalidRange {
        start: i64,
        end: i64,
        line_count: usize,
    },

    #[error("cannot {action} while {state}")]
    InvalidStateTransition {
        state: &'static str,
        action: &'static str,
    },

    #[error("{action} is not available in {mode} mode")]
    ModeMismatch {
        action: &'static str,
        mode: &'static str,
    },

    #[error("unknown unit: {0}")]
    UnknownUnit(String),

    #[error("no annotation with id {0}")]
    UnknownAnnotation(AnnotationId),

    #[error("submission failed: {0}")]
    SubmissionTransportFailure(String),

    #[error("failed to serialize payload: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ReviewError {
    /// True for failures the reviewer can retry without re-deriving state
    pub fn is_transport(&self) -> bool {
        matches!(self, ReviewError::SubmissionTransportFailure(_))
    }
}
