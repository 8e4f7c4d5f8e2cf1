use thiserror::Error;

/// Reconstruction error kinds
///
/// `MalformedEntry` and `NumericDegeneracy` are recovered where they occur and
/// only collected for reporting; the rest abort the conversion.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReconstructError {
    #[error("Malformed entry {index}: {reason}")]
    MalformedEntry { index: usize, reason: String },

    #[error("No valid samples (accelerometer: {accel_count}, gyroscope: {gyro_count})")]
    NoData { accel_count: usize, gyro_count: usize },

    #[error("Degenerate {axis} axis: zero range across {samples} samples")]
    NumericDegeneracy { axis: &'static str, samples: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid movement plan: {0}")]
    InvalidPlan(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("JSON error: {0}")]
    Json(String),
}

impl ReconstructError {
    /// Whether processing carried on past this condition.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ReconstructError::MalformedEntry { .. } | ReconstructError::NumericDegeneracy { .. }
        )
    }

    pub(crate) fn malformed(index: usize, reason: impl Into<String>) -> Self {
        ReconstructError::MalformedEntry {
            index,
            reason: reason.into(),
        }
    }
}

impl From<std::io::Error> for ReconstructError {
    fn from(e: std::io::Error) -> Self {
        ReconstructError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for ReconstructError {
    fn from(e: serde_json::Error) -> Self {
        ReconstructError::Json(e.to_string())
    }
}

/// Result type for reconstruction operations
pub type Result<T> = std::result::Result<T, ReconstructError>;
