use std::path::PathBuf;

use crate::schema::ValidationReport;
use crate::types::TrajectoryStatus;

/// Errors surfaced by model and storage operations.
#[derive(Debug, thiserror::Error)]
pub enum TrajectoryError {
    #[error("validation failed: {0}")]
    Validation(ValidationReport),

    #[error("trajectory {id} is already {status}")]
    AlreadyCompleted {
        id: String,
        status: TrajectoryStatus,
    },

    #[error("trajectory not found: {0}")]
    NotFound(String),

    #[error("storage error at {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TrajectoryError {
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TrajectoryError::Storage {
            path: path.into(),
            source,
        }
    }
}

impl From<ValidationReport> for TrajectoryError {
    fn from(report: ValidationReport) -> Self {
        TrajectoryError::Validation(report)
    }
}

pub type Result<T> = std::result::Result<T, TrajectoryError>;
