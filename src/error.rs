//! Error types shared across the workout pipeline.

use thiserror::Error;

/// Result type for workout, store and configuration operations.
pub type Result<T> = std::result::Result<T, WorkoutError>;

/// Errors surfaced to callers. None of them are fatal to the process:
/// each is recoverable by user action or by starting a new session.
#[derive(Debug, Error)]
pub enum WorkoutError {
    /// Camera access was denied or restricted. The workout cannot start
    /// until access is granted from the system settings.
    #[error("camera access denied; enable it in settings to start a workout")]
    PermissionDenied,

    /// The pose capability could not be started.
    #[error("pose detection unavailable: {0}")]
    SdkUnavailable(String),

    /// Reading or writing the workout history failed.
    #[error("workout history error: {0}")]
    Persistence(#[from] rusqlite::Error),

    /// A stored row could not be decoded into a record.
    #[error("invalid workout record: {0}")]
    InvalidRecord(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
