//! Error types for fairdraw
//!
//! Centralized error handling using thiserror. Running out of eligible candidates is
//! not an error; it is reported through `DrawOutcome::ResetRequired`.

use thiserror::Error;

/// All error types that can occur while weighting, drawing or recording
#[derive(Debug, Error)]
pub enum FairDrawError {
    /// Settings could not be interpreted
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No candidate survived the group/gender filter
    #[error("No candidates in pool '{pool}' (group: {group}, gender: {gender})")]
    EmptyCandidatePool {
        pool: String,
        group: String,
        gender: String,
    },

    /// Draw request is malformed (zero count, unknown id on confirm, ...)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A confirmed pick was already used up in its exclusion cycle, so the result is stale
    #[error("'{candidate}' has no picks left in the exclusion cycle of {scope}; draw again")]
    AlreadyDrawn { scope: String, candidate: String },

    /// Store read/write failed after retries
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// SQLite backend error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type alias for fairdraw operations
pub type Result<T> = std::result::Result<T, FairDrawError>;
