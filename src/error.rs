//! Error types for the finance chat pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, AssistantError>;

#[derive(Error, Debug)]
pub enum AssistantError {
    /// Transport or provider failure while classifying a message.
    #[error("Classifier error: {0}")]
    ClassifierError(String),

    /// Model output that matches none of the declared intent shapes.
    #[error("Unrecognized intent: {0}")]
    UnrecognizedIntent(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Unique-index violation on category insert. The resolver recovers
    /// by re-reading the winning row.
    #[error("Category conflict: {0}")]
    CategoryConflict(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}
