//! Script processing error types.

use thiserror::Error;

/// Errors that can occur while preparing script text for execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ScriptError {
    /// A table identifier could carry more than a single object name.
    #[error("invalid table identifier: {0}")]
    InvalidIdentifier(String),

    /// The database name substituted into a script was empty.
    #[error("database name cannot be empty")]
    EmptyDatabaseName,

    /// The database name substituted into a script exceeds the server's
    /// identifier limit.
    #[error("database name '{name}' is {len} characters long, the limit is {max}")]
    DatabaseNameTooLong {
        /// The rejected name.
        name: String,
        /// Its length in characters.
        len: usize,
        /// Maximum identifier length.
        max: usize,
    },
}

/// Result type for script operations.
pub type Result<T> = std::result::Result<T, ScriptError>;
