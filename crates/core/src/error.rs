//! Error types for journaldb
//!
//! Every fallible operation in the workspace returns [`JournalResult`].
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! ## Taxonomy
//!
//! | Variant | Raised by | Recovery |
//! |---------|-----------|----------|
//! | `InitializationFailed` | engine construction | fatal, construct again later |
//! | `WriteConflict` | write batch | batch rolled back, call `reset_props` before retrying |
//! | `InconsistentState` | `reset_props` | fatal, journal was never initialized |
//! | `Storage` | any store call | surfaced directly, no partial results |
//! | `AlreadyExists` | schema setup | swallowed by the engine during initialization |

use crate::types::JournalIdError;
use thiserror::Error;

/// Result type alias for journal operations
pub type JournalResult<T> = std::result::Result<T, JournalError>;

/// Error type for all journal operations
#[derive(Debug, Error)]
pub enum JournalError {
    /// Journal identity failed validation
    #[error("invalid journal id: {0}")]
    InvalidJournalId(#[from] JournalIdError),

    /// Caller supplied input that can never be persisted (limits, empty ids)
    #[error("invalid input: {message}")]
    InvalidInput {
        /// Description of the violation
        message: String,
    },

    /// Initialization kept failing until the configured deadline passed
    #[error("journal '{journal}' failed to initialize after {attempts} attempt(s): {source}")]
    InitializationFailed {
        /// Journal being initialized
        journal: String,
        /// Number of attempts made before giving up
        attempts: u32,
        /// Last failure observed
        #[source]
        source: Box<JournalError>,
    },

    /// A batch violated a uniqueness or existence constraint and was rolled back
    #[error("write conflict in journal '{journal}': {reason}")]
    WriteConflict {
        /// Journal the batch targeted
        journal: String,
        /// What the store rejected
        reason: String,
    },

    /// The persisted props row is missing for an engine that expects one
    #[error("journal '{journal}' is in an inconsistent state: {message}")]
    InconsistentState {
        /// Affected journal
        journal: String,
        /// Details
        message: String,
    },

    /// A schema object already exists in the store
    #[error("store object already exists: {object}")]
    AlreadyExists {
        /// Name of the table or index
        object: String,
    },

    /// The operation was cancelled before it started
    #[error("operation cancelled")]
    Cancelled,

    /// Store unavailable or failed
    #[error("storage error: {message}")]
    Storage {
        /// Driver or store message
        message: String,
    },

    /// Configuration could not be read or is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Details
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl JournalError {
    /// Create an invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        JournalError::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        JournalError::Storage {
            message: message.into(),
        }
    }

    /// Create a write conflict error
    pub fn write_conflict(journal: impl Into<String>, reason: impl Into<String>) -> Self {
        JournalError::WriteConflict {
            journal: journal.into(),
            reason: reason.into(),
        }
    }

    /// Create an inconsistent state error
    pub fn inconsistent_state(journal: impl Into<String>, message: impl Into<String>) -> Self {
        JournalError::InconsistentState {
            journal: journal.into(),
            message: message.into(),
        }
    }

    /// Create an already-exists error for a schema object
    pub fn already_exists(object: impl Into<String>) -> Self {
        JournalError::AlreadyExists {
            object: object.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        JournalError::Config {
            message: message.into(),
        }
    }

    /// Check if this is a write conflict
    pub fn is_conflict(&self) -> bool {
        matches!(self, JournalError::WriteConflict { .. })
    }

    /// Check if this error came from an idempotent schema step
    pub fn is_already_exists(&self) -> bool {
        matches!(self, JournalError::AlreadyExists { .. })
    }

    /// Check if this error is retryable.
    ///
    /// Conflicts and transient store failures may succeed once the caller has
    /// reloaded props. Everything else will fail the same way again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            JournalError::WriteConflict { .. } | JournalError::Storage { .. }
        )
    }

    /// Check if this is a fatal error for the engine instance
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            JournalError::InitializationFailed { .. } | JournalError::InconsistentState { .. }
        )
    }
}
