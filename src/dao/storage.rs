use std::error::Error;
use thiserror::Error;

/// Result alias for session-store operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by store backends regardless of the underlying engine.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backing store cannot be reached; retryable.
    #[error("store unavailable: {message}")]
    Unavailable {
        /// Human-readable context for the failure.
        message: String,
        /// Underlying backend error.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// A patch did not fit the stored document; nothing was applied.
    #[error("patch conflicts with stored document: {message}")]
    PatchConflict {
        /// What the patch tried to write.
        message: String,
    },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}
