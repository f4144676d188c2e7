use std::error::Error;
use thiserror::Error;

/// Result alias for collaborator operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by external collaborators regardless of their transport.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The collaborator could not be reached or answered garbage.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// Human readable context.
        message: String,
        /// Underlying failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The collaborator answered with a non-success status.
    #[error("storage rejected `{path}` with status {status}")]
    Rejected {
        /// Endpoint that rejected the call.
        path: String,
        /// HTTP status code.
        status: u16,
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
