//! Error types of the HTTP persistence bridge.

use reqwest::StatusCode;
use thiserror::Error;

use crate::dao::storage::StorageError;

/// Convenient result alias returning [`BridgeError`] failures.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Failures that can occur while talking to the persistence collaborator.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Required environment variable is missing.
    #[error("missing persistence environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    /// Building the HTTP client failed (invalid TLS setup, etc).
    #[error("failed to build persistence HTTP client")]
    ClientBuilder {
        #[source]
        source: reqwest::Error,
    },
    /// A request could not be sent.
    #[error("failed to send persistence request to `{path}`")]
    RequestSend {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// The collaborator answered with an unexpected status code.
    #[error("unexpected persistence response status {status} for `{path}`")]
    RequestStatus { path: String, status: StatusCode },
}

impl From<BridgeError> for StorageError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::RequestStatus { path, status } => StorageError::Rejected {
                path,
                status: status.as_u16(),
            },
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}
