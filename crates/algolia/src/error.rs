//! Error types for the Algolia search backend.
//!
//! Errors are grouped by where they originate: connection configuration,
//! document building, and the remote search service. [`BackendError`] is the
//! type every backend operation returns.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

/// The primary error type for all backend operations.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Connection configuration errors
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Document building errors
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// Errors reported by the remote search service
    #[error(transparent)]
    Remote(#[from] RemoteServiceError),

    /// Pushing index settings during setup failed.
    #[error("failed to set up index '{index}' for connection '{alias}': {source}")]
    SetupFailed {
        alias: String,
        index: String,
        #[source]
        source: RemoteServiceError,
    },
}

/// Errors related to connection configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// A required connection parameter is absent.
    #[error("you must specify a '{key}' in your settings for connection '{alias}'")]
    MissingConfiguration { key: String, alias: String },

    /// A connection parameter is present but unusable.
    #[error("invalid value for '{key}' in connection '{alias}': {message}")]
    InvalidValue {
        key: String,
        alias: String,
        message: String,
    },
}

/// Errors raised while turning a prepared record into a wire document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    /// The prepared record has no canonical identifier field.
    #[error("prepared document is missing the identifier field '{field}'")]
    MissingIdentifier { field: String },

    /// The record type string is not of the form `app_label.model_name`.
    #[error("invalid record type '{value}', expected 'app_label.model_name'")]
    InvalidRecordType { value: String },
}

/// Failures reported by the remote search service or the transport to it.
#[derive(Error, Debug)]
pub enum RemoteServiceError {
    /// The addressed index or object does not exist.
    #[error("not found: {message}")]
    NotFound { message: String },

    /// The credentials were rejected.
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    /// The application exceeded its quota or rate limit.
    #[error("throttled: {message}")]
    Throttled { message: String },

    /// The request was rejected as malformed (bad settings, bad query).
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    /// The service answered with a server-side error.
    #[error("service unavailable (status {status}): {message}")]
    Unavailable { status: u16, message: String },

    /// The service answered with a status this client does not expect.
    #[error("unexpected response (status {status}): {message}")]
    Unexpected { status: u16, message: String },

    /// The request never produced a response.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The response body could not be decoded.
    #[error("failed to decode response: {message}")]
    Decode { message: String },
}

impl RemoteServiceError {
    /// Maps an HTTP status and response body to an error.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let message = body.into();
        match status {
            400 => RemoteServiceError::InvalidRequest { message },
            401 | 403 => RemoteServiceError::Unauthorized { message },
            404 => RemoteServiceError::NotFound { message },
            429 => RemoteServiceError::Throttled { message },
            500..=599 => RemoteServiceError::Unavailable { status, message },
            _ => RemoteServiceError::Unexpected { status, message },
        }
    }

    /// Returns true if the error means the target does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteServiceError::NotFound { .. })
    }
}

/// Result type alias for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

impl From<serde_json::Error> for RemoteServiceError {
    fn from(err: serde_json::Error) -> Self {
        RemoteServiceError::Decode {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for RemoteServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return RemoteServiceError::Decode {
                message: err.to_string(),
            };
        }
        RemoteServiceError::Transport {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}
