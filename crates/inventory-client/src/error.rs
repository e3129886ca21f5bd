//! Inventory store client errors

use thiserror::Error;

/// HTTP-style code the store uses for "already exists"
pub const CONFLICT: u16 = 409;
/// HTTP-style code the store uses for "not found"
pub const NOT_FOUND: u16 = 404;

/// Errors that can occur when talking to the resource store
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store answered with a non-success status
    #[error("store API error ({code}): {message}")]
    Api {
        /// HTTP-style status code (409 = already exists, 404 = not found)
        code: u16,
        /// Message reported by the store
        message: String,
    },

    /// The request never produced a store answer (connection, TLS, timeout)
    #[error("transport error: {0}")]
    Transport(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Record is missing data the store needs to address it (e.g. no name)
    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}

impl StoreError {
    /// Build an API error from a code and message
    pub fn api(code: u16, message: impl Into<String>) -> Self {
        StoreError::Api {
            code,
            message: message.into(),
        }
    }

    /// Numeric status code, when the store produced one
    pub fn code(&self) -> Option<u16> {
        match self {
            StoreError::Api { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// True when the store reported an already-exists condition
    pub fn is_conflict(&self) -> bool {
        self.code() == Some(CONFLICT)
    }

    /// True when the addressed record does not exist
    pub fn is_not_found(&self) -> bool {
        self.code() == Some(NOT_FOUND)
    }
}

impl From<kube::Error> for StoreError {
    fn from(err: kube::Error) -> Self {
        match &err {
            kube::Error::Api(response) => StoreError::Api {
                code: response.code,
                message: response.message.clone(),
            },
            _ => StoreError::Transport(err.to_string()),
        }
    }
}
