//! Error types for file storage operations.

/// Result type for file storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Error type for file storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The file does not exist, or lives outside the configured folder.
    #[error("File not found: {id}")]
    NotFound { id: String },

    /// The storage service refused our credentials.
    #[error("Storage access denied: {0}")]
    Unauthorized(String),

    /// The storage service answered with an unexpected status.
    #[error("Storage service returned {status}: {message}")]
    Upstream { status: u16, message: String },

    /// The request never got a response (DNS, TLS, timeout, reset).
    #[error("Storage transport error: {0}")]
    Transport(String),

    /// Service-account key missing, unreadable, or rejected while signing.
    #[error("Storage credential error: {0}")]
    Credential(String),

    /// The upload or file id in the request is unacceptable.
    #[error("Invalid file request: {0}")]
    Validation(String),
}

impl StorageError {
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Map a non-success HTTP status from the storage service.
    pub fn from_status(status: u16, message: impl Into<String>, id: Option<&str>) -> Self {
        let message = message.into();
        match (status, id) {
            (404, Some(id)) => Self::not_found(id),
            (401 | 403, _) => Self::Unauthorized(message),
            _ => Self::Upstream { status, message },
        }
    }

    /// Whether repeating the request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Upstream { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

#[cfg(feature = "drive-storage")]
impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => StorageError::from_status(status.as_u16(), err.to_string(), None),
            None => StorageError::Transport(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            StorageError::from_status(404, "gone", Some("f1")),
            StorageError::NotFound { id } if id == "f1"
        ));
        assert!(matches!(
            StorageError::from_status(404, "gone", None),
            StorageError::Upstream { status: 404, .. }
        ));
        assert!(matches!(
            StorageError::from_status(403, "nope", Some("f1")),
            StorageError::Unauthorized(_)
        ));
        assert!(StorageError::from_status(503, "busy", None).is_retryable());
        assert!(!StorageError::from_status(400, "bad", None).is_retryable());
        assert!(StorageError::Transport("reset".into()).is_retryable());
    }
}
