use thiserror::Error;

/// Errors surfaced by storage backends.
///
/// A missing record is not an error: `KeyValueBackend::get` returns `Ok(None)`.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// The backend could not durably persist a write (quota exceeded, disk error).
    #[error("Write error: {0}")]
    Write(String),

    /// A remote operation was attempted without an authenticated principal.
    #[error("Authentication required: {0}")]
    Auth(String),

    /// The remote store could not be reached (transport failure, timeout, rate limit).
    #[error("Remote unavailable: {0}")]
    Network(String),

    /// The remote store answered but rejected the request.
    #[error("Remote error: {0}")]
    Remote(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl StorageError {
    /// Whether this error came from the remote tier.
    ///
    /// The hybrid backend absorbs these into the sync queue instead of
    /// propagating them.
    pub fn is_remote_failure(&self) -> bool {
        matches!(
            self,
            StorageError::Auth(_) | StorageError::Network(_) | StorageError::Remote(_)
        )
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_failure_classification() {
        assert!(StorageError::Auth("no principal".into()).is_remote_failure());
        assert!(StorageError::Network("timeout".into()).is_remote_failure());
        assert!(StorageError::Remote("500".into()).is_remote_failure());

        assert!(!StorageError::Write("quota exceeded".into()).is_remote_failure());
        assert!(!StorageError::Io("disk".into()).is_remote_failure());
        assert!(!StorageError::Serialization("bad json".into()).is_remote_failure());
    }

    #[test]
    fn test_display_includes_detail() {
        let err = StorageError::Write("quota exceeded".into());
        assert_eq!(err.to_string(), "Write error: quota exceeded");
    }
}
