use thiserror::Error;

/// Errors that can occur while capturing and streaming audio for recognition.
///
/// Setup failures (credentials, device, connection) are fatal to a session and
/// never retried. Mid-stream failures stop both uplink directions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StreamError {
    #[error("credentials unavailable: {0}")]
    CredentialsUnavailable(String),

    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("device not available")]
    DeviceNotAvailable,

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("recognition stream error: {0}")]
    Stream(String),

    #[error("cancelled")]
    Cancelled,

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("timeout")]
    Timeout,

    #[error("unknown error: {0}")]
    Unknown(String),
}

impl StreamError {
    /// Whether this error happened while setting a session up, before any audio flowed.
    pub fn is_setup_failure(&self) -> bool {
        matches!(
            self,
            Self::CredentialsUnavailable(_)
                | Self::InvalidCredentials(_)
                | Self::DeviceNotAvailable
                | Self::ConfigurationFailed(_)
                | Self::ConnectionFailed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_failures_are_classified() {
        assert!(StreamError::ConnectionFailed("refused".into()).is_setup_failure());
        assert!(StreamError::InvalidCredentials("bad".into()).is_setup_failure());
        assert!(!StreamError::Stream("reset".into()).is_setup_failure());
        assert!(!StreamError::Cancelled.is_setup_failure());
    }

    #[test]
    fn display_includes_cause() {
        let err = StreamError::Stream("UNAVAILABLE".into());
        assert_eq!(err.to_string(), "recognition stream error: UNAVAILABLE");
    }
}
