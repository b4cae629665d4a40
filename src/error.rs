use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("HTTP request error: {0}")]
    RequestError(String),

    #[error("JSON parsing error: {0}")]
    JsonError(String),

    #[error("I/O error: {0}")]
    IoError(String),
}

/// Failure of a single outbound call to a remote node.
///
/// Neither variant is fatal to a scan; callers count them and move on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Timeout, refused connection, DNS failure and the like
    #[error("unreachable: {0}")]
    Unreachable(String),

    /// The node answered, but not with what we asked for
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl RemoteError {
    /// Classify a reqwest failure
    pub fn from_reqwest_error(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() {
            RemoteError::Unreachable(err.to_string())
        } else {
            RemoteError::Protocol(err.to_string())
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        Self::from_reqwest_error(err)
    }
}

// From trait implementations for common error types
impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::RequestError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::JsonError(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IoError(err.to_string())
    }
}
