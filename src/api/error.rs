use std::time::Duration;
use thiserror::Error;

/// Errors from talking to the Telepulse backend.
///
/// Variants group into four kinds (see [`ErrorKind`]): transport failures,
/// undecodable bodies, explicit server rejections (`success: false`), and
/// client-side validation that fails before any request is sent.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    /// The backend answered with `success: false`.
    #[error("{}", .0.as_deref().unwrap_or("Request rejected by server"))]
    Rejected(Option<String>),
    #[error("{0}")]
    Validation(String),
}

/// Coarse classification used by callers deciding how to surface a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Decode,
    ServerRejection,
    Validation,
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Network(_)
            | ApiError::Timeout(_)
            | ApiError::HttpStatus(_)
            | ApiError::ResponseTooLarge(_) => ErrorKind::Transport,
            ApiError::Decode(_) => ErrorKind::Decode,
            ApiError::Rejected(_) => ErrorKind::ServerRejection,
            ApiError::Validation(_) => ErrorKind::Validation,
        }
    }

    /// Server-provided rejection message, if this is a rejection that carried one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Rejected(msg) => msg.as_deref(),
            _ => None,
        }
    }
}
