//! Error types for text-completion requests.

use std::fmt;

/// Broad category of a failed completion request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmErrorKind {
    /// Connection failure, timeout, or other transport problem.
    Network,
    /// HTTP 429 from the provider.
    RateLimited,
    /// HTTP 5xx from the provider.
    ServerError,
    /// HTTP 4xx (other than 429), usually a bad key or request.
    ClientError,
    /// The provider answered but the body could not be understood.
    ParseError,
}

impl fmt::Display for LlmErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Network => "network_error",
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::ClientError => "client_error",
            Self::ParseError => "parse_error",
        };
        write!(f, "{}", s)
    }
}

/// A failed completion request.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct LlmError {
    pub kind: LlmErrorKind,
    pub message: String,
    /// HTTP status, when the provider answered at all.
    pub status: Option<u16>,
}

impl LlmError {
    pub fn network_error(message: String) -> Self {
        Self {
            kind: LlmErrorKind::Network,
            message,
            status: None,
        }
    }

    pub fn rate_limited(message: String) -> Self {
        Self {
            kind: LlmErrorKind::RateLimited,
            message,
            status: Some(429),
        }
    }

    pub fn server_error(status: u16, message: String) -> Self {
        Self {
            kind: LlmErrorKind::ServerError,
            message,
            status: Some(status),
        }
    }

    pub fn client_error(status: u16, message: String) -> Self {
        Self {
            kind: LlmErrorKind::ClientError,
            message,
            status: Some(status),
        }
    }

    pub fn parse_error(message: String) -> Self {
        Self {
            kind: LlmErrorKind::ParseError,
            message,
            status: None,
        }
    }
}

/// Map an HTTP status code to an error kind.
///
/// Success codes are reported as `ParseError` since a caller only classifies
/// a status after deciding the response is unusable.
pub fn classify_http_status(status: u16) -> LlmErrorKind {
    match status {
        429 => LlmErrorKind::RateLimited,
        500..=599 => LlmErrorKind::ServerError,
        400..=499 => LlmErrorKind::ClientError,
        _ => LlmErrorKind::ParseError,
    }
}
