use std::time::Duration;

use crate::client::http::BoxError;
use crate::domain::{ApiError, ValidationError};
use crate::transport::{DecodeError, EncodeError};

#[derive(Debug, thiserror::Error)]
/// Errors returned by [`crate::PushoverClient`].
///
/// A failed call always yields exactly one of these:
/// - local failures before anything is sent ([`PushoverError::Encode`]),
/// - transport failures, cancellation and timeouts,
/// - undecodable success bodies ([`PushoverError::Decode`]),
/// - failures reported by the API ([`PushoverError::Api`], [`PushoverError::HttpStatus`]).
pub enum PushoverError {
    /// The configured base URL could not be parsed.
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),

    /// A header value (user agent or content type) is not valid HTTP.
    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    /// One of the domain constructors rejected an invalid value.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The message could not be encoded (e.g. unreadable attachment).
    #[error("encoding error: {0}")]
    Encode(#[from] EncodeError),

    /// HTTP client / transport failure (DNS, TLS, connection reset, etc).
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),

    /// The call's cancellation token fired before the round trip finished.
    #[error("request cancelled")]
    Cancelled,

    /// The call's timeout elapsed before the round trip finished.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// A 2xx response body was too large or not the expected JSON.
    #[error("unable to decode response (HTTP {status}): {source}")]
    Decode {
        status: u16,
        #[source]
        source: DecodeError,
    },

    /// Pushover rejected the request with a structured error payload.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Non-2xx response whose body was not a Pushover error payload.
    #[error("pushover: request failed with status {status}")]
    HttpStatus { status: u16 },
}

impl PushoverError {
    /// Whether the call was aborted by its cancellation token or a timeout,
    /// rather than failing on the network or at the server.
    pub fn is_context_err(&self) -> bool {
        match self {
            Self::Cancelled | Self::Timeout(_) => true,
            Self::Transport(err) => err
                .downcast_ref::<reqwest::Error>()
                .is_some_and(reqwest::Error::is_timeout),
            _ => false,
        }
    }

    /// HTTP status code of the response that caused this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api(err) => Some(err.status_code),
            Self::HttpStatus { status } | Self::Decode { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_status_code(&self, code: u16) -> bool {
        self.status_code() == Some(code)
    }

    pub fn is_not_found(&self) -> bool {
        self.is_status_code(404)
    }

    /// The structured API error, when the server sent one.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api(err) => Some(err),
            _ => None,
        }
    }
}
