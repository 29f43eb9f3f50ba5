use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::text::{ELLIPSIS, truncate};
use crate::domain::ApiError;

/// Largest success body decoded (8 MiB).
pub const SUCCESS_BODY_LIMIT: usize = 8 << 20;
/// Largest error body decoded (1 MiB).
pub const ERROR_BODY_LIMIT: usize = 1 << 20;

const DIAGNOSTIC_BODY_CHARS: usize = 512;
// Enough bytes to fill the diagnostic prefix even with 4-byte scalars.
const DIAGNOSTIC_BODY_BYTES: usize = DIAGNOSTIC_BODY_CHARS * 4;

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("response body exceeds {limit} bytes (got {actual}), on input: {body}")]
    TooLarge {
        limit: usize,
        actual: usize,
        body: String,
    },

    #[error("invalid JSON data: {source}, on input: {body}")]
    Json {
        #[source]
        source: serde_json::Error,
        body: String,
    },
}

#[derive(Debug, Clone, Deserialize)]
struct ApiErrorJsonResponse {
    #[serde(default)]
    status: i64,
    #[serde(default)]
    request: Option<String>,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    errors: Option<Vec<String>>,
    #[serde(default)]
    receipt: Option<String>,
}

pub fn is_success(status: u16) -> bool {
    (200..=299).contains(&status)
}

pub(crate) fn decode_success_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, DecodeError> {
    if body.len() > SUCCESS_BODY_LIMIT {
        return Err(DecodeError::TooLarge {
            limit: SUCCESS_BODY_LIMIT,
            actual: body.len(),
            body: diagnostic_body(body),
        });
    }
    serde_json::from_slice(body).map_err(|source| DecodeError::Json {
        source,
        body: diagnostic_body(body),
    })
}

/// Lossy, clipped copy of a response body for error messages.
fn diagnostic_body(body: &[u8]) -> String {
    let head = &body[..body.len().min(DIAGNOSTIC_BODY_BYTES)];
    truncate(&String::from_utf8_lossy(head), DIAGNOSTIC_BODY_CHARS, ELLIPSIS).into_owned()
}

/// Decode the error payload of a non-2xx response.
///
/// Only the first [`ERROR_BODY_LIMIT`] bytes are considered and the first
/// JSON value found there is used; anything after it is ignored. Returns
/// `None` when no JSON object can be read from that prefix, in which case
/// callers only have the status code to report.
pub fn decode_api_error(status_code: u16, body: &[u8]) -> Option<ApiError> {
    let head = &body[..body.len().min(ERROR_BODY_LIMIT)];
    let parsed = serde_json::Deserializer::from_slice(head)
        .into_iter::<ApiErrorJsonResponse>()
        .next()?
        .ok()?;
    Some(ApiError {
        status_code,
        status: parsed.status,
        request: parsed.request.filter(|it| !it.is_empty()),
        user: parsed.user.filter(|it| !it.is_empty()),
        errors: parsed.errors.unwrap_or_default(),
        receipt: parsed.receipt.filter(|it| !it.is_empty()),
    })
}
