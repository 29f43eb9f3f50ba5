use reqwest::header::HeaderMap;
use serde::Deserialize;

use super::response::{DecodeError, decode_success_body};
use crate::domain::Limits;

pub const LIMITS_PATH: &str = "/1/apps/limits.json";

const LIMIT_HEADER: &str = "x-limit-app-limit";
const REMAINING_HEADER: &str = "x-limit-app-remaining";
const RESET_HEADER: &str = "x-limit-app-reset";

#[derive(Debug, Clone, Deserialize)]
struct LimitsJsonResponse {
    #[serde(default)]
    limit: i64,
    #[serde(default)]
    remaining: i64,
    #[serde(default)]
    reset: i64,
}

pub fn encode_limits_query(app_token: &str) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .append_pair("token", app_token)
        .finish()
}

pub fn decode_limits_json_response(body: &[u8]) -> Result<Limits, DecodeError> {
    let parsed: LimitsJsonResponse = decode_success_body(body)?;
    Ok(Limits::new(parsed.limit, parsed.remaining, parsed.reset))
}

/// Read the quota headers Pushover attaches to every message response.
///
/// Returns `None` unless all three headers are present and numeric.
pub fn limits_from_headers(headers: &HeaderMap) -> Option<Limits> {
    let read = |name: &str| -> Option<i64> {
        headers.get(name)?.to_str().ok()?.trim().parse().ok()
    };
    Some(Limits::new(
        read(LIMIT_HEADER)?,
        read(REMAINING_HEADER)?,
        read(RESET_HEADER)?,
    ))
}
