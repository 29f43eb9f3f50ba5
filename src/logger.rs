//! Round-trip observers.
//!
//! A [`Logger`] is called exactly once per HTTP round trip, after it
//! finished or failed. Loggers only observe; a failing logger never changes
//! the outcome of the call.

use std::error::Error as StdError;
use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value, json};

use crate::client::{HttpBody, HttpRequest, HttpResponse};
use crate::transport::{ATTACHMENT_FIELD, MultipartBody};

/// Everything known about one finished round trip.
#[derive(Debug, Clone, Copy)]
pub struct RoundTrip<'a> {
    pub request: &'a HttpRequest,
    /// `None` when the transport failed before a response arrived.
    pub response: Option<&'a HttpResponse>,
    /// `None` when a response (of any status) was received.
    pub error: Option<&'a (dyn StdError + 'static)>,
    pub start: DateTime<Utc>,
    pub duration: Duration,
}

impl RoundTrip<'_> {
    fn duration_nanos(&self) -> u64 {
        u64::try_from(self.duration.as_nanos()).unwrap_or(u64::MAX)
    }
}

/// Observer of finished round trips.
///
/// Implementations must be cheap and must not block for long: they run on
/// the calling task before the result is handed back.
pub trait Logger: Send + Sync {
    /// Record one round trip. Errors are reported through `tracing` and
    /// otherwise ignored.
    fn log(&self, round_trip: &RoundTrip<'_>) -> io::Result<()>;
}

/// Discards everything. Used when no logger is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NopLogger;

impl Logger for NopLogger {
    fn log(&self, _round_trip: &RoundTrip<'_>) -> io::Result<()> {
        Ok(())
    }
}

/// Writes one JSON object per round trip, newline-terminated.
///
/// ```text
/// {"@timestamp":"2024-05-01T12:00:00Z","event":{"duration":1520000,"request":{"url":"https://api.pushover.net/1/messages.json"},"response":{"status_code":200}}}
/// ```
#[derive(Debug)]
pub struct JsonLogger<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLogger<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write + Send> Logger for JsonLogger<W> {
    fn log(&self, round_trip: &RoundTrip<'_>) -> io::Result<()> {
        let mut response = Map::new();
        if let Some(resp) = round_trip.response {
            response.insert("status_code".to_owned(), Value::from(resp.status));
        }
        if let Some(err) = round_trip.error {
            response.insert("error".to_owned(), json!({ "message": err.to_string() }));
        }

        let line = json!({
            "@timestamp": round_trip.start.to_rfc3339_opts(SecondsFormat::Secs, true),
            "event": {
                "duration": round_trip.duration_nanos(),
                "request": { "url": round_trip.request.url.as_str() },
                "response": response,
            },
        });

        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        serde_json::to_writer(&mut *writer, &line)?;
        writer.write_all(b"\n")?;
        writer.flush()
    }
}

/// Dumps requests and responses in HTTP/1.1 wire format, for debugging.
#[derive(Debug)]
pub struct RawLogger<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> RawLogger<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write + Send> Logger for RawLogger<W> {
    fn log(&self, round_trip: &RoundTrip<'_>) -> io::Result<()> {
        let mut out = Vec::new();
        dump_request(&mut out, round_trip.request)?;
        if let Some(response) = round_trip.response {
            dump_response(&mut out, response)?;
        }

        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer.write_all(&out)?;
        writer.flush()
    }
}

fn dump_request(out: &mut Vec<u8>, request: &HttpRequest) -> io::Result<()> {
    let mut target = request.url.path().to_owned();
    if let Some(query) = request.url.query() {
        target.push('?');
        target.push_str(query);
    }
    write!(out, "{} {target} HTTP/1.1\r\n", request.method)?;
    if let Some(host) = request.url.host_str() {
        match request.url.port() {
            Some(port) => write!(out, "Host: {host}:{port}\r\n")?,
            None => write!(out, "Host: {host}\r\n")?,
        }
    }
    dump_headers(out, &request.headers)?;
    match &request.body {
        HttpBody::Empty => dump_body(out, &[]),
        HttpBody::Bytes(bytes) => dump_body(out, bytes),
        HttpBody::Multipart(multipart) => dump_multipart(out, multipart),
    }
}

// The boundary is only known to the transport, so parts are listed without it.
fn dump_multipart(out: &mut Vec<u8>, multipart: &MultipartBody) -> io::Result<()> {
    write!(out, "Content-Type: multipart/form-data\r\n\r\n")?;
    for (field, value) in &multipart.fields {
        write!(
            out,
            "Content-Disposition: form-data; name=\"{field}\"\r\n\r\n{value}\r\n"
        )?;
    }
    write!(
        out,
        "Content-Disposition: form-data; name=\"{ATTACHMENT_FIELD}\"; filename=\"{}\"\r\n\r\n<{} bytes>\r\n",
        multipart.attachment.file_name,
        multipart.attachment.contents.len(),
    )?;
    out.write_all(b"\n")
}

fn dump_response(out: &mut Vec<u8>, response: &HttpResponse) -> io::Result<()> {
    let reason = reqwest::StatusCode::from_u16(response.status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .unwrap_or("");
    write!(out, "HTTP/1.1 {} {reason}\r\n", response.status)?;
    dump_headers(out, &response.headers)?;
    dump_body(out, &response.body)
}

fn dump_headers(out: &mut Vec<u8>, headers: &reqwest::header::HeaderMap) -> io::Result<()> {
    for (name, value) in headers {
        write!(out, "{name}: ")?;
        out.write_all(value.as_bytes())?;
        out.write_all(b"\r\n")?;
    }
    Ok(())
}

fn dump_body(out: &mut Vec<u8>, body: &[u8]) -> io::Result<()> {
    out.write_all(b"\r\n")?;
    out.write_all(String::from_utf8_lossy(body).as_bytes())?;
    out.write_all(b"\n\n")
}

/// Emits one `tracing` event per round trip (target `pushover::http`).
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, round_trip: &RoundTrip<'_>) -> io::Result<()> {
        let url = round_trip.request.url.as_str();
        let duration_ns = round_trip.duration_nanos();
        match (round_trip.response, round_trip.error) {
            (_, Some(err)) => tracing::warn!(
                target: "pushover::http",
                url,
                duration_ns,
                error = %err,
                "round trip failed"
            ),
            (Some(response), None) => tracing::info!(
                target: "pushover::http",
                url,
                duration_ns,
                status_code = response.status,
                "round trip"
            ),
            (None, None) => tracing::info!(target: "pushover::http", url, duration_ns, "round trip"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use reqwest::Method;
    use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
    use url::Url;

    use super::*;

    fn request() -> HttpRequest {
        let mut request = HttpRequest::new(
            Method::POST,
            Url::parse("https://api.pushover.net/1/messages.json").unwrap(),
        );
        request.headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        request.body = HttpBody::Bytes(b"token=t&user=u&message=hi".to_vec());
        request
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        HttpResponse {
            status,
            headers,
            body: body.as_bytes().to_vec(),
        }
    }

    fn start() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn json_logger_writes_status_line() {
        let logger = JsonLogger::new(Vec::new());
        let request = request();
        let response = response(200, r#"{"status":1}"#);

        logger
            .log(&RoundTrip {
                request: &request,
                response: Some(&response),
                error: None,
                start: start(),
                duration: Duration::from_micros(1500),
            })
            .unwrap();

        let out = String::from_utf8(logger.into_inner()).unwrap();
        assert!(out.ends_with('\n'));
        let value: Value = serde_json::from_str(out.trim_end()).unwrap();
        assert_eq!(value["@timestamp"], "2023-11-14T22:13:20Z");
        assert_eq!(value["event"]["duration"], 1_500_000);
        assert_eq!(
            value["event"]["request"]["url"],
            "https://api.pushover.net/1/messages.json"
        );
        assert_eq!(value["event"]["response"]["status_code"], 200);
        assert!(value["event"]["response"].get("error").is_none());
    }

    #[test]
    fn json_logger_writes_error_message() {
        let logger = JsonLogger::new(Vec::new());
        let request = request();
        let err = io::Error::other("connection \"reset\"");

        logger
            .log(&RoundTrip {
                request: &request,
                response: None,
                error: Some(&err),
                start: start(),
                duration: Duration::ZERO,
            })
            .unwrap();

        let out = String::from_utf8(logger.into_inner()).unwrap();
        assert_eq!(out.lines().count(), 1);
        let value: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(
            value["event"]["response"]["error"]["message"],
            "connection \"reset\""
        );
        assert!(value["event"]["response"].get("status_code").is_none());
    }

    #[test]
    fn raw_logger_dumps_request_and_response() {
        let logger = RawLogger::new(Vec::new());
        let request = request();
        let response = response(400, r#"{"status":0}"#);

        logger
            .log(&RoundTrip {
                request: &request,
                response: Some(&response),
                error: None,
                start: start(),
                duration: Duration::ZERO,
            })
            .unwrap();

        let out = String::from_utf8(logger.into_inner()).unwrap();
        assert!(out.starts_with("POST /1/messages.json HTTP/1.1\r\nHost: api.pushover.net\r\n"));
        assert!(out.contains("content-type: application/x-www-form-urlencoded\r\n"));
        assert!(out.contains("\r\n\r\ntoken=t&user=u&message=hi"));
        assert!(out.contains("HTTP/1.1 400 Bad Request\r\n"));
        assert!(out.contains(r#"{"status":0}"#));
    }

    #[test]
    fn raw_logger_lists_multipart_parts() {
        let logger = RawLogger::new(Vec::new());
        let mut request = HttpRequest::new(
            Method::POST,
            Url::parse("https://api.pushover.net/1/messages.json").unwrap(),
        );
        request.body = HttpBody::Multipart(MultipartBody {
            fields: vec![("message", "hi".to_owned())],
            attachment: crate::transport::AttachmentFile {
                file_name: "cat.jpg".to_owned(),
                contents: vec![0; 42],
            },
        });

        logger
            .log(&RoundTrip {
                request: &request,
                response: None,
                error: None,
                start: start(),
                duration: Duration::ZERO,
            })
            .unwrap();

        let out = String::from_utf8(logger.into_inner()).unwrap();
        assert!(out.contains("Content-Disposition: form-data; name=\"message\"\r\n\r\nhi\r\n"));
        assert!(out.contains("name=\"attachment\"; filename=\"cat.jpg\"\r\n\r\n<42 bytes>\r\n"));
    }

    #[test]
    fn raw_logger_skips_missing_response() {
        let logger = RawLogger::new(Vec::new());
        let request = request();

        logger
            .log(&RoundTrip {
                request: &request,
                response: None,
                error: None,
                start: start(),
                duration: Duration::ZERO,
            })
            .unwrap();

        let out = String::from_utf8(logger.into_inner()).unwrap();
        assert!(!out.contains("HTTP/1.1 "), "{out}");
    }
}
