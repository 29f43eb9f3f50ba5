use std::io;
use std::path::{Path, PathBuf};

use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use url::form_urlencoded;

use super::response::{DecodeError, decode_success_body};
use super::text::{ELLIPSIS, truncate};
use crate::domain::{EMERGENCY_MAX_EXPIRE, EMERGENCY_MIN_RETRY, Message, Priority, SendResponse};

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

const MESSAGE_MAX_CHARS: usize = 1024;
const TITLE_MAX_CHARS: usize = 250;
const URL_MAX_CHARS: usize = 512;
const URL_TITLE_MAX_CHARS: usize = 100;

/// Multipart field holding the uploaded file.
pub const ATTACHMENT_FIELD: &str = "attachment";
const ATTACHMENT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("unable to read attachment {}: {source}", .path.display())]
    AttachmentRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to write {field} field: {source}")]
    Field {
        field: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

/// Credentials sent with every message.
#[derive(Debug, Clone, Copy)]
pub struct Credentials<'a> {
    pub app_token: &'a str,
    pub user_key: &'a str,
}

/// File contents loaded for a multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentFile {
    pub file_name: String,
    pub contents: Vec<u8>,
}

/// `multipart/form-data` payload: the message fields in wire order followed
/// by the file part.
///
/// The framing (boundary, part headers) is left to
/// [`reqwest::multipart::Form`], see [`MultipartBody::to_form`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartBody {
    pub fields: Vec<(&'static str, String)>,
    pub attachment: AttachmentFile,
}

impl MultipartBody {
    /// Build the form sent on the wire. Text parts come first, then the file
    /// under [`ATTACHMENT_FIELD`].
    pub fn to_form(&self) -> Result<Form, EncodeError> {
        let file = Part::bytes(self.attachment.contents.clone())
            .file_name(self.attachment.file_name.clone())
            .mime_str(ATTACHMENT_CONTENT_TYPE)
            .map_err(|source| EncodeError::Field {
                field: ATTACHMENT_FIELD,
                source,
            })?;
        let form = self
            .fields
            .iter()
            .fold(Form::new(), |form, (field, value)| form.text(*field, value.clone()));
        Ok(form.part(ATTACHMENT_FIELD, file))
    }

    /// Value of a text field, if it was written.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Body of `POST /1/messages.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodedBody {
    /// `application/x-www-form-urlencoded` text.
    Form(String),
    Multipart(MultipartBody),
}

#[derive(Debug, Clone, Deserialize)]
struct SendJsonResponse {
    #[serde(default)]
    receipt: Option<String>,
    #[serde(default)]
    status: i64,
    #[serde(default)]
    request: Option<String>,
}

/// Receives the message fields in wire order.
trait FieldSink {
    fn append(&mut self, field: &'static str, value: &str);
}

struct FormSink(form_urlencoded::Serializer<'static, String>);

impl FieldSink for FormSink {
    fn append(&mut self, field: &'static str, value: &str) {
        self.0.append_pair(field, value);
    }
}

#[derive(Default)]
struct MultipartSink(Vec<(&'static str, String)>);

impl FieldSink for MultipartSink {
    fn append(&mut self, field: &'static str, value: &str) {
        self.0.push((field, value.to_owned()));
    }
}

/// Encode the body of `POST /1/messages.json`.
///
/// Messages with an attachment are sent as `multipart/form-data` (the file is
/// read here), everything else as `application/x-www-form-urlencoded`.
pub async fn encode_send_body(
    message: &Message,
    credentials: Credentials<'_>,
) -> Result<EncodedBody, EncodeError> {
    match message.attachment.as_deref() {
        Some(path) if message.has_attachment() => {
            let attachment = read_attachment(path).await?;
            Ok(EncodedBody::Multipart(encode_multipart(
                message,
                credentials,
                attachment,
            )))
        }
        _ => Ok(EncodedBody::Form(encode_form(message, credentials))),
    }
}

pub async fn read_attachment(path: &Path) -> Result<AttachmentFile, EncodeError> {
    let contents = tokio::fs::read(path)
        .await
        .map_err(|source| EncodeError::AttachmentRead {
            path: path.to_owned(),
            source,
        })?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| ATTACHMENT_FIELD.to_owned());
    Ok(AttachmentFile {
        file_name,
        contents,
    })
}

pub fn encode_form(message: &Message, credentials: Credentials<'_>) -> String {
    let mut sink = FormSink(form_urlencoded::Serializer::new(String::new()));
    write_fields(message, credentials, &mut sink);
    sink.0.finish()
}

pub fn encode_multipart(
    message: &Message,
    credentials: Credentials<'_>,
    attachment: AttachmentFile,
) -> MultipartBody {
    let mut sink = MultipartSink::default();
    write_fields(message, credentials, &mut sink);
    MultipartBody {
        fields: sink.0,
        attachment,
    }
}

fn write_fields(message: &Message, credentials: Credentials<'_>, sink: &mut impl FieldSink) {
    sink.append("token", credentials.app_token);
    sink.append("user", credentials.user_key);
    sink.append(
        "message",
        &truncate(&message.message, MESSAGE_MAX_CHARS, ELLIPSIS),
    );
    if message.html {
        sink.append("html", "1");
    }
    if message.monospace {
        sink.append("monospace", "1");
    }
    if let Some(title) = non_empty(&message.title) {
        sink.append("title", &truncate(title, TITLE_MAX_CHARS, ELLIPSIS));
    }
    if !message.devices.is_empty() {
        sink.append("device", &message.devices.join(","));
    }
    if let Some(url) = non_empty(&message.url) {
        sink.append("url", &truncate(url, URL_MAX_CHARS, ""));
    }
    if let Some(url_title) = non_empty(&message.url_title) {
        sink.append("url_title", &truncate(url_title, URL_TITLE_MAX_CHARS, ELLIPSIS));
    }
    if message.priority != Priority::Normal {
        sink.append(Priority::FIELD, &message.priority.to_string());
        if message.priority.is_emergency() {
            let retry = message.retry.unwrap_or_default().max(EMERGENCY_MIN_RETRY);
            sink.append("retry", &retry.as_secs().to_string());
            let expire = message.expire.unwrap_or_default().min(EMERGENCY_MAX_EXPIRE);
            sink.append("expire", &expire.as_secs().to_string());
        }
    }
    if let Some(callback) = non_empty(&message.callback_url) {
        sink.append("callback", callback);
    }
    if let Some(sound) = non_empty(&message.sound) {
        sink.append("sound", sound);
    }
    if let Some(timestamp) = message.timestamp.map(|ts| ts.timestamp()).filter(|ts| *ts != 0) {
        sink.append("timestamp", &timestamp.to_string());
    }
    if !message.tags.is_empty() {
        sink.append("tags", &message.tags.join(","));
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

pub fn decode_send_json_response(body: &[u8]) -> Result<SendResponse, DecodeError> {
    let parsed: SendJsonResponse = decode_success_body(body)?;
    Ok(SendResponse {
        receipt: parsed.receipt.filter(|receipt| !receipt.is_empty()),
        status: parsed.status,
        request: parsed.request.filter(|request| !request.is_empty()),
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::DateTime;

    use super::*;

    const CREDENTIALS: Credentials<'static> = Credentials {
        app_token: "azGDORePK8gMaC0QOYAMyEEuzJnyUi",
        user_key: "uQiRzpo4DXghDmr9QzzfQu27cmVRsG",
    };

    fn form_pairs(body: &str) -> Vec<(String, String)> {
        form_urlencoded::parse(body.as_bytes()).into_owned().collect()
    }

    fn form_value(body: &str, key: &str) -> Option<String> {
        form_pairs(body)
            .into_iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    fn sample_file() -> AttachmentFile {
        AttachmentFile {
            file_name: "image.png".to_owned(),
            contents: vec![0x89, b'P', b'N', b'G', 0x00, 0xff],
        }
    }

    #[test]
    fn encode_default_message_sends_only_required_fields() {
        let body = encode_form(&Message::new("Hello world!"), CREDENTIALS);

        assert_eq!(
            body,
            "token=azGDORePK8gMaC0QOYAMyEEuzJnyUi\
             &user=uQiRzpo4DXghDmr9QzzfQu27cmVRsG\
             &message=Hello+world%21"
        );
    }

    #[test]
    fn encode_all_fields_in_wire_order() {
        let message = Message {
            message: "disk full".to_owned(),
            html: true,
            monospace: true,
            title: Some("backup".to_owned()),
            devices: vec!["iphone".to_owned(), "pixel".to_owned()],
            url: Some("https://status.example.com".to_owned()),
            url_title: Some("status page".to_owned()),
            priority: Priority::High,
            sound: Some("siren".to_owned()),
            timestamp: DateTime::from_timestamp(1_700_000_000, 0),
            callback_url: Some("https://hooks.example.com/ack".to_owned()),
            tags: vec!["ops".to_owned(), "disk".to_owned()],
            ..Default::default()
        };

        let body = encode_form(&message, CREDENTIALS);
        let keys = form_pairs(&body)
            .into_iter()
            .map(|(k, _)| k)
            .collect::<Vec<_>>();

        assert_eq!(
            keys,
            vec![
                "token",
                "user",
                "message",
                "html",
                "monospace",
                "title",
                "device",
                "url",
                "url_title",
                "priority",
                "callback",
                "sound",
                "timestamp",
                "tags",
            ]
        );
        assert_eq!(form_value(&body, "device").as_deref(), Some("iphone,pixel"));
        assert_eq!(form_value(&body, "tags").as_deref(), Some("ops,disk"));
        assert_eq!(form_value(&body, "priority").as_deref(), Some("1"));
        assert_eq!(form_value(&body, "timestamp").as_deref(), Some("1700000000"));
        assert_eq!(form_value(&body, "html").as_deref(), Some("1"));
    }

    #[test]
    fn encode_omits_empty_optional_strings() {
        let message = Message {
            title: Some(String::new()),
            url: Some(String::new()),
            sound: Some(String::new()),
            timestamp: DateTime::from_timestamp(0, 0),
            ..Message::new("hi")
        };

        let body = encode_form(&message, CREDENTIALS);
        let keys = form_pairs(&body)
            .into_iter()
            .map(|(k, _)| k)
            .collect::<Vec<_>>();
        assert_eq!(keys, vec!["token", "user", "message"]);
    }

    #[test]
    fn encode_truncates_long_text_fields() {
        let message = Message {
            message: "x".repeat(2000),
            title: Some("t".repeat(300)),
            url: Some(format!("https://example.com/{}", "p".repeat(600))),
            url_title: Some("u".repeat(150)),
            ..Default::default()
        };

        let body = encode_form(&message, CREDENTIALS);

        let text = form_value(&body, "message").unwrap();
        assert_eq!(text.chars().count(), 1024);
        assert!(text.ends_with(ELLIPSIS));

        let title = form_value(&body, "title").unwrap();
        assert_eq!(title.chars().count(), 250);
        assert!(title.ends_with(ELLIPSIS));

        let url = form_value(&body, "url").unwrap();
        assert_eq!(url.chars().count(), 512);
        assert!(url.ends_with('p'));

        let url_title = form_value(&body, "url_title").unwrap();
        assert_eq!(url_title.chars().count(), 100);
        assert!(url_title.ends_with(ELLIPSIS));
    }

    #[test]
    fn encode_emergency_clamps_retry_and_expire() {
        let message = Message {
            message: "x".repeat(2000),
            priority: Priority::Emergency,
            retry: Some(Duration::from_secs(5)),
            expire: Some(Duration::from_secs(4 * 60 * 60)),
            ..Default::default()
        };

        let body = encode_form(&message, CREDENTIALS);

        let text = form_value(&body, "message").unwrap();
        assert_eq!(text.chars().count(), 1024);
        assert!(text.ends_with(ELLIPSIS));
        assert_eq!(form_value(&body, "priority").as_deref(), Some("2"));
        assert_eq!(form_value(&body, "retry").as_deref(), Some("30"));
        assert_eq!(form_value(&body, "expire").as_deref(), Some("10800"));
    }

    #[test]
    fn encode_emergency_keeps_values_within_bounds() {
        let message = Message {
            priority: Priority::Emergency,
            retry: Some(Duration::from_secs(60)),
            expire: Some(Duration::from_secs(3600)),
            ..Message::new("hi")
        };

        let body = encode_form(&message, CREDENTIALS);
        assert_eq!(form_value(&body, "retry").as_deref(), Some("60"));
        assert_eq!(form_value(&body, "expire").as_deref(), Some("3600"));
    }

    #[test]
    fn encode_drops_retry_and_expire_below_emergency() {
        for priority in [Priority::Lowest, Priority::Low, Priority::Normal, Priority::High] {
            let message = Message {
                priority,
                retry: Some(Duration::from_secs(60)),
                expire: Some(Duration::from_secs(3600)),
                ..Message::new("hi")
            };

            let body = encode_form(&message, CREDENTIALS);
            assert_eq!(form_value(&body, "retry"), None, "{priority:?}");
            assert_eq!(form_value(&body, "expire"), None, "{priority:?}");
        }
    }

    #[test]
    fn encode_multipart_carries_fields_and_file() {
        let message = Message {
            title: Some("snapshot".to_owned()),
            priority: Priority::Low,
            ..Message::new("camera 1")
        };

        let body = encode_multipart(&message, CREDENTIALS, sample_file());
        assert_eq!(
            body.fields,
            vec![
                ("token", CREDENTIALS.app_token.to_owned()),
                ("user", CREDENTIALS.user_key.to_owned()),
                ("message", "camera 1".to_owned()),
                ("title", "snapshot".to_owned()),
                ("priority", "-1".to_owned()),
            ]
        );
        assert_eq!(body.attachment, sample_file());
        assert_eq!(body.field("priority"), Some("-1"));
        assert_eq!(body.field("retry"), None);
    }

    #[test]
    fn encode_multipart_matches_form_fields() {
        let message = Message {
            message: "y".repeat(1500),
            priority: Priority::Emergency,
            retry: Some(Duration::from_secs(1)),
            tags: vec!["a".to_owned()],
            ..Default::default()
        };

        let form = encode_form(&message, CREDENTIALS);
        let multipart = encode_multipart(&message, CREDENTIALS, sample_file());

        let multipart_fields = multipart
            .fields
            .iter()
            .map(|(field, value)| ((*field).to_owned(), value.clone()))
            .collect::<Vec<_>>();
        assert_eq!(multipart_fields, form_pairs(&form));
    }

    #[test]
    fn multipart_body_builds_form() {
        let body = encode_multipart(&Message::new("hi"), CREDENTIALS, sample_file());

        let form = body.to_form().unwrap();
        assert!(!form.boundary().is_empty());
    }

    #[tokio::test]
    async fn encode_send_body_selects_encoding_by_attachment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.jpg");
        std::fs::write(&path, b"jpeg bytes").unwrap();

        let plain = encode_send_body(&Message::new("hi"), CREDENTIALS).await.unwrap();
        assert!(matches!(plain, EncodedBody::Form(_)));

        let message = Message {
            attachment: Some(path),
            ..Message::new("hi")
        };
        match encode_send_body(&message, CREDENTIALS).await.unwrap() {
            EncodedBody::Multipart(body) => {
                assert_eq!(body.attachment.file_name, "photo.jpg");
                assert_eq!(body.attachment.contents, b"jpeg bytes");
                assert_eq!(body.field("message"), Some("hi"));
            }
            other => panic!("expected multipart, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn encode_send_body_reports_unreadable_attachment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.png");
        let message = Message {
            attachment: Some(path.clone()),
            ..Message::new("hi")
        };

        let err = encode_send_body(&message, CREDENTIALS).await.unwrap_err();
        match err {
            EncodeError::AttachmentRead { path: reported, source } => {
                assert_eq!(reported, path);
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn decode_send_response_maps_fields() {
        let json = br#"{"status":1,"request":"647d2300-702c-4b38-8b2f-d56326ae460b","receipt":"rLqVuqTRh62UzxtmqiaLzQmVcPgiCy"}"#;

        let first = decode_send_json_response(json).unwrap();
        let second = decode_send_json_response(json).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.status, 1);
        assert_eq!(
            first.receipt.as_deref(),
            Some("rLqVuqTRh62UzxtmqiaLzQmVcPgiCy")
        );
        assert_eq!(
            first.request.as_deref(),
            Some("647d2300-702c-4b38-8b2f-d56326ae460b")
        );
    }

    #[test]
    fn decode_send_response_treats_empty_receipt_as_absent() {
        let resp = decode_send_json_response(br#"{"receipt":""}"#).unwrap();
        assert_eq!(resp, SendResponse::default());
    }
}
