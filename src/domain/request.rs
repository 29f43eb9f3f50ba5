use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::domain::value::Priority;

/// Minimum `retry` interval enforced for emergency messages.
pub const EMERGENCY_MIN_RETRY: Duration = Duration::from_secs(30);
/// Maximum `expire` interval enforced for emergency messages.
pub const EMERGENCY_MAX_EXPIRE: Duration = Duration::from_secs(10_800);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// A notification to send through [`crate::PushoverClient::send`].
///
/// Every optional field is omitted from the request when it carries its
/// empty/default value. Over-long text fields are truncated while encoding
/// rather than rejected.
pub struct Message {
    /// Message body, truncated to 1024 characters.
    pub message: String,
    /// Render the body as HTML.
    pub html: bool,
    /// Render the body in a monospace font.
    pub monospace: bool,
    /// Title, truncated to 250 characters. The app name is used when unset.
    pub title: Option<String>,
    /// Target device names. All of the user's devices when empty.
    pub devices: Vec<String>,
    /// Supplementary URL, truncated to 512 characters.
    pub url: Option<String>,
    /// Title shown for [`Message::url`], truncated to 100 characters.
    pub url_title: Option<String>,
    pub priority: Priority,
    /// Name of a sound to play instead of the user's default.
    pub sound: Option<String>,
    /// Display time of the message instead of the time the API received it.
    pub timestamp: Option<DateTime<Utc>>,
    /// Emergency only: how often the notification is repeated.
    /// Values below [`EMERGENCY_MIN_RETRY`] are raised.
    pub retry: Option<Duration>,
    /// Emergency only: how long the notification keeps being repeated.
    /// Values above [`EMERGENCY_MAX_EXPIRE`] are lowered.
    pub expire: Option<Duration>,
    /// Publicly reachable URL invoked once the user acknowledges the message.
    pub callback_url: Option<String>,
    /// Tags stored with emergency receipts, usable to cancel them in bulk.
    pub tags: Vec<String>,
    /// Local file sent as an image attachment. Switches the request to
    /// `multipart/form-data`.
    pub attachment: Option<PathBuf>,
}

impl Message {
    /// Create a message with a body and every other field at its default.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    /// Whether encoding this message needs a multipart body.
    pub fn has_attachment(&self) -> bool {
        self.attachment
            .as_ref()
            .is_some_and(|path| !path.as_os_str().is_empty())
    }
}
