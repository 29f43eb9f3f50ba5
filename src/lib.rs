//! Typed Rust client for the Pushover message API.
//!
//! The crate is split the usual way: a domain layer of plain types
//! ([`Message`], [`Priority`], [`SendResponse`], [`Limits`]), a transport
//! layer for the wire formats and API limits, and a small client layer
//! performing round trips through a pluggable [`HttpTransport`] and
//! reporting them to a [`logger::Logger`].
//!
//! ```rust,no_run
//! use pushover::{CallContext, Message, Priority, PushoverClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), pushover::PushoverError> {
//!     let client = PushoverClient::new("app-token", "user-key")?;
//!     let message = Message {
//!         title: Some("backup".to_owned()),
//!         priority: Priority::High,
//!         ..Message::new("nightly backup failed")
//!     };
//!     let _resp = client.send(&message, &CallContext::default()).await?;
//!     Ok(())
//! }
//! ```
#![forbid(unsafe_code)]

pub mod client;
pub mod domain;
pub mod logger;
mod transport;

pub use client::{
    BoxError, BoxFuture, CallContext, DEFAULT_BASE_URL, HttpBody, HttpRequest, HttpResponse,
    HttpTransport, PushoverClient, PushoverClientBuilder, PushoverError, ReqwestTransport,
};
pub use domain::{
    ApiError, EMERGENCY_MAX_EXPIRE, EMERGENCY_MIN_RETRY, Limits, Message, Priority, SendResponse,
    ValidationError,
};
pub use logger::{JsonLogger, Logger, NopLogger, RawLogger, RoundTrip, TracingLogger};
pub use transport::{
    ATTACHMENT_FIELD, AttachmentFile, DecodeError, ELLIPSIS, ERROR_BODY_LIMIT, EncodeError,
    MultipartBody, SUCCESS_BODY_LIMIT, truncate,
};
