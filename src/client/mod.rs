//! Client layer: configuration, the two API operations, and the mapping of
//! transport results to domain results.

mod context;
mod error;
mod http;

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use reqwest::Method;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use tracing::debug;
use url::Url;

use crate::domain::{Limits, Message, SendResponse, ValidationError};
use crate::logger::{Logger, NopLogger};
use crate::transport::{
    Credentials, DecodeError, EncodedBody, FORM_CONTENT_TYPE, LIMITS_PATH, MESSAGES_PATH,
    decode_api_error, decode_limits_json_response, decode_send_json_response,
    encode_limits_query, encode_send_body, is_success, limits_from_headers,
};

pub use context::CallContext;
pub use error::PushoverError;
pub use http::{
    BoxError, BoxFuture, HttpBody, HttpRequest, HttpResponse, HttpTransport, ReqwestTransport,
};

use http::Dispatcher;

pub const DEFAULT_BASE_URL: &str = "https://api.pushover.net";

const APP_TOKEN_ENV: &str = "APP_TOKEN";
const USER_KEY_ENV: &str = "USER_KEY";
const BASE_URL_ENV: &str = "PUSHOVER_URL";

fn default_user_agent() -> String {
    format!(
        "pushover-rs/{} ({}/{}; Rust)",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH,
    )
}

/// First non-empty value among the given environment variables.
fn env_string(keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| std::env::var(key).ok())
        .find(|value| !value.is_empty())
}

#[derive(Clone, Default)]
/// Builder for [`PushoverClient`].
///
/// Unset values fall back to defaults: empty credentials, [`DEFAULT_BASE_URL`],
/// a [`ReqwestTransport`] and a [`NopLogger`].
pub struct PushoverClientBuilder {
    app_token: Option<String>,
    user_key: Option<String>,
    base_url: Option<String>,
    transport: Option<Arc<dyn HttpTransport>>,
    logger: Option<Arc<dyn Logger>>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl PushoverClientBuilder {
    /// Builder with nothing set; see [`PushoverClientBuilder::from_env`] to
    /// start from the environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from the environment: `APP_TOKEN`, `USER_KEY` and `PUSHOVER_URL`.
    ///
    /// Empty variables count as unset. Setters called afterwards win.
    pub fn from_env() -> Self {
        Self {
            app_token: env_string(&[APP_TOKEN_ENV]),
            user_key: env_string(&[USER_KEY_ENV]),
            base_url: env_string(&[BASE_URL_ENV]),
            ..Self::default()
        }
    }

    /// Application API token (`token`).
    pub fn app_token(mut self, app_token: impl Into<String>) -> Self {
        self.app_token = Some(app_token.into());
        self
    }

    /// User or group key (`user`).
    pub fn user_key(mut self, user_key: impl Into<String>) -> Self {
        self.user_key = Some(user_key.into());
        self
    }

    /// Override the API origin. Only scheme, host and port are used.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Use a custom transport instead of the default [`ReqwestTransport`].
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Observer called once per round trip. Defaults to [`NopLogger`].
    pub fn logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Timeout applied to every request of the default transport.
    ///
    /// Ignored when a custom transport is set.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Override the HTTP `User-Agent` header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Build a [`PushoverClient`].
    pub fn build(self) -> Result<PushoverClient, PushoverError> {
        let base_url = Url::parse(self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ValidationError::UnsupportedScheme {
                scheme: base_url.scheme().to_owned(),
            }
            .into());
        }

        let user_agent =
            HeaderValue::from_str(&self.user_agent.unwrap_or_else(default_user_agent))?;

        let transport: Arc<dyn HttpTransport> = match self.transport {
            Some(transport) => transport,
            None => {
                let mut builder = reqwest::Client::builder();
                if let Some(timeout) = self.timeout {
                    builder = builder.timeout(timeout);
                }
                let client = builder
                    .build()
                    .map_err(|err| PushoverError::Transport(Box::new(err)))?;
                Arc::new(ReqwestTransport::new(client))
            }
        };
        let logger: Arc<dyn Logger> = self.logger.unwrap_or_else(|| Arc::new(NopLogger));

        Ok(PushoverClient {
            app_token: self.app_token.unwrap_or_default(),
            user_key: self.user_key.unwrap_or_default(),
            dispatcher: Dispatcher::new(base_url, user_agent, transport, logger),
            last_limits: Arc::new(Mutex::new(Limits::default())),
        })
    }
}

#[derive(Clone)]
/// High-level Pushover client.
///
/// Cheap to clone; clones share the transport, logger and the last-seen
/// quota snapshot. Safe to use from many tasks at once.
pub struct PushoverClient {
    app_token: String,
    user_key: String,
    dispatcher: Dispatcher,
    last_limits: Arc<Mutex<Limits>>,
}

impl fmt::Debug for PushoverClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PushoverClient")
            .field("base_url", &self.dispatcher.base_url().as_str())
            .finish_non_exhaustive()
    }
}

impl PushoverClient {
    /// Create a client with the given credentials and default settings.
    ///
    /// For more customization, use [`PushoverClient::builder`].
    pub fn new(
        app_token: impl Into<String>,
        user_key: impl Into<String>,
    ) -> Result<Self, PushoverError> {
        Self::builder().app_token(app_token).user_key(user_key).build()
    }

    /// Start configuring a client.
    pub fn builder() -> PushoverClientBuilder {
        PushoverClientBuilder::new()
    }

    /// Send a notification (`POST /1/messages.json`).
    ///
    /// Errors:
    /// - [`PushoverError::Encode`] when the attachment cannot be read,
    /// - [`PushoverError::Transport`], [`PushoverError::Cancelled`] or
    ///   [`PushoverError::Timeout`] when no response was received,
    /// - [`PushoverError::Api`] / [`PushoverError::HttpStatus`] for non-2xx responses,
    /// - [`PushoverError::Decode`] for malformed or oversized 2xx bodies.
    pub async fn send(
        &self,
        message: &Message,
        ctx: &CallContext,
    ) -> Result<SendResponse, PushoverError> {
        let body = encode_send_body(message, self.credentials()).await?;

        let mut request = self.dispatcher.request(Method::POST, MESSAGES_PATH, None);
        request.body = match body {
            EncodedBody::Form(form) => {
                request
                    .headers
                    .insert(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));
                HttpBody::Bytes(form.into_bytes())
            }
            EncodedBody::Multipart(multipart) => HttpBody::Multipart(multipart),
        };

        let response = self.dispatcher.round_trip(request, ctx).await?;
        self.remember_limits_from_headers(&response);
        let response = ensure_success(response)?;

        let parsed = decode_send_json_response(&response.body)
            .map_err(|source| decode_error(response.status, source))?;
        debug!(
            request = parsed.request.as_deref().unwrap_or_default(),
            receipt = parsed.receipt.is_some(),
            "message accepted"
        );
        Ok(parsed)
    }

    /// Fetch the application's current quota (`GET /1/apps/limits.json`).
    ///
    /// Always performs a round trip and refreshes [`PushoverClient::last_limits`].
    pub async fn limits(&self, ctx: &CallContext) -> Result<Limits, PushoverError> {
        let query = encode_limits_query(&self.app_token);
        let request = self
            .dispatcher
            .request(Method::GET, LIMITS_PATH, Some(&query));

        let response = self.dispatcher.round_trip(request, ctx).await?;
        self.remember_limits_from_headers(&response);
        let response = ensure_success(response)?;

        let limits = decode_limits_json_response(&response.body)
            .map_err(|source| decode_error(response.status, source))?;
        self.remember_limits(limits);
        Ok(limits)
    }

    /// Quota as reported by the most recent call that carried it.
    ///
    /// Concurrent calls overwrite each other; use [`PushoverClient::limits`]
    /// for an authoritative value.
    pub fn last_limits(&self) -> Limits {
        *self
            .last_limits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn credentials(&self) -> Credentials<'_> {
        Credentials {
            app_token: &self.app_token,
            user_key: &self.user_key,
        }
    }

    fn remember_limits_from_headers(&self, response: &HttpResponse) {
        if let Some(limits) = limits_from_headers(&response.headers) {
            self.remember_limits(limits);
        }
    }

    fn remember_limits(&self, limits: Limits) {
        *self
            .last_limits
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = limits;
    }
}

fn ensure_success(response: HttpResponse) -> Result<HttpResponse, PushoverError> {
    if is_success(response.status) {
        return Ok(response);
    }
    Err(match decode_api_error(response.status, &response.body) {
        Some(api_error) => PushoverError::Api(api_error),
        None => PushoverError::HttpStatus {
            status: response.status,
        },
    })
}

fn decode_error(status: u16, source: DecodeError) -> PushoverError {
    PushoverError::Decode { status, source }
}
