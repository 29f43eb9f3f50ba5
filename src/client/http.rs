//! HTTP round trips: the pluggable transport contract and the wrapper that
//! prepares each request and reports it to the logger.

use std::error::Error as StdError;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use reqwest::Method;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use tracing::{debug, warn};
use url::Url;

use crate::client::{CallContext, PushoverError};
use crate::logger::{Logger, RoundTrip};
use crate::transport::{ERROR_BODY_LIMIT, MultipartBody, SUCCESS_BODY_LIMIT, is_success};

pub type BoxError = Box<dyn StdError + Send + Sync>;
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

const DEFAULT_CONTENT_TYPE: &str = "application/json; charset=utf-8";
const ACCEPT_JSON: &str = "application/json";

#[derive(Debug, Clone)]
/// Outgoing request handed to an [`HttpTransport`].
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: HttpBody,
}

impl HttpRequest {
    /// Request without headers or body.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: HttpBody::Empty,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Payload of an [`HttpRequest`].
pub enum HttpBody {
    #[default]
    Empty,
    /// Sent as is, described by the request's `Content-Type` header.
    Bytes(Vec<u8>),
    /// Sent as `multipart/form-data`. The transport frames the parts and sets
    /// `Content-Type` with the boundary it picked.
    Multipart(MultipartBody),
}

impl HttpBody {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn is_multipart(&self) -> bool {
        matches!(self, Self::Multipart(_))
    }
}

#[derive(Debug, Clone)]
/// Response returned by an [`HttpTransport`].
///
/// Transports may stop reading the body once it exceeds
/// [`crate::SUCCESS_BODY_LIMIT`] (or [`crate::ERROR_BODY_LIMIT`] for non-2xx
/// statuses); the decoders never look past those limits anyway.
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

/// Sends one request and returns the server's response.
///
/// Implement this to plug in a different HTTP stack, an instrumented client,
/// or a test double.
pub trait HttpTransport: Send + Sync {
    /// Perform `request`. Only failures to obtain a response are errors; any
    /// HTTP status is returned as an [`HttpResponse`].
    fn round_trip<'a>(
        &'a self,
        request: &'a HttpRequest,
    ) -> BoxFuture<'a, Result<HttpResponse, BoxError>>;
}

#[derive(Debug, Clone, Default)]
/// [`HttpTransport`] backed by a [`reqwest::Client`].
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Use a preconfigured client, e.g. one with custom TLS settings.
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl HttpTransport for ReqwestTransport {
    fn round_trip<'a>(
        &'a self,
        request: &'a HttpRequest,
    ) -> BoxFuture<'a, Result<HttpResponse, BoxError>> {
        Box::pin(async move {
            let mut headers = request.headers.clone();
            if request.body.is_multipart() {
                headers.remove(CONTENT_TYPE);
            }
            let mut builder = self
                .client
                .request(request.method.clone(), request.url.clone())
                .headers(headers);
            match &request.body {
                HttpBody::Empty => {}
                HttpBody::Bytes(bytes) => builder = builder.body(bytes.clone()),
                HttpBody::Multipart(multipart) => builder = builder.multipart(multipart.to_form()?),
            }

            let mut response = builder.send().await?;
            let status = response.status().as_u16();
            let headers = response.headers().clone();
            let limit = if is_success(status) {
                SUCCESS_BODY_LIMIT
            } else {
                ERROR_BODY_LIMIT
            };
            let body = read_body(&mut response, limit).await?;
            Ok(HttpResponse {
                status,
                headers,
                body,
            })
        })
    }
}

/// Read at most `limit + 1` bytes, enough for the decoders to tell an
/// oversized body apart.
async fn read_body(response: &mut reqwest::Response, limit: usize) -> reqwest::Result<Vec<u8>> {
    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        body.extend_from_slice(&chunk);
        if body.len() > limit {
            body.truncate(limit + 1);
            break;
        }
    }
    Ok(body)
}

#[derive(Clone)]
/// Wraps the injected transport: targets the configured host, stamps default
/// headers, times the round trip and reports it to the logger.
pub(crate) struct Dispatcher {
    base_url: Url,
    user_agent: HeaderValue,
    transport: Arc<dyn HttpTransport>,
    logger: Arc<dyn Logger>,
}

impl Dispatcher {
    pub(crate) fn new(
        base_url: Url,
        user_agent: HeaderValue,
        transport: Arc<dyn HttpTransport>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            base_url,
            user_agent,
            transport,
            logger,
        }
    }

    pub(crate) fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build a request for `path` (and optional query) on the configured host.
    pub(crate) fn request(&self, method: Method, path: &str, query: Option<&str>) -> HttpRequest {
        let mut url = self.base_url.clone();
        url.set_path(path);
        url.set_query(query);
        url.set_fragment(None);
        HttpRequest::new(method, url)
    }

    pub(crate) async fn round_trip(
        &self,
        mut request: HttpRequest,
        ctx: &CallContext,
    ) -> Result<HttpResponse, PushoverError> {
        self.prepare(&mut request);
        debug!(method = %request.method, url = %request.url, "sending request");

        let start = Utc::now();
        let started = Instant::now();
        let result = match ctx.run(self.transport.round_trip(&request)).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(err)) => Err(PushoverError::Transport(err)),
            Err(err) => Err(err),
        };
        let duration = started.elapsed();

        let round_trip = RoundTrip {
            request: &request,
            response: result.as_ref().ok(),
            error: result
                .as_ref()
                .err()
                .map(|err| err as &(dyn StdError + 'static)),
            start,
            duration,
        };
        if let Err(err) = self.logger.log(&round_trip) {
            warn!(error = %err, "failed to write round-trip log");
        }

        match &result {
            Ok(response) => debug!(
                status = response.status,
                bytes = response.body.len(),
                elapsed_ms = duration.as_millis() as u64,
                "received response"
            ),
            Err(err) => debug!(error = %err, "round trip failed"),
        }
        result
    }

    fn prepare(&self, request: &mut HttpRequest) {
        let mut target = self.base_url.clone();
        target.set_path(request.url.path());
        target.set_query(request.url.query());
        request.url = target;

        let headers = &mut request.headers;
        headers
            .entry(USER_AGENT)
            .or_insert_with(|| self.user_agent.clone());
        headers
            .entry(ACCEPT)
            .or_insert(HeaderValue::from_static(ACCEPT_JSON));
        if !request.body.is_multipart() {
            headers
                .entry(CONTENT_TYPE)
                .or_insert(HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
        }
    }
}
