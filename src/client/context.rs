use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::client::PushoverError;

#[derive(Debug, Clone, Default)]
/// Per-call cancellation and deadline.
///
/// The default context never cancels and has no timeout of its own (the
/// transport may still enforce one).
pub struct CallContext {
    cancellation: Option<CancellationToken>,
    timeout: Option<Duration>,
}

impl CallContext {
    /// No cancellation and no deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Abort the round trip when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Abort the round trip once `timeout` has elapsed.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Deadline applied to each round trip, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Drive `fut` to completion unless the context is cancelled or times out
    /// first; the future is dropped in that case.
    pub(crate) async fn run<F: Future>(&self, fut: F) -> Result<F::Output, PushoverError> {
        let bounded = async {
            match self.timeout {
                Some(limit) => tokio::time::timeout(limit, fut)
                    .await
                    .map_err(|_| PushoverError::Timeout(limit)),
                None => Ok(fut.await),
            }
        };

        match &self.cancellation {
            Some(token) => tokio::select! {
                biased;
                () = token.cancelled() => Err(PushoverError::Cancelled),
                out = bounded => out,
            },
            None => bounded.await,
        }
    }
}
