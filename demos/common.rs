use std::io;
use std::sync::Arc;

use pushover::{JsonLogger, PushoverClient, PushoverClientBuilder, RawLogger, ReqwestTransport};
use tracing_subscriber::EnvFilter;

/// Install a `tracing` subscriber honouring `RUST_LOG` (default `info`).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .compact()
        .init();
}

fn env_flag(key: &str) -> bool {
    std::env::var(key).is_ok_and(|value| matches!(value.as_str(), "1" | "true" | "yes"))
}

/// Build a client from `APP_TOKEN`, `USER_KEY` and `PUSHOVER_URL`.
///
/// `PUSHOVER_INSECURE=1` accepts invalid TLS certificates,
/// `PUSHOVER_VERBOSE=1` logs round trips as JSON to stderr and
/// `PUSHOVER_RAW=1` dumps them in wire format.
pub fn client_from_env() -> Result<PushoverClient, Box<dyn std::error::Error>> {
    let mut builder = PushoverClientBuilder::from_env();
    if env_flag("PUSHOVER_INSECURE") {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .build()?;
        builder = builder.transport(Arc::new(ReqwestTransport::new(http)));
    }
    if env_flag("PUSHOVER_VERBOSE") {
        builder = builder.logger(Arc::new(JsonLogger::new(io::stderr())));
    } else if env_flag("PUSHOVER_RAW") {
        builder = builder.logger(Arc::new(RawLogger::new(io::stderr())));
    }
    Ok(builder.build()?)
}
