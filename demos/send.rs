use std::io;
use std::path::PathBuf;
use std::time::Duration;

use pushover::{CallContext, Message, Priority};
use tokio_util::sync::CancellationToken;

mod common;

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    common::init_tracing();

    let text = optional_env("PUSHOVER_MESSAGE").ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            "PUSHOVER_MESSAGE environment variable is required",
        )
    })?;
    let priority = match optional_env("PUSHOVER_PRIORITY") {
        Some(value) => value.parse::<Priority>()?,
        None => Priority::Normal,
    };

    let message = Message {
        title: optional_env("PUSHOVER_TITLE"),
        devices: optional_env("PUSHOVER_DEVICE")
            .map(|value| value.split(',').map(str::to_owned).collect())
            .unwrap_or_default(),
        url: optional_env("PUSHOVER_URL_LINK"),
        sound: optional_env("PUSHOVER_SOUND"),
        attachment: optional_env("PUSHOVER_ATTACHMENT").map(PathBuf::from),
        priority,
        retry: Some(Duration::from_secs(30)),
        expire: Some(Duration::from_secs(5 * 60)),
        ..Message::new(text)
    };

    let client = common::client_from_env()?;

    // Ctrl-C aborts the pending request.
    let token = CancellationToken::new();
    let on_interrupt = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });
    let ctx = CallContext::new()
        .with_cancellation(token)
        .with_timeout(Duration::from_secs(30));

    let response = client.send(&message, &ctx).await?;
    println!(
        "status: {}, request: {}, receipt: {}",
        response.status,
        response.request.as_deref().unwrap_or("-"),
        response.receipt.as_deref().unwrap_or("-"),
    );

    let limits = client.last_limits();
    if limits.limit > 0 {
        println!("remaining: {}/{}", limits.remaining, limits.limit);
    }
    Ok(())
}
