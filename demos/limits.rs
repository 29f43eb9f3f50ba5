use std::time::Duration;

use pushover::CallContext;

mod common;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    common::init_tracing();

    let client = common::client_from_env()?;
    let ctx = CallContext::new().with_timeout(Duration::from_secs(15));
    let limits = client.limits(&ctx).await?;

    println!("limit: {}", limits.limit);
    println!("remaining: {}", limits.remaining);
    match limits.reset_time {
        Some(reset) => println!("reset: {reset}"),
        None => println!("reset: -"),
    }
    Ok(())
}
