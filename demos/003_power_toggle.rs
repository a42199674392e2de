//! Power toggle.
//!
//! Holds the power key and reports the REST power state before and after.
//!
//! Usage:
//!   cargo run --example 003_power_toggle -- --host 192.168.1.20

mod common;

use std::time::Duration;

use anyhow::Context;
use frame_remote::{Service};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = common::Args::parse();
    common::init_logging(args.debug);

    let client = args.client(&[Service::RemoteControl, Service::Device])?;
    let device = client.device()?;

    println!("[Power] Before: {}", device.is_on().await?);

    client.connect().await.context("opening the remote channel")?;
    client
        .remote()?
        .toggle_power()
        .await
        .context("toggling power")?;

    tokio::time::sleep(Duration::from_secs(2)).await;
    println!("[Power] After: {}", device.is_on().await?);

    client.close().await;
    Ok(())
}
