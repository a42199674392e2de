//! Device information.
//!
//! Reads the REST device description and the art-mode state.
//!
//! Usage:
//!   cargo run --example 001_device_info -- --host 192.168.1.20
//!   cargo run --example 001_device_info -- --host 192.168.1.20 --debug

mod common;

use anyhow::Context;
use frame_remote::{Service};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = common::Args::parse();
    common::init_logging(args.debug);

    let client = args.client(&[Service::Device, Service::ArtMode])?;

    let info = client
        .device()?
        .device_info()
        .await
        .context("reading device info")?;
    println!("[Device] {} ({})", info.name, info.device.model_name);
    println!("[Device] Frame TV: {}", info.is_frame_tv());
    println!("[Device] Power: {}", if info.is_on() { "on" } else { "standby" });

    if !info.is_on() {
        println!("[Device] Skipping art-mode queries while in standby");
        return Ok(());
    }

    client.connect().await.context("opening the art channel")?;
    let art = client.art()?;

    println!("[Art] API version: {}", art.api_version().await?);
    println!("[Art] In art mode: {}", art.in_art_mode().await?);
    println!("[Art] Brightness: {}", art.brightness().await?);

    let current = art.current_art().await?;
    println!("[Art] Current: {} (matte {:?})", current.id, current.matte);

    let pieces = art.available_art().await?;
    println!("[Art] {} pieces available", pieces.len());

    client.close().await;
    Ok(())
}
