//! Art upload.
//!
//! Uploads an image, applies a matte and shows it.
//!
//! Usage:
//!   cargo run --example 002_upload_art -- --host 192.168.1.20 --image photo.jpg

mod common;

use anyhow::Context;
use frame_remote::{Matte, Service, UploadOptions};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = common::Args::parse();
    common::init_logging(args.debug);

    let Some(path) = args.image.clone() else {
        eprintln!("--image <path> is required");
        return Ok(());
    };
    let payload = tokio::fs::read(&path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;

    let client = args.client(&[Service::ArtMode])?;
    client.connect().await?;
    let art = client.art()?;

    println!("[Art] Matte types: {:?}", art.matte_types().await?);
    println!("[Art] Matte colors: {:?}", art.matte_colors().await?);

    let file_name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("upload")
        .to_string();
    let id = art
        .upload(
            &payload,
            UploadOptions::new()
                .with_file_name(file_name)
                .with_matte(Matte::new("shadowbox", "polar")),
        )
        .await
        .context("uploading the image")?;
    println!("[Art] Uploaded as {id}");

    art.set_current_art(&id, None).await?;
    println!("[Art] Now showing {id}");

    client.close().await;
    Ok(())
}
