//! Image streaming example: live view plus a saved snapshot

use std::time::Duration;

use anyhow::Context;
use seelink::{get_stacked_image, save_image, Endpoint, StreamConfig, StreamSession};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let ip = match std::env::var("DEVICE_IP") {
        Ok(ip) => ip,
        Err(_) => Endpoint::discover(seelink_core::constants::IMAGE_PORT).await.host,
    };
    let config = StreamConfig::new(ip);

    // One-shot grab
    let frame = get_stacked_image(&config.endpoint)
        .await
        .context("grabbing stacked image")?;
    if frame.header.is_empty() {
        println!("No stacked image yet ({})", frame.header);
    } else {
        save_image(&frame.payload, &frame.header, "stacked.fits", false)?;
        save_image(&frame.payload, &frame.header, "stacked.png", true)?;
        println!("Saved stacked.fits and stacked.png");
    }

    // Persistent stream with a live view
    let session = StreamSession::start(config, |header, payload| {
        println!("{} ({} bytes)", header, payload.len());
    })
    .await?;

    let mut view = session.live_view().await?;
    let deadline = tokio::time::sleep(Duration::from_secs(60));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            frame = view.changed() => match frame {
                Some(frame) => println!("{}", frame.title),
                None => break,
            },
        }
    }

    println!("Received {} frames", session.frames_received());
    view.close().await;

    Ok(())
}
