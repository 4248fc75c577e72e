//! Control channel listener example

use std::sync::Arc;
use std::time::Duration;

use seelink::{Endpoint, EventKind, EventStore, Listener, ListenerConfig};
use seelink_types::events::PiStatus;
use tokio::time::sleep;

#[tokio::main]
async fn main() -> seelink::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let ip = match std::env::var("DEVICE_IP") {
        Ok(ip) => ip,
        Err(_) => Endpoint::discover(seelink_core::constants::CONTROL_PORT).await.host,
    };

    let store = Arc::new(EventStore::new());
    let listener = Listener::new(ListenerConfig::new(ip), Arc::clone(&store));
    listener.start();

    for _ in 0..6 {
        sleep(Duration::from_secs(5)).await;

        println!("State: {:?}, {} event types seen", listener.state(), store.len());
        if let Some(event) = store.latest(&EventKind::PiStatus) {
            let status: PiStatus = event.decode()?;
            println!(
                "  battery {:?}%, temp {:?}C",
                status.battery_capacity, status.temp
            );
        }
    }

    listener.stop().await;

    for event in store.history().iter().rev().take(10) {
        println!("{} {} {:?}", event.received_at.format("%H:%M:%S"), event.kind, event.state());
    }

    Ok(())
}
