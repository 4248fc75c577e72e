//! # seelink
//!
//! Client link layer for Seestar smart telescopes.
//!
//! ## Features
//!
//! - Auto-reconnecting control channel listener with heartbeats
//! - Event state store (latest event per type plus bounded history)
//! - Image streaming sessions with frame synchronization
//! - Live view with auto-stretched frames
//! - One-shot commands and image grabs
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use seelink::{EventStore, Listener, ListenerConfig, StreamConfig, StreamSession};
//!
//! #[tokio::main]
//! async fn main() -> seelink::Result<()> {
//!     let store = Arc::new(EventStore::new());
//!     let listener = Listener::new(ListenerConfig::new("192.168.1.50"), Arc::clone(&store));
//!     listener.start();
//!
//!     let session = StreamSession::start(StreamConfig::new("192.168.1.50"), |header, _payload| {
//!         println!("{}", header);
//!     })
//!     .await?;
//!
//!     tokio::time::sleep(std::time::Duration::from_secs(30)).await;
//!
//!     session.stop().await;
//!     listener.stop().await;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod display;
pub mod error;
pub mod listener;
pub mod store;
pub mod stream;

// Re-exports
pub use client::{build_rtsp_url, get_live_image, get_stacked_image, save_image, Client};
pub use config::{Endpoint, ListenerConfig, SocketOptions, StreamConfig};
pub use display::{DisplayFrame, LiveView};
pub use error::{Error, Result};
pub use listener::{heartbeat_method, Listener, ListenerState};
pub use store::EventStore;
pub use stream::StreamSession;

// Re-export types
pub use seelink_core::{auto_stretch, decode_payload, Frame, FrameHeader, ImageType, PixelArray, Rgb8Image};
pub use seelink_types::{classify, EventKind, EventRecord};
