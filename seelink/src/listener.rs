//! Control channel listener
//!
//! Keeps one connection to the control port open for as long as it runs,
//! sending heartbeats and recording every pushed event into an
//! [`EventStore`].
//!
//! # State Machine
//!
//! ```text
//!            start()
//!               │
//!               ▼
//!   ┌──▶ Connecting ──error──┐
//!   │           │            │
//!   │           ▼            ▼
//!   │      Connected ──▶ Disconnected ──stop()──▶ (task exits)
//!   │                        │
//!   └────reconnect_delay─────┘
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::StreamExt;
use parking_lot::{Mutex, RwLock};
use seelink_core::{
    constants::{methods, JOIN_TIMEOUT},
    Request,
};
use seelink_transport::{connect, send_json_line, JsonLineCodec};
use seelink_types::classify;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, timeout, MissedTickBehavior};
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::{
    config::ListenerConfig,
    error::{Error, Result},
    store::EventStore,
};

/// Connection state of the listener
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Disconnected,
    Connecting,
    Connected,
}

/// Heartbeat method for tick `tick` (counted from 0)
///
/// Device and app state are refreshed every tenth tick; the remaining
/// ticks alternate coordinate queries.
pub fn heartbeat_method(tick: u64) -> &'static str {
    match tick % 10 {
        0 => methods::GET_DEVICE_STATE,
        4 => methods::GET_APP_STATE,
        _ if tick % 3 == 0 => methods::GET_EQU_COORD,
        _ => methods::GET_HORIZ_COORD,
    }
}

struct Running {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Auto-reconnecting control channel listener
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use seelink::{EventStore, Listener, ListenerConfig};
///
/// #[tokio::main]
/// async fn main() {
///     let store = Arc::new(EventStore::new());
///     let listener = Listener::new(ListenerConfig::new("192.168.1.50"), Arc::clone(&store));
///
///     listener.start();
///     tokio::time::sleep(std::time::Duration::from_secs(30)).await;
///     listener.stop().await;
///
///     for (kind, event) in store.snapshot() {
///         println!("{}: {:?}", kind, event.state());
///     }
/// }
/// ```
pub struct Listener {
    config: ListenerConfig,
    store: Arc<EventStore>,
    state: Arc<RwLock<ListenerState>>,
    running: Mutex<Option<Running>>,
}

impl Listener {
    pub fn new(config: ListenerConfig, store: Arc<EventStore>) -> Self {
        Self {
            config,
            store,
            state: Arc::new(RwLock::new(ListenerState::Disconnected)),
            running: Mutex::new(None),
        }
    }

    /// Start the background task; no-op if already running
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) {
        let mut running = self.running.lock();
        if running.is_some() {
            debug!("Listener for {} already running", self.config.endpoint);
            return;
        }

        info!("Starting listener for {}", self.config.endpoint);

        let cancel = CancellationToken::new();
        let worker = Worker {
            config: self.config.clone(),
            store: Arc::clone(&self.store),
            state: Arc::clone(&self.state),
            cancel: cancel.clone(),
            next_id: AtomicU64::new(1),
        };
        let handle = tokio::spawn(worker.run());

        *running = Some(Running { cancel, handle });
    }

    /// Stop the background task and wait for it; no-op if not running
    pub async fn stop(&self) {
        let Some(running) = self.running.lock().take() else {
            return;
        };

        info!("Stopping listener for {}", self.config.endpoint);
        running.cancel.cancel();

        if timeout(JOIN_TIMEOUT, running.handle).await.is_err() {
            warn!("Listener task did not exit in time");
        }
        *self.state.write() = ListenerState::Disconnected;
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }

    pub fn state(&self) -> ListenerState {
        *self.state.read()
    }

    pub fn store(&self) -> &Arc<EventStore> {
        &self.store
    }

    pub fn config(&self) -> &ListenerConfig {
        &self.config
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        if let Some(running) = self.running.get_mut().take() {
            warn!("Listener dropped while running");
            running.cancel.cancel();
        }
    }
}

struct Worker {
    config: ListenerConfig,
    store: Arc<EventStore>,
    state: Arc<RwLock<ListenerState>>,
    cancel: CancellationToken,
    next_id: AtomicU64,
}

impl Worker {
    async fn run(self) {
        loop {
            self.set_state(ListenerState::Connecting);

            let connected = tokio::select! {
                _ = self.cancel.cancelled() => break,
                result = connect(&self.config.endpoint, &self.config.socket) => result,
            };

            match connected {
                Ok(stream) => {
                    self.set_state(ListenerState::Connected);
                    info!("Listening on {}", self.config.endpoint);

                    let (read, write) = stream.into_split();
                    match self.serve(read, write).await {
                        Ok(()) => {}
                        Err(e) => warn!("Control connection to {} lost: {}", self.config.endpoint, e),
                    }
                }
                Err(e) => warn!("Cannot connect to {}: {}", self.config.endpoint, e),
            }

            self.set_state(ListenerState::Disconnected);

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = sleep(self.config.reconnect_delay) => {
                    debug!("Reconnecting to {}", self.config.endpoint);
                }
            }
        }

        self.set_state(ListenerState::Disconnected);
        debug!("Listener for {} exited", self.config.endpoint);
    }

    /// Run heartbeat and reader until either fails or the listener stops
    async fn serve(&self, read: OwnedReadHalf, write: OwnedWriteHalf) -> Result<()> {
        let lines = FramedRead::new(read, JsonLineCodec::with_max_length(self.config.max_line_length));

        tokio::select! {
            _ = self.cancel.cancelled() => Ok(()),
            result = self.heartbeat(write) => result,
            result = self.read_events(lines) => result,
        }
    }

    async fn heartbeat(&self, mut write: OwnedWriteHalf) -> Result<()> {
        let mut ticker = interval(self.config.heartbeat_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut tick = 0u64;
        loop {
            ticker.tick().await;

            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            let request = Request::new(id, heartbeat_method(tick));
            send_json_line(&mut write, &request).await?;

            tick += 1;
        }
    }

    async fn read_events(&self, mut lines: FramedRead<OwnedReadHalf, JsonLineCodec>) -> Result<()> {
        while let Some(line) = lines.next().await {
            self.handle_line(&line?);
        }

        Err(Error::Transport(seelink_transport::Error::ConnectionClosed {
            received: 0,
            expected: 1,
        }))
    }

    fn handle_line(&self, line: &str) {
        if line.trim().is_empty() {
            return;
        }

        match classify(line) {
            Ok(Some(record)) => {
                trace!("Event {}", record.kind);
                self.store.record(record);
            }
            Ok(None) => debug!("Ignoring untagged message: {}", line),
            Err(e) => warn!("Discarding malformed line ({}): {}", e, line),
        }
    }

    fn set_state(&self, state: ListenerState) {
        *self.state.write() = state;
    }
}
