//! Image channel streaming session
//!
//! A session owns one image channel connection and two tasks:
//!
//! - **heartbeat**: every `heartbeat_interval` sends `test_connection`, or
//!   `get_stacked_img` on even ticks while a live view is open
//! - **reader**: reads frames in wire order and hands each one to the
//!   caller's sink
//!
//! [`StreamSession::live_view`] adds a third task that renders frames for
//! display.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use seelink_core::{
    constants::{methods, SOCKET_BUFFER_SIZE},
    Frame, FrameHeader, Request,
};
use seelink_transport::{connect, read_frame, send_json_line, Endpoint};
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, timeout, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::{
    config::StreamConfig,
    display::{DisplayFrame, LiveView},
    error::{Error, Result},
};

/// Handle to a running image stream
///
/// Cloning yields another handle to the same session.
///
/// # Examples
///
/// ```no_run
/// use seelink::{StreamConfig, StreamSession};
///
/// #[tokio::main]
/// async fn main() -> seelink::Result<()> {
///     let session = StreamSession::start(StreamConfig::new("192.168.1.50"), |header, payload| {
///         println!("{} ({} bytes)", header, payload.len());
///     })
///     .await?;
///
///     tokio::time::sleep(std::time::Duration::from_secs(20)).await;
///     session.stop().await;
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct StreamSession {
    shared: Arc<Shared>,
}

struct Shared {
    config: StreamConfig,
    cancel: CancellationToken,
    stopped: AtomicBool,
    writer: tokio::sync::Mutex<Option<OwnedWriteHalf>>,
    poll_stacked: AtomicBool,
    frames_received: AtomicU64,
    next_id: AtomicU64,
    latest: watch::Sender<Option<Frame>>,
    tasks: parking_lot::Mutex<Vec<JoinHandle<()>>>,
}

impl StreamSession {
    /// Connect, send `begin_streaming` and spawn the session tasks
    ///
    /// `on_frame` is called from the reader task for every frame, in the
    /// order frames arrive, including ack frames with zero dimensions. A
    /// panic inside `on_frame` is logged and drops only that frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be opened or the
    /// `begin_streaming` command cannot be sent.
    pub async fn start<F>(config: StreamConfig, on_frame: F) -> Result<Self>
    where
        F: FnMut(&FrameHeader, Bytes) + Send + 'static,
    {
        let stream = connect(&config.endpoint, &config.socket).await?;
        let (read, mut write) = stream.into_split();

        send_json_line(&mut write, &Request::new(1, methods::BEGIN_STREAMING)).await?;

        info!("Streaming from {}", config.endpoint);

        let (latest, _) = watch::channel(None);
        let shared = Arc::new(Shared {
            config,
            cancel: CancellationToken::new(),
            stopped: AtomicBool::new(false),
            writer: tokio::sync::Mutex::new(Some(write)),
            poll_stacked: AtomicBool::new(false),
            frames_received: AtomicU64::new(0),
            next_id: AtomicU64::new(2),
            latest,
            tasks: parking_lot::Mutex::new(Vec::with_capacity(3)),
        });

        let heartbeat = tokio::spawn(heartbeat_loop(Arc::clone(&shared)));
        let reader = tokio::spawn(read_loop(Arc::clone(&shared), read, on_frame));
        shared.tasks.lock().extend([heartbeat, reader]);

        Ok(Self { shared })
    }

    /// Stop the session
    ///
    /// Cancels both tasks, sends `stop_streaming` (best effort), closes
    /// the socket and waits at most `join_timeout` for the tasks to exit.
    /// Calling it again does nothing.
    pub async fn stop(&self) {
        let shared = &self.shared;
        if shared.stopped.swap(true, Ordering::SeqCst) {
            return;
        }

        info!("Stopping stream from {}", shared.config.endpoint);
        shared.cancel.cancel();

        let join_timeout = shared.config.join_timeout;
        let close = async {
            if let Some(mut writer) = shared.writer.lock().await.take() {
                let request = Request::new(shared.next_id(), methods::STOP_STREAMING);
                if let Err(e) = send_json_line(&mut writer, &request).await {
                    debug!("Could not send stop_streaming: {}", e);
                }
                let _ = writer.shutdown().await;
            }
        };
        if timeout(join_timeout, close).await.is_err() {
            warn!("Closing {} timed out", shared.config.endpoint);
        }

        let tasks = std::mem::take(&mut *shared.tasks.lock());
        if timeout(join_timeout, futures::future::join_all(tasks)).await.is_err() {
            warn!("Stream tasks did not exit within {:?}", join_timeout);
        }

        debug!(
            "Stream from {} stopped after {} frames",
            shared.config.endpoint,
            self.frames_received()
        );
    }

    /// Check if the session is still reading
    pub fn is_running(&self) -> bool {
        !self.shared.cancel.is_cancelled()
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.shared.config.endpoint
    }

    /// Frames read so far, ack frames included
    pub fn frames_received(&self) -> u64 {
        self.shared.frames_received.load(Ordering::Relaxed)
    }

    /// Open a live view
    ///
    /// Switches the heartbeat to polling stacked images, requests one
    /// immediately and renders every following frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotRunning`] if the session has ended.
    pub async fn live_view(&self) -> Result<LiveView> {
        if !self.is_running() {
            return Err(Error::NotRunning);
        }

        let (display, frames) = watch::channel(None);
        let handle = tokio::spawn(display_loop(
            self.shared.config.endpoint.host.clone(),
            self.shared.latest.subscribe(),
            display,
            self.shared.cancel.clone(),
        ));
        self.shared.tasks.lock().push(handle);

        self.set_poll_stacked(true);
        if let Err(e) = self.shared.send(methods::GET_STACKED_IMG).await {
            debug!("Initial get_stacked_img failed: {}", e);
        }

        Ok(LiveView::new(self.clone(), frames))
    }

    pub(crate) fn set_poll_stacked(&self, enabled: bool) {
        self.shared.poll_stacked.store(enabled, Ordering::Relaxed);
    }
}

impl Shared {
    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    async fn send(&self, method: &str) -> Result<()> {
        let mut writer = self.writer.lock().await;
        let writer = writer.as_mut().ok_or(Error::NotRunning)?;

        send_json_line(writer, &Request::new(self.next_id(), method)).await?;
        Ok(())
    }
}

async fn heartbeat_loop(shared: Arc<Shared>) {
    let period = shared.config.heartbeat_interval;
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut tick = 0u64;
    loop {
        tokio::select! {
            _ = shared.cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let method = if shared.poll_stacked.load(Ordering::Relaxed) && tick % 2 == 0 {
            methods::GET_STACKED_IMG
        } else {
            methods::TEST_CONNECTION
        };

        let sent = tokio::select! {
            _ = shared.cancel.cancelled() => break,
            sent = shared.send(method) => sent,
        };
        if let Err(e) = sent {
            debug!("Heartbeat stopped: {}", e);
            break;
        }
        tick += 1;
    }
}

async fn read_loop<F>(shared: Arc<Shared>, read: OwnedReadHalf, mut on_frame: F)
where
    F: FnMut(&FrameHeader, Bytes) + Send + 'static,
{
    // Without a reader the session is over
    let _session = shared.cancel.clone().drop_guard();
    let mut reader = BufReader::with_capacity(SOCKET_BUFFER_SIZE as usize, read);

    loop {
        let result = tokio::select! {
            _ = shared.cancel.cancelled() => break,
            result = read_frame(&mut reader) => result,
        };

        match result {
            Ok(frame) => {
                let count = shared.frames_received.fetch_add(1, Ordering::Relaxed) + 1;
                trace!(image_id = frame.header.image_id, "Frame #{}: {}", count, frame.header);

                let payload = frame.payload.clone();
                if let Err(panic) = catch_unwind(AssertUnwindSafe(|| on_frame(&frame.header, payload))) {
                    warn!("Frame callback panicked on {}: {}", frame.header, panic_message(&*panic));
                }
                shared.latest.send_replace(Some(frame));
            }
            Err(e) if e.is_connection_error() => {
                if !shared.cancel.is_cancelled() {
                    warn!("Stream read error from {}: {}", shared.config.endpoint, e);
                }
                break;
            }
            Err(e) => warn!("Dropping frame from {}: {}", shared.config.endpoint, e),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic")
}

async fn display_loop(
    host: String,
    mut frames: watch::Receiver<Option<Frame>>,
    display: watch::Sender<Option<Arc<DisplayFrame>>>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            changed = frames.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }

        let Some(frame) = frames.borrow_and_update().clone() else {
            continue;
        };

        let host = host.clone();
        match tokio::task::spawn_blocking(move || DisplayFrame::render(&host, &frame)).await {
            Ok(Ok(rendered)) => {
                display.send_replace(Some(Arc::new(rendered)));
            }
            Ok(Err(e)) if e.is_frame_local() => trace!("Not displaying frame: {}", e),
            Ok(Err(e)) => warn!("Cannot render frame: {}", e),
            Err(e) => {
                warn!("Render task failed: {}", e);
                break;
            }
        }
    }
}
