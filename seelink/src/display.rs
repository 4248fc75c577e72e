//! Live display of a streaming session

use std::sync::Arc;

use seelink_core::{auto_stretch, Frame, FrameHeader, Rgb8Image};
use tokio::sync::watch;

use crate::stream::StreamSession;

/// One stretched frame ready to present
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayFrame {
    pub header: FrameHeader,
    pub image: Rgb8Image,
    pub title: String,
}

impl DisplayFrame {
    /// Decode and auto-stretch `frame`
    ///
    /// # Errors
    ///
    /// Fails for ack frames (zero dimensions) and undecodable payloads.
    pub fn render(host: &str, frame: &Frame) -> seelink_core::Result<Self> {
        let pixels = frame.decode()?;

        Ok(Self {
            header: frame.header,
            image: auto_stretch(&pixels),
            title: display_title(host, &frame.header),
        })
    }
}

/// Window title for a frame
pub fn display_title(host: &str, header: &FrameHeader) -> String {
    format!(
        "Seestar {}  |  {}x{}  |  frame {}  |  {}",
        host,
        header.width,
        header.height,
        header.image_id,
        header.image_type()
    )
}

/// Presentation buffer fed by a [`StreamSession`]
///
/// Holds the most recent rendered frame. A render loop polls
/// [`latest`](Self::latest) on its own tick or awaits
/// [`changed`](Self::changed). Closing the view stops the session.
pub struct LiveView {
    session: StreamSession,
    frames: watch::Receiver<Option<Arc<DisplayFrame>>>,
}

impl LiveView {
    pub(crate) fn new(
        session: StreamSession,
        frames: watch::Receiver<Option<Arc<DisplayFrame>>>,
    ) -> Self {
        Self { session, frames }
    }

    /// Most recent frame, if any was rendered yet
    pub fn latest(&self) -> Option<Arc<DisplayFrame>> {
        self.frames.borrow().clone()
    }

    /// Wait for the next rendered frame
    ///
    /// Returns `None` once the session has stopped.
    pub async fn changed(&mut self) -> Option<Arc<DisplayFrame>> {
        loop {
            self.frames.changed().await.ok()?;
            if let Some(frame) = self.frames.borrow_and_update().clone() {
                return Some(frame);
            }
        }
    }

    /// Title of the most recent frame
    pub fn title(&self) -> Option<String> {
        self.frames.borrow().as_ref().map(|frame| frame.title.clone())
    }

    pub fn session(&self) -> &StreamSession {
        &self.session
    }

    /// Stop polling stacked images and stop the session
    pub async fn close(self) {
        self.session.set_poll_stacked(false);
        self.session.stop().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use seelink_core::ImageType;

    #[test]
    fn test_display_title() {
        let header = FrameHeader::new(ImageType::Stacked, 1080, 1920, 0).with_image_id(12);

        assert_eq!(
            display_title("192.168.1.50", &header),
            "Seestar 192.168.1.50  |  1080x1920  |  frame 12  |  stacked"
        );
    }

    #[test]
    fn test_render_mono_frame() {
        let header = FrameHeader::new(ImageType::Preview, 2, 1, 4);
        let frame = Frame::new(header, vec![0x00, 0x10, 0x00, 0x20]);

        let rendered = DisplayFrame::render("scope", &frame).unwrap();

        assert_eq!((rendered.image.height, rendered.image.width), (1, 2));
        assert_eq!(rendered.image.data.len(), 6);
        assert!(rendered.title.ends_with("preview"));
    }

    #[test]
    fn test_render_rejects_ack_frame() {
        let frame = Frame::new(FrameHeader::new(ImageType::Preview, 0, 0, 0), Vec::new());
        let err = DisplayFrame::render("scope", &frame).unwrap_err();

        assert!(err.is_frame_local());
    }
}
