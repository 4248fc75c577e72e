//! One-shot commands and image grabs
//!
//! Each call opens its own short-lived socket, independent of any running
//! listener or session.

use std::path::Path;
use std::time::Duration;

use seelink_core::{
    constants::{methods, DEFAULT_CONNECT_TIMEOUT},
    encode_image, Frame, FrameHeader, ImageFormat, Request, Response,
};
use seelink_transport::{call, connect, read_frame, send_json_line, Endpoint, SocketOptions, TcpTransport, Transport};
use serde_json::Value;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::time::timeout;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Control channel command client
///
/// # Examples
///
/// ```no_run
/// use seelink::Client;
///
/// #[tokio::main]
/// async fn main() -> seelink::Result<()> {
///     let client = Client::new("192.168.1.50");
///     let response = client.send_command("get_device_state", None).await?;
///     println!("{:?}", response.result);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Client {
    endpoint: Endpoint,
    options: SocketOptions,
    read_timeout: Duration,
}

impl Client {
    /// Client for the control port of `host`
    pub fn new(host: impl Into<String>) -> Self {
        Self::with_endpoint(Endpoint::control(host))
    }

    pub fn with_endpoint(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            options: SocketOptions::default(),
            read_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Set response timeout
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_socket_options(mut self, options: SocketOptions) -> Self {
        self.options = options;
        self
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Send one command and wait for its response line
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidResponse`] if the reply is not a JSON-RPC
    /// response, and a transport error if the device cannot be reached or
    /// does not answer within the read timeout.
    pub async fn send_command(&self, method: &str, params: Option<Value>) -> Result<Response> {
        let mut request = Request::new(1, method).verified();
        if let Some(params) = params {
            request = request.with_params(params);
        }

        debug!("Sending {} to {}", request, self.endpoint);

        let mut transport = TcpTransport::new(self.endpoint.clone()).with_options(self.options.clone());
        let reply = call(&mut transport, &request, self.read_timeout).await;
        transport.disconnect().await?;

        let line = reply?;
        Response::parse(&line).map_err(|_| Error::InvalidResponse(line))
    }
}

/// Grab one frame from an image channel
///
/// Connects, sends `method` (`get_stacked_img` or `get_current_img`),
/// reads the first frame and disconnects.
pub async fn get_live_image(endpoint: &Endpoint, method: &str) -> Result<Frame> {
    let options = SocketOptions::default();
    let stream = connect(endpoint, &options).await?;
    let (read, mut write) = stream.into_split();

    send_json_line(&mut write, &Request::new(1, method)).await?;

    let mut reader = BufReader::new(read);
    let frame = timeout(options.connect_timeout, read_frame(&mut reader))
        .await
        .map_err(|_| seelink_transport::Error::ReadTimeout)??;
    let _ = write.shutdown().await;

    info!("Grabbed {} from {}", frame.header, endpoint);

    Ok(frame)
}

/// Grab the current stacked image
pub async fn get_stacked_image(endpoint: &Endpoint) -> Result<Frame> {
    get_live_image(endpoint, methods::GET_STACKED_IMG).await
}

/// Decode `payload` and write it to `path`
///
/// The format follows the extension: `.fits`/`.fit` keep the full 16-bit
/// data, raster extensions (`.png`, `.jpg`, `.tiff`, `.ppm`, ...) are 8-bit
/// and auto-stretched when `stretch` is set.
pub fn save_image(payload: &[u8], header: &FrameHeader, path: impl AsRef<Path>, stretch: bool) -> Result<()> {
    let path = path.as_ref();
    let format = ImageFormat::from_path(path)?;
    let encoded = encode_image(payload, header, format, stretch)?;

    std::fs::write(path, encoded)?;
    debug!("Saved {} to {}", header, path.display());

    Ok(())
}

/// RTSP URL of a live video feed (port 4554 telephoto, 4555 wide)
pub fn build_rtsp_url(host: &str, port: u16) -> String {
    format!("rtsp://{}:{}/stream", host, port)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use seelink_core::{constants::RTSP_PORT, ImageType};
    use tokio::io::AsyncBufReadExt;
    use tokio::net::TcpListener;

    async fn spawn_device(reply: &'static [u8]) -> (u16, tokio::task::JoinHandle<String>) {
        let device = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = device.local_addr().unwrap().port();

        let handle = tokio::spawn(async move {
            let (socket, _) = device.accept().await.unwrap();
            let (read, mut write) = socket.into_split();
            let mut lines = tokio::io::BufReader::new(read).lines();
            let request = lines.next_line().await.unwrap().unwrap();
            write.write_all(reply).await.unwrap();
            request
        });

        (port, handle)
    }

    #[tokio::test]
    async fn test_send_command() {
        let (port, device) = spawn_device(
            b"{\"jsonrpc\":\"2.0\",\"Timestamp\":\"12.5\",\"method\":\"scope_get_equ_coord\",\"result\":{\"ra\":5.59,\"dec\":-5.39},\"code\":0,\"id\":1}\r\n",
        )
        .await;

        let client = Client::with_endpoint(Endpoint::new("127.0.0.1", port));
        let response = client.send_command("scope_get_equ_coord", None).await.unwrap();

        assert!(response.is_success());
        assert_eq!(response.result.unwrap()["ra"], 5.59);

        let request: Value = serde_json::from_str(&device.await.unwrap()).unwrap();
        assert_eq!(request, serde_json::json!({"id": 1, "verify": true, "method": "scope_get_equ_coord"}));
    }

    #[tokio::test]
    async fn test_send_command_invalid_response() {
        let (port, _device) = spawn_device(b"<html>busy</html>\r\n").await;

        let client = Client::with_endpoint(Endpoint::new("127.0.0.1", port));
        let result = client.send_command("test_connection", None).await;

        assert!(matches!(result, Err(Error::InvalidResponse(line)) if line.contains("busy")));
    }

    #[tokio::test]
    async fn test_send_command_timeout() {
        let device = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = device.local_addr().unwrap().port();
        let _device = tokio::spawn(async move {
            let (socket, _) = device.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(socket);
        });

        let client = Client::with_endpoint(Endpoint::new("127.0.0.1", port))
            .with_read_timeout(Duration::from_millis(50));
        let result = client.send_command("test_connection", None).await;

        assert!(matches!(result, Err(Error::Transport(seelink_transport::Error::ReadTimeout))));
    }

    #[tokio::test]
    async fn test_get_live_image() {
        let device = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = device.local_addr().unwrap().port();

        tokio::spawn(async move {
            let (socket, _) = device.accept().await.unwrap();
            let (read, mut write) = socket.into_split();
            let mut lines = tokio::io::BufReader::new(read).lines();
            let request = lines.next_line().await.unwrap().unwrap();
            assert!(request.contains("get_current_img"));

            let header = FrameHeader::new(ImageType::Preview, 1, 2, 4).with_image_id(3);
            let mut out = b"{\"jsonrpc\":\"2.0\",\"method\":\"get_current_img\",\"result\":0}\r\n".to_vec();
            out.extend_from_slice(&Frame::new(header, vec![1, 0, 2, 0]).encode());
            write.write_all(&out).await.unwrap();
        });

        let frame = get_live_image(&Endpoint::new("127.0.0.1", port), methods::GET_CURRENT_IMG)
            .await
            .unwrap();

        assert_eq!(frame.header.image_id, 3);
        assert_eq!(&frame.payload[..], &[1, 0, 2, 0]);
    }

    #[test]
    fn test_save_image_formats() {
        let dir = tempfile::tempdir().unwrap();
        let header = FrameHeader::new(ImageType::Preview, 2, 1, 4);
        let payload = [0x00, 0x10, 0x00, 0x20];

        let fits = dir.path().join("frame.fits");
        save_image(&payload, &header, &fits, false).unwrap();
        let written = std::fs::read(&fits).unwrap();
        assert_eq!(written.len() % 2880, 0);
        assert!(written.starts_with(b"SIMPLE  ="));

        let png = dir.path().join("frame.png");
        save_image(&payload, &header, &png, true).unwrap();
        let decoded = image::open(&png).unwrap().into_rgb8();
        assert_eq!(decoded.dimensions(), (2, 1));
        assert_eq!(decoded.get_pixel(0, 0).0, [0, 0, 0]);
        assert_eq!(decoded.get_pixel(1, 0).0, [255, 255, 255]);

        let ppm = dir.path().join("frame.ppm");
        save_image(&payload, &header, &ppm, false).unwrap();
        assert!(std::fs::read(&ppm).unwrap().starts_with(b"P6"));

        let unknown = dir.path().join("frame.xyz");
        assert!(matches!(
            save_image(&payload, &header, &unknown, true),
            Err(Error::Core(seelink_core::Error::UnsupportedFormat(_)))
        ));
        assert!(!unknown.exists());
    }

    #[test]
    fn test_build_rtsp_url() {
        assert_eq!(build_rtsp_url("192.168.1.50", RTSP_PORT), "rtsp://192.168.1.50:4554/stream");
    }
}
