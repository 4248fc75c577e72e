//! TCP connections to the device

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use seelink_core::{
    constants::{
        CONTROL_PORT, DEFAULT_CONNECT_TIMEOUT, DISCOVERY_HOST, DISCOVERY_TIMEOUT, FALLBACK_HOST, IMAGE_PORT,
        SOCKET_BUFFER_SIZE,
    },
    Request,
};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpSocket, TcpStream};
use tokio::time::timeout;
use tokio_util::codec::Framed;
use tracing::{debug, info, trace, warn};

use crate::{error::*, line::JsonLineCodec, Transport};

/// Device address and port
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Control channel of `host`
    pub fn control(host: impl Into<String>) -> Self {
        Self::new(host, CONTROL_PORT)
    }

    /// Telephoto image channel of `host`
    pub fn image(host: impl Into<String>) -> Self {
        Self::new(host, IMAGE_PORT)
    }

    /// Same host, another port
    pub fn with_port(&self, port: u16) -> Self {
        Self::new(self.host.clone(), port)
    }

    /// Resolve to the first socket address
    pub async fn resolve(&self) -> Result<SocketAddr> {
        let addr_str = self.to_string();

        tokio::net::lookup_host(&addr_str)
            .await
            .map_err(|e| Error::InvalidAddress(format!("{}: {}", addr_str, e)))?
            .next()
            .ok_or_else(|| Error::InvalidAddress(format!("No addresses found for {}", addr_str)))
    }
}

impl Endpoint {
    /// Find the device on the local network
    ///
    /// Resolves `seestar.local` and falls back to the hotspot address
    /// (10.0.0.1) when the name does not resolve within two seconds.
    pub async fn discover(port: u16) -> Self {
        Self::discover_host(DISCOVERY_HOST, port).await
    }

    async fn discover_host(name: &str, port: u16) -> Self {
        let candidate = Self::new(name, port);

        match timeout(DISCOVERY_TIMEOUT, candidate.resolve()).await {
            Ok(Ok(addr)) => {
                info!("Found {} at {}", name, addr.ip());
                Self::new(addr.ip().to_string(), port)
            }
            Ok(Err(e)) => {
                debug!("Discovery failed ({}), using {}", e, FALLBACK_HOST);
                Self::new(FALLBACK_HOST, port)
            }
            Err(_) => {
                debug!("Resolving {} timed out, using {}", name, FALLBACK_HOST);
                Self::new(FALLBACK_HOST, port)
            }
        }
    }
}

impl Default for Endpoint {
    /// Control channel of the device's own hotspot
    fn default() -> Self {
        Self::control(FALLBACK_HOST)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Options applied to every device socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketOptions {
    pub connect_timeout: Duration,
    pub nodelay: bool,
    pub keepalive: bool,
    pub send_buffer_size: u32,
    pub recv_buffer_size: u32,
}

impl Default for SocketOptions {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            nodelay: true,
            keepalive: true,
            send_buffer_size: SOCKET_BUFFER_SIZE,
            recv_buffer_size: SOCKET_BUFFER_SIZE,
        }
    }
}

impl SocketOptions {
    /// Set connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set both socket buffer sizes
    pub fn with_buffer_size(mut self, size: u32) -> Self {
        self.send_buffer_size = size;
        self.recv_buffer_size = size;
        self
    }

    pub fn with_keepalive(mut self, keepalive: bool) -> Self {
        self.keepalive = keepalive;
        self
    }
}

/// Open a TCP connection with `options` applied
///
/// # Errors
///
/// Returns [`Error::InvalidAddress`] if the host does not resolve and
/// [`Error::ConnectionTimeout`] if the connect does not finish within
/// `options.connect_timeout`.
pub async fn connect(endpoint: &Endpoint, options: &SocketOptions) -> Result<TcpStream> {
    let addr = endpoint.resolve().await?;

    debug!("Connecting to {}...", addr);

    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_keepalive(options.keepalive)?;
    socket.set_send_buffer_size(options.send_buffer_size)?;
    socket.set_recv_buffer_size(options.recv_buffer_size)?;

    let stream = timeout(options.connect_timeout, socket.connect(addr))
        .await
        .map_err(|_| Error::ConnectionTimeout)?
        .map_err(Error::Io)?;

    // Disable Nagle's algorithm for low latency
    stream.set_nodelay(options.nodelay)?;

    debug!("Connected to {}", addr);

    Ok(stream)
}

/// Request/response transport over the control channel
pub struct TcpTransport {
    endpoint: Endpoint,
    options: SocketOptions,
    socket_addr: Option<SocketAddr>,
    framed: Option<Framed<TcpStream, JsonLineCodec>>,
}

impl TcpTransport {
    /// Create new TCP transport
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            options: SocketOptions::default(),
            socket_addr: None,
            framed: None,
        }
    }

    /// Set connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.options.connect_timeout = timeout;
        self
    }

    /// Replace all socket options
    pub fn with_options(mut self, options: SocketOptions) -> Self {
        self.options = options;
        self
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn connect(&mut self) -> Result<()> {
        if self.is_connected() {
            return Err(Error::AlreadyConnected);
        }

        let stream = connect(&self.endpoint, &self.options).await?;
        self.socket_addr = stream.peer_addr().ok();
        self.framed = Some(Framed::new(stream, JsonLineCodec::new()));

        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        if let Some(framed) = self.framed.take() {
            debug!("Disconnecting from {}...", self.remote_addr());

            // Graceful shutdown
            let _ = framed.into_inner().shutdown().await;
        }

        self.socket_addr = None;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.framed.is_some()
    }

    async fn send(&mut self, request: &Request) -> Result<()> {
        let framed = self.framed.as_mut().ok_or(Error::NotConnected)?;

        trace!("Sending {} to {}", request, self.endpoint);

        framed.send(request).await
    }

    async fn receive_line(&mut self, read_timeout: Duration) -> Result<String> {
        let framed = self.framed.as_mut().ok_or(Error::NotConnected)?;

        loop {
            let line = timeout(read_timeout, framed.next())
                .await
                .map_err(|_| Error::ReadTimeout)?
                .ok_or(Error::ConnectionClosed { received: 0, expected: 1 })??;

            if !line.trim().is_empty() {
                trace!("Received {} bytes: {}", line.len(), hex::encode(&line.as_bytes()[..line.len().min(16)]));
                return Ok(line);
            }
        }
    }

    fn remote_addr(&self) -> String {
        self.socket_addr
            .map(|addr| addr.to_string())
            .unwrap_or_else(|| self.endpoint.to_string())
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        if self.is_connected() {
            warn!("TCP transport dropped while still connected");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_tcp_transport_create() {
        let transport = TcpTransport::new(Endpoint::control("192.168.1.201"));
        assert!(!transport.is_connected());
        assert_eq!(transport.remote_addr(), "192.168.1.201:4700");
    }

    #[tokio::test]
    async fn test_tcp_transport_invalid_address() {
        let mut transport = TcpTransport::new(Endpoint::new("invalid..address", 4700))
            .with_connect_timeout(Duration::from_millis(100));

        let result = transport.connect().await;
        assert!(result.is_err());
    }

    #[test]
    fn test_endpoint_defaults() {
        assert_eq!(Endpoint::default().to_string(), "10.0.0.1:4700");
        assert_eq!(Endpoint::image("seestar.local").with_port(4804).port, 4804);
        assert_eq!(SocketOptions::default().send_buffer_size, 65536);
    }

    #[tokio::test]
    async fn test_discover_resolves_name() {
        let endpoint = Endpoint::discover_host("127.0.0.1", CONTROL_PORT).await;
        assert_eq!(endpoint, Endpoint::control("127.0.0.1"));
    }

    #[tokio::test]
    async fn test_discover_falls_back_to_hotspot() {
        let endpoint = Endpoint::discover_host("seestar.invalid", IMAGE_PORT).await;
        assert_eq!(endpoint, Endpoint::image(FALLBACK_HOST));
    }

    #[tokio::test]
    async fn test_connect_with_options() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let stream = connect(&Endpoint::new("127.0.0.1", port), &SocketOptions::default())
            .await
            .unwrap();

        assert!(stream.nodelay().unwrap());
    }

    #[tokio::test]
    async fn test_round_trip_against_device() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let (read, mut write) = socket.into_split();
            let mut lines = BufReader::new(read).lines();
            let request = lines.next_line().await.unwrap().unwrap();
            assert!(request.contains("\"method\":\"test_connection\""));
            write
                .write_all(b"\r\n{\"jsonrpc\":\"2.0\",\"method\":\"test_connection\",\"result\":\"ok\",\"code\":0,\"id\":1}\r\n")
                .await
                .unwrap();
        });

        let mut transport = TcpTransport::new(Endpoint::new("127.0.0.1", port));
        transport.connect().await.unwrap();
        assert!(matches!(transport.connect().await, Err(Error::AlreadyConnected)));

        transport.send(&Request::new(1, "test_connection")).await.unwrap();
        let line = transport.receive_line(Duration::from_secs(2)).await.unwrap();
        assert!(line.starts_with("{\"jsonrpc\""));

        transport.disconnect().await.unwrap();
        assert!(!transport.is_connected());
    }
}
