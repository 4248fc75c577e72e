//! Transport layer for Seestar devices
//!
//! Socket primitives shared by the control and image channels: connecting
//! with the vendor app's socket options, exact reads, JSON line framing and
//! image frame synchronization.

pub mod error;
pub mod frame;
pub mod io;
pub mod line;
pub mod tcp;

pub use error::{Error, Result};
pub use frame::read_frame;
pub use io::{read_exact, send_json_line};
pub use line::JsonLineCodec;
pub use tcp::{connect, Endpoint, SocketOptions, TcpTransport};

use std::time::Duration;

use async_trait::async_trait;
use seelink_core::Request;

/// Request/response transport
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Connect to device
    async fn connect(&mut self) -> Result<()>;

    /// Disconnect from device
    async fn disconnect(&mut self) -> Result<()>;

    /// Check if connected
    fn is_connected(&self) -> bool;

    /// Send one command line
    async fn send(&mut self, request: &Request) -> Result<()>;

    /// Receive the next non-empty line (with timeout)
    async fn receive_line(&mut self, timeout: Duration) -> Result<String>;

    /// Get remote address
    fn remote_addr(&self) -> String;
}

/// Send `request` and return the first line received after it
///
/// Connects first if needed. The transport is left connected.
pub async fn call<T>(transport: &mut T, request: &Request, timeout: Duration) -> Result<String>
where
    T: Transport + ?Sized,
{
    if !transport.is_connected() {
        transport.connect().await?;
    }

    transport.send(request).await?;
    transport.receive_line(timeout).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::{predicate::eq, Sequence};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_call_connects_then_sends() {
        let mut transport = MockTransport::new();
        let mut seq = Sequence::new();

        transport.expect_is_connected().times(1).in_sequence(&mut seq).return_const(false);
        transport.expect_connect().times(1).in_sequence(&mut seq).returning(|| Ok(()));
        transport
            .expect_send()
            .withf(|request: &Request| request.method == "get_device_state" && request.verify == Some(true))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        transport
            .expect_receive_line()
            .with(eq(Duration::from_secs(10)))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok("{\"result\":{}}".to_string()));

        let request = Request::new(1, "get_device_state").verified();
        let line = call(&mut transport, &request, Duration::from_secs(10)).await.unwrap();

        assert_eq!(line, "{\"result\":{}}");
    }

    #[tokio::test]
    async fn test_call_propagates_timeout() {
        let mut transport = MockTransport::new();

        transport.expect_is_connected().return_const(true);
        transport.expect_connect().never();
        transport.expect_send().returning(|_| Ok(()));
        transport.expect_receive_line().returning(|_| Err(Error::ReadTimeout));

        let result = call(&mut transport, &Request::new(1, "test_connection"), Duration::from_millis(5)).await;

        assert!(matches!(result, Err(Error::ReadTimeout)));
    }
}
