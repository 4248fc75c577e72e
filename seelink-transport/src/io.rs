//! Stream helpers shared by every channel

use bytes::{Bytes, BytesMut};
use seelink_core::{constants::SOCKET_BUFFER_SIZE, Request};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

use crate::error::{Error, Result};

/// Read exactly `n` bytes
///
/// # Errors
///
/// Returns [`Error::ConnectionClosed`] with the number of bytes received
/// if the peer closes before `n` bytes arrive.
///
/// `n` usually comes from a frame header, so the buffer grows with the data
/// received rather than being allocated up front.
pub async fn read_exact<R>(reader: &mut R, n: usize) -> Result<Bytes>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let chunk = SOCKET_BUFFER_SIZE as usize;
    let mut buf = BytesMut::with_capacity(n.min(chunk));

    while buf.len() < n {
        let remaining = n - buf.len();
        buf.reserve(remaining.min(chunk));

        let read = (&mut *reader).take(remaining as u64).read_buf(&mut buf).await?;
        if read == 0 {
            return Err(Error::ConnectionClosed { received: buf.len(), expected: n });
        }
    }

    Ok(buf.freeze())
}

/// Send one command as a `\r\n` terminated JSON line
pub async fn send_json_line<W>(writer: &mut W, request: &Request) -> Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let line = request
        .encode_line()
        .map_err(|e| Error::Encode(e.to_string()))?;

    trace!("Sending {} ({} bytes)", request, line.len());

    writer.write_all(&line).await?;
    writer.flush().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_read_exact_across_chunks() {
        let (mut client, mut server) = tokio::io::duplex(4);
        tokio::spawn(async move {
            server.write_all(b"0123456789").await.unwrap();
        });

        let bytes = read_exact(&mut client, 10).await.unwrap();
        assert_eq!(&bytes[..], b"0123456789");
    }

    #[tokio::test]
    async fn test_read_exact_zero() {
        let mut reader: &[u8] = b"";
        assert!(read_exact(&mut reader, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_read_exact_premature_eof() {
        let mut reader: &[u8] = b"abc";
        let err = read_exact(&mut reader, 8).await.unwrap_err();

        assert!(matches!(err, Error::ConnectionClosed { received: 3, expected: 8 }));
    }

    #[tokio::test]
    async fn test_read_exact_huge_length_then_eof() {
        let mut reader: &[u8] = b"abc";
        let err = read_exact(&mut reader, u32::MAX as usize).await.unwrap_err();

        assert!(matches!(err, Error::ConnectionClosed { received: 3, expected } if expected == u32::MAX as usize));
    }

    #[tokio::test]
    async fn test_read_exact_stops_at_n() {
        let mut reader: &[u8] = b"0123456789";
        let bytes = read_exact(&mut reader, 4).await.unwrap();

        assert_eq!(&bytes[..], b"0123");
        assert_eq!(reader, &b"456789"[..]);
    }

    #[tokio::test]
    async fn test_send_json_line() {
        let mut out = Vec::new();
        send_json_line(&mut out, &Request::new(7, "begin_streaming")).await.unwrap();

        assert_eq!(out, b"{\"id\":7,\"method\":\"begin_streaming\"}\r\n".to_vec());
    }
}
