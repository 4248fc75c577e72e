//! Frame synchronization on the image channel
//!
//! The image socket interleaves binary frames with JSON acks of the
//! commands sent on it. The reader scans byte by byte for the frame magic,
//! discarding JSON lines and stray bytes in between.

use seelink_core::{
    constants::{
        frame::{HEADER_SIZE, MAGIC_HI, MAGIC_LO},
        MAX_SKIPPED_LINE,
    },
    Frame, FrameHeader,
};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::trace;

use crate::{
    error::{Error, Result},
    io::read_exact,
};

/// Read the next frame (header and payload)
///
/// # Algorithm
///
/// 1. Read one byte. `0x03` followed by `0xC3` starts a header; after a
///    lone `0x03` the following byte is consumed and scanning resumes.
/// 2. `{` starts a JSON line, which is discarded up to `\r\n` (at most
///    4096 bytes).
/// 3. Any other byte is skipped.
/// 4. Read the remaining 32 header bytes, parse, then read exactly
///    `length` payload bytes.
///
/// # Errors
///
/// Returns [`Error::ConnectionClosed`] if the stream ends at any point.
pub async fn read_frame<R>(reader: &mut R) -> Result<Frame>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut skipped = 0usize;

    loop {
        match read_byte(reader).await? {
            MAGIC_HI => {
                if read_byte(reader).await? == MAGIC_LO {
                    break;
                }
                skipped += 2;
            }
            b'{' => skipped += skip_json_line(reader).await?,
            _ => skipped += 1,
        }
    }

    if skipped > 0 {
        trace!("Skipped {} bytes before frame magic", skipped);
    }

    let rest = read_exact(reader, HEADER_SIZE - 2).await?;
    let mut raw = [0u8; HEADER_SIZE];
    raw[0] = MAGIC_HI;
    raw[1] = MAGIC_LO;
    raw[2..].copy_from_slice(&rest);

    let header = FrameHeader::parse(&raw)?;
    let payload = read_exact(reader, header.length as usize).await?;

    trace!("Read {}", header);

    Ok(Frame::new(header, payload))
}

/// Discard a JSON line whose `{` was already consumed
///
/// Returns the number of bytes consumed, including the `{`.
async fn skip_json_line<R>(reader: &mut R) -> Result<usize>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut consumed = 1;
    let mut prev = b'{';

    loop {
        let byte = read_byte(reader).await?;
        consumed += 1;

        if prev == b'\r' && byte == b'\n' {
            return Ok(consumed);
        }
        if consumed > MAX_SKIPPED_LINE {
            trace!("Gave up skipping JSON line after {} bytes", consumed);
            return Ok(consumed);
        }
        prev = byte;
    }
}

async fn read_byte<R>(reader: &mut R) -> Result<u8>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut byte = [0u8; 1];
    if reader.read(&mut byte).await? == 0 {
        return Err(Error::ConnectionClosed { received: 0, expected: 1 });
    }
    Ok(byte[0])
}
