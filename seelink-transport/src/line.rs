//! `\r\n` delimited JSON line codec

use bytes::{BufMut, BytesMut};
use seelink_core::{constants::MAX_LINE_LENGTH, Request};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

use crate::error::{Error, Result};

/// Codec for the control channel
///
/// Decodes one line per item with the terminator (`\n`, optionally
/// preceded by `\r`) stripped. Encodes [`Request`]s as JSON followed by
/// `\r\n`.
///
/// # Examples
///
/// ```
/// use bytes::BytesMut;
/// use seelink_transport::JsonLineCodec;
/// use tokio_util::codec::Decoder;
///
/// let mut codec = JsonLineCodec::new();
/// let mut buf = BytesMut::from(&b"{\"Event\":\"PiStatus\"}\r\n{\"par"[..]);
///
/// assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("{\"Event\":\"PiStatus\"}"));
/// assert_eq!(codec.decode(&mut buf).unwrap(), None);
/// ```
#[derive(Debug, Clone)]
pub struct JsonLineCodec {
    max_length: usize,

    /// Bytes already searched for a terminator
    next_index: usize,
}

impl JsonLineCodec {
    pub fn new() -> Self {
        Self::with_max_length(MAX_LINE_LENGTH)
    }

    /// Codec rejecting lines longer than `max_length` bytes
    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            max_length,
            next_index: 0,
        }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }
}

impl Default for JsonLineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for JsonLineCodec {
    type Item = String;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>> {
        let newline = src[self.next_index..].iter().position(|b| *b == b'\n');

        let Some(offset) = newline else {
            if src.len() > self.max_length {
                return Err(Error::LineTooLong { max: self.max_length });
            }
            self.next_index = src.len();
            return Ok(None);
        };

        let end = self.next_index + offset;
        self.next_index = 0;

        if end > self.max_length {
            return Err(Error::LineTooLong { max: self.max_length });
        }

        let line = src.split_to(end + 1);
        let mut line = &line[..end];
        if let Some(stripped) = line.strip_suffix(b"\r") {
            line = stripped;
        }

        trace!("Received line ({} bytes)", line.len());

        Ok(Some(String::from_utf8_lossy(line).into_owned()))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<String>> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }

        // Unterminated trailing data is not a message
        if !src.is_empty() {
            trace!("Dropping {} unterminated bytes at EOF", src.len());
            src.clear();
        }
        self.next_index = 0;
        Ok(None)
    }
}

impl Encoder<&Request> for JsonLineCodec {
    type Error = Error;

    fn encode(&mut self, item: &Request, dst: &mut BytesMut) -> Result<()> {
        let line = item.encode_line().map_err(|e| Error::Encode(e.to_string()))?;
        dst.reserve(line.len());
        dst.put_slice(&line);
        Ok(())
    }
}
