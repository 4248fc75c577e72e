//! Binary image frame header

use std::fmt;

use byteorder::{BigEndian, ByteOrder};
use bytes::{BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::{
    constants::frame::{HEADER_SIZE, IMG_TYPE_PREVIEW, IMG_TYPE_STACKED, MAGIC},
    error::{Error, Result},
};

/// Kind of image carried by a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageType {
    /// Single unstacked preview frame
    Preview,

    /// Progressively stacked deep-sky image
    Stacked,

    /// Any other value seen on the wire
    Other(u8),
}

impl From<u8> for ImageType {
    fn from(value: u8) -> Self {
        match value {
            IMG_TYPE_PREVIEW => Self::Preview,
            IMG_TYPE_STACKED => Self::Stacked,
            other => Self::Other(other),
        }
    }
}

impl From<ImageType> for u8 {
    fn from(value: ImageType) -> Self {
        match value {
            ImageType::Preview => IMG_TYPE_PREVIEW,
            ImageType::Stacked => IMG_TYPE_STACKED,
            ImageType::Other(other) => other,
        }
    }
}

impl fmt::Display for ImageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Preview => f.write_str("preview"),
            Self::Stacked => f.write_str("stacked"),
            Self::Other(v) => write!(f, "type {}", v),
        }
    }
}

/// Image frame header
///
/// # Frame Structure
///
/// ```text
/// ┌───────┬─────────┬──────┬────────┬──────┬────┬────┬────┬────┬───────┬────────┬───────┬───────┬─────┬─────────┬──────────┬──────┐
/// │ magic │ version │ rsvd │ length │ rsvd │ BE │ IT │ DT │ FI │ width │ height │ hfd_x │ hfd_y │ hfd │ debayer │ image_id │ rsvd │
/// │  @0   │   @2    │  @4  │   @6   │ @10  │@12 │@13 │@14 │@15 │  @16  │  @18   │  @20  │  @22  │ @24 │   @26   │   @28    │ @30  │
/// │  u16  │   u16   │  2   │  u32   │  2   │ u8 │ u8 │ u8 │ u8 │  u16  │  u16   │  u16  │  u16  │ u16 │   u16   │   u16    │  4   │
/// └───────┴─────────┴──────┴────────┴──────┴────┴────┴────┴────┴───────┴────────┴───────┴───────┴─────┴─────────┴──────────┴──────┘
/// ```
///
/// All multi-byte values are big-endian. Exactly `length` payload bytes
/// follow the header on the wire.
///
/// # Examples
///
/// ```
/// use seelink_core::{FrameHeader, ImageType};
///
/// let header = FrameHeader::new(ImageType::Stacked, 2, 2, 0x800);
/// let encoded = header.encode();
///
/// let decoded = FrameHeader::parse(&encoded).unwrap();
/// assert_eq!(decoded, header);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHeader {
    /// Start-of-frame marker, always 0x03C3 once parsed
    pub magic: u16,

    /// Protocol version
    pub version: u16,

    /// Payload size in bytes
    pub length: u32,

    /// Endianness flag
    pub is_big_endian: u8,

    /// Raw image type (1 = preview, 5 = stacked)
    pub img_type: u8,

    /// Data format identifier
    pub data_type: u8,

    /// Frame identifier
    pub frame_id: u8,

    /// Image width in pixels
    pub width: u16,

    /// Image height in pixels
    pub height: u16,

    /// Half-flux-diameter X
    pub hfd_x: u16,

    /// Half-flux-diameter Y
    pub hfd_y: u16,

    /// Half-flux-diameter
    pub hfd: u16,

    /// Bayer pattern flag
    pub can_debayer: u16,

    /// Sequential per-connection frame counter
    pub image_id: u16,
}

impl FrameHeader {
    /// Header size in bytes
    pub const SIZE: usize = HEADER_SIZE;

    /// Create a header with the given shape; other fields are zero
    pub fn new(image_type: ImageType, width: u16, height: u16, length: u32) -> Self {
        Self {
            magic: MAGIC,
            version: 1,
            length,
            is_big_endian: 0,
            img_type: image_type.into(),
            data_type: 0,
            frame_id: 0,
            width,
            height,
            hfd_x: 0,
            hfd_y: 0,
            hfd: 0,
            can_debayer: 0,
            image_id: 0,
        }
    }

    /// Set the frame counter
    pub fn with_image_id(mut self, image_id: u16) -> Self {
        self.image_id = image_id;
        self
    }

    /// Set the data format identifier
    pub fn with_data_type(mut self, data_type: u8) -> Self {
        self.data_type = data_type;
        self
    }

    /// Parse a header from exactly 34 bytes
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `buf` is not exactly 34 bytes long
    /// - the first two bytes are not the frame magic
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() != HEADER_SIZE {
            return Err(Error::HeaderLength {
                expected: HEADER_SIZE,
                actual: buf.len(),
            });
        }

        let magic = BigEndian::read_u16(&buf[0..2]);
        if magic != MAGIC {
            return Err(Error::BadMagic(magic));
        }

        let header = Self {
            magic,
            version: BigEndian::read_u16(&buf[2..4]),
            length: BigEndian::read_u32(&buf[6..10]),
            is_big_endian: buf[12],
            img_type: buf[13],
            data_type: buf[14],
            frame_id: buf[15],
            width: BigEndian::read_u16(&buf[16..18]),
            height: BigEndian::read_u16(&buf[18..20]),
            hfd_x: BigEndian::read_u16(&buf[20..22]),
            hfd_y: BigEndian::read_u16(&buf[22..24]),
            hfd: BigEndian::read_u16(&buf[24..26]),
            can_debayer: BigEndian::read_u16(&buf[26..28]),
            image_id: BigEndian::read_u16(&buf[28..30]),
        };

        trace!(header = %hex::encode(buf), "Parsed frame header");

        Ok(header)
    }

    /// Encode header to its 34-byte wire form (reserved bytes are zero)
    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(HEADER_SIZE);

        buf.put_u16(self.magic);
        buf.put_u16(self.version);
        buf.put_u16(0);
        buf.put_u32(self.length);
        buf.put_u16(0);
        buf.put_u8(self.is_big_endian);
        buf.put_u8(self.img_type);
        buf.put_u8(self.data_type);
        buf.put_u8(self.frame_id);
        buf.put_u16(self.width);
        buf.put_u16(self.height);
        buf.put_u16(self.hfd_x);
        buf.put_u16(self.hfd_y);
        buf.put_u16(self.hfd);
        buf.put_u16(self.can_debayer);
        buf.put_u16(self.image_id);
        buf.put_u32(0);

        buf
    }

    /// Image type of this frame
    pub fn image_type(&self) -> ImageType {
        ImageType::from(self.img_type)
    }

    /// Check if the frame has no pixels (ack/keepalive frame)
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Byte size of an interleaved 16-bit RGB image of this shape
    pub fn rgb16_len(&self) -> usize {
        self.pixel_count() * 3 * 2
    }

    /// Byte size of a single-channel 16-bit image of this shape
    pub fn mono16_len(&self) -> usize {
        self.pixel_count() * 2
    }

    /// Payload size as `usize`
    pub fn payload_len(&self) -> usize {
        self.length as usize
    }

    fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl fmt::Debug for FrameHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameHeader")
            .field("magic", &format!("0x{:04X}", self.magic))
            .field("version", &self.version)
            .field("length", &self.length)
            .field("img_type", &self.image_type())
            .field("data_type", &self.data_type)
            .field("frame_id", &self.frame_id)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("hfd", &self.hfd)
            .field("image_id", &self.image_id)
            .finish()
    }
}

impl fmt::Display for FrameHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Frame[{}]({}x{}, {}, len={})",
            self.image_id,
            self.width,
            self.height,
            self.image_type(),
            self.length
        )
    }
}

/// One header + payload unit read off an image channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub header: FrameHeader,
    pub payload: Bytes,
}

impl Frame {
    pub fn new(header: FrameHeader, payload: impl Into<Bytes>) -> Self {
        Self {
            header,
            payload: payload.into(),
        }
    }

    /// Encode header followed by payload
    pub fn encode(&self) -> BytesMut {
        let mut buf = self.header.encode();
        buf.put_slice(&self.payload);
        buf
    }

    /// Decode the payload into pixels
    pub fn decode(&self) -> Result<crate::PixelArray> {
        crate::decode_payload(&self.payload, &self.header)
    }
}
