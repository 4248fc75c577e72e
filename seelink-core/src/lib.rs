//! # seelink-core
//!
//! Core protocol implementation for Seestar smart telescopes.
//!
//! This crate provides the pure, I/O-free primitives:
//! - Binary image frame header parsing/encoding
//! - Payload location, inflation and pixel decoding
//! - Auto-stretch for display
//! - JSON-RPC request/response model
//! - Image file encoding (FITS, and raster formats through `image`)

pub mod constants;
pub mod error;
pub mod header;
pub mod output;
pub mod payload;
pub mod request;
pub mod stretch;

pub use error::{Error, Result};
pub use header::{Frame, FrameHeader, ImageType};
pub use output::{encode_fits, encode_image, encode_raster, ImageFormat};
pub use payload::{decode_payload, has_archive, locate_and_inflate, PixelArray};
pub use request::{Request, Response};
pub use stretch::{auto_stretch, linear_downscale, Rgb8Image};

/// Frame header size
pub const HEADER_SIZE: usize = constants::frame::HEADER_SIZE;

/// Frame magic number
pub const MAGIC_NUMBER: u16 = constants::frame::MAGIC;

/// Parse a 34-byte frame header
pub fn parse_header(buf: &[u8]) -> Result<FrameHeader> {
    FrameHeader::parse(buf)
}
