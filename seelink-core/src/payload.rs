//! Image payload decoding
//!
//! Two payload formats share the image channels:
//! - stacked frames: an embedded archive entry whose raw-deflate stream
//!   inflates to interleaved 16-bit RGB
//! - preview frames: raw single-channel 16-bit Bayer samples
//!
//! The device prepends a variable amount of padding before the archive
//! entry, so the entry is located by its signature and its own length
//! fields rather than by a fixed offset.

use std::io::Read;

use byteorder::{ByteOrder, LittleEndian};
use flate2::read::DeflateDecoder;
use tracing::trace;

use crate::{
    constants::archive::{EXTRA_LEN_OFFSET, LOCAL_ENTRY_LEN, LOCAL_ENTRY_SIG, NAME_LEN_OFFSET},
    error::{Error, Result},
    header::FrameHeader,
};

/// Decoded pixels, row-major
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PixelArray {
    /// Interleaved RGB, shape `(height, width, 3)`
    Rgb16 {
        height: usize,
        width: usize,
        samples: Vec<u16>,
    },

    /// Single channel (Bayer mosaic), shape `(height, width)`
    Mono16 {
        height: usize,
        width: usize,
        samples: Vec<u16>,
    },
}

impl PixelArray {
    pub fn height(&self) -> usize {
        match self {
            Self::Rgb16 { height, .. } | Self::Mono16 { height, .. } => *height,
        }
    }

    pub fn width(&self) -> usize {
        match self {
            Self::Rgb16 { width, .. } | Self::Mono16 { width, .. } => *width,
        }
    }

    /// Samples per pixel (3 or 1)
    pub fn channels(&self) -> usize {
        match self {
            Self::Rgb16 { .. } => 3,
            Self::Mono16 { .. } => 1,
        }
    }

    /// `(height, width, channels)`
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.height(), self.width(), self.channels())
    }

    pub fn samples(&self) -> &[u16] {
        match self {
            Self::Rgb16 { samples, .. } | Self::Mono16 { samples, .. } => samples,
        }
    }

    /// Sample at `(row, col, channel)`
    pub fn get(&self, row: usize, col: usize, channel: usize) -> Option<u16> {
        if row >= self.height() || col >= self.width() || channel >= self.channels() {
            return None;
        }
        let idx = (row * self.width() + col) * self.channels() + channel;
        self.samples().get(idx).copied()
    }

    /// Interleaved RGB samples; a single channel is replicated three times
    pub fn to_rgb16(&self) -> Vec<u16> {
        match self {
            Self::Rgb16 { samples, .. } => samples.clone(),
            Self::Mono16 { samples, .. } => samples.iter().flat_map(|&v| [v, v, v]).collect(),
        }
    }
}

/// Find the archive local entry in `payload` and inflate its data
///
/// # Algorithm
///
/// ```text
/// 1. Scan for the signature 50 4B 03 04
/// 2. Read name_len (LE u16 @ sig+26) and extra_len (LE u16 @ sig+28)
/// 3. Data starts at sig + 30 + name_len + extra_len
/// 4. Raw-deflate inflate from there to the end of the payload
/// ```
///
/// # Errors
///
/// Returns an error if:
/// - the signature is absent
/// - the local entry header is cut short
/// - the deflate stream is corrupt
pub fn locate_and_inflate(payload: &[u8]) -> Result<Vec<u8>> {
    inflate_entry(payload, None)
}

/// Check whether `payload` contains an archive local entry
pub fn has_archive(payload: &[u8]) -> bool {
    find_signature(payload).is_some()
}

/// Decode a frame payload into pixels
///
/// The archive signature, not `img_type`, decides the format: ack frames
/// can carry any type with zero dimensions.
///
/// # Errors
///
/// Returns an error if:
/// - width or height is zero (`EmptyFrame`)
/// - the inflated size is not `height*width*3*2` (`SizeMismatch`)
/// - an uncompressed payload is not `height*width*2` bytes (`UnknownFormat`)
///
/// # Examples
///
/// ```
/// use seelink_core::{decode_payload, FrameHeader, ImageType, PixelArray};
///
/// let header = FrameHeader::new(ImageType::Preview, 2, 1, 4);
/// let pixels = decode_payload(&[1, 0, 2, 0], &header).unwrap();
///
/// assert_eq!(pixels.shape(), (1, 2, 1));
/// assert_eq!(pixels.samples(), &[1, 2]);
/// ```
pub fn decode_payload(payload: &[u8], header: &FrameHeader) -> Result<PixelArray> {
    if header.is_empty() {
        return Err(Error::EmptyFrame {
            width: header.width,
            height: header.height,
        });
    }

    let height = header.height as usize;
    let width = header.width as usize;

    if has_archive(payload) {
        let expected = header.rgb16_len();
        // Read one byte past the expected size so an oversized stream is
        // reported as a mismatch without inflating all of it.
        let raw = inflate_entry(payload, Some(expected as u64 + 1))?;
        if raw.len() != expected {
            return Err(Error::SizeMismatch {
                expected,
                actual: raw.len(),
                width: header.width,
                height: header.height,
            });
        }

        return Ok(PixelArray::Rgb16 {
            height,
            width,
            samples: to_samples(&raw),
        });
    }

    let expected_mono = header.mono16_len();
    if payload.len() == expected_mono {
        return Ok(PixelArray::Mono16 {
            height,
            width,
            samples: to_samples(payload),
        });
    }

    Err(Error::UnknownFormat {
        len: payload.len(),
        width: header.width,
        height: header.height,
        rgb: header.rgb16_len(),
        mono: expected_mono,
    })
}

fn find_signature(payload: &[u8]) -> Option<usize> {
    payload
        .windows(LOCAL_ENTRY_SIG.len())
        .position(|w| w == LOCAL_ENTRY_SIG)
}

fn inflate_entry(payload: &[u8], limit: Option<u64>) -> Result<Vec<u8>> {
    let sig = find_signature(payload).ok_or(Error::ArchiveNotFound)?;

    if payload.len() < sig + LOCAL_ENTRY_LEN {
        return Err(Error::ArchiveTruncated { offset: sig });
    }

    let name_len = LittleEndian::read_u16(&payload[sig + NAME_LEN_OFFSET..]) as usize;
    let extra_len = LittleEndian::read_u16(&payload[sig + EXTRA_LEN_OFFSET..]) as usize;
    let data_start = sig + LOCAL_ENTRY_LEN + name_len + extra_len;

    if data_start > payload.len() {
        return Err(Error::ArchiveTruncated { offset: sig });
    }

    trace!(
        signature_offset = sig,
        name_len,
        extra_len,
        data_start,
        compressed_len = payload.len() - data_start,
        "Located archive entry"
    );

    let decoder = DeflateDecoder::new(&payload[data_start..]);
    let mut out = Vec::new();
    match limit {
        Some(limit) => decoder.take(limit).read_to_end(&mut out),
        None => {
            let mut decoder = decoder;
            decoder.read_to_end(&mut out)
        }
    }
    .map_err(Error::Inflate)?;

    Ok(out)
}

fn to_samples(raw: &[u8]) -> Vec<u16> {
    raw.chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}
