//! Error types for seelink-core



/// Result type alias for seelink-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Frame codec errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Header buffer has the wrong size
    #[error("Header must be {expected} bytes, got {actual} bytes")]
    HeaderLength {
        expected: usize,
        actual: usize,
    },

    /// Header does not start with the frame magic
    #[error("Bad frame magic: expected 0x03C3, got 0x{0:04X}")]
    BadMagic(u16),

    /// Frame carries no pixels (ack/keepalive)
    #[error("Zero-dimension frame ({width}x{height})")]
    EmptyFrame {
        width: u16,
        height: u16,
    },

    /// No archive local entry in the payload
    #[error("Archive local entry (PK\\x03\\x04) not found")]
    ArchiveNotFound,

    /// Local entry header runs past the end of the payload
    #[error("Archive local entry truncated at offset {offset}")]
    ArchiveTruncated {
        offset: usize,
    },

    /// Deflate stream could not be inflated
    #[error("Inflate failed: {0}")]
    Inflate(#[source] std::io::Error),

    /// Inflated size differs from the RGB16 size implied by the header
    #[error("Decompressed size {actual} != expected {expected} ({width}x{height}x3x2)")]
    SizeMismatch {
        expected: usize,
        actual: usize,
        width: u16,
        height: u16,
    },

    /// Payload is neither compressed RGB nor raw single-channel
    #[error("Unknown payload format: {len} bytes for {width}x{height} (expected {rgb} RGB or {mono} Bayer)")]
    UnknownFormat {
        len: usize,
        width: u16,
        height: u16,
        rgb: usize,
        mono: usize,
    },

    /// Image file extension not supported
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// Rendered buffer does not match its stated dimensions
    #[error("RGB buffer does not fit {width}x{height}")]
    RasterSize {
        width: u32,
        height: u32,
    },

    /// Raster encoder failure
    #[error("Image encode failed: {0}")]
    Encode(#[from] image::ImageError),

    /// JSON (de)serialization failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Check if error only affects a single frame (drop it and keep streaming)
    pub fn is_frame_local(&self) -> bool {
        matches!(
            self,
            Self::EmptyFrame { .. }
                | Self::ArchiveNotFound
                | Self::ArchiveTruncated { .. }
                | Self::Inflate(_)
                | Self::SizeMismatch { .. }
                | Self::UnknownFormat { .. }
        )
    }

    /// Check if error means the byte stream lost frame alignment
    pub fn is_protocol(&self) -> bool {
        matches!(self, Self::HeaderLength { .. } | Self::BadMagic(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(Error::EmptyFrame { width: 0, height: 4 }.is_frame_local());
        assert!(Error::ArchiveNotFound.is_frame_local());
        assert!(!Error::BadMagic(0x1234).is_frame_local());
        assert!(Error::BadMagic(0x1234).is_protocol());
        assert!(Error::HeaderLength { expected: 34, actual: 3 }.is_protocol());
    }

    #[test]
    fn test_error_display() {
        let err = Error::BadMagic(0xBEEF);
        assert_eq!(err.to_string(), "Bad frame magic: expected 0x03C3, got 0xBEEF");
    }
}
