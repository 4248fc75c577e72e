//! Image file encoding
//!
//! - FITS keeps the full 16-bit data (BITPIX 16, BZERO 32768, RGB stored as
//!   three planes)
//! - Raster formats (PNG, JPEG, TIFF, PPM, ...) store an 8-bit RGB
//!   rendition, stretched or linearly scaled, encoded by the `image` crate

use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, RgbImage};

use crate::{
    error::{Error, Result},
    header::FrameHeader,
    payload::{decode_payload, PixelArray},
    stretch::{auto_stretch, linear_downscale, Rgb8Image},
};

const FITS_BLOCK: usize = 2880;
const FITS_CARD: usize = 80;

/// Output file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// Lossless 16-bit FITS
    Fits,

    /// 8-bit RGB in any raster format the `image` crate can write
    Raster(image::ImageFormat),
}

impl ImageFormat {
    /// Pick the format from a file extension
    ///
    /// # Examples
    ///
    /// ```
    /// use seelink_core::ImageFormat;
    ///
    /// assert_eq!(ImageFormat::from_path("m42.FITS").unwrap(), ImageFormat::Fits);
    /// assert_eq!(
    ///     ImageFormat::from_path("m42.png").unwrap(),
    ///     ImageFormat::Raster(image::ImageFormat::Png)
    /// );
    /// assert!(ImageFormat::from_path("m42.xyz").is_err());
    /// ```
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "fits" | "fit" => Ok(Self::Fits),
            _ => image::ImageFormat::from_path(path)
                .map(Self::Raster)
                .map_err(|_| Error::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Decode `payload` and encode it in `format`
///
/// `stretch` selects the auto-stretch for 8-bit output; it is ignored
/// for FITS.
pub fn encode_image(
    payload: &[u8],
    header: &FrameHeader,
    format: ImageFormat,
    stretch: bool,
) -> Result<Vec<u8>> {
    let pixels = decode_payload(payload, header)?;

    match format {
        ImageFormat::Fits => Ok(encode_fits(&pixels, header)),
        ImageFormat::Raster(format) if stretch => encode_raster(auto_stretch(&pixels), format),
        ImageFormat::Raster(format) => encode_raster(linear_downscale(&pixels), format),
    }
}

/// Encode an 8-bit RGB image in a raster format
pub fn encode_raster(rendered: Rgb8Image, format: image::ImageFormat) -> Result<Vec<u8>> {
    let (width, height) = (rendered.width as u32, rendered.height as u32);
    let buffer = RgbImage::from_raw(width, height, rendered.data)
        .ok_or(Error::RasterSize { width, height })?;

    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(buffer).write_to(&mut out, format)?;

    Ok(out.into_inner())
}

/// Encode pixels as a 16-bit FITS primary HDU
pub fn encode_fits(pixels: &PixelArray, header: &FrameHeader) -> Vec<u8> {
    let (height, width, channels) = pixels.shape();

    let mut cards = vec![
        fits_card("SIMPLE", "T"),
        fits_card("BITPIX", "16"),
        fits_card("NAXIS", if channels == 3 { "3" } else { "2" }),
        fits_card("NAXIS1", &width.to_string()),
        fits_card("NAXIS2", &height.to_string()),
    ];
    if channels == 3 {
        cards.push(fits_card("NAXIS3", "3"));
    }
    cards.extend([
        fits_card("BZERO", "32768"),
        fits_card("BSCALE", "1"),
        fits_card("IMGTYPE", &header.img_type.to_string()),
        fits_card("IMAGEID", &header.image_id.to_string()),
        fits_card("HFD", &header.hfd.to_string()),
        format!("{:<FITS_CARD$}", "END"),
    ]);

    let mut out: Vec<u8> = cards.concat().into_bytes();
    pad_to_block(&mut out, b' ');

    // Planes of (channels, height, width), big-endian, offset by BZERO
    let samples = pixels.samples();
    for channel in 0..channels {
        for &v in samples.iter().skip(channel).step_by(channels) {
            out.extend_from_slice(&((v as i32 - 32768) as i16).to_be_bytes());
        }
    }
    pad_to_block(&mut out, 0);

    out
}

fn fits_card(key: &str, value: &str) -> String {
    format!("{:<8}= {:>20}{:<50}", key, value, "")
}

fn pad_to_block(buf: &mut Vec<u8>, fill: u8) {
    let rem = buf.len() % FITS_BLOCK;
    if rem != 0 {
        buf.resize(buf.len() + FITS_BLOCK - rem, fill);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::ImageType;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_fits_card_width() {
        assert_eq!(fits_card("NAXIS", "3").len(), FITS_CARD);
        assert_eq!(&fits_card("SIMPLE", "T")[..30], "SIMPLE  =                    T");
    }

    #[test]
    fn test_fits_rgb_layout() {
        let pixels = PixelArray::Rgb16 {
            height: 1,
            width: 2,
            samples: vec![0, 1, 2, 32768, 65535, 5],
        };
        let header = FrameHeader::new(ImageType::Stacked, 2, 1, 0).with_image_id(9);

        let out = encode_fits(&pixels, &header);

        assert_eq!(out.len() % FITS_BLOCK, 0);
        let text = String::from_utf8_lossy(&out[..FITS_BLOCK]);
        assert!(text.contains("NAXIS3  =                    3"));
        assert!(text.contains("IMAGEID =                    9"));

        // Red plane first: 0 and 32768 stored as -32768 and 0
        let data = &out[FITS_BLOCK..];
        assert_eq!(&data[0..4], &[0x80, 0x00, 0x00, 0x00]);
        // Green plane: 1 and 65535
        assert_eq!(&data[4..8], &[0x80, 0x01, 0x7F, 0xFF]);
    }

    #[test]
    fn test_fits_mono_is_two_axis() {
        let pixels = PixelArray::Mono16 { height: 2, width: 2, samples: vec![1, 2, 3, 4] };
        let header = FrameHeader::new(ImageType::Preview, 2, 2, 8);

        let out = encode_fits(&pixels, &header);
        let text = String::from_utf8_lossy(&out[..FITS_BLOCK]);

        assert!(text.contains("NAXIS   =                    2"));
        assert!(!text.contains("NAXIS3"));
    }

    #[test]
    fn test_png_keeps_pixels() {
        let rendered = Rgb8Image { height: 1, width: 2, data: vec![1, 2, 3, 4, 5, 6] };
        let out = encode_raster(rendered, image::ImageFormat::Png).unwrap();

        let decoded = image::load_from_memory(&out).unwrap().into_rgb8();
        assert_eq!(decoded.dimensions(), (2, 1));
        assert_eq!(decoded.into_raw(), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_raster_size_mismatch() {
        let rendered = Rgb8Image { height: 2, width: 2, data: vec![0; 3] };
        let result = encode_raster(rendered, image::ImageFormat::Png);

        assert!(matches!(result, Err(Error::RasterSize { width: 2, height: 2 })));
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(ImageFormat::from_path("a.fit").unwrap(), ImageFormat::Fits);
        assert_eq!(
            ImageFormat::from_path("a.JPG").unwrap(),
            ImageFormat::Raster(image::ImageFormat::Jpeg)
        );
        assert_eq!(
            ImageFormat::from_path("a.tiff").unwrap(),
            ImageFormat::Raster(image::ImageFormat::Tiff)
        );
        assert!(matches!(ImageFormat::from_path("noext"), Err(Error::UnsupportedFormat(_))));
    }

    #[test]
    fn test_encode_image_rejects_ack_frame() {
        let header = FrameHeader::new(ImageType::Stacked, 0, 0, 0);
        let result = encode_image(&[], &header, ImageFormat::Fits, true);

        assert!(matches!(result, Err(Error::EmptyFrame { .. })));
    }

    #[test]
    fn test_encode_image_linear_ppm() {
        let header = FrameHeader::new(ImageType::Preview, 1, 1, 2);
        let format = ImageFormat::Raster(image::ImageFormat::Pnm);
        let out = encode_image(&[0x00, 0xAB], &header, format, false).unwrap();

        assert!(out.starts_with(b"P6"));
        assert_eq!(&out[out.len() - 3..], &[0xAB, 0xAB, 0xAB]);
    }
}
