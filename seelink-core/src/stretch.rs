//! Display stretch for 16-bit astronomical images
//!
//! Raw frames are dominated by near-black sky background with faint signal
//! squeezed into a small part of the range. The auto-stretch sets per-channel
//! black/white points from percentiles and then applies the midtone
//! transfer function (MTF):
//!
//! ```text
//! MTF(x, m) = (m - 1) x / ((2m - 1) x - m)
//! ```

use crate::{
    constants::stretch::{BLACK_PERCENTILE, EPSILON, MIDTONE, WHITE_PERCENTILE},
    payload::PixelArray,
};

const LEVELS: usize = u16::MAX as usize + 1;

/// 8-bit interleaved RGB image, row-major `(height, width, 3)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rgb8Image {
    pub height: usize,
    pub width: usize,
    pub data: Vec<u8>,
}

impl Rgb8Image {
    /// Pixel at `(row, col)`
    pub fn get(&self, row: usize, col: usize) -> Option<[u8; 3]> {
        if row >= self.height || col >= self.width {
            return None;
        }
        let idx = (row * self.width + col) * 3;
        Some([self.data[idx], self.data[idx + 1], self.data[idx + 2]])
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Apply the aggressive auto-stretch to reveal faint nebulosity
///
/// Single-channel input is replicated to RGB first.
///
/// # Examples
///
/// ```
/// use seelink_core::{auto_stretch, PixelArray};
///
/// let pixels = PixelArray::Mono16 { height: 1, width: 2, samples: vec![100, 60000] };
/// let img = auto_stretch(&pixels);
///
/// assert_eq!(img.get(0, 0), Some([0, 0, 0]));
/// assert_eq!(img.get(0, 1), Some([255, 255, 255]));
/// ```
pub fn auto_stretch(pixels: &PixelArray) -> Rgb8Image {
    let rgb = pixels.to_rgb16();

    let luts: Vec<Vec<u8>> = (0..3)
        .map(|channel| {
            let histogram = channel_histogram(&rgb, channel);
            let count = rgb.len() / 3;
            let black = percentile(&histogram, count, BLACK_PERCENTILE);
            let white = percentile(&histogram, count, WHITE_PERCENTILE);
            stretch_lut(black, white)
        })
        .collect();

    let data = rgb
        .iter()
        .enumerate()
        .map(|(i, &v)| luts[i % 3][v as usize])
        .collect();

    Rgb8Image {
        height: pixels.height(),
        width: pixels.width(),
        data,
    }
}

/// Linear 16-to-8-bit conversion (keeps the high byte)
pub fn linear_downscale(pixels: &PixelArray) -> Rgb8Image {
    Rgb8Image {
        height: pixels.height(),
        width: pixels.width(),
        data: pixels.to_rgb16().iter().map(|&v| (v >> 8) as u8).collect(),
    }
}

/// Midtone transfer function on a normalised value
pub fn mtf(x: f64, m: f64) -> f64 {
    (m - 1.0) * x / ((2.0 * m - 1.0) * x - m)
}

fn channel_histogram(rgb: &[u16], channel: usize) -> Vec<u32> {
    let mut histogram = vec![0u32; LEVELS];
    for &v in rgb.iter().skip(channel).step_by(3) {
        histogram[v as usize] += 1;
    }
    histogram
}

/// Value at `rank` (0-based) in the sorted sample set described by `histogram`
fn value_at_rank(histogram: &[u32], rank: usize) -> f64 {
    let mut seen = 0usize;
    for (value, &n) in histogram.iter().enumerate() {
        seen += n as usize;
        if seen > rank {
            return value as f64;
        }
    }
    (LEVELS - 1) as f64
}

/// Percentile with linear interpolation between the closest ranks
fn percentile(histogram: &[u32], count: usize, p: f64) -> f64 {
    if count == 0 {
        return 0.0;
    }

    let pos = p / 100.0 * (count - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;

    let lo_value = value_at_rank(histogram, lo);
    if hi == lo {
        return lo_value;
    }
    let hi_value = value_at_rank(histogram, hi);

    lo_value + (hi_value - lo_value) * (pos - lo as f64)
}

fn stretch_lut(black: f64, white: f64) -> Vec<u8> {
    let range = white - black + EPSILON;

    (0..LEVELS)
        .map(|v| {
            let x = ((v as f64 - black) / range).clamp(0.0, 1.0);
            (mtf(x, MIDTONE) * 255.0 + 0.5) as u8
        })
        .collect()
}
