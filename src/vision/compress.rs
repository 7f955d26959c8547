//! Image compression ahead of OCR upload
//!
//! Shrinks a captured image to a bounded size, optionally flattens it to
//! grayscale, and re-encodes it as JPEG. Compression fails open: if anything goes
//! wrong the original image is passed through unchanged.

use image::imageops::FilterType;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GrayImage, Luma};
use std::io::Cursor;
use thiserror::Error;
use tracing::{debug, warn};

use super::encoded::{EncodedFormat, EncodedImage};

/// Errors raised while compressing. Never surfaced to the user.
#[derive(Error, Debug)]
pub enum CompressError {
    #[error("failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("failed to encode image: {0}")]
    Encode(#[source] image::ImageError),
}

/// Compression settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressOptions {
    /// Longest allowed edge in pixels
    pub max_dimension: u32,
    /// Lossy quality factor (0.0 - 1.0)
    pub quality: f32,
    /// Flatten to grayscale before encoding
    pub grayscale: bool,
}

impl Default for CompressOptions {
    fn default() -> Self {
        Self {
            max_dimension: 800,
            quality: 0.7,
            grayscale: false,
        }
    }
}

impl CompressOptions {
    /// JPEG quality (1-100) for the configured quality factor
    pub fn jpeg_quality(&self) -> u8 {
        let quality = if self.quality.is_finite() { self.quality } else { 0.7 };
        (quality.clamp(0.0, 1.0) * 100.0).round().clamp(1.0, 100.0) as u8
    }
}

/// Output dimensions for an input of `width` x `height`
///
/// Scales uniformly so the longer edge equals `max_dimension`; never upscales.
pub fn target_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let max_dimension = max_dimension.max(1);
    let longer = width.max(height);
    if longer <= max_dimension {
        return (width, height);
    }

    let ratio = max_dimension as f64 / longer as f64;
    let scale = |edge: u32| ((edge as f64 * ratio).round() as u32).max(1);

    if width >= height {
        (max_dimension, scale(height))
    } else {
        (scale(width), max_dimension)
    }
}

/// Average the three color channels of every pixel
fn average_grayscale(image: &DynamicImage) -> GrayImage {
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        Luma([((r as u16 + g as u16 + b as u16) / 3) as u8])
    })
}

/// Compress an image, reporting failures
pub fn try_compress(input: &EncodedImage, options: &CompressOptions) -> Result<EncodedImage, CompressError> {
    let decoded = image::load_from_memory(&input.bytes).map_err(CompressError::Decode)?;
    let (width, height) = (decoded.width(), decoded.height());
    let (new_width, new_height) = target_dimensions(width, height, options.max_dimension);

    let resized = if (new_width, new_height) == (width, height) {
        decoded
    } else {
        decoded.resize_exact(new_width, new_height, FilterType::Triangle)
    };

    // JPEG carries no alpha channel
    let flattened = if options.grayscale {
        DynamicImage::ImageLuma8(average_grayscale(&resized))
    } else {
        DynamicImage::ImageRgb8(resized.to_rgb8())
    };

    let quality = options.jpeg_quality();
    let mut bytes = Vec::new();
    flattened
        .write_with_encoder(JpegEncoder::new_with_quality(Cursor::new(&mut bytes), quality))
        .map_err(CompressError::Encode)?;

    debug!(
        "Compressed {}x{} ({} KB) to {}x{} ({} KB) at quality {}",
        width,
        height,
        input.len() / 1024,
        new_width,
        new_height,
        bytes.len() / 1024,
        quality
    );

    Ok(EncodedImage::with_quality(EncodedFormat::Jpeg, quality, bytes))
}

/// Compress an image, falling back to the input on failure
pub fn compress(input: &EncodedImage, options: &CompressOptions) -> EncodedImage {
    match try_compress(input, options) {
        Ok(compressed) => compressed,
        Err(e) => {
            warn!("Image compression failed, using original image: {}", e);
            input.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};

    fn png(width: u32, height: u32) -> EncodedImage {
        let image = RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 90]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(image)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        EncodedImage::new(EncodedFormat::Png, bytes)
    }

    fn dimensions(image: &EncodedImage) -> (u32, u32) {
        let decoded = image::load_from_memory(&image.bytes).unwrap();
        (decoded.width(), decoded.height())
    }

    #[test]
    fn test_target_dimensions_landscape() {
        assert_eq!(target_dimensions(1600, 1200, 800), (800, 600));
        assert_eq!(target_dimensions(1000, 333, 800), (800, 266));
        assert_eq!(target_dimensions(1001, 1, 800), (800, 1));
    }

    #[test]
    fn test_target_dimensions_portrait_uses_longer_edge() {
        assert_eq!(target_dimensions(1200, 1600, 800), (600, 800));
    }

    #[test]
    fn test_target_dimensions_never_upscales() {
        assert_eq!(target_dimensions(640, 480, 800), (640, 480));
        assert_eq!(target_dimensions(800, 800, 800), (800, 800));
    }

    #[test]
    fn test_jpeg_quality_mapping() {
        let mut options = CompressOptions::default();
        assert_eq!(options.jpeg_quality(), 70);
        options.quality = 0.6;
        assert_eq!(options.jpeg_quality(), 60);
        options.quality = 0.0;
        assert_eq!(options.jpeg_quality(), 1);
        options.quality = 3.0;
        assert_eq!(options.jpeg_quality(), 100);
    }

    #[test]
    fn test_compress_1600x1200_to_800x600() {
        let output = compress(&png(1600, 1200), &CompressOptions::default());
        assert_eq!(output.format, EncodedFormat::Jpeg);
        assert_eq!(output.quality, Some(70));
        assert_eq!(dimensions(&output), (800, 600));
    }

    #[test]
    fn test_compress_small_image_keeps_size() {
        let output = compress(&png(320, 240), &CompressOptions::default());
        assert_eq!(dimensions(&output), (320, 240));
    }

    #[test]
    fn test_compress_is_stable_on_compressed_output() {
        let options = CompressOptions::default();
        let once = compress(&png(1200, 900), &options);
        let twice = try_compress(&once, &options).unwrap();
        assert_eq!(dimensions(&once), dimensions(&twice));
    }

    #[test]
    fn test_grayscale_averages_channels() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(1, 1, Rgb([255, 0, 0])));
        assert_eq!(average_grayscale(&image).get_pixel(0, 0).0, [85]);

        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(1, 1, Rgb([10, 20, 33])));
        assert_eq!(average_grayscale(&image).get_pixel(0, 0).0, [21]);
    }

    #[test]
    fn test_grayscale_output_has_single_channel() {
        let options = CompressOptions {
            grayscale: true,
            ..CompressOptions::default()
        };
        let output = compress(&png(100, 50), &options);
        let decoded = image::load_from_memory(&output.bytes).unwrap();
        assert_eq!(decoded.color(), image::ColorType::L8);
    }

    #[test]
    fn test_compress_fails_open() {
        let broken = EncodedImage::new(EncodedFormat::Png, b"not a png".to_vec());
        assert!(try_compress(&broken, &CompressOptions::default()).is_err());
        assert_eq!(compress(&broken, &CompressOptions::default()), broken);
    }
}
