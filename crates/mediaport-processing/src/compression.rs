use bytes::Bytes;
use image::{DynamicImage, GenericImageView};

use crate::error::TranscodeError;

/// Lossy WebP encoder.
pub struct WebpCompressor;

impl WebpCompressor {
    /// Encode `img` as lossy WebP at `quality` (0-100). Opaque images are encoded
    /// from RGB so no alpha plane is written.
    pub fn compress(img: &DynamicImage, quality: f32) -> Result<Bytes, TranscodeError> {
        let (width, height) = img.dimensions();
        let quality = quality.clamp(0.0, 100.0);

        let webp_data = if img.color().has_alpha() {
            let rgba_img = img.to_rgba8();
            webp::Encoder::from_rgba(&rgba_img, width, height).encode_simple(false, quality)
        } else {
            let rgb_img = img.to_rgb8();
            webp::Encoder::from_rgb(&rgb_img, width, height).encode_simple(false, quality)
        }
        .map_err(|e| TranscodeError::Encode(format!("{:?}", e)))?;

        Ok(Bytes::copy_from_slice(&webp_data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    #[test]
    fn test_compress_rgb_produces_webp() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 48, Rgb([200, 100, 50])));
        let data = WebpCompressor::compress(&img, 82.0).unwrap();
        assert_eq!(&data[0..4], b"RIFF");
        assert_eq!(&data[8..12], b"WEBP");

        let decoded = image::load_from_memory(&data).unwrap();
        assert_eq!(decoded.dimensions(), (64, 48));
    }

    #[test]
    fn test_compress_rgba() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(16, 16, Rgba([0, 0, 255, 128])));
        let data = WebpCompressor::compress(&img, 82.0).unwrap();
        assert_eq!(&data[8..12], b"WEBP");
    }
}
