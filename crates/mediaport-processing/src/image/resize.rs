use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};

/// Image resize operations
pub struct ImageResize;

impl ImageResize {
    /// Dimensions after shrinking so neither side exceeds `max_dimension`,
    /// preserving aspect ratio. Images already within bounds are unchanged.
    pub fn fit_within(orig_width: u32, orig_height: u32, max_dimension: u32) -> (u32, u32) {
        if orig_width <= max_dimension && orig_height <= max_dimension {
            return (orig_width, orig_height);
        }

        if orig_width >= orig_height {
            let aspect_ratio = orig_height as f32 / orig_width as f32;
            let h = (max_dimension as f32 * aspect_ratio).round() as u32;
            (max_dimension, h.clamp(1, max_dimension))
        } else {
            let aspect_ratio = orig_width as f32 / orig_height as f32;
            let w = (max_dimension as f32 * aspect_ratio).round() as u32;
            (w.clamp(1, max_dimension), max_dimension)
        }
    }

    /// Select appropriate filter type based on resize ratio
    pub fn select_filter(
        orig_width: u32,
        orig_height: u32,
        new_width: u32,
        new_height: u32,
    ) -> FilterType {
        let width_ratio = orig_width as f32 / new_width as f32;
        let height_ratio = orig_height as f32 / new_height as f32;
        let max_ratio = width_ratio.max(height_ratio);

        if max_ratio > 2.0 {
            FilterType::Triangle
        } else if max_ratio > 1.5 {
            FilterType::CatmullRom
        } else {
            FilterType::Lanczos3
        }
    }

    /// Downscale so the longer side is at most `max_dimension`. Never upscales.
    pub fn downscale_to_fit(img: DynamicImage, max_dimension: u32) -> DynamicImage {
        let (orig_width, orig_height) = img.dimensions();
        let (width, height) = Self::fit_within(orig_width, orig_height, max_dimension);
        if (width, height) == (orig_width, orig_height) {
            return img;
        }
        let filter = Self::select_filter(orig_width, orig_height, width, height);
        img.resize_exact(width, height, filter)
    }
}
