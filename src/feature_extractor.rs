//! Feature extraction for ensemble model inference.
//!
//! Turns an uploaded image into the flattened grayscale vector the
//! classifiers were trained on: one channel, resampled to the canonical
//! resolution, intensities scaled into `[0, 1]`, row-major order.

use crate::error::PreprocessingError;
use crate::types::FeatureVector;
use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Luma};
use std::path::Path;

/// Canonical image width expected by the models
pub const DEFAULT_WIDTH: u32 = 28;
/// Canonical image height expected by the models
pub const DEFAULT_HEIGHT: u32 = 28;

/// Largest representable 8-bit intensity
const MAX_INTENSITY: f32 = 255.0;

/// ITU-R 601-2 luma weights in 16.16 fixed point
const LUMA_R: u32 = 19595;
const LUMA_G: u32 = 38470;
const LUMA_B: u32 = 7471;

/// Feature extractor that transforms images into model input features.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    width: u32,
    height: u32,
}

impl FeatureExtractor {
    /// Create a feature extractor for the canonical 28x28 size.
    pub fn new() -> Self {
        Self::with_size(DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }

    /// Create a feature extractor for a custom target size.
    pub fn with_size(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Extract features from a decoded image.
    ///
    /// The image is reduced to one channel with ITU-R 601-2 luma weights
    /// before resampling, matching the preprocessing used when the models
    /// were trained. Nearest-neighbour resampling keeps every output
    /// intensity an exact source intensity.
    pub fn extract(&self, image: &DynamicImage) -> Result<FeatureVector, PreprocessingError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(PreprocessingError::NoPixels);
        }

        let gray = to_grayscale(image);
        let gray = if gray.dimensions() == (self.width, self.height) {
            gray
        } else {
            imageops::resize(&gray, self.width, self.height, FilterType::Nearest)
        };

        let values: Vec<f32> = gray
            .pixels()
            .map(|pixel| pixel.0[0] as f32 / MAX_INTENSITY)
            .collect();

        FeatureVector::new(values)
    }

    /// Decode raw image bytes (format sniffed from content) and extract features.
    pub fn extract_bytes(&self, bytes: &[u8]) -> Result<FeatureVector, PreprocessingError> {
        if bytes.is_empty() {
            return Err(PreprocessingError::EmptyData);
        }

        let image = image::load_from_memory(bytes)?;
        self.extract(&image)
    }

    /// Read an image from disk and extract features.
    pub fn extract_path<P: AsRef<Path>>(&self, path: P) -> Result<FeatureVector, PreprocessingError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| PreprocessingError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        self.extract_bytes(&bytes)
    }

    /// Get the number of features produced.
    pub fn feature_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Target `(width, height)` every image is resampled to.
    pub fn target_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Single-channel 8-bit view of `image`.
///
/// Colour input is weighted `(R*299 + G*587 + B*114) / 1000` with rounding.
/// Alpha is ignored. Grayscale input only changes bit depth.
fn to_grayscale(image: &DynamicImage) -> GrayImage {
    match image {
        DynamicImage::ImageLuma8(gray) => gray.clone(),
        DynamicImage::ImageLuma16(_)
        | DynamicImage::ImageLumaA8(_)
        | DynamicImage::ImageLumaA16(_) => image.to_luma8(),
        _ => {
            let rgb = image.to_rgb8();
            GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
                let [r, g, b] = rgb.get_pixel(x, y).0;
                let luma = (r as u32 * LUMA_R + g as u32 * LUMA_G + b as u32 * LUMA_B + 0x8000) >> 16;
                Luma([luma as u8])
            })
        }
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}
