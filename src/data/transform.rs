use std::path::Path;

use image::imageops::FilterType;

use crate::error::DatasetError;

pub const IMG_CHANNELS: usize = 3;

/// Channel statistics of the ImageNet training set, the standard
/// normalization for Mini-ImageNet pipelines.
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// A decoded, resized and normalized image in CHW layout.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pub pixels: Vec<f32>,
    /// `[channels, height, width]`
    pub shape: [usize; 3],
}

/// Decode pipeline: open -> RGB -> bilinear square resize -> scale to
/// `[0, 1]` -> per-channel normalize -> CHW.
///
/// Runs on every access; decoded images are never cached.
#[derive(Debug, Clone)]
pub struct ImageTransform {
    resize: u32,
    mean: [f32; 3],
    std: [f32; 3],
}

impl ImageTransform {
    pub fn new(resize: u32) -> Self {
        Self {
            resize,
            mean: IMAGENET_MEAN,
            std: IMAGENET_STD,
        }
    }

    /// Override the normalization statistics, for datasets that are not
    /// ImageNet-like.
    pub fn with_stats(mut self, mean: [f32; 3], std: [f32; 3]) -> Self {
        self.mean = mean;
        self.std = std;
        self
    }

    pub fn side(&self) -> usize {
        self.resize as usize
    }

    pub fn load(&self, path: &Path) -> Result<DecodedImage, DatasetError> {
        let img = image::open(path).map_err(|source| DatasetError::ImageLoad {
            path: path.to_path_buf(),
            source,
        })?;
        let img = img
            .resize_exact(self.resize, self.resize, FilterType::Triangle)
            .to_rgb8();

        let side = self.side();
        let mut pixels = vec![0f32; IMG_CHANNELS * side * side];
        for (x, y, pixel) in img.enumerate_pixels() {
            let i = y as usize;
            let j = x as usize;
            for c in 0..IMG_CHANNELS {
                let v = pixel[c] as f32 / 255.0;
                pixels[c * side * side + i * side + j] = (v - self.mean[c]) / self.std[c];
            }
        }

        Ok(DecodedImage {
            pixels,
            shape: [IMG_CHANNELS, side, side],
        })
    }
}
