// ============================================================
// Layer 4 — Image Transform
// ============================================================
// The fixed preprocessing every image goes through, in order:
//
//   1. Decode (jpeg / png / bmp) with the `image` crate
//   2. Resize exactly to size × size (triangle filter)
//   3. Convert to RGB8                          → ImageSample
//   4. Scale to [0, 1], subtract ImageNet mean,
//      divide by ImageNet std, reorder HWC → CHW → normalize_chw
//
// Steps 1-3 run once at load time; step 4 runs in the batcher
// and the inferencer. There is deliberately no augmentation:
// train and val images are treated identically.

use anyhow::{Context, Result};
use image::{imageops::FilterType, DynamicImage};
use std::path::Path;

use crate::domain::sample::ImageSample;

/// Per-channel mean of ImageNet, the statistics the pretrained
/// backbone was trained with.
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const IMAGENET_STD:  [f32; 3] = [0.229, 0.224, 0.225];

#[derive(Debug, Clone, Copy)]
pub struct ImageTransform {
    size: u32,
}

impl ImageTransform {
    pub fn new(size: u32) -> Self {
        Self { size }
    }

    pub fn size(&self) -> usize {
        self.size as usize
    }

    /// Decode an image file and resize it.
    pub fn load(&self, path: &Path, label: usize) -> Result<ImageSample> {
        let img = image::open(path)
            .with_context(|| format!("Cannot decode image '{}'", path.display()))?;
        Ok(self.apply(&img, label))
    }

    /// Resize an already decoded image.
    pub fn apply(&self, img: &DynamicImage, label: usize) -> ImageSample {
        let rgb = img
            .resize_exact(self.size, self.size, FilterType::Triangle)
            .to_rgb8();
        ImageSample::new(rgb.into_raw(), self.size(), label)
    }
}

/// Normalise an RGB8 HWC sample into CHW floats.
pub fn normalize_chw(sample: &ImageSample) -> Vec<f32> {
    let plane = sample.size * sample.size;
    let mut out = vec![0.0f32; plane * 3];

    for (i, px) in sample.pixels.chunks_exact(3).enumerate() {
        for c in 0..3 {
            let v = px[c] as f32 / 255.0;
            out[c * plane + i] = (v - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_resize_to_square() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 20, Rgb([10, 20, 30])));
        let sample = ImageTransform::new(8).apply(&img, 1);
        assert_eq!(sample.size, 8);
        assert_eq!(sample.label, 1);
        assert_eq!(sample.pixels.len(), 8 * 8 * 3);
        assert_eq!(&sample.pixels[0..3], &[10, 20, 30]);
    }

    #[test]
    fn test_normalize_is_channel_major() {
        // 2x2 image: red, green / blue, white
        let pixels = vec![
            255, 0, 0,    0, 255, 0,
            0, 0, 255,    255, 255, 255,
        ];
        let sample = ImageSample::new(pixels, 2, 0);
        let out = normalize_chw(&sample);
        assert_eq!(out.len(), 12);

        let hi = |c: usize| (1.0 - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
        let lo = |c: usize| (0.0 - IMAGENET_MEAN[c]) / IMAGENET_STD[c];

        // red plane
        assert!((out[0] - hi(0)).abs() < 1e-6);
        assert!((out[1] - lo(0)).abs() < 1e-6);
        assert!((out[3] - hi(0)).abs() < 1e-6);
        // green plane
        assert!((out[4 + 1] - hi(1)).abs() < 1e-6);
        // blue plane
        assert!((out[8 + 2] - hi(2)).abs() < 1e-6);
        assert!((out[8] - lo(2)).abs() < 1e-6);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let t = ImageTransform::new(4);
        assert!(t.load(Path::new("/definitely/not/here.png"), 0).is_err());
    }
}
