// ============================================================
// Layer 4 — Image Batcher
// ============================================================
// Implements Burn's Batcher trait: turns a Vec<ImageSample>
// into the tensors the network consumes.
//
//   Input:  N samples, each size×size RGB8 in HWC order
//   Output: images  [N, 3, size, size]  float, normalised
//           targets [N]                  int, class labels
//
// Every sample was resized to the same side length at load
// time, so no padding is needed here.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::transform::normalize_chw;
use crate::domain::sample::ImageSample;

#[derive(Debug, Clone)]
pub struct ImageBatch<B: Backend> {
    /// [batch_size, 3, size, size]
    pub images:  Tensor<B, 4>,
    /// [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

/// Holds the target device so tensors are created where the model lives.
#[derive(Clone, Debug)]
pub struct ImageBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> ImageBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<ImageSample, ImageBatch<B>> for ImageBatcher<B> {
    fn batch(&self, items: Vec<ImageSample>) -> ImageBatch<B> {
        let batch_size = items.len();
        let size       = items.first().map(|s| s.size).unwrap_or(0);

        let pixels: Vec<f32> = items.iter().flat_map(normalize_chw).collect();
        let labels: Vec<i32> = items.iter().map(|s| s.label as i32).collect();

        let images = Tensor::<B, 1>::from_floats(pixels.as_slice(), &self.device)
            .reshape([batch_size, 3, size, size]);
        let targets = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &self.device);

        ImageBatch { images, targets }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_batch_shapes_and_labels() {
        let device = Default::default();
        let batcher = ImageBatcher::<TestBackend>::new(device);

        let items = vec![
            ImageSample::new(vec![0; 4 * 4 * 3], 4, 0),
            ImageSample::new(vec![255; 4 * 4 * 3], 4, 1),
            ImageSample::new(vec![128; 4 * 4 * 3], 4, 1),
        ];
        let batch = batcher.batch(items);

        assert_eq!(batch.images.dims(), [3, 3, 4, 4]);
        assert_eq!(batch.targets.dims(), [3]);

        let labels: Vec<i64> = batch
            .targets
            .into_data()
            .convert::<i64>()
            .to_vec::<i64>()
            .unwrap();
        assert_eq!(labels, vec![0, 1, 1]);
    }

    #[test]
    fn test_batch_values_are_normalised() {
        let device = Default::default();
        let batcher = ImageBatcher::<TestBackend>::new(device);
        let batch = batcher.batch(vec![ImageSample::new(vec![255; 2 * 2 * 3], 2, 0)]);

        let values: Vec<f32> = batch.images.into_data().to_vec::<f32>().unwrap();
        let expected_red = (1.0 - 0.485) / 0.229;
        assert!((values[0] - expected_red).abs() < 1e-5);
    }
}
