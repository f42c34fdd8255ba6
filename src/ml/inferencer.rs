// ============================================================
// Layer 5 — Inferencer
// ============================================================
use anyhow::{anyhow, Result};
use burn::prelude::*;

use crate::data::transform::normalize_chw;
use crate::domain::sample::ImageSample;
use crate::ml::model::ResNet;

pub struct Inferencer<B: Backend> {
    model:  ResNet<B>,
    device: B::Device,
}

impl<B: Backend> Inferencer<B> {
    pub fn new(model: ResNet<B>, device: B::Device) -> Self {
        Self { model, device }
    }

    /// Predicted label and its softmax probability.
    pub fn classify(&self, sample: &ImageSample) -> Result<(usize, f32)> {
        let size = sample.size;
        let input = Tensor::<B, 1>::from_floats(normalize_chw(sample).as_slice(), &self.device)
            .reshape([1, 3, size, size]);

        let logits = self.model.forward(input);
        let probs: Vec<f32> = burn::tensor::activation::softmax(logits, 1)
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| anyhow!("cannot read probabilities: {e:?}"))?;

        let (label, prob) = probs
            .iter()
            .copied()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .ok_or_else(|| anyhow!("model produced no classes"))?;

        tracing::debug!("Class probabilities: {:?}", probs);
        Ok((label, prob))
    }
}
