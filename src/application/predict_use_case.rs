// ============================================================
// Layer 2 — Predict Use Case
// ============================================================
// Classifies one image with the model a search left behind:
//   1. Read search_config.json (class names, image size)
//   2. Rebuild ResNet-18 with that many classes
//   3. Load best_model.mpk into it
//   4. Resize the image exactly like training did, then classify

use anyhow::{Context, Result};
use burn::{
    backend::{wgpu::WgpuDevice, Wgpu},
    prelude::*,
};
use std::path::Path;

use crate::data::transform::ImageTransform;
use crate::infra::checkpoint::ArtifactStore;
use crate::ml::{inferencer::Inferencer, model::ResNetConfig};

type InferBackend = Wgpu;

/// A predicted class name with its probability.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub class:       String,
    pub probability: f32,
}

pub struct PredictUseCase<B: Backend> {
    classes:    Vec<String>,
    transform:  ImageTransform,
    inferencer: Inferencer<B>,
}

impl PredictUseCase<InferBackend> {
    pub fn new(output_dir: impl AsRef<Path>) -> Result<Self> {
        Self::open_on(output_dir, WgpuDevice::default())
    }
}

impl<B: Backend> PredictUseCase<B> {
    pub fn open_on(output_dir: impl AsRef<Path>, device: B::Device) -> Result<Self> {
        let store    = ArtifactStore::open(output_dir)?;
        let manifest = store.load_config()?;

        let model = ResNetConfig::new(manifest.classes.len()).init::<B>(&device);
        let model = store.load_model(model, &device)?;
        tracing::info!(
            "Model loaded from '{}' ({} classes)",
            store.model_path().display(),
            manifest.classes.len()
        );

        Ok(Self {
            classes:    manifest.classes,
            transform:  ImageTransform::new(manifest.config.image_size),
            inferencer: Inferencer::new(model, device),
        })
    }

    pub fn predict(&self, image: &Path) -> Result<Prediction> {
        let sample = self.transform.load(image, 0)?;
        let (label, probability) = self.inferencer.classify(&sample)?;
        let class = self
            .classes
            .get(label)
            .cloned()
            .with_context(|| format!("model predicted label {label} but only {} classes are known", self.classes.len()))?;
        Ok(Prediction { class, probability })
    }
}
