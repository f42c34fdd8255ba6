// ============================================================
// Layer 5 — Trial Training Loop
// ============================================================
// Trains and validates one grid point (generate_model):
//
//   1. Fresh ResNet-18 (copy of the ImageNet weights read once
//      when the runner is built, new head)
//   2. SGD with momentum at the trial's learning rate
//   3. `epochs` passes over the shuffled training set in
//      batches of the trial's batch size
//   4. model.valid() → one pass over the validation set
//
// Key Burn insight:
//   - Training runs on B (Autodiff<...>) for gradients
//   - model.valid() returns the model on B::InnerBackend,
//     where BatchNorm uses its running statistics
//   - The validation batcher must also use B::InnerBackend
//
// Reference: Burn Book §5

use anyhow::Result;
use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    module::AutodiffModule,
    optim::{momentum::MomentumConfig, GradientsParams, Optimizer, SgdConfig},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use std::{path::PathBuf, sync::Arc, time::Instant};

use crate::data::{
    batcher::{ImageBatch, ImageBatcher},
    dataset::ImageDataset,
};
use crate::domain::{hyperparams::TrialParams, traits::TrialRunner, trial::TrialResult};
use crate::ml::model::{load_pretrained, ResNet, ResNetConfig};

/// Everything about a trial that does not vary across the grid.
#[derive(Debug, Clone)]
pub struct TrialSettings {
    pub num_classes:     usize,
    pub epochs:          usize,
    pub momentum:        f64,
    pub weights:         Option<PathBuf>,
    pub freeze_backbone: bool,
    pub num_workers:     usize,
    pub seed:            u64,
}

/// Validation loss and accuracy of one model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalMetrics {
    pub loss:     f64,
    pub accuracy: f64,
    pub samples:  usize,
}

/// Fine-tunes ResNet-18 with Burn for each grid point it is given.
pub struct BurnTrialRunner<B: AutodiffBackend> {
    settings:   TrialSettings,
    pretrained: Option<ResNet<B>>,
    train:      Arc<ImageDataset>,
    val:        Arc<ImageDataset>,
    device:     B::Device,
}

impl<B: AutodiffBackend> BurnTrialRunner<B> {
    /// Reads the pretrained checkpoint, if any, so trials only copy it.
    pub fn new(
        settings: TrialSettings,
        train:    ImageDataset,
        val:      ImageDataset,
        device:   B::Device,
    ) -> Result<Self> {
        let pretrained = match &settings.weights {
            Some(path) => {
                tracing::info!("Loading pretrained weights from '{}'", path.display());
                Some(load_pretrained::<B>(path, &device)?)
            }
            None => {
                tracing::warn!("No pretrained weights given: every trial starts from random initialisation");
                None
            }
        };
        Ok(Self { settings, pretrained, train: Arc::new(train), val: Arc::new(val), device })
    }

    fn build_model(&self) -> ResNet<B> {
        let num_classes = self.settings.num_classes;
        let model = match &self.pretrained {
            Some(backbone) => backbone.clone().with_head(num_classes, &self.device),
            None           => ResNetConfig::new(num_classes).init::<B>(&self.device),
        };
        if self.settings.freeze_backbone { model.freeze_backbone() } else { model }
    }
}

impl<B: AutodiffBackend> TrialRunner<ResNet<B::InnerBackend>> for BurnTrialRunner<B> {
    fn run(
        &mut self,
        trial:  usize,
        params: &TrialParams,
    ) -> Result<(TrialResult, ResNet<B::InnerBackend>)> {
        let started = Instant::now();
        let cfg = &self.settings;

        // Same seed every trial: runs differ only by their hyperparameters
        B::seed(cfg.seed);
        let mut model = self.build_model();

        let mut optim = SgdConfig::new()
            .with_momentum(Some(MomentumConfig {
                momentum:  cfg.momentum,
                dampening: 0.0,
                nesterov:  false,
            }))
            .init();

        let train_loader = DataLoaderBuilder::new(ImageBatcher::<B>::new(self.device.clone()))
            .batch_size(params.batch_size)
            .shuffle(cfg.seed)
            .num_workers(cfg.num_workers)
            .build(self.train.clone());

        let val_loader = DataLoaderBuilder::new(ImageBatcher::<B::InnerBackend>::new(self.device.clone()))
            .batch_size(params.batch_size)
            .num_workers(cfg.num_workers)
            .build(self.val.clone());

        let mut train_loss = f64::NAN;

        for epoch in 1..=cfg.epochs {
            let mut loss_sum = 0.0f64;
            let mut seen     = 0usize;

            for batch in train_loader.iter() {
                let n = batch.targets.dims()[0];
                let (loss, _) = model.forward_classification(batch.images, batch.targets);

                loss_sum += loss.clone().into_scalar().elem::<f64>() * n as f64;
                seen     += n;

                let grads = loss.backward();
                let grads = GradientsParams::from_grads(grads, &model);
                model = optim.step(params.learning_rate, model, grads);
            }

            train_loss = mean_loss(loss_sum, seen);
            tracing::info!(
                "  trial {trial} | epoch {epoch:>3}/{} | train_loss={train_loss:.4}",
                cfg.epochs
            );
        }

        let model_valid = model.valid();
        let metrics = evaluate(&model_valid, &val_loader);
        tracing::info!(
            "  trial {trial} | validated on {} images | val_loss={:.4} val_acc={:.2}%",
            metrics.samples,
            metrics.loss,
            metrics.accuracy * 100.0
        );

        let result = TrialResult {
            trial,
            params:       *params,
            train_loss,
            val_loss:     metrics.loss,
            val_accuracy: metrics.accuracy,
            elapsed_secs: started.elapsed().as_secs_f64(),
        };
        Ok((result, model_valid))
    }
}

/// Per-sample mean of batch losses that were each scaled by their batch size.
fn mean_loss(weighted_sum: f64, samples: usize) -> f64 {
    if samples == 0 {
        f64::NAN
    } else {
        weighted_sum / samples as f64
    }
}

/// Mean per-sample cross-entropy and accuracy over a loader.
pub fn evaluate<B: Backend>(
    model:  &ResNet<B>,
    loader: &Arc<dyn DataLoader<ImageBatch<B>>>,
) -> EvalMetrics {
    let mut loss_sum = 0.0f64;
    let mut correct  = 0usize;
    let mut total    = 0usize;

    for batch in loader.iter() {
        let n = batch.targets.dims()[0];
        let (loss, logits) = model.forward_classification(batch.images, batch.targets.clone());

        // batch loss is a mean; weight by size so a short final batch counts less
        loss_sum += loss.into_scalar().elem::<f64>() * n as f64;

        // argmax(1) returns [batch, 1]; flatten before comparing with [batch]
        let predicted = logits.argmax(1).flatten::<1>(0, 1);
        let hits: i64 = predicted
            .equal(batch.targets)
            .int()
            .sum()
            .into_scalar()
            .elem::<i64>();

        correct += hits as usize;
        total   += n;
    }

    if total == 0 {
        return EvalMetrics { loss: f64::NAN, accuracy: 0.0, samples: 0 };
    }
    EvalMetrics {
        loss:     mean_loss(loss_sum, total),
        accuracy: correct as f64 / total as f64,
        samples:  total,
    }
}
