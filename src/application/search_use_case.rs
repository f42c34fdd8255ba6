// ============================================================
// Layer 2 — SearchUseCase
// ============================================================
// Orchestrates a full grid search, in order:
//
//   Step 1: Check numeric settings
//   Step 2: Validate data directories  (Layer 4 - data)
//   Step 3: Generate the grid          (Layer 3 - domain)
//   Step 4: Load + resize images       (Layer 4 - data)
//   Step 5: Save run config            (Layer 6 - infra)
//   Step 6: Train every grid point     (Layer 5 - ml)
//   Step 7: Save best model + summary  (Layer 6 - infra)
//
// Steps 1-3 touch no pixels and build no network, so typos
// in paths or bounds fail before any training time is spent.

use anyhow::{ensure, Result};
use burn::{
    backend::{wgpu::WgpuDevice, Autodiff, Wgpu},
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::application::grid_search::find_best_model;
use crate::data::{
    dataset::ImageDataset,
    loader::{validate_data_dir, DatasetError, ImageFolderLoader, TRAIN_SPLIT, VAL_SPLIT},
    splitter::split_train_val,
    transform::ImageTransform,
};
use crate::domain::{
    hyperparams::ParamGrid,
    sample::ImageSample,
    traits::ImageSource,
    trial::SearchOutcome,
};
use crate::infra::{checkpoint::ArtifactStore, metrics::TrialLogger};
use crate::ml::trainer::{BurnTrialRunner, TrialSettings};

type SearchBackend = Autodiff<Wgpu>;

// ─── Search Configuration ────────────────────────────────────────────────────
// Every setting of a search. Saved as search_config.json so a
// later `predict` knows the image size the model was trained on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub data_dir:        String,
    pub output_dir:      String,
    pub weights:         Option<String>,
    pub epochs:          usize,
    pub lr_min:          f64,
    pub lr_max:          f64,
    pub num_lr:          usize,
    pub bs_min:          usize,
    pub num_bs:          usize,
    pub momentum:        f64,
    pub image_size:      u32,
    pub val_fraction:    Option<f64>,
    pub freeze_backbone: bool,
    pub num_workers:     usize,
    pub seed:            u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            data_dir:        "data".to_string(),
            output_dir:      "artifacts".to_string(),
            weights:         None,
            epochs:          5,
            lr_min:          1e-4,
            lr_max:          1e-1,
            num_lr:          4,
            bs_min:          4,
            num_bs:          4,
            momentum:        0.9,
            image_size:      224,
            val_fraction:    None,
            freeze_backbone: false,
            num_workers:     2,
            seed:            42,
        }
    }
}

impl SearchConfig {
    fn check(&self) -> Result<()> {
        ensure!(self.epochs > 0, "epochs must be at least 1");
        ensure!(self.image_size >= 32, "image size must be at least 32 pixels (got {})", self.image_size);
        ensure!(
            (0.0..1.0).contains(&self.momentum),
            "momentum must be in [0, 1) (got {})",
            self.momentum
        );
        if let Some(f) = self.val_fraction {
            ensure!(f > 0.0 && f < 1.0, "validation fraction must be in (0, 1) (got {f})");
        }
        Ok(())
    }
}

/// What the CLI prints after a search.
#[derive(Debug, Clone)]
pub struct SearchReport {
    pub outcome:    SearchOutcome,
    pub classes:    Vec<String>,
    pub model_path: PathBuf,
}

// ─── SearchUseCase ────────────────────────────────────────────────────────────
pub struct SearchUseCase {
    config: SearchConfig,
}

impl SearchUseCase {
    pub fn new(config: SearchConfig) -> Self {
        Self { config }
    }

    /// Run the search on the default GPU.
    pub fn execute(&self) -> Result<SearchReport> {
        let device = WgpuDevice::default();
        tracing::info!("Using WGPU device: {:?}", device);
        self.execute_on::<SearchBackend>(device)
    }

    /// Run the search on any autodiff backend.
    pub fn execute_on<B: AutodiffBackend>(&self, device: B::Device) -> Result<SearchReport> {
        let cfg = &self.config;

        // ── Step 1-3: everything that can fail cheaply ───────────────────────
        cfg.check()?;
        let layout = validate_data_dir(Path::new(&cfg.data_dir), cfg.val_fraction.is_some())?;
        let grid = ParamGrid::generate(cfg.lr_min, cfg.lr_max, cfg.num_lr, cfg.bs_min, cfg.num_bs)?;
        tracing::info!(
            "Grid: {} batch sizes {:?} × {} learning rates {:?} = {} trials of {} epochs",
            grid.batch_sizes.len(),
            grid.batch_sizes,
            grid.learning_rates.len(),
            grid.learning_rates,
            grid.len(),
            cfg.epochs
        );

        // ── Step 4: images ───────────────────────────────────────────────────
        let has_val = layout.has_val;
        let loader = ImageFolderLoader::new(layout, ImageTransform::new(cfg.image_size));
        let classes = loader.classes().to_vec();

        let (train_samples, val_samples) = load_splits(&loader, has_val, cfg)?;
        for (split, samples) in [(TRAIN_SPLIT, &train_samples), (VAL_SPLIT, &val_samples)] {
            if samples.is_empty() {
                return Err(DatasetError::EmptySplit { split: split.to_string() }.into());
            }
        }

        let train_dataset = ImageDataset::new(train_samples);
        let val_dataset   = ImageDataset::new(val_samples);
        tracing::info!(
            "Train: {} images {:?} | Val: {} images {:?}",
            train_dataset.sample_count(),
            train_dataset.class_counts(classes.len()),
            val_dataset.sample_count(),
            val_dataset.class_counts(classes.len()),
        );

        // ── Step 5: config ───────────────────────────────────────────────────
        let store = ArtifactStore::create(&cfg.output_dir)?;
        store.save_config(cfg, &classes)?;
        let trial_log = TrialLogger::new(store.dir())?;
        tracing::info!("Logging trials to '{}'", trial_log.csv_path().display());

        // ── Step 6: the grid ─────────────────────────────────────────────────
        let settings = TrialSettings {
            num_classes:     classes.len(),
            epochs:          cfg.epochs,
            momentum:        cfg.momentum,
            weights:         cfg.weights.as_ref().map(PathBuf::from),
            freeze_backbone: cfg.freeze_backbone,
            num_workers:     cfg.num_workers.max(1),
            seed:            cfg.seed,
        };
        let mut runner = BurnTrialRunner::<B>::new(settings, train_dataset, val_dataset, device)?;
        let (outcome, best_model) = find_best_model(&grid, &mut runner, |t| trial_log.log(t))?;

        // ── Step 7: results ──────────────────────────────────────────────────
        store.save_model(&best_model)?;
        store.save_summary(&outcome)?;
        tracing::info!("Best model saved to '{}'", store.model_path().display());

        Ok(SearchReport { outcome, classes, model_path: store.model_path() })
    }
}

/// Train and validation samples: val/ when it exists, otherwise a
/// seeded hold-out of train/ sized by `val_fraction`.
fn load_splits(
    loader:  &ImageFolderLoader,
    has_val: bool,
    cfg:     &SearchConfig,
) -> Result<(Vec<ImageSample>, Vec<ImageSample>)> {
    let train_samples = loader.load_split(TRAIN_SPLIT)?;
    match (has_val, cfg.val_fraction) {
        (true, fraction) => {
            if fraction.is_some() {
                tracing::info!("'{}' exists, ignoring --val-fraction", VAL_SPLIT);
            }
            Ok((train_samples, loader.load_split(VAL_SPLIT)?))
        }
        (false, Some(fraction)) => {
            tracing::info!("No '{}' folder, holding out {:.0}% of train", VAL_SPLIT, fraction * 100.0);
            Ok(split_train_val(train_samples, 1.0 - fraction, cfg.seed))
        }
        (false, None) => {
            let path = Path::new(&cfg.data_dir).join(VAL_SPLIT);
            Err(DatasetError::MissingDirectory { what: "val", path }.into())
        }
    }
}
