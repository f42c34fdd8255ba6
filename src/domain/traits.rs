// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The two seams of the search pipeline:
//
//   ImageSource  — where labelled images come from
//                  (ImageFolderLoader reads train/ and val/ folders)
//
//   TrialRunner  — how one grid point is trained and validated
//                  (BurnTrialRunner fine-tunes ResNet-18)
//
// The grid loop only sees TrialRunner, so it can be exercised
// in tests with a scripted runner instead of a real network.

use anyhow::Result;

use crate::domain::hyperparams::TrialParams;
use crate::domain::sample::ImageSample;
use crate::domain::trial::TrialResult;

// ─── ImageSource ──────────────────────────────────────────────────────────────
/// Anything that can produce the labelled images of a named split.
pub trait ImageSource {
    /// Class names, indexed by label.
    fn classes(&self) -> &[String];

    /// Load every sample of `split` ("train" or "val").
    fn load_split(&self, split: &str) -> Result<Vec<ImageSample>>;
}

// ─── TrialRunner ──────────────────────────────────────────────────────────────
/// Trains a fresh model for one grid point and reports how it did.
///
/// `M` is the trained model type handed back so the caller can keep
/// the best one.
pub trait TrialRunner<M> {
    fn run(&mut self, trial: usize, params: &TrialParams) -> Result<(TrialResult, M)>;
}
