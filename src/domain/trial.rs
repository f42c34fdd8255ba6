// ============================================================
// Layer 3 — Trial Results
// ============================================================
// What one grid point produced, and what the whole search
// concluded. Serialisable so the summary can be written to
// summary.json next to the best model.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::domain::hyperparams::{get_batch_range, get_range, SearchRange, TrialParams};

/// Outcome of training and validating one (batch size, learning rate) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialResult {
    /// 1-based position in the grid
    pub trial:        usize,
    pub params:       TrialParams,
    /// Mean training loss over the last epoch
    pub train_loss:   f64,
    pub val_loss:     f64,
    /// Fraction of validation images classified correctly, in [0, 1]
    pub val_accuracy: f64,
    pub elapsed_secs: f64,
}

impl TrialResult {
    /// True if this trial should replace `best`. Equal accuracy keeps
    /// the earlier trial.
    pub fn beats(&self, best: &TrialResult) -> bool {
        self.val_accuracy > best.val_accuracy
    }
}

/// Final report of a grid search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub best:        TrialResult,
    pub trials:      Vec<TrialResult>,
    pub lr_range:    SearchRange<f64>,
    pub batch_range: SearchRange<usize>,
}

impl SearchOutcome {
    /// Pick the most accurate trial and derive the recommended ranges from it.
    pub fn from_trials(trials: Vec<TrialResult>) -> Result<Self> {
        let best = trials
            .iter()
            .fold(None::<&TrialResult>, |best, t| match best {
                Some(b) if !t.beats(b) => Some(b),
                _ => Some(t),
            })
            .cloned()
            .ok_or_else(|| anyhow!("no trials were run"))?;

        Ok(Self {
            lr_range:    get_range(best.params.learning_rate),
            batch_range: get_batch_range(best.params.batch_size),
            best,
            trials,
        })
    }
}
