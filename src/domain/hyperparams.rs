// ============================================================
// Layer 3 — Hyperparameter Grid
// ============================================================
// The search space for a run: N batch sizes × M learning rates.
//
//   learning rates — log-spaced between lr_min and lr_max,
//                    because useful rates span decades
//                    (1e-4, 1e-3, 1e-2, 1e-1)
//   batch sizes    — doubling from bs_min (4, 8, 16, 32)
//
// Once the best trial is known, get_range() turns its values
// into a recommended window of ±10% for follow-up training.
//
// Pure Rust only — no Burn types in this layer.

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

/// Half-width of the recommended window around a winning value.
pub const RANGE_MARGIN: f64 = 0.10;

/// One point in the grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrialParams {
    pub batch_size:    usize,
    pub learning_rate: f64,
}

/// Closed interval recommended around a winning value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchRange<T> {
    pub low:  T,
    pub high: T,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamGrid {
    pub learning_rates: Vec<f64>,
    pub batch_sizes:    Vec<usize>,
}

impl ParamGrid {
    /// Build the grid from its bounds.
    ///
    /// `num_lr` learning rates are spread evenly in log space from
    /// `lr_min` to `lr_max` (both included). A single learning rate
    /// means just `lr_min`. `num_bs` batch sizes double from `bs_min`.
    pub fn generate(
        lr_min: f64,
        lr_max: f64,
        num_lr: usize,
        bs_min: usize,
        num_bs: usize,
    ) -> Result<Self> {
        ensure!(num_lr > 0, "number of learning rates must be at least 1");
        ensure!(num_bs > 0, "number of batch sizes must be at least 1");
        ensure!(bs_min > 0, "minimum batch size must be at least 1");
        ensure!(
            lr_min.is_finite() && lr_max.is_finite(),
            "learning rate bounds must be finite (got {lr_min}, {lr_max})"
        );
        ensure!(lr_min > 0.0, "minimum learning rate must be positive (got {lr_min})");
        ensure!(
            lr_max >= lr_min,
            "maximum learning rate {lr_max} is below minimum {lr_min}"
        );

        let learning_rates = log_space(lr_min, lr_max, num_lr);

        let mut batch_sizes = Vec::with_capacity(num_bs);
        let mut bs = bs_min;
        for i in 0..num_bs {
            batch_sizes.push(bs);
            if i + 1 < num_bs {
                bs = bs.checked_mul(2).ok_or_else(|| {
                    anyhow::anyhow!("batch size overflow after {} doublings of {bs_min}", i + 1)
                })?;
            }
        }

        Ok(Self { learning_rates, batch_sizes })
    }

    /// Every (batch size, learning rate) pair, batch sizes in the outer loop.
    pub fn combinations(&self) -> impl Iterator<Item = TrialParams> + '_ {
        self.batch_sizes.iter().flat_map(move |&batch_size| {
            self.learning_rates
                .iter()
                .map(move |&learning_rate| TrialParams { batch_size, learning_rate })
        })
    }

    pub fn len(&self) -> usize {
        self.learning_rates.len() * self.batch_sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn log_space(low: f64, high: f64, count: usize) -> Vec<f64> {
    if count == 1 {
        return vec![low];
    }
    let (log_low, log_high) = (low.ln(), high.ln());
    let step = (log_high - log_low) / (count - 1) as f64;
    let mut values: Vec<f64> = (0..count)
        .map(|i| (log_low + step * i as f64).exp())
        .collect();
    // pin the endpoints so exp(ln(x)) drift never leaks into the report
    values[0] = low;
    values[count - 1] = high;
    values
}

/// ±10% window around a winning learning rate.
pub fn get_range(value: f64) -> SearchRange<f64> {
    SearchRange {
        low:  value * (1.0 - RANGE_MARGIN),
        high: value * (1.0 + RANGE_MARGIN),
    }
}

/// ±10% window around a winning batch size, rounded to whole samples.
pub fn get_batch_range(batch_size: usize) -> SearchRange<usize> {
    let range = get_range(batch_size as f64);
    let low = (range.low.round() as usize).max(1);
    let high = (range.high.round() as usize).max(low);
    SearchRange { low, high }
}
