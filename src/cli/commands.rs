// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// The two subcommands, `search` and `predict`, and their flags.
// clap's derive macros generate --help, missing-argument errors
// and string → number conversion.

use clap::{Args, Subcommand};
use crate::application::search_use_case::SearchConfig;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Grid-search learning rate × batch size and save the best model
    Search(SearchArgs),

    /// Classify one image with the model saved by `search`
    Predict(PredictArgs),
}

/// All arguments for the `search` command.
#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Directory with train/ and val/ sub-directories of class folders
    #[arg(long, default_value = "data")]
    pub data_dir: String,

    /// Where the best model, run config, summary and trial log go
    #[arg(long, default_value = "artifacts")]
    pub output_dir: String,

    /// torchvision resnet18 .pth weights; random init when omitted
    #[arg(long)]
    pub weights: Option<String>,

    /// Training epochs per trial
    #[arg(long, default_value_t = 5)]
    pub epochs: usize,

    /// Smallest learning rate in the grid
    #[arg(long, default_value_t = 1e-4)]
    pub lr_min: f64,

    /// Largest learning rate in the grid
    #[arg(long, default_value_t = 1e-1)]
    pub lr_max: f64,

    /// Number of learning rates, log-spaced between --lr-min and --lr-max
    #[arg(long, default_value_t = 4)]
    pub num_lr: usize,

    /// Smallest batch size; each further batch size doubles it
    #[arg(long, default_value_t = 4)]
    pub bs_min: usize,

    /// Number of batch sizes
    #[arg(long, default_value_t = 4)]
    pub num_bs: usize,

    /// SGD momentum
    #[arg(long, default_value_t = 0.9)]
    pub momentum: f64,

    /// Images are resized to this square side before training
    #[arg(long, default_value_t = 224)]
    pub image_size: u32,

    /// Hold out this fraction of train/ when there is no val/ folder
    #[arg(long)]
    pub val_fraction: Option<f64>,

    /// Only train the classification layer
    #[arg(long)]
    pub freeze_backbone: bool,

    /// Data loader worker threads
    #[arg(long, default_value_t = 2)]
    pub num_workers: usize,

    /// Seed for weight init, shuffling and the train/val split
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// Convert CLI SearchArgs into the application-layer SearchConfig.
impl From<SearchArgs> for SearchConfig {
    fn from(a: SearchArgs) -> Self {
        SearchConfig {
            data_dir:        a.data_dir,
            output_dir:      a.output_dir,
            weights:         a.weights,
            epochs:          a.epochs,
            lr_min:          a.lr_min,
            lr_max:          a.lr_max,
            num_lr:          a.num_lr,
            bs_min:          a.bs_min,
            num_bs:          a.num_bs,
            momentum:        a.momentum,
            image_size:      a.image_size,
            val_fraction:    a.val_fraction,
            freeze_backbone: a.freeze_backbone,
            num_workers:     a.num_workers,
            seed:            a.seed,
        }
    }
}

/// All arguments for the `predict` command
#[derive(Args, Debug)]
pub struct PredictArgs {
    /// Image file to classify
    #[arg(long)]
    pub image: String,

    /// Directory written by `search`
    #[arg(long, default_value = "artifacts")]
    pub output_dir: String,
}
