// ============================================================
// Layer 6 — Trial Logger
// ============================================================
// Records one CSV row per finished trial so a long search
// can be watched (tail -f) and plotted afterwards.
//
// Output file: <output-dir>/trials.csv
//
//   trial,batch_size,learning_rate,train_loss,val_loss,val_accuracy,elapsed_secs
//   1,4,1e-4,0.693100,0.684200,0.562500,41.20
//   2,4,1e-3,0.412300,0.398100,0.875000,40.80
//   ...
//
// A new search truncates the file: rows from an earlier run
// with a different grid would be misleading next to new ones.

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use crate::domain::trial::TrialResult;

const HEADER: &str = "trial,batch_size,learning_rate,train_loss,val_loss,val_accuracy,elapsed_secs";

pub struct TrialLogger {
    csv_path: PathBuf,
}

impl TrialLogger {
    /// Start a fresh `trials.csv` in `dir`.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let csv_path = dir.join("trials.csv");
        let mut f = fs::File::create(&csv_path)
            .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
        writeln!(f, "{HEADER}")?;

        tracing::debug!("Created trial log '{}'", csv_path.display());
        Ok(Self { csv_path })
    }

    /// Append one trial as a new row.
    pub fn log(&self, t: &TrialResult) -> Result<()> {
        let mut f = OpenOptions::new().append(true).open(&self.csv_path)?;
        writeln!(
            f,
            "{},{},{:e},{:.6},{:.6},{:.6},{:.2}",
            t.trial,
            t.params.batch_size,
            t.params.learning_rate,
            t.train_loss,
            t.val_loss,
            t.val_accuracy,
            t.elapsed_secs,
        )?;
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}
