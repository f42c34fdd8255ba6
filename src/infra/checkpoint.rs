// ============================================================
// Layer 6 — Artifact Store
// ============================================================
// Everything a search leaves behind in --output-dir:
//
//   artifacts/
//     search_config.json  ← run settings + class names
//     best_model.mpk      ← weights of the most accurate trial
//     summary.json        ← every trial + the recommended ranges
//     trials.csv          ← written by infra::metrics
//
// The class names travel with the config because `predict`
// has to rebuild a head of the right width, and has to turn
// a label index back into a folder name.
//
// Burn's CompactRecorder serialises the model record to
// MessagePack; loading fails if the architecture differs.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::application::search_use_case::SearchConfig;
use crate::domain::trial::SearchOutcome;
use crate::ml::model::ResNet;

const CONFIG_FILE:  &str = "search_config.json";
const SUMMARY_FILE: &str = "summary.json";
const MODEL_STEM:   &str = "best_model";

/// What `predict` needs to rebuild the saved model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub config:  SearchConfig,
    pub classes: Vec<String>,
}

pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Use `dir`, creating it if needed.
    pub fn create(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create output directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    /// Use an existing `dir` written by an earlier search.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        anyhow::ensure!(
            dir.is_dir(),
            "Output directory '{}' does not exist. Run 'search' first.",
            dir.display()
        );
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the saved model, extension included.
    pub fn model_path(&self) -> PathBuf {
        self.dir.join(format!("{MODEL_STEM}.mpk"))
    }

    pub fn save_model<B: Backend>(&self, model: &ResNet<B>) -> Result<()> {
        let path = self.dir.join(MODEL_STEM);
        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save model to '{}'", path.display()))?;
        tracing::debug!("Saved model to '{}'", self.model_path().display());
        Ok(())
    }

    /// Restore saved weights into `model`, which must have the same architecture.
    pub fn load_model<B: Backend>(&self, model: ResNet<B>, device: &B::Device) -> Result<ResNet<B>> {
        let path = self.dir.join(MODEL_STEM);
        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!("Cannot load model '{}'. Has a search finished?", path.display())
            })?;
        Ok(model.load_record(record))
    }

    pub fn save_config(&self, config: &SearchConfig, classes: &[String]) -> Result<()> {
        let manifest = RunManifest { config: config.clone(), classes: classes.to_vec() };
        self.write_json(CONFIG_FILE, &manifest)
    }

    pub fn load_config(&self) -> Result<RunManifest> {
        let path = self.dir.join(CONFIG_FILE);
        let json = fs::read_to_string(&path).with_context(|| {
            format!("Cannot read '{}'. Make sure 'search' has been run.", path.display())
        })?;
        serde_json::from_str(&json)
            .with_context(|| format!("Malformed run config '{}'", path.display()))
    }

    pub fn save_summary(&self, outcome: &SearchOutcome) -> Result<()> {
        self.write_json(SUMMARY_FILE, outcome)
    }

    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.dir.join(name);
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write '{}'", path.display()))?;
        tracing::debug!("Wrote '{}'", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{hyperparams::TrialParams, trial::TrialResult};
    use crate::ml::model::ResNetConfig;
    use burn::backend::NdArray;
    use tempfile::TempDir;

    #[test]
    fn test_open_requires_existing_dir() {
        assert!(ArtifactStore::open("/no/such/artifacts").is_err());
    }

    #[test]
    fn test_config_carries_classes() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::create(dir.path().join("out")).unwrap();
        let classes = vec!["ants".to_string(), "bees".to_string()];
        store.save_config(&SearchConfig::default(), &classes).unwrap();

        let manifest = store.load_config().unwrap();
        assert_eq!(manifest.classes, classes);
        assert_eq!(manifest.config.image_size, SearchConfig::default().image_size);
    }

    #[test]
    fn test_summary_written() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::create(dir.path()).unwrap();
        let outcome = SearchOutcome::from_trials(vec![TrialResult {
            trial: 1,
            params: TrialParams { batch_size: 8, learning_rate: 0.01 },
            train_loss: 0.3,
            val_loss: 0.4,
            val_accuracy: 0.9,
            elapsed_secs: 2.0,
        }])
        .unwrap();
        store.save_summary(&outcome).unwrap();
        let json = fs::read_to_string(dir.path().join(SUMMARY_FILE)).unwrap();
        let saved: SearchOutcome = serde_json::from_str(&json).unwrap();
        assert_eq!(saved.best.params.batch_size, 8);
        assert_eq!(saved.batch_range.high, 9);
    }

    #[test]
    fn test_saved_model_restores_weights() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::create(dir.path()).unwrap();
        let device = Default::default();

        let model: ResNet<NdArray> = ResNetConfig::new(2).init(&device);
        store.save_model(&model).unwrap();
        assert!(store.model_path().is_file());

        let fresh: ResNet<NdArray> = ResNetConfig::new(2).init(&device);
        let restored = store.load_model(fresh, &device).unwrap();

        let a: Vec<f32> = model.fc.weight.val().into_data().to_vec::<f32>().unwrap();
        let b: Vec<f32> = restored.fc.weight.val().into_data().to_vec::<f32>().unwrap();
        // CompactRecorder stores half precision
        assert!(a.iter().zip(&b).all(|(x, y)| (x - y).abs() < 1e-2));
    }
}
