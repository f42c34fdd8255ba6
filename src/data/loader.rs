// ============================================================
// Layer 4 — Image Folder Loader
// ============================================================
// Reads a classification dataset laid out as:
//
//   data/
//     train/
//       ants/   *.jpg
//       bees/   *.jpg
//     val/
//       ants/   *.jpg
//       bees/   *.jpg
//
// Class names are the sorted sub-directory names of train/,
// and a class's label is its index in that sorted list.
// val/ must contain exactly the same class folders.
//
// validate_data_dir() runs every directory check up front,
// before any image is decoded or any model is built, so a
// bad path fails in milliseconds instead of after a trial.

use anyhow::Result;
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

use crate::data::transform::ImageTransform;
use crate::domain::sample::ImageSample;
use crate::domain::traits::ImageSource;

pub const TRAIN_SPLIT: &str = "train";
pub const VAL_SPLIT:   &str = "val";

const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("{what} directory '{path}' does not exist")]
    MissingDirectory { what: &'static str, path: PathBuf },

    #[error("'{dir}' must contain at least two class folders, found {found}")]
    TooFewClasses { dir: PathBuf, found: usize },

    #[error("class folders differ between train {train:?} and val {val:?}")]
    ClassMismatch { train: Vec<String>, val: Vec<String> },

    #[error("no readable images in the '{split}' split")]
    EmptySplit { split: String },

    #[error("cannot read '{path}': {source}")]
    Io {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The checked shape of a data directory.
#[derive(Debug, Clone)]
pub struct DataLayout {
    pub root:    PathBuf,
    pub classes: Vec<String>,
    /// false when val/ is absent and the caller asked to split train/ instead
    pub has_val: bool,
}

/// Check that `root/train` (and `root/val`, unless `allow_missing_val`)
/// exist and hold the same set of at least two class folders.
pub fn validate_data_dir(root: &Path, allow_missing_val: bool) -> Result<DataLayout, DatasetError> {
    if !root.is_dir() {
        return Err(DatasetError::MissingDirectory { what: "data", path: root.to_path_buf() });
    }

    let train_dir = root.join(TRAIN_SPLIT);
    if !train_dir.is_dir() {
        return Err(DatasetError::MissingDirectory { what: "train", path: train_dir });
    }

    let classes = list_classes(&train_dir)?;
    if classes.len() < 2 {
        return Err(DatasetError::TooFewClasses { dir: train_dir, found: classes.len() });
    }

    let val_dir = root.join(VAL_SPLIT);
    let has_val = val_dir.is_dir();
    if has_val {
        let val_classes = list_classes(&val_dir)?;
        if val_classes != classes {
            return Err(DatasetError::ClassMismatch { train: classes, val: val_classes });
        }
    } else if !allow_missing_val {
        return Err(DatasetError::MissingDirectory { what: "val", path: val_dir });
    }

    tracing::info!("Found {} classes in '{}': {:?}", classes.len(), root.display(), classes);
    Ok(DataLayout { root: root.to_path_buf(), classes, has_val })
}

/// Sorted names of the visible sub-directories of `dir`.
fn list_classes(dir: &Path) -> Result<Vec<String>, DatasetError> {
    let io_err = |source| DatasetError::Io { path: dir.to_path_buf(), source };

    let mut classes = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if !path.is_dir() {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if !name.starts_with('.') {
                classes.push(name.to_string());
            }
        }
    }
    classes.sort();
    Ok(classes)
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Loads and transforms every image of a validated layout.
pub struct ImageFolderLoader {
    layout:    DataLayout,
    transform: ImageTransform,
}

impl ImageFolderLoader {
    pub fn new(layout: DataLayout, transform: ImageTransform) -> Self {
        Self { layout, transform }
    }
}

impl ImageSource for ImageFolderLoader {
    fn classes(&self) -> &[String] {
        &self.layout.classes
    }

    fn load_split(&self, split: &str) -> Result<Vec<ImageSample>> {
        let split_dir = self.layout.root.join(split);
        if !split_dir.is_dir() {
            return Err(DatasetError::MissingDirectory { what: "split", path: split_dir }.into());
        }

        let mut samples = Vec::new();
        let mut skipped = 0usize;

        for (label, class) in self.layout.classes.iter().enumerate() {
            let class_dir = split_dir.join(class);
            let mut files: Vec<PathBuf> = fs::read_dir(&class_dir)
                .map_err(|source| DatasetError::Io { path: class_dir.clone(), source })?
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_file() && is_image(p))
                .collect();
            files.sort();

            let before = samples.len();
            for path in &files {
                match self.transform.load(path, label) {
                    Ok(sample) => samples.push(sample),
                    // One corrupt file should not sink the whole search
                    Err(e) => {
                        tracing::warn!("Skipping '{}': {:#}", path.display(), e);
                        skipped += 1;
                    }
                }
            }
            tracing::debug!("{split}/{class}: {} images (label {label})", samples.len() - before);
        }

        if samples.is_empty() {
            return Err(DatasetError::EmptySplit { split: split.to_string() }.into());
        }

        tracing::info!(
            "Loaded {} '{}' images ({} skipped)",
            samples.len(),
            split,
            skipped
        );
        Ok(samples)
    }
}
