// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// From a directory of class folders to tensor batches:
//
//   data/{train,val}/<class>/*.jpg
//       │
//       ▼
//   validate_data_dir  → checks folders, discovers class names
//       │
//       ▼
//   ImageFolderLoader  → decodes each file
//       │
//       ▼
//   ImageTransform     → resize to size×size RGB8
//       │
//       ▼
//   ImageDataset       → implements Burn's Dataset trait
//       │
//       ▼
//   ImageBatcher       → normalises and stacks into tensors
//       │
//       ▼
//   DataLoader         → feeds batches to the training loop
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Directory validation and image folder walking
pub mod loader;

/// Resize + ImageNet normalisation
pub mod transform;

/// Implements Burn's Dataset trait for image samples
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Seeded train/validation split for datasets without val/
pub mod splitter;
