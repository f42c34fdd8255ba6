// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// Everything that touches burn's nn / optim / autodiff APIs.
//
//   model.rs      — ResNet-18, torchvision weight import,
//                   head replacement, backbone freezing
//
//   trainer.rs    — one grid point: fresh model, SGD with
//                   momentum, fixed epoch count, validation
//
//   inferencer.rs — single-image classification with a
//                   restored model
//
// Reference: Burn Book §3 (Building Blocks), §5 (Training)
//            He et al. (2016) Deep Residual Learning

/// ResNet-18 architecture and pretrained weight import
pub mod model;

/// Per-trial training and validation
pub mod trainer;

/// Single-image prediction
pub mod inferencer;
