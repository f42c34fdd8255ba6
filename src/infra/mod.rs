// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// File-system side effects of a search:
//
//   checkpoint.rs — best model weights (CompactRecorder),
//                   run config + class names, summary JSON
//
//   metrics.rs    — per-trial CSV log
//
// Reference: Burn Book §5 (Checkpointing)

/// Model, config and summary persistence
pub mod checkpoint;

/// Per-trial CSV logger
pub mod metrics;
